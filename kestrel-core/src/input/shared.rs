//! Input hand-off between the poll context and the panel context
//!
//! The poll task samples lines at a high rate; the panel only reads at its
//! refresh rate. [`SharedInput`] sums encoder steps and keeps the latest
//! button mask in between so no step is lost across the two rates.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::buttons::ButtonMask;

/// One poll's worth of input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSample {
    /// Buttons held
    pub buttons: ButtonMask,
    /// Encoder steps since the previous sample
    pub encoder_delta: i8,
}

/// Source of button and encoder readings for a display driver
pub trait InputSource {
    /// Buttons currently held
    fn read_buttons(&mut self) -> ButtonMask;

    /// Encoder steps since the previous call
    fn read_encoder_delta(&mut self) -> i8;
}

/// Input source for panels without buttons or encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn read_buttons(&mut self) -> ButtonMask {
        ButtonMask::empty()
    }

    fn read_encoder_delta(&mut self) -> i8 {
        0
    }
}

#[derive(Clone, Copy, Default)]
struct Accumulated {
    buttons: ButtonMask,
    delta: i16,
}

/// Accumulator shared between the poll and panel contexts
pub struct SharedInput<M: RawMutex> {
    inner: Mutex<M, Cell<Accumulated>>,
}

impl<M: RawMutex> Default for SharedInput<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> SharedInput<M> {
    /// Create an empty accumulator
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Accumulated {
                buttons: ButtonMask::empty(),
                delta: 0,
            })),
        }
    }

    /// Record one poll sample
    pub fn publish(&self, sample: InputSample) {
        self.inner.lock(|cell| {
            let mut acc = cell.get();
            acc.buttons = sample.buttons;
            acc.delta = acc.delta.saturating_add(sample.encoder_delta as i16);
            cell.set(acc);
        });
    }

    /// Latest button mask
    pub fn buttons(&self) -> ButtonMask {
        self.inner.lock(|cell| cell.get().buttons)
    }

    /// Take up to one `i8` worth of accumulated steps
    ///
    /// Anything beyond the `i8` range stays for the next call.
    pub fn take_delta(&self) -> i8 {
        self.inner.lock(|cell| {
            let mut acc = cell.get();
            let taken = acc.delta.clamp(i8::MIN as i16, i8::MAX as i16);
            acc.delta -= taken;
            cell.set(acc);
            taken as i8
        })
    }

    /// Steps not yet taken
    pub fn pending_delta(&self) -> i16 {
        self.inner.lock(|cell| cell.get().delta)
    }
}

impl<M: RawMutex> InputSource for &SharedInput<M> {
    fn read_buttons(&mut self) -> ButtonMask {
        self.buttons()
    }

    fn read_encoder_delta(&mut self) -> i8 {
        self.take_delta()
    }
}

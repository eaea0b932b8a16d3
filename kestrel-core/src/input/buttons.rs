//! Button lines and the logical button mask

use bitflags::bitflags;
use heapless::Vec;
use kestrel_hal::gpio::{ActiveLevel, InputPin};

bitflags! {
    /// Logical buttons held at the time of a sample
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ButtonMask: u8 {
        /// Encoder push / select
        const SELECT = 0x01;
        const RIGHT  = 0x02;
        const DOWN   = 0x04;
        const UP     = 0x08;
        const LEFT   = 0x10;
        /// Pause / back
        const PAUSE  = 0x20;
        const AUX1   = 0x40;
        const AUX2   = 0x80;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ButtonMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ButtonMask({=u8:#04x})", self.bits());
    }
}

/// Maximum number of wired button lines
pub const MAX_BUTTON_LINES: usize = 8;

/// Error binding a button line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonError {
    /// All line slots are in use
    TooManyLines,
    /// The mask must name exactly one button
    NotSingleButton,
}

/// Set of physical button lines
///
/// Each line's level maps 1:1 to one bit of the mask. Bounce is not
/// filtered: a sample reports whatever the lines read at that instant.
pub struct ButtonLines<P> {
    lines: Vec<(ButtonMask, ActiveLevel<P>), MAX_BUTTON_LINES>,
}

impl<P: InputPin> Default for ButtonLines<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin> ButtonLines<P> {
    /// Create an empty set
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Bind a pin to one logical button
    pub fn bind(&mut self, button: ButtonMask, pin: P, active_low: bool) -> Result<(), ButtonError> {
        if button.bits().count_ones() != 1 {
            return Err(ButtonError::NotSingleButton);
        }
        self.lines
            .push((button, ActiveLevel::new(pin, active_low)))
            .map_err(|_| ButtonError::TooManyLines)
    }

    /// Number of bound lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if no line is bound
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Read every line into a mask
    pub fn sample(&mut self) -> ButtonMask {
        self.lines
            .iter_mut()
            .filter_map(|(button, line)| line.is_active().then_some(*button))
            .fold(ButtonMask::empty(), |mask, button| mask | button)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct SharedPin(Rc<Cell<bool>>);

    impl InputPin for SharedPin {
        fn is_high(&mut self) -> bool {
            self.0.get()
        }
    }

    fn pin(level: bool) -> (SharedPin, Rc<Cell<bool>>) {
        let cell = Rc::new(Cell::new(level));
        (SharedPin(cell.clone()), cell)
    }

    #[test]
    fn test_mask_bit_values() {
        assert_eq!(ButtonMask::SELECT.bits(), 0x01);
        assert_eq!(ButtonMask::RIGHT.bits(), 0x02);
        assert_eq!(ButtonMask::DOWN.bits(), 0x04);
        assert_eq!(ButtonMask::UP.bits(), 0x08);
        assert_eq!(ButtonMask::LEFT.bits(), 0x10);
        assert_eq!(ButtonMask::PAUSE.bits(), 0x20);
        assert_eq!(ButtonMask::AUX1.bits(), 0x40);
        assert_eq!(ButtonMask::AUX2.bits(), 0x80);
    }

    #[test]
    fn test_levels_map_to_bits() {
        let mut lines = ButtonLines::new();
        let (click, click_level) = pin(true);
        let (back, back_level) = pin(true);

        lines.bind(ButtonMask::SELECT, click, true).unwrap();
        lines.bind(ButtonMask::PAUSE, back, true).unwrap();

        assert_eq!(lines.sample(), ButtonMask::empty());

        click_level.set(false);
        assert_eq!(lines.sample(), ButtonMask::SELECT);

        back_level.set(false);
        assert_eq!(lines.sample(), ButtonMask::SELECT | ButtonMask::PAUSE);

        click_level.set(true);
        assert_eq!(lines.sample(), ButtonMask::PAUSE);
    }

    #[test]
    fn test_active_high_line() {
        let mut lines = ButtonLines::new();
        let (up, level) = pin(false);
        lines.bind(ButtonMask::UP, up, false).unwrap();

        assert!(lines.sample().is_empty());
        level.set(true);
        assert_eq!(lines.sample(), ButtonMask::UP);
    }

    #[test]
    fn test_bind_rejects_multi_bit_mask() {
        let mut lines = ButtonLines::new();
        let (p, _) = pin(false);
        assert_eq!(
            lines.bind(ButtonMask::UP | ButtonMask::DOWN, p, false),
            Err(ButtonError::NotSingleButton)
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn test_bind_capacity() {
        let mut lines = ButtonLines::new();
        for bit in 0..8 {
            let (p, _) = pin(false);
            lines
                .bind(ButtonMask::from_bits_truncate(1 << bit), p, false)
                .unwrap();
        }
        let (p, _) = pin(false);
        assert_eq!(
            lines.bind(ButtonMask::SELECT, p, false),
            Err(ButtonError::TooManyLines)
        );
        assert_eq!(lines.len(), 8);
    }
}

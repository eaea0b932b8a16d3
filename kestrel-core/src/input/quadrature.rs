//! Quadrature encoder decoding
//!
//! Table-driven: the previous 2-bit phase state and the fresh sample form a
//! 4-bit index into a fixed transition table. Valid single-step transitions
//! yield +1 or -1, no change and illegal double transitions yield 0.
//!
//! One call reports at most one step, so the poll rate has to stay above four
//! times the fastest expected rotation rate (four phase transitions per
//! detent on a typical encoder). Transitions missed by a slow poll are not
//! detected, and contact bounce is not filtered.

use kestrel_hal::gpio::InputPin;

/// Step for each `(previous << 2) | current` phase index
pub const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Pack two phase levels into the 2-bit state (`A | B << 1`)
#[inline]
pub const fn phase_state(a: bool, b: bool) -> u8 {
    (a as u8) | ((b as u8) << 1)
}

/// Pure quadrature state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuadratureDecoder {
    previous: u8,
}

impl QuadratureDecoder {
    /// Start from the current line levels so the first poll reports nothing
    pub const fn new(a: bool, b: bool) -> Self {
        Self {
            previous: phase_state(a, b),
        }
    }

    /// Feed one sample, returning the step it represents
    pub fn update(&mut self, a: bool, b: bool) -> i8 {
        let current = phase_state(a, b);
        let step = TRANSITIONS[((self.previous << 2) | current) as usize];
        self.previous = current;
        step
    }

    /// Last stored 2-bit state
    pub const fn state(&self) -> u8 {
        self.previous
    }
}

/// Encoder wired to two input pins
pub struct QuadratureEncoder<A, B> {
    a: A,
    b: B,
    decoder: QuadratureDecoder,
}

impl<A: InputPin, B: InputPin> QuadratureEncoder<A, B> {
    /// Create an encoder, latching the initial phase
    pub fn new(mut a: A, mut b: B) -> Self {
        let decoder = QuadratureDecoder::new(a.is_high(), b.is_high());
        Self { a, b, decoder }
    }

    /// Sample both lines once
    pub fn poll(&mut self) -> i8 {
        let a = self.a.is_high();
        let b = self.b.is_high();
        self.decoder.update(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Phase sequence (A, B) for one clockwise cycle
    const CW: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (false, false)];

    fn levels(state: u8) -> (bool, bool) {
        (state & 1 != 0, state & 2 != 0)
    }

    #[test]
    fn test_table_for_all_inputs() {
        for prev in 0..4u8 {
            for cur in 0..4u8 {
                let (pa, pb) = levels(prev);
                let (ca, cb) = levels(cur);
                let mut decoder = QuadratureDecoder::new(pa, pb);
                let step = decoder.update(ca, cb);
                assert_eq!(step, TRANSITIONS[((prev << 2) | cur) as usize]);
                assert!((-1..=1).contains(&step));
                assert_eq!(decoder.state(), cur);
            }
        }
    }

    #[test]
    fn test_no_change_is_zero() {
        let mut decoder = QuadratureDecoder::new(true, false);
        assert_eq!(decoder.update(true, false), 0);
        assert_eq!(decoder.update(true, false), 0);
    }

    #[test]
    fn test_double_transition_is_zero() {
        // 00 -> 11 skips a phase; direction is unknown
        let mut decoder = QuadratureDecoder::new(false, false);
        assert_eq!(decoder.update(true, true), 0);
    }

    #[test]
    fn test_clockwise_cycle() {
        let mut decoder = QuadratureDecoder::new(false, false);
        let total: i32 = CW.iter().map(|&(a, b)| decoder.update(a, b) as i32).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_reversal_cancels() {
        let mut decoder = QuadratureDecoder::new(false, false);
        let mut total = 0i32;
        for &(a, b) in CW.iter() {
            total += decoder.update(a, b) as i32;
        }
        // Walk back through the same states in reverse
        for &(a, b) in CW.iter().rev().skip(1) {
            total += decoder.update(a, b) as i32;
        }
        total += decoder.update(false, false) as i32;
        assert_eq!(total, 0);
    }

    #[test]
    fn test_encoder_reads_pins() {
        struct Level(bool);
        impl InputPin for Level {
            fn is_high(&mut self) -> bool {
                self.0
            }
        }

        let mut encoder = QuadratureEncoder::new(Level(false), Level(false));
        assert_eq!(encoder.poll(), 0);
        encoder.b.0 = true;
        assert_eq!(encoder.poll(), 1);
        encoder.b.0 = false;
        assert_eq!(encoder.poll(), -1);
    }

    proptest! {
        #[test]
        fn prop_n_clockwise_steps(n in 0usize..200) {
            let mut decoder = QuadratureDecoder::new(false, false);
            let total: i32 = CW.iter().cycle().take(n).map(|&(a, b)| decoder.update(a, b) as i32).sum();
            prop_assert_eq!(total, n as i32);
        }

        #[test]
        fn prop_n_counter_clockwise_steps(n in 0usize..200) {
            let mut decoder = QuadratureDecoder::new(false, false);
            let total: i32 = CW
                .iter()
                .rev()
                .skip(1)
                .chain(core::iter::once(&(false, false)))
                .cycle()
                .take(n)
                .map(|&(a, b)| decoder.update(a, b) as i32)
                .sum();
            prop_assert_eq!(total, -(n as i32));
        }
    }
}

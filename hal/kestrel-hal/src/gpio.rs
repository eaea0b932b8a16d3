//! GPIO pin abstractions
//!
//! Panel control lines (chip select, data/command, reset) are outputs;
//! buttons and encoder phases are inputs.

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Digital input pin
///
/// Takes `&mut self` so implementations may latch or sample hardware state.
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&mut self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&mut self) -> bool {
        !self.is_high()
    }
}

/// Input line with a configurable active level
///
/// Buttons wired to ground with a pull-up read low when pressed. Wrapping the
/// pin here keeps the inversion out of the decoding logic.
pub struct ActiveLevel<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> ActiveLevel<P> {
    /// Wrap a pin; `active_low` inverts the reading
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// True when the line is in its active state
    pub fn is_active(&mut self) -> bool {
        self.pin.is_high() != self.active_low
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> InputPin for ActiveLevel<P> {
    fn is_high(&mut self) -> bool {
        self.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPin(bool);

    impl InputPin for FixedPin {
        fn is_high(&mut self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_active_high_passthrough() {
        let mut line = ActiveLevel::new(FixedPin(true), false);
        assert!(line.is_active());
        assert!(line.is_high());
    }

    #[test]
    fn test_active_low_inverts() {
        let mut pressed = ActiveLevel::new(FixedPin(false), true);
        assert!(pressed.is_active());

        let mut released = ActiveLevel::new(FixedPin(true), true);
        assert!(!released.is_active());
        assert!(released.is_low());
    }
}

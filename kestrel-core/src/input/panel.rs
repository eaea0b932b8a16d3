//! Per-tick input for the panel context
//!
//! Turns raw encoder steps into menu steps (one per detent) and raw button
//! levels into click events.

use super::buttons::ButtonMask;
use crate::traits::DisplayDriver;

/// What happened since the previous panel tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelEvents {
    /// Whole detents turned, positive clockwise
    pub steps: i16,
    /// SELECT went down
    pub clicked: bool,
    /// PAUSE (back) went down
    pub back: bool,
    /// Buttons held
    pub buttons: ButtonMask,
}

/// Detent and edge tracking across panel ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelInput {
    resolution: u8,
    pending: i16,
    last_buttons: ButtonMask,
}

impl PanelInput {
    /// Tracker for an encoder with `resolution` steps per detent
    pub const fn new(resolution: u8) -> Self {
        Self {
            resolution: if resolution == 0 { 1 } else { resolution },
            pending: 0,
            last_buttons: ButtonMask::empty(),
        }
    }

    /// Fold in one reading
    ///
    /// Steps short of a full detent carry over to the next call.
    pub fn update(&mut self, buttons: ButtonMask, delta: i8) -> PanelEvents {
        self.pending = self.pending.saturating_add(delta as i16);
        let resolution = self.resolution as i16;
        let steps = self.pending / resolution;
        self.pending -= steps * resolution;

        let pressed = buttons & !self.last_buttons;
        self.last_buttons = buttons;

        PanelEvents {
            steps,
            clicked: pressed.contains(ButtonMask::SELECT),
            back: pressed.contains(ButtonMask::PAUSE),
            buttons,
        }
    }

    /// Read the driver's input and fold it in
    pub fn poll<D: DisplayDriver + ?Sized>(&mut self, lcd: &mut D) -> PanelEvents {
        let buttons = lcd.read_buttons();
        let delta = lcd.read_encoder_delta();
        self.update(buttons, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_per_detent() {
        let mut input = PanelInput::new(4);
        assert_eq!(input.update(ButtonMask::empty(), 3).steps, 0);
        assert_eq!(input.update(ButtonMask::empty(), 1).steps, 1);
        assert_eq!(input.update(ButtonMask::empty(), 9).steps, 2);
        // one left over
        assert_eq!(input.update(ButtonMask::empty(), -2).steps, 0);
        assert_eq!(input.update(ButtonMask::empty(), -3).steps, -1);
    }

    #[test]
    fn test_zero_resolution_treated_as_one() {
        let mut input = PanelInput::new(0);
        assert_eq!(input.update(ButtonMask::empty(), 5).steps, 5);
    }

    #[test]
    fn test_click_on_rising_edge_only() {
        let mut input = PanelInput::new(1);
        assert!(input.update(ButtonMask::SELECT, 0).clicked);
        assert!(!input.update(ButtonMask::SELECT, 0).clicked);
        assert!(!input.update(ButtonMask::empty(), 0).clicked);
        assert!(input.update(ButtonMask::SELECT | ButtonMask::UP, 0).clicked);
    }

    #[test]
    fn test_back_edge() {
        let mut input = PanelInput::new(1);
        let events = input.update(ButtonMask::PAUSE, 0);
        assert!(events.back);
        assert!(!events.clicked);
        assert!(!input.update(ButtonMask::PAUSE, 0).back);
    }
}

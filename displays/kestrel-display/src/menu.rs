//! Menu window state
//!
//! Tracks which slice of a menu is on screen and which row is highlighted,
//! along with the pair last rendered so the renderer can work out the
//! smallest repaint.

use core::ops::Range;

/// Scrollable window over a list of rows
///
/// Whenever `rows > 0`: `start <= current < start + min(visible, rows)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MenuWindow {
    rows: u16,
    visible: u16,
    start: u16,
    current: u16,
    last_start: u16,
    last_current: u16,
}

impl MenuWindow {
    /// Window over `rows` entries showing at most `visible` at once
    pub const fn new(rows: u16, visible: u16) -> Self {
        Self {
            rows,
            visible,
            start: 0,
            current: 0,
            last_start: 0,
            last_current: 0,
        }
    }

    /// Reset for a new list, highlighting the first row
    pub fn setup(&mut self, rows: u16, visible: u16) {
        *self = Self::new(rows, visible);
    }

    /// Total logical rows
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Row capacity of the screen area
    pub const fn capacity(&self) -> u16 {
        self.visible
    }

    /// Rows actually shown (`min(visible, rows)`)
    pub fn shown(&self) -> u16 {
        self.visible.min(self.rows)
    }

    /// First row on screen
    pub const fn start(&self) -> u16 {
        self.start
    }

    /// Highlighted row
    pub const fn current(&self) -> u16 {
        self.current
    }

    /// Start row as last rendered
    pub const fn last_start(&self) -> u16 {
        self.last_start
    }

    /// Highlighted row as last rendered
    pub const fn last_current(&self) -> u16 {
        self.last_current
    }

    /// Rows on screen, top to bottom
    pub fn window(&self) -> Range<u16> {
        self.start..self.start + self.shown()
    }

    /// More rows than fit on screen
    pub fn scrolls(&self) -> bool {
        self.rows > self.visible
    }

    /// Move the highlight by `delta` rows, clamped to the list
    ///
    /// Scrolls the window just enough to keep the highlight visible. Returns
    /// true if the highlight moved.
    pub fn apply_delta(&mut self, delta: i32) -> bool {
        if self.rows == 0 || delta == 0 {
            return false;
        }
        let target = (self.current as i32).saturating_add(delta).clamp(0, self.rows as i32 - 1) as u16;
        self.set_current(target)
    }

    /// Highlight a specific row, scrolling as needed
    pub fn set_current(&mut self, row: u16) -> bool {
        if self.rows == 0 {
            return false;
        }
        let row = row.min(self.rows - 1);
        let moved = row != self.current;
        self.current = row;

        let shown = self.shown();
        if self.current < self.start {
            self.start = self.current;
        } else if shown > 0 && self.current >= self.start + shown {
            self.start = self.current + 1 - shown;
        }
        self.start = self.start.min(self.rows - shown);

        moved
    }

    /// Window start differs from what was last rendered
    pub fn start_changed(&self) -> bool {
        self.start != self.last_start
    }

    /// Highlight differs from what was last rendered
    pub fn current_changed(&self) -> bool {
        self.current != self.last_current
    }

    /// Anything differs from what was last rendered
    pub fn changed(&self) -> bool {
        self.start_changed() || self.current_changed()
    }

    /// Record the current pair as rendered
    pub fn commit(&mut self) {
        self.last_start = self.start;
        self.last_current = self.current;
    }

    /// Screen line (0-based) of a row, if on screen
    pub fn line_of(&self, row: u16) -> Option<u16> {
        self.window().contains(&row).then(|| row - self.start)
    }
}

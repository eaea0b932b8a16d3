//! Display capability interface
//!
//! Every panel driver implements a small required core (text cursor, text
//! output, input readout). Everything else is optional and advertised through
//! [`Capabilities`]; an optional operation the driver lacks returns
//! [`DisplayError::Unsupported`] instead of doing nothing.
//!
//! Coordinates are device pixels unless stated otherwise. Nothing here clips:
//! out-of-range coordinates are the driver's problem.

use bitflags::bitflags;
use embedded_graphics_core::pixelcolor::{IntoStorage, Rgb565, RgbColor};

use crate::input::ButtonMask;

/// Errors that can occur driving a display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// A bus transfer failed
    Bus,
    /// The driver does not implement this optional operation
    Unsupported,
    /// Drawing attempted before `init`
    NotInitialized,
}

/// Pixel operation selector
///
/// Decides which of the foreground and background colors a primitive paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrawMode {
    /// Paint with the background color
    Erase,
    /// Paint with the foreground color
    #[default]
    Draw,
    /// Paint inverted (foreground fills, swapped text colors)
    Invert,
}

bitflags! {
    /// Optional operations a driver implements
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u16 {
        /// Pixel-addressed text cursor
        const GRAPHICS      = 1 << 0;
        /// Pixel, line, box and glyph primitives
        const FULL_GRAPHICS = 1 << 1;
        /// Foreground/background colors
        const COLOR         = 1 << 2;
        /// Draw mode and background toggle
        const DRAW_MODE     = 1 << 3;
        /// Piezo buzzer
        const BUZZER        = 1 << 4;
        /// Indicator LEDs
        const LEDS          = 1 << 5;
        /// Selectable hardware variant
        const VARIANTS      = 1 << 6;
        /// Adjustable contrast
        const CONTRAST      = 1 << 7;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Capabilities {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Capabilities({=u16:#x})", self.bits());
    }
}

/// Text cursor and paint state owned by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    /// Cursor x in pixels
    pub cursor_x: u16,
    /// Cursor y in pixels
    pub cursor_y: u16,
    /// Foreground color
    pub foreground: Rgb565,
    /// Background color
    pub background: Rgb565,
    /// Current draw mode for text
    pub draw_mode: DrawMode,
    /// Paint glyph background pixels
    pub background_enabled: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            foreground: Rgb565::WHITE,
            background: Rgb565::BLACK,
            draw_mode: DrawMode::Draw,
            background_enabled: true,
        }
    }
}

impl DisplayState {
    /// Solid color a fill primitive paints in `mode`
    pub fn fill_color(&self, mode: DrawMode) -> Rgb565 {
        match mode {
            DrawMode::Erase => self.background,
            DrawMode::Draw | DrawMode::Invert => self.foreground,
        }
    }

    /// (set bit, clear bit) colors for a glyph in the current draw mode
    pub fn glyph_colors(&self) -> (Rgb565, Rgb565) {
        match self.draw_mode {
            DrawMode::Draw => (self.foreground, self.background),
            DrawMode::Erase | DrawMode::Invert => (self.background, self.foreground),
        }
    }

    /// Move the cursor to a pixel position
    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cursor_x = x;
        self.cursor_y = y;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "DisplayState {{ cursor: ({}, {}), fg: {=u16:#x}, bg: {=u16:#x}, mode: {}, bg_on: {} }}",
            self.cursor_x,
            self.cursor_y,
            self.foreground.into_storage(),
            self.background.into_storage(),
            self.draw_mode,
            self.background_enabled
        );
    }
}

/// Raw RGB565 word of a color, as sent over the wire
pub fn color_word(color: Rgb565) -> u16 {
    color.into_storage()
}

/// Trait implemented by every panel display
///
/// Calls are synchronous: each returns once the underlying bus transfer has
/// completed. There is no cancellation and no retry.
pub trait DisplayDriver {
    /// Bring the controller up and clear the screen
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Clear the entire screen to the background color
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Move the text cursor to the top-left corner
    fn home(&mut self) -> Result<(), DisplayError>;

    /// Move the text cursor to a character cell
    fn set_cursor(&mut self, col: u16, row: u16) -> Result<(), DisplayError>;

    /// Write a text run at the cursor, advancing it
    fn write(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Buttons currently held
    fn read_buttons(&mut self) -> ButtonMask;

    /// Encoder steps accumulated since the previous call
    fn read_encoder_delta(&mut self) -> i8;

    /// Encoder steps per detent
    fn encoder_resolution(&self) -> u8;

    /// Optional operations this driver implements
    fn capabilities(&self) -> Capabilities;

    /// Number of text lines available to a character-mode menu
    fn screen_lines(&self) -> u16 {
        4
    }

    /// Pixel cursor supported
    fn has_graphics(&self) -> bool {
        self.capabilities().contains(Capabilities::GRAPHICS)
    }

    /// Pixel primitives supported (enables incremental redraw)
    fn has_full_graphics(&self) -> bool {
        self.capabilities().contains(Capabilities::FULL_GRAPHICS)
    }

    /// Logical width and height in pixels
    fn dimensions(&self) -> Result<(u16, u16), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Move the text cursor to a pixel position
    fn set_cursor_px(&mut self, _x: u16, _y: u16) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Current text cursor in pixels
    fn cursor_px(&self) -> Result<(u16, u16), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Paint one pixel
    fn pixel(&mut self, _x: u16, _y: u16, _mode: DrawMode) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Paint a horizontal line of `len` pixels starting at (x, y)
    fn draw_hline(&mut self, _x: u16, _y: u16, _len: u16, _mode: DrawMode) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Paint a vertical line of `len` pixels starting at (x, y)
    fn draw_vline(&mut self, _x: u16, _y: u16, _len: u16, _mode: DrawMode) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Paint a filled box
    fn draw_box(
        &mut self,
        _x: u16,
        _y: u16,
        _w: u16,
        _h: u16,
        _mode: DrawMode,
    ) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Paint one character cell at (x, y) without moving the cursor
    fn blit_glyph(&mut self, _x: u16, _y: u16, _ch: char) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Set the foreground color
    fn set_color(&mut self, _color: Rgb565) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Current foreground color
    fn color(&self) -> Result<Rgb565, DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Set the background color
    fn set_background_color(&mut self, _color: Rgb565) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Current background color
    fn background_color(&self) -> Result<Rgb565, DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Set the text draw mode
    fn set_draw_mode(&mut self, _mode: DrawMode) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Current text draw mode
    fn draw_mode(&self) -> Result<DrawMode, DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Paint (true) or skip (false) glyph background pixels
    fn set_background(&mut self, _enabled: bool) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Sound the buzzer
    fn buzz(&mut self, _duration_ms: u16, _frequency_hz: u16) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Switch an indicator LED
    fn set_led(&mut self, _index: u8, _on: bool) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Select a hardware variant
    fn set_variant(&mut self, _variant: u8) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Current contrast
    fn contrast(&self) -> Result<u8, DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Set the contrast
    fn set_contrast(&mut self, _contrast: u8) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }
}

//! ST7789 TFT controller (4-wire SPI, RGB565)
//!
//! The ST7789 drives 240x320 (and smaller) IPS panels. It is write-mostly:
//! every drawing operation becomes "program an address window, then stream
//! pixels into it".
//!
//! # SPI framing
//!
//! - Chip select is held low for a whole transaction
//! - The D/C line is low for the command byte and high for its arguments
//!   and for pixel data
//! - Multi-byte values (coordinates, colors) are sent high byte first
//!
//! # Input
//!
//! The panel has no input of its own. Buttons and encoder come from an
//! [`InputSource`], normally the shared accumulator filled by the poll task.

use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_hal::delay::DelayNs;
use kestrel_core::input::{ButtonMask, InputSource};
use kestrel_core::traits::{
    color_word, Capabilities, DisplayDriver, DisplayError, DisplayState, DrawMode,
};
use kestrel_display::font::{self, FONT_HEIGHT, FONT_WIDTH};
use kestrel_hal::{OutputPin, SpiBus};

/// ST7789 command set (subset used here)
pub mod cmd {
    /// Software reset
    pub const SWRESET: u8 = 0x01;
    /// Read display ID
    pub const RDDID: u8 = 0x04;
    /// Read display status
    pub const RDDST: u8 = 0x09;
    /// Read display power mode
    pub const RDDPM: u8 = 0x0A;
    /// Read display pixel format
    pub const RDDCOLMOD: u8 = 0x0C;
    /// Read display image mode
    pub const RDDIM: u8 = 0x0D;
    /// Sleep out
    pub const SLPOUT: u8 = 0x11;
    /// Normal display mode on
    pub const NORON: u8 = 0x13;
    /// Inversion off
    pub const INVOFF: u8 = 0x20;
    /// Display on
    pub const DISPON: u8 = 0x29;
    /// Column address set
    pub const CASET: u8 = 0x2A;
    /// Row address set
    pub const RASET: u8 = 0x2B;
    /// Memory write
    pub const RAMWR: u8 = 0x2C;
    /// Memory data access control
    pub const MADCTL: u8 = 0x36;
    /// Interface pixel format
    pub const COLMOD: u8 = 0x3A;
    /// Read ID1
    pub const RDID1: u8 = 0xDA;
    /// Read ID2
    pub const RDID2: u8 = 0xDB;
    /// Read ID3
    pub const RDID3: u8 = 0xDC;
    /// Read ID4
    pub const RDID4: u8 = 0xDD;
}

/// MADCTL bits
pub mod madctl {
    /// Row address order
    pub const MY: u8 = 0x80;
    /// Column address order
    pub const MX: u8 = 0x40;
    /// Row/column exchange
    pub const MV: u8 = 0x20;
    /// Vertical refresh order
    pub const ML: u8 = 0x10;
    /// RGB subpixel order
    pub const RGB: u8 = 0x00;
}

/// Flag in an init step's argument count: a delay byte follows
const DELAY_FLAG: u8 = 0x80;

/// Delay byte meaning 500 ms
const LONG_DELAY: u8 = 255;

/// Power-up sequence: step count, then per step
/// `command, arg count (| DELAY_FLAG), args..., [delay ms]`
#[rustfmt::skip]
pub const INIT_SEQUENCE: &[u8] = &[
    9,
    cmd::SWRESET, DELAY_FLAG, 150,
    cmd::SLPOUT, DELAY_FLAG, LONG_DELAY,
    cmd::COLMOD, 1 | DELAY_FLAG, 0x55, 10, // 16-bit color
    cmd::MADCTL, 1, 0x08,
    cmd::CASET, 4, 0, 0, 0, 240,
    cmd::RASET, 4, 0, 0, 1, 64, // 320
    cmd::INVOFF, DELAY_FLAG, 10,
    cmd::NORON, DELAY_FLAG, 10,
    cmd::DISPON, DELAY_FLAG, LONG_DELAY,
];

/// One decoded step of an init table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitStep<'a> {
    /// Command byte
    pub command: u8,
    /// Argument bytes
    pub args: &'a [u8],
    /// Pause after the step
    pub delay_ms: Option<u32>,
}

/// Iterator over the steps of an init table
///
/// Stops early if the table is truncated.
pub struct InitSteps<'a> {
    table: &'a [u8],
    remaining: u8,
}

impl<'a> InitSteps<'a> {
    pub fn new(table: &'a [u8]) -> Self {
        match table.split_first() {
            Some((&count, rest)) => Self {
                table: rest,
                remaining: count,
            },
            None => Self {
                table,
                remaining: 0,
            },
        }
    }
}

impl<'a> Iterator for InitSteps<'a> {
    type Item = InitStep<'a>;

    fn next(&mut self) -> Option<InitStep<'a>> {
        if self.remaining == 0 {
            return None;
        }
        let (&command, rest) = self.table.split_first()?;
        let (&count, rest) = rest.split_first()?;
        let n = (count & !DELAY_FLAG) as usize;
        let args = rest.get(..n)?;
        let mut rest = &rest[n..];

        let delay_ms = if count & DELAY_FLAG != 0 {
            let (&ms, tail) = rest.split_first()?;
            rest = tail;
            Some(if ms == LONG_DELAY { 500 } else { ms as u32 })
        } else {
            None
        };

        self.table = rest;
        self.remaining -= 1;
        Some(InitStep {
            command,
            args,
            delay_ms,
        })
    }
}

/// MADCTL value and RAM offset for a rotation
///
/// Returns `(madctl, x_offset, y_offset, swaps_axes)`.
pub fn rotation_setup(rotation: u8, col_start: u16, row_start: u16) -> (u8, u16, u16, bool) {
    match rotation & 3 {
        0 => (madctl::MX | madctl::MY | madctl::RGB, col_start, row_start, false),
        1 => (madctl::MY | madctl::MV | madctl::RGB, row_start, col_start, true),
        2 => (madctl::RGB, 0, 0, false),
        _ => (madctl::MX | madctl::MV | madctl::RGB, 0, 0, true),
    }
}

/// Panel geometry and input settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct St7789Config {
    /// Native (rotation 0) width
    pub width: u16,
    /// Native (rotation 0) height
    pub height: u16,
    /// Visible area column offset in controller RAM
    pub col_start: u16,
    /// Visible area row offset in controller RAM
    pub row_start: u16,
    /// Rotation applied at init (0-3)
    pub rotation: u8,
    /// Encoder steps per detent
    pub encoder_resolution: u8,
}

impl Default for St7789Config {
    fn default() -> Self {
        Self {
            width: 240,
            height: 320,
            col_start: 0,
            row_start: 0,
            rotation: 3,
            encoder_resolution: 4,
        }
    }
}

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum St7789Error<E> {
    /// SPI transfer failed
    Spi(E),
    /// Drawing before `init`
    NotInitialized,
}

impl<E> From<St7789Error<E>> for DisplayError {
    fn from(e: St7789Error<E>) -> Self {
        match e {
            St7789Error::Spi(_) => DisplayError::Bus,
            St7789Error::NotInitialized => DisplayError::NotInitialized,
        }
    }
}

/// Raw identification bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayId {
    /// RDDID response
    pub rddid: [u8; 8],
    /// RDID1 to RDID4
    pub rdid: [u8; 4],
}

/// Raw status bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayStatus {
    /// RDDST response
    pub rddst: [u8; 10],
    /// Power mode (RDDPM)
    pub power_mode: u8,
    /// Pixel format (RDDCOLMOD)
    pub pixel_format: u8,
    /// Image mode (RDDIM)
    pub image_mode: u8,
}

/// Pixels streamed per SPI write
const CHUNK_PIXELS: usize = 32;

/// ST7789 display driver
pub struct St7789<SPI, CS, DC, RST, DELAY, IN> {
    spi: SPI,
    cs: Option<CS>,
    dc: DC,
    rst: Option<RST>,
    delay: DELAY,
    input: IN,
    config: St7789Config,
    width: u16,
    height: u16,
    x_offset: u16,
    y_offset: u16,
    state: DisplayState,
    initialized: bool,
}

impl<SPI, CS, DC, RST, DELAY, IN> St7789<SPI, CS, DC, RST, DELAY, IN>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
    IN: InputSource,
{
    /// Create a driver; nothing is sent until [`DisplayDriver::init`]
    pub fn new(
        spi: SPI,
        cs: Option<CS>,
        dc: DC,
        rst: Option<RST>,
        delay: DELAY,
        input: IN,
        config: St7789Config,
    ) -> Self {
        let mut cs = cs;
        if let Some(pin) = cs.as_mut() {
            pin.set_high();
        }
        let mut rst = rst;
        if let Some(pin) = rst.as_mut() {
            pin.set_high();
        }
        let mut dc = dc;
        dc.set_high();

        Self {
            spi,
            cs,
            dc,
            rst,
            delay,
            input,
            config,
            width: config.width,
            height: config.height,
            x_offset: 0,
            y_offset: 0,
            state: DisplayState::default(),
            initialized: false,
        }
    }

    /// Panel configuration
    pub fn config(&self) -> &St7789Config {
        &self.config
    }

    /// Logical size after rotation
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn select(&mut self) {
        if let Some(cs) = self.cs.as_mut() {
            cs.set_low();
        }
    }

    fn deselect(&mut self) {
        if let Some(cs) = self.cs.as_mut() {
            cs.set_high();
        }
    }

    /// Command byte with D/C low, then arguments with D/C high
    ///
    /// Caller holds chip select.
    fn send(&mut self, command: u8, args: &[u8]) -> Result<(), St7789Error<SPI::Error>> {
        self.dc.set_low();
        let result = self.spi.write(&[command]);
        self.dc.set_high();
        result.map_err(St7789Error::Spi)?;
        if !args.is_empty() {
            self.spi.write(args).map_err(St7789Error::Spi)?;
        }
        Ok(())
    }

    /// One complete transaction: select, command, arguments, deselect
    pub fn command(&mut self, command: u8, args: &[u8]) -> Result<(), St7789Error<SPI::Error>> {
        self.select();
        let result = self.send(command, args);
        self.deselect();
        result
    }

    /// Command followed by a read of `buf.len()` bytes
    fn read_command(&mut self, command: u8, buf: &mut [u8]) -> Result<(), St7789Error<SPI::Error>> {
        self.select();
        let result = self
            .send(command, &[])
            .and_then(|()| self.spi.read(buf).map_err(St7789Error::Spi));
        self.deselect();
        result
    }

    /// Pulse reset low for 20 µs if the line is wired
    pub fn hard_reset(&mut self) {
        if let Some(rst) = self.rst.as_mut() {
            rst.set_low();
            self.delay.delay_us(20);
            rst.set_high();
        }
    }

    /// Execute an init table, strictly in order
    pub fn run_sequence(&mut self, table: &[u8]) -> Result<(), St7789Error<SPI::Error>> {
        for step in InitSteps::new(table) {
            self.command(step.command, step.args)?;
            if let Some(ms) = step.delay_ms {
                self.delay.delay_ms(ms);
            }
        }
        Ok(())
    }

    /// Set orientation (0-3); odd rotations swap width and height
    pub fn set_rotation(&mut self, rotation: u8) -> Result<(), St7789Error<SPI::Error>> {
        let rotation = rotation & 3;
        let (value, x_offset, y_offset, swap) =
            rotation_setup(rotation, self.config.col_start, self.config.row_start);
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        if swap {
            self.width = self.config.height;
            self.height = self.config.width;
        } else {
            self.width = self.config.width;
            self.height = self.config.height;
        }
        self.config.rotation = rotation;
        self.command(cmd::MADCTL, &[value])
    }

    /// CASET/RASET/RAMWR for an inclusive window; caller holds chip select
    ///
    /// `w` and `h` must be non-zero. Ends past the controller's address
    /// range are pinned to 0xFFFF.
    fn write_window(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), St7789Error<SPI::Error>> {
        let x0 = x.saturating_add(self.x_offset);
        let x1 = x0.saturating_add(w - 1);
        let y0 = y.saturating_add(self.y_offset);
        let y1 = y0.saturating_add(h - 1);

        let [x0h, x0l] = x0.to_be_bytes();
        let [x1h, x1l] = x1.to_be_bytes();
        self.send(cmd::CASET, &[x0h, x0l, x1h, x1l])?;
        let [y0h, y0l] = y0.to_be_bytes();
        let [y1h, y1l] = y1.to_be_bytes();
        self.send(cmd::RASET, &[y0h, y0l, y1h, y1l])?;
        self.send(cmd::RAMWR, &[])
    }

    /// Program the address window as its own transaction; an empty window
    /// is a no-op
    pub fn set_addr_window(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), St7789Error<SPI::Error>> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        self.select();
        let result = self.write_window(x, y, w, h);
        self.deselect();
        result
    }

    /// Fill a rectangle with one color, clipped to the screen
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb565) -> Result<(), St7789Error<SPI::Error>> {
        if !self.initialized {
            return Err(St7789Error::NotInitialized);
        }
        if x >= self.width || y >= self.height || w == 0 || h == 0 {
            return Ok(());
        }
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);

        let [hi, lo] = color_word(color).to_be_bytes();
        let mut chunk = [0u8; CHUNK_PIXELS * 2];
        for pair in chunk.chunks_exact_mut(2) {
            pair[0] = hi;
            pair[1] = lo;
        }

        self.select();
        let result = self.write_window(x, y, w, h).and_then(|()| {
            let mut remaining = w as usize * h as usize;
            while remaining > 0 {
                let n = remaining.min(CHUNK_PIXELS);
                self.spi.write(&chunk[..n * 2]).map_err(St7789Error::Spi)?;
                remaining -= n;
            }
            Ok(())
        });
        self.deselect();
        result
    }

    /// Draw one character cell at (x, y)
    ///
    /// Colors follow the draw mode. With the background disabled only set
    /// pixels are painted.
    pub fn draw_glyph(&mut self, x: u16, y: u16, ch: char) -> Result<(), St7789Error<SPI::Error>> {
        if !self.initialized {
            return Err(St7789Error::NotInitialized);
        }
        let (fg, bg) = self.state.glyph_colors();
        let fits = |start: u16, size: u16, limit: u16| {
            start.checked_add(size).is_some_and(|end| end <= limit)
        };
        let on_screen = fits(x, FONT_WIDTH, self.width) && fits(y, FONT_HEIGHT, self.height);

        if self.state.background_enabled && on_screen {
            let [fh, fl] = color_word(fg).to_be_bytes();
            let [bh, bl] = color_word(bg).to_be_bytes();
            let mut cell = [0u8; (FONT_WIDTH * FONT_HEIGHT * 2) as usize];
            for (pair, set) in cell.chunks_exact_mut(2).zip(font::raster(ch)) {
                let (h, l) = if set { (fh, fl) } else { (bh, bl) };
                pair[0] = h;
                pair[1] = l;
            }
            self.select();
            let result = self
                .write_window(x, y, FONT_WIDTH, FONT_HEIGHT)
                .and_then(|()| self.spi.write(&cell).map_err(St7789Error::Spi));
            self.deselect();
            return result;
        }

        let glyph = font::glyph(ch);
        for row in 0..FONT_HEIGHT {
            let Some(py) = y.checked_add(row) else { break };
            for col in 0..FONT_WIDTH {
                let Some(px) = x.checked_add(col) else { break };
                if font::is_set(glyph, col, row) {
                    self.fill_rect(px, py, 1, 1, fg)?;
                } else if self.state.background_enabled {
                    self.fill_rect(px, py, 1, 1, bg)?;
                }
            }
        }
        Ok(())
    }

    /// Write text at the cursor
    ///
    /// `\n` moves down one cell without returning to column 0; `\r` is
    /// ignored.
    pub fn draw_text(&mut self, text: &str) -> Result<(), St7789Error<SPI::Error>> {
        for ch in text.chars() {
            match ch {
                '\n' => self.state.cursor_y = self.state.cursor_y.saturating_add(FONT_HEIGHT),
                '\r' => {}
                _ => {
                    self.draw_glyph(self.state.cursor_x, self.state.cursor_y, ch)?;
                    self.state.cursor_x = self.state.cursor_x.saturating_add(FONT_WIDTH);
                }
            }
        }
        Ok(())
    }

    /// Read the identification registers
    pub fn read_id(&mut self) -> Result<DisplayId, St7789Error<SPI::Error>> {
        let mut id = DisplayId::default();
        self.read_command(cmd::RDDID, &mut id.rddid)?;
        for (slot, command) in id
            .rdid
            .iter_mut()
            .zip([cmd::RDID1, cmd::RDID2, cmd::RDID3, cmd::RDID4])
        {
            let mut byte = [0u8; 1];
            self.read_command(command, &mut byte)?;
            *slot = byte[0];
        }
        Ok(id)
    }

    /// Read the status registers
    pub fn read_status(&mut self) -> Result<DisplayStatus, St7789Error<SPI::Error>> {
        let mut status = DisplayStatus::default();
        self.read_command(cmd::RDDST, &mut status.rddst)?;

        let mut byte = [0u8; 1];
        self.read_command(cmd::RDDPM, &mut byte)?;
        status.power_mode = byte[0];
        self.read_command(cmd::RDDCOLMOD, &mut byte)?;
        status.pixel_format = byte[0];
        self.read_command(cmd::RDDIM, &mut byte)?;
        status.image_mode = byte[0];
        Ok(status)
    }
}

impl<SPI, CS, DC, RST, DELAY, IN> DisplayDriver for St7789<SPI, CS, DC, RST, DELAY, IN>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
    IN: InputSource,
{
    fn init(&mut self) -> Result<(), DisplayError> {
        self.initialized = false;
        self.hard_reset();
        self.run_sequence(INIT_SEQUENCE)?;
        self.initialized = true;
        self.set_rotation(self.config.rotation)?;
        self.clear()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let (w, h) = (self.width, self.height);
        self.fill_rect(0, 0, w, h, self.state.background)?;
        self.state.move_to(0, 0);
        Ok(())
    }

    fn home(&mut self) -> Result<(), DisplayError> {
        self.state.move_to(0, 0);
        Ok(())
    }

    fn set_cursor(&mut self, col: u16, row: u16) -> Result<(), DisplayError> {
        self.state
            .move_to(col.saturating_mul(FONT_WIDTH), row.saturating_mul(FONT_HEIGHT));
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), DisplayError> {
        Ok(self.draw_text(text)?)
    }

    fn read_buttons(&mut self) -> ButtonMask {
        self.input.read_buttons()
    }

    fn read_encoder_delta(&mut self) -> i8 {
        self.input.read_encoder_delta()
    }

    fn encoder_resolution(&self) -> u8 {
        self.config.encoder_resolution
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::GRAPHICS | Capabilities::FULL_GRAPHICS | Capabilities::COLOR | Capabilities::DRAW_MODE
    }

    fn screen_lines(&self) -> u16 {
        self.height / FONT_HEIGHT
    }

    fn dimensions(&self) -> Result<(u16, u16), DisplayError> {
        Ok((self.width, self.height))
    }

    fn set_cursor_px(&mut self, x: u16, y: u16) -> Result<(), DisplayError> {
        self.state.move_to(x, y);
        Ok(())
    }

    fn cursor_px(&self) -> Result<(u16, u16), DisplayError> {
        Ok((self.state.cursor_x, self.state.cursor_y))
    }

    fn pixel(&mut self, x: u16, y: u16, mode: DrawMode) -> Result<(), DisplayError> {
        Ok(self.fill_rect(x, y, 1, 1, self.state.fill_color(mode))?)
    }

    fn draw_hline(&mut self, x: u16, y: u16, len: u16, mode: DrawMode) -> Result<(), DisplayError> {
        Ok(self.fill_rect(x, y, len, 1, self.state.fill_color(mode))?)
    }

    fn draw_vline(&mut self, x: u16, y: u16, len: u16, mode: DrawMode) -> Result<(), DisplayError> {
        Ok(self.fill_rect(x, y, 1, len, self.state.fill_color(mode))?)
    }

    fn draw_box(&mut self, x: u16, y: u16, w: u16, h: u16, mode: DrawMode) -> Result<(), DisplayError> {
        Ok(self.fill_rect(x, y, w, h, self.state.fill_color(mode))?)
    }

    fn blit_glyph(&mut self, x: u16, y: u16, ch: char) -> Result<(), DisplayError> {
        Ok(self.draw_glyph(x, y, ch)?)
    }

    fn set_color(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.state.foreground = color;
        Ok(())
    }

    fn color(&self) -> Result<Rgb565, DisplayError> {
        Ok(self.state.foreground)
    }

    fn set_background_color(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.state.background = color;
        Ok(())
    }

    fn background_color(&self) -> Result<Rgb565, DisplayError> {
        Ok(self.state.background)
    }

    fn set_draw_mode(&mut self, mode: DrawMode) -> Result<(), DisplayError> {
        self.state.draw_mode = mode;
        Ok(())
    }

    fn draw_mode(&self) -> Result<DrawMode, DisplayError> {
        Ok(self.state.draw_mode)
    }

    fn set_background(&mut self, enabled: bool) -> Result<(), DisplayError> {
        self.state.background_enabled = enabled;
        Ok(())
    }
}

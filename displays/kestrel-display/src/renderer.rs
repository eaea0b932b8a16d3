//! Differential menu renderer
//!
//! Repaints a menu through any [`DisplayDriver`], doing as little bus work as
//! the change allows. Full-graphics displays get a framed window with a
//! title bar, scrollbar and highlight box; only what changed since the last
//! render is repainted. Character displays are redrawn line by line on every
//! refresh with a `>` marking the current row.
//!
//! Full-graphics decision table, comparing the last rendered `(start, current)`
//! with the new pair:
//!
//! | Condition                  | Repaint                                       |
//! |----------------------------|-----------------------------------------------|
//! | clear requested            | everything                                    |
//! | start moved                | scrollbar, highlight and every visible line   |
//! | only current moved         | scrollbar, the old and the new current line   |
//! | nothing moved              | nothing                                       |
//!
//! The new pair is committed as "last rendered" after every refresh, whether
//! or not anything was painted.
//!
//! Pages that are not menus use [`MenuRenderer::refresh_screen`] instead: the
//! visible rows in character cells from column 0, with no marker, highlight
//! or scrollbar, and nothing committed.

use kestrel_core::traits::{DisplayDriver, DisplayError, DrawMode};

use crate::font::FONT_HEIGHT;
use crate::menu::MenuWindow;

/// Source of menu rows, pulled one at a time
pub trait MenuContent<D: DisplayDriver + ?Sized> {
    /// Title bar text
    fn title(&self) -> &str {
        ""
    }

    /// Write one row at the display's current cursor
    fn display_menu_line(&mut self, row: u16, lcd: &mut D) -> Result<(), DisplayError>;
}

/// How much a refresh repainted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Redraw {
    /// Whole screen, frame included
    Full,
    /// Scrollbar, highlight and every visible line
    Window,
    /// Old and new current line only
    Lines,
    /// Character display, every visible line
    Text,
    /// Nothing
    Unchanged,
}

/// Geometry of the framed menu on a full-graphics display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    /// Display width in pixels
    pub width: u16,
    /// Display height in pixels
    pub height: u16,
}

/// Height of one menu line (glyph plus one pixel of highlight border)
pub const LINE_HEIGHT: u16 = FONT_HEIGHT + 1;

/// Height of the title bar
pub const TITLE_HEIGHT: u16 = LINE_HEIGHT;

/// Left edge of menu text
pub const TEXT_X: u16 = 2;

impl Default for Layout {
    fn default() -> Self {
        Self::from_dimensions(128, 64)
    }
}

impl Layout {
    /// Layout for a display of the given size
    pub const fn from_dimensions(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Layout for a driver, falling back to 128x64 if it has no size
    pub fn for_display<D: DisplayDriver + ?Sized>(lcd: &D) -> Self {
        match lcd.dimensions() {
            Ok((w, h)) => Self::from_dimensions(w, h),
            Err(_) => Self::default(),
        }
    }

    /// Menu lines that fit under the title bar
    pub fn visible_lines(&self) -> u16 {
        self.height.saturating_sub(TITLE_HEIGHT + 1) / LINE_HEIGHT
    }

    /// Top of the highlight box for screen line `line`
    pub fn line_top(&self, line: u16) -> u16 {
        TITLE_HEIGHT + LINE_HEIGHT * line
    }

    /// Text baseline-top for screen line `line`
    pub fn text_y(&self, line: u16) -> u16 {
        self.line_top(line) + 1
    }

    /// First pixel row of the scroll track
    pub fn track_origin(&self) -> u16 {
        TITLE_HEIGHT + 1
    }

    /// Scroll track length in pixels
    pub fn track_len(&self) -> u16 {
        self.height.saturating_sub(TITLE_HEIGHT + 3)
    }

    /// x of the scrollbar border line
    pub fn scrollbar_x(&self) -> u16 {
        self.width.saturating_sub(6)
    }

    /// x of the scrollbar thumb
    pub fn thumb_x(&self) -> u16 {
        self.width.saturating_sub(4)
    }

    /// Highlight box width
    pub fn highlight_width(&self, scrollbar: bool) -> u16 {
        if scrollbar {
            self.width.saturating_sub(7)
        } else {
            self.width.saturating_sub(2)
        }
    }

    /// Height of the side borders below the title bar
    fn border_len(&self) -> u16 {
        self.height.saturating_sub(TITLE_HEIGHT + 1)
    }
}

/// Scrollbar thumb as (offset from track origin, length)
///
/// `offset = track * start / rows`; `length = track * visible / rows`, plus
/// one if that division leaves a remainder so the thumb never understates
/// how much of the list is on screen.
pub fn scroll_thumb(track: u16, visible: u16, rows: u16, start: u16) -> (u16, u16) {
    if rows == 0 {
        return (0, track);
    }
    let track = track as u32;
    let rows_u = rows as u32;
    let offset = track * start as u32 / rows_u;
    let scaled = track * visible as u32;
    let mut len = scaled / rows_u;
    if scaled % rows_u > 0 {
        len += 1;
    }
    (offset as u16, len as u16)
}

/// Menu renderer bound to one display geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MenuRenderer {
    layout: Layout,
    full_graphics: bool,
    text_lines: u16,
}

impl MenuRenderer {
    /// Renderer matching a driver's capabilities and size
    pub fn for_display<D: DisplayDriver + ?Sized>(lcd: &D) -> Self {
        Self {
            layout: Layout::for_display(lcd),
            full_graphics: lcd.has_full_graphics(),
            text_lines: lcd.screen_lines(),
        }
    }

    /// Renderer with an explicit layout
    pub const fn new(layout: Layout, full_graphics: bool, text_lines: u16) -> Self {
        Self {
            layout,
            full_graphics,
            text_lines,
        }
    }

    /// Geometry in use
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Menu lines the screen can show
    pub fn visible_lines(&self) -> u16 {
        if self.full_graphics {
            self.layout.visible_lines()
        } else {
            self.text_lines
        }
    }

    /// Repaint `window` from `content`
    ///
    /// The window's new pair is committed even if a bus error cuts the
    /// repaint short; the error is still returned.
    pub fn refresh<D, C>(
        &self,
        lcd: &mut D,
        window: &mut MenuWindow,
        content: &mut C,
        clear: bool,
    ) -> Result<Redraw, DisplayError>
    where
        D: DisplayDriver + ?Sized,
        C: MenuContent<D> + ?Sized,
    {
        let result = if self.full_graphics {
            self.refresh_graphics(lcd, window, content, clear)
        } else {
            self.refresh_text(lcd, window, content, clear)
                .map(|()| Redraw::Text)
        };
        window.commit();
        result
    }

    fn refresh_graphics<D, C>(
        &self,
        lcd: &mut D,
        window: &MenuWindow,
        content: &mut C,
        clear: bool,
    ) -> Result<Redraw, DisplayError>
    where
        D: DisplayDriver + ?Sized,
        C: MenuContent<D> + ?Sized,
    {
        let scrollbar = window.scrolls();
        let width = self.layout.highlight_width(scrollbar);
        let current_line = window.current() - window.start();

        if clear {
            lcd.clear()?;
            self.draw_frame(lcd, content.title())?;
            if scrollbar {
                self.draw_scrollbar(lcd, window)?;
            }
            lcd.draw_box(1, self.layout.line_top(current_line), width, LINE_HEIGHT, DrawMode::Invert)?;
            for row in window.window() {
                self.draw_line(lcd, window, content, row, row == window.current())?;
            }
            return Ok(Redraw::Full);
        }

        if window.start_changed() {
            if scrollbar {
                self.draw_scrollbar(lcd, window)?;
            }
            lcd.draw_box(1, self.layout.line_top(current_line), width, LINE_HEIGHT, DrawMode::Invert)?;
            for row in window.window() {
                if row == window.current() {
                    self.draw_line(lcd, window, content, row, true)?;
                } else {
                    self.draw_padded_line(lcd, window, content, row)?;
                }
            }
            return Ok(Redraw::Window);
        }

        if window.current_changed() {
            if scrollbar {
                self.draw_scrollbar(lcd, window)?;
            }
            let old_line = window.line_of(window.last_current());
            if let Some(line) = old_line {
                lcd.draw_box(1, self.layout.line_top(line), width, LINE_HEIGHT, DrawMode::Erase)?;
            }
            lcd.draw_box(1, self.layout.line_top(current_line), width, LINE_HEIGHT, DrawMode::Draw)?;
            if old_line.is_some() {
                self.draw_line(lcd, window, content, window.last_current(), false)?;
            }
            self.draw_line(lcd, window, content, window.current(), true)?;
            return Ok(Redraw::Lines);
        }

        Ok(Redraw::Unchanged)
    }

    fn refresh_text<D, C>(
        &self,
        lcd: &mut D,
        window: &MenuWindow,
        content: &mut C,
        clear: bool,
    ) -> Result<(), DisplayError>
    where
        D: DisplayDriver + ?Sized,
        C: MenuContent<D> + ?Sized,
    {
        if clear {
            lcd.clear()?;
        }
        for row in window.window() {
            let line = row - window.start();
            lcd.set_cursor(0, line)?;
            lcd.write(if row == window.current() { ">" } else { " " })?;
            lcd.set_cursor(2, line)?;
            content.display_menu_line(row, lcd)?;
        }
        Ok(())
    }

    /// Plain page redraw: every visible row at column 0
    pub fn refresh_screen<D, C>(
        &self,
        lcd: &mut D,
        window: &MenuWindow,
        content: &mut C,
        clear: bool,
    ) -> Result<(), DisplayError>
    where
        D: DisplayDriver + ?Sized,
        C: MenuContent<D> + ?Sized,
    {
        if clear {
            lcd.clear()?;
        }
        for row in window.window() {
            lcd.set_cursor(0, row - window.start())?;
            content.display_menu_line(row, lcd)?;
        }
        Ok(())
    }

    /// Title bar and window border
    fn draw_frame<D: DisplayDriver + ?Sized>(&self, lcd: &mut D, title: &str) -> Result<(), DisplayError> {
        let Layout { width, height } = self.layout;
        let right = width.saturating_sub(1);

        lcd.draw_box(0, 0, width, TITLE_HEIGHT, DrawMode::Draw)?;
        lcd.draw_vline(0, TITLE_HEIGHT, self.layout.border_len(), DrawMode::Draw)?;
        lcd.draw_vline(right, TITLE_HEIGHT, self.layout.border_len(), DrawMode::Draw)?;
        lcd.draw_hline(1, height.saturating_sub(1), width.saturating_sub(2), DrawMode::Draw)?;
        // Rounded title corners
        lcd.pixel(0, 0, DrawMode::Erase)?;
        lcd.pixel(right, 0, DrawMode::Erase)?;

        lcd.set_draw_mode(DrawMode::Erase)?;
        lcd.set_cursor_px(TEXT_X, 1)?;
        lcd.write(title)?;
        lcd.set_draw_mode(DrawMode::Draw)
    }

    fn draw_scrollbar<D: DisplayDriver + ?Sized>(
        &self,
        lcd: &mut D,
        window: &MenuWindow,
    ) -> Result<(), DisplayError> {
        let origin = self.layout.track_origin();
        let track = self.layout.track_len();
        let x = self.layout.thumb_x();
        let (offset, len) = scroll_thumb(track, window.capacity(), window.rows(), window.start());
        let top = origin + offset;
        let bottom = (top + len).min(origin + track);

        lcd.draw_vline(self.layout.scrollbar_x(), TITLE_HEIGHT, self.layout.border_len(), DrawMode::Draw)?;
        fill(lcd, x, origin, 2, top - origin, DrawMode::Erase)?;
        fill(lcd, x, top, 2, bottom - top, DrawMode::Draw)?;
        fill(lcd, x, bottom, 2, origin + track - bottom, DrawMode::Erase)
    }

    /// One menu row; the current row is written in erase mode over the
    /// highlight box
    fn draw_line<D, C>(
        &self,
        lcd: &mut D,
        window: &MenuWindow,
        content: &mut C,
        row: u16,
        highlighted: bool,
    ) -> Result<(), DisplayError>
    where
        D: DisplayDriver + ?Sized,
        C: MenuContent<D> + ?Sized,
    {
        let line = row - window.start();
        lcd.set_cursor_px(TEXT_X, self.layout.text_y(line))?;
        if highlighted {
            lcd.set_draw_mode(DrawMode::Erase)?;
            content.display_menu_line(row, lcd)?;
            lcd.set_draw_mode(DrawMode::Draw)
        } else {
            content.display_menu_line(row, lcd)
        }
    }

    /// Non-current row after a scroll: clear the old highlight border, the
    /// text, then the rest of the line
    fn draw_padded_line<D, C>(
        &self,
        lcd: &mut D,
        window: &MenuWindow,
        content: &mut C,
        row: u16,
    ) -> Result<(), DisplayError>
    where
        D: DisplayDriver + ?Sized,
        C: MenuContent<D> + ?Sized,
    {
        let line = row - window.start();
        let top = self.layout.line_top(line);
        let right = self.layout.scrollbar_x();

        lcd.draw_hline(1, top, self.layout.highlight_width(true), DrawMode::Erase)?;
        lcd.draw_vline(1, top, LINE_HEIGHT, DrawMode::Erase)?;
        self.draw_line(lcd, window, content, row, false)?;

        let (x, y) = lcd.cursor_px()?;
        fill(lcd, x, y, right.saturating_sub(x), FONT_HEIGHT, DrawMode::Erase)
    }
}

/// Box fill that skips empty areas
fn fill<D: DisplayDriver + ?Sized>(
    lcd: &mut D,
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    mode: DrawMode,
) -> Result<(), DisplayError> {
    if w == 0 || h == 0 {
        return Ok(());
    }
    lcd.draw_box(x, y, w, h, mode)
}

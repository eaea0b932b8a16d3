//! Machine and firmware identity

use heapless::{String, Vec};
use kestrel_core::config::AboutConfig;
use kestrel_core::traits::{DisplayDriver, DisplayError};

use crate::menu::MenuWindow;
use crate::renderer::MenuContent;
use crate::screen::{PanelContext, PanelError, Screen, Transition};

const LINE_LEN: usize = 40;
const MAX_LINES: usize = 5;

/// Read-only page listing machine name, make, model and firmware version
pub struct AboutScreen<'a> {
    about: &'a AboutConfig,
    firmware: &'a str,
    version: &'a str,
    lines: Vec<String<LINE_LEN>, MAX_LINES>,
    window: MenuWindow,
}

impl<'a> AboutScreen<'a> {
    pub const fn new(about: &'a AboutConfig, firmware: &'a str, version: &'a str) -> Self {
        Self {
            about,
            firmware,
            version,
            lines: Vec::new(),
            window: MenuWindow::new(0, 0),
        }
    }

    /// Rebuild the rows from the current identity; overlong rows are cut
    /// at `LINE_LEN`
    fn build_lines(&mut self) {
        self.lines.clear();
        let about = self.about;
        let fields: [(&str, &str); MAX_LINES] = [
            ("Name", about.machine_name.as_str()),
            ("Make", about.make.as_str()),
            ("Model", about.model.as_str()),
            ("Firmware", self.firmware),
            ("Version", self.version),
        ];
        for (label, value) in fields {
            if value.is_empty() {
                continue;
            }
            let mut line = String::new();
            for ch in label.chars().chain(": ".chars()).chain(value.chars()) {
                if line.push(ch).is_err() {
                    break;
                }
            }
            if self.lines.push(line).is_err() {
                break;
            }
        }
    }

    /// Rows as last built
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }
}

impl<'a, D: DisplayDriver + ?Sized> MenuContent<D> for AboutScreen<'a> {
    fn title(&self) -> &str {
        "About"
    }

    fn display_menu_line(&mut self, row: u16, lcd: &mut D) -> Result<(), DisplayError> {
        match self.lines.get(row as usize) {
            Some(line) => lcd.write(line),
            None => Ok(()),
        }
    }
}

impl<'a, D: DisplayDriver + ?Sized> Screen<D> for AboutScreen<'a> {
    fn window_mut(&mut self) -> &mut MenuWindow {
        &mut self.window
    }

    fn on_enter(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        self.build_lines();
        self.setup_menu(ctx, self.lines.len() as u16);
        self.refresh_menu(ctx, true)?;
        Ok(())
    }

    fn on_refresh(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<Transition, PanelError> {
        self.follow_encoder(ctx)?;
        let events = ctx.events();
        if events.clicked || events.back {
            Ok(Transition::Back)
        } else {
            Ok(Transition::Stay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::tests::MockDisplay;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use kestrel_core::bridge::CommandBridge;
    use kestrel_core::input::ButtonMask;

    fn about() -> AboutConfig {
        let mut about = AboutConfig::default();
        about.machine_name.push_str("Bench 2").unwrap();
        about.make.push_str("Acme").unwrap();
        about
    }

    #[test]
    fn test_rows_skip_empty_fields() {
        let about = about();
        let bridge: CommandBridge<NoopRawMutex, 4> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut screen = AboutScreen::new(&about, "kestrel", "0.1.0");
        {
            let mut ctx = PanelContext::new(&mut lcd, &bridge);
            screen.on_enter(&mut ctx).unwrap();
        }

        let lines: heapless::Vec<&str, 5> = screen.lines().collect();
        assert_eq!(
            &lines[..],
            &["Name: Bench 2", "Make: Acme", "Firmware: kestrel", "Version: 0.1.0"]
        );
        assert!(lcd.writes().contains(&"About"));
        assert!(lcd.writes().contains(&"Make: Acme"));
    }

    #[test]
    fn test_long_row_is_cut() {
        let about = AboutConfig::default();
        let bridge: CommandBridge<NoopRawMutex, 4> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let version = "0.1.0-nightly+0123456789abcdef0123456789";
        let mut screen = AboutScreen::new(&about, "kestrel", version);
        {
            let mut ctx = PanelContext::new(&mut lcd, &bridge);
            screen.on_enter(&mut ctx).unwrap();
        }

        let last = screen.lines().last().unwrap();
        assert_eq!(last.len(), LINE_LEN);
        assert!(last.starts_with("Version: 0.1.0-nightly"));
    }

    #[test]
    fn test_click_goes_back() {
        let about = about();
        let bridge: CommandBridge<NoopRawMutex, 4> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut screen = AboutScreen::new(&about, "kestrel", "0.1.0");
        let mut ctx = PanelContext::new(&mut lcd, &bridge);
        screen.on_enter(&mut ctx).unwrap();

        ctx.poll_input();
        assert_eq!(screen.on_refresh(&mut ctx).unwrap(), Transition::Stay);

        ctx.lcd.buttons = ButtonMask::SELECT;
        ctx.poll_input();
        assert_eq!(screen.on_refresh(&mut ctx).unwrap(), Transition::Back);
        assert!(bridge.is_empty());
    }
}

//! Generic list menu

use kestrel_core::traits::{DisplayDriver, DisplayError};

use crate::menu::MenuWindow;
use crate::renderer::MenuContent;
use crate::screen::{PanelContext, PanelError, Screen, ScreenId, Transition};

/// What selecting an entry does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuAction<'a> {
    /// Queue command text for the main loop
    Command(&'a str),
    /// Open another screen
    Screen(ScreenId),
    /// Return to the parent
    Back,
}

/// One labelled entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MenuItem<'a> {
    /// Text shown in the list
    pub label: &'a str,
    /// Action on click
    pub action: MenuAction<'a>,
}

impl<'a> MenuItem<'a> {
    /// Entry that queues `command`
    pub const fn command(label: &'a str, command: &'a str) -> Self {
        Self {
            label,
            action: MenuAction::Command(command),
        }
    }

    /// Entry that opens `screen`
    pub const fn screen(label: &'a str, screen: ScreenId) -> Self {
        Self {
            label,
            action: MenuAction::Screen(screen),
        }
    }

    /// Entry that goes back
    pub const fn back(label: &'a str) -> Self {
        Self {
            label,
            action: MenuAction::Back,
        }
    }
}

/// Static list of entries with a title
pub struct MenuScreen<'a> {
    title: &'a str,
    items: &'a [MenuItem<'a>],
    window: MenuWindow,
}

impl<'a> MenuScreen<'a> {
    pub const fn new(title: &'a str, items: &'a [MenuItem<'a>]) -> Self {
        Self {
            title,
            items,
            window: MenuWindow::new(0, 0),
        }
    }

    /// Highlighted entry
    pub fn selected(&self) -> Option<&MenuItem<'a>> {
        self.items.get(self.window.current() as usize)
    }
}

impl<'a, D: DisplayDriver + ?Sized> MenuContent<D> for MenuScreen<'a> {
    fn title(&self) -> &str {
        self.title
    }

    fn display_menu_line(&mut self, row: u16, lcd: &mut D) -> Result<(), DisplayError> {
        match self.items.get(row as usize) {
            Some(item) => lcd.write(item.label),
            None => Ok(()),
        }
    }
}

impl<'a, D: DisplayDriver + ?Sized> Screen<D> for MenuScreen<'a> {
    fn window_mut(&mut self) -> &mut MenuWindow {
        &mut self.window
    }

    fn on_enter(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        let current = self.window.current();
        self.setup_menu(ctx, self.items.len() as u16);
        // keep the highlight when coming back from a child
        self.window.set_current(current);
        self.window.commit();
        self.refresh_menu(ctx, true)?;
        Ok(())
    }

    fn on_refresh(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<Transition, PanelError> {
        self.follow_encoder(ctx)?;

        let events = *ctx.events();
        if events.back {
            return Ok(Transition::Back);
        }
        if !events.clicked {
            return Ok(Transition::Stay);
        }

        match self.selected().map(|item| item.action) {
            Some(MenuAction::Command(text)) => {
                ctx.send_command(text)?;
                Ok(Transition::Stay)
            }
            Some(MenuAction::Screen(id)) => Ok(Transition::Enter(id)),
            Some(MenuAction::Back) => Ok(Transition::Back),
            None => Ok(Transition::Stay),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::renderer::tests::MockDisplay;
    use crate::screen::Navigator;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use kestrel_core::bridge::{CommandBridge, CommandInterpreter};
    use kestrel_core::input::ButtonMask;
    use std::string::{String, ToString};
    use std::vec::Vec;

    static ITEMS: [MenuItem<'static>; 4] = [
        MenuItem::command("Home all", "G28\n"),
        MenuItem::command("Park", "G0 X0\nG0 Y0\n"),
        MenuItem::screen("About", ScreenId(1)),
        MenuItem::back("Back"),
    ];

    #[derive(Default)]
    struct Log(Vec<String>);

    impl CommandInterpreter for Log {
        fn dispatch(&mut self, line: &str) {
            self.0.push(line.to_string());
        }

        fn is_halted(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_click_queues_command_lines() {
        let bridge: CommandBridge<NoopRawMutex, 8> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut menu = MenuScreen::new("Main", &ITEMS);
        {
            let mut ctx = PanelContext::new(&mut lcd, &bridge);
            menu.on_enter(&mut ctx).unwrap();

            ctx.lcd.buttons = ButtonMask::SELECT;
            ctx.poll_input();
            assert_eq!(menu.on_refresh(&mut ctx).unwrap(), Transition::Stay);

            // release, turn one detent, click again
            ctx.lcd.buttons = ButtonMask::empty();
            ctx.poll_input();
            menu.on_refresh(&mut ctx).unwrap();
            ctx.lcd.delta = 1;
            ctx.lcd.buttons = ButtonMask::SELECT;
            ctx.poll_input();
            menu.on_refresh(&mut ctx).unwrap();
        }

        let mut log = Log::default();
        let report = bridge.drain(&mut log);
        assert_eq!(report.dispatched, 3);
        assert_eq!(log.0, ["G28", "G0 X0", "G0 Y0"]);
    }

    #[test]
    fn test_screen_and_back_actions() {
        let bridge: CommandBridge<NoopRawMutex, 8> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut menu = MenuScreen::new("Main", &ITEMS);
        let mut ctx = PanelContext::new(&mut lcd, &bridge);
        menu.on_enter(&mut ctx).unwrap();

        ctx.lcd.delta = 2;
        ctx.lcd.buttons = ButtonMask::SELECT;
        ctx.poll_input();
        assert_eq!(menu.on_refresh(&mut ctx).unwrap(), Transition::Enter(ScreenId(1)));

        ctx.lcd.delta = 1;
        ctx.lcd.buttons = ButtonMask::empty();
        ctx.poll_input();
        menu.on_refresh(&mut ctx).unwrap();
        ctx.lcd.buttons = ButtonMask::SELECT;
        ctx.poll_input();
        assert_eq!(menu.on_refresh(&mut ctx).unwrap(), Transition::Back);
    }

    #[test]
    fn test_back_button() {
        let bridge: CommandBridge<NoopRawMutex, 8> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut menu = MenuScreen::new("Main", &ITEMS);
        let mut ctx = PanelContext::new(&mut lcd, &bridge);
        menu.on_enter(&mut ctx).unwrap();

        ctx.lcd.buttons = ButtonMask::PAUSE;
        ctx.poll_input();
        assert_eq!(menu.on_refresh(&mut ctx).unwrap(), Transition::Back);
    }

    #[test]
    fn test_highlight_survives_return() {
        let bridge: CommandBridge<NoopRawMutex, 8> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut root = MenuScreen::new("Main", &ITEMS);
        let mut child = MenuScreen::new("Child", &ITEMS[3..]);
        {
            let mut ctx = PanelContext::new(&mut lcd, &bridge);
            let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
            let r = nav.add(&mut root).unwrap();
            let c = nav.add(&mut child).unwrap();
            nav.start(r, &mut ctx).unwrap();

            ctx.lcd.delta = 2;
            nav.tick(&mut ctx).unwrap();
            nav.enter(c, &mut ctx).unwrap();
            nav.back(&mut ctx).unwrap();
        }
        assert_eq!(root.selected().map(|i| i.label), Some("About"));
    }

    #[test]
    fn test_lines_show_labels() {
        let bridge: CommandBridge<NoopRawMutex, 8> = CommandBridge::new();
        let mut lcd = MockDisplay::graphics();
        let mut menu = MenuScreen::new("Main", &ITEMS);
        {
            let mut ctx = PanelContext::new(&mut lcd, &bridge);
            menu.on_enter(&mut ctx).unwrap();
        }
        let writes = lcd.writes();
        assert_eq!(writes, ["Main", "Home all", "Park", "About", "Back"]);
    }
}

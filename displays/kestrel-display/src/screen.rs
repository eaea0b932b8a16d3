//! Screens and navigation
//!
//! A [`Screen`] is one page of the front panel. Screens live in an arena
//! owned by the caller and are addressed by [`ScreenId`]; the [`Navigator`]
//! keeps a stack of ids, and the parent of a screen is simply the entry
//! below it. A screen may appear on the stack only once, so navigation can
//! never loop.

use heapless::Vec;
use kestrel_core::bridge::{BridgeError, CommandSink};
use kestrel_core::input::{PanelEvents, PanelInput};
use kestrel_core::traits::{DisplayDriver, DisplayError};

use crate::menu::MenuWindow;
use crate::renderer::{MenuContent, MenuRenderer, Redraw};

/// Most screens in one arena, and the deepest stack
pub const MAX_SCREENS: usize = 8;

/// Index of a screen in the navigator's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScreenId(pub u8);

/// What the active screen asks for after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Remain active
    Stay,
    /// Return to the parent
    Back,
    /// Push another screen
    Enter(ScreenId),
}

/// Navigation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavError {
    /// Screen is already on the stack
    Cycle,
    /// No screen with that id
    UnknownScreen,
    /// Arena or stack is full
    Full,
}

/// Anything that can go wrong during a panel tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// Drawing failed
    Display(DisplayError),
    /// Command could not be queued
    Bridge(BridgeError),
    /// Navigation request rejected
    Nav(NavError),
}

impl From<DisplayError> for PanelError {
    fn from(e: DisplayError) -> Self {
        PanelError::Display(e)
    }
}

impl From<BridgeError> for PanelError {
    fn from(e: BridgeError) -> Self {
        PanelError::Bridge(e)
    }
}

impl From<NavError> for PanelError {
    fn from(e: NavError) -> Self {
        PanelError::Nav(e)
    }
}

/// Everything a screen may touch while it runs
pub struct PanelContext<'a, D: DisplayDriver + ?Sized> {
    /// The display
    pub lcd: &'a mut D,
    renderer: MenuRenderer,
    commands: &'a dyn CommandSink,
    input: PanelInput,
    events: PanelEvents,
}

impl<'a, D: DisplayDriver + ?Sized> PanelContext<'a, D> {
    /// Context for a driver, sending commands to `commands`
    pub fn new(lcd: &'a mut D, commands: &'a dyn CommandSink) -> Self {
        let renderer = MenuRenderer::for_display(&*lcd);
        let input = PanelInput::new(lcd.encoder_resolution());
        Self {
            lcd,
            renderer,
            commands,
            input,
            events: PanelEvents::default(),
        }
    }

    /// Sample the driver's input for this tick
    pub fn poll_input(&mut self) -> PanelEvents {
        self.events = self.input.poll(&mut *self.lcd);
        self.events
    }

    /// Input sampled for this tick
    pub fn events(&self) -> &PanelEvents {
        &self.events
    }

    /// Renderer in use
    pub fn renderer(&self) -> &MenuRenderer {
        &self.renderer
    }

    /// Reset a window for `rows` entries on this display
    pub fn setup_menu(&self, window: &mut MenuWindow, rows: u16) {
        window.setup(rows, self.renderer.visible_lines());
    }

    /// Render `content` through `window`
    pub fn refresh_menu<C: MenuContent<D> + ?Sized>(
        &mut self,
        window: &mut MenuWindow,
        content: &mut C,
        clear: bool,
    ) -> Result<Redraw, DisplayError> {
        self.renderer.refresh(&mut *self.lcd, window, content, clear)
    }

    /// Redraw `content` as a plain page through `window`
    pub fn refresh_screen<C: MenuContent<D> + ?Sized>(
        &mut self,
        window: &MenuWindow,
        content: &mut C,
        clear: bool,
    ) -> Result<(), DisplayError> {
        self.renderer.refresh_screen(&mut *self.lcd, window, content, clear)
    }

    /// Queue command text for the main loop
    pub fn send_command(&self, text: &str) -> Result<usize, BridgeError> {
        self.commands.send_command(text)
    }

    /// Queue `"<code> <letter><value>"` for the main loop
    pub fn send_gcode(&self, code: &str, letter: char, value: f32) -> Result<usize, BridgeError> {
        self.commands.send_gcode(code, letter, value)
    }
}

/// One page of the front panel
pub trait Screen<D: DisplayDriver + ?Sized>: MenuContent<D> {
    /// Menu window owned by this screen
    fn window_mut(&mut self) -> &mut MenuWindow;

    /// Screen became active (entered or returned to)
    fn on_enter(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError>;

    /// Panel tick while active
    fn on_refresh(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<Transition, PanelError>;

    /// Reset the window for `rows` entries
    fn setup_menu(&mut self, ctx: &PanelContext<'_, D>, rows: u16) {
        ctx.setup_menu(self.window_mut(), rows);
    }

    /// Render this screen's menu
    fn refresh_menu(&mut self, ctx: &mut PanelContext<'_, D>, clear: bool) -> Result<Redraw, DisplayError> {
        let mut window = *self.window_mut();
        let result = ctx.refresh_menu(&mut window, self, clear);
        *self.window_mut() = window;
        result
    }

    /// Render this screen as a plain page, without menu decoration
    fn refresh_screen(&mut self, ctx: &mut PanelContext<'_, D>, clear: bool) -> Result<(), DisplayError> {
        let window = *self.window_mut();
        ctx.refresh_screen(&window, self, clear)
    }

    /// Move the highlight by this tick's encoder steps, repainting if it moved
    fn follow_encoder(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<(), DisplayError> {
        let steps = ctx.events().steps;
        if self.window_mut().apply_delta(steps as i32) {
            self.refresh_menu(ctx, false)?;
        }
        Ok(())
    }
}

/// Stack-based navigation over an arena of screens
pub struct Navigator<'s, D: DisplayDriver + ?Sized> {
    screens: Vec<&'s mut dyn Screen<D>, MAX_SCREENS>,
    stack: Vec<ScreenId, MAX_SCREENS>,
}

impl<'s, D: DisplayDriver + ?Sized> Default for Navigator<'s, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s, D: DisplayDriver + ?Sized> Navigator<'s, D> {
    /// Navigator with no screens
    pub const fn new() -> Self {
        Self {
            screens: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Add a screen to the arena
    pub fn add(&mut self, screen: &'s mut dyn Screen<D>) -> Result<ScreenId, NavError> {
        let id = ScreenId(self.screens.len() as u8);
        self.screens.push(screen).map_err(|_| NavError::Full)?;
        Ok(id)
    }

    /// Active screen
    pub fn active(&self) -> Option<ScreenId> {
        self.stack.last().copied()
    }

    /// Stack depth (1 = root only)
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether `id` is on the stack
    pub fn is_open(&self, id: ScreenId) -> bool {
        self.stack.contains(&id)
    }

    /// Make `root` the only screen on the stack and enter it
    pub fn start(&mut self, root: ScreenId, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        self.check(root)?;
        self.stack.clear();
        self.stack.push(root).map_err(|_| NavError::Full)?;
        self.enter_active(ctx)
    }

    /// Push `id` and enter it
    pub fn enter(&mut self, id: ScreenId, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        self.check(id)?;
        if self.is_open(id) {
            return Err(NavError::Cycle.into());
        }
        self.stack.push(id).map_err(|_| NavError::Full)?;
        self.enter_active(ctx)
    }

    /// Pop to the parent and re-enter it
    ///
    /// Does nothing on the root.
    pub fn back(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        if self.stack.len() <= 1 {
            return Ok(());
        }
        self.stack.pop();
        self.enter_active(ctx)
    }

    /// Pop until `id` is active and re-enter it
    pub fn back_to(&mut self, id: ScreenId, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        let depth = self
            .stack
            .iter()
            .position(|open| *open == id)
            .ok_or(NavError::UnknownScreen)?;
        self.stack.truncate(depth + 1);
        self.enter_active(ctx)
    }

    /// Sample input, run the active screen and apply its transition
    ///
    /// A request to enter a screen that is already open is refused with
    /// [`NavError::Cycle`] after unwinding back to that screen.
    pub fn tick(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<Transition, PanelError> {
        let Some(active) = self.active() else {
            return Ok(Transition::Stay);
        };
        ctx.poll_input();
        let transition = self.screens[active.0 as usize].on_refresh(ctx)?;
        match transition {
            Transition::Stay => {}
            Transition::Back => self.back(ctx)?,
            Transition::Enter(id) if self.is_open(id) => {
                self.back_to(id, ctx)?;
                return Err(NavError::Cycle.into());
            }
            Transition::Enter(id) => self.enter(id, ctx)?,
        }
        Ok(transition)
    }

    fn check(&self, id: ScreenId) -> Result<(), NavError> {
        if (id.0 as usize) < self.screens.len() {
            Ok(())
        } else {
            Err(NavError::UnknownScreen)
        }
    }

    fn enter_active(&mut self, ctx: &mut PanelContext<'_, D>) -> Result<(), PanelError> {
        match self.active() {
            Some(id) => self.screens[id.0 as usize].on_enter(ctx),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::renderer::tests::{Call, MockDisplay};
    use core::cell::RefCell;
    use kestrel_core::input::ButtonMask;
    use std::string::{String, ToString};
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct Sink {
        sent: RefCell<StdVec<String>>,
    }

    impl CommandSink for Sink {
        fn send_command(&self, text: &str) -> Result<usize, BridgeError> {
            self.sent.borrow_mut().push(text.to_string());
            Ok(1)
        }
    }

    /// Screen that counts hook calls and returns a scripted transition
    struct Probe {
        window: MenuWindow,
        entered: u32,
        next: Transition,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                window: MenuWindow::default(),
                entered: 0,
                next: Transition::Stay,
            }
        }
    }

    impl MenuContent<MockDisplay> for Probe {
        fn display_menu_line(&mut self, _row: u16, lcd: &mut MockDisplay) -> Result<(), DisplayError> {
            lcd.write("probe")
        }
    }

    impl Screen<MockDisplay> for Probe {
        fn window_mut(&mut self) -> &mut MenuWindow {
            &mut self.window
        }

        fn on_enter(&mut self, ctx: &mut PanelContext<'_, MockDisplay>) -> Result<(), PanelError> {
            self.entered += 1;
            self.setup_menu(ctx, 3);
            self.refresh_menu(ctx, true)?;
            Ok(())
        }

        fn on_refresh(&mut self, ctx: &mut PanelContext<'_, MockDisplay>) -> Result<Transition, PanelError> {
            self.follow_encoder(ctx)?;
            Ok(core::mem::replace(&mut self.next, Transition::Stay))
        }
    }

    #[test]
    fn test_enter_and_back() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let mut root = Probe::new();
        let mut child = Probe::new();
        {
            let mut ctx = PanelContext::new(&mut lcd, &sink);
            let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
            let r = nav.add(&mut root).unwrap();
            let c = nav.add(&mut child).unwrap();

            nav.start(r, &mut ctx).unwrap();
            nav.enter(c, &mut ctx).unwrap();
            assert_eq!(nav.active(), Some(c));
            assert_eq!(nav.depth(), 2);

            nav.back(&mut ctx).unwrap();
            assert_eq!(nav.active(), Some(r));
            // back on the root stays put
            nav.back(&mut ctx).unwrap();
            assert_eq!(nav.active(), Some(r));
        }
        // root entered at start and again on return
        assert_eq!(root.entered, 2);
        assert_eq!(child.entered, 1);
    }

    #[test]
    fn test_enter_open_screen_is_cycle() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let mut a = Probe::new();
        let mut b = Probe::new();
        let mut ctx = PanelContext::new(&mut lcd, &sink);
        let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
        let a_id = nav.add(&mut a).unwrap();
        let b_id = nav.add(&mut b).unwrap();

        nav.start(a_id, &mut ctx).unwrap();
        nav.enter(b_id, &mut ctx).unwrap();
        assert_eq!(nav.enter(a_id, &mut ctx), Err(PanelError::Nav(NavError::Cycle)));
        assert_eq!(nav.enter(b_id, &mut ctx), Err(PanelError::Nav(NavError::Cycle)));
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn test_unknown_screen() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let mut ctx = PanelContext::new(&mut lcd, &sink);
        let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
        assert_eq!(
            nav.start(ScreenId(0), &mut ctx),
            Err(PanelError::Nav(NavError::UnknownScreen))
        );
    }

    #[test]
    fn test_tick_applies_transitions() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let mut root = Probe::new();
        let mut child = Probe::new();
        child.next = Transition::Back;
        root.next = Transition::Enter(ScreenId(1));

        let mut ctx = PanelContext::new(&mut lcd, &sink);
        let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
        let r = nav.add(&mut root).unwrap();
        nav.add(&mut child).unwrap();
        nav.start(r, &mut ctx).unwrap();

        assert_eq!(nav.tick(&mut ctx).unwrap(), Transition::Enter(ScreenId(1)));
        assert_eq!(nav.active(), Some(ScreenId(1)));
        assert_eq!(nav.tick(&mut ctx).unwrap(), Transition::Back);
        assert_eq!(nav.active(), Some(r));
        assert_eq!(nav.tick(&mut ctx).unwrap(), Transition::Stay);
    }

    #[test]
    fn test_tick_unwinds_on_cycle() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let mut root = Probe::new();
        let mut mid = Probe::new();
        let mut leaf = Probe::new();
        leaf.next = Transition::Enter(ScreenId(0));

        let mut ctx = PanelContext::new(&mut lcd, &sink);
        let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
        let r = nav.add(&mut root).unwrap();
        let m = nav.add(&mut mid).unwrap();
        let l = nav.add(&mut leaf).unwrap();
        nav.start(r, &mut ctx).unwrap();
        nav.enter(m, &mut ctx).unwrap();
        nav.enter(l, &mut ctx).unwrap();

        assert_eq!(nav.tick(&mut ctx), Err(PanelError::Nav(NavError::Cycle)));
        assert_eq!(nav.active(), Some(r));
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn test_encoder_moves_highlight() {
        let mut lcd = MockDisplay::graphics();
        lcd.delta = 2;
        let sink = Sink::default();
        let mut root = Probe::new();
        {
            let mut ctx = PanelContext::new(&mut lcd, &sink);
            let mut nav: Navigator<'_, MockDisplay> = Navigator::new();
            let r = nav.add(&mut root).unwrap();
            nav.start(r, &mut ctx).unwrap();
            nav.tick(&mut ctx).unwrap();
            assert_eq!(ctx.events().steps, 2);
        }
        assert_eq!(root.window.current(), 2);
        assert!(!root.window.changed());
    }

    #[test]
    fn test_plain_refresh_from_screen() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let mut page = Probe::new();
        {
            let mut ctx = PanelContext::new(&mut lcd, &sink);
            page.on_enter(&mut ctx).unwrap();
            ctx.lcd.calls.clear();
            page.refresh_screen(&mut ctx, true).unwrap();
        }
        assert_eq!(
            lcd.calls,
            [
                Call::Clear,
                Call::Cursor(0, 0),
                Call::Write("probe".to_string()),
                Call::Cursor(0, 1),
                Call::Write("probe".to_string()),
                Call::Cursor(0, 2),
                Call::Write("probe".to_string()),
            ]
        );
    }

    #[test]
    fn test_send_gcode_formats_value() {
        let mut lcd = MockDisplay::graphics();
        let sink = Sink::default();
        let ctx = PanelContext::new(&mut lcd, &sink);
        ctx.send_gcode("G0", 'Z', 10.0).unwrap();
        drop(ctx);
        assert_eq!(sink.sent.borrow().as_slice(), ["G0 Z10.000000".to_string()]);
    }

    #[test]
    fn test_click_edge_reaches_screen() {
        let mut lcd = MockDisplay::graphics();
        lcd.buttons = ButtonMask::SELECT;
        let sink = Sink::default();
        let mut ctx = PanelContext::new(&mut lcd, &sink);
        assert!(ctx.poll_input().clicked);
        assert!(!ctx.poll_input().clicked);
        ctx.send_command("G28\n").unwrap();
        drop(ctx);
        assert_eq!(sink.sent.borrow().as_slice(), ["G28\n".to_string()]);
    }
}

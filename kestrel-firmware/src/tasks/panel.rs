//! Front panel task
//!
//! Owns the display and the screen arena. Each tick samples input through
//! the driver, runs the active screen and applies its transition. Render
//! failures are logged and the panel carries on with the next tick.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Delay, Duration, Ticker};
use kestrel_core::config::AboutConfig;
use kestrel_core::traits::DisplayDriver;
use kestrel_display::screens::{AboutScreen, MenuItem, MenuScreen};
use kestrel_display::{NavError, Navigator, PanelContext, Screen, ScreenId, Transition};
use kestrel_drivers::display::St7789;
use kestrel_hal::eh::EhOutput;

use crate::board::PanelSpi;
use crate::channels::{Bridge, Input};

/// A GPIO output line
pub type Line = EhOutput<Output<'static>>;

/// The panel display as wired on this board
pub type PanelDisplay = St7789<PanelSpi, Line, Line, Line, Delay, &'static Input>;

const MAIN_MENU: ScreenId = ScreenId(0);
const MOTION_MENU: ScreenId = ScreenId(1);
const FLOW_MENU: ScreenId = ScreenId(2);
const ABOUT: ScreenId = ScreenId(3);

static MAIN_ITEMS: [MenuItem<'static>; 5] = [
    MenuItem::screen("Motion", MOTION_MENU),
    MenuItem::screen("Flow sensor", FLOW_MENU),
    MenuItem::screen("About", ABOUT),
    MenuItem::command("Emergency stop", "M112"),
    MenuItem::command("Clear halt", "M999"),
];

static MOTION_ITEMS: [MenuItem<'static>; 5] = [
    MenuItem::back("Back"),
    MenuItem::command("Home all", "G28"),
    MenuItem::command("Park head", "G91\nG0 Z10\nG90\nG0 X0 Y0"),
    MenuItem::command("Disable motors", "M84"),
    MenuItem::command("Report position", "M114"),
];

static FLOW_ITEMS: [MenuItem<'static>; 4] = [
    MenuItem::back("Back"),
    MenuItem::command("Status", "M407"),
    MenuItem::command("Measured extrusion", "M114"),
    MenuItem::command("Zero", "G92 E0"),
];

/// Add the screens in `ScreenId` order
fn register<'s>(
    nav: &mut Navigator<'s, PanelDisplay>,
    screens: [&'s mut dyn Screen<PanelDisplay>; 4],
) -> Result<(), NavError> {
    for screen in screens {
        nav.add(screen)?;
    }
    Ok(())
}

/// Panel task - renders screens at `refresh_hz`
#[embassy_executor::task]
pub async fn panel_task(
    mut lcd: PanelDisplay,
    bridge: &'static Bridge,
    about: &'static AboutConfig,
    refresh_hz: u8,
) {
    info!("Panel task started");

    if let Err(e) = lcd.init() {
        error!("Display init failed: {}", e);
        return;
    }
    match lcd.read_id() {
        Ok(id) => info!("Display id: {}", id),
        Err(e) => warn!("Display id read failed: {}", e),
    }
    match lcd.read_status() {
        Ok(status) => info!("Display status: {}", status),
        Err(e) => warn!("Display status read failed: {}", e),
    }
    let (width, height) = lcd.size();
    info!("Display ready: {}x{}", width, height);

    let mut main_menu = MenuScreen::new("Kestrel", &MAIN_ITEMS);
    let mut motion_menu = MenuScreen::new("Motion", &MOTION_ITEMS);
    let mut flow_menu = MenuScreen::new("Flow sensor", &FLOW_ITEMS);
    let mut about_screen = AboutScreen::new(
        about,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );

    let mut nav = Navigator::new();
    if let Err(e) = register(
        &mut nav,
        [
            &mut main_menu,
            &mut motion_menu,
            &mut flow_menu,
            &mut about_screen,
        ],
    ) {
        error!("Screen registration failed: {}", e);
        return;
    }

    let mut ctx = PanelContext::new(&mut lcd, bridge);
    if let Err(e) = nav.start(MAIN_MENU, &mut ctx) {
        warn!("Main menu render failed: {}", e);
    }

    let mut ticker = Ticker::every(Duration::from_hz(refresh_hz.max(1) as u64));
    loop {
        ticker.next().await;

        match nav.tick(&mut ctx) {
            Ok(Transition::Stay) => {}
            Ok(transition) => debug!("Panel: {} (depth {})", transition, nav.depth()),
            Err(e) => warn!("Panel tick failed: {}", e),
        }
    }
}

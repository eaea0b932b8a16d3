//! Main loop task
//!
//! Drains the command bridge every 10 ms into the machine's command
//! interpreter. The interpreter here only logs what it receives, answers the
//! flow sensor's status commands and tracks the halt state.

use core::fmt::Write as _;

use defmt::*;
use embassy_time::{Duration, Ticker};
use heapless::String;
use kestrel_core::bridge::CommandInterpreter;
use portable_atomic::{AtomicBool, Ordering};

use crate::channels::{Bridge, SharedFlow};

/// Drain interval in milliseconds
pub const DRAIN_INTERVAL_MS: u64 = 10;

/// Set by an emergency stop, cleared by a reset command
pub static HALTED: AtomicBool = AtomicBool::new(false);

/// Command interpreter for a panel without a motion core attached
pub struct LoggingInterpreter {
    flow: Option<&'static SharedFlow>,
}

impl LoggingInterpreter {
    pub fn new(flow: Option<&'static SharedFlow>) -> Self {
        Self { flow }
    }

    fn flow_command(&self, code: &str) {
        let Some(flow) = self.flow else {
            warn!("{}: no flow sensor", code);
            return;
        };
        flow.lock(|cell| {
            let mut sensor = cell.borrow_mut();
            match code {
                "M114" => info!("ok {}", defmt::Display2Format(&sensor.measured())),
                "M407" => {
                    let mut text: String<128> = String::new();
                    if write!(text, "{}", sensor.report()).is_err() {
                        warn!("M407: report truncated");
                    }
                    for line in text.lines() {
                        info!("{=str}", line);
                    }
                }
                "G92" => {
                    if let Err(e) = sensor.reset() {
                        error!("ERROR: {}", defmt::Display2Format(&e));
                    }
                }
                _ => {}
            }
        });
    }
}

impl CommandInterpreter for LoggingInterpreter {
    fn dispatch(&mut self, line: &str) {
        info!("> {=str}", line);

        let mut words = line.split_whitespace();
        match words.next() {
            Some("M112") => {
                warn!("Emergency stop");
                HALTED.store(true, Ordering::Release);
            }
            Some("M999") => {
                info!("Halt cleared");
                HALTED.store(false, Ordering::Release);
            }
            Some(code @ ("M114" | "M407")) => self.flow_command(code),
            // G92 E0 or a bare G92 zeroes the measured extrusion
            Some(code @ "G92") => {
                if words.next().is_none() || line.contains('E') {
                    self.flow_command(code);
                }
            }
            _ => {}
        }
    }

    fn is_halted(&self) -> bool {
        HALTED.load(Ordering::Acquire)
    }
}

/// Main loop task - dispatches queued panel commands in order
#[embassy_executor::task]
pub async fn main_loop_task(bridge: &'static Bridge, flow: Option<&'static SharedFlow>) {
    info!("Main loop task started");

    let mut interpreter = LoggingInterpreter::new(flow);
    let mut ticker = Ticker::every(Duration::from_millis(DRAIN_INTERVAL_MS));

    loop {
        ticker.next().await;

        let report = bridge.drain(&mut interpreter);
        if report.discarded > 0 {
            warn!(
                "Machine halted, discarded {} queued command(s)",
                report.discarded
            );
        } else if report.dispatched > 0 {
            debug!("Dispatched {} command(s)", report.dispatched);
        }
    }
}

//! Input poll task
//!
//! Samples the encoder and buttons at 1 kHz into the shared accumulator,
//! and ticks the flow sensor every tenth poll (100 Hz).

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};
use kestrel_core::input::{ButtonLines, InputSample, QuadratureEncoder};
use kestrel_hal::eh::EhInput;

use crate::channels::{Input as SharedInput, SharedFlow};

/// Poll interval in microseconds
pub const POLL_INTERVAL_US: u64 = 1_000;

/// Polls per flow sensor update
pub const FLOW_DIVIDER: u32 = 10;

/// A GPIO input line
pub type Line = EhInput<Input<'static>>;

/// Encoder on two GPIO lines
pub type Encoder = QuadratureEncoder<Line, Line>;

/// Poll task - publishes one input sample per tick
#[embassy_executor::task]
pub async fn poll_task(
    mut encoder: Option<Encoder>,
    mut buttons: ButtonLines<Line>,
    input: &'static SharedInput,
    flow: Option<&'static SharedFlow>,
) {
    info!(
        "Poll task started (encoder: {}, buttons: {}, flow sensor: {})",
        encoder.is_some(),
        buttons.len(),
        flow.is_some()
    );

    let mut ticker = Ticker::every(Duration::from_micros(POLL_INTERVAL_US));
    let mut count: u32 = 0;

    loop {
        ticker.next().await;

        let encoder_delta = encoder.as_mut().map_or(0, |e| e.poll());
        input.publish(InputSample {
            buttons: buttons.sample(),
            encoder_delta,
        });

        count = count.wrapping_add(1);
        if count % FLOW_DIVIDER != 0 {
            continue;
        }
        if let Some(flow) = flow {
            let result = flow.lock(|cell| cell.borrow_mut().update());
            if let Err(e) = result {
                error!("{}", defmt::Display2Format(&e));
            }
        }
    }
}

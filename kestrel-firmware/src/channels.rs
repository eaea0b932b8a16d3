//! Structures shared between tasks
//!
//! Each one is created once in `main`, placed in a `StaticCell` and handed to
//! the tasks by `&'static` reference.

use core::cell::RefCell;

use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C1;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, ThreadModeRawMutex};
use embassy_sync::blocking_mutex::Mutex;
use kestrel_core::bridge::CommandBridge;
use kestrel_core::input::SharedInput;
use kestrel_drivers::sensor::FlowSensor;
use kestrel_hal::eh::EhI2c;

/// Command lines the panel may queue ahead of the main loop
pub const COMMAND_QUEUE_SIZE: usize = 16;

/// Panel to main loop command queue
pub type Bridge = CommandBridge<CriticalSectionRawMutex, COMMAND_QUEUE_SIZE>;

/// Poll task to panel task input accumulator
pub type Input = SharedInput<CriticalSectionRawMutex>;

/// Flow sensor on I2C1
pub type Flow = FlowSensor<EhI2c<I2c<'static, I2C1, Blocking>>>;

/// Flow sensor shared by the poll task (updates) and the main loop (reports)
///
/// Both run on the thread-mode executor. The lock is held across I2C
/// transfers, so it must not mask interrupts.
pub type SharedFlow = Mutex<ThreadModeRawMutex, RefCell<Flow>>;

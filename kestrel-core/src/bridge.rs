//! Command bridge between the panel and the machine's main loop
//!
//! Screens compose command text in the panel context and [`enqueue`] it; the
//! main loop [`drain`]s the queue and hands each line to the machine's
//! command interpreter. Entries are dispatched strictly in insertion order,
//! duplicates included.
//!
//! The queue sits behind an `embassy-sync` blocking mutex, so producer and
//! consumer may run on different executors or cores. The lock is never held
//! while the interpreter runs.
//!
//! [`enqueue`]: CommandBridge::enqueue
//! [`drain`]: CommandBridge::drain

use core::cell::RefCell;
use core::fmt::Write as _;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::{Deque, String};

/// Longest single command line
pub const MAX_COMMAND_LEN: usize = 96;

/// One queued command line
pub type CommandLine = String<MAX_COMMAND_LEN>;

/// Errors from [`CommandBridge::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Not enough free slots for every line of the text
    Full,
    /// A line exceeds [`MAX_COMMAND_LEN`]
    LineTooLong,
}

/// Consumer of drained command lines
///
/// Parsing and validation are entirely the interpreter's business; the
/// bridge only transports text.
pub trait CommandInterpreter {
    /// Execute one command line
    fn dispatch(&mut self, line: &str);

    /// True once the machine has halted
    fn is_halted(&self) -> bool;
}

/// Producer side of the bridge, as seen by screens
pub trait CommandSink {
    /// Queue command text, one entry per line
    fn send_command(&self, text: &str) -> Result<usize, BridgeError>;

    /// Queue a single-parameter command such as `G0 Z10.000000`
    fn send_gcode(&self, code: &str, letter: char, value: f32) -> Result<usize, BridgeError> {
        let line = format_gcode(code, letter, value)?;
        self.send_command(&line)
    }
}

/// `"<code> <letter><value>"` with six decimal places
pub fn format_gcode(code: &str, letter: char, value: f32) -> Result<CommandLine, BridgeError> {
    let mut line = CommandLine::new();
    write!(line, "{} {}{:.6}", code, letter, value).map_err(|_| BridgeError::LineTooLong)?;
    Ok(line)
}

/// Outcome of one [`CommandBridge::drain`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrainReport {
    /// Lines handed to the interpreter
    pub dispatched: usize,
    /// Lines dropped because the machine halted
    pub discarded: usize,
}

/// Split command text into queue entries
///
/// Each `\n` ends a line. A single trailing newline does not produce an
/// extra empty entry; empty lines in the middle are kept.
pub fn split_commands(text: &str) -> impl Iterator<Item = &str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let present = !text.is_empty();
    body.split('\n').filter(move |_| present)
}

/// FIFO of command lines shared by the panel and the main loop
pub struct CommandBridge<M: RawMutex, const N: usize> {
    queue: Mutex<M, RefCell<Deque<CommandLine, N>>>,
}

impl<M: RawMutex, const N: usize> Default for CommandBridge<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> CommandBridge<M, N> {
    /// Create an empty bridge
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Queue every line of `text`, in order
    ///
    /// All or nothing: if any line is too long or the lines do not all fit,
    /// nothing is queued. Returns the number of entries added.
    pub fn enqueue(&self, text: &str) -> Result<usize, BridgeError> {
        let mut count = 0;
        for line in split_commands(text) {
            if line.len() > MAX_COMMAND_LEN {
                return Err(BridgeError::LineTooLong);
            }
            count += 1;
        }

        self.queue.lock(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.capacity() - queue.len() < count {
                return Err(BridgeError::Full);
            }
            for line in split_commands(text) {
                let mut entry = CommandLine::new();
                entry.push_str(line).map_err(|_| BridgeError::LineTooLong)?;
                queue.push_back(entry).map_err(|_| BridgeError::Full)?;
            }
            Ok(count)
        })
    }

    /// Dispatch queued lines until empty or halted
    ///
    /// The halt check runs after each dispatch. On halt the rest of the queue
    /// is discarded and draining stops; nothing is retried.
    pub fn drain<I: CommandInterpreter + ?Sized>(&self, interpreter: &mut I) -> DrainReport {
        let mut report = DrainReport::default();

        while let Some(line) = self.pop() {
            interpreter.dispatch(line.as_str());
            report.dispatched += 1;

            if interpreter.is_halted() {
                report.discarded = self.clear();
                break;
            }
        }

        report
    }

    /// Drop every queued line, returning how many were dropped
    pub fn clear(&self) -> usize {
        self.queue.lock(|queue| {
            let mut queue = queue.borrow_mut();
            let dropped = queue.len();
            queue.clear();
            dropped
        })
    }

    /// Number of queued lines
    pub fn len(&self) -> usize {
        self.queue.lock(|queue| queue.borrow().len())
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop(&self) -> Option<CommandLine> {
        self.queue.lock(|queue| queue.borrow_mut().pop_front())
    }
}

impl<M: RawMutex, const N: usize> CommandSink for CommandBridge<M, N> {
    fn send_command(&self, text: &str) -> Result<usize, BridgeError> {
        self.enqueue(text)
    }
}

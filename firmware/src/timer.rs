#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Connection-check timer adapter.
//!
//! The supervisor talks to [`SignalTimer`]; the timer task waits on the same
//! [`TimerSignal`]. A `Signal` holds one value, so a newer command replaces a
//! pending one and a reschedule can never fire twice.

use core::time::Duration;

use embassy_sync::signal::Signal;
use embassy_time::{Duration as TickDuration, Instant};
use tracker_core::transport::ConnectTimer;

use crate::bus::BusMutex;

/// Command sent from the supervisor to the timer task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerCommand {
    Schedule(Duration),
    Cancel,
}

pub type TimerSignal = Signal<BusMutex, TimerCommand>;

/// [`ConnectTimer`] backed by a [`TimerSignal`].
pub struct SignalTimer<'a> {
    signal: &'a TimerSignal,
}

impl<'a> SignalTimer<'a> {
    pub const fn new(signal: &'a TimerSignal) -> Self {
        Self { signal }
    }
}

impl ConnectTimer for SignalTimer<'_> {
    fn reschedule(&mut self, delay: Duration) {
        self.signal.signal(TimerCommand::Schedule(delay));
    }

    fn cancel(&mut self) {
        self.signal.signal(TimerCommand::Cancel);
    }
}

/// Converts a core duration into timer ticks, saturating on overflow.
pub fn to_ticks(delay: Duration) -> TickDuration {
    let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
    TickDuration::from_micros(micros)
}

/// Deadline the timer task should wait for after `command`, or `None` when
/// it should idle until the next command.
pub fn next_deadline(now: Instant, command: TimerCommand) -> Option<Instant> {
    match command {
        TimerCommand::Schedule(delay) => {
            Some(now.checked_add(to_ticks(delay)).unwrap_or(Instant::MAX))
        }
        TimerCommand::Cancel => None,
    }
}

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! State shared between the supervisor task and the other tasks.
//!
//! The supervisor task stores its state after every message; the timer task
//! reads it when the connection-check deadline expires so stale expiries do
//! not reach the queue. The device configuration is mirrored the same way so
//! the transport task decodes partial cloud updates against it.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicU8, Ordering};
use tracker_core::config::DeviceConfig;
use tracker_core::supervisor::{CloudSubState, ConnectionState, connection_check_due};

use crate::bus::BusMutex;

const SUB_STATE_CONNECTED: u8 = 1 << 2;
const STATE_MASK: u8 = 0b11;

/// Atomic snapshot of `(ConnectionState, CloudSubState)`.
pub struct LinkStatus {
    raw: AtomicU8,
}

impl LinkStatus {
    pub const fn new() -> Self {
        Self {
            raw: AtomicU8::new(encode(ConnectionState::LteInit, CloudSubState::CloudDisconnected)),
        }
    }

    pub fn store(&self, state: ConnectionState, sub_state: CloudSubState) {
        self.raw.store(encode(state, sub_state), Ordering::Release);
    }

    pub fn load(&self) -> (ConnectionState, CloudSubState) {
        decode(self.raw.load(Ordering::Acquire))
    }

    /// Returns `true` when an expiring connection check should raise a timeout.
    pub fn check_due(&self) -> bool {
        let (state, sub_state) = self.load();
        connection_check_due(state, sub_state)
    }
}

/// Status published by the running supervisor.
pub static LINK_STATUS: LinkStatus = LinkStatus::new();

/// Latest device configuration known to the supervisor.
pub struct ConfigSnapshot {
    config: Mutex<BusMutex, Cell<DeviceConfig>>,
}

impl ConfigSnapshot {
    pub const fn new() -> Self {
        Self {
            config: Mutex::new(Cell::new(DeviceConfig::new())),
        }
    }

    pub fn store(&self, config: DeviceConfig) {
        self.config.lock(|cell| cell.set(config));
    }

    pub fn load(&self) -> DeviceConfig {
        self.config.lock(Cell::get)
    }
}

const fn encode(state: ConnectionState, sub_state: CloudSubState) -> u8 {
    let sub = if sub_state.is_connected() {
        SUB_STATE_CONNECTED
    } else {
        0
    };
    state.to_raw() | sub
}

fn decode(raw: u8) -> (ConnectionState, CloudSubState) {
    let state = ConnectionState::from_raw(raw & STATE_MASK).unwrap_or(ConnectionState::LteInit);
    let sub_state = if raw & SUB_STATE_CONNECTED == 0 {
        CloudSubState::CloudDisconnected
    } else {
        CloudSubState::CloudConnected
    };
    (state, sub_state)
}

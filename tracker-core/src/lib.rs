#![no_std]

// Cloud connectivity core for the asset tracker.
//
// The crate owns the connection supervisor and everything it needs to stay
// portable between the MCU firmware and the host emulator. It needs neither an
// executor nor an allocator; collaborators are traits.

pub mod assistance;
pub mod backoff;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod router;
pub mod script;
pub mod supervisor;
pub mod trace;
pub mod translate;
pub mod transport;

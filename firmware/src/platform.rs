#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Collaborators wired into the firmware supervisor.
//!
//! The board has no cloud client attached yet, so the transport, codec,
//! location and boot image slots hold the core no-op implementations.

use tracker_core::config::SupervisorConfig;
use tracker_core::supervisor::{Collaborators, Platform, Supervisor};
use tracker_core::translate::TransportTranslator;
use tracker_core::transport::{NoopBootImage, NoopCloudTransport, NoopCodec, NoopLocation};

use crate::bus::OutboundPublisher;
use crate::timer::SignalTimer;

pub struct FirmwarePlatform;

impl Platform for FirmwarePlatform {
    type Transport = NoopCloudTransport;
    type Codec = NoopCodec;
    type Location = NoopLocation;
    type Timer = SignalTimer<'static>;
    type Sink = OutboundPublisher<'static>;
    type Image = NoopBootImage;
}

pub type FirmwareSupervisor = Supervisor<FirmwarePlatform>;

pub type FirmwareTranslator = TransportTranslator<NoopCodec, NoopLocation>;

/// Supervisor configuration for this build.
pub const fn supervisor_config() -> SupervisorConfig {
    SupervisorConfig::new()
}

pub fn collaborators(
    timer: SignalTimer<'static>,
    sink: OutboundPublisher<'static>,
) -> Collaborators<FirmwarePlatform> {
    Collaborators {
        transport: NoopCloudTransport::new(),
        codec: NoopCodec::new(),
        location: NoopLocation::new(),
        timer,
        sink,
        image: NoopBootImage::new(),
    }
}

pub fn translator(config: &SupervisorConfig) -> FirmwareTranslator {
    TransportTranslator::new(NoopCodec::new(), NoopLocation::new(), config)
}

//! Translation of cloud client notifications into [`CloudEvent`]s.
//!
//! Runs in the transport's own context, not on the supervisor queue. Received
//! payloads are first offered to the codec as configuration; anything that is
//! not configuration falls through to the GNSS assistance processors.

use crate::assistance::AssistanceError;
use crate::config::{DeviceConfig, SupervisorConfig};
use crate::events::{CloudError, CloudEvent};
use crate::transport::{
    CloudCodec, ConfigDecodeError, EventSink, LocationAssistance, TransportEvent,
};

/// How a received assistance payload was handled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssistanceOutcome {
    Agps,
    Pgps,
    /// No enabled processor accepted the payload.
    Unhandled {
        agps: Option<AssistanceError>,
        pgps: Option<AssistanceError>,
    },
}

/// Result of translating one notification, for logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Translation {
    Published(CloudEvent),
    /// FOTA progress notice with no cloud event counterpart.
    FotaProgress,
    /// The codec had already consumed the payload.
    AlreadyHandled,
    Assistance(AssistanceOutcome),
}

/// Stateful translator owned by the transport context.
pub struct TransportTranslator<C, L> {
    codec: C,
    location: L,
    base: DeviceConfig,
    agps: bool,
    pgps: bool,
}

impl<C, L> TransportTranslator<C, L>
where
    C: CloudCodec,
    L: LocationAssistance,
{
    pub fn new(codec: C, location: L, config: &SupervisorConfig) -> Self {
        Self {
            codec,
            location,
            base: DeviceConfig::new(),
            agps: config.agps,
            pgps: config.pgps,
        }
    }

    /// Configuration used to fill fields a received update leaves out.
    pub const fn base(&self) -> &DeviceConfig {
        &self.base
    }

    pub fn set_base(&mut self, config: DeviceConfig) {
        self.base = config;
    }

    pub fn location_mut(&mut self) -> &mut L {
        &mut self.location
    }

    /// Translates `event`, publishing the resulting cloud event on `sink`.
    pub fn translate<S>(&mut self, event: TransportEvent<'_>, sink: &mut S) -> Translation
    where
        S: EventSink + ?Sized,
    {
        let published = match event {
            TransportEvent::Connecting => CloudEvent::Connecting,
            TransportEvent::Connected => CloudEvent::Connected,
            TransportEvent::Disconnected => CloudEvent::Disconnected,
            TransportEvent::FotaDone => CloudEvent::FotaDone,
            TransportEvent::Error(err) => CloudEvent::Error(CloudError::Transport(err)),
            TransportEvent::FotaStart
            | TransportEvent::FotaErasePending
            | TransportEvent::FotaEraseDone
            | TransportEvent::FotaError => return Translation::FotaProgress,
            TransportEvent::AgpsDataReceived(data) | TransportEvent::PgpsDataReceived(data) => {
                return Translation::Assistance(self.handle_assistance(data));
            }
            TransportEvent::DataReceived(data) => match self.codec.decode_config(data, &self.base) {
                Ok(config) => {
                    self.base = config;
                    CloudEvent::ConfigReceived(config)
                }
                Err(ConfigDecodeError::Empty) => CloudEvent::ConfigEmpty,
                Err(ConfigDecodeError::AlreadyHandled) => return Translation::AlreadyHandled,
                Err(ConfigDecodeError::NotConfig) => {
                    return Translation::Assistance(self.handle_assistance(data));
                }
                Err(ConfigDecodeError::Malformed(code)) => {
                    CloudEvent::Error(CloudError::Decode(code))
                }
            },
        };
        sink.publish(published);
        Translation::Published(published)
    }

    fn handle_assistance(&mut self, data: &[u8]) -> AssistanceOutcome {
        let mut agps = None;
        if self.agps {
            match self.location.process_agps(data) {
                Ok(()) => return AssistanceOutcome::Agps,
                Err(err) => agps = Some(err),
            }
        }

        let mut pgps = None;
        if self.pgps {
            match self.location.process_pgps(data) {
                Ok(()) => return AssistanceOutcome::Pgps,
                Err(err) => pgps = Some(err),
            }
        }

        AssistanceOutcome::Unhandled { agps, pgps }
    }
}

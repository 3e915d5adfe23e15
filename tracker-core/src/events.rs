//! Event catalog exchanged between the supervisor and the rest of the tracker.
//!
//! Each producer category has its own enum; [`CloudMessage`] is the envelope
//! the router places on the supervisor queue. Every type here is `Copy` so an
//! envelope can be moved through a bounded channel without allocation.

use core::fmt;

use crate::assistance::{AssistanceRequest, PgpsEvent};
use crate::config::DeviceConfig;
use crate::transport::TransportError;

/// Identity of a producer-owned buffer, echoed back in acknowledgments.
pub type BufferId = u32;

/// Outbound payload borrowed from a producer-owned static pool.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Payload {
    pub id: BufferId,
    pub data: &'static [u8],
}

impl Payload {
    pub const fn new(id: BufferId, data: &'static [u8]) -> Self {
        Self { id, data }
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Application module events. The supervisor routes but does not act on them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AppEvent {
    Started,
    DataGet,
    ConfigGet,
}

/// Data pipeline events: outbound send requests and configuration updates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataEvent {
    DataSend(Payload),
    ConfigSend(Payload),
    ConfigGet,
    BatchSend(Payload),
    UiSend(Payload),
    NeighborCellsSend(Payload),
    AgpsRequestSend(Payload),
    ConfigInit(DeviceConfig),
    ConfigReady(DeviceConfig),
    DateTimeObtained,
}

/// Modem link-layer events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModemEvent {
    Initialized,
    LteConnected,
    LteDisconnected,
    CarrierFotaPending,
    CarrierFotaStopped,
}

/// Diagnostics producer events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DebugEvent {
    DiagnosticDataReady(Payload),
}

/// Location subsystem events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LocationEvent {
    /// The GNSS receiver asked for assistance data.
    AgpsNeeded(AssistanceRequest),
    /// Callback from the predictive assistance service.
    Pgps(PgpsEvent),
}

/// Process lifecycle events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifecycleEvent {
    ShutdownRequest,
}

/// Delivery acknowledgment for an outbound payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DataAck {
    pub id: BufferId,
    pub len: usize,
    pub sent: bool,
}

impl DataAck {
    pub const fn for_payload(payload: &Payload, sent: bool) -> Self {
        Self {
            id: payload.id,
            len: payload.len(),
            sent,
        }
    }
}

/// Error payload carried by [`CloudEvent::Error`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CloudError {
    /// Connect retries exhausted for this LTE session.
    Unreachable,
    /// The supervisor queue rejected an event.
    QueueFull,
    /// Events were dropped because the outbound bus was full.
    EventsDropped(u32),
    /// The cloud transport reported a failure.
    Transport(TransportError),
    /// A received cloud payload could not be decoded.
    Decode(i32),
    /// An outbound request could not be encoded.
    Encode(i32),
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudError::Unreachable => f.write_str("cloud unreachable"),
            CloudError::QueueFull => f.write_str("event queue full"),
            CloudError::EventsDropped(count) => write!(f, "{count} events dropped"),
            CloudError::Transport(err) => write!(f, "transport: {err}"),
            CloudError::Decode(code) => write!(f, "decode error {code}"),
            CloudError::Encode(code) => write!(f, "encode error {code}"),
        }
    }
}

/// Events published by the cloud side of the tracker.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CloudEvent {
    Connecting,
    Connected,
    Disconnected,
    ConnectionTimeout,
    ConfigReceived(DeviceConfig),
    ConfigEmpty,
    FotaDone,
    DataAck(DataAck),
    ShutdownReady,
    Error(CloudError),
}

impl CloudEvent {
    /// Short tag used in logs.
    pub const fn label(&self) -> &'static str {
        match self {
            CloudEvent::Connecting => "connecting",
            CloudEvent::Connected => "connected",
            CloudEvent::Disconnected => "disconnected",
            CloudEvent::ConnectionTimeout => "connection-timeout",
            CloudEvent::ConfigReceived(_) => "config-received",
            CloudEvent::ConfigEmpty => "config-empty",
            CloudEvent::FotaDone => "fota-done",
            CloudEvent::DataAck(_) => "data-ack",
            CloudEvent::ShutdownReady => "shutdown-ready",
            CloudEvent::Error(_) => "error",
        }
    }

    /// Returns `true` for events the supervisor itself consumes once they have
    /// been published on the bus.
    pub const fn feeds_supervisor(&self) -> bool {
        matches!(
            self,
            CloudEvent::Connected
                | CloudEvent::Disconnected
                | CloudEvent::ConnectionTimeout
                | CloudEvent::ConfigReceived(_)
        )
    }
}

impl fmt::Display for CloudEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudEvent::DataAck(ack) => write!(
                f,
                "data-ack id={} len={} sent={}",
                ack.id, ack.len, ack.sent
            ),
            CloudEvent::Error(err) => write!(f, "error ({err})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Producer category of a [`CloudMessage`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageSource {
    App,
    Data,
    Modem,
    Cloud,
    Debug,
    Location,
    Lifecycle,
}

/// Envelope placed on the supervisor queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CloudMessage {
    App(AppEvent),
    Data(DataEvent),
    Modem(ModemEvent),
    Cloud(CloudEvent),
    Debug(DebugEvent),
    Location(LocationEvent),
    Lifecycle(LifecycleEvent),
}

impl CloudMessage {
    pub const fn source(&self) -> MessageSource {
        match self {
            CloudMessage::App(_) => MessageSource::App,
            CloudMessage::Data(_) => MessageSource::Data,
            CloudMessage::Modem(_) => MessageSource::Modem,
            CloudMessage::Cloud(_) => MessageSource::Cloud,
            CloudMessage::Debug(_) => MessageSource::Debug,
            CloudMessage::Location(_) => MessageSource::Location,
            CloudMessage::Lifecycle(_) => MessageSource::Lifecycle,
        }
    }
}

impl From<AppEvent> for CloudMessage {
    fn from(event: AppEvent) -> Self {
        CloudMessage::App(event)
    }
}

impl From<DataEvent> for CloudMessage {
    fn from(event: DataEvent) -> Self {
        CloudMessage::Data(event)
    }
}

impl From<ModemEvent> for CloudMessage {
    fn from(event: ModemEvent) -> Self {
        CloudMessage::Modem(event)
    }
}

impl From<CloudEvent> for CloudMessage {
    fn from(event: CloudEvent) -> Self {
        CloudMessage::Cloud(event)
    }
}

impl From<DebugEvent> for CloudMessage {
    fn from(event: DebugEvent) -> Self {
        CloudMessage::Debug(event)
    }
}

impl From<LocationEvent> for CloudMessage {
    fn from(event: LocationEvent) -> Self {
        CloudMessage::Location(event)
    }
}

impl From<LifecycleEvent> for CloudMessage {
    fn from(event: LifecycleEvent) -> Self {
        CloudMessage::Lifecycle(event)
    }
}

//! Collaborator interfaces the supervisor drives.
//!
//! Board support code provides the cloud client, the wire codec, the GNSS
//! assistance processors, the bootloader hook and the connection-check timer.
//! The `Noop*` types stand in for collaborators that are not attached yet.

use core::fmt;
use core::time::Duration;

use crate::assistance::{AssistanceError, AssistanceRequest, PgpsRequest, PredictionId};
use crate::config::DeviceConfig;
use crate::events::{CloudEvent, Payload};

/// Outbound channel selected for a send.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SendKind {
    Data,
    Config,
    Batch,
    Ui,
    NeighborCells,
    AgpsRequest,
    PgpsRequest,
    Diagnostic,
}

impl SendKind {
    pub const fn label(self) -> &'static str {
        match self {
            SendKind::Data => "data",
            SendKind::Config => "config",
            SendKind::Batch => "batch",
            SendKind::Ui => "ui",
            SendKind::NeighborCells => "neighbor-cells",
            SendKind::AgpsRequest => "agps-request",
            SendKind::PgpsRequest => "pgps-request",
            SendKind::Diagnostic => "diagnostic",
        }
    }
}

impl fmt::Display for SendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure reported by the cloud client.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    /// The client does not implement the requested operation.
    NotSupported,
    Failed(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotSupported => f.write_str("not supported"),
            TransportError::Failed(code) => write!(f, "failed ({code})"),
        }
    }
}

/// Cloud client operations. Calls return once the request has been handed to
/// the client; outcomes arrive later as [`TransportEvent`]s.
pub trait CloudTransport {
    /// One-time client setup.
    fn init(&mut self) -> Result<(), TransportError>;

    fn connect(&mut self) -> Result<(), TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;

    fn send(&mut self, kind: SendKind, data: &[u8]) -> Result<(), TransportError>;

    /// Asks the cloud to publish the stored device configuration.
    fn request_config(&mut self) -> Result<(), TransportError>;
}

/// Notification raised by the cloud client from its own context.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransportEvent<'a> {
    Connecting,
    Connected,
    Disconnected,
    DataReceived(&'a [u8]),
    AgpsDataReceived(&'a [u8]),
    PgpsDataReceived(&'a [u8]),
    FotaStart,
    FotaErasePending,
    FotaEraseDone,
    FotaDone,
    FotaError,
    Error(TransportError),
}

impl TransportEvent<'_> {
    pub const fn label(&self) -> &'static str {
        match self {
            TransportEvent::Connecting => "connecting",
            TransportEvent::Connected => "connected",
            TransportEvent::Disconnected => "disconnected",
            TransportEvent::DataReceived(_) => "data-received",
            TransportEvent::AgpsDataReceived(_) => "agps-data-received",
            TransportEvent::PgpsDataReceived(_) => "pgps-data-received",
            TransportEvent::FotaStart => "fota-start",
            TransportEvent::FotaErasePending => "fota-erase-pending",
            TransportEvent::FotaEraseDone => "fota-erase-done",
            TransportEvent::FotaDone => "fota-done",
            TransportEvent::FotaError => "fota-error",
            TransportEvent::Error(_) => "error",
        }
    }
}

/// Outcome of decoding a received payload as device configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigDecodeError {
    /// The cloud holds no configuration for this device.
    Empty,
    /// The message was already consumed by the codec.
    AlreadyHandled,
    /// The payload is not a configuration message.
    NotConfig,
    Malformed(i32),
}

impl fmt::Display for ConfigDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDecodeError::Empty => f.write_str("configuration empty"),
            ConfigDecodeError::AlreadyHandled => f.write_str("already handled"),
            ConfigDecodeError::NotConfig => f.write_str("not a configuration message"),
            ConfigDecodeError::Malformed(code) => write!(f, "malformed ({code})"),
        }
    }
}

/// Failure encoding an outbound request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    NotSupported,
    NoData,
    Failed(i32),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::NotSupported => f.write_str("not supported"),
            EncodeError::NoData => f.write_str("no data"),
            EncodeError::Failed(code) => write!(f, "failed ({code})"),
        }
    }
}

/// Wire codec for cloud payloads.
pub trait CloudCodec {
    /// Decodes `data` as configuration, filling unspecified fields from `base`.
    fn decode_config(
        &mut self,
        data: &[u8],
        base: &DeviceConfig,
    ) -> Result<DeviceConfig, ConfigDecodeError>;

    fn encode_pgps_request(&mut self, request: &PgpsRequest) -> Result<Payload, EncodeError>;
}

/// GNSS assistance processors and the predictive service.
pub trait LocationAssistance {
    fn process_agps(&mut self, data: &[u8]) -> Result<(), AssistanceError>;

    fn process_pgps(&mut self, data: &[u8]) -> Result<(), AssistanceError>;

    /// Starts the predictive service. Called at most once per boot.
    fn init_pgps(&mut self) -> Result<(), AssistanceError>;

    /// Hands a stored prediction to the GNSS receiver.
    fn inject_prediction(
        &mut self,
        prediction: PredictionId,
        request: Option<AssistanceRequest>,
    ) -> Result<(), AssistanceError>;
}

/// Bootloader interface.
pub trait BootImage {
    /// Marks the running image as good so it is not rolled back.
    fn confirm_running_image(&mut self) -> Result<(), TransportError>;
}

/// One-shot connection-check timer. Each call replaces the pending deadline.
pub trait ConnectTimer {
    fn reschedule(&mut self, delay: Duration);

    fn cancel(&mut self);
}

/// Publisher for outbound cloud events.
pub trait EventSink {
    fn publish(&mut self, event: CloudEvent);
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn publish(&mut self, event: CloudEvent) {
        (**self).publish(event);
    }
}

/// Cloud client that accepts every request and never connects.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopCloudTransport;

impl NoopCloudTransport {
    pub const fn new() -> Self {
        Self
    }
}

impl CloudTransport for NoopCloudTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn send(&mut self, _: SendKind, _: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }

    fn request_config(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }
}

/// Codec that recognises nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopCodec;

impl NoopCodec {
    pub const fn new() -> Self {
        Self
    }
}

impl CloudCodec for NoopCodec {
    fn decode_config(
        &mut self,
        _: &[u8],
        _: &DeviceConfig,
    ) -> Result<DeviceConfig, ConfigDecodeError> {
        Err(ConfigDecodeError::NotConfig)
    }

    fn encode_pgps_request(&mut self, _: &PgpsRequest) -> Result<Payload, EncodeError> {
        Err(EncodeError::NotSupported)
    }
}

/// Assistance backend for builds without a GNSS receiver.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLocation;

impl NoopLocation {
    pub const fn new() -> Self {
        Self
    }
}

impl LocationAssistance for NoopLocation {
    fn process_agps(&mut self, _: &[u8]) -> Result<(), AssistanceError> {
        Err(AssistanceError::NotSupported)
    }

    fn process_pgps(&mut self, _: &[u8]) -> Result<(), AssistanceError> {
        Err(AssistanceError::NotSupported)
    }

    fn init_pgps(&mut self) -> Result<(), AssistanceError> {
        Ok(())
    }

    fn inject_prediction(
        &mut self,
        _: PredictionId,
        _: Option<AssistanceRequest>,
    ) -> Result<(), AssistanceError> {
        Err(AssistanceError::NotSupported)
    }
}

/// Bootloader hook for images without rollback support.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopBootImage;

impl NoopBootImage {
    pub const fn new() -> Self {
        Self
    }
}

impl BootImage for NoopBootImage {
    fn confirm_running_image(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_transport_reports_sends_as_unsupported() {
        let mut transport = NoopCloudTransport::new();
        assert_eq!(transport.init(), Ok(()));
        assert_eq!(
            transport.send(SendKind::Batch, &[0u8; 4]),
            Err(TransportError::NotSupported)
        );
    }

    #[test]
    fn noop_codec_passes_payloads_to_assistance() {
        let mut codec = NoopCodec::new();
        assert_eq!(
            codec.decode_config(b"{}", &DeviceConfig::new()),
            Err(ConfigDecodeError::NotConfig)
        );
    }
}

//! Outbound send multiplexing.
//!
//! Every producer shares the single transport. Each accepted payload results in
//! exactly one transport call and exactly one [`DataAck`] on the event sink, so
//! the producer can always release its buffer.

use crate::assistance::{PgpsEvent, PgpsRequest};
use crate::events::{
    CloudError, CloudEvent, CloudMessage, DataAck, DataEvent, DebugEvent, LocationEvent, Payload,
};
use crate::transport::{
    CloudCodec, CloudTransport, EncodeError, EventSink, SendKind, TransportError,
};

/// Outbound work carried by a message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutboundRequest {
    Payload(SendKind, Payload),
    ConfigGet,
    Pgps(PgpsRequest),
}

impl OutboundRequest {
    /// Channel the request would use, for tracing.
    pub const fn kind(&self) -> SendKind {
        match self {
            OutboundRequest::Payload(kind, _) => *kind,
            OutboundRequest::ConfigGet => SendKind::Config,
            OutboundRequest::Pgps(_) => SendKind::PgpsRequest,
        }
    }
}

/// Extracts the outbound request carried by `message`, if any.
#[must_use]
pub fn outbound_request(message: &CloudMessage) -> Option<OutboundRequest> {
    let request = match message {
        CloudMessage::Data(event) => match *event {
            DataEvent::DataSend(payload) => OutboundRequest::Payload(SendKind::Data, payload),
            DataEvent::ConfigSend(payload) => OutboundRequest::Payload(SendKind::Config, payload),
            DataEvent::BatchSend(payload) => OutboundRequest::Payload(SendKind::Batch, payload),
            DataEvent::UiSend(payload) => OutboundRequest::Payload(SendKind::Ui, payload),
            DataEvent::NeighborCellsSend(payload) => {
                OutboundRequest::Payload(SendKind::NeighborCells, payload)
            }
            DataEvent::AgpsRequestSend(payload) => {
                OutboundRequest::Payload(SendKind::AgpsRequest, payload)
            }
            DataEvent::ConfigGet => OutboundRequest::ConfigGet,
            _ => return None,
        },
        CloudMessage::Debug(DebugEvent::DiagnosticDataReady(payload)) => {
            OutboundRequest::Payload(SendKind::Diagnostic, *payload)
        }
        CloudMessage::Location(LocationEvent::Pgps(PgpsEvent::Request(request))) => {
            OutboundRequest::Pgps(*request)
        }
        _ => return None,
    };
    Some(request)
}

/// Maps a transport result to the delivery flag reported in the ack.
///
/// A client that does not implement a channel still consumes the payload, so
/// `NotSupported` counts as delivered.
pub const fn delivered(result: Result<(), TransportError>) -> bool {
    matches!(result, Ok(()) | Err(TransportError::NotSupported))
}

/// Sends `payload` and publishes its acknowledgment.
pub fn send_payload<T, S>(
    transport: &mut T,
    sink: &mut S,
    kind: SendKind,
    payload: &Payload,
) -> DataAck
where
    T: CloudTransport + ?Sized,
    S: EventSink + ?Sized,
{
    let result = transport.send(kind, payload.data);
    let ack = DataAck::for_payload(payload, delivered(result));
    sink.publish(CloudEvent::DataAck(ack));
    ack
}

/// Result of forwarding a predictive-service request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PgpsOutcome {
    Sent(DataAck),
    /// The codec has nothing to send for this request.
    Skipped(EncodeError),
    /// Encoding failed; an error event was published.
    EncodeFailed(EncodeError),
}

/// Encodes a predictive-service request and sends it on the P-GPS channel.
pub fn send_pgps_request<T, C, S>(
    transport: &mut T,
    codec: &mut C,
    sink: &mut S,
    request: &PgpsRequest,
) -> PgpsOutcome
where
    T: CloudTransport + ?Sized,
    C: CloudCodec + ?Sized,
    S: EventSink + ?Sized,
{
    match codec.encode_pgps_request(request) {
        Ok(payload) => {
            PgpsOutcome::Sent(send_payload(transport, sink, SendKind::PgpsRequest, &payload))
        }
        Err(err @ (EncodeError::NotSupported | EncodeError::NoData)) => PgpsOutcome::Skipped(err),
        Err(err @ EncodeError::Failed(code)) => {
            sink.publish(CloudEvent::Error(CloudError::Encode(code)));
            PgpsOutcome::EncodeFailed(err)
        }
    }
}

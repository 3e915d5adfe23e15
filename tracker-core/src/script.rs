//! Line-oriented event script used to drive the supervisor off-target.
//!
//! ```text
//! modem lte-connected
//! cloud connected
//! data send 7 120
//! tick 64
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Payload lengths refer
//! to a shared zero-filled buffer, so no allocation is needed.

use core::fmt;

use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, eof, preceded, terminated};
use winnow::error::ModalResult;
use winnow::prelude::*;

use crate::assistance::{AssistanceRequest, PgpsEvent};
use crate::events::{
    CloudEvent, CloudMessage, DataEvent, DebugEvent, LifecycleEvent, LocationEvent, ModemEvent,
    Payload,
};

/// Largest payload length a script line may request.
pub const SCRIPT_PAYLOAD_MAX: usize = 512;

static FILLER: [u8; SCRIPT_PAYLOAD_MAX] = [0; SCRIPT_PAYLOAD_MAX];

/// Transport behaviour selected by `fail`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FailMode {
    #[default]
    None,
    Connect,
    Send,
}

/// One parsed script line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptCommand {
    /// Message routed to the supervisor.
    Message(CloudMessage),
    /// Advances the virtual clock.
    Tick(u32),
    Fail(FailMode),
    Status,
}

/// Rejected script line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptError {
    /// Byte offset where parsing stopped.
    pub offset: usize,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised command at column {}", self.offset + 1)
    }
}

/// Parses one script line. Returns `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<ScriptCommand>, ScriptError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let lead = line.len() - line.trim_start().len();
    terminated(command, (space0, eof))
        .parse(trimmed)
        .map(Some)
        .map_err(|err| ScriptError {
            offset: lead + err.offset(),
        })
}

fn command(input: &mut &str) -> ModalResult<ScriptCommand> {
    alt((
        preceded(("modem", space1), modem).map(message),
        preceded(("cloud", space1), cloud).map(message),
        preceded(("data", space1), data).map(message),
        preceded(("location", space1), location).map(message),
        preceded("debug", (arg_u32, arg_len)).map(|(id, len)| {
            message(DebugEvent::DiagnosticDataReady(payload(id, len)).into())
        }),
        "shutdown".value(ScriptCommand::Message(LifecycleEvent::ShutdownRequest.into())),
        preceded("tick", arg_u32).map(ScriptCommand::Tick),
        preceded(("fail", space1), fail_mode).map(ScriptCommand::Fail),
        "status".value(ScriptCommand::Status),
    ))
    .parse_next(input)
}

fn message(message: CloudMessage) -> ScriptCommand {
    ScriptCommand::Message(message)
}

fn modem(input: &mut &str) -> ModalResult<CloudMessage> {
    alt((
        "initialized".value(ModemEvent::Initialized),
        "lte-connected".value(ModemEvent::LteConnected),
        "lte-disconnected".value(ModemEvent::LteDisconnected),
        "fota-pending".value(ModemEvent::CarrierFotaPending),
        "fota-stopped".value(ModemEvent::CarrierFotaStopped),
    ))
    .map(CloudMessage::from)
    .parse_next(input)
}

fn cloud(input: &mut &str) -> ModalResult<CloudMessage> {
    alt((
        "connected".value(CloudEvent::Connected),
        "disconnected".value(CloudEvent::Disconnected),
        "timeout".value(CloudEvent::ConnectionTimeout),
    ))
    .map(CloudMessage::from)
    .parse_next(input)
}

fn data(input: &mut &str) -> ModalResult<CloudMessage> {
    alt((
        "config-get".value(DataEvent::ConfigGet),
        "date-time".value(DataEvent::DateTimeObtained),
        (data_send, arg_u32, arg_len).map(|(send, id, len)| send(payload(id, len))),
    ))
    .map(CloudMessage::from)
    .parse_next(input)
}

fn data_send(input: &mut &str) -> ModalResult<fn(Payload) -> DataEvent> {
    alt((
        "send".value(DataEvent::DataSend as fn(Payload) -> DataEvent),
        "config-send".value(DataEvent::ConfigSend as fn(Payload) -> DataEvent),
        "batch".value(DataEvent::BatchSend as fn(Payload) -> DataEvent),
        "ui".value(DataEvent::UiSend as fn(Payload) -> DataEvent),
        "neighbor-cells".value(DataEvent::NeighborCellsSend as fn(Payload) -> DataEvent),
        "agps-request".value(DataEvent::AgpsRequestSend as fn(Payload) -> DataEvent),
    ))
    .parse_next(input)
}

fn location(input: &mut &str) -> ModalResult<CloudMessage> {
    alt((
        preceded("agps-needed", request).map(LocationEvent::AgpsNeeded),
        preceded("pgps-available", arg_u16)
            .map(|prediction| LocationEvent::Pgps(PgpsEvent::Available(prediction))),
        preceded("pgps-request", request).map(|req| LocationEvent::Pgps(PgpsEvent::Request(req))),
    ))
    .map(CloudMessage::from)
    .parse_next(input)
}

fn request(input: &mut &str) -> ModalResult<AssistanceRequest> {
    (arg_u16, arg_u16, arg_u16, arg_u32)
        .map(|(count, interval, day, time)| AssistanceRequest::new(count, interval, day, time))
        .parse_next(input)
}

fn fail_mode(input: &mut &str) -> ModalResult<FailMode> {
    alt((
        "connect".value(FailMode::Connect),
        "send".value(FailMode::Send),
        "none".value(FailMode::None),
    ))
    .parse_next(input)
}

fn arg_u16(input: &mut &str) -> ModalResult<u16> {
    preceded(space1, dec_uint).parse_next(input)
}

fn arg_u32(input: &mut &str) -> ModalResult<u32> {
    preceded(space1, dec_uint).parse_next(input)
}

fn arg_len(input: &mut &str) -> ModalResult<u16> {
    arg_u16
        .verify(|len: &u16| usize::from(*len) <= SCRIPT_PAYLOAD_MAX)
        .parse_next(input)
}

fn payload(id: u32, len: u16) -> Payload {
    let data = FILLER.get(..usize::from(len)).unwrap_or(&[]);
    Payload::new(id, data)
}

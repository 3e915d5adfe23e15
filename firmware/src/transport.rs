// The sender and constructors are only reached once a cloud client driver is attached.
#![allow(dead_code)]

//! Owned transport notifications.
//!
//! The cloud client raises notices from its own context. Payloads are copied
//! into fixed frames so the notice can cross the channel to the transport
//! task, which lends them back out as [`TransportEvent`]s.
//!
//! A board's cloud client driver hooks in through a [`NoticeSender`] taken
//! from the runtime's `NOTICES` channel. It builds payload notices with
//! [`TransportNotice::data`], [`TransportNotice::agps`] or
//! [`TransportNotice::pgps`] and sends them. Until a driver is attached
//! nothing feeds the channel and the transport task idles.

use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::Vec;
use tracker_core::events::CloudEvent;
use tracker_core::translate::{Translation, TransportTranslator};
use tracker_core::transport::{
    CloudCodec, EventSink, LocationAssistance, TransportError, TransportEvent,
};

use crate::bus::BusMutex;
use crate::status::ConfigSnapshot;

/// Largest payload carried by a single notice.
pub const TRANSPORT_FRAME_SIZE: usize = 512;

/// Depth of the notice channel.
pub const NOTICE_DEPTH: usize = 4;

pub type Frame = Vec<u8, TRANSPORT_FRAME_SIZE>;

pub type NoticeChannel = Channel<BusMutex, TransportNotice, NOTICE_DEPTH>;

/// Handle a cloud client driver uses to raise notices.
pub type NoticeSender<'a> = Sender<'a, BusMutex, TransportNotice, NOTICE_DEPTH>;

pub type NoticeReceiver<'a> = Receiver<'a, BusMutex, TransportNotice, NOTICE_DEPTH>;

/// Payload larger than [`TRANSPORT_FRAME_SIZE`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameTooLarge {
    pub len: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportNotice {
    Connecting,
    Connected,
    Disconnected,
    DataReceived(Frame),
    AgpsDataReceived(Frame),
    PgpsDataReceived(Frame),
    FotaStart,
    FotaErasePending,
    FotaEraseDone,
    FotaDone,
    FotaError,
    Error(TransportError),
}

impl TransportNotice {
    /// Copies `bytes` into a frame.
    pub fn frame(bytes: &[u8]) -> Result<Frame, FrameTooLarge> {
        Frame::from_slice(bytes).map_err(|_| FrameTooLarge { len: bytes.len() })
    }

    pub fn data(bytes: &[u8]) -> Result<Self, FrameTooLarge> {
        Self::frame(bytes).map(TransportNotice::DataReceived)
    }

    pub fn agps(bytes: &[u8]) -> Result<Self, FrameTooLarge> {
        Self::frame(bytes).map(TransportNotice::AgpsDataReceived)
    }

    pub fn pgps(bytes: &[u8]) -> Result<Self, FrameTooLarge> {
        Self::frame(bytes).map(TransportNotice::PgpsDataReceived)
    }

    pub fn as_event(&self) -> TransportEvent<'_> {
        match self {
            TransportNotice::Connecting => TransportEvent::Connecting,
            TransportNotice::Connected => TransportEvent::Connected,
            TransportNotice::Disconnected => TransportEvent::Disconnected,
            TransportNotice::DataReceived(frame) => TransportEvent::DataReceived(frame),
            TransportNotice::AgpsDataReceived(frame) => TransportEvent::AgpsDataReceived(frame),
            TransportNotice::PgpsDataReceived(frame) => TransportEvent::PgpsDataReceived(frame),
            TransportNotice::FotaStart => TransportEvent::FotaStart,
            TransportNotice::FotaErasePending => TransportEvent::FotaErasePending,
            TransportNotice::FotaEraseDone => TransportEvent::FotaEraseDone,
            TransportNotice::FotaDone => TransportEvent::FotaDone,
            TransportNotice::FotaError => TransportEvent::FotaError,
            TransportNotice::Error(err) => TransportEvent::Error(*err),
        }
    }
}

/// Translates `notice` against the shared configuration.
///
/// A decoded cloud update is written back to `config` straight away so a
/// following update builds on it even before the supervisor has seen it.
pub fn translate_notice<C, L, S>(
    translator: &mut TransportTranslator<C, L>,
    config: &ConfigSnapshot,
    notice: &TransportNotice,
    sink: &mut S,
) -> Translation
where
    C: CloudCodec,
    L: LocationAssistance,
    S: EventSink,
{
    translator.set_base(config.load());
    let translation = translator.translate(notice.as_event(), sink);
    if let Translation::Published(CloudEvent::ConfigReceived(update)) = translation {
        config.store(update);
    }
    translation
}

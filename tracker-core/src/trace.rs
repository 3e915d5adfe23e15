//! Bounded history of supervisor transitions and side effects.
//!
//! Records are kept in a fixed-size ring so the core never allocates. The
//! firmware drains new records into its log after each message; the emulator
//! prints them.

use core::fmt;

use heapless::HistoryBuf;

use crate::assistance::{AssistanceError, PgpsEvent, PredictionId};
use crate::events::BufferId;
use crate::supervisor::{CloudSubState, ConnectionState};
use crate::transport::{EncodeError, SendKind, TransportError};

/// Number of trace records retained.
pub const TRACE_CAPACITY: usize = 64;

/// Monotonic identifier assigned to each record. Wraps on overflow.
pub type EventId = u32;

/// Something the supervisor did or decided.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TraceEvent {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    SubStateChanged {
        from: CloudSubState,
        to: CloudSubState,
    },
    SetupComplete,
    SetupFailed(TransportError),
    ConnectAttempt {
        retries: u8,
    },
    ConnectFailed(TransportError),
    Unreachable {
        retries: u8,
    },
    DisconnectFailed(TransportError),
    TimerArmed {
        delay_secs: u64,
    },
    TimerCancelled,
    StaleTimeout,
    Sent {
        kind: SendKind,
        id: BufferId,
        len: usize,
        sent: bool,
    },
    SendIgnored(SendKind),
    ConfigRequested,
    ConfigRequestFailed(TransportError),
    ConfigUpdated,
    AssistanceStored,
    PgpsInitialized,
    PgpsInitFailed(AssistanceError),
    PgpsNotice(PgpsEvent),
    PredictionInjected(PredictionId),
    PredictionInjectFailed(AssistanceError),
    PgpsRequestSkipped(EncodeError),
    PgpsRequestEncodeFailed(EncodeError),
    ShutdownAcknowledged,
    IgnoredAfterShutdown,
}

impl TraceEvent {
    pub const fn label(&self) -> &'static str {
        match self {
            TraceEvent::StateChanged { .. } => "state",
            TraceEvent::SubStateChanged { .. } => "sub-state",
            TraceEvent::SetupComplete => "setup-complete",
            TraceEvent::SetupFailed(_) => "setup-failed",
            TraceEvent::ConnectAttempt { .. } => "connect",
            TraceEvent::ConnectFailed(_) => "connect-failed",
            TraceEvent::Unreachable { .. } => "unreachable",
            TraceEvent::DisconnectFailed(_) => "disconnect-failed",
            TraceEvent::TimerArmed { .. } => "timer-armed",
            TraceEvent::TimerCancelled => "timer-cancelled",
            TraceEvent::StaleTimeout => "stale-timeout",
            TraceEvent::Sent { .. } => "sent",
            TraceEvent::SendIgnored(_) => "send-ignored",
            TraceEvent::ConfigRequested => "config-requested",
            TraceEvent::ConfigRequestFailed(_) => "config-request-failed",
            TraceEvent::ConfigUpdated => "config-updated",
            TraceEvent::AssistanceStored => "assistance-stored",
            TraceEvent::PgpsInitialized => "pgps-initialized",
            TraceEvent::PgpsInitFailed(_) => "pgps-init-failed",
            TraceEvent::PgpsNotice(_) => "pgps-notice",
            TraceEvent::PredictionInjected(_) => "prediction-injected",
            TraceEvent::PredictionInjectFailed(_) => "prediction-inject-failed",
            TraceEvent::PgpsRequestSkipped(_) => "pgps-request-skipped",
            TraceEvent::PgpsRequestEncodeFailed(_) => "pgps-request-encode-failed",
            TraceEvent::ShutdownAcknowledged => "shutdown-ack",
            TraceEvent::IgnoredAfterShutdown => "ignored-after-shutdown",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label();
        match self {
            TraceEvent::StateChanged { from, to } => write!(f, "{label} {from} -> {to}"),
            TraceEvent::SubStateChanged { from, to } => write!(f, "{label} {from} -> {to}"),
            TraceEvent::ConnectAttempt { retries } | TraceEvent::Unreachable { retries } => {
                write!(f, "{label} retries={retries}")
            }
            TraceEvent::TimerArmed { delay_secs } => write!(f, "{label} {delay_secs}s"),
            TraceEvent::Sent {
                kind,
                id,
                len,
                sent,
            } => write!(f, "{label} {kind} id={id} len={len} ok={sent}"),
            TraceEvent::SendIgnored(kind) => write!(f, "{label} {kind}"),
            TraceEvent::SetupFailed(err)
            | TraceEvent::ConnectFailed(err)
            | TraceEvent::DisconnectFailed(err)
            | TraceEvent::ConfigRequestFailed(err) => write!(f, "{label} ({err})"),
            TraceEvent::PgpsInitFailed(err) | TraceEvent::PredictionInjectFailed(err) => {
                write!(f, "{label} ({err})")
            }
            TraceEvent::PgpsRequestSkipped(err) | TraceEvent::PgpsRequestEncodeFailed(err) => {
                write!(f, "{label} ({err})")
            }
            TraceEvent::PgpsNotice(event) => write!(f, "{label} {}", event.label()),
            TraceEvent::PredictionInjected(prediction) => write!(f, "{label} #{prediction}"),
            _ => f.write_str(label),
        }
    }
}

/// Single entry stored in the trace ring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TraceRecord {
    pub id: EventId,
    pub event: TraceEvent,
}

/// Fixed-capacity trace ring.
pub struct TraceRing<const CAPACITY: usize = TRACE_CAPACITY> {
    ring: HistoryBuf<TraceRecord, CAPACITY>,
    next_id: EventId,
}

impl<const CAPACITY: usize> TraceRing<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_id: 0,
        }
    }

    /// Appends an event, evicting the oldest record when full.
    pub fn record(&mut self, event: TraceEvent) -> EventId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.ring.write(TraceRecord { id, event });
        id
    }

    /// Identifier the next record will receive.
    pub const fn next_id(&self) -> EventId {
        self.next_id
    }

    pub fn oldest_first(&self) -> impl Iterator<Item = &TraceRecord> + '_ {
        self.ring.oldest_ordered()
    }

    /// Records written since `cursor` (a value previously returned by
    /// [`Self::next_id`]), oldest first. Evicted records are skipped.
    pub fn since(&self, cursor: EventId) -> impl Iterator<Item = &TraceRecord> + '_ {
        let pending = usize::try_from(self.next_id.wrapping_sub(cursor)).unwrap_or(usize::MAX);
        let skip = self.ring.len().saturating_sub(pending);
        self.ring.oldest_ordered().skip(skip)
    }

    pub fn latest(&self) -> Option<&TraceRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for TraceRing<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

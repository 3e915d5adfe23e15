//! Assisted-GPS bookkeeping owned by the supervisor.
//!
//! The GNSS receiver announces what assistance it needs; the predictive
//! service later reports that a prediction is available and the supervisor
//! injects it together with the most recent request.

use core::fmt;

/// Assistance descriptor shared by A-GPS needs and P-GPS requests.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AssistanceRequest {
    /// Number of predictions requested.
    pub count: u16,
    /// Prediction period in minutes.
    pub interval: u16,
    /// GPS day of the first prediction.
    pub day: u16,
    /// GPS time of day, seconds.
    pub time: u32,
}

impl AssistanceRequest {
    pub const fn new(count: u16, interval: u16, day: u16, time: u32) -> Self {
        Self {
            count,
            interval,
            day,
            time,
        }
    }
}

/// Request the predictive service wants forwarded to the cloud.
pub type PgpsRequest = AssistanceRequest;

/// Opaque handle to a stored prediction.
pub type PredictionId = u16;

/// Notifications raised by the predictive assistance service.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PgpsEvent {
    Init,
    Unavailable,
    Loading,
    Ready,
    Available(PredictionId),
    Request(PgpsRequest),
}

impl PgpsEvent {
    pub const fn label(&self) -> &'static str {
        match self {
            PgpsEvent::Init => "pgps-init",
            PgpsEvent::Unavailable => "pgps-unavailable",
            PgpsEvent::Loading => "pgps-loading",
            PgpsEvent::Ready => "pgps-ready",
            PgpsEvent::Available(_) => "pgps-available",
            PgpsEvent::Request(_) => "pgps-request",
        }
    }
}

/// Failure reported by a [`crate::transport::LocationAssistance`] implementation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssistanceError {
    /// The payload is not assistance data for this processor.
    Rejected,
    /// The processor is compiled out or not configured.
    NotSupported,
    Failed(i32),
}

impl fmt::Display for AssistanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistanceError::Rejected => f.write_str("payload rejected"),
            AssistanceError::NotSupported => f.write_str("not supported"),
            AssistanceError::Failed(code) => write!(f, "failed ({code})"),
        }
    }
}

/// Pending request slot and predictive-service initialisation gate.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AssistanceBridge {
    pending: Option<AssistanceRequest>,
    time_known: bool,
    pgps_initialized: bool,
}

impl AssistanceBridge {
    pub const fn new() -> Self {
        Self {
            pending: None,
            time_known: false,
            pgps_initialized: false,
        }
    }

    /// Stores the latest assistance need, replacing any earlier one.
    pub fn store_request(&mut self, request: AssistanceRequest) {
        self.pending = Some(request);
    }

    pub fn pending(&self) -> Option<&AssistanceRequest> {
        self.pending.as_ref()
    }

    /// Consumes the pending request.
    pub fn take_request(&mut self) -> Option<AssistanceRequest> {
        self.pending.take()
    }

    /// Records that wall-clock time is available.
    pub fn mark_time_known(&mut self) {
        self.time_known = true;
    }

    pub const fn time_known(&self) -> bool {
        self.time_known
    }

    pub const fn pgps_initialized(&self) -> bool {
        self.pgps_initialized
    }

    /// Returns `true` when the predictive service should be started now,
    /// given whether the cloud session is currently up.
    pub const fn pgps_init_due(&self, cloud_connected: bool) -> bool {
        cloud_connected && self.time_known && !self.pgps_initialized
    }

    pub fn mark_pgps_initialized(&mut self) {
        self.pgps_initialized = true;
    }
}

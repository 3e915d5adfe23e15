//! Cloud connection supervisor.
//!
//! A nested state machine: the outer [`ConnectionState`] follows the modem,
//! the inner [`CloudSubState`] follows the cloud session while LTE is up. The
//! supervisor consumes one [`CloudMessage`] at a time, drives the collaborators
//! described in [`crate::transport`] and records what it did in a
//! [`TraceRing`].
//!
//! Within `LteConnected` the sub-state handler runs first, then the
//! `LteConnected` handler, then the handler shared by all states.

mod state;

pub use state::{CloudSubState, ConnectionState, connection_check_due};

use core::fmt;
use core::time::Duration;

use crate::assistance::{AssistanceBridge, PgpsEvent};
use crate::backoff::BackoffSchedule;
use crate::config::{ConfigError, DeviceConfig, SupervisorConfig};
use crate::dispatch::{self, OutboundRequest, PgpsOutcome};
use crate::events::{
    CloudError, CloudEvent, CloudMessage, DataEvent, LifecycleEvent, LocationEvent, ModemEvent,
};
use crate::trace::{TraceEvent, TraceRing};
use crate::transport::{
    BootImage, CloudCodec, CloudTransport, ConnectTimer, EventSink, LocationAssistance,
    TransportError,
};

/// Bundle of collaborator types a supervisor is built from.
pub trait Platform {
    type Transport: CloudTransport;
    type Codec: CloudCodec;
    type Location: LocationAssistance;
    type Timer: ConnectTimer;
    type Sink: EventSink;
    type Image: BootImage;
}

/// Collaborator instances owned by the supervisor.
pub struct Collaborators<P: Platform> {
    pub transport: P::Transport,
    pub codec: P::Codec,
    pub location: P::Location,
    pub timer: P::Timer,
    pub sink: P::Sink,
    pub image: P::Image,
}

/// Fatal supervisor failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SupervisorError {
    /// One-time transport or boot image setup failed.
    Setup(TransportError),
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorError::Setup(err) => write!(f, "setup failed: {err}"),
        }
    }
}

/// Serialises modem, cloud and data events into connection management and
/// outbound sends.
pub struct Supervisor<P: Platform> {
    parts: Collaborators<P>,
    config: SupervisorConfig,
    backoff: BackoffSchedule,
    state: ConnectionState,
    sub_state: CloudSubState,
    retries: u8,
    device_config: DeviceConfig,
    assistance: AssistanceBridge,
    trace: TraceRing,
}

impl<P: Platform> Supervisor<P> {
    /// Builds a supervisor in `LteInit`.
    pub fn new(parts: Collaborators<P>, config: SupervisorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            parts,
            config,
            backoff: BackoffSchedule::new(),
            state: ConnectionState::LteInit,
            sub_state: CloudSubState::CloudDisconnected,
            retries: 0,
            device_config: DeviceConfig::new(),
            assistance: AssistanceBridge::new(),
            trace: TraceRing::new(),
        })
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    pub const fn sub_state(&self) -> CloudSubState {
        self.sub_state
    }

    pub const fn retries(&self) -> u8 {
        self.retries
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Last known device configuration.
    pub const fn device_config(&self) -> &DeviceConfig {
        &self.device_config
    }

    pub const fn assistance(&self) -> &AssistanceBridge {
        &self.assistance
    }

    pub const fn trace(&self) -> &TraceRing {
        &self.trace
    }

    pub const fn parts(&self) -> &Collaborators<P> {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut Collaborators<P> {
        &mut self.parts
    }

    /// Processes one message to completion.
    ///
    /// Only a failed one-time setup is reported as an error; everything else
    /// is traced or published on the sink.
    pub fn handle(&mut self, message: CloudMessage) -> Result<(), SupervisorError> {
        let state = self.state;
        let sub_state = self.sub_state;

        if state == ConnectionState::Shutdown {
            self.trace.record(TraceEvent::IgnoredAfterShutdown);
            return Ok(());
        }

        match state {
            ConnectionState::LteInit => self.on_lte_init(&message)?,
            ConnectionState::LteDisconnected => self.on_lte_disconnected(&message),
            ConnectionState::LteConnected => {
                match sub_state {
                    CloudSubState::CloudConnected => self.on_cloud_connected(&message),
                    CloudSubState::CloudDisconnected => self.on_cloud_disconnected(&message),
                }
                self.on_lte_connected(&message);
            }
            ConnectionState::Shutdown => {}
        }

        let connected = state == ConnectionState::LteConnected && sub_state.is_connected();
        if !connected && let Some(request) = dispatch::outbound_request(&message) {
            self.trace.record(TraceEvent::SendIgnored(request.kind()));
        }

        self.on_all_states(&message, state, sub_state);
        self.maybe_init_pgps();
        Ok(())
    }

    fn on_lte_init(&mut self, message: &CloudMessage) -> Result<(), SupervisorError> {
        if matches!(message, CloudMessage::Modem(ModemEvent::Initialized)) {
            self.setup()?;
            self.set_state(ConnectionState::LteDisconnected);
        }
        Ok(())
    }

    fn on_lte_disconnected(&mut self, message: &CloudMessage) {
        if matches!(message, CloudMessage::Modem(ModemEvent::LteConnected))
            && self.set_state(ConnectionState::LteConnected)
        {
            self.connect();
        }
    }

    fn on_lte_connected(&mut self, message: &CloudMessage) {
        match message {
            CloudMessage::Modem(ModemEvent::LteDisconnected) => {
                self.set_state(ConnectionState::LteDisconnected);
                self.disconnect();
            }
            CloudMessage::Modem(ModemEvent::CarrierFotaPending) => {
                self.set_sub_state(CloudSubState::CloudDisconnected);
                self.disconnect();
            }
            CloudMessage::Modem(ModemEvent::CarrierFotaStopped) => self.connect(),
            _ => {}
        }
    }

    fn on_cloud_disconnected(&mut self, message: &CloudMessage) {
        match message {
            CloudMessage::Cloud(CloudEvent::Connected) => {
                if self.set_sub_state(CloudSubState::CloudConnected) {
                    self.retries = 0;
                    self.cancel_timer();
                }
            }
            CloudMessage::Cloud(CloudEvent::ConnectionTimeout) => self.connect(),
            _ => {}
        }
    }

    fn on_cloud_connected(&mut self, message: &CloudMessage) {
        if matches!(message, CloudMessage::Cloud(CloudEvent::Disconnected)) {
            if self.set_sub_state(CloudSubState::CloudDisconnected) {
                self.arm_timer(Duration::ZERO);
            }
            return;
        }

        if let Some(request) = dispatch::outbound_request(message) {
            self.dispatch(request);
        }
    }

    fn on_all_states(
        &mut self,
        message: &CloudMessage,
        state: ConnectionState,
        sub_state: CloudSubState,
    ) {
        match message {
            CloudMessage::Lifecycle(LifecycleEvent::ShutdownRequest) => self.shutdown(),
            CloudMessage::Data(DataEvent::ConfigInit(config) | DataEvent::ConfigReady(config))
            | CloudMessage::Cloud(CloudEvent::ConfigReceived(config)) => {
                self.device_config = *config;
                self.trace.record(TraceEvent::ConfigUpdated);
            }
            CloudMessage::Data(DataEvent::DateTimeObtained) => self.assistance.mark_time_known(),
            CloudMessage::Location(LocationEvent::AgpsNeeded(request)) => {
                self.assistance.store_request(*request);
                self.trace.record(TraceEvent::AssistanceStored);
            }
            CloudMessage::Location(LocationEvent::Pgps(event)) => self.on_pgps(*event),
            CloudMessage::Cloud(CloudEvent::ConnectionTimeout)
                if !connection_check_due(state, sub_state) =>
            {
                self.trace.record(TraceEvent::StaleTimeout);
            }
            _ => {}
        }
    }

    fn on_pgps(&mut self, event: PgpsEvent) {
        match event {
            PgpsEvent::Init | PgpsEvent::Unavailable | PgpsEvent::Loading | PgpsEvent::Ready => {
                self.trace.record(TraceEvent::PgpsNotice(event));
            }
            PgpsEvent::Available(prediction) => {
                let request = self.assistance.take_request();
                let traced = match self.parts.location.inject_prediction(prediction, request) {
                    Ok(()) => TraceEvent::PredictionInjected(prediction),
                    Err(err) => TraceEvent::PredictionInjectFailed(err),
                };
                self.trace.record(traced);
            }
            // Forwarded to the cloud by the connected handler.
            PgpsEvent::Request(_) => {}
        }
    }

    fn dispatch(&mut self, request: OutboundRequest) {
        let parts = &mut self.parts;
        let traced = match request {
            OutboundRequest::Payload(kind, payload) => {
                let ack =
                    dispatch::send_payload(&mut parts.transport, &mut parts.sink, kind, &payload);
                TraceEvent::Sent {
                    kind,
                    id: ack.id,
                    len: ack.len,
                    sent: ack.sent,
                }
            }
            OutboundRequest::ConfigGet => match parts.transport.request_config() {
                Ok(()) => TraceEvent::ConfigRequested,
                Err(err) => TraceEvent::ConfigRequestFailed(err),
            },
            OutboundRequest::Pgps(pgps) => match dispatch::send_pgps_request(
                &mut parts.transport,
                &mut parts.codec,
                &mut parts.sink,
                &pgps,
            ) {
                PgpsOutcome::Sent(ack) => TraceEvent::Sent {
                    kind: request.kind(),
                    id: ack.id,
                    len: ack.len,
                    sent: ack.sent,
                },
                PgpsOutcome::Skipped(err) => TraceEvent::PgpsRequestSkipped(err),
                PgpsOutcome::EncodeFailed(err) => TraceEvent::PgpsRequestEncodeFailed(err),
            },
        };
        self.trace.record(traced);
    }

    fn setup(&mut self) -> Result<(), SupervisorError> {
        let result = self
            .parts
            .transport
            .init()
            .and_then(|()| self.parts.image.confirm_running_image());
        match result {
            Ok(()) => {
                self.trace.record(TraceEvent::SetupComplete);
                Ok(())
            }
            Err(err) => {
                self.trace.record(TraceEvent::SetupFailed(err));
                Err(SupervisorError::Setup(err))
            }
        }
    }

    fn connect(&mut self) {
        if self.retries > self.config.connect_retries {
            self.trace.record(TraceEvent::Unreachable {
                retries: self.retries,
            });
            self.parts
                .sink
                .publish(CloudEvent::Error(CloudError::Unreachable));
            return;
        }

        let retries = self.retries.saturating_add(1);
        self.trace.record(TraceEvent::ConnectAttempt { retries });
        // A rejected attempt still consumes a retry; the timer retries later.
        if let Err(err) = self.parts.transport.connect() {
            self.trace.record(TraceEvent::ConnectFailed(err));
        }
        self.retries = retries;
        self.arm_timer(self.backoff.delay_saturating(retries));
    }

    fn disconnect(&mut self) {
        if let Err(err) = self.parts.transport.disconnect() {
            self.trace.record(TraceEvent::DisconnectFailed(err));
        }
        self.retries = 0;
        self.cancel_timer();
    }

    fn shutdown(&mut self) {
        self.cancel_timer();
        self.parts.sink.publish(CloudEvent::ShutdownReady);
        self.trace.record(TraceEvent::ShutdownAcknowledged);
        self.set_state(ConnectionState::Shutdown);
    }

    /// Starts the predictive service once the cloud session is up and
    /// wall-clock time is known, whichever comes last.
    fn maybe_init_pgps(&mut self) {
        let cloud_connected =
            self.state == ConnectionState::LteConnected && self.sub_state.is_connected();
        if !self.config.pgps || !self.assistance.pgps_init_due(cloud_connected) {
            return;
        }
        self.assistance.mark_pgps_initialized();
        let traced = match self.parts.location.init_pgps() {
            Ok(()) => TraceEvent::PgpsInitialized,
            Err(err) => TraceEvent::PgpsInitFailed(err),
        };
        self.trace.record(traced);
    }

    fn arm_timer(&mut self, delay: Duration) {
        self.parts.timer.reschedule(delay);
        self.trace.record(TraceEvent::TimerArmed {
            delay_secs: delay.as_secs(),
        });
    }

    fn cancel_timer(&mut self) {
        self.parts.timer.cancel();
        self.trace.record(TraceEvent::TimerCancelled);
    }

    /// Returns `true` when the state actually changed.
    fn set_state(&mut self, next: ConnectionState) -> bool {
        if self.state == next {
            return false;
        }
        self.trace.record(TraceEvent::StateChanged {
            from: self.state,
            to: next,
        });
        self.state = next;
        if next != ConnectionState::LteConnected {
            self.set_sub_state(CloudSubState::CloudDisconnected);
        }
        true
    }

    fn set_sub_state(&mut self, next: CloudSubState) -> bool {
        if self.sub_state == next {
            return false;
        }
        self.trace.record(TraceEvent::SubStateChanged {
            from: self.sub_state,
            to: next,
        });
        self.sub_state = next;
        true
    }
}

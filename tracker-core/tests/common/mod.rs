#![allow(dead_code)]

use core::time::Duration;

use tracker_core::assistance::{AssistanceError, AssistanceRequest, PgpsRequest, PredictionId};
use tracker_core::config::{DeviceConfig, SupervisorConfig};
use tracker_core::events::{CloudEvent, CloudMessage, DataAck, ModemEvent, Payload};
use tracker_core::supervisor::{Collaborators, Platform, Supervisor, connection_check_due};
use tracker_core::trace::TraceEvent;
use tracker_core::transport::{
    BootImage, CloudCodec, CloudTransport, ConfigDecodeError, ConnectTimer, EncodeError,
    EventSink, LocationAssistance, SendKind, TransportError,
};

pub static BYTES: [u8; 64] = [0x5A; 64];

pub fn payload(id: u32, len: usize) -> Payload {
    Payload::new(id, &BYTES[..len])
}

pub struct MockTransport {
    pub connect_result: Result<(), TransportError>,
    pub send_result: Result<(), TransportError>,
    pub connects: usize,
    pub disconnects: usize,
    pub sends: Vec<(SendKind, usize)>,
    pub config_requests: usize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            connect_result: Ok(()),
            send_result: Ok(()),
            connects: 0,
            disconnects: 0,
            sends: Vec::new(),
            config_requests: 0,
        }
    }
}

impl CloudTransport for MockTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        self.connect_result
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.disconnects += 1;
        Ok(())
    }

    fn send(&mut self, kind: SendKind, data: &[u8]) -> Result<(), TransportError> {
        self.sends.push((kind, data.len()));
        self.send_result
    }

    fn request_config(&mut self) -> Result<(), TransportError> {
        self.config_requests += 1;
        Ok(())
    }
}

pub struct MockCodec {
    pub decode: Result<DeviceConfig, ConfigDecodeError>,
    pub encode: Result<Payload, EncodeError>,
}

impl Default for MockCodec {
    fn default() -> Self {
        Self {
            decode: Err(ConfigDecodeError::NotConfig),
            encode: Err(EncodeError::NotSupported),
        }
    }
}

impl CloudCodec for MockCodec {
    fn decode_config(
        &mut self,
        _: &[u8],
        _: &DeviceConfig,
    ) -> Result<DeviceConfig, ConfigDecodeError> {
        self.decode
    }

    fn encode_pgps_request(&mut self, _: &PgpsRequest) -> Result<Payload, EncodeError> {
        self.encode
    }
}

pub struct MockLocation {
    pub agps_result: Result<(), AssistanceError>,
    pub pgps_result: Result<(), AssistanceError>,
    pub agps_calls: usize,
    pub pgps_calls: usize,
    pub inits: usize,
    pub injected: Vec<(PredictionId, Option<AssistanceRequest>)>,
}

impl Default for MockLocation {
    fn default() -> Self {
        Self {
            agps_result: Ok(()),
            pgps_result: Ok(()),
            agps_calls: 0,
            pgps_calls: 0,
            inits: 0,
            injected: Vec::new(),
        }
    }
}

impl LocationAssistance for MockLocation {
    fn process_agps(&mut self, _: &[u8]) -> Result<(), AssistanceError> {
        self.agps_calls += 1;
        self.agps_result
    }

    fn process_pgps(&mut self, _: &[u8]) -> Result<(), AssistanceError> {
        self.pgps_calls += 1;
        self.pgps_result
    }

    fn init_pgps(&mut self) -> Result<(), AssistanceError> {
        self.inits += 1;
        Ok(())
    }

    fn inject_prediction(
        &mut self,
        prediction: PredictionId,
        request: Option<AssistanceRequest>,
    ) -> Result<(), AssistanceError> {
        self.injected.push((prediction, request));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockTimer {
    pub armed: Option<Duration>,
    pub scheduled: Vec<Duration>,
    pub cancels: usize,
}

impl ConnectTimer for MockTimer {
    fn reschedule(&mut self, delay: Duration) {
        self.armed = Some(delay);
        self.scheduled.push(delay);
    }

    fn cancel(&mut self) {
        self.armed = None;
        self.cancels += 1;
    }
}

#[derive(Default)]
pub struct MockSink {
    pub events: Vec<CloudEvent>,
}

impl EventSink for MockSink {
    fn publish(&mut self, event: CloudEvent) {
        self.events.push(event);
    }
}

#[derive(Default)]
pub struct MockImage {
    pub confirmed: usize,
}

impl BootImage for MockImage {
    fn confirm_running_image(&mut self) -> Result<(), TransportError> {
        self.confirmed += 1;
        Ok(())
    }
}

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Transport = MockTransport;
    type Codec = MockCodec;
    type Location = MockLocation;
    type Timer = MockTimer;
    type Sink = MockSink;
    type Image = MockImage;
}

pub fn parts() -> Collaborators<MockPlatform> {
    Collaborators {
        transport: MockTransport::default(),
        codec: MockCodec::default(),
        location: MockLocation::default(),
        timer: MockTimer::default(),
        sink: MockSink::default(),
        image: MockImage::default(),
    }
}

pub fn supervisor() -> Supervisor<MockPlatform> {
    supervisor_with(SupervisorConfig::new())
}

pub fn supervisor_with(config: SupervisorConfig) -> Supervisor<MockPlatform> {
    Supervisor::new(parts(), config).expect("valid supervisor config")
}

pub fn feed(supervisor: &mut Supervisor<MockPlatform>, message: impl Into<CloudMessage>) {
    supervisor
        .handle(message.into())
        .expect("message handled without fatal error");
}

/// Initialises the supervisor and brings LTE up, triggering the first connect.
pub fn lte_up(supervisor: &mut Supervisor<MockPlatform>) {
    feed(supervisor, ModemEvent::Initialized);
    feed(supervisor, ModemEvent::LteConnected);
}

/// Brings LTE and the cloud session up.
pub fn cloud_up(supervisor: &mut Supervisor<MockPlatform>) {
    lte_up(supervisor);
    feed(supervisor, CloudEvent::Connected);
}

/// Lets the pending connection-check timer expire. Returns `false` when no
/// timer was armed.
pub fn fire_timer(supervisor: &mut Supervisor<MockPlatform>) -> bool {
    if supervisor.parts_mut().timer.armed.take().is_none() {
        return false;
    }
    if connection_check_due(supervisor.state(), supervisor.sub_state()) {
        feed(supervisor, CloudEvent::ConnectionTimeout);
    }
    true
}

pub fn acks(supervisor: &Supervisor<MockPlatform>) -> Vec<DataAck> {
    supervisor
        .parts()
        .sink
        .events
        .iter()
        .filter_map(|event| match event {
            CloudEvent::DataAck(ack) => Some(*ack),
            _ => None,
        })
        .collect()
}

pub fn published(supervisor: &Supervisor<MockPlatform>, wanted: CloudEvent) -> usize {
    supervisor
        .parts()
        .sink
        .events
        .iter()
        .filter(|event| **event == wanted)
        .count()
}

pub fn traced(supervisor: &Supervisor<MockPlatform>) -> Vec<TraceEvent> {
    supervisor
        .trace()
        .oldest_first()
        .map(|record| record.event)
        .collect()
}

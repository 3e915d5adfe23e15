use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use tracker_core::assistance::{AssistanceError, AssistanceRequest, PgpsRequest, PredictionId};
use tracker_core::config::{DeviceConfig, SupervisorConfig};
use tracker_core::events::{CloudEvent, CloudMessage, Payload};
use tracker_core::router::{EnqueueError, EventQueueProducer, EventRouter};
use tracker_core::script::{self, FailMode, ScriptCommand};
use tracker_core::supervisor::{Collaborators, Platform, Supervisor, connection_check_due};
use tracker_core::trace::EventId;
use tracker_core::transport::{
    CloudCodec, CloudTransport, ConfigDecodeError, ConnectTimer, EncodeError, EventSink,
    LocationAssistance, NoopBootImage, SendKind, TransportError,
};

/// Depth of the emulated supervisor queue.
pub const QUEUE_DEPTH: usize = 20;

const ECONNREFUSED: i32 = -111;
const EIO: i32 = -5;

static PGPS_FRAME: [u8; 16] = [0; 16];

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "modem",
        "modem <initialized|lte-connected|lte-disconnected|fota-pending|fota-stopped>",
    ),
    ("cloud", "cloud <connected|disconnected|timeout>"),
    (
        "data",
        "data <send|config-send|batch|ui|neighbor-cells|agps-request> <id> <len> | data <config-get|date-time>",
    ),
    ("debug", "debug <id> <len>            - queue a diagnostic upload"),
    (
        "location",
        "location <agps-needed|pgps-request> <count> <interval> <day> <time> | location pgps-available <id>",
    ),
    ("shutdown", "shutdown                    - request a graceful shutdown"),
    ("tick", "tick <seconds>              - advance the virtual clock"),
    ("fail", "fail <connect|send|none>    - make the host transport fail"),
    ("status", "status                      - display supervisor state"),
    ("help", "help                        - list commands"),
];

/// Scripted supervisor session with a virtual clock.
pub struct Session {
    supervisor: Supervisor<HostPlatform>,
    router: EventRouter<HostQueue, HostSink>,
    clock: Duration,
    deadline: Option<Duration>,
    cursor: EventId,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(config: SupervisorConfig, transcript: Option<&Path>) -> io::Result<Self> {
        let parts = Collaborators {
            transport: HostTransport::default(),
            codec: HostCodec::default(),
            location: HostLocation,
            timer: HostTimer::default(),
            sink: HostSink::default(),
            image: NoopBootImage::new(),
        };
        let supervisor = Supervisor::new(parts, config)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
        let transcript = transcript.map(TranscriptLogger::create).transpose()?;

        Ok(Self {
            cursor: supervisor.trace().next_id(),
            supervisor,
            router: EventRouter::new(HostQueue::new(QUEUE_DEPTH), HostSink::default()),
            clock: Duration::ZERO,
            deadline: None,
            transcript,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.record(TranscriptRole::Host, trimmed)?;

        let lines = if trimmed.eq_ignore_ascii_case("help") {
            help_lines()
        } else {
            match script::parse_line(trimmed) {
                Ok(Some(command)) => self.execute(command),
                Ok(None) => Vec::new(),
                Err(err) => vec![format!("ERR syntax {err}")],
            }
        };

        for line in &lines {
            self.record(TranscriptRole::Emulator, line)?;
        }
        Ok(lines)
    }

    fn execute(&mut self, command: ScriptCommand) -> Vec<String> {
        let mut lines = Vec::new();
        match command {
            ScriptCommand::Message(message) => self.route(message, &mut lines),
            ScriptCommand::Tick(secs) => {
                self.tick(Duration::from_secs(u64::from(secs)), &mut lines);
            }
            ScriptCommand::Fail(mode) => {
                self.supervisor.parts_mut().transport.fail = mode;
                lines.push(format!("OK fail {}", fail_label(mode)));
            }
            ScriptCommand::Status => lines.push(self.status_line()),
        }
        lines
    }

    fn route(&mut self, message: CloudMessage, lines: &mut Vec<String>) {
        if let Err(err) = self.router.route(message) {
            lines.push(format!("ERR queue {}", describe_enqueue_error(err)));
        }
        self.drain(lines);
    }

    fn drain(&mut self, lines: &mut Vec<String>) {
        while let Some(message) = self.router.queue_mut().pop_front() {
            if let Err(err) = self.supervisor.handle(message) {
                lines.push(format!("ERR {err}"));
            }
            self.collect(lines);
        }
        for event in self.router.sink_mut().events.drain(..) {
            lines.push(format!("event {event}"));
        }
    }

    fn collect(&mut self, lines: &mut Vec<String>) {
        for record in self.supervisor.trace().since(self.cursor) {
            lines.push(format!("trace #{} {}", record.id, record.event));
        }
        self.cursor = self.supervisor.trace().next_id();

        let parts = self.supervisor.parts_mut();
        for event in parts.sink.events.drain(..) {
            lines.push(format!("event {event}"));
        }
        match parts.timer.pending.take() {
            Some(TimerRequest::Schedule(delay)) => {
                self.deadline = Some(self.clock.saturating_add(delay));
            }
            Some(TimerRequest::Cancel) => self.deadline = None,
            None => {}
        }
    }

    /// Advances the clock, firing the connection-check timer at each deadline
    /// passed on the way.
    fn tick(&mut self, step: Duration, lines: &mut Vec<String>) {
        let target = self.clock.saturating_add(step);
        while let Some(deadline) = self.deadline.filter(|deadline| *deadline <= target) {
            self.clock = deadline;
            self.deadline = None;
            if connection_check_due(self.supervisor.state(), self.supervisor.sub_state()) {
                lines.push(format!("timer expired at {}", format_clock(deadline)));
                self.route(CloudEvent::ConnectionTimeout.into(), lines);
            } else {
                lines.push(format!(
                    "timer expired at {} outside connection check",
                    format_clock(deadline)
                ));
            }
        }
        self.clock = target;
        lines.push(format!("OK clock {}", format_clock(self.clock)));
    }

    fn status_line(&self) -> String {
        let supervisor = &self.supervisor;
        let deadline = self
            .deadline
            .map_or_else(|| "none".to_string(), format_clock);
        format!(
            "state={} sub={} retries={}/{} clock={} deadline={} fail={}",
            supervisor.state(),
            supervisor.sub_state(),
            supervisor.retries(),
            supervisor.config().connect_retries,
            format_clock(self.clock),
            deadline,
            fail_label(supervisor.parts().transport.fail),
        )
    }

    fn record(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(self.clock, role, line),
            None => Ok(()),
        }
    }
}

pub struct HostPlatform;

impl Platform for HostPlatform {
    type Transport = HostTransport;
    type Codec = HostCodec;
    type Location = HostLocation;
    type Timer = HostTimer;
    type Sink = HostSink;
    type Image = NoopBootImage;
}

/// Cloud client whose failures are selected by `fail`.
#[derive(Default)]
pub struct HostTransport {
    fail: FailMode,
}

impl CloudTransport for HostTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        match self.fail {
            FailMode::Connect => Err(TransportError::Failed(ECONNREFUSED)),
            FailMode::None | FailMode::Send => Ok(()),
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn send(&mut self, _: SendKind, _: &[u8]) -> Result<(), TransportError> {
        match self.fail {
            FailMode::Send => Err(TransportError::Failed(EIO)),
            FailMode::None | FailMode::Connect => Ok(()),
        }
    }

    fn request_config(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct HostCodec {
    next_id: u32,
}

impl CloudCodec for HostCodec {
    fn decode_config(
        &mut self,
        _: &[u8],
        _: &DeviceConfig,
    ) -> Result<DeviceConfig, ConfigDecodeError> {
        Err(ConfigDecodeError::NotConfig)
    }

    fn encode_pgps_request(&mut self, request: &PgpsRequest) -> Result<Payload, EncodeError> {
        if request.count == 0 {
            return Err(EncodeError::NoData);
        }
        self.next_id = self.next_id.wrapping_add(1);
        Ok(Payload::new(self.next_id, &PGPS_FRAME))
    }
}

/// GNSS backend that accepts all assistance data.
pub struct HostLocation;

impl LocationAssistance for HostLocation {
    fn process_agps(&mut self, _: &[u8]) -> Result<(), AssistanceError> {
        Ok(())
    }

    fn process_pgps(&mut self, _: &[u8]) -> Result<(), AssistanceError> {
        Ok(())
    }

    fn init_pgps(&mut self) -> Result<(), AssistanceError> {
        Ok(())
    }

    fn inject_prediction(
        &mut self,
        _: PredictionId,
        _: Option<AssistanceRequest>,
    ) -> Result<(), AssistanceError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TimerRequest {
    Schedule(Duration),
    Cancel,
}

/// Timer whose latest request is picked up by the session clock.
#[derive(Default)]
pub struct HostTimer {
    pending: Option<TimerRequest>,
}

impl ConnectTimer for HostTimer {
    fn reschedule(&mut self, delay: Duration) {
        self.pending = Some(TimerRequest::Schedule(delay));
    }

    fn cancel(&mut self) {
        self.pending = Some(TimerRequest::Cancel);
    }
}

#[derive(Default)]
pub struct HostSink {
    events: Vec<CloudEvent>,
}

impl EventSink for HostSink {
    fn publish(&mut self, event: CloudEvent) {
        self.events.push(event);
    }
}

struct HostQueue {
    capacity: usize,
    messages: VecDeque<CloudMessage>,
}

impl HostQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    fn pop_front(&mut self) -> Option<CloudMessage> {
        self.messages.pop_front()
    }
}

impl EventQueueProducer for HostQueue {
    type Error = ();

    fn try_enqueue(&mut self, message: CloudMessage) -> Result<(), EnqueueError<Self::Error>> {
        if self.messages.len() >= self.capacity {
            return Err(EnqueueError::QueueFull);
        }

        self.messages.push_back(message);
        Ok(())
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }

    fn len(&self) -> Option<usize> {
        Some(self.messages.len())
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Tracker cloud supervisor emulator transcript")?;
        writeln!(self.writer, "# Timestamps are virtual clock seconds")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, clock: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[{:>9}] {} {}",
            format_clock(clock),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

fn help_lines() -> Vec<String> {
    HELP_TOPICS
        .iter()
        .map(|(_, usage)| (*usage).to_string())
        .collect()
}

fn fail_label(mode: FailMode) -> &'static str {
    match mode {
        FailMode::None => "none",
        FailMode::Connect => "connect",
        FailMode::Send => "send",
    }
}

fn describe_enqueue_error(error: EnqueueError) -> &'static str {
    match error {
        EnqueueError::QueueFull => "queue-full",
        EnqueueError::Disconnected => "queue-disconnected",
        EnqueueError::Other(()) => "queue-error",
    }
}

fn format_clock(clock: Duration) -> String {
    format!("+{}s", clock.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SupervisorConfig::new(), None).unwrap()
    }

    fn run(session: &mut Session, lines: &[&str]) -> Vec<String> {
        let mut output = Vec::new();
        for line in lines {
            output.extend(session.handle_command(line).unwrap());
        }
        output
    }

    fn contains(output: &[String], needle: &str) -> bool {
        output.iter().any(|line| line.contains(needle))
    }

    #[test]
    fn connect_timer_fires_on_the_virtual_clock() {
        let mut session = session();
        run(&mut session, &["modem initialized", "modem lte-connected"]);
        assert_eq!(session.supervisor.retries(), 1);
        assert_eq!(session.deadline, Some(Duration::from_secs(64)));

        let output = run(&mut session, &["tick 63"]);
        assert!(!contains(&output, "timer expired"));
        assert_eq!(session.supervisor.retries(), 1);

        let output = run(&mut session, &["tick 1"]);
        assert!(contains(&output, "timer expired at +64s"));
        assert_eq!(session.supervisor.retries(), 2);
        assert_eq!(session.deadline, Some(Duration::from_secs(192)));
    }

    #[test]
    fn cloud_connection_cancels_the_timer() {
        let mut session = session();
        let output = run(
            &mut session,
            &["modem initialized", "modem lte-connected", "cloud connected"],
        );

        assert!(contains(&output, "timer-cancelled"));
        assert_eq!(session.deadline, None);

        let output = run(&mut session, &["tick 1000"]);
        assert!(!contains(&output, "timer expired"));
        assert_eq!(session.clock, Duration::from_secs(1000));
    }

    #[test]
    fn sends_are_acked_with_transport_result() {
        let mut session = session();
        run(
            &mut session,
            &["modem initialized", "modem lte-connected", "cloud connected"],
        );

        let output = run(&mut session, &["data send 7 120"]);
        assert!(contains(&output, "event data-ack id=7 len=120 sent=true"));

        let output = run(&mut session, &["fail send", "data batch 8 30"]);
        assert!(contains(&output, "event data-ack id=8 len=30 sent=false"));
    }

    #[test]
    fn sends_before_cloud_connection_are_ignored() {
        let mut session = session();
        let output = run(
            &mut session,
            &["modem initialized", "modem lte-connected", "data ui 3 12"],
        );

        assert!(contains(&output, "send-ignored"));
        assert!(!contains(&output, "data-ack"));
    }

    #[test]
    fn exhausted_retries_report_unreachable_once() {
        let config = SupervisorConfig::new().with_connect_retries(1);
        let mut session = Session::new(config, None).unwrap();
        let output = run(
            &mut session,
            &["fail connect", "modem initialized", "modem lte-connected", "tick 64"],
        );
        assert!(contains(&output, "connect-failed"));
        assert_eq!(session.supervisor.retries(), 2);
        assert!(!contains(&output, "unreachable"));

        let output = run(&mut session, &["tick 128"]);
        assert!(contains(&output, "event error (cloud unreachable)"));
        assert_eq!(session.deadline, None);

        let output = run(&mut session, &["tick 100000"]);
        assert!(!contains(&output, "unreachable"));
    }

    #[test]
    fn shutdown_is_terminal() {
        let mut session = session();
        let output = run(&mut session, &["modem initialized", "shutdown", "modem lte-connected"]);

        assert_eq!(
            output.iter().filter(|line| line.as_str() == "event shutdown-ready").count(),
            1
        );
        assert!(contains(&output, "ignored-after-shutdown"));
        assert!(session.status_line().starts_with("state=shutdown"));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut session = session();
        let output = run(&mut session, &["modem sideways"]);
        assert_eq!(output.len(), 1);
        assert!(output[0].starts_with("ERR syntax"));
    }

    #[test]
    fn help_lists_every_command() {
        let mut session = session();
        let output = run(&mut session, &["help"]);
        assert_eq!(output.len(), HELP_TOPICS.len());
    }
}

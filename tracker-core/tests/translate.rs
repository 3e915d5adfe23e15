mod common;

use common::{MockCodec, MockLocation, MockSink, feed, supervisor};
use tracker_core::assistance::{AssistanceError, PgpsRequest};
use tracker_core::config::{DeviceConfig, SupervisorConfig};
use tracker_core::events::{CloudError, CloudEvent, DataEvent, Payload};
use tracker_core::translate::{AssistanceOutcome, Translation, TransportTranslator};
use tracker_core::transport::{
    CloudCodec, ConfigDecodeError, EncodeError, TransportError, TransportEvent,
};

/// Codec whose payload carries only a new location timeout, in seconds.
struct LocationTimeoutCodec;

impl CloudCodec for LocationTimeoutCodec {
    fn decode_config(
        &mut self,
        data: &[u8],
        base: &DeviceConfig,
    ) -> Result<DeviceConfig, ConfigDecodeError> {
        let [seconds] = data else {
            return Err(ConfigDecodeError::NotConfig);
        };
        let mut config = *base;
        config.location_timeout = u32::from(*seconds);
        Ok(config)
    }

    fn encode_pgps_request(&mut self, _: &PgpsRequest) -> Result<Payload, EncodeError> {
        Err(EncodeError::NotSupported)
    }
}

fn translator(
    decode: Result<DeviceConfig, ConfigDecodeError>,
    config: &SupervisorConfig,
) -> TransportTranslator<MockCodec, MockLocation> {
    let codec = MockCodec {
        decode,
        ..MockCodec::default()
    };
    TransportTranslator::new(codec, MockLocation::default(), config)
}

#[test]
fn session_notices_map_one_to_one() {
    let mut translator = translator(Err(ConfigDecodeError::NotConfig), &SupervisorConfig::new());
    let mut sink = MockSink::default();

    for notice in [
        TransportEvent::Connecting,
        TransportEvent::Connected,
        TransportEvent::Disconnected,
        TransportEvent::FotaDone,
    ] {
        translator.translate(notice, &mut sink);
    }

    assert_eq!(
        sink.events,
        vec![
            CloudEvent::Connecting,
            CloudEvent::Connected,
            CloudEvent::Disconnected,
            CloudEvent::FotaDone
        ]
    );
}

#[test]
fn fota_progress_is_not_published() {
    let mut translator = translator(Err(ConfigDecodeError::NotConfig), &SupervisorConfig::new());
    let mut sink = MockSink::default();

    for notice in [
        TransportEvent::FotaStart,
        TransportEvent::FotaErasePending,
        TransportEvent::FotaEraseDone,
        TransportEvent::FotaError,
    ] {
        assert_eq!(translator.translate(notice, &mut sink), Translation::FotaProgress);
    }
    assert!(sink.events.is_empty());
}

#[test]
fn config_decode_outcomes() {
    let config = SupervisorConfig::new();
    let mut sink = MockSink::default();

    let mut empty = translator(Err(ConfigDecodeError::Empty), &config);
    empty.translate(TransportEvent::DataReceived(b"{}"), &mut sink);

    let mut handled = translator(Err(ConfigDecodeError::AlreadyHandled), &config);
    assert_eq!(
        handled.translate(TransportEvent::DataReceived(b"{}"), &mut sink),
        Translation::AlreadyHandled
    );
    assert_eq!(handled.location_mut().agps_calls, 0);

    let mut malformed = translator(Err(ConfigDecodeError::Malformed(-74)), &config);
    malformed.translate(TransportEvent::DataReceived(b"{"), &mut sink);

    assert_eq!(
        sink.events,
        vec![
            CloudEvent::ConfigEmpty,
            CloudEvent::Error(CloudError::Decode(-74))
        ]
    );
}

#[test]
fn non_config_payload_stops_at_first_processor_that_accepts_it() {
    let mut translator = translator(Err(ConfigDecodeError::NotConfig), &SupervisorConfig::new());
    let mut sink = MockSink::default();

    let outcome = translator.translate(TransportEvent::DataReceived(b"agps"), &mut sink);

    assert_eq!(outcome, Translation::Assistance(AssistanceOutcome::Agps));
    assert_eq!(translator.location_mut().agps_calls, 1);
    assert_eq!(translator.location_mut().pgps_calls, 0);
    assert!(sink.events.is_empty());
}

#[test]
fn pgps_only_build_skips_agps_processor() {
    let config = SupervisorConfig::new().with_assistance(false, true);
    let mut translator = translator(Err(ConfigDecodeError::NotConfig), &config);
    let mut sink = MockSink::default();

    let outcome = translator.translate(TransportEvent::PgpsDataReceived(b"pgps"), &mut sink);

    assert_eq!(outcome, Translation::Assistance(AssistanceOutcome::Pgps));
    assert_eq!(translator.location_mut().agps_calls, 0);
}

#[test]
fn assistance_failures_are_reported_not_published() {
    let mut translator = translator(Err(ConfigDecodeError::NotConfig), &SupervisorConfig::new());
    translator.location_mut().agps_result = Err(AssistanceError::Rejected);
    translator.location_mut().pgps_result = Err(AssistanceError::Failed(-22));
    let mut sink = MockSink::default();

    let outcome = translator.translate(TransportEvent::AgpsDataReceived(b"??"), &mut sink);

    assert_eq!(
        outcome,
        Translation::Assistance(AssistanceOutcome::Unhandled {
            agps: Some(AssistanceError::Rejected),
            pgps: Some(AssistanceError::Failed(-22)),
        })
    );
    assert!(sink.events.is_empty());
}

#[test]
fn dedicated_assistance_notices_bypass_the_codec() {
    let mut translator = translator(Ok(DeviceConfig::new()), &SupervisorConfig::new());
    let mut sink = MockSink::default();

    let outcome = translator.translate(TransportEvent::AgpsDataReceived(b"agps"), &mut sink);

    assert_eq!(outcome, Translation::Assistance(AssistanceOutcome::Agps));
    assert!(sink.events.is_empty());
}

#[test]
fn transport_errors_become_cloud_errors() {
    let mut translator = translator(Err(ConfigDecodeError::NotConfig), &SupervisorConfig::new());
    let mut sink = MockSink::default();

    translator.translate(TransportEvent::Error(TransportError::Failed(-113)), &mut sink);

    assert_eq!(
        sink.events,
        vec![CloudEvent::Error(CloudError::Transport(TransportError::Failed(-113)))]
    );
}

#[test]
fn partial_cloud_update_keeps_fields_from_the_data_module() {
    let mut supervisor = supervisor();
    let mut initial = DeviceConfig::new();
    initial.active_mode = false;
    initial.movement_timeout = 999;
    feed(&mut supervisor, DataEvent::ConfigInit(initial));

    let config = SupervisorConfig::new();
    let mut translator =
        TransportTranslator::new(LocationTimeoutCodec, MockLocation::default(), &config);
    translator.set_base(*supervisor.device_config());
    let mut sink = MockSink::default();
    translator.translate(TransportEvent::DataReceived(&[30]), &mut sink);

    for event in sink.events {
        feed(&mut supervisor, event);
    }
    let config = supervisor.device_config();
    assert!(!config.active_mode);
    assert_eq!(config.movement_timeout, 999);
    assert_eq!(config.location_timeout, 30);
}

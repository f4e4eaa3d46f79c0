mod common;

use blind_sobel::crypto::Encoding;
use blind_sobel::crypto::paillier::{PaillierPublic, PaillierSecret};
use blind_sobel::errors::EdgeError;
use blind_sobel::protocol::{
    DetectionMode, EdgeClient, EdgeResponse, EdgeWorker, LoopbackTransport, Transport,
    WireRequest, WorkerReply,
};
use blind_sobel::telemetry::{ClientPhase, Phase, WorkerPhase};

use common::{RecordingTelemetry, bright_pixel, init_logging, loopback_client, test_config};

use std::io::{BufRead, Cursor};
use std::sync::Arc;

#[test]
fn missing_context_is_rejected_before_compute() -> Result<(), EdgeError> {
    init_logging();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let worker = EdgeWorker::<PaillierPublic>::new(&test_config(), telemetry.clone())?;

    let body = br#"{"encrypted": true, "size": 1, "pixels": ["AAE="], "public_key": "AQI="}"#;
    let result = worker.handle_json(body);

    assert!(matches!(result, Err(EdgeError::MalformedRequest(_))));
    assert_eq!(
        telemetry.phases(),
        vec![
            Phase::Worker(WorkerPhase::Receive),
            Phase::Worker(WorkerPhase::Validate)
        ]
    );
    Ok(())
}

#[test]
fn undecodable_key_material_is_rejected() -> Result<(), EdgeError> {
    init_logging();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let worker = EdgeWorker::<PaillierPublic>::new(&test_config(), telemetry.clone())?;

    let body = br#"{"encrypted": true, "size": 1, "pixels": ["AAE="], "public_key": "AQI=", "context": "AwQ="}"#;
    assert!(matches!(
        worker.handle_json(body),
        Err(EdgeError::MalformedRequest(_))
    ));
    assert!(!telemetry.phases().contains(&Phase::Worker(WorkerPhase::EncryptedCompute)));
    Ok(())
}

#[test]
fn plaintext_only_worker_never_downgrades() -> Result<(), EdgeError> {
    init_logging();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let worker = EdgeWorker::<PaillierPublic>::plaintext_only(&test_config(), telemetry.clone())?;
    assert!(!worker.supports_encrypted());

    let client: EdgeClient<_, PaillierSecret> =
        EdgeClient::new(LoopbackTransport::new(worker), test_config(), telemetry.clone())?;

    let grid = bright_pixel(255);
    assert!(matches!(
        client.detect(&grid, DetectionMode::Encrypted(Encoding::Fractional)),
        Err(EdgeError::UnsupportedMode)
    ));
    assert!(!telemetry.phases().contains(&Phase::Worker(WorkerPhase::EncryptedCompute)));

    assert_eq!(client.detect(&grid, DetectionMode::Plaintext)?[5], 255);
    Ok(())
}

#[test]
fn client_walks_through_every_phase() -> Result<(), EdgeError> {
    let telemetry = Arc::new(RecordingTelemetry::default());
    let client = loopback_client(telemetry.clone())?;
    client.detect(&bright_pixel(255), DetectionMode::Encrypted(Encoding::Integer))?;

    let client_phases: Vec<ClientPhase> = telemetry
        .phases()
        .into_iter()
        .filter_map(|p| match p {
            Phase::Client(c) => Some(c),
            Phase::Worker(_) => None,
        })
        .collect();
    assert_eq!(
        client_phases,
        vec![
            ClientPhase::BuildRequest,
            ClientPhase::KeyGen,
            ClientPhase::Encrypt,
            ClientPhase::Send,
            ClientPhase::ReceiveStream,
            ClientPhase::DecryptAndFinalize,
            ClientPhase::Complete,
        ]
    );

    let worker_phases: Vec<WorkerPhase> = telemetry
        .phases()
        .into_iter()
        .filter_map(|p| match p {
            Phase::Worker(w) => Some(w),
            Phase::Client(_) => None,
        })
        .collect();
    assert_eq!(
        worker_phases,
        vec![
            WorkerPhase::Receive,
            WorkerPhase::Validate,
            WorkerPhase::EncryptedCompute,
            WorkerPhase::RespondStream,
            WorkerPhase::Complete,
        ]
    );
    Ok(())
}

#[test]
fn worker_streams_one_record_per_pixel() -> Result<(), EdgeError> {
    init_logging();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let worker = EdgeWorker::<PaillierPublic>::new(&test_config(), telemetry.clone())?;
    let keys = <PaillierSecret as blind_sobel::crypto::SecretCipher>::generate(
        &test_config().scheme_params(),
    )?;
    let ciphertexts = blind_sobel::pipeline::EncryptionPipeline::<PaillierPublic>::new(
        test_config().transform()?,
    )
    .encrypt(bright_pixel(9).pixels(), Encoding::Fractional, &keys)?;

    let request = WireRequest::encrypted(4, Encoding::Fractional, ciphertexts, &keys);
    let body = serde_json::to_vec(&request)?;
    assert!(!String::from_utf8_lossy(&body).contains("secret"));

    match worker.handle_json(&body)? {
        EdgeResponse::Gradients(stream) => {
            assert_eq!(stream.record_count(), 16);
            let complete = Phase::Worker(WorkerPhase::Complete);
            assert!(!telemetry.phases().contains(&complete));

            let records = stream.collect::<Result<Vec<String>, EdgeError>>()?;
            assert_eq!(telemetry.phases().last(), Some(&complete));
            assert_eq!(records.len(), 16);
            assert!(records.iter().all(|r| r.split(' ').count() == 2));
            assert_eq!(records[0], records[15]);
        }
        other => panic!("expected a gradient stream, got {:?}", other),
    }
    Ok(())
}

/// Forwards to a loopback worker but drops the last streamed record.
struct TruncatingTransport(LoopbackTransport<PaillierPublic>);

impl Transport for TruncatingTransport {
    fn send(&self, request: &WireRequest) -> Result<WorkerReply, EdgeError> {
        match self.0.send(request)? {
            WorkerReply::Stream(reader) => {
                let mut lines = reader.lines().collect::<Result<Vec<String>, _>>()?;
                lines.pop();
                let body = lines.join("\n") + "\n";
                Ok(WorkerReply::Stream(Box::new(Cursor::new(body))))
            }
            reply => Ok(reply),
        }
    }
}

#[test]
fn short_stream_is_rejected() -> Result<(), EdgeError> {
    init_logging();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let worker = EdgeWorker::<PaillierPublic>::new(&test_config(), telemetry.clone())?;
    let client: EdgeClient<_, PaillierSecret> = EdgeClient::new(
        TruncatingTransport(LoopbackTransport::new(worker)),
        test_config(),
        telemetry,
    )?;

    let result = client.detect(&bright_pixel(255), DetectionMode::Encrypted(Encoding::Integer));
    assert!(matches!(result, Err(EdgeError::MalformedResponse(_))));
    Ok(())
}

#[test]
fn scheme_parameters_are_checked_by_the_client_only() -> Result<(), EdgeError> {
    init_logging();
    let config = blind_sobel::EdgeConfig {
        modulus_bits: 255,
        ..test_config()
    };
    let telemetry = Arc::new(RecordingTelemetry::default());
    let worker = EdgeWorker::<PaillierPublic>::new(&config, telemetry.clone())?;

    let client: Result<EdgeClient<_, PaillierSecret>, _> =
        EdgeClient::new(LoopbackTransport::new(worker), config, telemetry);
    assert!(matches!(client, Err(EdgeError::InvalidConfig(_))));
    Ok(())
}

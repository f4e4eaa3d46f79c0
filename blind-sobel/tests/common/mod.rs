#![allow(dead_code)]

use blind_sobel::EdgeConfig;
use blind_sobel::crypto::paillier::{PaillierPublic, PaillierSecret};
use blind_sobel::errors::EdgeError;
use blind_sobel::grid::PixelGrid;
use blind_sobel::protocol::{EdgeClient, EdgeWorker, LoopbackTransport};
use blind_sobel::telemetry::{Phase, Telemetry};

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Small keys and chunks so every code path runs quickly.
pub fn test_config() -> EdgeConfig {
    EdgeConfig {
        chunk_size: 4,
        workers: Some(2),
        modulus_bits: 256,
        ..Default::default()
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    phases: Mutex<Vec<Phase>>,
}

impl RecordingTelemetry {
    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().unwrap().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn phase(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn stage_finished(&self, _phase: Phase, _items: usize, _elapsed: Duration) {}
}

pub type LoopbackClient = EdgeClient<LoopbackTransport<PaillierPublic>, PaillierSecret>;

pub fn loopback_client(telemetry: Arc<RecordingTelemetry>) -> Result<LoopbackClient, EdgeError> {
    init_logging();
    let worker = EdgeWorker::new(&test_config(), telemetry.clone())?;
    EdgeClient::new(LoopbackTransport::new(worker), test_config(), telemetry)
}

pub fn bright_pixel(value: u8) -> PixelGrid {
    let mut pixels = vec![0u8; 16];
    pixels[10] = value;
    PixelGrid::try_with(4, pixels).unwrap()
}

/// Deterministic pseudo-random image.
pub fn noise(side: usize, seed: u32) -> PixelGrid {
    let mut state = seed;
    let pixels = (0..side * side)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect();
    PixelGrid::try_with(side, pixels).unwrap()
}

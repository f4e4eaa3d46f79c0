use crate::config::EdgeConfig;
use crate::crypto::{Encoding, SecretCipher};
use crate::errors::EdgeError;
use crate::grid::PixelGrid;
use crate::pipeline::{DecryptionPipeline, EncryptionPipeline};
use crate::protocol::transport::{Transport, WorkerReply};
use crate::protocol::wire::WireRequest;
use crate::telemetry::{ClientPhase, Phase, Telemetry};
use crate::transform::ChunkedTransform;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetectionMode {
    Plaintext,
    Encrypted(Encoding),
}

/// Trusted side of the protocol.
///
/// In encrypted mode it generates fresh keys for every call, keeps the secret
/// key local, and drops all key material when the call returns.
pub struct EdgeClient<T: Transport, S: SecretCipher> {
    transport: T,
    config: EdgeConfig,
    transform: ChunkedTransform,
    telemetry: Arc<dyn Telemetry>,
    _cipher: PhantomData<fn() -> S>,
}

impl<T: Transport, S: SecretCipher> EdgeClient<T, S> {
    pub fn new(transport: T, config: EdgeConfig, telemetry: Arc<dyn Telemetry>) -> Result<Self, EdgeError> {
        let config = config.try_with()?;
        S::check_params(&config.scheme_params())
            .map_err(|e| EdgeError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            transform: config.transform()?,
            transport,
            config,
            telemetry,
            _cipher: PhantomData,
        })
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    fn enter(&self, phase: ClientPhase) {
        self.telemetry.phase(Phase::Client(phase));
    }

    fn timed<R>(
        &self,
        phase: ClientPhase,
        items: usize,
        work: impl FnOnce() -> Result<R, EdgeError>,
    ) -> Result<R, EdgeError> {
        self.enter(phase);
        let started = Instant::now();
        let result = work()?;
        self.telemetry
            .stage_finished(Phase::Client(phase), items, started.elapsed());
        Ok(result)
    }

    /// Edge magnitudes of `grid`, one byte per pixel.
    pub fn detect(&self, grid: &PixelGrid, mode: DetectionMode) -> Result<Vec<u8>, EdgeError> {
        let pixels = match mode {
            DetectionMode::Plaintext => self.detect_plain(grid)?,
            DetectionMode::Encrypted(encoding) => self.detect_encrypted(grid, encoding)?,
        };
        self.enter(ClientPhase::Complete);
        Ok(pixels)
    }

    fn detect_plain(&self, grid: &PixelGrid) -> Result<Vec<u8>, EdgeError> {
        self.enter(ClientPhase::BuildRequest);
        let request = WireRequest::plain(grid);

        let reply = self.timed(ClientPhase::Send, grid.pixels().len(), || {
            self.transport.send(&request)
        })?;

        self.enter(ClientPhase::ReceiveFull);
        let pixels = match reply {
            WorkerReply::Pixels(pixels) => pixels,
            WorkerReply::Stream(_) => {
                return Err(EdgeError::MalformedResponse(
                    "Plaintext request answered with a gradient stream".to_string(),
                ));
            }
        };
        grid.shape()
            .check_len(pixels.len())
            .map_err(|e| EdgeError::MalformedResponse(e.to_string()))?;
        Ok(pixels)
    }

    fn detect_encrypted(&self, grid: &PixelGrid, encoding: Encoding) -> Result<Vec<u8>, EdgeError> {
        self.enter(ClientPhase::BuildRequest);
        let count = grid.pixels().len();

        let keys = self.timed(ClientPhase::KeyGen, 1, || {
            Ok(S::generate(&self.config.scheme_params())?)
        })?;

        let ciphertexts = self.timed(ClientPhase::Encrypt, count, || {
            EncryptionPipeline::<S::Public>::new(self.transform.clone()).encrypt(
                grid.pixels(),
                encoding,
                &keys,
            )
        })?;
        let request = WireRequest::encrypted(grid.side(), encoding, ciphertexts, &keys);

        let reply = self.timed(ClientPhase::Send, count, || self.transport.send(&request))?;
        drop(request);

        self.enter(ClientPhase::ReceiveStream);
        let reader = match reply {
            WorkerReply::Stream(reader) => reader,
            WorkerReply::Pixels(_) => {
                return Err(EdgeError::MalformedResponse(
                    "Encrypted request answered with plaintext pixels".to_string(),
                ));
            }
        };

        self.timed(ClientPhase::DecryptAndFinalize, count, || {
            DecryptionPipeline::<S>::new(self.transform.clone(), encoding).consume(reader, count, &keys)
        })
    }
}

use crate::config::EdgeConfig;
use crate::crypto::HomomorphicCipher;
use crate::crypto::codec::ciphertext_from_string;
use crate::engine::{EncryptedGradientEngine, GradientStream, PlaintextGradientEngine};
use crate::errors::EdgeError;
use crate::grid::PixelGrid;
use crate::protocol::wire::{EdgeRequest, WireRequest};
use crate::telemetry::{Phase, Telemetry, WorkerPhase};
use crate::transform::ChunkedTransform;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// What the worker sends back.
pub enum EdgeResponse<C: HomomorphicCipher> {
    /// Final magnitudes of a plaintext request.
    Pixels(Vec<u8>),
    /// Encrypted gradient records, computed as they are read.
    Gradients(GradientStream<C>),
}

impl<C: HomomorphicCipher> std::fmt::Debug for EdgeResponse<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeResponse::Pixels(p) => write!(f, "Pixels({} bytes)", p.len()),
            EdgeResponse::Gradients(s) => write!(f, "Gradients({} records)", s.record_count()),
        }
    }
}

/// Untrusted side of the protocol. Holds no key material of its own: the
/// cipher for an encrypted request is restored from the request's public bytes.
pub struct EdgeWorker<C: HomomorphicCipher> {
    transform: ChunkedTransform,
    plain: PlaintextGradientEngine,
    encrypted_enabled: bool,
    telemetry: Arc<dyn Telemetry>,
    _cipher: PhantomData<fn() -> C>,
}

impl<C: HomomorphicCipher> EdgeWorker<C> {
    pub fn new(config: &EdgeConfig, telemetry: Arc<dyn Telemetry>) -> Result<Self, EdgeError> {
        let transform = config.clone().try_with()?.transform()?;
        Ok(Self {
            plain: PlaintextGradientEngine::new(transform.clone()),
            transform,
            encrypted_enabled: true,
            telemetry,
            _cipher: PhantomData,
        })
    }

    /// A worker that answers encrypted requests with [`EdgeError::UnsupportedMode`].
    pub fn plaintext_only(
        config: &EdgeConfig,
        telemetry: Arc<dyn Telemetry>,
    ) -> Result<Self, EdgeError> {
        let mut worker = Self::new(config, telemetry)?;
        worker.encrypted_enabled = false;
        Ok(worker)
    }

    pub fn supports_encrypted(&self) -> bool {
        self.encrypted_enabled
    }

    fn enter(&self, phase: WorkerPhase) {
        self.telemetry.phase(Phase::Worker(phase));
    }

    /// Parses and validates a JSON body, then dispatches it.
    pub fn handle_json(&self, body: &[u8]) -> Result<EdgeResponse<C>, EdgeError> {
        self.enter(WorkerPhase::Receive);
        let wire = WireRequest::from_json(body)?;

        self.enter(WorkerPhase::Validate);
        let request = EdgeRequest::try_from(wire)?;
        self.handle(request)
    }

    /// Dispatches a validated request. For an encrypted request, the compute
    /// stage and `Complete` are reported once the returned stream is exhausted.
    pub fn handle(&self, request: EdgeRequest) -> Result<EdgeResponse<C>, EdgeError> {
        match request {
            EdgeRequest::Plain { size, pixels } => {
                self.enter(WorkerPhase::PlaintextCompute);
                let grid = PixelGrid::try_with(size, pixels)?;
                let started = Instant::now();
                let magnitudes = self.plain.detect(&grid)?;
                self.telemetry.stage_finished(
                    Phase::Worker(WorkerPhase::PlaintextCompute),
                    magnitudes.len(),
                    started.elapsed(),
                );

                self.enter(WorkerPhase::RespondFull);
                self.enter(WorkerPhase::Complete);
                Ok(EdgeResponse::Pixels(magnitudes))
            }
            EdgeRequest::Encrypted {
                size,
                encoding,
                pixels,
                public_key,
                context,
            } => {
                if !self.encrypted_enabled {
                    return Err(EdgeError::UnsupportedMode);
                }
                let cipher = C::restore(&context, &public_key).map_err(|e| {
                    EdgeError::MalformedRequest(format!("Cannot restore cipher: {}", e))
                })?;

                self.enter(WorkerPhase::EncryptedCompute);
                let started = Instant::now();
                let ciphertexts = self
                    .transform
                    .map(&pixels, |text| Ok(ciphertext_from_string(&cipher, text, encoding)?))?;
                let engine = EncryptedGradientEngine::new(cipher, encoding, self.transform.clone());

                let telemetry = Arc::clone(&self.telemetry);
                let stream = engine.stream(ciphertexts, size)?.on_finish(move |records| {
                    telemetry.stage_finished(
                        Phase::Worker(WorkerPhase::EncryptedCompute),
                        records,
                        started.elapsed(),
                    );
                    telemetry.phase(Phase::Worker(WorkerPhase::Complete));
                });

                self.enter(WorkerPhase::RespondStream);
                Ok(EdgeResponse::Gradients(stream))
            }
        }
    }
}

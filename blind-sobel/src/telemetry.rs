//! Phase reporting for the client and worker state machines.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClientPhase {
    BuildRequest,
    KeyGen,
    Encrypt,
    Send,
    ReceiveFull,
    ReceiveStream,
    DecryptAndFinalize,
    Complete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerPhase {
    Receive,
    Validate,
    PlaintextCompute,
    EncryptedCompute,
    RespondFull,
    RespondStream,
    Complete,
}

/// Either side's phase, as reported to a [`Telemetry`] sink.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Client(ClientPhase),
    Worker(WorkerPhase),
}

impl From<ClientPhase> for Phase {
    fn from(phase: ClientPhase) -> Self {
        Phase::Client(phase)
    }
}

impl From<WorkerPhase> for Phase {
    fn from(phase: WorkerPhase) -> Self {
        Phase::Worker(phase)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Client(p) => write!(f, "client/{:?}", p),
            Phase::Worker(p) => write!(f, "worker/{:?}", p),
        }
    }
}

/// Observability sink injected into [`EdgeClient`](crate::protocol::EdgeClient)
/// and [`EdgeWorker`](crate::protocol::EdgeWorker).
///
/// Implementations must never receive secret material; only phases, sizes and
/// timings are reported.
pub trait Telemetry: Send + Sync {
    fn phase(&self, phase: Phase);

    fn stage_finished(&self, phase: Phase, items: usize, elapsed: Duration);
}

/// Reports through the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn phase(&self, phase: Phase) {
        log::debug!("entering {}", phase);
    }

    fn stage_finished(&self, phase: Phase, items: usize, elapsed: Duration) {
        log::info!("{} processed {} items in {:?}", phase, items, elapsed);
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn phase(&self, _phase: Phase) {}

    fn stage_finished(&self, _phase: Phase, _items: usize, _elapsed: Duration) {}
}

use crate::crypto::HomomorphicCipher;
use crate::errors::EdgeError;
use crate::protocol::wire::WireRequest;
use crate::protocol::worker::{EdgeResponse, EdgeWorker};

use std::io::{BufRead, BufReader};

/// A worker's answer as seen by the client.
pub enum WorkerReply {
    Pixels(Vec<u8>),
    /// Newline-delimited gradient records, read as they arrive.
    Stream(Box<dyn BufRead + Send>),
}

/// Delivers a request to a worker. The only point where the client waits on
/// something other than its own computation.
pub trait Transport {
    fn send(&self, request: &WireRequest) -> Result<WorkerReply, EdgeError>;
}

/// Hands requests to an in-process worker, going through the JSON form.
pub struct LoopbackTransport<C: HomomorphicCipher> {
    worker: EdgeWorker<C>,
}

impl<C: HomomorphicCipher> LoopbackTransport<C> {
    pub fn new(worker: EdgeWorker<C>) -> Self {
        Self { worker }
    }
}

impl<C: HomomorphicCipher> Transport for LoopbackTransport<C> {
    fn send(&self, request: &WireRequest) -> Result<WorkerReply, EdgeError> {
        let body = serde_json::to_vec(request)?;
        match self.worker.handle_json(&body)? {
            EdgeResponse::Pixels(pixels) => Ok(WorkerReply::Pixels(pixels)),
            EdgeResponse::Gradients(stream) => Ok(WorkerReply::Stream(Box::new(BufReader::new(
                stream.into_reader(),
            )))),
        }
    }
}

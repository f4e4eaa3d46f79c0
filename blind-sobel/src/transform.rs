//! Order-preserving parallel map over fixed-size chunks.

use crate::errors::EdgeError;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Splits a sequence into contiguous chunks and processes them on rayon.
///
/// Chunks run independently: per-chunk state is rebuilt from a shared seed, and
/// nothing mutable is shared between them. The first failing chunk fails the
/// whole call, and no partial result is returned.
#[derive(Debug, Clone)]
pub struct ChunkedTransform {
    chunk_size: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl ChunkedTransform {
    pub fn new(chunk_size: usize) -> Result<Self, EdgeError> {
        if chunk_size == 0 {
            return Err(EdgeError::InvalidConfig(
                "Chunk size must be > 0".to_string(),
            ));
        }
        Ok(Self {
            chunk_size,
            pool: None,
        })
    }

    /// Runs on a dedicated pool of `workers` threads instead of the global one.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, EdgeError> {
        if workers == 0 {
            return Err(EdgeError::InvalidConfig(
                "Worker count must be > 0".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("blind-sobel-{}", i))
            .build()
            .map_err(|e| EdgeError::InvalidConfig(format!("Cannot build worker pool: {}", e)))?;
        self.pool = Some(Arc::new(pool));
        Ok(self)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks a sequence of `len` items is split into.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size)
    }

    /// Runs `op` inside this transform's pool, or on the global pool.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// `result[i] == f(&items[i])`.
    pub fn map<T, U, F>(&self, items: &[T], f: F) -> Result<Vec<U>, EdgeError>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> Result<U, EdgeError> + Sync,
    {
        self.map_with(items, &(), |_| Ok(()), |_, item| f(item))
    }

    /// Like [`map`](Self::map), but every chunk first builds its own state with
    /// `init(seed)`, e.g. a cipher restored from serialized key bytes.
    pub fn map_with<T, U, P, S, I, F>(
        &self,
        items: &[T],
        seed: &P,
        init: I,
        f: F,
    ) -> Result<Vec<U>, EdgeError>
    where
        T: Sync,
        U: Send,
        P: Sync + ?Sized,
        I: Fn(&P) -> Result<S, EdgeError> + Sync,
        F: Fn(&S, &T) -> Result<U, EdgeError> + Sync,
    {
        let chunks: Result<Vec<Vec<U>>, EdgeError> = self.install(|| {
            items
                .par_chunks(self.chunk_size)
                .enumerate()
                .map(|(index, chunk)| {
                    run_chunk(index, || {
                        let state = init(seed)?;
                        chunk
                            .iter()
                            .map(|item| f(&state, item))
                            .collect::<Result<Vec<U>, EdgeError>>()
                    })
                })
                .collect()
        });

        Ok(chunks?.into_iter().flatten().collect())
    }
}

/// Runs one chunk, turning errors and panics into chunk-tagged failures.
pub(crate) fn run_chunk<U>(
    chunk: usize,
    work: impl FnOnce() -> Result<U, EdgeError>,
) -> Result<U, EdgeError> {
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(EdgeError::ChunkFailed {
            chunk,
            source: Box::new(source),
        }),
        Err(_) => Err(EdgeError::ChunkPanicked { chunk }),
    }
}

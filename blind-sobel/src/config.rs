use crate::crypto::{Encoding, SchemeParams};
use crate::errors::EdgeError;
use crate::transform::{ChunkedTransform, DEFAULT_CHUNK_SIZE};

use serde::{Deserialize, Serialize};

use std::fs;
use std::path::Path;

/// Tunables shared by the client and the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Pixels per parallel chunk, and records per streamed decryption batch.
    pub chunk_size: usize,
    /// Size of a dedicated thread pool. The global rayon pool is used when unset.
    pub workers: Option<usize>,
    /// Bit length of the public modulus for freshly generated keys.
    pub modulus_bits: u32,
    /// Fixed-point precision of the fractional encoding.
    pub scale_bits: u32,
    pub encoding: Encoding,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            modulus_bits: 1024,
            scale_bits: 24,
            encoding: Encoding::default(),
        }
    }
}

impl EdgeConfig {
    /// Checks the scheme-independent fields, returning the config unchanged when
    /// they are usable. Scheme parameters are checked by the client's cipher.
    pub fn try_with(self) -> Result<Self, EdgeError> {
        if self.chunk_size == 0 {
            return Err(EdgeError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(EdgeError::InvalidConfig(
                "workers must be > 0 when set".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EdgeError> {
        let text = fs::read_to_string(path)?;
        let config: EdgeConfig = serde_json::from_str(&text)?;
        config.try_with()
    }

    pub fn scheme_params(&self) -> SchemeParams {
        SchemeParams {
            modulus_bits: self.modulus_bits,
            scale_bits: self.scale_bits,
        }
    }

    /// The chunked transform this configuration describes.
    pub fn transform(&self) -> Result<ChunkedTransform, EdgeError> {
        let transform = ChunkedTransform::new(self.chunk_size)?;
        match self.workers {
            Some(workers) => transform.with_workers(workers),
            None => Ok(transform),
        }
    }
}

use crate::crypto::Encoding;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    /// Scheme parameters that cannot produce a usable instance (modulus too small, bad scale).
    #[error("InvalidParameters: {0}")]
    InvalidParameters(String),
    #[error("KeyGeneration: {0}")]
    KeyGeneration(String),
    /// A ciphertext was combined with, or decrypted as, a different numeric encoding.
    #[error("Encoding mismatch: expected {expected} ciphertext, found {found}")]
    EncodingMismatch { expected: Encoding, found: Encoding },
    #[error("MalformedCiphertext: {0}")]
    MalformedCiphertext(String),
    #[error("MalformedKey: {0}")]
    MalformedKey(String),
    /// Plaintext does not fit the signed range of the modulus.
    #[error("OutOfRange: {0}")]
    OutOfRange(String),

    #[error("Data serialization: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum EdgeError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Request rejected at the boundary, before any pixel work started.
    #[error("MalformedRequest: {0}")]
    MalformedRequest(String),
    #[error("Encrypted edge detection is not implemented by this worker")]
    UnsupportedMode,
    #[error("MalformedResponse: {0}")]
    MalformedResponse(String),

    #[error("Transport: {0}")]
    Transport(String),
    #[error("Worker rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Chunk {chunk} failed: {source}")]
    ChunkFailed {
        chunk: usize,
        #[source]
        source: Box<EdgeError>,
    },
    #[error("Chunk {chunk} panicked")]
    ChunkPanicked { chunk: usize },

    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),
    /// Image shapes the protocol cannot carry (it only transmits one side length).
    #[error("Unsupported image shape: {0}")]
    UnsupportedShape(String),

    #[error("Io: {0}")]
    Io(#[from] std::io::Error),
    #[error("Data serialization: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Base64 decoding: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl EdgeError {
    /// Strips `ChunkFailed` wrappers down to the error raised inside the chunk.
    pub fn root(&self) -> &EdgeError {
        match self {
            EdgeError::ChunkFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

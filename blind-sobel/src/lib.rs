//! Sobel edge detection over plaintext or additively homomorphic ciphertexts.
//!
//! ```
//! use blind_sobel::engine::PlaintextGradientEngine;
//! use blind_sobel::grid::PixelGrid;
//! use blind_sobel::transform::ChunkedTransform;
//!
//! let mut pixels = vec![0u8; 16];
//! pixels[10] = 255;
//! let grid = PixelGrid::try_with(4, pixels).unwrap();
//!
//! let engine = PlaintextGradientEngine::new(ChunkedTransform::new(128).unwrap());
//! let edges = engine.detect(&grid).unwrap();
//! assert_eq!(&edges[4..8], &[0, 255, 255, 0]);
//! ```

pub mod config;
pub mod crypto;
pub mod engine;
pub mod errors;
pub mod grid;
pub mod kernel;
pub mod pipeline;
pub mod protocol;
pub mod telemetry;
pub mod transform;

pub use config::EdgeConfig;
pub use errors::{CryptoError, EdgeError};
pub use grid::PixelGrid;

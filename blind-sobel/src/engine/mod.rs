//! # Gradient engines
//!
//! Sobel splits into two linear components and one nonlinear step. The engines
//! compute the linear part, `Gx` and `Gy`; [`integer_magnitude`] and
//! [`fractional_magnitude`] are the nonlinear finalization. For encrypted
//! inputs that step runs only after decryption, on the client.

pub mod encrypted;
pub mod plain;

pub use encrypted::{EncryptedGradientEngine, GradientReader, GradientStream};
pub use plain::PlaintextGradientEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradientPair<T> {
    pub gx: T,
    pub gy: T,
}

impl<T> GradientPair<T> {
    pub fn new(gx: T, gy: T) -> Self {
        Self { gx, gy }
    }
}

/// `min(floor(sqrt(gx² + gy²)), 255)` for raw pixel-scale gradients.
pub fn integer_magnitude(gx: i64, gy: i64) -> u8 {
    let squared = (gx as f64).powi(2) + (gy as f64).powi(2);
    squared.sqrt().floor().min(255.0) as u8
}

/// `clamp(round(sqrt(gx² + gy²) · 255), 0, 255)` for gradients of pixels
/// normalized to `[0, 1]`.
pub fn fractional_magnitude(gx: f64, gy: f64) -> u8 {
    let magnitude = (gx * gx + gy * gy).sqrt() * 255.0;
    if magnitude.is_nan() {
        return 0;
    }
    magnitude.round().clamp(0.0, 255.0) as u8
}

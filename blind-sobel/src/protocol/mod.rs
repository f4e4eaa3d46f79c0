//! # Edge detection protocol
//!
//! A trusted [`EdgeClient`] sends an image to an untrusted [`EdgeWorker`] over
//! some [`Transport`]. In plaintext mode the worker returns final magnitudes. In
//! encrypted mode it only ever sees ciphertexts plus public material, and
//! streams back encrypted gradient pairs that the client decrypts and finalizes.

pub mod client;
pub mod stream;
pub mod transport;
pub mod wire;
pub mod worker;

pub use client::{DetectionMode, EdgeClient};
pub use transport::{LoopbackTransport, Transport, WorkerReply};
pub use wire::{EdgeRequest, ErrorBody, PlainResponse, WireRequest};
pub use worker::{EdgeResponse, EdgeWorker};

//! Client-side encryption of pixels and decryption of gradient records.

pub mod decrypt;
pub mod encrypt;

pub use decrypt::DecryptionPipeline;
pub use encrypt::EncryptionPipeline;

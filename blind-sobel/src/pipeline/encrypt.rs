use crate::crypto::codec::ciphertext_to_string;
use crate::crypto::{Encoding, HomomorphicCipher, KeyMaterial};
use crate::errors::EdgeError;
use crate::transform::ChunkedTransform;

use std::marker::PhantomData;

/// Encrypts pixels into transport strings.
///
/// Every chunk restores its own cipher from the context and public key bytes.
/// The secret key is never handed to this side.
pub struct EncryptionPipeline<C: HomomorphicCipher> {
    transform: ChunkedTransform,
    _cipher: PhantomData<fn() -> C>,
}

impl<C: HomomorphicCipher> EncryptionPipeline<C> {
    pub fn new(transform: ChunkedTransform) -> Self {
        Self {
            transform,
            _cipher: PhantomData,
        }
    }

    /// One base64 ciphertext per pixel, in pixel order.
    pub fn encrypt(
        &self,
        pixels: &[u8],
        encoding: Encoding,
        keys: &KeyMaterial,
    ) -> Result<Vec<String>, EdgeError> {
        let public = (keys.context.as_slice(), keys.public_key.as_slice());
        self.transform.map_with(
            pixels,
            &public,
            |(context, public_key)| Ok(C::restore(context, public_key)?),
            |cipher, &pixel| {
                let ciphertext = cipher.encrypt(encoding.encode_pixel(pixel))?;
                Ok(ciphertext_to_string(cipher, &ciphertext))
            },
        )
    }
}

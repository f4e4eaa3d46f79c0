//! Transport-safe string forms of ciphertexts and key blobs.
//!
//! Standard base64 never produces spaces or newlines, which is what lets the
//! gradient stream use them as field and record separators.

use crate::crypto::{Ciphertext, Encoding, HomomorphicCipher};
use crate::errors::CryptoError;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes a ciphertext as base64 of its tagged byte form.
pub fn ciphertext_to_string<C: HomomorphicCipher>(
    cipher: &C,
    ciphertext: &Ciphertext<C::Element>,
) -> String {
    STANDARD.encode(cipher.ciphertext_to_bytes(ciphertext))
}

/// Decodes a base64 ciphertext and checks its encoding tag.
pub fn ciphertext_from_string<C: HomomorphicCipher>(
    cipher: &C,
    text: &str,
    expected: Encoding,
) -> Result<Ciphertext<C::Element>, CryptoError> {
    let bytes = STANDARD
        .decode(text)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("Base64 decoding failed: {}", e)))?;
    cipher.ciphertext_from_bytes(&bytes, expected)
}

pub fn blob_to_string(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn blob_from_string(text: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(text)
        .map_err(|e| CryptoError::MalformedKey(format!("Base64 decoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    quickcheck! {
        fn prop_blob_round_trips(data: Vec<u8>) -> bool {
            let text = blob_to_string(&data);
            !text.contains(' ') && !text.contains('\n')
                && blob_from_string(&text).map(|back| back == data).unwrap_or(false)
        }
    }

    #[test]
    fn rejects_non_base64_blob() {
        assert!(matches!(
            blob_from_string("not base64!"),
            Err(CryptoError::MalformedKey(_))
        ));
    }
}

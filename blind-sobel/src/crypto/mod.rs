//! # Crypto capability
//!
//! The narrow interface the edge-detection core consumes from a homomorphic
//! cryptosystem. The worker only ever sees a [`HomomorphicCipher`] restored from
//! public bytes; decryption lives behind [`SecretCipher`] and stays on the client.

pub mod codec;
pub mod paillier;

use crate::errors::CryptoError;

use serde::{Deserialize, Serialize};

use std::fmt;

/// Numeric encoding of a plaintext, fixed for a whole request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Integer,
    #[default]
    Fractional,
}

impl Encoding {
    pub fn tag(self) -> u8 {
        match self {
            Encoding::Integer => 0,
            Encoding::Fractional => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Encoding::Integer),
            1 => Some(Encoding::Fractional),
            _ => None,
        }
    }

    /// Lifts a pixel byte into this encoding (fractional pixels are normalized by 255).
    pub fn encode_pixel(self, pixel: u8) -> PlaintextValue {
        match self {
            Encoding::Integer => PlaintextValue::Integer(pixel as i64),
            Encoding::Fractional => PlaintextValue::Fractional(pixel as f64 / 255.0),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Integer => write!(f, "integer"),
            Encoding::Fractional => write!(f, "fractional"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PlaintextValue {
    Integer(i64),
    Fractional(f64),
}

impl PlaintextValue {
    pub fn encoding(&self) -> Encoding {
        match self {
            PlaintextValue::Integer(_) => Encoding::Integer,
            PlaintextValue::Fractional(_) => Encoding::Fractional,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            PlaintextValue::Integer(v) => v as f64,
            PlaintextValue::Fractional(v) => v,
        }
    }
}

/// A scheme element tagged with the encoding its plaintext was produced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext<E> {
    pub encoding: Encoding,
    pub element: E,
}

impl<E> Ciphertext<E> {
    pub fn new(encoding: Encoding, element: E) -> Self {
        Self { encoding, element }
    }

    pub fn expect_encoding(&self, expected: Encoding) -> Result<(), CryptoError> {
        if self.encoding != expected {
            return Err(CryptoError::EncodingMismatch {
                expected,
                found: self.encoding,
            });
        }
        Ok(())
    }
}

/// Parameters for a fresh scheme instance. Serialized as the public context blob.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeParams {
    /// Bit length of the public modulus.
    pub modulus_bits: u32,
    /// Fixed-point precision of the fractional encoding.
    pub scale_bits: u32,
}

/// Secret key bytes. Never printed, never put on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes(<redacted {} bytes>)", self.0.len())
    }
}

/// Everything a client needs for one encrypted request.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub context: Vec<u8>,
    pub public_key: Vec<u8>,
    pub secret_key: SecretBytes,
}

/// Public half of a cryptosystem: everything an untrusted worker may do.
pub trait HomomorphicCipher: Sized + Send + Sync + 'static {
    type Element: Clone + Send + Sync + 'static;

    /// Rebuilds an instance from the serialized context and public key.
    fn restore(context: &[u8], public_key: &[u8]) -> Result<Self, CryptoError>;

    fn encrypt(&self, value: PlaintextValue) -> Result<Ciphertext<Self::Element>, CryptoError>;

    fn add_elements(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;

    fn neg_element(&self, a: &Self::Element) -> Result<Self::Element, CryptoError>;

    fn element_to_bytes(&self, element: &Self::Element) -> Vec<u8>;

    fn element_from_bytes(&self, bytes: &[u8]) -> Result<Self::Element, CryptoError>;

    fn add(
        &self,
        a: &Ciphertext<Self::Element>,
        b: &Ciphertext<Self::Element>,
    ) -> Result<Ciphertext<Self::Element>, CryptoError> {
        b.expect_encoding(a.encoding)?;
        Ok(Ciphertext::new(
            a.encoding,
            self.add_elements(&a.element, &b.element),
        ))
    }

    fn sub(
        &self,
        a: &Ciphertext<Self::Element>,
        b: &Ciphertext<Self::Element>,
    ) -> Result<Ciphertext<Self::Element>, CryptoError> {
        b.expect_encoding(a.encoding)?;
        let negated = self.neg_element(&b.element)?;
        Ok(Ciphertext::new(
            a.encoding,
            self.add_elements(&a.element, &negated),
        ))
    }

    fn neg(
        &self,
        a: &Ciphertext<Self::Element>,
    ) -> Result<Ciphertext<Self::Element>, CryptoError> {
        Ok(Ciphertext::new(a.encoding, self.neg_element(&a.element)?))
    }

    /// Tag byte followed by the scheme's element bytes.
    fn ciphertext_to_bytes(&self, ciphertext: &Ciphertext<Self::Element>) -> Vec<u8> {
        let body = self.element_to_bytes(&ciphertext.element);
        let mut bytes = Vec::with_capacity(body.len() + 1);
        bytes.push(ciphertext.encoding.tag());
        bytes.extend_from_slice(&body);
        bytes
    }

    fn ciphertext_from_bytes(
        &self,
        bytes: &[u8],
        expected: Encoding,
    ) -> Result<Ciphertext<Self::Element>, CryptoError> {
        let (&tag, body) = bytes
            .split_first()
            .ok_or_else(|| CryptoError::MalformedCiphertext("empty ciphertext".to_string()))?;
        let found = Encoding::from_tag(tag).ok_or_else(|| {
            CryptoError::MalformedCiphertext(format!("unknown encoding tag {}", tag))
        })?;
        let ciphertext = Ciphertext::new(found, self.element_from_bytes(body)?);
        ciphertext.expect_encoding(expected)?;
        Ok(ciphertext)
    }
}

/// Element type of the public half of a secret cipher.
pub type ElementOf<S> = <<S as SecretCipher>::Public as HomomorphicCipher>::Element;

/// Key generation and decryption. Only ever instantiated on the client.
pub trait SecretCipher: Sized + Send + Sync + 'static {
    type Public: HomomorphicCipher;

    /// Rejects parameters this scheme cannot instantiate, without generating keys.
    fn check_params(params: &SchemeParams) -> Result<(), CryptoError>;

    /// Generates a context and key pair and serializes all three parts.
    fn generate(params: &SchemeParams) -> Result<KeyMaterial, CryptoError>;

    fn restore_secret(keys: &KeyMaterial) -> Result<Self, CryptoError>;

    fn public(&self) -> &Self::Public;

    fn decrypt_element(
        &self,
        element: &ElementOf<Self>,
        encoding: Encoding,
    ) -> Result<PlaintextValue, CryptoError>;

    /// Decrypts after checking the ciphertext carries the expected encoding tag.
    fn decrypt(
        &self,
        ciphertext: &Ciphertext<ElementOf<Self>>,
        expected: Encoding,
    ) -> Result<PlaintextValue, CryptoError> {
        ciphertext.expect_encoding(expected)?;
        self.decrypt_element(&ciphertext.element, expected)
    }
}

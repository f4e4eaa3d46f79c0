//! # Paillier capability
//!
//! Additively homomorphic public-key encryption over Z_{n^2}. Plaintexts live in
//! Z_n and are read back in the centered range, so negative gradient sums survive.
//! Fractional values are fixed point with `scale_bits` of precision.

pub mod keys;
pub mod primes;
pub mod ring;

use crate::crypto::paillier::keys::{PublicKey, SecretKey, validate_params};
use crate::crypto::paillier::primes::random_below;
use crate::crypto::paillier::ring::BigRing;
use crate::crypto::{
    Ciphertext, ElementOf, Encoding, HomomorphicCipher, KeyMaterial, PlaintextValue,
    SchemeParams, SecretBytes, SecretCipher,
};
use crate::errors::CryptoError;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

/// Encrypting side of the scheme, bound to one context and public key.
#[derive(Debug, Clone)]
pub struct PaillierPublic {
    params: SchemeParams,
    public_key: PublicKey,
    plain: BigRing,
    cipher: BigRing,
}

impl PaillierPublic {
    pub fn try_with(params: SchemeParams, public_key: PublicKey) -> Result<Self, CryptoError> {
        validate_params(&params)?;
        if public_key.n.bits() != params.modulus_bits as u64 {
            return Err(CryptoError::MalformedKey(format!(
                "Public modulus has {} bits, context declares {}",
                public_key.n.bits(),
                params.modulus_bits
            )));
        }

        let n_squared = &public_key.n * &public_key.n;
        Ok(Self {
            params,
            plain: BigRing::try_with(public_key.n.clone())?,
            cipher: BigRing::try_with(n_squared)?,
            public_key,
        })
    }

    pub fn params(&self) -> &SchemeParams {
        &self.params
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn scale(&self) -> f64 {
        (1u64 << self.params.scale_bits) as f64
    }

    /// Maps a plaintext onto Z_n, negative values wrapping to the top half.
    fn encode(&self, value: PlaintextValue) -> Result<BigUint, CryptoError> {
        let signed = match value {
            PlaintextValue::Integer(v) => BigInt::from(v),
            PlaintextValue::Fractional(v) => {
                let scaled = (v * self.scale()).round();
                if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
                    return Err(CryptoError::OutOfRange(format!(
                        "Fractional value {} cannot be encoded",
                        v
                    )));
                }
                BigInt::from(scaled as i64)
            }
        };

        if !self.plain.fits_centered(&signed) {
            return Err(CryptoError::OutOfRange(format!(
                "Plaintext {} does not fit the modulus",
                signed
            )));
        }
        Ok(self.plain.normalize(&signed))
    }

    fn decode(&self, residue: &BigUint, encoding: Encoding) -> Result<PlaintextValue, CryptoError> {
        let signed = self.plain.centered(residue);
        match encoding {
            Encoding::Integer => signed.to_i64().map(PlaintextValue::Integer).ok_or_else(|| {
                CryptoError::OutOfRange("Decrypted integer exceeds 64 bits".to_string())
            }),
            Encoding::Fractional => signed
                .to_f64()
                .map(|v| PlaintextValue::Fractional(v / self.scale()))
                .ok_or_else(|| {
                    CryptoError::OutOfRange("Decrypted value is not representable".to_string())
                }),
        }
    }

    /// Random r in Z_n^*.
    fn random_unit(&self) -> BigUint {
        let n = self.plain.modulus();
        loop {
            let r = random_below(n);
            if !r.is_zero() && r.gcd(n).is_one() {
                return r;
            }
        }
    }
}

impl HomomorphicCipher for PaillierPublic {
    type Element = BigUint;

    fn restore(context: &[u8], public_key: &[u8]) -> Result<Self, CryptoError> {
        let params: SchemeParams = serde_json::from_slice(context)?;
        let public_key: PublicKey = serde_json::from_slice(public_key)?;
        Self::try_with(params, public_key)
    }

    /// c = (1 + m·n) · r^n mod n^2
    fn encrypt(&self, value: PlaintextValue) -> Result<Ciphertext<BigUint>, CryptoError> {
        let n = self.plain.modulus();
        let m = self.encode(value)?;
        let g_m = self.cipher.add(&BigUint::one(), &(m * n));
        let r_n = self.cipher.pow(&self.random_unit(), n);
        Ok(Ciphertext::new(value.encoding(), self.cipher.mul(&g_m, &r_n)))
    }

    fn add_elements(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.cipher.mul(a, b)
    }

    fn neg_element(&self, a: &BigUint) -> Result<BigUint, CryptoError> {
        self.cipher
            .inv(a)
            .map_err(|e| CryptoError::MalformedCiphertext(format!("Cannot negate: {}", e)))
    }

    fn element_to_bytes(&self, element: &BigUint) -> Vec<u8> {
        element.to_bytes_be()
    }

    fn element_from_bytes(&self, bytes: &[u8]) -> Result<BigUint, CryptoError> {
        let element = BigUint::from_bytes_be(bytes);
        if element.is_zero() || &element >= self.cipher.modulus() {
            return Err(CryptoError::MalformedCiphertext(
                "Ciphertext is outside Z_{n^2}".to_string(),
            ));
        }
        Ok(element)
    }
}

/// Decrypting side of the scheme. Holds λ and μ = λ^-1 mod n.
#[derive(Clone)]
pub struct PaillierSecret {
    public: PaillierPublic,
    lambda: BigUint,
    mu: BigUint,
}

impl std::fmt::Debug for PaillierSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaillierSecret")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl SecretCipher for PaillierSecret {
    type Public = PaillierPublic;

    fn check_params(params: &SchemeParams) -> Result<(), CryptoError> {
        validate_params(params)
    }

    fn generate(params: &SchemeParams) -> Result<KeyMaterial, CryptoError> {
        let secret_key = SecretKey::try_with(params)?;
        let public_key = secret_key.get_public_key();

        Ok(KeyMaterial {
            context: serde_json::to_vec(params)?,
            public_key: serde_json::to_vec(&public_key)?,
            secret_key: SecretBytes::new(serde_json::to_vec(&secret_key)?),
        })
    }

    fn restore_secret(keys: &KeyMaterial) -> Result<Self, CryptoError> {
        let public = PaillierPublic::restore(&keys.context, &keys.public_key)?;
        // serde_json errors may quote the input, so the cause is dropped here
        let secret_key: SecretKey = serde_json::from_slice(keys.secret_key.expose())
            .map_err(|_| CryptoError::MalformedKey("Secret key could not be parsed".into()))?;
        secret_key.check_against(&public.public_key)?;

        let lambda = secret_key.lambda();
        let mu = public.plain.inv(&lambda)?;
        Ok(Self { public, lambda, mu })
    }

    fn public(&self) -> &PaillierPublic {
        &self.public
    }

    /// m = L(c^λ mod n^2) · μ mod n, with L(x) = (x - 1) / n
    fn decrypt_element(
        &self,
        element: &ElementOf<Self>,
        encoding: Encoding,
    ) -> Result<PlaintextValue, CryptoError> {
        let n = self.public.plain.modulus();
        let u = self.public.cipher.pow(element, &self.lambda);
        if u.is_zero() {
            return Err(CryptoError::MalformedCiphertext(
                "Ciphertext is not a unit".to_string(),
            ));
        }
        let l = (u - BigUint::one()) / n;
        let residue = self.public.plain.mul(&l, &self.mu);
        self.public.decode(&residue, encoding)
    }
}

use crate::crypto::SchemeParams;
use crate::crypto::paillier::primes::generate_prime;
use crate::errors::CryptoError;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;

use serde::{Deserialize, Serialize};

use std::fmt;

pub const MIN_MODULUS_BITS: u32 = 128;
pub const MIN_SCALE_BITS: u32 = 8;
pub const MAX_SCALE_BITS: u32 = 52;

/// Checks that the parameters describe a usable scheme instance.
pub fn validate_params(params: &SchemeParams) -> Result<(), CryptoError> {
    if params.modulus_bits < MIN_MODULUS_BITS {
        return Err(CryptoError::InvalidParameters(format!(
            "Modulus must have at least {} bits, got {}",
            MIN_MODULUS_BITS, params.modulus_bits
        )));
    }
    if params.modulus_bits % 2 != 0 {
        return Err(CryptoError::InvalidParameters(format!(
            "Modulus bit length must be even, got {}",
            params.modulus_bits
        )));
    }
    if !(MIN_SCALE_BITS..=MAX_SCALE_BITS).contains(&params.scale_bits) {
        return Err(CryptoError::InvalidParameters(format!(
            "Fixed-point scale must be within {}..={} bits, got {}",
            MIN_SCALE_BITS, MAX_SCALE_BITS, params.scale_bits
        )));
    }
    Ok(())
}

/// Public modulus n = p·q. The generator is fixed to n + 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub n: BigUint,
}

/// The two prime factors of n.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey {
    pub p: BigUint,
    pub q: BigUint,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl SecretKey {
    /// Generates two distinct primes of half the modulus size each.
    pub fn try_with(params: &SchemeParams) -> Result<Self, CryptoError> {
        validate_params(params)?;
        let half = (params.modulus_bits / 2) as u64;

        let p = generate_prime(half)?;
        let mut attempts = 0;
        loop {
            attempts += 1;
            if attempts > 1000 {
                return Err(CryptoError::KeyGeneration(
                    "Could not find a second prime distinct from the first".into(),
                ));
            }
            let q = generate_prime(half)?;
            if q != p {
                return Ok(Self { p, q });
            }
        }
    }

    pub fn get_public_key(&self) -> PublicKey {
        PublicKey {
            n: &self.p * &self.q,
        }
    }

    /// λ = lcm(p - 1, q - 1).
    pub fn lambda(&self) -> BigUint {
        let p1 = &self.p - BigUint::one();
        let q1 = &self.q - BigUint::one();
        p1.lcm(&q1)
    }

    /// Rejects factors that do not multiply to the given public modulus.
    pub fn check_against(&self, public_key: &PublicKey) -> Result<(), CryptoError> {
        if &self.p * &self.q != public_key.n {
            return Err(CryptoError::MalformedKey(
                "Secret key does not match the public key".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_params() {
        let too_small = SchemeParams { modulus_bits: 64, scale_bits: 16 };
        let odd = SchemeParams { modulus_bits: 257, scale_bits: 16 };
        let coarse = SchemeParams { modulus_bits: 256, scale_bits: 4 };
        let fine = SchemeParams { modulus_bits: 256, scale_bits: 60 };
        for params in [too_small, odd, coarse, fine] {
            assert!(matches!(
                validate_params(&params),
                Err(CryptoError::InvalidParameters(_))
            ));
        }
    }

    #[test]
    fn test_key_generation() -> Result<(), CryptoError> {
        let params = SchemeParams { modulus_bits: 256, scale_bits: 16 };
        let secret = SecretKey::try_with(&params)?;
        let public = secret.get_public_key();

        assert_eq!(public.n.bits(), 256);
        secret.check_against(&public)?;
        assert!(format!("{:?}", secret).contains("redacted"));
        Ok(())
    }
}

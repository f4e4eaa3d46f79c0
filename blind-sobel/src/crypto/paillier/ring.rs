//! Modular arithmetic over the plaintext ring Z_n and the ciphertext ring Z_{n^2}.

use crate::errors::CryptoError;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, Zero};

/// Represents a finite ring Z_n over arbitrary precision integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigRing {
    modulus: BigUint,
}

impl BigRing {
    /// Create a new ring with the given modulus.
    ///
    /// The modulus must be greater than 1.
    pub fn try_with(modulus: BigUint) -> Result<Self, CryptoError> {
        if modulus <= BigUint::one() {
            return Err(CryptoError::InvalidParameters(format!(
                "Modulus must be greater than 1, got {}",
                modulus
            )));
        }

        Ok(BigRing { modulus })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Normalizes a signed value into `[0, modulus - 1]`.
    ///
    /// # Example
    ///
    /// ```
    /// # use blind_sobel::crypto::paillier::ring::BigRing;
    /// # use num_bigint::{BigInt, BigUint};
    /// let ring = BigRing::try_with(BigUint::from(10u32)).unwrap();
    /// assert_eq!(ring.normalize(&BigInt::from(15)), BigUint::from(5u32));
    /// assert_eq!(ring.normalize(&BigInt::from(-3)), BigUint::from(7u32));
    /// ```
    pub fn normalize(&self, value: &BigInt) -> BigUint {
        let m = BigInt::from_biguint(Sign::Plus, self.modulus.clone());
        let mut rem = value % &m;
        if rem.is_negative() {
            rem += &m;
        }
        // rem is in [0, m) here
        rem.magnitude().clone()
    }

    /// Maps `[0, modulus)` onto the centered range `(-modulus/2, modulus/2]`.
    ///
    /// # Example
    ///
    /// ```
    /// # use blind_sobel::crypto::paillier::ring::BigRing;
    /// # use num_bigint::{BigInt, BigUint};
    /// let ring = BigRing::try_with(BigUint::from(10u32)).unwrap();
    /// assert_eq!(ring.centered(&BigUint::from(3u32)), BigInt::from(3));
    /// assert_eq!(ring.centered(&BigUint::from(7u32)), BigInt::from(-3));
    /// ```
    pub fn centered(&self, value: &BigUint) -> BigInt {
        let reduced = value % &self.modulus;
        let half = &self.modulus >> 1u32;
        if reduced > half {
            BigInt::from_biguint(Sign::Plus, reduced) - BigInt::from_biguint(Sign::Plus, self.modulus.clone())
        } else {
            BigInt::from_biguint(Sign::Plus, reduced)
        }
    }

    /// Whether a signed value survives a round trip through [`BigRing::centered`].
    pub fn fits_centered(&self, value: &BigInt) -> bool {
        let half = &self.modulus >> 1u32;
        value.magnitude() < &half
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.modulus
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    pub fn pow(&self, base: &BigUint, exponent: &BigUint) -> BigUint {
        base.modpow(exponent, &self.modulus)
    }

    /// Computes the modular multiplicative inverse `a^-1 mod modulus`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::OutOfRange` if `gcd(a, modulus) != 1` or `a` is 0.
    ///
    /// # Example
    ///
    /// ```
    /// # use blind_sobel::crypto::paillier::ring::BigRing;
    /// # use num_bigint::BigUint;
    /// let ring = BigRing::try_with(BigUint::from(10u32)).unwrap();
    /// assert_eq!(ring.inv(&BigUint::from(3u32)).unwrap(), BigUint::from(7u32));
    /// assert!(ring.inv(&BigUint::from(2u32)).is_err());
    /// assert!(ring.inv(&BigUint::from(0u32)).is_err());
    /// ```
    pub fn inv(&self, a: &BigUint) -> Result<BigUint, CryptoError> {
        let a_norm = a % &self.modulus;
        if a_norm.is_zero() {
            return Err(CryptoError::OutOfRange(
                "Cannot invert 0".to_string(),
            ));
        }

        a_norm.modinv(&self.modulus).ok_or_else(|| {
            CryptoError::OutOfRange("Modular inverse does not exist".to_string())
        })
    }
}

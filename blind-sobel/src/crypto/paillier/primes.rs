use crate::errors::CryptoError;

use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{RngCore, rng};

/// Miller-Rabin rounds; error probability is below 4^-40.
const MILLER_RABIN_ROUNDS: usize = 40;

lazy_static! {
    /// Odd primes below 2000, used to discard most candidates before Miller-Rabin.
    static ref SMALL_PRIMES: Vec<u32> = {
        let limit = 2000usize;
        let mut sieve = vec![true; limit];
        sieve[0] = false;
        sieve[1] = false;
        for i in 2..limit {
            if sieve[i] {
                let mut j = i * i;
                while j < limit {
                    sieve[j] = false;
                    j += i;
                }
            }
        }
        (3..limit as u32).filter(|&p| sieve[p as usize]).collect()
    };
}

/// Uniform value in `[0, 2^bits)`.
pub fn random_bits(bits: u64) -> BigUint {
    if bits == 0 {
        return BigUint::zero();
    }
    let nbytes = bits.div_ceil(8) as usize;
    let mut bytes = vec![0u8; nbytes];
    rng().fill_bytes(&mut bytes);
    let excess = 8 * nbytes as u64 - bits;
    if excess > 0 {
        bytes[0] &= 0xFFu8 >> excess;
    }
    BigUint::from_bytes_be(&bytes)
}

/// Uniform value in `[0, bound)` by rejection sampling.
pub fn random_below(bound: &BigUint) -> BigUint {
    let bits = bound.bits();
    loop {
        let candidate = random_bits(bits);
        if &candidate < bound {
            return candidate;
        }
    }
}

pub fn is_probable_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    if n == &two {
        return true;
    }
    if !n.bit(0) {
        return false;
    }
    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    let span = n - 3u32;

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = &two + random_below(&span);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Random prime of exactly `bits` bits with the two top bits set, so the product
/// of two such primes has exactly `2 * bits` bits.
pub fn generate_prime(bits: u64) -> Result<BigUint, CryptoError> {
    if bits < 16 {
        return Err(CryptoError::InvalidParameters(format!(
            "Prime size must be at least 16 bits, got {}",
            bits
        )));
    }

    let top = (BigUint::one() << (bits - 1)) | (BigUint::one() << (bits - 2));
    let mut attempts = 0;
    loop {
        attempts += 1;
        if attempts > 100_000 {
            return Err(CryptoError::KeyGeneration(format!(
                "Could not find a {}-bit prime",
                bits
            )));
        }

        let candidate = random_bits(bits) | &top | BigUint::one();
        if is_probable_prime(&candidate) {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_primes_and_composites() {
        let primes = [2u32, 3, 5, 7, 1999, 7919, 65537];
        let composites = [0u32, 1, 4, 9, 561, 1105, 7917, 65535];
        for p in primes {
            assert!(is_probable_prime(&BigUint::from(p)), "{} is prime", p);
        }
        for c in composites {
            assert!(!is_probable_prime(&BigUint::from(c)), "{} is composite", c);
        }
    }

    #[test]
    fn test_generated_prime_has_requested_size() -> Result<(), CryptoError> {
        let p = generate_prime(64)?;
        assert_eq!(p.bits(), 64);
        assert!(p.bit(62));
        assert!(is_probable_prime(&p));
        Ok(())
    }

    #[test]
    fn test_random_below_stays_in_range() {
        let bound = BigUint::from(1000u32);
        for _ in 0..200 {
            assert!(random_below(&bound) < bound);
        }
    }
}

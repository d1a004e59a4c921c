//! Paillier public-key cryptosystem: key generation, probabilistic
//! encryption, decryption, and the additive homomorphic operations the
//! tallying side relies on.

use crate::{math, Error};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

/// Paillier public key.
///
/// `g` is fixed to `n + 1`, which keeps `g^m mod n^2` cheap for
/// implementations that exploit `(n+1)^m = 1 + m*n (mod n^2)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    #[serde(with = "crate::serde_dec")]
    pub n: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub g: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub n_squared: BigUint,
}

/// Paillier private key. Held only by the tallying role; never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub lambda: BigUint,
    pub mu: BigUint,
    pub n: BigUint,
}

#[derive(Debug, Clone)]
pub struct Keypair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

/// The output of a probabilistic encryption.
///
/// `randomness` is the randomizer `r` used to produce the ciphertext. It is
/// needed once more to build the zero-knowledge proofs for the same ballot
/// and must be discarded afterwards; the type deliberately has no serde.
#[derive(Debug, Clone)]
pub struct Encryption {
    pub ciphertext: BigUint,
    pub randomness: BigUint,
}

/// Generate a Paillier keypair from two fresh `key_bits/2`-bit primes.
pub fn generate_keypair<R: CryptoRng + RngCore>(
    rng: &mut R,
    key_bits: u64,
    mr_rounds: usize,
) -> Result<Keypair, Error> {
    if key_bits < 512 || key_bits % 2 != 0 {
        return Err(Error::InvalidKeyBits(key_bits));
    }

    loop {
        let (p, q) = math::generate_two_primes(rng, key_bits / 2, mr_rounds)?;
        let n = &p * &q;
        // Forcing only the top bit of each prime occasionally leaves the
        // product one bit short; redraw until the modulus has full width.
        if n.bits() != key_bits {
            continue;
        }

        let n_squared = &n * &n;
        let g = &n + 1u32;
        let lambda = math::lcm(&(&p - 1u32), &(&q - 1u32));
        let l = math::l_function(&math::mod_pow(&g, &lambda, &n_squared), &n);
        let mu = math::mod_inverse(&l, &n)?;

        let public = PublicKey {
            n: n.clone(),
            g,
            n_squared,
        };
        let private = PrivateKey { lambda, mu, n };
        return Ok(Keypair { public, private });
    }
}

impl PublicKey {
    /// Encrypt `m` with fresh randomness: `c = g^m * r^n mod n^2`.
    pub fn encrypt<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
        m: &BigUint,
    ) -> Result<Encryption, Error> {
        if m >= &self.n {
            return Err(Error::PlaintextOutOfRange);
        }

        let r = self.sample_randomizer(rng)?;
        let g_m = math::mod_pow(&self.g, m, &self.n_squared);
        let r_n = math::mod_pow(&r, &self.n, &self.n_squared);
        let ciphertext = (g_m * r_n) % &self.n_squared;

        Ok(Encryption {
            ciphertext,
            randomness: r,
        })
    }

    /// Sample `r` uniformly from `[1, n)`, rejecting values sharing a factor
    /// with `n`.
    fn sample_randomizer<R: CryptoRng + RngCore>(&self, rng: &mut R) -> Result<BigUint, Error> {
        loop {
            let r = math::random_range(rng, &BigUint::one(), &self.n)?;
            if math::gcd(&r, &self.n).is_one() {
                return Ok(r);
            }
        }
    }

    pub fn is_valid_ciphertext(&self, c: &BigUint) -> bool {
        !c.is_zero() && c < &self.n_squared
    }

    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }
}

impl PrivateKey {
    /// Decrypt: `m = L(c^lambda mod n^2) * mu mod n`.
    pub fn decrypt(&self, c: &BigUint) -> Result<BigUint, Error> {
        let n_squared = &self.n * &self.n;
        if c.is_zero() || c >= &n_squared {
            return Err(Error::CiphertextOutOfRange);
        }

        let l = math::l_function(&math::mod_pow(c, &self.lambda, &n_squared), &self.n);
        Ok((l * &self.mu) % &self.n)
    }

    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }

    /// Overwrite the key material with zeros.
    pub fn zero(&mut self) {
        self.lambda = BigUint::zero();
        self.mu = BigUint::zero();
        self.n = BigUint::zero();
    }
}

/// Homomorphic addition: the product of two ciphertexts decrypts to the sum
/// of their plaintexts mod `n`.
pub fn add_ciphertexts(c1: &BigUint, c2: &BigUint, pk: &PublicKey) -> Result<BigUint, Error> {
    if !pk.is_valid_ciphertext(c1) || !pk.is_valid_ciphertext(c2) {
        return Err(Error::CiphertextOutOfRange);
    }
    Ok((c1 * c2) % &pk.n_squared)
}

/// Homomorphic scalar multiplication: `c^k` decrypts to `k*m mod n`.
pub fn scalar_mul(c: &BigUint, k: &BigUint, pk: &PublicKey) -> Result<BigUint, Error> {
    if !pk.is_valid_ciphertext(c) {
        return Err(Error::CiphertextOutOfRange);
    }
    Ok(math::mod_pow(c, k, &pk.n_squared))
}

/// Left fold of [`add_ciphertexts`] over a non-empty slice.
pub fn sum_ciphertexts(cs: &[BigUint], pk: &PublicKey) -> Result<BigUint, Error> {
    let (first, rest) = cs.split_first().ok_or(Error::EmptyInput)?;
    if !pk.is_valid_ciphertext(first) {
        return Err(Error::CiphertextOutOfRange);
    }

    let mut acc = first.clone();
    for c in rest {
        acc = add_ciphertexts(&acc, c, pk)?;
    }
    Ok(acc)
}

/// Shared fixtures for the test suites. Key generation at the minimum
/// admissible size is still expensive, so every suite borrows one keypair.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use rand::rngs::OsRng;
    use std::sync::OnceLock;

    pub const TEST_KEY_BITS: u64 = 512;
    pub const TEST_MR_ROUNDS: usize = 10;

    pub fn test_keypair() -> &'static Keypair {
        static KEYPAIR: OnceLock<Keypair> = OnceLock::new();
        KEYPAIR
            .get_or_init(|| generate_keypair(&mut OsRng, TEST_KEY_BITS, TEST_MR_ROUNDS).unwrap())
    }
}

//! Fiat-Shamir challenge derivation.
//!
//! The oracle hashes a domain-separated transcript of the proof commitments
//! (and public inputs) into a challenge in `[0, n)`. It is a trait so the
//! hash can be swapped without touching the proof engine.

use crate::PublicKey;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Domain tag for bit-value proofs.
pub const BIT_VALUE_DOMAIN: &[u8] = b"bit-value";
/// Domain tag for sum-equals-one proofs.
pub const SUM_EQUALS_ONE_DOMAIN: &[u8] = b"sum-equals-one";

/// A random oracle producing Fiat-Shamir challenges in `[0, n)`.
pub trait ChallengeOracle {
    fn derive(&self, domain: &[u8], inputs: &[&BigUint], pk: &PublicKey) -> BigUint;
}

/// SHA-256 challenge oracle.
///
/// Transcript: domain tag, element count, then every input reduced mod `n^2`
/// and encoded big-endian at the fixed byte width of `n^2`. Output: SHA-256
/// in counter mode, masked to the bit length of `n` and rejection-sampled
/// until the value falls below `n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Oracle;

impl ChallengeOracle for Sha256Oracle {
    fn derive(&self, domain: &[u8], inputs: &[&BigUint], pk: &PublicKey) -> BigUint {
        let width = ((pk.n_squared.bits() + 7) / 8) as usize;

        let mut transcript = Vec::with_capacity(domain.len() + 8 + inputs.len() * width);
        transcript.extend_from_slice(&(domain.len() as u32).to_be_bytes());
        transcript.extend_from_slice(domain);
        transcript.extend_from_slice(&(inputs.len() as u32).to_be_bytes());
        for input in inputs {
            let reduced = *input % &pk.n_squared;
            let bytes = reduced.to_bytes_be();
            transcript.resize(transcript.len() + (width - bytes.len()), 0);
            transcript.extend_from_slice(&bytes);
        }

        let out_bits = pk.n.bits();
        let out_bytes = ((out_bits + 7) / 8) as usize;
        let mask = 0xffu8 >> (out_bytes as u64 * 8 - out_bits);

        let mut counter: u32 = 0;
        loop {
            let mut out = Vec::with_capacity(out_bytes);
            let mut block: u32 = 0;
            while out.len() < out_bytes {
                let mut hasher = Sha256::new();
                hasher.update(counter.to_be_bytes());
                hasher.update(block.to_be_bytes());
                hasher.update(&transcript);
                out.extend_from_slice(&hasher.finalize());
                block += 1;
            }
            out.truncate(out_bytes);
            out[0] &= mask;

            let candidate = BigUint::from_bytes_be(&out);
            if candidate < pk.n {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::testing::test_keypair;

    #[test]
    fn output_is_below_n_and_deterministic() {
        let pk = &test_keypair().public;
        let oracle = Sha256Oracle;

        let a = BigUint::from(123u32);
        let b = BigUint::from(456u32);
        let first = oracle.derive(BIT_VALUE_DOMAIN, &[&a, &b], pk);
        let second = oracle.derive(BIT_VALUE_DOMAIN, &[&a, &b], pk);

        assert!(first < pk.n);
        assert_eq!(first, second);
    }

    #[test]
    fn domain_and_order_separate_transcripts() {
        let pk = &test_keypair().public;
        let oracle = Sha256Oracle;

        let a = BigUint::from(123u32);
        let b = BigUint::from(456u32);
        let base = oracle.derive(BIT_VALUE_DOMAIN, &[&a, &b], pk);

        assert_ne!(base, oracle.derive(SUM_EQUALS_ONE_DOMAIN, &[&a, &b], pk));
        assert_ne!(base, oracle.derive(BIT_VALUE_DOMAIN, &[&b, &a], pk));
        assert_ne!(base, oracle.derive(BIT_VALUE_DOMAIN, &[&a], pk));
    }
}

//! The ballot orchestrator: owns the election configuration and key
//! material, and drives encryption, proof generation, verification and
//! tallying.

use crate::{
    generate_vote_proof, paillier, tally, verify_vote_proof, ChallengeOracle, Error, Keypair,
    PrivateKey, PublicKey, Sha256Oracle, Tally, VerificationReport, VoteProof,
};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::rngs::OsRng;

pub const DEFAULT_KEY_BITS: u64 = 1024;
pub const DEFAULT_MILLER_RABIN_ROUNDS: usize = 10;

/// Election parameters fixed before any ballot is cast.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ElectionConfig {
    /// Candidate names; the selection vector width is `candidates.len()`.
    pub candidates: Vec<String>,
    /// Paillier modulus size. 1024 matches the original pedagogical
    /// deployment; real deployments should configure 2048 or more.
    pub key_bits: u64,
    pub miller_rabin_rounds: usize,
}

impl ElectionConfig {
    pub fn new(candidates: Vec<String>) -> Self {
        ElectionConfig {
            candidates,
            key_bits: DEFAULT_KEY_BITS,
            miller_rabin_rounds: DEFAULT_MILLER_RABIN_ROUNDS,
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.candidates.is_empty() {
            return Err(Error::NoCandidates);
        }
        if self.key_bits < 512 || self.key_bits % 2 != 0 {
            return Err(Error::InvalidKeyBits(self.key_bits));
        }
        Ok(())
    }
}

/// The encrypted ballot a voter emits: one ciphertext per candidate slot
/// plus the validity proof. Per-slot randomness never leaves the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BallotPackage {
    pub public_key: PublicKey,
    #[serde(with = "crate::serde_dec::vec")]
    pub ciphertexts: Vec<BigUint>,
    pub proof: VoteProof,
}

/// Decimal-string view of the public key, for display layers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub n: String,
    pub g: String,
    pub bit_length: u64,
}

/// Decimal-string view of the private key, for display layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyInfo {
    pub lambda: String,
    pub mu: String,
    pub bit_length: u64,
}

/// The cryptographic engine behind a single election.
///
/// Holds at most one public and one private key. The voter role loads only
/// the public key; the tallying role generates or loads both. All
/// long-running work (keygen, proof generation) is synchronous and
/// CPU-bound; hosts that need responsiveness run the engine off their UI
/// thread.
pub struct BallotEngine<O: ChallengeOracle = Sha256Oracle> {
    config: ElectionConfig,
    oracle: O,
    public: Option<PublicKey>,
    private: Option<PrivateKey>,
}

impl BallotEngine {
    pub fn new(config: ElectionConfig) -> Result<Self, Error> {
        Self::with_oracle(config, Sha256Oracle)
    }
}

impl<O: ChallengeOracle> BallotEngine<O> {
    pub fn with_oracle(config: ElectionConfig, oracle: O) -> Result<Self, Error> {
        config.validate()?;
        Ok(BallotEngine {
            config,
            oracle,
            public: None,
            private: None,
        })
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    /// Generate and load a fresh keypair.
    pub fn keygen(&mut self) -> Result<(), Error> {
        let keypair = paillier::generate_keypair(
            &mut OsRng,
            self.config.key_bits,
            self.config.miller_rabin_rounds,
        )?;
        self.public = Some(keypair.public);
        self.private = Some(keypair.private);
        Ok(())
    }

    /// Load a previously generated keypair (the tallying role).
    pub fn load_keypair(&mut self, keypair: Keypair) {
        self.public = Some(keypair.public);
        self.private = Some(keypair.private);
    }

    /// Load only the election public key (the voter role).
    pub fn load_public_key(&mut self, public_key: PublicKey) {
        self.public = Some(public_key);
    }

    pub fn public_key(&self) -> Result<&PublicKey, Error> {
        self.public.as_ref().ok_or(Error::NoPublicKey)
    }

    pub fn public_key_info(&self) -> Result<PublicKeyInfo, Error> {
        let pk = self.public_key()?;
        Ok(PublicKeyInfo {
            n: pk.n.to_str_radix(10),
            g: pk.g.to_str_radix(10),
            bit_length: pk.bit_length(),
        })
    }

    pub fn private_key_info(&self) -> Result<PrivateKeyInfo, Error> {
        let sk = self.private.as_ref().ok_or(Error::NoPrivateKey)?;
        Ok(PrivateKeyInfo {
            lambda: sk.lambda.to_str_radix(10),
            mu: sk.mu.to_str_radix(10),
            bit_length: sk.bit_length(),
        })
    }

    /// Zero the private key material and drop both keys.
    pub fn clear(&mut self) {
        if let Some(private) = self.private.as_mut() {
            private.zero();
        }
        self.private = None;
        self.public = None;
    }

    /// Encrypt a selection vector and prove its validity.
    ///
    /// The selection must be exactly one `true` over the configured
    /// candidate set. An all-`false` selection is rejected up front: it
    /// could only produce a ballot whose sum proof is guaranteed to fail.
    pub fn encrypt_and_prove(&self, selection: &[bool]) -> Result<BallotPackage, Error> {
        let pk = self.public_key()?;
        if selection.len() != self.config.candidate_count() {
            return Err(Error::LengthMismatch(
                self.config.candidate_count(),
                selection.len(),
            ));
        }
        if !selection.iter().any(|&chosen| chosen) {
            return Err(Error::EmptySelection);
        }

        let mut rng = OsRng;
        let mut ciphertexts = Vec::with_capacity(selection.len());
        let mut plaintexts = Vec::with_capacity(selection.len());
        let mut randomizers = Vec::with_capacity(selection.len());
        for &chosen in selection {
            let v = if chosen { BigUint::one() } else { BigUint::zero() };
            let encryption = pk.encrypt(&mut rng, &v)?;
            ciphertexts.push(encryption.ciphertext);
            randomizers.push(encryption.randomness);
            plaintexts.push(v);
        }

        let proof = generate_vote_proof(
            &mut rng,
            &self.oracle,
            pk,
            &ciphertexts,
            &plaintexts,
            &randomizers,
        )?;

        // `plaintexts` and `randomizers` drop here; only ciphertexts and the
        // proof leave the engine
        Ok(BallotPackage {
            public_key: pk.clone(),
            ciphertexts,
            proof,
        })
    }

    /// Verify a ballot package. Pure: uses only the embedded public key.
    pub fn verify(&self, package: &BallotPackage) -> VerificationReport {
        verify_vote_proof(
            &self.oracle,
            &package.public_key,
            &package.ciphertexts,
            &package.proof,
        )
    }

    /// Decrypt per-slot counts and the homomorphic total.
    pub fn tally(&self, slots: &[BigUint]) -> Result<Tally, Error> {
        let sk = self.private.as_ref().ok_or(Error::NoPrivateKey)?;
        tally::tally_slots(sk, slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::testing::{test_keypair, TEST_KEY_BITS};

    fn test_config() -> ElectionConfig {
        let mut config = ElectionConfig::new(vec![
            "Ada Lovelace".to_string(),
            "Grace Hopper".to_string(),
            "Katherine Johnson".to_string(),
        ]);
        config.key_bits = TEST_KEY_BITS;
        config
    }

    fn loaded_engine() -> BallotEngine {
        let mut engine = BallotEngine::new(test_config()).unwrap();
        engine.load_keypair(test_keypair().clone());
        engine
    }

    #[test]
    fn config_validation() {
        assert!(matches!(
            BallotEngine::new(ElectionConfig::new(vec![])),
            Err(Error::NoCandidates)
        ));

        let mut config = test_config();
        config.key_bits = 500;
        assert!(matches!(
            BallotEngine::new(config),
            Err(Error::InvalidKeyBits(500))
        ));
    }

    #[test]
    fn engine_without_keys_refuses_to_work() {
        let engine = BallotEngine::new(test_config()).unwrap();
        assert!(matches!(
            engine.encrypt_and_prove(&[true, false, false]),
            Err(Error::NoPublicKey)
        ));
        assert!(matches!(engine.public_key_info(), Err(Error::NoPublicKey)));
        assert!(matches!(
            engine.private_key_info(),
            Err(Error::NoPrivateKey)
        ));
        assert!(matches!(
            engine.tally(&[BigUint::one()]),
            Err(Error::NoPrivateKey)
        ));
    }

    #[test]
    fn key_info_views_are_decimal() {
        let engine = loaded_engine();
        let pk_info = engine.public_key_info().unwrap();
        let sk_info = engine.private_key_info().unwrap();

        assert_eq!(pk_info.bit_length, TEST_KEY_BITS);
        assert_eq!(sk_info.bit_length, TEST_KEY_BITS);
        assert!(pk_info.n.bytes().all(|b| b.is_ascii_digit()));
        assert!(sk_info.lambda.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn clear_wipes_both_keys() {
        let mut engine = loaded_engine();
        assert!(engine.public_key_info().is_ok());

        engine.clear();
        assert!(matches!(engine.public_key_info(), Err(Error::NoPublicKey)));
        assert!(matches!(
            engine.private_key_info(),
            Err(Error::NoPrivateKey)
        ));
    }

    #[test]
    fn selection_width_must_match_candidates() {
        let engine = loaded_engine();
        assert!(matches!(
            engine.encrypt_and_prove(&[true, false]),
            Err(Error::LengthMismatch(3, 2))
        ));
    }

    #[test]
    fn empty_selection_is_rejected_before_encryption() {
        let engine = loaded_engine();
        assert!(matches!(
            engine.encrypt_and_prove(&[false, false, false]),
            Err(Error::EmptySelection)
        ));
    }

    #[test]
    fn voter_role_only_needs_the_public_key() {
        let mut engine = BallotEngine::new(test_config()).unwrap();
        engine.load_public_key(test_keypair().public.clone());

        let package = engine.encrypt_and_prove(&[false, true, false]).unwrap();
        assert!(engine.verify(&package).overall_valid);
        assert!(matches!(
            engine.tally(&package.ciphertexts),
            Err(Error::NoPrivateKey)
        ));
    }

    #[test]
    fn ballot_package_serde_round_trip() {
        let engine = loaded_engine();
        let package = engine.encrypt_and_prove(&[true, false, false]).unwrap();

        let json = serde_json::to_string(&package).unwrap();
        let parsed: BallotPackage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, package);
        assert!(engine.verify(&parsed).overall_valid);
    }
}

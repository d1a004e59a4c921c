//! The ballot submission record.
//!
//! This is the stable wire format a voting client POSTs to the collection
//! endpoint: JSON with camelCase field names and every integer as a base-10
//! string. The crate builds and parses the record; the HTTP client itself
//! belongs to the host application.

use crate::{
    verify_vote_proof, BallotPackage, BitProof, ChallengeOracle, ElectionConfig, Error, PublicKey,
    SumProof, VerificationReport, VoteProof,
};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use uuid::Uuid;

/// Value for the `Content-Type` header on submission.
pub const CONTENT_TYPE: &str = "application/json";
/// Header identifying the ballot scheme to the collection endpoint.
pub const VOTE_TYPE_HEADER: &str = "X-Vote-Type";
pub const VOTE_TYPE: &str = "paillier-zkp";

/// One encrypted candidate slot in the submission.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVote {
    pub candidate_id: u32,
    pub candidate_name: String,
    #[serde(with = "crate::serde_dec")]
    pub ciphertext: BigUint,
}

/// A bit proof annotated with the slot it covers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedBitProof {
    pub candidate_id: u32,
    #[serde(flatten)]
    pub proof: BitProof,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZkpProofs {
    pub bit_proofs: Vec<SubmittedBitProof>,
    pub sum_proof: SumProof,
}

/// The complete ballot submission payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BallotSubmission {
    pub timestamp: DateTime<Utc>,
    pub voter_id: String,
    pub session_id: String,
    pub public_key: PublicKey,
    pub encrypted_votes: Vec<EncryptedVote>,
    pub zkp_proofs: ZkpProofs,
}

impl BallotSubmission {
    /// Assemble the submission for a proved ballot.
    ///
    /// The session id is generated when not supplied. The timestamp is the
    /// proof's generation time, so the record stays internally consistent.
    pub fn new(
        config: &ElectionConfig,
        package: &BallotPackage,
        voter_id: String,
        session_id: Option<String>,
    ) -> Result<Self, Error> {
        if package.ciphertexts.len() != config.candidate_count() {
            return Err(Error::LengthMismatch(
                config.candidate_count(),
                package.ciphertexts.len(),
            ));
        }
        if package.proof.bit_proofs.len() != package.ciphertexts.len() {
            return Err(Error::LengthMismatch(
                package.ciphertexts.len(),
                package.proof.bit_proofs.len(),
            ));
        }

        let encrypted_votes = config
            .candidates
            .iter()
            .zip(&package.ciphertexts)
            .enumerate()
            .map(|(i, (name, ciphertext))| EncryptedVote {
                candidate_id: i as u32,
                candidate_name: name.clone(),
                ciphertext: ciphertext.clone(),
            })
            .collect();

        let bit_proofs = package
            .proof
            .bit_proofs
            .iter()
            .enumerate()
            .map(|(i, proof)| SubmittedBitProof {
                candidate_id: i as u32,
                proof: proof.clone(),
            })
            .collect();

        Ok(BallotSubmission {
            timestamp: package.proof.timestamp,
            voter_id,
            session_id: session_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            public_key: package.public_key.clone(),
            encrypted_votes,
            zkp_proofs: ZkpProofs {
                bit_proofs,
                sum_proof: package.proof.sum_proof.clone(),
            },
        })
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// The slot ciphertexts in candidate order.
    pub fn ciphertexts(&self) -> Vec<BigUint> {
        self.encrypted_votes
            .iter()
            .map(|vote| vote.ciphertext.clone())
            .collect()
    }

    /// Re-verify the embedded proof against the embedded public key: the
    /// authority-side entry point for a received submission.
    pub fn verify<O: ChallengeOracle + ?Sized>(&self, oracle: &O) -> VerificationReport {
        let proof = VoteProof {
            bit_proofs: self
                .zkp_proofs
                .bit_proofs
                .iter()
                .map(|submitted| submitted.proof.clone())
                .collect(),
            sum_proof: self.zkp_proofs.sum_proof.clone(),
            timestamp: self.timestamp,
            tag: Default::default(),
        };
        verify_vote_proof(oracle, &self.public_key, &self.ciphertexts(), &proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::testing::{test_keypair, TEST_KEY_BITS};
    use crate::{BallotEngine, ProofFault, Sha256Oracle};

    fn submission() -> (ElectionConfig, BallotSubmission) {
        let mut config = ElectionConfig::new(vec![
            "Ada Lovelace".to_string(),
            "Grace Hopper".to_string(),
            "Katherine Johnson".to_string(),
        ]);
        config.key_bits = TEST_KEY_BITS;

        let mut engine = BallotEngine::new(config.clone()).unwrap();
        engine.load_keypair(test_keypair().clone());
        let package = engine.encrypt_and_prove(&[false, true, false]).unwrap();
        let submission =
            BallotSubmission::new(&config, &package, "voter-42".to_string(), None).unwrap();
        (config, submission)
    }

    #[test]
    fn wire_format_field_names_are_stable() {
        let (_, submission) = submission();
        let json = submission.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["timestamp"].is_string());
        assert_eq!(value["voterId"], "voter-42");
        assert!(value["sessionId"].is_string());
        assert!(value["publicKey"]["nSquared"].is_string());
        assert_eq!(value["encryptedVotes"][1]["candidateId"], 1);
        assert_eq!(value["encryptedVotes"][1]["candidateName"], "Grace Hopper");
        assert!(value["encryptedVotes"][1]["ciphertext"].is_string());
        assert!(value["zkpProofs"]["bitProofs"][0]["proof0"]["rResponse"].is_string());
        assert_eq!(value["zkpProofs"]["sumProof"]["expectedSum"], "1");
    }

    #[test]
    fn json_round_trip_preserves_the_submission() {
        let (_, submission) = submission();
        let json = submission.to_json().unwrap();
        let parsed = BallotSubmission::from_json(&json).unwrap();
        assert_eq!(parsed, submission);
    }

    #[test]
    fn received_submission_verifies() {
        let (_, submission) = submission();
        let json = submission.to_json().unwrap();

        let received = BallotSubmission::from_json(&json).unwrap();
        let report = received.verify(&Sha256Oracle);
        assert!(report.overall_valid);
    }

    #[test]
    fn tampered_submission_fails_verification() {
        let (_, submission) = submission();
        let mut tampered = submission;
        let bumped = &tampered.encrypted_votes[0].ciphertext + 1u32;
        tampered.encrypted_votes[0].ciphertext = bumped;

        let report = tampered.verify(&Sha256Oracle);
        assert!(!report.overall_valid);
        assert!(matches!(
            tampered.verify(&Sha256Oracle).bit_proof_results[0].fault,
            Some(ProofFault::Malformed(_))
        ));
    }

    #[test]
    fn submission_rejects_mismatched_config() {
        let (config, _) = submission();
        let mut engine = BallotEngine::new(config).unwrap();
        engine.load_keypair(test_keypair().clone());
        let package = engine.encrypt_and_prove(&[true, false, false]).unwrap();

        let narrow_config = ElectionConfig::new(vec!["Ada Lovelace".to_string()]);
        assert!(matches!(
            BallotSubmission::new(&narrow_config, &package, "voter-1".to_string(), None),
            Err(Error::LengthMismatch(1, 3))
        ));
    }
}

//! Non-interactive zero-knowledge proofs over Paillier ciphertexts.
//!
//! Two statements are proven about a ballot. Per slot: the ciphertext
//! encrypts 0 or 1, shown with a disjunctive sigma protocol whose branch
//! for value `b` proves that `c * g^-b` is an n-th residue (one branch is
//! real, the other simulated). For the whole ballot: the homomorphic
//! product of the slots encrypts exactly one vote, shown with a single
//! sigma run proving `C * g^-1` is an n-th residue. Verifying branch `b`
//! against the g-shifted ciphertext is what pins the plaintext to `b`; a
//! ciphertext of any other value leaves a `g` component that no response
//! can cancel. Both proofs are made non-interactive with the Fiat-Shamir
//! transform via a [`ChallengeOracle`].
//!
//! Proof *generation* raises [`Error`] on bad inputs. Proof *verification*
//! never raises: it returns verdicts carrying a [`ProofFault`] per rejected
//! sub-proof so the authority can report exactly what failed.

use crate::{
    math, paillier, ChallengeOracle, Error, ProofFault, PublicKey, BIT_VALUE_DOMAIN,
    SUM_EQUALS_ONE_DOMAIN,
};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, RngCore};

macro_rules! record_tag {
    ($name:ident, $tag:literal) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str($tag)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let tag = <String as serde::Deserialize>::deserialize(deserializer)?;
                if tag == $tag {
                    Ok($name)
                } else {
                    Err(serde::de::Error::custom(format!(
                        "expected record tag {:?}, found {:?}",
                        $tag, tag
                    )))
                }
            }
        }
    };
}

record_tag!(BitValueTag, "bit-value");
record_tag!(SumEqualsOneTag, "sum-equals-one");
record_tag!(CompleteVoteProofTag, "complete-vote-proof");

/// One sigma-protocol transcript: commitment `a = r'^n`, challenge share
/// `e`, and the randomness response `r' * R^e`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SigmaTriple {
    #[serde(with = "crate::serde_dec")]
    pub a: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub e: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub r_response: BigUint,
}

/// Disjunctive proof that a ciphertext encrypts 0 or 1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BitProof {
    pub proof0: SigmaTriple,
    pub proof1: SigmaTriple,
    #[serde(with = "crate::serde_dec")]
    pub ciphertext: BigUint,
    #[serde(rename = "type", default)]
    pub tag: BitValueTag,
}

/// Proof that the homomorphic product of the ballot slots encrypts 1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SumProof {
    #[serde(with = "crate::serde_dec")]
    pub encrypted_sum: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub expected_sum: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub a: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub e: BigUint,
    #[serde(with = "crate::serde_dec")]
    pub r_response: BigUint,
    #[serde(rename = "type", default)]
    pub tag: SumEqualsOneTag,
}

/// The complete validity proof for one ballot: a bit proof per candidate
/// slot plus one sum proof over their homomorphic product.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteProof {
    pub bit_proofs: Vec<BitProof>,
    pub sum_proof: SumProof,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub tag: CompleteVoteProofTag,
}

/// Verdict for a single candidate slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BitProofResult {
    pub candidate_index: usize,
    pub valid: bool,
    pub fault: Option<ProofFault>,
}

/// Verdict for the sum proof.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SumProofResult {
    pub valid: bool,
    pub fault: Option<ProofFault>,
}

/// Structured result of verifying a complete ballot proof.
///
/// `overall_valid` is the only externally meaningful verdict; the rest is
/// per-slot diagnostic detail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub overall_valid: bool,
    pub bit_proofs_valid: bool,
    pub bit_proof_results: Vec<BitProofResult>,
    pub sum_proof_valid: bool,
    pub sum_proof_result: SumProofResult,
}

/// Prove that `ciphertext` encrypts the bit `v` under `pk`.
///
/// The statement for value `b` is that `c * g^-b mod n^2` is an n-th
/// residue; for the actual value that residue is `R^n` with `R` the
/// randomizer captured at encryption time, so the real branch runs
/// honestly. The other branch is simulated by choosing its challenge share
/// and response first and solving for the commitment.
pub fn prove_bit_value<R: CryptoRng + RngCore, O: ChallengeOracle + ?Sized>(
    rng: &mut R,
    oracle: &O,
    pk: &PublicKey,
    v: bool,
    ciphertext: &BigUint,
    randomness: &BigUint,
) -> Result<BitProof, Error> {
    if !pk.is_valid_ciphertext(ciphertext) {
        return Err(Error::CiphertextOutOfRange);
    }

    let one = BigUint::one();
    let n = &pk.n;
    let n_squared = &pk.n_squared;

    let g_inv = math::mod_inverse(&pk.g, n_squared)?;
    let statement1 = (ciphertext * &g_inv) % n_squared;
    // The branch being simulated is the one for the other value
    let sim_statement = if v { ciphertext } else { &statement1 };

    // Real branch: commit to a fresh n-th power
    let r_prime = math::random_range(rng, &one, n)?;
    let a_real = math::mod_pow(&r_prime, n, n_squared);

    // Simulated branch: pick the challenge share and response, then solve
    // for the commitment that satisfies the verification equation
    let e_sim = math::random_range(rng, &one, n)?;
    let r_sim = math::random_range(rng, &one, n)?;
    let forced = math::mod_pow(&r_sim, n, n_squared);
    let statement_to_e = math::mod_pow(sim_statement, &e_sim, n_squared);
    let a_sim = (forced * math::mod_inverse(&statement_to_e, n_squared)?) % n_squared;

    let (a0, a1) = if v { (&a_sim, &a_real) } else { (&a_real, &a_sim) };
    let e_total = oracle.derive(BIT_VALUE_DOMAIN, &[ciphertext, a0, a1], pk);

    // e_v = (E - e_sim) mod n, normalized into [0, n)
    let e_real = (&e_total + n - &e_sim) % n;
    let r_real = (&r_prime * math::mod_pow(randomness, &e_real, n)) % n;

    let real = SigmaTriple {
        a: a_real,
        e: e_real,
        r_response: r_real,
    };
    let simulated = SigmaTriple {
        a: a_sim,
        e: e_sim,
        r_response: r_sim,
    };
    let (proof0, proof1) = if v { (simulated, real) } else { (real, simulated) };

    Ok(BitProof {
        proof0,
        proof1,
        ciphertext: ciphertext.clone(),
        tag: BitValueTag,
    })
}

/// Prove that the ballot slots `cs` together encrypt exactly one vote.
///
/// With `C` the homomorphic product of the slots and `R*` the product of
/// their randomizers, the statement is that `C * g^-1` is the n-th residue
/// `(R*)^n`.
pub fn prove_sum_equals_one<R: CryptoRng + RngCore, O: ChallengeOracle + ?Sized>(
    rng: &mut R,
    oracle: &O,
    pk: &PublicKey,
    cs: &[BigUint],
    randomizers: &[BigUint],
) -> Result<SumProof, Error> {
    if cs.is_empty() {
        return Err(Error::EmptyInput);
    }
    if cs.len() != randomizers.len() {
        return Err(Error::LengthMismatch(cs.len(), randomizers.len()));
    }

    let one = BigUint::one();
    let n = &pk.n;
    let n_squared = &pk.n_squared;

    let encrypted_sum = paillier::sum_ciphertexts(cs, pk)?;
    let combined_randomness = randomizers
        .iter()
        .fold(BigUint::one(), |acc, r| (acc * r) % n);

    let r_prime = math::random_range(rng, &one, n)?;
    let a = math::mod_pow(&r_prime, n, n_squared);

    let e = oracle.derive(SUM_EQUALS_ONE_DOMAIN, &[&encrypted_sum, &a, &one], pk);
    let r_response = (&r_prime * math::mod_pow(&combined_randomness, &e, n)) % n;

    Ok(SumProof {
        encrypted_sum,
        expected_sum: one,
        a,
        e,
        r_response,
        tag: SumEqualsOneTag,
    })
}

/// Generate the complete validity proof for a ballot.
///
/// `cs`, `vs` and `randomizers` are the per-slot ciphertexts, plaintexts and
/// encryption randomizers, index-aligned. The plaintexts must all be bits
/// and must sum to exactly one.
pub fn generate_vote_proof<R: CryptoRng + RngCore, O: ChallengeOracle + ?Sized>(
    rng: &mut R,
    oracle: &O,
    pk: &PublicKey,
    cs: &[BigUint],
    vs: &[BigUint],
    randomizers: &[BigUint],
) -> Result<VoteProof, Error> {
    if cs.len() != vs.len() {
        return Err(Error::LengthMismatch(cs.len(), vs.len()));
    }
    if cs.len() != randomizers.len() {
        return Err(Error::LengthMismatch(cs.len(), randomizers.len()));
    }
    if cs.is_empty() {
        return Err(Error::EmptyInput);
    }

    let one = BigUint::one();
    for v in vs {
        if v > &one {
            return Err(Error::NotABit);
        }
    }
    if vs.iter().sum::<BigUint>() != one {
        return Err(Error::SumNotOne);
    }

    let mut bit_proofs = Vec::with_capacity(cs.len());
    for ((c, v), r) in cs.iter().zip(vs).zip(randomizers) {
        bit_proofs.push(prove_bit_value(rng, oracle, pk, v.is_one(), c, r)?);
    }

    let sum_proof = prove_sum_equals_one(rng, oracle, pk, cs, randomizers)?;

    Ok(VoteProof {
        bit_proofs,
        sum_proof,
        timestamp: Utc::now(),
        tag: CompleteVoteProofTag,
    })
}

/// Verify a single bit proof. `Ok(())` means the proof is valid.
pub fn verify_bit_proof<O: ChallengeOracle + ?Sized>(
    oracle: &O,
    pk: &PublicKey,
    proof: &BitProof,
) -> Result<(), ProofFault> {
    check_bit_proof(oracle, pk, proof, None)
}

/// Verify a sum proof against the ballot slots it claims to aggregate.
pub fn verify_sum_proof<O: ChallengeOracle + ?Sized>(
    oracle: &O,
    pk: &PublicKey,
    proof: &SumProof,
    cs: &[BigUint],
) -> Result<(), ProofFault> {
    check_sum_proof(oracle, pk, proof, cs)
}

/// Verify a complete ballot proof against the slot ciphertexts.
///
/// Never fails: every rejected sub-proof is reported with its fault, and
/// `overall_valid` aggregates the verdicts.
pub fn verify_vote_proof<O: ChallengeOracle + ?Sized>(
    oracle: &O,
    pk: &PublicKey,
    cs: &[BigUint],
    proof: &VoteProof,
) -> VerificationReport {
    let mut bit_proof_results = Vec::with_capacity(cs.len());
    for (i, c) in cs.iter().enumerate() {
        let verdict = match proof.bit_proofs.get(i) {
            Some(bit_proof) => check_bit_proof(oracle, pk, bit_proof, Some(c)),
            None => Err(ProofFault::Malformed(
                "missing bit proof for ballot slot".to_string(),
            )),
        };
        bit_proof_results.push(BitProofResult {
            candidate_index: i,
            valid: verdict.is_ok(),
            fault: verdict.err(),
        });
    }

    let bit_proofs_valid =
        proof.bit_proofs.len() == cs.len() && bit_proof_results.iter().all(|r| r.valid);

    let sum_verdict = check_sum_proof(oracle, pk, &proof.sum_proof, cs);
    let sum_proof_result = SumProofResult {
        valid: sum_verdict.is_ok(),
        fault: sum_verdict.err(),
    };
    let sum_proof_valid = sum_proof_result.valid;

    VerificationReport {
        overall_valid: bit_proofs_valid && sum_proof_valid,
        bit_proofs_valid,
        bit_proof_results,
        sum_proof_valid,
        sum_proof_result,
    }
}

/// The verification equation against the g-shifted statement `c_b`:
/// `rResponse^n == a * c_b^e (mod n^2)`.
///
/// Binding the branch to its own `c_b` is what makes the proof sound: the
/// left side is always an n-th residue, so the equation can only hold for
/// random `e` when `c_b` is one too.
fn residue_equation_holds(pk: &PublicKey, triple: &SigmaTriple, statement: &BigUint) -> bool {
    let n_squared = &pk.n_squared;
    let lhs = math::mod_pow(&triple.r_response, &pk.n, n_squared);
    let rhs = (&triple.a * math::mod_pow(statement, &triple.e, n_squared)) % n_squared;
    lhs == rhs
}

fn check_triple_ranges(pk: &PublicKey, triple: &SigmaTriple, branch: &str) -> Result<(), ProofFault> {
    if triple.a >= pk.n_squared {
        return Err(ProofFault::Malformed(format!(
            "{} commitment out of range",
            branch
        )));
    }
    if triple.e >= pk.n || triple.r_response >= pk.n {
        return Err(ProofFault::Malformed(format!(
            "{} responses out of range",
            branch
        )));
    }
    Ok(())
}

fn check_bit_proof<O: ChallengeOracle + ?Sized>(
    oracle: &O,
    pk: &PublicKey,
    proof: &BitProof,
    expected_ciphertext: Option<&BigUint>,
) -> Result<(), ProofFault> {
    if !pk.is_valid_ciphertext(&proof.ciphertext) {
        return Err(ProofFault::Malformed("ciphertext out of range".to_string()));
    }
    if let Some(expected) = expected_ciphertext {
        if *expected != proof.ciphertext {
            return Err(ProofFault::Malformed(
                "proof ciphertext does not match ballot slot".to_string(),
            ));
        }
    }
    check_triple_ranges(pk, &proof.proof0, "branch 0")?;
    check_triple_ranges(pk, &proof.proof1, "branch 1")?;

    let e_total = oracle.derive(
        BIT_VALUE_DOMAIN,
        &[&proof.ciphertext, &proof.proof0.a, &proof.proof1.a],
        pk,
    );
    if (&proof.proof0.e + &proof.proof1.e) % &pk.n != e_total {
        return Err(ProofFault::ChallengeMismatch);
    }

    let g_inv = math::mod_inverse(&pk.g, &pk.n_squared)
        .map_err(|_| ProofFault::Malformed("public key generator is not invertible".to_string()))?;
    let statement1 = (&proof.ciphertext * &g_inv) % &pk.n_squared;

    if !residue_equation_holds(pk, &proof.proof0, &proof.ciphertext) {
        return Err(ProofFault::VerifyFailed("branch 0 equation".to_string()));
    }
    if !residue_equation_holds(pk, &proof.proof1, &statement1) {
        return Err(ProofFault::VerifyFailed("branch 1 equation".to_string()));
    }
    Ok(())
}

fn check_sum_proof<O: ChallengeOracle + ?Sized>(
    oracle: &O,
    pk: &PublicKey,
    proof: &SumProof,
    cs: &[BigUint],
) -> Result<(), ProofFault> {
    if !proof.expected_sum.is_one() {
        return Err(ProofFault::Malformed(
            "expected sum must be exactly 1".to_string(),
        ));
    }
    if !pk.is_valid_ciphertext(&proof.encrypted_sum) {
        return Err(ProofFault::Malformed(
            "encrypted sum out of range".to_string(),
        ));
    }
    let product = paillier::sum_ciphertexts(cs, pk)
        .map_err(|_| ProofFault::Malformed("invalid ballot slot ciphertexts".to_string()))?;
    if product != proof.encrypted_sum {
        return Err(ProofFault::Malformed(
            "encrypted sum does not match ciphertext product".to_string(),
        ));
    }
    if proof.a >= pk.n_squared {
        return Err(ProofFault::Malformed("commitment out of range".to_string()));
    }
    if proof.e >= pk.n || proof.r_response >= pk.n {
        return Err(ProofFault::Malformed("responses out of range".to_string()));
    }

    let expected_e = oracle.derive(
        SUM_EQUALS_ONE_DOMAIN,
        &[&proof.encrypted_sum, &proof.a, &proof.expected_sum],
        pk,
    );
    if expected_e != proof.e {
        return Err(ProofFault::ChallengeMismatch);
    }

    // The statement is that C * g^-1 is an n-th residue, pinning the
    // aggregate plaintext to 1
    let g_inv = math::mod_inverse(&pk.g, &pk.n_squared)
        .map_err(|_| ProofFault::Malformed("public key generator is not invertible".to_string()))?;
    let statement = (&proof.encrypted_sum * &g_inv) % &pk.n_squared;

    let triple = SigmaTriple {
        a: proof.a.clone(),
        e: proof.e.clone(),
        r_response: proof.r_response.clone(),
    };
    if !residue_equation_holds(pk, &triple, &statement) {
        return Err(ProofFault::VerifyFailed("sum equation".to_string()));
    }
    Ok(())
}

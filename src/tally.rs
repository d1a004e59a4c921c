//! Authority-side aggregation: slot-wise homomorphic sums across ballots,
//! decryption of the aggregate, and presentation as named candidate totals.

use crate::{paillier, ElectionConfig, Error, PrivateKey, PublicKey};
use indexmap::IndexMap;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Decrypted counts: one per candidate slot, plus the decryption of the
/// homomorphic product of all slots. `total` always equals the sum of
/// `per_slot` (mod n).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    #[serde(with = "crate::serde_dec::vec")]
    pub per_slot: Vec<BigUint>,
    #[serde(with = "crate::serde_dec")]
    pub total: BigUint,
}

/// Decrypt each slot and the homomorphic total.
pub fn tally_slots(private: &PrivateKey, slots: &[BigUint]) -> Result<Tally, Error> {
    if slots.is_empty() {
        return Err(Error::EmptyInput);
    }

    let per_slot = slots
        .iter()
        .map(|c| private.decrypt(c))
        .collect::<Result<Vec<_>, _>>()?;

    let n_squared = &private.n * &private.n;
    let mut product = slots[0].clone();
    for c in &slots[1..] {
        product = (product * c) % &n_squared;
    }
    let total = private.decrypt(&product)?;

    Ok(Tally { per_slot, total })
}

/// Combine many verified ballots into one ciphertext per candidate slot.
///
/// Individual ballots stay encrypted; only the aggregate is ever decrypted.
pub fn aggregate_ballots(ballots: &[Vec<BigUint>], pk: &PublicKey) -> Result<Vec<BigUint>, Error> {
    let (first, rest) = ballots.split_first().ok_or(Error::EmptyInput)?;
    for c in first {
        if !pk.is_valid_ciphertext(c) {
            return Err(Error::CiphertextOutOfRange);
        }
    }

    let mut slots = first.clone();
    for ballot in rest {
        if ballot.len() != slots.len() {
            return Err(Error::LengthMismatch(slots.len(), ballot.len()));
        }
        for (slot, c) in slots.iter_mut().zip(ballot) {
            *slot = paillier::add_ciphertexts(slot, c, pk)?;
        }
    }
    Ok(slots)
}

/// Final election result keyed by candidate name.
///
/// An `IndexMap` keeps candidate ordering deterministic in serialized
/// results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallyResult {
    pub num_ballots: usize,
    pub totals: IndexMap<String, u64>,
    pub winners: Vec<String>,
}

impl TallyResult {
    pub fn new(config: &ElectionConfig, tally: &Tally, num_ballots: usize) -> Result<Self, Error> {
        if tally.per_slot.len() != config.candidate_count() {
            return Err(Error::LengthMismatch(
                config.candidate_count(),
                tally.per_slot.len(),
            ));
        }

        let mut totals = IndexMap::new();
        for (candidate, count) in config.candidates.iter().zip(&tally.per_slot) {
            let count = count.to_u64().ok_or(Error::CountOverflow)?;
            totals.insert(candidate.clone(), count);
        }

        let top = totals.values().copied().max().unwrap_or(0);
        let winners = totals
            .iter()
            .filter(|(_, count)| **count == top)
            .map(|(candidate, _)| candidate.clone())
            .collect();

        Ok(TallyResult {
            num_ballots,
            totals,
            winners,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::testing::test_keypair;
    use num_traits::{One, Zero};
    use rand::rngs::OsRng;

    fn encrypt_ballot(bits: &[bool]) -> Vec<BigUint> {
        let pk = &test_keypair().public;
        bits.iter()
            .map(|&bit| {
                let v = if bit { BigUint::one() } else { BigUint::zero() };
                pk.encrypt(&mut OsRng, &v).unwrap().ciphertext
            })
            .collect()
    }

    #[test]
    fn tally_decrypts_slots_and_total() {
        let keypair = test_keypair();
        let ballot = encrypt_ballot(&[false, true, false]);

        let tally = tally_slots(&keypair.private, &ballot).unwrap();
        assert_eq!(tally.per_slot, vec![
            BigUint::zero(),
            BigUint::one(),
            BigUint::zero()
        ]);
        assert_eq!(tally.total, BigUint::one());
        assert_eq!(tally.per_slot.iter().sum::<BigUint>(), tally.total);

        assert!(matches!(
            tally_slots(&keypair.private, &[]),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn aggregation_counts_across_ballots() {
        let keypair = test_keypair();
        let ballots = vec![
            encrypt_ballot(&[true, false, false]),
            encrypt_ballot(&[false, true, false]),
            encrypt_ballot(&[true, false, false]),
        ];

        let slots = aggregate_ballots(&ballots, &keypair.public).unwrap();
        let tally = tally_slots(&keypair.private, &slots).unwrap();

        assert_eq!(tally.per_slot, vec![
            BigUint::from(2u32),
            BigUint::one(),
            BigUint::zero()
        ]);
        assert_eq!(tally.total, BigUint::from(3u32));
    }

    #[test]
    fn ragged_ballots_are_rejected() {
        let keypair = test_keypair();
        let ballots = vec![
            encrypt_ballot(&[true, false, false]),
            encrypt_ballot(&[true, false]),
        ];
        assert!(matches!(
            aggregate_ballots(&ballots, &keypair.public),
            Err(Error::LengthMismatch(3, 2))
        ));
        assert!(matches!(
            aggregate_ballots(&[], &keypair.public),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn result_names_candidates_and_winners() {
        let config = ElectionConfig::new(vec![
            "Ada".to_string(),
            "Grace".to_string(),
            "Katherine".to_string(),
        ]);
        let tally = Tally {
            per_slot: vec![BigUint::from(2u32), BigUint::from(5u32), BigUint::from(5u32)],
            total: BigUint::from(12u32),
        };

        let result = TallyResult::new(&config, &tally, 12).unwrap();
        assert_eq!(result.num_ballots, 12);
        assert_eq!(result.totals["Ada"], 2);
        assert_eq!(result.totals["Grace"], 5);
        assert_eq!(result.winners, vec!["Grace".to_string(), "Katherine".to_string()]);
    }

    #[test]
    fn result_rejects_width_mismatch_and_overflow() {
        let config = ElectionConfig::new(vec!["Ada".to_string()]);

        let narrow = Tally {
            per_slot: vec![],
            total: BigUint::zero(),
        };
        assert!(matches!(
            TallyResult::new(&config, &narrow, 0),
            Err(Error::LengthMismatch(1, 0))
        ));

        let huge = Tally {
            per_slot: vec![BigUint::one() << 70],
            total: BigUint::one() << 70,
        };
        assert!(matches!(
            TallyResult::new(&config, &huge, 1),
            Err(Error::CountOverflow)
        ));
    }
}

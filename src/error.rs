use thiserror::Error;

/// Error types
///
/// Everything here is raised to the caller. Failed proof *verification* is
/// never an `Error` - it is reported through [`VerificationReport`] so the
/// authority can show granular diagnostics (see [`ProofFault`]).
///
/// [`VerificationReport`]: crate::VerificationReport
#[derive(Debug, Error)]
pub enum Error {
    #[error("zkballot: plaintext out of range: 0 <= m < n required")]
    PlaintextOutOfRange,

    #[error("zkballot: ciphertext out of range: 0 < c < n^2 required")]
    CiphertextOutOfRange,

    #[error("zkballot: vote value is not a bit (must be 0 or 1)")]
    NotABit,

    #[error("zkballot: selection does not sum to exactly one vote")]
    SumNotOne,

    #[error("zkballot: length mismatch: expected {0}, found {1}")]
    LengthMismatch(usize, usize),

    #[error("zkballot: selection is empty (no candidate chosen)")]
    EmptySelection,

    #[error("zkballot: empty input")]
    EmptyInput,

    #[error("zkballot: bad sampling range")]
    BadRange,

    #[error("zkballot: invalid key size {0}: must be even and at least 512 bits")]
    InvalidKeyBits(u64),

    #[error("zkballot: no public key loaded")]
    NoPublicKey,

    #[error("zkballot: no private key loaded")]
    NoPrivateKey,

    #[error("zkballot: no modular inverse exists")]
    NoInverse,

    #[error("zkballot: entropy source unavailable: {0}")]
    EntropyUnavailable(#[from] rand::Error),

    #[error("zkballot: candidate tally does not fit in a u64 count")]
    CountOverflow,

    #[error("zkballot: election must have at least one candidate")]
    NoCandidates,

    #[error("zkballot: JSON error deserializing ballot submission: {0}")]
    JSONDeserialization(#[from] serde_json::Error),
}

/// Reasons a received proof can be rejected.
///
/// These are carried inside verification reports, never raised: a bad proof
/// is a *verdict*, not a failure of the verifying code.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofFault {
    /// A field is missing, out of range, or inconsistent with the ballot.
    #[error("malformed proof: {0}")]
    Malformed(String),

    /// The sigma verification equation did not hold.
    #[error("verification equation failed: {0}")]
    VerifyFailed(String),

    /// The two challenge shares do not add up to the Fiat-Shamir challenge.
    #[error("challenge shares do not match the Fiat-Shamir challenge")]
    ChallengeMismatch,
}

//! Proof-of-work records and validation
//!
//! A record binds a difficulty to a payload and, once solved, to the nonce
//! that satisfies it. Validation is a pure recomputation and works on any
//! record, including ones received from elsewhere.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::PowError;
use crate::hash::pow_hash;
use crate::params::{DIGEST_SIZE, WORK_DATA_SIZE};
use crate::target::Target;

/// A proof-of-work which either has been completed or not
///
/// Serializes as `{"bits": .., "data": .., "proof": ..}`; `proof` is left
/// out while the record is unsolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWork {
    bits: u32,
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof: Option<u64>,
}

impl ProofOfWork {
    /// Create an unsolved record
    pub fn new(bits: u32, data: impl Into<String>) -> Self {
        Self {
            bits,
            data: data.into(),
            proof: None,
        }
    }

    /// Create a record carrying a claimed nonce
    pub fn with_proof(bits: u32, data: impl Into<String>, proof: u64) -> Self {
        Self {
            bits,
            data: data.into(),
            proof: Some(proof),
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Payload bytes fed to the hash function
    pub fn payload(&self) -> &[u8] {
        self.data.as_bytes()
    }

    pub fn proof(&self) -> Option<u64> {
        self.proof
    }

    /// True once a nonce has been recorded, whether or not it is valid.
    ///
    /// Nonce 0 counts: it is a legal solution at low difficulty.
    pub fn is_solved(&self) -> bool {
        self.proof.is_some()
    }

    /// Recompute the hash and check it against the target
    pub fn is_valid(&self) -> bool {
        match self.proof {
            Some(nonce) => validate(self.bits, self.payload(), nonce),
            None => false,
        }
    }

    /// Digest of the recorded nonce
    pub fn digest(&self) -> Option<[u8; DIGEST_SIZE]> {
        self.proof.map(|nonce| pow_hash(self.payload(), nonce))
    }

    /// Record the winning nonce. Write-once.
    pub(crate) fn set_proof(&mut self, nonce: u64) -> Result<(), PowError> {
        if let Some(existing) = self.proof {
            return Err(PowError::AlreadySolved(existing));
        }
        self.proof = Some(nonce);
        Ok(())
    }
}

/// Check a claimed `(bits, payload, nonce)` triple.
///
/// Difficulties outside `1..=256` never validate.
pub fn validate(bits: u32, payload: &[u8], nonce: u64) -> bool {
    match Target::from_bits(bits) {
        Ok(target) => target.is_met_by(&pow_hash(payload, nonce)),
        Err(_) => false,
    }
}

/// Generate random work data: 32 bytes from the OS entropy source, base64
pub fn generate_work_data() -> Result<String, PowError> {
    let mut data = [0u8; WORK_DATA_SIZE];
    getrandom::getrandom(&mut data).map_err(|e| PowError::Entropy(e.to_string()))?;

    Ok(STANDARD.encode(data))
}

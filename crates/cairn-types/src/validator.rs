use crate::error::TypesError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stake weight of a validator, in base token units.
pub type Weight = u64;

/// Bonded stake per validator at some block's post-state.
///
/// A `BTreeMap` so that iteration order is deterministic across runs;
/// validator indexing and quorum arithmetic depend on it.
pub type WeightMap = BTreeMap<ValidatorId, Weight>;

/// 32-byte validator identity (public key bytes).
///
/// Totally ordered so that validator sets can be indexed deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidatorId([u8; 32]);

impl ValidatorId {
    pub const LEN: usize = 32;

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a byte slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        if slice.len() != 32 {
            return Err(TypesError::InvalidValidatorIdLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: first four bytes are enough to tell validators apart in logs
        write!(f, "{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorId(0x{})", hex::encode(self.0))
    }
}

impl FromStr for ValidatorId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = if s.starts_with("0x") || s.starts_with("0X") {
            &s[2..]
        } else {
            s
        };

        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for ValidatorId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

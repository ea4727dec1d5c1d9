// Copyright 2025 PRAGMA
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use sha3::{Digest, Sha3_256};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A 32-byte content hash, rendered as lowercase hex.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Hash32([u8; 32]);

pub const NULL_HASH32: Hash32 = Hash32([0; 32]);

impl Hash32 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self == &NULL_HASH32
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

#[derive(Debug, Error)]
pub enum MalformedHash {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Hash32 {
    type Err = MalformedHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| MalformedHash::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

/// SHA3-256 digest of arbitrary bytes.
pub fn sha3_256(bytes: &[u8]) -> Hash32 {
    let mut hasher = Sha3_256::new();
    hasher.update(bytes);
    Hash32(hasher.finalize().into())
}

#[cfg(any(test, feature = "test-utils"))]
pub use strategies::*;

#[cfg(any(test, feature = "test-utils"))]
mod strategies {
    use super::*;
    use proptest::prelude::*;

    pub fn any_hash32() -> impl Strategy<Value = Hash32> {
        any::<[u8; 32]>().prop_map(Hash32::from)
    }
}

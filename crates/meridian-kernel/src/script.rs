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

use crate::attenuation::AttenuationParam;
use std::fmt;

/// A payment address in its textual form. Syntactic/checksum validity is the
/// chain collaborator's call; the kernel only carries the value.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self(address.to_owned())
    }
}

/// A locking or unlocking script, carried in its recognized form. Execution
/// semantics live behind the consensus oracle; the validator only needs the
/// pattern, the destination address and the pattern parameters.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Script {
    /// Standard pay-to-key-hash locking script.
    PayKeyHash { address: Address },
    /// Pay-to-key-hash whose output may only be spent `lock_height` blocks
    /// after the funding transaction confirmed.
    PayKeyHashWithLockHeight { address: Address, lock_height: u64 },
    /// Pay-to-key-hash carrying an asset time-decay schedule.
    PayKeyHashWithAttenuation {
        address: Address,
        model: AttenuationParam,
    },
    /// Legacy pay-to-script-hash.
    PayScriptHash { address: Address },
    /// Standard key-hash unlocking script.
    SignKeyHash { signature: Vec<u8> },
    /// Unlocking script for a height-locked output, restating the lock.
    SignKeyHashWithLockHeight { signature: Vec<u8>, lock_height: u64 },
    /// Provably unspendable data carrier.
    NullData { data: Vec<u8> },
    /// Anything the node does not recognize.
    Raw(Vec<u8>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptPattern {
    PayKeyHash,
    PayKeyHashWithLockHeight,
    PayKeyHashWithAttenuation,
    PayScriptHash,
    SignKeyHash,
    SignKeyHashWithLockHeight,
    NullData,
    NonStandard,
}

impl ScriptPattern {
    pub fn is_standard(&self) -> bool {
        !matches!(self, ScriptPattern::NonStandard)
    }
}

impl Script {
    pub fn pattern(&self) -> ScriptPattern {
        match self {
            Script::PayKeyHash { .. } => ScriptPattern::PayKeyHash,
            Script::PayKeyHashWithLockHeight { .. } => ScriptPattern::PayKeyHashWithLockHeight,
            Script::PayKeyHashWithAttenuation { .. } => ScriptPattern::PayKeyHashWithAttenuation,
            Script::PayScriptHash { .. } => ScriptPattern::PayScriptHash,
            Script::SignKeyHash { .. } => ScriptPattern::SignKeyHash,
            Script::SignKeyHashWithLockHeight { .. } => ScriptPattern::SignKeyHashWithLockHeight,
            Script::NullData { .. } => ScriptPattern::NullData,
            Script::Raw(_) => ScriptPattern::NonStandard,
        }
    }

    /// The destination address of a locking script, when the pattern has one.
    pub fn address(&self) -> Option<&Address> {
        match self {
            Script::PayKeyHash { address }
            | Script::PayKeyHashWithLockHeight { address, .. }
            | Script::PayKeyHashWithAttenuation { address, .. }
            | Script::PayScriptHash { address } => Some(address),
            Script::SignKeyHash { .. }
            | Script::SignKeyHashWithLockHeight { .. }
            | Script::NullData { .. }
            | Script::Raw(_) => None,
        }
    }

    /// The lock height encoded by a height-locked pattern.
    pub fn lock_height(&self) -> Option<u64> {
        match self {
            Script::PayKeyHashWithLockHeight { lock_height, .. }
            | Script::SignKeyHashWithLockHeight { lock_height, .. } => Some(*lock_height),
            Script::PayKeyHash { .. }
            | Script::PayKeyHashWithAttenuation { .. }
            | Script::PayScriptHash { .. }
            | Script::SignKeyHash { .. }
            | Script::NullData { .. }
            | Script::Raw(_) => None,
        }
    }

    /// The attenuation schedule of a decaying pay-to-key-hash pattern.
    pub fn attenuation(&self) -> Option<&AttenuationParam> {
        match self {
            Script::PayKeyHashWithAttenuation { model, .. } => Some(model),
            Script::PayKeyHash { .. }
            | Script::PayKeyHashWithLockHeight { .. }
            | Script::PayScriptHash { .. }
            | Script::SignKeyHash { .. }
            | Script::SignKeyHashWithLockHeight { .. }
            | Script::NullData { .. }
            | Script::Raw(_) => None,
        }
    }
}

/// Optional consensus rule sets understood by the script oracle.
pub mod script_flags {
    pub const NONE: u32 = 0;
    /// Legacy hash-script (pay-to-script-hash) evaluation.
    pub const LEGACY_HASH_SCRIPT: u32 = 1 << 0;
    /// `CHECKLOCKTIMEVERIFY`-style time locks.
    pub const TIME_LOCK_VERIFY: u32 = 1 << 1;
    /// Strict DER signature encoding.
    pub const STRICT_SIGNATURE_ENCODING: u32 = 1 << 2;
    /// Attenuation schedule enforcement.
    pub const ATTENUATION_VERIFY: u32 = 1 << 3;

    pub const ALL_ENABLED: u32 =
        LEGACY_HASH_SCRIPT | TIME_LOCK_VERIFY | STRICT_SIGNATURE_ENCODING | ATTENUATION_VERIFY;
}

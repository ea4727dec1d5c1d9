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

use crate::{script::Address, symbol::Symbol};

/// Attachment version that carries identity routing (`from_did`/`to_did`)
/// and turns on owner/identity agreement checks.
pub const DID_ATTACH_VERIFY_VERSION: u32 = 207;

/// Threshold sentinel: anyone holding the asset may reissue.
pub const SECONDARY_ISSUE_THRESHOLD_FREE: u8 = 255;

pub const MAX_MESSAGE_LEN: usize = 256;

/// The non-currency payload of an output, together with the identity
/// envelope introduced by the nova attachment version.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    pub version: u32,
    pub from_did: Option<String>,
    pub to_did: Option<String>,
    pub payload: AttachmentPayload,
}

impl Attachment {
    /// A plain base-currency attachment.
    pub fn plain() -> Self {
        Attachment {
            version: 0,
            from_did: None,
            to_did: None,
            payload: AttachmentPayload::None,
        }
    }

    pub fn with_payload(payload: AttachmentPayload) -> Self {
        Attachment {
            version: 0,
            from_did: None,
            to_did: None,
            payload,
        }
    }

    /// Self-consistency, enforced from the nova feature version onward.
    pub fn is_valid(&self) -> bool {
        let envelope_ok = match self.version {
            0 => self.from_did.is_none() && self.to_did.is_none(),
            DID_ATTACH_VERIFY_VERSION => {
                self.to_did.as_ref().is_some_and(|did| !did.is_empty())
                    && self.from_did.as_ref().is_none_or(|did| !did.is_empty())
            }
            _ => false,
        };
        envelope_ok && self.payload.is_valid()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttachmentPayload {
    /// Plain base currency.
    None,
    /// Free-form data carrier.
    Message(String),
    AssetIssue(AssetDetail),
    AssetSecondaryIssue(AssetDetail),
    AssetTransfer(AssetTransfer),
    AssetCert(AssetCert),
    MitRegister(MitRegister),
    MitTransfer(MitTransfer),
    DidRegister(DidDetail),
    DidTransfer(DidDetail),
}

impl AttachmentPayload {
    pub fn is_valid(&self) -> bool {
        match self {
            AttachmentPayload::None => true,
            AttachmentPayload::Message(text) => text.len() <= MAX_MESSAGE_LEN,
            AttachmentPayload::AssetIssue(detail)
            | AttachmentPayload::AssetSecondaryIssue(detail) => {
                !detail.symbol.is_empty()
                    && !detail.issuer.is_empty()
                    && detail.maximum_supply > 0
                    && detail.is_threshold_valid()
            }
            AttachmentPayload::AssetTransfer(transfer) => {
                !transfer.symbol.is_empty() && transfer.quantity > 0
            }
            AttachmentPayload::AssetCert(cert) => !cert.symbol.is_empty() && !cert.owner.is_empty(),
            AttachmentPayload::MitRegister(register) => !register.symbol.is_empty(),
            AttachmentPayload::MitTransfer(transfer) => !transfer.symbol.is_empty(),
            AttachmentPayload::DidRegister(detail) | AttachmentPayload::DidTransfer(detail) => {
                !detail.symbol.is_empty() && !detail.address.as_str().is_empty()
            }
        }
    }
}

/// Declaration of a fungible asset, used both for original and secondary
/// issuance.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetDetail {
    pub symbol: Symbol,
    /// Identity name of the issuer.
    pub issuer: String,
    pub address: Address,
    pub maximum_supply: u64,
    /// `SECONDARY_ISSUE_THRESHOLD_FREE`, `0` (closed), or a percentage of the
    /// current supply the reissuer must bring to the table.
    pub secondary_issue_threshold: u8,
    pub description: String,
    /// Certificate kinds that must accompany the issuance.
    pub cert_mask: Vec<CertKind>,
}

impl AssetDetail {
    pub fn is_threshold_valid(&self) -> bool {
        self.secondary_issue_threshold == SECONDARY_ISSUE_THRESHOLD_FREE
            || self.secondary_issue_threshold <= 100
    }
}

/// Whether a holder of `held` units out of `supply` clears the reissuance
/// threshold.
pub fn secondary_issue_owns_enough(held: u64, supply: u64, threshold: u8) -> bool {
    match threshold {
        SECONDARY_ISSUE_THRESHOLD_FREE => true,
        0 => false,
        percent => {
            // u128 keeps supply * percent from overflowing
            u128::from(held) * 100 >= u128::from(supply) * u128::from(percent)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetTransfer {
    pub symbol: Symbol,
    pub quantity: u64,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum CertKind {
    /// Right to reissue the asset.
    Issue,
    /// Right over a namespace prefix.
    Domain,
    /// Right to issue one specific dotted symbol.
    Naming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CertStatus {
    Normal,
    /// Freshly issued in this transaction.
    Issued,
    /// Changing owner in this transaction.
    Transferred,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetCert {
    pub symbol: Symbol,
    /// Identity name of the certificate owner.
    pub owner: String,
    pub address: Address,
    pub kind: CertKind,
    pub status: CertStatus,
}

/// Duplicate-rejecting collection of certificate kinds, the working set of
/// the input accumulator and the settlement checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertSet(Vec<CertKind>);

impl CertSet {
    pub fn insert(&mut self, kind: CertKind) -> bool {
        if self.contains(kind) {
            return false;
        }
        self.0.push(kind);
        true
    }

    pub fn contains(&self, kind: CertKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn contains_all(&self, mask: &[CertKind]) -> bool {
        mask.iter().all(|kind| self.contains(*kind))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set equality; both sides are duplicate-free by construction.
    pub fn same_as(&self, other: &CertSet) -> bool {
        self.len() == other.len() && self.contains_all(&other.0)
    }
}

impl FromIterator<CertKind> for CertSet {
    fn from_iter<I: IntoIterator<Item = CertKind>>(kinds: I) -> Self {
        let mut set = CertSet::default();
        for kind in kinds {
            set.insert(kind);
        }
        set
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MitRegister {
    pub symbol: Symbol,
    pub address: Address,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MitTransfer {
    pub symbol: Symbol,
    pub address: Address,
}

/// A decentralized identity: a name bound to exactly one address.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DidDetail {
    pub symbol: Symbol,
    pub address: Address,
}

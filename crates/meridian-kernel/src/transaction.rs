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

use crate::{
    attachment::{AssetCert, Attachment, AttachmentPayload, CertKind, CertStatus},
    hash::{sha3_256, Hash32, NULL_HASH32},
    script::{Address, Script},
    symbol::Symbol,
};

/// Base-currency sub-unit.
pub type Mer = u64;

/// Transaction format versions and their gating semantics.
pub mod transaction_version {
    pub const DEFAULT: u32 = 1;
    /// Requires every output script to match a standard pattern.
    pub const CHECK_OUTPUT_SCRIPT: u32 = 2;
    /// Nova feature set; valid only once the activation height has passed.
    pub const CHECK_NOVA_FEATURE: u32 = 3;
    /// Nova feature set under testnet rules only.
    pub const CHECK_NOVA_TESTNET: u32 = 4;
    /// First unassigned version.
    pub const MAX: u32 = 5;
}

/// Reference to an output of a previous transaction.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct OutputPoint {
    pub hash: Hash32,
    pub index: u32,
}

impl OutputPoint {
    pub const NULL: OutputPoint = OutputPoint {
        hash: NULL_HASH32,
        index: u32::MAX,
    };

    pub fn new(hash: Hash32, index: u32) -> Self {
        OutputPoint { hash, index }
    }

    /// Null previous-output references mark coinbase inputs.
    pub fn is_null(&self) -> bool {
        self.hash.is_null() && self.index == u32::MAX
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Input {
    pub previous_output: OutputPoint,
    pub script: Script,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Output {
    pub value: Mer,
    pub script: Script,
    pub attachment: Attachment,
}

impl Output {
    /// Plain base currency (possibly height-locked), no business payload.
    pub fn is_currency(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::None)
    }

    pub fn is_message(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::Message(_))
    }

    /// Any fungible-asset payload: issue, secondary issue or transfer.
    pub fn is_asset(&self) -> bool {
        matches!(
            self.attachment.payload,
            AttachmentPayload::AssetIssue(_)
                | AttachmentPayload::AssetSecondaryIssue(_)
                | AttachmentPayload::AssetTransfer(_)
        )
    }

    pub fn is_asset_issue(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::AssetIssue(_))
    }

    pub fn is_asset_secondary_issue(&self) -> bool {
        matches!(
            self.attachment.payload,
            AttachmentPayload::AssetSecondaryIssue(_)
        )
    }

    pub fn is_asset_transfer(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::AssetTransfer(_))
    }

    pub fn is_asset_cert(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::AssetCert(_))
    }

    /// A certificate output freshly issued in this transaction.
    pub fn is_asset_cert_issue(&self) -> bool {
        matches!(
            &self.attachment.payload,
            AttachmentPayload::AssetCert(cert) if cert.status == CertStatus::Issued
        )
    }

    pub fn is_mit(&self) -> bool {
        matches!(
            self.attachment.payload,
            AttachmentPayload::MitRegister(_) | AttachmentPayload::MitTransfer(_)
        )
    }

    pub fn is_mit_register(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::MitRegister(_))
    }

    pub fn is_mit_transfer(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::MitTransfer(_))
    }

    pub fn is_did(&self) -> bool {
        matches!(
            self.attachment.payload,
            AttachmentPayload::DidRegister(_) | AttachmentPayload::DidTransfer(_)
        )
    }

    pub fn is_did_register(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::DidRegister(_))
    }

    pub fn is_did_transfer(&self) -> bool {
        matches!(self.attachment.payload, AttachmentPayload::DidTransfer(_))
    }

    /// Symbol of a fungible-asset payload.
    pub fn asset_symbol(&self) -> Option<&Symbol> {
        match &self.attachment.payload {
            AttachmentPayload::AssetIssue(detail)
            | AttachmentPayload::AssetSecondaryIssue(detail) => Some(&detail.symbol),
            AttachmentPayload::AssetTransfer(transfer) => Some(&transfer.symbol),
            AttachmentPayload::None
            | AttachmentPayload::Message(_)
            | AttachmentPayload::AssetCert(_)
            | AttachmentPayload::MitRegister(_)
            | AttachmentPayload::MitTransfer(_)
            | AttachmentPayload::DidRegister(_)
            | AttachmentPayload::DidTransfer(_) => None,
        }
    }

    /// Asset quantity carried by this output: declared volume for issuance
    /// payloads, moved quantity for transfers.
    pub fn asset_amount(&self) -> u64 {
        match &self.attachment.payload {
            AttachmentPayload::AssetIssue(detail)
            | AttachmentPayload::AssetSecondaryIssue(detail) => detail.maximum_supply,
            AttachmentPayload::AssetTransfer(transfer) => transfer.quantity,
            AttachmentPayload::None
            | AttachmentPayload::Message(_)
            | AttachmentPayload::AssetCert(_)
            | AttachmentPayload::MitRegister(_)
            | AttachmentPayload::MitTransfer(_)
            | AttachmentPayload::DidRegister(_)
            | AttachmentPayload::DidTransfer(_) => 0,
        }
    }

    /// The asset declaration of an issuance payload, original or secondary.
    pub fn asset_detail(&self) -> Option<&crate::attachment::AssetDetail> {
        match &self.attachment.payload {
            AttachmentPayload::AssetIssue(detail)
            | AttachmentPayload::AssetSecondaryIssue(detail) => Some(detail),
            AttachmentPayload::None
            | AttachmentPayload::Message(_)
            | AttachmentPayload::AssetTransfer(_)
            | AttachmentPayload::AssetCert(_)
            | AttachmentPayload::MitRegister(_)
            | AttachmentPayload::MitTransfer(_)
            | AttachmentPayload::DidRegister(_)
            | AttachmentPayload::DidTransfer(_) => None,
        }
    }

    pub fn cert(&self) -> Option<&AssetCert> {
        match &self.attachment.payload {
            AttachmentPayload::AssetCert(cert) => Some(cert),
            AttachmentPayload::None
            | AttachmentPayload::Message(_)
            | AttachmentPayload::AssetIssue(_)
            | AttachmentPayload::AssetSecondaryIssue(_)
            | AttachmentPayload::AssetTransfer(_)
            | AttachmentPayload::MitRegister(_)
            | AttachmentPayload::MitTransfer(_)
            | AttachmentPayload::DidRegister(_)
            | AttachmentPayload::DidTransfer(_) => None,
        }
    }

    pub fn mit_symbol(&self) -> Option<&Symbol> {
        match &self.attachment.payload {
            AttachmentPayload::MitRegister(register) => Some(&register.symbol),
            AttachmentPayload::MitTransfer(transfer) => Some(&transfer.symbol),
            AttachmentPayload::None
            | AttachmentPayload::Message(_)
            | AttachmentPayload::AssetIssue(_)
            | AttachmentPayload::AssetSecondaryIssue(_)
            | AttachmentPayload::AssetTransfer(_)
            | AttachmentPayload::AssetCert(_)
            | AttachmentPayload::DidRegister(_)
            | AttachmentPayload::DidTransfer(_) => None,
        }
    }

    pub fn did_symbol(&self) -> Option<&Symbol> {
        match &self.attachment.payload {
            AttachmentPayload::DidRegister(detail) | AttachmentPayload::DidTransfer(detail) => {
                Some(&detail.symbol)
            }
            AttachmentPayload::None
            | AttachmentPayload::Message(_)
            | AttachmentPayload::AssetIssue(_)
            | AttachmentPayload::AssetSecondaryIssue(_)
            | AttachmentPayload::AssetTransfer(_)
            | AttachmentPayload::AssetCert(_)
            | AttachmentPayload::MitRegister(_)
            | AttachmentPayload::MitTransfer(_) => None,
        }
    }

    /// The destination address of the locking script.
    pub fn script_address(&self) -> Option<&Address> {
        self.script.address()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub lock_time: u32,
}

impl Transaction {
    /// Content hash over the canonical encoding.
    pub fn hash(&self) -> Hash32 {
        sha3_256(&self.to_canonical_bytes())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    pub fn serialized_size(&self) -> usize {
        self.to_canonical_bytes().len()
    }

    pub fn total_output_value(&self) -> Mer {
        self.outputs
            .iter()
            .fold(0, |total, output| total.saturating_add(output.value))
    }

    /// Total asset quantity declared by transfer outputs. Issuance outputs
    /// mint new volume and do not count against the inputs.
    pub fn total_asset_transfer_amount(&self) -> u64 {
        self.outputs
            .iter()
            .filter(|output| output.is_asset_transfer())
            .fold(0, |total, output| {
                total.saturating_add(output.asset_amount())
            })
    }

    pub fn has_asset_transfer(&self) -> bool {
        self.outputs.iter().any(Output::is_asset_transfer)
    }

    pub fn has_did_transfer(&self) -> bool {
        self.outputs.iter().any(Output::is_did_transfer)
    }

    /// Deterministic binary encoding used for hashing and the size limit.
    /// Wire codecs proper live outside the kernel.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        put_u32(&mut buf, self.version);
        put_compact(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.previous_output.hash.as_bytes());
            put_u32(&mut buf, input.previous_output.index);
            put_script(&mut buf, &input.script);
            put_u32(&mut buf, input.sequence);
        }
        put_compact(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            put_u64(&mut buf, output.value);
            put_script(&mut buf, &output.script);
            put_attachment(&mut buf, &output.attachment);
        }
        put_u32(&mut buf, self.lock_time);
        buf
    }
}

impl Script {
    /// Size of the script's canonical encoding; the coinbase script bound
    /// applies to this.
    pub fn serialized_size(&self) -> usize {
        let mut buf = Vec::new();
        put_script(&mut buf, self);
        buf.len()
    }
}

// Canonical encoding primitives. Little-endian integers, compact-size
// prefixed byte strings.

fn put_u32(buf: &mut Vec<u8>, n: u32) {
    buf.extend_from_slice(&n.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, n: u64) {
    buf.extend_from_slice(&n.to_le_bytes());
}

fn put_compact(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_compact(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_opt_str(buf: &mut Vec<u8>, s: &Option<String>) {
    match s {
        None => buf.push(0),
        Some(s) => {
            buf.push(1);
            put_str(buf, s);
        }
    }
}

fn put_script(buf: &mut Vec<u8>, script: &Script) {
    match script {
        Script::PayKeyHash { address } => {
            buf.push(0);
            put_str(buf, address.as_str());
        }
        Script::PayKeyHashWithLockHeight {
            address,
            lock_height,
        } => {
            buf.push(1);
            put_str(buf, address.as_str());
            put_u64(buf, *lock_height);
        }
        Script::PayKeyHashWithAttenuation { address, model } => {
            buf.push(2);
            put_str(buf, address.as_str());
            put_u64(buf, model.locked);
            put_u64(buf, model.cycle_count);
            put_u64(buf, model.cycle_height);
        }
        Script::PayScriptHash { address } => {
            buf.push(3);
            put_str(buf, address.as_str());
        }
        Script::SignKeyHash { signature } => {
            buf.push(4);
            put_bytes(buf, signature);
        }
        Script::SignKeyHashWithLockHeight {
            signature,
            lock_height,
        } => {
            buf.push(5);
            put_bytes(buf, signature);
            put_u64(buf, *lock_height);
        }
        Script::NullData { data } => {
            buf.push(6);
            put_bytes(buf, data);
        }
        Script::Raw(bytes) => {
            buf.push(7);
            put_bytes(buf, bytes);
        }
    }
}

fn cert_kind_tag(kind: CertKind) -> u8 {
    match kind {
        CertKind::Issue => 0,
        CertKind::Domain => 1,
        CertKind::Naming => 2,
    }
}

fn put_attachment(buf: &mut Vec<u8>, attachment: &Attachment) {
    put_u32(buf, attachment.version);
    put_opt_str(buf, &attachment.from_did);
    put_opt_str(buf, &attachment.to_did);
    match &attachment.payload {
        AttachmentPayload::None => buf.push(0),
        AttachmentPayload::Message(text) => {
            buf.push(1);
            put_str(buf, text);
        }
        AttachmentPayload::AssetIssue(detail) | AttachmentPayload::AssetSecondaryIssue(detail) => {
            buf.push(
                if matches!(attachment.payload, AttachmentPayload::AssetIssue(_)) {
                    2
                } else {
                    3
                },
            );
            put_str(buf, detail.symbol.as_str());
            put_str(buf, &detail.issuer);
            put_str(buf, detail.address.as_str());
            put_u64(buf, detail.maximum_supply);
            buf.push(detail.secondary_issue_threshold);
            put_str(buf, &detail.description);
            put_compact(buf, detail.cert_mask.len() as u64);
            for kind in &detail.cert_mask {
                buf.push(cert_kind_tag(*kind));
            }
        }
        AttachmentPayload::AssetTransfer(transfer) => {
            buf.push(4);
            put_str(buf, transfer.symbol.as_str());
            put_u64(buf, transfer.quantity);
        }
        AttachmentPayload::AssetCert(cert) => {
            buf.push(5);
            put_str(buf, cert.symbol.as_str());
            put_str(buf, &cert.owner);
            put_str(buf, cert.address.as_str());
            buf.push(cert_kind_tag(cert.kind));
            buf.push(match cert.status {
                CertStatus::Normal => 0,
                CertStatus::Issued => 1,
                CertStatus::Transferred => 2,
            });
        }
        AttachmentPayload::MitRegister(register) => {
            buf.push(6);
            put_str(buf, register.symbol.as_str());
            put_str(buf, register.address.as_str());
            put_str(buf, &register.content);
        }
        AttachmentPayload::MitTransfer(transfer) => {
            buf.push(7);
            put_str(buf, transfer.symbol.as_str());
            put_str(buf, transfer.address.as_str());
        }
        AttachmentPayload::DidRegister(detail) | AttachmentPayload::DidTransfer(detail) => {
            buf.push(
                if matches!(attachment.payload, AttachmentPayload::DidRegister(_)) {
                    8
                } else {
                    9
                },
            );
            put_str(buf, detail.symbol.as_str());
            put_str(buf, detail.address.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AssetTransfer;
    use proptest::prelude::*;

    fn currency_output(value: Mer) -> Output {
        Output {
            value,
            script: Script::PayKeyHash {
                address: Address::from("MAbc"),
            },
            attachment: Attachment::plain(),
        }
    }

    fn spend(hash: Hash32, index: u32) -> Input {
        Input {
            previous_output: OutputPoint::new(hash, index),
            script: Script::SignKeyHash {
                signature: vec![0x30, 0x45],
            },
            sequence: u32::MAX,
        }
    }

    #[test]
    fn coinbase_detection() {
        let coinbase = Transaction {
            version: transaction_version::DEFAULT,
            inputs: vec![Input {
                previous_output: OutputPoint::NULL,
                script: Script::Raw(vec![0x01, 0x02, 0x03]),
                sequence: u32::MAX,
            }],
            outputs: vec![currency_output(50)],
            lock_time: 0,
        };
        assert!(coinbase.is_coinbase());

        let regular = Transaction {
            version: transaction_version::DEFAULT,
            inputs: vec![spend(Hash32::from([7; 32]), 0)],
            outputs: vec![currency_output(50)],
            lock_time: 0,
        };
        assert!(!regular.is_coinbase());
    }

    #[test]
    fn transfer_amount_skips_issuance_outputs() {
        let mut tx = Transaction {
            version: transaction_version::DEFAULT,
            inputs: vec![spend(Hash32::from([7; 32]), 0)],
            outputs: vec![currency_output(100)],
            lock_time: 0,
        };
        tx.outputs.push(Output {
            value: 0,
            script: Script::PayKeyHash {
                address: Address::from("MAbc"),
            },
            attachment: Attachment::with_payload(AttachmentPayload::AssetTransfer(
                AssetTransfer {
                    symbol: Symbol::from("GOLD"),
                    quantity: 40,
                },
            )),
        });
        assert_eq!(tx.total_asset_transfer_amount(), 40);
        assert!(tx.has_asset_transfer());
    }

    proptest! {
        #[test]
        fn hash_is_content_addressed(value in 0u64..1_000_000, lock_time in 0u32..100) {
            let tx = Transaction {
                version: transaction_version::DEFAULT,
                inputs: vec![spend(Hash32::from([7; 32]), 0)],
                outputs: vec![currency_output(value)],
                lock_time,
            };
            // same content, same hash; tweaked content, different hash
            prop_assert_eq!(tx.hash(), tx.clone().hash());
            let mut tweaked = tx.clone();
            tweaked.outputs[0].value = value + 1;
            prop_assert_ne!(tweaked.hash(), tx.hash());
        }
    }
}

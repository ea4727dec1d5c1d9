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

pub mod attachment;
pub mod attenuation;
pub mod hash;
pub mod script;
pub mod symbol;
pub mod transaction;

pub use attachment::{
    AssetCert, AssetDetail, AssetTransfer, Attachment, AttachmentPayload, CertKind, CertSet,
    CertStatus, DidDetail, MitRegister, MitTransfer, secondary_issue_owns_enough,
    DID_ATTACH_VERIFY_VERSION, SECONDARY_ISSUE_THRESHOLD_FREE,
};
pub use attenuation::AttenuationParam;
pub use hash::{Hash32, MalformedHash, NULL_HASH32, sha3_256};
pub use script::{Address, Script, ScriptPattern, script_flags};
pub use symbol::{
    Domain, Symbol, is_forbidden_symbol, is_valid_asset_symbol, is_valid_did_symbol,
    is_valid_mit_symbol,
};
pub use transaction::{Input, Mer, Output, OutputPoint, Transaction, transaction_version};

// -----------------------------------------------------------------------------
// Consensus constants
// -----------------------------------------------------------------------------

/// Largest amount of base currency that can ever exist (1e8 coins of 1e8
/// sub-units each). Output values and their sums may never exceed it.
pub const MAX_MONEY: Mer = 100_000_000 * 100_000_000;

/// Minimum fee for a transaction to be admitted to the pending pool.
pub const MIN_TX_FEE: Mer = 10_000;

/// Maximum serialized transaction size, set to the maximum block size.
pub const MAX_TRANSACTION_SIZE: usize = 1_000_000;

/// Number of confirmations a coinbase output needs before it may be spent.
pub const COINBASE_MATURITY: u64 = 1_000;

/// Height at which the nova feature set activates on mainnet.
pub const NOVA_ACTIVATION_HEIGHT: u64 = 1_270_000;

/// The discrete schedule of deposit lock heights a height-locked output may
/// declare.
pub const LOCK_HEIGHT_SCHEDULE: [u64; 5] = [25_200, 108_000, 331_200, 655_200, 1_314_000];

/// Whether `lock_height` appears in the deposit schedule.
pub fn is_scheduled_lock_height(lock_height: u64) -> bool {
    LOCK_HEIGHT_SCHEDULE.contains(&lock_height)
}

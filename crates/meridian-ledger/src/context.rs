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

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

use meridian_kernel::{
    Address, CertKind, Hash32, OutputPoint, Script, Symbol, Transaction, NOVA_ACTIVATION_HEIGHT,
};

/// Everything the admission validator needs from a single collaborator. All
/// slices are read-only; concurrent validations may share one context.
pub trait ValidationContext: ChainSlice + RegistrySlice + ScriptVerifier {}

/// An interface for interacting with committed chain state.
pub trait ChainSlice {
    /// Transaction body by hash, wherever the store keeps it.
    fn fetch_transaction(&self, hash: &Hash32) -> Option<Transaction>;

    /// Height of the block that confirmed the transaction, `None` when it is
    /// not confirmed on-chain.
    fn fetch_transaction_index(&self, hash: &Hash32) -> Option<u64>;

    /// The input point already spending `previous_output`, if any.
    fn fetch_spend(&self, previous_output: &OutputPoint) -> Option<OutputPoint>;

    fn fetch_last_height(&self) -> u64;

    /// One-shot body + height lookup used by the business checkers.
    /// Implementations typically answer from both the confirmed chain and
    /// the pending pool, reporting pooled parents at height 0.
    fn get_transaction(&self, hash: &Hash32) -> Option<(Transaction, u64)>;
}

/// An interface for interacting with the business-object registries: assets,
/// certificates, registered tokens and identities.
pub trait RegistrySlice {
    fn is_asset_exist(&self, symbol: &Symbol) -> bool;

    /// Cumulative issued volume of an asset.
    fn asset_total_supply(&self, symbol: &Symbol) -> u64;

    fn is_cert_exist(&self, symbol: &Symbol, kind: CertKind) -> bool;

    fn is_mit_exist(&self, symbol: &Symbol) -> bool;

    fn is_did_exist(&self, did: &str) -> bool;

    /// Address an identity is bound to.
    fn registered_did_address(&self, did: &str) -> Option<Address>;

    /// Identity bound to an address, the reverse direction.
    fn did_from_address(&self, address: &Address) -> Option<String>;

    fn is_address_registered_did(&self, address: &Address) -> bool;

    /// Syntactic/checksum address validity for this network.
    fn is_valid_address(&self, candidate: &str) -> bool;

    fn use_testnet_rules(&self) -> bool;
}

/// The consensus script oracle. Which backend executes the script is a
/// deployment choice; the validator only consumes the verdict.
pub trait ScriptVerifier {
    fn verify_script(
        &self,
        prevout_script: &Script,
        tx: &Transaction,
        input_index: u32,
        flags: u32,
    ) -> bool;
}

/// The admission validator's view of the pending-transaction pool.
pub trait PoolSlice {
    fn is_in_pool(&self, hash: &Hash32) -> bool;

    /// Whether any of the transaction's inputs is already spent by a pooled
    /// transaction.
    fn is_spent_in_pool(&self, tx: &Transaction) -> bool;

    fn find(&self, hash: &Hash32) -> Option<Transaction>;
}

/// Nova activation predicate: height-gated on mainnet, always on under
/// testnet rules.
pub fn is_nova_feature_activated<C>(context: &C) -> bool
where
    C: ChainSlice + RegistrySlice,
{
    context.use_testnet_rules() || context.fetch_last_height() > NOVA_ACTIVATION_HEIGHT
}

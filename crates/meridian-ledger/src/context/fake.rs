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

//! In-memory stand-ins for the chain, registry, script and pool
//! collaborators, for tests of the validator and of downstream crates.

use crate::context::{
    ChainSlice, PoolSlice, RegistrySlice, ScriptVerifier, ValidationContext,
};
use meridian_kernel::{
    Address, CertKind, Hash32, OutputPoint, Script, Symbol, Transaction,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
struct ChainEntry {
    transaction: Transaction,
    /// `None` marks a body known to the store but not confirmed on-chain.
    height: Option<u64>,
}

/// A fake chain + registry + script oracle. Scripts verify unless the
/// previous output's locking script is a raw (unrecognized) one.
#[derive(Clone, Debug, Default)]
pub struct FakeChain {
    height: u64,
    testnet: bool,
    transactions: BTreeMap<Hash32, ChainEntry>,
    spends: BTreeMap<OutputPoint, OutputPoint>,
    assets: BTreeMap<Symbol, u64>,
    certs: BTreeSet<(Symbol, CertKind)>,
    mits: BTreeSet<Symbol>,
    dids: BTreeMap<String, Address>,
    valid_addresses: BTreeSet<String>,
}

impl FakeChain {
    pub fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn with_testnet_rules(mut self) -> Self {
        self.testnet = true;
        self
    }

    /// A confirmed transaction, at the given parent height.
    pub fn with_transaction(mut self, transaction: Transaction, height: u64) -> Self {
        let hash = transaction.hash();
        self.transactions.insert(
            hash,
            ChainEntry {
                transaction,
                height: Some(height),
            },
        );
        self
    }

    /// A body the store knows without a confirmed height.
    pub fn with_unconfirmed_transaction(mut self, transaction: Transaction) -> Self {
        let hash = transaction.hash();
        self.transactions.insert(
            hash,
            ChainEntry {
                transaction,
                height: None,
            },
        );
        self
    }

    pub fn with_spend(mut self, previous_output: OutputPoint, spender: OutputPoint) -> Self {
        self.spends.insert(previous_output, spender);
        self
    }

    pub fn with_asset(mut self, symbol: Symbol, total_supply: u64) -> Self {
        self.assets.insert(symbol, total_supply);
        self
    }

    pub fn with_cert(mut self, symbol: Symbol, kind: CertKind) -> Self {
        self.certs.insert((symbol, kind));
        self
    }

    pub fn with_mit(mut self, symbol: Symbol) -> Self {
        self.mits.insert(symbol);
        self
    }

    pub fn with_did(mut self, did: impl Into<String>, address: Address) -> Self {
        self.dids.insert(did.into(), address);
        self
    }

    pub fn with_valid_address(mut self, address: impl Into<String>) -> Self {
        self.valid_addresses.insert(address.into());
        self
    }
}

impl ChainSlice for FakeChain {
    fn fetch_transaction(&self, hash: &Hash32) -> Option<Transaction> {
        self.transactions
            .get(hash)
            .map(|entry| entry.transaction.clone())
    }

    fn fetch_transaction_index(&self, hash: &Hash32) -> Option<u64> {
        self.transactions.get(hash).and_then(|entry| entry.height)
    }

    fn fetch_spend(&self, previous_output: &OutputPoint) -> Option<OutputPoint> {
        self.spends.get(previous_output).copied()
    }

    fn fetch_last_height(&self) -> u64 {
        self.height
    }

    fn get_transaction(&self, hash: &Hash32) -> Option<(Transaction, u64)> {
        self.transactions
            .get(hash)
            .map(|entry| (entry.transaction.clone(), entry.height.unwrap_or(0)))
    }
}

impl RegistrySlice for FakeChain {
    fn is_asset_exist(&self, symbol: &Symbol) -> bool {
        self.assets.contains_key(symbol)
    }

    fn asset_total_supply(&self, symbol: &Symbol) -> u64 {
        self.assets.get(symbol).copied().unwrap_or(0)
    }

    fn is_cert_exist(&self, symbol: &Symbol, kind: CertKind) -> bool {
        self.certs.contains(&(symbol.clone(), kind))
    }

    fn is_mit_exist(&self, symbol: &Symbol) -> bool {
        self.mits.contains(symbol)
    }

    fn is_did_exist(&self, did: &str) -> bool {
        self.dids.contains_key(did)
    }

    fn registered_did_address(&self, did: &str) -> Option<Address> {
        self.dids.get(did).cloned()
    }

    fn did_from_address(&self, address: &Address) -> Option<String> {
        self.dids
            .iter()
            .find(|(_, bound)| *bound == address)
            .map(|(did, _)| did.clone())
    }

    fn is_address_registered_did(&self, address: &Address) -> bool {
        self.dids.values().any(|bound| bound == address)
    }

    fn is_valid_address(&self, candidate: &str) -> bool {
        self.valid_addresses.contains(candidate)
    }

    fn use_testnet_rules(&self) -> bool {
        self.testnet
    }
}

impl ScriptVerifier for FakeChain {
    fn verify_script(
        &self,
        prevout_script: &Script,
        _tx: &Transaction,
        _input_index: u32,
        _flags: u32,
    ) -> bool {
        !matches!(prevout_script, Script::Raw(_))
    }
}

impl ValidationContext for FakeChain {}

/// A fake pending pool.
#[derive(Clone, Debug, Default)]
pub struct FakePool {
    transactions: BTreeMap<Hash32, Transaction>,
    spent: BTreeSet<OutputPoint>,
}

impl FakePool {
    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.insert(transaction.hash(), transaction);
        self
    }

    pub fn with_spent(mut self, previous_output: OutputPoint) -> Self {
        self.spent.insert(previous_output);
        self
    }
}

impl PoolSlice for FakePool {
    fn is_in_pool(&self, hash: &Hash32) -> bool {
        self.transactions.contains_key(hash)
    }

    fn is_spent_in_pool(&self, tx: &Transaction) -> bool {
        tx.inputs
            .iter()
            .any(|input| self.spent.contains(&input.previous_output))
    }

    fn find(&self, hash: &Hash32) -> Option<Transaction> {
        self.transactions.get(hash).cloned()
    }
}

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

use meridian_kernel::{Hash32, Transaction};
use meridian_ledger::context::PoolSlice;
use std::sync::Arc;
use thiserror::Error;

/// Monotonic arrival order of a pooled transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MempoolSeqNo(pub u64);

/// Where a transaction came from. Origin does not affect validity, only
/// relay bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOrigin {
    /// Originating from this node (wallet, API).
    Local,
    /// Received from a peer.
    Peer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TxRejectReason {
    #[error("mempool is full")]
    MempoolFull,
    #[error("transaction already pooled")]
    Duplicate,
    #[error("transaction conflicts with a pooled spend")]
    DoubleSpend,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MempoolConfig {
    /// Upper bound on pooled transactions, unbounded when `None`.
    pub max_txs: Option<usize>,
}

/// A pending-transaction pool. Implementations must be safe for concurrent
/// use: independent validations query the pool while peers feed it.
///
/// Admission validation itself lives in the ledger crate; callers are
/// expected to run it before inserting.
pub trait Mempool: PoolSlice + Send + Sync {
    /// Add a validated transaction, assigning its arrival sequence number.
    fn insert(
        &self,
        tx: Transaction,
        origin: TxOrigin,
    ) -> Result<(Hash32, MempoolSeqNo), TxRejectReason>;

    /// Take up to `limit` transactions out of the pool in arrival order,
    /// with the intent of forging a new block.
    fn take(&self, limit: usize) -> Vec<Arc<Transaction>>;

    /// Take note of a transaction confirmed outside the pool: drop it and
    /// everything now conflicting with its spends.
    fn acknowledge(&self, confirmed: &Transaction);

    /// Retrieve a pooled transaction by its hash.
    fn get_tx(&self, hash: &Hash32) -> Option<Arc<Transaction>>;
}

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

use crate::mempool::{Mempool, MempoolConfig, MempoolSeqNo, TxOrigin, TxRejectReason};
use meridian_kernel::{Hash32, OutputPoint, Transaction};
use meridian_ledger::context::PoolSlice;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

pub struct InMemoryMempool {
    inner: parking_lot::RwLock<MempoolInner>,
    config: MempoolConfig,
}

impl Default for InMemoryMempool {
    fn default() -> Self {
        InMemoryMempool {
            inner: parking_lot::RwLock::new(MempoolInner::default()),
            config: MempoolConfig::default(),
        }
    }
}

impl InMemoryMempool {
    pub fn new(config: MempoolConfig) -> Self {
        InMemoryMempool {
            inner: parking_lot::RwLock::new(MempoolInner::default()),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries_by_id.is_empty()
    }
}

#[derive(Debug, Default)]
struct MempoolInner {
    next_seq: u64,
    entries_by_id: BTreeMap<Hash32, MempoolEntry>,
    entries_by_seq: BTreeMap<MempoolSeqNo, Hash32>,
    /// Previous outputs consumed by pooled transactions, the double-spend
    /// index behind `is_spent_in_pool`.
    spends: BTreeMap<OutputPoint, Hash32>,
}

#[derive(Debug)]
struct MempoolEntry {
    seq_no: MempoolSeqNo,
    tx: Arc<Transaction>,
    #[allow(dead_code)]
    origin: TxOrigin,
}

impl MempoolInner {
    fn insert(
        &mut self,
        config: &MempoolConfig,
        tx: Transaction,
        origin: TxOrigin,
    ) -> Result<(Hash32, MempoolSeqNo), TxRejectReason> {
        if let Some(max_txs) = config.max_txs {
            if self.entries_by_id.len() >= max_txs {
                return Err(TxRejectReason::MempoolFull);
            }
        }

        let hash = tx.hash();
        if self.entries_by_id.contains_key(&hash) {
            return Err(TxRejectReason::Duplicate);
        }
        if tx
            .inputs
            .iter()
            .any(|input| self.spends.contains_key(&input.previous_output))
        {
            return Err(TxRejectReason::DoubleSpend);
        }

        let seq_no = MempoolSeqNo(self.next_seq);
        self.next_seq += 1;

        for input in &tx.inputs {
            self.spends.insert(input.previous_output, hash);
        }
        self.entries_by_seq.insert(seq_no, hash);
        self.entries_by_id.insert(
            hash,
            MempoolEntry {
                seq_no,
                tx: Arc::new(tx),
                origin,
            },
        );
        Ok((hash, seq_no))
    }

    fn remove(&mut self, hash: &Hash32) {
        if let Some(entry) = self.entries_by_id.remove(hash) {
            self.entries_by_seq.remove(&entry.seq_no);
            self.spends.retain(|_, spender| spender != hash);
        }
    }
}

impl Mempool for InMemoryMempool {
    fn insert(
        &self,
        tx: Transaction,
        origin: TxOrigin,
    ) -> Result<(Hash32, MempoolSeqNo), TxRejectReason> {
        let (hash, seq_no) = self.inner.write().insert(&self.config, tx, origin)?;
        trace!(%hash, seq_no = seq_no.0, "transaction pooled");
        Ok((hash, seq_no))
    }

    fn take(&self, limit: usize) -> Vec<Arc<Transaction>> {
        let mut inner = self.inner.write();
        let hashes: Vec<Hash32> = inner
            .entries_by_seq
            .values()
            .take(limit)
            .copied()
            .collect();
        let mut taken = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(entry) = inner.entries_by_id.get(&hash) {
                taken.push(entry.tx.clone());
            }
            inner.remove(&hash);
        }
        taken
    }

    fn acknowledge(&self, confirmed: &Transaction) {
        let mut inner = self.inner.write();
        inner.remove(&confirmed.hash());

        // pooled transactions racing the confirmed one for an outpoint are
        // now invalid
        let conflicting: Vec<Hash32> = confirmed
            .inputs
            .iter()
            .filter_map(|input| inner.spends.get(&input.previous_output).copied())
            .collect();
        for hash in conflicting {
            trace!(%hash, "evicting pooled transaction conflicting with a confirmation");
            inner.remove(&hash);
        }
    }

    fn get_tx(&self, hash: &Hash32) -> Option<Arc<Transaction>> {
        self.inner.read().entries_by_id.get(hash).map(|entry| entry.tx.clone())
    }
}

impl PoolSlice for InMemoryMempool {
    fn is_in_pool(&self, hash: &Hash32) -> bool {
        self.inner.read().entries_by_id.contains_key(hash)
    }

    fn is_spent_in_pool(&self, tx: &Transaction) -> bool {
        let inner = self.inner.read();
        tx.inputs
            .iter()
            .any(|input| inner.spends.contains_key(&input.previous_output))
    }

    fn find(&self, hash: &Hash32) -> Option<Transaction> {
        self.inner
            .read()
            .entries_by_id
            .get(hash)
            .map(|entry| (*entry.tx).clone())
    }
}

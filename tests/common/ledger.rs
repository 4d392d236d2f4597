use std::sync::{Arc, Mutex};

use beacon_consensus::{
    chain::pluggables::{State, TxnPool, Updater},
    types::{block::Block, data_types::Transaction},
};

/// A ledger holding a single number. Every transaction adds an amount to it.
#[derive(Clone, Default)]
pub(crate) struct Counter {
    total: u64,
}

impl Counter {
    pub(crate) fn total(&self) -> u64 {
        self.total
    }
}

impl State for Counter {
    fn serialize(&self) -> Vec<u8> {
        self.total.to_le_bytes().to_vec()
    }

    fn apply(&mut self, txns: &[Transaction]) {
        for txn in txns {
            if let Some(amount) = amount(txn) {
                self.total += amount as u64;
            }
        }
    }
}

/// Create a transaction that adds `amount` to the [`Counter`]. `nonce` distinguishes transactions
/// with the same amount.
pub(crate) fn increment(amount: u32, nonce: u32) -> Transaction {
    let mut bytes = amount.to_le_bytes().to_vec();
    bytes.extend_from_slice(&nonce.to_le_bytes());
    Transaction::new(bytes)
}

fn amount(txn: &Transaction) -> Option<u32> {
    let bytes: [u8; 4] = txn.bytes().get(0..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// A first-in, first-out transaction pool.
#[derive(Default)]
pub(crate) struct MemPool(Vec<Transaction>);

impl TxnPool for MemPool {
    fn add(&mut self, txn: Transaction) {
        if !self.0.contains(&txn) {
            self.0.push(txn)
        }
    }

    fn batch(&self, limit: u32) -> Vec<Transaction> {
        self.0.iter().take(limit as usize).cloned().collect()
    }

    fn remove(&mut self, txns: &[Transaction]) {
        self.0.retain(|txn| !txns.contains(txn))
    }
}

/// Records every block that became the chain head, in order.
#[derive(Clone, Default)]
pub(crate) struct HeadRecorder(Arc<Mutex<Vec<Block>>>);

impl HeadRecorder {
    pub(crate) fn blocks(&self) -> Vec<Block> {
        self.0.lock().unwrap().clone()
    }

    /// Get the sum of the amounts of every finalized transaction.
    pub(crate) fn total(&self) -> u64 {
        let mut counter = Counter::default();
        for block in self.0.lock().unwrap().iter() {
            counter.apply(&block.txns);
        }
        counter.total()
    }
}

impl Updater for HeadRecorder {
    fn on_head_updated(&mut self, block: &Block) {
        self.0.lock().unwrap().push(block.clone())
    }
}

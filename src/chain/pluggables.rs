/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for the components around the chain that the consensus core consumes but does not define:
//! the ledger state, the transaction pool, and the subscribers to chain head updates.

use crate::types::{
    block::Block,
    crypto_primitives::hash,
    data_types::{CryptoHash, Transaction},
};

/// A snapshot of the ledger state.
///
/// The chain reads a clone of the state when building a proposal, and writes to it when applying a
/// finalized block. The state is not shared with any other component, so implementations do not need
/// internal synchronization.
pub trait State: Clone + Send + 'static {
    /// Serialize the state deterministically: two states that would apply future transactions the same
    /// way must serialize to the same bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Apply the transactions of a block, in order.
    fn apply(&mut self, txns: &[Transaction]);

    /// Get the root hash of the state, which is included in block proposals.
    fn root(&self) -> CryptoHash {
        hash(&[&self.serialize()])
    }
}

/// A pool of pending transactions.
pub trait TxnPool: Send + 'static {
    /// Add a transaction to the pool. Adding a transaction that is already in the pool should be a
    /// no-op, since the network may deliver the same transaction more than once.
    fn add(&mut self, txn: Transaction);

    /// Get up to `limit` pending transactions to include in a new proposal. The transactions stay in
    /// the pool.
    fn batch(&self, limit: u32) -> Vec<Transaction>;

    /// Remove the transactions included in a finalized block.
    fn remove(&mut self, txns: &[Transaction]);
}

/// Notified whenever the chain head advances.
pub trait Updater: Send + 'static {
    fn on_head_updated(&mut self, block: &Block);
}

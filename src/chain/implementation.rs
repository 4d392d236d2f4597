/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The canonical sequence of finalized blocks.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use crate::{
    notary::types::{verify_notarization, Notarization},
    threshold::ThresholdError,
    types::{
        block::{Block, BlockProposal},
        crypto_primitives::Keypair,
        data_types::{CryptoHash, Round, Transaction},
        groups::Group,
    },
};

use super::pluggables::{State, TxnPool, Updater};

/// Maintains the chain head, the ledger state at the head, and the proposals and notarizations of
/// rounds that have not been finalized yet.
///
/// The chain advances only through [`finalize`](Self::finalize), which accepts the first block with a
/// valid notarization for each round, as long as it extends the current head.
pub struct Chain<S: State, P: TxnPool, U: Updater> {
    head: Block,
    state: S,
    pool: P,
    updater: U,
    camera: ChainHeadCamera,
    proposals: BTreeMap<Round, HashMap<CryptoHash, BlockProposal>>,
    notarizations: BTreeMap<Round, Notarization>,
}

impl<S: State, P: TxnPool, U: Updater> Chain<S, P, U> {
    /// Create a chain whose head is the genesis block on top of `genesis_state`.
    pub fn new(genesis_state: S, pool: P, updater: U) -> Self {
        let head = Block::genesis(genesis_state.root());
        Self {
            camera: ChainHeadCamera::new(head.clone()),
            head,
            state: genesis_state,
            pool,
            updater,
            proposals: BTreeMap::new(),
            notarizations: BTreeMap::new(),
        }
    }

    pub fn head(&self) -> &Block {
        &self.head
    }

    /// Get a [`ChainHeadCamera`] that follows this chain's head.
    pub fn camera(&self) -> ChainHeadCamera {
        self.camera.clone()
    }

    pub fn add_txn(&mut self, txn: Transaction) {
        self.pool.add(txn)
    }

    /// Take a snapshot of everything a proposal for `round` is built from: the current head, a copy of
    /// the ledger state at the head, and a batch of up to `limit` pending transactions.
    ///
    /// The returned draft is [sealed](ProposalDraft::seal) into a proposal without any further access
    /// to the chain, so sealing can happen on another thread.
    pub fn draft_proposal(&self, round: Round, limit: u32) -> ProposalDraft<S> {
        ProposalDraft {
            round,
            parent: self.head.hash,
            state: self.state.clone(),
            txns: self.pool.batch(limit),
        }
    }

    /// Get a stored proposal.
    pub fn proposal(&self, round: Round, hash: &CryptoHash) -> Option<&BlockProposal> {
        self.proposals.get(&round)?.get(hash)
    }

    /// Store `proposal`, so that it can be turned into a block once notarized.
    ///
    /// If the proposal's notarization was already collected, returns the block it makes. Proposals
    /// for rounds that are not above the head's round are dropped.
    pub fn add_proposal(&mut self, proposal: BlockProposal) -> Option<Block> {
        if proposal.round <= self.head.round {
            return None;
        }

        let hash = proposal.hash();
        let round = proposal.round;
        let ready = self
            .notarizations
            .get(&round)
            .is_some_and(|notarization| notarization.proposal == hash);
        if ready {
            let notarization = self.notarizations.remove(&round)?;
            return Some(Block::from_notarized(proposal, notarization.signature));
        }

        self.proposals
            .entry(round)
            .or_default()
            .entry(hash)
            .or_insert(proposal);
        None
    }

    /// Record a collected `notarization`, returning the block it makes if the notarized proposal is
    /// known. Otherwise, the notarization is kept until the proposal arrives.
    pub fn add_notarization(&mut self, notarization: Notarization) -> Option<Block> {
        if notarization.round <= self.head.round {
            return None;
        }

        match self
            .proposals
            .get(&notarization.round)
            .and_then(|proposals| proposals.get(&notarization.proposal))
        {
            Some(proposal) => Some(Block::from_notarized(
                proposal.clone(),
                notarization.signature,
            )),
            None => {
                self.notarizations
                    .entry(notarization.round)
                    .or_insert(notarization);
                None
            }
        }
    }

    /// Forget the proposals and notarizations of every round below `round`.
    pub fn discard_before(&mut self, round: Round) {
        self.proposals = self.proposals.split_off(&round);
        self.notarizations = self.notarizations.split_off(&round);
    }

    /// Make `block` the new head, applying its transactions to the ledger state.
    ///
    /// `notary_committee` is the notary committee of `block.round`: the block's notarization must be a
    /// valid group signature by it.
    pub fn finalize(&mut self, block: Block, notary_committee: &Group) -> Result<(), ChainError> {
        if block.round == self.head.round {
            return Err(ChainError::AlreadyFinalized { round: block.round });
        }
        if block.round < self.head.round {
            return Err(ChainError::StaleRound {
                round: block.round,
                head_round: self.head.round,
            });
        }
        if !block.is_hash_correct() {
            return Err(ChainError::IncorrectHash);
        }
        if block.parent != self.head.hash {
            return Err(ChainError::UnknownParent {
                parent: block.parent,
            });
        }
        verify_notarization(
            notary_committee,
            block.round,
            &block.hash,
            &block.notarization,
        )
        .map_err(ChainError::BadNotarization)?;

        let mut next_state = self.state.clone();
        next_state.apply(&block.txns);
        if next_state.root() != block.state_root {
            return Err(ChainError::StateRootMismatch {
                expected: block.state_root,
                computed: next_state.root(),
            });
        }

        self.state = next_state;
        self.pool.remove(&block.txns);
        self.discard_before(block.round + 1);
        self.camera.update(block.clone());
        self.head = block;
        self.updater.on_head_updated(&self.head);

        Ok(())
    }
}

/// Everything needed to build a proposal, taken from the chain at one instant.
pub struct ProposalDraft<S: State> {
    round: Round,
    parent: CryptoHash,
    state: S,
    txns: Vec<Transaction>,
}

impl<S: State> ProposalDraft<S> {
    pub fn round(&self) -> Round {
        self.round
    }

    /// Apply the draft's transactions to its state snapshot and sign the resulting proposal with
    /// `keypair`.
    pub fn seal(mut self, keypair: &Keypair) -> BlockProposal {
        self.state.apply(&self.txns);
        BlockProposal::new(
            keypair,
            self.round,
            self.parent,
            self.state.root(),
            self.txns,
        )
    }
}

/// A read-only view of the chain head that can be shared with other threads.
#[derive(Clone)]
pub struct ChainHeadCamera(Arc<RwLock<Block>>);

impl ChainHeadCamera {
    fn new(head: Block) -> Self {
        Self(Arc::new(RwLock::new(head)))
    }

    /// Get the latest finalized block.
    pub fn head(&self) -> Block {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update(&self, head: Block) {
        *self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = head;
    }
}

/// Reasons why a block cannot be finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    AlreadyFinalized { round: Round },
    StaleRound { round: Round, head_round: Round },
    IncorrectHash,
    UnknownParent { parent: CryptoHash },
    BadNotarization(ThresholdError),
    /// The notary committee of the block's round cannot be determined yet.
    UnknownGroup { round: Round },
    StateRootMismatch { expected: CryptoHash, computed: CryptoHash },
}

impl From<ThresholdError> for ChainError {
    fn from(value: ThresholdError) -> Self {
        ChainError::BadNotarization(value)
    }
}

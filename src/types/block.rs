/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'block proposal' and 'block' types and their associated methods.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::threshold::types::GroupSignatureBytes;

use super::{
    crypto_primitives::{is_correctly_signed, CryptoHasher, Digest, Keypair},
    data_types::{CryptoHash, Round, SignatureBytes, Transaction, VerifyingKeyBytes},
};

/// A candidate block for a round, authored and signed by one member of the round's block proposer
/// committee.
///
/// Multiple conflicting proposals may circulate for the same round. At most one of them is ever
/// notarized, becoming the round's [`Block`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockProposal {
    pub round: Round,
    pub parent: CryptoHash,
    /// Root of the ledger state after applying `txns` to the state at `parent`.
    pub state_root: CryptoHash,
    pub txns: Vec<Transaction>,
    pub proposer: VerifyingKeyBytes,
    /// Signature by `proposer` over [`hash`](Self::hash).
    pub signature: SignatureBytes,
}

impl BlockProposal {
    /// Create a proposal authored and signed by `keypair`.
    pub fn new(
        keypair: &Keypair,
        round: Round,
        parent: CryptoHash,
        state_root: CryptoHash,
        txns: Vec<Transaction>,
    ) -> BlockProposal {
        let proposer = keypair.public().to_bytes();
        let hash = content_hash(round, &parent, &state_root, &txns, &proposer);
        BlockProposal {
            round,
            parent,
            state_root,
            txns,
            proposer,
            signature: keypair.sign(&hash.bytes()),
        }
    }

    /// Get the hash identifying this proposal, and the block it becomes if notarized.
    pub fn hash(&self) -> CryptoHash {
        content_hash(
            self.round,
            &self.parent,
            &self.state_root,
            &self.txns,
            &self.proposer,
        )
    }

    /// Check whether `signature` is a valid signature by `proposer` over the proposal's hash.
    pub fn is_correctly_signed(&self) -> bool {
        is_correctly_signed(&self.proposer, &self.hash().bytes(), &self.signature)
    }
}

/// A finalized block: a [`BlockProposal`] together with the group signature of the round's notary
/// committee on it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub round: Round,
    pub hash: CryptoHash,
    pub parent: CryptoHash,
    pub state_root: CryptoHash,
    pub txns: Vec<Transaction>,
    pub proposer: VerifyingKeyBytes,
    /// Group signature over
    /// [`notarization_message(round, hash)`](crate::notary::messages::notarization_message).
    /// Empty for the genesis block.
    pub notarization: GroupSignatureBytes,
}

impl Block {
    /// Create the genesis block, which starts the chain in round 0 on top of the initial ledger
    /// state.
    pub fn genesis(state_root: CryptoHash) -> Block {
        let parent = CryptoHash::default();
        let proposer = [0u8; 32];
        let txns = Vec::new();
        Block {
            round: Round::new(0),
            hash: content_hash(Round::new(0), &parent, &state_root, &txns, &proposer),
            parent,
            state_root,
            txns,
            proposer,
            notarization: GroupSignatureBytes::new(Vec::new()),
        }
    }

    /// Create the block that `proposal` becomes once notarized with `notarization`.
    pub fn from_notarized(proposal: BlockProposal, notarization: GroupSignatureBytes) -> Block {
        Block {
            round: proposal.round,
            hash: proposal.hash(),
            parent: proposal.parent,
            state_root: proposal.state_root,
            txns: proposal.txns,
            proposer: proposal.proposer,
            notarization,
        }
    }

    /// Checks if `hash` is the hash of the block's contents.
    pub fn is_hash_correct(&self) -> bool {
        self.hash
            == content_hash(
                self.round,
                &self.parent,
                &self.state_root,
                &self.txns,
                &self.proposer,
            )
    }
}

fn content_hash(
    round: Round,
    parent: &CryptoHash,
    state_root: &CryptoHash,
    txns: &Vec<Transaction>,
    proposer: &VerifyingKeyBytes,
) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update(round.try_to_vec().unwrap());
    hasher.update(parent.try_to_vec().unwrap());
    hasher.update(state_root.try_to_vec().unwrap());
    hasher.update(txns.try_to_vec().unwrap());
    hasher.update(proposer);
    CryptoHash::new(hasher.finalize().into())
}

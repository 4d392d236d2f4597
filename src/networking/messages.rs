/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Exhaustive enumeration of every message variant exchanged between nodes.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    notary::messages::NtShare,
    random_beacon::messages::RandBeaconSigShare,
    types::{
        block::{Block, BlockProposal},
        data_types::{Round, Transaction},
    },
};

/// All message variants exchanged between nodes.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub enum Message {
    /// A proposer committee member's candidate block for a round.
    BlockProposal(BlockProposal),

    /// A notary committee member's signature share on a proposal.
    NtShare(NtShare),

    /// A random beacon committee member's signature share on the next beacon entry.
    RandBeaconSigShare(RandBeaconSigShare),

    /// A notarized block, re-broadcast once finalized so that lagging nodes can catch up.
    Block(Block),

    /// A transaction submitted by a client.
    Transaction(Transaction),
}

impl Message {
    /// Get the round the message belongs to, if it belongs to any.
    pub fn round(&self) -> Option<Round> {
        match self {
            Message::BlockProposal(msg) => Some(msg.round),
            Message::NtShare(msg) => Some(msg.round),
            Message::RandBeaconSigShare(msg) => Some(msg.round),
            Message::Block(msg) => Some(msg.round),
            Message::Transaction(_) => None,
        }
    }
}

impl From<BlockProposal> for Message {
    fn from(value: BlockProposal) -> Self {
        Message::BlockProposal(value)
    }
}

impl From<NtShare> for Message {
    fn from(value: NtShare) -> Self {
        Message::NtShare(value)
    }
}

impl From<RandBeaconSigShare> for Message {
    fn from(value: RandBeaconSigShare) -> Self {
        Message::RandBeaconSigShare(value)
    }
}

impl From<Block> for Message {
    fn from(value: Block) -> Self {
        Message::Block(value)
    }
}

impl From<Transaction> for Message {
    fn from(value: Transaction) -> Self {
        Message::Transaction(value)
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by a node, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are published by
//! the node thread and by the worker threads it spawns, and are passed to user-defined handlers (and
//! optionally, to the default [loggers](crate::logging)) on the [event bus](crate::event_bus) thread.

use std::{sync::mpsc::Sender, time::Duration, time::SystemTime};

use ed25519_dalek::VerifyingKey;

use crate::{
    notary::messages::NtShare,
    random_beacon::{committees::Committees, history::BeaconEntry, messages::RandBeaconSigShare},
    types::{
        block::BlockProposal,
        data_types::{CryptoHash, GroupID, Round},
    },
};

pub enum Event {
    // Round lifecycle events.
    StartRound(StartRoundEvent),
    EndRound(EndRoundEvent),
    RoundTimeout(RoundTimeoutEvent),
    // Events that involve broadcasting a message.
    Propose(ProposeEvent),
    Notarize(NotarizeEvent),
    SignBeaconShare(SignBeaconShareEvent),
    // Events that involve receiving a message.
    ReceiveProposal(ReceiveProposalEvent),
    // Notary events.
    NotaryTimeout(NotaryTimeoutEvent),
    // Events that change persistent state.
    FinalizeBlock(FinalizeBlockEvent),
    AppendBeacon(AppendBeaconEvent),
}

impl Event {
    /// Publish `event` if this node has an event bus. Publishing after the event bus has shut down is a
    /// no-op.
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(event);
        }
    }
}

/// The node started `round`, whose committees are `committees`.
pub struct StartRoundEvent {
    pub timestamp: SystemTime,
    pub round: Round,
    pub committees: Committees,
}

/// The node ended `round`: its notaries were stopped, and if the node is in the round's random beacon
/// committee, it started signing the next beacon entry.
pub struct EndRoundEvent {
    pub timestamp: SystemTime,
    pub round: Round,
}

/// `round` was open for `timeout` without a block being finalized, so it is skipped.
pub struct RoundTimeoutEvent {
    pub timestamp: SystemTime,
    pub round: Round,
    pub timeout: Duration,
}

/// The node broadcasted a block proposal.
pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub proposal: BlockProposal,
}

/// The node broadcasted a notarization share as a member of `group`.
pub struct NotarizeEvent {
    pub timestamp: SystemTime,
    pub group: GroupID,
    pub nt_share: NtShare,
}

/// The node broadcasted a random beacon signature share as a member of `group`.
pub struct SignBeaconShareEvent {
    pub timestamp: SystemTime,
    pub group: GroupID,
    pub share: RandBeaconSigShare,
}

/// The node received a block proposal from `origin`.
pub struct ReceiveProposalEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub proposal: BlockProposal,
}

/// A notary of the node in `group` did not see a valid proposal for `round` within `timeout`.
pub struct NotaryTimeoutEvent {
    pub timestamp: SystemTime,
    pub round: Round,
    pub group: GroupID,
    pub timeout: Duration,
}

/// The block with hash `block` became the chain head.
pub struct FinalizeBlockEvent {
    pub timestamp: SystemTime,
    pub round: Round,
    pub block: CryptoHash,
    pub txns: usize,
}

/// `entry` was appended to the random beacon history.
pub struct AppendBeaconEvent {
    pub timestamp: SystemTime,
    pub entry: BeaconEntry,
}

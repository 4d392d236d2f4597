/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the replica's
//! [configuration](crate::replica::Configuration).
//!
//! The node logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ReceiveProposal](crate::events::ReceiveProposalEvent) is printed:
//!
//! ```text
//! ReceiveProposal, 1701329264, Id5u7f6, fNGCJyk, 12, 3
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the public key of the
//!   origin of the proposal.
//! - The fourth value is the first seven characters of the Base64 encoding of the hash of the proposal.
//! - The fifth value is the round of the proposal.
//! - The sixth value is the number of transactions in the proposal.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const START_ROUND: &str = "StartRound";
pub const END_ROUND: &str = "EndRound";
pub const ROUND_TIMEOUT: &str = "RoundTimeout";

pub const PROPOSE: &str = "Propose";
pub const NOTARIZE: &str = "Notarize";
pub const SIGN_BEACON_SHARE: &str = "SignBeaconShare";

pub const RECEIVE_PROPOSAL: &str = "ReceiveProposal";

pub const NOTARY_TIMEOUT: &str = "NotaryTimeout";

pub const FINALIZE_BLOCK: &str = "FinalizeBlock";
pub const APPEND_BEACON: &str = "AppendBeacon";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for StartRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |start_round_event: &StartRoundEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                START_ROUND,
                secs_since_unix_epoch(start_round_event.timestamp),
                start_round_event.round,
                start_round_event.committees.random_beacon,
                start_round_event.committees.block_proposer,
                start_round_event.committees.notary
            )
        };
        Box::new(logger)
    }
}

impl Logger for EndRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |end_round_event: &EndRoundEvent| {
            log::info!(
                "{}, {}, {}",
                END_ROUND,
                secs_since_unix_epoch(end_round_event.timestamp),
                end_round_event.round
            )
        };
        Box::new(logger)
    }
}

impl Logger for RoundTimeoutEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |round_timeout_event: &RoundTimeoutEvent| {
            log::info!(
                "{}, {}, {}, {}",
                ROUND_TIMEOUT,
                secs_since_unix_epoch(round_timeout_event.timestamp),
                round_timeout_event.round,
                round_timeout_event.timeout.as_millis()
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_event: &ProposeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PROPOSE,
                secs_since_unix_epoch(propose_event.timestamp),
                first_seven_base64_chars(&propose_event.proposal.hash().bytes()),
                propose_event.proposal.round,
                propose_event.proposal.txns.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for NotarizeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |notarize_event: &NotarizeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                NOTARIZE,
                secs_since_unix_epoch(notarize_event.timestamp),
                notarize_event.group,
                notarize_event.nt_share.partial.index,
                first_seven_base64_chars(&notarize_event.nt_share.proposal.bytes()),
                notarize_event.nt_share.round
            )
        };
        Box::new(logger)
    }
}

impl Logger for SignBeaconShareEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |sign_beacon_share_event: &SignBeaconShareEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                SIGN_BEACON_SHARE,
                secs_since_unix_epoch(sign_beacon_share_event.timestamp),
                sign_beacon_share_event.group,
                sign_beacon_share_event.share.partial.index,
                sign_beacon_share_event.share.round
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_proposal_event: &ReceiveProposalEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                RECEIVE_PROPOSAL,
                secs_since_unix_epoch(receive_proposal_event.timestamp),
                first_seven_base64_chars(&receive_proposal_event.origin.to_bytes()),
                first_seven_base64_chars(&receive_proposal_event.proposal.hash().bytes()),
                receive_proposal_event.proposal.round,
                receive_proposal_event.proposal.txns.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for NotaryTimeoutEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |notary_timeout_event: &NotaryTimeoutEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                NOTARY_TIMEOUT,
                secs_since_unix_epoch(notary_timeout_event.timestamp),
                notary_timeout_event.round,
                notary_timeout_event.group,
                notary_timeout_event.timeout.as_millis()
            )
        };
        Box::new(logger)
    }
}

impl Logger for FinalizeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |finalize_block_event: &FinalizeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                FINALIZE_BLOCK,
                secs_since_unix_epoch(finalize_block_event.timestamp),
                first_seven_base64_chars(&finalize_block_event.block.bytes()),
                finalize_block_event.round,
                finalize_block_event.txns
            )
        };
        Box::new(logger)
    }
}

impl Logger for AppendBeaconEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |append_beacon_event: &AppendBeaconEvent| {
            log::info!(
                "{}, {}, {}, {}",
                APPEND_BEACON,
                secs_since_unix_epoch(append_beacon_event.timestamp),
                append_beacon_event.entry.round,
                first_seven_base64_chars(&append_beacon_event.entry.signature_hash().bytes())
            )
        };
        Box::new(logger)
    }
}

/// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7
/// characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

pub(crate) fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

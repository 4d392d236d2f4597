/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to the notary subprotocol.

use std::collections::HashMap;

use crate::{
    logging::first_seven_base64_chars,
    threshold::{self, types::GroupSignatureBytes, ThresholdError},
    types::{
        block::BlockProposal,
        collectors::{Collector, PartialSignatures},
        data_types::{CryptoHash, Round, VerifyingKeyBytes},
        groups::Group,
    },
};

use super::messages::{notarization_message, NtShare};

/// States of a single notarization attempt. See [`Notary`](super::implementation::Notary).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotaryState {
    /// No proposals seen yet.
    Idle,
    /// At least one proposal was seen, but none that can be signed.
    Collecting,
    /// Signed the proposal with this hash. Terminal.
    Signed(CryptoHash),
    /// The round ended before a proposal was signed. Terminal.
    Cancelled,
    /// The deadline elapsed before a proposal was signed. Terminal.
    TimedOut,
}

/// What a block proposal must satisfy to be notarized in a round.
#[derive(Clone, Debug)]
pub struct ProposalCriteria {
    pub round: Round,
    /// The chain head when the round started.
    pub parent: CryptoHash,
    /// The members of the round's block proposer committee.
    pub proposers: Vec<VerifyingKeyBytes>,
}

impl ProposalCriteria {
    /// Check whether `proposal` is structurally valid for notarization.
    pub fn check(&self, proposal: &BlockProposal) -> Result<(), ProposalRejection> {
        if proposal.round != self.round {
            return Err(ProposalRejection::WrongRound);
        }
        if proposal.parent != self.parent {
            return Err(ProposalRejection::UnknownParent);
        }
        if !self.proposers.contains(&proposal.proposer) {
            return Err(ProposalRejection::NotAProposer);
        }
        if !proposal.is_correctly_signed() {
            return Err(ProposalRejection::IncorrectlySigned);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalRejection {
    WrongRound,
    UnknownParent,
    NotAProposer,
    IncorrectlySigned,
}

/// Evidence that the notary committee of `round` has notarized the proposal with hash `proposal`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notarization {
    pub round: Round,
    pub proposal: CryptoHash,
    pub signature: GroupSignatureBytes,
}

/// Verify that `signature` is `group`'s notarization of the proposal with hash `proposal` in `round`.
pub fn verify_notarization(
    group: &Group,
    round: Round,
    proposal: &CryptoHash,
    signature: &GroupSignatureBytes,
) -> Result<(), ThresholdError> {
    threshold::verify(
        &group.public_polynomial().group_public_key(),
        &notarization_message(round, proposal),
        &signature.parse()?,
    )
}

/// Collects [`NtShare`]s for one round from the members of the round's notary committee, and returns
/// a [`Notarization`] for the first proposal to collect a threshold of shares.
///
/// Shares for different proposals are kept apart, and a notarization is returned at most once per
/// round: shares arriving after it (for the same or for another proposal) are no-ops.
pub struct NotarizationCollector {
    round: Round,
    group: Group,
    shares: HashMap<CryptoHash, PartialSignatures>,
    done: bool,
}

impl NotarizationCollector {
    pub fn new(round: Round, group: Group) -> Self {
        Self {
            round,
            group,
            shares: HashMap::new(),
            done: false,
        }
    }

    /// Get the number of distinct valid shares collected so far for `proposal`.
    pub fn num_shares(&self, proposal: &CryptoHash) -> u32 {
        self.shares.get(proposal).map_or(0, |partials| partials.len())
    }

    /// Get the number of distinct proposals that have at least one valid share.
    pub fn num_proposals(&self) -> usize {
        self.shares.len()
    }
}

impl Collector for NotarizationCollector {
    type Share = NtShare;
    type Output = Notarization;

    fn round(&self) -> Round {
        self.round
    }

    fn collect(&mut self, origin: &VerifyingKeyBytes, share: NtShare) -> Option<Notarization> {
        if self.done || share.round != self.round {
            return None;
        }

        let index = share.partial.index;
        if !self.group.is_member_at(origin, index) {
            log::debug!(
                "Dropping notarization share for round {} from {}: not member {} of the committee",
                share.round,
                first_seven_base64_chars(origin),
                index
            );
            return None;
        }

        if self
            .shares
            .get(&share.proposal)
            .is_some_and(|partials| partials.contains(index))
        {
            return None;
        }

        let message = notarization_message(share.round, &share.proposal);
        let partial =
            match threshold::verify_share(self.group.public_polynomial(), &message, &share.partial) {
                Ok(partial) => partial,
                Err(err) => {
                    log::warn!(
                        "Dropping invalid notarization share for round {} from {}: {:?}",
                        share.round,
                        first_seven_base64_chars(origin),
                        err
                    );
                    return None;
                }
            };
        let partials = self.shares.entry(share.proposal).or_default();
        partials.insert(partial);

        let threshold = self.group.threshold();
        if partials.len() < threshold {
            return None;
        }

        let signature = partials.recover(threshold).and_then(|signature| {
            threshold::verify(
                &self.group.public_polynomial().group_public_key(),
                &message,
                &signature,
            )
            .map(|_| signature)
        });

        match signature {
            Ok(signature) => {
                self.done = true;
                Some(Notarization {
                    round: self.round,
                    proposal: share.proposal,
                    signature: GroupSignatureBytes::from(&signature),
                })
            }
            Err(err) => {
                log::warn!(
                    "Failed to recover the notarization for round {}: {:?}",
                    self.round,
                    err
                );
                None
            }
        }
    }
}

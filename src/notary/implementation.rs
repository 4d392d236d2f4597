/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A single notarization attempt: one notary membership, one round.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use crate::{
    cancellation::{Fired, RoundSignal},
    logging::first_seven_base64_chars,
    threshold,
    types::{block::BlockProposal, credentials::Membership, data_types::Round},
};

use super::{
    messages::{notarization_message, NtShare},
    types::{NotaryState, ProposalCriteria},
};

/// Longest time the notary blocks on its input queue before checking its [`RoundSignal`] again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Notarizes at most one block proposal for a round using one membership of the node in the round's
/// notary committee.
///
/// ## Policy
///
/// The notary signs the **first** proposal it receives that satisfies the round's
/// [`ProposalCriteria`], and then stops. It never signs two proposals for the same round: if it did,
/// and both proposals reached the threshold, two conflicting blocks could be finalized.
pub struct Notary {
    membership: Membership,
    criteria: ProposalCriteria,
}

impl Notary {
    pub fn new(membership: Membership, criteria: ProposalCriteria) -> Self {
        Self {
            membership,
            criteria,
        }
    }

    pub fn round(&self) -> Round {
        self.criteria.round
    }

    /// Receive proposals from `inbox` until one can be signed, then sign it, pass the resulting
    /// [`NtShare`] to `on_notarize`, and return [`NotaryState::Signed`].
    ///
    /// Returns without signing anything if:
    /// - `signal`'s cancel token fires or `inbox` is disconnected ([`NotaryState::Cancelled`]), or
    /// - `signal`'s deadline elapses ([`NotaryState::TimedOut`]).
    pub fn notarize<F: FnOnce(NtShare)>(
        self,
        inbox: Receiver<BlockProposal>,
        signal: RoundSignal,
        on_notarize: F,
    ) -> NotaryState {
        let mut state = NotaryState::Idle;
        loop {
            match signal.fired() {
                Some(Fired::Cancelled) => return NotaryState::Cancelled,
                Some(Fired::DeadlineElapsed) => {
                    log::debug!(
                        "Notary for round {} in group {} timed out in state {:?}",
                        self.round(),
                        self.membership.group(),
                        state
                    );
                    return NotaryState::TimedOut;
                }
                None => (),
            }

            let timeout = signal.deadline().remaining().min(POLL_INTERVAL);
            match inbox.recv_timeout(timeout) {
                Ok(proposal) => {
                    state = NotaryState::Collecting;
                    let hash = proposal.hash();
                    if let Err(reason) = self.criteria.check(&proposal) {
                        log::debug!(
                            "Notary for round {} skipping proposal {} from {}: {:?}",
                            self.round(),
                            first_seven_base64_chars(&hash.bytes()),
                            first_seven_base64_chars(&proposal.proposer),
                            reason
                        );
                        continue;
                    }

                    let message = notarization_message(proposal.round, &hash);
                    let share = NtShare {
                        round: proposal.round,
                        proposal: hash,
                        partial: threshold::sign_share(self.membership.share(), &message),
                    };
                    on_notarize(share);
                    return NotaryState::Signed(hash);
                }
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => return NotaryState::Cancelled,
            }
        }
    }
}

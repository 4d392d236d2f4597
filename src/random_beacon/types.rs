/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to the random beacon.

use crate::{
    logging::first_seven_base64_chars,
    threshold::{self, types::GroupSignatureBytes},
    types::{
        collectors::{Collector, PartialSignatures},
        data_types::{Round, VerifyingKeyBytes},
        groups::Group,
    },
};

use super::{history::BeaconEntry, messages::RandBeaconSigShare};

/// Collects [`RandBeaconSigShare`]s for one round from the members of the previous round's random
/// beacon committee, and combines a threshold of them into the round's [`BeaconEntry`].
pub struct RandBeaconSigCollector {
    round: Round,
    group: Group,
    message: Vec<u8>,
    partials: PartialSignatures,
    done: bool,
}

impl RandBeaconSigCollector {
    /// Create a collector for the beacon entry of `round`, signed by `group` over `message`.
    pub fn new(round: Round, group: Group, message: Vec<u8>) -> Self {
        Self {
            round,
            group,
            message,
            partials: PartialSignatures::new(),
            done: false,
        }
    }
}

impl Collector for RandBeaconSigCollector {
    type Share = RandBeaconSigShare;
    type Output = BeaconEntry;

    fn round(&self) -> Round {
        self.round
    }

    fn collect(&mut self, origin: &VerifyingKeyBytes, share: RandBeaconSigShare) -> Option<BeaconEntry> {
        if self.done || share.round != self.round {
            return None;
        }

        let index = share.partial.index;
        if !self.group.is_member_at(origin, index) {
            log::debug!(
                "Dropping beacon share for round {} from {}: not member {} of the committee",
                share.round,
                first_seven_base64_chars(origin),
                index
            );
            return None;
        }

        if self.partials.contains(index) {
            return None;
        }

        let partial = match threshold::verify_share(
            self.group.public_polynomial(),
            &self.message,
            &share.partial,
        ) {
            Ok(partial) => partial,
            Err(err) => {
                log::warn!(
                    "Dropping invalid beacon share for round {} from {}: {:?}",
                    share.round,
                    first_seven_base64_chars(origin),
                    err
                );
                return None;
            }
        };
        self.partials.insert(partial);

        if self.partials.len() < self.group.threshold() {
            return None;
        }

        let signature = self
            .partials
            .recover(self.group.threshold())
            .and_then(|signature| {
                threshold::verify(
                    &self.group.public_polynomial().group_public_key(),
                    &self.message,
                    &signature,
                )
                .map(|_| signature)
            });

        match signature {
            Ok(signature) => {
                self.done = true;
                Some(BeaconEntry {
                    round: self.round,
                    signature: GroupSignatureBytes::from(&signature),
                })
            }
            Err(err) => {
                log::warn!(
                    "Failed to recover the beacon signature for round {}: {:?}",
                    self.round,
                    err
                );
                None
            }
        }
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The random beacon: the sole writer of the [`RandomBeaconHistory`].

use crate::{
    logging::first_seven_base64_chars,
    threshold::{self, types::SecretKeyShare},
    types::{
        collectors::Collector,
        data_types::{Round, VerifyingKeyBytes},
        groups::GroupRegistry,
    },
};

use super::{
    committees::Committees,
    history::{BeaconEntry, HistoryError, RandomBeaconHistory},
    messages::RandBeaconSigShare,
    types::RandBeaconSigCollector,
};

/// Receives [`RandBeaconSigShare`]s for the next round and appends the next [`BeaconEntry`] to the
/// history once a threshold of them has been collected.
pub struct RandomBeacon {
    history: RandomBeaconHistory,
    groups: GroupRegistry,
    collector: Option<RandBeaconSigCollector>,
}

impl RandomBeacon {
    pub fn new(history: RandomBeaconHistory, groups: GroupRegistry) -> Self {
        Self {
            history,
            groups,
            collector: None,
        }
    }

    /// Get a read handle to the beacon's history.
    pub fn history(&self) -> &RandomBeaconHistory {
        &self.history
    }

    /// Compute the committees of `round`.
    pub fn committees(&self, round: Round) -> Result<Committees, HistoryError> {
        self.history.committees(round, &self.groups)
    }

    /// Process a beacon share sent by `origin`. If this share completes a threshold of valid shares
    /// for the next round, appends the next round's entry to the history and returns it.
    ///
    /// Shares for any round other than the next one (stale, or not reachable yet because the entry
    /// they would be chained to does not exist) are dropped.
    pub fn on_receive_share(
        &mut self,
        origin: &VerifyingKeyBytes,
        share: RandBeaconSigShare,
    ) -> Option<BeaconEntry> {
        let next_round = Round::new(self.history.len());
        if share.round != next_round {
            log::debug!(
                "Dropping beacon share for round {} from {}: expecting shares for round {}",
                share.round,
                first_seven_base64_chars(origin),
                next_round
            );
            return None;
        }

        if self
            .collector
            .as_ref()
            .map_or(true, |collector| collector.round() != next_round)
        {
            self.collector = Some(self.new_collector(next_round)?);
        }

        // Safety: the collector was set to a collector for `next_round` just above.
        let entry = self.collector.as_mut().unwrap().collect(origin, share)?;
        match self.history.append(entry.clone()) {
            Ok(()) => {
                self.collector = None;
                Some(entry)
            }
            Err(err) => {
                log::warn!("Failed to append beacon entry for round {}: {:?}", entry.round, err);
                None
            }
        }
    }

    fn new_collector(&self, round: Round) -> Option<RandBeaconSigCollector> {
        // The entry for `round` is signed by the random beacon committee of the round before it.
        let prev_round = round.prev()?;
        let result = self
            .history
            .committees(prev_round, &self.groups)
            .and_then(|committees| {
                self.history
                    .signing_message(round)
                    .map(|message| (committees.random_beacon, message))
            });
        match result {
            Ok((group_id, message)) => {
                let group = self.groups.get(group_id)?.clone();
                Some(RandBeaconSigCollector::new(round, group, message))
            }
            Err(err) => {
                log::warn!("Cannot collect beacon shares for round {}: {:?}", round, err);
                None
            }
        }
    }
}

/// Sign this member's share of the beacon signature for `next_round`.
///
/// Fails if the history does not yet contain the entry for the round before `next_round`.
pub fn sign_beacon_share(
    history: &RandomBeaconHistory,
    share: &SecretKeyShare,
    next_round: Round,
) -> Result<RandBeaconSigShare, HistoryError> {
    let message = history.signing_message(next_round)?;
    Ok(RandBeaconSigShare {
        round: next_round,
        partial: threshold::sign_share(share, &message),
    })
}

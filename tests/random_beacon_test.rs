use beacon_consensus::{
    random_beacon::{
        history::{HistoryError, RandomBeaconHistory},
        implementation::{sign_beacon_share, RandomBeacon},
    },
    threshold,
    types::{
        crypto_primitives::hash,
        data_types::{GroupID, Round},
        groups::GroupRegistry,
    },
};
use log::LevelFilter;

mod common;

use crate::common::{
    cluster::{deal_cluster, deal_group, signing_keys},
    logging::setup_logger,
};

#[test]
fn genesis_entry_is_hash_of_seed_test() {
    let history = RandomBeaconHistory::new(b"dex");
    assert_eq!(history.len(), 1);

    let genesis = history.get(Round::new(0)).unwrap();
    assert_eq!(genesis.round, Round::new(0));
    assert_eq!(genesis.signature.bytes(), &hash(&[b"dex".as_slice()]).bytes().to_vec());

    // Different seeds give different genesis entries.
    let other = RandomBeaconHistory::new(b"other");
    assert_ne!(other.get(Round::new(0)), history.get(Round::new(0)));
}

#[test]
fn committee_selection_is_pure_test() {
    let keys = signing_keys(6);
    let (groups, _) = deal_cluster(&keys, 5, 3, 2);
    let history = RandomBeaconHistory::new(b"dex");

    let committees = history.committees(Round::new(0), &groups).unwrap();
    assert_eq!(history.committees(Round::new(0), &groups).unwrap(), committees);
    assert_eq!(history.clone().committees(Round::new(0), &groups).unwrap(), committees);

    // An independent history with the same seed selects the same committees.
    let replica = RandomBeaconHistory::new(b"dex");
    assert_eq!(replica.committees(Round::new(0), &groups).unwrap(), committees);

    // Every selected group is registered.
    for group in [committees.random_beacon, committees.block_proposer, committees.notary] {
        assert!(groups.get(group).is_some());
    }

    // Rounds without an entry have no committees yet.
    assert_eq!(
        history.committees(Round::new(1), &groups),
        Err(HistoryError::MissingEntry {
            round: Round::new(1)
        })
    );
}

#[test]
fn beacon_signing_message_is_chained_test() {
    let history = RandomBeaconHistory::new(b"dex");

    // The message for round 1 embeds the hash of the entry for round 0.
    let message = history.signing_message(Round::new(1)).unwrap();
    let prev_hash = history.get(Round::new(0)).unwrap().signature_hash();
    assert!(message.ends_with(&prev_hash.bytes()));

    // The message for round 2 cannot be computed before the entry for round 1 exists.
    assert_eq!(
        history.signing_message(Round::new(2)),
        Err(HistoryError::MissingEntry {
            round: Round::new(1)
        })
    );
}

#[test]
fn threshold_of_beacon_shares_appends_next_entry_test() {
    setup_logger(LevelFilter::Debug);

    // 1. Initialize a single group of 4 members with threshold 3, which is every committee.
    let keys = signing_keys(4);
    let (group, shares) = deal_group(&keys, 3);
    let groups = GroupRegistry::new(vec![group.clone()]);
    let history = RandomBeaconHistory::new(b"dex");
    let mut beacon = RandomBeacon::new(history.clone(), groups);
    assert_eq!(beacon.committees(Round::new(0)).unwrap().random_beacon, GroupID::new(0));

    // 2. A share for a round that cannot be signed yet is refused.
    assert!(sign_beacon_share(&history, &shares[0], Round::new(2)).is_err());

    // 3. Two shares are not enough.
    for i in 0..2 {
        let share = sign_beacon_share(&history, &shares[i], Round::new(1)).unwrap();
        assert!(beacon
            .on_receive_share(&keys[i].verifying_key().to_bytes(), share)
            .is_none());
    }
    assert_eq!(history.len(), 1);

    // 4. A share from a node that does not hold the claimed index is dropped.
    let share = sign_beacon_share(&history, &shares[2], Round::new(1)).unwrap();
    assert!(beacon
        .on_receive_share(&keys[3].verifying_key().to_bytes(), share.clone())
        .is_none());

    // 5. The third share appends the entry for round 1, visible through every history handle.
    let entry = beacon
        .on_receive_share(&keys[2].verifying_key().to_bytes(), share)
        .unwrap();
    assert_eq!(entry.round, Round::new(1));
    assert_eq!(history.len(), 2);
    assert_eq!(history.latest(), entry);

    // 6. The entry is the group's signature over the chained message.
    let message = beacon_message_for(&history, Round::new(1));
    assert!(threshold::verify(
        &group.public_polynomial().group_public_key(),
        &message,
        &entry.signature.parse().unwrap()
    )
    .is_ok());

    // 7. The fourth share is stale, and round 1 now has committees.
    let share = sign_beacon_share(&history, &shares[3], Round::new(1)).unwrap();
    assert!(beacon
        .on_receive_share(&keys[3].verifying_key().to_bytes(), share)
        .is_none());
    assert_eq!(history.len(), 2);
    assert!(beacon.committees(Round::new(1)).is_ok());
}

fn beacon_message_for(history: &RandomBeaconHistory, round: Round) -> Vec<u8> {
    let prev = history.get(round.prev().unwrap()).unwrap();
    beacon_consensus::random_beacon::messages::beacon_message(round, &prev.signature_hash())
}

#[test]
fn beacon_output_does_not_depend_on_which_members_signed_test() {
    // Two nodes collecting shares from different subsets of the committee append the same entry.
    let keys = signing_keys(5);
    let (group, shares) = deal_group(&keys, 3);
    let groups = GroupRegistry::new(vec![group]);

    let mut entries = Vec::new();
    for subset in [[0, 1, 2], [2, 3, 4]] {
        let history = RandomBeaconHistory::new(b"dex");
        let mut beacon = RandomBeacon::new(history.clone(), groups.clone());
        let mut entry = None;
        for i in subset {
            let share = sign_beacon_share(&history, &shares[i], Round::new(1)).unwrap();
            entry = beacon.on_receive_share(&keys[i].verifying_key().to_bytes(), share);
        }
        entries.push(entry.unwrap());
    }

    assert_eq!(entries[0], entries[1]);
}

use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use beacon_consensus::{
    cancellation::{CancelToken, Deadline, RoundSignal},
    notary::{
        implementation::Notary,
        messages::notarization_message,
        types::{NotaryState, ProposalCriteria},
    },
    threshold::{self, types::SecretKeyShare},
    types::{
        block::BlockProposal,
        credentials::Membership,
        crypto_primitives::{Keypair, SigningKey},
        data_types::{CryptoHash, GroupID, Round},
        groups::Group,
    },
};
use log::LevelFilter;

mod common;

use crate::common::{
    cluster::{deal_group, signing_keys},
    ledger::increment,
    logging::setup_logger,
};

struct Fixture {
    proposer: Keypair,
    keys: Vec<SigningKey>,
    group: Group,
    shares: Vec<SecretKeyShare>,
    criteria: ProposalCriteria,
}

fn fixture() -> Fixture {
    let keys = signing_keys(4);
    let (group, shares) = deal_group(&keys, 3);
    let proposer = Keypair::new(keys[0].clone());
    let criteria = ProposalCriteria {
        round: Round::new(3),
        parent: CryptoHash::new([9; 32]),
        proposers: vec![proposer.public().to_bytes()],
    };
    Fixture {
        proposer,
        keys,
        group,
        shares,
        criteria,
    }
}

fn proposal(fixture: &Fixture, round: Round, nonce: u32) -> BlockProposal {
    BlockProposal::new(
        &fixture.proposer,
        round,
        fixture.criteria.parent,
        CryptoHash::new([0; 32]),
        vec![increment(1, nonce)],
    )
}

#[test]
fn notary_signs_only_first_valid_proposal_test() {
    setup_logger(LevelFilter::Debug);

    // 1. Initialize test components.
    let fixture = fixture();
    let round = fixture.criteria.round;
    let notary = Notary::new(
        Membership::new(GroupID::new(0), fixture.shares[1].clone()),
        fixture.criteria.clone(),
    );

    // 2. Queue an invalid proposal (wrong round), a proposal by a non-proposer, then two valid
    //    proposals.
    let (to_notary, inbox) = mpsc::sync_channel(20);
    let wrong_round = proposal(&fixture, round + 1, 0);
    let not_a_proposer = BlockProposal::new(
        &Keypair::new(fixture.keys[3].clone()),
        round,
        fixture.criteria.parent,
        CryptoHash::new([0; 32]),
        vec![],
    );
    let first = proposal(&fixture, round, 1);
    let second = proposal(&fixture, round, 2);
    to_notary.send(wrong_round).unwrap();
    to_notary.send(not_a_proposer).unwrap();
    to_notary.send(first.clone()).unwrap();
    to_notary.send(second).unwrap();

    // 3. Run the notary.
    let signal = RoundSignal::new(Deadline::after(Duration::from_secs(5)), CancelToken::new());
    let mut emitted = Vec::new();
    let state = notary.notarize(inbox, signal, |nt_share| emitted.push(nt_share));

    // 4. Exactly one share was emitted, on the first valid proposal, and it verifies.
    assert_eq!(state, NotaryState::Signed(first.hash()));
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].proposal, first.hash());
    assert_eq!(emitted[0].round, round);
    assert_eq!(emitted[0].partial.index, 1);
    let message = notarization_message(round, &first.hash());
    assert!(
        threshold::verify_share(fixture.group.public_polynomial(), &message, &emitted[0].partial)
            .is_ok()
    );
}

#[test]
fn notary_times_out_without_proposals_test() {
    setup_logger(LevelFilter::Debug);

    let fixture = fixture();
    let notary = Notary::new(
        Membership::new(GroupID::new(0), fixture.shares[0].clone()),
        fixture.criteria.clone(),
    );
    let (_to_notary, inbox) = mpsc::sync_channel(20);

    let block_time = Duration::from_millis(200);
    let start = Instant::now();
    let signal = RoundSignal::new(Deadline::after(block_time), CancelToken::new());
    let mut emitted = Vec::new();
    let state = notary.notarize(inbox, signal, |nt_share| emitted.push(nt_share));

    assert_eq!(state, NotaryState::TimedOut);
    assert!(emitted.is_empty());
    assert!(start.elapsed() >= block_time);
}

#[test]
fn notary_stops_when_cancelled_test() {
    setup_logger(LevelFilter::Debug);

    let fixture = fixture();
    let notary = Notary::new(
        Membership::new(GroupID::new(0), fixture.shares[0].clone()),
        fixture.criteria.clone(),
    );
    let (_to_notary, inbox) = mpsc::sync_channel(20);

    // Cancel the round from another thread well before the deadline.
    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        })
    };

    let start = Instant::now();
    let signal = RoundSignal::new(Deadline::after(Duration::from_secs(10)), token);
    let mut emitted = Vec::new();
    let state = notary.notarize(inbox, signal, |nt_share| emitted.push(nt_share));
    canceller.join().unwrap();

    assert_eq!(state, NotaryState::Cancelled);
    assert!(emitted.is_empty());
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn notary_cancelled_before_start_emits_nothing_test() {
    let fixture = fixture();
    let round = fixture.criteria.round;
    let notary = Notary::new(
        Membership::new(GroupID::new(0), fixture.shares[0].clone()),
        fixture.criteria.clone(),
    );

    // A valid proposal is waiting, but the round already ended.
    let (to_notary, inbox) = mpsc::sync_channel(20);
    to_notary.send(proposal(&fixture, round, 0)).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let signal = RoundSignal::new(Deadline::after(Duration::from_secs(5)), token);
    let mut emitted = Vec::new();
    let state = notary.notarize(inbox, signal, |nt_share| emitted.push(nt_share));

    assert_eq!(state, NotaryState::Cancelled);
    assert!(emitted.is_empty());
}

#[test]
fn notary_stops_when_input_queue_closes_test() {
    let fixture = fixture();
    let notary = Notary::new(
        Membership::new(GroupID::new(0), fixture.shares[0].clone()),
        fixture.criteria.clone(),
    );
    let (to_notary, inbox) = mpsc::sync_channel::<BlockProposal>(20);
    drop(to_notary);

    let signal = RoundSignal::new(Deadline::after(Duration::from_secs(5)), CancelToken::new());
    let state = notary.notarize(inbox, signal, |_| panic!("nothing to sign"));

    assert_eq!(state, NotaryState::Cancelled);
}

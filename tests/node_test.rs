//! Tests of a single node driven directly through its operations, without the replica's threads.
//!
//! Every node here is the only member of the only group, so it forms every committee on its own and
//! moves through rounds without any peer.

mod common;

use std::{
    sync::mpsc::{self, Receiver},
    time::{Duration, Instant},
};

use beacon_consensus::{
    chain::{implementation::Chain, pluggables::State},
    events::Event,
    networking::messages::Message,
    node::{Node, NodeConfiguration, NOTARY_QUEUE_CAPACITY},
    random_beacon::{history::RandomBeaconHistory, implementation::RandomBeacon},
    types::{
        block::BlockProposal,
        crypto_primitives::Keypair,
        data_types::{CryptoHash, Round, Transaction},
    },
};
use common::{
    cluster::{deal_cluster, signing_keys},
    ledger::{increment, Counter, HeadRecorder, MemPool},
    logging::setup_logger,
    network::{mock_network, NetworkStub},
};
use log::LevelFilter;

type TestNode = Node<NetworkStub, Counter, MemPool, HeadRecorder>;

const CONFIG: NodeConfiguration = NodeConfiguration {
    block_time: Duration::from_millis(500),
    round_timeout: Duration::from_secs(30),
    txn_batch_limit: 10,
};

/// Create a lone node, returning it together with the receiving end of its event channel, a copy of
/// its keypair, and the updater that records its chain heads.
fn lone_node(config: NodeConfiguration) -> (TestNode, Receiver<Event>, Keypair, HeadRecorder) {
    let keys = signing_keys(1);
    let (groups, mut credentials) = deal_cluster(&keys, 1, 1, 1);
    let credentials = credentials.remove(0);
    let memberships = credentials.memberships().unwrap();
    let network = mock_network(keys.iter().map(|key| key.verifying_key()))
        .pop()
        .unwrap();

    let recorder = HeadRecorder::default();
    let chain = Chain::new(Counter::default(), MemPool::default(), recorder.clone());
    let beacon = RandomBeacon::new(RandomBeaconHistory::new(b"dex"), groups.clone());
    let (event_publisher, events) = mpsc::channel();

    let node = Node::new(
        config,
        Keypair::new(credentials.signing_key()),
        memberships,
        groups,
        chain,
        beacon,
        network,
        Some(event_publisher),
    );
    (node, events, Keypair::new(credentials.signing_key()), recorder)
}

/// Step `node` until `done` holds, panicking if it takes longer than `limit`.
fn step_until<F: Fn(&TestNode) -> bool>(node: &mut TestNode, limit: Duration, done: F) {
    let started = Instant::now();
    while !done(node) {
        assert!(started.elapsed() < limit, "node made no progress in {:?}", limit);
        node.step(Duration::from_millis(50));
    }
}

/// Build a proposal by `keypair` for `round` on top of `parent`, whose state root is that of a fresh
/// ledger after `txns`.
fn signed_proposal(
    keypair: &Keypair,
    round: Round,
    parent: CryptoHash,
    txns: Vec<Transaction>,
) -> BlockProposal {
    let mut state = Counter::default();
    state.apply(&txns);
    BlockProposal::new(keypair, round, parent, state.root(), txns)
}

#[test]
fn end_round_is_idempotent_test() {
    setup_logger(LevelFilter::Debug);
    let (mut node, events, _, _) = lone_node(CONFIG);

    node.end_round(Round::new(0));
    node.end_round(Round::new(0));

    // The beacon share is signed on a worker thread: wait for it, then count what was published.
    let mut end_rounds = 0;
    let mut beacon_shares = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while beacon_shares == 0 && Instant::now() < deadline {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(Event::EndRound(event)) => {
                assert_eq!(event.round, Round::new(0));
                end_rounds += 1
            }
            Ok(Event::SignBeaconShare(event)) => {
                assert_eq!(event.share.round, Round::new(1));
                beacon_shares += 1
            }
            _ => (),
        }
    }
    for event in events.try_iter() {
        match event {
            Event::EndRound(_) => end_rounds += 1,
            Event::SignBeaconShare(_) => beacon_shares += 1,
            _ => (),
        }
    }

    assert_eq!(end_rounds, 1);
    assert_eq!(beacon_shares, 1);
}

#[test]
fn rounds_only_move_forward_test() {
    setup_logger(LevelFilter::Debug);
    let (mut node, events, _, _) = lone_node(CONFIG);

    // Round 0 is the current round, so starting it again does nothing.
    node.start_round(Round::new(0));
    assert_eq!(node.round(), Round::new(0));

    // Round 3 has no beacon entry yet, so it cannot be started.
    node.start_round(Round::new(3));
    assert_eq!(node.round(), Round::new(0));

    assert!(events
        .try_iter()
        .all(|event| !matches!(event, Event::StartRound(_))));

    // Ending a round other than the current one does nothing either.
    node.end_round(Round::new(2));
    assert!(events
        .try_iter()
        .all(|event| !matches!(event, Event::EndRound(_))));
}

#[test]
fn lone_node_finalizes_transactions_test() {
    setup_logger(LevelFilter::Debug);
    let (mut node, _events, _, recorder) = lone_node(CONFIG);

    node.recv_transaction(increment(5, 0));
    node.recv_transaction(increment(10, 1));
    node.end_round(Round::new(0));

    step_until(&mut node, Duration::from_secs(20), |node| {
        node.chain().head().round >= Round::new(1) && node.round() >= Round::new(2)
    });

    let blocks = recorder.blocks();
    assert_eq!(blocks[0].round, Round::new(1));
    assert_eq!(blocks[0].txns.len(), 2);
    assert_eq!(recorder.total(), 15);
    assert!(node.beacon().history().len() >= 3);
}

#[test]
fn proposal_for_future_round_is_replayed_test() {
    setup_logger(LevelFilter::Debug);
    let (mut node, events, keypair, recorder) = lone_node(CONFIG);

    // 1. Build a valid proposal for round 1 while the node is still in round 0.
    let proposal = signed_proposal(
        &keypair,
        Round::new(1),
        node.chain().head().hash,
        vec![increment(7, 0)],
    );
    let proposal_hash = proposal.hash();

    // 2. Deliver it early: the node must hold on to it instead of handing it to anyone.
    node.recv(keypair.public(), Message::BlockProposal(proposal));
    assert!(events
        .try_iter()
        .all(|event| !matches!(event, Event::ReceiveProposal(_))));

    // 3. Start round 1. The early proposal is replayed before the node's own proposal is sealed, so
    // the notary signs it first.
    node.end_round(Round::new(0));
    step_until(&mut node, Duration::from_secs(20), |node| {
        node.chain().head().round >= Round::new(1)
    });

    assert_eq!(node.chain().head().hash, proposal_hash);
    assert_eq!(recorder.total(), 7);
    assert!(events.try_iter().any(|event| matches!(
        event,
        Event::ReceiveProposal(event) if event.proposal.hash() == proposal_hash
    )));
}

#[test]
fn proposals_outside_the_committee_or_off_the_head_are_dropped_test() {
    setup_logger(LevelFilter::Debug);
    let (mut node, events, keypair, _) = lone_node(CONFIG);

    node.end_round(Round::new(0));
    step_until(&mut node, Duration::from_secs(20), |node| node.round() >= Round::new(1));
    let round = node.round();
    let head = node.chain().head().hash;

    // 1. Correctly signed proposals by keys that are not in the block proposer committee.
    let mut dropped = Vec::new();
    for (nonce, outsider) in signing_keys(10).into_iter().enumerate() {
        let outsider = Keypair::new(outsider);
        let parent = if nonce % 2 == 0 { head } else { CryptoHash::new([7; 32]) };
        let proposal = signed_proposal(&outsider, round, parent, vec![increment(1, nonce as u32)]);
        dropped.push(proposal.hash());
        node.recv_block_proposal(outsider.public(), proposal);
    }

    // 2. A proposal by the committee that does not extend the head.
    let proposal = signed_proposal(&keypair, round, CryptoHash::new([7; 32]), vec![increment(1, 99)]);
    dropped.push(proposal.hash());
    node.recv_block_proposal(keypair.public(), proposal);

    // 3. None of them is stored or reported.
    for hash in &dropped {
        assert!(node.chain().proposal(round, hash).is_none());
    }
    assert!(events.try_iter().all(|event| !matches!(
        event,
        Event::ReceiveProposal(event) if dropped.contains(&event.proposal.hash())
    )));

    // 4. A proposal by the committee on top of the head is stored.
    let proposal = signed_proposal(&keypair, round, head, vec![increment(1, 100)]);
    let hash = proposal.hash();
    node.recv_block_proposal(keypair.public(), proposal);
    assert!(node.chain().proposal(round, &hash).is_some());
}

#[test]
fn proposals_beyond_notary_queue_capacity_are_stored_test() {
    setup_logger(LevelFilter::Debug);
    let (mut node, events, keypair, recorder) = lone_node(CONFIG);

    node.end_round(Round::new(0));
    step_until(&mut node, Duration::from_secs(20), |node| node.round() >= Round::new(1));
    let round = node.round();
    let head = node.chain().head().hash;

    // 1. Deliver more proposals than the notary's queue holds, without letting the node process its
    // inbox in between. Every call returns, whether the queue is full or the notary already left.
    let proposals: Vec<BlockProposal> = (0..NOTARY_QUEUE_CAPACITY as u32 + 5)
        .map(|nonce| signed_proposal(&keypair, round, head, vec![increment(nonce + 1, nonce)]))
        .collect();
    let hashes: Vec<CryptoHash> = proposals.iter().map(BlockProposal::hash).collect();
    for proposal in proposals {
        node.recv_block_proposal(keypair.public(), proposal);
    }

    // 2. All of them are stored, and all of them were reported.
    for hash in &hashes {
        assert!(node.chain().proposal(round, hash).is_some());
    }
    let received = events
        .try_iter()
        .filter(|event| matches!(
            event,
            Event::ReceiveProposal(event) if hashes.contains(&event.proposal.hash())
        ))
        .count();
    assert_eq!(received, hashes.len());

    // 3. The notary signed the first one it was given, which is finalized.
    step_until(&mut node, Duration::from_secs(20), |node| {
        node.chain().head().round >= round
    });
    assert_eq!(node.chain().head().hash, hashes[0]);
    assert_eq!(recorder.total(), 1);
}

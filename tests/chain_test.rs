use beacon_consensus::{
    chain::{
        implementation::{Chain, ChainError},
        pluggables::State,
    },
    notary::{
        messages::{notarization_message, NtShare},
        types::NotarizationCollector,
    },
    threshold::{self, types::SecretKeyShare},
    types::{
        block::{Block, BlockProposal},
        collectors::Collector,
        crypto_primitives::{Keypair, SigningKey},
        data_types::{CryptoHash, Round},
        groups::Group,
    },
};
use log::LevelFilter;

mod common;

use crate::common::{
    cluster::{deal_group, signing_keys},
    ledger::{increment, Counter, HeadRecorder, MemPool},
    logging::setup_logger,
};

/// Collect a notarization of `proposal` from the first 3 members of `group`.
fn notarize(
    group: &Group,
    keys: &[SigningKey],
    shares: &[SecretKeyShare],
    proposal: BlockProposal,
) -> Block {
    let mut collector = NotarizationCollector::new(proposal.round, group.clone());
    let hash = proposal.hash();
    let message = notarization_message(proposal.round, &hash);
    let notarization = (0..3)
        .find_map(|i| {
            collector.collect(
                &keys[i].verifying_key().to_bytes(),
                NtShare {
                    round: proposal.round,
                    proposal: hash,
                    partial: threshold::sign_share(&shares[i], &message),
                },
            )
        })
        .unwrap();
    Block::from_notarized(proposal, notarization.signature)
}

#[test]
fn finalize_applies_block_and_advances_head_test() {
    setup_logger(LevelFilter::Debug);

    // 1. Initialize test components.
    let keys = signing_keys(4);
    let (group, shares) = deal_group(&keys, 3);
    let proposer = Keypair::new(keys[0].clone());
    let updater = HeadRecorder::default();
    let mut chain = Chain::new(Counter::default(), MemPool::default(), updater.clone());
    let genesis = chain.head().clone();
    assert_eq!(genesis.round, Round::new(0));
    assert_eq!(genesis.state_root, Counter::default().root());

    // 2. Propose a block containing the pending transactions.
    chain.add_txn(increment(5, 0));
    chain.add_txn(increment(7, 1));
    let proposal = chain.draft_proposal(Round::new(1), 10).seal(&proposer);
    assert_eq!(proposal.parent, genesis.hash);
    assert_eq!(proposal.txns.len(), 2);
    assert!(proposal.is_correctly_signed());

    // 3. The state root of the proposal is the root after applying its transactions.
    let mut expected = Counter::default();
    expected.apply(&proposal.txns);
    assert_eq!(proposal.state_root, expected.root());

    // 4. Finalize it.
    let block = notarize(&group, &keys, &shares, proposal);
    chain.finalize(block.clone(), &group).unwrap();
    assert_eq!(chain.head(), &block);
    assert_eq!(chain.camera().head(), block);
    assert_eq!(updater.blocks(), vec![block.clone()]);
    assert_eq!(updater.total(), 12);

    // 5. Finalized transactions left the pool.
    let next = chain.draft_proposal(Round::new(2), 10).seal(&proposer);
    assert!(next.txns.is_empty());
    assert_eq!(next.parent, block.hash);

    // 6. The round cannot be finalized twice.
    assert_eq!(
        chain.finalize(block, &group),
        Err(ChainError::AlreadyFinalized {
            round: Round::new(1)
        })
    );
}

#[test]
fn batch_limit_bounds_proposal_size_test() {
    let keys = signing_keys(1);
    let proposer = Keypair::new(keys[0].clone());
    let mut chain = Chain::new(Counter::default(), MemPool::default(), HeadRecorder::default());
    for nonce in 0..5 {
        chain.add_txn(increment(1, nonce));
    }

    let proposal = chain.draft_proposal(Round::new(1), 3).seal(&proposer);
    assert_eq!(proposal.txns.len(), 3);
}

#[test]
fn notarization_before_proposal_is_kept_test() {
    // 1. Initialize test components.
    let keys = signing_keys(4);
    let (group, shares) = deal_group(&keys, 3);
    let proposer = Keypair::new(keys[0].clone());
    let mut chain = Chain::new(Counter::default(), MemPool::default(), HeadRecorder::default());

    let proposal = chain.draft_proposal(Round::new(1), 10).seal(&proposer);
    let block = notarize(&group, &keys, &shares, proposal.clone());

    // 2. Collect the notarization first, then receive the proposal.
    let hash = proposal.hash();
    let notarization = {
        let mut collector = NotarizationCollector::new(Round::new(1), group.clone());
        let message = notarization_message(Round::new(1), &hash);
        (0..3)
            .find_map(|i| {
                collector.collect(
                    &keys[i].verifying_key().to_bytes(),
                    NtShare {
                        round: Round::new(1),
                        proposal: hash,
                        partial: threshold::sign_share(&shares[i], &message),
                    },
                )
            })
            .unwrap()
    };
    assert!(chain.add_notarization(notarization).is_none());
    let pending = chain.add_proposal(proposal).unwrap();
    assert_eq!(pending.hash, block.hash);
    assert!(chain.finalize(pending, &group).is_ok());
}

#[test]
fn invalid_blocks_are_rejected_test() {
    setup_logger(LevelFilter::Debug);

    // 1. Initialize test components.
    let keys = signing_keys(4);
    let (group, shares) = deal_group(&keys, 3);
    let (other_group, other_shares) = deal_group(&keys, 3);
    let proposer = Keypair::new(keys[0].clone());
    let mut chain = Chain::new(Counter::default(), MemPool::default(), HeadRecorder::default());
    let genesis = chain.head().clone();

    // 2. A block that does not extend the head.
    let orphan = BlockProposal::new(
        &proposer,
        Round::new(1),
        CryptoHash::new([3; 32]),
        genesis.state_root,
        vec![],
    );
    let orphan = notarize(&group, &keys, &shares, orphan);
    assert!(matches!(
        chain.finalize(orphan, &group),
        Err(ChainError::UnknownParent { .. })
    ));

    // 3. A block notarized by another committee.
    let proposal = chain.draft_proposal(Round::new(1), 10).seal(&proposer);
    let wrongly_notarized = notarize(&other_group, &keys, &other_shares, proposal.clone());
    assert!(matches!(
        chain.finalize(wrongly_notarized, &group),
        Err(ChainError::BadNotarization(_))
    ));

    // 4. A block whose state root does not match its transactions.
    let lying = BlockProposal::new(
        &proposer,
        Round::new(1),
        genesis.hash,
        genesis.state_root,
        vec![increment(3, 0)],
    );
    let lying = notarize(&group, &keys, &shares, lying);
    assert!(matches!(
        chain.finalize(lying, &group),
        Err(ChainError::StateRootMismatch { .. })
    ));

    // 5. A block whose hash was tampered with.
    let mut tampered = notarize(&group, &keys, &shares, proposal.clone());
    tampered.txns.push(increment(1, 1));
    assert_eq!(chain.finalize(tampered, &group), Err(ChainError::IncorrectHash));

    // 6. None of the above moved the head.
    assert_eq!(chain.head(), &genesis);

    // 7. Skipping round 1, a block for round 2 extending genesis is accepted, after which round 1 is
    //    stale.
    let round_2 = BlockProposal::new(&proposer, Round::new(2), genesis.hash, genesis.state_root, vec![]);
    let round_2 = notarize(&group, &keys, &shares, round_2);
    assert!(chain.finalize(round_2, &group).is_ok());
    let round_1 = notarize(&group, &keys, &shares, proposal);
    assert_eq!(
        chain.finalize(round_1, &group),
        Err(ChainError::StaleRound {
            round: Round::new(1),
            head_round: Round::new(2)
        })
    );
}

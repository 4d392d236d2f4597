/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The node: drives rounds forward by routing messages between the random beacon, the notaries, and
//! the chain.
//!
//! ## Rounds
//!
//! Round `r` starts when the beacon entry for `r` is appended to the history, since that entry decides
//! the round's committees. In [`start_round`](Node::start_round), the node:
//! 1. Proposes a block if it is in the round's block proposer committee.
//! 2. Starts a [`Notary`] if it is in the round's notary committee.
//!
//! Round `r` ends, in [`end_round`](Node::end_round), when the first of these happens:
//! 1. A block is finalized for `r`.
//! 2. `round_timeout` passes without a block for `r` (the round is skipped).
//! 3. The beacon entry for `r + 1` is appended anyway, because the rest of the network moved on.
//!
//! Ending a round stops the round's notaries and, if the node is in the round's random beacon
//! committee, signs its share of the beacon entry for `r + 1`. A threshold of these shares appends the
//! entry, which starts the next round.
//!
//! ## Threads
//!
//! All round state is owned by the thread that runs [`Node::execute`]. Work that involves the node's
//! secrets or may block (sealing a proposal, notarizing, signing a beacon share) runs on short-lived
//! worker threads that never touch round state: they report their results by broadcasting them, which
//! also delivers them back into this node's inbox.

use std::{
    collections::BTreeMap,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime},
};

use ed25519_dalek::VerifyingKey;

use crate::{
    cancellation::{CancelToken, Deadline, RoundSignal},
    chain::{
        implementation::{Chain, ChainError},
        pluggables::{State, TxnPool, Updater},
    },
    events::*,
    logging::first_seven_base64_chars,
    networking::{messages::Message, network::Network, sending::SenderHandle},
    notary::{
        implementation::Notary,
        messages::NtShare,
        types::{NotarizationCollector, NotaryState, ProposalCriteria},
    },
    random_beacon::{
        implementation::{sign_beacon_share, RandomBeacon},
        messages::RandBeaconSigShare,
    },
    types::{
        block::{Block, BlockProposal},
        collectors::Collector,
        credentials::Membership,
        crypto_primitives::Keypair,
        data_types::{GroupID, Round, Transaction},
        groups::GroupRegistry,
    },
};

/// Capacity of each notary's input queue. Proposals that arrive while the queue is full are not given
/// to that notary.
pub const NOTARY_QUEUE_CAPACITY: usize = 20;

/// Maximum number of messages for future rounds that the node keeps for replay.
pub const FUTURE_MESSAGE_BUFFER_CAPACITY: usize = 1024;

/// Longest time the node blocks on its inbox before checking for timeouts and shutdown.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// The parameters of a [`Node`].
#[derive(Clone, Copy, Debug)]
pub struct NodeConfiguration {
    /// How long each notary waits for a valid proposal.
    pub block_time: Duration,
    /// How long a round stays open without a block before it is skipped.
    pub round_timeout: Duration,
    /// Maximum number of transactions in a proposal.
    pub txn_batch_limit: u32,
}

pub struct Node<N: Network, S: State, P: TxnPool, U: Updater> {
    config: NodeConfiguration,
    keypair: Arc<Keypair>,
    memberships: Vec<Membership>,
    groups: GroupRegistry,
    chain: Chain<S, P, U>,
    beacon: RandomBeacon,

    round: Round,
    round_started: Instant,
    round_ended: bool,
    cancel_token: CancelToken,
    notary_inputs: Vec<SyncSender<BlockProposal>>,
    collector: Option<NotarizationCollector>,
    future_messages: BTreeMap<Round, Vec<(VerifyingKey, Message)>>,

    sender: SenderHandle<N>,
    to_inbox: Sender<(VerifyingKey, Message)>,
    inbox: Receiver<(VerifyingKey, Message)>,
    event_publisher: Option<Sender<Event>>,
}

impl<N, S, P, U> Node<N, S, P, U>
where
    N: Network + 'static,
    S: State,
    P: TxnPool,
    U: Updater,
{
    /// Create a node at round 0. The node does nothing until it is [started](Self::start), or until
    /// one of its operations is called directly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: NodeConfiguration,
        keypair: Keypair,
        memberships: Vec<Membership>,
        groups: GroupRegistry,
        chain: Chain<S, P, U>,
        beacon: RandomBeacon,
        network: N,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        let (to_inbox, inbox) = mpsc::channel();
        let sender = SenderHandle::new(network, keypair.public(), to_inbox.clone());
        Self {
            config,
            keypair: Arc::new(keypair),
            memberships,
            groups,
            chain,
            beacon,
            round: Round::new(0),
            round_started: Instant::now(),
            round_ended: false,
            cancel_token: CancelToken::new(),
            notary_inputs: Vec::new(),
            collector: None,
            future_messages: BTreeMap::new(),
            sender,
            to_inbox,
            inbox,
            event_publisher,
        }
    }

    /// Get a sender into this node's inbox, through which the node receives every message.
    pub fn inbox(&self) -> Sender<(VerifyingKey, Message)> {
        self.to_inbox.clone()
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn chain(&self) -> &Chain<S, P, U> {
        &self.chain
    }

    pub fn beacon(&self) -> &RandomBeacon {
        &self.beacon
    }

    /// Spawn the node thread, which runs [`execute`](Self::execute) until signalled through
    /// `shutdown_signal`.
    pub(crate) fn start(mut self, shutdown_signal: Receiver<()>) -> JoinHandle<()> {
        thread::spawn(move || self.execute(shutdown_signal))
    }

    /// End round 0, which seeds round 1 from the genesis beacon entry, then process messages from the
    /// inbox until signalled through `shutdown_signal`.
    pub fn execute(&mut self, shutdown_signal: Receiver<()>) {
        self.end_round(Round::new(0));
        loop {
            match shutdown_signal.try_recv() {
                Ok(()) => return,
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    panic!("Node thread disconnected from main thread")
                }
            }

            self.step(TICK_INTERVAL);
        }
    }

    /// Process the next message in the inbox, waiting up to `timeout` for one to arrive, then skip the
    /// current round if it timed out.
    pub fn step(&mut self, timeout: Duration) {
        match self.inbox.recv_timeout(timeout) {
            Ok((origin, msg)) => self.recv(origin, msg),
            Err(RecvTimeoutError::Timeout) => (),
            // Safety: the node holds a sender into its own inbox.
            Err(RecvTimeoutError::Disconnected) => unreachable!(),
        }

        self.tick();
    }

    /// Process a message from `origin`. Messages for rounds the node has not started yet are kept and
    /// replayed when their round starts.
    pub fn recv(&mut self, origin: VerifyingKey, msg: Message) {
        if let Some(round) = msg.round() {
            let lagging = match &msg {
                Message::BlockProposal(_) | Message::NtShare(_) | Message::Block(_) => {
                    round > self.round
                }
                Message::RandBeaconSigShare(_) | Message::Transaction(_) => false,
            };
            if lagging {
                self.buffer(origin, round, msg);
                return;
            }
        }

        match msg {
            Message::BlockProposal(proposal) => self.recv_block_proposal(origin, proposal),
            Message::NtShare(nt_share) => self.recv_nt_share(origin, nt_share),
            Message::RandBeaconSigShare(share) => self.recv_rand_beacon_sig_share(origin, share),
            Message::Block(block) => self.recv_block(origin, block),
            Message::Transaction(txn) => self.recv_transaction(txn),
        }
    }

    /// Start `round`, whose beacon entry must already be in the history. Rounds only move forward:
    /// starting a round that is not above the current one is a no-op.
    pub fn start_round(&mut self, round: Round) {
        if round <= self.round {
            return;
        }
        let committees = match self.beacon.committees(round) {
            Ok(committees) => committees,
            Err(err) => {
                log::warn!("Cannot start round {}: {:?}", round, err);
                return;
            }
        };

        // Leave the previous round for good, even if it was never ended.
        self.cancel_token.cancel();
        self.round = round;
        self.round_started = Instant::now();
        self.round_ended = false;
        self.cancel_token = CancelToken::new();
        self.notary_inputs.clear();
        self.chain.discard_before(round);
        self.collector = self
            .groups
            .get(committees.notary)
            .map(|group| NotarizationCollector::new(round, group.clone()));

        Event::publish(
            &self.event_publisher,
            Event::StartRound(StartRoundEvent {
                timestamp: SystemTime::now(),
                round,
                committees,
            }),
        );

        if self.is_member_of(committees.block_proposer) {
            self.propose(round);
        }

        let proposers = self
            .groups
            .get(committees.block_proposer)
            .map(|group| group.members().to_vec())
            .unwrap_or_default();
        let notary_memberships: Vec<Membership> = self
            .memberships
            .iter()
            .filter(|membership| membership.group() == committees.notary)
            .cloned()
            .collect();
        for membership in notary_memberships {
            let criteria = ProposalCriteria {
                round,
                parent: self.chain.head().hash,
                proposers: proposers.clone(),
            };
            self.start_notary(membership, criteria);
        }

        // Replay messages that arrived before the round started, and forget those from skipped rounds.
        let mut future_messages = self.future_messages.split_off(&round);
        let replay = future_messages.remove(&round).unwrap_or_default();
        self.future_messages = future_messages;
        for (origin, msg) in replay {
            self.recv(origin, msg);
        }
    }

    /// End `round` if it is the current round and is still open. Ending a round that already ended is
    /// a no-op.
    pub fn end_round(&mut self, round: Round) {
        if round != self.round || self.round_ended {
            return;
        }
        self.round_ended = true;
        self.cancel_token.cancel();
        self.notary_inputs.clear();

        Event::publish(
            &self.event_publisher,
            Event::EndRound(EndRoundEvent {
                timestamp: SystemTime::now(),
                round,
            }),
        );

        // The entry for the next round may already be there if this node is lagging.
        let next_round = round + 1;
        if self.beacon.history().len() != next_round.int() {
            return;
        }
        let committees = match self.beacon.committees(round) {
            Ok(committees) => committees,
            Err(err) => {
                log::warn!("Cannot sign beacon share for round {}: {:?}", next_round, err);
                return;
            }
        };
        let beacon_memberships: Vec<Membership> = self
            .memberships
            .iter()
            .filter(|membership| membership.group() == committees.random_beacon)
            .cloned()
            .collect();
        for membership in beacon_memberships {
            self.sign_beacon_share(membership, next_round);
        }
    }

    /// Store a proposal for the current round and hand it to the round's notaries. Proposals by keys
    /// outside the round's block proposer committee, or that do not extend the chain head, are dropped.
    pub fn recv_block_proposal(&mut self, origin: VerifyingKey, proposal: BlockProposal) {
        if proposal.round != self.round {
            log::debug!(
                "Dropping proposal for round {} from {}: current round is {}",
                proposal.round,
                first_seven_base64_chars(&origin.to_bytes()),
                self.round
            );
            return;
        }
        if !proposal.is_correctly_signed() {
            log::debug!(
                "Dropping incorrectly signed proposal for round {} from {}",
                proposal.round,
                first_seven_base64_chars(&origin.to_bytes())
            );
            return;
        }
        let from_proposer = self
            .beacon
            .committees(self.round)
            .ok()
            .and_then(|committees| self.groups.get(committees.block_proposer))
            .is_some_and(|proposers| proposers.contains(&proposal.proposer));
        if !from_proposer {
            log::debug!(
                "Dropping proposal for round {} by {}: not in the block proposer committee",
                proposal.round,
                first_seven_base64_chars(&proposal.proposer)
            );
            return;
        }
        if proposal.parent != self.chain.head().hash {
            log::debug!(
                "Dropping proposal {} for round {}: parent is not the chain head",
                first_seven_base64_chars(&proposal.hash().bytes()),
                proposal.round
            );
            return;
        }

        Event::publish(
            &self.event_publisher,
            Event::ReceiveProposal(ReceiveProposalEvent {
                timestamp: SystemTime::now(),
                origin,
                proposal: proposal.clone(),
            }),
        );

        for notary_input in &self.notary_inputs {
            match notary_input.try_send(proposal.clone()) {
                Ok(()) => (),
                Err(TrySendError::Full(_)) => log::debug!(
                    "Notary queue for round {} is full, dropping proposal {}",
                    self.round,
                    first_seven_base64_chars(&proposal.hash().bytes())
                ),
                Err(TrySendError::Disconnected(_)) => (),
            }
        }

        if let Some(block) = self.chain.add_proposal(proposal) {
            self.finalize(block);
        }
    }

    /// Collect a notarization share for the current round. If it completes a notarization for a known
    /// proposal, finalizes the resulting block.
    pub fn recv_nt_share(&mut self, origin: VerifyingKey, nt_share: NtShare) {
        let notarization = match self.collector.as_mut() {
            Some(collector) => collector.collect(&origin.to_bytes(), nt_share),
            None => None,
        };
        if let Some(block) = notarization.and_then(|n| self.chain.add_notarization(n)) {
            self.finalize(block);
        }
    }

    /// Collect a random beacon share. If it appends the entry for the next round, ends the current
    /// round (if still open) and starts the next one.
    pub fn recv_rand_beacon_sig_share(&mut self, origin: VerifyingKey, share: RandBeaconSigShare) {
        let Some(entry) = self.beacon.on_receive_share(&origin.to_bytes(), share) else {
            return;
        };
        let next_round = entry.round;

        Event::publish(
            &self.event_publisher,
            Event::AppendBeacon(AppendBeaconEvent {
                timestamp: SystemTime::now(),
                entry,
            }),
        );

        if let Some(round) = next_round.prev() {
            self.end_round(round);
        }
        self.start_round(next_round);
    }

    /// Finalize a block broadcast by a peer that collected its notarization before this node did.
    pub fn recv_block(&mut self, origin: VerifyingKey, block: Block) {
        if block.round <= self.chain.head().round {
            return;
        }
        log::debug!(
            "Received block {} for round {} from {}",
            first_seven_base64_chars(&block.hash.bytes()),
            block.round,
            first_seven_base64_chars(&origin.to_bytes())
        );
        self.finalize(block);
    }

    pub fn recv_transaction(&mut self, txn: Transaction) {
        self.chain.add_txn(txn)
    }

    /// Skip the current round if it has been open for longer than `round_timeout`.
    pub fn tick(&mut self) {
        if self.round_ended || self.round_started.elapsed() < self.config.round_timeout {
            return;
        }

        Event::publish(
            &self.event_publisher,
            Event::RoundTimeout(RoundTimeoutEvent {
                timestamp: SystemTime::now(),
                round: self.round,
                timeout: self.config.round_timeout,
            }),
        );
        self.end_round(self.round);
    }

    fn finalize(&mut self, block: Block) {
        let round = block.round;
        let hash = block.hash;
        let txns = block.txns.len();

        let result = match self
            .beacon
            .committees(round)
            .ok()
            .and_then(|committees| self.groups.get(committees.notary))
        {
            Some(notary_committee) => self.chain.finalize(block.clone(), notary_committee),
            None => Err(ChainError::UnknownGroup { round }),
        };

        match result {
            Ok(()) => {
                Event::publish(
                    &self.event_publisher,
                    Event::FinalizeBlock(FinalizeBlockEvent {
                        timestamp: SystemTime::now(),
                        round,
                        block: hash,
                        txns,
                    }),
                );
                self.sender.broadcast(block);
                self.end_round(round);
            }
            Err(err) => log::debug!(
                "Cannot finalize block {} for round {}: {:?}",
                first_seven_base64_chars(&hash.bytes()),
                round,
                err
            ),
        }
    }

    fn propose(&mut self, round: Round) {
        let draft = self.chain.draft_proposal(round, self.config.txn_batch_limit);
        let keypair = self.keypair.clone();
        let mut sender = self.sender.clone();
        let event_publisher = self.event_publisher.clone();
        thread::spawn(move || {
            let proposal = draft.seal(&keypair);
            Event::publish(
                &event_publisher,
                Event::Propose(ProposeEvent {
                    timestamp: SystemTime::now(),
                    proposal: proposal.clone(),
                }),
            );
            sender.broadcast(proposal);
        });
    }

    fn start_notary(&mut self, membership: Membership, criteria: ProposalCriteria) {
        let (notary_input, notary_inbox) = mpsc::sync_channel(NOTARY_QUEUE_CAPACITY);
        self.notary_inputs.push(notary_input);

        let round = criteria.round;
        let group = membership.group();
        let block_time = self.config.block_time;
        let signal = RoundSignal::new(Deadline::after(block_time), self.cancel_token.clone());
        let mut sender = self.sender.clone();
        let event_publisher = self.event_publisher.clone();
        thread::spawn(move || {
            let notary = Notary::new(membership, criteria);
            let state = notary.notarize(notary_inbox, signal, |nt_share| {
                Event::publish(
                    &event_publisher,
                    Event::Notarize(NotarizeEvent {
                        timestamp: SystemTime::now(),
                        group,
                        nt_share: nt_share.clone(),
                    }),
                );
                sender.broadcast(nt_share);
            });
            if state == NotaryState::TimedOut {
                Event::publish(
                    &event_publisher,
                    Event::NotaryTimeout(NotaryTimeoutEvent {
                        timestamp: SystemTime::now(),
                        round,
                        group,
                        timeout: block_time,
                    }),
                );
            }
        });
    }

    fn sign_beacon_share(&mut self, membership: Membership, next_round: Round) {
        let history = self.beacon.history().clone();
        let mut sender = self.sender.clone();
        let event_publisher = self.event_publisher.clone();
        thread::spawn(move || {
            match sign_beacon_share(&history, membership.share(), next_round) {
                Ok(share) => {
                    Event::publish(
                        &event_publisher,
                        Event::SignBeaconShare(SignBeaconShareEvent {
                            timestamp: SystemTime::now(),
                            group: membership.group(),
                            share: share.clone(),
                        }),
                    );
                    sender.broadcast(share);
                }
                Err(err) => log::warn!(
                    "Failed to sign beacon share for round {}: {:?}",
                    next_round,
                    err
                ),
            }
        });
    }

    fn buffer(&mut self, origin: VerifyingKey, round: Round, msg: Message) {
        let buffered: usize = self.future_messages.values().map(Vec::len).sum();
        if buffered >= FUTURE_MESSAGE_BUFFER_CAPACITY {
            log::debug!(
                "Future message buffer full, dropping message for round {} from {}",
                round,
                first_seven_base64_chars(&origin.to_bytes())
            );
            return;
        }
        self.future_messages
            .entry(round)
            .or_default()
            .push((origin, msg));
    }

    fn is_member_of(&self, group: GroupID) -> bool {
        self.memberships
            .iter()
            .any(|membership| membership.group() == group)
    }
}

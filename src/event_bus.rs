/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The optional thread that runs event handlers.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

/// Longest time the event bus blocks waiting for an event before checking for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// The handlers registered for each event type. If `log_events` was set, the default logger of each
/// event type is registered first.
pub(crate) struct EventHandlers {
    pub(crate) start_round_handlers: Vec<HandlerPtr<StartRoundEvent>>,
    pub(crate) end_round_handlers: Vec<HandlerPtr<EndRoundEvent>>,
    pub(crate) round_timeout_handlers: Vec<HandlerPtr<RoundTimeoutEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) notarize_handlers: Vec<HandlerPtr<NotarizeEvent>>,
    pub(crate) sign_beacon_share_handlers: Vec<HandlerPtr<SignBeaconShareEvent>>,
    pub(crate) receive_proposal_handlers: Vec<HandlerPtr<ReceiveProposalEvent>>,
    pub(crate) notary_timeout_handlers: Vec<HandlerPtr<NotaryTimeoutEvent>>,
    pub(crate) finalize_block_handlers: Vec<HandlerPtr<FinalizeBlockEvent>>,
    pub(crate) append_beacon_handlers: Vec<HandlerPtr<AppendBeaconEvent>>,
}

impl EventHandlers {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        start_round_handler: Option<HandlerPtr<StartRoundEvent>>,
        end_round_handler: Option<HandlerPtr<EndRoundEvent>>,
        round_timeout_handler: Option<HandlerPtr<RoundTimeoutEvent>>,
        propose_handler: Option<HandlerPtr<ProposeEvent>>,
        notarize_handler: Option<HandlerPtr<NotarizeEvent>>,
        sign_beacon_share_handler: Option<HandlerPtr<SignBeaconShareEvent>>,
        receive_proposal_handler: Option<HandlerPtr<ReceiveProposalEvent>>,
        notary_timeout_handler: Option<HandlerPtr<NotaryTimeoutEvent>>,
        finalize_block_handler: Option<HandlerPtr<FinalizeBlockEvent>>,
        append_beacon_handler: Option<HandlerPtr<AppendBeaconEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            start_round_handlers: handlers(log_events, start_round_handler),
            end_round_handlers: handlers(log_events, end_round_handler),
            round_timeout_handlers: handlers(log_events, round_timeout_handler),
            propose_handlers: handlers(log_events, propose_handler),
            notarize_handlers: handlers(log_events, notarize_handler),
            sign_beacon_share_handlers: handlers(log_events, sign_beacon_share_handler),
            receive_proposal_handlers: handlers(log_events, receive_proposal_handler),
            notary_timeout_handlers: handlers(log_events, notary_timeout_handler),
            finalize_block_handlers: handlers(log_events, finalize_block_handler),
            append_beacon_handlers: handlers(log_events, append_beacon_handler),
        }
    }

    /// Check whether no handler is registered for any event type, in which case the node does not need
    /// an event bus.
    pub(crate) fn is_empty(&self) -> bool {
        self.start_round_handlers.is_empty()
            && self.end_round_handlers.is_empty()
            && self.round_timeout_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.notarize_handlers.is_empty()
            && self.sign_beacon_share_handlers.is_empty()
            && self.receive_proposal_handlers.is_empty()
            && self.notary_timeout_handlers.is_empty()
            && self.finalize_block_handlers.is_empty()
            && self.append_beacon_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::StartRound(start_round_event) => self
                .start_round_handlers
                .iter()
                .for_each(|handler| handler(&start_round_event)),

            Event::EndRound(end_round_event) => self
                .end_round_handlers
                .iter()
                .for_each(|handler| handler(&end_round_event)),

            Event::RoundTimeout(round_timeout_event) => self
                .round_timeout_handlers
                .iter()
                .for_each(|handler| handler(&round_timeout_event)),

            Event::Propose(propose_event) => self
                .propose_handlers
                .iter()
                .for_each(|handler| handler(&propose_event)),

            Event::Notarize(notarize_event) => self
                .notarize_handlers
                .iter()
                .for_each(|handler| handler(&notarize_event)),

            Event::SignBeaconShare(sign_beacon_share_event) => self
                .sign_beacon_share_handlers
                .iter()
                .for_each(|handler| handler(&sign_beacon_share_event)),

            Event::ReceiveProposal(receive_proposal_event) => self
                .receive_proposal_handlers
                .iter()
                .for_each(|handler| handler(&receive_proposal_event)),

            Event::NotaryTimeout(notary_timeout_event) => self
                .notary_timeout_handlers
                .iter()
                .for_each(|handler| handler(&notary_timeout_event)),

            Event::FinalizeBlock(finalize_block_event) => self
                .finalize_block_handlers
                .iter()
                .for_each(|handler| handler(&finalize_block_event)),

            Event::AppendBeacon(append_beacon_event) => self
                .append_beacon_handlers
                .iter()
                .for_each(|handler| handler(&append_beacon_event)),
        }
    }
}

fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    handlers.extend(user_handler);
    handlers
}

pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("event_bus thread disconnected from main thread")
            }
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            // Every publisher is gone: the node has stopped, so just wait for the shutdown signal.
            Err(RecvTimeoutError::Disconnected) => match shutdown_signal.recv() {
                Ok(()) => return,
                Err(_) => panic!("event_bus thread disconnected from main thread"),
            },
        }
    })
}

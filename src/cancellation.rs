/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signals that stop in-flight round work.
//!
//! Work started for a round (currently: notarization attempts) is bounded by two independent signals:
//! 1. A [`Deadline`], which bounds how long the work can take.
//! 2. A [`CancelToken`], which the node fires the moment the round ends by any means, so that no work
//!    is wasted once the round is decided.
//!
//! A [`RoundSignal`] merges the two into a single "either fires" signal that the work polls
//! cooperatively.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// A shared, one-way cancellation flag.
///
/// Cancelling is idempotent: cancelling an already-cancelled token, or a token whose work has already
/// finished (or never started), has no effect.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A point in time after which work should stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn new(instant: Instant) -> Self {
        Self(instant)
    }

    /// Create a deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Get the time left until the deadline, or zero if it has expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

/// Which of the two signals in a [`RoundSignal`] fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fired {
    Cancelled,
    DeadlineElapsed,
}

/// A [`Deadline`] and a [`CancelToken`] merged into one signal that fires when either of them does.
#[derive(Clone, Debug)]
pub struct RoundSignal {
    deadline: Deadline,
    token: CancelToken,
}

impl RoundSignal {
    pub fn new(deadline: Deadline, token: CancelToken) -> Self {
        Self { deadline, token }
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Check whether the signal has fired, and if so, which signal fired. Cancellation takes
    /// precedence if both have.
    pub fn fired(&self) -> Option<Fired> {
        if self.token.is_cancelled() {
            Some(Fired::Cancelled)
        } else if self.deadline.expired() {
            Some(Fired::DeadlineElapsed)
        } else {
            None
        }
    }
}

use std::{
    thread,
    time::{Duration, Instant},
};

use beacon_consensus::cancellation::{CancelToken, Deadline, Fired, RoundSignal};

#[test]
fn cancel_is_idempotent_test() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!token.is_cancelled());

    token.cancel();
    assert!(token.is_cancelled());
    assert!(clone.is_cancelled());

    // Cancelling again, from either handle, changes nothing.
    token.cancel();
    clone.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn either_signal_fires_test() {
    // Neither fired.
    let signal = RoundSignal::new(Deadline::after(Duration::from_secs(10)), CancelToken::new());
    assert_eq!(signal.fired(), None);

    // Only the deadline fired.
    let signal = RoundSignal::new(Deadline::after(Duration::from_millis(10)), CancelToken::new());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(signal.fired(), Some(Fired::DeadlineElapsed));
    assert_eq!(signal.deadline().remaining(), Duration::ZERO);

    // Only the token fired.
    let token = CancelToken::new();
    let signal = RoundSignal::new(Deadline::after(Duration::from_secs(10)), token.clone());
    token.cancel();
    assert_eq!(signal.fired(), Some(Fired::Cancelled));

    // Both fired: cancellation is reported.
    let token = CancelToken::new();
    token.cancel();
    let signal = RoundSignal::new(Deadline::after(Duration::ZERO), token);
    assert_eq!(signal.fired(), Some(Fired::Cancelled));
}

#[test]
fn deadline_at_fixed_instant_test() {
    let now = Instant::now();

    // A deadline that has passed is expired and has nothing left.
    let past = Deadline::new(now);
    assert_eq!(past.instant(), now);
    thread::sleep(Duration::from_millis(5));
    assert!(past.expired());
    assert_eq!(past.remaining(), Duration::ZERO);

    // A deadline in the future has not, and never has more left than it was set to.
    let future = Deadline::new(now + Duration::from_secs(10));
    assert_eq!(future.instant(), now + Duration::from_secs(10));
    assert!(!future.expired());
    assert!(future.remaining() <= Duration::from_secs(10));
}

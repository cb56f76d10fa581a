//! Tests for bounded polling

mod common;

use std::time::Duration;

use xtradb_backup_operator::retry::{poll_until, Poll, RetryPolicy};

use common::RecordingSleeper;

fn policy() -> RetryPolicy {
    RetryPolicy::linear(5, Duration::from_secs(1))
}

#[tokio::test]
async fn ready_on_first_attempt_does_not_sleep() {
    let sleeper = RecordingSleeper::default();

    let result: Result<Poll<u32, ()>, ()> =
        poll_until(&policy(), &sleeper, "op", |_| async { Ok(Poll::Ready(7)) }).await;

    assert_eq!(result, Ok(Poll::Ready(7)));
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn exhausted_returns_last_observation_without_trailing_sleep() {
    let sleeper = RecordingSleeper::default();

    let result: Result<Poll<(), u32>, ()> =
        poll_until(&policy(), &sleeper, "op", |attempt| async move {
            Ok(Poll::Pending(attempt))
        })
        .await;

    assert_eq!(result, Ok(Poll::Pending(5)));
    assert_eq!(sleeper.delays(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn ready_after_pending() {
    let sleeper = RecordingSleeper::default();

    let result: Result<Poll<u32, &str>, ()> =
        poll_until(&policy(), &sleeper, "op", |attempt| async move {
            if attempt < 3 {
                Ok(Poll::Pending("Pending"))
            } else {
                Ok(Poll::Ready(attempt))
            }
        })
        .await;

    assert_eq!(result, Ok(Poll::Ready(3)));
    assert_eq!(sleeper.delays(), vec![1, 2]);
}

#[tokio::test]
async fn probe_error_aborts() {
    let sleeper = RecordingSleeper::default();

    let result: Result<Poll<(), ()>, &str> =
        poll_until(&policy(), &sleeper, "op", |attempt| async move {
            if attempt == 2 {
                Err("boom")
            } else {
                Ok(Poll::Pending(()))
            }
        })
        .await;

    assert_eq!(result, Err("boom"));
    assert_eq!(sleeper.delays(), vec![1]);
}

use std::sync::Arc;
use std::time::Duration;

use exam_manager::changes::{ChangeAction, ChangeFeed, Collection};

#[test]
fn test_sequences_increase_from_one() {
    let feed = ChangeFeed::new(16);
    assert_eq!(feed.latest(), 0);

    assert_eq!(feed.record(Collection::Teachers, Some("T-1"), ChangeAction::Created), 1);
    assert_eq!(feed.record(Collection::Departments, None, ChangeAction::Cleared), 2);

    let batch = feed.since(0);
    assert_eq!(batch.latest, 2);
    assert!(!batch.truncated);
    assert_eq!(batch.events.len(), 2);
    assert_eq!(batch.events[0].id.as_deref(), Some("T-1"));
    assert_eq!(batch.events[1].collection, Collection::Departments);

    let rest = feed.since(1);
    assert_eq!(rest.events.len(), 1);
    assert_eq!(rest.events[0].sequence, 2);

    assert!(feed.since(2).events.is_empty());
}

#[test]
fn test_old_events_are_dropped_and_flagged() {
    let feed = ChangeFeed::new(3);
    for i in 0..5 {
        let id = format!("STU-{i}");
        feed.record(Collection::Students, Some(&id), ChangeAction::Created);
    }

    let batch = feed.since(0);
    assert!(batch.truncated);
    let sequences: Vec<u64> = batch.events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![3, 4, 5]);

    // A cursor right before the oldest buffered event is still complete
    assert!(!feed.since(2).truncated);
}

#[test]
fn test_cursor_from_a_previous_run_is_truncated() {
    let feed = ChangeFeed::new(8);
    feed.record(Collection::Exams, Some("exam-1"), ChangeAction::Updated);

    let batch = feed.since(40);
    assert!(batch.truncated);
    assert_eq!(batch.latest, 1);
}

#[tokio::test]
async fn test_wait_returns_immediately_with_pending_events() {
    let feed = ChangeFeed::new(8);
    feed.record(Collection::Notifications, Some("n-1"), ChangeAction::Created);

    let batch = feed.wait_since(0, Duration::from_secs(30)).await;
    assert_eq!(batch.events.len(), 1);
}

#[tokio::test]
async fn test_wait_wakes_on_new_event() {
    let feed = Arc::new(ChangeFeed::new(8));

    let waiter = {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move { feed.wait_since(0, Duration::from_secs(5)).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    feed.record(Collection::PublishedResults, Some("exam-1"), ChangeAction::Created);

    let batch = waiter.await.unwrap();
    assert_eq!(batch.events.len(), 1);
    assert_eq!(batch.events[0].collection, Collection::PublishedResults);
}

#[tokio::test]
async fn test_wait_times_out_empty() {
    let feed = ChangeFeed::new(8);
    let batch = feed.wait_since(0, Duration::from_millis(20)).await;
    assert!(batch.events.is_empty());
    assert!(!batch.truncated);
    assert_eq!(batch.latest, 0);
}

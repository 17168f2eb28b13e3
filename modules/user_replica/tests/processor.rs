mod common;

use common::{event, MemReplica};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use user_replica::{Applied, Disposition, EventProcessor, ProcessError, UpsertOutcome};

const T0: &str = "2025-03-01T12:00:00Z";

fn processor() -> (Arc<MemReplica>, EventProcessor) {
    let repo = Arc::new(MemReplica::default());
    (repo.clone(), EventProcessor::new(repo))
}

#[tokio::test]
async fn redelivered_create_leaves_one_row() {
    let (repo, p) = processor();
    let body = event("create", "alice", T0);

    let first = p.process(&body).await;
    assert_eq!(Disposition::of(&first), Disposition::Ack);
    assert_eq!(
        first.unwrap(),
        Applied::Upserted {
            username: "alice".into(),
            outcome: UpsertOutcome::Inserted
        }
    );
    for _ in 0..2 {
        let again = p.process(&body).await.unwrap();
        assert!(matches!(
            again,
            Applied::Upserted {
                outcome: UpsertOutcome::Updated,
                ..
            }
        ));
    }
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.get("alice").unwrap().role, "user");
}

#[tokio::test]
async fn unknown_actions_are_acked_without_writes() {
    let (repo, p) = processor();
    let result = p
        .process(&event("delete-nonexistent", "alice", T0))
        .await;
    assert_eq!(Disposition::of(&result), Disposition::Ack);
    assert_eq!(
        result.unwrap(),
        Applied::Skipped {
            action: "delete-nonexistent".into()
        }
    );
    assert_eq!(repo.writes(), 0);
}

#[tokio::test]
async fn unknown_actions_are_acked_whatever_the_payload() {
    let (repo, p) = processor();
    for body in [
        br#"{"action":"delete-nonexistent","user":{"username":"alice"}}"#.to_vec(),
        br#"{"action":"purge"}"#.to_vec(),
        br#"{"action":"rename","user":"not an object"}"#.to_vec(),
    ] {
        let result = p.process(&body).await;
        assert_eq!(Disposition::of(&result), Disposition::Ack, "{result:?}");
        assert!(matches!(result, Ok(Applied::Skipped { .. })));
    }
    assert_eq!(repo.writes(), 0);
}

#[tokio::test]
async fn malformed_messages_are_requeued() {
    let (repo, p) = processor();
    for body in [
        b"not json".to_vec(),
        br#"{"action":"create"}"#.to_vec(),
        br#"{"action":"create","user":{"username":"x"}}"#.to_vec(),
        br#"{"action":"update","user":null}"#.to_vec(),
        br#"{"user":{"username":"x"}}"#.to_vec(),
        br#"{"action":42,"user":{}}"#.to_vec(),
    ] {
        let result = p.process(&body).await;
        assert!(matches!(result, Err(ProcessError::Decode(_))));
        assert_eq!(Disposition::of(&result), Disposition::Requeue);
    }
    assert_eq!(repo.writes(), 0);
}

#[tokio::test]
async fn storage_failures_are_requeued() {
    let (repo, p) = processor();
    repo.failing.store(true, Ordering::SeqCst);
    let result = p.process(&event("create", "bob", T0)).await;
    match &result {
        Err(ProcessError::Storage { username, .. }) => assert_eq!(username, "bob"),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert_eq!(Disposition::of(&result), Disposition::Requeue);

    repo.failing.store(false, Ordering::SeqCst);
    assert!(p.process(&event("create", "bob", T0)).await.is_ok());
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn older_updates_do_not_overwrite_newer_rows() {
    let (repo, p) = processor();
    p.process(&event("update", "carol", "2025-03-02T00:00:00Z"))
        .await
        .unwrap();
    let stale = p.process(&event("create", "carol", T0)).await;
    assert_eq!(Disposition::of(&stale), Disposition::Ack);
    assert!(matches!(
        stale.unwrap(),
        Applied::Upserted {
            outcome: UpsertOutcome::Stale,
            ..
        }
    ));
    assert_eq!(
        repo.get("carol").unwrap().updated_at.to_rfc3339(),
        "2025-03-02T00:00:00+00:00"
    );
}

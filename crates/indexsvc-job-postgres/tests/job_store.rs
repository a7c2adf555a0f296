use chrono::{Duration, Utc};
use indexsvc_core::job::JobStore;
use indexsvc_job_postgres::PgIndexJobStore;
use sqlx::PgPool;

fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "action": "UPDATE",
        "name": "users",
        "type": "user",
        "keys": ["1"],
    })
}

/// CLAIM-UNIQUENESS: for K concurrent claim attempts on one ready row,
/// exactly one succeeds.
#[sqlx::test]
async fn claim_uniqueness_under_concurrency(pool: PgPool) -> sqlx::Result<()> {
    let store = PgIndexJobStore::new(pool);
    store.migrate().await.expect("migrate");

    let job_id = store
        .insert("t1", sample_payload(), Utc::now(), 3)
        .await
        .expect("insert");

    let attempts = 8;
    let mut handles = Vec::new();
    for i in 0..attempts {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.claim(job_id, &format!("worker-{i}")).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("join").expect("claim call").is_some() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1, "exactly one claimer should win the row");
    Ok(())
}

/// NOT-BEFORE: a job is not claimable (does not appear in poll_ready) before
/// its not_before timestamp.
#[sqlx::test]
async fn not_before_excludes_future_jobs(pool: PgPool) -> sqlx::Result<()> {
    let store = PgIndexJobStore::new(pool);
    store.migrate().await.expect("migrate");

    let ready_id = store
        .insert("ready", sample_payload(), Utc::now() - Duration::seconds(1), 3)
        .await
        .expect("insert ready");
    let future_id = store
        .insert("future", sample_payload(), Utc::now() + Duration::hours(1), 3)
        .await
        .expect("insert future");

    let ready_rows = store.poll_ready(10).await.expect("poll_ready");
    let ids: Vec<_> = ready_rows.iter().map(|r| r.id).collect();

    assert!(ids.contains(&ready_id));
    assert!(!ids.contains(&future_id));
    Ok(())
}

/// ORDER-BY-READY-TIME: among ready jobs, poll_ready returns them ordered by
/// ascending not_before.
#[sqlx::test]
async fn poll_ready_orders_by_not_before(pool: PgPool) -> sqlx::Result<()> {
    let store = PgIndexJobStore::new(pool);
    store.migrate().await.expect("migrate");

    let now = Utc::now() - Duration::seconds(10);
    let later = store.insert("later", sample_payload(), now + Duration::seconds(5), 3).await.unwrap();
    let earliest = store.insert("earliest", sample_payload(), now, 3).await.unwrap();
    let middle = store.insert("middle", sample_payload(), now + Duration::seconds(2), 3).await.unwrap();

    let rows = store.poll_ready(10).await.expect("poll_ready");
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();

    assert_eq!(ids, vec![earliest, middle, later]);
    Ok(())
}

/// RETRY-ARITHMETIC: a chain of failures decrements retries_remaining by one
/// per successor, each scheduled at or after predecessor.end + retry_delay.
#[sqlx::test]
async fn retry_chain_decrements_and_schedules_forward(pool: PgPool) -> sqlx::Result<()> {
    let store = PgIndexJobStore::new(pool);
    store.migrate().await.expect("migrate");

    let retry_delay = Duration::seconds(300);
    let mut current_id = store.insert("chain", sample_payload(), Utc::now(), 3).await.unwrap();

    for expected_remaining in [2, 1, 0] {
        let row = store.claim(current_id, "worker").await.unwrap().expect("claim");
        store.mark_failed(row.id).await.unwrap();

        assert!(row.retries_remaining > 0, "would not retry at 0 remaining");
        let successor_id = store.insert_retry(&row, retry_delay).await.unwrap();

        let successor = store
            .poll_ready(10)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.id == successor_id)
            .expect("successor row should be claimable immediately or later");

        assert_eq!(successor.retries_remaining, expected_remaining);
        assert!(successor.not_before >= Utc::now()); // scheduled in the future relative to test start
        current_id = successor_id;
    }

    Ok(())
}

/// MAX-ATTEMPTS / S6: a row with retries_remaining = 0 that fails produces
/// no successor and stays terminal.
#[sqlx::test]
async fn zero_retries_remaining_produces_no_successor(pool: PgPool) -> sqlx::Result<()> {
    let store = PgIndexJobStore::new(pool);
    store.migrate().await.expect("migrate");

    let job_id = store.insert("terminal", sample_payload(), Utc::now(), 0).await.unwrap();
    let row = store.claim(job_id, "worker").await.unwrap().expect("claim");
    store.mark_failed(row.id).await.unwrap();

    assert_eq!(row.retries_remaining, 0);
    // Coordinator-level code checks this before calling insert_retry; here
    // we just confirm no other row appeared in the table.
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
    Ok(())
}

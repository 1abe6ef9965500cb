use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tether_core::app::{DrainOutcome, Outbox, OutboxBuilder, SkipReason};
use tether_core::config::OutboxConfig;
use tether_core::domain::{ReasonCode, VisitorRecord};
use tether_core::impls::{FileStorage, InMemoryRemoteStore, InMemoryStorage, ManualConnectivity};
use tether_core::outbox::JobState;

fn record(nombre: &str) -> VisitorRecord {
    VisitorRecord::new(
        NaiveDate::from_ymd_opt(2025, 9, 9).unwrap(),
        nombre,
        "San Martín",
        2,
        1,
        0,
    )
    .unwrap()
}

fn no_auto_retry() -> OutboxConfig {
    OutboxConfig {
        auto_retry: false,
        ..OutboxConfig::default()
    }
}

/// Poll `cond` until it holds (connectivity signals are handled on a
/// background task).
async fn eventually<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn build(
    config: OutboxConfig,
    storage: Arc<InMemoryStorage>,
    remote: Arc<InMemoryRemoteStore>,
    monitor: &ManualConnectivity,
) -> Outbox {
    OutboxBuilder::new()
        .config(config)
        .storage(storage)
        .remote_store(remote)
        .connectivity(monitor)
        .build()
        .await
        .unwrap()
}

async fn go_offline(outbox: &Outbox, monitor: &ManualConnectivity) {
    monitor.set_online(false);
    eventually(|| async move { !outbox.is_online() }).await;
}

#[tokio::test]
async fn offline_submissions_wait_for_reconnect_then_drain_in_order() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    let monitor = ManualConnectivity::new(true);
    let outbox = build(OutboxConfig::default(), storage, remote.clone(), &monitor).await;
    go_offline(&outbox, &monitor).await;

    let names = ["Ana", "Beto", "Carla", "Dario", "Elena"];
    for (i, name) in names.iter().enumerate() {
        outbox.submit(record(name)).await;
        assert_eq!(outbox.pending_count().await, i + 1);
    }
    outbox.wait_idle().await;
    assert!(remote.calls().await.is_empty());

    monitor.set_online(true);
    let outbox_ref = &outbox;
    eventually(|| async move { outbox_ref.pending_count().await == 0 }).await;
    outbox.wait_idle().await;

    let calls = remote.calls().await;
    assert_eq!(calls.len(), names.len());
    let delivered: Vec<&str> = calls.iter().map(|c| c.record.nombre.as_str()).collect();
    assert_eq!(delivered, names);
    outbox.shutdown().await;
}

#[tokio::test]
async fn offline_example_reaches_remote_after_reconnect() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    let monitor = ManualConnectivity::new(true);
    let outbox = build(OutboxConfig::default(), storage, remote.clone(), &monitor).await;
    go_offline(&outbox, &monitor).await;

    let ana = VisitorRecord::new(
        VisitorRecord::parse_fecha("2025-09-09").unwrap(),
        "Ana Ruiz",
        "San Martín",
        2,
        1,
        0,
    )
    .unwrap();
    assert_eq!(ana.total, 3);
    outbox.submit(ana.clone()).await;
    assert_eq!(outbox.pending_count().await, 1);

    monitor.set_online(true);
    let outbox_ref = &outbox;
    eventually(|| async move { outbox_ref.pending_count().await == 0 }).await;

    let status = outbox.status().await;
    assert_eq!(status.quarantined, 0);
    assert_eq!(remote.accepted().await, vec![ana]);
    outbox.shutdown().await;
}

#[tokio::test]
async fn not_found_quarantines_until_corrective_manual_flush() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    remote.fail_always(Some(ReasonCode::NotFound)).await;
    let monitor = ManualConnectivity::new(true);
    let config = OutboxConfig {
        base_delay_ms: 10,
        max_delay_ms: 50,
        ..OutboxConfig::default()
    };
    let outbox = build(config, storage, remote.clone(), &monitor).await;

    let id = outbox.submit(record("Ana")).await;
    outbox.wait_idle().await;

    let jobs = outbox.jobs().await;
    assert_eq!(outbox.pending_count().await, 1);
    assert_eq!(jobs[0].id, id);
    assert_eq!(jobs[0].attempts, 1);
    assert_eq!(jobs[0].state(), JobState::Quarantined);
    assert!(jobs[0].last_error.as_deref().unwrap().starts_with("not_found"));

    // Automatic triggers leave the quarantined head alone.
    go_offline(&outbox, &monitor).await;
    monitor.set_online(true);
    let outbox_ref = &outbox;
    eventually(|| async move { outbox_ref.is_online() }).await;
    outbox.submit(record("Beto")).await;
    outbox.wait_idle().await;

    assert_eq!(remote.calls().await.len(), 1);
    let after = outbox.jobs().await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0], jobs[0]);
    assert_eq!(after[1].attempts, 0);

    // The remote is fixed; a manual flush delivers both, in order.
    remote.fail_always(None).await;
    let report = outbox.flush_now().await;
    assert_eq!(report.outcome, DrainOutcome::Exhausted);
    assert_eq!(report.delivered, 2);
    let names: Vec<String> = remote.accepted().await.into_iter().map(|r| r.nombre).collect();
    assert_eq!(names, ["Ana", "Beto"]);
    outbox.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transient_failures_back_off_then_quarantine_at_ceiling() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    remote.fail_always(Some(ReasonCode::Network)).await;
    let monitor = ManualConnectivity::new(true);
    let outbox = build(OutboxConfig::default(), storage, remote.clone(), &monitor).await;

    outbox.submit(record("Ana")).await;
    outbox.wait_idle().await;

    let calls = remote.calls().await;
    assert_eq!(calls.len(), 8);
    let gaps: Vec<u64> = calls
        .windows(2)
        .map(|w| (w[1].at - w[0].at).as_secs())
        .collect();
    assert_eq!(gaps, [2, 4, 8, 10, 10, 10, 10]);

    let jobs = outbox.jobs().await;
    assert_eq!(jobs[0].attempts, 8);
    assert!(jobs[0].quarantined);
    let status = outbox.status().await;
    assert_eq!((status.pending, status.quarantined, status.retrying), (1, 1, 0));
    outbox.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn flush_during_active_drain_is_coalesced() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::with_latency(Duration::from_secs(1)));
    let monitor = ManualConnectivity::new(true);
    let outbox = build(OutboxConfig::default(), storage, remote.clone(), &monitor).await;

    outbox.submit(record("Ana")).await;
    while !outbox.is_draining() {
        tokio::task::yield_now().await;
    }

    let report = outbox.flush_now().await;
    assert_eq!(report.outcome, DrainOutcome::Skipped(SkipReason::AlreadyDraining));
    assert!(report.was_skipped());
    outbox.flush();
    outbox.wait_idle().await;

    assert_eq!(remote.calls().await.len(), 1);
    assert_eq!(outbox.pending_count().await, 0);
    assert!(!outbox.is_draining());
    outbox.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn connectivity_flap_during_drain_joins_running_cycle() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::with_latency(Duration::from_secs(1)));
    let monitor = ManualConnectivity::new(true);
    let outbox = build(OutboxConfig::default(), storage, remote.clone(), &monitor).await;

    outbox.submit(record("Ana")).await;
    outbox.submit(record("Beto")).await;
    while !outbox.is_draining() {
        tokio::task::yield_now().await;
    }

    monitor.set_online(false);
    while outbox.is_online() {
        tokio::task::yield_now().await;
    }
    monitor.set_online(true);
    while !outbox.is_online() {
        tokio::task::yield_now().await;
    }
    assert!(outbox.is_draining());
    outbox.wait_idle().await;

    let calls: Vec<String> = remote
        .calls()
        .await
        .into_iter()
        .map(|c| c.record.nombre)
        .collect();
    assert_eq!(calls, ["Ana", "Beto"]);
    assert_eq!(outbox.pending_count().await, 0);
    outbox.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn discard_is_refused_while_draining() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::with_latency(Duration::from_secs(1)));
    let monitor = ManualConnectivity::new(true);
    let outbox = build(OutboxConfig::default(), storage, remote.clone(), &monitor).await;

    let id = outbox.submit(record("Ana")).await;
    while !outbox.is_draining() {
        tokio::task::yield_now().await;
    }

    assert!(!outbox.discard(id).await);
    assert_eq!(outbox.pending_count().await, 1);
    outbox.wait_idle().await;

    assert_eq!(remote.calls().await.len(), 1);
    assert_eq!(remote.accepted().await, vec![record("Ana")]);
    assert_eq!(outbox.pending_count().await, 0);
    outbox.shutdown().await;
}

#[tokio::test]
async fn reload_reproduces_pending_jobs_and_drains_them() {
    let dir = tempfile::tempdir().unwrap();
    let config = OutboxConfig {
        base_delay_ms: 5,
        max_delay_ms: 20,
        ..no_auto_retry()
    };

    let remote = Arc::new(InMemoryRemoteStore::new());
    remote.fail_always(Some(ReasonCode::Server)).await;
    let first = OutboxBuilder::new()
        .config(config.clone())
        .storage(Arc::new(FileStorage::new(dir.path())))
        .remote_store(remote.clone())
        .build()
        .await
        .unwrap();
    for name in ["Ana", "Beto", "Carla"] {
        first.submit(record(name)).await;
    }
    first.wait_idle().await;
    let before = first.jobs().await;
    assert_eq!(before.len(), 3);
    assert!(before[0].attempts >= 1);
    first.shutdown().await;

    let remote = Arc::new(InMemoryRemoteStore::new());
    let second = OutboxBuilder::new()
        .config(config)
        .storage(Arc::new(FileStorage::new(dir.path())))
        .remote_store(remote.clone())
        .initially_online(false)
        .build()
        .await
        .unwrap();
    assert_eq!(second.jobs().await, before);

    // Offline: nothing moves.
    let report = second.flush_now().await;
    assert_eq!(report.outcome, DrainOutcome::Skipped(SkipReason::Offline));
    assert_eq!(second.jobs().await, before);
    second.shutdown().await;

    let remote = Arc::new(InMemoryRemoteStore::new());
    let third = OutboxBuilder::new()
        .config(OutboxConfig {
            base_delay_ms: 5,
            max_delay_ms: 20,
            ..no_auto_retry()
        })
        .storage(Arc::new(FileStorage::new(dir.path())))
        .remote_store(remote.clone())
        .build()
        .await
        .unwrap();
    let report = third.flush_now().await;
    assert_eq!(report.delivered, 3);
    assert_eq!(third.pending_count().await, 0);
    let names: Vec<String> = remote.accepted().await.into_iter().map(|r| r.nombre).collect();
    assert_eq!(names, ["Ana", "Beto", "Carla"]);
    third.shutdown().await;
}

#[tokio::test]
async fn corrupt_storage_starts_empty() {
    use tether_core::ports::KeyValueStorage;

    let storage = Arc::new(InMemoryStorage::new());
    storage
        .set("outbox:v1", "[{\"id\": 42}".to_string())
        .await
        .unwrap();

    let outbox = OutboxBuilder::new()
        .storage(storage)
        .remote_store(Arc::new(InMemoryRemoteStore::new()))
        .build()
        .await
        .unwrap();

    assert_eq!(outbox.pending_count().await, 0);
    outbox.shutdown().await;
}

#[tokio::test]
async fn discard_clears_quarantined_job() {
    let storage = Arc::new(InMemoryStorage::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    remote.fail_always(Some(ReasonCode::ValidationRejected)).await;
    let monitor = ManualConnectivity::new(true);
    let outbox = build(no_auto_retry(), storage.clone(), remote, &monitor).await;

    let id = outbox.submit(record("Ana")).await;
    outbox.wait_idle().await;
    assert_eq!(outbox.status().await.quarantined, 1);

    assert!(outbox.discard(id).await);
    assert_eq!(outbox.pending_count().await, 0);
    assert_eq!(storage.raw("outbox:v1").await.as_deref(), Some("[]"));
    outbox.shutdown().await;
}

#[tokio::test]
async fn save_failure_is_reported_but_submit_still_queues() {
    let storage = Arc::new(InMemoryStorage::new());
    let monitor = ManualConnectivity::new(true);
    let outbox = build(
        OutboxConfig {
            save_retry_delay_ms: 1,
            ..OutboxConfig::default()
        },
        storage.clone(),
        Arc::new(InMemoryRemoteStore::new()),
        &monitor,
    )
    .await;
    go_offline(&outbox, &monitor).await;
    storage.set_fail_writes(true);

    outbox.submit(record("Ana")).await;

    let status = outbox.status().await;
    assert_eq!(status.pending, 1);
    assert!(status.persist_failed);
    assert_eq!(storage.raw("outbox:v1").await, None);
    outbox.shutdown().await;
}

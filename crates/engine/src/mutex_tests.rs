// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tandem_adapters::FakeStore;
use tandem_core::{FakeClock, FixedJitter, SequentialTokenGen};

type TestManager = MutexManager<FakeStore, FakeClock, SequentialTokenGen>;

fn cluster(n: usize) -> (TestManager, Vec<FakeStore>, FakeClock) {
    let clock = FakeClock::new();
    let nodes: Vec<FakeStore> = (0..n)
        .map(|i| FakeStore::with_clock(format!("node-{i}"), clock.clone()))
        .collect();
    let manager = MutexManager::new(
        nodes.clone(),
        clock.clone(),
        FixedJitter(Duration::from_millis(100)),
        SequentialTokenGen::new("holder"),
    )
    .unwrap();
    (manager, nodes, clock)
}

fn holders(nodes: &[FakeStore], key: &str) -> Vec<Option<String>> {
    nodes.iter().map(|n| n.holder(key)).collect()
}

#[test]
fn empty_quorum_is_rejected() {
    let result = MutexManager::new(
        Vec::<FakeStore>::new(),
        FakeClock::new(),
        FixedJitter(Duration::ZERO),
        SequentialTokenGen::default(),
    );
    assert!(matches!(result, Err(MutexError::NoNodes)));
}

#[test]
fn new_mutex_does_no_io() {
    let (manager, nodes, _) = cluster(3);
    let mutex = manager.new_mutex("nightly-bills", MutexOptions::default());
    assert_eq!(mutex.key(), "nightly-bills");
    assert!(!mutex.is_held());
    assert!(nodes.iter().all(|n| n.calls().is_empty()));
}

#[tokio::test(start_paused = true)]
async fn lock_and_unlock_round_trip() {
    let (manager, nodes, _) = cluster(3);
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("nightly-bills", MutexOptions::default());

    mutex.lock(&cancel).await.unwrap();
    assert!(mutex.is_held());
    assert_eq!(
        holders(&nodes, "nightly-bills"),
        vec![Some("holder-1".to_string()); 3]
    );

    assert!(mutex.unlock().await.unwrap());
    assert!(!mutex.is_held());
    assert_eq!(holders(&nodes, "nightly-bills"), vec![None; 3]);
}

#[tokio::test(start_paused = true)]
async fn try_lock_reports_conflict_while_held() {
    let (manager, _, _) = cluster(3);
    let cancel = CancellationToken::new();
    let first = manager.new_mutex("job", MutexOptions::default());
    let second = manager.new_mutex("job", MutexOptions::default());

    first.try_lock(&cancel).await.unwrap();
    let err = second.try_lock(&cancel).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {err}");

    // Locking again through the holding handle is contention too
    assert!(first.try_lock(&cancel).await.unwrap_err().is_conflict());
}

#[tokio::test(start_paused = true)]
async fn concurrent_racers_produce_one_winner() {
    let (manager, _, _) = cluster(3);
    let mut racers = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let mutex = manager.new_mutex("settlement", MutexOptions::default());
        racers.spawn(async move {
            let cancel = CancellationToken::new();
            mutex.try_lock(&cancel).await.is_ok()
        });
    }

    let mut winners = 0;
    while let Some(won) = racers.join_next().await {
        if won.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(start_paused = true)]
async fn waiting_lock_acquires_after_release() {
    let (manager, nodes, _) = cluster(3);
    let cancel = CancellationToken::new();
    let first = manager.new_mutex("job", MutexOptions::default());
    first.lock(&cancel).await.unwrap();

    let second = manager.new_mutex(
        "job",
        MutexOptions::new().with_wait(Duration::from_secs(5)),
    );
    let waiter = tokio::spawn(async move {
        let cancel = CancellationToken::new();
        let result = second.lock(&cancel).await;
        (second, result)
    });

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(first.unlock().await.unwrap());

    let (second, result) = waiter.await.unwrap();
    result.unwrap();
    assert!(second.is_held());
    assert!(nodes[0].holder("job").is_some_and(|t| t != "holder-1"));
}

#[tokio::test(start_paused = true)]
async fn lock_gives_up_with_conflict_after_budget() {
    let (manager, nodes, _) = cluster(1);
    let cancel = CancellationToken::new();
    let first = manager.new_mutex("job", MutexOptions::default());
    first.lock(&cancel).await.unwrap();

    let second = manager.new_mutex("job", MutexOptions::default());
    let err = second.lock(&cancel).await.unwrap_err();
    assert!(err.is_conflict());

    let attempts = nodes[0]
        .calls()
        .iter()
        .filter(|c| matches!(c, tandem_adapters::StoreCall::Acquire { .. }))
        .count();
    // one for the holder plus the default budget for the loser
    assert_eq!(attempts, 1 + tandem_core::mutex::DEFAULT_TRIES as usize);
}

#[tokio::test(start_paused = true)]
async fn expired_lock_can_be_taken_over() {
    let (manager, _, clock) = cluster(3);
    let cancel = CancellationToken::new();
    let options = MutexOptions::new().with_expiry(Duration::from_secs(2));
    let first = manager.new_mutex("job", options.clone());
    let second = manager.new_mutex("job", options);

    first.lock(&cancel).await.unwrap();
    assert!(second.try_lock(&cancel).await.unwrap_err().is_conflict());

    clock.advance(Duration::from_millis(2_100));
    assert!(!first.is_held());
    second.try_lock(&cancel).await.unwrap();

    // The stale handle's release must not remove the new holder's lock
    assert!(!first.unlock().await.unwrap());
    assert!(second.is_held());
}

#[tokio::test(start_paused = true)]
async fn unlock_ignores_cancelled_caller() {
    let (manager, nodes, _) = cluster(3);
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());
    mutex.lock(&cancel).await.unwrap();

    cancel.cancel();
    assert!(mutex.unlock().await.unwrap());
    assert_eq!(holders(&nodes, "job"), vec![None; 3]);
}

#[tokio::test(start_paused = true)]
async fn unlock_completes_even_if_caller_stops_waiting() {
    let (manager, nodes, _) = cluster(3);
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());
    mutex.lock(&cancel).await.unwrap();

    // The caller's deadline fires before the release reports back
    let _ = tokio::time::timeout(Duration::ZERO, mutex.unlock()).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(holders(&nodes, "job"), vec![None; 3]);
}

#[tokio::test(start_paused = true)]
async fn unlock_without_lock_is_not_an_error() {
    let (manager, _, _) = cluster(3);
    let mutex = manager.new_mutex("job", MutexOptions::default());
    assert!(!mutex.unlock().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn quorum_survives_minority_outage() {
    let (manager, nodes, _) = cluster(3);
    nodes[2].set_unavailable(true);
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());

    mutex.try_lock(&cancel).await.unwrap();
    assert!(mutex.unlock().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn majority_outage_is_a_store_error() {
    let (manager, nodes, _) = cluster(3);
    for node in &nodes {
        node.set_unavailable(true);
    }
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());

    assert!(matches!(
        mutex.try_lock(&cancel).await,
        Err(MutexError::Store(_))
    ));
    assert!(matches!(mutex.lock(&cancel).await, Err(MutexError::Store(_))));
}

#[tokio::test(start_paused = true)]
async fn lost_round_rolls_back_partial_acquisitions() {
    let (manager, nodes, _) = cluster(3);
    let cancel = CancellationToken::new();
    // Someone else holds the key on two of three nodes
    let ttl = Duration::from_secs(30);
    nodes[0].acquire("job", "other", ttl).await.unwrap();
    nodes[1].acquire("job", "other", ttl).await.unwrap();

    let mutex = manager.new_mutex("job", MutexOptions::default());
    assert!(mutex.try_lock(&cancel).await.unwrap_err().is_conflict());
    assert!(nodes[2].holder("job").is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_waiting_lock() {
    let (manager, _, _) = cluster(3);
    let holder = manager.new_mutex("job", MutexOptions::default());
    holder.lock(&CancellationToken::new()).await.unwrap();

    let waiter = manager.new_mutex("job", MutexOptions::default());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.cancel();
    });

    let err = waiter.lock(&cancel).await.unwrap_err();
    assert!(matches!(err, MutexError::Cancelled { .. }));
}

#[tokio::test(start_paused = true)]
async fn extend_keeps_lock_past_original_expiry() {
    let (manager, _, clock) = cluster(3);
    let cancel = CancellationToken::new();
    let options = MutexOptions::new().with_expiry(Duration::from_secs(2));
    let first = manager.new_mutex("job", options.clone());
    let second = manager.new_mutex("job", options);

    first.lock(&cancel).await.unwrap();
    clock.advance(Duration::from_millis(1_500));
    assert!(first.extend().await.unwrap());
    clock.advance(Duration::from_millis(1_500));

    assert!(first.is_held());
    assert!(second.try_lock(&cancel).await.unwrap_err().is_conflict());
}

#[tokio::test(start_paused = true)]
async fn scoped_releases_after_work() {
    let (manager, nodes, _) = cluster(3);
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());

    let inside = mutex
        .scoped(&cancel, || async { nodes[0].holder("job").is_some() })
        .await
        .unwrap();

    assert!(inside);
    assert_eq!(holders(&nodes, "job"), vec![None; 3]);
}

#[tokio::test(start_paused = true)]
async fn seeded_jitter_works_with_manager() {
    let clock = FakeClock::new();
    let node = FakeStore::with_clock("solo", clock.clone());
    let manager = MutexManager::new(
        vec![node],
        clock,
        tandem_core::RandJitter::seeded(3),
        SequentialTokenGen::default(),
    )
    .unwrap();
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());
    mutex.lock(&cancel).await.unwrap();
    assert_eq!(manager.nodes(), 1);
}

/// A node whose calls never answer while `stalled` is set
#[derive(Clone)]
struct StallingNode {
    inner: FakeStore,
    stalled: bool,
}

impl StallingNode {
    fn healthy(inner: FakeStore) -> Self {
        Self {
            inner,
            stalled: false,
        }
    }

    fn stalled(inner: FakeStore) -> Self {
        Self {
            inner,
            stalled: true,
        }
    }

    async fn stall_if_needed(&self) {
        if self.stalled {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl LockStore for StallingNode {
    fn node(&self) -> &str {
        self.inner.node()
    }

    async fn acquire(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, tandem_adapters::StoreError> {
        self.stall_if_needed().await;
        self.inner.acquire(key, token, ttl).await
    }

    async fn extend(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, tandem_adapters::StoreError> {
        self.stall_if_needed().await;
        self.inner.extend(key, token, ttl).await
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, tandem_adapters::StoreError> {
        self.stall_if_needed().await;
        self.inner.release(key, token).await
    }
}

/// Three nodes where the middle one never answers
fn cluster_with_silent_node() -> (
    MutexManager<StallingNode, FakeClock, SequentialTokenGen>,
    Vec<FakeStore>,
) {
    let clock = FakeClock::new();
    let stores: Vec<FakeStore> = ["a", "b", "c"]
        .iter()
        .map(|name| FakeStore::with_clock(*name, clock.clone()))
        .collect();
    let nodes = vec![
        StallingNode::healthy(stores[0].clone()),
        StallingNode::stalled(stores[1].clone()),
        StallingNode::healthy(stores[2].clone()),
    ];
    let manager = MutexManager::new(
        nodes,
        clock,
        FixedJitter(Duration::from_millis(100)),
        SequentialTokenGen::new("holder"),
    )
    .unwrap();
    (manager, stores)
}

#[tokio::test(start_paused = true)]
async fn silent_node_does_not_hang_lost_round_rollback() {
    let (manager, stores) = cluster_with_silent_node();
    stores[0]
        .acquire("job", "other", Duration::from_secs(60))
        .await
        .unwrap();
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());

    let attempt = tokio::time::timeout(Duration::from_secs(5), mutex.try_lock(&cancel))
        .await
        .expect("single attempt must finish within the node timeouts");
    assert!(attempt.unwrap_err().is_conflict());
    assert!(stores[2].holder("job").is_none());

    let waited = tokio::time::timeout(Duration::from_secs(120), mutex.lock(&cancel))
        .await
        .expect("attempt budget must bound lock");
    assert!(waited.unwrap_err().is_conflict());
}

#[tokio::test(start_paused = true)]
async fn silent_minority_node_does_not_block_extend_or_unlock() {
    let (manager, stores) = cluster_with_silent_node();
    let cancel = CancellationToken::new();
    let mutex = manager.new_mutex("job", MutexOptions::default());

    tokio::time::timeout(Duration::from_secs(5), mutex.try_lock(&cancel))
        .await
        .expect("acquire bounded")
        .unwrap();

    let extended = tokio::time::timeout(Duration::from_secs(5), mutex.extend())
        .await
        .expect("extend bounded");
    assert!(extended.unwrap());

    let released = tokio::time::timeout(Duration::from_secs(5), mutex.unlock())
        .await
        .expect("unlock bounded");
    assert!(released.unwrap());
    assert!(stores[0].holder("job").is_none());
    assert!(stores[2].holder("job").is_none());
}

/// Log sink shared with a scoped subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<StdMutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test(start_paused = true)]
async fn failed_rollback_is_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (manager, stores) = cluster_with_silent_node();
    stores[0]
        .acquire("job", "other", Duration::from_secs(60))
        .await
        .unwrap();
    let mutex = manager.new_mutex("job", MutexOptions::default());
    assert!(mutex
        .try_lock(&CancellationToken::new())
        .await
        .unwrap_err()
        .is_conflict());

    let output = String::from_utf8_lossy(&logs.0.lock().unwrap()).to_string();
    assert!(
        output.contains("rollback of lost round failed"),
        "logs:\n{output}"
    );
    assert!(output.contains("did not answer"), "logs:\n{output}");
}

//! End-to-end load, start and unload through the control plane.

use std::sync::Arc;
use std::time::Duration;

use memcore::bringup::steps::{HASH_TABLE, OOM_HANDLER, WORKERS};
use memcore::clock::ManualClock;
use memcore::config::CoreConfig;
use memcore::control::ControlError;
use memcore::lifecycle::CacheCoreBuilder;
use memcore::{CacheCore, ModuleStatus, ShutdownPath};

mod common;
use common::{
    collaborators, exits, inits, journal, slow_collaborators, FailingSpawner, COLLABORATORS,
};

fn builder(
    journal: &common::Journal,
    fail_on: Option<&'static str>,
    failures: usize,
) -> CacheCoreBuilder {
    CacheCore::builder(CoreConfig::default())
        .collaborators(collaborators(journal, fail_on, failures))
        .total_memory(1 << 30)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_then_full_unload() {
    let journal = journal();
    let (core, mut peer) = builder(&journal, None, 0).load().unwrap();
    assert_eq!(core.status(), ModuleStatus::Unknown);
    assert!(core.channel().is_registered());

    assert!(peer.request_start().await.unwrap());
    assert_eq!(core.status(), ModuleStatus::Succeeded);
    assert!(core.clock().is_running());
    assert!(core.pools().is_ready());
    assert_eq!(inits(&journal), COLLABORATORS.to_vec());

    let channel = core.channel().clone();
    let clock = core.clock().clone();
    let path = tokio::task::spawn_blocking(move || core.unload()).await.unwrap();

    assert_eq!(path, ShutdownPath::Full);
    let expected: Vec<_> = COLLABORATORS.iter().rev().copied().collect();
    assert_eq!(exits(&journal), expected);
    assert!(!clock.is_running());
    assert!(channel.is_released());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_start_unloads_control_only() {
    let journal = journal();
    let (core, mut peer) = builder(&journal, Some(OOM_HANDLER), 1).load().unwrap();

    assert!(!peer.request_start().await.unwrap());
    assert_eq!(core.status(), ModuleStatus::Failed);
    assert!(!core.clock().is_running());
    assert_eq!(core.pools().live(), 0);

    let exits_after_rollback = exits(&journal);
    assert_eq!(exits_after_rollback.len(), COLLABORATORS.len() - 1);

    let channel = core.channel().clone();
    assert!(channel.is_registered());
    let path = core.unload();

    assert_eq!(path, ShutdownPath::ControlOnly);
    assert_eq!(exits(&journal), exits_after_rollback);
    assert!(!channel.is_registered());
    assert!(channel.is_released());
}

#[tokio::test]
async fn test_unload_without_start() {
    let journal = journal();
    let (core, _peer) = builder(&journal, None, 0).load().unwrap();
    let channel = core.channel().clone();

    assert_eq!(core.unload(), ShutdownPath::ControlOnly);
    assert!(journal.lock().is_empty());
    assert!(!channel.is_registered());
    assert!(channel.is_released());
}

#[tokio::test(start_paused = true)]
async fn test_spawn_failure_times_out() {
    let journal = journal();
    let mut config = CoreConfig::default();
    config.control.timeout_secs = 1;
    let (core, mut peer) = CacheCore::builder(config)
        .collaborators(collaborators(&journal, None, 0))
        .spawner(Arc::new(FailingSpawner))
        .total_memory(1 << 30)
        .load()
        .unwrap();

    let err = peer.request_start().await.unwrap_err();
    assert!(matches!(err, ControlError::Timeout(d) if d == Duration::from_secs(1)));

    assert_eq!(core.status(), ModuleStatus::Unknown);
    assert!(journal.lock().is_empty());
    assert!(core.channel().is_registered());
    assert!(!core.activator().is_in_flight());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_after_success_does_not_rerun() {
    let journal = journal();
    let (core, mut peer) = builder(&journal, None, 0).load().unwrap();

    assert!(peer.request_start().await.unwrap());
    let first = inits(&journal);

    assert!(peer.request_start().await.unwrap());
    assert_eq!(inits(&journal), first);
    assert_eq!(core.status(), ModuleStatus::Succeeded);

    tokio::task::spawn_blocking(move || core.unload()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_retry_after_failure_succeeds() {
    let journal = journal();
    let (core, mut peer) = builder(&journal, Some(WORKERS), 1).load().unwrap();

    assert!(!peer.request_start().await.unwrap());
    assert_eq!(core.status(), ModuleStatus::Failed);

    assert!(peer.request_start().await.unwrap());
    assert_eq!(core.status(), ModuleStatus::Succeeded);
    assert!(core.clock().is_running());
    assert!(core.pools().is_ready());

    let path = tokio::task::spawn_blocking(move || core.unload()).await.unwrap();
    assert_eq!(path, ShutdownPath::Full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clock_follows_wall_after_start() {
    let journal = journal();
    let wall = Arc::new(ManualClock::new(10_000_000));
    let (core, mut peer) = builder(&journal, None, 0)
        .wall_clock(wall.clone())
        .tick_interval(Duration::from_secs(3600))
        .load()
        .unwrap();

    assert!(peer.request_start().await.unwrap());
    let clock = core.clock().clone();
    assert_eq!(clock.start_reference(), 9_999_998);
    assert_eq!(clock.current(), 2);

    for expected in 3..=5 {
        wall.advance(1);
        clock.tick();
        assert_eq!(clock.current(), expected);
    }

    assert_eq!(clock.to_expiry_relative(0), 0);
    assert_eq!(clock.to_expiry_relative(100), 105);
    assert_eq!(clock.to_expiry_relative(10_000_010), 12);
    assert_eq!(clock.to_expiry_relative(9_000_000), 1);

    tokio::task::spawn_blocking(move || core.unload()).await.unwrap();
    assert!(!clock.is_running());
}

fn slow_core(
    journal: &common::Journal,
    failures: usize,
    delay: Duration,
) -> (CacheCore, memcore::ControlPeer) {
    let mut config = CoreConfig::default();
    config.control.timeout_secs = 1;
    CacheCore::builder(config)
        .collaborators(slow_collaborators(
            journal,
            Some(HASH_TABLE),
            failures,
            Some((HASH_TABLE, delay)),
        ))
        .total_memory(1 << 30)
        .load()
        .unwrap()
}

/// Wait until the running attempt has settled on `status` and reported it.
async fn wait_for_attempt(core: &CacheCore, status: ModuleStatus) {
    for _ in 0..100 {
        if core.status() == status && !core.activator().is_in_flight() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("attempt never finished with {:?}", status);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_report_is_not_taken_for_the_next_start() {
    let journal = journal();
    let (core, mut peer) = slow_core(&journal, 1, Duration::from_millis(1500));

    let err = peer.request_start().await.unwrap_err();
    assert!(matches!(err, ControlError::Timeout(_)));

    // The failed outcome of the first attempt is now queued for the peer.
    wait_for_attempt(&core, ModuleStatus::Failed).await;

    assert!(peer.request_start().await.unwrap());
    assert_eq!(core.status(), ModuleStatus::Succeeded);
    let hash_inits = inits(&journal).iter().filter(|n| **n == HASH_TABLE).count();
    assert_eq!(hash_inits, 2);

    tokio::task::spawn_blocking(move || core.unload()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_during_attempt_joins_it() {
    let journal = journal();
    let (core, mut peer) = slow_core(&journal, 0, Duration::from_millis(500));

    peer.send_start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    peer.send_start().unwrap();

    let report = peer.wait_report().await.unwrap();
    assert!(report.succeeded);
    assert_eq!(report.starts_seen, 2);
    assert_eq!(core.status(), ModuleStatus::Succeeded);
    assert_eq!(inits(&journal), COLLABORATORS.to_vec());

    // Both starts were answered by that one report.
    let err = peer.wait_report().await.unwrap_err();
    assert!(matches!(err, ControlError::Timeout(_)));

    tokio::task::spawn_blocking(move || core.unload()).await.unwrap();
}

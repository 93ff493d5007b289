//! Tests for the directory poller: activation, cadence, stale-data retention,
//! the single in-flight poll guarantee, and cancellation.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use meet_lobby::directory::{PollPhase, FETCH_FAILED_MESSAGE};
use meet_lobby::poller::DirectoryPoller;
use meet_lobby::registry::{RoomRegistry, RoomSummary};
use meet_lobby::{LobbyError, Result};

// ---------------------------------------------------------------------------
// Scripted registry
// ---------------------------------------------------------------------------

struct ScriptedRegistry {
    responses: Mutex<VecDeque<Result<Vec<RoomSummary>>>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedRegistry {
    fn new(responses: Vec<Result<Vec<RoomSummary>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            gate: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Each fetch blocks until a permit is added to `gate`.
    fn gated(responses: Vec<Result<Vec<RoomSummary>>>, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(responses)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RoomRegistry for ScriptedRegistry {
    fn list_active_rooms(&self) -> impl Future<Output = Result<Vec<RoomSummary>>> + Send {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}

fn room(name: &str, count: u32) -> RoomSummary {
    RoomSummary {
        name: name.to_string(),
        participant_count: count,
        created_at_epoch_seconds: 1_700_000_000,
    }
}

fn unavailable() -> LobbyError {
    LobbyError::RegistryUnavailable {
        detail: "connection refused".to_string(),
    }
}

async fn wait_for_calls(registry: &ScriptedRegistry, n: usize) {
    for _ in 0..10_000 {
        if registry.calls() >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("registry never reached {n} calls (saw {})", registry.calls());
}

// ---------------------------------------------------------------------------
// Activation and cadence
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_activation_polls_immediately() {
    let reg = Arc::new(ScriptedRegistry::new(vec![Ok(vec![room("alpha", 2)])]));
    let handle = DirectoryPoller::new(Arc::clone(&reg)).spawn();

    let state = handle.settled().await.unwrap();
    assert_eq!(state.phase, PollPhase::Ready);
    assert_eq!(state.rooms, vec![room("alpha", 2)]);
    assert!(!state.is_loading);
    assert!(state.error.is_none());
    assert_eq!(reg.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_polls_again_after_interval() {
    let reg = Arc::new(ScriptedRegistry::new(vec![
        Ok(vec![room("alpha", 1)]),
        Ok(vec![room("beta", 3)]),
    ]));
    let handle = DirectoryPoller::new(Arc::clone(&reg))
        .interval(Duration::from_secs(5))
        .spawn();
    handle.settled().await.unwrap();

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    wait_for_calls(&reg, 2).await;
    assert_eq!(reg.calls(), 2);

    let mut rx = handle.subscribe();
    let state = rx
        .wait_for(|s| s.phase == PollPhase::Ready && s.rooms == vec![room("beta", 3)])
        .await
        .unwrap()
        .clone();
    assert_eq!(state.rooms.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_registry_order_is_preserved() {
    let rooms = vec![room("zulu", 1), room("alpha", 4), room("mike", 2)];
    let reg = Arc::new(ScriptedRegistry::new(vec![Ok(rooms.clone())]));
    let handle = DirectoryPoller::new(Arc::clone(&reg)).spawn();
    assert_eq!(handle.settled().await.unwrap().rooms, rooms);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_keeps_previous_rooms() {
    let reg = Arc::new(ScriptedRegistry::new(vec![
        Ok(vec![room("alpha", 2), room("beta", 1)]),
        Err(unavailable()),
    ]));
    let handle = DirectoryPoller::new(Arc::clone(&reg)).spawn();
    let first = handle.settled().await.unwrap();

    let mut rx = handle.subscribe();
    let failed = rx
        .wait_for(|s| s.phase == PollPhase::Failed)
        .await
        .unwrap()
        .clone();

    assert_eq!(failed.rooms, first.rooms);
    assert_eq!(failed.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
    assert!(!failed.is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_misconfigured_registry_is_not_fatal() {
    let reg = Arc::new(ScriptedRegistry::new(vec![
        Err(LobbyError::RegistryMisconfigured { missing: "LIVEKIT_URL" }),
        Ok(vec![room("recovered", 1)]),
    ]));
    let handle = DirectoryPoller::new(Arc::clone(&reg)).spawn();

    let state = handle.settled().await.unwrap();
    assert_eq!(state.phase, PollPhase::Failed);
    assert!(state.rooms.is_empty());

    let mut rx = handle.subscribe();
    let recovered = rx
        .wait_for(|s| s.phase == PollPhase::Ready)
        .await
        .unwrap()
        .clone();
    assert_eq!(recovered.rooms, vec![room("recovered", 1)]);
    assert!(recovered.error.is_none());
}

// ---------------------------------------------------------------------------
// At most one in-flight poll
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_refresh_during_poll_is_dropped() {
    let gate = Arc::new(Semaphore::new(0));
    let reg = Arc::new(ScriptedRegistry::gated(
        vec![Ok(vec![room("alpha", 1)]), Ok(vec![room("beta", 1)])],
        Arc::clone(&gate),
    ));
    let handle = DirectoryPoller::new(Arc::clone(&reg))
        .interval(Duration::from_secs(60))
        .spawn();

    wait_for_calls(&reg, 1).await;
    assert!(handle.is_polling());
    assert!(handle.state().is_loading);

    for _ in 0..5 {
        assert!(!handle.refresh(), "refresh must be dropped while polling");
    }
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
    assert_eq!(reg.calls(), 1);

    gate.add_permits(1);
    let state = handle.settled().await.unwrap();
    assert_eq!(state.rooms, vec![room("alpha", 1)]);
    assert_eq!(reg.calls(), 1, "dropped refreshes must not be replayed");

    // Idle again: a refresh now starts exactly one more cycle.
    gate.add_permits(1);
    assert!(handle.refresh());
    wait_for_calls(&reg, 2).await;
    let mut rx = handle.subscribe();
    rx.wait_for(|s| s.phase == PollPhase::Ready && s.rooms == vec![room("beta", 1)])
        .await
        .unwrap();

    assert_eq!(reg.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_during_slow_fetch_do_not_stack() {
    let gate = Arc::new(Semaphore::new(0));
    let reg = Arc::new(ScriptedRegistry::gated(vec![], Arc::clone(&gate)));
    let handle = DirectoryPoller::new(Arc::clone(&reg))
        .interval(Duration::from_secs(5))
        .spawn();

    wait_for_calls(&reg, 1).await;
    // Several intervals elapse while the first fetch hangs.
    tokio::time::advance(Duration::from_secs(23)).await;
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
    assert_eq!(reg.calls(), 1);
    assert_eq!(reg.max_in_flight(), 1);

    gate.add_permits(1);
    handle.settled().await.unwrap();
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
    assert_eq!(reg.calls(), 1, "missed ticks must not fire right after a slow fetch");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_when_idle_polls_without_waiting_for_tick() {
    let reg = Arc::new(ScriptedRegistry::new(vec![
        Ok(vec![room("alpha", 1)]),
        Ok(vec![room("alpha", 1), room("beta", 2)]),
    ]));
    let handle = DirectoryPoller::new(Arc::clone(&reg))
        .interval(Duration::from_secs(3600))
        .spawn();
    handle.settled().await.unwrap();

    assert!(handle.refresh());
    wait_for_calls(&reg, 2).await;
    let mut rx = handle.subscribe();
    let state = rx
        .wait_for(|s| s.phase == PollPhase::Ready && s.rooms.len() == 2)
        .await
        .unwrap()
        .clone();
    assert_eq!(state.rooms[1].name, "beta");
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_polling() {
    let reg = Arc::new(ScriptedRegistry::new(vec![Ok(vec![room("alpha", 1)])]));
    let handle = DirectoryPoller::new(Arc::clone(&reg))
        .interval(Duration::from_secs(5))
        .spawn();
    handle.settled().await.unwrap();
    drop(handle);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(reg.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_after_shutdown_is_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let reg = Arc::new(ScriptedRegistry::gated(
        vec![Ok(vec![room("late", 1)])],
        Arc::clone(&gate),
    ));
    let handle = DirectoryPoller::new(Arc::clone(&reg)).spawn();
    wait_for_calls(&reg, 1).await;

    let mut rx = handle.subscribe();
    assert_eq!(rx.borrow_and_update().phase, PollPhase::Polling);
    handle.shutdown();
    gate.add_permits(1);

    assert!(rx.changed().await.is_err(), "no state may be published after shutdown");
    let last = rx.borrow().clone();
    assert!(last.rooms.is_empty());
    assert_eq!(last.phase, PollPhase::Polling);
}

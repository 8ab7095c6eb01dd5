//! Integration tests for room actors and the room manager, driven by fake
//! clients under paused Tokio time.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use orbarena_room::{
    CODE_ALPHABET, CODE_LEN, RoomCode, RoomConfig, RoomError, RoomManager, RoomStatus,
    spawn_room,
};
use orbarena_sim::{Input, PlayerId};
use orbarena_tick::TickConfig;
use orbarena_transport::{ClientHandle, TransportError};
use serde_json::Value;

// =========================================================================
// Fake clients
// =========================================================================

/// Records every frame it is handed.
#[derive(Default)]
struct RecordingClient {
    frames: Mutex<Vec<Value>>,
    terminated: AtomicBool,
}

impl RecordingClient {
    fn frames(&self) -> Vec<Value> {
        self.frames.lock().unwrap().clone()
    }

    fn states(&self) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|f| f["t"] == "state")
            .collect()
    }

    fn last_state(&self) -> Value {
        self.states().pop().expect("no state received")
    }

    fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl ClientHandle for RecordingClient {
    type Error = TransportError;

    async fn deliver(&self, data: &[u8]) -> Result<(), TransportError> {
        let value = serde_json::from_slice(data).expect("room sent invalid JSON");
        self.frames.lock().unwrap().push(value);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), TransportError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Never completes a delivery.
#[derive(Default)]
struct StalledClient {
    terminated: AtomicBool,
}

impl ClientHandle for StalledClient {
    type Error = TransportError;

    async fn deliver(&self, _data: &[u8]) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn terminate(&self) -> Result<(), TransportError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails every delivery.
struct FailingClient;

impl ClientHandle for FailingClient {
    type Error = TransportError;

    async fn deliver(&self, _data: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        )))
    }

    async fn terminate(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A client type that can be any of the fakes, so one room can mix them.
enum AnyClient {
    Recording(RecordingClient),
    Stalled(StalledClient),
    Failing(FailingClient),
}

impl ClientHandle for AnyClient {
    type Error = TransportError;

    async fn deliver(&self, data: &[u8]) -> Result<(), TransportError> {
        match self {
            Self::Recording(c) => c.deliver(data).await,
            Self::Stalled(c) => c.deliver(data).await,
            Self::Failing(c) => c.deliver(data).await,
        }
    }

    async fn terminate(&self) -> Result<(), TransportError> {
        match self {
            Self::Recording(c) => c.terminate().await,
            Self::Stalled(c) => c.terminate().await,
            Self::Failing(c) => c.terminate().await,
        }
    }
}

impl AnyClient {
    fn recording(&self) -> &RecordingClient {
        match self {
            Self::Recording(c) => c,
            _ => panic!("not a recording client"),
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn config() -> RoomConfig {
    RoomConfig {
        tick: TickConfig {
            initial_jitter_us: 0,
            ..TickConfig::default()
        },
        ..RoomConfig::default()
    }
}

fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).unwrap()
}

fn player_ids(state: &Value) -> Vec<String> {
    state["p"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

fn player_x(state: &Value, id: &str) -> f64 {
    state["p"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .unwrap()["x"]
        .as_f64()
        .unwrap()
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// =========================================================================
// Room actor
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_assigns_distinct_ids_and_welcomes_first() {
    let room = spawn_room::<RecordingClient>(code("ROOM01"), config());
    let c1 = Arc::new(RecordingClient::default());
    let c2 = Arc::new(RecordingClient::default());

    let p1 = room.join(Arc::clone(&c1), Some("ana".into())).await.unwrap();
    let p2 = room.join(Arc::clone(&c2), None).await.unwrap();
    assert_ne!(p1, p2);

    settle(200).await;

    for (client, id) in [(&c1, p1), (&c2, p2)] {
        let frames = client.frames();
        assert_eq!(frames[0]["t"], "welcome");
        assert_eq!(frames[0]["p"]["playerId"], id.to_string());
        assert_eq!(frames[0]["p"]["tickHz"], 40);
        assert!(frames[1..].iter().all(|f| f["t"] == "state"));
    }

    let state = c1.last_state();
    assert_eq!(player_ids(&state), vec![p1.to_string(), p2.to_string()]);
    let names: Vec<_> = state["p"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["ana".to_string(), format!("Player {}", p2.0)]);

    let info = room.info().await.unwrap();
    assert_eq!(info.player_count, 2);
    assert_eq!(info.status, RoomStatus::Running);
    assert!(info.tick > 0);
}

#[tokio::test(start_paused = true)]
async fn test_broadcasts_at_twenty_hz() {
    let room = spawn_room::<RecordingClient>(code("RATE20"), config());
    let client = Arc::new(RecordingClient::default());
    room.join(Arc::clone(&client), None).await.unwrap();

    settle(1000).await;

    let count = client.states().len();
    assert!((18..=22).contains(&count), "got {count} snapshots in 1s");
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_ticks_advance_by_two() {
    let room = spawn_room::<RecordingClient>(code("TICKS2"), config());
    let client = Arc::new(RecordingClient::default());
    room.join(Arc::clone(&client), None).await.unwrap();

    settle(300).await;

    let ticks: Vec<u64> = client
        .states()
        .iter()
        .map(|s| s["p"]["tick"].as_u64().unwrap())
        .collect();
    assert!(ticks.len() >= 4);
    for pair in ticks.windows(2) {
        assert_eq!(pair[1] - pair[0], 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_input_moves_player() {
    let room = spawn_room::<RecordingClient>(code("MOVEIT"), config());
    let client = Arc::new(RecordingClient::default());
    let id = room.join(Arc::clone(&client), None).await.unwrap();

    settle(60).await;
    let before = player_x(&client.last_state(), &id.to_string());

    let input = Input {
        ax: 1.0,
        ..Input::default()
    };
    assert!(room.submit_input(id, input).unwrap());
    settle(500).await;

    let after = player_x(&client.last_state(), &id.to_string());
    assert!(after > before + 50.0, "moved from {before} to {after}");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_player_commands_are_ignored() {
    let room = spawn_room::<RecordingClient>(code("GHOSTS"), config());
    let client = Arc::new(RecordingClient::default());
    room.join(Arc::clone(&client), None).await.unwrap();

    let ghost = PlayerId(99);
    assert!(room.submit_input(ghost, Input::default()).unwrap());
    room.leave(ghost).await.unwrap();

    let info = room.info().await.unwrap();
    assert_eq!(info.player_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_input_dropped_when_mailbox_full() {
    let small = RoomConfig {
        mailbox_capacity: 2,
        ..config()
    };
    let room = spawn_room::<RecordingClient>(code("FLOOD1"), small);
    let client = Arc::new(RecordingClient::default());
    let id = room.join(Arc::clone(&client), None).await.unwrap();

    // No await between submits, so the actor cannot drain the mailbox.
    let results: Vec<bool> = (0..5)
        .map(|_| room.submit_input(id, Input::default()).unwrap())
        .collect();
    assert_eq!(results, [true, true, false, false, false]);

    // Once drained, inputs are accepted again and the room keeps running.
    settle(50).await;
    assert!(room.submit_input(id, Input::default()).unwrap());
    assert_eq!(room.info().await.unwrap().player_count, 1);
}

// =========================================================================
// Leave and eviction
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leave_sends_final_snapshot_and_terminates() {
    let room = spawn_room::<RecordingClient>(code("LEAVE1"), config());
    let c1 = Arc::new(RecordingClient::default());
    let c2 = Arc::new(RecordingClient::default());
    let p1 = room.join(Arc::clone(&c1), None).await.unwrap();
    let p2 = room.join(Arc::clone(&c2), None).await.unwrap();

    settle(100).await;
    room.leave(p1).await.unwrap();
    settle(100).await;

    assert!(c1.terminated());
    assert!(!c2.terminated());
    assert_eq!(player_ids(&c1.last_state()), vec![p2.to_string()]);
    assert_eq!(player_ids(&c2.last_state()), vec![p2.to_string()]);

    let frozen = c1.frames().len();
    settle(200).await;
    assert_eq!(c1.frames().len(), frozen);
    assert_eq!(room.info().await.unwrap().player_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_client_is_evicted_without_slowing_others() {
    let room = spawn_room::<AnyClient>(code("STALL1"), config());
    let healthy = Arc::new(AnyClient::Recording(RecordingClient::default()));
    let stalled = Arc::new(AnyClient::Stalled(StalledClient::default()));
    let good_id = room.join(Arc::clone(&healthy), None).await.unwrap();
    room.join(Arc::clone(&stalled), None).await.unwrap();

    settle(1000).await;

    let states = healthy.recording().states();
    assert!(states.len() >= 18, "healthy client got {}", states.len());
    assert_eq!(player_ids(states.last().unwrap()), vec![good_id.to_string()]);
    assert_eq!(room.info().await.unwrap().player_count, 1);
    match stalled.as_ref() {
        AnyClient::Stalled(c) => assert!(c.terminated.load(Ordering::SeqCst)),
        _ => unreachable!(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_client_is_evicted() {
    let room = spawn_room::<AnyClient>(code("FAIL01"), config());
    room.join(Arc::new(AnyClient::Failing(FailingClient)), None)
        .await
        .unwrap();

    settle(200).await;

    assert_eq!(room.info().await.unwrap().player_count, 0);
}

// =========================================================================
// Stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stopped_room_is_unavailable() {
    let room = spawn_room::<RecordingClient>(code("STOP01"), config());
    let client = Arc::new(RecordingClient::default());
    room.join(Arc::clone(&client), None).await.unwrap();

    room.stop();
    room.stop();
    settle(50).await;

    assert!(room.is_closed());
    assert!(client.terminated());
    assert!(matches!(room.info().await, Err(RoomError::Unavailable(_))));
    let rejoin = room.join(Arc::new(RecordingClient::default()), None).await;
    assert!(matches!(rejoin, Err(RoomError::Unavailable(_))));
    assert!(matches!(
        room.submit_input(PlayerId(1), Input::default()),
        Err(RoomError::Unavailable(_))
    ));
}

// =========================================================================
// RoomManager
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_create_room_codes_are_unique() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let mut codes = HashSet::new();
    for _ in 0..20 {
        let room = mgr.create_room().await;
        let code = room.code().as_str().to_string();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        codes.insert(code);
    }
    assert_eq!(codes.len(), 20);
    assert_eq!(mgr.room_count().await, 20);
}

#[tokio::test(start_paused = true)]
async fn test_get_or_create_returns_same_room() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let a = mgr.get_or_create(&code("abc234")).await;
    let b = mgr.get_or_create(&code("ABC234")).await;
    assert_eq!(a.code(), b.code());
    assert_eq!(mgr.room_count().await, 1);

    a.join(Arc::new(RecordingClient::default()), None)
        .await
        .unwrap();
    assert_eq!(b.info().await.unwrap().player_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_is_reaped() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let room_code = code("REAPME");
    let room = mgr.get_or_create(&room_code).await;
    let id = room
        .join(Arc::new(RecordingClient::default()), None)
        .await
        .unwrap();

    room.leave(id).await.unwrap();
    settle(50).await;

    assert_eq!(mgr.room_count().await, 0);
    assert!(mgr.get(&room_code).await.is_none());
    assert!(room.is_closed());

    // The code is free again and maps to a brand-new match.
    let fresh = mgr.get_or_create(&room_code).await;
    assert!(!fresh.is_closed());
    assert_eq!(fresh.info().await.unwrap().player_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_room_with_players_is_not_reaped() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let room = mgr.get_or_create(&code("KEEPME")).await;
    let p1 = room
        .join(Arc::new(RecordingClient::default()), None)
        .await
        .unwrap();
    room.join(Arc::new(RecordingClient::default()), None)
        .await
        .unwrap();

    room.leave(p1).await.unwrap();
    settle(50).await;

    assert_eq!(mgr.room_count().await, 1);
    assert_eq!(room.info().await.unwrap().player_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unjoined_room_is_reaped_after_grace() {
    let mgr = RoomManager::<RecordingClient>::new(RoomConfig {
        unjoined_grace: Duration::from_secs(1),
        ..config()
    });
    let idle = mgr.create_room().await;
    let busy = mgr.create_room().await;
    busy.join(Arc::new(RecordingClient::default()), None)
        .await
        .unwrap();

    settle(900).await;
    assert_eq!(mgr.room_count().await, 2);

    settle(200).await;
    assert!(idle.is_closed());
    assert!(mgr.get(idle.code()).await.is_none());
    assert!(mgr.get(busy.code()).await.is_some());
    assert_eq!(mgr.room_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_list_rooms_sorted_with_counts() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let b = mgr.get_or_create(&code("BBBBBB")).await;
    mgr.get_or_create(&code("AAAAAA")).await;
    b.join(Arc::new(RecordingClient::default()), None)
        .await
        .unwrap();

    let rooms = mgr.list_rooms().await;
    let listed: Vec<_> = rooms
        .iter()
        .map(|r| (r.code.as_str().to_string(), r.player_count))
        .collect();
    assert_eq!(
        listed,
        vec![("AAAAAA".to_string(), 0), ("BBBBBB".to_string(), 1)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_remove_room() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let room_code = code("GONE42");
    let room = mgr.get_or_create(&room_code).await;

    mgr.remove_room(&room_code).await.unwrap();
    settle(10).await;
    assert!(room.is_closed());
    assert_eq!(mgr.room_count().await, 0);

    assert!(matches!(
        mgr.remove_room(&room_code).await,
        Err(RoomError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_every_room() {
    let mgr = RoomManager::<RecordingClient>::new(config());
    let a = mgr.create_room().await;
    let b = mgr.create_room().await;

    mgr.shutdown().await;
    settle(10).await;

    assert!(a.is_closed());
    assert!(b.is_closed());
    assert_eq!(mgr.room_count().await, 0);
}

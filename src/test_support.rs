//! Test doubles shared by unit and scenario tests.

use std::sync::Arc;
use std::time::Duration;

use actix::Actor;
use parking_lot::Mutex;

use crate::config::game::RoomTimings;
use crate::server::registry::{Connection, ConnectionRegistry};
use crate::server::room_session::manager::RoomManager;
use crate::server::room_session::messages::ServerMessage;
use crate::server::state::AppState;
use crate::game::types::Detection;
use crate::services::classifier::{ClassifierError, GestureClassifier, UnavailableClassifier};
use crate::services::events::{EventRecorder, GameEvent};

#[derive(Debug, Clone)]
enum Delivery {
    Message(ServerMessage),
    Closed,
}

/// Everything delivered to recording connections, in delivery order.
#[derive(Clone, Default)]
pub struct MessageLog {
    entries: Arc<Mutex<Vec<(String, Delivery)>>>,
}

impl MessageLog {
    pub fn recipients(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, d)| matches!(d, Delivery::Message(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn closed(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, d)| matches!(d, Delivery::Closed))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn messages_for(&self, recipient: &str) -> Vec<ServerMessage> {
        self.entries
            .lock()
            .iter()
            .filter(|(name, _)| name == recipient)
            .filter_map(|(_, d)| match d {
                Delivery::Message(msg) => Some(msg.clone()),
                Delivery::Closed => None,
            })
            .collect()
    }

    pub fn count_for(&self, recipient: &str, pred: impl Fn(&ServerMessage) -> bool) -> usize {
        self.messages_for(recipient).iter().filter(|m| pred(m)).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

pub struct RecordingConnection {
    name: String,
    log: MessageLog,
}

impl RecordingConnection {
    pub fn new(name: &str, log: MessageLog) -> Self {
        Self { name: name.to_string(), log }
    }
}

impl Connection for RecordingConnection {
    fn deliver(&self, message: ServerMessage) {
        self.log.entries.lock().push((self.name.clone(), Delivery::Message(message)));
    }

    fn close(&self, _reason: &str) {
        self.log.entries.lock().push((self.name.clone(), Delivery::Closed));
    }
}

#[derive(Default)]
pub struct RecordingRecorder {
    events: Mutex<Vec<GameEvent>>,
}

impl RecordingRecorder {
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(GameEvent::kind).collect()
    }
}

impl EventRecorder for RecordingRecorder {
    fn record(&self, event: GameEvent) {
        self.events.lock().push(event);
    }
}

/// Classifier that takes `delay` of wall time per frame, like a real model on a
/// busy machine.
pub struct SlowClassifier {
    pub delay: Duration,
    pub detection: Detection,
}

impl GestureClassifier for SlowClassifier {
    fn classify(&self, _frame: &[u8]) -> Result<Detection, ClassifierError> {
        std::thread::sleep(self.delay);
        Ok(self.detection)
    }
}

/// Application state backed by a fresh registry, a recording event sink and a
/// running room manager. Must be called inside an actix system.
pub fn test_state(timings: RoomTimings) -> (AppState, Arc<ConnectionRegistry>, Arc<RecordingRecorder>) {
    let registry = Arc::new(ConnectionRegistry::new());
    let recorder = Arc::new(RecordingRecorder::default());
    let manager = RoomManager::new(registry.clone(), recorder.clone(), timings).start();
    let state = AppState::new(
        manager,
        registry.clone(),
        Arc::new(UnavailableClassifier),
        recorder.clone(),
    );
    (state, registry, recorder)
}

/// Timings short enough for tests; the round deadline stays comfortably longer
/// than the time a test needs to submit both moves.
pub fn fast_timings() -> RoomTimings {
    RoomTimings {
        countdown_from: 3,
        countdown_tick: Duration::from_millis(5),
        round_deadline: Duration::from_millis(400),
        result_pause: Duration::from_millis(10),
        empty_room_ttl: Duration::from_secs(60),
    }
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

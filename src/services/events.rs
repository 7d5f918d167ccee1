//! Game event recording.
//!
//! Rooms post [`GameEvent`]s to an [`EventRecorder`] and never wait for the
//! result. Recording is best effort: a slow or broken store loses events, it
//! never stalls a round.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::game::types::{Gesture, GestureLabel, Outcome, ParticipantId, RoomCode};

/// Capacity of the channel between rooms and the JSON-lines writer.
const EVENT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    ThresholdReached,
    ParticipantLeft,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    RoomCreated {
        room_id: RoomCode,
    },
    ParticipantConnected {
        room_id: RoomCode,
        player_id: ParticipantId,
    },
    ParticipantDisconnected {
        room_id: RoomCode,
        player_id: ParticipantId,
    },
    GestureDetected {
        room_id: RoomCode,
        player_id: ParticipantId,
        gesture: GestureLabel,
        confidence: f32,
        processing_time_ms: f64,
    },
    MoveRecorded {
        room_id: RoomCode,
        player_id: ParticipantId,
        gesture: Gesture,
        round: u32,
    },
    RoundResult {
        room_id: RoomCode,
        round: u32,
        moves: BTreeMap<ParticipantId, Gesture>,
        result: Outcome,
        winner: Option<ParticipantId>,
        round_duration_ms: u64,
    },
    GameEnded {
        room_id: RoomCode,
        winner: Option<ParticipantId>,
        final_scores: BTreeMap<ParticipantId, u32>,
        reason: EndReason,
    },
    /// One inbound client message, timed from receipt until it was handed on.
    Communication {
        room_id: RoomCode,
        player_id: ParticipantId,
        event_type: String,
        latency_ms: f64,
        payload_size_bytes: usize,
    },
}

impl GameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::RoomCreated { .. } => "room_created",
            GameEvent::ParticipantConnected { .. } => "participant_connected",
            GameEvent::ParticipantDisconnected { .. } => "participant_disconnected",
            GameEvent::GestureDetected { .. } => "gesture_detected",
            GameEvent::MoveRecorded { .. } => "move_recorded",
            GameEvent::RoundResult { .. } => "round_result",
            GameEvent::GameEnded { .. } => "game_ended",
            GameEvent::Communication { .. } => "communication",
        }
    }
}

/// Fire-and-forget sink for game events.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: GameEvent);
}

/// Writes each event as a JSON log line under the `events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecorder;

impl EventRecorder for LogRecorder {
    fn record(&self, event: GameEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "events", "{}", json),
            Err(e) => warn!("[Events] Failed to serialize {} event: {}", event.kind(), e),
        }
    }
}

#[derive(Serialize)]
struct EventEnvelope {
    timestamp_ms: u64,
    #[serde(flatten)]
    event: GameEvent,
}

/// Appends events to a JSON-lines file from a background task.
#[derive(Clone)]
pub struct JsonLinesRecorder {
    tx: mpsc::Sender<EventEnvelope>,
}

impl JsonLinesRecorder {
    /// Start the writer task. Must be called from within a Tokio runtime.
    ///
    /// The task ends once every recorder clone has been dropped and the queue is drained.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let handle = tokio::spawn(write_events(path, rx));
        (Self { tx }, handle)
    }
}

impl EventRecorder for JsonLinesRecorder {
    fn record(&self, event: GameEvent) {
        let envelope = EventEnvelope { timestamp_ms: now_ms(), event };
        if let Err(e) = self.tx.try_send(envelope) {
            warn!("[Events] Dropping event, store unavailable: {}", e);
        }
    }
}

async fn write_events(path: PathBuf, mut rx: mpsc::Receiver<EventEnvelope>) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            warn!("[Events] Cannot open {}: {}; events will be discarded", path.display(), e);
            while rx.recv().await.is_some() {}
            return;
        }
    };
    info!("[Events] Recording game events to {}", path.display());

    while let Some(envelope) = rx.recv().await {
        let mut line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(e) => {
                warn!("[Events] Failed to serialize {} event: {}", envelope.event.kind(), e);
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!("[Events] Failed to write {} event: {}", envelope.event.kind(), e);
            continue;
        }
        if let Err(e) = file.flush().await {
            warn!("[Events] Failed to flush event log: {}", e);
        }
    }
    debug!("[Events] Event writer stopped");
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

use std::collections::BTreeMap;

use actix::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoomError;
use crate::game::types::{Detection, Gesture, GestureLabel, ParticipantId, Phase, RoundResult};
use crate::server::registry::ConnectionHandle;

// Client -> server, one variant per inbound `type`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    VideoFrame { frame: String },
    PlayerReady,
    RestartGame,
}

impl ClientMessage {
    /// Wire `type` of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::VideoFrame { .. } => "video_frame",
            ClientMessage::PlayerReady => "player_ready",
            ClientMessage::RestartGame => "restart_game",
        }
    }
}

// Server -> client, one variant per outbound `type`.
#[derive(Message, Serialize, Clone, Debug, PartialEq)]
#[rtype(result = "()")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    PlayerJoined {
        player_id: ParticipantId,
        players_count: usize,
    },
    GameStart {
        message: String,
    },
    Countdown {
        count: u32,
    },
    RoundStart {
        message: String,
    },
    GestureDetected {
        gesture: GestureLabel,
        confidence: f32,
    },
    OpponentFrame {
        frame: String,
        player_id: ParticipantId,
    },
    RoundResult {
        round: u32,
        moves: BTreeMap<ParticipantId, Gesture>,
        result: RoundResult,
        scores: BTreeMap<ParticipantId, u32>,
    },
    NextRound {
        message: String,
    },
    GameEnd {
        winner: Option<ParticipantId>,
        final_scores: BTreeMap<ParticipantId, u32>,
    },
    PlayerLeft {
        player_id: ParticipantId,
        players_count: usize,
    },
    PlayerReady {
        player_id: ParticipantId,
    },
    GameRestarted {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: &str) -> Self {
        Self::Error { message: message.to_string() }
    }
}

/// A participant's connection asks to take a seat in the room.
#[derive(Message)]
#[rtype(result = "Result<(), RoomError>")]
pub struct Connect {
    pub participant_id: ParticipantId,
    pub connection: ConnectionHandle,
}

/// A participant's connection went away.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub participant_id: ParticipantId,
    pub connection_id: Uuid,
}

/// A camera frame from a participant, already run through the classifier.
#[derive(Message)]
#[rtype(result = "()")]
pub struct FrameAnalyzed {
    pub participant_id: ParticipantId,
    /// Base64 image payload, relayed as-is to the opponent.
    pub frame: String,
    pub detection: Detection,
    pub processing_time_ms: f64,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct ReadySignal {
    pub participant_id: ParticipantId,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct RestartRequest {
    pub participant_id: ParticipantId,
}

/// Ask the session to close the socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseSession {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub phase: Phase,
    pub participants: Vec<ParticipantId>,
    pub scores: BTreeMap<ParticipantId, u32>,
}

#[derive(Message)]
#[rtype(result = "RoomSnapshot")]
pub struct GetSnapshot;

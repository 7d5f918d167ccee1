//! Error types shared by the room store, the connection registry and the room manager.

use thiserror::Error;

use crate::game::types::{ParticipantId, RoomCode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room {0} is full")]
    RoomFull(RoomCode),
    #[error("Room {0} already exists")]
    RoomAlreadyExists(RoomCode),
    #[error("Room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("Participant {0} already has a live connection; the previous one was replaced")]
    DuplicateConnection(ParticipantId),
    #[error("Participant {participant} is already in room {room}")]
    AlreadyInRoom { participant: ParticipantId, room: RoomCode },
    #[error("Room invariant violated: {0}")]
    Invariant(String),
}

impl RoomError {
    /// Stable machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomFull(_) => "ROOM_FULL",
            RoomError::RoomAlreadyExists(_) => "ROOM_ALREADY_EXISTS",
            RoomError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RoomError::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
            RoomError::AlreadyInRoom { .. } => "ALREADY_IN_ROOM",
            RoomError::Invariant(_) => "INTERNAL",
        }
    }
}

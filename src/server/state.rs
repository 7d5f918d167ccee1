// src/server/state.rs

//! Application state for the backend server.
//!
//! Holds the room manager's address and the collaborators shared by every HTTP
//! and WebSocket handler.

use std::sync::Arc;

use actix::Addr;

use crate::server::registry::ConnectionRegistry;
use crate::server::room_session::manager::RoomManager;
use crate::services::classifier::GestureClassifier;
use crate::services::events::EventRecorder;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the room manager actor (creates rooms, resolves room codes).
    pub room_manager: Addr<RoomManager>,
    /// Connection registry shared with every room.
    pub registry: Arc<ConnectionRegistry>,
    /// Gesture classifier used by participant sessions.
    pub classifier: Arc<dyn GestureClassifier>,
    /// Event sink for per-message communication records.
    pub recorder: Arc<dyn EventRecorder>,
}

impl AppState {
    pub fn new(
        room_manager: Addr<RoomManager>,
        registry: Arc<ConnectionRegistry>,
        classifier: Arc<dyn GestureClassifier>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        AppState {
            room_manager,
            registry,
            classifier,
            recorder,
        }
    }
}

// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the main backend server components, including:
//! - Application state management
//! - HTTP/WebSocket routing and room endpoints
//! - The connection registry shared by all rooms
//! - Room orchestration (room actors, round state machine, participant sessions)

pub mod state;
pub mod router;
pub mod rooms;
pub mod registry;
pub mod room_session;
pub mod ws_error;

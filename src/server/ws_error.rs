/// Centralized helpers for WebSocket and HTTP error responses.
///
/// Use these helpers so every error a client sees has the same JSON shape.
use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;

use crate::error::RoomError;
use crate::server::room_session::messages::ServerMessage;

/// Formats a WebSocket `error` message as a JSON string.
pub fn ws_error_message(message: &str) -> String {
    serde_json::to_string(&ServerMessage::error(message))
        .unwrap_or_else(|_| r#"{"type":"error","message":"Internal server error"}"#.to_string())
}

/// Returns an HTTP error response with a JSON body.
///
/// # Arguments
/// - `code`: Unique error code (e.g. "ROOM_NOT_FOUND").
/// - `message`: Human-readable error message.
/// - `status`: HTTP status code.
pub fn http_error_response(code: &str, message: &str, status: StatusCode) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "error": { "code": code, "message": message }
    }))
}

/// Maps a room error to its HTTP response.
///
/// Capacity errors are reported as they are; anything unexpected becomes a
/// generic server error.
pub fn room_error_response(err: &RoomError) -> HttpResponse {
    let status = match err {
        RoomError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        RoomError::RoomFull(_) | RoomError::AlreadyInRoom { .. } => StatusCode::CONFLICT,
        RoomError::DuplicateConnection(_) => StatusCode::CONFLICT,
        RoomError::RoomAlreadyExists(_) | RoomError::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    http_error_response(err.code(), &err.to_string(), status)
}

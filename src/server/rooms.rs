//! HTTP endpoints for room creation and room status.

use actix_web::{HttpResponse, http::StatusCode, web};
use log::{error, info};
use serde::Serialize;

use crate::config::game::MAX_PARTICIPANTS;
use crate::error::RoomError;
use crate::game::types::RoomCode;
use crate::server::room_session::manager::{CreateRoom, GetRoom};
use crate::server::room_session::messages::GetSnapshot;
use crate::server::state::AppState;
use crate::server::ws_error::{http_error_response, room_error_response};

#[derive(Serialize)]
struct CreatedRoom {
    room_id: RoomCode,
}

#[derive(Serialize)]
pub struct RoomStatus {
    pub room_id: RoomCode,
    pub players_count: usize,
    pub max_players: usize,
    pub game_state: String,
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Rock Paper Scissors Online API" }))
}

/// `POST /create-room`: create a waiting room under a fresh code.
pub async fn create_room(data: web::Data<AppState>) -> HttpResponse {
    match data.room_manager.send(CreateRoom).await {
        Ok(Ok(room_id)) => {
            info!("[Rooms] Created room {}", room_id);
            HttpResponse::Ok().json(CreatedRoom { room_id })
        }
        Ok(Err(e)) => {
            error!("[Rooms] Room creation failed: {}", e);
            room_creation_failed()
        }
        Err(e) => {
            error!("[Rooms] Room manager unreachable: {}", e);
            room_creation_failed()
        }
    }
}

fn room_creation_failed() -> HttpResponse {
    http_error_response(
        "ROOM_CREATION_FAILED",
        "Failed to create room. Please try again.",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

/// `GET /room/{room_id}/status`: occupancy and phase of a known room.
pub async fn room_status(path: web::Path<RoomCode>, data: web::Data<AppState>) -> HttpResponse {
    let room_id = path.into_inner();
    let not_found = RoomError::RoomNotFound(room_id.clone());
    let Some(players_count) = data.registry.occupancy(&room_id) else {
        return room_error_response(&not_found);
    };

    let room = match data.room_manager.send(GetRoom { code: room_id.clone() }).await {
        Ok(Ok(addr)) => addr,
        _ => return room_error_response(&not_found),
    };
    let snapshot = match room.send(GetSnapshot).await {
        Ok(snapshot) => snapshot,
        Err(_) => return room_error_response(&not_found),
    };

    HttpResponse::Ok().json(RoomStatus {
        room_id,
        players_count,
        max_players: MAX_PARTICIPANTS,
        game_state: snapshot.phase.to_string(),
    })
}

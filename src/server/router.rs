//! HTTP and WebSocket routing configuration.
//!
//! Room creation and status are plain HTTP; each participant's real-time channel
//! is handled by a dedicated WebSocket actor.

use actix_web::web;

use crate::server::room_session::session::ws_room;
use crate::server::rooms::{create_room, index, room_status};

/// Configure the application's HTTP/WebSocket routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/create-room").route(web::post().to(create_room)))
        .service(web::resource("/room/{room_id}/status").route(web::get().to(room_status)))
        .service(web::resource("/ws/{room_id}/{player_id}").to(ws_room));
}

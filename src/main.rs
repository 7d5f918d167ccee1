//! Main entry point for the backend server.
//!
//! Initializes the actor system, configures application state, and launches the HTTP server
//! with the room endpoints and the per-participant WebSocket endpoint.

use std::sync::Arc;

use actix::Actor;
use actix_web::{App, HttpServer, web};
use log::info;

use config::game::RoomTimings;
use config::server::ServerConfig;
use server::registry::ConnectionRegistry;
use server::room_session::manager::RoomManager;
use services::classifier::{GestureClassifier, UnavailableClassifier};
use services::events::{EventRecorder, JsonLinesRecorder, LogRecorder};

pub mod config;
mod error;
mod game;
mod server;
mod services;

#[cfg(test)]
mod test_support;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();

    // Game events go to a JSON-lines file when configured, to the log otherwise.
    let recorder: Arc<dyn EventRecorder> = match &config.event_log_path {
        Some(path) => Arc::new(JsonLinesRecorder::spawn(path.clone()).0),
        None => Arc::new(LogRecorder),
    };
    // No vision backend is bundled; plug a real classifier in here.
    let classifier: Arc<dyn GestureClassifier> = Arc::new(UnavailableClassifier);
    let registry = Arc::new(ConnectionRegistry::new());

    // Start the RoomManager actor (creates rooms, one RoomSession actor each).
    let room_manager = RoomManager::new(registry.clone(), recorder.clone(), RoomTimings::default()).start();

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(room_manager, registry, classifier, recorder));

    info!("[Main] Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state.clone())
            .configure(crate::server::router::config)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

//! Room manager actor.
//!
//! Creates rooms (one [`RoomSession`] actor each), hands out their addresses and
//! forgets them once they stop.

use std::collections::HashMap;
use std::sync::Arc;

use actix::prelude::*;
use log::{debug, info};
use rand::prelude::IndexedRandom;

use crate::config::game::{ROOM_CODE_LEN, RoomTimings};
use crate::error::RoomError;
use crate::game::types::RoomCode;
use crate::server::registry::ConnectionRegistry;
use crate::server::room_session::server::RoomSession;
use crate::services::events::{EventRecorder, GameEvent};

const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random room code of uppercase letters and digits.
pub fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .filter_map(|_| ROOM_CODE_CHARSET.choose(&mut rng).map(|b| *b as char))
        .collect()
}

pub struct RoomManager {
    rooms: HashMap<RoomCode, Addr<RoomSession>>,
    registry: Arc<ConnectionRegistry>,
    recorder: Arc<dyn EventRecorder>,
    timings: RoomTimings,
}

impl RoomManager {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        recorder: Arc<dyn EventRecorder>,
        timings: RoomTimings,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            registry,
            recorder,
            timings,
        }
    }

    /// Create a room under `code`. Collisions are reported, not retried.
    pub fn create_room(&mut self, code: RoomCode, ctx: &mut Context<Self>) -> Result<RoomCode, RoomError> {
        if self.rooms.contains_key(&code) {
            return Err(RoomError::RoomAlreadyExists(code));
        }
        self.registry.open_room(&code)?;

        let session = RoomSession::new(
            code.clone(),
            self.registry.clone(),
            self.recorder.clone(),
            self.timings,
            ctx.address(),
        )
        .start();
        self.rooms.insert(code.clone(), session);
        self.recorder.record(GameEvent::RoomCreated { room_id: code.clone() });
        info!("[RoomManager] Room {} created ({} active)", code, self.rooms.len());
        Ok(code)
    }
}

impl Actor for RoomManager {
    type Context = Context<Self>;
}

/// Create a room under a freshly generated code.
#[derive(Message)]
#[rtype(result = "Result<RoomCode, RoomError>")]
pub struct CreateRoom;

impl Handler<CreateRoom> for RoomManager {
    type Result = Result<RoomCode, RoomError>;

    fn handle(&mut self, _msg: CreateRoom, ctx: &mut Context<Self>) -> Self::Result {
        self.create_room(generate_room_code(), ctx)
    }
}

#[derive(Message)]
#[rtype(result = "Result<Addr<RoomSession>, RoomError>")]
pub struct GetRoom {
    pub code: RoomCode,
}

impl Handler<GetRoom> for RoomManager {
    type Result = Result<Addr<RoomSession>, RoomError>;

    fn handle(&mut self, msg: GetRoom, _: &mut Context<Self>) -> Self::Result {
        self.rooms
            .get(&msg.code)
            .filter(|addr| addr.connected())
            .cloned()
            .ok_or(RoomError::RoomNotFound(msg.code))
    }
}

/// Sent by a room actor when it stops.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RoomClosed {
    pub code: RoomCode,
}

impl Handler<RoomClosed> for RoomManager {
    type Result = ();

    fn handle(&mut self, msg: RoomClosed, _: &mut Context<Self>) -> Self::Result {
        if self.rooms.remove(&msg.code).is_some() {
            debug!("[RoomManager] Room {} removed ({} active)", msg.code, self.rooms.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_codes_are_uppercase_alphanumeric() {
        for _ in 0..100 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}

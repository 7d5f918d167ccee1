//! Connection registry.
//!
//! Maps participants to their live connection and to the room they sit in, and
//! keeps each room's slots in join order. Every room actor and every HTTP handler
//! shares one registry, so all maps sit behind a single read/write lock: joins are
//! check-and-insert under the write lock, sends only take the read lock.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::game::MAX_PARTICIPANTS;
use crate::error::RoomError;
use crate::game::types::{ParticipantId, RoomCode};
use crate::server::room_session::messages::ServerMessage;

/// Outbound side of one participant's connection.
pub trait Connection: Send + Sync {
    /// Queue a message for the participant. Must not block and must not fail loudly
    /// when the peer is already gone.
    fn deliver(&self, message: ServerMessage);

    /// Ask the connection to close itself.
    fn close(&self, reason: &str);
}

/// A registered connection together with the identity used to tell it apart from
/// a later connection of the same participant.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    inner: Arc<dyn Connection>,
}

impl ConnectionHandle {
    pub fn new(connection: impl Connection + 'static) -> Self {
        Self { id: Uuid::new_v4(), inner: Arc::new(connection) }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deliver(&self, message: ServerMessage) {
        self.inner.deliver(message);
    }

    pub fn close(&self, reason: &str) {
        self.inner.close(reason);
    }
}

#[derive(Default)]
struct RegistryMaps {
    connections: HashMap<ParticipantId, ConnectionHandle>,
    memberships: HashMap<ParticipantId, RoomCode>,
    /// Known rooms and their occupied slots, in join order.
    rooms: HashMap<RoomCode, Vec<ParticipantId>>,
}

impl RegistryMaps {
    fn vacate(&mut self, participant: &str) -> Option<RoomCode> {
        let room = self.memberships.remove(participant)?;
        if let Some(slots) = self.rooms.get_mut(&room) {
            slots.retain(|p| p != participant);
        }
        Some(room)
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    maps: RwLock<RegistryMaps>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a freshly created room known, with no occupied slots.
    pub fn open_room(&self, room: &str) -> Result<(), RoomError> {
        let mut maps = self.maps.write();
        if maps.rooms.contains_key(room) {
            return Err(RoomError::RoomAlreadyExists(room.to_string()));
        }
        maps.rooms.insert(room.to_string(), Vec::with_capacity(MAX_PARTICIPANTS));
        Ok(())
    }

    /// Forget a torn-down room. Anyone still seated loses their slot and their
    /// connection is closed.
    pub fn close_room(&self, room: &str) {
        let evicted: Vec<ConnectionHandle> = {
            let mut maps = self.maps.write();
            let Some(slots) = maps.rooms.remove(room) else {
                return;
            };
            slots
                .iter()
                .filter_map(|participant| {
                    maps.memberships.remove(participant);
                    maps.connections.remove(participant)
                })
                .collect()
        };
        for handle in evicted {
            handle.close("Room closed");
        }
        info!("[Registry] Room {} closed", room);
    }

    /// Record a participant's live connection.
    ///
    /// The latest registration wins: a previous handle is dropped (not closed) and
    /// `DuplicateConnection` tells the caller that happened.
    pub fn register(&self, participant: &str, handle: ConnectionHandle) -> Result<(), RoomError> {
        let previous = self.maps.write().connections.insert(participant.to_string(), handle);
        match previous {
            Some(_) => Err(RoomError::DuplicateConnection(participant.to_string())),
            None => Ok(()),
        }
    }

    /// Remove a participant's connection and slot. Returns the room they left.
    pub fn unregister(&self, participant: &str) -> Option<RoomCode> {
        let mut maps = self.maps.write();
        maps.connections.remove(participant);
        maps.vacate(participant)
    }

    /// Like [`unregister`](Self::unregister), but only when `connection_id` is still
    /// the participant's registered connection. A connection that was superseded
    /// and closes late leaves its replacement untouched and yields `None`.
    pub fn unregister_connection(&self, participant: &str, connection_id: Uuid) -> Option<RoomCode> {
        let mut maps = self.maps.write();
        let is_current = maps
            .connections
            .get(participant)
            .is_some_and(|handle| handle.id() == connection_id);
        if !is_current {
            debug!("[Registry] Ignoring stale disconnect for {}", participant);
            return None;
        }
        maps.connections.remove(participant);
        maps.vacate(participant)
    }

    /// Seat a participant in the room's next free slot.
    ///
    /// Returns `Ok(false)` if they already sit in this room.
    pub fn join_room(&self, participant: &str, room: &str) -> Result<bool, RoomError> {
        let mut maps = self.maps.write();
        match maps.memberships.get(participant) {
            Some(current) if current == room => return Ok(false),
            Some(current) => {
                return Err(RoomError::AlreadyInRoom {
                    participant: participant.to_string(),
                    room: current.clone(),
                });
            }
            None => {}
        }
        let slots = maps
            .rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::RoomNotFound(room.to_string()))?;
        if slots.len() >= MAX_PARTICIPANTS {
            return Err(RoomError::RoomFull(room.to_string()));
        }
        slots.push(participant.to_string());
        maps.memberships.insert(participant.to_string(), room.to_string());
        Ok(true)
    }

    /// Best-effort send; silently dropped when the participant has no live connection.
    pub fn send_to(&self, participant: &str, message: ServerMessage) {
        let maps = self.maps.read();
        match maps.connections.get(participant) {
            Some(handle) => handle.deliver(message),
            None => debug!("[Registry] No live connection for {}, message dropped", participant),
        }
    }

    /// Send to every occupied slot of the room, in slot order, except `excluding`.
    pub fn broadcast(&self, room: &str, message: ServerMessage, excluding: Option<&str>) {
        let maps = self.maps.read();
        let Some(slots) = maps.rooms.get(room) else {
            return;
        };
        for participant in slots {
            if excluding == Some(participant.as_str()) {
                continue;
            }
            if let Some(handle) = maps.connections.get(participant) {
                handle.deliver(message.clone());
            }
        }
    }

    /// Number of occupied slots, or `None` if the room is unknown.
    pub fn occupancy(&self, room: &str) -> Option<usize> {
        self.maps.read().rooms.get(room).map(Vec::len)
    }

    #[cfg(test)]
    pub fn participants(&self, room: &str) -> Option<Vec<ParticipantId>> {
        self.maps.read().rooms.get(room).cloned()
    }

    #[cfg(test)]
    pub fn is_connected(&self, participant: &str) -> bool {
        self.maps.read().connections.contains_key(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MessageLog, RecordingConnection};
    use std::thread;

    fn connect(registry: &ConnectionRegistry, log: &MessageLog, participant: &str) -> ConnectionHandle {
        let handle = ConnectionHandle::new(RecordingConnection::new(participant, log.clone()));
        registry.register(participant, handle.clone()).unwrap();
        handle
    }

    #[test]
    fn test_join_fills_two_slots_then_rejects() {
        let registry = ConnectionRegistry::new();
        registry.open_room("ROOM0001").unwrap();
        assert_eq!(registry.join_room("alice", "ROOM0001"), Ok(true));
        assert_eq!(registry.join_room("alice", "ROOM0001"), Ok(false));
        assert_eq!(registry.join_room("bob", "ROOM0001"), Ok(true));
        assert_eq!(
            registry.join_room("carol", "ROOM0001"),
            Err(RoomError::RoomFull("ROOM0001".to_string()))
        );
        assert_eq!(registry.occupancy("ROOM0001"), Some(2));
        assert_eq!(
            registry.participants("ROOM0001").unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn test_join_unknown_room_or_second_room_fails() {
        let registry = ConnectionRegistry::new();
        registry.open_room("ROOM0001").unwrap();
        registry.open_room("ROOM0002").unwrap();
        assert_eq!(
            registry.join_room("alice", "NOPE0000"),
            Err(RoomError::RoomNotFound("NOPE0000".to_string()))
        );
        registry.join_room("alice", "ROOM0001").unwrap();
        assert!(matches!(
            registry.join_room("alice", "ROOM0002"),
            Err(RoomError::AlreadyInRoom { .. })
        ));
        assert_eq!(
            registry.open_room("ROOM0001"),
            Err(RoomError::RoomAlreadyExists("ROOM0001".to_string()))
        );
    }

    #[test]
    fn test_concurrent_joins_never_overfill() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry.open_room("ROOM0001").unwrap();
        let workers: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || registry.join_room(&format!("p{i}"), "ROOM0001"))
            })
            .collect();
        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), MAX_PARTICIPANTS);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(RoomError::RoomFull(_)))));
        assert_eq!(registry.occupancy("ROOM0001"), Some(MAX_PARTICIPANTS));
    }

    #[test]
    fn test_broadcast_is_slot_ordered_and_honours_exclusion() {
        let registry = ConnectionRegistry::new();
        let log = MessageLog::default();
        registry.open_room("ROOM0001").unwrap();
        connect(&registry, &log, "bob");
        connect(&registry, &log, "alice");
        registry.join_room("bob", "ROOM0001").unwrap();
        registry.join_room("alice", "ROOM0001").unwrap();

        registry.broadcast("ROOM0001", ServerMessage::Countdown { count: 3 }, None);
        assert_eq!(log.recipients(), ["bob", "alice"]);

        log.clear();
        registry.broadcast("ROOM0001", ServerMessage::Countdown { count: 2 }, Some("bob"));
        assert_eq!(log.recipients(), ["alice"]);
    }

    #[test]
    fn test_send_to_unknown_participant_is_silent() {
        let registry = ConnectionRegistry::new();
        registry.send_to("ghost", ServerMessage::Countdown { count: 1 });
    }

    #[test]
    fn test_duplicate_registration_replaces_previous_handle() {
        let registry = ConnectionRegistry::new();
        let log = MessageLog::default();
        let first = connect(&registry, &log, "alice");
        let second = ConnectionHandle::new(RecordingConnection::new("alice-2", log.clone()));
        assert_eq!(
            registry.register("alice", second.clone()),
            Err(RoomError::DuplicateConnection("alice".to_string()))
        );
        registry.send_to("alice", ServerMessage::Countdown { count: 1 });
        assert_eq!(log.recipients(), ["alice-2"]);

        // The superseded connection closing late must not evict the new one.
        registry.open_room("ROOM0001").unwrap();
        registry.join_room("alice", "ROOM0001").unwrap();
        assert_eq!(registry.unregister_connection("alice", first.id()), None);
        assert!(registry.is_connected("alice"));
        assert_eq!(
            registry.unregister_connection("alice", second.id()),
            Some("ROOM0001".to_string())
        );
        assert!(!registry.is_connected("alice"));
        assert_eq!(registry.occupancy("ROOM0001"), Some(0));
    }

    #[test]
    fn test_unregister_vacates_slot() {
        let registry = ConnectionRegistry::new();
        let log = MessageLog::default();
        registry.open_room("ROOM0001").unwrap();
        connect(&registry, &log, "alice");
        registry.join_room("alice", "ROOM0001").unwrap();
        assert_eq!(registry.unregister("alice"), Some("ROOM0001".to_string()));
        assert_eq!(registry.unregister("alice"), None);
        assert!(!registry.is_connected("alice"));
        assert_eq!(registry.join_room("alice", "ROOM0001"), Ok(true));
        assert_eq!(registry.occupancy("ROOM0001"), Some(0));
    }

    #[test]
    fn test_close_room_evicts_and_closes_connections() {
        let registry = ConnectionRegistry::new();
        let log = MessageLog::default();
        registry.open_room("ROOM0001").unwrap();
        connect(&registry, &log, "alice");
        registry.join_room("alice", "ROOM0001").unwrap();
        registry.close_room("ROOM0001");
        assert_eq!(registry.occupancy("ROOM0001"), None);
        assert!(!registry.is_connected("alice"));
        assert_eq!(log.closed(), ["alice"]);
    }
}

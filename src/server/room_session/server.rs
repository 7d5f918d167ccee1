//! Room actor.
//!
//! One `RoomSession` per room owns that room's [`Room`] state and its timers.
//! Everything that mutates a room goes through this actor's mailbox, so rooms run
//! in parallel without sharing any lock except the connection registry's.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use log::{debug, error, info, warn};

use crate::config::game::{MIN_MOVE_CONFIDENCE, RoomTimings};
use crate::error::RoomError;
use crate::game::room::Room;
use crate::game::types::{ParticipantId, Phase, RoomCode};
use crate::server::registry::ConnectionRegistry;
use crate::server::room_session::manager::{RoomClosed, RoomManager};
use crate::server::room_session::messages::{
    Connect, Disconnect, FrameAnalyzed, GetSnapshot, ReadySignal, RestartRequest, RoomSnapshot,
    ServerMessage,
};
use crate::server::room_session::rounds;
use crate::services::events::{EndReason, EventRecorder, GameEvent};

pub struct RoomSession {
    pub(super) room: Room,
    pub(super) registry: Arc<ConnectionRegistry>,
    pub(super) recorder: Arc<dyn EventRecorder>,
    pub(super) timings: RoomTimings,
    manager: Addr<RoomManager>,

    /// Bumped whenever pending timers must stop mattering (new phase, teardown).
    pub(super) epoch: u64,
    pub(super) timer: Option<SpawnHandle>,
    pub(super) round_started_at: Option<Instant>,
}

impl RoomSession {
    pub fn new(
        code: RoomCode,
        registry: Arc<ConnectionRegistry>,
        recorder: Arc<dyn EventRecorder>,
        timings: RoomTimings,
        manager: Addr<RoomManager>,
    ) -> Self {
        Self {
            room: Room::new(code),
            registry,
            recorder,
            timings,
            manager,
            epoch: 0,
            timer: None,
            round_started_at: None,
        }
    }

    pub fn code(&self) -> &str {
        self.room.code()
    }

    pub(super) fn broadcast(&self, msg: ServerMessage) {
        self.registry.broadcast(self.room.code(), msg, None);
    }

    pub(super) fn record(&self, event: GameEvent) {
        self.recorder.record(event);
    }

    /// Run `f` after `delay` unless the room moves on first.
    ///
    /// Only one phase timer is pending at a time; scheduling replaces it. A timer
    /// that fires after [`cancel_timers`](Self::cancel_timers) or a newer schedule is
    /// a no-op.
    pub(super) fn schedule<F>(&mut self, ctx: &mut Context<Self>, delay: Duration, f: F)
    where
        F: FnOnce(&mut Self, &mut Context<Self>) + 'static,
    {
        self.cancel_timers(ctx);
        let epoch = self.epoch;
        let handle = ctx.run_later(delay, move |act, ctx| {
            if act.epoch != epoch {
                debug!("[RoomSession] {} stale timer ignored", act.room.code());
                return;
            }
            act.timer = None;
            f(act, ctx);
        });
        self.timer = Some(handle);
    }

    pub(super) fn cancel_timers(&mut self, ctx: &mut Context<Self>) {
        self.epoch += 1;
        if let Some(handle) = self.timer.take() {
            ctx.cancel_future(handle);
        }
    }

    /// Tear this room down after an unrecoverable state error. Other rooms carry on.
    pub(super) fn fail(&mut self, ctx: &mut Context<Self>, err: RoomError) {
        error!("[RoomSession] {} torn down: {}", self.room.code(), err);
        self.cancel_timers(ctx);
        self.broadcast(ServerMessage::error("Internal server error, the room has been closed."));
        ctx.stop();
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            phase: self.room.phase(),
            participants: self.room.participants().to_vec(),
            scores: self.room.scores(),
        }
    }

    fn participant_left(&mut self, ctx: &mut Context<Self>, participant: ParticipantId) {
        self.room.remove_participant(&participant);
        self.record(GameEvent::ParticipantDisconnected {
            room_id: self.room.code().to_string(),
            player_id: participant.clone(),
        });

        match self.room.phase() {
            Phase::Waiting | Phase::Finished => {}
            _ => {
                info!("[RoomSession] {} abandoned by {}", self.room.code(), participant);
                self.cancel_timers(ctx);
                self.room.set_phase(Phase::Finished);
                self.record(GameEvent::GameEnded {
                    room_id: self.room.code().to_string(),
                    winner: None,
                    final_scores: self.room.scores(),
                    reason: EndReason::ParticipantLeft,
                });
            }
        }

        let players_count = self.room.participant_count();
        self.broadcast(ServerMessage::PlayerLeft { player_id: participant, players_count });

        if players_count == 0 {
            info!("[RoomSession] {} is empty, tearing down", self.room.code());
            ctx.stop();
        }
    }
}

impl Actor for RoomSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[RoomSession] {} started", self.room.code());
        // Rooms nobody ever joins are reclaimed.
        ctx.run_later(self.timings.empty_room_ttl, |act, ctx| {
            if act.room.participant_count() == 0 {
                info!("[RoomSession] {} idle with no participants, tearing down", act.room.code());
                ctx.stop();
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.epoch += 1;
        self.registry.close_room(self.room.code());
        self.manager.do_send(RoomClosed { code: self.room.code().to_string() });
        info!("[RoomSession] {} stopped", self.room.code());
    }
}

impl Handler<Connect> for RoomSession {
    type Result = Result<(), RoomError>;

    fn handle(&mut self, msg: Connect, ctx: &mut Context<Self>) -> Self::Result {
        let Connect { participant_id, connection } = msg;
        let code = self.room.code().to_string();

        let newly_joined = match self.registry.join_room(&participant_id, &code) {
            Ok(newly_joined) => newly_joined,
            Err(e) => {
                warn!("[RoomSession] {} rejected {}: {}", code, participant_id, e);
                return Err(e);
            }
        };
        if let Err(e) = self.registry.register(&participant_id, connection) {
            warn!("[RoomSession] {}: {}", code, e);
        }
        if !newly_joined {
            debug!("[RoomSession] {} reconnected to {}", participant_id, code);
            return Ok(());
        }

        if let Err(e) = self.room.add_participant(participant_id.clone()) {
            // Registry and room disagree on occupancy: this room can't be trusted.
            self.registry.unregister(&participant_id);
            self.fail(ctx, RoomError::Invariant(format!("join of {participant_id} failed: {e}")));
            return Err(e);
        }
        info!("[RoomSession] {} joined {}", participant_id, code);
        self.record(GameEvent::ParticipantConnected {
            room_id: code,
            player_id: participant_id.clone(),
        });

        self.broadcast(ServerMessage::PlayerJoined {
            player_id: participant_id,
            players_count: self.room.participant_count(),
        });

        if self.room.is_full() && self.room.phase() == Phase::Waiting {
            rounds::begin_game(self, ctx);
        }
        Ok(())
    }
}

impl Handler<Disconnect> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Context<Self>) -> Self::Result {
        match self.registry.unregister_connection(&msg.participant_id, msg.connection_id) {
            Some(room) if room == self.room.code() => self.participant_left(ctx, msg.participant_id),
            Some(room) => warn!(
                "[RoomSession] {} got disconnect for {} seated in {}",
                self.room.code(),
                msg.participant_id,
                room
            ),
            None => {}
        }
    }
}

impl Handler<FrameAnalyzed> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: FrameAnalyzed, ctx: &mut Context<Self>) -> Self::Result {
        let FrameAnalyzed { participant_id, frame, detection, processing_time_ms } = msg;
        if !self.room.contains(&participant_id) {
            return;
        }

        self.registry.send_to(
            &participant_id,
            ServerMessage::GestureDetected {
                gesture: detection.gesture,
                confidence: detection.confidence,
            },
        );
        self.record(GameEvent::GestureDetected {
            room_id: self.room.code().to_string(),
            player_id: participant_id.clone(),
            gesture: detection.gesture,
            confidence: detection.confidence,
            processing_time_ms,
        });

        if self.room.phase() == Phase::Collecting {
            if let Some(gesture) = detection.as_move(MIN_MOVE_CONFIDENCE) {
                rounds::submit_move(self, ctx, &participant_id, gesture);
            }
        }

        self.registry.broadcast(
            self.room.code(),
            ServerMessage::OpponentFrame { frame, player_id: participant_id.clone() },
            Some(&participant_id),
        );
    }
}

impl Handler<ReadySignal> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: ReadySignal, ctx: &mut Context<Self>) -> Self::Result {
        if !self.room.mark_ready(&msg.participant_id) {
            return;
        }
        self.broadcast(ServerMessage::PlayerReady { player_id: msg.participant_id });
        if self.room.phase() == Phase::Finished && self.room.all_ready() {
            rounds::restart(self, ctx);
        }
    }
}

impl Handler<RestartRequest> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: RestartRequest, ctx: &mut Context<Self>) -> Self::Result {
        if !self.room.contains(&msg.participant_id) {
            return;
        }
        debug!("[RoomSession] {} restart requested by {}", self.room.code(), msg.participant_id);
        rounds::restart(self, ctx);
    }
}

impl Handler<GetSnapshot> for RoomSession {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

/// Slip a move from someone without a seat into the open round, then evaluate it.
#[cfg(test)]
#[derive(Message)]
#[rtype(result = "()")]
pub struct CorruptRound;

#[cfg(test)]
impl Handler<CorruptRound> for RoomSession {
    type Result = ();

    fn handle(&mut self, _msg: CorruptRound, ctx: &mut Context<Self>) -> Self::Result {
        self.room.force_move("intruder", crate::game::types::Gesture::Rock);
        rounds::evaluate(self, ctx);
    }
}

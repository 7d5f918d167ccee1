//! Round state machine for a RoomSession.
//! Drives countdown -> collecting -> evaluating -> next round / finished, with one
//! pending timer at a time.

use std::collections::BTreeMap;
use std::time::Instant;

use actix::prelude::*;
use log::{debug, info};

use crate::game::room::MoveReceipt;
use crate::game::types::{Gesture, Phase};
use crate::server::room_session::messages::ServerMessage;
use crate::server::room_session::server::RoomSession;
use crate::services::events::{EndReason, GameEvent};

/// Second participant arrived: announce the game and start the first countdown.
pub fn begin_game(this: &mut RoomSession, ctx: &mut Context<RoomSession>) {
    info!("[Rounds] {} game starting", this.code());
    this.broadcast(ServerMessage::GameStart { message: "Game starting! Get ready...".to_string() });
    start_countdown(this, ctx);
}

/// Enter COUNTDOWN and announce the first tick.
pub fn start_countdown(this: &mut RoomSession, ctx: &mut Context<RoomSession>) {
    this.room.set_phase(Phase::Countdown);
    let from = this.timings.countdown_from;
    countdown_tick(this, ctx, from);
}

fn countdown_tick(this: &mut RoomSession, ctx: &mut Context<RoomSession>, count: u32) {
    if count == 0 {
        start_round(this, ctx);
        return;
    }
    this.broadcast(ServerMessage::Countdown { count });
    let tick = this.timings.countdown_tick;
    this.schedule(ctx, tick, move |act, ctx| countdown_tick(act, ctx, count - 1));
}

/// Open move collection, bounded by the round deadline.
pub fn start_round(this: &mut RoomSession, ctx: &mut Context<RoomSession>) {
    this.room.start_collecting();
    this.round_started_at = Some(Instant::now());
    this.broadcast(ServerMessage::RoundStart { message: "Show your move!".to_string() });

    let deadline = this.timings.round_deadline;
    this.schedule(ctx, deadline, |act, ctx| {
        debug!("[Rounds] {} round {} deadline reached", act.code(), act.room.round());
        evaluate(act, ctx);
    });
}

/// Record a confident move. The second move of the round evaluates it right away.
pub fn submit_move(
    this: &mut RoomSession,
    ctx: &mut Context<RoomSession>,
    participant: &str,
    gesture: Gesture,
) {
    let receipt = this.room.record_move(participant, gesture);
    if receipt == MoveReceipt::Ignored {
        return;
    }
    debug!("[Rounds] {} {} played {}", this.code(), participant, gesture);
    this.record(GameEvent::MoveRecorded {
        room_id: this.code().to_string(),
        player_id: participant.to_string(),
        gesture,
        round: this.room.round(),
    });
    if receipt == MoveReceipt::RoundComplete {
        this.cancel_timers(ctx);
        evaluate(this, ctx);
    }
}

/// Evaluate the current round. Whichever of deadline or completion gets here
/// second finds the round already evaluated and does nothing.
pub fn evaluate(this: &mut RoomSession, ctx: &mut Context<RoomSession>) {
    let summary = match this.room.evaluate_round() {
        Ok(Some(summary)) => summary,
        Ok(None) => return,
        Err(e) => {
            this.fail(ctx, e);
            return;
        }
    };
    let scores = this.room.scores();
    let round_duration_ms = this
        .round_started_at
        .take()
        .map(|started| started.elapsed().as_millis() as u64)
        .unwrap_or(0);
    info!(
        "[Rounds] {} round {} -> {:?} (winner: {:?})",
        this.code(),
        summary.round,
        summary.result.outcome,
        summary.result.winner
    );

    let moves = summary.moves.into_iter().collect::<BTreeMap<_, _>>();
    this.record(GameEvent::RoundResult {
        room_id: this.code().to_string(),
        round: summary.round,
        moves: moves.clone(),
        result: summary.result.outcome,
        winner: summary.result.winner.clone(),
        round_duration_ms,
    });
    this.broadcast(ServerMessage::RoundResult {
        round: summary.round,
        moves,
        result: summary.result,
        scores,
    });

    let pause = this.timings.result_pause;
    this.schedule(ctx, pause, after_result_pause);
}

fn after_result_pause(this: &mut RoomSession, ctx: &mut Context<RoomSession>) {
    if this.room.game_over() {
        finish(this);
        return;
    }
    this.room.reset_for_next_round();
    this.broadcast(ServerMessage::NextRound { message: "Get ready for next round!".to_string() });
    start_countdown(this, ctx);
}

/// Someone reached the win threshold.
fn finish(this: &mut RoomSession) {
    // Readiness from here on means "rematch".
    this.room.reset_for_next_round();
    this.room.set_phase(Phase::Finished);
    let winner = this.room.match_winner();
    let final_scores = this.room.scores();
    info!("[Rounds] {} game over, winner: {:?}", this.code(), winner);
    this.record(GameEvent::GameEnded {
        room_id: this.code().to_string(),
        winner: winner.clone(),
        final_scores: final_scores.clone(),
        reason: EndReason::ThresholdReached,
    });
    this.broadcast(ServerMessage::GameEnd { winner, final_scores });
}

/// Rematch: only from FINISHED with both seats taken. Scores carry over.
pub fn restart(this: &mut RoomSession, ctx: &mut Context<RoomSession>) {
    if this.room.phase() != Phase::Finished || !this.room.is_full() {
        debug!("[Rounds] {} restart ignored in phase {}", this.code(), this.room.phase());
        return;
    }
    this.room.restart();
    info!("[Rounds] {} restarted", this.code());
    this.broadcast(ServerMessage::GameRestarted { message: "Game restarted! Get ready...".to_string() });
    start_countdown(this, ctx);
}

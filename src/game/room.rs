//! Per-room game state.
//!
//! A [`Room`] is owned by exactly one room actor, which is the only code that
//! mutates it. The struct knows nothing about timers or connections: the round
//! state machine decides *when* to call these operations, the room decides
//! *whether* they apply.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::config::game::{MAX_PARTICIPANTS, WIN_THRESHOLD};
use crate::error::RoomError;
use crate::game::rules::judge;
use crate::game::types::{Gesture, ParticipantId, Phase, RoomCode, RoundResult};

/// What happened to a submitted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveReceipt {
    /// Out of phase, unknown participant or second move in the same round.
    Ignored,
    /// Recorded; other participants still have to move.
    Recorded,
    /// Recorded and every participant has now moved.
    RoundComplete,
}

/// Everything the state machine needs to announce an evaluated round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: u32,
    /// Moves in slot order.
    pub moves: Vec<(ParticipantId, Gesture)>,
    pub result: RoundResult,
}

#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    phase: Phase,
    slots: Vec<ParticipantId>,
    moves: HashMap<ParticipantId, Gesture>,
    ready: HashSet<ParticipantId>,
    scores: HashMap<ParticipantId, u32>,
    // Cumulative scores when the current match started. Restarts keep the tally.
    match_base: HashMap<ParticipantId, u32>,
    round: u32,
    evaluated: bool,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            phase: Phase::Waiting,
            slots: Vec::with_capacity(MAX_PARTICIPANTS),
            moves: HashMap::new(),
            ready: HashSet::new(),
            scores: HashMap::new(),
            match_base: HashMap::new(),
            round: 0,
            evaluated: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        debug!("[Room] {} phase {} -> {}", self.code, self.phase, phase);
        self.phase = phase;
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[ParticipantId] {
        &self.slots
    }

    pub fn participant_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= MAX_PARTICIPANTS
    }

    pub fn contains(&self, participant: &str) -> bool {
        self.slots.iter().any(|p| p == participant)
    }

    /// Current round number, 1-based once the first round has started.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Seat a participant in the next free slot.
    ///
    /// Returns `Ok(false)` when the participant is already seated.
    pub fn add_participant(&mut self, participant: ParticipantId) -> Result<bool, RoomError> {
        if self.contains(&participant) {
            return Ok(false);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        self.scores.insert(participant.clone(), 0);
        self.match_base.insert(participant.clone(), 0);
        self.slots.push(participant);
        Ok(true)
    }

    /// Vacate a participant's slot. Their move, readiness and score go with them.
    pub fn remove_participant(&mut self, participant: &str) -> bool {
        let before = self.slots.len();
        self.slots.retain(|p| p != participant);
        self.moves.remove(participant);
        self.ready.remove(participant);
        self.scores.remove(participant);
        self.match_base.remove(participant);
        self.slots.len() != before
    }

    /// Open move collection for a new round.
    pub fn start_collecting(&mut self) {
        self.round += 1;
        self.moves.clear();
        self.evaluated = false;
        self.set_phase(Phase::Collecting);
    }

    /// Record a participant's move for the current round. First move wins.
    pub fn record_move(&mut self, participant: &str, gesture: Gesture) -> MoveReceipt {
        if self.phase != Phase::Collecting || self.evaluated {
            return MoveReceipt::Ignored;
        }
        if !self.contains(participant) || self.moves.contains_key(participant) {
            return MoveReceipt::Ignored;
        }
        self.moves.insert(participant.to_string(), gesture);
        if self.moves.len() >= self.slots.len() {
            MoveReceipt::RoundComplete
        } else {
            MoveReceipt::Recorded
        }
    }

    #[cfg(test)]
    pub fn move_of(&self, participant: &str) -> Option<Gesture> {
        self.moves.get(participant).copied()
    }

    /// Store a move with none of the checks `record_move` applies.
    #[cfg(test)]
    pub fn force_move(&mut self, participant: &str, gesture: Gesture) {
        self.moves.insert(participant.to_string(), gesture);
    }

    /// Evaluate the current round, at most once.
    ///
    /// Returns `Ok(None)` when the round was already evaluated or collection is not
    /// open: the deadline and the second move race for this call and only the first
    /// caller gets a summary.
    pub fn evaluate_round(&mut self) -> Result<Option<RoundSummary>, RoomError> {
        if self.phase != Phase::Collecting || self.evaluated {
            return Ok(None);
        }
        if self.moves.len() > self.slots.len() {
            return Err(RoomError::Invariant(format!(
                "room {} holds {} moves for {} participants",
                self.code,
                self.moves.len(),
                self.slots.len()
            )));
        }
        if let Some(stray) = self.moves.keys().find(|p| !self.contains(p)) {
            return Err(RoomError::Invariant(format!(
                "room {} holds a move from unseated participant {}",
                self.code, stray
            )));
        }
        self.evaluated = true;
        self.set_phase(Phase::Evaluating);

        let moves: Vec<(ParticipantId, Gesture)> = self
            .slots
            .iter()
            .filter_map(|p| self.moves.get(p).map(|g| (p.clone(), *g)))
            .collect();
        let result = judge(&moves);
        if let Some(winner) = &result.winner {
            if let Some(score) = self.scores.get_mut(winner) {
                *score += 1;
            }
        }
        Ok(Some(RoundSummary { round: self.round, moves, result }))
    }

    /// Cumulative scores of the seated participants.
    pub fn scores(&self) -> BTreeMap<ParticipantId, u32> {
        self.slots
            .iter()
            .map(|p| (p.clone(), self.scores.get(p).copied().unwrap_or(0)))
            .collect()
    }

    fn match_score(&self, participant: &str) -> u32 {
        let total = self.scores.get(participant).copied().unwrap_or(0);
        let base = self.match_base.get(participant).copied().unwrap_or(0);
        total.saturating_sub(base)
    }

    /// True once someone has won [`WIN_THRESHOLD`] rounds in the current match.
    pub fn game_over(&self) -> bool {
        self.slots.iter().any(|p| self.match_score(p) >= WIN_THRESHOLD)
    }

    /// Participant who took the current match, if it is over.
    pub fn match_winner(&self) -> Option<ParticipantId> {
        self.slots
            .iter()
            .find(|p| self.match_score(p) >= WIN_THRESHOLD)
            .cloned()
    }

    /// Clear the round's moves and readiness, keeping scores.
    pub fn reset_for_next_round(&mut self) {
        self.moves.clear();
        self.ready.clear();
        self.evaluated = false;
    }

    /// Mark a participant ready. Returns `true` if they were not ready yet.
    pub fn mark_ready(&mut self, participant: &str) -> bool {
        if !self.contains(participant) {
            return false;
        }
        self.ready.insert(participant.to_string())
    }

    /// Every slot is occupied and every occupant is ready.
    pub fn all_ready(&self) -> bool {
        self.is_full() && self.slots.iter().all(|p| self.ready.contains(p))
    }

    /// Start a new match: cumulative scores stay, the threshold counts from here.
    pub fn restart(&mut self) {
        self.match_base = self.scores.clone();
        self.reset_for_next_round();
        self.set_phase(Phase::Countdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Outcome;

    fn playing_room() -> Room {
        let mut room = Room::new("ROOM0001".to_string());
        room.add_participant("alice".to_string()).unwrap();
        room.add_participant("bob".to_string()).unwrap();
        room.set_phase(Phase::Countdown);
        room.start_collecting();
        room
    }

    fn play(room: &mut Room, a: Gesture, b: Gesture) -> RoundSummary {
        room.record_move("alice", a);
        room.record_move("bob", b);
        let summary = room.evaluate_round().unwrap().expect("round evaluated");
        room.reset_for_next_round();
        room.set_phase(Phase::Countdown);
        room.start_collecting();
        summary
    }

    #[test]
    fn test_new_room_is_waiting_and_empty() {
        let room = Room::new("ABCD1234".to_string());
        assert_eq!(room.phase(), Phase::Waiting);
        assert_eq!(room.participant_count(), 0);
        assert!(room.scores().is_empty());
        assert!(!room.game_over());
    }

    #[test]
    fn test_third_participant_is_rejected() {
        let mut room = Room::new("ABCD1234".to_string());
        assert_eq!(room.add_participant("alice".to_string()), Ok(true));
        assert_eq!(room.add_participant("alice".to_string()), Ok(false));
        assert_eq!(room.add_participant("bob".to_string()), Ok(true));
        assert_eq!(
            room.add_participant("carol".to_string()),
            Err(RoomError::RoomFull("ABCD1234".to_string()))
        );
        assert_eq!(room.participants(), ["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_record_move_first_one_wins() {
        let mut room = playing_room();
        assert_eq!(room.record_move("alice", Gesture::Rock), MoveReceipt::Recorded);
        assert_eq!(room.record_move("alice", Gesture::Paper), MoveReceipt::Ignored);
        assert_eq!(room.move_of("alice"), Some(Gesture::Rock));
        assert_eq!(room.record_move("bob", Gesture::Paper), MoveReceipt::RoundComplete);
    }

    #[test]
    fn test_record_move_out_of_phase_is_ignored() {
        let mut room = Room::new("ABCD1234".to_string());
        room.add_participant("alice".to_string()).unwrap();
        room.add_participant("bob".to_string()).unwrap();
        room.set_phase(Phase::Countdown);
        assert_eq!(room.record_move("alice", Gesture::Rock), MoveReceipt::Ignored);
        room.start_collecting();
        assert_eq!(room.record_move("mallory", Gesture::Rock), MoveReceipt::Ignored);
        assert_eq!(room.move_of("alice"), None);
    }

    #[test]
    fn test_evaluate_round_runs_once() {
        let mut room = playing_room();
        room.record_move("alice", Gesture::Rock);
        room.record_move("bob", Gesture::Scissors);
        let summary = room.evaluate_round().unwrap().unwrap();
        assert_eq!(summary.result.outcome, Outcome::Win);
        assert_eq!(summary.result.winner.as_deref(), Some("alice"));
        assert_eq!(room.evaluate_round().unwrap(), None);
        assert_eq!(room.scores()["alice"], 1);
        // A move arriving after evaluation does not reopen the round.
        assert_eq!(room.record_move("bob", Gesture::Rock), MoveReceipt::Ignored);
    }

    #[test]
    fn test_move_from_unseated_participant_is_an_invariant_error() {
        let mut room = playing_room();
        room.record_move("alice", Gesture::Rock);
        room.force_move("intruder", Gesture::Paper);
        assert!(matches!(room.evaluate_round(), Err(RoomError::Invariant(_))));
        assert!(room.scores().values().all(|s| *s == 0));
    }

    #[test]
    fn test_timeout_with_lone_move_keeps_scores() {
        let mut room = playing_room();
        room.record_move("bob", Gesture::Paper);
        let summary = room.evaluate_round().unwrap().unwrap();
        assert_eq!(summary.result.outcome, Outcome::Timeout);
        assert_eq!(summary.moves, vec![("bob".to_string(), Gesture::Paper)]);
        assert!(room.scores().values().all(|s| *s == 0));
    }

    #[test]
    fn test_moves_are_reported_in_slot_order() {
        let mut room = playing_room();
        room.record_move("bob", Gesture::Rock);
        room.record_move("alice", Gesture::Paper);
        let summary = room.evaluate_round().unwrap().unwrap();
        assert_eq!(summary.moves[0].0, "alice");
        assert_eq!(summary.result.winner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_game_over_at_threshold_until_restart() {
        let mut room = playing_room();
        for _ in 0..WIN_THRESHOLD - 1 {
            play(&mut room, Gesture::Paper, Gesture::Rock);
            assert!(!room.game_over());
        }
        play(&mut room, Gesture::Rock, Gesture::Rock);
        assert!(!room.game_over());
        play(&mut room, Gesture::Paper, Gesture::Rock);
        assert!(room.game_over());
        assert_eq!(room.match_winner().as_deref(), Some("alice"));

        // Stays over while nothing restarts the match.
        room.reset_for_next_round();
        assert!(room.game_over());

        room.restart();
        assert_eq!(room.phase(), Phase::Countdown);
        assert!(!room.game_over());
        assert_eq!(room.scores()["alice"], WIN_THRESHOLD);
    }

    #[test]
    fn test_reset_clears_moves_and_readiness() {
        let mut room = playing_room();
        room.mark_ready("alice");
        room.mark_ready("bob");
        assert!(room.all_ready());
        room.record_move("alice", Gesture::Rock);
        room.reset_for_next_round();
        assert!(!room.all_ready());
        assert_eq!(room.move_of("alice"), None);
    }

    #[test]
    fn test_removed_participant_loses_slot_and_score() {
        let mut room = playing_room();
        play(&mut room, Gesture::Rock, Gesture::Scissors);
        assert!(room.remove_participant("alice"));
        assert!(!room.remove_participant("alice"));
        assert_eq!(room.participants(), ["bob".to_string()]);
        assert!(!room.scores().contains_key("alice"));
    }
}

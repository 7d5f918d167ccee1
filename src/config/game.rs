/// Gameplay configuration constants.
///
/// This module defines the round cadence (countdown, move deadline, result pause),
/// the score threshold that ends a match and the detection confidence needed to
/// turn a classified frame into a move.
use std::time::Duration;

/// First value announced by the pre-round countdown (counts down to 1).
pub const COUNTDOWN_FROM: u32 = 3;

/// Delay between two countdown ticks, in seconds.
pub const COUNTDOWN_TICK_SECS: u64 = 1;

/// Time (in seconds) participants have to show a move once a round starts.
pub const ROUND_DEADLINE_SECS: u64 = 5;

/// How long (in seconds) a round result stays on screen before the next step.
pub const RESULT_PAUSE_SECS: u64 = 3;

/// Round wins needed to take a match.
pub const WIN_THRESHOLD: u32 = 5;

/// Classifier confidence a detection must exceed to count as a move.
pub const MIN_MOVE_CONFIDENCE: f32 = 0.7;

/// Maximum number of participants in a room.
pub const MAX_PARTICIPANTS: usize = 2;

/// Length of generated room codes.
pub const ROOM_CODE_LEN: usize = 8;

/// Time (in seconds) a room may stay without any participant before it is torn down.
pub const EMPTY_ROOM_TTL_SECS: u64 = 600;

/// Timer settings used by a room's round state machine.
///
/// Production rooms use [`RoomTimings::default`]; tests shrink the durations.
#[derive(Debug, Clone, Copy)]
pub struct RoomTimings {
    pub countdown_from: u32,
    pub countdown_tick: Duration,
    pub round_deadline: Duration,
    pub result_pause: Duration,
    pub empty_room_ttl: Duration,
}

impl Default for RoomTimings {
    fn default() -> Self {
        Self {
            countdown_from: COUNTDOWN_FROM,
            countdown_tick: Duration::from_secs(COUNTDOWN_TICK_SECS),
            round_deadline: Duration::from_secs(ROUND_DEADLINE_SECS),
            result_pause: Duration::from_secs(RESULT_PAUSE_SECS),
            empty_room_ttl: Duration::from_secs(EMPTY_ROOM_TTL_SECS),
        }
    }
}

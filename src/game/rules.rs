//! Round judging.
//!
//! Pure functions over the moves submitted during one round. Moves are passed in
//! slot order so the verdict never depends on which participant submitted first.

use crate::game::types::{Gesture, Outcome, ParticipantId, RoundResult};

/// Compare two gestures from the first player's point of view.
///
/// Returns `Some(true)` if `a` wins, `Some(false)` if `b` wins and `None` on a draw.
pub fn first_wins(a: Gesture, b: Gesture) -> Option<bool> {
    if a == b {
        None
    } else {
        Some(a.beats() == b)
    }
}

/// Judge a round from the moves recorded for it.
///
/// Fewer than two moves is a timeout: a lone move does not win by forfeit.
pub fn judge(moves: &[(ParticipantId, Gesture)]) -> RoundResult {
    match moves {
        [(first, a), (second, b)] => match first_wins(*a, *b) {
            None => RoundResult { outcome: Outcome::Draw, winner: None },
            Some(true) => RoundResult { outcome: Outcome::Win, winner: Some(first.clone()) },
            Some(false) => RoundResult { outcome: Outcome::Win, winner: Some(second.clone()) },
        },
        _ => RoundResult { outcome: Outcome::Timeout, winner: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: Gesture, b: Gesture) -> Vec<(ParticipantId, Gesture)> {
        vec![("alice".to_string(), a), ("bob".to_string(), b)]
    }

    #[test]
    fn test_distinct_moves_follow_beats_relation() {
        for a in Gesture::ALL {
            for b in Gesture::ALL {
                if a == b {
                    continue;
                }
                let result = judge(&pair(a, b));
                assert_eq!(result.outcome, Outcome::Win);
                let expected = if a.beats() == b { "alice" } else { "bob" };
                assert_eq!(result.winner.as_deref(), Some(expected), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_equal_moves_draw() {
        for g in Gesture::ALL {
            let result = judge(&pair(g, g));
            assert_eq!(result, RoundResult { outcome: Outcome::Draw, winner: None });
        }
    }

    #[test]
    fn test_classic_pairings() {
        assert_eq!(first_wins(Gesture::Rock, Gesture::Scissors), Some(true));
        assert_eq!(first_wins(Gesture::Scissors, Gesture::Paper), Some(true));
        assert_eq!(first_wins(Gesture::Paper, Gesture::Rock), Some(true));
        assert_eq!(first_wins(Gesture::Rock, Gesture::Paper), Some(false));
    }

    #[test]
    fn test_missing_moves_time_out() {
        assert_eq!(judge(&[]).outcome, Outcome::Timeout);
        let lone = vec![("alice".to_string(), Gesture::Rock)];
        let result = judge(&lone);
        assert_eq!(result.outcome, Outcome::Timeout);
        assert!(result.winner.is_none());
    }
}

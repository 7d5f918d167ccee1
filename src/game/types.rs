use serde::Serialize;
use std::fmt;

/// Opaque participant identifier, supplied by the client when connecting.
pub type ParticipantId = String;

/// Opaque room code, generated by the server.
pub type RoomCode = String;

/// A move a participant can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Rock,
    Paper,
    Scissors,
}

impl Gesture {
    #[cfg(test)]
    pub const ALL: [Gesture; 3] = [Gesture::Rock, Gesture::Paper, Gesture::Scissors];

    /// The gesture this one defeats.
    pub fn beats(self) -> Gesture {
        match self {
            Gesture::Rock => Gesture::Scissors,
            Gesture::Scissors => Gesture::Paper,
            Gesture::Paper => Gesture::Rock,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gesture::Rock => "rock",
            Gesture::Paper => "paper",
            Gesture::Scissors => "scissors",
        };
        f.write_str(label)
    }
}

/// Label produced by the gesture classifier. `None` means no hand/gesture was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureLabel {
    Rock,
    Paper,
    Scissors,
    None,
}

impl GestureLabel {
    pub fn gesture(self) -> Option<Gesture> {
        match self {
            GestureLabel::Rock => Some(Gesture::Rock),
            GestureLabel::Paper => Some(Gesture::Paper),
            GestureLabel::Scissors => Some(Gesture::Scissors),
            GestureLabel::None => None,
        }
    }
}

impl From<Gesture> for GestureLabel {
    fn from(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Rock => GestureLabel::Rock,
            Gesture::Paper => GestureLabel::Paper,
            Gesture::Scissors => GestureLabel::Scissors,
        }
    }
}

/// One classifier verdict for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub gesture: GestureLabel,
    pub confidence: f32,
}

impl Detection {
    pub fn none() -> Self {
        Self { gesture: GestureLabel::None, confidence: 0.0 }
    }

    /// The move this detection stands for, if it is confident enough to count.
    pub fn as_move(&self, min_confidence: f32) -> Option<Gesture> {
        if self.confidence > min_confidence {
            self.gesture.gesture()
        } else {
            None
        }
    }
}

/// Stage of a room's round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Countdown,
    Collecting,
    Evaluating,
    Finished,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Countdown => "countdown",
            Phase::Collecting => "collecting",
            Phase::Evaluating => "evaluating",
            Phase::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Draw,
    Timeout,
}

/// Result of one round, as broadcast to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundResult {
    #[serde(rename = "result")]
    pub outcome: Outcome,
    pub winner: Option<ParticipantId>,
}

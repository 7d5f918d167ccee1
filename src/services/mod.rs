//! External collaborators of the orchestrator.
//!
//! - Gesture classification of camera frames
//! - Best-effort recording of game events for analytics

pub mod classifier;
pub mod events;

//! Game domain: gestures, phases, round judging and per-room state.
//!
//! Nothing in here knows about actors, sockets or timers.

pub mod types;
pub mod rules;
pub mod room;

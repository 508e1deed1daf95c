//! # Actors
//!
//! The async side of a session. `session` hosts the actor that owns a
//! [`crate::session::Session`]; `scheduler` replays its emission jobs in time;
//! `sink` and `traits` are the seam to the presentation layer.

pub mod messages;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod traits;

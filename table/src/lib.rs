//! Networked billiards table.
//!
//! Each peer simulates the balls it owns and follows the replicated state of
//! the rest. This crate exposes the simulation engine, the authority seams to
//! the networking layer and an in-process relay for running several peers.

pub mod authority;
pub mod ball;
pub mod bot;
pub mod config;
pub mod contact;
pub mod cue;
pub mod cushions;
pub mod game_loop;
pub mod hub;
pub mod pocket;
pub mod rack;
pub mod score;
pub mod session;
pub mod table;

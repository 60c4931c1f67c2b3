//! pollroom: live classroom polling gateway.
//!
//! One moderator broadcasts timed multiple-choice questions to connected
//! students over WebSocket; answers are tallied live and final results are
//! broadcast when everyone has answered or the countdown runs out,
//! whichever comes first.

pub mod chat;
pub mod cli;
pub mod config;
pub mod events;
pub mod facade;
pub mod participants;
pub mod poll;
pub mod schedule;
pub mod server;

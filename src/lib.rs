//! Survival Relay - authoritative world server for a shared survival game
//!
//! Clients connect over a WebSocket, spawn a player, move around, pick up and
//! use objects, repair the radio and the ship, and finally submit a score.
//! One world actor owns all state and relays every change to the other
//! connected clients.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod mirror;
pub mod store;
pub mod util;
pub mod ws;

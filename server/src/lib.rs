//! Board service: the authoritative realtime hub for whiteboard rooms.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | environment-driven [`config::Config`] |
//! | [`db`] | Postgres pool and migrations |
//! | [`routes`] | websocket endpoint, room probe, deletion notice |
//! | [`services`] | room authority, directory, identity, persistence |
//! | [`state`] | [`state::AppState`] and per-room live state |

pub mod config;
pub mod db;
pub mod routes;
pub mod services;
pub mod state;

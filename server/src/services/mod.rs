//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room state, storage, and identity concerns so route
//! handlers can stay focused on protocol translation.

pub mod directory;
pub mod element;
pub mod identity;
pub mod permission;
pub mod persistence;
pub mod room;

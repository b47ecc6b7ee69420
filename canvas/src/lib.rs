//! Canvas rendering and input engine for the collaborative whiteboard.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! full lifecycle of the canvas: translating raw DOM input events into element
//! mutations, folding remote events into the local document, keeping the
//! owner's undo/redo history, and rendering the scene. The host page only
//! wires DOM events and the socket to [`web::Whiteboard`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Local element store plus remote in-progress strokes |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing and resize handles |
//! | [`history`] | Owner-only undo/redo stacks |
//! | [`session`] | Room membership, role, and edit permission |
//! | [`layout`] | Word wrap for sticky notes and text blocks |
//! | [`path`] | Stroke smoothing and shape outlines |
//! | [`render`] | Scene rendering to a 2D context |
//! | [`images`] | Decoded image cache |
//! | [`web`] | `wasm-bindgen` handle for the host page |
//! | [`error`] | Client error taxonomy |
//! | [`consts`] | Shared numeric constants (zoom limits, handle sizes, etc.) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod hit;
pub mod history;
pub mod images;
pub mod input;
pub mod layout;
pub mod path;
pub mod render;
pub mod session;
pub mod web;

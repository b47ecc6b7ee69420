//! Interaction engine: input handling, local mutations, and remote folding.
//!
//! DESIGN
//! ======
//! `EngineCore` holds every piece of client state and contains all logic
//! that does not touch the browser. Handlers return `Vec<Action>`; the host
//! sends `Action::Emit` events over the socket, repaints on
//! `Action::RenderNeeded`, and handles the rest (cursor, editor overlay,
//! notices, navigation). `Engine` wraps the core with a canvas element and
//! image cache.
//!
//! LIFECYCLE
//! =========
//! pointer-down -> (drawing | moving | resizing | panning) -> pointer-up/leave
//! -> idle. Committing happens only on exit: strokes and shapes are stored
//! and emitted once, moves and resizes record one history entry.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use frames::element::{ImageElement, LineSegment, Shape, Stroke, TextBox};
use frames::event::is_stroke_cancel;
use frames::{Element, ElementBody, ElementKind, ElementPatch, ErrorCode, Event, EventError, Frame};
use uuid::Uuid;
use wasm_bindgen::JsValue;
use web_sys::HtmlCanvasElement;

use crate::camera::{Camera, Point};
use crate::consts::{
    IMAGE_SIZE_PX, STICKY_PLACEHOLDER, STICKY_SIZE_PX, STROKE_EMIT_EVERY, STROKE_EMIT_INTERVAL_MS, TEXT_MIN_WIDTH,
    TEXT_WIDTH_PX, ZOOM_STEP,
};
use crate::doc::DocStore;
use crate::error::CoreError;
use crate::hit::{self, HitPart, is_priority};
use crate::history::History;
use crate::images::ImageCache;
use crate::input::{Brush, Button, InputState, Key, Modifiers, Tool, UiState, WheelDelta};
use crate::layout::{EstimateMeasure, TextMeasure, TextMetrics, text_font_px, wrap_text};
use crate::session::Session;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send this event to the room.
    Emit(Event),
    RenderNeeded,
    SetCursor(String),
    /// Open the text editor overlay on an element.
    EditTextRequested { id: Uuid, text: String },
    /// The active tool changed as a side effect (e.g. grabbing a sticky note).
    ToolChanged(Tool),
    /// User-visible message.
    Notice(String),
    /// The room is gone; navigate away.
    RoomClosed,
    /// Release a client-local temporary resource such as an object URL.
    ReleaseLocalResource(String),
}

/// Last known pointer of another participant.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub position: Point,
    pub color: String,
    pub label: String,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub history: History,
    pub session: Session,
    /// Remote pointers keyed by user id.
    pub cursors: HashMap<String, RemoteCursor>,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
    measure: Box<dyn TextMeasure>,
    /// World-space samples waiting for the next animation frame.
    pending_samples: Vec<Point>,
    /// New text block open in the editor but not yet committed.
    pending_text: Option<Element>,
    /// Local preview URLs of images still uploading.
    uploads: HashMap<Uuid, String>,
    last_cursor_emit_ms: f64,
}

impl EngineCore {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            doc: DocStore::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            history: History::new(),
            session,
            cursors: HashMap::new(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
            measure: Box::new(EstimateMeasure::default()),
            pending_samples: Vec::new(),
            pending_text: None,
            uploads: HashMap::new(),
            last_cursor_emit_ms: f64::NEG_INFINITY,
        }
    }

    pub fn set_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Option<Uuid> {
        self.ui.selected_id
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn element(&self, id: &Uuid) -> Option<&Element> {
        self.doc.get(id)
    }

    /// Elements to draw, including the local uncommitted one.
    #[must_use]
    pub fn render_list(&self) -> Vec<&Element> {
        let local = self.input.in_progress().or(self.pending_text.as_ref());
        self.doc.render_list(local)
    }

    // --- Tool / style ---

    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
        if tool != Tool::Select {
            self.ui.selected_id = None;
        }
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.ui.brush = brush;
    }

    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = dpr;
    }

    // =========================================================================
    // POINTER
    // =========================================================================

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        if !self.session.can_edit() || !self.input.is_idle() {
            return Vec::new();
        }

        if button == Button::Middle || (button == Button::Primary && self.ui.space_held) {
            self.input = InputState::Panning {
                start_screen: screen,
                initial_pan: Point::new(self.camera.pan_x, self.camera.pan_y),
            };
            return vec![Action::SetCursor("grabbing".into())];
        }
        if button != Button::Primary {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen);

        // PHASE: RESIZE HANDLE OF THE CURRENT SELECTION
        if let Some(hit) = hit::hit_test(world, &self.doc, &self.camera, self.ui.selected_id) {
            if hit.part == HitPart::ResizeHandle {
                return self.begin_resize(hit.element_id);
            }
        }

        // PHASE: IMAGES AND STICKY NOTES ARE ALWAYS GRABBABLE
        if let Some(id) = hit::topmost(&self.doc, world, |el| is_priority(el.kind())) {
            return self.begin_move(id, world, true);
        }

        // PHASE: TOOL DISPATCH
        match self.ui.tool {
            Tool::Select => match hit::topmost(&self.doc, world, |_| true) {
                Some(id) => self.begin_move(id, world, false),
                None => {
                    self.ui.selected_id = None;
                    vec![Action::RenderNeeded]
                }
            },
            Tool::Sticky => match hit::topmost(&self.doc, world, |_| true) {
                Some(id) => self.begin_move(id, world, true),
                None => self.spawn_sticky(world, now_ms),
            },
            Tool::Text => self.spawn_text(world, now_ms),
            tool => match tool.draws() {
                Some(kind) => self.begin_drawing(kind, world, now_ms),
                None => Vec::new(),
            },
        }
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen);
        let mut actions = self.cursor_action(world, now_ms);

        match &mut self.input {
            InputState::Idle => {}
            InputState::Panning { start_screen, initial_pan } => {
                self.camera.pan_x = initial_pan.x + (screen.x - start_screen.x) / self.camera.scale;
                self.camera.pan_y = initial_pan.y + (screen.y - start_screen.y) / self.camera.scale;
                actions.extend(self.viewport_actions());
            }
            InputState::Drawing { element, anchor, .. } => {
                if element.kind().is_stroke() {
                    self.pending_samples.push(world);
                } else {
                    extend_shape(element, *anchor, world);
                    actions.push(Action::RenderNeeded);
                }
            }
            InputState::Moving { id, grab, .. } => {
                let (id, to) = (*id, Point::new(world.x - grab.x, world.y - grab.y));
                if let Some(element) = self.doc.elements().get(&id).cloned() {
                    let mut moved = element;
                    moved.move_to(to);
                    self.doc.upsert(moved.clone());
                    actions.push(Action::Emit(Event::DrawElement { element: moved }));
                    actions.push(Action::RenderNeeded);
                }
            }
            InputState::Resizing { id, .. } => {
                let id = *id;
                if let Some(resized) = self.resized(id, world) {
                    self.doc.upsert(resized.clone());
                    actions.push(Action::Emit(Event::DrawElement { element: resized }));
                    actions.push(Action::RenderNeeded);
                }
            }
        }
        actions
    }

    /// Drain queued pointer samples into the in-progress stroke. Call once
    /// per animation frame; emits the transient stroke at a bounded rate.
    pub fn on_animation_frame(&mut self, now_ms: f64) -> Vec<Action> {
        if self.pending_samples.is_empty() {
            return Vec::new();
        }
        let samples = std::mem::take(&mut self.pending_samples);
        let InputState::Drawing { element, last_emit_ms, .. } = &mut self.input else {
            return Vec::new();
        };
        let Some(stroke) = element.body.as_stroke_mut() else {
            return Vec::new();
        };

        let before = stroke.points.len();
        stroke.points.extend(samples);
        let after = stroke.points.len();
        let crossed_nth = (before + 1..=after).any(|n| n % STROKE_EMIT_EVERY == 0);

        let mut actions = vec![Action::RenderNeeded];
        if crossed_nth && now_ms - *last_emit_ms >= STROKE_EMIT_INTERVAL_MS {
            *last_emit_ms = now_ms;
            actions.push(Action::Emit(Event::DrawingStroke {
                user_id: self.session.user_id.clone(),
                stroke: element.clone(),
            }));
        }
        actions
    }

    pub fn on_pointer_up(&mut self, _screen: Point, _button: Button, _modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let mut actions = self.on_animation_frame(now_ms);
        actions.retain(|a| !matches!(a, Action::Emit(Event::DrawingStroke { .. })));

        match std::mem::take(&mut self.input) {
            InputState::Idle => return actions,
            InputState::Panning { .. } => {
                let cursor = if self.ui.space_held { "grab" } else { "default" };
                actions.push(Action::SetCursor(cursor.into()));
                return actions;
            }
            InputState::Drawing { element, .. } => actions.extend(self.commit_drawing(element)),
            InputState::Moving { id, before, .. } | InputState::Resizing { id, before } => {
                if let Some(after) = self.doc.get(&id).cloned() {
                    if after != before && self.session.is_owner() {
                        self.history.record_update(before, after);
                    }
                }
            }
        }
        actions.push(Action::SetCursor("default".into()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Leaving the canvas ends the gesture exactly like releasing the button.
    pub fn on_pointer_leave(&mut self, screen: Point, now_ms: f64) -> Vec<Action> {
        self.on_pointer_up(screen, Button::Primary, Modifiers::default(), now_ms)
    }

    pub fn on_double_click(&mut self, screen: Point) -> Vec<Action> {
        if !self.session.can_edit() {
            return Vec::new();
        }
        let world = self.camera.screen_to_world(screen);
        let Some(id) = hit::topmost(&self.doc, world, |el| el.body.as_text().is_some()) else {
            return Vec::new();
        };
        let text = self
            .doc
            .get(&id)
            .and_then(|el| el.body.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default();
        self.ui.editing_id = Some(id);
        vec![Action::EditTextRequested { id, text }]
    }

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            let factor = if delta.dy < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
            if !self.camera.zoom_at(screen, factor) {
                return Vec::new();
            }
        } else {
            self.camera.pan_by_screen(-delta.dx, -delta.dy);
        }
        self.viewport_actions()
    }

    // =========================================================================
    // KEYBOARD
    // =========================================================================

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is(" ") {
            if self.ui.space_held {
                return Vec::new();
            }
            self.ui.space_held = true;
            return vec![Action::SetCursor("grab".into())];
        }
        if modifiers.command() && key.is("z") {
            return if modifiers.shift { self.redo() } else { self.undo() };
        }
        if modifiers.command() && key.is("y") {
            return self.redo();
        }
        if key.is("Escape") {
            let mut actions: Vec<Action> = self.cancel_drawing().into_iter().collect();
            self.ui.selected_id = None;
            actions.push(Action::RenderNeeded);
            return actions;
        }
        Vec::new()
    }

    pub fn on_key_up(&mut self, key: &Key, _modifiers: Modifiers) -> Vec<Action> {
        if key.is(" ") {
            self.ui.space_held = false;
            return vec![Action::SetCursor("default".into())];
        }
        Vec::new()
    }

    // =========================================================================
    // OWNER COMMANDS
    // =========================================================================

    pub fn undo(&mut self) -> Vec<Action> {
        if !self.session.is_owner() {
            return Vec::new();
        }
        let Some(event) = self.history.undo(&mut self.doc) else {
            return vec![Action::RenderNeeded];
        };
        self.drop_stale_selection();
        vec![Action::Emit(event), Action::RenderNeeded]
    }

    pub fn redo(&mut self) -> Vec<Action> {
        if !self.session.is_owner() {
            return Vec::new();
        }
        match self.history.redo(&mut self.doc) {
            Some(event) => vec![Action::Emit(event), Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    /// Wipe the room for everyone.
    ///
    /// # Errors
    ///
    /// [`CoreError::PermissionDenied`] for non-owners.
    pub fn clear_canvas(&mut self) -> Result<Vec<Action>, CoreError> {
        if !self.session.is_owner() {
            return Err(CoreError::PermissionDenied);
        }
        self.apply_clear();
        Ok(vec![Action::Emit(Event::ClearCanvas {}), Action::RenderNeeded])
    }

    pub fn set_theme(&mut self, is_dark: bool) -> Vec<Action> {
        self.session.is_dark = is_dark;
        let mut actions = vec![Action::RenderNeeded];
        if self.session.is_owner() {
            actions.push(Action::Emit(Event::ThemeChanged { is_dark }));
        }
        actions
    }

    /// Owner-side allow-list change for `user_id`.
    ///
    /// # Errors
    ///
    /// [`CoreError::PermissionDenied`] for non-owners.
    pub fn set_permission(&mut self, user_id: &str, allowed: bool) -> Result<Vec<Action>, CoreError> {
        if !self.session.is_owner() {
            return Err(CoreError::PermissionDenied);
        }
        let user_id = user_id.to_owned();
        let event = if allowed {
            Event::GrantPermission { user_id }
        } else {
            Event::RevokePermission { user_id }
        };
        Ok(vec![Action::Emit(event)])
    }

    // =========================================================================
    // TEXT EDITING
    // =========================================================================

    /// Live edit while the overlay is open. Emits a field patch.
    pub fn preview_text(&mut self, id: Uuid, text: &str) -> Vec<Action> {
        if let Some(pending) = self.pending_text.as_mut().filter(|p| p.id == id) {
            if let Some(t) = pending.body.as_text_mut() {
                t.text = text.to_owned();
            }
            return vec![Action::RenderNeeded];
        }
        if !self.session.can_edit() {
            return Vec::new();
        }
        let patch = ElementPatch { text: Some(text.to_owned()), ..ElementPatch::default() };
        if !self.doc.patch(&id, &patch) {
            return Vec::new();
        }
        vec![Action::Emit(Event::UpdateElement { id, patch }), Action::RenderNeeded]
    }

    /// Close the editor and commit `text`, resizing the box to fit.
    pub fn commit_text(&mut self, id: Uuid, text: &str) -> Vec<Action> {
        self.ui.editing_id = None;

        if let Some(mut pending) = self.pending_text.take_if(|p| p.id == id) {
            if text.trim().is_empty() {
                return vec![Action::RenderNeeded];
            }
            self.fit_text(&mut pending, text);
            return self.commit_new(pending);
        }

        if !self.session.can_edit() {
            return Vec::new();
        }
        let Some(before) = self.doc.get(&id).cloned() else {
            return Vec::new();
        };
        let mut after = before.clone();
        self.fit_text(&mut after, text);
        if after == before {
            return Vec::new();
        }
        self.doc.upsert(after.clone());
        if self.session.is_owner() {
            self.history.record_update(before, after.clone());
        }
        vec![Action::Emit(Event::DrawElement { element: after }), Action::RenderNeeded]
    }

    fn fit_text(&self, element: &mut Element, text: &str) {
        let is_sticky = element.kind() == ElementKind::Sticky;
        let Some(block) = element.body.as_text_mut() else {
            return;
        };
        block.text = text.to_owned();
        let font_px = text_font_px(block);
        let metrics = TextMetrics { max_height: None, ..TextMetrics::text(block) };

        if !is_sticky && !block.fixed_width {
            let widest = text
                .split('\n')
                .map(|line| self.measure.width(line, font_px))
                .fold(0.0_f64, f64::max);
            block.width = block.width.max(widest + TEXT_MIN_WIDTH);
        }
        block.width = block.width.max(TEXT_MIN_WIDTH);
        if is_sticky {
            return;
        }
        let layout = wrap_text(self.measure.as_ref(), text, TextMetrics { max_width: block.width, ..metrics });
        block.height = layout.height.max(font_px);
    }

    // =========================================================================
    // IMAGES
    // =========================================================================

    /// Insert an optimistic image while its bytes upload. Returns the element id.
    ///
    /// # Errors
    ///
    /// [`CoreError::PermissionDenied`] without edit rights.
    pub fn place_image(
        &mut self,
        local_url: &str,
        aspect_ratio: f64,
        screen_center: Point,
        now_ms: f64,
    ) -> Result<(Uuid, Vec<Action>), CoreError> {
        if !self.session.can_edit() {
            return Err(CoreError::PermissionDenied);
        }
        let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 { aspect_ratio } else { 1.0 };
        let longest = self.camera.screen_dist_to_world(IMAGE_SIZE_PX);
        let (width, height) = if aspect_ratio >= 1.0 {
            (longest, longest / aspect_ratio)
        } else {
            (longest * aspect_ratio, longest)
        };
        let center = self.camera.screen_to_world(screen_center);
        let id = Uuid::new_v4();
        self.doc.upsert(Element::new(
            id,
            ms(now_ms),
            ElementBody::Image(ImageElement {
                x: center.x - width / 2.0,
                y: center.y - height / 2.0,
                width,
                height,
                src: local_url.to_owned(),
                aspect_ratio,
                uploading: true,
            }),
        ));
        self.uploads.insert(id, local_url.to_owned());
        Ok((id, vec![Action::RenderNeeded]))
    }

    /// Reconcile an upload: swap in the durable URL, or roll back.
    pub fn finish_image_upload(&mut self, id: Uuid, result: Result<String, String>) -> Vec<Action> {
        let Some(local_url) = self.uploads.remove(&id) else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        match result {
            Ok(url) => {
                let patch = ElementPatch { src: Some(url), uploading: Some(false), ..ElementPatch::default() };
                if self.doc.patch(&id, &patch) {
                    if let Some(element) = self.doc.get(&id).cloned() {
                        if self.session.is_owner() {
                            self.history.record_add(element.clone());
                        }
                        actions.push(Action::Emit(Event::DrawElement { element }));
                    }
                }
            }
            Err(message) => {
                self.doc.remove(&id);
                self.drop_stale_selection();
                let err = CoreError::TransientNetwork(message);
                log::warn!("image upload failed: {err}");
                actions.push(Action::Notice(format!("Image upload failed: {err}")));
            }
        }
        actions.push(Action::ReleaseLocalResource(local_url));
        actions.push(Action::RenderNeeded);
        actions
    }

    // =========================================================================
    // REMOTE EVENTS
    // =========================================================================

    /// Fold an incoming frame into local state.
    ///
    /// # Errors
    ///
    /// [`CoreError::Decode`] for frames outside the catalogue or with
    /// malformed payloads. A rejected join closes the room instead.
    pub fn apply_frame(&mut self, frame: &Frame) -> Result<Vec<Action>, CoreError> {
        match Event::from_frame(frame) {
            Ok(event) => Ok(self.apply_event(event)),
            Err(EventError::Rejected { code, .. }) if code == CoreError::RoomNotFound.error_code() => {
                log::info!("{}", CoreError::RoomNotFound);
                Ok(self.close_room())
            }
            Err(EventError::Rejected { code, message }) => {
                log::debug!("server rejected {}: {code}", frame.syscall);
                Ok(vec![Action::Notice(message)])
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn apply_event(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Snapshot(snapshot) => {
                self.session.apply_snapshot(&snapshot);
                self.doc.load_snapshot(snapshot.elements);
                self.drop_stale_selection();
            }
            Event::Roster { users } => {
                let present = |user_id: &str| users.iter().any(|u| u.user_id == user_id);
                self.cursors.retain(|user_id, _| present(user_id.as_str()));
                let pruned = self.doc.retain_remote_strokes(present);
                self.session.set_roster(users);
                return if pruned > 0 { vec![Action::RenderNeeded] } else { Vec::new() };
            }
            Event::RoomDeleted {} => return self.close_room(),
            Event::DrawElement { element } => {
                self.doc.upsert(element);
            }
            Event::DrawingStroke { user_id, stroke } => {
                if is_stroke_cancel(&stroke) {
                    self.doc.clear_remote_stroke(&user_id);
                } else {
                    self.doc.set_remote_stroke(user_id, stroke);
                }
            }
            Event::DeleteElement { id } => {
                self.doc.remove(&id);
                self.drop_stale_selection();
            }
            Event::UpdateElement { id, patch } => {
                self.doc.patch(&id, &patch);
            }
            Event::SyncState { elements } => {
                self.doc.load_snapshot(elements);
                self.drop_stale_selection();
            }
            Event::ClearCanvas {} => self.apply_clear(),
            Event::CursorMove { user_id, x, y, color, label } => {
                self.cursors.insert(user_id, RemoteCursor { position: Point::new(x, y), color, label });
            }
            Event::ViewportChange { scale, pan_x, pan_y } => {
                if self.session.is_owner() {
                    return Vec::new();
                }
                self.camera = Camera { pan_x, pan_y, scale };
            }
            Event::ThemeChanged { is_dark } => {
                if self.session.is_owner() {
                    return Vec::new();
                }
                self.session.is_dark = is_dark;
            }
            Event::PermissionChanged { allowed } => {
                self.session.set_allowed(allowed);
                let mut actions = Vec::new();
                if !self.session.can_edit() {
                    actions.extend(self.cancel_drawing());
                    self.reset_gesture();
                }
                let notice = if allowed { "You can now edit the board" } else { "Editing was disabled" };
                actions.push(Action::Notice(notice.into()));
                actions.push(Action::RenderNeeded);
                return actions;
            }
            Event::Join { .. }
            | Event::Connected { .. }
            | Event::GrantPermission { .. }
            | Event::RevokePermission { .. } => return Vec::new(),
        }
        vec![Action::RenderNeeded]
    }

    /// Result of the periodic "does this room still exist?" probe.
    pub fn on_room_probe(&mut self, exists: bool) -> Vec<Action> {
        if exists { Vec::new() } else { self.close_room() }
    }

    /// Drop all state belonging to the room and tell the host to leave.
    pub fn close_room(&mut self) -> Vec<Action> {
        self.doc.clear();
        self.history.clear();
        self.session.reset();
        self.cursors.clear();
        self.reset_gesture();
        let mut actions: Vec<Action> = self.uploads.drain().map(|(_, url)| Action::ReleaseLocalResource(url)).collect();
        actions.push(Action::RoomClosed);
        actions
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn apply_clear(&mut self) {
        self.doc.clear();
        self.history.clear();
        self.ui.selected_id = None;
        if !matches!(self.input, InputState::Drawing { .. } | InputState::Panning { .. }) {
            self.input = InputState::Idle;
        }
    }

    /// Drop an in-progress drawing. A transient stroke peers may already
    /// show is withdrawn with an empty `DrawingStroke`.
    fn cancel_drawing(&mut self) -> Option<Action> {
        self.pending_samples.clear();
        if !matches!(self.input, InputState::Drawing { .. }) {
            return None;
        }
        let InputState::Drawing { mut element, .. } = std::mem::take(&mut self.input) else {
            return None;
        };
        element.body.as_stroke_mut()?.points.clear();
        Some(Action::Emit(Event::DrawingStroke { user_id: self.session.user_id.clone(), stroke: element }))
    }

    fn reset_gesture(&mut self) {
        self.input = InputState::Idle;
        self.pending_samples.clear();
        self.pending_text = None;
        self.ui.selected_id = None;
        self.ui.editing_id = None;
    }

    fn drop_stale_selection(&mut self) {
        if self.ui.selected_id.is_some_and(|id| self.doc.get(&id).is_none()) {
            self.ui.selected_id = None;
        }
    }

    fn cursor_action(&mut self, world: Point, now_ms: f64) -> Vec<Action> {
        if now_ms - self.last_cursor_emit_ms < STROKE_EMIT_INTERVAL_MS {
            return Vec::new();
        }
        self.last_cursor_emit_ms = now_ms;
        vec![Action::Emit(Event::CursorMove {
            user_id: self.session.user_id.clone(),
            x: world.x,
            y: world.y,
            color: self.ui.brush.color.clone(),
            label: self.session.username.clone(),
        })]
    }

    fn viewport_actions(&self) -> Vec<Action> {
        let mut actions = vec![Action::RenderNeeded];
        if self.session.is_owner() {
            actions.push(Action::Emit(Event::ViewportChange {
                scale: self.camera.scale,
                pan_x: self.camera.pan_x,
                pan_y: self.camera.pan_y,
            }));
        }
        actions
    }

    fn begin_move(&mut self, id: Uuid, world: Point, force_select: bool) -> Vec<Action> {
        let Some(before) = self.doc.get(&id).cloned() else {
            return Vec::new();
        };
        let origin = before.origin();
        self.ui.selected_id = Some(id);
        self.input = InputState::Moving { id, grab: Point::new(world.x - origin.x, world.y - origin.y), before };
        let mut actions = vec![Action::SetCursor("move".into()), Action::RenderNeeded];
        if force_select && self.ui.tool != Tool::Select {
            self.ui.tool = Tool::Select;
            actions.push(Action::ToolChanged(Tool::Select));
        }
        actions
    }

    fn begin_resize(&mut self, id: Uuid) -> Vec<Action> {
        let Some(before) = self.doc.get(&id).cloned() else {
            return Vec::new();
        };
        self.input = InputState::Resizing { id, before };
        vec![Action::SetCursor("nwse-resize".into())]
    }

    fn begin_drawing(&mut self, kind: ElementKind, world: Point, now_ms: f64) -> Vec<Action> {
        let brush = self.ui.brush.clone();
        let body = if kind.is_stroke() {
            ElementBody::stroke(
                kind,
                Stroke {
                    color: brush.color,
                    stroke_width: self.camera.screen_dist_to_world(brush.size),
                    points: vec![world],
                },
            )
        } else if kind == ElementKind::Line {
            ElementBody::Line(LineSegment {
                x: world.x,
                y: world.y,
                end_x: world.x,
                end_y: world.y,
                color: brush.color,
                stroke_width: brush.size,
            })
        } else {
            ElementBody::shape(
                kind,
                Shape { x: world.x, y: world.y, width: 0.0, height: 0.0, color: brush.color, stroke_width: brush.size },
            )
        };
        self.ui.selected_id = None;
        self.input = InputState::Drawing {
            element: Element::new(Uuid::new_v4(), ms(now_ms), body),
            anchor: world,
            last_emit_ms: now_ms,
        };
        vec![Action::SetCursor("crosshair".into()), Action::RenderNeeded]
    }

    fn spawn_sticky(&mut self, world: Point, now_ms: f64) -> Vec<Action> {
        let size = self.camera.screen_dist_to_world(STICKY_SIZE_PX);
        let element = Element::new(
            Uuid::new_v4(),
            ms(now_ms),
            ElementBody::Sticky(TextBox {
                x: world.x - size / 2.0,
                y: world.y - size / 2.0,
                width: size,
                height: size,
                text: STICKY_PLACEHOLDER.to_owned(),
                fixed_width: true,
                color: crate::consts::STICKY_INK.to_owned(),
                stroke_width: self.ui.brush.size,
            }),
        );
        self.ui.tool = Tool::Select;
        let mut actions = self.commit_new(element);
        actions.push(Action::ToolChanged(Tool::Select));
        actions
    }

    fn spawn_text(&mut self, world: Point, now_ms: f64) -> Vec<Action> {
        let block = TextBox {
            x: world.x,
            y: world.y,
            width: self.camera.screen_dist_to_world(TEXT_WIDTH_PX),
            height: 0.0,
            text: String::new(),
            fixed_width: false,
            color: self.ui.brush.color.clone(),
            stroke_width: self.ui.brush.size,
        };
        let font_px = text_font_px(&block);
        let element = Element::new(Uuid::new_v4(), ms(now_ms), ElementBody::Text(TextBox { height: font_px, ..block }));
        let id = element.id;
        self.pending_text = Some(element);
        self.ui.editing_id = Some(id);
        self.ui.tool = Tool::Select;
        vec![
            Action::EditTextRequested { id, text: String::new() },
            Action::ToolChanged(Tool::Select),
            Action::RenderNeeded,
        ]
    }

    fn commit_drawing(&mut self, mut element: Element) -> Vec<Action> {
        if !element.has_extent() {
            return Vec::new();
        }
        if element.kind() != ElementKind::Circle {
            if let Some(shape) = element.body.as_shape_mut() {
                normalize(shape);
            }
        }
        self.commit_new(element)
    }

    /// Store a finished element, record it for the owner, and emit it.
    fn commit_new(&mut self, element: Element) -> Vec<Action> {
        self.doc.upsert(element.clone());
        if self.session.is_owner() {
            self.history.record_add(element.clone());
        }
        vec![Action::Emit(Event::DrawElement { element }), Action::RenderNeeded]
    }

    fn resized(&self, id: Uuid, world: Point) -> Option<Element> {
        let mut element = self.doc.get(&id)?.clone();
        let origin = element.origin();
        let mut width = world.x - origin.x;
        let mut height = world.y - origin.y;

        match &mut element.body {
            ElementBody::Image(img) => {
                let ratio = if img.aspect_ratio > 0.0 { img.aspect_ratio } else { img.width / img.height };
                height = width / ratio;
            }
            ElementBody::Text(block) => {
                width = width.max(TEXT_MIN_WIDTH);
                let font_px = text_font_px(block);
                let metrics = TextMetrics { max_width: width, ..TextMetrics::text(block) };
                height = wrap_text(self.measure.as_ref(), &block.text, metrics).height.max(font_px);
                block.fixed_width = true;
            }
            _ => {}
        }
        element.set_size(width, height).then_some(element)
    }
}

fn extend_shape(element: &mut Element, anchor: Point, world: Point) {
    match &mut element.body {
        ElementBody::Line(line) => {
            line.end_x = world.x;
            line.end_y = world.y;
        }
        body => {
            if let Some(shape) = body.as_shape_mut() {
                shape.width = world.x - anchor.x;
                shape.height = world.y - anchor.y;
            }
        }
    }
}

fn normalize(shape: &mut Shape) {
    if shape.width < 0.0 {
        shape.x += shape.width;
        shape.width = -shape.width;
    }
    if shape.height < 0.0 {
        shape.y += shape.height;
        shape.height = -shape.height;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn ms(now_ms: f64) -> i64 {
    now_ms as i64
}

// =============================================================================
// BROWSER WRAPPER
// =============================================================================

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    images: ImageCache,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to `canvas`. `on_image_load` is invoked
    /// whenever a cached image finishes decoding.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, session: Session, on_image_load: js_sys::Function) -> Self {
        let mut core = EngineCore::new(session);
        if let Some(measure) = crate::render::CanvasMeasure::for_canvas(&canvas) {
            core.set_measure(Box::new(measure));
        }
        Self { canvas, images: ImageCache::new(on_image_load), core }
    }

    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
        let (w, h) = crate::render::backing_size(width_css, height_css, dpr);
        self.canvas.set_width(w);
        self.canvas.set_height(h);
    }

    /// Fold a raw binary frame from the socket.
    ///
    /// # Errors
    ///
    /// [`CoreError::Decode`] when the bytes are not a known event.
    pub fn on_socket_bytes(&mut self, bytes: &[u8]) -> Result<Vec<Action>, CoreError> {
        let frame = frames::decode_frame(bytes).map_err(|e| {
            log::warn!("dropping undecodable frame: {e}");
            CoreError::TransientNetwork(e.to_string())
        })?;
        let actions = self.core.apply_frame(&frame)?;
        self.forget_released(&actions);
        Ok(actions)
    }

    /// Encode an emitted event as a binary frame for the room.
    #[must_use]
    pub fn encode(&self, event: &Event) -> Vec<u8> {
        let frame = event.to_frame().with_room_id(self.core.session.room_id.clone());
        frames::encode_frame(&frame)
    }

    fn forget_released(&mut self, actions: &[Action]) {
        if actions.iter().any(|a| matches!(a, Action::RoomClosed)) {
            self.images.clear();
        }
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Propagates failures from the 2D context.
    pub fn render(&mut self) -> Result<(), JsValue> {
        let ctx = crate::render::context_2d(&self.canvas)?;
        let live: Vec<Uuid> = self.core.doc.elements().iter().map(|e| e.id).collect();
        self.images.retain(&live);
        crate::render::draw(&ctx, &self.core, &mut self.images)
    }
}

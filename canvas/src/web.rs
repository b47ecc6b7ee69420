//! JavaScript-facing handle.
//!
//! The host page creates one [`Whiteboard`] per open room, forwards DOM
//! events and socket bytes into it, and calls [`Whiteboard::frame`] from
//! `requestAnimationFrame`. Outgoing frames go to the `send` callback as
//! `Uint8Array`s; every other engine action goes to `notify` as a JSON string.

use serde_json::json;
use uuid::Uuid;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use frames::Role;

use crate::camera::Point;
use crate::engine::{Action, Engine};
use crate::input::{Brush, Button, Key, Modifiers, Tool, WheelDelta};
use crate::session::Session;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&JsValue::from_str(&err.to_string()));
    }
}

#[wasm_bindgen]
pub struct Whiteboard {
    engine: Engine,
    send: js_sys::Function,
    notify: js_sys::Function,
    dirty: bool,
}

fn parse_id(id: &str) -> Result<Uuid, JsValue> {
    Uuid::parse_str(id).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers { shift, ctrl, alt, meta }
}

fn button(code: i16) -> Button {
    match code {
        1 => Button::Middle,
        2 => Button::Secondary,
        _ => Button::Primary,
    }
}

fn action_json(action: &Action) -> Option<serde_json::Value> {
    let value = match action {
        Action::Emit(_) | Action::RenderNeeded => return None,
        Action::SetCursor(cursor) => json!({ "type": "cursor", "cursor": cursor }),
        Action::EditTextRequested { id, text } => json!({ "type": "editText", "id": id, "text": text }),
        Action::ToolChanged(tool) => json!({ "type": "tool", "tool": tool.name() }),
        Action::Notice(message) => json!({ "type": "notice", "message": message }),
        Action::RoomClosed => json!({ "type": "roomClosed" }),
        Action::ReleaseLocalResource(url) => json!({ "type": "release", "url": url }),
    };
    Some(value)
}

#[wasm_bindgen]
impl Whiteboard {
    /// Attach to the canvas with DOM id `canvas_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or is not a canvas.
    #[wasm_bindgen(constructor)]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        canvas_id: &str,
        user_id: &str,
        username: &str,
        role: &str,
        room_id: &str,
        send: js_sys::Function,
        notify: js_sys::Function,
        on_image_load: js_sys::Function,
    ) -> Result<Whiteboard, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("canvas '{canvas_id}' not found")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;
        let role = if matches!(role, "owner" | "teacher") { Role::Owner } else { Role::Participant };
        let session = Session::new(user_id, username, role, room_id);
        Ok(Self { engine: Engine::new(canvas, session, on_image_load), send, notify, dirty: true })
    }

    fn dispatch(&mut self, actions: Vec<Action>) {
        for action in actions {
            match &action {
                Action::Emit(event) => {
                    let bytes = js_sys::Uint8Array::from(self.engine.encode(event).as_slice());
                    if let Err(err) = self.send.call1(&JsValue::NULL, &bytes) {
                        log::warn!("send callback failed: {err:?}");
                    }
                }
                Action::RenderNeeded => self.dirty = true,
                other => {
                    if let Some(value) = action_json(other) {
                        let payload = JsValue::from_str(&value.to_string());
                        if let Err(err) = self.notify.call1(&JsValue::NULL, &payload) {
                            log::warn!("notify callback failed: {err:?}");
                        }
                    }
                }
            }
        }
    }

    /// Encoded join request for this room; send it once the socket opens.
    #[wasm_bindgen(js_name = joinFrame)]
    #[must_use]
    pub fn join_frame(&self) -> Vec<u8> {
        let username = self.engine.core.session.username.clone();
        self.engine.encode(&frames::Event::Join { username })
    }

    /// Fold bytes received from the socket.
    ///
    /// # Errors
    ///
    /// Returns an error for frames that are not known events.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        let actions = self.engine.on_socket_bytes(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.dispatch(actions);
        Ok(())
    }

    /// Per-animation-frame tick: flushes queued stroke samples and repaints if needed.
    ///
    /// # Errors
    ///
    /// Propagates canvas drawing failures.
    pub fn frame(&mut self, now_ms: f64) -> Result<(), JsValue> {
        let actions = self.engine.core.on_animation_frame(now_ms);
        self.dispatch(actions);
        if self.dirty {
            self.dirty = false;
            self.engine.render()?;
        }
        Ok(())
    }

    /// Force a repaint on the next frame (e.g. after an image decoded).
    #[wasm_bindgen(js_name = requestRender)]
    pub fn request_render(&mut self) {
        self.dirty = true;
    }

    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.engine.set_viewport(width_css, height_css, dpr);
        self.dirty = true;
    }

    #[wasm_bindgen(js_name = pointerDown)]
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn pointer_down(&mut self, x: f64, y: f64, button_code: i16, shift: bool, ctrl: bool, alt: bool, meta: bool, now_ms: f64) {
        let actions = self.engine.core.on_pointer_down(
            Point::new(x, y),
            button(button_code),
            modifiers(shift, ctrl, alt, meta),
            now_ms,
        );
        self.dispatch(actions);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) {
        let actions = self.engine.core.on_pointer_move(Point::new(x, y), Modifiers::default(), now_ms);
        self.dispatch(actions);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f64, y: f64, button_code: i16, now_ms: f64) {
        let actions =
            self.engine.core.on_pointer_up(Point::new(x, y), button(button_code), Modifiers::default(), now_ms);
        self.dispatch(actions);
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self, x: f64, y: f64, now_ms: f64) {
        let actions = self.engine.core.on_pointer_leave(Point::new(x, y), now_ms);
        self.dispatch(actions);
    }

    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&mut self, x: f64, y: f64) {
        let actions = self.engine.core.on_double_click(Point::new(x, y));
        self.dispatch(actions);
    }

    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn wheel(&mut self, x: f64, y: f64, dx: f64, dy: f64, ctrl: bool, meta: bool) {
        let actions =
            self.engine.core.on_wheel(Point::new(x, y), WheelDelta { dx, dy }, modifiers(false, ctrl, false, meta));
        self.dispatch(actions);
    }

    #[wasm_bindgen(js_name = keyDown)]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn key_down(&mut self, key: String, shift: bool, ctrl: bool, alt: bool, meta: bool) {
        let actions = self.engine.core.on_key_down(&Key(key), modifiers(shift, ctrl, alt, meta));
        self.dispatch(actions);
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: String) {
        let actions = self.engine.core.on_key_up(&Key(key), Modifiers::default());
        self.dispatch(actions);
    }

    /// Select a tool by name (`"pen"`, `"rect"`, `"sticky"`, ...). Unknown names are ignored.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&mut self, name: &str) {
        match Tool::from_name(name) {
            Some(tool) => {
                self.engine.core.set_tool(tool);
                self.dirty = true;
            }
            None => log::debug!("ignoring unknown tool {name:?}"),
        }
    }

    #[wasm_bindgen(js_name = setBrush)]
    pub fn set_brush(&mut self, color: String, size: f64) {
        self.engine.core.set_brush(Brush { color, size });
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&mut self, is_dark: bool) {
        let actions = self.engine.core.set_theme(is_dark);
        self.dispatch(actions);
    }

    pub fn undo(&mut self) {
        let actions = self.engine.core.undo();
        self.dispatch(actions);
    }

    pub fn redo(&mut self) {
        let actions = self.engine.core.redo();
        self.dispatch(actions);
    }

    /// # Errors
    ///
    /// Returns an error for non-owners.
    #[wasm_bindgen(js_name = clearCanvas)]
    pub fn clear_canvas(&mut self) -> Result<(), JsValue> {
        let actions = self.engine.core.clear_canvas().map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.dispatch(actions);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error for non-owners.
    #[wasm_bindgen(js_name = setPermission)]
    pub fn set_permission(&mut self, user_id: &str, allowed: bool) -> Result<(), JsValue> {
        let actions = self.engine.core.set_permission(user_id, allowed).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.dispatch(actions);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a UUID.
    #[wasm_bindgen(js_name = previewText)]
    pub fn preview_text(&mut self, id: &str, text: &str) -> Result<(), JsValue> {
        let actions = self.engine.core.preview_text(parse_id(id)?, text);
        self.dispatch(actions);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a UUID.
    #[wasm_bindgen(js_name = commitText)]
    pub fn commit_text(&mut self, id: &str, text: &str) -> Result<(), JsValue> {
        let actions = self.engine.core.commit_text(parse_id(id)?, text);
        self.dispatch(actions);
        Ok(())
    }

    /// Place an uploading image centred on the screen point; returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error without edit rights.
    #[wasm_bindgen(js_name = placeImage)]
    pub fn place_image(&mut self, local_url: &str, aspect_ratio: f64, x: f64, y: f64, now_ms: f64) -> Result<String, JsValue> {
        let (id, actions) = self
            .engine
            .core
            .place_image(local_url, aspect_ratio, Point::new(x, y), now_ms)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.dispatch(actions);
        Ok(id.to_string())
    }

    /// Report an upload result: `url` on success, otherwise `error`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a UUID.
    #[wasm_bindgen(js_name = finishImageUpload)]
    pub fn finish_image_upload(&mut self, id: &str, url: Option<String>, error: Option<String>) -> Result<(), JsValue> {
        let result = url.ok_or_else(|| error.unwrap_or_else(|| "upload failed".to_owned()));
        let actions = self.engine.core.finish_image_upload(parse_id(id)?, result);
        self.dispatch(actions);
        Ok(())
    }

    /// Result of checking whether the room still exists.
    #[wasm_bindgen(js_name = roomProbe)]
    pub fn room_probe(&mut self, exists: bool) {
        let actions = self.engine.core.on_room_probe(exists);
        self.dispatch(actions);
    }
}

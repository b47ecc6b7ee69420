//! Decoded image cache for image elements.
//!
//! Images load asynchronously; until an entry has decoded, the renderer
//! skips it and the `on_load` callback asks the host for another frame.

use std::collections::HashMap;

use uuid::Uuid;
use web_sys::HtmlImageElement;

struct CachedImage {
    src: String,
    image: HtmlImageElement,
}

pub struct ImageCache {
    entries: HashMap<Uuid, CachedImage>,
    on_load: js_sys::Function,
}

impl ImageCache {
    #[must_use]
    pub fn new(on_load: js_sys::Function) -> Self {
        Self { entries: HashMap::new(), on_load }
    }

    /// Decoded image for `id`, starting a load on first sight or when the
    /// source changed (e.g. a local preview replaced by its uploaded URL).
    pub fn get(&mut self, id: Uuid, src: &str) -> Option<&HtmlImageElement> {
        let stale = self.entries.get(&id).is_none_or(|cached| cached.src != src);
        if stale {
            let image = match HtmlImageElement::new() {
                Ok(image) => image,
                Err(err) => {
                    log::warn!("cannot create image element: {err:?}");
                    return None;
                }
            };
            image.set_cross_origin(Some("anonymous"));
            image.set_onload(Some(&self.on_load));
            image.set_src(src);
            self.entries.insert(id, CachedImage { src: src.to_owned(), image });
        }
        self.entries
            .get(&id)
            .map(|cached| &cached.image)
            .filter(|image| image.complete() && image.natural_width() > 0)
    }

    /// Drop entries whose elements no longer exist.
    pub fn retain(&mut self, live: &[Uuid]) {
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

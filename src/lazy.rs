use crate::page::Page;
use crate::Result;

/// Images observed for lazy loading. Mirrors an IntersectionObserver's
/// observed set: each image is loaded at most once, then unobserved.
#[derive(Debug, Default)]
pub(crate) struct LazyImages {
    pub(crate) observed: Vec<crate::dom::NodeId>,
}

/// Scroll position and height of the simulated viewport. Geometry comes
/// from layout hints, not from rendering.
#[derive(Debug)]
pub(crate) struct Viewport {
    pub(crate) scroll_y: i64,
    pub(crate) height: i64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            scroll_y: 0,
            height: 800,
        }
    }
}

impl Page {
    pub(crate) fn init_lazy_images(&mut self) -> Result<()> {
        self.lazy.observed = self.query_all_nodes("img.lazy")?;
        Ok(())
    }

    /// Intersection pass: load every observed image whose top falls inside
    /// the viewport, and stop observing it. Images without a layout hint
    /// are treated as off-screen and stay observed.
    pub(crate) fn check_lazy_images(&mut self) {
        let observed = std::mem::take(&mut self.lazy.observed);
        let viewport_top = self.viewport.scroll_y;
        let viewport_bottom = viewport_top.saturating_add(self.viewport.height);
        for image in observed {
            if !self.dom.is_attached(image) {
                continue;
            }
            let top = self.layout.get(&image).copied().unwrap_or(i64::MAX);
            let visible = top >= viewport_top && top <= viewport_bottom;
            if !visible {
                self.lazy.observed.push(image);
                continue;
            }
            if let Some(src) = self.dom.attr(image, "data-src").map(ToOwned::to_owned) {
                self.dom.set_attr(image, "src", &src);
                self.trace(format!("lazy image loaded: {src}"));
            }
            self.dom.remove_class(image, "lazy");
        }
    }

    /// Records the vertical position of the first match of `selector`, in
    /// page coordinates, and re-runs the intersection pass.
    pub fn set_element_top(&mut self, selector: &str, top: i64) -> Result<()> {
        let node = self.require_one(selector)?;
        self.layout.insert(node, top);
        self.check_lazy_images();
        Ok(())
    }

    pub fn set_viewport_height(&mut self, height: i64) {
        self.viewport.height = height.max(0);
        self.check_lazy_images();
    }

    pub fn scroll_to(&mut self, y: i64) {
        self.viewport.scroll_y = y.max(0);
        self.trace(format!("scroll to {}", self.viewport.scroll_y));
        self.check_lazy_images();
    }

    pub fn scroll_y(&self) -> i64 {
        self.viewport.scroll_y
    }
}

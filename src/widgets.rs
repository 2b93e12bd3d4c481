use crate::page::Page;
use crate::scheduler::TimerTask;
use crate::Result;

pub(crate) const SEARCH_DEBOUNCE_MS: i64 = 500;
pub(crate) const SEARCH_MIN_QUERY_CHARS: usize = 3;
pub(crate) const HEADER_OFFSET_PX: i64 = 80;

const QUANTITY_FALLBACK: i64 = 1;
const QUANTITY_MIN_FALLBACK: i64 = 1;
const QUANTITY_MAX_FALLBACK: i64 = 999;

/// Counts of Bootstrap-style widgets initialized at page load.
#[derive(Debug, Default)]
pub(crate) struct WidgetMarks {
    pub(crate) tooltips: usize,
    pub(crate) popovers: usize,
}

/// One step of a quantity stepper. A step that would land outside
/// `[min, max]` is a no-op, not a clamp: the current value is returned
/// unchanged.
pub fn step_quantity(current: i64, delta: i64, min: i64, max: i64) -> i64 {
    let next = current.saturating_add(delta);
    if next >= min && next <= max {
        next
    } else {
        current
    }
}

impl Page {
    /// Steps the numeric input matched by `selector` by `delta`, honoring
    /// its `min`/`max` attributes, and returns the resulting value.
    /// Unparsable values fall back the way the storefront does: current
    /// to 1, min to 1, max to 999.
    pub fn step_quantity_input(&mut self, selector: &str, delta: i64) -> Result<i64> {
        let node = self.require_one(selector)?;
        let current = self
            .dom
            .value(node)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(QUANTITY_FALLBACK);
        let min = parse_attr(self.dom.attr(node, "min"), QUANTITY_MIN_FALLBACK);
        let max = parse_attr(self.dom.attr(node, "max"), QUANTITY_MAX_FALLBACK);
        let next = step_quantity(current, delta, min, max);
        self.dom.set_value(node, &next.to_string());
        Ok(next)
    }

    pub fn increase_quantity(&mut self) -> Result<i64> {
        self.step_quantity_input("#quantityInput", 1)
    }

    pub fn decrease_quantity(&mut self) -> Result<i64> {
        self.step_quantity_input("#quantityInput", -1)
    }

    /// Search box debounce: every keystroke cancels the pending search;
    /// only queries of at least three characters schedule a new one.
    pub(crate) fn handle_search_input(&mut self, query: &str) {
        if let Some(timer) = self.search_timer.take() {
            self.scheduler.clear(timer);
        }
        if query.chars().count() >= SEARCH_MIN_QUERY_CHARS {
            let timer = self.scheduler.schedule(
                SEARCH_DEBOUNCE_MS,
                TimerTask::RunSearch {
                    query: query.to_string(),
                },
            );
            self.search_timer = Some(timer);
        }
    }

    /// Anchor navigation to `#fragment`: jumps to the target's position
    /// minus the fixed header height. Unknown fragments do nothing.
    pub(crate) fn smooth_scroll_to(&mut self, fragment: &str) {
        let Some(target) = self.dom.by_id(fragment) else {
            return;
        };
        let top = self.layout.get(&target).copied().unwrap_or(0);
        self.scroll_to((top - HEADER_OFFSET_PX).max(0));
    }

    pub(crate) fn init_widget_marks(&mut self) -> Result<()> {
        for node in self.query_all_nodes(r#"[data-bs-toggle="tooltip"]"#)? {
            self.dom.set_attr(node, "data-widget-ready", "tooltip");
            self.widget_marks.tooltips += 1;
        }
        for node in self.query_all_nodes(r#"[data-bs-toggle="popover"]"#)? {
            self.dom.set_attr(node, "data-widget-ready", "popover");
            self.widget_marks.popovers += 1;
        }
        Ok(())
    }

    pub fn tooltip_count(&self) -> usize {
        self.widget_marks.tooltips
    }

    pub fn popover_count(&self) -> usize {
        self.widget_marks.popovers
    }

    pub(crate) fn hide_alerts(&mut self) {
        let alerts = match self.query_all_nodes(".alert") {
            Ok(alerts) => alerts,
            Err(_) => return,
        };
        let count = alerts.len();
        for alert in alerts {
            self.dom.set_style_property(alert, "display", "none");
        }
        if count > 0 {
            self.trace(format!("auto-hid {count} alerts"));
        }
    }

    /// Product gallery: point `#mainImage` at `image_url` and move the
    /// `active` marker to the chosen thumbnail.
    pub fn change_main_image(
        &mut self,
        image_url: &str,
        thumbnail_selector: Option<&str>,
    ) -> Result<()> {
        let main = self.require_one("#mainImage")?;
        self.dom.set_attr(main, "src", image_url);
        for thumb in self.query_all_nodes(".thumbnail")? {
            self.dom.remove_class(thumb, "active");
        }
        if let Some(selector) = thumbnail_selector {
            let thumb = self.require_one(selector)?;
            self.dom.add_class(thumb, "active");
        }
        Ok(())
    }
}

fn parse_attr(attr: Option<&str>, fallback: i64) -> i64 {
    attr.and_then(|value| value.parse().ok()).unwrap_or(fallback)
}

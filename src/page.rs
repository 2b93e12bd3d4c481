use std::collections::{HashMap, VecDeque};

use crate::backend::{ConfirmMock, Method, MockBackend, NavigationState, RecordedCall};
use crate::dom::{truncate_chars, Dom, NodeId};
use crate::lazy::{LazyImages, Viewport};
use crate::notify::NotifierState;
use crate::scheduler::{PendingTimer, Scheduler, TimerTask};
use crate::selector::Selector;
use crate::widgets::WidgetMarks;
use crate::{Error, Result};

const DEFAULT_URL: &str = "https://markett.local/";
pub(crate) const ALERT_AUTO_HIDE_MS: i64 = 5_000;

/// Console-style trace ring buffer. Entries always go to the `log` facade;
/// the buffer itself only collects when tracing is enabled so tests can
/// assert on it.
#[derive(Debug)]
pub(crate) struct TraceState {
    enabled: bool,
    logs: VecDeque<String>,
    log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

/// One loaded storefront page: the DOM, the virtual clock, the mocked
/// backend and dialogs, and the wired page behaviors (cart, likes,
/// notifications, lazy images, misc UI helpers).
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) document_url: String,
    pub(crate) cookie: String,
    pub(crate) scheduler: Scheduler,
    pub(crate) backend: MockBackend,
    pub(crate) confirm_mock: ConfirmMock,
    pub(crate) navigation: NavigationState,
    pub(crate) notifier: NotifierState,
    pub(crate) lazy: LazyImages,
    pub(crate) viewport: Viewport,
    pub(crate) layout: HashMap<NodeId, i64>,
    pub(crate) search_timer: Option<i64>,
    pub(crate) widget_marks: WidgetMarks,
    pub(crate) trace_state: TraceState,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::open(DEFAULT_URL, html)
    }

    pub fn open(url: &str, html: &str) -> Result<Self> {
        let dom = Dom::parse(html)?;
        let mut page = Self {
            dom,
            document_url: url.to_string(),
            cookie: String::new(),
            scheduler: Scheduler::default(),
            backend: MockBackend::default(),
            confirm_mock: ConfirmMock::default(),
            navigation: NavigationState::default(),
            notifier: NotifierState::default(),
            lazy: LazyImages::default(),
            viewport: Viewport::default(),
            layout: HashMap::new(),
            search_timer: None,
            widget_marks: WidgetMarks::default(),
            trace_state: TraceState::default(),
        };
        page.init()?;
        Ok(page)
    }

    /// Page-load wiring that needs no network: layout hints, lazy image
    /// observation, widget marks, the legacy alert auto-hide timer.
    /// Like-button status fetches are a separate explicit step
    /// ([`Page::init_like_buttons`]) so tests can install route mocks first.
    fn init(&mut self) -> Result<()> {
        self.read_layout_hints()?;
        self.init_lazy_images()?;
        self.init_widget_marks()?;
        self.scheduler.schedule(ALERT_AUTO_HIDE_MS, TimerTask::HideAlerts);
        self.check_lazy_images();
        self.trace("storefront page initialized");
        Ok(())
    }

    fn read_layout_hints(&mut self) -> Result<()> {
        for node in self.query_all_nodes("[data-top]")? {
            if let Some(top) = self
                .dom
                .attr(node, "data-top")
                .and_then(|raw| raw.parse::<i64>().ok())
            {
                self.layout.insert(node, top);
            }
        }
        Ok(())
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    pub fn set_cookie(&mut self, cookie: &str) {
        self.cookie = cookie.to_string();
    }

    pub(crate) fn cookie(&self) -> &str {
        &self.cookie
    }

    pub(crate) fn dom(&self) -> &Dom {
        &self.dom
    }

    // ---- interaction -------------------------------------------------

    /// Dispatches a click at the selector's first match and bubbles it up
    /// the ancestor chain until a wired behavior claims it.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.require_one(selector)?;
        let mut chain = vec![target];
        let mut current = target;
        while let Some(parent) = self.dom.node(current).parent {
            chain.push(parent);
            current = parent;
        }

        for node in chain {
            if self.dom.has_class(node, "like-btn") {
                self.toggle_like_node(node)?;
                return Ok(());
            }
            let is_anchor = self
                .dom
                .element(node)
                .is_some_and(|element| element.tag_name == "a");
            if is_anchor {
                if let Some(href) = self.dom.attr(node, "href").map(ToOwned::to_owned) {
                    if let Some(fragment) = href.strip_prefix('#') {
                        if !fragment.is_empty() {
                            self.smooth_scroll_to(fragment);
                        }
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let node = self.require_one(selector)?;
        let tag = self
            .dom
            .element(node)
            .map(|element| element.tag_name.clone())
            .unwrap_or_default();
        if tag != "form" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form".to_string(),
                actual: tag,
            });
        }
        if self.dom.has_class(node, "add-to-cart-form") {
            self.legacy_add_to_cart(node)?;
        } else {
            self.trace(format!("unhandled submit: {selector}"));
        }
        Ok(())
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let node = self.require_one(selector)?;
        self.dom.set_value(node, text);
        if self.dom.attr(node, "id") == Some("searchInput") {
            self.handle_search_input(text);
        }
        Ok(())
    }

    /// Alias for [`Page::type_text`]; reads like firing an `input` event.
    pub fn input(&mut self, selector: &str, text: &str) -> Result<()> {
        self.type_text(selector, text)
    }

    // ---- virtual clock -----------------------------------------------

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        let target = self.scheduler.now_ms().saturating_add(delta_ms.max(0));
        self.advance_time_to(target)
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let limit = self.scheduler.timer_step_limit();
        let mut steps = 0usize;
        while let Some(scheduled) = self.scheduler.take_next_due(target_ms) {
            steps += 1;
            if steps > limit {
                return Err(Error::TimerStepLimit { limit });
            }
            self.scheduler.set_now(scheduled.due_at);
            self.execute_task(scheduled.task)?;
        }
        self.scheduler.set_now(target_ms);
        Ok(())
    }

    /// Runs timers already due at the current virtual time.
    pub fn run_due_timers(&mut self) -> Result<usize> {
        let now = self.scheduler.now_ms();
        let limit = self.scheduler.timer_step_limit();
        let mut steps = 0usize;
        while let Some(scheduled) = self.scheduler.take_next_due(now) {
            steps += 1;
            if steps > limit {
                return Err(Error::TimerStepLimit { limit });
            }
            self.execute_task(scheduled.task)?;
        }
        Ok(steps)
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    pub fn clear_timer(&mut self, timer_id: i64) -> bool {
        if self.search_timer == Some(timer_id) {
            self.search_timer = None;
        }
        self.scheduler.clear(timer_id)
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::InvalidLimit("timer step limit must be at least 1".into()));
        }
        self.scheduler.set_timer_step_limit(max_steps);
        Ok(())
    }

    fn execute_task(&mut self, task: TimerTask) -> Result<()> {
        match task {
            TimerTask::NotificationEnter { node } => self.dom.add_class(node, "show"),
            TimerTask::NotificationExit { node } => self.dom.remove_class(node, "show"),
            TimerTask::NotificationRemove { node } => self.dom.detach(node),
            TimerTask::ReloadPage => self.record_reload(),
            TimerTask::RunSearch { query } => {
                self.search_timer = None;
                self.trace(format!("Searching for: {query}"));
            }
            TimerTask::HideAlerts => self.hide_alerts(),
        }
        Ok(())
    }

    pub(crate) fn record_reload(&mut self) {
        self.navigation.record_reload();
        let url = self.document_url.clone();
        self.trace(format!("page reload: {url}"));
    }

    pub fn reload_count(&self) -> usize {
        self.navigation.reload_count()
    }

    // ---- mocks -------------------------------------------------------

    pub fn mock_response(&mut self, method: Method, path: &str, body: &str) {
        self.backend.mock_response(method, path, body);
    }

    pub fn mock_response_once(&mut self, method: Method, path: &str, body: &str) {
        self.backend.mock_response_once(method, path, body);
    }

    pub fn mock_network_failure(&mut self, method: Method, path: &str) {
        self.backend.mock_network_failure(method, path);
    }

    pub fn mock_network_failure_once(&mut self, method: Method, path: &str) {
        self.backend.mock_network_failure_once(method, path);
    }

    pub fn queue_confirm_response(&mut self, response: bool) {
        self.confirm_mock.queue(response);
    }

    pub fn set_default_confirm_response(&mut self, response: bool) {
        self.confirm_mock.set_default(response);
    }

    pub(crate) fn confirm(&mut self, message: &str) -> bool {
        let answer = self.confirm_mock.answer();
        self.trace(format!("confirm: {message} -> {answer}"));
        answer
    }

    pub fn recorded_calls(&self) -> &[RecordedCall] {
        self.backend.recorded_calls()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.backend.calls_to(method, path)
    }

    // ---- queries and assertions --------------------------------------

    pub(crate) fn query_all_nodes(&self, selector: &str) -> Result<Vec<NodeId>> {
        let parsed = Selector::parse(selector)?;
        Ok(parsed.query_all(&self.dom, self.dom.root()))
    }

    pub(crate) fn require_one(&self, selector: &str) -> Result<NodeId> {
        self.query_all_nodes(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn exists(&self, selector: &str) -> Result<bool> {
        Ok(!self.query_all_nodes(selector)?.is_empty())
    }

    pub fn text_of(&self, selector: &str) -> Result<String> {
        let node = self.require_one(selector)?;
        Ok(collapse_whitespace(&self.dom.text_content(node)))
    }

    pub fn value_of(&self, selector: &str) -> Result<String> {
        let node = self.require_one(selector)?;
        Ok(self.dom.value(node).unwrap_or_default().to_string())
    }

    pub fn attr_of(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let node = self.require_one(selector)?;
        Ok(self.dom.attr(node, name).map(ToOwned::to_owned))
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let node = self.require_one(selector)?;
        Ok(self.dom.has_class(node, class_name))
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let node = self.require_one(selector)?;
        let actual = collapse_whitespace(&self.dom.text_content(node));
        if actual == expected {
            return Ok(());
        }
        Err(self.assertion_failed(selector, expected, &actual, node))
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let node = self.require_one(selector)?;
        let actual = self.dom.value(node).unwrap_or_default().to_string();
        if actual == expected {
            return Ok(());
        }
        Err(self.assertion_failed(selector, expected, &actual, node))
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.require_one(selector).map(|_| ())
    }

    pub fn assert_not_exists(&self, selector: &str) -> Result<()> {
        match self.query_all_nodes(selector)?.first() {
            None => Ok(()),
            Some(node) => Err(self.assertion_failed(selector, "no match", "a match", *node)),
        }
    }

    fn assertion_failed(
        &self,
        selector: &str,
        expected: &str,
        actual: &str,
        node: NodeId,
    ) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            dom_snippet: truncate_chars(&self.dom.serialize(node), 160),
        }
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let node = self.require_one(selector)?;
        Ok(self.dom.serialize(node))
    }

    // ---- trace -------------------------------------------------------

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidLimit("trace log limit must be at least 1".into()));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > max_entries {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub(crate) fn trace(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!(target: "markett_frontend", "{message}");
        if !self.trace_state.enabled {
            return;
        }
        self.trace_state.logs.push_back(message);
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
    }
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

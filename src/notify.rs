use crate::dom::NodeId;
use crate::page::Page;
use crate::scheduler::TimerTask;

pub(crate) const NOTIFICATION_ROOT_ID: &str = "notification-root";
pub(crate) const NOTIFICATION_STYLE_ID: &str = "notification-styles";
pub(crate) const DEFAULT_NOTIFICATION_DURATION_MS: i64 = 3_000;
pub(crate) const NOTIFICATION_ENTER_DELAY_MS: i64 = 100;
pub(crate) const NOTIFICATION_EXIT_TRANSITION_MS: i64 = 300;

const NOTIFICATION_CSS: &str = "\
.notification { position: fixed; top: 20px; right: 20px; padding: 16px 24px; \
border-radius: 12px; font-weight: 500; z-index: 10000; \
transform: translateX(400px); transition: transform 0.3s ease; } \
.notification.show { transform: translateX(0); } \
.notification-success { background: #10b981; color: white; } \
.notification-error { background: #ef4444; color: white; }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Page-session singleton: one container, one injected style block, no
/// teardown. Only `show` is exposed; everything else is timers.
#[derive(Debug, Default)]
pub(crate) struct NotifierState {
    container: Option<NodeId>,
}

impl Page {
    pub fn show_notification(&mut self, kind: NotificationKind, message: &str) {
        self.show_notification_for(kind, message, DEFAULT_NOTIFICATION_DURATION_MS);
    }

    /// Creates the notification element, plays the enter transition after a
    /// short delay, and removes the element once the duration plus the exit
    /// transition has elapsed. Each notification owns its own timers; there
    /// is no queue, no cap, and no dedup.
    ///
    /// The message is stored as a text node, so markup in server-supplied
    /// strings is escaped whenever the DOM is serialized.
    pub fn show_notification_for(&mut self, kind: NotificationKind, message: &str, duration_ms: i64) {
        let container = self.ensure_notification_container();
        let class = format!("notification notification-{}", kind.suffix());
        let node = self
            .dom
            .create_element(Some(container), "div", &[("class", &class), ("role", "alert")]);
        self.dom.create_text(node, message);

        let duration = duration_ms.max(0);
        self.scheduler
            .schedule(NOTIFICATION_ENTER_DELAY_MS, TimerTask::NotificationEnter { node });
        self.scheduler
            .schedule(duration, TimerTask::NotificationExit { node });
        self.scheduler.schedule(
            duration.saturating_add(NOTIFICATION_EXIT_TRANSITION_MS),
            TimerTask::NotificationRemove { node },
        );
        self.trace(format!("notification [{}] {message}", kind.suffix()));
    }

    fn ensure_notification_container(&mut self) -> NodeId {
        if let Some(container) = self.notifier.container {
            if self.dom.is_attached(container) {
                return container;
            }
        }

        let head = self.dom.head_or_root();
        if self.dom.by_id(NOTIFICATION_STYLE_ID).is_none() {
            let style = self
                .dom
                .create_element(Some(head), "style", &[("id", NOTIFICATION_STYLE_ID)]);
            self.dom.create_text(style, NOTIFICATION_CSS);
        }

        let body = self.dom.body_or_root();
        let container = self.dom.create_element(
            Some(body),
            "div",
            &[("id", NOTIFICATION_ROOT_ID), ("class", "notification-container")],
        );
        self.notifier.container = Some(container);
        container
    }

    /// Messages of the notifications currently attached to the page, in
    /// creation order.
    pub fn visible_notifications(&self) -> Vec<String> {
        let Some(container) = self
            .notifier
            .container
            .filter(|container| self.dom.is_attached(*container))
        else {
            return Vec::new();
        };
        self.dom
            .node(container)
            .children
            .iter()
            .filter(|node| self.dom.has_class(**node, "notification"))
            .map(|node| crate::page::collapse_whitespace(&self.dom.text_content(*node)))
            .collect()
    }

    pub fn notification_count(&self) -> usize {
        self.visible_notifications().len()
    }
}

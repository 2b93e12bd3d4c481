use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{form_urlencode, ActionRequest, Method, TransportError};
use crate::csrf::{TokenSource, CSRF_HEADER};
use crate::dom::NodeId;
use crate::notify::NotificationKind;
use crate::page::Page;
use crate::scheduler::TimerTask;
use crate::selector::Selector;
use crate::{Error, Result};

pub(crate) const CART_RELOAD_DELAY_MS: i64 = 1_000;

// User-facing strings are hard-coded in the storefront's locale.
pub const MSG_ADDED_TO_CART: &str = "Mahsulot savatga qo'shildi!";
pub const MSG_GENERIC_ERROR: &str = "Xatolik yuz berdi";
pub const MSG_CONFIRM_REMOVE: &str = "Mahsulotni o'chirmoqchimisiz?";
pub const MSG_LIKE_TOGGLED: &str = "Yoqtirish yangilandi";
pub const MSG_LIKE_LOGIN_REQUIRED: &str = "Please login to like products";
pub const MSG_LEGACY_ADD_FAILED: &str = "Failed to add item to cart";

/// What a successful action does after its response is applied. Reload is
/// the storefront's consistency mechanism: rather than reconciling cart
/// state client-side, the whole page is reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessEffect {
    Reload { delay_ms: i64 },
    UpdateFields,
    None,
}

/// Terminal outcome of one user action. `Rejected` covers application
/// failures, transport failures, and undecodable responses alike; all of
/// them surface only as an error notification. `Aborted` is a declined
/// confirmation: no request, no notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Rejected { message: String },
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AddToCart,
    RemoveFromCart,
    UpdateCartQuantity,
    ToggleWishlist,
    ToggleLike,
    LikeStatus,
}

impl ActionKind {
    pub fn method(self) -> Method {
        match self {
            Self::LikeStatus => Method::Get,
            _ => Method::Post,
        }
    }

    pub fn path(self, id: &str) -> String {
        match self {
            Self::AddToCart => format!("/cart/add/{id}/"),
            Self::RemoveFromCart => format!("/cart/remove/{id}/"),
            Self::UpdateCartQuantity => format!("/cart/update/{id}/"),
            Self::ToggleWishlist => format!("/wishlist/toggle/{id}/"),
            Self::ToggleLike => format!("/products/like/{id}/"),
            Self::LikeStatus => format!("/products/like-status/{id}/"),
        }
    }

    pub fn success_effect(self) -> SuccessEffect {
        match self {
            Self::AddToCart => SuccessEffect::Reload {
                delay_ms: CART_RELOAD_DELAY_MS,
            },
            Self::RemoveFromCart | Self::UpdateCartQuantity => {
                SuccessEffect::Reload { delay_ms: 0 }
            }
            Self::ToggleWishlist | Self::ToggleLike => SuccessEffect::UpdateFields,
            Self::LikeStatus => SuccessEffect::None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cart_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartMutationResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WishlistToggleResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeToggleResponse {
    pub success: bool,
    #[serde(default)]
    pub liked: Option<bool>,
    #[serde(default)]
    pub likes_count: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeStatusResponse {
    pub liked: bool,
}

impl Page {
    fn send_raw(
        &mut self,
        method: Method,
        path: &str,
        headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> std::result::Result<String, TransportError> {
        self.trace(format!("fetch {method} {path}"));
        self.backend.dispatch(ActionRequest {
            method,
            path: path.to_string(),
            headers,
            body,
        })
    }

    fn send_json(
        &mut self,
        method: Method,
        path: &str,
        token: Option<String>,
        body: Option<serde_json::Value>,
    ) -> std::result::Result<String, TransportError> {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            headers.push((CSRF_HEADER.to_string(), token));
        }
        self.send_raw(method, path, headers, body.map(|value| value.to_string()))
    }

    /// Failure surface shared by every action: a console trace and an
    /// error notification, nothing else. No retry, no DOM mutation.
    fn fail_action(&mut self, action: &str, message: &str, detail: &str) -> ActionOutcome {
        log::warn!(target: "markett_frontend", "{action} failed: {detail}");
        self.trace(format!("{action} failed: {detail}"));
        self.show_notification(NotificationKind::Error, message);
        ActionOutcome::Rejected {
            message: message.to_string(),
        }
    }

    pub(crate) fn apply_success_effect(&mut self, effect: SuccessEffect) {
        match effect {
            SuccessEffect::Reload { delay_ms } if delay_ms <= 0 => self.record_reload(),
            SuccessEffect::Reload { delay_ms } => {
                self.scheduler.schedule(delay_ms, TimerTask::ReloadPage);
            }
            SuccessEffect::UpdateFields | SuccessEffect::None => {}
        }
    }

    /// POST `/cart/add/{id}/` with a JSON quantity. Success updates the
    /// `.cart-badge`, shows a toast, and schedules the consistency reload.
    pub fn add_to_cart(&mut self, product_id: u64, quantity: i64) -> Result<ActionOutcome> {
        let kind = ActionKind::AddToCart;
        let path = kind.path(&product_id.to_string());
        let token = self.csrf_token(TokenSource::Cookie);
        let reply = self.send_json(
            kind.method(),
            &path,
            token,
            Some(json!({ "quantity": quantity })),
        );
        let response: AddToCartResponse = match decode(reply) {
            Ok(response) => response,
            Err(detail) => return Ok(self.fail_action("add-to-cart", MSG_GENERIC_ERROR, &detail)),
        };

        if !response.success {
            let message = response.message.as_deref().unwrap_or(MSG_GENERIC_ERROR);
            let message = message.to_string();
            return Ok(self.fail_action("add-to-cart", &message, "rejected by backend"));
        }

        if let Some(count) = response.cart_count {
            self.update_cart_badge(count)?;
        }
        let message = response
            .message
            .unwrap_or_else(|| MSG_ADDED_TO_CART.to_string());
        self.show_notification(NotificationKind::Success, &message);
        self.apply_success_effect(kind.success_effect());
        Ok(ActionOutcome::Applied)
    }

    /// POST `/cart/remove/{id}/`, gated on an interactive confirmation.
    /// Declining aborts before any request is built. Success reloads
    /// immediately and shows no notification.
    pub fn remove_from_cart(&mut self, item_id: u64) -> Result<ActionOutcome> {
        if !self.confirm(MSG_CONFIRM_REMOVE) {
            return Ok(ActionOutcome::Aborted);
        }
        let kind = ActionKind::RemoveFromCart;
        let path = kind.path(&item_id.to_string());
        let token = self.csrf_token(TokenSource::Cookie);
        let reply = self.send_json(kind.method(), &path, token, None);
        let response: CartMutationResponse = match decode(reply) {
            Ok(response) => response,
            Err(detail) => {
                return Ok(self.fail_action("remove-from-cart", MSG_GENERIC_ERROR, &detail));
            }
        };

        if !response.success {
            let message = response.message.as_deref().unwrap_or(MSG_GENERIC_ERROR);
            let message = message.to_string();
            return Ok(self.fail_action("remove-from-cart", &message, "rejected by backend"));
        }
        self.apply_success_effect(kind.success_effect());
        Ok(ActionOutcome::Applied)
    }

    /// POST `/cart/update/{id}/` with the new quantity; success reloads
    /// immediately.
    pub fn update_cart_quantity(&mut self, item_id: u64, quantity: i64) -> Result<ActionOutcome> {
        let kind = ActionKind::UpdateCartQuantity;
        let path = kind.path(&item_id.to_string());
        let token = self.csrf_token(TokenSource::Cookie);
        let reply = self.send_json(
            kind.method(),
            &path,
            token,
            Some(json!({ "quantity": quantity })),
        );
        let response: CartMutationResponse = match decode(reply) {
            Ok(response) => response,
            Err(detail) => {
                return Ok(self.fail_action("update-cart-quantity", MSG_GENERIC_ERROR, &detail));
            }
        };

        if !response.success {
            let message = response.message.as_deref().unwrap_or(MSG_GENERIC_ERROR);
            let message = message.to_string();
            return Ok(self.fail_action("update-cart-quantity", &message, "rejected by backend"));
        }
        self.apply_success_effect(kind.success_effect());
        Ok(ActionOutcome::Applied)
    }

    /// POST `/wishlist/toggle/{id}/`; success only shows a toast.
    pub fn toggle_wishlist(&mut self, product_id: u64) -> Result<ActionOutcome> {
        let kind = ActionKind::ToggleWishlist;
        let path = kind.path(&product_id.to_string());
        let token = self.csrf_token(TokenSource::Cookie);
        let reply = self.send_json(kind.method(), &path, token, None);
        let response: WishlistToggleResponse = match decode(reply) {
            Ok(response) => response,
            Err(detail) => {
                return Ok(self.fail_action("toggle-wishlist", MSG_GENERIC_ERROR, &detail));
            }
        };

        if !response.success {
            let message = response.message.as_deref().unwrap_or(MSG_GENERIC_ERROR);
            let message = message.to_string();
            return Ok(self.fail_action("toggle-wishlist", &message, "rejected by backend"));
        }
        // The wishlist toast carries the server's wording or nothing at all.
        if let Some(message) = response.message {
            self.show_notification(NotificationKind::Success, &message);
        }
        self.apply_success_effect(kind.success_effect());
        Ok(ActionOutcome::Applied)
    }

    /// Like toggle for the first match of `selector` (a `.like-btn` with a
    /// `data-product-id`).
    pub fn toggle_like(&mut self, selector: &str) -> Result<ActionOutcome> {
        let button = self.require_one(selector)?;
        self.toggle_like_node(button)
    }

    pub(crate) fn toggle_like_node(&mut self, button: NodeId) -> Result<ActionOutcome> {
        let product_id = self
            .dom
            .attr(button, "data-product-id")
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::TypeMismatch {
                selector: ".like-btn".to_string(),
                expected: "data-product-id attribute".to_string(),
                actual: "missing".to_string(),
            })?;
        let kind = ActionKind::ToggleLike;
        let path = kind.path(&product_id);
        let token = self.csrf_token(TokenSource::HiddenField);
        let reply = self.send_json(kind.method(), &path, token, None);
        let response: LikeToggleResponse = match decode(reply) {
            Ok(response) => response,
            Err(detail) => {
                return Ok(self.fail_action("toggle-like", MSG_LIKE_LOGIN_REQUIRED, &detail));
            }
        };

        if !response.success {
            let message = response
                .message
                .as_deref()
                .unwrap_or(MSG_LIKE_LOGIN_REQUIRED);
            let message = message.to_string();
            return Ok(self.fail_action("toggle-like", &message, "rejected by backend"));
        }

        if let Some(liked) = response.liked {
            self.apply_like_state(button, liked);
        }
        if let Some(count) = response.likes_count {
            self.set_likes_count(button, count)?;
        }
        let message = response
            .message
            .unwrap_or_else(|| MSG_LIKE_TOGGLED.to_string());
        self.show_notification(NotificationKind::Success, &message);
        self.apply_success_effect(kind.success_effect());
        Ok(ActionOutcome::Applied)
    }

    fn apply_like_state(&mut self, button: NodeId, liked: bool) {
        let icon = Selector::parse("i")
            .ok()
            .and_then(|selector| selector.query_all(&self.dom, button).into_iter().next());
        if let Some(icon) = icon {
            if liked {
                self.dom.remove_class(icon, "bi-heart");
                self.dom.add_class(icon, "bi-heart-fill");
            } else {
                self.dom.remove_class(icon, "bi-heart-fill");
                self.dom.add_class(icon, "bi-heart");
            }
        }
        if liked {
            self.dom.add_class(button, "liked");
        } else {
            self.dom.remove_class(button, "liked");
        }
    }

    fn set_likes_count(&mut self, button: NodeId, count: i64) -> Result<()> {
        let counters = Selector::parse(".likes-count")?.query_all(&self.dom, button);
        for counter in counters {
            self.dom.set_text_content(counter, &count.to_string());
        }
        Ok(())
    }

    /// Page-load hook: fetch the like status of every `.like-btn` and fill
    /// in the already-liked ones. Fetch errors are traced and skipped.
    pub fn init_like_buttons(&mut self) -> Result<()> {
        let buttons = self.query_all_nodes(".like-btn")?;
        for button in buttons {
            let Some(product_id) = self.dom.attr(button, "data-product-id").map(ToOwned::to_owned)
            else {
                continue;
            };
            let kind = ActionKind::LikeStatus;
            let path = kind.path(&product_id);
            let reply = self.send_raw(kind.method(), &path, Vec::new(), None);
            match decode::<LikeStatusResponse>(reply) {
                Ok(status) => {
                    if status.liked {
                        self.apply_like_state(button, true);
                    }
                }
                Err(detail) => self.trace(format!("Error loading like status: {detail}")),
            }
        }
        Ok(())
    }

    /// The jQuery-era add-to-cart path: the form's named fields are posted
    /// form-encoded to its `action`, with the AJAX marker header. Success
    /// rewrites every `.cart-count`; there is no reload here.
    pub(crate) fn legacy_add_to_cart(&mut self, form: NodeId) -> Result<ActionOutcome> {
        let action = self
            .dom
            .attr(form, "action")
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::TypeMismatch {
                selector: "form.add-to-cart-form".to_string(),
                expected: "action attribute".to_string(),
                actual: "missing".to_string(),
            })?;

        let mut pairs = Vec::new();
        for node in self.dom.descendant_elements(form) {
            let Some(element) = self.dom.element(node) else {
                continue;
            };
            if matches!(element.tag_name.as_str(), "input" | "select" | "textarea") {
                if let Some(name) = element.attrs.get("name") {
                    pairs.push((name.clone(), element.value.clone()));
                }
            }
        }

        let mut headers = vec![
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
        ];
        if let Some(token) = self.csrf_token(TokenSource::Cookie).filter(|t| !t.is_empty()) {
            headers.push((CSRF_HEADER.to_string(), token));
        }

        let reply = self.send_raw(Method::Post, &action, headers, Some(form_urlencode(&pairs)));
        let response: AddToCartResponse = match decode(reply) {
            Ok(response) => response,
            Err(detail) => {
                return Ok(self.fail_action("add-to-cart form", MSG_LEGACY_ADD_FAILED, &detail));
            }
        };

        if !response.success {
            let message = response.message.as_deref().unwrap_or(MSG_LEGACY_ADD_FAILED);
            let message = message.to_string();
            return Ok(self.fail_action("add-to-cart form", &message, "rejected by backend"));
        }

        if let Some(count) = response.cart_count {
            for counter in self.query_all_nodes(".cart-count")? {
                self.dom.set_text_content(counter, &count.to_string());
            }
        }
        let message = response
            .message
            .unwrap_or_else(|| MSG_ADDED_TO_CART.to_string());
        self.show_notification(NotificationKind::Success, &message);
        self.apply_success_effect(SuccessEffect::UpdateFields);
        Ok(ActionOutcome::Applied)
    }

    fn update_cart_badge(&mut self, count: i64) -> Result<()> {
        for badge in self.query_all_nodes(".cart-badge")? {
            self.dom.set_text_content(badge, &count.to_string());
            self.dom.set_style_property(badge, "display", "flex");
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(
    reply: std::result::Result<String, TransportError>,
) -> std::result::Result<T, String> {
    let body = reply.map_err(|err| err.to_string())?;
    serde_json::from_str(&body).map_err(|err| format!("undecodable response: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_table_matches_the_backend_contract() {
        assert_eq!(ActionKind::AddToCart.path("5"), "/cart/add/5/");
        assert_eq!(ActionKind::RemoveFromCart.path("9"), "/cart/remove/9/");
        assert_eq!(ActionKind::UpdateCartQuantity.path("9"), "/cart/update/9/");
        assert_eq!(ActionKind::ToggleWishlist.path("3"), "/wishlist/toggle/3/");
        assert_eq!(ActionKind::ToggleLike.path("3"), "/products/like/3/");
        assert_eq!(
            ActionKind::LikeStatus.path("3"),
            "/products/like-status/3/"
        );
        assert_eq!(ActionKind::LikeStatus.method(), Method::Get);
        assert_eq!(ActionKind::AddToCart.method(), Method::Post);
    }

    #[test]
    fn success_effects_are_explicit_per_action() {
        assert_eq!(
            ActionKind::AddToCart.success_effect(),
            SuccessEffect::Reload { delay_ms: 1_000 }
        );
        assert_eq!(
            ActionKind::RemoveFromCart.success_effect(),
            SuccessEffect::Reload { delay_ms: 0 }
        );
        assert_eq!(
            ActionKind::ToggleLike.success_effect(),
            SuccessEffect::UpdateFields
        );
        assert_eq!(ActionKind::LikeStatus.success_effect(), SuccessEffect::None);
    }

    #[test]
    fn optional_response_fields_default_to_none() {
        let response: LikeToggleResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.liked, None);
        assert_eq!(response.likes_count, None);
        assert_eq!(response.message, None);
    }
}

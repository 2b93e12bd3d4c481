//! Deterministic runtime for a storefront's client-side behaviors.
//!
//! The crate models the interactive surface of an e-commerce page (cart
//! mutations, wishlist and like toggles, toast notifications, lazy
//! images, quantity steppers, search debounce) over an in-memory DOM, a
//! virtual clock, and a mocked HTTP backend. Nothing here touches a real
//! browser or network: time only advances when a test says so, and every
//! request is answered by a mock installed up front, so flows that are
//! racy in production (debounced search, delayed reloads, duplicated
//! submissions) become exactly reproducible.
//!
//! ```
//! use markett_frontend::{ActionOutcome, Method, Page};
//!
//! let mut page = Page::from_html(
//!     r#"<span class="cart-badge" style="display: none">0</span>"#,
//! ).unwrap();
//! page.set_cookie("csrftoken=tok");
//! page.mock_response(
//!     Method::Post,
//!     "/cart/add/7/",
//!     r#"{"success": true, "cart_count": 3}"#,
//! );
//!
//! let outcome = page.add_to_cart(7, 1).unwrap();
//! assert_eq!(outcome, ActionOutcome::Applied);
//! page.assert_text(".cart-badge", "3").unwrap();
//! ```

use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error("assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    #[error("timer step limit exceeded: {limit}")]
    TimerStepLimit { limit: usize },
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

mod actions;
mod backend;
mod csrf;
mod dom;
mod lazy;
mod notify;
mod page;
mod scheduler;
mod selector;
mod widgets;

pub use actions::{
    ActionKind, ActionOutcome, AddToCartResponse, CartMutationResponse, LikeStatusResponse,
    LikeToggleResponse, SuccessEffect, WishlistToggleResponse, MSG_ADDED_TO_CART,
    MSG_CONFIRM_REMOVE, MSG_GENERIC_ERROR, MSG_LEGACY_ADD_FAILED, MSG_LIKE_LOGIN_REQUIRED,
    MSG_LIKE_TOGGLED,
};
pub use backend::{Method, RecordedCall};
pub use csrf::TokenSource;
pub use notify::NotificationKind;
pub use page::Page;
pub use scheduler::PendingTimer;
pub use widgets::step_quantity;

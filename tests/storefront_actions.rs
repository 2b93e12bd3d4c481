use markett_frontend::{
    ActionOutcome, Method, Page, Result, MSG_ADDED_TO_CART, MSG_GENERIC_ERROR,
    MSG_LIKE_LOGIN_REQUIRED,
};

const CART_PAGE_HTML: &str = r#"
    <header>
      <span class="cart-badge" style="display: none; font-weight: 600">0</span>
    </header>
    <div id="items">
      <div class="cart-item" data-item-id="9"></div>
    </div>
"#;

const PRODUCT_PAGE_HTML: &str = r#"
    <form>
      <input type="hidden" name="csrfmiddlewaretoken" value="form-token">
    </form>
    <button class="like-btn" data-product-id="7">
      <i class="bi bi-heart"></i>
      <span class="likes-count">3</span>
    </button>
"#;

#[test]
fn add_to_cart_posts_json_with_the_cookie_token() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123; sessionid=zzz");
    page.mock_response(
        Method::Post,
        "/cart/add/7/",
        r#"{"success": true, "cart_count": 4}"#,
    );

    assert_eq!(page.add_to_cart(7, 2)?, ActionOutcome::Applied);

    let calls = page.recorded_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/cart/add/7/");
    assert_eq!(calls[0].header("X-CSRFToken"), Some("abc123"));
    assert_eq!(calls[0].header("content-type"), Some("application/json"));
    let body: serde_json::Value =
        serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["quantity"], 2);
    Ok(())
}

#[test]
fn add_to_cart_updates_badge_toasts_and_reloads_after_a_second() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_response(
        Method::Post,
        "/cart/add/7/",
        r#"{"success": true, "cart_count": 4}"#,
    );

    page.add_to_cart(7, 1)?;

    page.assert_text(".cart-badge", "4")?;
    assert_eq!(
        page.attr_of(".cart-badge", "style")?.as_deref(),
        Some("font-weight: 600; display: flex")
    );
    assert_eq!(page.visible_notifications(), vec![MSG_ADDED_TO_CART]);

    assert_eq!(page.reload_count(), 0);
    page.advance_time(999)?;
    assert_eq!(page.reload_count(), 0);
    page.advance_time(1)?;
    assert_eq!(page.reload_count(), 1);
    Ok(())
}

#[test]
fn add_to_cart_without_a_cookie_sends_no_token_header() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.mock_response(Method::Post, "/cart/add/7/", r#"{"success": true}"#);

    page.add_to_cart(7, 1)?;

    assert_eq!(page.recorded_calls()[0].header("X-CSRFToken"), None);
    Ok(())
}

#[test]
fn rejected_add_shows_the_server_message_and_nothing_else() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_response(
        Method::Post,
        "/cart/add/7/",
        r#"{"success": false, "message": "Omborda qolmadi"}"#,
    );

    let outcome = page.add_to_cart(7, 1)?;
    assert_eq!(
        outcome,
        ActionOutcome::Rejected {
            message: "Omborda qolmadi".to_string()
        }
    );
    assert_eq!(page.visible_notifications(), vec!["Omborda qolmadi"]);
    page.assert_text(".cart-badge", "0")?;
    page.advance_time(10_000)?;
    assert_eq!(page.reload_count(), 0);
    Ok(())
}

#[test]
fn network_failure_and_garbage_responses_fall_back_to_the_generic_error() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_network_failure_once(Method::Post, "/cart/add/7/");
    page.mock_response(Method::Post, "/cart/add/7/", "<html>502</html>");

    for _ in 0..2 {
        let outcome = page.add_to_cart(7, 1)?;
        assert_eq!(
            outcome,
            ActionOutcome::Rejected {
                message: MSG_GENERIC_ERROR.to_string()
            }
        );
    }
    assert_eq!(
        page.visible_notifications(),
        vec![MSG_GENERIC_ERROR, MSG_GENERIC_ERROR]
    );
    Ok(())
}

#[test]
fn declined_confirmation_aborts_removal_before_any_request() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.queue_confirm_response(false);

    assert_eq!(page.remove_from_cart(9)?, ActionOutcome::Aborted);
    assert!(page.recorded_calls().is_empty());
    assert_eq!(page.notification_count(), 0);
    assert_eq!(page.reload_count(), 0);
    Ok(())
}

#[test]
fn confirmed_removal_reloads_immediately_without_a_toast() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.queue_confirm_response(true);
    page.mock_response(Method::Post, "/cart/remove/9/", r#"{"success": true}"#);

    assert_eq!(page.remove_from_cart(9)?, ActionOutcome::Applied);
    assert_eq!(page.calls_to(Method::Post, "/cart/remove/9/"), 1);
    assert_eq!(page.reload_count(), 1);
    assert_eq!(page.notification_count(), 0);
    Ok(())
}

#[test]
fn quantity_update_reloads_immediately() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_response(Method::Post, "/cart/update/9/", r#"{"success": true}"#);

    assert_eq!(page.update_cart_quantity(9, 5)?, ActionOutcome::Applied);
    let call = &page.recorded_calls()[0];
    let body: serde_json::Value = serde_json::from_str(call.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["quantity"], 5);
    assert_eq!(page.reload_count(), 1);
    Ok(())
}

#[test]
fn wishlist_toggle_shows_the_server_message() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_response(
        Method::Post,
        "/wishlist/toggle/7/",
        r#"{"success": true, "message": "Sevimlilarga qo'shildi"}"#,
    );

    assert_eq!(page.toggle_wishlist(7)?, ActionOutcome::Applied);
    assert_eq!(page.visible_notifications(), vec!["Sevimlilarga qo'shildi"]);
    assert_eq!(page.reload_count(), 0);
    Ok(())
}

#[test]
fn wishlist_success_without_a_message_stays_silent() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_response(Method::Post, "/wishlist/toggle/7/", r#"{"success": true}"#);

    assert_eq!(page.toggle_wishlist(7)?, ActionOutcome::Applied);
    assert_eq!(page.notification_count(), 0);
    Ok(())
}

#[test]
fn like_click_uses_the_hidden_field_token_and_updates_the_button() -> Result<()> {
    let mut page = Page::from_html(PRODUCT_PAGE_HTML)?;
    page.mock_response(
        Method::Post,
        "/products/like/7/",
        r#"{"success": true, "liked": true, "likes_count": 4}"#,
    );

    // The click lands on the inner icon and bubbles up to the button.
    page.click(".like-btn i")?;

    let call = &page.recorded_calls()[0];
    assert_eq!(call.header("X-CSRFToken"), Some("form-token"));
    assert!(page.has_class(".like-btn", "liked")?);
    assert!(page.has_class(".like-btn i", "bi-heart-fill")?);
    assert!(!page.has_class(".like-btn i", "bi-heart")?);
    page.assert_text(".likes-count", "4")?;
    assert_eq!(page.notification_count(), 1);
    Ok(())
}

#[test]
fn like_toggled_back_restores_the_outline_icon() -> Result<()> {
    let mut page = Page::from_html(PRODUCT_PAGE_HTML)?;
    page.mock_response_once(
        Method::Post,
        "/products/like/7/",
        r#"{"success": true, "liked": true, "likes_count": 4}"#,
    );
    page.mock_response_once(
        Method::Post,
        "/products/like/7/",
        r#"{"success": true, "liked": false, "likes_count": 3}"#,
    );

    page.toggle_like(".like-btn")?;
    page.toggle_like(".like-btn")?;

    assert!(!page.has_class(".like-btn", "liked")?);
    assert!(page.has_class(".like-btn i", "bi-heart")?);
    page.assert_text(".likes-count", "3")?;
    Ok(())
}

#[test]
fn like_transport_failure_asks_the_user_to_log_in() -> Result<()> {
    let mut page = Page::from_html(PRODUCT_PAGE_HTML)?;
    page.mock_network_failure(Method::Post, "/products/like/7/");

    let outcome = page.toggle_like(".like-btn")?;
    assert_eq!(
        outcome,
        ActionOutcome::Rejected {
            message: MSG_LIKE_LOGIN_REQUIRED.to_string()
        }
    );
    assert_eq!(page.visible_notifications(), vec![MSG_LIKE_LOGIN_REQUIRED]);
    assert!(!page.has_class(".like-btn", "liked")?);
    Ok(())
}

#[test]
fn init_like_buttons_prefills_already_liked_products() -> Result<()> {
    let mut page = Page::from_html(PRODUCT_PAGE_HTML)?;
    page.mock_response(
        Method::Get,
        "/products/like-status/7/",
        r#"{"liked": true}"#,
    );

    page.init_like_buttons()?;

    assert_eq!(page.calls_to(Method::Get, "/products/like-status/7/"), 1);
    assert!(page.has_class(".like-btn", "liked")?);
    assert!(page.has_class(".like-btn i", "bi-heart-fill")?);
    assert_eq!(page.notification_count(), 0);
    Ok(())
}

#[test]
fn legacy_form_posts_form_encoded_and_never_reloads() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <span id="headerCount" class="cart-count">0</span>
        <form class="add-to-cart-form" action="/cart/add/12/">
          <input type="hidden" name="csrfmiddlewaretoken" value="tok">
          <input type="number" name="quantity" value="2">
        </form>
        <span id="footerCount" class="cart-count">0</span>
        "#,
    )?;
    page.set_cookie("csrftoken=cookie-tok");
    page.mock_response(
        Method::Post,
        "/cart/add/12/",
        r#"{"success": true, "cart_count": 5}"#,
    );

    page.submit(".add-to-cart-form")?;

    let call = &page.recorded_calls()[0];
    assert_eq!(
        call.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(call.header("X-Requested-With"), Some("XMLHttpRequest"));
    assert_eq!(call.header("X-CSRFToken"), Some("cookie-tok"));
    assert_eq!(
        call.body.as_deref(),
        Some("csrfmiddlewaretoken=tok&quantity=2")
    );

    page.assert_text("#headerCount", "5")?;
    page.assert_text("#footerCount", "5")?;
    assert_eq!(page.visible_notifications(), vec![MSG_ADDED_TO_CART]);
    page.advance_time(60_000)?;
    assert_eq!(page.reload_count(), 0);
    Ok(())
}

#[test]
fn duplicated_add_clicks_settle_on_the_last_response() -> Result<()> {
    let mut page = Page::from_html(CART_PAGE_HTML)?;
    page.set_cookie("csrftoken=abc123");
    page.mock_response_once(
        Method::Post,
        "/cart/add/7/",
        r#"{"success": true, "cart_count": 1}"#,
    );
    page.mock_response(
        Method::Post,
        "/cart/add/7/",
        r#"{"success": true, "cart_count": 2}"#,
    );

    page.add_to_cart(7, 1)?;
    page.add_to_cart(7, 1)?;

    page.assert_text(".cart-badge", "2")?;
    assert_eq!(page.calls_to(Method::Post, "/cart/add/7/"), 2);
    page.advance_time(1_000)?;
    assert_eq!(page.reload_count(), 2);
    Ok(())
}

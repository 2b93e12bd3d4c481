use markett_frontend::{Page, Result};

const CATALOG_HTML: &str = r##"
    <input id="searchInput" type="text" placeholder="Qidirish...">
    <a id="reviewsLink" href="#reviews">Reviews</a>
    <img class="lazy" id="hero" src="placeholder.gif" data-src="hero.jpg" data-top="100">
    <img class="lazy" id="deep" src="placeholder.gif" data-src="deep.jpg" data-top="3000">
    <img class="lazy" id="floating" src="placeholder.gif" data-src="floating.jpg">
    <section id="reviews" data-top="2500"></section>
"##;

#[test]
fn images_inside_the_initial_viewport_load_at_once() -> Result<()> {
    let page = Page::from_html(CATALOG_HTML)?;
    assert_eq!(page.attr_of("#hero", "src")?.as_deref(), Some("hero.jpg"));
    assert!(!page.has_class("#hero", "lazy")?);
    assert_eq!(
        page.attr_of("#deep", "src")?.as_deref(),
        Some("placeholder.gif")
    );
    assert!(page.has_class("#deep", "lazy")?);
    Ok(())
}

#[test]
fn scrolling_into_range_loads_an_image_exactly_once() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    page.scroll_to(1_000);
    assert!(page.has_class("#deep", "lazy")?);

    page.scroll_to(2_600);
    assert_eq!(page.attr_of("#deep", "src")?.as_deref(), Some("deep.jpg"));
    assert!(!page.has_class("#deep", "lazy")?);

    // Scrolling away and back must not reload.
    page.set_element_top("#deep", 9_999)?;
    page.scroll_to(0);
    assert_eq!(page.attr_of("#deep", "src")?.as_deref(), Some("deep.jpg"));
    Ok(())
}

#[test]
fn images_without_geometry_stay_lazy_until_given_a_position() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    assert!(page.has_class("#floating", "lazy")?);

    page.set_element_top("#floating", 400)?;
    assert_eq!(
        page.attr_of("#floating", "src")?.as_deref(),
        Some("floating.jpg")
    );
    Ok(())
}

#[test]
fn growing_the_viewport_reveals_more_images() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    assert!(page.has_class("#deep", "lazy")?);
    page.set_viewport_height(4_000);
    assert!(!page.has_class("#deep", "lazy")?);
    Ok(())
}

#[test]
fn anchor_clicks_scroll_to_the_target_minus_the_header() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    page.click("#reviewsLink")?;
    assert_eq!(page.scroll_y(), 2_420);
    Ok(())
}

#[test]
fn anchor_scroll_clamps_at_the_top_of_the_page() -> Result<()> {
    let mut page = Page::from_html(
        r##"<a id="topLink" href="#top">Top</a><div id="top" data-top="30"></div>"##,
    )?;
    page.scroll_to(500);
    page.click("#topLink")?;
    assert_eq!(page.scroll_y(), 0);
    Ok(())
}

#[test]
fn anchor_to_an_unknown_fragment_does_nothing() -> Result<()> {
    let mut page = Page::from_html(r##"<a id="ghost" href="#nowhere">?</a>"##)?;
    page.scroll_to(250);
    page.click("#ghost")?;
    assert_eq!(page.scroll_y(), 250);
    Ok(())
}

#[test]
fn search_debounce_waits_half_a_second_and_skips_short_queries() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    page.enable_trace(true);
    page.take_trace_logs();

    page.type_text("#searchInput", "te")?;
    page.advance_time(1_000)?;
    assert!(page.take_trace_logs().iter().all(|l| !l.contains("Searching")));

    page.type_text("#searchInput", "tel")?;
    page.advance_time(499)?;
    assert!(page.take_trace_logs().iter().all(|l| !l.contains("Searching")));
    page.advance_time(1)?;
    assert!(page
        .take_trace_logs()
        .iter()
        .any(|l| l == "Searching for: tel"));
    Ok(())
}

#[test]
fn retyping_resets_the_debounce_window() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    page.enable_trace(true);

    page.type_text("#searchInput", "tele")?;
    page.advance_time(400)?;
    page.type_text("#searchInput", "telef")?;
    page.advance_time(400)?;
    page.type_text("#searchInput", "telefon")?;
    page.advance_time(500)?;

    let searches: Vec<String> = page
        .take_trace_logs()
        .into_iter()
        .filter(|l| l.starts_with("Searching for:"))
        .collect();
    assert_eq!(searches, vec!["Searching for: telefon"]);
    Ok(())
}

#[test]
fn shortening_the_query_cancels_a_pending_search() -> Result<()> {
    let mut page = Page::from_html(CATALOG_HTML)?;
    page.enable_trace(true);

    page.type_text("#searchInput", "tele")?;
    page.advance_time(400)?;
    page.type_text("#searchInput", "te")?;
    page.advance_time(5_000)?;

    assert!(page
        .take_trace_logs()
        .iter()
        .all(|l| !l.starts_with("Searching for:")));
    Ok(())
}

#[test]
fn bootstrap_marked_widgets_are_counted_at_load() -> Result<()> {
    let page = Page::from_html(
        r#"
        <button data-bs-toggle="tooltip" title="Add">+</button>
        <button data-bs-toggle="tooltip" title="Remove">-</button>
        <a data-bs-toggle="popover" data-bs-content="info">?</a>
        "#,
    )?;
    assert_eq!(page.tooltip_count(), 2);
    assert_eq!(page.popover_count(), 1);
    assert_eq!(
        page.attr_of(r#"[data-bs-toggle="popover"]"#, "data-widget-ready")?
            .as_deref(),
        Some("popover")
    );
    Ok(())
}

#[test]
fn gallery_switch_moves_the_active_thumbnail() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <img id="mainImage" src="a.jpg">
        <img id="t1" class="thumbnail active" src="a_small.jpg">
        <img id="t2" class="thumbnail" src="b_small.jpg">
        "#,
    )?;
    page.change_main_image("b.jpg", Some("#t2"))?;
    assert_eq!(page.attr_of("#mainImage", "src")?.as_deref(), Some("b.jpg"));
    assert!(!page.has_class("#t1", "active")?);
    assert!(page.has_class("#t2", "active")?);
    Ok(())
}

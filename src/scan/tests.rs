//! End-to-end classification scenarios.

use std::path::Path;

use super::*;
use crate::config::ScanConfig;

fn run(markup: &str) -> ScanResult {
    scan(markup, &ScanConfig::default(), &ScanOptions::default())
}

/// Classification of the first element with this tag.
fn verdict(result: &ScanResult, tag: &str) -> Classification {
    result
        .elements
        .iter()
        .find(|el| el.tag == tag)
        .map(|el| el.classification.clone())
        .unwrap_or_else(|| panic!("no <{tag}> in scan"))
}

fn pairs(result: &ScanResult) -> Vec<(Option<String>, Classification)> {
    result
        .elements
        .iter()
        .map(|el| (el.content_id.clone(), el.classification.clone()))
        .collect()
}

#[test]
fn test_nesting_rule() {
    let result = run("<div><p>Text</p></div>");
    assert_eq!(
        verdict(&result, "p"),
        Classification::editable(EditableType::Text)
    );
    assert_eq!(
        verdict(&result, "div"),
        Classification::ignored(IgnoreReason::NestedEditable)
    );
}

#[test]
fn test_header_exclusion() {
    let result = run("<header><nav><a href=\"/\">Home</a></nav></header>");
    assert_eq!(
        verdict(&result, "a"),
        Classification::ignored(IgnoreReason::HeaderFooter)
    );
}

#[test]
fn test_header_by_class_and_role() {
    let result = run(
        "<div class=\"site-footer\"><p>(c) 2024</p></div><div role=\"banner\"><h2>Brand</h2></div>",
    );
    assert_eq!(
        verdict(&result, "p"),
        Classification::ignored(IgnoreReason::HeaderFooter)
    );
    assert_eq!(
        verdict(&result, "h2"),
        Classification::ignored(IgnoreReason::HeaderFooter)
    );
}

#[test]
fn test_component_headers_stay_editable() {
    let result = run(
        "<div class=\"card-header\"><h3>Pricing plans</h3></div><div class=\"page-header\"><h1>About us</h1></div>",
    );
    assert_eq!(
        verdict(&result, "h3"),
        Classification::editable(EditableType::Heading)
    );
    assert_eq!(
        verdict(&result, "h1"),
        Classification::editable(EditableType::Heading)
    );
}

#[test]
fn test_loop_detection() {
    let items = "<li>Item</li>".repeat(5);
    let result = run(&format!("<ul>{items}</ul>"));
    let lis: Vec<_> = result.elements.iter().filter(|el| el.tag == "li").collect();
    assert_eq!(lis.len(), 5);
    for li in lis {
        assert_eq!(
            li.classification,
            Classification::component(DynamicReason::LoopSignature { siblings: 5 })
        );
        assert_eq!(li.message.as_deref(), Some("Repeated by a loop (5 identical siblings)"));
        assert!(li.content_id.is_none());
    }
}

#[test]
fn test_loop_detection_through_ancestors() {
    let card = "<div class=\"card\"><h3>Title</h3><p>Body</p></div>";
    let result = run(&format!("<section>{}</section>", card.repeat(3)));
    assert_eq!(
        verdict(&result, "h3"),
        Classification::component(DynamicReason::LoopSignature { siblings: 3 })
    );
}

#[test]
fn test_two_siblings_are_not_a_loop() {
    let result = run("<ul><li>One</li><li>Two</li></ul>");
    assert!(result.elements.iter().all(|el| el.classification.is_editable()));
}

#[test]
fn test_plain_paragraphs_are_not_a_loop() {
    let result = run("<article><p>One</p><p>Two</p><p>Three</p></article>");
    let editable = result.editable().filter(|el| el.tag == "p").count();
    assert_eq!(editable, 3);
}

#[test]
fn test_dynamic_heuristics() {
    let cases = [
        (
            "<p>Hello {{ user.name }}</p>",
            DynamicReason::VariableSyntax,
        ),
        (
            "<div data-id=\"4\"><p>Row</p></div>",
            DynamicReason::RecordAttribute {
                attribute: "data-id".into(),
            },
        ),
        (
            "<div class=\"product-card\"><p>Shoe</p></div>",
            DynamicReason::ListingClass {
                class: "product-card".into(),
            },
        ),
        (
            "<div><p>Page text</p><div class=\"pagination\"></div></div>",
            DynamicReason::Pagination,
        ),
        (
            "<div data-items=\"x\"><p>Thing</p></div>",
            DynamicReason::CollectionAttribute {
                attribute: "data-items".into(),
            },
        ),
    ];
    for (markup, reason) in cases {
        let result = run(markup);
        assert_eq!(
            verdict(&result, "p"),
            Classification::component(reason),
            "{markup}"
        );
    }
}

#[test]
fn test_tooling_and_dropdown() {
    let result = run("<div class=\"cms-toolbar\"><button>Save</button></div>");
    assert_eq!(
        verdict(&result, "button"),
        Classification::ignored(IgnoreReason::ToolingOrInjected)
    );

    let result = run("<div data-cms-ui=\"1\"><span>Panel</span></div>");
    assert_eq!(
        verdict(&result, "span"),
        Classification::ignored(IgnoreReason::ToolingOrInjected)
    );

    let result = run("<ul role=\"listbox\"><li>Option</li></ul>");
    assert_eq!(
        verdict(&result, "li"),
        Classification::ignored(IgnoreReason::Dropdown)
    );

    let result = run("<div class=\"dropdown-menu\"><a href=\"/x\">X</a></div>");
    assert_eq!(
        verdict(&result, "a"),
        Classification::ignored(IgnoreReason::Dropdown)
    );
}

#[test]
fn test_tooling_beats_header() {
    let result = run("<header><div class=\"cms-panel\"><span>Edit</span></div></header>");
    assert_eq!(
        verdict(&result, "span"),
        Classification::ignored(IgnoreReason::ToolingOrInjected)
    );
}

#[test]
fn test_empty_rule_spares_media_and_links() {
    let result = run("<main><p>  </p><img src=\"/img/logo.png\" /><a href=\"/x\"></a></main>");
    assert_eq!(
        verdict(&result, "p"),
        Classification::ignored(IgnoreReason::Empty)
    );
    assert_eq!(
        verdict(&result, "img"),
        Classification::editable(EditableType::Image)
    );
    assert_eq!(
        verdict(&result, "a"),
        Classification::editable(EditableType::Link)
    );
}

#[test]
fn test_image_snapshot_and_identity() {
    let result = run("<img src=\"/img/logo.png\" alt=\"Logo\" />");
    let img = &result.elements[0];
    assert_eq!(img.text_snapshot, "/img/logo.png");
    let id = img.content_id.as_deref().unwrap();
    assert!(id.starts_with("img-"));
    assert_eq!(run("<img src=\"/img/logo.png\" alt=\"Logo\" />").elements[0].content_id.as_deref(), Some(id));
}

#[test]
fn test_mutual_exclusivity() {
    let markup = concat!(
        "<header><h1>Brand</h1></header>",
        "<main><h2>About</h2><p>We make <strong>things</strong>.</p>",
        "<ul><li>a</li><li>a</li><li>a</li></ul></main>",
        "<footer><p>Bye</p></footer>"
    );
    let result = run(markup);
    for el in &result.elements {
        let kinds = [
            el.classification.is_editable(),
            el.classification.is_component(),
            matches!(el.classification, Classification::Ignored { .. }),
        ];
        assert_eq!(kinds.iter().filter(|k| **k).count(), 1);
        assert_eq!(el.content_id.is_some(), el.classification.is_editable());
    }
    assert_eq!(
        result.stats.total,
        result.stats.editable + result.stats.components + result.stats.ignored
    );
}

#[test]
fn test_idempotent_classification() {
    let markup = concat!(
        "<main><h1 class=\"hero\">Welcome</h1><p>Intro text</p>",
        "<img src=\"/img/team.jpg\" /><a href=\"/contact\">Contact us</a>",
        "<div class=\"post-item\"><p>Post</p></div>",
        "<ul><li>x</li><li>x</li><li>x</li><li>x</li></ul></main>",
        "<nav><a href=\"/\">Home</a></nav>"
    );
    let config = ScanConfig::default();
    let first = run(markup);
    let second = run(markup);
    assert_eq!(pairs(&first), pairs(&second));

    let annotated = annotate(markup, &config);
    let rescanned = run(&annotated.markup);
    assert_eq!(pairs(&first), pairs(&rescanned));
    assert!(rescanned.pending_ids.is_empty());
}

#[test]
fn test_types_filter() {
    let options = ScanOptions {
        locale: Some("de".into()),
        types: Some(vec![EditableType::Image]),
    };
    let result = scan(
        "<h1>T</h1><img src=\"/a.png\" /><p>x</p>",
        &ScanConfig::default(),
        &options,
    );
    assert_eq!(result.elements.len(), 1);
    assert_eq!(result.elements[0].tag, "img");
    assert_eq!(result.stats.total, 1);
    assert_eq!(result.stats.by_type.get("image"), Some(&1));
    assert_eq!(result.locale.as_deref(), Some("de"));
}

#[test]
fn test_stats_and_pending_ids() {
    let result = run("<h1>Title</h1><p>One</p><p>One</p><header><p>x</p></header>");
    assert_eq!(result.stats.total, 4);
    assert_eq!(result.stats.editable, 3);
    assert_eq!(result.stats.ignored, 1);
    assert_eq!(result.stats.by_type.get("heading"), Some(&1));
    assert_eq!(result.stats.by_type.get("text"), Some(&2));

    // Two identical paragraphs share an id
    assert_eq!(result.pending_ids.len(), 2);
    assert_eq!(result.collisions.len(), 1);
    assert_eq!(result.collisions.values().next(), Some(&2));
}

#[test]
fn test_source_markers_resolve() {
    let markup = concat!(
        "<!-- inplace:begin views/home.html:5 -->\n",
        "<main>\n<h1>Hello</h1>\n",
        "<!-- inplace:begin views/partials/cta.html:1 -->",
        "<p>Buy now</p>",
        "<!-- inplace:end views/partials/cta.html -->\n",
        "</main>\n",
        "<!-- inplace:end views/home.html -->",
        "<p>Outside</p>",
        "<!-- inplace:end nowhere.html -->"
    );
    let result = run(markup);

    let h1 = result.elements.iter().find(|el| el.tag == "h1").unwrap();
    assert_eq!(h1.source_file.as_deref(), Some(Path::new("views/home.html")));
    assert_eq!(h1.line_hint, Some(7));

    let cta = result.elements.iter().find(|el| el.text_snapshot == "Buy now").unwrap();
    assert_eq!(result.find(cta.content_id.as_deref().unwrap()).map(|el| el.offset), Some(cta.offset));
    assert_eq!(cta.source_file.as_deref(), Some(Path::new("views/partials/cta.html")));
    assert_eq!(cta.line_hint, Some(1));

    let outside = result.elements.iter().find(|el| el.text_snapshot == "Outside").unwrap();
    assert!(outside.source_file.is_none());
    assert!(outside.classification.is_editable());

    assert_eq!(result.unmatched_markers, 1);
    assert!(!result.markup.contains("inplace:"));
}

#[test]
fn test_scan_result_json_shape() {
    let result = run("<p class=\"lead\">Hi</p>");
    let json = serde_json::to_value(&result).unwrap();
    let el = &json["elements"][0];
    assert_eq!(el["tag"], "p");
    assert_eq!(el["textSnapshot"], "Hi");
    assert_eq!(el["classification"]["kind"], "editable");
    assert_eq!(el["attributes"]["class"], "lead");
    assert_eq!(el["rule"], "editable");
    assert!(el.get("offset").is_none());
    assert_eq!(json["stats"]["byType"]["text"], 1);
    assert!(json["pendingIds"].is_array());
}

#[test]
fn test_malformed_markup_never_panics() {
    for markup in ["", "<", "<p", "<div><p>unclosed", "</p></div>", "<<>>", "<p>a</b></p>"] {
        let _ = run(markup);
    }
}

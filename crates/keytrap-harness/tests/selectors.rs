#![forbid(unsafe_code)]

//! Integration tests: selector queries over fixture documents.

use keytrap::{DocumentView, TrapOptions};
use keytrap_harness::{MemoryDocument, selector};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn ids(doc: &MemoryDocument, selector: &str) -> Vec<String> {
    doc.query_selector_all(selector)
        .unwrap()
        .iter()
        .map(|n| doc.attribute(n, "id").unwrap_or_default())
        .collect()
}

#[test]
fn default_focusable_selector_matches_reachable_elements() {
    let doc = MemoryDocument::from_html(
        r#"
        <a id="link" href="/">x</a>
        <a id="anchor-only">x</a>
        <map><area id="hot" href="/"></map>
        <input id="text">
        <input id="off" disabled>
        <select id="pick"></select>
        <textarea id="notes"></textarea>
        <button id="go">x</button>
        <button id="no" disabled>x</button>
        <iframe id="frame"></iframe>
        <div id="plain">x</div>
        <div id="indexed" tabindex="0">x</div>
        <span id="removed" tabindex="-1">x</span>
        <button id="removed-button" tabindex="-1">x</button>
        <p id="edit" contenteditable="true">x</p>
        <p id="not-edit" contenteditable="false">x</p>
        "#,
    )
    .unwrap();

    assert_eq!(
        ids(&doc, &TrapOptions::default().focusable_selector()),
        vec![
            "link", "hot", "text", "pick", "notes", "go", "frame", "indexed", "edit"
        ]
    );
}

#[test]
fn query_results_are_in_document_order_without_duplicates() {
    let doc = MemoryDocument::from_html(
        r#"<div id="a" class="x"><div id="b" class="x y"></div></div><div id="c" class="y"></div>"#,
    )
    .unwrap();
    assert_eq!(ids(&doc, ".y, .x"), vec!["a", "b", "c"]);
    assert_eq!(ids(&doc, ".x .y"), vec!["b"]);
    assert_eq!(ids(&doc, "body > div"), vec!["a", "c"]);
    assert_eq!(ids(&doc, "div:not(.x)"), vec!["c"]);
}

#[test]
fn invalid_selector_is_an_error() {
    let doc = MemoryDocument::new();
    let err = doc.query_selector_all("div[").unwrap_err();
    assert_eq!(err.selector, "div[");
    assert!(doc.matches(&doc.body(), "::before").is_err());
    assert!(doc.closest(&doc.body(), "").is_err());
}

proptest! {
    #[test]
    fn parser_never_panics(input in "\\PC{0,40}") {
        let _ = selector::parse(&input);
    }

    #[test]
    fn parser_handles_selector_shaped_noise(
        input in "[a-z#.\\[\\]=\"':() >,*-]{0,30}",
    ) {
        let doc = MemoryDocument::from_html(r#"<div class="a"><input id="b"></div>"#).unwrap();
        if let Ok(list) = selector::parse(&input) {
            // Whatever parses can be evaluated.
            for node in doc.document_order() {
                let _ = list.matches(&doc, node);
            }
        }
    }
}

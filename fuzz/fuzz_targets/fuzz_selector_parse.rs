//! Fuzz target for the harness selector engine.
//!
//! Arbitrary selector text must parse or fail cleanly, and every parsed
//! selector must evaluate against a small document without panicking.

#![no_main]
use keytrap::DocumentView;
use keytrap_harness::{MemoryDocument, selector};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(list) = selector::parse(input) else {
        return;
    };

    let Ok(doc) = MemoryDocument::from_html(
        r##"<div class="modal" id="m"><form><input id="a" disabled><a href="#">x</a></form></div>"##,
    ) else {
        return;
    };
    let matched: Vec<_> = doc
        .document_order()
        .into_iter()
        .filter(|&n| list.matches(&doc, n))
        .collect();

    // The document query agrees with direct matching.
    let queried = doc.query_selector_all(input).unwrap_or_default();
    assert_eq!(matched, queried, "query mismatch for {input:?}");
});

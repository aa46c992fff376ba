//! Fuzz target for the HTML fixture reader.
//!
//! Any input either builds a document or returns a `FixtureError`; a built
//! document keeps every element reachable from the root exactly once.

#![no_main]
use keytrap_harness::MemoryDocument;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(doc) = MemoryDocument::from_html(markup) {
        let mut order = doc.document_order();
        let total = order.len();
        order.sort();
        order.dedup();
        assert_eq!(order.len(), total, "node reachable twice");
        assert_eq!(doc.parent(doc.body()), Some(doc.root()));
    }
});

#![forbid(unsafe_code)]

//! Integration tests: trap activation and release against an in-memory
//! document.

use keytrap::{Area, DocumentView, TrapConfig, TrapError, TrapRegistry};
use keytrap_harness::{MemoryDocument, NodeId};
use pretty_assertions::assert_eq;

const MARKER: &str = "data-keytrap-tabindex";
const AUTOFOCUS_MARKER: &str = "data-keytrap-autofocus";

fn modal_page() -> MemoryDocument {
    MemoryDocument::from_html(
        r#"
        <button id="open">Open dialog</button>
        <div class="modal">
          <input id="first">
          <input id="second">
        </div>
        "#,
    )
    .unwrap()
}

fn modal_trap() -> TrapConfig {
    TrapConfig::new("modal")
        .area(Area::container(".modal"))
        .auto_focus(".modal")
}

fn tabindex(doc: &MemoryDocument, node: NodeId) -> Option<String> {
    doc.attribute(&node, "tabindex")
}

fn marker_count(doc: &MemoryDocument) -> usize {
    doc.query_selector_all(&format!("[{MARKER}]")).unwrap().len()
}

// ============================================================================
// Modal scenario
// ============================================================================

#[test]
fn modal_scenario_activates_and_restores() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    let modal = doc.get(".modal");
    let first = doc.get("#first");
    let second = doc.get("#second");
    doc.focus(&open);

    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());

    let report = traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(report.excluded, 1);
    assert_eq!(report.looped, 2);
    assert!(report.auto_focused);
    assert!(!report.released_previous);

    // Outside button excluded, prior state recorded.
    assert_eq!(tabindex(&doc, open).as_deref(), Some("-1"));
    assert_eq!(doc.attribute(&open, MARKER).as_deref(), Some("?"));
    // Inputs remain focusable.
    assert_eq!(tabindex(&doc, first), None);
    assert_eq!(tabindex(&doc, second), None);
    assert_eq!(traps.elements_to_loop(&doc).unwrap(), vec![first, second]);
    // Focus on the dialog itself.
    assert_eq!(doc.active_element(), Some(modal));
    assert_eq!(traps.active_name(), Some("modal"));
    assert_eq!(traps.get_trap("modal").unwrap().trigger_element(), Some(&open));
    assert_eq!(doc.listener_count(), 1);

    let released = traps.release(&mut doc);
    assert!(released.released);
    assert!(released.focus_restored);
    assert_eq!(released.restored, 1);
    assert_eq!(released.listeners_removed, 1);

    assert_eq!(tabindex(&doc, open), None);
    assert_eq!(doc.attribute(&open, MARKER), None);
    assert_eq!(doc.active_element(), Some(open));
    assert_eq!(marker_count(&doc), 0);
    assert_eq!(doc.listener_count(), 0);
    assert!(!traps.is_trapped());
}

#[test]
fn autofocus_tabindex_is_removed_on_release() {
    let mut doc = modal_page();
    let modal = doc.get(".modal");
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());

    traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(tabindex(&doc, modal).as_deref(), Some("-1"));
    assert_eq!(doc.attribute(&modal, AUTOFOCUS_MARKER).as_deref(), Some(""));
    // Programmatic focus target only; not part of the loop set.
    assert!(!traps.elements_to_loop(&doc).unwrap().contains(&modal));

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, modal), None);
    assert_eq!(doc.attribute(&modal, AUTOFOCUS_MARKER), None);
}

#[test]
fn autofocus_keeps_existing_tabindex() {
    let mut doc = MemoryDocument::from_html(
        r#"<div class="modal" tabindex="0"><input id="a"></div>"#,
    )
    .unwrap();
    let modal = doc.get(".modal");
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());

    traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(doc.active_element(), Some(modal));
    assert_eq!(doc.attribute(&modal, AUTOFOCUS_MARKER), None);

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, modal).as_deref(), Some("0"));
}

#[test]
fn focusable_autofocus_target_stays_in_the_loop() {
    let mut doc = MemoryDocument::from_html(
        r#"<div class="modal"><button id="ok">OK</button><input id="a"></div>"#,
    )
    .unwrap();
    let ok = doc.get("#ok");
    let mut traps = TrapRegistry::new();
    traps.set_trap(
        TrapConfig::new("modal")
            .area(Area::container(".modal"))
            .auto_focus("#ok"),
    );

    traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(doc.active_element(), Some(ok));
    assert_eq!(tabindex(&doc, ok), None);
    assert_eq!(traps.first_trapped_element(&doc).unwrap(), Some(ok));
}

#[test]
fn autofocus_selector_matching_nothing_is_skipped() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    doc.focus(&open);
    let mut traps = TrapRegistry::new();
    traps.set_trap(
        TrapConfig::new("modal")
            .area(Area::container(".modal"))
            .auto_focus("#not-rendered-yet"),
    );

    let report = traps.trap_within(&mut doc, "modal").unwrap();
    assert!(!report.auto_focused);
    assert!(traps.is_trapped());
    assert_eq!(doc.active_element(), Some(open));
}

// ============================================================================
// Attribute restoration
// ============================================================================

#[test]
fn prior_tabindex_values_are_restored() {
    let mut doc = MemoryDocument::from_html(
        r#"
        <button id="zero" tabindex="0">a</button>
        <button id="two" tabindex="2">b</button>
        <button id="none">c</button>
        <span id="custom" tabindex="5">d</span>
        <div class="modal"><input id="inside"></div>
        "#,
    )
    .unwrap();
    let zero = doc.get("#zero");
    let two = doc.get("#two");
    let none = doc.get("#none");
    let custom = doc.get("#custom");

    let mut traps = TrapRegistry::new();
    traps.set_trap(TrapConfig::new("modal").area(Area::container(".modal")));
    let report = traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(report.excluded, 4);

    assert_eq!(doc.attribute(&zero, MARKER).as_deref(), Some("=0"));
    assert_eq!(doc.attribute(&two, MARKER).as_deref(), Some("=2"));
    assert_eq!(doc.attribute(&none, MARKER).as_deref(), Some("?"));
    assert_eq!(doc.attribute(&custom, MARKER).as_deref(), Some("=5"));
    assert_eq!(
        traps.hidden_elements(&doc).unwrap(),
        vec![zero, two, none, custom]
    );

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, zero).as_deref(), Some("0"));
    assert_eq!(tabindex(&doc, two).as_deref(), Some("2"));
    assert_eq!(tabindex(&doc, none), None);
    assert_eq!(tabindex(&doc, custom).as_deref(), Some("5"));
    assert_eq!(marker_count(&doc), 0);
}

#[test]
fn tabindex_spelled_like_the_absent_sentinel_survives_release() {
    let mut doc = MemoryDocument::from_html(
        r#"
        <div id="odd" tabindex="?">a</div>
        <div id="prefixed" tabindex="=0">b</div>
        <div class="modal"><input></div>
        "#,
    )
    .unwrap();
    let odd = doc.get("#odd");
    let prefixed = doc.get("#prefixed");
    let mut traps = TrapRegistry::new();
    traps.set_trap(TrapConfig::new("modal").area(Area::container(".modal")));

    traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(tabindex(&doc, odd).as_deref(), Some("-1"));
    assert_eq!(doc.attribute(&odd, MARKER).as_deref(), Some("=?"));
    assert_eq!(doc.attribute(&prefixed, MARKER).as_deref(), Some("==0"));

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, odd).as_deref(), Some("?"));
    assert_eq!(tabindex(&doc, prefixed).as_deref(), Some("=0"));
    assert_eq!(marker_count(&doc), 0);
}

#[test]
fn already_excluded_elements_are_left_alone() {
    let mut doc = MemoryDocument::from_html(
        r#"<button id="skip" tabindex="-1">x</button><div class="modal"><input></div>"#,
    )
    .unwrap();
    let skip = doc.get("#skip");
    let mut traps = TrapRegistry::new();
    traps.set_trap(TrapConfig::new("modal").area(Area::container(".modal")));

    let report = traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(report.excluded, 0);
    assert_eq!(doc.attribute(&skip, MARKER), None);

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, skip).as_deref(), Some("-1"));
}

#[test]
fn elements_moved_out_of_the_document_are_not_restored() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());
    traps.trap_within(&mut doc, "modal").unwrap();

    doc.remove(open);
    let report = traps.release(&mut doc);
    assert_eq!(report.restored, 0);
    // Detached nodes keep whatever they had.
    assert_eq!(doc.attribute(&open, MARKER).as_deref(), Some("?"));

    // Reattached later, the marker is picked up by the next release.
    let body = doc.body();
    doc.append_child(body, open);
    traps.trap_within(&mut doc, "modal").unwrap();
    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, open), None);
    assert_eq!(marker_count(&doc), 0);
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn release_is_idempotent() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    doc.focus(&open);
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());
    traps.trap_within(&mut doc, "modal").unwrap();

    let first = traps.release(&mut doc);
    let snapshot: Vec<Vec<(String, String)>> = doc
        .document_order()
        .into_iter()
        .map(|n| {
            doc.attributes(n)
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        })
        .collect();
    let focus = doc.active_element();

    let second = traps.release(&mut doc);
    assert!(first.released);
    assert_eq!(second, keytrap::ReleaseReport::default());
    assert_eq!(doc.active_element(), focus);
    let again: Vec<Vec<(String, String)>> = doc
        .document_order()
        .into_iter()
        .map(|n| {
            doc.attributes(n)
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        })
        .collect();
    assert_eq!(snapshot, again);
}

#[test]
fn release_without_active_trap_is_noop() {
    let mut doc = modal_page();
    let mut traps: TrapRegistry<NodeId> = TrapRegistry::new();
    assert_eq!(traps.release(&mut doc), keytrap::ReleaseReport::default());
}

#[test]
fn detached_trigger_skips_focus_restore() {
    let mut doc = MemoryDocument::from_html(
        r#"<div id="toolbar"><button id="open">x</button></div><div class="modal"><input id="a"></div>"#,
    )
    .unwrap();
    let open = doc.get("#open");
    let toolbar = doc.get("#toolbar");
    doc.focus(&open);

    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());
    traps.trap_within(&mut doc, "modal").unwrap();
    let modal = doc.get(".modal");
    assert_eq!(doc.active_element(), Some(modal));

    doc.remove(toolbar);
    let report = traps.release(&mut doc);
    assert!(report.released);
    assert!(!report.focus_restored);
    assert_eq!(doc.active_element(), Some(modal));
    assert_eq!(traps.get_trap("modal").unwrap().trigger_element(), None);
}

#[test]
fn no_trigger_when_nothing_was_focused() {
    let mut doc = modal_page();
    let mut traps = TrapRegistry::new();
    traps.set_trap(TrapConfig::new("modal").area(Area::container(".modal")));
    traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(traps.active_trap().unwrap().trigger_element(), None);

    let report = traps.release(&mut doc);
    assert!(report.released);
    assert!(!report.focus_restored);
}

// ============================================================================
// Switching traps
// ============================================================================

#[test]
fn activating_another_trap_releases_the_first() {
    let mut doc = MemoryDocument::from_html(
        r##"
        <button id="open">x</button>
        <div class="modal"><input id="m"></div>
        <nav class="menu"><a id="item" href="#">item</a></nav>
        "##,
    )
    .unwrap();
    let open = doc.get("#open");
    let m = doc.get("#m");
    let item = doc.get("#item");
    doc.focus(&open);

    let mut traps = TrapRegistry::new();
    traps.set_traps([
        TrapConfig::new("modal").area(Area::container(".modal")),
        TrapConfig::new("menu").area(Area::container(".menu")),
    ]);

    traps.trap_within(&mut doc, "modal").unwrap();
    assert_eq!(tabindex(&doc, item).as_deref(), Some("-1"));

    let report = traps.trap_within(&mut doc, "menu").unwrap();
    assert!(report.released_previous);
    assert_eq!(traps.active_name(), Some("menu"));
    assert!(!traps.get_trap("modal").unwrap().is_active());
    assert_eq!(traps.list().filter(|t| t.is_active()).count(), 1);
    assert_eq!(doc.listener_count(), 1);

    // Menu's exclusions, not a mix of both.
    assert_eq!(tabindex(&doc, item), None);
    assert_eq!(tabindex(&doc, m).as_deref(), Some("-1"));
    assert_eq!(tabindex(&doc, open).as_deref(), Some("-1"));
    // The modal's release put focus back on the trigger before the menu
    // recorded its own.
    assert_eq!(traps.active_trap().unwrap().trigger_element(), Some(&open));

    traps.release(&mut doc);
    assert_eq!(marker_count(&doc), 0);
    assert_eq!(tabindex(&doc, m), None);
    assert_eq!(tabindex(&doc, open), None);
    assert_eq!(doc.active_element(), Some(open));
}

#[test]
fn reactivating_the_active_trap_does_not_stack_markers() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());

    traps.trap_within(&mut doc, "modal").unwrap();
    let report = traps.trap_within(&mut doc, "modal").unwrap();
    assert!(report.released_previous);
    assert_eq!(doc.attribute(&open, MARKER).as_deref(), Some("?"));
    assert_eq!(doc.listener_count(), 1);

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, open), None);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn unknown_trap_is_not_found_and_changes_nothing() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    doc.focus(&open);
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());
    traps.trap_within(&mut doc, "modal").unwrap();

    let err = traps.trap_within(&mut doc, "missing").unwrap_err();
    assert_eq!(
        err,
        TrapError::NotFound {
            name: "missing".into()
        }
    );
    assert_eq!(err.to_string(), "no trap registered under `missing`");
    // Still the same activation.
    assert_eq!(traps.active_name(), Some("modal"));
    assert_eq!(doc.listener_count(), 1);
    assert_eq!(marker_count(&doc), 1);
}

#[test]
fn invalid_area_selector_leaves_state_unchanged() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    doc.focus(&open);
    let mut traps = TrapRegistry::new();
    traps.set_traps([
        modal_trap(),
        TrapConfig::new("broken").area(Area::container("div[")),
    ]);
    traps.trap_within(&mut doc, "modal").unwrap();
    let modal = doc.get(".modal");

    let err = traps.trap_within(&mut doc, "broken").unwrap_err();
    assert!(matches!(err, TrapError::Selector(_)), "{err:?}");
    assert_eq!(traps.active_name(), Some("modal"));
    assert_eq!(doc.active_element(), Some(modal));
    assert_eq!(marker_count(&doc), 1);
    assert_eq!(doc.listener_count(), 1);
}

#[test]
fn invalid_autofocus_selector_is_rejected_before_mutation() {
    let mut doc = modal_page();
    let mut traps = TrapRegistry::new();
    traps.set_trap(
        TrapConfig::new("modal")
            .area(Area::container(".modal"))
            .auto_focus(":hover"),
    );

    let err = traps.trap_within(&mut doc, "modal").unwrap_err();
    assert!(matches!(err, TrapError::Selector(_)));
    assert!(!traps.is_trapped());
    assert_eq!(marker_count(&doc), 0);
    assert_eq!(doc.listener_count(), 0);
}

#[test]
fn area_matching_nothing_excludes_everything() {
    let mut doc = modal_page();
    let mut traps = TrapRegistry::new();
    traps.set_trap(TrapConfig::new("ghost").area(Area::container(".not-rendered")));

    let report = traps.trap_within(&mut doc, "ghost").unwrap();
    assert_eq!(report.excluded, 3);
    assert_eq!(report.looped, 0);
    assert_eq!(traps.first_trapped_element(&doc).unwrap(), None);
    assert_eq!(traps.last_trapped_element(&doc).unwrap(), None);

    traps.release(&mut doc);
    assert_eq!(marker_count(&doc), 0);
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn re_registering_replaces_config_but_keeps_activation() {
    let mut doc = modal_page();
    let open = doc.get("#open");
    let mut traps = TrapRegistry::new();
    traps.set_trap(modal_trap());
    traps.trap_within(&mut doc, "modal").unwrap();

    traps.set_trap(TrapConfig::new("modal").area(Area::exact("#open")));
    let state = traps.get_trap("modal").unwrap();
    assert!(state.is_active());
    assert_eq!(state.config().areas, vec![Area::exact("#open")]);
    assert!(state.key_handler().is_some());
    assert_eq!(state.active_areas(), Some(&[Area::container(".modal")][..]));
    // The running activation keeps the areas it started with.
    assert_eq!(
        traps.elements_to_loop(&doc).unwrap(),
        vec![doc.get("#first"), doc.get("#second")]
    );

    traps.release(&mut doc);
    assert_eq!(tabindex(&doc, open), None);
}

#[test]
fn without_active_trap_nothing_is_hidden() {
    let doc = modal_page();
    let traps: TrapRegistry<NodeId> = TrapRegistry::new();
    assert!(traps.elements_to_hide(&doc).unwrap().is_empty());
    assert_eq!(
        traps.elements_to_loop(&doc).unwrap(),
        vec![doc.get("#open"), doc.get("#first"), doc.get("#second")]
    );
    let classification = traps.classification(&doc).unwrap();
    assert!(classification.hide.is_empty());
    assert_eq!(classification.looped.len(), 3);
}

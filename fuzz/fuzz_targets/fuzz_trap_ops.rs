//! Fuzz target for trap activation sequences.
//!
//! Drives a registry with arbitrary activate/release/key/focus/mutation
//! operations and checks after every step that:
//! 1. At most one trap is active, with exactly one listener installed
//! 2. The hide and loop sets partition the focusable set
//! 3. A final release leaves no restore or autofocus markers behind

#![no_main]
use arbitrary::Arbitrary;
use keytrap::classify::all_focusable;
use keytrap::{Area, DocumentView, KeyCode, Modifiers, TrapConfig, TrapRegistry};
use keytrap_harness::{MemoryDocument, NodeId};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Tag {
    Button,
    Input,
    Link,
    Div,
    Span,
}

#[derive(Debug, Arbitrary)]
struct Element {
    /// Parent: 0 is body, otherwise an earlier element.
    parent: u8,
    tag: Tag,
    tabindex: Option<i8>,
    disabled: bool,
    class: u8,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Activate(u8),
    Release,
    Tab { shift: bool },
    Key(u8),
    Focus(u8),
    Append { parent: u8, class: u8 },
    Remove(u8),
}

#[derive(Debug, Arbitrary)]
struct Input {
    elements: Vec<Element>,
    ops: Vec<Op>,
}

const CLASSES: [&str; 4] = ["modal", "menu", "pick", "plain"];

fn build(elements: &[Element]) -> (MemoryDocument, Vec<NodeId>) {
    let mut doc = MemoryDocument::new();
    let mut nodes = vec![doc.body()];
    for shape in elements.iter().take(48) {
        let parent = nodes[usize::from(shape.parent) % nodes.len()];
        let tabindex = shape.tabindex.map(|t| (t % 4).to_string());
        let mut attrs = vec![("class", CLASSES[usize::from(shape.class) % CLASSES.len()])];
        if let Some(t) = &tabindex {
            attrs.push(("tabindex", t.as_str()));
        }
        if shape.disabled {
            attrs.push(("disabled", ""));
        }
        let tag = match shape.tag {
            Tag::Button => "button",
            Tag::Input => "input",
            Tag::Link => {
                attrs.push(("href", "#"));
                "a"
            }
            Tag::Div => "div",
            Tag::Span => "span",
        };
        nodes.push(doc.element(parent, tag, &attrs));
    }
    (doc, nodes)
}

fn registry() -> TrapRegistry<NodeId> {
    let mut traps = TrapRegistry::new();
    traps.set_traps([
        TrapConfig::new("modal")
            .area(Area::container(".modal"))
            .auto_focus(".modal"),
        TrapConfig::new("menu")
            .area(Area::container(".menu"))
            .area(Area::exact(".pick")),
        TrapConfig::new("pick").area(Area::exact(".pick")).auto_focus("span"),
    ]);
    traps
}

const NAMES: [&str; 4] = ["modal", "menu", "pick", "unknown"];

fuzz_target!(|input: Input| {
    let (mut doc, mut nodes) = build(&input.elements);
    let mut traps = registry();

    for op in input.ops.iter().take(64) {
        match op {
            Op::Activate(i) => {
                let name = NAMES[usize::from(*i) % NAMES.len()];
                let result = traps.trap_within(&mut doc, name);
                assert_eq!(result.is_ok(), name != "unknown", "{name}: {result:?}");
            }
            Op::Release => {
                traps.release(&mut doc);
            }
            Op::Tab { shift: false } => {
                doc.press_tab();
            }
            Op::Tab { shift: true } => {
                doc.press_shift_tab();
            }
            Op::Key(c) => {
                doc.press(KeyCode::Char(char::from(*c)), Modifiers::empty());
            }
            Op::Focus(i) => {
                let node = nodes[usize::from(*i) % nodes.len()];
                doc.focus(&node);
            }
            Op::Append { parent, class } => {
                let parent = nodes[usize::from(*parent) % nodes.len()];
                let class = CLASSES[usize::from(*class) % CLASSES.len()];
                nodes.push(doc.element(parent, "button", &[("class", class)]));
            }
            Op::Remove(i) => {
                let node = nodes[usize::from(*i) % nodes.len()];
                if node != doc.body() {
                    doc.remove(node);
                }
            }
        }

        let active = traps.list().filter(|t| t.is_active()).count();
        assert!(active <= 1);
        assert_eq!(doc.listener_count(), active);

        let Ok(mut all) = all_focusable(&doc, traps.options()) else {
            panic!("focusable selector rejected");
        };
        let Ok(classification) = traps.classification(&doc) else {
            panic!("area selector rejected");
        };
        let mut union: Vec<NodeId> = classification
            .hide
            .iter()
            .chain(&classification.looped)
            .copied()
            .collect();
        all.sort();
        union.sort();
        assert_eq!(union, all, "hide/loop do not partition the focusable set");
    }

    traps.release(&mut doc);
    assert_eq!(doc.listener_count(), 0);
    let markers = doc
        .query_selector_all("[data-keytrap-tabindex], [data-keytrap-autofocus]")
        .unwrap_or_default();
    assert!(markers.is_empty(), "markers left after release: {markers:?}");
});

#![forbid(unsafe_code)]

//! Minimal CSS selector engine.
//!
//! Supports what focus-trap configurations use in practice:
//!
//! | Syntax | Example |
//! |--------|---------|
//! | Type / universal | `button`, `*` |
//! | Id / class | `#close`, `.modal` |
//! | Attribute presence | `[href]` |
//! | Attribute equality | `[tabindex="-1"]`, `[contenteditable=true]` |
//! | Negation | `input:not([disabled])` |
//! | Descendant / child | `.modal button`, `ul > li` |
//! | Selector list | `a[href], button` |
//!
//! Type selectors and attribute names match ASCII case-insensitively, as in
//! HTML documents. Attribute values match exactly.

use keytrap::SelectorError;

/// Read access to an element tree, enough to evaluate selectors.
pub trait ElementTree {
    type Node: Copy;

    /// Lowercase tag name.
    fn tag(&self, node: Self::Node) -> &str;

    /// Attribute value; `name` is already lowercase.
    fn attr(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Complex>);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<Compound>,
    /// `combinators[i]` joins `parts[i]` and `parts[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
    negations: Vec<SelectorList>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

/// Parse a selector list.
///
/// # Errors
///
/// Returns a [`SelectorError`] naming the first syntax problem.
pub fn parse(selector: &str) -> Result<SelectorList, SelectorError> {
    let mut parser = Parser {
        src: selector,
        chars: selector.char_indices().peekable(),
    };
    let list = parser.list()?;
    parser.skip_ws();
    match parser.chars.peek() {
        None => Ok(list),
        Some(&(_, ch)) => Err(parser.error(format!("unexpected `{ch}`"))),
    }
}

impl SelectorList {
    /// Whether `node` matches any selector in the list.
    pub fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        self.0.iter().any(|c| c.matches(tree, node))
    }
}

impl Complex {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        let last = self.parts.len() - 1;
        self.parts[last].matches(tree, node) && self.matches_from(tree, node, last)
    }

    /// `node` already matched `parts[idx]`; check the parts to its left.
    fn matches_from<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node, idx: usize) -> bool {
        if idx == 0 {
            return true;
        }
        let left = &self.parts[idx - 1];
        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|p| left.matches(tree, p) && self.matches_from(tree, p, idx - 1)),
            Combinator::Descendant => {
                let mut cursor = tree.parent(node);
                while let Some(p) = cursor {
                    if left.matches(tree, p) && self.matches_from(tree, p, idx - 1) {
                        return true;
                    }
                    cursor = tree.parent(p);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        if let Some(tag) = &self.tag
            && tree.tag(node) != tag
        {
            return false;
        }
        if !self.ids.iter().all(|id| tree.attr(node, "id") == Some(id.as_str())) {
            return false;
        }
        if !self.classes.is_empty() {
            let class_attr = tree.attr(node, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|c| class_attr.split_ascii_whitespace().any(|have| have == c.as_str()))
            {
                return false;
            }
        }
        let attrs_ok = self.attrs.iter().all(|a| match (&a.value, tree.attr(node, &a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(have)) => want.as_str() == have,
        });
        attrs_ok && !self.negations.iter().any(|n| n.matches(tree, node))
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }
}

struct Parser<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::new(self.src, reason)
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {
            skipped = true;
        }
        skipped
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn expect(&mut self, want: char) -> Result<(), SelectorError> {
        match self.chars.next() {
            Some((_, c)) if c == want => Ok(()),
            Some((_, c)) => Err(self.error(format!("expected `{want}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{want}`, found end of input"))),
        }
    }

    fn list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            out.push(self.complex()?);
            self.skip_ws();
            if self.chars.next_if(|&(_, c)| c == ',').is_none() {
                return Ok(SelectorList(out));
            }
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => {
                    self.chars.next();
                    self.skip_ws();
                    Combinator::Child
                }
                Some(c) if had_ws && starts_compound(c) => Combinator::Descendant,
                _ => break,
            };
            combinators.push(combinator);
            parts.push(self.compound()?);
        }
        Ok(Complex { parts, combinators })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut out = Compound::default();
        let star = self.chars.next_if(|&(_, c)| c == '*').is_some();
        if !star && self.peek().is_some_and(is_ident_char) {
            out.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.chars.next();
                    out.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.chars.next();
                    out.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.chars.next();
                    out.attrs.push(self.attr()?);
                }
                Some(':') => {
                    self.chars.next();
                    let name = self.ident()?;
                    if !name.eq_ignore_ascii_case("not") {
                        return Err(self.error(format!("unsupported pseudo-class `:{name}`")));
                    }
                    self.expect('(')?;
                    let inner = self.list()?;
                    self.skip_ws();
                    self.expect(')')?;
                    out.negations.push(inner);
                }
                _ => break,
            }
        }
        if out.is_empty() && !star {
            return Err(match self.peek() {
                Some(c) => self.error(format!("unexpected `{c}`")),
                None => self.error("empty selector"),
            });
        }
        Ok(out)
    }

    fn attr(&mut self) -> Result<AttrMatch, SelectorError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let value = if self.chars.next_if(|&(_, c)| c == '=').is_some() {
            self.skip_ws();
            Some(self.attr_value()?)
        } else {
            None
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(AttrMatch { name, value })
    }

    fn attr_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.chars.next();
                let mut value = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, c)) if c == quote => return Ok(value),
                        Some((_, c)) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => {
                let mut value = String::new();
                while let Some((_, c)) = self.chars.next_if(|&(_, c)| is_ident_char(c)) {
                    value.push(c);
                }
                if value.is_empty() {
                    return Err(self.error("missing attribute value"));
                }
                Ok(value)
            }
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next_if(|&(_, c)| is_ident_char(c)) {
            out.push(c);
        }
        if out.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected identifier, found `{c}`")),
                None => self.error("expected identifier, found end of input"),
            });
        }
        Ok(out)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn starts_compound(c: char) -> bool {
    is_ident_char(c) || matches!(c, '*' | '#' | '.' | '[' | ':')
}

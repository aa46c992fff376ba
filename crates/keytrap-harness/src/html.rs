#![forbid(unsafe_code)]

//! Tiny HTML fixture reader.
//!
//! Accepts the markup tests actually write: nested tags, quoted, unquoted
//! and boolean attributes, comments, void elements and text (which is
//! dropped). Top-level elements land in `<body>`. No entities, no implied
//! end tags, no `<script>` raw text.

use thiserror::Error;

use crate::document::{MemoryDocument, NodeId};

/// Markup the fixture reader rejects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    #[error("unexpected end of markup at byte {0}")]
    UnexpectedEof(usize),
    #[error("expected {expected} at byte {at}")]
    Expected { expected: &'static str, at: usize },
    #[error("closing `</{found}>` at byte {at} does not match `<{open}>`")]
    Mismatched {
        open: String,
        found: String,
        at: usize,
    },
    #[error("unclosed `<{0}>`")]
    Unclosed(String),
}

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl MemoryDocument {
    /// Build a document whose `<body>` holds `markup`.
    ///
    /// ```ignore
    /// let doc = MemoryDocument::from_html(r#"<div class="modal"><input id="a"></div>"#)?;
    /// ```
    pub fn from_html(markup: &str) -> Result<Self, FixtureError> {
        let mut doc = Self::new();
        let body = doc.body();
        Reader {
            src: markup,
            pos: 0,
        }
        .read_into(&mut doc, body)?;
        Ok(doc)
    }
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl Reader<'_> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn name(&mut self, expected: &'static str) -> Result<String, FixtureError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
        {
            self.bump();
        }
        if start == self.pos {
            return Err(FixtureError::Expected {
                expected,
                at: self.pos,
            });
        }
        Ok(self.src[start..self.pos].to_ascii_lowercase())
    }

    fn read_into(&mut self, doc: &mut MemoryDocument, body: NodeId) -> Result<(), FixtureError> {
        // (node, tag) of open elements; body is the implicit bottom.
        let mut open: Vec<(NodeId, String)> = Vec::new();
        loop {
            let parent = open.last().map_or(body, |(n, _)| *n);
            let Some(lt) = self.rest().find('<') else {
                break;
            };
            self.pos += lt;

            if self.eat("<!--") {
                let Some(end) = self.rest().find("-->") else {
                    return Err(FixtureError::UnexpectedEof(self.src.len()));
                };
                self.pos += end + 3;
            } else if self.eat("</") {
                let at = self.pos;
                let found = self.name("tag name")?;
                self.skip_ws();
                if !self.eat(">") {
                    return Err(FixtureError::Expected {
                        expected: "`>`",
                        at: self.pos,
                    });
                }
                match open.pop() {
                    Some((_, tag)) if tag == found => {}
                    Some((_, tag)) => {
                        return Err(FixtureError::Mismatched {
                            open: tag,
                            found,
                            at,
                        });
                    }
                    None => {
                        return Err(FixtureError::Mismatched {
                            open: "body".into(),
                            found,
                            at,
                        });
                    }
                }
            } else {
                self.pos += 1;
                let tag = self.name("tag name")?;
                let node = doc.create_element(&tag);
                let self_closing = self.attributes(doc, node)?;
                doc.append_child(parent, node);
                if !self_closing && !VOID.contains(&tag.as_str()) {
                    open.push((node, tag));
                }
            }
        }
        match open.pop() {
            Some((_, tag)) => Err(FixtureError::Unclosed(tag)),
            None => Ok(()),
        }
    }

    /// Read attributes up to and including `>`. Returns whether the tag
    /// ended with `/>`.
    fn attributes(&mut self, doc: &mut MemoryDocument, node: NodeId) -> Result<bool, FixtureError> {
        loop {
            self.skip_ws();
            if self.eat("/>") {
                return Ok(true);
            }
            if self.eat(">") {
                return Ok(false);
            }
            if self.peek().is_none() {
                return Err(FixtureError::UnexpectedEof(self.pos));
            }
            let name = self.name("attribute name")?;
            self.skip_ws();
            let value = if self.eat("=") {
                self.skip_ws();
                self.attr_value()?
            } else {
                String::new()
            };
            keytrap::DocumentView::set_attribute(doc, &node, &name, &value);
        }
    }

    fn attr_value(&mut self) -> Result<String, FixtureError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let Some(end) = self.rest().find(quote) else {
                    return Err(FixtureError::UnexpectedEof(self.src.len()));
                };
                let value = self.rest()[..end].to_owned();
                self.pos += end + 1;
                Ok(value)
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != '>' && c != '"' && c != '\'')
                {
                    if self.rest().starts_with("/>") {
                        break;
                    }
                    self.bump();
                }
                if start == self.pos {
                    return Err(FixtureError::Expected {
                        expected: "attribute value",
                        at: self.pos,
                    });
                }
                Ok(self.src[start..self.pos].to_owned())
            }
            None => Err(FixtureError::UnexpectedEof(self.pos)),
        }
    }
}

//! Forward-only XML token cursor.
//!
//! The grammar parser only needs a small pull-style view of the document:
//! the kind, name and depth of the current node, its text, and a way to
//! advance. [`XmlCursor`] describes that view and [`TokenCursor`]
//! implements it on top of [`quick_xml::Reader`].

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::err::{Error, XmlRpcResult};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Kind of the node the cursor is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Before the first read, or after the end of the document.
    None,
    Element,
    EndElement,
    Text,
    /// Text made of whitespace only.
    Whitespace,
}

/// A pull-style cursor over XML nodes.
///
/// Depth follows the usual reader convention: an element and its end tag
/// share a depth, its children (including text) are one level deeper.
pub trait XmlCursor {
    /// Advance to the next node. Returns `false` at the end of the document.
    fn read(&mut self) -> XmlRpcResult<bool>;

    fn kind(&self) -> TokenKind;

    /// Element name, empty for text nodes.
    fn name(&self) -> &str;

    fn depth(&self) -> usize;

    /// `true` for self-closing elements, which have no end tag.
    fn is_empty_element(&self) -> bool;

    /// Text content, empty for elements.
    fn text(&self) -> &str;

    /// Skip ahead to the document element.
    ///
    /// Returns `false` if the document has no element.
    fn move_to_content(&mut self) -> XmlRpcResult<bool> {
        loop {
            match self.kind() {
                TokenKind::Element => return Ok(true),
                TokenKind::Text => {
                    return Err(Error::ill_formed("text found outside of document element"))
                }
                TokenKind::EndElement => {
                    return Err(Error::ill_formed(format!(
                        "unexpected end element {}",
                        self.name()
                    )))
                }
                TokenKind::None | TokenKind::Whitespace => (),
            }

            if !self.read()? {
                return Ok(false);
            }
        }
    }

    /// Read the text content of the current element and move past its end.
    ///
    /// The element must only contain text.
    fn read_element_text(&mut self) -> XmlRpcResult<String> {
        if self.kind() != TokenKind::Element {
            return Err(Error::ill_formed(format!(
                "expected an element, found {:?}",
                self.kind()
            )));
        }

        let name = self.name().to_owned();
        if self.is_empty_element() {
            self.read()?;
            return Ok(String::new());
        }

        let depth = self.depth();
        let mut content = String::new();
        loop {
            if !self.read()? {
                return Err(Error::ill_formed(format!(
                    "unexpected end of document inside {}",
                    name
                )));
            }

            match self.kind() {
                TokenKind::Text | TokenKind::Whitespace => content.push_str(self.text()),
                TokenKind::EndElement if self.depth() == depth => {
                    self.read()?;
                    return Ok(content);
                }
                TokenKind::Element => {
                    return Err(Error::ill_formed(format!(
                        "element {} contains unexpected child element {}",
                        name,
                        self.name()
                    )))
                }
                TokenKind::EndElement | TokenKind::None => {
                    return Err(Error::ill_formed(format!("element {} is not closed", name)))
                }
            }
        }
    }
}

/// Owned form of the events the cursor cares about.
#[derive(Debug)]
enum RawToken {
    Start(String),
    Empty(String),
    End(String),
    Text(String),
    Eof,
}

/// [`XmlCursor`] over an in-memory document, backed by quick-xml.
///
/// Adjacent text, CDATA and entity references are merged into a single
/// text node. Comments, declarations and processing instructions are
/// skipped.
pub struct TokenCursor<'a> {
    reader: Reader<&'a [u8]>,
    /// lookahead left over from merging text nodes
    pending: Option<RawToken>,
    /// number of currently open elements
    open: usize,

    kind: TokenKind,
    name: String,
    depth: usize,
    empty: bool,
    text: String,
}

impl<'a> TokenCursor<'a> {
    /// Create a cursor over a document. A leading UTF-8 BOM is skipped.
    pub fn new(input: &'a [u8]) -> Self {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);

        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(false);

        Self {
            reader,
            pending: None,
            open: 0,
            kind: TokenKind::None,
            name: String::new(),
            depth: 0,
            empty: false,
            text: String::new(),
        }
    }

    /// Create a cursor over a document preceded by arbitrary content,
    /// e.g. stray HTTP framing. Every byte before the first `<` is discarded.
    pub fn skipping_leading_junk(input: &'a [u8]) -> XmlRpcResult<Self> {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        let start = input
            .iter()
            .position(|b| *b == b'<')
            .ok_or_else(|| Error::ill_formed("content does not contain valid XML"))?;

        if start > 0 {
            log::debug!("discarding {} bytes of leading content", start);
        }

        Ok(Self::new(&input[start..]))
    }

    fn set_position(&mut self, kind: TokenKind, name: String, depth: usize, empty: bool) {
        self.kind = kind;
        self.name = name;
        self.depth = depth;
        self.empty = empty;
        self.text.clear();
    }

    /// Pull the next event we care about from the reader.
    fn next_raw(&mut self) -> XmlRpcResult<RawToken> {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| Error::ill_formed(e.to_string()))?;

            let token = match event {
                Event::Start(e) => RawToken::Start(element_name(e.name().as_ref())?),
                Event::Empty(e) => RawToken::Empty(element_name(e.name().as_ref())?),
                Event::End(e) => RawToken::End(element_name(e.name().as_ref())?),
                Event::Text(e) => RawToken::Text(
                    e.decode()
                        .map_err(|err| Error::ill_formed(err.to_string()))?
                        .into_owned(),
                ),
                Event::CData(e) => RawToken::Text(
                    std::str::from_utf8(e.as_ref())
                        .map_err(|err| Error::ill_formed(err.to_string()))?
                        .to_owned(),
                ),
                Event::GeneralRef(e) => {
                    let raw = e
                        .decode()
                        .map_err(|err| Error::ill_formed(err.to_string()))?;
                    RawToken::Text(resolve_entity(&raw)?)
                }
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Eof => RawToken::Eof,
            };

            return Ok(token);
        }
    }
}

impl<'a> XmlCursor for TokenCursor<'a> {
    fn read(&mut self) -> XmlRpcResult<bool> {
        let token = match self.pending.take() {
            Some(t) => t,
            None => self.next_raw()?,
        };

        match token {
            RawToken::Start(name) => {
                self.set_position(TokenKind::Element, name, self.open, false);
                self.open += 1;
            }
            RawToken::Empty(name) => {
                self.set_position(TokenKind::Element, name, self.open, true);
            }
            RawToken::End(name) => {
                self.open = self
                    .open
                    .checked_sub(1)
                    .ok_or_else(|| Error::ill_formed(format!("unmatched end element {}", name)))?;
                self.set_position(TokenKind::EndElement, name, self.open, false);
            }
            RawToken::Text(mut text) => {
                // merge text split up by entity references
                loop {
                    match self.next_raw()? {
                        RawToken::Text(more) => text.push_str(&more),
                        other => {
                            self.pending = Some(other);
                            break;
                        }
                    }
                }

                let kind = match text.chars().all(char::is_whitespace) {
                    true => TokenKind::Whitespace,
                    false => TokenKind::Text,
                };
                self.set_position(kind, String::new(), self.open, false);
                self.text = text;
            }
            RawToken::Eof => {
                if self.open > 0 {
                    return Err(Error::ill_formed(format!(
                        "unexpected end of document with {} unclosed elements",
                        self.open
                    )));
                }
                self.set_position(TokenKind::None, String::new(), 0, false);
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn is_empty_element(&self) -> bool {
        self.empty
    }

    fn text(&self) -> &str {
        &self.text
    }
}

fn element_name(raw: &[u8]) -> XmlRpcResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| Error::ill_formed(format!("element name is not valid UTF-8: {}", e)))
}

/// Resolve a general entity reference, e.g. `lt` or `#x09`.
fn resolve_entity(raw: &str) -> XmlRpcResult<String> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.to_owned());
    }

    let code = match raw.strip_prefix('#') {
        Some(rest) => match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => rest.parse::<u32>().ok(),
        },
        None => None,
    };

    code.and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| Error::ill_formed(format!("unknown entity reference &{};", raw)))
}

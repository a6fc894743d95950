//! XML-RPC grammar parser.
//!
//! Turns an [`XmlCursor`] into a lazy, forward-only sequence of
//! [`NodeEvent`]s. The parser walks the document with an explicit stack of
//! pending [`Frame`]s; each call to [`NodeSource::next_node`] runs frames
//! until one of them produces a node.
//!
//! No end nodes are produced. Every node carries the number of enclosing
//! struct/array containers, which is enough for a consumer to tell where a
//! container ends.

use crate::consts;
use crate::cursor::{TokenKind, XmlCursor};
use crate::err::{Error, XmlRpcResult};
use crate::node::{Node, NodeEvent};

/// A forward-only source of parse events, with one event of lookahead.
pub trait NodeSource {
    /// Consume the next event.
    fn next_node(&mut self) -> XmlRpcResult<Option<NodeEvent>>;

    /// Look at the next event without consuming it.
    fn peek_node(&mut self) -> XmlRpcResult<Option<&NodeEvent>>;
}

/// Pending work of the parser.
///
/// Frames are pushed in reverse order of execution: a frame that must run
/// after the children of an element is pushed before them.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    /// Start of a `methodCall` document
    Request,
    /// Start of a `methodResponse` document
    Response,
    /// Body of a `methodResponse`, after the response marker
    ResponseBody,
    /// Start of a standalone `value` document
    ValueDocument,
    /// Optional `params` of a `methodCall` at `parent`
    RequestParams { parent: usize },
    /// `param` elements of the `params` element at `parent`
    ParamList { parent: usize, first: bool },
    /// A `param` or `fault` element holding a single value
    ValueHolder,
    /// A `value` element
    Value { nesting: usize },
    /// Members of the `struct` element at `depth`
    StructMembers {
        depth: usize,
        nesting: usize,
        first: bool,
    },
    /// The `array` element wrapping a `data` element
    ArrayData { nesting: usize },
    /// `value` elements of the `data` element at `parent`
    ArrayElements {
        parent: usize,
        nesting: usize,
        first: bool,
    },
    /// Move past the end of the element at `depth`
    Close { depth: usize },
}

/// Lazy XML-RPC grammar parser.
///
/// A parser is single pass. Once it has returned `None` or an error, it
/// produces nothing else; parsing again needs a fresh cursor.
pub struct Parser<C: XmlCursor> {
    cursor: C,
    frames: Vec<Frame>,
    peeked: Option<NodeEvent>,
}

impl<C: XmlCursor> Parser<C> {
    fn with_frame(cursor: C, frame: Frame) -> Self {
        Self {
            cursor,
            frames: vec![frame],
            peeked: None,
        }
    }

    /// Parse a `methodCall` document.
    pub fn request(cursor: C) -> Self {
        Self::with_frame(cursor, Frame::Request)
    }

    /// Parse a `methodResponse` document.
    pub fn response(cursor: C) -> Self {
        Self::with_frame(cursor, Frame::Response)
    }

    /// Parse a document made of a single `value` element.
    pub fn value(cursor: C) -> Self {
        Self::with_frame(cursor, Frame::ValueDocument)
    }

    /// Returns the underlying cursor.
    pub fn into_cursor(self) -> C {
        self.cursor
    }

    /// Run frames until a node is produced or the document is exhausted.
    fn produce(&mut self) -> XmlRpcResult<Option<NodeEvent>> {
        while let Some(frame) = self.frames.pop() {
            match self.run(frame) {
                Ok(Some(event)) => {
                    log::trace!("parsed {:?} at nesting {}", event.node, event.depth);
                    return Ok(Some(event));
                }
                Ok(None) => (),
                Err(e) => {
                    // not restartable
                    self.frames.clear();
                    return Err(e);
                }
            }
        }

        Ok(None)
    }

    /// Execute a single frame.
    fn run(&mut self, frame: Frame) -> XmlRpcResult<Option<NodeEvent>> {
        match frame {
            Frame::Request => {
                let depth = self.enter_document(consts::METHOD_CALL)?;
                self.frames.push(Frame::Close { depth });

                descend(&mut self.cursor, consts::METHOD_NAME, true)?;
                let name = self.cursor.read_element_text()?;
                if name.is_empty() {
                    return Err(Error::invalid("request contains empty method name"));
                }

                self.frames.push(Frame::RequestParams { parent: depth });
                Ok(Some(NodeEvent::new(Node::MethodName(name), 0)))
            }

            Frame::RequestParams { parent } => {
                match seek_child(&mut self.cursor, parent, &[consts::PARAMS])? {
                    true => {
                        let depth = self.cursor.depth();
                        self.frames.push(Frame::Close { depth });
                        self.frames.push(Frame::ParamList {
                            parent: depth,
                            first: true,
                        });
                        Ok(Some(NodeEvent::new(Node::Params, 0)))
                    }
                    false => Ok(None),
                }
            }

            Frame::ParamList { parent, first } => {
                let found = match first {
                    true => descend(&mut self.cursor, consts::PARAM, false)?,
                    false => seek_child(&mut self.cursor, parent, &[consts::PARAM])?,
                };

                if found {
                    let depth = self.cursor.depth();
                    self.frames.push(Frame::ParamList {
                        parent,
                        first: false,
                    });
                    self.frames.push(Frame::Close { depth });
                    self.frames.push(Frame::ValueHolder);
                }
                Ok(None)
            }

            Frame::Response => {
                self.frames.push(Frame::ResponseBody);
                Ok(Some(NodeEvent::new(Node::Response, 0)))
            }

            Frame::ResponseBody => {
                let depth = self.enter_document(consts::METHOD_RESPONSE)?;
                self.frames.push(Frame::Close { depth });

                descend_any(&mut self.cursor, &[consts::PARAMS, consts::FAULT])?;
                let child_depth = self.cursor.depth();
                self.frames.push(Frame::Close { depth: child_depth });

                match self.cursor.name() == consts::FAULT {
                    true => {
                        self.frames.push(Frame::ValueHolder);
                        Ok(Some(NodeEvent::new(Node::Fault, 0)))
                    }
                    false => {
                        if descend(&mut self.cursor, consts::PARAM, false)? {
                            let depth = self.cursor.depth();
                            self.frames.push(Frame::Close { depth });
                            self.frames.push(Frame::ValueHolder);
                        }
                        Ok(None)
                    }
                }
            }

            Frame::ValueDocument => {
                self.enter_document(consts::VALUE)?;
                self.frames.push(Frame::Value { nesting: 0 });
                Ok(None)
            }

            Frame::ValueHolder => {
                descend(&mut self.cursor, consts::VALUE, true)?;
                self.frames.push(Frame::Value { nesting: 0 });
                Ok(None)
            }

            Frame::Value { nesting } => {
                let node = self.enter_value(nesting)?;
                Ok(node.map(|n| NodeEvent::new(n, nesting)))
            }

            Frame::StructMembers {
                depth,
                nesting,
                first,
            } => {
                let found = match first {
                    true => descend(&mut self.cursor, consts::MEMBER, false)?,
                    false => seek_child(&mut self.cursor, depth, &[consts::MEMBER])?,
                };
                if !found {
                    return Ok(None);
                }

                let member_depth = self.cursor.depth();
                descend(&mut self.cursor, consts::NAME, true)?;
                let name = self.cursor.read_element_text()?;

                while self.cursor.kind() == TokenKind::Whitespace {
                    self.cursor.read()?;
                }
                let has_value = self.cursor.kind() == TokenKind::Element
                    && self.cursor.depth() == member_depth + 1
                    && self.cursor.name() == consts::VALUE;
                if !has_value {
                    return Err(Error::ill_formed(format!(
                        "struct member {} is not followed by a value element",
                        name
                    )));
                }

                self.frames.push(Frame::StructMembers {
                    depth,
                    nesting,
                    first: false,
                });
                self.frames.push(Frame::Close {
                    depth: member_depth,
                });
                self.frames.push(Frame::Value {
                    nesting: nesting + 1,
                });
                Ok(Some(NodeEvent::new(Node::StructMember(name), nesting + 1)))
            }

            Frame::ArrayData { nesting } => {
                // an array without data is empty, the pending close ends it
                if !descend(&mut self.cursor, consts::DATA, false)? {
                    return Ok(None);
                }

                let depth = self.cursor.depth();
                self.frames.push(Frame::Close { depth });
                self.frames.push(Frame::ArrayElements {
                    parent: depth,
                    nesting,
                    first: true,
                });
                Ok(None)
            }

            Frame::ArrayElements {
                parent,
                nesting,
                first,
            } => {
                let found = match first {
                    true => descend(&mut self.cursor, consts::VALUE, false)?,
                    false => seek_child(&mut self.cursor, parent, &[consts::VALUE])?,
                };

                if found {
                    self.frames.push(Frame::ArrayElements {
                        parent,
                        nesting,
                        first: false,
                    });
                    self.frames.push(Frame::Value {
                        nesting: nesting + 1,
                    });
                }
                Ok(None)
            }

            Frame::Close { depth } => {
                close_element(&mut self.cursor, depth)?;
                Ok(None)
            }
        }
    }

    /// Move to the document element and check its name.
    ///
    /// Returns the depth of the document element.
    fn enter_document(&mut self, expected: &str) -> XmlRpcResult<usize> {
        if !self.cursor.move_to_content()? {
            return Err(Error::ill_formed("document has no root element"));
        }

        match self.cursor.name() == expected {
            true => Ok(self.cursor.depth()),
            false => Err(Error::ill_formed(format!(
                "expected {} element, found {}",
                expected,
                self.cursor.name()
            ))),
        }
    }

    /// Interpret the `value` element under the cursor.
    ///
    /// Compound values push the frames for their content. Returns `None`
    /// for a value holding an unrecognised element.
    fn enter_value(&mut self, nesting: usize) -> XmlRpcResult<Option<Node>> {
        let depth = self.cursor.depth();
        self.frames.push(Frame::Close { depth });

        let implicit = |text: String| Node::String {
            text,
            implicit: true,
        };

        if self.cursor.is_empty_element() {
            return Ok(Some(implicit(String::new())));
        }
        read_required(&mut self.cursor)?;

        let mut leading = String::new();
        match self.cursor.kind() {
            TokenKind::Text => return Ok(Some(implicit(self.cursor.text().to_owned()))),
            TokenKind::Whitespace => {
                leading = self.cursor.text().to_owned();
                read_required(&mut self.cursor)?;
            }
            _ => (),
        }

        match self.cursor.kind() {
            TokenKind::EndElement => Ok(Some(implicit(leading))),
            TokenKind::Element => self.enter_typed_value(nesting),
            // text directly after whitespace is merged by the cursor
            TokenKind::Text | TokenKind::Whitespace | TokenKind::None => Err(Error::ill_formed(
                "unexpected content inside value element",
            )),
        }
    }

    /// Interpret the typed child element of a `value`.
    fn enter_typed_value(&mut self, nesting: usize) -> XmlRpcResult<Option<Node>> {
        let name = self.cursor.name().to_owned();

        let node = match name.as_str() {
            consts::STRING => Node::String {
                text: self.cursor.read_element_text()?,
                implicit: false,
            },
            consts::INT | consts::I4 => Node::Int(self.cursor.read_element_text()?),
            consts::I8 => Node::Long(self.cursor.read_element_text()?),
            consts::DOUBLE => Node::Double(self.cursor.read_element_text()?),
            consts::DATETIME => Node::DateTime(self.cursor.read_element_text()?),
            consts::BOOLEAN => Node::Boolean(self.cursor.read_element_text()?),
            consts::BASE64 => Node::Base64(self.cursor.read_element_text()?),
            consts::NIL => Node::Nil,
            consts::STRUCT => {
                let depth = self.cursor.depth();
                self.frames.push(Frame::Close { depth });
                self.frames.push(Frame::StructMembers {
                    depth,
                    nesting,
                    first: true,
                });
                Node::StructStart
            }
            consts::ARRAY => {
                let depth = self.cursor.depth();
                self.frames.push(Frame::Close { depth });
                self.frames.push(Frame::ArrayData { nesting });
                Node::ArrayStart
            }
            other => {
                log::debug!("ignoring unrecognised value element {}", other);
                return Ok(None);
            }
        };

        Ok(Some(node))
    }
}

impl<C: XmlCursor> NodeSource for Parser<C> {
    fn next_node(&mut self) -> XmlRpcResult<Option<NodeEvent>> {
        match self.peeked.take() {
            Some(event) => Ok(Some(event)),
            None => self.produce(),
        }
    }

    fn peek_node(&mut self) -> XmlRpcResult<Option<&NodeEvent>> {
        if self.peeked.is_none() {
            self.peeked = self.produce()?;
        }

        Ok(self.peeked.as_ref())
    }
}

impl<C: XmlCursor> Iterator for Parser<C> {
    type Item = XmlRpcResult<NodeEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_node().transpose()
    }
}

/// A recorded sequence of parse events.
///
/// Unlike a [`Parser`], a replay can be rewound and traversed again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    nodes: Vec<NodeEvent>,
    pos: usize,
}

impl Replay {
    pub fn new(nodes: Vec<NodeEvent>) -> Self {
        Self { nodes, pos: 0 }
    }

    /// Drain a source into a replay.
    pub fn record<S: NodeSource>(source: &mut S) -> XmlRpcResult<Self> {
        let mut nodes = vec![];
        while let Some(event) = source.next_node()? {
            nodes.push(event);
        }

        Ok(Self::new(nodes))
    }

    /// Go back to the first event.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub fn nodes(&self) -> &[NodeEvent] {
        &self.nodes
    }
}

impl NodeSource for Replay {
    fn next_node(&mut self) -> XmlRpcResult<Option<NodeEvent>> {
        let event = self.nodes.get(self.pos).cloned();
        if event.is_some() {
            self.pos += 1;
        }

        Ok(event)
    }

    fn peek_node(&mut self) -> XmlRpcResult<Option<&NodeEvent>> {
        Ok(self.nodes.get(self.pos))
    }
}

/// Advance the cursor, treating the end of the document as ill-formed.
fn read_required<C: XmlCursor>(cursor: &mut C) -> XmlRpcResult<()> {
    match cursor.read()? {
        true => Ok(()),
        false => Err(Error::ill_formed("unexpected end of document")),
    }
}

/// Scan forward for a child element of the element at `parent`.
///
/// The current node is considered first. Stops on the parent's end tag
/// without consuming it.
fn seek_child<C: XmlCursor>(cursor: &mut C, parent: usize, names: &[&str]) -> XmlRpcResult<bool> {
    loop {
        match cursor.kind() {
            TokenKind::Element
                if cursor.depth() == parent + 1 && names.contains(&cursor.name()) =>
            {
                return Ok(true)
            }
            TokenKind::EndElement if cursor.depth() <= parent => return Ok(false),
            TokenKind::None => return Err(Error::ill_formed("unexpected end of document")),
            _ => (),
        }

        read_required(cursor)?;
    }
}

/// Move from the element under the cursor to its first child named `name`.
///
/// If there is none, the cursor is left on the element's end tag and an
/// error is raised when `required` is set.
fn descend<C: XmlCursor>(cursor: &mut C, name: &str, required: bool) -> XmlRpcResult<bool> {
    let found = match cursor.is_empty_element() {
        true => false,
        false => {
            let depth = cursor.depth();
            read_required(cursor)?;
            seek_child(cursor, depth, &[name])?
        }
    };

    match (found, required) {
        (false, true) => Err(Error::ill_formed(format!("missing element {}", name))),
        _ => Ok(found),
    }
}

/// Like [`descend`], accepting any of `names`. The child is required.
fn descend_any<C: XmlCursor>(cursor: &mut C, names: &[&str]) -> XmlRpcResult<()> {
    let parent = cursor.name().to_owned();
    let found = match cursor.is_empty_element() {
        true => false,
        false => {
            let depth = cursor.depth();
            read_required(cursor)?;
            seek_child(cursor, depth, names)?
        }
    };

    match found {
        true => Ok(()),
        false => Err(Error::ill_formed(format!(
            "{} does not contain any of {}",
            parent,
            names.join(", ")
        ))),
    }
}

/// Move past the end of the element at `depth`.
fn close_element<C: XmlCursor>(cursor: &mut C, depth: usize) -> XmlRpcResult<()> {
    let on_empty = cursor.kind() == TokenKind::Element
        && cursor.is_empty_element()
        && cursor.depth() == depth;

    if !on_empty {
        loop {
            match cursor.kind() {
                TokenKind::EndElement if cursor.depth() == depth => break,
                TokenKind::EndElement if cursor.depth() < depth => {
                    return Err(Error::ill_formed(format!(
                        "element at depth {} was never closed",
                        depth
                    )))
                }
                _ => (),
            }

            if !cursor.read()? {
                return Err(Error::ill_formed(format!(
                    "document ended before element at depth {} was closed",
                    depth
                )));
            }
        }
    }

    // past the end tag, end of document is fine here
    cursor.read()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::TokenCursor;

    fn string(text: &str, implicit: bool) -> Node {
        Node::String {
            text: text.to_string(),
            implicit,
        }
    }

    fn parse_request(input: &str) -> XmlRpcResult<Vec<NodeEvent>> {
        Parser::request(TokenCursor::new(input.as_bytes())).collect()
    }

    fn parse_response(input: &str) -> XmlRpcResult<Vec<NodeEvent>> {
        Parser::response(TokenCursor::new(input.as_bytes())).collect()
    }

    fn nodes(events: Vec<NodeEvent>) -> Vec<Node> {
        events.into_iter().map(|e| e.node).collect()
    }

    #[test]
    fn test_request_scalars() {
        let input = r#"<?xml version="1.0"?>
<methodCall>
  <methodName>examples.getStateName</methodName>
  <params>
    <param><value><i4>41</i4></value></param>
    <param><value>bare text</value></param>
    <param><value><string>explicit</string></value></param>
    <param><value/></param>
    <param><value><boolean>1</boolean></value></param>
    <param><value><nil/></value></param>
  </params>
</methodCall>"#;

        let events = parse_request(input).unwrap();
        assert!(events.iter().all(|e| e.depth == 0));
        assert_eq!(
            nodes(events),
            vec![
                Node::MethodName("examples.getStateName".to_string()),
                Node::Params,
                Node::Int("41".to_string()),
                string("bare text", true),
                string("explicit", false),
                string("", true),
                Node::Boolean("1".to_string()),
                Node::Nil,
            ]
        );
    }

    #[test]
    fn test_request_without_params() {
        let events = parse_request("<methodCall><methodName>ping</methodName></methodCall>").unwrap();
        assert_eq!(nodes(events), vec![Node::MethodName("ping".to_string())]);

        let events =
            parse_request("<methodCall><methodName>ping</methodName><params/></methodCall>")
                .unwrap();
        assert_eq!(
            nodes(events),
            vec![Node::MethodName("ping".to_string()), Node::Params]
        );
    }

    #[test]
    fn test_empty_method_name() {
        let err = parse_request("<methodCall><methodName></methodName></methodCall>").unwrap_err();
        assert!(matches!(err, Error::InvalidXmlRpc { .. }));
    }

    #[test]
    fn test_wrong_root() {
        let err = parse_request("<methodResponse><params/></methodResponse>").unwrap_err();
        assert!(matches!(err, Error::IllFormedXml { .. }));
    }

    #[test]
    fn test_missing_method_name() {
        let err = parse_request("<methodCall><params/></methodCall>").unwrap_err();
        assert!(matches!(err, Error::IllFormedXml { .. }));
    }

    #[test]
    fn test_nested_struct_nesting() {
        let input = "<methodResponse><params><param><value><struct>
            <member><name>inner</name><value><struct>
                <member><name>x</name><value><int>1</int></value></member>
            </struct></value></member>
            <member><name>after</name><value><int>2</int></value></member>
        </struct></value></param></params></methodResponse>";

        let events = parse_response(input).unwrap();
        let flat = events
            .iter()
            .map(|e| (e.node.clone(), e.depth))
            .collect::<Vec<_>>();

        assert_eq!(
            flat,
            vec![
                (Node::Response, 0),
                (Node::StructStart, 0),
                (Node::StructMember("inner".to_string()), 1),
                (Node::StructStart, 1),
                (Node::StructMember("x".to_string()), 2),
                (Node::Int("1".to_string()), 2),
                (Node::StructMember("after".to_string()), 1),
                (Node::Int("2".to_string()), 1),
            ]
        );
    }

    #[test]
    fn test_array_elements() {
        let input = "<methodResponse><params><param><value><array><data>
            <value><int>1</int></value>
            <value><array><data><value>a</value></data></array></value>
            <value><struct/></value>
            <value><i8>3</i8></value>
        </data></array></value></param></params></methodResponse>";

        let flat = parse_response(input)
            .unwrap()
            .into_iter()
            .map(|e| (e.node, e.depth))
            .collect::<Vec<_>>();

        assert_eq!(
            flat,
            vec![
                (Node::Response, 0),
                (Node::ArrayStart, 0),
                (Node::Int("1".to_string()), 1),
                (Node::ArrayStart, 1),
                (string("a", true), 2),
                (Node::StructStart, 1),
                (Node::Long("3".to_string()), 1),
            ]
        );
    }

    #[test]
    fn test_array_without_data() {
        for array in ["<array></array>", "<array/>", "<array> </array>"] {
            let input = format!(
                "<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
                array
            );
            assert_eq!(
                parse_response(&input).unwrap(),
                vec![
                    NodeEvent::new(Node::Response, 0),
                    NodeEvent::new(Node::ArrayStart, 0),
                ]
            );
        }
    }

    #[test]
    fn test_fault_response() {
        let input = "<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>4</int></value></member>
            <member><name>faultString</name><value><string>Too many parameters.</string></value></member>
        </struct></value></fault></methodResponse>";

        let events = nodes(parse_response(input).unwrap());
        assert_eq!(events[0], Node::Response);
        assert_eq!(events[1], Node::Fault);
        assert_eq!(events[2], Node::StructStart);
        assert_eq!(events.len(), 7);
    }

    #[test]
    fn test_empty_response() {
        let events = nodes(parse_response("<methodResponse><params/></methodResponse>").unwrap());
        assert_eq!(events, vec![Node::Response]);
    }

    #[test]
    fn test_unknown_value_element_is_skipped() {
        let input = "<methodResponse><params><param><value><array><data>
            <value><unknown>1</unknown></value>
            <value><int>2</int></value>
        </data></array></value></param></params></methodResponse>";

        let events = nodes(parse_response(input).unwrap());
        assert_eq!(
            events,
            vec![Node::Response, Node::ArrayStart, Node::Int("2".to_string())]
        );
    }

    #[test]
    fn test_member_without_value() {
        let input = "<methodResponse><params><param><value><struct>
            <member><name>a</name></member>
        </struct></value></param></params></methodResponse>";

        let err = parse_response(input).unwrap_err();
        assert!(matches!(err, Error::IllFormedXml { .. }));
    }

    #[test]
    fn test_whitespace_only_value_is_kept() {
        let events = nodes(
            parse_response(
                "<methodResponse><params><param><value>  </value></param></params></methodResponse>",
            )
            .unwrap(),
        );
        assert_eq!(events[1], string("  ", true));
    }

    #[test]
    fn test_parser_stops_after_error() {
        let mut parser = Parser::request(TokenCursor::new(b"<methodCall><params/></methodCall>"));

        assert!(parser.next_node().is_err());
        assert_eq!(parser.next_node().unwrap(), None);
    }

    #[test]
    fn test_peek_then_next() {
        let mut parser = Parser::value(TokenCursor::new(b"<value><double>1.5</double></value>"));

        let peeked = parser.peek_node().unwrap().cloned();
        let next = parser.next_node().unwrap();
        assert_eq!(peeked, next);
        assert_eq!(next.unwrap().node, Node::Double("1.5".to_string()));
        assert_eq!(parser.next_node().unwrap(), None);
    }

    #[test]
    fn test_replay_rewind() {
        let mut parser = Parser::value(TokenCursor::new(
            b"<value><array><data><value>x</value></data></array></value>",
        ));
        let mut replay = Replay::record(&mut parser).unwrap();

        let first = Replay::record(&mut replay).unwrap();
        replay.rewind();
        let second = Replay::record(&mut replay).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.nodes().len(), 2);
    }
}

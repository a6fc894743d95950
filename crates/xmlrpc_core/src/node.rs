//! Semantic parse events of the XML-RPC grammar.
//!
//! Scalars carry the raw wire text. Nothing is validated here; that is
//! left to the deserializer.

/// A single XML-RPC grammar token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Content of `methodName`
    MethodName(String),
    /// Start of `params` in a request
    Params,
    /// Start of a `methodResponse`
    Response,
    /// Start of `fault` in a response
    Fault,
    /// Content of a struct member's `name`, followed by the member value
    StructMember(String),
    StructStart,
    ArrayStart,
    Nil,

    /// A string value. `implicit` is set when the `value` element held bare
    /// text instead of a `string` element.
    String { text: String, implicit: bool },
    Int(String),
    Long(String),
    Double(String),
    Boolean(String),
    DateTime(String),
    Base64(String),
}

impl Node {
    /// Returns `true` if this node starts a value subtree.
    pub fn is_value(&self) -> bool {
        match self {
            Self::MethodName(_)
            | Self::Params
            | Self::Response
            | Self::Fault
            | Self::StructMember(_) => false,

            Self::StructStart
            | Self::ArrayStart
            | Self::Nil
            | Self::String { .. }
            | Self::Int(_)
            | Self::Long(_)
            | Self::Double(_)
            | Self::Boolean(_)
            | Self::DateTime(_)
            | Self::Base64(_) => true,
        }
    }

    /// Short description, used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::MethodName(_) => "methodName",
            Self::Params => "params",
            Self::Response => "methodResponse",
            Self::Fault => "fault",
            Self::StructMember(_) => "struct member",
            Self::StructStart => "struct",
            Self::ArrayStart => "array",
            Self::Nil => "nil",
            Self::String { implicit: true, .. } => "implicit string",
            Self::String { .. } => "string",
            Self::Int(_) => "integer",
            Self::Long(_) => "i8",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "dateTime",
            Self::Base64(_) => "base64",
        }
    }
}

/// A [`Node`] together with its container nesting.
///
/// `depth` counts the struct and array containers enclosing the node.
/// Struct members and array elements sit one level below their container,
/// which is how the end of a container is detected without an end node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub node: Node,
    pub depth: usize,
}

impl NodeEvent {
    pub fn new(node: Node, depth: usize) -> Self {
        Self { node, depth }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_nodes() {
        assert!(Node::StructStart.is_value());
        assert!(Node::Nil.is_value());
        assert!(Node::String {
            text: String::new(),
            implicit: true
        }
        .is_value());
        assert!(!Node::StructMember("a".to_string()).is_value());
        assert!(!Node::Params.is_value());
    }
}

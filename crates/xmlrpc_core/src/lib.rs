//! XML-RPC wire payload decoding.
//!
//! A payload flows through three layers:
//! - [`XmlCursor`] tokenizes the XML text,
//! - [`Parser`] turns tokens into a flat sequence of XML-RPC [`Node`]s,
//! - [`Deserializer`] folds nodes into [`Value`]s, optionally checked
//!   against [`TypeDesc`] descriptors, and binds them into a [`Request`]
//!   or [`Response`].
//!
//! ```ignore
//! let de = Deserializer::default();
//! let response = de.deserialize_response(bytes, Some(&TypeDesc::Int), MappingAction::Strict)?;
//! ```
//!
//! Rust types participate through [`FromXmlRpc`], derived for structs with
//! `#[derive(XmlRpcStruct)]`, and service signatures come from traits
//! annotated with `#[xmlrpc_interface]`. Any [`Value`] can also be handed to
//! serde through [`from_value`].

// lets the proc-macros refer to this crate by name from within it
extern crate self as xmlrpc_core;

pub mod consts;
mod cursor;
mod de;
mod descriptor;
mod dialect;
mod envelope;
mod err;
mod node;
mod parse_stack;
mod parser;
mod serde_de;
pub mod typed;
mod value;

pub use cursor::{TokenCursor, TokenKind, XmlCursor};
pub use de::{Deserializer, DEFAULT_MAX_DEPTH};
pub use descriptor::{
    MemberDesc, MethodDesc, ParamDesc, Service, ServiceDescriptor, StructDesc, StructDescBuilder,
    TypeDesc, TypeRef,
};
pub use dialect::{MappingAction, NonStandard, NonStandardOption};
pub use envelope::{Fault, Request, Response};
pub use err::{Error, XmlRpcResult};
pub use node::{Node, NodeEvent};
pub use parse_stack::ParseStack;
pub use parser::{NodeSource, Parser, Replay};
pub use serde_de::{from_value, ValueDeserializer};
pub use typed::FromXmlRpc;
pub use value::{Array, ArrayKind, Struct, Value, ValueKind, DATETIME_MIN};

pub use xmlrpc_macros::{xmlrpc_interface, XmlRpcStruct};

//! Binding decoded values to Rust types.
//!
//! [`FromXmlRpc`] pairs a type's descriptor with a conversion from the
//! [`Value`] the deserializer builds against that descriptor. Structs get
//! it through `#[derive(XmlRpcStruct)]`.

use chrono::NaiveDateTime;
use serde_bytes::ByteBuf;

use crate::de::Deserializer;
use crate::descriptor::TypeDesc;
use crate::dialect::MappingAction;
use crate::envelope::{Fault, Request};
use crate::err::{Error, XmlRpcResult};
use crate::value::{Struct, Value};

/// A type that can be decoded from an XML-RPC value.
pub trait FromXmlRpc: Sized {
    /// Descriptor the wire value is deserialized against.
    fn type_desc() -> TypeDesc;

    /// Convert a value deserialized against [`FromXmlRpc::type_desc`].
    fn from_xmlrpc(value: Value) -> XmlRpcResult<Self>;
}

/// Error for a value that does not have the expected shape.
pub fn mismatch(expected: &str, found: &Value) -> Error {
    Error::mismatch(format!("expected {}, found {}", expected, found.kind()))
}

/// Unwrap a struct value, used by derived implementations.
pub fn expect_struct(value: Value, type_name: &str) -> XmlRpcResult<Struct> {
    match value {
        Value::Struct(members) => Ok(members),
        other => Err(mismatch(type_name, &other)),
    }
}

/// Impl [FromXmlRpc] for types held by a single [Value] variant
macro_rules! from_variant {
    ($($ty: ty => $desc: ident, $variant: ident);* $(;)?) => {
        $(
            impl FromXmlRpc for $ty {
                fn type_desc() -> TypeDesc {
                    TypeDesc::$desc
                }

                fn from_xmlrpc(value: Value) -> XmlRpcResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v.into()),
                        other => Err(mismatch(&Self::type_desc().name(), &other)),
                    }
                }
            }
        )*
    };
}

from_variant! {
    i32 => Int, Int;
    f64 => Double, Double;
    bool => Boolean, Boolean;
    String => String, String;
    NaiveDateTime => DateTime, DateTime;
    ByteBuf => Base64, Base64;
    Struct => GenericStruct, Struct;
}

impl FromXmlRpc for i64 {
    fn type_desc() -> TypeDesc {
        TypeDesc::Long
    }

    fn from_xmlrpc(value: Value) -> XmlRpcResult<Self> {
        match value {
            Value::Long(v) => Ok(v),
            Value::Int(v) => Ok(v.into()),
            other => Err(mismatch("i8", &other)),
        }
    }
}

impl FromXmlRpc for Value {
    fn type_desc() -> TypeDesc {
        TypeDesc::Any
    }

    fn from_xmlrpc(value: Value) -> XmlRpcResult<Self> {
        Ok(value)
    }
}

impl FromXmlRpc for () {
    fn type_desc() -> TypeDesc {
        TypeDesc::Void
    }

    fn from_xmlrpc(value: Value) -> XmlRpcResult<Self> {
        match value {
            Value::Nil => Ok(()),
            other => Err(mismatch("no value", &other)),
        }
    }
}

impl<T: FromXmlRpc> FromXmlRpc for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::array(T::type_desc())
    }

    fn from_xmlrpc(value: Value) -> XmlRpcResult<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_xmlrpc).collect(),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl<T: FromXmlRpc> FromXmlRpc for Option<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::optional(T::type_desc())
    }

    fn from_xmlrpc(value: Value) -> XmlRpcResult<Self> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_xmlrpc(other).map(Some),
        }
    }
}

impl Request {
    /// Convert the argument at `index`.
    pub fn arg<T: FromXmlRpc>(&self, index: usize) -> XmlRpcResult<T> {
        let value = self
            .args
            .get(index)
            .cloned()
            .ok_or_else(|| Error::InvalidParameters {
                message: format!(
                    "request for {} has no parameter {}",
                    self.method_name,
                    index + 1
                ),
            })?;

        T::from_xmlrpc(value)
    }
}

impl Deserializer {
    /// Decode a standalone `value` document into `T`.
    pub fn deserialize_typed<T: FromXmlRpc>(
        &self,
        input: &[u8],
        mapping: MappingAction,
    ) -> XmlRpcResult<T> {
        let value = self.deserialize_value_document(input, Some(&T::type_desc()), mapping)?;
        T::from_xmlrpc(value)
    }

    /// Decode a `methodResponse` document into `T`, or the fault it carries.
    ///
    /// A response without a value converts from [`Value::Nil`], so it fits
    /// `()` and `Option<_>` return types.
    pub fn deserialize_typed_response<T: FromXmlRpc>(
        &self,
        input: &[u8],
        mapping: MappingAction,
    ) -> XmlRpcResult<Result<T, Fault>> {
        let response = self.deserialize_response(input, Some(&T::type_desc()), mapping)?;

        match response.into_result() {
            Ok(value) => T::from_xmlrpc(value.unwrap_or(Value::Nil)).map(Ok),
            Err(fault) => Ok(Err(fault)),
        }
    }
}

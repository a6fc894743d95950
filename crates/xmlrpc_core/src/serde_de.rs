//! Implementation of [serde::de::Deserializer] over a decoded [Value].
//!
//! This bridges untyped decoding into any type deriving
//! [serde::Deserialize]. Struct values map onto structs and maps, arrays
//! onto sequences and `nil` onto `None` or `()`. Date-times are handed to
//! the visitor as `YYYYMMDDTHH:MM:SS` strings and base64 as a byte buffer.

use serde::{
    de::{self, DeserializeOwned, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess},
    forward_to_deserialize_any, Deserializer,
};

use crate::err::{Error, XmlRpcResult};
use crate::value::Value;

const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

/// Deserialize `T` from an already decoded value.
pub fn from_value<T: DeserializeOwned>(value: Value) -> XmlRpcResult<T> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Owns a single [Value] and feeds it to a serde visitor.
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

/// Describe a value for serde's type errors
fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Int(v) => de::Unexpected::Signed((*v).into()),
        Value::Long(v) => de::Unexpected::Signed(*v),
        Value::Double(v) => de::Unexpected::Float(*v),
        Value::Boolean(v) => de::Unexpected::Bool(*v),
        Value::String(v) => de::Unexpected::Str(v),
        Value::DateTime(_) => de::Unexpected::Other("dateTime"),
        Value::Base64(v) => de::Unexpected::Bytes(v),
        Value::Struct(_) => de::Unexpected::Map,
        Value::Array(_) => de::Unexpected::Seq,
        Value::Nil => de::Unexpected::Unit,
    }
}

/// Impl deserialize integer primitives, range checked from `int` or `i8`
macro_rules! deserialize_integer {
    ($fn_name: ident: $data_type: ty => $visitor_fn: ident) => {
        fn $fn_name<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: de::Visitor<'de>,
        {
            let wide = match self.value {
                Value::Int(v) => i64::from(v),
                Value::Long(v) => v,
                other => return Err(de::Error::invalid_type(unexpected(&other), &visitor)),
            };

            match <$data_type>::try_from(wide) {
                Ok(v) => visitor.$visitor_fn(v),
                Err(_) => Err(de::Error::invalid_value(
                    de::Unexpected::Signed(wide),
                    &visitor,
                )),
            }
        }
    };
}

impl<'de> Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Int(v) => visitor.visit_i32(v),
            Value::Long(v) => visitor.visit_i64(v),
            Value::Double(v) => visitor.visit_f64(v),
            Value::Boolean(v) => visitor.visit_bool(v),
            Value::String(v) => visitor.visit_string(v),
            Value::DateTime(v) => visitor.visit_string(v.format(DATETIME_FORMAT).to_string()),
            Value::Base64(v) => visitor.visit_byte_buf(v),
            Value::Struct(members) => visitor.visit_map(MapAccessor {
                members: members.into_iter(),
                pending: None,
            }),
            Value::Array(items) => visitor.visit_seq(SeqAccessor {
                items: items.into_iter(),
            }),
            Value::Nil => visitor.visit_unit(),
        }
    }

    deserialize_integer! {deserialize_i64: i64 => visit_i64}
    deserialize_integer! {deserialize_i32: i32 => visit_i32}
    deserialize_integer! {deserialize_i16: i16 => visit_i16}
    deserialize_integer! {deserialize_i8: i8 => visit_i8}

    deserialize_integer! {deserialize_u64: u64 => visit_u64}
    deserialize_integer! {deserialize_u32: u32 => visit_u32}
    deserialize_integer! {deserialize_u16: u16 => visit_u16}
    deserialize_integer! {deserialize_u8: u8 => visit_u8}

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Double(v) => visitor.visit_f32(v as f32),
            Value::Int(v) => visitor.visit_f32(v as f32),
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Double(v) => visitor.visit_f64(v),
            Value::Int(v) => visitor.visit_f64(v.into()),
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Nil => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        // unit variants are plain strings, data variants a single-member struct
        match self.value {
            Value::String(variant) => visitor.visit_enum(EnumAccessor {
                variant,
                content: None,
            }),
            Value::Struct(members) => {
                let mut members = members.into_iter();
                match (members.next(), members.next()) {
                    (Some((variant, content)), None) => visitor.visit_enum(EnumAccessor {
                        variant,
                        content: Some(content),
                    }),
                    _ => Err(de::Error::custom(
                        "enum struct value must hold exactly one member",
                    )),
                }
            }
            other => Err(de::Error::invalid_type(unexpected(&other), &visitor)),
        }
    }

    forward_to_deserialize_any! {
        bool char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

/// Accessor over the items of an array value.
struct SeqAccessor {
    items: std::vec::IntoIter<Value>,
}

impl<'de> SeqAccess<'de> for SeqAccessor {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some(item) => seed.deserialize(ValueDeserializer::new(item)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Accessor over the members of a struct value.
struct MapAccessor {
    members: std::vec::IntoIter<(String, Value)>,
    // value of the member whose key was just handed out
    pending: Option<Value>,
}

impl<'de> MapAccess<'de> for MapAccessor {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.members.next() {
            Some((name, value)) => {
                self.pending = Some(value);
                let key: de::value::StringDeserializer<Error> = name.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.pending.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(de::Error::custom("struct member value requested before its name")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.members.len())
    }
}

/// Accessor for an enum held by a string or a single-member struct.
struct EnumAccessor {
    variant: String,
    content: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumAccessor {
    type Error = Error;

    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant: de::value::StringDeserializer<Error> = self.variant.clone().into_deserializer();
        let val = seed.deserialize(variant)?;

        Ok((val, self))
    }
}

impl<'de> VariantAccess<'de> for EnumAccessor {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.content {
            None | Some(Value::Nil) => Ok(()),
            Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.content {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(de::Error::invalid_type(
                de::Unexpected::UnitVariant,
                &"newtype variant",
            )),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.content {
            Some(value) => ValueDeserializer::new(value).deserialize_seq(visitor),
            None => Err(de::Error::invalid_type(
                de::Unexpected::UnitVariant,
                &"tuple variant",
            )),
        }
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.content {
            Some(value) => ValueDeserializer::new(value).deserialize_map(visitor),
            None => Err(de::Error::invalid_type(
                de::Unexpected::UnitVariant,
                &"struct variant",
            )),
        }
    }
}

//! Dynamically typed XML-RPC values.

use base64::Engine;
use chrono::NaiveDateTime;

/// Minimum date-time, produced for the empty and all-zeros date-time
/// sentinels when the corresponding dialect options are enabled.
pub const DATETIME_MIN: NaiveDateTime = NaiveDateTime::MIN;

/// Format used when rendering date-times.
const DATETIME_DISPLAY: &str = "%Y%m%dT%H:%M:%S";

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    DateTime(NaiveDateTime),
    Base64(Vec<u8>),
    Struct(Struct),
    Array(Array),
    /// An explicit absent value
    Nil,
}

/// Runtime kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Double,
    Boolean,
    String,
    DateTime,
    Base64,
    Struct,
    Array,
    Nil,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Long => "i8",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::DateTime => "dateTime",
            Self::Base64 => "base64",
            Self::Struct => "struct",
            Self::Array => "array",
            Self::Nil => "nil",
        };

        write!(f, "{}", name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Double(_) => ValueKind::Double,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::String(_) => ValueKind::String,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Base64(_) => ValueKind::Base64,
            Self::Struct(_) => ValueKind::Struct,
            Self::Array(_) => ValueKind::Array,
            Self::Nil => ValueKind::Nil,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Long(i) => Some(*i),
            Self::Int(i) => Some(*i as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, indent: usize) -> std::fmt::Result {
        match self {
            Self::Int(i) => writeln!(f, "int {}", i),
            Self::Long(i) => writeln!(f, "i8 {}", i),
            Self::Double(d) => writeln!(f, "double {}", d),
            Self::Boolean(b) => writeln!(f, "boolean {}", b),
            Self::String(s) => writeln!(f, "string {:?}", s),
            Self::DateTime(dt) => writeln!(f, "dateTime {}", dt.format(DATETIME_DISPLAY)),
            Self::Base64(bytes) => writeln!(
                f,
                "base64 {}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
            Self::Nil => writeln!(f, "nil"),
            Self::Struct(s) => {
                writeln!(f, "struct")?;
                for (name, value) in s.iter() {
                    write!(f, "{:width$}{}: ", "", name, width = indent + 2)?;
                    value.fmt_indented(f, indent + 2)?;
                }
                Ok(())
            }
            Self::Array(a) => {
                match a.kind() {
                    ArrayKind::Homogeneous(kind) => writeln!(f, "array<{}>", kind)?,
                    ArrayKind::Heterogeneous => writeln!(f, "array")?,
                }
                for (idx, value) in a.iter().enumerate() {
                    write!(f, "{:width$}[{}] ", "", idx, width = indent + 2)?;
                    value.fmt_indented(f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

/// Renders the value as an indented tree, one line per scalar.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

macro_rules! value_from {
    ($($ty: ty => $variant: ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    i32 => Int,
    i64 => Long,
    f64 => Double,
    bool => Boolean,
    String => String,
    &str => String,
    NaiveDateTime => DateTime,
    Struct => Struct,
    Array => Array,
}

/// An ordered collection of named members.
///
/// Member names are unique; inserting a name that is already present keeps
/// the first value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Struct {
    members: Vec<(String, Value)>,
}

impl Struct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member, returning `false` if the name was already present.
    pub fn insert<S: Into<String>>(&mut self, name: S, value: Value) -> bool {
        let name = name.into();
        match self.contains(&name) {
            true => false,
            false => {
                self.members.push((name, value));
                true
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Remove a member and return its value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let idx = self.members.iter().position(|(n, _)| n == name)?;
        Some(self.members.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for Struct {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Struct {
    fn from_iter<T: IntoIterator<Item = (S, Value)>>(iter: T) -> Self {
        let mut s = Self::new();
        for (name, value) in iter {
            s.insert(name, value);
        }
        s
    }
}

/// Element typing of an [`Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// Every element has the same kind
    Homogeneous(ValueKind),
    /// Elements of mixed kinds, or no known element kind
    Heterogeneous,
}

/// An ordered sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    kind: ArrayKind,
    items: Vec<Value>,
}

impl Default for Array {
    fn default() -> Self {
        Self {
            kind: ArrayKind::Heterogeneous,
            items: vec![],
        }
    }
}

impl Array {
    /// Build an array with a declared element kind.
    pub fn homogeneous(kind: ValueKind, items: Vec<Value>) -> Self {
        Self {
            kind: ArrayKind::Homogeneous(kind),
            items,
        }
    }

    /// Build an array typed by the runtime kinds of its elements.
    ///
    /// An empty array has no common kind and is heterogeneous.
    pub fn from_items(items: Vec<Value>) -> Self {
        let mut kinds = items.iter().map(Value::kind);
        let kind = match kinds.next() {
            Some(first) if kinds.all(|k| k == first) => ArrayKind::Homogeneous(first),
            _ => ArrayKind::Heterogeneous,
        };

        Self { kind, items }
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

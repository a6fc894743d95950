//! Type and method descriptors.
//!
//! Descriptors tell the deserializer what shape to expect. They are
//! usually generated by `#[derive(XmlRpcStruct)]` and `#[xmlrpc_interface]`,
//! but can be built by hand.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dialect::MappingAction;
use crate::value::ValueKind;

/// Target type of a value.
#[derive(Debug, Clone)]
pub enum TypeDesc {
    /// Anything, decoded without a target
    Any,
    /// No value
    Void,
    Int,
    Long,
    Double,
    Boolean,
    String,
    DateTime,
    Base64,
    /// A struct with known members
    Struct(Arc<StructDesc>),
    /// A struct with arbitrary members
    GenericStruct,
    /// An array with a declared element type
    Array(Box<TypeDesc>),
    /// An array with arbitrary elements
    GenericArray,
    /// A rectangular array of `rank` dimensions
    MultiDimArray { element: Box<TypeDesc>, rank: usize },
    /// A nullable wrapper
    Optional(Box<TypeDesc>),
}

impl TypeDesc {
    pub fn array(element: TypeDesc) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn optional(inner: TypeDesc) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Scalar kinds, which cannot hold nil.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Long
                | Self::Double
                | Self::Boolean
                | Self::String
                | Self::DateTime
                | Self::Base64
        )
    }

    /// Element type of an array target.
    pub fn element(&self) -> Option<&TypeDesc> {
        match self {
            Self::Array(e) => Some(e),
            Self::MultiDimArray { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The wrapped type of an optional, or the type itself.
    pub fn strip_optional(&self) -> &TypeDesc {
        match self {
            Self::Optional(inner) => inner.strip_optional(),
            other => other,
        }
    }

    /// Value kind produced by this type, if it is fixed.
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Any | Self::Void => None,
            Self::Int => Some(ValueKind::Int),
            Self::Long => Some(ValueKind::Long),
            Self::Double => Some(ValueKind::Double),
            Self::Boolean => Some(ValueKind::Boolean),
            Self::String => Some(ValueKind::String),
            Self::DateTime => Some(ValueKind::DateTime),
            Self::Base64 => Some(ValueKind::Base64),
            Self::Struct(_) | Self::GenericStruct => Some(ValueKind::Struct),
            Self::Array(_) | Self::GenericArray | Self::MultiDimArray { .. } => {
                Some(ValueKind::Array)
            }
            Self::Optional(inner) => inner.value_kind(),
        }
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::Void => "void".to_string(),
            Self::Int => "integer".to_string(),
            Self::Long => "i8".to_string(),
            Self::Double => "double".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::String => "string".to_string(),
            Self::DateTime => "dateTime".to_string(),
            Self::Base64 => "base64".to_string(),
            Self::Struct(desc) => desc.name().to_string(),
            Self::GenericStruct => "struct".to_string(),
            Self::Array(e) => format!("{}[]", e.name()),
            Self::GenericArray => "array".to_string(),
            Self::MultiDimArray { element, rank } => {
                format!("{}[{}]", element.name(), ",".repeat(rank.saturating_sub(1)))
            }
            Self::Optional(inner) => format!("{}?", inner.name()),
        }
    }
}

impl From<StructDesc> for TypeDesc {
    fn from(desc: StructDesc) -> Self {
        Self::Struct(Arc::new(desc))
    }
}

/// A member type, possibly resolved on first use.
///
/// Deferred resolution allows a struct to contain itself, e.g. through an
/// optional or an array.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Resolved(TypeDesc),
    Deferred(fn() -> TypeDesc),
}

impl TypeRef {
    pub fn resolve(&self) -> TypeDesc {
        match self {
            Self::Resolved(ty) => ty.clone(),
            Self::Deferred(func) => func(),
        }
    }
}

/// A member of a [`StructDesc`].
#[derive(Debug, Clone)]
pub struct MemberDesc {
    name: String,
    ty: TypeRef,
    wire_name: Option<String>,
    excluded: bool,
    mapping: Option<MappingAction>,
}

impl MemberDesc {
    pub fn new<S: Into<String>>(name: S, ty: TypeDesc) -> Self {
        Self::with_type_ref(name, TypeRef::Resolved(ty))
    }

    /// Member whose type is resolved when it is first deserialized.
    pub fn deferred<S: Into<String>>(name: S, ty: fn() -> TypeDesc) -> Self {
        Self::with_type_ref(name, TypeRef::Deferred(ty))
    }

    fn with_type_ref<S: Into<String>>(name: S, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            wire_name: None,
            excluded: false,
            mapping: None,
        }
    }

    /// Map the member from a different wire name.
    pub fn rename<S: Into<String>>(mut self, wire_name: S) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    /// Exclude the member from wire mapping.
    pub fn exclude(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Override the missing-member policy for this member.
    pub fn mapping(mut self, action: MappingAction) -> Self {
        self.mapping = Some(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_name_override(&self) -> Option<&str> {
        self.wire_name.as_deref()
    }

    /// Name the member is expected under on the wire.
    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }

    pub fn ty(&self) -> TypeDesc {
        self.ty.resolve()
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn mapping_override(&self) -> Option<MappingAction> {
        self.mapping
    }
}

/// Describes the members of a struct type.
#[derive(Debug, Clone)]
pub struct StructDesc {
    name: String,
    members: Vec<MemberDesc>,
    mapping: Option<MappingAction>,
}

impl StructDesc {
    pub fn builder<S: Into<String>>(name: S) -> StructDescBuilder {
        StructDescBuilder {
            desc: Self {
                name: name.into(),
                members: vec![],
                mapping: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[MemberDesc] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberDesc> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Missing-member policy override of the whole type.
    pub fn mapping_override(&self) -> Option<MappingAction> {
        self.mapping
    }

    /// Resolve a wire member name: an explicit rename first, then the
    /// member of the same name.
    pub fn resolve(&self, wire_name: &str) -> Option<&MemberDesc> {
        self.members
            .iter()
            .find(|m| m.wire_name.as_deref() == Some(wire_name))
            .or_else(|| self.member(wire_name))
    }
}

/// Builder for [`StructDesc`].
#[derive(Debug)]
pub struct StructDescBuilder {
    desc: StructDesc,
}

impl StructDescBuilder {
    pub fn member(mut self, member: MemberDesc) -> Self {
        self.desc.members.push(member);
        self
    }

    pub fn mapping(mut self, action: MappingAction) -> Self {
        self.desc.mapping = Some(action);
        self
    }

    pub fn build(self) -> StructDesc {
        self.desc
    }
}

/// A parameter of a [`MethodDesc`].
#[derive(Debug, Clone)]
pub struct ParamDesc {
    pub name: String,
    pub ty: TypeDesc,
    /// Collects every remaining wire parameter. `ty` is then the collection
    /// type.
    pub variadic: bool,
}

impl ParamDesc {
    pub fn new<S: Into<String>>(name: S, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            variadic: false,
        }
    }

    pub fn variadic<S: Into<String>>(name: S, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            variadic: true,
        }
    }
}

/// Signature of a remote method.
#[derive(Debug, Clone)]
pub struct MethodDesc {
    pub name: String,
    pub params: Vec<ParamDesc>,
    pub return_type: TypeDesc,
}

impl MethodDesc {
    pub fn new<S: Into<String>>(name: S, return_type: TypeDesc) -> Self {
        Self {
            name: name.into(),
            params: vec![],
            return_type,
        }
    }

    pub fn param(mut self, param: ParamDesc) -> Self {
        self.params.push(param);
        self
    }

    /// The trailing variadic parameter, if any.
    ///
    /// Only the last parameter may be variadic.
    pub fn variadic(&self) -> Option<&ParamDesc> {
        self.params.last().filter(|p| p.variadic)
    }

    /// Number of positional parameters before the variadic one.
    pub fn fixed_count(&self) -> usize {
        match self.variadic() {
            Some(_) => self.params.len() - 1,
            None => self.params.len(),
        }
    }
}

/// Resolves wire method names to their signatures.
pub trait ServiceDescriptor {
    fn method(&self, name: &str) -> Option<MethodDesc>;
}

/// A name-keyed registry of method signatures.
#[derive(Debug, Clone, Default)]
pub struct Service {
    methods: HashMap<String, MethodDesc>,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: MethodDesc) -> Self {
        self.register(method);
        self
    }

    pub fn register(&mut self, method: MethodDesc) {
        self.methods.insert(method.name.clone(), method);
    }
}

impl ServiceDescriptor for Service {
    fn method(&self, name: &str) -> Option<MethodDesc> {
        self.methods.get(name).cloned()
    }
}

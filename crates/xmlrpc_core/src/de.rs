//! Type-directed value deserialization.
//!
//! The [`Deserializer`] consumes the node sequence produced by the grammar
//! parser and builds [`Value`]s, guided by an optional [`TypeDesc`].

mod compound;
mod scalar;

pub(crate) use compound::{build_array, value_follows};
pub(crate) use scalar::parse_int;

use crate::descriptor::TypeDesc;
use crate::dialect::{MappingAction, NonStandard};
use crate::err::{Error, XmlRpcResult};
use crate::node::{Node, NodeEvent};
use crate::parse_stack::ParseStack;
use crate::parser::NodeSource;
use crate::value::Value;

/// Container nesting accepted by [`Deserializer::default`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Reusable value deserializer.
///
/// Holds the dialect configuration only; every call brings its own node
/// source and parse stack, so one instance can be shared between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deserializer {
    non_standard: NonStandard,
    max_depth: usize,
}

impl Default for Deserializer {
    fn default() -> Self {
        Self::new(NonStandard::default())
    }
}

impl Deserializer {
    pub fn new(non_standard: NonStandard) -> Self {
        Self {
            non_standard,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit the number of structs and arrays a value may be nested in.
    ///
    /// A value nested deeper fails as unsupported.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn non_standard(&self) -> NonStandard {
        self.non_standard
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Deserialize the value subtree starting at the next node of `source`.
    ///
    /// With no target, or an [`TypeDesc::Any`] target, the value is decoded
    /// as whatever the wire says it is.
    pub fn deserialize<S: NodeSource>(
        &self,
        source: &mut S,
        target: Option<&TypeDesc>,
        stack: &mut ParseStack,
        mapping: MappingAction,
    ) -> XmlRpcResult<Value> {
        let event = match next_event(source, stack)? {
            Some(event) if event.node.is_value() => event,
            Some(event) => {
                return Err(stack.invalid(format!(
                    "unexpected {} where a value was expected",
                    event.node.describe()
                )))
            }
            None => {
                return Err(Error::ill_formed("node sequence ended where a value was expected")
                    .with_trail(&stack.render()))
            }
        };

        // a fully generic target carries no information
        let target = target.filter(|t| !matches!(t, TypeDesc::Any));

        if let Node::String { implicit: true, .. } = &event.node {
            check_implicit_string(target, stack)?;
        }

        let NodeEvent { node, depth } = event;
        if matches!(node, Node::StructStart | Node::ArrayStart) && depth >= self.max_depth {
            return Err(stack.unsupported(format!(
                "{} nested deeper than {} containers",
                node.describe(),
                self.max_depth
            )));
        }

        match node {
            Node::StructStart => self.deserialize_struct(source, depth, target, stack, mapping),
            Node::ArrayStart => self.deserialize_array(source, depth, target, stack, mapping),
            Node::Nil => deserialize_nil(target, stack),
            scalar => self.deserialize_scalar(scalar, target, stack),
        }
    }
}

/// Pull the next node, attaching the current trail to parser errors.
pub(crate) fn next_event<S: NodeSource>(
    source: &mut S,
    stack: &ParseStack,
) -> XmlRpcResult<Option<NodeEvent>> {
    source.next_node().map_err(|e| e.with_trail(&stack.render()))
}

/// Peek the next node, attaching the current trail to parser errors.
pub(crate) fn peek_event<'s, S: NodeSource>(
    source: &'s mut S,
    stack: &ParseStack,
) -> XmlRpcResult<Option<&'s NodeEvent>> {
    source.peek_node().map_err(|e| e.with_trail(&stack.render()))
}

/// An implicit string only satisfies a string or untyped target.
fn check_implicit_string(target: Option<&TypeDesc>, stack: &ParseStack) -> XmlRpcResult<()> {
    match target.map(TypeDesc::strip_optional) {
        None | Some(TypeDesc::String) => Ok(()),
        Some(other) => Err(stack.mismatch(format!(
            "implicit string value where {} expected",
            other.name()
        ))),
    }
}

/// Nil maps onto anything that can be absent.
fn deserialize_nil(target: Option<&TypeDesc>, stack: &ParseStack) -> XmlRpcResult<Value> {
    match target {
        Some(t) if t.is_primitive() => {
            Err(stack.unsupported(format!("nil value where {} expected", t.name())))
        }
        _ => Ok(Value::Nil),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::TokenCursor;
    use crate::descriptor::{MemberDesc, StructDesc};
    use crate::dialect::NonStandardOption;
    use crate::parser::{Parser, Replay};
    use crate::value::{ArrayKind, Struct, ValueKind};

    /// Deserialize a standalone `<value>` document.
    fn decode_with(
        de: &Deserializer,
        input: &str,
        target: Option<&TypeDesc>,
        mapping: MappingAction,
    ) -> XmlRpcResult<Value> {
        let mut parser = Parser::value(TokenCursor::new(input.as_bytes()));
        let mut stack = ParseStack::new("response");
        de.deserialize(&mut parser, target, &mut stack, mapping)
    }

    fn decode(input: &str, target: Option<&TypeDesc>) -> XmlRpcResult<Value> {
        decode_with(&Deserializer::default(), input, target, MappingAction::Strict)
    }

    fn point_desc() -> TypeDesc {
        StructDesc::builder("Point")
            .member(MemberDesc::new("x", TypeDesc::Int))
            .member(MemberDesc::new("y", TypeDesc::Int).rename("Y"))
            .build()
            .into()
    }

    #[test]
    fn test_untyped_scalars() {
        assert_eq!(decode("<value><i4>-12</i4></value>", None), Ok(Value::Int(-12)));
        assert_eq!(
            decode("<value><i8>9000000000</i8></value>", None),
            Ok(Value::Long(9_000_000_000))
        );
        assert_eq!(
            decode("<value><double>-1.5e3</double></value>", None),
            Ok(Value::Double(-1500.0))
        );
        assert_eq!(
            decode("<value><boolean>0</boolean></value>", None),
            Ok(Value::Boolean(false))
        );
        assert_eq!(decode("<value>text</value>", None), Ok(Value::from("text")));
        assert_eq!(decode("<value/>", None), Ok(Value::from("")));
        assert_eq!(
            decode("<value><base64>aGVsbG8=</base64></value>", None),
            Ok(Value::Base64(b"hello".to_vec()))
        );
        assert_eq!(
            decode("<value><base64></base64></value>", None),
            Ok(Value::Base64(vec![]))
        );
        assert_eq!(decode("<value><nil/></value>", None), Ok(Value::Nil));
    }

    #[test]
    fn test_invalid_int_message() {
        let err = decode("<value><int>12a</int></value>", None).unwrap_err();

        assert_eq!(
            err,
            Error::InvalidXmlRpc {
                message: "response contains invalid int value".to_string(),
                trail: "[response : integer]".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_scalars() {
        for input in [
            "<value><int>+1</int></value>",
            "<value><int> 1</int></value>",
            "<value><int>99999999999</int></value>",
            "<value><boolean>true</boolean></value>",
            "<value><double>1,5</double></value>",
            "<value><double>inf</double></value>",
            "<value><base64>aGVsbG8</base64></value>",
            "<value><dateTime.iso8601>yesterday</dateTime.iso8601></value>",
        ] {
            assert!(
                matches!(decode(input, None), Err(Error::InvalidXmlRpc { .. })),
                "{} should be invalid",
                input
            );
        }
    }

    #[test]
    fn test_scalar_type_mismatch() {
        let err = decode("<value><int>1</int></value>", Some(&TypeDesc::String)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = decode("<value>1</value>", Some(&TypeDesc::Int)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: response contains implicit string value where integer expected [response]"
        );

        // optional targets accept the inner type
        assert_eq!(
            decode(
                "<value><int>1</int></value>",
                Some(&TypeDesc::optional(TypeDesc::Int))
            ),
            Ok(Value::Int(1))
        );
        assert_eq!(
            decode("<value>a</value>", Some(&TypeDesc::Any)),
            Ok(Value::from("a"))
        );
    }

    #[test]
    fn test_nil_targets() {
        let err = decode("<value><nil/></value>", Some(&TypeDesc::Int)).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));

        for target in [
            TypeDesc::optional(TypeDesc::Int),
            point_desc(),
            TypeDesc::GenericArray,
        ] {
            assert_eq!(decode("<value><nil/></value>", Some(&target)), Ok(Value::Nil));
        }
    }

    #[test]
    fn test_typed_struct_ignores_unknown_members() {
        let input = "<value><struct>
            <member><name>x</name><value><int>1</int></value></member>
            <member><name>Y</name><value><int>2</int></value></member>
            <member><name>z</name><value><array><data><value>skipped</value></data></array></value></member>
        </struct></value>";

        let value = decode(input, Some(&point_desc())).unwrap();
        let expected: Struct = [("x", Value::Int(1)), ("y", Value::Int(2))]
            .into_iter()
            .collect();
        assert_eq!(value, Value::Struct(expected));
    }

    #[test]
    fn test_missing_members() {
        let input = "<value><struct>
            <member><name>x</name><value><int>1</int></value></member>
        </struct></value>";

        let err = decode(input, Some(&point_desc())).unwrap_err();
        assert_eq!(
            err,
            Error::MissingMembers {
                members: vec!["y".to_string()],
                trail: "[response : struct mapped to type Point]".to_string(),
            }
        );

        let lenient = decode_with(
            &Deserializer::default(),
            input,
            Some(&point_desc()),
            MappingAction::Lenient,
        );
        assert!(lenient.is_ok());
    }

    #[test]
    fn test_mapping_overrides() {
        let member_lenient: TypeDesc = StructDesc::builder("Opt")
            .member(MemberDesc::new("a", TypeDesc::Int))
            .member(MemberDesc::new("c", TypeDesc::Int).mapping(MappingAction::Lenient))
            .build()
            .into();
        let input = "<value><struct><member><name>a</name><value><int>1</int></value></member></struct></value>";
        assert!(decode(input, Some(&member_lenient)).is_ok());

        // a lenient call is overridden by a strict type
        let type_strict: TypeDesc = StructDesc::builder("Strict")
            .member(MemberDesc::new("c", TypeDesc::Int))
            .mapping(MappingAction::Strict)
            .build()
            .into();
        let err = decode_with(
            &Deserializer::default(),
            input,
            Some(&type_strict),
            MappingAction::Lenient,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingMembers { .. }));
    }

    #[test]
    fn test_duplicate_members() {
        let input = "<value><struct>
            <member><name>a</name><value><int>1</int></value></member>
            <member><name>a</name><value><int>2</int></value></member>
        </struct></value>";

        let err = decode(input, None).unwrap_err();
        assert!(matches!(err, Error::InvalidXmlRpc { .. }));
        assert!(err.to_string().contains("duplicate member a"));

        let tolerant = Deserializer::new(
            NonStandard::none().with(NonStandardOption::IgnoreDuplicateMembers),
        );
        let value = decode_with(&tolerant, input, None, MappingAction::Strict).unwrap();
        let expected: Struct = [("a", Value::Int(1))].into_iter().collect();
        assert_eq!(value, Value::Struct(expected));
    }

    #[test]
    fn test_excluded_member() {
        let desc: TypeDesc = StructDesc::builder("Cache")
            .member(MemberDesc::new("hits", TypeDesc::Int).exclude())
            .build()
            .into();
        let input = "<value><struct><member><name>hits</name><value><int>1</int></value></member></struct></value>";

        let err = decode(input, Some(&desc)).unwrap_err();
        assert_eq!(
            err,
            Error::NonSerializedMember {
                member: "hits".to_string(),
                trail: "[response : struct mapped to type Cache : member hits]".to_string(),
            }
        );
    }

    #[test]
    fn test_nested_struct_member_trail() {
        let outer: TypeDesc = StructDesc::builder("Line")
            .member(MemberDesc::new("start", point_desc()))
            .build()
            .into();
        let input = "<value><struct><member><name>start</name><value><struct>
            <member><name>x</name><value><int>x</int></value></member>
        </struct></value></member></struct></value>";

        let err = decode(input, Some(&outer)).unwrap_err();
        assert_eq!(
            err.trail(),
            Some(
                "[response : struct mapped to type Line : member start mapped to type Point : struct mapped to type Point : member x mapped to type integer : integer]"
            )
        );
    }

    #[test]
    fn test_struct_where_scalar_expected() {
        let err = decode("<value><struct/></value>", Some(&TypeDesc::Int)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = decode("<value><array><data/></array></value>", Some(&point_desc())).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_untyped_arrays() {
        let ints = decode(
            "<value><array><data><value><int>1</int></value><value><int>2</int></value><value><int>3</int></value></data></array></value>",
            None,
        )
        .unwrap();
        let ints = ints.as_array().unwrap();
        assert_eq!(ints.kind(), ArrayKind::Homogeneous(ValueKind::Int));
        assert_eq!(ints.len(), 3);

        let mixed = decode(
            "<value><array><data><value><int>1</int></value><value>x</value></data></array></value>",
            None,
        )
        .unwrap();
        assert_eq!(mixed.as_array().unwrap().kind(), ArrayKind::Heterogeneous);
    }

    #[test]
    fn test_typed_array() {
        let target = TypeDesc::array(TypeDesc::Long);
        let value = decode(
            "<value><array><data><value><i8>1</i8></value></data></array></value>",
            Some(&target),
        )
        .unwrap();
        assert_eq!(
            value.as_array().unwrap().kind(),
            ArrayKind::Homogeneous(ValueKind::Long)
        );

        let err = decode(
            "<value><array><data><value><i8>1</i8></value><value><int>2</int></value></data></array></value>",
            Some(&target),
        )
        .unwrap_err();
        assert_eq!(err.trail(), Some("[response : array mapped to type i8[] : element 1]"));
    }

    #[test]
    fn test_multi_dim_array_unsupported() {
        let target = TypeDesc::MultiDimArray {
            element: Box::new(TypeDesc::Int),
            rank: 2,
        };
        let err = decode("<value><array><data/></array></value>", Some(&target)).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn test_nested_containers_end_correctly() {
        let input = "<value><array><data>
            <value><struct>
                <member><name>inner</name><value><array><data><value><int>1</int></value></data></array></value></member>
            </struct></value>
            <value><int>2</int></value>
        </data></array></value>";

        let value = decode(input, None).unwrap();
        let items = value.as_array().unwrap().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Value::Int(2));
        assert_eq!(
            items[0].as_struct().unwrap().get("inner").unwrap().as_array().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_array_without_data_is_empty() {
        for input in ["<value><array/></value>", "<value><array></array></value>"] {
            let value = decode(input, None).unwrap();
            let array = value.as_array().unwrap();
            assert!(array.is_empty());
            assert_eq!(array.kind(), ArrayKind::Heterogeneous);
        }

        let target = TypeDesc::array(TypeDesc::Int);
        let value = decode("<value><array/></value>", Some(&target)).unwrap();
        assert_eq!(
            value.as_array().unwrap().kind(),
            ArrayKind::Homogeneous(ValueKind::Int)
        );
    }

    fn nested_arrays(levels: usize) -> String {
        format!(
            "<value>{}<int>1</int>{}</value>",
            "<array><data><value>".repeat(levels),
            "</value></data></array>".repeat(levels)
        )
    }

    #[test]
    fn test_nesting_limit() {
        let de = Deserializer::default().with_max_depth(2);

        let value = decode_with(&de, &nested_arrays(2), None, MappingAction::Strict).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);

        let err = decode_with(&de, &nested_arrays(3), None, MappingAction::Strict).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
        assert_eq!(
            err.trail(),
            Some("[response : array : element 0 : array : element 0]")
        );
    }

    #[test]
    fn test_deep_nesting_fails_without_overflow() {
        assert_eq!(Deserializer::default().max_depth(), DEFAULT_MAX_DEPTH);

        let ok = decode(&nested_arrays(DEFAULT_MAX_DEPTH), None);
        assert!(ok.is_ok());

        let err = decode(&nested_arrays(2000), None).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));

        let structs = format!(
            "<value>{}{}</value>",
            "<struct><member><name>a</name><value>".repeat(DEFAULT_MAX_DEPTH + 1),
            "</value></member></struct>".repeat(DEFAULT_MAX_DEPTH + 1)
        );
        let err = decode(&structs, None).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn test_optional_element_array_kind() {
        let target = TypeDesc::array(TypeDesc::optional(TypeDesc::Int));

        let with_nil = decode(
            "<value><array><data><value><nil/></value><value><int>1</int></value></data></array></value>",
            Some(&target),
        )
        .unwrap();
        assert_eq!(with_nil.as_array().unwrap().kind(), ArrayKind::Heterogeneous);

        let ints = decode(
            "<value><array><data><value><int>1</int></value><value><int>2</int></value></data></array></value>",
            Some(&target),
        )
        .unwrap();
        assert_eq!(
            ints.as_array().unwrap().kind(),
            ArrayKind::Homogeneous(ValueKind::Int)
        );
    }

    #[test]
    fn test_member_under_two_wire_names_keeps_first() {
        let input = "<value><struct>
            <member><name>x</name><value><int>0</int></value></member>
            <member><name>Y</name><value><int>1</int></value></member>
            <member><name>y</name><value><int>2</int></value></member>
        </struct></value>";

        let value = decode(input, Some(&point_desc())).unwrap();
        let point = value.as_struct().unwrap();
        assert_eq!(point.len(), 2);
        assert_eq!(point.get("y"), Some(&Value::Int(1)));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_deserializer_is_send_sync() {
        assert_send_sync::<Deserializer>();
    }

    #[test]
    fn test_same_nodes_same_result() {
        let input = "<value><struct>
            <member><name>x</name><value><int>1</int></value></member>
            <member><name>Y</name><value><int>2</int></value></member>
        </struct></value>";
        let mut parser = Parser::value(TokenCursor::new(input.as_bytes()));
        let mut replay = Replay::record(&mut parser).unwrap();
        let de = Deserializer::default();

        let first = de
            .deserialize(
                &mut replay,
                Some(&point_desc()),
                &mut ParseStack::new("response"),
                MappingAction::Strict,
            )
            .unwrap();
        replay.rewind();
        let second = de
            .deserialize(
                &mut replay,
                Some(&point_desc()),
                &mut ParseStack::new("response"),
                MappingAction::Strict,
            )
            .unwrap();

        assert_eq!(first, second);
    }
}

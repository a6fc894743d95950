//! Struct and array deserialization.

use std::collections::HashSet;

use super::{next_event, peek_event, Deserializer};
use crate::descriptor::{MemberDesc, StructDesc, TypeDesc};
use crate::dialect::MappingAction;
use crate::err::{Error, XmlRpcResult};
use crate::node::Node;
use crate::parse_stack::ParseStack;
use crate::parser::NodeSource;
use crate::value::{Array, Struct, Value};

impl Deserializer {
    /// Deserialize the members of a struct opened at container `depth`.
    pub(super) fn deserialize_struct<S: NodeSource>(
        &self,
        source: &mut S,
        depth: usize,
        target: Option<&TypeDesc>,
        stack: &mut ParseStack,
        mapping: MappingAction,
    ) -> XmlRpcResult<Value> {
        match target.map(TypeDesc::strip_optional) {
            None | Some(TypeDesc::GenericStruct) => {
                stack.scoped("struct mapped to generic struct", |stack| {
                    self.generic_struct(source, depth, stack, mapping)
                })
            }
            Some(TypeDesc::Struct(desc)) => {
                // the type's own policy only governs its own missing members
                let local = desc.mapping_override().unwrap_or(mapping);
                stack.scoped(format!("struct mapped to type {}", desc.name()), |stack| {
                    self.typed_struct(source, depth, desc, stack, mapping, local)
                })
            }
            Some(other) => Err(stack.mismatch(format!(
                "struct value where {} expected",
                other.name()
            ))),
        }
    }

    fn generic_struct<S: NodeSource>(
        &self,
        source: &mut S,
        depth: usize,
        stack: &mut ParseStack,
        mapping: MappingAction,
    ) -> XmlRpcResult<Value> {
        let mut members = Struct::new();
        let mut seen = HashSet::new();

        while let Some(name) = next_member(source, depth, stack)? {
            let first = self.check_duplicate(&mut seen, &name, stack)?;
            if !value_follows(source, depth + 1, stack)? {
                log::debug!("struct member {} has no recognised value", name);
                continue;
            }

            let value = stack.scoped(format!("member {}", name), |stack| {
                self.deserialize(source, None, stack, mapping)
            })?;

            if first {
                members.insert(name, value);
            }
        }

        Ok(Value::Struct(members))
    }

    fn typed_struct<S: NodeSource>(
        &self,
        source: &mut S,
        depth: usize,
        desc: &StructDesc,
        stack: &mut ParseStack,
        mapping: MappingAction,
        local: MappingAction,
    ) -> XmlRpcResult<Value> {
        let mut unsatisfied = desc
            .members()
            .iter()
            .filter(|m| !m.is_excluded())
            .collect::<Vec<_>>();
        let mut members = Struct::new();
        let mut seen = HashSet::new();

        while let Some(wire_name) = next_member(source, depth, stack)? {
            let first = self.check_duplicate(&mut seen, &wire_name, stack)?;
            if !value_follows(source, depth + 1, stack)? {
                log::debug!("struct member {} has no recognised value", wire_name);
                continue;
            }

            let member = match (first, desc.resolve(&wire_name)) {
                (true, Some(member)) => member,
                (_, resolved) => {
                    if resolved.is_none() {
                        log::debug!(
                            "discarding member {} unknown to type {}",
                            wire_name,
                            desc.name()
                        );
                    }
                    stack.scoped(format!("member {}", wire_name), |stack| {
                        self.deserialize(source, None, stack, mapping)
                    })?;
                    continue;
                }
            };

            if member.is_excluded() {
                return stack.scoped(format!("member {}", member.name()), |stack| {
                    Err(Error::NonSerializedMember {
                        member: member.name().to_string(),
                        trail: stack.render(),
                    })
                });
            }

            unsatisfied.retain(|m| m.name() != member.name());

            let ty = member.ty();
            let frame = format!("member {} mapped to type {}", member.name(), ty.name());
            let value = stack.scoped(frame, |stack| {
                self.deserialize(source, Some(&ty), stack, mapping)
            })?;
            if !members.insert(member.name(), value) {
                log::debug!(
                    "ignoring member {} of type {}, already set under another name",
                    wire_name,
                    desc.name()
                );
            }
        }

        if local == MappingAction::Strict {
            report_missing(&unsatisfied, stack)?;
        }

        Ok(Value::Struct(members))
    }

    /// Record a wire member name. Returns `false` for a tolerated repeat.
    fn check_duplicate(
        &self,
        seen: &mut HashSet<String>,
        name: &str,
        stack: &ParseStack,
    ) -> XmlRpcResult<bool> {
        if seen.insert(name.to_owned()) {
            return Ok(true);
        }

        match self.non_standard.ignore_duplicate_members {
            true => {
                log::debug!("ignoring duplicate struct member {}", name);
                Ok(false)
            }
            false => Err(stack.invalid(format!("struct value with duplicate member {}", name))),
        }
    }

    /// Deserialize the elements of an array opened at container `depth`.
    pub(super) fn deserialize_array<S: NodeSource>(
        &self,
        source: &mut S,
        depth: usize,
        target: Option<&TypeDesc>,
        stack: &mut ParseStack,
        mapping: MappingAction,
    ) -> XmlRpcResult<Value> {
        let target = target.map(TypeDesc::strip_optional);
        let target_name = target.map(TypeDesc::name).unwrap_or_default();

        let (frame, element) = match target {
            None | Some(TypeDesc::GenericArray) => ("array".to_string(), None),
            Some(TypeDesc::Array(element)) => (
                format!("array mapped to type {}", target_name),
                Some(element.as_ref()),
            ),
            Some(TypeDesc::MultiDimArray { .. }) => {
                return stack.scoped(format!("array mapped to type {}", target_name), |stack| {
                    Err(stack.unsupported("multi-dimensional arrays are not supported"))
                })
            }
            Some(_) => {
                return Err(stack.mismatch(format!(
                    "array value where {} expected",
                    target_name
                )))
            }
        };

        stack.scoped(frame, |stack| {
            let mut items = vec![];
            while value_follows(source, depth + 1, stack)? {
                let value = stack.scoped(format!("element {}", items.len()), |stack| {
                    self.deserialize(source, element, stack, mapping)
                })?;
                items.push(value);
            }

            Ok(Value::Array(build_array(element, items)))
        })
    }
}

/// Type an array by its declared element type, or by the runtime kinds of
/// its items when the element type is absent, generic or optional.
///
/// Optional elements may be nil, so their declared kind does not hold for
/// every item.
pub(crate) fn build_array(element: Option<&TypeDesc>, items: Vec<Value>) -> Array {
    match element {
        Some(TypeDesc::Optional(_)) | None => Array::from_items(items),
        Some(element) => match element.value_kind() {
            Some(kind) => Array::homogeneous(kind, items),
            None => Array::from_items(items),
        },
    }
}

/// Consume the next member name of the struct at container `depth`.
///
/// Returns `None` once the struct has ended.
fn next_member<S: NodeSource>(
    source: &mut S,
    depth: usize,
    stack: &ParseStack,
) -> XmlRpcResult<Option<String>> {
    let is_member = matches!(
        peek_event(source, stack)?,
        Some(event) if event.depth == depth + 1 && matches!(event.node, Node::StructMember(_))
    );
    if !is_member {
        return Ok(None);
    }

    match next_event(source, stack)? {
        Some(event) => match event.node {
            Node::StructMember(name) => Ok(Some(name)),
            _ => Ok(None),
        },
        None => Ok(None),
    }
}

/// Returns `true` if the next node starts a value at container `depth`.
pub(crate) fn value_follows<S: NodeSource>(
    source: &mut S,
    depth: usize,
    stack: &ParseStack,
) -> XmlRpcResult<bool> {
    Ok(matches!(
        peek_event(source, stack)?,
        Some(event) if event.depth == depth && event.node.is_value()
    ))
}

/// Fail with every unsatisfied member that is not itself lenient.
fn report_missing(unsatisfied: &[&MemberDesc], stack: &ParseStack) -> XmlRpcResult<()> {
    let missing = unsatisfied
        .iter()
        .filter(|m| m.mapping_override().unwrap_or_default() == MappingAction::Strict)
        .map(|m| m.name().to_string())
        .collect::<Vec<_>>();

    match missing.is_empty() {
        true => Ok(()),
        false => Err(Error::MissingMembers {
            members: missing,
            trail: stack.render(),
        }),
    }
}

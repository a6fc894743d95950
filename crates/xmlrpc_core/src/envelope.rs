//! Request and response assembly.

use crate::consts;
use crate::cursor::TokenCursor;
use crate::de::{build_array, next_event, parse_int, peek_event, value_follows, Deserializer};
use crate::descriptor::{MemberDesc, MethodDesc, ServiceDescriptor, StructDesc, TypeDesc};
use crate::dialect::MappingAction;
use crate::err::{Error, XmlRpcResult};
use crate::node::{Node, NodeEvent};
use crate::parse_stack::ParseStack;
use crate::parser::{NodeSource, Parser};
use crate::value::Value;

/// A decoded method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method_name: String,
    /// Positional arguments. A variadic parameter is collected into a
    /// single trailing array.
    pub args: Vec<Value>,
}

/// A fault reported by the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fault {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Fault {}

/// A decoded method response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The method returned, possibly without a value
    Return(Option<Value>),
    Fault(Fault),
}

impl Response {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    pub fn into_result(self) -> Result<Option<Value>, Fault> {
        match self {
            Self::Return(value) => Ok(value),
            Self::Fault(fault) => Err(fault),
        }
    }
}

impl Deserializer {
    /// Create the token cursor for a raw document.
    fn cursor<'a>(&self, input: &'a [u8]) -> XmlRpcResult<TokenCursor<'a>> {
        match self.non_standard().allow_invalid_http_content {
            true => TokenCursor::skipping_leading_junk(input),
            false => Ok(TokenCursor::new(input)),
        }
    }

    /// Decode a `methodCall` document.
    ///
    /// With a service, the method must be known to it and the parameters
    /// are checked against its signature.
    pub fn deserialize_request(
        &self,
        input: &[u8],
        service: Option<&dyn ServiceDescriptor>,
        mapping: MappingAction,
    ) -> XmlRpcResult<Request> {
        let mut parser = Parser::request(self.cursor(input)?);
        self.deserialize_request_nodes(&mut parser, service, mapping)
    }

    /// Decode a `methodResponse` document.
    ///
    /// A fault is returned as [`Response::Fault`], whatever the return type.
    pub fn deserialize_response(
        &self,
        input: &[u8],
        return_type: Option<&TypeDesc>,
        mapping: MappingAction,
    ) -> XmlRpcResult<Response> {
        let mut parser = Parser::response(self.cursor(input)?);
        self.deserialize_response_nodes(&mut parser, return_type, mapping)
    }

    /// Decode a document made of a single `value` element.
    pub fn deserialize_value_document(
        &self,
        input: &[u8],
        target: Option<&TypeDesc>,
        mapping: MappingAction,
    ) -> XmlRpcResult<Value> {
        let mut parser = Parser::value(self.cursor(input)?);
        let mut stack = ParseStack::new("value");
        self.deserialize(&mut parser, target, &mut stack, mapping)
    }

    /// Assemble a request from a node sequence.
    pub fn deserialize_request_nodes<S: NodeSource>(
        &self,
        source: &mut S,
        service: Option<&dyn ServiceDescriptor>,
        mapping: MappingAction,
    ) -> XmlRpcResult<Request> {
        let mut stack = ParseStack::new("request");

        let method_name = match next_event(source, &stack)? {
            Some(NodeEvent {
                node: Node::MethodName(name),
                ..
            }) => name,
            _ => {
                return Err(Error::ill_formed("request does not start with a method name")
                    .with_trail(&stack.render()))
            }
        };
        if method_name.is_empty() {
            return Err(stack.invalid("empty method name"));
        }
        log::debug!("deserializing request for {}", method_name);

        let method = match service {
            Some(svc) => Some(svc.method(&method_name).ok_or_else(|| {
                Error::UnsupportedMethod {
                    method: method_name.clone(),
                }
            })?),
            None => None,
        };

        let has_params = matches!(
            peek_event(source, &stack)?,
            Some(NodeEvent {
                node: Node::Params,
                ..
            })
        );
        let args = match has_params {
            true => {
                next_event(source, &stack)?;
                self.bind_params(source, method.as_ref(), &mut stack, mapping)?
            }
            false => match &method {
                Some(m) if m.fixed_count() > 0 => {
                    return Err(Error::InvalidParameters {
                        message: "method takes parameters and params element is missing"
                            .to_string(),
                    })
                }
                Some(m) => match m.variadic() {
                    Some(p) => vec![Value::Array(build_array(p.ty.element(), vec![]))],
                    None => vec![],
                },
                None => vec![],
            },
        };

        log::debug!("request for {} has {} arguments", method_name, args.len());
        Ok(Request { method_name, args })
    }

    /// Bind the parameter values against a signature, if there is one.
    fn bind_params<S: NodeSource>(
        &self,
        source: &mut S,
        method: Option<&MethodDesc>,
        stack: &mut ParseStack,
        mapping: MappingAction,
    ) -> XmlRpcResult<Vec<Value>> {
        let fixed = method.map(MethodDesc::fixed_count);
        let variadic = method.and_then(MethodDesc::variadic);
        let variadic_element = variadic.and_then(|p| p.ty.element());

        let mut args = vec![];
        let mut extra = vec![];
        let mut count = 0;

        while value_follows(source, 0, stack)? {
            count += 1;
            let frame = format!("parameter {}", count);

            match (method, fixed) {
                (Some(m), Some(fixed)) if count <= fixed => {
                    let ty = &m.params[count - 1].ty;
                    args.push(stack.scoped(frame, |stack| {
                        self.deserialize(source, Some(ty), stack, mapping)
                    })?);
                }
                (Some(_), _) => {
                    if variadic.is_none() {
                        return Err(Error::InvalidParameters {
                            message:
                                "request contains too many param elements based on method signature"
                                    .to_string(),
                        });
                    }
                    extra.push(stack.scoped(frame, |stack| {
                        self.deserialize(source, variadic_element, stack, mapping)
                    })?);
                }
                (None, _) => {
                    args.push(stack.scoped(frame, |stack| {
                        self.deserialize(source, None, stack, mapping)
                    })?);
                }
            }
        }

        if let Some(fixed) = fixed {
            if count < fixed {
                return Err(Error::InvalidParameters {
                    message: "request contains too few param elements based on method signature"
                        .to_string(),
                });
            }
        }
        if variadic.is_some() {
            args.push(Value::Array(build_array(variadic_element, extra)));
        }

        Ok(args)
    }

    /// Assemble a response from a node sequence.
    pub fn deserialize_response_nodes<S: NodeSource>(
        &self,
        source: &mut S,
        return_type: Option<&TypeDesc>,
        mapping: MappingAction,
    ) -> XmlRpcResult<Response> {
        let mut stack = ParseStack::new("response");

        match next_event(source, &stack)? {
            Some(NodeEvent {
                node: Node::Response,
                ..
            }) => (),
            _ => {
                return Err(Error::ill_formed("node sequence is not a response")
                    .with_trail(&stack.render()))
            }
        }

        let is_fault = matches!(
            peek_event(source, &stack)?,
            Some(NodeEvent {
                node: Node::Fault,
                ..
            })
        );
        if is_fault {
            next_event(source, &stack)?;
            let fault = self.deserialize_fault(source)?;
            log::debug!("response is a fault: {}", fault);
            return Ok(Response::Fault(fault));
        }

        if matches!(return_type, Some(TypeDesc::Void)) || !value_follows(source, 0, &stack)? {
            log::debug!("response carries no value");
            return Ok(Response::Return(None));
        }

        let value = self.deserialize(source, return_type, &mut stack, mapping)?;
        Ok(Response::Return(Some(value)))
    }

    /// Decode the value of a `fault` element.
    fn deserialize_fault<S: NodeSource>(&self, source: &mut S) -> XmlRpcResult<Fault> {
        let mut stack = ParseStack::new("fault response");

        let code_type = match self.non_standard().allow_string_fault_code {
            true => TypeDesc::Any,
            false => TypeDesc::Int,
        };
        let shape: TypeDesc = StructDesc::builder("Fault")
            .member(MemberDesc::new(consts::FAULT_CODE, code_type))
            .member(MemberDesc::new(consts::FAULT_STRING, TypeDesc::String))
            .build()
            .into();

        let mut members = match self.deserialize(
            source,
            Some(&shape),
            &mut stack,
            MappingAction::Strict,
        )? {
            Value::Struct(members) => members,
            _ => return Err(stack.invalid("fault value that is not a struct")),
        };

        let code = match members.take(consts::FAULT_CODE) {
            Some(Value::Int(code)) => code,
            Some(Value::String(text)) => {
                parse_int(&text).ok_or_else(|| stack.invalid("faultCode that is not an int"))?
            }
            _ => return Err(stack.invalid("faultCode that is not an int or string")),
        };
        let message = match members.take(consts::FAULT_STRING) {
            Some(Value::String(message)) => message,
            _ => return Err(stack.invalid("faultString that is not a string")),
        };

        Ok(Fault { code, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamDesc, Service};
    use crate::dialect::{NonStandard, NonStandardOption};
    use crate::value::{ArrayKind, ValueKind};

    fn request(params: &[&str]) -> String {
        let params = params
            .iter()
            .map(|p| format!("<param><value>{}</value></param>", p))
            .collect::<String>();

        format!(
            "<?xml version=\"1.0\"?><methodCall><methodName>calc</methodName><params>{}</params></methodCall>",
            params
        )
    }

    fn fixed_service() -> Service {
        Service::new().with_method(
            MethodDesc::new("calc", TypeDesc::Int)
                .param(ParamDesc::new("a", TypeDesc::Int))
                .param(ParamDesc::new("b", TypeDesc::Int)),
        )
    }

    fn variadic_service() -> Service {
        Service::new().with_method(
            MethodDesc::new("calc", TypeDesc::Int)
                .param(ParamDesc::new("a", TypeDesc::Int))
                .param(ParamDesc::new("b", TypeDesc::String))
                .param(ParamDesc::variadic("rest", TypeDesc::array(TypeDesc::Int))),
        )
    }

    fn decode_request(
        input: &str,
        service: Option<&dyn ServiceDescriptor>,
    ) -> XmlRpcResult<Request> {
        Deserializer::default().deserialize_request(input.as_bytes(), service, MappingAction::Strict)
    }

    fn decode_response(input: &str, return_type: Option<&TypeDesc>) -> XmlRpcResult<Response> {
        Deserializer::default().deserialize_response(
            input.as_bytes(),
            return_type,
            MappingAction::Strict,
        )
    }

    #[test]
    fn test_untyped_request() {
        let req = decode_request(&request(&["<int>1</int>", "x", "<boolean>1</boolean>"]), None)
            .unwrap();

        assert_eq!(req.method_name, "calc");
        assert_eq!(
            req.args,
            vec![Value::Int(1), Value::from("x"), Value::Boolean(true)]
        );
    }

    #[test]
    fn test_arity() {
        let svc = fixed_service();

        let ok = decode_request(&request(&["<int>1</int>", "<int>2</int>"]), Some(&svc));
        assert_eq!(ok.unwrap().args, vec![Value::Int(1), Value::Int(2)]);

        let too_many = decode_request(
            &request(&["<int>1</int>", "<int>2</int>", "<int>3</int>"]),
            Some(&svc),
        );
        assert!(matches!(too_many, Err(Error::InvalidParameters { .. })));

        let too_few = decode_request(&request(&["<int>1</int>"]), Some(&svc));
        assert!(matches!(too_few, Err(Error::InvalidParameters { .. })));

        let missing = decode_request(
            "<methodCall><methodName>calc</methodName></methodCall>",
            Some(&svc),
        );
        assert!(matches!(missing, Err(Error::InvalidParameters { .. })));
    }

    #[test]
    fn test_variadic_request() {
        let svc = variadic_service();
        let req = decode_request(
            &request(&[
                "<int>1</int>",
                "<string>s</string>",
                "<int>3</int>",
                "<int>4</int>",
                "<int>5</int>",
            ]),
            Some(&svc),
        )
        .unwrap();

        assert_eq!(req.args.len(), 3);
        let rest = req.args[2].as_array().unwrap();
        assert_eq!(rest.kind(), ArrayKind::Homogeneous(ValueKind::Int));
        assert_eq!(
            rest.items(),
            &[Value::Int(3), Value::Int(4), Value::Int(5)]
        );

        // nothing left over for the variadic parameter
        let req = decode_request(&request(&["<int>1</int>", "<string>s</string>"]), Some(&svc))
            .unwrap();
        assert_eq!(req.args[2], Value::Array(build_array(Some(&TypeDesc::Int), vec![])));
    }

    #[test]
    fn test_variadic_element_trail() {
        let svc = variadic_service();
        let err = decode_request(
            &request(&["<int>1</int>", "<string>s</string>", "<int>3</int>", "oops"]),
            Some(&svc),
        )
        .unwrap_err();

        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(err.trail(), Some("[request : parameter 4]"));
    }

    #[test]
    fn test_unknown_method() {
        let svc = fixed_service();
        let err = decode_request(
            "<methodCall><methodName>other</methodName><params/></methodCall>",
            Some(&svc),
        )
        .unwrap_err();

        assert_eq!(
            err,
            Error::UnsupportedMethod {
                method: "other".to_string()
            }
        );
    }

    #[test]
    fn test_typed_parameter_error_trail() {
        let svc = fixed_service();
        let err = decode_request(&request(&["<int>1</int>", "<int>two</int>"]), Some(&svc))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid XML-RPC: request contains invalid int value [request : parameter 2 : integer]"
        );
    }

    #[test]
    fn test_leading_junk() {
        let input = "HTTP/1.1 200 OK\r\n\r\n<methodResponse><params><param><value><int>7</int></value></param></params></methodResponse>";

        assert!(decode_response(input, None).is_err());

        let lenient =
            Deserializer::new(NonStandard::none().with(NonStandardOption::AllowInvalidHttpContent));
        let res = lenient
            .deserialize_response(input.as_bytes(), None, MappingAction::Strict)
            .unwrap();
        assert_eq!(res, Response::Return(Some(Value::Int(7))));
    }

    #[test]
    fn test_return_values() {
        let input = "<methodResponse><params><param><value><string>South Dakota</string></value></param></params></methodResponse>";

        assert_eq!(
            decode_response(input, Some(&TypeDesc::String)),
            Ok(Response::Return(Some(Value::from("South Dakota"))))
        );
        assert_eq!(
            decode_response(input, Some(&TypeDesc::Void)),
            Ok(Response::Return(None))
        );
        assert_eq!(
            decode_response("<methodResponse><params/></methodResponse>", Some(&TypeDesc::Int)),
            Ok(Response::Return(None))
        );
        assert!(matches!(
            decode_response(input, Some(&TypeDesc::Int)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    const FAULT: &str = "<methodResponse><fault><value><struct>
        <member><name>faultCode</name><value><int>4</int></value></member>
        <member><name>faultString</name><value><string>bad</string></value></member>
    </struct></value></fault></methodResponse>";

    #[test]
    fn test_fault_wins_over_return_type() {
        for return_type in [None, Some(TypeDesc::Void), Some(TypeDesc::Int)] {
            let res = decode_response(FAULT, return_type.as_ref()).unwrap();
            assert_eq!(
                res.into_result(),
                Err(Fault {
                    code: 4,
                    message: "bad".to_string()
                })
            );
        }
    }

    #[test]
    fn test_string_fault_code() {
        let input = "<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><string>12</string></value></member>
            <member><name>faultString</name><value>nope</value></member>
        </struct></value></fault></methodResponse>";

        let err = decode_response(input, None).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(err.trail().unwrap().starts_with("[fault response"));

        let lenient =
            Deserializer::new(NonStandard::none().with(NonStandardOption::AllowStringFaultCode));
        let res = lenient
            .deserialize_response(input.as_bytes(), None, MappingAction::Strict)
            .unwrap();
        assert_eq!(
            res,
            Response::Fault(Fault {
                code: 12,
                message: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_incomplete_fault() {
        let input = "<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>4</int></value></member>
        </struct></value></fault></methodResponse>";

        let err = decode_response(input, None).unwrap_err();
        assert_eq!(
            err,
            Error::MissingMembers {
                members: vec!["faultString".to_string()],
                trail: "[fault response : struct mapped to type Fault]".to_string(),
            }
        );
    }

    #[test]
    fn test_value_document() {
        let value = Deserializer::default()
            .deserialize_value_document(b"<value><i4>3</i4></value>", None, MappingAction::Strict)
            .unwrap();
        assert_eq!(value, Value::Int(3));
    }
}

//! Error implementations

use serde::de;

/// Shorthand for results returned by this library.
pub type XmlRpcResult<T> = Result<T, Error>;

/// Errors raised while decoding an XML-RPC payload.
///
/// Structural and content errors carry a `trail`: the parse path at the
/// point of failure, rendered as `[request : parameter 1 : ...]`.
/// The trail is empty when the error was raised outside of a parse frame.
///
/// A fault response is not an error, see [`crate::Response::Fault`].
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The token stream is not well-formed XML, or the XML-RPC element
    /// grammar has been violated.
    IllFormedXml { message: String, trail: String },

    /// Well-formed XML carrying invalid XML-RPC content, such as a
    /// malformed integer or a duplicate struct member.
    InvalidXmlRpc { message: String, trail: String },

    /// The shape of a wire value does not fit the requested target type.
    TypeMismatch { message: String, trail: String },

    /// A struct is missing non-optional members.
    MissingMembers { members: Vec<String>, trail: String },

    /// A wire member resolved onto a member excluded from mapping.
    NonSerializedMember { member: String, trail: String },

    /// The requested mapping is not supported, e.g. nil onto a primitive
    /// or a multi-dimensional array.
    Unsupported { message: String, trail: String },

    /// The method name is not known to the supplied service descriptor.
    UnsupportedMethod { method: String },

    /// The number of parameters does not match the method signature.
    InvalidParameters { message: String },

    /// Raised through the serde bridge.
    Custom(String),
}

impl Error {
    /// Construct an ill-formed input error without a trail.
    pub(crate) fn ill_formed<M: Into<String>>(message: M) -> Self {
        Self::IllFormedXml {
            message: message.into(),
            trail: String::new(),
        }
    }

    /// Construct an invalid content error without a trail.
    pub(crate) fn invalid<M: Into<String>>(message: M) -> Self {
        Self::InvalidXmlRpc {
            message: message.into(),
            trail: String::new(),
        }
    }

    /// Construct a type mismatch error without a trail.
    pub(crate) fn mismatch<M: Into<String>>(message: M) -> Self {
        Self::TypeMismatch {
            message: message.into(),
            trail: String::new(),
        }
    }

    /// Attach a trail to errors raised without one.
    ///
    /// Errors that already carry a trail keep the innermost one.
    pub(crate) fn with_trail(mut self, rendered: &str) -> Self {
        match &mut self {
            Self::IllFormedXml { trail, .. }
            | Self::InvalidXmlRpc { trail, .. }
            | Self::TypeMismatch { trail, .. }
            | Self::MissingMembers { trail, .. }
            | Self::NonSerializedMember { trail, .. }
            | Self::Unsupported { trail, .. } => {
                if trail.is_empty() {
                    *trail = rendered.to_owned();
                }
            }
            Self::UnsupportedMethod { .. } | Self::InvalidParameters { .. } | Self::Custom(_) => (),
        }

        self
    }

    /// Returns the rendered parse trail, if the error carries one.
    pub fn trail(&self) -> Option<&str> {
        match self {
            Self::IllFormedXml { trail, .. }
            | Self::InvalidXmlRpc { trail, .. }
            | Self::TypeMismatch { trail, .. }
            | Self::MissingMembers { trail, .. }
            | Self::NonSerializedMember { trail, .. }
            | Self::Unsupported { trail, .. } => match trail.is_empty() {
                true => None,
                false => Some(trail.as_str()),
            },
            _ => None,
        }
    }
}

impl std::error::Error for Error {}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Self::Custom(msg.to_string())
    }
}

/// Writes the message followed by the trail, if any.
fn write_with_trail(
    f: &mut std::fmt::Formatter<'_>,
    message: std::fmt::Arguments<'_>,
    trail: &str,
) -> std::fmt::Result {
    match trail.is_empty() {
        true => write!(f, "{}", message),
        false => write!(f, "{} {}", message, trail),
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllFormedXml { message, trail } => {
                write_with_trail(f, format_args!("ill-formed XML: {}", message), trail)
            }
            Self::InvalidXmlRpc { message, trail } => {
                write_with_trail(f, format_args!("invalid XML-RPC: {}", message), trail)
            }
            Self::TypeMismatch { message, trail } => {
                write_with_trail(f, format_args!("type mismatch: {}", message), trail)
            }
            Self::MissingMembers { members, trail } => {
                let plural = match members.len() > 1 {
                    true => "s",
                    false => "",
                };
                write_with_trail(
                    f,
                    format_args!(
                        "struct value with missing non-optional member{}: {}",
                        plural,
                        members.join(" ")
                    ),
                    trail,
                )
            }
            Self::NonSerializedMember { member, trail } => write_with_trail(
                f,
                format_args!(
                    "cannot map XML-RPC struct member onto excluded member {}",
                    member
                ),
                trail,
            ),
            Self::Unsupported { message, trail } => {
                write_with_trail(f, format_args!("unsupported: {}", message), trail)
            }
            Self::UnsupportedMethod { method } => {
                write!(f, "unsupported method called: {}", method)
            }
            Self::InvalidParameters { message } => write!(f, "invalid parameters: {}", message),
            Self::Custom(message) => write!(f, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_is_kept_innermost() {
        let err = Error::invalid("bad int")
            .with_trail("[request : parameter 1]")
            .with_trail("[request]");

        assert_eq!(err.trail(), Some("[request : parameter 1]"));
        assert_eq!(
            err.to_string(),
            "invalid XML-RPC: bad int [request : parameter 1]"
        );
    }

    #[test]
    fn test_missing_members_display() {
        let err = Error::MissingMembers {
            members: vec!["a".to_string(), "c".to_string()],
            trail: String::new(),
        };

        assert_eq!(
            err.to_string(),
            "struct value with missing non-optional members: a c"
        );
        assert_eq!(err.trail(), None);
    }
}

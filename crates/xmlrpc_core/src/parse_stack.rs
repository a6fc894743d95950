//! Diagnostic trail of the frames being parsed.
//!
//! Frames are only rendered into error messages, never inspected for
//! control flow.

use crate::err::Error;

/// An ordered stack of human-readable parse frames.
///
/// One instance is used per top-level call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStack {
    parse_type: String,
    frames: Vec<String>,
}

impl ParseStack {
    /// Create an empty stack for a kind of document, e.g. `"request"`.
    pub fn new<S: Into<String>>(parse_type: S) -> Self {
        Self {
            parse_type: parse_type.into(),
            frames: Vec::new(),
        }
    }

    pub fn parse_type(&self) -> &str {
        &self.parse_type
    }

    pub fn push<S: Into<String>>(&mut self, frame: S) {
        self.frames.push(frame.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Run `func` inside a frame. The frame is popped whether or not
    /// `func` succeeds.
    pub fn scoped<T, S, F>(&mut self, frame: S, func: F) -> Result<T, Error>
    where
        S: Into<String>,
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        self.push(frame);
        let res = func(self);
        self.pop();

        res
    }

    /// Render as `[parse type : outermost : ... : innermost]`.
    pub fn render(&self) -> String {
        let frames = std::iter::once(self.parse_type.as_str())
            .chain(self.frames.iter().map(String::as_str))
            .collect::<Vec<_>>();

        format!("[{}]", frames.join(" : "))
    }

    /// Invalid content at the current position.
    pub fn invalid<M: std::fmt::Display>(&self, message: M) -> Error {
        Error::InvalidXmlRpc {
            message: format!("{} contains {}", self.parse_type, message),
            trail: self.render(),
        }
    }

    /// Type mismatch at the current position.
    pub fn mismatch<M: std::fmt::Display>(&self, message: M) -> Error {
        Error::TypeMismatch {
            message: format!("{} contains {}", self.parse_type, message),
            trail: self.render(),
        }
    }

    /// Unsupported mapping at the current position.
    pub fn unsupported<M: std::fmt::Display>(&self, message: M) -> Error {
        Error::Unsupported {
            message: message.to_string(),
            trail: self.render(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_order() {
        let mut stack = ParseStack::new("request");
        assert_eq!(stack.render(), "[request]");

        stack.push("parameter 1");
        stack.push("struct mapped to type Point");
        assert_eq!(
            stack.render(),
            "[request : parameter 1 : struct mapped to type Point]"
        );
    }

    #[test]
    fn test_scoped_pops_on_failure() {
        let mut stack = ParseStack::new("response");

        let res: Result<(), Error> =
            stack.scoped("element 0", |s| Err(s.invalid("invalid int value")));

        assert!(stack.is_empty());
        match res {
            Err(Error::InvalidXmlRpc { message, trail }) => {
                assert_eq!(message, "response contains invalid int value");
                assert_eq!(trail, "[response : element 0]");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

//! CLI args

use std::{fmt::Display, path::PathBuf};

use clap::Parser;
use xmlrpc_core::{MappingAction, NonStandard, NonStandardOption};

/// Decode an XML-RPC payload and print the value tree it carries.
#[derive(Parser)]
#[clap(version, about)]
pub(crate) struct DecodeArgs {
    /// The payload to decode. Reads stdin if not given.
    pub input: Option<PathBuf>,

    /// The kind of document in the payload.
    #[clap(short, long)]
    #[clap(default_value_t = DocumentKind::Response)]
    pub kind: DocumentKind,

    /// Tolerate a non-standard protocol variation. May be repeated.
    #[clap(short, long = "non-standard")]
    pub non_standard: Vec<NonStandardArg>,

    /// Leave missing struct members unset instead of failing.
    #[clap(long)]
    pub lenient: bool,

    /// Print the parsed node sequence before the decoded value.
    #[clap(long)]
    pub dump_nodes: bool,
}

impl DecodeArgs {
    /// Dialect assembled from the repeated `--non-standard` flags.
    pub fn dialect(&self) -> NonStandard {
        match self.non_standard.contains(&NonStandardArg::All) {
            true => NonStandard::all(),
            false => self
                .non_standard
                .iter()
                .filter_map(|arg| arg.option())
                .collect(),
        }
    }

    pub fn mapping(&self) -> MappingAction {
        match self.lenient {
            true => MappingAction::Lenient,
            false => MappingAction::Strict,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DocumentKind {
    /// A `methodCall` document.
    Request,

    /// A `methodResponse` document.
    Response,

    /// A bare `value` element.
    Value,
}

impl Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", camel_to_kebab_case(&format!("{:?}", self)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum NonStandardArg {
    /// Discard anything before the XML document, such as HTTP headers.
    AllowInvalidHttpContent,

    /// Accept date-times outside the ISO-8601 profile.
    AllowNonStandardDateTime,

    /// Accept a fault code sent as a string.
    AllowStringFaultCode,

    /// Keep the first of repeated struct members.
    IgnoreDuplicateMembers,

    /// Decode an empty date-time as the minimum date-time.
    MapEmptyDateTimeToMinValue,

    /// Decode an all-zeros date-time as the minimum date-time.
    MapZerosDateTimeToMinValue,

    /// Every variation above.
    All,
}

impl NonStandardArg {
    fn option(self) -> Option<NonStandardOption> {
        match self {
            Self::AllowInvalidHttpContent => Some(NonStandardOption::AllowInvalidHttpContent),
            Self::AllowNonStandardDateTime => Some(NonStandardOption::AllowNonStandardDateTime),
            Self::AllowStringFaultCode => Some(NonStandardOption::AllowStringFaultCode),
            Self::IgnoreDuplicateMembers => Some(NonStandardOption::IgnoreDuplicateMembers),
            Self::MapEmptyDateTimeToMinValue => {
                Some(NonStandardOption::MapEmptyDateTimeToMinValue)
            }
            Self::MapZerosDateTimeToMinValue => {
                Some(NonStandardOption::MapZerosDateTimeToMinValue)
            }
            Self::All => None,
        }
    }
}

impl Display for NonStandardArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", camel_to_kebab_case(&format!("{:?}", self)))
    }
}

/// `AllowStringFaultCode` -> `allow-string-fault-code`
pub fn camel_to_kebab_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                result.push('-');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

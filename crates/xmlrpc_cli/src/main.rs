mod args;

use std::{
    io::{self, Read},
    path::Path,
    process::ExitCode,
};

use args::{DecodeArgs, DocumentKind};
use clap::Parser as _;
use xmlrpc_core::{
    Deserializer, MappingAction, Node, NodeEvent, ParseStack, Parser, Replay, Request, Response,
    TokenCursor, Value,
};

const DEFAULT_LOG_LEVEL: &str = "WARN";

/// Exit code for a decoded fault response.
const EXIT_FAULT: u8 = 1;
/// Exit code for unreadable or undecodable input.
const EXIT_ERROR: u8 = 2;

/// Errors that end the program
#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Decode(xmlrpc_core::Error),
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<xmlrpc_core::Error> for CliError {
    fn from(e: xmlrpc_core::Error) -> Self {
        Self::Decode(e)
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "unable to read input: {}", e),
            Self::Decode(e) => write!(f, "{}", e),
        }
    }
}

/// Decoded document, ready to print.
enum Decoded {
    Request(Request),
    Response(Response),
    Value(Value),
}

fn main() -> ExitCode {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filters)
        .init();

    let args = DecodeArgs::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            log::debug!("decoding failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: &DecodeArgs) -> Result<ExitCode, CliError> {
    let input = read_input(args.input.as_deref())?;
    let de = Deserializer::new(args.dialect());
    let mapping = args.mapping();

    log::info!(
        "decoding {} bytes as {} ({:?})",
        input.len(),
        args.kind,
        mapping
    );

    let decoded = match args.dump_nodes {
        true => decode_replayed(&de, args.kind, &input, mapping)?,
        false => decode(&de, args.kind, &input, mapping)?,
    };

    Ok(print_decoded(decoded))
}

fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = vec![];
            io::stdin().lock().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn decode(
    de: &Deserializer,
    kind: DocumentKind,
    input: &[u8],
    mapping: MappingAction,
) -> Result<Decoded, CliError> {
    let decoded = match kind {
        DocumentKind::Request => Decoded::Request(de.deserialize_request(input, None, mapping)?),
        DocumentKind::Response => {
            Decoded::Response(de.deserialize_response(input, None, mapping)?)
        }
        DocumentKind::Value => {
            Decoded::Value(de.deserialize_value_document(input, None, mapping)?)
        }
    };

    Ok(decoded)
}

/// Record the node sequence, print it, then decode from the recording.
fn decode_replayed(
    de: &Deserializer,
    kind: DocumentKind,
    input: &[u8],
    mapping: MappingAction,
) -> Result<Decoded, CliError> {
    let cursor = match de.non_standard().allow_invalid_http_content {
        true => TokenCursor::skipping_leading_junk(input)?,
        false => TokenCursor::new(input),
    };

    let mut replay = match kind {
        DocumentKind::Request => Replay::record(&mut Parser::request(cursor))?,
        DocumentKind::Response => Replay::record(&mut Parser::response(cursor))?,
        DocumentKind::Value => Replay::record(&mut Parser::value(cursor))?,
    };

    for event in replay.nodes() {
        println!("{}", format_event(event));
    }
    println!();
    replay.rewind();

    let decoded = match kind {
        DocumentKind::Request => {
            Decoded::Request(de.deserialize_request_nodes(&mut replay, None, mapping)?)
        }
        DocumentKind::Response => {
            Decoded::Response(de.deserialize_response_nodes(&mut replay, None, mapping)?)
        }
        DocumentKind::Value => {
            let mut stack = ParseStack::new("value");
            Decoded::Value(de.deserialize(&mut replay, None, &mut stack, mapping)?)
        }
    };

    Ok(decoded)
}

/// One line per node, indented by container nesting.
fn format_event(event: &NodeEvent) -> String {
    let indent = "  ".repeat(event.depth);
    let detail = match &event.node {
        Node::MethodName(text) | Node::StructMember(text) => format!(" {}", text),
        Node::String { text, .. }
        | Node::Int(text)
        | Node::Long(text)
        | Node::Double(text)
        | Node::Boolean(text)
        | Node::DateTime(text)
        | Node::Base64(text) => format!(" {:?}", text),
        _ => String::new(),
    };

    format!("{}{}{}", indent, event.node.describe(), detail)
}

fn print_decoded(decoded: Decoded) -> ExitCode {
    match decoded {
        Decoded::Request(request) => {
            println!("method {}", request.method_name);
            for (idx, arg) in request.args.iter().enumerate() {
                println!("param {}: {}", idx + 1, arg);
            }
            ExitCode::SUCCESS
        }
        Decoded::Response(Response::Return(Some(value))) | Decoded::Value(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Decoded::Response(Response::Return(None)) => {
            println!("no value");
            ExitCode::SUCCESS
        }
        Decoded::Response(Response::Fault(fault)) => {
            println!("{}", fault);
            ExitCode::from(EXIT_FAULT)
        }
    }
}

use std::sync::Arc;

use miette::{Diagnostic, SourceSpan};
use reqwest::StatusCode;
use thiserror::Error;

use crate::command::Verb;

/// Everything that can go wrong with a single command line.
///
/// Translation failures carry the offending line so miette can point at the verb.
#[derive(Debug, Diagnostic, Error)]
pub enum CommandError {
    #[error("command not valid or unsupported")]
    #[diagnostic(
        code(diskcmd::unsupported_command),
        help("known commands: mkdisk, fdisk, mount, unmount, mkfs, login, readmbr, rep")
    )]
    UnsupportedCommand {
        #[source_code]
        input: Arc<String>,

        #[label("unknown command")]
        span: SourceSpan,
    },

    #[error("missing required argument -{field} for {verb}")]
    #[diagnostic(code(diskcmd::missing_argument))]
    MissingArgument {
        verb: Verb,
        field: &'static str,

        #[source_code]
        input: Arc<String>,

        #[label("{} needs -{}=<value>", verb, field)]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Execute(#[from] ExecuteError),

    #[error("command task stopped before producing a result: {reason}")]
    #[diagnostic(code(diskcmd::task_failed))]
    TaskFailed { reason: String },
}

impl CommandError {
    pub fn unsupported(line: &str) -> Self {
        Self::UnsupportedCommand {
            input: Arc::new(line.to_string()),
            span: first_word(line),
        }
    }

    pub fn missing_argument(verb: Verb, field: &'static str, line: &str) -> Self {
        Self::MissingArgument {
            verb,
            field,
            input: Arc::new(line.to_string()),
            span: first_word(line),
        }
    }
}

/// Failure of a request once it has been handed to the server.
#[derive(Debug, Diagnostic, Error)]
pub enum ExecuteError {
    /// The request never got a usable answer: connection refused, reset, or a body that
    /// could not be decoded.
    #[error("could not complete the request to the server")]
    #[diagnostic(code(diskcmd::transport))]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message}")]
    #[diagnostic(code(diskcmd::server))]
    Server { status: StatusCode, message: String },
}

/// Span of the first whitespace separated word of `line`.
fn first_word(line: &str) -> SourceSpan {
    let start = line.len() - line.trim_start().len();
    let len = line[start..]
        .find(char::is_whitespace)
        .unwrap_or(line.len() - start);
    (start, len).into()
}

//! Error types and exit code handling.
//!
//! Two layers live here. [`GrammarError`] is what the parsing and rendering
//! code produces: a closed [`ErrorKind`] plus enough context (a short snippet
//! of the offending text, the source it came from and the line) to point a
//! user at the problem. [`VttError`] wraps it together with the file and
//! command-line failures of the binary and maps everything to BSD sysexits.h
//! exit codes.
//!
//! # Example
//!
//! ```rust,ignore
//! use vtt_transcript::{Parser, VttError};
//!
//! match Parser::default().parse_file("missing.vtt") {
//!     Err(e @ VttError::FileNotFound { .. }) => assert_eq!(e.exit_status(), 66),
//!     _ => unreachable!(),
//! }
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Origin reported for text that did not come from a file.
pub const NO_ORIGIN: &str = "<none>";

/// Maximum number of characters of offending text kept in an error.
const CONTEXT_LIMIT: usize = 20;

/// Every way parsing or rendering can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source could not be read.
    IoFailure,
    /// The first line is not `WEBVTT`.
    MissingHeader,
    /// The line after the header is not empty.
    ExpectedBlankLine,
    /// A cue timing line does not have the `start --> end [settings]` shape.
    MalformedTimestamp,
    /// A region setting fragment is not `key:value`.
    MalformedSetting,
    UnknownRegionSetting,
    DuplicateRegionSetting,
    UnknownCueSetting,
    /// A cue-text tag name outside the WebVTT set (strict mode only).
    UnknownTag,
    /// A span was still open when a different closing tag or the end of the
    /// text was reached.
    UnclosedTag,
    /// Cue text that is not a well-formed tag, or left unconsumed.
    MalformedTag,
    /// A closing tag that does not match the innermost open tag.
    UnmatchedTag,
    /// The sentence splitter broke the tag structure of the text it was given.
    SentenceSplitterProducedInvalidText,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::IoFailure => "I/O failure",
            ErrorKind::MissingHeader => "missing WEBVTT header",
            ErrorKind::ExpectedBlankLine => "expected blank line",
            ErrorKind::MalformedTimestamp => "malformed timestamp",
            ErrorKind::MalformedSetting => "malformed setting",
            ErrorKind::UnknownRegionSetting => "unknown region setting",
            ErrorKind::DuplicateRegionSetting => "duplicate region setting",
            ErrorKind::UnknownCueSetting => "unknown cue setting",
            ErrorKind::UnknownTag => "unknown tag",
            ErrorKind::UnclosedTag => "unclosed tag",
            ErrorKind::MalformedTag => "malformed tag",
            ErrorKind::UnmatchedTag => "unmatched tag",
            ErrorKind::SentenceSplitterProducedInvalidText => {
                "sentence splitter produced invalid text"
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positioned error raised while parsing or rendering WebVTT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} in {origin}{}: \"{context}\"", line_suffix(.line))]
pub struct GrammarError {
    pub kind: ErrorKind,
    /// Truncated, escaped excerpt of the offending text.
    pub context: String,
    /// File name, or [`NO_ORIGIN`] for in-memory buffers.
    pub origin: String,
    /// 0-based line number, `None` when the error is not tied to a line.
    pub line: Option<usize>,
}

impl GrammarError {
    pub fn new(kind: ErrorKind, context: &str) -> Self {
        GrammarError {
            kind,
            context: snippet(context),
            origin: NO_ORIGIN.to_string(),
            line: None,
        }
    }

    /// Attach a line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach the name of the source the text came from.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Re-tag as a different kind, keeping the context.
    pub fn rekind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" at line {}", n),
        None => String::new(),
    }
}

/// Shorten `text` to a printable excerpt for error messages.
pub(crate) fn snippet(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    for ch in chars.by_ref().take(CONTEXT_LIMIT) {
        if ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}

/// Application-level error type.
///
/// Each variant maps to a specific BSD sysexits.h exit code and provides
/// context about what went wrong.
#[derive(Error, Debug)]
pub enum VttError {
    /// Input file was not found.
    #[error("Input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Permission denied when accessing a file.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// The input could not be parsed or rendered.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// Output file already exists and --force was not specified.
    #[error("Output file already exists: {path} (use --force to overwrite)")]
    OutputExists { path: PathBuf },

    /// Input and output paths are the same.
    #[error("Output path cannot be the same as input path: {path}")]
    SameFile { path: PathBuf },

    /// Error writing output file.
    #[error("Failed to write output file: {path}")]
    WriteError { path: PathBuf, source: io::Error },

    /// General I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Invalid command-line usage.
    #[error("Invalid usage: {reason}")]
    UsageError { reason: String },
}

impl VttError {
    /// Map error to appropriate BSD sysexits.h exit code.
    ///
    /// # Exit Code Mapping
    ///
    /// - `64` (EX_USAGE): Invalid command-line usage or conflicting arguments
    /// - `65` (EX_DATAERR): Invalid WebVTT content
    /// - `66` (EX_NOINPUT): Input file not found
    /// - `73` (EX_CANTCREAT): Output file already exists without --force
    /// - `74` (EX_IOERR): General I/O or write errors
    /// - `77` (EX_NOPERM): Permission denied when accessing files
    pub fn exit_status(&self) -> u8 {
        match self {
            VttError::UsageError { .. } => 64,
            VttError::Grammar(e) if e.kind == ErrorKind::IoFailure => 74,
            VttError::Grammar(_) => 65,
            VttError::FileNotFound { .. } => 66,
            VttError::OutputExists { .. } => 73,
            VttError::WriteError { .. } => 74,
            VttError::IoError(_) => 74,
            VttError::PermissionDenied { .. } => 77,
            VttError::SameFile { .. } => 64,
        }
    }

    /// [`exit_status`](Self::exit_status) as a process exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

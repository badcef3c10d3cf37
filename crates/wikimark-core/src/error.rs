use crate::span::Span;
use std::fmt;

/// Error kinds for categorizing parse recoveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A paired construct reached end of input (or end of line) before its closer
    UnclosedConstruct,
    /// An emphasis pair with nothing inside it
    EmptyEmphasis,
    /// A template parameter or list start override that could not be read
    InvalidParam,
    /// A rule token with no production of its own, kept as literal text
    UnexpectedToken,
}

/// A parse error with location information.
///
/// The parser never stops on malformed markup. Each error records a fallback
/// it applied, so every error produced by the parser is recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,
    /// Source location where the error occurred
    pub span: Option<Span>,
    /// Error categorization
    pub kind: ParseErrorKind,
    /// Whether parsing continued after this error
    pub recoverable: bool,
}

impl ParseError {
    fn recovered(kind: ParseErrorKind, message: String, span: Option<Span>) -> Self {
        Self {
            message,
            span,
            kind,
            recoverable: true,
        }
    }

    /// Create an error for a construct left open.
    pub fn unclosed(construct: &str, span: Option<Span>) -> Self {
        Self::recovered(
            ParseErrorKind::UnclosedConstruct,
            format!("unclosed {}", construct),
            span,
        )
    }

    /// Create an error for an emphasis pair with no content.
    pub fn empty_emphasis(delimiter: &str, span: Option<Span>) -> Self {
        Self::recovered(
            ParseErrorKind::EmptyEmphasis,
            format!("empty emphasis {}{}", delimiter, delimiter),
            span,
        )
    }

    /// Create an error for an unreadable parameter.
    pub fn invalid_param(context: &str, span: Option<Span>) -> Self {
        Self::recovered(
            ParseErrorKind::InvalidParam,
            format!("invalid {}", context),
            span,
        )
    }

    /// Create an error for a rule token kept as text.
    pub fn unexpected_token(token: &str, span: Option<Span>) -> Self {
        Self::recovered(
            ParseErrorKind::UnexpectedToken,
            format!("unexpected {:?}", token),
            span,
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(span) = self.span {
            write!(f, " at bytes {}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// A collection of parse errors encountered during parsing.
#[derive(Debug, Clone, Default)]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Check if any errors were collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Drop errors recorded after a checkpoint.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.errors.truncate(len);
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    /// Count the errors of one kind.
    pub fn count(&self, kind: ParseErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Failure reported by a lookup collaborator.
///
/// The renderer never propagates these: it logs them and renders the same
/// fallback as for a missing page or image.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("could not read '{name}': {source}")]
    NotReadable {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("lookup of '{name}' failed: {message}")]
    Backend { name: String, message: String },
}

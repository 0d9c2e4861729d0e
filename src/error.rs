//! Error types
//!
//! Two disjoint families:
//!
//! - *Definition errors* describe a malformed lexer or grammar. They are found
//!   once, when the lexer or grammar is built, and either returned immediately
//!   or kept for inspection when deferred.
//! - *Recognition errors* describe malformed input. They are recorded in order
//!   on the parser, which keeps going when error recovery is enabled.
//!
//! [`ParseFailure`] is the error half of every DSL operation's result. Only
//! its [`Recognition`](ParseFailure::Recognition) variant is intercepted by
//! the recovery machinery; everything else propagates to the caller.

use crate::tokens::{Token, TokenTypeId};
use std::fmt;

// ============================================================================
// Lexer definition errors
// ============================================================================

/// Kind of a lexer definition error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerDefinitionErrorKind {
    /// A type has no pattern
    MissingPattern,
    /// A pattern does not compile
    InvalidPattern,
    /// A pattern contains the `$` end-of-input anchor
    EndOfInputAnchorFound,
    /// A pattern uses the multiline or global flag
    UnsupportedFlagsFound,
    /// Several types share an identical pattern
    DuplicatePatternsFound,
    /// A group value is not a usable group name
    InvalidGroupTypeFound,
}

/// A problem in the token definitions handed to a lexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerDefinitionError {
    /// What went wrong
    pub kind: LexerDefinitionErrorKind,
    /// Human-readable description
    pub message: String,
    /// Offending token types
    pub token_types: Vec<TokenTypeId>,
}

impl fmt::Display for LexerDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LexerDefinitionError {}

/// A character sequence the lexer could not match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexingError {
    /// Byte offset where the unmatched span starts
    pub offset: usize,
    /// Line where the unmatched span starts
    pub line: usize,
    /// Column where the unmatched span starts
    pub column: usize,
    /// Number of characters skipped
    pub length: usize,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for LexingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for LexingError {}

// ============================================================================
// Parser definition errors
// ============================================================================

/// Kind of a grammar definition error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserDefinitionErrorKind {
    /// Rule name is not an identifier
    InvalidRuleName,
    /// Rule name used twice in one grammar
    DuplicateRuleName,
    /// Same construct, occurrence index and argument used twice in a rule
    DuplicateProductions,
    /// Subrule reference to an undefined rule
    UnresolvedSubruleRef,
    /// A rule can invoke itself without consuming input
    LeftRecursion,
    /// An alternative other than the last can match nothing
    NoneLastEmptyAlt,
    /// Several alternatives of one OR start with the same token type
    AmbiguousAlternatives,
    /// A rule names a token type missing from the vocabulary
    UnknownTokenType,
    /// Occurrence index outside `1..=5`
    InvalidOccurrenceIndex,
    /// A rule body failed while its structure was being recorded
    RecordingFailed,
}

/// A problem in a grammar definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserDefinitionError {
    /// What went wrong
    pub kind: ParserDefinitionErrorKind,
    /// Human-readable description
    pub message: String,
    /// Rule the problem was found in
    pub rule_name: Option<String>,
    /// DSL construct involved (`CONSUME`, `OR`, ...)
    pub dsl_name: Option<String>,
    /// Occurrence index of the construct
    pub occurrence: Option<u32>,
    /// Extra argument of the construct (token or rule name)
    pub parameter: Option<String>,
    /// 1-based alternative number, for OR problems
    pub alternative: Option<usize>,
    /// Name that failed to resolve
    pub unresolved_ref_name: Option<String>,
}

impl ParserDefinitionError {
    /// Create an error with only a kind and message
    pub fn new(kind: ParserDefinitionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            rule_name: None,
            dsl_name: None,
            occurrence: None,
            parameter: None,
            alternative: None,
            unresolved_ref_name: None,
        }
    }

    /// Attach the rule name
    pub fn in_rule(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    /// Attach the DSL construct and its occurrence
    pub fn at_production(mut self, dsl_name: impl Into<String>, occurrence: u32) -> Self {
        self.dsl_name = Some(dsl_name.into());
        self.occurrence = Some(occurrence);
        self
    }

    /// Attach the construct's extra argument
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    /// Attach a 1-based alternative number
    pub fn with_alternative(mut self, alternative: usize) -> Self {
        self.alternative = Some(alternative);
        self
    }
}

impl fmt::Display for ParserDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParserDefinitionError {}

/// A non-empty collection of definition errors, returned as one error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionErrors<E> {
    errors: Vec<E>,
}

impl<E> DefinitionErrors<E> {
    /// Wrap `errors`; `None` when there are none
    pub fn from_vec(errors: Vec<E>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Wrap a single error
    pub fn single(error: E) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// The individual errors
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Unwrap into the individual errors
    pub fn into_inner(self) -> Vec<E> {
        self.errors
    }
}

fn join_messages<E: fmt::Display>(errors: &[E], separator: &str) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

impl fmt::Display for DefinitionErrors<LexerDefinitionError> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Errors detected in definition of Lexer:\n{}",
            join_messages(&self.errors, "\n-----------------------\n")
        )
    }
}

impl std::error::Error for DefinitionErrors<LexerDefinitionError> {}

impl fmt::Display for DefinitionErrors<ParserDefinitionError> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parser Definition Errors detected\n: {}",
            join_messages(&self.errors, "\n-------------------------------\n")
        )
    }
}

impl std::error::Error for DefinitionErrors<ParserDefinitionError> {}

// ============================================================================
// Recognition errors
// ============================================================================

/// Kind of a recognition error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognitionExceptionKind {
    /// CONSUME found a different token type
    MismatchedToken,
    /// No OR alternative matches the next token
    NoViableAlt,
    /// AT_LEAST_ONE found no first iteration
    EarlyExit,
    /// The entry rule returned before the end of input
    NotAllInputParsed,
}

impl fmt::Display for RecognitionExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MismatchedToken => write!(f, "MismatchedTokenException"),
            Self::NoViableAlt => write!(f, "NoViableAltException"),
            Self::EarlyExit => write!(f, "EarlyExitException"),
            Self::NotAllInputParsed => write!(f, "NotAllInputParsedException"),
        }
    }
}

/// A recorded recognition error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionException {
    /// What went wrong
    pub kind: RecognitionExceptionKind,
    /// Human-readable description
    pub message: String,
    /// Token at which the error was detected
    pub token: Token,
    /// Names of the rules being parsed, outermost first
    pub rule_stack: Vec<String>,
}

impl fmt::Display for RecognitionException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.is_virtual() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(
                f,
                "{} at line {}, column {}: {}",
                self.kind, self.token.start_line, self.token.start_column, self.message
            )
        }
    }
}

impl std::error::Error for RecognitionException {}

/// Why a DSL operation or rule did not produce a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Malformed input; handled by rule-level resynchronization
    Recognition(RecognitionException),
    /// Rule nesting exceeded the configured limit
    RecursionLimit {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max_depth: usize,
    },
    /// Any other failure, raised by user code; never intercepted
    Fatal(String),
}

impl ParseFailure {
    /// Create a fatal failure
    pub fn fatal(message: impl Into<String>) -> Self {
        ParseFailure::Fatal(message.into())
    }

    /// Whether recovery machinery may handle this failure
    pub fn is_recognition(&self) -> bool {
        matches!(self, ParseFailure::Recognition(_))
    }

    /// The recognition error, if this is one
    pub fn as_recognition(&self) -> Option<&RecognitionException> {
        match self {
            ParseFailure::Recognition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RecognitionException> for ParseFailure {
    fn from(e: RecognitionException) -> Self {
        ParseFailure::Recognition(e)
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recognition(e) => write!(f, "{}", e),
            Self::RecursionLimit { depth, max_depth } => write!(
                f,
                "Recursion limit exceeded: depth {} > max {}",
                depth, max_depth
            ),
            Self::Fatal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Result of every DSL operation and rule invocation
pub type ParseResult<T> = Result<T, ParseFailure>;

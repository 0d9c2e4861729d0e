//! llkit - LL(1) parser-building toolkit
//!
//! Build a lexer and a parser for your language in plain Rust:
//! - Regex-driven lexer with token categories, groups and longer-alternative
//!   keyword handling
//! - Grammar rules written as ordinary functions over a parsing DSL
//! - One-time grammar analysis: FIRST/FOLLOW sets, LL(1) lookahead,
//!   validation of left recursion, ambiguities and duplicate productions
//! - Fault-tolerant recursive descent: single-token insertion and deletion,
//!   repetition re-sync, and rule-level re-sync with recovery values
//! - Backtracking for the spots where one token of lookahead is not enough
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use llkit::prelude::*;
//!
//! static SUM: Rule<i64> = Rule::new("sum", sum);
//!
//! fn sum(p: &mut Parser) -> ParseResult<i64> {
//!     let terms = p.at_least_one_sep("Plus", |p| p.consume("Int"))?;
//!     Ok(p.action(|| terms.items.iter().filter_map(|t| t.image.parse::<i64>().ok()).sum()))
//! }
//!
//! let vocab = Arc::new(
//!     TokenVocabulary::new(vec![
//!         TokenTypeDef::new("Int", "[0-9]+"),
//!         TokenTypeDef::new("Plus", "\\+"),
//!         TokenTypeDef::new("Whitespace", "\\s+").skipped(),
//!     ])
//!     .unwrap(),
//! );
//! let lexer = Lexer::new(&vocab).unwrap();
//! let grammar = GrammarBuilder::new("Sums", Arc::clone(&vocab))
//!     .rule(&SUM)
//!     .build()
//!     .unwrap();
//!
//! let tokens = lexer.tokenize("1 + 2 + 39").unwrap().tokens;
//! let mut parser = Parser::new(grammar, tokens).unwrap();
//! assert_eq!(parser.invoke(&SUM).unwrap(), 42);
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

/// Logging macros - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Logging macros - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

// Prelude module for convenient imports
pub mod prelude;

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod regex_cache;
pub mod tokens;

/// Re-export commonly used types for convenience
pub use error::{
    DefinitionErrors, LexerDefinitionError, LexingError, ParseFailure, ParseResult,
    ParserDefinitionError, RecognitionException,
};
pub use lexer::{LexResult, Lexer, LexerConfig};
pub use parser::{
    grammar_of, Alt, Grammar, GrammarBuilder, GrammarDefinition, OrOptions, Parser, ParserConfig,
    Rule, Separated,
};
pub use tokens::{Token, TokenTypeDef, TokenTypeId, TokenVocabulary};

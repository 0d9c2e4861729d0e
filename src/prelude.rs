//! Prelude module for convenient imports
//!
//! This module re-exports the types needed to define tokens, lex input and
//! write grammar rules:
//!
//! ```
//! use llkit::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Tokens and lexing
//! - [`TokenTypeDef`] - Token type definition
//! - [`TokenVocabulary`] - Closed set of token types
//! - [`Token`] - A lexed token
//! - [`Lexer`] - Regex-driven lexer
//!
//! ## Grammars
//! - [`Rule`] - A grammar rule
//! - [`Parser`] - Parser instance and DSL
//! - [`Alt`] - One alternative of an OR
//! - [`GrammarBuilder`] - Records and analyzes rules
//!
//! ## Errors
//! - [`ParseResult`] - Result of rules and DSL operations
//! - [`ParseFailure`] - Why a rule did not produce a value
//! - [`RecognitionException`] - A saved recognition error

// ============================================================================
// Tokens and lexing
// ============================================================================

pub use crate::lexer::{LexResult, Lexer, LexerConfig};
pub use crate::tokens::{Group, Token, TokenTypeDef, TokenTypeId, TokenVocabulary};

// ============================================================================
// Grammars
// ============================================================================

pub use crate::parser::{
    Alt, Grammar, GrammarBuilder, GrammarDefinition, OrOptions, Parser, ParserConfig, Rule,
    Separated,
};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{
    DefinitionErrors, ParseFailure, ParseResult, ParserDefinitionError,
    RecognitionException, RecognitionExceptionKind,
};

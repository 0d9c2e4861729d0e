//! Recursive-descent parsing runtime
//!
//! Rules are plain functions over a [`Parser`]; the DSL methods on the parser
//! (`consume`, `subrule`, `option`, `many`, `or`, ...) both describe the
//! grammar and recognize input. A [`GrammarBuilder`] runs every rule once in
//! recording mode to capture its structure, then analyzes it: references are
//! resolved, the grammar is validated, and every lookahead and follow set is
//! precomputed. Parsing afterwards is table-driven.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use llkit::prelude::*;
//!
//! static LIST: Rule<Vec<String>> = Rule::new("list", list);
//!
//! fn list(p: &mut Parser) -> ParseResult<Vec<String>> {
//!     p.consume("LBracket")?;
//!     let items = p.many_sep("Comma", |p| p.consume("Ident").map(|t| t.image))?;
//!     p.consume("RBracket")?;
//!     Ok(items.items)
//! }
//!
//! let vocab = Arc::new(
//!     TokenVocabulary::new(vec![
//!         TokenTypeDef::new("LBracket", "\\["),
//!         TokenTypeDef::new("RBracket", "\\]"),
//!         TokenTypeDef::new("Comma", ","),
//!         TokenTypeDef::new("Ident", "[a-z]+"),
//!         TokenTypeDef::new("Whitespace", "\\s+").skipped(),
//!     ])
//!     .unwrap(),
//! );
//! let grammar = GrammarBuilder::new("Lists", Arc::clone(&vocab))
//!     .rule(&LIST)
//!     .build()
//!     .unwrap();
//!
//! let tokens = Lexer::new(&vocab).unwrap().tokenize("[a, b, c]").unwrap().tokens;
//! let mut parser = Parser::new(grammar, tokens).unwrap();
//! assert_eq!(parser.invoke(&LIST).unwrap(), vec!["a", "b", "c"]);
//! assert!(parser.errors().is_empty());
//! ```

mod config;
mod grammar;
mod recorder;
mod recovery;
pub mod registry;
mod runtime;

pub use config::{InsertionFilter, ParserConfig, DEFAULT_MAX_RECURSION_DEPTH};
pub use grammar::{Grammar, GrammarBuilder};
pub use registry::{grammar_of, GrammarDefinition};

use crate::error::{ParseResult, RecognitionException};
use crate::grammar::RuleId;
use crate::tokens::{Token, TokenTypeId, TokenVocabulary};
use recorder::Recorder;
use std::fmt;
use std::sync::Arc;

/// Signature of a rule body
pub type RuleBody<T> = fn(&mut Parser) -> ParseResult<T>;

/// A grammar rule: a name, a body, and the value returned when the rule
/// recovers from an error by resynchronizing.
///
/// Rules are meant to be `static`s so that bodies can refer to each other.
pub struct Rule<T> {
    name: &'static str,
    body: RuleBody<T>,
    invalid: fn() -> T,
    resync: bool,
}

impl<T> Rule<T> {
    /// A rule whose recovery value is `T::default()`
    pub const fn new(name: &'static str, body: RuleBody<T>) -> Self
    where
        T: Default,
    {
        Self {
            name,
            body,
            invalid: T::default,
            resync: true,
        }
    }

    /// A rule with an explicit recovery value
    pub const fn with_invalid(name: &'static str, body: RuleBody<T>, invalid: fn() -> T) -> Self {
        Self {
            name,
            body,
            invalid,
            resync: true,
        }
    }

    /// Never resynchronize inside this rule (unless it is the entry rule)
    pub const fn without_resync(mut self) -> Self {
        self.resync = false;
        self
    }

    /// Rule name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this rule may resynchronize on errors
    pub fn resyncs(&self) -> bool {
        self.resync
    }
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Rule<T> {}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("resync", &self.resync)
            .finish()
    }
}

type GuardFn<'a> = Box<dyn FnMut(&mut Parser) -> ParseResult<bool> + 'a>;
type AltBody<'a, T> = Box<dyn FnMut(&mut Parser) -> ParseResult<T> + 'a>;

/// One alternative of an OR
pub struct Alt<'a, T> {
    guard: Option<GuardFn<'a>>,
    body: AltBody<'a, T>,
}

impl<'a, T> Alt<'a, T> {
    /// An alternative chosen by the computed lookahead
    pub fn new(body: impl FnMut(&mut Parser) -> ParseResult<T> + 'a) -> Self {
        Self {
            guard: None,
            body: Box::new(body),
        }
    }

    /// An alternative chosen when `guard` returns `true`.
    ///
    /// When the first alternative of an OR has a guard, the computed
    /// lookahead is not used at all: guards are tried in order and an
    /// alternative without one always matches.
    pub fn when(
        guard: impl FnMut(&mut Parser) -> ParseResult<bool> + 'a,
        body: impl FnMut(&mut Parser) -> ParseResult<T> + 'a,
    ) -> Self {
        Self {
            guard: Some(Box::new(guard)),
            body: Box::new(body),
        }
    }

    /// An alternative that matches nothing and yields `value`
    pub fn empty(value: T) -> Self
    where
        T: Clone + 'a,
    {
        Self::new(move |_| Ok(value.clone()))
    }
}

impl<T> fmt::Debug for Alt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alt")
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Options of an OR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrOptions {
    description: Option<String>,
    ignore_ambiguities: bool,
}

impl OrOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not report alternatives sharing a first token; the first matching
    /// alternative wins
    pub fn ignore_ambiguities(mut self) -> Self {
        self.ignore_ambiguities = true;
        self
    }

    /// Describe the expected input in no-viable-alternative errors instead
    /// of listing token types
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Items of a separated repetition, with the separators between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separated<T> {
    /// Parsed items
    pub items: Vec<T>,
    /// Consumed separators
    pub separators: Vec<Token>,
}

impl<T> Default for Separated<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            separators: Vec::new(),
        }
    }
}

/// Something naming a token type: its id or its name
pub trait TokenRef {
    /// Look up the type in `vocabulary`
    fn resolve(&self, vocabulary: &TokenVocabulary) -> Option<TokenTypeId>;

    /// Text used in messages about this reference
    fn describe(&self) -> String;
}

impl TokenRef for TokenTypeId {
    fn resolve(&self, vocabulary: &TokenVocabulary) -> Option<TokenTypeId> {
        vocabulary.get(*self).map(|t| t.id)
    }

    fn describe(&self) -> String {
        format!("#{}", self.index())
    }
}

impl TokenRef for &str {
    fn resolve(&self, vocabulary: &TokenVocabulary) -> Option<TokenTypeId> {
        vocabulary.id(self)
    }

    fn describe(&self) -> String {
        (*self).to_string()
    }
}

/// A parser instance: one grammar, one token input, its own error list.
///
/// Instances are cheap; the analyzed [`Grammar`] is shared.
pub struct Parser {
    grammar: Arc<Grammar>,
    config: ParserConfig,
    input: Vec<Token>,
    eof: Token,
    input_idx: isize,
    errors: Vec<RecognitionException>,
    rule_stack: Vec<RuleId>,
    occurrence_stack: Vec<u32>,
    backtracking: usize,
    recorder: Option<Recorder>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("grammar", &self.grammar.name())
            .field("input_len", &self.input.len())
            .field("input_idx", &self.input_idx)
            .field("errors", &self.errors.len())
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}

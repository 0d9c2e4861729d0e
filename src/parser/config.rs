//! Parser configuration

use crate::tokens::TokenType;

/// Default maximum rule nesting depth
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Decides whether a token of the given type may be synthesized by
/// single-token insertion
pub type InsertionFilter = fn(&TokenType) -> bool;

/// Configuration options for a grammar and the parsers created from it
///
/// Use [`ParserConfig::default()`] for the usual settings:
/// recovery enabled, definition errors reported eagerly, and a nesting
/// limit of [`DEFAULT_MAX_RECURSION_DEPTH`] rules.
///
/// # Example
///
/// ```rust
/// use llkit::parser::ParserConfig;
///
/// let config = ParserConfig::new()
///     .with_recovery(false)
///     .with_max_recursion_depth(200);
/// assert!(!config.recovery_enabled);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Enable single-token insertion/deletion, repetition re-sync and
    /// rule-level re-sync
    pub recovery_enabled: bool,

    /// Keep grammar definition errors on the grammar instead of failing
    /// construction
    pub defer_definition_errors: bool,

    /// Maximum rule nesting depth (0 = unlimited)
    pub max_recursion_depth: usize,

    /// Restricts which token types single-token insertion may create
    pub insertion_filter: Option<InsertionFilter>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            recovery_enabled: true,
            defer_definition_errors: false,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            insertion_filter: None,
        }
    }
}

impl ParserConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable error recovery
    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.recovery_enabled = enabled;
        self
    }

    /// Keep definition errors instead of failing
    pub fn with_deferred_definition_errors(mut self, defer: bool) -> Self {
        self.defer_definition_errors = defer;
        self
    }

    /// Set the maximum rule nesting depth
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Restrict single-token insertion
    pub fn with_insertion_filter(mut self, filter: InsertionFilter) -> Self {
        self.insertion_filter = Some(filter);
        self
    }

    /// Whether a token of `token_type` may be inserted
    pub(crate) fn can_insert(&self, token_type: &TokenType) -> bool {
        self.insertion_filter.map_or(true, |filter| filter(token_type))
    }
}

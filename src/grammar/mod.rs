//! Grammar analysis
//!
//! Everything computed from the static structure of a grammar:
//!
//! - [`gast`] - the grammar AST and the rule arena
//! - [`resolver`] - binding rule references
//! - [`first`] - FIRST sets and optionality
//! - [`rest`] - walking a rule along with what follows each element
//! - [`follow`] - per-call-site follow sets used for resynchronization
//! - [`interpreter`] - path-driven "what comes next" queries
//! - [`lookahead`] - precomputed LL(1) decisions
//! - [`checks`] - structural validations

pub mod checks;
pub mod first;
pub mod follow;
pub mod gast;
pub mod interpreter;
pub mod lookahead;
pub mod resolver;
pub mod rest;

pub use first::{first, first_of_rule, first_of_sequence, is_optional};
pub use follow::{compute_all_prod_follows, FollowKey, FollowSets};
pub use gast::{GastVisitor, Production, ProductionKind, Rule, RuleId, RuleSet};
pub use interpreter::{GrammarPath, TerminalAfter};
pub use lookahead::{AlternativesLookahead, LookaheadKey, LookaheadTable};
pub use resolver::resolve_grammar;

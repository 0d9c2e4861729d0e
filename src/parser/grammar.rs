//! Building and analyzing a grammar
//!
//! [`GrammarBuilder::rule`] records a rule's structure right away;
//! [`GrammarBuilder::analyze`] then runs the one-time analysis:
//!
//! 1. resolve rule references
//! 2. validate (duplicate productions, left recursion, empty alternatives)
//! 3. compute resync follow sets, when nothing failed so far
//! 4. precompute every lookahead decision, reporting ambiguous ORs
//!
//! The result is an immutable [`Grammar`] shared by all parsers of it.

use super::config::ParserConfig;
use super::recorder::Recorder;
use super::{Parser, Rule};
use crate::error::{DefinitionErrors, ParserDefinitionError, ParserDefinitionErrorKind};
use crate::grammar::checks::{validate_grammar, validate_rule_name};
use crate::grammar::follow::{compute_all_prod_follows, FollowKey, FollowSets};
use crate::grammar::gast::{self, RuleId, RuleSet};
use crate::grammar::lookahead::LookaheadTable;
use crate::grammar::resolver::resolve_grammar;
use crate::tokens::{TokenTypeId, TokenVocabulary};
use std::sync::Arc;

/// An analyzed grammar
#[derive(Debug)]
pub struct Grammar {
    name: String,
    vocabulary: Arc<TokenVocabulary>,
    rules: RuleSet,
    definition_errors: Vec<ParserDefinitionError>,
    follows: FollowSets,
    lookahead: LookaheadTable,
    config: ParserConfig,
}

impl Grammar {
    /// An empty grammar over `vocabulary`, used while recording
    pub(crate) fn placeholder(vocabulary: Arc<TokenVocabulary>) -> Self {
        Self {
            name: String::new(),
            vocabulary,
            rules: RuleSet::new(),
            definition_errors: Vec::new(),
            follows: FollowSets::new(),
            lookahead: LookaheadTable::default(),
            config: ParserConfig::default(),
        }
    }

    /// Grammar name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token vocabulary
    pub fn vocabulary(&self) -> &Arc<TokenVocabulary> {
        &self.vocabulary
    }

    /// Recorded rules, references resolved
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Problems found while building the grammar
    pub fn definition_errors(&self) -> &[ParserDefinitionError] {
        &self.definition_errors
    }

    /// Whether any definition problem was found
    pub fn has_definition_errors(&self) -> bool {
        !self.definition_errors.is_empty()
    }

    /// Default configuration of parsers over this grammar
    pub fn config(&self) -> ParserConfig {
        self.config
    }

    /// Precomputed lookahead
    pub fn lookahead(&self) -> &LookaheadTable {
        &self.lookahead
    }

    /// Follow set of a call site; empty when unknown
    pub fn follow_set(&self, key: &FollowKey) -> &[TokenTypeId] {
        self.follows.get(key).map_or(&[], Vec::as_slice)
    }

    /// Id of the rule named `name`
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rules.id(name)
    }

    /// The recorded rules as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let rules: Vec<&gast::Rule> = self.rules.iter().map(|(_, rule)| rule).collect();
        serde_json::to_string_pretty(&rules)
    }

    /// Fail with the definition errors unless `config` defers them
    pub(crate) fn check(&self, config: &ParserConfig) -> Result<(), DefinitionErrors<ParserDefinitionError>> {
        if config.defer_definition_errors {
            return Ok(());
        }
        match DefinitionErrors::from_vec(self.definition_errors.clone()) {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }
}

/// Collects rules and produces a [`Grammar`]
#[derive(Debug)]
pub struct GrammarBuilder {
    name: String,
    vocabulary: Arc<TokenVocabulary>,
    config: ParserConfig,
    recording: Arc<Grammar>,
    rules: Vec<gast::Rule>,
    defined: Vec<String>,
    errors: Vec<ParserDefinitionError>,
}

impl GrammarBuilder {
    /// Start a grammar named `name` over `vocabulary`
    pub fn new(name: impl Into<String>, vocabulary: Arc<TokenVocabulary>) -> Self {
        let recording = Arc::new(Grammar::placeholder(Arc::clone(&vocabulary)));
        Self {
            name: name.into(),
            vocabulary,
            config: ParserConfig::default(),
            recording,
            rules: Vec::new(),
            defined: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a rule, recording its structure
    pub fn rule<T>(mut self, rule: &Rule<T>) -> Self {
        self.errors
            .extend(validate_rule_name(rule.name, &self.defined, &self.name));
        let already_recorded = self.defined.iter().any(|d| d == rule.name);
        self.defined.push(rule.name.to_string());
        if !already_recorded {
            let definition = self.record(rule);
            self.rules.push(gast::Rule::new(rule.name, definition));
        }
        self
    }

    fn record<T>(&mut self, rule: &Rule<T>) -> Vec<gast::Production> {
        let mut parser = Parser::recording(Arc::clone(&self.recording));
        let result = (rule.body)(&mut parser);
        let (definition, errors) = parser
            .take_recorder()
            .unwrap_or_else(Recorder::new)
            .finish();

        self.errors
            .extend(errors.into_iter().map(|e| e.in_rule(rule.name)));
        if let Err(failure) = result {
            self.errors.push(
                ParserDefinitionError::new(
                    ParserDefinitionErrorKind::RecordingFailed,
                    format!(
                        "rule ->{}<- failed while its structure was recorded: {}",
                        rule.name, failure
                    ),
                )
                .in_rule(rule.name),
            );
        }
        definition
    }

    /// Analyze the recorded rules. Never fails: problems are kept on the
    /// grammar, see [`Grammar::definition_errors`].
    pub fn analyze(self) -> Arc<Grammar> {
        let mut rules = RuleSet::new();
        for rule in self.rules {
            rules.add(rule);
        }
        let mut errors = self.errors;

        log_debug!("analyzing grammar {} ({} rules)", self.name, rules.len());

        errors.extend(resolve_grammar(&mut rules));
        errors.extend(validate_grammar(&rules, &self.vocabulary));

        let follows = if errors.is_empty() {
            compute_all_prod_follows(&rules)
        } else {
            FollowSets::new()
        };

        let (lookahead, ambiguities) = LookaheadTable::build(&rules, &self.vocabulary);
        errors.extend(ambiguities);

        if !errors.is_empty() {
            log_debug!("grammar {} has {} definition errors", self.name, errors.len());
        }

        Arc::new(Grammar {
            name: self.name,
            vocabulary: self.vocabulary,
            rules,
            definition_errors: errors,
            follows,
            lookahead,
            config: self.config,
        })
    }

    /// Analyze, failing on definition errors unless the configuration
    /// defers them
    pub fn build(self) -> Result<Arc<Grammar>, DefinitionErrors<ParserDefinitionError>> {
        let config = self.config;
        let grammar = self.analyze();
        grammar.check(&config)?;
        Ok(grammar)
    }
}

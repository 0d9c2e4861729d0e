//! Parser state and DSL operations

use super::config::ParserConfig;
use super::grammar::Grammar;
use super::recorder::Recorder;
use super::{Alt, OrOptions, Parser, Rule, Separated, TokenRef};
use crate::error::{
    DefinitionErrors, ParseFailure, ParseResult, ParserDefinitionError, RecognitionException,
    RecognitionExceptionKind,
};
use crate::grammar::{LookaheadKey, ProductionKind, RuleId};
use crate::tokens::{Token, TokenTypeId, TokenVocabulary};
use std::sync::Arc;

/// Lookahead function of a repetition
pub(super) type Lookahead<'g> = dyn FnMut(&mut Parser) -> ParseResult<bool> + 'g;

impl Parser {
    /// Create a parser over `tokens` with the grammar's configuration.
    ///
    /// Fails with the grammar's definition errors unless they are deferred.
    pub fn new(
        grammar: Arc<Grammar>,
        tokens: Vec<Token>,
    ) -> Result<Self, DefinitionErrors<ParserDefinitionError>> {
        let config = grammar.config();
        Self::with_config(grammar, tokens, config)
    }

    /// Create a parser with an explicit configuration
    pub fn with_config(
        grammar: Arc<Grammar>,
        tokens: Vec<Token>,
        config: ParserConfig,
    ) -> Result<Self, DefinitionErrors<ParserDefinitionError>> {
        grammar.check(&config)?;
        Ok(Self {
            grammar,
            config,
            input: tokens,
            eof: Token::eof(),
            input_idx: -1,
            errors: Vec::new(),
            rule_stack: Vec::new(),
            occurrence_stack: Vec::new(),
            backtracking: 0,
            recorder: None,
        })
    }

    pub(super) fn recording(grammar: Arc<Grammar>) -> Self {
        Self {
            grammar,
            config: ParserConfig::default(),
            input: Vec::new(),
            eof: Token::eof(),
            input_idx: -1,
            errors: Vec::new(),
            rule_stack: Vec::new(),
            occurrence_stack: Vec::new(),
            backtracking: 0,
            recorder: Some(Recorder::new()),
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// The grammar this parser runs
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Token vocabulary of the grammar
    pub fn vocabulary(&self) -> &TokenVocabulary {
        self.grammar.vocabulary()
    }

    /// Active configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Recognition errors saved so far, in order
    pub fn errors(&self) -> &[RecognitionException] {
        &self.errors
    }

    /// Take the saved errors, leaving none
    pub fn take_errors(&mut self) -> Vec<RecognitionException> {
        std::mem::take(&mut self.errors)
    }

    /// The token input
    pub fn input(&self) -> &[Token] {
        &self.input
    }

    /// Replace the input and reset all state
    pub fn set_input(&mut self, tokens: Vec<Token>) {
        self.reset();
        self.input = tokens;
    }

    /// Rewind to the start of the input, clearing errors and rule stacks
    pub fn reset(&mut self) {
        self.input_idx = -1;
        self.errors.clear();
        self.rule_stack.clear();
        self.occurrence_stack.clear();
        self.backtracking = 0;
    }

    /// Whether the whole input has been consumed
    pub fn is_at_end_of_input(&self) -> bool {
        self.la(1).token_type == TokenTypeId::EOF
    }

    /// Whether the structure is being recorded rather than input parsed.
    ///
    /// Rule bodies can use this to skip side effects that need real tokens.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Whether a speculative [`Parser::backtrack`] is in progress
    pub fn is_backtracking(&self) -> bool {
        self.backtracking > 0
    }

    /// Run `f` when parsing; yield `R::default()` while recording
    pub fn action<R: Default>(&mut self, f: impl FnOnce() -> R) -> R {
        if self.is_recording() {
            R::default()
        } else {
            f()
        }
    }

    /// The `k`-th token ahead (`k >= 1`); EOF past the end
    pub fn la(&self, k: usize) -> &Token {
        let idx = self.input_idx + k as isize;
        if idx < 0 {
            return &self.eof;
        }
        self.input.get(idx as usize).unwrap_or(&self.eof)
    }

    /// The next token
    pub fn next_token(&self) -> &Token {
        self.la(1)
    }

    /// Skip one token, returning the new next token. At the last token the
    /// position does not move and EOF is returned.
    pub fn skip_token(&mut self) -> &Token {
        if self.input_idx <= self.input.len() as isize - 2 {
            self.input_idx += 1;
            self.la(1)
        } else {
            &self.eof
        }
    }

    /// Whether the next token can start `rule`
    pub fn is_next_rule<T>(&self, rule: &Rule<T>) -> bool {
        let Some(id) = self.grammar.rule_id(rule.name) else {
            return false;
        };
        let first = self.grammar.lookahead().top_level(id);
        self.vocabulary().is_instance_of_any(self.la(1).token_type, first)
    }

    pub(super) fn save_error(
        &mut self,
        kind: RecognitionExceptionKind,
        message: String,
        token: Token,
    ) -> RecognitionException {
        let rule_stack = self
            .rule_stack
            .iter()
            .map(|&id| self.grammar.rules().name(id).to_string())
            .collect();
        let error = RecognitionException {
            kind,
            message,
            token,
            rule_stack,
        };
        log_debug!("{}", error);
        self.errors.push(error.clone());
        error
    }

    fn resolve_token(&self, token: &impl TokenRef) -> ParseResult<TokenTypeId> {
        token.resolve(self.vocabulary()).ok_or_else(|| {
            ParseFailure::fatal(format!(
                "Unknown token type ->{}<- in grammar ->{}<-",
                token.describe(),
                self.grammar.name()
            ))
        })
    }

    pub(super) fn lookahead_key(&self, kind: ProductionKind, occurrence: u32) -> ParseResult<LookaheadKey> {
        let Some(&rule) = self.rule_stack.last() else {
            return Err(ParseFailure::fatal(format!(
                "{} used outside of a rule",
                kind.dsl_name()
            )));
        };
        Ok(LookaheadKey {
            rule,
            kind,
            occurrence,
        })
    }

    fn missing_lookahead(&self, key: LookaheadKey) -> ParseFailure {
        ParseFailure::fatal(format!(
            "no lookahead for {}{} in rule ->{}<-; the rule body took a path that was not recorded",
            key.kind.dsl_name(),
            key.occurrence,
            self.grammar.rules().name(key.rule)
        ))
    }

    /// Whether the next token starts the body of an option or repetition
    pub(super) fn simple_lookahead(&self, kind: ProductionKind, occurrence: u32) -> ParseResult<bool> {
        let key = self.lookahead_key(kind, occurrence)?;
        match self.grammar.lookahead().simple(key) {
            Some(first) => Ok(self
                .vocabulary()
                .is_instance_of_any(self.la(1).token_type, first)),
            None => Err(self.missing_lookahead(key)),
        }
    }

    fn expected_names(&self, expected: &[TokenTypeId]) -> String {
        let names: Vec<&str> = expected.iter().map(|&t| self.vocabulary().name(t)).collect();
        format!("<{}>", names.join(" ,"))
    }

    // ========================================================================
    // CONSUME
    // ========================================================================

    /// Consume the next token, which must be an instance of `token`
    pub fn consume(&mut self, token: impl TokenRef) -> ParseResult<Token> {
        self.consume_at(1, token)
    }

    /// [`Parser::consume`] with an explicit occurrence index
    pub fn consume_at(&mut self, occurrence: u32, token: impl TokenRef) -> ParseResult<Token> {
        if self.is_recording() {
            let token_type = token.resolve(self.vocabulary());
            return Ok(self.record_terminal(token_type, token.describe(), occurrence));
        }
        let token_type = self.resolve_token(&token)?;
        self.consume_internal(token_type, occurrence)
    }

    pub(super) fn consume_internal(&mut self, token_type: TokenTypeId, occurrence: u32) -> ParseResult<Token> {
        let next = self.la(1);
        if self.vocabulary().is_instance_of(next.token_type, token_type) {
            let token = next.clone();
            self.input_idx += 1;
            return Ok(token);
        }

        let found = next.clone();
        let message = format!(
            "Expecting token of type -->{}<-- but found -->'{}'<--",
            self.vocabulary().name(token_type),
            found.image
        );
        let error = self.save_error(RecognitionExceptionKind::MismatchedToken, message, found);

        if self.config.recovery_enabled && !self.is_backtracking() {
            if let Some(token) = self.try_in_rule_recovery(token_type, occurrence) {
                return Ok(token);
            }
        }
        Err(ParseFailure::Recognition(error))
    }

    // ========================================================================
    // SUBRULE
    // ========================================================================

    /// Parse `rule` as the entry point
    pub fn invoke<T>(&mut self, rule: &Rule<T>) -> ParseResult<T> {
        self.subrule_at(1, rule)
    }

    /// Invoke `rule` from the current rule
    pub fn subrule<T>(&mut self, rule: &Rule<T>) -> ParseResult<T> {
        self.subrule_at(1, rule)
    }

    /// [`Parser::subrule`] with an explicit occurrence index
    pub fn subrule_at<T>(&mut self, occurrence: u32, rule: &Rule<T>) -> ParseResult<T> {
        if self.is_recording() {
            self.record_non_terminal(rule.name, occurrence);
            return Ok((rule.invalid)());
        }
        self.invoke_rule(rule, occurrence)
    }

    pub(super) fn invoke_rule<T>(&mut self, rule: &Rule<T>, occurrence: u32) -> ParseResult<T> {
        let Some(id) = self.grammar.rule_id(rule.name) else {
            return Err(ParseFailure::fatal(format!(
                "rule ->{}<- is not defined in grammar ->{}<-",
                rule.name,
                self.grammar.name()
            )));
        };
        let max_depth = self.config.max_recursion_depth;
        if max_depth > 0 && self.rule_stack.len() >= max_depth {
            return Err(ParseFailure::RecursionLimit {
                depth: self.rule_stack.len() + 1,
                max_depth,
            });
        }

        self.enter_rule(id, occurrence);
        let result = match (rule.body)(self) {
            Ok(value) => Ok(value),
            Err(failure) => self.recover_rule(rule, failure),
        };
        self.exit_rule();
        result
    }

    fn enter_rule(&mut self, id: RuleId, occurrence: u32) {
        self.rule_stack.push(id);
        self.occurrence_stack.push(occurrence);
    }

    fn exit_rule(&mut self) {
        self.rule_stack.pop();
        self.occurrence_stack.pop();

        let last_idx = self.input.len() as isize - 1;
        if self.rule_stack.is_empty() && self.input_idx < last_idx {
            let token = self.la(1).clone();
            let message = format!("Redundant input, expecting EOF but found: {}", token.image);
            self.save_error(RecognitionExceptionKind::NotAllInputParsed, message, token);
        }
    }

    // ========================================================================
    // OPTION
    // ========================================================================

    /// Parse `body` if the next token can start it
    pub fn option<T>(&mut self, body: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<Option<T>> {
        self.option_at(1, body)
    }

    /// [`Parser::option`] with an explicit occurrence index
    pub fn option_at<T>(
        &mut self,
        occurrence: u32,
        body: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Option<T>> {
        if self.is_recording() {
            return self
                .record_scope(ProductionKind::Option, occurrence, None, body)
                .map(Some);
        }
        if self.simple_lookahead(ProductionKind::Option, occurrence)? {
            body(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Parse `body` if `guard` returns `true`
    pub fn option_when<T>(
        &mut self,
        occurrence: u32,
        guard: impl FnOnce(&mut Self) -> ParseResult<bool>,
        body: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Option<T>> {
        if self.is_recording() {
            return self
                .record_scope(ProductionKind::Option, occurrence, None, body)
                .map(Some);
        }
        if guard(self)? {
            body(self).map(Some)
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // MANY / AT_LEAST_ONE
    // ========================================================================

    /// Parse `body` zero or more times
    pub fn many<T>(&mut self, body: impl FnMut(&mut Self) -> ParseResult<T>) -> ParseResult<Vec<T>> {
        self.many_at(1, body)
    }

    /// [`Parser::many`] with an explicit occurrence index
    pub fn many_at<T>(
        &mut self,
        occurrence: u32,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let kind = ProductionKind::Repetition;
        let mut lookahead = move |p: &mut Parser| p.simple_lookahead(kind, occurrence);
        self.repeat(kind, occurrence, &mut lookahead, body, false, None)
    }

    /// Parse `body` for as long as `guard` returns `true`
    pub fn many_when<T>(
        &mut self,
        occurrence: u32,
        mut guard: impl FnMut(&mut Self) -> ParseResult<bool>,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        self.repeat(ProductionKind::Repetition, occurrence, &mut guard, body, false, None)
    }

    /// Parse `body` one or more times
    pub fn at_least_one<T>(&mut self, body: impl FnMut(&mut Self) -> ParseResult<T>) -> ParseResult<Vec<T>> {
        self.at_least_one_at(1, body, None)
    }

    /// [`Parser::at_least_one`] with an explicit occurrence index and an
    /// optional description used when no iteration is found
    pub fn at_least_one_at<T>(
        &mut self,
        occurrence: u32,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
        description: Option<&str>,
    ) -> ParseResult<Vec<T>> {
        let kind = ProductionKind::RepetitionMandatory;
        let mut lookahead = move |p: &mut Parser| p.simple_lookahead(kind, occurrence);
        self.repeat(kind, occurrence, &mut lookahead, body, true, description)
    }

    /// Parse `body` once and then for as long as `guard` returns `true`;
    /// `guard` must hold for the first iteration too
    pub fn at_least_one_when<T>(
        &mut self,
        occurrence: u32,
        mut guard: impl FnMut(&mut Self) -> ParseResult<bool>,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
        description: Option<&str>,
    ) -> ParseResult<Vec<T>> {
        self.repeat(
            ProductionKind::RepetitionMandatory,
            occurrence,
            &mut guard,
            body,
            true,
            description,
        )
    }

    fn repeat<T>(
        &mut self,
        kind: ProductionKind,
        occurrence: u32,
        lookahead: &mut Lookahead<'_>,
        mut body: impl FnMut(&mut Self) -> ParseResult<T>,
        mandatory: bool,
        description: Option<&str>,
    ) -> ParseResult<Vec<T>> {
        if self.is_recording() {
            return self
                .record_scope(kind, occurrence, None, body)
                .map(|value| vec![value]);
        }

        let mut results = Vec::new();
        if mandatory && !lookahead(self)? {
            return Err(self.early_exit(kind, occurrence, description));
        }
        loop {
            while lookahead(self)? {
                results.push(body(self)?);
            }
            if !self.config.recovery_enabled
                || !self.attempt_in_repetition_recovery(kind, occurrence, lookahead)?
            {
                return Ok(results);
            }
        }
    }

    pub(super) fn early_exit(
        &mut self,
        kind: ProductionKind,
        occurrence: u32,
        description: Option<&str>,
    ) -> ParseFailure {
        let expected = match description {
            Some(description) => description.to_string(),
            None => {
                let first = self
                    .lookahead_key(kind, occurrence)
                    .ok()
                    .and_then(|key| self.grammar.lookahead().simple(key))
                    .unwrap_or(&[]);
                self.expected_names(first)
            }
        };
        let token = self.la(1).clone();
        let message = format!("expecting at least one: {}", expected);
        ParseFailure::Recognition(self.save_error(RecognitionExceptionKind::EarlyExit, message, token))
    }

    // ========================================================================
    // MANY_SEP / AT_LEAST_ONE_SEP
    // ========================================================================

    /// Parse zero or more `body`s separated by `separator`
    pub fn many_sep<T>(
        &mut self,
        separator: impl TokenRef,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Separated<T>> {
        self.many_sep_at(1, separator, body)
    }

    /// [`Parser::many_sep`] with an explicit occurrence index
    pub fn many_sep_at<T>(
        &mut self,
        occurrence: u32,
        separator: impl TokenRef,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Separated<T>> {
        let kind = ProductionKind::RepetitionWithSeparator;
        let mut first = move |p: &mut Parser| p.simple_lookahead(kind, occurrence);
        self.repeat_separated(kind, occurrence, separator, &mut first, body, None)
    }

    /// [`Parser::many_sep`] whose first iteration happens when `guard`
    /// returns `true`; later iterations follow the separator
    pub fn many_sep_when<T>(
        &mut self,
        occurrence: u32,
        separator: impl TokenRef,
        mut guard: impl FnMut(&mut Self) -> ParseResult<bool>,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Separated<T>> {
        self.repeat_separated(
            ProductionKind::RepetitionWithSeparator,
            occurrence,
            separator,
            &mut guard,
            body,
            None,
        )
    }

    /// Parse one or more `body`s separated by `separator`
    pub fn at_least_one_sep<T>(
        &mut self,
        separator: impl TokenRef,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Separated<T>> {
        self.at_least_one_sep_at(1, separator, body, None)
    }

    /// [`Parser::at_least_one_sep`] with an explicit occurrence index and an
    /// optional description used when no iteration is found
    pub fn at_least_one_sep_at<T>(
        &mut self,
        occurrence: u32,
        separator: impl TokenRef,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
        description: Option<&str>,
    ) -> ParseResult<Separated<T>> {
        let kind = ProductionKind::RepetitionMandatoryWithSeparator;
        let mut first = move |p: &mut Parser| p.simple_lookahead(kind, occurrence);
        self.repeat_separated(kind, occurrence, separator, &mut first, body, description)
    }

    /// [`Parser::at_least_one_sep`] whose first iteration is decided by
    /// `guard`, which must hold
    pub fn at_least_one_sep_when<T>(
        &mut self,
        occurrence: u32,
        separator: impl TokenRef,
        mut guard: impl FnMut(&mut Self) -> ParseResult<bool>,
        body: impl FnMut(&mut Self) -> ParseResult<T>,
        description: Option<&str>,
    ) -> ParseResult<Separated<T>> {
        self.repeat_separated(
            ProductionKind::RepetitionMandatoryWithSeparator,
            occurrence,
            separator,
            &mut guard,
            body,
            description,
        )
    }

    fn repeat_separated<T>(
        &mut self,
        kind: ProductionKind,
        occurrence: u32,
        separator: impl TokenRef,
        first: &mut Lookahead<'_>,
        mut body: impl FnMut(&mut Self) -> ParseResult<T>,
        description: Option<&str>,
    ) -> ParseResult<Separated<T>> {
        let mandatory = kind == ProductionKind::RepetitionMandatoryWithSeparator;

        if self.is_recording() {
            let separator_type = separator.resolve(self.vocabulary());
            if separator_type.is_none() {
                self.record_unknown_separator(kind, occurrence, separator.describe());
            }
            return self
                .record_scope(kind, occurrence, separator_type, body)
                .map(|value| Separated {
                    items: vec![value],
                    separators: Vec::new(),
                });
        }

        let separator = self.resolve_token(&separator)?;
        let mut result = Separated::default();

        if !first(self)? {
            if mandatory {
                return Err(self.early_exit(kind, occurrence, description));
            }
            return Ok(result);
        }
        result.items.push(body(self)?);

        let mut separator_ahead = move |p: &mut Parser| -> ParseResult<bool> {
            Ok(p.vocabulary().is_instance_of(p.la(1).token_type, separator))
        };
        loop {
            while separator_ahead(self)? {
                result.separators.push(self.consume_internal(separator, 1)?);
                result.items.push(body(self)?);
            }
            if !self.config.recovery_enabled
                || !self.attempt_in_repetition_recovery(kind, occurrence, &mut separator_ahead)?
            {
                return Ok(result);
            }
        }
    }

    // ========================================================================
    // OR
    // ========================================================================

    /// Parse the first alternative that matches the next token
    pub fn or<T>(&mut self, alternatives: Vec<Alt<'_, T>>) -> ParseResult<T> {
        self.or_with(1, alternatives, OrOptions::default())
    }

    /// [`Parser::or`] with an explicit occurrence index
    pub fn or_at<T>(&mut self, occurrence: u32, alternatives: Vec<Alt<'_, T>>) -> ParseResult<T> {
        self.or_with(occurrence, alternatives, OrOptions::default())
    }

    /// [`Parser::or`] with an explicit occurrence index and options
    pub fn or_with<T>(
        &mut self,
        occurrence: u32,
        mut alternatives: Vec<Alt<'_, T>>,
        options: OrOptions,
    ) -> ParseResult<T> {
        if self.is_recording() {
            return self.record_or(occurrence, &mut alternatives, &options);
        }

        let explicit = alternatives.first().is_some_and(|alt| alt.guard.is_some());
        if explicit {
            for alt in alternatives.iter_mut() {
                let take = match alt.guard.as_mut() {
                    Some(guard) => guard(self)?,
                    None => true,
                };
                if take {
                    return (alt.body)(self);
                }
            }
            return Err(self.no_viable_alternative(occurrence, &options));
        }

        let key = self.lookahead_key(ProductionKind::Alternation, occurrence)?;
        let choice = match self.grammar.lookahead().alternatives(key) {
            Some(lookahead) => lookahead.choose(self.la(1).token_type, self.vocabulary()),
            None => return Err(self.missing_lookahead(key)),
        };
        match choice.and_then(|idx| alternatives.get_mut(idx)) {
            Some(alt) => (alt.body)(self),
            None => Err(self.no_viable_alternative(occurrence, &options)),
        }
    }

    fn no_viable_alternative(&mut self, occurrence: u32, options: &OrOptions) -> ParseFailure {
        let expected = match &options.description {
            Some(description) => description.clone(),
            None => {
                let first = self
                    .lookahead_key(ProductionKind::Alternation, occurrence)
                    .ok()
                    .and_then(|key| self.grammar.lookahead().alternatives(key))
                    .map(|lookahead| lookahead.expected())
                    .unwrap_or_default();
                format!("one of: {}", self.expected_names(&first))
            }
        };
        let token = self.la(1).clone();
        let message = format!("expecting: {} but found: '{}'", expected, token.image);
        ParseFailure::Recognition(self.save_error(RecognitionExceptionKind::NoViableAlt, message, token))
    }

    // ========================================================================
    // BACKTRACK
    // ========================================================================

    /// Speculatively parse `rule` from the current position, then restore
    /// every bit of state. Returns whether the rule parsed without a
    /// recognition error and `is_valid` accepted its value.
    ///
    /// Always `false` while recording.
    pub fn backtrack<T>(&mut self, rule: &Rule<T>, is_valid: impl FnOnce(&T) -> bool) -> ParseResult<bool> {
        if self.is_recording() {
            return Ok(false);
        }

        self.backtracking += 1;
        let saved_errors = self.errors.clone();
        let saved_idx = self.input_idx;
        let saved_rules = self.rule_stack.clone();
        let saved_occurrences = self.occurrence_stack.clone();

        let outcome = self.invoke_rule(rule, 1);

        self.errors = saved_errors;
        self.input_idx = saved_idx;
        self.rule_stack = saved_rules;
        self.occurrence_stack = saved_occurrences;
        self.backtracking -= 1;

        match outcome {
            Ok(value) => Ok(is_valid(&value)),
            Err(failure) if failure.is_recognition() => Ok(false),
            Err(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GrammarBuilder;
    use crate::tokens::{TokenTypeDef, TokenVocabulary};

    fn vocab() -> Arc<TokenVocabulary> {
        Arc::new(
            TokenVocabulary::new(vec![
                TokenTypeDef::new("A", "a"),
                TokenTypeDef::new("B", "b"),
                TokenTypeDef::new("C", "c"),
            ])
            .unwrap(),
        )
    }

    fn tokens(v: &TokenVocabulary, names: &[&str]) -> Vec<Token> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Token::new(v.id(n).unwrap(), n.to_lowercase(), i as isize, 1, i as isize + 1))
            .collect()
    }

    static AB: Rule<Vec<String>> = Rule::new("ab", ab);

    fn ab(p: &mut Parser) -> ParseResult<Vec<String>> {
        let a = p.consume("A")?;
        let bs = p.many(|p| p.consume("B"))?;
        let mut out = vec![a.image];
        out.extend(bs.into_iter().map(|t| t.image));
        Ok(out)
    }

    #[test]
    fn test_la_and_skip_token() {
        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v)).rule(&AB).build().unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["A", "B"])).unwrap();
        assert_eq!(parser.la(1).image, "a");
        assert_eq!(parser.la(2).image, "b");
        assert_eq!(parser.la(3).token_type, TokenTypeId::EOF);
        assert_eq!(parser.skip_token().image, "b");
        // at the last token skipping does not move
        assert_eq!(parser.skip_token().token_type, TokenTypeId::EOF);
        assert_eq!(parser.la(1).image, "b");
    }

    #[test]
    fn test_parse_and_reset() {
        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v)).rule(&AB).build().unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["A", "B", "B"])).unwrap();
        assert_eq!(parser.invoke(&AB).unwrap(), vec!["a", "b", "b"]);
        assert!(parser.is_at_end_of_input());

        parser.reset();
        assert!(!parser.is_at_end_of_input());
        assert_eq!(parser.invoke(&AB).unwrap().len(), 3);
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_redundant_input() {
        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v)).rule(&AB).build().unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["A", "C"])).unwrap();
        parser.invoke(&AB).unwrap();
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].kind, RecognitionExceptionKind::NotAllInputParsed);
        assert_eq!(parser.errors()[0].message, "Redundant input, expecting EOF but found: c");
    }

    #[test]
    fn test_is_next_rule() {
        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v)).rule(&AB).build().unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["A"])).unwrap();
        assert!(parser.is_next_rule(&AB));
        parser.set_input(tokens(&v, &["B"]));
        assert!(!parser.is_next_rule(&AB));
    }

    #[test]
    fn test_action_skipped_while_recording() {
        static COUNTED: Rule<usize> = Rule::new("counted", counted);
        fn counted(p: &mut Parser) -> ParseResult<usize> {
            let t = p.consume("A")?;
            Ok(p.action(|| t.image.len() + 1))
        }

        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v)).rule(&COUNTED).build().unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["A"])).unwrap();
        assert_eq!(parser.invoke(&COUNTED).unwrap(), 2);
    }

    #[test]
    fn test_unknown_rule_is_fatal() {
        static OTHER: Rule<()> = Rule::new("other", other);
        fn other(p: &mut Parser) -> ParseResult<()> {
            p.consume("C").map(|_| ())
        }

        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v)).rule(&AB).build().unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["C"])).unwrap();
        assert!(matches!(parser.invoke(&OTHER), Err(ParseFailure::Fatal(_))));
    }

    #[test]
    fn test_recursion_limit() {
        static NESTED: Rule<()> = Rule::new("nested", nested);
        fn nested(p: &mut Parser) -> ParseResult<()> {
            p.consume("A")?;
            p.option(|p| p.subrule(&NESTED))?;
            Ok(())
        }

        let v = vocab();
        let grammar = GrammarBuilder::new("G", Arc::clone(&v))
            .with_config(ParserConfig::new().with_max_recursion_depth(3))
            .rule(&NESTED)
            .build()
            .unwrap();
        let mut parser = Parser::new(grammar, tokens(&v, &["A", "A", "A", "A"])).unwrap();
        assert!(matches!(
            parser.invoke(&NESTED),
            Err(ParseFailure::RecursionLimit { max_depth: 3, .. })
        ));
    }
}

//! Error recovery
//!
//! Three strategies, tried from the most local to the most global:
//!
//! - in-rule: a mismatched CONSUME either pretends the expected token was
//!   there (single-token insertion) or drops one unexpected token
//!   (single-token deletion);
//! - in-repetition: when a repetition stops early, skip ahead to the next
//!   position where another iteration can start, and continue it;
//! - rule-level: a rule that failed skips input up to a token that may follow
//!   it and returns its recovery value.

use super::runtime::Lookahead;
use super::{Parser, Rule};
use crate::error::{ParseFailure, ParseResult, RecognitionExceptionKind};
use crate::grammar::follow::FollowKey;
use crate::grammar::interpreter::{next_after_token, GrammarPath};
use crate::grammar::ProductionKind;
use crate::tokens::{Token, TokenTypeId};

const EOF_FOLLOW: &[TokenTypeId] = &[TokenTypeId::EOF];

impl Parser {
    // ========================================================================
    // In-rule recovery
    // ========================================================================

    /// Try single-token insertion, then single-token deletion
    pub(super) fn try_in_rule_recovery(&mut self, expected: TokenTypeId, occurrence: u32) -> Option<Token> {
        let follows = self.follows_after_token(expected, occurrence);

        if self.can_recover_with_single_token_insertion(expected, &follows) {
            log_debug!(
                "inserting virtual {} before '{}'",
                self.vocabulary().name(expected),
                self.la(1).image
            );
            let mut token = Token::virtual_token(expected);
            token.is_inserted_in_recovery = true;
            return Some(token);
        }

        if self.can_recover_with_single_token_deletion(expected) {
            log_debug!("deleting unexpected '{}'", self.la(1).image);
            self.skip_token();
            let token = self.la(1).clone();
            self.input_idx += 1;
            return Some(token);
        }

        None
    }

    fn follows_after_token(&self, expected: TokenTypeId, occurrence: u32) -> Vec<TokenTypeId> {
        let path = GrammarPath {
            rule_stack: self.rule_stack.clone(),
            occurrence_stack: self.occurrence_stack.clone(),
        };
        next_after_token(self.grammar.rules(), &path, expected, occurrence)
    }

    fn can_recover_with_single_token_insertion(&self, expected: TokenTypeId, follows: &[TokenTypeId]) -> bool {
        let insertable = self
            .vocabulary()
            .get(expected)
            .is_some_and(|token_type| self.config.can_insert(token_type));
        insertable
            && !follows.is_empty()
            && self
                .vocabulary()
                .is_instance_of_any(self.la(1).token_type, follows)
    }

    fn can_recover_with_single_token_deletion(&self, expected: TokenTypeId) -> bool {
        self.vocabulary()
            .is_instance_of(self.la(2).token_type, expected)
    }

    fn can_perform_in_rule_recovery(&self, expected: TokenTypeId, follows: &[TokenTypeId]) -> bool {
        self.can_recover_with_single_token_insertion(expected, follows)
            || self.can_recover_with_single_token_deletion(expected)
    }

    // ========================================================================
    // In-repetition recovery
    // ========================================================================

    /// Called when a repetition stopped. Returns `true` when input was
    /// skipped up to a new iteration, which the caller then continues.
    pub(super) fn attempt_in_repetition_recovery(
        &mut self,
        kind: ProductionKind,
        occurrence: u32,
        lookahead: &mut Lookahead<'_>,
    ) -> ParseResult<bool> {
        let key = self.lookahead_key(kind, occurrence)?;
        let after = self.grammar.lookahead().terminal_after(key).unwrap_or_default();

        let mut expected = after.token;
        if expected.is_none() && after.is_end_of_rule && self.rule_stack.len() == 1 {
            expected = Some((TokenTypeId::EOF, 1));
        }
        let Some((expected_type, expected_occurrence)) = expected else {
            return Ok(false);
        };

        if !self.should_try_in_repetition_recovery(expected_type, expected_occurrence) {
            return Ok(false);
        }
        self.try_in_repetition_recovery(expected_type, lookahead)
    }

    fn should_try_in_repetition_recovery(&self, expected: TokenTypeId, occurrence: u32) -> bool {
        if self.is_backtracking() {
            return false;
        }
        // the repetition ended where it should have
        if self
            .vocabulary()
            .is_instance_of(self.la(1).token_type, expected)
        {
            return false;
        }
        let follows = self.follows_after_token(expected, occurrence);
        !self.can_perform_in_rule_recovery(expected, &follows)
    }

    fn try_in_repetition_recovery(
        &mut self,
        expected: TokenTypeId,
        lookahead: &mut Lookahead<'_>,
    ) -> ParseResult<bool> {
        let resync_type = self.find_resync_token_type();
        let org_idx = self.input_idx;
        let token_without_resync = self.la(1).clone();
        let mut current = token_without_resync.token_type;

        loop {
            if lookahead(self)? {
                let message = format!(
                    "Expecting token of type -->{}<-- but found -->'{}'<--",
                    self.vocabulary().name(expected),
                    token_without_resync.image
                );
                log_debug!(
                    "repetition resumed after skipping {} tokens",
                    self.input_idx - org_idx
                );
                self.save_error(
                    RecognitionExceptionKind::MismatchedToken,
                    message,
                    token_without_resync,
                );
                return Ok(true);
            }
            if self.vocabulary().is_instance_of(current, resync_type) {
                break;
            }
            let before = self.input_idx;
            current = self.skip_token().token_type;
            if self.input_idx == before {
                break;
            }
        }

        self.input_idx = org_idx;
        Ok(false)
    }

    // ========================================================================
    // Rule-level recovery
    // ========================================================================

    /// Handle a failure escaping a rule body
    pub(super) fn recover_rule<T>(&mut self, rule: &Rule<T>, failure: ParseFailure) -> ParseResult<T> {
        let is_first_invoked_rule = self.rule_stack.len() == 1;
        // no re-sync while backtracking, even for an outermost rule
        let resync_enabled = !self.is_backtracking()
            && (is_first_invoked_rule || (rule.resync && self.config.recovery_enabled));

        if resync_enabled && failure.is_recognition() {
            let resync_type = self.find_resync_token_type();
            if self.is_in_current_rule_resync_set(resync_type) {
                log_debug!(
                    "rule {} resyncing to {}",
                    rule.name,
                    self.vocabulary().name(resync_type)
                );
                self.resync_to(resync_type);
                return Ok((rule.invalid)());
            }
        }
        Err(failure)
    }

    /// Follow set of the call at `level` of the rule stack; the entry rule
    /// is followed by EOF
    fn follow_set_at(&self, level: usize) -> &[TokenTypeId] {
        if level == 0 {
            return EOF_FOLLOW;
        }
        match (
            self.rule_stack.get(level),
            self.occurrence_stack.get(level),
            self.rule_stack.get(level - 1),
        ) {
            (Some(&rule), Some(&occurrence), Some(&in_rule)) => self.grammar.follow_set(&FollowKey {
                rule,
                occurrence,
                in_rule,
            }),
            _ => &[],
        }
    }

    /// Everything that may follow any rule on the stack
    pub(super) fn flattened_follows(&self) -> Vec<TokenTypeId> {
        let mut all = EOF_FOLLOW.to_vec();
        for level in 1..self.rule_stack.len() {
            for &token_type in self.follow_set_at(level) {
                if !all.contains(&token_type) {
                    all.push(token_type);
                }
            }
        }
        all
    }

    /// Exact type of the nearest upcoming token that may follow some rule
    /// on the stack
    fn find_resync_token_type(&self) -> TokenTypeId {
        let follows = self.flattened_follows();
        let mut k = 1;
        loop {
            let token_type = self.la(k).token_type;
            if follows.contains(&token_type) {
                return token_type;
            }
            k += 1;
        }
    }

    fn is_in_current_rule_resync_set(&self, token_type: TokenTypeId) -> bool {
        let level = self.rule_stack.len().saturating_sub(1);
        self.follow_set_at(level).contains(&token_type)
    }

    fn resync_to(&mut self, token_type: TokenTypeId) {
        loop {
            if self
                .vocabulary()
                .is_instance_of(self.la(1).token_type, token_type)
            {
                return;
            }
            let before = self.input_idx;
            self.skip_token();
            if self.input_idx == before {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GrammarBuilder;
    use crate::tokens::{TokenTypeDef, TokenVocabulary};
    use std::sync::Arc;

    static OUTER: Rule<()> = Rule::new("outer", outer);
    static INNER: Rule<()> = Rule::new("inner", inner);

    fn outer(p: &mut Parser) -> ParseResult<()> {
        p.consume("LParen")?;
        p.subrule(&INNER)?;
        p.consume("RParen")?;
        Ok(())
    }

    fn inner(p: &mut Parser) -> ParseResult<()> {
        p.consume("Ident")?;
        Ok(())
    }

    fn setup(names: &[&str]) -> Parser {
        let vocab = Arc::new(
            TokenVocabulary::new(vec![
                TokenTypeDef::new("LParen", "\\("),
                TokenTypeDef::new("RParen", "\\)"),
                TokenTypeDef::new("Ident", "[a-z]+"),
            ])
            .unwrap(),
        );
        let grammar = GrammarBuilder::new("Parens", Arc::clone(&vocab))
            .rule(&OUTER)
            .rule(&INNER)
            .build()
            .unwrap();
        let tokens = names
            .iter()
            .enumerate()
            .map(|(i, n)| Token::new(vocab.id(n).unwrap(), *n, i as isize, 1, i as isize + 1))
            .collect();
        Parser::new(grammar, tokens).unwrap()
    }

    #[test]
    fn test_flattened_follows_include_eof_and_callers() {
        let mut parser = setup(&["LParen"]);
        let outer = parser.grammar().rule_id("outer").unwrap();
        let inner = parser.grammar().rule_id("inner").unwrap();
        parser.rule_stack = vec![outer, inner];
        parser.occurrence_stack = vec![1, 1];
        let rparen = parser.vocabulary().id("RParen").unwrap();
        assert_eq!(parser.flattened_follows(), vec![TokenTypeId::EOF, rparen]);
    }

    #[test]
    fn test_inner_rule_resyncs_to_caller_follow() {
        // ( ( ) : inner sees a second LParen, deletion is impossible and
        // RParen follows inner, so inner resyncs without skipping it
        let mut parser = setup(&["LParen", "LParen", "LParen", "RParen"]);
        parser.invoke(&OUTER).unwrap();
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].kind, RecognitionExceptionKind::MismatchedToken);
        assert_eq!(parser.errors()[0].rule_stack, vec!["outer", "inner"]);
        assert!(parser.is_at_end_of_input());
    }
}

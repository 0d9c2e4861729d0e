//! Grammar interpretation along a rule-invocation path
//!
//! These walkers answer "what may come next" questions that the runtime asks
//! during recovery and that lookahead construction asks once per construct:
//!
//! * [`next_after_token`] follows a path of nested rule calls down to a given
//!   terminal and returns what may follow it;
//! * [`first_inside`] returns the FIRST set of a repetition or option body;
//! * [`alternatives_first`] returns the FIRST set of each OR alternative;
//! * [`terminal_after`] finds the terminal right after a repetition.

use super::first::first_of_sequence;
use super::gast::{Production, ProductionKind, RuleId, RuleSet};
use super::rest::{
    concat_rest, walk_or_default, walk_repetition_default, walk_sequence_default, RestWalker,
};
use crate::tokens::TokenTypeId;

/// Rule calls currently active, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarPath {
    /// Invoked rules
    pub rule_stack: Vec<RuleId>,
    /// Occurrence index each rule was invoked with
    pub occurrence_stack: Vec<u32>,
}

impl GrammarPath {
    /// A path made of a single rule
    pub fn single(rule: RuleId) -> Self {
        Self {
            rule_stack: vec![rule],
            occurrence_stack: vec![1],
        }
    }
}

/// What a possible-tokens walk is looking for at the end of its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathTarget {
    AfterToken {
        token_type: TokenTypeId,
        occurrence: u32,
    },
    Inside {
        kind: ProductionKind,
        occurrence: u32,
    },
}

struct NextPossibleTokensWalker<'a> {
    rules: &'a RuleSet,
    target: PathTarget,
    rule_stack: Vec<RuleId>,
    occurrence_stack: Vec<u32>,
    next_rule: Option<RuleId>,
    next_occurrence: u32,
    is_at_end_of_path: bool,
    found: bool,
    possible: Vec<TokenTypeId>,
}

impl<'a> NextPossibleTokensWalker<'a> {
    fn new(rules: &'a RuleSet, path: &GrammarPath, target: PathTarget) -> Self {
        // reversed so the outermost call is popped first
        let mut rule_stack: Vec<RuleId> = path.rule_stack.iter().rev().copied().collect();
        let mut occurrence_stack: Vec<u32> = path.occurrence_stack.iter().rev().copied().collect();
        rule_stack.pop();
        occurrence_stack.pop();

        let mut walker = Self {
            rules,
            target,
            rule_stack,
            occurrence_stack,
            next_rule: None,
            next_occurrence: 0,
            is_at_end_of_path: false,
            found: false,
            possible: Vec::new(),
        };
        walker.update_expected_next();
        walker
    }

    fn update_expected_next(&mut self) {
        match (self.rule_stack.pop(), self.occurrence_stack.pop()) {
            (Some(rule), Some(occurrence)) => {
                self.next_rule = Some(rule);
                self.next_occurrence = occurrence;
            }
            _ => {
                self.next_rule = None;
                self.next_occurrence = 0;
                self.is_at_end_of_path = true;
            }
        }
    }

    fn try_inside(&mut self, kind: ProductionKind, prod: &Production) -> bool {
        match self.target {
            PathTarget::Inside {
                kind: wanted,
                occurrence,
            } if wanted == kind
                && self.is_at_end_of_path
                && !self.found
                && prod.occurrence() == Some(occurrence) =>
            {
                self.possible = first_of_sequence(prod.definition(), self.rules);
                self.found = true;
                true
            }
            _ => false,
        }
    }
}

impl RestWalker for NextPossibleTokensWalker<'_> {
    fn is_done(&self) -> bool {
        self.found
    }

    fn walk_prod_ref(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        let Production::NonTerminal {
            occurrence,
            resolved: Some(rule),
            ..
        } = prod
        else {
            return;
        };
        if self.next_rule == Some(*rule) && self.next_occurrence == *occurrence {
            let full_rest = concat_rest(curr_rest, prev_rest);
            self.update_expected_next();
            let rules = self.rules;
            self.walk(rules.definition(*rule), &full_rest);
        }
    }

    fn walk_terminal(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        let PathTarget::AfterToken {
            token_type,
            occurrence,
        } = self.target
        else {
            return;
        };
        let Production::Terminal {
            token_type: actual,
            occurrence: actual_occurrence,
        } = prod
        else {
            return;
        };
        if self.is_at_end_of_path
            && !self.found
            && *actual == token_type
            && *actual_occurrence == occurrence
        {
            self.possible = first_of_sequence(&concat_rest(curr_rest, prev_rest), self.rules);
            self.found = true;
        }
    }

    fn walk_option(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        if !self.try_inside(ProductionKind::Option, prod) {
            walk_sequence_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        if !self.try_inside(ProductionKind::Repetition, prod) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition_mandatory(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.try_inside(ProductionKind::RepetitionMandatory, prod) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition_with_separator(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.try_inside(ProductionKind::RepetitionWithSeparator, prod) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition_mandatory_with_separator(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.try_inside(ProductionKind::RepetitionMandatoryWithSeparator, prod) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }
}

fn possible_tokens(rules: &RuleSet, path: &GrammarPath, target: PathTarget) -> Vec<TokenTypeId> {
    let Some(&top) = path.rule_stack.first() else {
        return Vec::new();
    };
    let mut walker = NextPossibleTokensWalker::new(rules, path, target);
    walker.walk(rules.definition(top), &[]);
    walker.possible
}

/// Token types that may follow the terminal `token_type`/`occurrence` reached
/// through `path`.
///
/// Only the rest of the outermost rule is considered: what follows the
/// outermost rule itself is unknown here, so a terminal at the very end of
/// the path yields an empty set.
pub fn next_after_token(
    rules: &RuleSet,
    path: &GrammarPath,
    token_type: TokenTypeId,
    occurrence: u32,
) -> Vec<TokenTypeId> {
    possible_tokens(
        rules,
        path,
        PathTarget::AfterToken {
            token_type,
            occurrence,
        },
    )
}

/// FIRST set of the body of the option or repetition `kind`/`occurrence`
/// inside `rule`. Any other kind yields an empty set.
pub fn first_inside(
    rules: &RuleSet,
    rule: RuleId,
    kind: ProductionKind,
    occurrence: u32,
) -> Vec<TokenTypeId> {
    possible_tokens(
        rules,
        &GrammarPath::single(rule),
        PathTarget::Inside { kind, occurrence },
    )
}

struct AlternativesWalker<'a> {
    rules: &'a RuleSet,
    occurrence: u32,
    result: Option<Vec<Vec<TokenTypeId>>>,
}

impl RestWalker for AlternativesWalker<'_> {
    fn is_done(&self) -> bool {
        self.result.is_some()
    }

    fn walk_or(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        match prod {
            Production::Alternation {
                alternatives,
                occurrence,
                ..
            } if *occurrence == self.occurrence => {
                self.result = Some(
                    alternatives
                        .iter()
                        .map(|alt| first_of_sequence(alt, self.rules))
                        .collect(),
                );
            }
            _ => walk_or_default(self, prod, curr_rest, prev_rest),
        }
    }
}

/// FIRST set of each alternative of the OR with `occurrence` inside `rule`;
/// empty when there is no such OR
pub fn alternatives_first(rules: &RuleSet, rule: RuleId, occurrence: u32) -> Vec<Vec<TokenTypeId>> {
    let mut walker = AlternativesWalker {
        rules,
        occurrence,
        result: None,
    };
    walker.walk(rules.definition(rule), &[]);
    walker.result.unwrap_or_default()
}

/// The grammar element right after a repetition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalAfter {
    /// The terminal (type and occurrence) that directly follows, if the next
    /// element is a terminal
    pub token: Option<(TokenTypeId, u32)>,
    /// Nothing follows the repetition inside its rule
    pub is_end_of_rule: bool,
}

struct TerminalAfterWalker {
    kind: ProductionKind,
    occurrence: u32,
    result: Option<TerminalAfter>,
}

impl TerminalAfterWalker {
    fn check(&mut self, kind: ProductionKind, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) -> bool {
        if kind != self.kind || prod.occurrence() != Some(self.occurrence) || self.result.is_some() {
            return false;
        }
        let head = curr_rest.first().or_else(|| prev_rest.first());
        let token = match head {
            Some(Production::Terminal {
                token_type,
                occurrence,
            }) => Some((*token_type, *occurrence)),
            _ => None,
        };
        self.result = Some(TerminalAfter {
            token,
            is_end_of_rule: head.is_none(),
        });
        true
    }
}

impl RestWalker for TerminalAfterWalker {
    fn is_done(&self) -> bool {
        self.result.is_some()
    }

    fn walk_repetition(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        if !self.check(ProductionKind::Repetition, prod, curr_rest, prev_rest) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition_mandatory(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(ProductionKind::RepetitionMandatory, prod, curr_rest, prev_rest) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition_with_separator(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(ProductionKind::RepetitionWithSeparator, prod, curr_rest, prev_rest) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }

    fn walk_repetition_mandatory_with_separator(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(
            ProductionKind::RepetitionMandatoryWithSeparator,
            prod,
            curr_rest,
            prev_rest,
        ) {
            walk_repetition_default(self, prod, curr_rest, prev_rest);
        }
    }
}

/// The element after the repetition `kind`/`occurrence` inside `rule`
pub fn terminal_after(
    rules: &RuleSet,
    rule: RuleId,
    kind: ProductionKind,
    occurrence: u32,
) -> TerminalAfter {
    let mut walker = TerminalAfterWalker {
        kind,
        occurrence,
        result: None,
    };
    walker.walk(rules.definition(rule), &[]);
    walker.result.unwrap_or_default()
}

//! LL(1) lookahead tables
//!
//! Every OPTION, repetition and OR of every rule gets its lookahead computed
//! once, when the grammar is built. At parse time the runtime only does a
//! table lookup and an instance-of test on the next token.

use super::first::first_of_sequence;
use super::gast::{walk_rule, GastVisitor, Production, ProductionKind, RuleId, RuleSet};
use super::interpreter::{alternatives_first, first_inside, terminal_after, TerminalAfter};
use crate::error::{ParserDefinitionError, ParserDefinitionErrorKind};
use crate::tokens::{TokenTypeId, TokenVocabulary};
use hashbrown::HashMap;

/// Identifies one occurrence-indexed construct of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookaheadKey {
    /// Rule containing the construct
    pub rule: RuleId,
    /// Construct kind
    pub kind: ProductionKind,
    /// Occurrence index
    pub occurrence: u32,
}

/// Lookahead of an OR: the FIRST set of each alternative
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlternativesLookahead {
    /// FIRST set per alternative
    pub alternatives: Vec<Vec<TokenTypeId>>,
    /// The last alternative matches nothing and is taken by default
    pub has_default: bool,
}

impl AlternativesLookahead {
    /// Build from per-alternative FIRST sets
    pub fn new(alternatives: Vec<Vec<TokenTypeId>>) -> Self {
        let has_default = alternatives.last().is_some_and(|last| last.is_empty());
        Self {
            alternatives,
            has_default,
        }
    }

    /// Index of the first alternative that may start with `next`.
    ///
    /// Falls back to an empty last alternative when one exists.
    pub fn choose(&self, next: TokenTypeId, vocabulary: &TokenVocabulary) -> Option<usize> {
        let candidates = if self.has_default {
            self.alternatives.len() - 1
        } else {
            self.alternatives.len()
        };
        self.alternatives[..candidates]
            .iter()
            .position(|first| vocabulary.is_instance_of_any(next, first))
            .or_else(|| self.has_default.then(|| self.alternatives.len() - 1))
    }

    /// Every token type that can start some alternative, in order
    pub fn expected(&self) -> Vec<TokenTypeId> {
        let mut all = Vec::new();
        for &token_type in self.alternatives.iter().flatten() {
            if !all.contains(&token_type) {
                all.push(token_type);
            }
        }
        all
    }
}

/// A token type that starts several alternatives of one OR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// The shared token type
    pub token_type: TokenTypeId,
    /// 1-based indices of the alternatives it starts
    pub alternatives: Vec<usize>,
}

/// Find token types shared by the FIRST sets of several alternatives.
///
/// Comparison is by exact type; categories are not expanded.
pub fn check_alternatives_ambiguities(alternatives: &[Vec<TokenTypeId>]) -> Vec<Ambiguity> {
    let mut seen = Vec::new();
    for &token_type in alternatives.iter().flatten() {
        if !seen.contains(&token_type) {
            seen.push(token_type);
        }
    }

    seen.into_iter()
        .filter_map(|token_type| {
            let in_alts: Vec<usize> = alternatives
                .iter()
                .enumerate()
                .filter(|(_, first)| first.contains(&token_type))
                .map(|(idx, _)| idx + 1)
                .collect();
            (in_alts.len() > 1).then_some(Ambiguity {
                token_type,
                alternatives: in_alts,
            })
        })
        .collect()
}

fn ambiguity_error(
    rule_name: &str,
    occurrence: u32,
    ambiguities: &[Ambiguity],
    vocabulary: &TokenVocabulary,
) -> ParserDefinitionError {
    let details: Vec<String> = ambiguities
        .iter()
        .map(|ambiguity| {
            let alts: Vec<String> = ambiguity.alternatives.iter().map(|a| a.to_string()).collect();
            format!(
                "Ambiguous alternatives: <{}> in <OR{}> inside <{}> Rule, <{}> may appears as the first Terminal in all these alternatives.\n",
                alts.join(" ,"),
                occurrence,
                rule_name,
                vocabulary.name(ambiguity.token_type)
            )
        })
        .collect();

    let message = format!(
        "{}\nTo Resolve this, either: \n\
         1. refactor your grammar to be LL(1)\n\
         2. provide explicit lookahead guards with Alt::when\n\
         3. mark this OR with OrOptions::ignore_ambiguities()\n\
         In that case the parser will always pick the first alternative that matches and ignore all the others",
        details.join("\n ---------------- \n")
    );

    ParserDefinitionError::new(ParserDefinitionErrorKind::AmbiguousAlternatives, message)
        .in_rule(rule_name)
        .at_production("OR", occurrence)
}

#[derive(Default)]
struct KeyCollector {
    found: Vec<(ProductionKind, u32, bool)>,
}

impl KeyCollector {
    fn add(&mut self, prod: &Production, ignore_ambiguities: bool) {
        if let (Some(kind), Some(occurrence)) = (prod.kind(), prod.occurrence()) {
            self.found.push((kind, occurrence, ignore_ambiguities));
        }
    }
}

impl GastVisitor for KeyCollector {
    fn visit_option(&mut self, prod: &Production) {
        self.add(prod, false);
    }
    fn visit_repetition(&mut self, prod: &Production) {
        self.add(prod, false);
    }
    fn visit_repetition_mandatory(&mut self, prod: &Production) {
        self.add(prod, false);
    }
    fn visit_repetition_with_separator(&mut self, prod: &Production) {
        self.add(prod, false);
    }
    fn visit_repetition_mandatory_with_separator(&mut self, prod: &Production) {
        self.add(prod, false);
    }
    fn visit_alternation(&mut self, prod: &Production) {
        if let Production::Alternation {
            ignore_ambiguities, ..
        } = prod
        {
            self.add(prod, *ignore_ambiguities);
        }
    }
}

/// Precomputed lookahead for every construct of a grammar
#[derive(Debug, Clone, Default)]
pub struct LookaheadTable {
    simple: HashMap<LookaheadKey, Vec<TokenTypeId>>,
    alternatives: HashMap<LookaheadKey, AlternativesLookahead>,
    after_repetition: HashMap<LookaheadKey, TerminalAfter>,
    top_level: Vec<Vec<TokenTypeId>>,
}

impl LookaheadTable {
    /// Compute all lookahead of `rules`, reporting OR ambiguities
    pub fn build(
        rules: &RuleSet,
        vocabulary: &TokenVocabulary,
    ) -> (Self, Vec<ParserDefinitionError>) {
        let mut table = LookaheadTable::default();
        let mut errors = Vec::new();

        for (rule_id, rule) in rules.iter() {
            table.top_level.push(first_of_sequence(&rule.definition, rules));

            let mut collector = KeyCollector::default();
            walk_rule(&mut collector, rule);

            for (kind, occurrence, ignore_ambiguities) in collector.found {
                let key = LookaheadKey {
                    rule: rule_id,
                    kind,
                    occurrence,
                };
                if kind == ProductionKind::Alternation {
                    if table.alternatives.contains_key(&key) {
                        continue;
                    }
                    let alts = alternatives_first(rules, rule_id, occurrence);
                    if !ignore_ambiguities {
                        let ambiguities = check_alternatives_ambiguities(&alts);
                        if !ambiguities.is_empty() {
                            errors.push(ambiguity_error(
                                &rule.name,
                                occurrence,
                                &ambiguities,
                                vocabulary,
                            ));
                        }
                    }
                    table.alternatives.insert(key, AlternativesLookahead::new(alts));
                } else {
                    table
                        .simple
                        .entry(key)
                        .or_insert_with(|| first_inside(rules, rule_id, kind, occurrence));
                    if kind != ProductionKind::Option {
                        table
                            .after_repetition
                            .entry(key)
                            .or_insert_with(|| terminal_after(rules, rule_id, kind, occurrence));
                    }
                }
            }
        }

        (table, errors)
    }

    /// FIRST set of an option or repetition body
    pub fn simple(&self, key: LookaheadKey) -> Option<&[TokenTypeId]> {
        self.simple.get(&key).map(Vec::as_slice)
    }

    /// Lookahead of an OR
    pub fn alternatives(&self, key: LookaheadKey) -> Option<&AlternativesLookahead> {
        self.alternatives.get(&key)
    }

    /// What follows a repetition
    pub fn terminal_after(&self, key: LookaheadKey) -> Option<TerminalAfter> {
        self.after_repetition.get(&key).copied()
    }

    /// FIRST set of a whole rule
    pub fn top_level(&self, rule: RuleId) -> &[TokenTypeId] {
        self.top_level.get(rule.index()).map_or(&[], Vec::as_slice)
    }
}

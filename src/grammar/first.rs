//! FIRST sets and optionality
//!
//! FIRST of a production is the set of token types that can start it. A
//! sequence contributes elements left to right for as long as the previous
//! element can match nothing. Rule references are followed through the
//! [`RuleSet`]; a rule already being expanded contributes nothing, which
//! keeps left-recursive grammars from looping (they are reported by the
//! grammar checks instead).

use super::gast::{Production, RuleId, RuleSet};
use crate::tokens::TokenTypeId;

/// FIRST set of a single production
pub fn first(prod: &Production, rules: &RuleSet) -> Vec<TokenTypeId> {
    let mut out = Vec::new();
    FirstSets::new(rules).of(prod, &mut out);
    out
}

/// FIRST set of a sequence
pub fn first_of_sequence(definition: &[Production], rules: &RuleSet) -> Vec<TokenTypeId> {
    let mut out = Vec::new();
    FirstSets::new(rules).of_sequence(definition, &mut out);
    out
}

/// FIRST set of a whole rule body
pub fn first_of_rule(rule: RuleId, rules: &RuleSet) -> Vec<TokenTypeId> {
    first_of_sequence(rules.definition(rule), rules)
}

/// Whether `prod` can match without consuming any token
pub fn is_optional(prod: &Production, rules: &RuleSet) -> bool {
    is_optional_guarded(prod, rules, &mut Vec::new())
}

/// Whether every element of `definition` is optional
pub fn is_optional_sequence(definition: &[Production], rules: &RuleSet) -> bool {
    let mut in_progress = Vec::new();
    all_optional(definition, rules, &mut in_progress)
}

fn all_optional(definition: &[Production], rules: &RuleSet, in_progress: &mut Vec<RuleId>) -> bool {
    for prod in definition {
        if !is_optional_guarded(prod, rules, in_progress) {
            return false;
        }
    }
    true
}

fn is_optional_guarded(prod: &Production, rules: &RuleSet, in_progress: &mut Vec<RuleId>) -> bool {
    match prod {
        Production::Option { .. }
        | Production::Repetition { .. }
        | Production::RepetitionWithSeparator { .. } => true,
        Production::Terminal { .. } => false,
        Production::Alternation { alternatives, .. } => {
            for alt in alternatives {
                if all_optional(alt, rules, in_progress) {
                    return true;
                }
            }
            false
        }
        Production::NonTerminal { resolved, .. } => match resolved {
            Some(id) if !in_progress.contains(id) => {
                in_progress.push(*id);
                let optional = all_optional(rules.definition(*id), rules, in_progress);
                in_progress.pop();
                optional
            }
            _ => false,
        },
        Production::Flat { definition }
        | Production::RepetitionMandatory { definition, .. }
        | Production::RepetitionMandatoryWithSeparator { definition, .. } => {
            all_optional(definition, rules, in_progress)
        }
    }
}

struct FirstSets<'a> {
    rules: &'a RuleSet,
    in_progress: Vec<RuleId>,
}

impl<'a> FirstSets<'a> {
    fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            in_progress: Vec::new(),
        }
    }

    fn of(&mut self, prod: &Production, out: &mut Vec<TokenTypeId>) {
        match prod {
            Production::Terminal { token_type, .. } => push_unique(out, *token_type),
            Production::NonTerminal { resolved, .. } => {
                let Some(id) = *resolved else { return };
                if self.in_progress.contains(&id) {
                    return;
                }
                let rules = self.rules;
                self.in_progress.push(id);
                self.of_sequence(rules.definition(id), out);
                self.in_progress.pop();
            }
            Production::Alternation { alternatives, .. } => {
                for alt in alternatives {
                    self.of_sequence(alt, out);
                }
            }
            // separators never start a repetition
            other => self.of_sequence(other.definition(), out),
        }
    }

    fn of_sequence(&mut self, definition: &[Production], out: &mut Vec<TokenTypeId>) {
        for prod in definition {
            self.of(prod, out);
            if !is_optional(prod, self.rules) {
                break;
            }
        }
    }
}

fn push_unique(out: &mut Vec<TokenTypeId>, token_type: TokenTypeId) {
    if !out.contains(&token_type) {
        out.push(token_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::gast::Rule;
    use crate::grammar::resolver::resolve_grammar;

    const A: TokenTypeId = TokenTypeId(1);
    const B: TokenTypeId = TokenTypeId(2);
    const C: TokenTypeId = TokenTypeId(3);

    fn t(token_type: TokenTypeId) -> Production {
        Production::terminal(token_type, 1)
    }

    fn rules(defs: Vec<Rule>) -> RuleSet {
        let mut set = RuleSet::new();
        for rule in defs {
            set.add(rule);
        }
        assert!(resolve_grammar(&mut set).is_empty());
        set
    }

    #[test]
    fn test_first_of_terminal() {
        let set = RuleSet::new();
        assert_eq!(first(&t(A), &set), vec![A]);
    }

    #[test]
    fn test_first_skips_optional_prefix() {
        let set = RuleSet::new();
        let seq = vec![
            Production::Option {
                definition: vec![t(A)],
                occurrence: 1,
            },
            t(B),
            t(C),
        ];
        assert_eq!(first_of_sequence(&seq, &set), vec![A, B]);
    }

    #[test]
    fn test_first_of_mandatory_repetition_stops() {
        let set = RuleSet::new();
        let seq = vec![
            Production::RepetitionMandatory {
                definition: vec![t(A)],
                occurrence: 1,
            },
            t(B),
        ];
        assert_eq!(first_of_sequence(&seq, &set), vec![A]);
    }

    #[test]
    fn test_first_of_alternation_is_union() {
        let set = RuleSet::new();
        let alt = Production::Alternation {
            alternatives: vec![vec![t(A)], vec![t(B)], vec![t(A), t(C)]],
            occurrence: 1,
            ignore_ambiguities: false,
        };
        assert_eq!(first(&alt, &set), vec![A, B]);
    }

    #[test]
    fn test_separator_is_not_first() {
        let set = RuleSet::new();
        let rep = Production::RepetitionWithSeparator {
            definition: vec![t(A)],
            separator: C,
            occurrence: 1,
        };
        assert_eq!(first(&rep, &set), vec![A]);
        assert!(is_optional(&rep, &set));
    }

    #[test]
    fn test_first_follows_references() {
        let set = rules(vec![
            Rule::new("top", vec![Production::non_terminal("inner", 1), t(C)]),
            Rule::new(
                "inner",
                vec![Production::Repetition {
                    definition: vec![t(A)],
                    occurrence: 1,
                }],
            ),
        ]);
        let top = set.id("top").unwrap();
        assert_eq!(first_of_rule(top, &set), vec![A, C]);
    }

    #[test]
    fn test_left_recursive_rule_terminates() {
        let set = rules(vec![Rule::new(
            "expr",
            vec![Production::non_terminal("expr", 1), t(A)],
        )]);
        let expr = set.id("expr").unwrap();
        assert!(first_of_rule(expr, &set).is_empty());
    }

    #[test]
    fn test_alternation_optional_if_any_alternative_is() {
        let set = RuleSet::new();
        let alt = Production::Alternation {
            alternatives: vec![vec![t(A)], vec![]],
            occurrence: 1,
            ignore_ambiguities: false,
        };
        assert!(is_optional(&alt, &set));
        assert!(!is_optional(&t(A), &set));
        assert!(is_optional(&Production::Flat { definition: vec![] }, &set));
    }
}

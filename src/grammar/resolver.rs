//! Binding rule references to rule definitions

use super::gast::{Production, RuleId, RuleSet};
use crate::error::{ParserDefinitionError, ParserDefinitionErrorKind};
use hashbrown::HashMap;

/// Bind every [`Production::NonTerminal`] in `rules` to its target.
///
/// Returns one error per reference to an undefined rule. Running it again
/// produces the same bindings and the same errors.
pub fn resolve_grammar(rules: &mut RuleSet) -> Vec<ParserDefinitionError> {
    let mut errors = Vec::new();
    let (all, by_name) = rules.split_mut();
    for rule in all.iter_mut() {
        resolve_definition(&mut rule.definition, by_name, &rule.name, &mut errors);
    }
    errors
}

fn resolve_definition(
    definition: &mut [Production],
    by_name: &HashMap<String, RuleId>,
    top_rule: &str,
    errors: &mut Vec<ParserDefinitionError>,
) {
    for prod in definition {
        match prod {
            Production::NonTerminal { name, resolved, .. } => match by_name.get(name.as_str()) {
                Some(&id) => *resolved = Some(id),
                None => {
                    let mut error = ParserDefinitionError::new(
                        ParserDefinitionErrorKind::UnresolvedSubruleRef,
                        format!(
                            "Invalid grammar, reference to rule which is not defined --> {}",
                            name
                        ),
                    )
                    .in_rule(top_rule);
                    error.unresolved_ref_name = Some(name.clone());
                    errors.push(error);
                }
            },
            Production::Terminal { .. } => {}
            Production::Alternation { alternatives, .. } => {
                for alt in alternatives {
                    resolve_definition(alt, by_name, top_rule, errors);
                }
            }
            other => {
                if let Some(children) = other.definition_mut() {
                    resolve_definition(children, by_name, top_rule, errors);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::gast::Rule;

    #[test]
    fn test_resolves_nested_references() {
        let mut rules = RuleSet::new();
        rules.add(Rule::new(
            "a",
            vec![Production::Option {
                definition: vec![Production::non_terminal("b", 1)],
                occurrence: 1,
            }],
        ));
        let b = rules.add(Rule::new("b", vec![]));

        assert!(resolve_grammar(&mut rules).is_empty());
        let a = rules.by_name("a").unwrap();
        match &a.definition[0].definition()[0] {
            Production::NonTerminal { resolved, .. } => assert_eq!(*resolved, Some(b)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_reference() {
        let mut rules = RuleSet::new();
        rules.add(Rule::new(
            "a",
            vec![Production::Alternation {
                alternatives: vec![vec![Production::non_terminal("missing", 1)]],
                occurrence: 1,
                ignore_ambiguities: false,
            }],
        ));
        let errors = resolve_grammar(&mut rules);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParserDefinitionErrorKind::UnresolvedSubruleRef);
        assert_eq!(errors[0].rule_name.as_deref(), Some("a"));
        assert_eq!(errors[0].unresolved_ref_name.as_deref(), Some("missing"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut rules = RuleSet::new();
        rules.add(Rule::new("a", vec![Production::non_terminal("a", 1)]));
        rules.add(Rule::new("b", vec![Production::non_terminal("zzz", 1)]));

        let first = resolve_grammar(&mut rules);
        let snapshot = rules.clone();
        let second = resolve_grammar(&mut rules);
        assert_eq!(first, second);
        assert_eq!(
            snapshot.iter().map(|(_, r)| r.clone()).collect::<Vec<_>>(),
            rules.iter().map(|(_, r)| r.clone()).collect::<Vec<_>>()
        );
    }
}

//! Grammar validations
//!
//! Run once per grammar, after references are resolved. Each check returns
//! plain [`ParserDefinitionError`] values; nothing here fails fast.

use super::first::{first_of_sequence, is_optional};
use super::gast::{walk_rule, GastVisitor, Production, RuleId, RuleSet};
use crate::error::{ParserDefinitionError, ParserDefinitionErrorKind};
use crate::tokens::TokenVocabulary;

/// Run every structural check over every rule: duplicate productions first,
/// then left recursion, then non-last empty alternatives
pub fn validate_grammar(rules: &RuleSet, vocabulary: &TokenVocabulary) -> Vec<ParserDefinitionError> {
    let mut errors = Vec::new();
    for (id, _) in rules.iter() {
        errors.extend(validate_duplicate_productions(id, rules, vocabulary));
    }
    for (id, _) in rules.iter() {
        errors.extend(validate_no_left_recursion(id, rules));
    }
    for (id, _) in rules.iter() {
        errors.extend(validate_empty_or_alternatives(id, rules));
    }
    errors
}

/// Whether `name` is a valid rule name (`^[a-zA-Z_]\w*$`)
pub fn is_valid_rule_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check a rule name about to be added to `grammar_name`, given the names
/// already defined
pub fn validate_rule_name(
    name: &str,
    defined: &[String],
    grammar_name: &str,
) -> Vec<ParserDefinitionError> {
    let mut errors = Vec::new();
    if !is_valid_rule_name(name) {
        errors.push(
            ParserDefinitionError::new(
                ParserDefinitionErrorKind::InvalidRuleName,
                format!(
                    "Invalid Grammar rule name --> {} it must match the pattern: /^[a-zA-Z_]\\w*$/",
                    name
                ),
            )
            .in_rule(name),
        );
    }
    if defined.iter().any(|d| d == name) {
        errors.push(
            ParserDefinitionError::new(
                ParserDefinitionErrorKind::DuplicateRuleName,
                format!(
                    "Duplicate definition, rule: {} is already defined in the grammar: {}",
                    name, grammar_name
                ),
            )
            .in_rule(name),
        );
    }
    errors
}

// ============================================================================
// Duplicate productions
// ============================================================================

fn collect_keyed<'a>(prod: &'a Production, found: &mut Vec<&'a Production>) {
    if !matches!(prod, Production::Flat { .. }) {
        found.push(prod);
    }
    if let Production::Alternation { alternatives, .. } = prod {
        for child in alternatives.iter().flatten() {
            collect_keyed(child, found);
        }
    } else {
        for child in prod.definition() {
            collect_keyed(child, found);
        }
    }
}

/// Report constructs used more than once in a rule with the same kind,
/// occurrence index and argument
pub fn validate_duplicate_productions(
    rule: RuleId,
    rules: &RuleSet,
    vocabulary: &TokenVocabulary,
) -> Vec<ParserDefinitionError> {
    let Some(top) = rules.get(rule) else {
        return Vec::new();
    };

    let mut groups: Vec<((&'static str, u32, String), usize)> = Vec::new();
    let mut keyed = Vec::new();
    for prod in &top.definition {
        collect_keyed(prod, &mut keyed);
    }
    for prod in keyed {
        let (Some(kind), Some(occurrence)) = (prod.kind(), prod.occurrence()) else {
            continue;
        };
        let key = (kind.dsl_name(), occurrence, prod.extra_argument(vocabulary));
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }

    groups
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((dsl_name, occurrence, parameter), count)| {
            duplicate_production_error(&top.name, dsl_name, occurrence, &parameter, count)
        })
        .collect()
}

fn duplicate_production_error(
    rule_name: &str,
    dsl_name: &str,
    occurrence: u32,
    parameter: &str,
    count: usize,
) -> ParserDefinitionError {
    let (argument_line, with_argument) = if parameter.is_empty() {
        (String::new(), String::new())
    } else {
        (
            format!("and argument: {}\n", parameter),
            format!(" with the argument: {}", parameter),
        )
    };
    let note = if occurrence == 1 {
        "note that the default occurrence index is 1\n"
    } else {
        ""
    };
    let message = format!(
        "->{dsl}<- with occurrence index: ->{occ}<-\n{argument_line}appears more than once ({count} times) in the top level rule: {rule}.\n{note}to fix this make sure each usage of {dsl}{with_argument}\nin the rule {rule} has a different occurrence index (1-5), as that combination acts as a unique\nposition key in the grammar, which is needed by the parsing engine.",
        dsl = dsl_name,
        occ = occurrence,
        rule = rule_name,
    );

    let error = ParserDefinitionError::new(ParserDefinitionErrorKind::DuplicateProductions, message)
        .in_rule(rule_name)
        .at_production(dsl_name, occurrence);
    if parameter.is_empty() {
        error
    } else {
        error.with_parameter(parameter)
    }
}

// ============================================================================
// Left recursion
// ============================================================================

/// Rules that can be invoked by `definition` before any token is consumed
pub fn get_first_non_terminals(definition: &[Production], rules: &RuleSet) -> Vec<RuleId> {
    let Some(first) = definition.first() else {
        return Vec::new();
    };

    let mut result: Vec<RuleId> = match first {
        Production::NonTerminal { resolved, .. } => resolved.iter().copied().collect(),
        Production::Terminal { .. } => Vec::new(),
        Production::Alternation { alternatives, .. } => alternatives
            .iter()
            .flat_map(|alt| get_first_non_terminals(alt, rules))
            .collect(),
        other => get_first_non_terminals(other.definition(), rules),
    };

    if definition.len() > 1 && is_optional(first, rules) {
        result.extend(get_first_non_terminals(&definition[1..], rules));
    }
    result
}

/// Report every way `top` can reach itself without consuming a token
pub fn validate_no_left_recursion(top: RuleId, rules: &RuleSet) -> Vec<ParserDefinitionError> {
    let mut errors = Vec::new();
    find_left_recursion(top, top, &[], rules, &mut errors);
    errors
}

fn find_left_recursion(
    top: RuleId,
    current: RuleId,
    path: &[RuleId],
    rules: &RuleSet,
    errors: &mut Vec<ParserDefinitionError>,
) {
    let next = get_first_non_terminals(rules.definition(current), rules);
    if next.is_empty() {
        return;
    }

    if next.contains(&top) {
        let top_name = rules.name(top);
        let mut names: Vec<&str> = path.iter().map(|&id| rules.name(id)).collect();
        names.push(top_name);
        let recursive_path = format!("{} --> {}", top_name, names.join(" --> "));
        errors.push(
            ParserDefinitionError::new(
                ParserDefinitionErrorKind::LeftRecursion,
                format!(
                    "Left Recursion found in grammar.\nrule: <{}> can be invoked from itself (directly or indirectly)\nwithout consuming any Tokens. The grammar path that causes this is: \n {}\n To fix this refactor your grammar to remove the left recursion.\nsee: https://en.wikipedia.org/wiki/LL_parser#Left_Factoring.",
                    top_name, recursive_path
                ),
            )
            .in_rule(top_name),
        );
    }

    let mut visited = Vec::new();
    for candidate in next {
        if candidate == top || path.contains(&candidate) || visited.contains(&candidate) {
            continue;
        }
        visited.push(candidate);
        let mut new_path = path.to_vec();
        new_path.push(candidate);
        find_left_recursion(top, candidate, &new_path, rules, errors);
    }
}

// ============================================================================
// Empty alternatives
// ============================================================================

#[derive(Default)]
struct AlternationCollector {
    found: Vec<(u32, Vec<Vec<Production>>)>,
}

impl GastVisitor for AlternationCollector {
    fn visit_alternation(&mut self, prod: &Production) {
        if let Production::Alternation {
            alternatives,
            occurrence,
            ..
        } = prod
        {
            self.found.push((*occurrence, alternatives.clone()));
        }
    }
}

/// Report alternatives other than the last that can match nothing
pub fn validate_empty_or_alternatives(rule: RuleId, rules: &RuleSet) -> Vec<ParserDefinitionError> {
    let Some(top) = rules.get(rule) else {
        return Vec::new();
    };
    let mut collector = AlternationCollector::default();
    walk_rule(&mut collector, top);

    let mut errors = Vec::new();
    for (occurrence, alternatives) in collector.found {
        let Some((_, init)) = alternatives.split_last() else {
            continue;
        };
        for (idx, alt) in init.iter().enumerate() {
            if first_of_sequence(alt, rules).is_empty() {
                let alternative = idx + 1;
                errors.push(
                    ParserDefinitionError::new(
                        ParserDefinitionErrorKind::NoneLastEmptyAlt,
                        format!(
                            "Ambiguous empty alternative: <{}> in <OR{}> inside <{}> Rule.\nOnly the last alternative may be an empty alternative.",
                            alternative, occurrence, top.name
                        ),
                    )
                    .in_rule(top.name.as_str())
                    .at_production("OR", occurrence)
                    .with_alternative(alternative),
                );
            }
        }
    }
    errors
}

//! Walking a rule together with what follows each element
//!
//! A [`RestWalker`] visits the productions of a rule body and, at every
//! element, also sees `curr_rest` (the siblings after it) and `prev_rest`
//! (whatever follows the enclosing construct). Repetitions expose their own
//! body again, wrapped as an optional element, at the head of the rest: after
//! one iteration another may start.
//!
//! Implementors override the hooks they care about and can call the
//! `walk_*_default` functions to continue the standard descent.

use super::gast::Production;
use crate::tokens::TokenTypeId;

/// Visitor over a rule body that tracks the remaining grammar
pub trait RestWalker {
    /// Stop descending once this returns `true`
    fn is_done(&self) -> bool {
        false
    }

    /// Walk a sequence
    fn walk(&mut self, definition: &[Production], prev_rest: &[Production]) {
        walk_definition(self, definition, prev_rest)
    }

    /// A terminal was reached
    fn walk_terminal(&mut self, _prod: &Production, _curr_rest: &[Production], _prev_rest: &[Production]) {}

    /// A rule reference was reached; references are not followed by default
    fn walk_prod_ref(&mut self, _prod: &Production, _curr_rest: &[Production], _prev_rest: &[Production]) {}

    /// A flat sequence was reached
    fn walk_flat(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        walk_sequence_default(self, prod, curr_rest, prev_rest)
    }

    /// An option was reached
    fn walk_option(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        walk_sequence_default(self, prod, curr_rest, prev_rest)
    }

    /// A repetition was reached
    fn walk_repetition(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        walk_repetition_default(self, prod, curr_rest, prev_rest)
    }

    /// A mandatory repetition was reached
    fn walk_repetition_mandatory(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        walk_repetition_default(self, prod, curr_rest, prev_rest)
    }

    /// A separated repetition was reached
    fn walk_repetition_with_separator(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        walk_repetition_default(self, prod, curr_rest, prev_rest)
    }

    /// A mandatory separated repetition was reached
    fn walk_repetition_mandatory_with_separator(
        &mut self,
        prod: &Production,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        walk_repetition_default(self, prod, curr_rest, prev_rest)
    }

    /// An alternation was reached
    fn walk_or(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        walk_or_default(self, prod, curr_rest, prev_rest)
    }
}

/// Dispatch every element of `definition` to its hook
pub fn walk_definition<W: RestWalker + ?Sized>(
    walker: &mut W,
    definition: &[Production],
    prev_rest: &[Production],
) {
    for (idx, prod) in definition.iter().enumerate() {
        if walker.is_done() {
            return;
        }
        let curr_rest = &definition[idx + 1..];
        match prod {
            Production::Terminal { .. } => walker.walk_terminal(prod, curr_rest, prev_rest),
            Production::NonTerminal { .. } => walker.walk_prod_ref(prod, curr_rest, prev_rest),
            Production::Flat { .. } => walker.walk_flat(prod, curr_rest, prev_rest),
            Production::Option { .. } => walker.walk_option(prod, curr_rest, prev_rest),
            Production::Repetition { .. } => walker.walk_repetition(prod, curr_rest, prev_rest),
            Production::RepetitionMandatory { .. } => {
                walker.walk_repetition_mandatory(prod, curr_rest, prev_rest)
            }
            Production::RepetitionWithSeparator { .. } => {
                walker.walk_repetition_with_separator(prod, curr_rest, prev_rest)
            }
            Production::RepetitionMandatoryWithSeparator { .. } => {
                walker.walk_repetition_mandatory_with_separator(prod, curr_rest, prev_rest)
            }
            Production::Alternation { .. } => walker.walk_or(prod, curr_rest, prev_rest),
        }
    }
}

/// Descend into a flat sequence or option
pub fn walk_sequence_default<W: RestWalker + ?Sized>(
    walker: &mut W,
    prod: &Production,
    curr_rest: &[Production],
    prev_rest: &[Production],
) {
    let full_rest = concat_rest(curr_rest, prev_rest);
    walker.walk(prod.definition(), &full_rest);
}

/// Descend into any repetition
pub fn walk_repetition_default<W: RestWalker + ?Sized>(
    walker: &mut W,
    prod: &Production,
    curr_rest: &[Production],
    prev_rest: &[Production],
) {
    let full_rest = rest_after_iteration(prod, curr_rest, prev_rest);
    walker.walk(prod.definition(), &full_rest);
}

/// Descend into each alternative
pub fn walk_or_default<W: RestWalker + ?Sized>(
    walker: &mut W,
    prod: &Production,
    curr_rest: &[Production],
    prev_rest: &[Production],
) {
    let Production::Alternation { alternatives, .. } = prod else {
        return;
    };
    let full_rest = concat_rest(curr_rest, prev_rest);
    for alt in alternatives {
        if walker.is_done() {
            return;
        }
        walker.walk(alt, &full_rest);
    }
}

/// `curr_rest` followed by `prev_rest`
pub fn concat_rest(curr_rest: &[Production], prev_rest: &[Production]) -> Vec<Production> {
    curr_rest.iter().chain(prev_rest).cloned().collect()
}

/// What may follow one iteration of a repetition: another (optional)
/// iteration, introduced by the separator when there is one, then the rest
fn rest_after_iteration(
    prod: &Production,
    curr_rest: &[Production],
    prev_rest: &[Production],
) -> Vec<Production> {
    let again = match prod {
        Production::RepetitionWithSeparator {
            definition,
            separator,
            ..
        }
        | Production::RepetitionMandatoryWithSeparator {
            definition,
            separator,
            ..
        } => separated_iteration(*separator, definition),
        other => other.definition().to_vec(),
    };

    let mut rest = Vec::with_capacity(1 + curr_rest.len() + prev_rest.len());
    rest.push(Production::Option {
        definition: again,
        occurrence: 1,
    });
    rest.extend(curr_rest.iter().cloned());
    rest.extend(prev_rest.iter().cloned());
    rest
}

fn separated_iteration(separator: TokenTypeId, definition: &[Production]) -> Vec<Production> {
    let mut again = Vec::with_capacity(definition.len() + 1);
    again.push(Production::terminal(separator, 1));
    again.extend(definition.iter().cloned());
    again
}

//! Resync follow sets
//!
//! For every call site of a rule inside another rule, the set of token types
//! that may come right after that call. Rule-level recovery skips input until
//! one of these appears.

use super::first::first_of_sequence;
use super::gast::{Production, RuleId, RuleSet};
use super::rest::{concat_rest, RestWalker};
use crate::tokens::TokenTypeId;
use hashbrown::HashMap;

/// Identifies a call site: `rule` invoked with `occurrence` inside `in_rule`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowKey {
    /// The called rule
    pub rule: RuleId,
    /// Occurrence index of the call
    pub occurrence: u32,
    /// The calling rule
    pub in_rule: RuleId,
}

/// Follow sets of every call site in a grammar
pub type FollowSets = HashMap<FollowKey, Vec<TokenTypeId>>;

struct ResyncFollowsWalker<'a> {
    rules: &'a RuleSet,
    top_rule: RuleId,
    follows: FollowSets,
}

impl RestWalker for ResyncFollowsWalker<'_> {
    fn walk_prod_ref(&mut self, prod: &Production, curr_rest: &[Production], prev_rest: &[Production]) {
        let Production::NonTerminal {
            occurrence,
            resolved: Some(rule),
            ..
        } = prod
        else {
            return;
        };
        let follow = first_of_sequence(&concat_rest(curr_rest, prev_rest), self.rules);
        self.follows.insert(
            FollowKey {
                rule: *rule,
                occurrence: *occurrence,
                in_rule: self.top_rule,
            },
            follow,
        );
    }
}

/// Follow sets of the call sites inside one rule
pub fn compute_follows_in_rule(rule: RuleId, rules: &RuleSet) -> FollowSets {
    let mut walker = ResyncFollowsWalker {
        rules,
        top_rule: rule,
        follows: FollowSets::new(),
    };
    walker.walk(rules.definition(rule), &[]);
    walker.follows
}

/// Follow sets of every call site in the grammar
pub fn compute_all_prod_follows(rules: &RuleSet) -> FollowSets {
    let mut all = FollowSets::new();
    for (id, _) in rules.iter() {
        all.extend(compute_follows_in_rule(id, rules));
    }
    all
}

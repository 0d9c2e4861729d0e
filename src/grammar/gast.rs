//! Grammar AST (GAST)
//!
//! The static structure of every rule, recorded once from the rule bodies.
//! Rules live in a [`RuleSet`] arena and refer to each other by name; the
//! resolver binds each [`Production::NonTerminal`] to a [`RuleId`] so that
//! walkers can opt in to following references without owning cycles.

use crate::tokens::{TokenTypeId, TokenVocabulary};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a rule inside a [`RuleSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// Position of the rule in its set
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of an occurrence-indexed construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionKind {
    /// `CONSUME`
    Terminal,
    /// `SUBRULE`
    NonTerminal,
    /// `OPTION`
    Option,
    /// `MANY`
    Repetition,
    /// `AT_LEAST_ONE`
    RepetitionMandatory,
    /// `MANY_SEP`
    RepetitionWithSeparator,
    /// `AT_LEAST_ONE_SEP`
    RepetitionMandatoryWithSeparator,
    /// `OR`
    Alternation,
}

impl ProductionKind {
    /// Name of the DSL operation that records this kind
    pub fn dsl_name(self) -> &'static str {
        match self {
            Self::Terminal => "CONSUME",
            Self::NonTerminal => "SUBRULE",
            Self::Option => "OPTION",
            Self::Repetition => "MANY",
            Self::RepetitionMandatory => "AT_LEAST_ONE",
            Self::RepetitionWithSeparator => "MANY_SEP",
            Self::RepetitionMandatoryWithSeparator => "AT_LEAST_ONE_SEP",
            Self::Alternation => "OR",
        }
    }
}

/// A node of a rule's grammar tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Production {
    /// A token consumption
    Terminal {
        /// Expected type
        token_type: TokenTypeId,
        /// Occurrence index
        occurrence: u32,
    },
    /// A call to another rule
    NonTerminal {
        /// Referenced rule name
        name: String,
        /// Occurrence index of this call site
        occurrence: u32,
        /// Target, once resolved
        #[serde(default)]
        resolved: Option<RuleId>,
    },
    /// A plain sequence
    Flat {
        /// Children, in order
        definition: Vec<Production>,
    },
    /// Zero or one
    Option {
        /// Children, in order
        definition: Vec<Production>,
        /// Occurrence index
        occurrence: u32,
    },
    /// Zero or more
    Repetition {
        /// Children, in order
        definition: Vec<Production>,
        /// Occurrence index
        occurrence: u32,
    },
    /// One or more
    RepetitionMandatory {
        /// Children, in order
        definition: Vec<Production>,
        /// Occurrence index
        occurrence: u32,
    },
    /// Zero or more, separated
    RepetitionWithSeparator {
        /// Children, in order
        definition: Vec<Production>,
        /// Separator type
        separator: TokenTypeId,
        /// Occurrence index
        occurrence: u32,
    },
    /// One or more, separated
    RepetitionMandatoryWithSeparator {
        /// Children, in order
        definition: Vec<Production>,
        /// Separator type
        separator: TokenTypeId,
        /// Occurrence index
        occurrence: u32,
    },
    /// A choice; each alternative is a sequence
    Alternation {
        /// Alternatives, in order
        alternatives: Vec<Vec<Production>>,
        /// Occurrence index
        occurrence: u32,
        /// Skip the LL(1) ambiguity check for this choice
        #[serde(default)]
        ignore_ambiguities: bool,
    },
}

impl Production {
    /// A token consumption
    pub fn terminal(token_type: TokenTypeId, occurrence: u32) -> Self {
        Production::Terminal {
            token_type,
            occurrence,
        }
    }

    /// An unresolved rule call
    pub fn non_terminal(name: impl Into<String>, occurrence: u32) -> Self {
        Production::NonTerminal {
            name: name.into(),
            occurrence,
            resolved: None,
        }
    }

    /// Kind of this node; `None` for [`Production::Flat`]
    pub fn kind(&self) -> Option<ProductionKind> {
        Some(match self {
            Self::Terminal { .. } => ProductionKind::Terminal,
            Self::NonTerminal { .. } => ProductionKind::NonTerminal,
            Self::Flat { .. } => return None,
            Self::Option { .. } => ProductionKind::Option,
            Self::Repetition { .. } => ProductionKind::Repetition,
            Self::RepetitionMandatory { .. } => ProductionKind::RepetitionMandatory,
            Self::RepetitionWithSeparator { .. } => ProductionKind::RepetitionWithSeparator,
            Self::RepetitionMandatoryWithSeparator { .. } => {
                ProductionKind::RepetitionMandatoryWithSeparator
            }
            Self::Alternation { .. } => ProductionKind::Alternation,
        })
    }

    /// Occurrence index; `None` for [`Production::Flat`]
    pub fn occurrence(&self) -> Option<u32> {
        match self {
            Self::Terminal { occurrence, .. }
            | Self::NonTerminal { occurrence, .. }
            | Self::Option { occurrence, .. }
            | Self::Repetition { occurrence, .. }
            | Self::RepetitionMandatory { occurrence, .. }
            | Self::RepetitionWithSeparator { occurrence, .. }
            | Self::RepetitionMandatoryWithSeparator { occurrence, .. }
            | Self::Alternation { occurrence, .. } => Some(*occurrence),
            Self::Flat { .. } => None,
        }
    }

    /// Children of sequence-like nodes; empty for terminals, references and
    /// alternations
    pub fn definition(&self) -> &[Production] {
        match self {
            Self::Flat { definition }
            | Self::Option { definition, .. }
            | Self::Repetition { definition, .. }
            | Self::RepetitionMandatory { definition, .. }
            | Self::RepetitionWithSeparator { definition, .. }
            | Self::RepetitionMandatoryWithSeparator { definition, .. } => definition,
            Self::Terminal { .. } | Self::NonTerminal { .. } | Self::Alternation { .. } => &[],
        }
    }

    pub(crate) fn definition_mut(&mut self) -> Option<&mut Vec<Production>> {
        match self {
            Self::Flat { definition }
            | Self::Option { definition, .. }
            | Self::Repetition { definition, .. }
            | Self::RepetitionMandatory { definition, .. }
            | Self::RepetitionWithSeparator { definition, .. }
            | Self::RepetitionMandatoryWithSeparator { definition, .. } => Some(definition),
            Self::Terminal { .. } | Self::NonTerminal { .. } | Self::Alternation { .. } => None,
        }
    }

    /// The extra argument that identifies a construct besides its kind and
    /// occurrence: the token name for terminals, the rule name for references
    pub fn extra_argument(&self, vocabulary: &TokenVocabulary) -> String {
        match self {
            Self::Terminal { token_type, .. } => vocabulary.name(*token_type).to_string(),
            Self::NonTerminal { name, .. } => name.clone(),
            _ => String::new(),
        }
    }
}

/// A named top-level rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name
    pub name: String,
    /// Body, as a sequence
    pub definition: Vec<Production>,
}

impl Rule {
    /// Create a rule
    pub fn new(name: impl Into<String>, definition: Vec<Production>) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }

    /// EBNF-like rendering, naming tokens through `vocabulary`
    pub fn display<'a>(&'a self, vocabulary: &'a TokenVocabulary) -> RuleDisplay<'a> {
        RuleDisplay {
            rule: self,
            vocabulary,
        }
    }
}

/// The rules of one grammar, addressable by id and by name
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
    #[serde(skip)]
    by_name: HashMap<String, RuleId>,
}

impl RuleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; a name already present keeps its first definition
    pub fn add(&mut self, rule: Rule) -> RuleId {
        if let Some(&id) = self.by_name.get(rule.name.as_str()) {
            return id;
        }
        let id = RuleId(self.rules.len() as u32);
        self.by_name.insert(rule.name.clone(), id);
        self.rules.push(rule);
        id
    }

    /// Look up a rule by id
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    /// Look up a rule id by name
    pub fn id(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    /// Look up a rule by name
    pub fn by_name(&self, name: &str) -> Option<&Rule> {
        self.id(name).and_then(|id| self.get(id))
    }

    /// Rules in definition order
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| (RuleId(idx as u32), rule))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Body of a rule known to be in this set
    pub(crate) fn definition(&self, id: RuleId) -> &[Production] {
        self.rules
            .get(id.index())
            .map_or(&[], |rule| rule.definition.as_slice())
    }

    pub(crate) fn name(&self, id: RuleId) -> &str {
        self.rules
            .get(id.index())
            .map_or("<unknown>", |rule| rule.name.as_str())
    }

    pub(crate) fn split_mut(&mut self) -> (&mut [Rule], &HashMap<String, RuleId>) {
        (&mut self.rules, &self.by_name)
    }
}

// ============================================================================
// Visitor
// ============================================================================

/// Pre-order visitor over a rule's tree.
///
/// [`walk_rule`] visits every node once; references are visited but never
/// followed, so recursive grammars are safe to traverse.
pub trait GastVisitor {
    /// Visit a rule (before its body)
    fn visit_rule(&mut self, _rule: &Rule) {}

    /// Visit a terminal
    fn visit_terminal(&mut self, _prod: &Production) {}

    /// Visit a rule reference
    fn visit_non_terminal(&mut self, _prod: &Production) {}

    /// Visit a flat sequence
    fn visit_flat(&mut self, _prod: &Production) {}

    /// Visit an option
    fn visit_option(&mut self, _prod: &Production) {}

    /// Visit a repetition
    fn visit_repetition(&mut self, _prod: &Production) {}

    /// Visit a mandatory repetition
    fn visit_repetition_mandatory(&mut self, _prod: &Production) {}

    /// Visit a separated repetition
    fn visit_repetition_with_separator(&mut self, _prod: &Production) {}

    /// Visit a mandatory separated repetition
    fn visit_repetition_mandatory_with_separator(&mut self, _prod: &Production) {}

    /// Visit an alternation
    fn visit_alternation(&mut self, _prod: &Production) {}
}

/// Visit `rule` and everything inside it
pub fn walk_rule<V: GastVisitor + ?Sized>(visitor: &mut V, rule: &Rule) {
    visitor.visit_rule(rule);
    for prod in &rule.definition {
        walk_production(visitor, prod);
    }
}

/// Visit `prod` and everything inside it
pub fn walk_production<V: GastVisitor + ?Sized>(visitor: &mut V, prod: &Production) {
    match prod {
        Production::Terminal { .. } => visitor.visit_terminal(prod),
        Production::NonTerminal { .. } => visitor.visit_non_terminal(prod),
        Production::Flat { .. } => visitor.visit_flat(prod),
        Production::Option { .. } => visitor.visit_option(prod),
        Production::Repetition { .. } => visitor.visit_repetition(prod),
        Production::RepetitionMandatory { .. } => visitor.visit_repetition_mandatory(prod),
        Production::RepetitionWithSeparator { .. } => {
            visitor.visit_repetition_with_separator(prod)
        }
        Production::RepetitionMandatoryWithSeparator { .. } => {
            visitor.visit_repetition_mandatory_with_separator(prod)
        }
        Production::Alternation { .. } => visitor.visit_alternation(prod),
    }

    if let Production::Alternation { alternatives, .. } = prod {
        for alt in alternatives {
            for child in alt {
                walk_production(visitor, child);
            }
        }
    } else {
        for child in prod.definition() {
            walk_production(visitor, child);
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Display adapter returned by [`Rule::display`]
pub struct RuleDisplay<'a> {
    rule: &'a Rule,
    vocabulary: &'a TokenVocabulary,
}

impl fmt::Display for RuleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ::=", self.rule.name)?;
        write_sequence(f, &self.rule.definition, self.vocabulary)
    }
}

fn write_sequence(
    f: &mut fmt::Formatter<'_>,
    definition: &[Production],
    vocabulary: &TokenVocabulary,
) -> fmt::Result {
    for prod in definition {
        f.write_str(" ")?;
        write_production(f, prod, vocabulary)?;
    }
    Ok(())
}

fn write_production(
    f: &mut fmt::Formatter<'_>,
    prod: &Production,
    vocabulary: &TokenVocabulary,
) -> fmt::Result {
    match prod {
        Production::Terminal { token_type, .. } => f.write_str(vocabulary.name(*token_type)),
        Production::NonTerminal { name, .. } => f.write_str(name),
        Production::Flat { definition } => {
            f.write_str("(")?;
            write_sequence(f, definition, vocabulary)?;
            f.write_str(" )")
        }
        Production::Option { definition, .. } => {
            f.write_str("(")?;
            write_sequence(f, definition, vocabulary)?;
            f.write_str(" )?")
        }
        Production::Repetition { definition, .. } => {
            f.write_str("(")?;
            write_sequence(f, definition, vocabulary)?;
            f.write_str(" )*")
        }
        Production::RepetitionMandatory { definition, .. } => {
            f.write_str("(")?;
            write_sequence(f, definition, vocabulary)?;
            f.write_str(" )+")
        }
        Production::RepetitionWithSeparator {
            definition,
            separator,
            ..
        } => {
            f.write_str("(")?;
            write_sequence(f, definition, vocabulary)?;
            write!(f, " ){{{}}}*", vocabulary.name(*separator))
        }
        Production::RepetitionMandatoryWithSeparator {
            definition,
            separator,
            ..
        } => {
            f.write_str("(")?;
            write_sequence(f, definition, vocabulary)?;
            write!(f, " ){{{}}}+", vocabulary.name(*separator))
        }
        Production::Alternation { alternatives, .. } => {
            f.write_str("(")?;
            for (idx, alt) in alternatives.iter().enumerate() {
                if idx > 0 {
                    f.write_str(" |")?;
                }
                write_sequence(f, alt, vocabulary)?;
            }
            f.write_str(" )")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenTypeDef;

    fn vocab() -> TokenVocabulary {
        TokenVocabulary::new(vec![
            TokenTypeDef::new("Ident", "[a-z]+"),
            TokenTypeDef::new("Comma", ","),
            TokenTypeDef::new("Semi", ";"),
        ])
        .unwrap()
    }

    #[derive(Default)]
    struct Counter {
        terminals: usize,
        refs: usize,
        alternations: usize,
    }

    impl GastVisitor for Counter {
        fn visit_terminal(&mut self, _prod: &Production) {
            self.terminals += 1;
        }
        fn visit_non_terminal(&mut self, _prod: &Production) {
            self.refs += 1;
        }
        fn visit_alternation(&mut self, _prod: &Production) {
            self.alternations += 1;
        }
    }

    fn sample(v: &TokenVocabulary) -> Rule {
        let ident = v.id("Ident").unwrap();
        let comma = v.id("Comma").unwrap();
        let semi = v.id("Semi").unwrap();
        Rule::new(
            "list",
            vec![
                Production::RepetitionWithSeparator {
                    definition: vec![Production::terminal(ident, 1)],
                    separator: comma,
                    occurrence: 1,
                },
                Production::Alternation {
                    alternatives: vec![
                        vec![Production::terminal(semi, 1)],
                        vec![Production::non_terminal("list", 1)],
                        vec![],
                    ],
                    occurrence: 1,
                    ignore_ambiguities: false,
                },
            ],
        )
    }

    #[test]
    fn test_visitor_reaches_nested_nodes() {
        let v = vocab();
        let mut counter = Counter::default();
        walk_rule(&mut counter, &sample(&v));
        assert_eq!(counter.terminals, 2);
        assert_eq!(counter.refs, 1);
        assert_eq!(counter.alternations, 1);
    }

    #[test]
    fn test_rule_display() {
        let v = vocab();
        let text = sample(&v).display(&v).to_string();
        assert_eq!(text, "list ::= ( Ident ){Comma}* ( Semi | list | )");
    }

    #[test]
    fn test_rule_set_keeps_first_definition() {
        let mut rules = RuleSet::new();
        let a = rules.add(Rule::new("a", vec![]));
        let again = rules.add(Rule::new("a", vec![Production::non_terminal("b", 1)]));
        assert_eq!(a, again);
        assert_eq!(rules.len(), 1);
        assert!(rules.by_name("a").unwrap().definition.is_empty());
    }

    #[test]
    fn test_kind_and_occurrence() {
        let prod = Production::Option {
            definition: vec![],
            occurrence: 3,
        };
        assert_eq!(prod.kind(), Some(ProductionKind::Option));
        assert_eq!(prod.occurrence(), Some(3));
        assert_eq!(ProductionKind::RepetitionMandatoryWithSeparator.dsl_name(), "AT_LEAST_ONE_SEP");
        assert_eq!(Production::Flat { definition: vec![] }.kind(), None);
    }

    #[test]
    fn test_gast_json_roundtrip_shape() {
        let v = vocab();
        let json = serde_json::to_string(&sample(&v)).unwrap();
        assert!(json.contains("\"repetition_with_separator\""));
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample(&v));
    }
}

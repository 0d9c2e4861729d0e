//! Integration tests for grammar definition errors
//!
//! Every problem found while recording or analyzing a grammar is reported as
//! a [`ParserDefinitionError`]; these tests check that each kind is detected
//! and that deferring them keeps the grammar usable for inspection.

use llkit::error::ParserDefinitionErrorKind;
use llkit::prelude::*;
use std::sync::Arc;

fn vocabulary() -> Arc<TokenVocabulary> {
    Arc::new(
        TokenVocabulary::new(vec![
            TokenTypeDef::new("A", "a"),
            TokenTypeDef::new("B", "b"),
            TokenTypeDef::new("C", "c"),
            TokenTypeDef::new("Plus", "\\+"),
        ])
        .unwrap(),
    )
}

fn kinds(errors: &[ParserDefinitionError]) -> Vec<ParserDefinitionErrorKind> {
    errors.iter().map(|e| e.kind).collect()
}

// ============================================================================
// Left recursion
// ============================================================================

static SUM: Rule<()> = Rule::new("sum", sum);
static LEFT: Rule<()> = Rule::new("left", left);
static RIGHT: Rule<()> = Rule::new("right", right);

fn sum(p: &mut Parser) -> ParseResult<()> {
    p.subrule(&SUM)?;
    p.consume("Plus")?;
    p.consume("A")?;
    Ok(())
}

fn left(p: &mut Parser) -> ParseResult<()> {
    p.option(|p| p.consume("B"))?;
    p.subrule(&RIGHT)?;
    Ok(())
}

fn right(p: &mut Parser) -> ParseResult<()> {
    p.subrule(&LEFT)?;
    p.consume("C")?;
    Ok(())
}

#[test]
fn test_direct_left_recursion() {
    let errors = GrammarBuilder::new("Sums", vocabulary())
        .rule(&SUM)
        .build()
        .unwrap_err();
    assert_eq!(kinds(errors.errors()), vec![ParserDefinitionErrorKind::LeftRecursion]);
    assert_eq!(errors.errors()[0].rule_name.as_deref(), Some("sum"));
    assert!(errors.to_string().starts_with("Parser Definition Errors detected"));
}

#[test]
fn test_indirect_left_recursion() {
    let errors = GrammarBuilder::new("Cycle", vocabulary())
        .rule(&LEFT)
        .rule(&RIGHT)
        .build()
        .unwrap_err();
    let found = kinds(errors.errors());
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|&k| k == ParserDefinitionErrorKind::LeftRecursion));
}

#[test]
fn test_deferred_errors_keep_grammar() {
    let grammar = GrammarBuilder::new("Sums", vocabulary())
        .with_config(ParserConfig::new().with_deferred_definition_errors(true))
        .rule(&SUM)
        .build()
        .unwrap();
    assert!(grammar.has_definition_errors());
    assert_eq!(grammar.rules().len(), 1);

    // parsers inheriting the grammar's configuration are allowed
    assert!(Parser::new(Arc::clone(&grammar), Vec::new()).is_ok());
    // an explicit configuration that does not defer reports the errors again
    let errors = Parser::with_config(grammar, Vec::new(), ParserConfig::default()).unwrap_err();
    assert_eq!(errors.len(), 1);
}

// ============================================================================
// Alternatives
// ============================================================================

static AMBIGUOUS: Rule<()> = Rule::new("ambiguous", ambiguous);
static IGNORED: Rule<()> = Rule::new("ignored", ignored);
static EMPTY_FIRST: Rule<()> = Rule::new("emptyFirst", empty_first);
static LATE_GUARD: Rule<()> = Rule::new("lateGuard", late_guard);
static EARLY_GUARD: Rule<()> = Rule::new("earlyGuard", early_guard);

fn ambiguous(p: &mut Parser) -> ParseResult<()> {
    p.or(vec![
        Alt::new(|p| {
            p.consume_at(1, "A")?;
            p.consume("B")?;
            Ok(())
        }),
        Alt::new(|p| {
            p.consume_at(2, "A")?;
            p.consume("C")?;
            Ok(())
        }),
    ])
}

fn ignored(p: &mut Parser) -> ParseResult<()> {
    p.or_with(
        1,
        vec![
            Alt::new(|p| p.consume_at(1, "A").map(|_| ())),
            Alt::new(|p| p.consume_at(2, "A").map(|_| ())),
        ],
        OrOptions::new().ignore_ambiguities(),
    )
}

fn late_guard(p: &mut Parser) -> ParseResult<()> {
    p.or(vec![
        Alt::new(|p| p.consume_at(1, "A").map(|_| ())),
        Alt::when(|_| Ok(true), |p| p.consume_at(2, "A").map(|_| ())),
    ])
}

fn early_guard(p: &mut Parser) -> ParseResult<()> {
    p.or(vec![
        Alt::when(|p| Ok(p.la(2).image == "b"), |p| {
            p.consume_at(1, "A")?;
            p.consume_at(1, "B")?;
            Ok(())
        }),
        Alt::new(|p| p.consume_at(2, "A").map(|_| ())),
    ])
}

fn empty_first(p: &mut Parser) -> ParseResult<()> {
    p.or(vec![Alt::empty(()), Alt::new(|p| p.consume("A").map(|_| ()))])
}

#[test]
fn test_ambiguous_alternatives() {
    let errors = GrammarBuilder::new("Ambiguous", vocabulary())
        .rule(&AMBIGUOUS)
        .build()
        .unwrap_err();
    assert_eq!(
        kinds(errors.errors()),
        vec![ParserDefinitionErrorKind::AmbiguousAlternatives]
    );
    assert!(errors.errors()[0]
        .message
        .starts_with("Ambiguous alternatives: <1 ,2> in <OR1> inside <ambiguous> Rule, <A>"));
}

#[test]
fn test_ignored_ambiguity_picks_first_alternative() {
    let vocab = vocabulary();
    let grammar = GrammarBuilder::new("Ignored", Arc::clone(&vocab))
        .rule(&IGNORED)
        .build()
        .unwrap();
    let tokens = Lexer::new(&vocab).unwrap().tokenize("a").unwrap().tokens;
    let mut parser = Parser::new(grammar, tokens).unwrap();
    parser.invoke(&IGNORED).unwrap();
    assert!(parser.errors().is_empty());
}

#[test]
fn test_guard_on_later_alternative_is_still_checked() {
    let errors = GrammarBuilder::new("LateGuard", vocabulary())
        .rule(&LATE_GUARD)
        .build()
        .unwrap_err();
    assert_eq!(
        kinds(errors.errors()),
        vec![ParserDefinitionErrorKind::AmbiguousAlternatives]
    );
}

#[test]
fn test_guarded_alternatives_skip_ambiguity_check() {
    let vocab = vocabulary();
    let grammar = GrammarBuilder::new("EarlyGuard", Arc::clone(&vocab))
        .rule(&EARLY_GUARD)
        .build()
        .unwrap();
    let tokens = Lexer::new(&vocab).unwrap().tokenize("a").unwrap().tokens;
    let mut parser = Parser::new(grammar, tokens).unwrap();
    parser.invoke(&EARLY_GUARD).unwrap();
    assert!(parser.errors().is_empty());
}

#[test]
fn test_empty_alternative_must_be_last() {
    let errors = GrammarBuilder::new("Empty", vocabulary())
        .rule(&EMPTY_FIRST)
        .build()
        .unwrap_err();
    assert_eq!(kinds(errors.errors()), vec![ParserDefinitionErrorKind::NoneLastEmptyAlt]);
    assert_eq!(errors.errors()[0].alternative, Some(1));
}

// ============================================================================
// Recording problems
// ============================================================================

static DUPLICATED: Rule<()> = Rule::new("duplicated", duplicated);
static UNRESOLVED: Rule<()> = Rule::new("unresolved", unresolved);
static MISSING: Rule<()> = Rule::new("missing", duplicated);
static UNKNOWN_TOKEN: Rule<()> = Rule::new("unknownToken", unknown_token);
static BAD_OCCURRENCE: Rule<()> = Rule::new("badOccurrence", bad_occurrence);
static BAD_NAME: Rule<()> = Rule::new("1bad", bad_occurrence);

fn duplicated(p: &mut Parser) -> ParseResult<()> {
    p.consume("A")?;
    p.consume("A")?;
    Ok(())
}

fn unresolved(p: &mut Parser) -> ParseResult<()> {
    p.subrule(&MISSING)
}

fn unknown_token(p: &mut Parser) -> ParseResult<()> {
    p.consume("Nope")?;
    Ok(())
}

fn bad_occurrence(p: &mut Parser) -> ParseResult<()> {
    p.consume_at(6, "A")?;
    Ok(())
}

#[test]
fn test_duplicate_productions() {
    let errors = GrammarBuilder::new("Dup", vocabulary())
        .rule(&DUPLICATED)
        .build()
        .unwrap_err();
    assert_eq!(kinds(errors.errors()), vec![ParserDefinitionErrorKind::DuplicateProductions]);
    let error = &errors.errors()[0];
    assert_eq!(error.dsl_name.as_deref(), Some("CONSUME"));
    assert_eq!(error.occurrence, Some(1));
    assert_eq!(error.parameter.as_deref(), Some("A"));
}

#[test]
fn test_unresolved_subrule_reference() {
    let errors = GrammarBuilder::new("Unresolved", vocabulary())
        .rule(&UNRESOLVED)
        .build()
        .unwrap_err();
    assert_eq!(kinds(errors.errors()), vec![ParserDefinitionErrorKind::UnresolvedSubruleRef]);
    assert_eq!(errors.errors()[0].unresolved_ref_name.as_deref(), Some("missing"));
}

#[test]
fn test_unknown_token_type() {
    let errors = GrammarBuilder::new("Unknown", vocabulary())
        .rule(&UNKNOWN_TOKEN)
        .build()
        .unwrap_err();
    assert!(kinds(errors.errors()).contains(&ParserDefinitionErrorKind::UnknownTokenType));
}

#[test]
fn test_invalid_occurrence_index() {
    let errors = GrammarBuilder::new("Occurrences", vocabulary())
        .rule(&BAD_OCCURRENCE)
        .build()
        .unwrap_err();
    assert!(kinds(errors.errors()).contains(&ParserDefinitionErrorKind::InvalidOccurrenceIndex));
}

#[test]
fn test_rule_names() {
    let errors = GrammarBuilder::new("Names", vocabulary())
        .rule(&BAD_NAME)
        .rule(&DUPLICATED)
        .rule(&DUPLICATED)
        .build()
        .unwrap_err();
    let found = kinds(errors.errors());
    assert!(found.contains(&ParserDefinitionErrorKind::InvalidRuleName));
    assert!(found.contains(&ParserDefinitionErrorKind::DuplicateRuleName));
}

//! Integration tests for error recovery
//!
//! Covers single-token insertion and deletion, repetition re-sync,
//! rule-level re-sync with recovery values, and parsing with recovery
//! disabled.

use llkit::prelude::*;
use llkit::tokens::TokenType;
use std::sync::Arc;

fn vocabulary() -> Arc<TokenVocabulary> {
    Arc::new(
        TokenVocabulary::new(vec![
            TokenTypeDef::new("A", "a"),
            TokenTypeDef::new("B", "b"),
            TokenTypeDef::new("C", "c"),
            TokenTypeDef::new("X", "x"),
            TokenTypeDef::new("Whitespace", "\\s+").skipped(),
        ])
        .unwrap(),
    )
}

fn lex(vocab: &TokenVocabulary, input: &str) -> Vec<Token> {
    Lexer::new(vocab).unwrap().tokenize(input).unwrap().tokens
}

// ============================================================================
// Single-token insertion and deletion
// ============================================================================

static OPTIONAL_MIDDLE: Rule<Vec<String>> = Rule::new("optionalMiddle", optional_middle);
static SEQUENCE: Rule<Vec<Token>> = Rule::new("sequence", sequence);

fn optional_middle(p: &mut Parser) -> ParseResult<Vec<String>> {
    let mut images = vec![p.consume("A")?.image];
    if let Some(b) = p.option(|p| p.consume("B"))? {
        images.push(b.image);
    }
    images.push(p.consume("C")?.image);
    Ok(images)
}

fn sequence(p: &mut Parser) -> ParseResult<Vec<Token>> {
    Ok(vec![p.consume("A")?, p.consume("B")?, p.consume("C")?])
}

fn grammar(config: ParserConfig) -> Arc<Grammar> {
    GrammarBuilder::new("Recovery", vocabulary())
        .with_config(config)
        .rule(&OPTIONAL_MIDDLE)
        .rule(&SEQUENCE)
        .build()
        .unwrap()
}

#[test]
fn test_skipped_option_is_not_an_error() {
    let grammar = grammar(ParserConfig::default());
    let tokens = lex(grammar.vocabulary(), "a c");
    let mut parser = Parser::new(grammar, tokens).unwrap();
    assert_eq!(parser.invoke(&OPTIONAL_MIDDLE).unwrap(), vec!["a", "c"]);
    assert!(parser.errors().is_empty());
}

#[test]
fn test_single_token_deletion() {
    let grammar = grammar(ParserConfig::default());
    let tokens = lex(grammar.vocabulary(), "a x c");
    let mut parser = Parser::new(grammar, tokens).unwrap();
    assert_eq!(parser.invoke(&OPTIONAL_MIDDLE).unwrap(), vec!["a", "c"]);
    assert_eq!(parser.errors().len(), 1);

    let error = &parser.errors()[0];
    assert_eq!(error.kind, RecognitionExceptionKind::MismatchedToken);
    assert_eq!(error.message, "Expecting token of type -->C<-- but found -->'x'<--");
    assert_eq!(error.token.image, "x");
    assert_eq!(error.rule_stack, vec!["optionalMiddle"]);
    assert!(parser.is_at_end_of_input());
}

#[test]
fn test_single_token_insertion() {
    let grammar = grammar(ParserConfig::default());
    let tokens = lex(grammar.vocabulary(), "a c");
    let mut parser = Parser::new(grammar, tokens).unwrap();
    let parsed = parser.invoke(&SEQUENCE).unwrap();

    assert_eq!(parsed.len(), 3);
    assert!(parsed[1].is_inserted_in_recovery);
    assert!(parsed[1].is_virtual());
    assert_eq!(parsed[1].image, "");
    assert_eq!(parsed[2].image, "c");
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(parser.errors()[0].kind, RecognitionExceptionKind::MismatchedToken);
}

fn never_insert_b(token_type: &TokenType) -> bool {
    token_type.name != "B"
}

#[test]
fn test_insertion_filter_falls_back_to_resync() {
    let grammar = grammar(ParserConfig::default().with_insertion_filter(never_insert_b));
    let tokens = lex(grammar.vocabulary(), "a c");
    let mut parser = Parser::new(grammar, tokens).unwrap();

    // the entry rule gives up and yields its recovery value
    assert!(parser.invoke(&SEQUENCE).unwrap().is_empty());
    assert_eq!(parser.errors().len(), 1);
    assert!(parser.is_at_end_of_input());
}

#[test]
fn test_recovery_disabled() {
    let grammar = grammar(ParserConfig::default().with_recovery(false));
    let tokens = lex(grammar.vocabulary(), "a x c");
    let mut parser = Parser::new(grammar, tokens).unwrap();

    let parsed = parser.invoke(&OPTIONAL_MIDDLE).unwrap();
    assert!(parsed.is_empty());
    assert_eq!(parser.errors()[0].kind, RecognitionExceptionKind::MismatchedToken);
}

// ============================================================================
// Repetition re-sync
// ============================================================================

static STATEMENTS: Rule<Vec<String>> = Rule::new("statements", statements);

fn statements(p: &mut Parser) -> ParseResult<Vec<String>> {
    let names = p.many(|p| {
        let name = p.consume("Ident")?;
        p.consume("Semi")?;
        Ok(name.image)
    })?;
    p.consume("End")?;
    Ok(names)
}

fn statement_vocabulary() -> Arc<TokenVocabulary> {
    Arc::new(
        TokenVocabulary::new(vec![
            TokenTypeDef::new("End", "end").with_longer_alt("Ident"),
            TokenTypeDef::new("Ident", "[a-z]+"),
            TokenTypeDef::new("Int", "[0-9]+"),
            TokenTypeDef::new("Semi", ";"),
            TokenTypeDef::new("Eq", "="),
            TokenTypeDef::new("Plus", "\\+"),
            TokenTypeDef::new("Whitespace", "\\s+").skipped(),
        ])
        .unwrap(),
    )
}

#[test]
fn test_repetition_resumes_after_garbage() {
    let vocab = statement_vocabulary();
    let tokens = lex(&vocab, "a; 1 2 b; end");
    let grammar = GrammarBuilder::new("Statements", vocab)
        .rule(&STATEMENTS)
        .build()
        .unwrap();
    let mut parser = Parser::new(grammar, tokens).unwrap();

    assert_eq!(parser.invoke(&STATEMENTS).unwrap(), vec!["a", "b"]);
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(parser.errors()[0].kind, RecognitionExceptionKind::MismatchedToken);
    assert_eq!(
        parser.errors()[0].message,
        "Expecting token of type -->End<-- but found -->'1'<--"
    );
    assert!(parser.is_at_end_of_input());
}

#[test]
fn test_repetition_ends_at_expected_token() {
    let vocab = statement_vocabulary();
    let tokens = lex(&vocab, "a; b; end");
    let grammar = GrammarBuilder::new("Statements", vocab)
        .rule(&STATEMENTS)
        .build()
        .unwrap();
    let mut parser = Parser::new(grammar, tokens).unwrap();

    assert_eq!(parser.invoke(&STATEMENTS).unwrap(), vec!["a", "b"]);
    assert!(parser.errors().is_empty());
}

// ============================================================================
// Rule-level re-sync
// ============================================================================

static PROGRAM: Rule<Vec<String>> = Rule::new("program", program);
static ASSIGNMENT: Rule<String> = Rule::with_invalid("assignment", assignment, invalid_assignment);

fn program(p: &mut Parser) -> ParseResult<Vec<String>> {
    p.many(|p| p.subrule(&ASSIGNMENT))
}

fn assignment(p: &mut Parser) -> ParseResult<String> {
    let name = p.consume("Ident")?;
    p.consume("Eq")?;
    let value = p.consume("Int")?;
    p.consume("Semi")?;
    Ok(format!("{}={}", name.image, value.image))
}

fn invalid_assignment() -> String {
    "<invalid>".to_string()
}

fn program_parser(input: &str, config: ParserConfig) -> Parser {
    let vocab = statement_vocabulary();
    let tokens = lex(&vocab, input);
    let grammar = GrammarBuilder::new("Program", vocab)
        .rule(&PROGRAM)
        .rule(&ASSIGNMENT)
        .build()
        .unwrap();
    Parser::with_config(grammar, tokens, config).unwrap()
}

#[test]
fn test_rule_resyncs_to_follow_set() {
    let mut parser = program_parser("a = 1; b = + + 2; c = 3;", ParserConfig::default());
    assert_eq!(
        parser.invoke(&PROGRAM).unwrap(),
        vec!["a=1", "<invalid>", "c=3"]
    );
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(parser.errors()[0].rule_stack, vec!["program", "assignment"]);
    assert_eq!(parser.errors()[0].token.image, "+");
    assert!(parser.is_at_end_of_input());
}

#[test]
fn test_inserted_token_keeps_parsing() {
    let mut parser = program_parser("a 1; b = 2;", ParserConfig::default());
    assert_eq!(parser.invoke(&PROGRAM).unwrap(), vec!["a=1", "b=2"]);
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(
        parser.errors()[0].message,
        "Expecting token of type -->Eq<-- but found -->'1'<--"
    );
}

#[test]
fn test_rule_without_resync_fails_up_to_entry_rule() {
    static STRICT: Rule<String> = Rule::new("strict", assignment).without_resync();
    static STRICT_PROGRAM: Rule<Vec<String>> = Rule::new("strictProgram", strict_program);
    fn strict_program(p: &mut Parser) -> ParseResult<Vec<String>> {
        p.many(|p| p.subrule(&STRICT))
    }

    let vocab = statement_vocabulary();
    let tokens = lex(&vocab, "a = 1; b = + + 2; c = 3;");
    let grammar = GrammarBuilder::new("Strict", vocab)
        .rule(&STRICT_PROGRAM)
        .rule(&STRICT)
        .build()
        .unwrap();
    let mut parser = Parser::new(grammar, tokens).unwrap();

    // the entry rule always re-syncs, discarding what it parsed
    assert!(parser.invoke(&STRICT_PROGRAM).unwrap().is_empty());
    assert_eq!(parser.errors()[0].rule_stack, vec!["strictProgram", "strict"]);
}

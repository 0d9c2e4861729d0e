//! Property-based tests using proptest
//!
//! These tests check lexer and parser invariants across a wide range of
//! generated inputs, valid and malformed.

use llkit::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

static SUM: Rule<i64> = Rule::new("sum", sum);

fn sum(p: &mut Parser) -> ParseResult<i64> {
    let terms = p.at_least_one_sep("Plus", |p| p.consume("Int"))?;
    Ok(p.action(|| {
        terms
            .items
            .iter()
            .filter_map(|t| t.image.parse::<i64>().ok())
            .sum()
    }))
}

fn vocabulary() -> Arc<TokenVocabulary> {
    Arc::new(
        TokenVocabulary::new(vec![
            TokenTypeDef::new("Int", "[0-9]+"),
            TokenTypeDef::new("Plus", "\\+"),
            TokenTypeDef::new("Ident", "[a-z]+"),
            TokenTypeDef::new("Whitespace", "[ \\t\\n]+").skipped(),
        ])
        .unwrap(),
    )
}

fn sum_parser(vocab: &Arc<TokenVocabulary>, input: &str) -> Parser {
    let tokens = Lexer::new(vocab).unwrap().tokenize(input).unwrap().tokens;
    let grammar = GrammarBuilder::new("Sums", Arc::clone(vocab))
        .rule(&SUM)
        .build()
        .unwrap();
    Parser::new(grammar, tokens).unwrap()
}

// =============================================================================
// Lexer Properties
// =============================================================================

proptest! {
    /// Every token image is the input text at the token's offset
    #[test]
    fn test_tokens_point_into_input(input in "[a-z0-9+ \\n]{0,60}") {
        let vocab = vocabulary();
        let result = Lexer::new(&vocab).unwrap().tokenize(&input).unwrap();

        prop_assert!(result.errors.is_empty());
        let mut last_end = 0usize;
        for token in &result.tokens {
            let offset = token.offset as usize;
            prop_assert!(offset >= last_end);
            prop_assert_eq!(&input[offset..offset + token.image.len()], token.image.as_str());
            last_end = offset + token.image.len();
        }
    }

    /// Unmatched characters are reported, never dropped silently
    #[test]
    fn test_unmatched_characters_are_accounted(input in "[a-z0-9#@ ]{0,40}") {
        let vocab = vocabulary();
        let result = Lexer::new(&vocab).unwrap().tokenize(&input).unwrap();

        let bad = input.chars().filter(|c| *c == '#' || *c == '@').count();
        let skipped: usize = result.errors.iter().map(|e| e.length).sum();
        prop_assert_eq!(skipped, bad);
    }

    /// Lines and columns agree with the text before each token
    #[test]
    fn test_positions_match_text(input in "[a-z0-9 \\n]{0,60}") {
        let vocab = vocabulary();
        let result = Lexer::new(&vocab).unwrap().tokenize(&input).unwrap();

        for token in &result.tokens {
            let before = &input[..token.offset as usize];
            let line = before.matches('\n').count() as isize + 1;
            let column = before.rsplit('\n').next().unwrap_or("").chars().count() as isize + 1;
            prop_assert_eq!(token.start_line, line);
            prop_assert_eq!(token.start_column, column);
        }
    }
}

// =============================================================================
// Parser Properties
// =============================================================================

proptest! {
    /// Well-formed sums parse without errors and evaluate correctly
    #[test]
    fn test_valid_sums(numbers in prop::collection::vec(0i64..1000, 1..20)) {
        let input = numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        let vocab = vocabulary();
        let mut parser = sum_parser(&vocab, &input);

        prop_assert_eq!(parser.invoke(&SUM).unwrap(), numbers.iter().sum::<i64>());
        prop_assert!(parser.errors().is_empty());
        prop_assert!(parser.is_at_end_of_input());
    }

    /// Recovery always yields a value for malformed input
    #[test]
    fn test_malformed_input_recovers(input in "[0-9a-z+ ]{0,30}") {
        let vocab = vocabulary();
        let mut parser = sum_parser(&vocab, &input);
        prop_assert!(parser.invoke(&SUM).is_ok());
    }

    /// Reset returns the parser to its initial state
    #[test]
    fn test_reset_is_repeatable(input in "[0-9+ ]{0,30}") {
        let vocab = vocabulary();
        let mut parser = sum_parser(&vocab, &input);
        let first = parser.invoke(&SUM);
        let first_errors = parser.errors().to_vec();

        parser.reset();
        prop_assert_eq!(parser.invoke(&SUM), first);
        prop_assert_eq!(parser.errors(), first_errors.as_slice());
    }
}

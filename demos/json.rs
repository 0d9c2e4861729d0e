//! JSON Parser Example
//!
//! Lexes and parses JSON into a `serde_json::Value`, then shows how a
//! malformed document is still parsed, with the problems reported as
//! recognition errors.
//!
//! Run with: cargo run --example json

use llkit::prelude::*;
use serde_json::{Map, Value};
use std::sync::Arc;

static JSON: Rule<Value> = Rule::new("json", json);
static OBJECT: Rule<Value> = Rule::new("object", object);
static PAIR: Rule<(String, Value)> = Rule::new("objectItem", pair);
static ARRAY: Rule<Value> = Rule::new("array", array);
static VALUE: Rule<Value> = Rule::new("value", value);

fn json(p: &mut Parser) -> ParseResult<Value> {
    p.or(vec![
        Alt::new(|p| p.subrule(&OBJECT)),
        Alt::new(|p| p.subrule(&ARRAY)),
    ])
}

fn object(p: &mut Parser) -> ParseResult<Value> {
    p.consume("LCurly")?;
    let pairs = p.many_sep("Comma", |p| p.subrule(&PAIR))?;
    p.consume("RCurly")?;
    Ok(Value::Object(pairs.items.into_iter().collect::<Map<_, _>>()))
}

fn pair(p: &mut Parser) -> ParseResult<(String, Value)> {
    let key = p.consume("StringLiteral")?;
    p.consume("Colon")?;
    let value = p.subrule(&VALUE)?;
    let key = p.action(|| serde_json::from_str::<String>(&key.image).unwrap_or_default());
    Ok((key, value))
}

fn array(p: &mut Parser) -> ParseResult<Value> {
    p.consume("LSquare")?;
    let items = p.many_sep("Comma", |p| p.subrule(&VALUE))?;
    p.consume("RSquare")?;
    Ok(Value::Array(items.items))
}

fn literal(p: &mut Parser, token_type: &str) -> ParseResult<Value> {
    let token = p.consume(token_type)?;
    Ok(p.action(|| serde_json::from_str(&token.image).unwrap_or_default()))
}

fn value(p: &mut Parser) -> ParseResult<Value> {
    p.or_with(
        1,
        vec![
            Alt::new(|p| literal(p, "StringLiteral")),
            Alt::new(|p| literal(p, "NumberLiteral")),
            Alt::new(|p| p.subrule(&OBJECT)),
            Alt::new(|p| p.subrule(&ARRAY)),
            Alt::new(|p| literal(p, "True")),
            Alt::new(|p| literal(p, "False")),
            Alt::new(|p| literal(p, "Null")),
        ],
        OrOptions::new().with_description("a JSON value"),
    )
}

fn vocabulary() -> Arc<TokenVocabulary> {
    Arc::new(
        TokenVocabulary::new(vec![
            TokenTypeDef::new("True", "true"),
            TokenTypeDef::new("False", "false"),
            TokenTypeDef::new("Null", "null"),
            TokenTypeDef::new("LCurly", "\\{"),
            TokenTypeDef::new("RCurly", "\\}"),
            TokenTypeDef::new("LSquare", "\\["),
            TokenTypeDef::new("RSquare", "\\]"),
            TokenTypeDef::new("Comma", ","),
            TokenTypeDef::new("Colon", ":"),
            TokenTypeDef::new(
                "StringLiteral",
                r#""(?:[^\\"]|\\(?:[bfnrtv"\\/]|u[0-9a-fA-F]{4}))*""#,
            ),
            TokenTypeDef::new(
                "NumberLiteral",
                r"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?",
            ),
            TokenTypeDef::new("WhiteSpace", r"[ \t\n\r]+").skipped(),
        ])
        .expect("JSON token definitions are valid"),
    )
}

struct JsonGrammar;

impl GrammarDefinition for JsonGrammar {
    fn define() -> GrammarBuilder {
        GrammarBuilder::new("JsonParser", vocabulary())
            .rule(&JSON)
            .rule(&OBJECT)
            .rule(&PAIR)
            .rule(&ARRAY)
            .rule(&VALUE)
    }
}

fn parse(lexer: &Lexer, input: &str) -> Result<(Value, Vec<RecognitionException>), String> {
    let lexed = lexer.tokenize(input).map_err(|e| e.to_string())?;
    for error in &lexed.errors {
        println!("  lexing error: {}", error);
    }
    let mut parser = Parser::for_definition::<JsonGrammar>(lexed.tokens).map_err(|e| e.to_string())?;
    let value = parser.invoke(&JSON).map_err(|e| e.to_string())?;
    Ok((value, parser.take_errors()))
}

fn main() {
    let grammar = llkit::grammar_of::<JsonGrammar>();
    let lexer = Lexer::new(grammar.vocabulary()).expect("JSON lexer definitions are valid");

    println!("Grammar:");
    for (_, rule) in grammar.rules().iter() {
        println!("  {}", rule.display(grammar.vocabulary()));
    }
    println!();

    let inputs = [
        r#"{"name": "llkit", "version": [0, 5, 14], "stable": false, "meta": null}"#,
        // missing comma, stray colon, and a value that never arrives
        r#"{"a": 1 "b": [1, 2 : 3], "c": }"#,
    ];

    for input in inputs {
        println!("Input: {}", input);
        match parse(&lexer, input) {
            Ok((value, errors)) => {
                match serde_json::to_string_pretty(&value) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("  cannot print value: {}", e),
                }
                for error in errors {
                    println!("  {}", error);
                }
            }
            Err(e) => println!("  failed: {}", e),
        }
        println!();
    }
}

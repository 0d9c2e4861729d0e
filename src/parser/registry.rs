//! Per-type grammar registry
//!
//! A type implementing [`GrammarDefinition`] describes one grammar. The first
//! request for it runs recording and analysis; every later request, from any
//! thread, gets the same [`Grammar`]. Definition errors are kept with the
//! grammar, so each [`Parser::for_definition`] call reports them again.

use super::grammar::{Grammar, GrammarBuilder};
use super::Parser;
use crate::error::{DefinitionErrors, ParserDefinitionError};
use crate::tokens::Token;
use ahash::AHashMap;
use once_cell::sync::{Lazy, OnceCell};
use std::any::TypeId;
use std::sync::{Arc, Mutex, PoisonError};

type GrammarCell = Arc<OnceCell<Arc<Grammar>>>;

static GRAMMARS: Lazy<Mutex<AHashMap<TypeId, GrammarCell>>> =
    Lazy::new(|| Mutex::new(AHashMap::new()));

/// A grammar known by its Rust type
pub trait GrammarDefinition: 'static {
    /// Describe the grammar: vocabulary, configuration and rules
    fn define() -> GrammarBuilder;
}

fn cell_for<G: GrammarDefinition>() -> GrammarCell {
    let mut grammars = GRAMMARS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(grammars.entry(TypeId::of::<G>()).or_default())
}

/// The analyzed grammar of `G`, built on first use
pub fn grammar_of<G: GrammarDefinition>() -> Arc<Grammar> {
    // the map lock is released before analysis so definitions may use
    // other registered grammars
    let cell = cell_for::<G>();
    Arc::clone(cell.get_or_init(|| G::define().analyze()))
}

/// Whether the grammar of `G` has been analyzed already
pub fn is_analyzed<G: GrammarDefinition>() -> bool {
    let grammars = GRAMMARS.lock().unwrap_or_else(PoisonError::into_inner);
    grammars
        .get(&TypeId::of::<G>())
        .is_some_and(|cell| cell.get().is_some())
}

impl Parser {
    /// A parser for the registered grammar `G`
    pub fn for_definition<G: GrammarDefinition>(
        tokens: Vec<Token>,
    ) -> Result<Self, DefinitionErrors<ParserDefinitionError>> {
        Parser::new(grammar_of::<G>(), tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseResult;
    use crate::parser::Rule;
    use crate::tokens::{TokenTypeDef, TokenVocabulary};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DEFINED: AtomicUsize = AtomicUsize::new(0);
    static BROKEN_DEFINED: AtomicUsize = AtomicUsize::new(0);
    static WORD: Rule<String> = Rule::new("word", word);
    static WORDS: Rule<()> = Rule::new("words", words);

    fn word(p: &mut Parser) -> ParseResult<String> {
        p.consume("Word").map(|t| t.image)
    }

    fn words(p: &mut Parser) -> ParseResult<()> {
        p.subrule(&WORDS)?;
        p.consume("Word")?;
        Ok(())
    }

    struct Words;

    impl GrammarDefinition for Words {
        fn define() -> GrammarBuilder {
            DEFINED.fetch_add(1, Ordering::SeqCst);
            let vocab = TokenVocabulary::new(vec![TokenTypeDef::new("Word", "[a-z]+")]).unwrap();
            GrammarBuilder::new("Words", Arc::new(vocab)).rule(&WORD)
        }
    }

    struct LeftRecursive;

    impl GrammarDefinition for LeftRecursive {
        fn define() -> GrammarBuilder {
            BROKEN_DEFINED.fetch_add(1, Ordering::SeqCst);
            let vocab = TokenVocabulary::new(vec![TokenTypeDef::new("Word", "[a-z]+")]).unwrap();
            GrammarBuilder::new("LeftRecursive", Arc::new(vocab)).rule(&WORDS)
        }
    }

    #[test]
    fn test_definition_errors_on_every_instantiation() {
        for _ in 0..2 {
            let errors = Parser::for_definition::<LeftRecursive>(Vec::new()).unwrap_err();
            assert_eq!(errors.len(), 1);
        }
        assert_eq!(BROKEN_DEFINED.load(Ordering::SeqCst), 1);
        assert!(is_analyzed::<LeftRecursive>());
        assert!(grammar_of::<LeftRecursive>().has_definition_errors());
    }

    #[test]
    fn test_analysis_runs_once() {
        let threads: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(grammar_of::<Words>))
            .collect();
        let grammars: Vec<Arc<Grammar>> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert!(grammars.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(DEFINED.load(Ordering::SeqCst), 1);
        assert!(is_analyzed::<Words>());

        let word = grammars[0].vocabulary().id("Word").unwrap();
        let mut parser = Parser::for_definition::<Words>(vec![Token::new(word, "hi", 0, 1, 1)]).unwrap();
        assert_eq!(parser.invoke(&WORD).unwrap(), "hi");
    }
}

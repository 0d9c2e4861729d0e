//! Recording rule structure
//!
//! While a [`Parser`] is in recording mode its DSL methods append GAST nodes
//! instead of reading input. Nested constructs open a frame, run their body
//! once, and close the frame into the children of the new node. Consumed
//! tokens are virtual, subrules return their rule's recovery value and
//! explicit guards are not evaluated.

use super::{Alt, OrOptions, Parser};
use crate::error::{ParseFailure, ParseResult, ParserDefinitionError, ParserDefinitionErrorKind};
use crate::grammar::{Production, ProductionKind};
use crate::tokens::{Token, TokenTypeId};

/// Highest occurrence index accepted by the DSL
pub(crate) const MAX_OCCURRENCE: u32 = 5;

/// Structure captured from one run of a rule body
#[derive(Debug)]
pub(crate) struct Recorder {
    frames: Vec<Vec<Production>>,
    errors: Vec<ParserDefinitionError>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
            errors: Vec::new(),
        }
    }

    fn push(&mut self, prod: Production) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(prod);
        }
    }

    fn open(&mut self) {
        self.frames.push(Vec::new());
    }

    fn close(&mut self) -> Vec<Production> {
        // the root frame is only taken by `finish`
        if self.frames.len() > 1 {
            self.frames.pop().unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    fn check_occurrence(&mut self, kind: ProductionKind, occurrence: u32) {
        if occurrence == 0 || occurrence > MAX_OCCURRENCE {
            self.errors.push(
                ParserDefinitionError::new(
                    ParserDefinitionErrorKind::InvalidOccurrenceIndex,
                    format!(
                        "Invalid occurrence index ->{}<- for {}, it must be between 1 and {}",
                        occurrence,
                        kind.dsl_name(),
                        MAX_OCCURRENCE
                    ),
                )
                .at_production(kind.dsl_name(), occurrence),
            );
        }
    }

    fn unknown_token(&mut self, kind: ProductionKind, occurrence: u32, name: String) {
        self.errors.push(
            ParserDefinitionError::new(
                ParserDefinitionErrorKind::UnknownTokenType,
                format!(
                    "Unknown token type ->{}<- used in {}{}",
                    name,
                    kind.dsl_name(),
                    occurrence
                ),
            )
            .at_production(kind.dsl_name(), occurrence)
            .with_parameter(name),
        );
    }

    /// The recorded rule body and the problems found while recording it
    pub(crate) fn finish(mut self) -> (Vec<Production>, Vec<ParserDefinitionError>) {
        self.frames.truncate(1);
        (self.frames.pop().unwrap_or_default(), self.errors)
    }
}

impl Parser {
    fn with_recorder(&mut self, f: impl FnOnce(&mut Recorder)) {
        if let Some(recorder) = self.recorder.as_mut() {
            f(recorder);
        }
    }

    pub(super) fn take_recorder(&mut self) -> Option<Recorder> {
        self.recorder.take()
    }

    pub(super) fn record_terminal(
        &mut self,
        token_type: Option<TokenTypeId>,
        described: String,
        occurrence: u32,
    ) -> Token {
        self.with_recorder(|r| {
            r.check_occurrence(ProductionKind::Terminal, occurrence);
            match token_type {
                Some(token_type) => r.push(Production::Terminal {
                    token_type,
                    occurrence,
                }),
                None => r.unknown_token(ProductionKind::Terminal, occurrence, described),
            }
        });
        Token::virtual_token(token_type.unwrap_or(TokenTypeId::EOF))
    }

    pub(super) fn record_non_terminal(&mut self, name: &str, occurrence: u32) {
        self.with_recorder(|r| {
            r.check_occurrence(ProductionKind::NonTerminal, occurrence);
            r.push(Production::non_terminal(name, occurrence));
        });
    }

    /// Run `body` once inside a new frame and record it as a `kind` node
    pub(super) fn record_scope<T>(
        &mut self,
        kind: ProductionKind,
        occurrence: u32,
        separator: Option<TokenTypeId>,
        body: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.with_recorder(Recorder::open);
        let result = body(self);
        let mut definition = Vec::new();
        self.with_recorder(|r| definition = r.close());

        let separator = separator.unwrap_or(TokenTypeId::EOF);
        let prod = match kind {
            ProductionKind::Option => Production::Option {
                definition,
                occurrence,
            },
            ProductionKind::Repetition => Production::Repetition {
                definition,
                occurrence,
            },
            ProductionKind::RepetitionMandatory => Production::RepetitionMandatory {
                definition,
                occurrence,
            },
            ProductionKind::RepetitionWithSeparator => Production::RepetitionWithSeparator {
                definition,
                separator,
                occurrence,
            },
            ProductionKind::RepetitionMandatoryWithSeparator => {
                Production::RepetitionMandatoryWithSeparator {
                    definition,
                    separator,
                    occurrence,
                }
            }
            ProductionKind::Terminal | ProductionKind::NonTerminal | ProductionKind::Alternation => {
                Production::Flat { definition }
            }
        };
        self.with_recorder(|r| {
            r.check_occurrence(kind, occurrence);
            r.push(prod);
        });
        result
    }

    /// Record a separator reference that failed to resolve
    pub(super) fn record_unknown_separator(&mut self, kind: ProductionKind, occurrence: u32, name: String) {
        self.with_recorder(|r| r.unknown_token(kind, occurrence, name));
    }

    /// Run every alternative once and record the choice; yields the first
    /// alternative's value
    pub(super) fn record_or<T>(
        &mut self,
        occurrence: u32,
        alternatives: &mut [Alt<'_, T>],
        options: &OrOptions,
    ) -> ParseResult<T> {
        // guards are only consulted when the first alternative has one
        let explicit = alternatives.first().is_some_and(|alt| alt.guard.is_some());
        let mut recorded = Vec::with_capacity(alternatives.len());
        let mut first_value = None;
        let mut failure = None;

        for alt in alternatives.iter_mut() {
            self.with_recorder(Recorder::open);
            let result = (alt.body)(self);
            let mut definition = Vec::new();
            self.with_recorder(|r| definition = r.close());
            recorded.push(definition);

            match result {
                Ok(value) if first_value.is_none() => first_value = Some(value),
                Ok(_) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        self.with_recorder(|r| {
            r.check_occurrence(ProductionKind::Alternation, occurrence);
            r.push(Production::Alternation {
                alternatives: recorded,
                occurrence,
                ignore_ambiguities: options.ignore_ambiguities || explicit,
            });
        });

        if let Some(e) = failure {
            return Err(e);
        }
        first_value.ok_or_else(|| ParseFailure::fatal("OR requires at least one alternative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_nest() {
        let mut recorder = Recorder::new();
        recorder.push(Production::terminal(TokenTypeId(1), 1));
        recorder.open();
        recorder.push(Production::terminal(TokenTypeId(2), 1));
        let inner = recorder.close();
        assert_eq!(inner, vec![Production::terminal(TokenTypeId(2), 1)]);
        // closing the root frame is a no-op
        assert!(recorder.close().is_empty());
        let (definition, errors) = recorder.finish();
        assert_eq!(definition, vec![Production::terminal(TokenTypeId(1), 1)]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_occurrence_bounds() {
        let mut recorder = Recorder::new();
        recorder.check_occurrence(ProductionKind::Option, 1);
        recorder.check_occurrence(ProductionKind::Option, 5);
        recorder.check_occurrence(ProductionKind::Option, 6);
        recorder.check_occurrence(ProductionKind::Terminal, 0);
        let (_, errors) = recorder.finish();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ParserDefinitionErrorKind::InvalidOccurrenceIndex);
        assert_eq!(errors[1].dsl_name.as_deref(), Some("CONSUME"));
    }
}

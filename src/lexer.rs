//! Regex lexer
//!
//! Turns text into a token stream using the patterns of a
//! [`TokenVocabulary`]:
//!
//! - patterns are tried in definition order and the first match wins;
//! - when the winner declares a longer alternative, that pattern is tried
//!   once more at the same position and replaces the match only if it is
//!   strictly longer (keywords vs identifiers);
//! - skipped tokens are dropped, named groups collect into side channels;
//! - unmatched characters are reported and dropped one at a time until some
//!   pattern can match again.
//!
//! ```
//! use llkit::lexer::Lexer;
//! use llkit::tokens::{TokenTypeDef, TokenVocabulary};
//!
//! let vocab = TokenVocabulary::new(vec![
//!     TokenTypeDef::new("Integer", "\\d+"),
//!     TokenTypeDef::new("Plus", "\\+"),
//! ])
//! .unwrap();
//! let lexer = Lexer::new(&vocab).unwrap();
//!
//! let result = lexer.tokenize("12+34").unwrap();
//! let images: Vec<_> = result.tokens.iter().map(|t| t.image.as_str()).collect();
//! assert_eq!(images, ["12", "+", "34"]);
//! assert!(result.errors.is_empty());
//! ```

use crate::error::{DefinitionErrors, LexerDefinitionError, LexerDefinitionErrorKind, LexingError};
use crate::regex_cache;
use crate::tokens::{Group, Pattern, Token, TokenType, TokenTypeId, TokenVocabulary};
use hashbrown::HashMap;
use regex::Regex;

/// Lexer construction options
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerConfig {
    /// Keep definition errors on the lexer instead of failing construction.
    ///
    /// `tokenize` still refuses to run while errors exist.
    pub defer_definition_errors: bool,
}

impl LexerConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether definition errors are deferred
    pub fn with_defer_definition_errors(mut self, defer: bool) -> Self {
        self.defer_definition_errors = defer;
        self
    }
}

/// Output of [`Lexer::tokenize`]
#[derive(Debug, Clone, Default)]
pub struct LexResult {
    /// Tokens of the default group, in input order
    pub tokens: Vec<Token>,
    /// Tokens of named groups; every named group is present, even if empty
    pub groups: HashMap<String, Vec<Token>>,
    /// Unmatched character spans
    pub errors: Vec<LexingError>,
}

#[derive(Debug)]
struct CompiledPattern {
    token_type: TokenTypeId,
    regex: Regex,
    group: Group,
    longer_alt: Option<usize>,
}

impl CompiledPattern {
    /// Length in bytes of a non-empty match at the start of `rest`
    #[inline]
    fn match_len(&self, rest: &str) -> Option<usize> {
        self.regex
            .find(rest)
            .map(|m| m.end())
            .filter(|&len| len > 0)
    }
}

/// A compiled lexer
#[derive(Debug)]
pub struct Lexer {
    patterns: Vec<CompiledPattern>,
    empty_groups: Vec<String>,
    definition_errors: Vec<LexerDefinitionError>,
}

impl Lexer {
    /// Build a lexer over every type of `vocabulary`, in definition order
    pub fn new(vocabulary: &TokenVocabulary) -> Result<Self, DefinitionErrors<LexerDefinitionError>> {
        Self::with_config(vocabulary, LexerConfig::default())
    }

    /// Build a lexer over every type of `vocabulary` with explicit options
    pub fn with_config(
        vocabulary: &TokenVocabulary,
        config: LexerConfig,
    ) -> Result<Self, DefinitionErrors<LexerDefinitionError>> {
        let ids: Vec<TokenTypeId> = vocabulary
            .types()
            .iter()
            .filter(|t| t.id != TokenTypeId::EOF)
            .map(|t| t.id)
            .collect();
        Self::for_token_types(vocabulary, &ids, config)
    }

    /// Build a lexer over a chosen subset of types; order sets priority
    pub fn for_token_types(
        vocabulary: &TokenVocabulary,
        token_types: &[TokenTypeId],
        config: LexerConfig,
    ) -> Result<Self, DefinitionErrors<LexerDefinitionError>> {
        let types: Vec<&TokenType> = token_types
            .iter()
            .filter_map(|&id| vocabulary.get(id))
            .collect();

        let mut definition_errors = validate_patterns(&types);
        if !config.defer_definition_errors {
            if let Some(errors) = DefinitionErrors::from_vec(definition_errors) {
                return Err(errors);
            }
            definition_errors = Vec::new();
        }

        // a lexer with definition errors is never used, skip the analysis
        let (patterns, empty_groups) = if definition_errors.is_empty() {
            match compile_patterns(&types) {
                Ok(compiled) => compiled,
                Err(e) => {
                    if config.defer_definition_errors {
                        definition_errors.push(e);
                        (Vec::new(), Vec::new())
                    } else {
                        return Err(DefinitionErrors::single(e));
                    }
                }
            }
        } else {
            (Vec::new(), Vec::new())
        };

        log_debug!(
            "lexer built: {} patterns, {} named groups, {} definition errors",
            patterns.len(),
            empty_groups.len(),
            definition_errors.len()
        );

        Ok(Self {
            patterns,
            empty_groups,
            definition_errors,
        })
    }

    /// Errors kept when construction deferred them
    pub fn definition_errors(&self) -> &[LexerDefinitionError] {
        &self.definition_errors
    }

    /// Tokenize `text`.
    ///
    /// Fails only when the lexer has (deferred) definition errors; unmatched
    /// input is reported in [`LexResult::errors`].
    pub fn tokenize(&self, text: &str) -> Result<LexResult, DefinitionErrors<LexerDefinitionError>> {
        if let Some(errors) = DefinitionErrors::from_vec(self.definition_errors.clone()) {
            return Err(errors);
        }

        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut groups: HashMap<String, Vec<Token>> = self
            .empty_groups
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();

        let mut offset = 0usize;
        let mut line = 1usize;
        let mut column = 1usize;

        while offset < text.len() {
            let rest = &text[offset..];
            let Some((idx, len)) = self.match_at(rest) else {
                let error_offset = offset;
                let error_line = line;
                let error_column = column;
                let mut skipped = 0usize;
                let mut remaining = rest;

                while let Some(dropped) = remaining.chars().next() {
                    let after = &remaining[dropped.len_utf8()..];
                    if dropped == '\n' || (dropped == '\r' && !after.starts_with('\n')) {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                    offset += dropped.len_utf8();
                    skipped += 1;
                    remaining = after;
                    if self.can_match_at(remaining) {
                        break;
                    }
                }

                let unexpected = rest.chars().next().unwrap_or_default();
                errors.push(LexingError {
                    offset: error_offset,
                    line: error_line,
                    column: error_column,
                    length: skipped,
                    message: format!(
                        "unexpected character: ->{}<- at offset: {}, skipped {} characters.",
                        unexpected, error_offset, skipped
                    ),
                });
                continue;
            };

            let pattern = &self.patterns[idx];
            let image = &rest[..len];
            let width = image.chars().count();
            let mut token = match pattern.group {
                Group::Skipped => None,
                _ => Some(Token::new(
                    pattern.token_type,
                    image,
                    offset as isize,
                    line as isize,
                    column as isize,
                )),
            };

            offset += len;
            column += width;

            let terminators = count_line_terminators(image);
            if terminators > 0 {
                if let Some(last_lt_byte) = memchr::memrchr2(b'\n', b'\r', image.as_bytes()) {
                    line += terminators;
                    let last_lt_idx = image[..last_lt_byte].chars().count();
                    column = width - last_lt_idx;

                    // a trailing terminator only moves the following tokens
                    let ends_with_lt = last_lt_idx == width - 1;
                    if let Some(token) = token.as_mut() {
                        if !(terminators == 1 && ends_with_lt) {
                            let fix: isize = if ends_with_lt { -1 } else { 0 };
                            token.end_line = line as isize + fix;
                            token.end_column = column as isize - 1 - fix;
                        }
                    }
                }
            }

            if let Some(token) = token {
                match &pattern.group {
                    Group::Named(name) => groups.entry(name.clone()).or_default().push(token),
                    _ => tokens.push(token),
                }
            }
        }

        Ok(LexResult {
            tokens,
            groups,
            errors,
        })
    }

    /// First matching pattern, with the one-level longer-alternative check
    fn match_at(&self, rest: &str) -> Option<(usize, usize)> {
        let (idx, len) = self
            .patterns
            .iter()
            .enumerate()
            .find_map(|(idx, p)| p.match_len(rest).map(|len| (idx, len)))?;

        if let Some(alt_idx) = self.patterns[idx].longer_alt {
            if let Some(alt_len) = self.patterns[alt_idx].match_len(rest) {
                if alt_len > len {
                    return Some((alt_idx, alt_len));
                }
            }
        }
        Some((idx, len))
    }

    fn can_match_at(&self, rest: &str) -> bool {
        self.patterns.iter().any(|p| p.match_len(rest).is_some())
    }
}

/// Count line terminators; `\r\n` counts once
pub fn count_line_terminators(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut crlf_tail = None;
    for pos in memchr::memchr2_iter(b'\n', b'\r', bytes) {
        if crlf_tail == Some(pos) {
            continue;
        }
        count += 1;
        if bytes[pos] == b'\r' && bytes.get(pos + 1) == Some(&b'\n') {
            crlf_tail = Some(pos + 1);
        }
    }
    count
}

// ============================================================================
// Definition validation
// ============================================================================

fn validate_patterns(types: &[&TokenType]) -> Vec<LexerDefinitionError> {
    let (mut errors, valid) = find_missing_patterns(types);
    let (invalid, valid) = find_invalid_patterns(&valid);
    errors.extend(invalid);
    errors.extend(find_end_of_input_anchor(&valid));
    errors.extend(find_unsupported_flags(&valid));
    errors.extend(find_duplicate_patterns(&valid));
    errors.extend(find_invalid_group_type(&valid));
    errors
}

fn single_type_error(
    kind: LexerDefinitionErrorKind,
    token_type: &TokenType,
    message: String,
) -> LexerDefinitionError {
    LexerDefinitionError {
        kind,
        message,
        token_types: vec![token_type.id],
    }
}

fn find_missing_patterns<'a>(
    types: &[&'a TokenType],
) -> (Vec<LexerDefinitionError>, Vec<&'a TokenType>) {
    let mut errors = Vec::new();
    let mut valid = Vec::new();
    for &t in types {
        if t.pattern.is_some() {
            valid.push(t);
        } else {
            errors.push(single_type_error(
                LexerDefinitionErrorKind::MissingPattern,
                t,
                format!("Token type: ->{}<- missing pattern", t.name),
            ));
        }
    }
    (errors, valid)
}

fn find_invalid_patterns<'a>(
    types: &[&'a TokenType],
) -> (Vec<LexerDefinitionError>, Vec<&'a TokenType>) {
    let mut errors = Vec::new();
    let mut valid = Vec::new();
    for &t in types {
        match &t.pattern {
            Some(Pattern::Regex { source, flags }) => {
                match regex_cache::get_or_compile(source, flags.ignore_case) {
                    Ok(_) => valid.push(t),
                    Err(msg) => errors.push(invalid_pattern_error(t, &msg)),
                }
            }
            _ => valid.push(t),
        }
    }
    (errors, valid)
}

fn invalid_pattern_error(token_type: &TokenType, reason: &str) -> LexerDefinitionError {
    single_type_error(
        LexerDefinitionErrorKind::InvalidPattern,
        token_type,
        format!(
            "Token type: ->{}<- pattern is not a valid regular expression: {}",
            token_type.name, reason
        ),
    )
}

/// `$` not preceded by a backslash
fn has_end_of_input_anchor(source: &str) -> bool {
    source.starts_with('$')
        || source
            .as_bytes()
            .windows(2)
            .any(|w| w[1] == b'$' && w[0] != b'\\')
}

fn find_end_of_input_anchor(types: &[&TokenType]) -> Vec<LexerDefinitionError> {
    types
        .iter()
        .filter(|t| match &t.pattern {
            Some(Pattern::Regex { source, .. }) => has_end_of_input_anchor(source),
            _ => false,
        })
        .map(|t| {
            single_type_error(
                LexerDefinitionErrorKind::EndOfInputAnchorFound,
                t,
                format!(
                    "Token type: ->{}<- pattern cannot contain end of input anchor '$'",
                    t.name
                ),
            )
        })
        .collect()
}

fn find_unsupported_flags(types: &[&TokenType]) -> Vec<LexerDefinitionError> {
    types
        .iter()
        .filter(|t| match &t.pattern {
            Some(Pattern::Regex { flags, .. }) => flags.multiline || flags.global,
            _ => false,
        })
        .map(|t| {
            single_type_error(
                LexerDefinitionErrorKind::UnsupportedFlagsFound,
                t,
                format!(
                    "Token type: ->{}<- pattern may NOT use the global('g') or multiline('m') flags",
                    t.name
                ),
            )
        })
        .collect()
}

/// Identical patterns only; semantically equivalent ones are not detected
fn find_duplicate_patterns(types: &[&TokenType]) -> Vec<LexerDefinitionError> {
    let mut classes: Vec<(&Pattern, Vec<&TokenType>)> = Vec::new();
    for &t in types {
        let Some(pattern @ Pattern::Regex { .. }) = &t.pattern else {
            continue;
        };
        match classes.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, members)) => members.push(t),
            None => classes.push((pattern, vec![t])),
        }
    }

    classes
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(pattern, members)| {
            let source = match pattern {
                Pattern::Regex { source, .. } => source.as_str(),
                Pattern::NotApplicable => "",
            };
            let names: Vec<&str> = members.iter().map(|t| t.name.as_str()).collect();
            LexerDefinitionError {
                kind: LexerDefinitionErrorKind::DuplicatePatternsFound,
                message: format!(
                    "The same RegExp pattern ->/{}/<- has been used in all the following token types: {} <-",
                    source,
                    names.join(", ")
                ),
                token_types: members.iter().map(|t| t.id).collect(),
            }
        })
        .collect()
}

fn find_invalid_group_type(types: &[&TokenType]) -> Vec<LexerDefinitionError> {
    types
        .iter()
        .filter(|t| t.group_declared && !t.group.is_valid())
        .map(|t| {
            single_type_error(
                LexerDefinitionErrorKind::InvalidGroupTypeFound,
                t,
                format!(
                    "Token type: ->{}<- group can only be 'skipped', 'default' or a non-empty name",
                    t.name
                ),
            )
        })
        .collect()
}

fn compile_patterns(
    types: &[&TokenType],
) -> Result<(Vec<CompiledPattern>, Vec<String>), LexerDefinitionError> {
    let mut patterns = Vec::with_capacity(types.len());
    let mut empty_groups: Vec<String> = Vec::new();
    let mut longer_alts = Vec::with_capacity(types.len());

    for &t in types {
        let Some(Pattern::Regex { source, flags }) = &t.pattern else {
            continue;
        };
        let regex = regex_cache::get_or_compile(source, flags.ignore_case)
            .map_err(|msg| invalid_pattern_error(t, &msg))?;
        if let Group::Named(name) = &t.group {
            if !empty_groups.contains(name) {
                empty_groups.push(name.clone());
            }
        }
        longer_alts.push(t.longer_alt);
        patterns.push(CompiledPattern {
            token_type: t.id,
            regex,
            group: t.group.clone(),
            longer_alt: None,
        });
    }

    // an alternative outside this lexer (or a category) is ignored
    for (idx, alt) in longer_alts.into_iter().enumerate() {
        patterns[idx].longer_alt =
            alt.and_then(|alt| patterns.iter().position(|p| p.token_type == alt));
    }

    Ok((patterns, empty_groups))
}

//! Token model
//!
//! A [`TokenVocabulary`] is the closed set of token types a lexer and a
//! grammar agree on. It is built from [`TokenTypeDef`] records, either in
//! code or deserialized from JSON:
//!
//! ```
//! use llkit::tokens::{TokenTypeDef, TokenVocabulary};
//!
//! let vocab = TokenVocabulary::new(vec![
//!     TokenTypeDef::category("Keyword").with_longer_alt("Identifier"),
//!     TokenTypeDef::new("Do", "do").with_category("Keyword"),
//!     TokenTypeDef::new("Identifier", "[a-zA-Z_]\\w*"),
//!     TokenTypeDef::new("Whitespace", "\\s+").skipped(),
//! ])
//! .unwrap();
//!
//! let do_ = vocab.id("Do").unwrap();
//! let keyword = vocab.id("Keyword").unwrap();
//! assert!(vocab.is_instance_of(do_, keyword));
//! ```
//!
//! Categories behave like parent classes: a token of type `Do` is accepted
//! wherever a `Keyword` is expected, and a type inherits the pattern, group
//! and longer alternative of its first category unless it declares its own.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the built-in end-of-file token type.
pub const EOF_NAME: &str = "EOF";

/// Identifier of a token type inside a [`TokenVocabulary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenTypeId(pub(crate) u32);

impl TokenTypeId {
    /// The end-of-file type, present in every vocabulary at index 0
    pub const EOF: TokenTypeId = TokenTypeId(0);

    /// Position of this type in its vocabulary
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Regex flags attached to a pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternFlags {
    /// Case-insensitive matching
    #[serde(default)]
    pub ignore_case: bool,
    /// Multi-line anchors (rejected by the lexer)
    #[serde(default)]
    pub multiline: bool,
    /// Global matching (rejected by the lexer)
    #[serde(default)]
    pub global: bool,
}

/// What a token type matches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// A regular expression, implicitly anchored at the current input position
    Regex {
        /// Expression source
        source: String,
        /// Matching flags
        #[serde(default)]
        flags: PatternFlags,
    },
    /// The type never matches text itself; it only groups other types
    NotApplicable,
}

impl Pattern {
    /// Create a regex pattern without flags
    pub fn regex(source: impl Into<String>) -> Self {
        Pattern::Regex {
            source: source.into(),
            flags: PatternFlags::default(),
        }
    }

    /// Whether this is the category-only marker
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Pattern::NotApplicable)
    }
}

/// Where the lexer puts tokens of a type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// The main token stream
    #[default]
    Default,
    /// Matched and thrown away (whitespace, comments)
    Skipped,
    /// A named side channel in [`LexResult::groups`](crate::lexer::LexResult::groups)
    Named(String),
}

impl Group {
    /// Whether the lexer accepts this group value
    pub fn is_valid(&self) -> bool {
        match self {
            Group::Named(name) => !name.trim().is_empty(),
            _ => true,
        }
    }
}

/// Declarative definition of a token type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTypeDef {
    /// Unique type name
    pub name: String,
    /// Pattern; `None` inherits from the first category or is reported as missing
    #[serde(default)]
    pub pattern: Option<Pattern>,
    /// Output group; `None` inherits from the first category or means default
    #[serde(default)]
    pub group: Option<Group>,
    /// Type to also try when this one matches, keeping the strictly longer match
    #[serde(default)]
    pub longer_alt: Option<String>,
    /// Parent categories, by name
    #[serde(default)]
    pub categories: Vec<String>,
}

impl TokenTypeDef {
    /// A matchable type with a regex pattern
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(Pattern::regex(pattern)),
            group: None,
            longer_alt: None,
            categories: Vec::new(),
        }
    }

    /// A pure category that never matches text directly
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            pattern: Some(Pattern::NotApplicable),
            ..Self::without_pattern(name)
        }
    }

    /// A type with no pattern of its own
    pub fn without_pattern(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            group: None,
            longer_alt: None,
            categories: Vec::new(),
        }
    }

    /// Replace the regex flags (no effect on category types)
    pub fn with_flags(mut self, flags: PatternFlags) -> Self {
        if let Some(Pattern::Regex { flags: current, .. }) = &mut self.pattern {
            *current = flags;
        }
        self
    }

    /// Match case-insensitively
    pub fn ignore_case(self) -> Self {
        self.with_flags(PatternFlags {
            ignore_case: true,
            ..PatternFlags::default()
        })
    }

    /// Set the output group
    pub fn with_group(mut self, group: Group) -> Self {
        self.group = Some(group);
        self
    }

    /// Discard tokens of this type
    pub fn skipped(self) -> Self {
        self.with_group(Group::Skipped)
    }

    /// Set the longer alternative by name
    pub fn with_longer_alt(mut self, name: impl Into<String>) -> Self {
        self.longer_alt = Some(name.into());
        self
    }

    /// Add a parent category by name
    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.categories.push(name.into());
        self
    }
}

/// A resolved token type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenType {
    /// Identity inside the vocabulary
    pub id: TokenTypeId,
    /// Type name
    pub name: String,
    /// Effective pattern (after inheritance)
    pub pattern: Option<Pattern>,
    /// Effective group (after inheritance)
    pub group: Group,
    /// Whether the group was declared on this type or a category
    pub group_declared: bool,
    /// Effective longer alternative (after inheritance)
    pub longer_alt: Option<TokenTypeId>,
    /// Direct parent categories
    pub categories: Vec<TokenTypeId>,
}

/// Errors building a [`TokenVocabulary`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    /// Two definitions share a name (or a definition is named `EOF`)
    DuplicateName(String),
    /// A category or longer alternative refers to an unknown name
    UnknownTokenType {
        /// Definition holding the reference
        referenced_from: String,
        /// Name that could not be found
        name: String,
    },
    /// A type is (transitively) its own category
    CyclicCategory(String),
    /// Malformed JSON definitions
    Json(String),
}

impl fmt::Display for VocabularyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "token type ->{}<- is defined more than once", name),
            Self::UnknownTokenType {
                referenced_from,
                name,
            } => write!(
                f,
                "token type ->{}<- refers to unknown token type ->{}<-",
                referenced_from, name
            ),
            Self::CyclicCategory(name) => {
                write!(f, "token type ->{}<- is a category of itself", name)
            }
            Self::Json(msg) => write!(f, "invalid token definitions: {}", msg),
        }
    }
}

impl std::error::Error for VocabularyError {}

/// The closed set of token types shared by a lexer and a grammar
#[derive(Debug, Clone)]
pub struct TokenVocabulary {
    types: Vec<TokenType>,
    by_name: HashMap<String, TokenTypeId>,
    /// For each type, every category it belongs to (transitively)
    ancestors: Vec<HashSet<TokenTypeId>>,
}

impl TokenVocabulary {
    /// Resolve definitions into a vocabulary.
    ///
    /// Definition order is kept: it is the lexer's matching priority.
    pub fn new(defs: Vec<TokenTypeDef>) -> Result<Self, VocabularyError> {
        let mut by_name = HashMap::with_capacity(defs.len() + 1);
        by_name.insert(EOF_NAME.to_string(), TokenTypeId::EOF);
        for (idx, def) in defs.iter().enumerate() {
            let id = TokenTypeId(idx as u32 + 1);
            if by_name.insert(def.name.clone(), id).is_some() {
                return Err(VocabularyError::DuplicateName(def.name.clone()));
            }
        }

        let mut names = vec![EOF_NAME.to_string()];
        let mut own_patterns = vec![Some(Pattern::NotApplicable)];
        let mut own_groups = vec![None];
        let mut own_longer_alts = vec![None];
        let mut categories = vec![Vec::new()];
        for def in &defs {
            let parents = def
                .categories
                .iter()
                .map(|name| lookup(&by_name, &def.name, name))
                .collect::<Result<Vec<_>, _>>()?;
            let longer_alt = def
                .longer_alt
                .as_deref()
                .map(|name| lookup(&by_name, &def.name, name))
                .transpose()?;
            names.push(def.name.clone());
            own_patterns.push(def.pattern.clone());
            own_groups.push(def.group.clone());
            own_longer_alts.push(longer_alt);
            categories.push(parents);
        }

        let mut ancestors = Vec::with_capacity(names.len());
        for idx in 0..names.len() {
            let id = TokenTypeId(idx as u32);
            let mut path = vec![id];
            let mut seen = vec![id];
            collect_ancestors(id, &categories, &names, &mut path, &mut seen)?;
            ancestors.push(seen.into_iter().filter(|&a| a != id).collect());
        }

        let types = (0..names.len())
            .map(|idx| {
                let id = TokenTypeId(idx as u32);
                let group = inherited(id, &own_groups, &categories);
                TokenType {
                    id,
                    name: names[idx].clone(),
                    pattern: inherited(id, &own_patterns, &categories),
                    group_declared: group.is_some(),
                    group: group.unwrap_or_default(),
                    longer_alt: inherited(id, &own_longer_alts, &categories),
                    categories: categories[idx].clone(),
                }
            })
            .collect();

        Ok(Self {
            types,
            by_name,
            ancestors,
        })
    }

    /// Build a vocabulary from a JSON array of [`TokenTypeDef`]
    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        let defs: Vec<TokenTypeDef> =
            serde_json::from_str(json).map_err(|e| VocabularyError::Json(e.to_string()))?;
        Self::new(defs)
    }

    /// Look up a type by name
    pub fn id(&self, name: &str) -> Option<TokenTypeId> {
        self.by_name.get(name).copied()
    }

    /// Look up a type by id
    pub fn get(&self, id: TokenTypeId) -> Option<&TokenType> {
        self.types.get(id.index())
    }

    /// Name of a type, used in error messages
    pub fn name(&self, id: TokenTypeId) -> &str {
        self.types
            .get(id.index())
            .map_or("<unknown>", |t| t.name.as_str())
    }

    /// All types, `EOF` first, then definition order
    pub fn types(&self) -> &[TokenType] {
        &self.types
    }

    /// Number of types including `EOF`
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false: `EOF` is always present
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether a token of type `actual` satisfies an expectation of `expected`
    #[inline]
    pub fn is_instance_of(&self, actual: TokenTypeId, expected: TokenTypeId) -> bool {
        actual == expected
            || self
                .ancestors
                .get(actual.index())
                .is_some_and(|set| set.contains(&expected))
    }

    /// Whether `actual` is an instance of any of `expected`
    pub fn is_instance_of_any(&self, actual: TokenTypeId, expected: &[TokenTypeId]) -> bool {
        expected.iter().any(|&e| self.is_instance_of(actual, e))
    }
}

fn lookup(
    by_name: &HashMap<String, TokenTypeId>,
    referenced_from: &str,
    name: &str,
) -> Result<TokenTypeId, VocabularyError> {
    by_name
        .get(name)
        .copied()
        .ok_or_else(|| VocabularyError::UnknownTokenType {
            referenced_from: referenced_from.to_string(),
            name: name.to_string(),
        })
}

fn collect_ancestors(
    id: TokenTypeId,
    categories: &[Vec<TokenTypeId>],
    names: &[String],
    path: &mut Vec<TokenTypeId>,
    seen: &mut Vec<TokenTypeId>,
) -> Result<(), VocabularyError> {
    for &parent in &categories[id.index()] {
        if path.contains(&parent) {
            return Err(VocabularyError::CyclicCategory(
                names[parent.index()].clone(),
            ));
        }
        if seen.contains(&parent) {
            continue;
        }
        seen.push(parent);
        path.push(parent);
        collect_ancestors(parent, categories, names, path, seen)?;
        path.pop();
    }
    Ok(())
}

/// Own value, else the first category's effective value. Cycles are rejected
/// before this runs.
fn inherited<T: Clone>(
    id: TokenTypeId,
    own: &[Option<T>],
    categories: &[Vec<TokenTypeId>],
) -> Option<T> {
    let mut current = id;
    loop {
        if let Some(value) = &own[current.index()] {
            return Some(value.clone());
        }
        current = *categories[current.index()].first()?;
    }
}

/// A token instance
///
/// Positions are 1-based; `end_column` is the column of the last character.
/// Virtual tokens (EOF, tokens inserted by error recovery) have an empty
/// image and every position set to -1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Token type
    pub token_type: TokenTypeId,
    /// Matched text
    pub image: String,
    /// Byte offset of the first character
    pub offset: isize,
    /// Line of the first character
    pub start_line: isize,
    /// Column of the first character
    pub start_column: isize,
    /// Line of the last character
    pub end_line: isize,
    /// Column of the last character
    pub end_column: isize,
    /// Set on tokens synthesized by single-token insertion
    pub is_inserted_in_recovery: bool,
}

impl Token {
    /// Create a token ending on its start line
    pub fn new(
        token_type: TokenTypeId,
        image: impl Into<String>,
        offset: isize,
        start_line: isize,
        start_column: isize,
    ) -> Self {
        let image = image.into();
        let width = image.chars().count() as isize;
        Self {
            token_type,
            image,
            offset,
            start_line,
            start_column,
            end_line: start_line,
            end_column: start_column + width - 1,
            is_inserted_in_recovery: false,
        }
    }

    /// Override the end position
    pub fn with_end(mut self, end_line: isize, end_column: isize) -> Self {
        self.end_line = end_line;
        self.end_column = end_column;
        self
    }

    /// A token that does not exist in the input
    pub fn virtual_token(token_type: TokenTypeId) -> Self {
        Self {
            token_type,
            image: String::new(),
            offset: -1,
            start_line: -1,
            start_column: -1,
            end_line: -1,
            end_column: -1,
            is_inserted_in_recovery: false,
        }
    }

    /// The end-of-file marker
    pub fn eof() -> Self {
        Self::virtual_token(TokenTypeId::EOF)
    }

    /// Whether this token is not backed by input text
    pub fn is_virtual(&self) -> bool {
        self.offset < 0
    }
}

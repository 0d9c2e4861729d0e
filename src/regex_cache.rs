//! Thread-local cache of compiled, start-anchored token patterns
//!
//! Several lexers built over the same vocabulary share compiled regexes.
//! Uses thread-local storage for safe concurrent access.

use hashbrown::HashMap;
use regex::{Regex, RegexBuilder};
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: String,
    ignore_case: bool,
}

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<CacheKey, Regex>> = RefCell::new(HashMap::new());
}

/// Wrap a pattern so it only matches at the start of the haystack
pub fn anchored(source: &str) -> String {
    format!("^(?:{})", source)
}

/// Get or compile the start-anchored form of `source`.
///
/// Returns the compiler's message for invalid patterns.
#[inline]
pub fn get_or_compile(source: &str, ignore_case: bool) -> Result<Regex, String> {
    let key = CacheKey {
        source: source.to_string(),
        ignore_case,
    };
    REGEX_CACHE.with(|cache| {
        if let Some(regex) = cache.borrow().get(&key) {
            return Ok(regex.clone());
        }

        let regex = RegexBuilder::new(&anchored(source))
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| e.to_string())?;
        cache.borrow_mut().insert(key, regex.clone());
        Ok(regex)
    })
}

/// Clear the regex cache
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Get the number of cached patterns
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}

//! Text normalization used to compare query terms against catalog descriptions.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
}

/// Canonicalize text for comparison.
/// - Removes hyphens and commas (no replacement character)
/// - Collapses any run of whitespace, Unicode included, to one space
/// - Trims and lowercases
pub fn normalize(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| *c != '-' && *c != ',').collect();
    WHITESPACE
        .replace_all(&stripped, " ")
        .trim()
        .to_lowercase()
}

/// Normalize and split into words.
pub fn normalized_words(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if every word of `needle` appears in `haystack` in the same order,
/// each haystack word consumed at most once.
pub fn is_subsequence<S: AsRef<str>, T: AsRef<str>>(needle: &[S], haystack: &[T]) -> bool {
    let mut remaining = haystack.iter();
    needle
        .iter()
        .all(|word| remaining.any(|candidate| candidate.as_ref() == word.as_ref()))
}

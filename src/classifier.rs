//! Match Classifier
//!
//! Turns the raw probe output for a term into a single verdict. The rules are
//! tried in the order of [`RULES`]; the first one that produces a verdict wins.

use crate::error::ResolveError;
use crate::normalize::{is_subsequence, normalize, normalized_words};
use crate::query_front::{CandidateRow, ProbeResult, NOT_FOUND};
use crate::verdict::MatchVerdict;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use tracing::debug;

/// Banner shown by the catalog when it echoes the searched term.
pub const FULL_MATCH_BANNER: &str = "Displaying search results for:";

/// Example text used when the catalog reports results but shows no rows.
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";

lazy_static! {
    static ref BANNER_TERM: Regex =
        Regex::new(&format!(r#"{}\s*"(.+?)""#, regex::escape(FULL_MATCH_BANNER)))
            .expect("valid banner pattern");
}

/// Probe of the longest matching prefix, when the prefix fallback ran
#[derive(Debug, Clone, Copy)]
pub struct PrefixProbe<'a> {
    pub prefix: &'a str,
    pub probe: &'a ProbeResult,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    pub term: &'a str,
    pub full_probe: &'a ProbeResult,
    pub prefix: Option<PrefixProbe<'a>>,
}

impl<'a> ClassificationInput<'a> {
    pub fn new(term: &'a str, full_probe: &'a ProbeResult) -> Self {
        Self {
            term,
            full_probe,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: &'a str, probe: &'a ProbeResult) -> Self {
        self.prefix = Some(PrefixProbe { prefix, probe });
        self
    }
}

/// Classification rules, highest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Banner echoes the term and a row's description equals it
    BannerFullMatch,
    /// A row's description contains the term as a substring
    DescriptionContainsTerm,
    /// A row's description contains the term's words in order
    DescriptionSubsequence,
    /// Results exist but no row matched textually
    FirstResultRow,
    /// Nothing for the full term, but a shorter prefix found results
    PrefixFallback,
    NoMatch,
}

pub const RULES: [Rule; 6] = [
    Rule::BannerFullMatch,
    Rule::DescriptionContainsTerm,
    Rule::DescriptionSubsequence,
    Rule::FirstResultRow,
    Rule::PrefixFallback,
    Rule::NoMatch,
];

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::BannerFullMatch => write!(f, "BannerFullMatch"),
            Rule::DescriptionContainsTerm => write!(f, "DescriptionContainsTerm"),
            Rule::DescriptionSubsequence => write!(f, "DescriptionSubsequence"),
            Rule::FirstResultRow => write!(f, "FirstResultRow"),
            Rule::PrefixFallback => write!(f, "PrefixFallback"),
            Rule::NoMatch => write!(f, "NoMatch"),
        }
    }
}

impl Rule {
    /// Rules that need the prefix search to have run first.
    pub fn needs_prefix_search(&self) -> bool {
        matches!(self, Rule::PrefixFallback | Rule::NoMatch)
    }

    pub fn apply(&self, input: &ClassificationInput<'_>) -> Option<MatchVerdict> {
        let probe = input.full_probe;
        match self {
            Rule::BannerFullMatch => {
                let displayed = match banner_term(&probe.raw_summary_text) {
                    Ok(Some(displayed)) => displayed,
                    Ok(None) => return None,
                    Err(e) => {
                        debug!("{}; treating as general results", e);
                        return None;
                    }
                };
                let term = normalize(input.term);
                if normalize(&displayed) != term {
                    return None;
                }
                probe
                    .candidate_rows
                    .iter()
                    .find(|row| normalize(&row.description) == term)
                    .map(|row| {
                        if is_deleted(row) {
                            MatchVerdict::deleted(&row.record_id)
                        } else {
                            MatchVerdict::full(&row.record_id)
                        }
                    })
            }
            Rule::DescriptionContainsTerm => {
                let term = normalize(input.term);
                if term.is_empty() {
                    return None;
                }
                probe
                    .candidate_rows
                    .iter()
                    .find(|row| normalize(&row.description).contains(&term))
                    .map(|row| {
                        if is_deleted(row) {
                            MatchVerdict::deleted(&row.record_id)
                        } else {
                            MatchVerdict::within_description(&row.description, &row.record_id)
                        }
                    })
            }
            Rule::DescriptionSubsequence => {
                if !probe.has_any_result {
                    return None;
                }
                first_row_containing(&probe.candidate_rows, input.term).map(|row| {
                    MatchVerdict::within_description(&row.description, &row.record_id)
                })
            }
            Rule::FirstResultRow => {
                if !probe.has_any_result {
                    return None;
                }
                Some(match probe.candidate_rows.first() {
                    Some(row) => MatchVerdict::within_description(&row.description, &row.record_id),
                    None => MatchVerdict::within_description(DESCRIPTION_NOT_FOUND, NOT_FOUND),
                })
            }
            Rule::PrefixFallback => {
                let PrefixProbe { prefix, probe } = input.prefix?;
                let verdict = match first_row_containing(&probe.candidate_rows, prefix) {
                    Some(row) => MatchVerdict::within_description(&row.description, &row.record_id),
                    None => {
                        let record_id = probe
                            .candidate_rows
                            .first()
                            .map(|row| row.record_id.as_str())
                            .unwrap_or(NOT_FOUND);
                        MatchVerdict::prefix_only(prefix, record_id)
                    }
                };
                Some(verdict)
            }
            Rule::NoMatch => Some(MatchVerdict::NoMatch),
        }
    }
}

/// Parse the term quoted in the full-match banner.
/// `Ok(None)` when there is no banner at all.
fn banner_term(summary: &str) -> Result<Option<String>, ResolveError> {
    if !summary.contains(FULL_MATCH_BANNER) {
        return Ok(None);
    }
    BANNER_TERM
        .captures(summary)
        .and_then(|caps| caps.get(1))
        .map(|m| Some(m.as_str().trim().to_string()))
        .ok_or_else(|| {
            ResolveError::ClassificationAmbiguous(format!(
                "banner without quoted term in '{}'",
                summary
            ))
        })
}

fn is_deleted(row: &CandidateRow) -> bool {
    normalize(&row.notes).contains("deleted")
}

fn first_row_containing<'r>(rows: &'r [CandidateRow], words_of: &str) -> Option<&'r CandidateRow> {
    let needle = normalized_words(words_of);
    rows.iter()
        .find(|row| is_subsequence(&needle, &normalized_words(&row.description)))
}

pub struct MatchClassifier;

impl MatchClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Apply every rule in order and report which one decided.
    pub fn classify_with_rule(&self, input: &ClassificationInput<'_>) -> (Rule, MatchVerdict) {
        for rule in RULES {
            if let Some(verdict) = rule.apply(input) {
                debug!("Term '{}' classified by {}", input.term, rule);
                return (rule, verdict);
            }
        }
        (Rule::NoMatch, MatchVerdict::NoMatch)
    }

    pub fn classify(&self, input: &ClassificationInput<'_>) -> MatchVerdict {
        self.classify_with_rule(input).1
    }

    /// Verdict from the full-term probe alone.
    /// `None` means the prefix search has to run before classifying.
    pub fn classify_direct(&self, term: &str, full_probe: &ProbeResult) -> Option<MatchVerdict> {
        let input = ClassificationInput::new(term, full_probe);
        RULES
            .iter()
            .take_while(|rule| !rule.needs_prefix_search())
            .find_map(|rule| rule.apply(&input))
    }
}

impl Default for MatchClassifier {
    fn default() -> Self {
        Self::new()
    }
}

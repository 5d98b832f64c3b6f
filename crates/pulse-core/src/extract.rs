//! Company name extraction
//!
//! Headlines about listings follow a handful of surface forms ("X IPO",
//! "X files DRHP", "IPO of X", ...). Each form is one [`MentionMatcher`];
//! the [`Extractor`] tries them in priority order and returns the first
//! candidate that passes [`is_valid_name`].

use std::collections::HashSet;

use regex::Regex;

use crate::config::NameTables;
use crate::error::{PulseError, PulseResult};

/// Placeholder in a pattern template for the captured company name
pub const NAME_PLACEHOLDER: &str = "{NAME}";

/// 1-5 title-cased words, `&` allowed inside and as its own word
const COMPANY_NAME: &str = r"(?P<name>[A-Z][a-zA-Z&]*(?:\s[A-Z&][a-zA-Z&]*){0,4})";

/// Surface forms in priority order: (label, template)
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("ipo_of", "IPO of {NAME}"),
    ("name_ipo", "{NAME} IPO"),
    ("files_drhp", "{NAME} [Ff]iles [Dd]RHP"),
    ("sebi_nod", "{NAME} [Gg]ets (?:[Ss]ebi|SEBI) [Nn]od"),
    ("secures_sebi", "{NAME} [Ss]ecures SEBI"),
    ("receives_sebi", "{NAME} [Rr]eceives SEBI"),
    ("public_issue", "{NAME} [Pp]ublic [Ii]ssue"),
    ("launches_ipo", "{NAME} [Ll]aunches IPO"),
    ("to_raise", "{NAME} [Tt]o [Rr]aise"),
    ("lists_on", "{NAME} [Ll]ists [Oo]n"),
    ("prepares_ipo", "{NAME} [Pp]repares for IPO"),
];

/// One textual context in which a company name shows up
pub trait MentionMatcher: Send + Sync {
    /// Short identifier used in logs
    fn label(&self) -> &str;

    /// The leftmost candidate name in `text`, if the context appears at all
    fn find<'t>(&self, text: &'t str) -> Option<&'t str>;
}

/// A matcher backed by a regex template containing `{NAME}`
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    label: String,
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(label: &str, template: &str) -> PulseResult<Self> {
        if !template.contains(NAME_PLACEHOLDER) {
            return Err(PulseError::InvalidPattern {
                pattern: template.to_string(),
                reason: format!("missing {} placeholder", NAME_PLACEHOLDER),
            });
        }

        let pattern = template.replace(NAME_PLACEHOLDER, COMPANY_NAME);
        let regex = Regex::new(&pattern).map_err(|e| PulseError::InvalidPattern {
            pattern: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            label: label.to_string(),
            regex,
        })
    }
}

impl MentionMatcher for PatternMatcher {
    fn label(&self) -> &str {
        &self.label
    }

    fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.name("name"))
            .map(|m| m.as_str())
    }
}

/// The built-in matcher list, highest priority first
pub fn default_matchers() -> PulseResult<Vec<Box<dyn MentionMatcher>>> {
    DEFAULT_PATTERNS
        .iter()
        .map(|(label, template)| {
            PatternMatcher::new(label, template).map(|m| Box::new(m) as Box<dyn MentionMatcher>)
        })
        .collect()
}

/// First-match-wins name extractor
pub struct Extractor {
    matchers: Vec<Box<dyn MentionMatcher>>,
    stop_words: HashSet<String>,
}

impl Extractor {
    pub fn new(tables: &NameTables) -> PulseResult<Self> {
        Ok(Self::with_matchers(default_matchers()?, tables.stop_words.clone()))
    }

    pub fn with_matchers(
        matchers: Vec<Box<dyn MentionMatcher>>,
        stop_words: HashSet<String>,
    ) -> Self {
        Self {
            matchers,
            stop_words,
        }
    }

    /// Extract at most one candidate company name from `text`.
    ///
    /// Matchers are tried in order. A matcher whose candidate fails
    /// validation does not stop the search; the next matcher gets a turn.
    pub fn extract(&self, text: &str) -> Option<String> {
        for matcher in &self.matchers {
            let Some(candidate) = matcher.find(text) else {
                continue;
            };
            let candidate = candidate.trim();

            if is_valid_name(candidate, &self.stop_words) {
                tracing::trace!(matcher = matcher.label(), name = candidate, "Extracted mention");
                return Some(candidate.to_string());
            }
            tracing::trace!(matcher = matcher.label(), name = candidate, "Rejected candidate");
        }
        None
    }

    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }
}

/// Reject candidates that cannot be a company name.
pub fn is_valid_name(name: &str, stop_words: &HashSet<String>) -> bool {
    let name = name.trim();
    let len = name.chars().count();

    if !(3..=50).contains(&len) {
        return false;
    }

    if !name.chars().next().is_some_and(char::is_uppercase) {
        return false;
    }

    let words: Vec<&str> = name.split_whitespace().collect();

    // "Cr", "Rs", "An"
    if words.len() == 1 && len < 4 {
        return false;
    }

    if words.iter().any(|w| stop_words.contains(&w.to_lowercase())) {
        return false;
    }

    words.iter().any(|w| has_alpha_run(w))
}

/// At least two consecutive ASCII letters
fn has_alpha_run(word: &str) -> bool {
    word.as_bytes()
        .windows(2)
        .any(|pair| pair.iter().all(u8::is_ascii_alphabetic))
}

/// Whether the text is about a listing at all
pub fn is_ipo_related(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

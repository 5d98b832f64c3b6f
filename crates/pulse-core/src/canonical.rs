//! Name canonicalization
//!
//! Maps every raw mention seen in a run to one canonical entity name:
//!
//! 1. the curated override table wins outright;
//! 2. names failing the mention-level junk predicate are rejected;
//! 3. everything else goes through a greedy shortest-first clustering pass
//!    on token-sort similarity.
//!
//! The clustering is single-linkage and order dependent. Names are visited
//! from shortest to longest (stable on ties), and each joins the cluster of
//! the most similar name already visited when that similarity reaches the
//! threshold. Shorter names therefore become the canonical representative.
//! `{A, B}` may cluster differently than a symmetric pairwise scheme would.

use std::collections::{HashMap, HashSet};

use crate::config::{JunkNames, PipelineConfig};

/// How a raw mention was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Taken from the override table
    Override(String),
    /// Assigned by the similarity pass
    Clustered(String),
    /// Not a company; dropped from every downstream stage
    Rejected,
}

impl Resolution {
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Resolution::Override(id) | Resolution::Clustered(id) => Some(id),
            Resolution::Rejected => None,
        }
    }
}

/// Raw name -> resolution for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalMap {
    entries: HashMap<String, Resolution>,
}

impl CanonicalMap {
    /// Canonical entity for a raw mention, `None` when rejected or unseen
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).and_then(Resolution::entity_id)
    }

    pub fn resolution(&self, raw: &str) -> Option<&Resolution> {
        self.entries.get(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rejected_count(&self) -> usize {
        self.entries
            .values()
            .filter(|r| matches!(r, Resolution::Rejected))
            .count()
    }

    /// Number of distinct canonical entities
    pub fn entity_count(&self) -> usize {
        self.entries
            .values()
            .filter_map(Resolution::entity_id)
            .collect::<HashSet<_>>()
            .len()
    }
}

pub struct Canonicalizer {
    overrides: HashMap<String, String>,
    junk: JunkNames,
    threshold: f64,
}

impl Canonicalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            overrides: config.names.overrides.clone(),
            junk: config.names.junk.clone(),
            threshold: config.similarity_threshold,
        }
    }

    /// Mention-level junk predicate
    pub fn is_junk(&self, name: &str) -> bool {
        let name = name.trim();
        let len = name.chars().count();

        if len < 3 || self.junk.is_mention_junk(name) {
            return true;
        }

        name.split_whitespace().count() == 1 && len < 4
    }

    /// Resolve every distinct name in `names`.
    ///
    /// Deterministic for a given input order: building twice over the same
    /// sequence yields the same map.
    pub fn build<'n, I>(&self, names: I) -> CanonicalMap
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut entries = HashMap::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<&str> = Vec::new();

        for name in names {
            if !seen.insert(name) {
                continue;
            }

            if let Some(canonical) = self.overrides.get(name) {
                entries.insert(name.to_string(), Resolution::Override(canonical.clone()));
                continue;
            }

            if self.is_junk(name) {
                tracing::debug!(name, "Rejected junk mention");
                entries.insert(name.to_string(), Resolution::Rejected);
                continue;
            }

            pending.push(name);
        }

        // Stable: equal lengths keep input order
        pending.sort_by_key(|name| name.chars().count());

        let mut exact: HashMap<String, String> = HashMap::new();
        let mut assigned: Vec<(String, String)> = Vec::new();

        for name in pending {
            let key = name.to_lowercase();

            let canonical = match exact.get(&key) {
                Some(canonical) => canonical.clone(),
                None => self.closest_cluster(&key, &assigned).unwrap_or_else(|| name.to_string()),
            };

            exact.entry(key.clone()).or_insert_with(|| canonical.clone());
            assigned.push((key, canonical.clone()));
            entries.insert(name.to_string(), Resolution::Clustered(canonical));
        }

        CanonicalMap { entries }
    }

    /// Canonical name of the best-scoring assigned name, if it clears the threshold.
    /// Ties go to the earliest assigned name.
    fn closest_cluster(&self, key: &str, assigned: &[(String, String)]) -> Option<String> {
        let mut best: Option<(f64, &str)> = None;

        for (other, canonical) in assigned {
            let score = token_sort_ratio(key, other);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, canonical.as_str()));
            }
        }

        best.filter(|(score, _)| *score >= self.threshold)
            .map(|(score, canonical)| {
                tracing::trace!(name = key, canonical, score, "Joined cluster");
                canonical.to_string()
            })
    }
}

/// Word-order-insensitive similarity in [0, 100].
///
/// Both sides are lowercased with non-alphanumerics turned into spaces, their
/// tokens sorted and re-joined, then compared by indel similarity:
/// `2 * lcs / (len_a + len_b)`.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = sorted_tokens(a).chars().collect();
    let b: Vec<char> = sorted_tokens(b).chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn sorted_tokens(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Longest common subsequence length, two-row table
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

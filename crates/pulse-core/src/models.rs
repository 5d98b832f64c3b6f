//! Data models for the IPO news pipeline
//!
//! Records flow forward through these types: a `RawRecord` from the upstream
//! collaborator becomes a validated `Record`, gets a `RawMention`, resolves to
//! an entity, and ends up in an `EntityAggregate`, a set of `TrendBucket`s and
//! finally one `SignalResult` per entity.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{PulseError, PulseResult};

// =============================================================================
// Input Records
// =============================================================================

/// Sentiment category emitted by the external classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
        }
    }
}

/// One input row as delivered by the upstream scraper + sentiment classifier.
///
/// Every field except `id` is optional; validation happens in
/// [`Record::from_raw`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identifying reference used in logs (URL or row number)
    pub id: String,

    /// Headline, preferred for name extraction
    pub title: Option<String>,

    /// Article body or summary
    pub body: Option<String>,

    /// Publication timestamp as found in the feed
    pub published: Option<String>,

    /// Classifier label ("positive", "negative", "neutral")
    pub sentiment_label: Option<String>,

    /// Classifier compound score in [-1, 1]
    pub sentiment_score: Option<f64>,
}

/// A validated unit of text evidence. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    /// Text the extractor scans (title when present, else body)
    pub text: String,

    /// Article body, `None` when absent or blank
    pub body: Option<String>,

    /// Publication time, `None` when absent or unparseable
    pub published_at: Option<DateTime<FixedOffset>>,

    pub sentiment_label: SentimentLabel,

    pub sentiment_score: f64,
}

impl Record {
    /// Validate a raw row.
    ///
    /// Missing text or a missing/out-of-range sentiment is an error; an
    /// unparseable timestamp is not (the record just has no week).
    pub fn from_raw(raw: &RawRecord) -> PulseResult<Self> {
        let body = raw.body.as_deref().map(str::trim).filter(|b| !b.is_empty());
        let text = raw
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or(body)
            .ok_or_else(|| PulseError::InvalidRecord {
                id: raw.id.clone(),
                reason: "no title or body text".to_string(),
            })?;

        let sentiment_label = raw
            .sentiment_label
            .as_deref()
            .and_then(SentimentLabel::parse)
            .ok_or_else(|| PulseError::InvalidRecord {
                id: raw.id.clone(),
                reason: format!("bad sentiment label {:?}", raw.sentiment_label),
            })?;

        let sentiment_score = match raw.sentiment_score {
            Some(s) if s.is_finite() && (-1.0..=1.0).contains(&s) => s,
            other => {
                return Err(PulseError::InvalidRecord {
                    id: raw.id.clone(),
                    reason: format!("bad sentiment score {:?}", other),
                })
            }
        };

        Ok(Self {
            id: raw.id.clone(),
            text: text.to_string(),
            body: body.map(String::from),
            published_at: raw.published.as_deref().and_then(parse_timestamp),
            sentiment_label,
            sentiment_score,
        })
    }

    /// Article content for duplicate and relevance checks: the body, else the
    /// title.
    pub fn content(&self) -> &str {
        self.body.as_deref().unwrap_or(&self.text)
    }

    /// Calendar date of publication in the feed's own offset
    pub fn published_on(&self) -> Option<NaiveDate> {
        self.published_at.map(|ts| ts.date_naive())
    }
}

/// Parse the timestamp formats seen in news feeds.
///
/// Naive timestamps are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(s) {
        return Some(ts);
    }

    let utc = FixedOffset::east_opt(0)?;
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| utc.from_utc_datetime(&naive))
}

/// A candidate company name pulled out of one record's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMention {
    /// Index of the source record in the run's record list
    pub record_index: usize,
    pub name: String,
}

/// A record paired with the canonical entity it resolved to
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub entity_id: String,
    pub record: Record,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Per-entity sentiment statistics. Recomputed from scratch every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAggregate {
    pub entity_id: String,
    pub record_count: usize,
    pub mean_sentiment: f64,
    pub max_sentiment: f64,
    pub min_sentiment: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
}

impl EntityAggregate {
    pub fn neutral_ratio(&self) -> f64 {
        if self.record_count == 0 {
            return 0.0;
        }
        round4(self.neutral_count as f64 / self.record_count as f64)
    }
}

/// Mean sentiment for one entity in one calendar week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBucket {
    pub entity_id: String,

    /// Monday of the bucket's week
    #[serde(rename = "week", serialize_with = "serialize_week")]
    pub week_start: NaiveDate,

    pub mean_sentiment: f64,
    pub record_count: usize,
}

impl TrendBucket {
    /// `YYYY-MM-DD/YYYY-MM-DD`, Monday through Sunday
    pub fn week_label(&self) -> String {
        week_label(self.week_start)
    }
}

pub fn week_label(week_start: NaiveDate) -> String {
    let end = week_start + chrono::Duration::days(6);
    format!("{}/{}", week_start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

fn serialize_week<S: Serializer>(week_start: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&week_label(*week_start))
}

// =============================================================================
// Signals
// =============================================================================

/// Discrete actionability label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Apply,
    Neutral,
    Avoid,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Apply => write!(f, "APPLY"),
            Signal::Neutral => write!(f, "NEUTRAL"),
            Signal::Avoid => write!(f, "AVOID"),
        }
    }
}

/// How far the final score sits from the 0.5 midpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "HIGH"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::Low => write!(f, "LOW"),
        }
    }
}

/// Final scored row, one per surviving entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub entity_id: String,
    pub signal: Signal,
    pub confidence: Confidence,

    /// Weighted sum of the four sub-scores, in [0, 1]
    pub final_score: f64,

    pub record_count: usize,
    pub mean_sentiment: f64,
    pub score_sentiment: f64,
    pub score_buzz: f64,
    pub score_consistency: f64,
    pub score_trend: f64,
}

/// Signal tallies for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalSummary {
    pub apply: usize,
    pub neutral: usize,
    pub avoid: usize,
}

// =============================================================================
// Run bookkeeping
// =============================================================================

/// Why a record or entity did not make it to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    InvalidRecord,
    NotIpoRelated,
    Duplicate,
    NoMention,
    RejectedMention,
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub records_in: usize,
    pub invalid_record: usize,
    pub not_ipo_related: usize,
    pub duplicate: usize,
    pub no_mention: usize,
    pub rejected_mention: usize,
    pub unparseable_timestamp: usize,
    pub records_resolved: usize,
    pub entities: usize,
    pub entities_filtered: usize,
    pub signals: usize,
    pub generated_at: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::InvalidRecord => self.invalid_record += 1,
            SkipReason::NotIpoRelated => self.not_ipo_related += 1,
            SkipReason::Duplicate => self.duplicate += 1,
            SkipReason::NoMention => self.no_mention += 1,
            SkipReason::RejectedMention => self.rejected_mention += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.invalid_record
            + self.not_ipo_related
            + self.duplicate
            + self.no_mention
            + self.rejected_mention
    }
}

/// Round to 4 decimal places, applied at every output boundary
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: Option<&str>, body: Option<&str>) -> RawRecord {
        RawRecord {
            id: "row-1".to_string(),
            title: title.map(String::from),
            body: body.map(String::from),
            published: Some("2025-01-08".to_string()),
            sentiment_label: Some("Positive".to_string()),
            sentiment_score: Some(0.4),
        }
    }

    #[test]
    fn test_record_prefers_title() {
        let rec = Record::from_raw(&raw(Some("Meesho IPO opens"), Some("body"))).unwrap();
        assert_eq!(rec.text, "Meesho IPO opens");
        assert_eq!(rec.sentiment_label, SentimentLabel::Positive);

        let rec = Record::from_raw(&raw(Some("   "), Some("Groww IPO"))).unwrap();
        assert_eq!(rec.text, "Groww IPO");
    }

    #[test]
    fn test_content_is_body_then_title() {
        let rec =
            Record::from_raw(&raw(Some("Meesho IPO opens"), Some(" Price band set "))).unwrap();
        assert_eq!(rec.body.as_deref(), Some("Price band set"));
        assert_eq!(rec.content(), "Price band set");

        let rec = Record::from_raw(&raw(Some("Meesho IPO opens"), Some("  "))).unwrap();
        assert_eq!(rec.body, None);
        assert_eq!(rec.content(), "Meesho IPO opens");
    }

    #[test]
    fn test_record_rejects_missing_text_and_bad_sentiment() {
        assert!(Record::from_raw(&raw(None, None)).is_err());

        let mut r = raw(Some("Meesho IPO"), None);
        r.sentiment_score = Some(1.5);
        assert!(Record::from_raw(&r).is_err());

        let mut r = raw(Some("Meesho IPO"), None);
        r.sentiment_label = Some("bullish".to_string());
        assert!(Record::from_raw(&r).is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-01-08T10:00:00+05:30").is_some());
        assert!(parse_timestamp("Wed, 08 Jan 2025 10:00:00 GMT").is_some());
        assert!(parse_timestamp("2025-01-08 10:00:00").is_some());
        assert!(parse_timestamp("2025-01-08").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_published_on_keeps_feed_offset() {
        let ts = parse_timestamp("2025-01-06T01:00:00+05:30").unwrap();
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[test]
    fn test_week_label() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(week_label(monday), "2025-01-06/2025-01-12");
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.766_666_7), 0.7667);
        assert_eq!(round4(-0.123_46), -0.1235);
    }
}

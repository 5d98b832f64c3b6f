//! End-to-end run: records in, ranked signals out.
//!
//! A run is a single forward pass over an in-memory record set. Bad records
//! are counted and skipped; only configuration errors and empty input fail
//! the run.

use std::collections::HashSet;

use chrono::Utc;

use crate::aggregate::{aggregate, Aggregates};
use crate::canonical::{CanonicalMap, Canonicalizer};
use crate::config::PipelineConfig;
use crate::error::{PulseError, PulseResult};
use crate::extract::{is_ipo_related, Extractor};
use crate::models::*;
use crate::signal::score_entities;

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub canonical: CanonicalMap,
    pub aggregates: Vec<EntityAggregate>,
    pub trends: Vec<TrendBucket>,
    pub signals: Vec<SignalResult>,
    pub stats: RunStats,
}

pub struct Pipeline {
    config: PipelineConfig,
    extractor: Extractor,
    canonicalizer: Canonicalizer,
}

impl Pipeline {
    /// Validate the configuration and build the stage components.
    pub fn new(config: PipelineConfig) -> PulseResult<Self> {
        config.validate()?;

        let extractor = Extractor::new(&config.names)?;
        let canonicalizer = Canonicalizer::new(&config);

        tracing::debug!(
            matchers = extractor.matcher_count(),
            overrides = config.names.overrides.len(),
            similarity_threshold = config.similarity_threshold,
            "Pipeline initialized"
        );

        Ok(Self {
            config,
            extractor,
            canonicalizer,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, raw_records: &[RawRecord]) -> PulseResult<PipelineOutput> {
        if raw_records.is_empty() {
            return Err(PulseError::EmptyInput);
        }

        let mut stats = RunStats {
            records_in: raw_records.len(),
            ..RunStats::default()
        };

        let records = self.ingest(raw_records, &mut stats);
        tracing::info!(kept = records.len(), skipped = stats.skipped(), "Ingested records");

        let mentions = self.extract_mentions(&records, &mut stats);
        tracing::info!(mentions = mentions.len(), "Extracted mentions");

        let canonical = self
            .canonicalizer
            .build(mentions.iter().map(|m| m.name.as_str()));
        tracing::info!(
            distinct_names = canonical.len(),
            entities = canonical.entity_count(),
            rejected = canonical.rejected_count(),
            "Canonicalized names"
        );

        let resolved = resolve(records, &mentions, &canonical, &mut stats);

        let Aggregates { entities, trends } = aggregate(&resolved);
        stats.entities = entities.len();

        let signals = score_entities(
            &entities,
            &trends,
            &self.config.scoring,
            &self.config.names.junk,
        );
        stats.entities_filtered = entities.len() - signals.len();
        stats.signals = signals.len();
        stats.generated_at = Some(Utc::now());

        tracing::info!(
            entities = stats.entities,
            filtered = stats.entities_filtered,
            signals = stats.signals,
            "Scored entities"
        );

        Ok(PipelineOutput {
            canonical,
            aggregates: entities,
            trends,
            signals,
            stats,
        })
    }

    /// Validate rows, then drop duplicates and off-topic text.
    fn ingest(&self, raw_records: &[RawRecord], stats: &mut RunStats) -> Vec<Record> {
        let ingest = &self.config.ingest;
        let mut seen_text: HashSet<String> = HashSet::new();
        let mut records = Vec::with_capacity(raw_records.len());

        for raw in raw_records {
            let record = match Record::from_raw(raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(record = %raw.id, error = %e, "Skipping record");
                    stats.skip(SkipReason::InvalidRecord);
                    continue;
                }
            };

            if ingest.dedupe_text && !seen_text.insert(record.content().to_string()) {
                tracing::debug!(record = %record.id, "Skipping duplicate text");
                stats.skip(SkipReason::Duplicate);
                continue;
            }

            if ingest.require_ipo_keyword
                && !is_ipo_related(record.content(), &ingest.ipo_keywords)
            {
                stats.skip(SkipReason::NotIpoRelated);
                continue;
            }

            let has_timestamp = raw.published.as_deref().is_some_and(|p| !p.trim().is_empty());
            if has_timestamp && record.published_at.is_none() {
                tracing::debug!(
                    record = %record.id,
                    published = ?raw.published,
                    "Unparseable timestamp"
                );
                stats.unparseable_timestamp += 1;
            }

            records.push(record);
        }

        records
    }

    fn extract_mentions(&self, records: &[Record], stats: &mut RunStats) -> Vec<RawMention> {
        records
            .iter()
            .enumerate()
            .filter_map(|(record_index, record)| {
                let name = self.extractor.extract(&record.text);
                if name.is_none() {
                    stats.skip(SkipReason::NoMention);
                }
                name.map(|name| RawMention { record_index, name })
            })
            .collect()
    }
}

/// Attach entity ids, dropping records whose mention was rejected.
fn resolve(
    records: Vec<Record>,
    mentions: &[RawMention],
    canonical: &CanonicalMap,
    stats: &mut RunStats,
) -> Vec<ResolvedRecord> {
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let mut resolved = Vec::with_capacity(mentions.len());

    for mention in mentions {
        let Some(record) = slots.get_mut(mention.record_index).and_then(Option::take) else {
            continue;
        };

        match canonical.resolve(&mention.name) {
            Some(entity_id) => resolved.push(ResolvedRecord {
                entity_id: entity_id.to_string(),
                record,
            }),
            None => {
                tracing::debug!(
                    record = %record.id,
                    name = %mention.name,
                    "Dropped rejected mention"
                );
                stats.skip(SkipReason::RejectedMention);
            }
        }
    }

    stats.records_resolved = resolved.len();
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: &str, score: f64, label: &str, published: Option<&str>) -> RawRecord {
        RawRecord {
            id: id.to_string(),
            title: Some(title.to_string()),
            body: None,
            published: published.map(String::from),
            sentiment_label: Some(label.to_string()),
            sentiment_score: Some(score),
        }
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = PipelineConfig::default();
        config.scoring.weights.buzz = 0.5;
        assert!(matches!(Pipeline::new(config), Err(PulseError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_input_fails() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        assert!(matches!(pipeline.run(&[]), Err(PulseError::EmptyInput)));
    }

    #[test]
    fn test_skip_counts() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let records = vec![
            raw("1", "Meesho IPO subscribed 5 times", 0.6, "positive", Some("2025-01-06")),
            raw("2", "Meesho IPO subscribed 5 times", 0.6, "positive", None),
            raw("3", "Sensex ends flat", 0.0, "neutral", None),
            raw("4", "IPO market cools off", -0.2, "negative", None),
            raw("5", "Steel IPO watch", 0.1, "neutral", None),
            raw("6", "Meesho IPO allotment today", 0.3, "positive", Some("someday")),
            RawRecord {
                id: "7".to_string(),
                ..RawRecord::default()
            },
        ];

        let out = pipeline.run(&records).unwrap();
        let s = &out.stats;
        assert_eq!(s.records_in, 7);
        assert_eq!(s.invalid_record, 1);
        assert_eq!(s.duplicate, 1);
        assert_eq!(s.not_ipo_related, 1);
        assert_eq!(s.no_mention, 1);
        assert_eq!(s.rejected_mention, 1);
        assert_eq!(s.unparseable_timestamp, 1);
        assert_eq!(s.records_resolved, 2);
        assert_eq!(s.skipped() + s.records_resolved, s.records_in);

        assert_eq!(out.aggregates.len(), 1);
        assert_eq!(out.aggregates[0].entity_id, "Meesho");
        assert_eq!(out.aggregates[0].record_count, 2);
        assert_eq!(out.trends.len(), 1);
        assert_eq!(out.signals.len(), 1);
    }

    #[test]
    fn test_same_headline_different_articles_both_kept() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut first = raw("1", "Meesho IPO opens", 0.4, "positive", None);
        first.body = Some("Meesho IPO opens for subscription on Monday".to_string());
        let mut second = raw("2", "Meesho IPO opens", 0.2, "positive", None);
        second.body = Some("Retail quota of the Meesho IPO filled in an hour".to_string());

        let out = pipeline.run(&[first, second]).unwrap();
        assert_eq!(out.stats.duplicate, 0);
        assert_eq!(out.aggregates[0].record_count, 2);
    }

    #[test]
    fn test_repeated_body_is_duplicate() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut first = raw("1", "Meesho IPO opens", 0.4, "positive", None);
        first.body = Some("Meesho IPO opens for subscription".to_string());
        let mut second = raw("2", "Meesho listing date fixed", 0.4, "positive", None);
        second.body = first.body.clone();

        let out = pipeline.run(&[first, second]).unwrap();
        assert_eq!(out.stats.duplicate, 1);
        assert_eq!(out.aggregates[0].record_count, 1);
    }

    #[test]
    fn test_ipo_keyword_found_in_body() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut record = raw("1", "Pine Labs to raise funds", 0.3, "positive", None);
        record.body = Some("The fintech has filed its DRHP with SEBI for an IPO".to_string());

        let out = pipeline.run(&[record]).unwrap();
        assert_eq!(out.stats.not_ipo_related, 0);
        assert_eq!(out.canonical.resolve("Pine Labs"), Some("Pine Labs"));
        assert_eq!(out.signals.len(), 1);
    }

    #[test]
    fn test_ingest_filters_can_be_disabled() {
        let mut config = PipelineConfig::default();
        config.ingest.require_ipo_keyword = false;
        config.ingest.dedupe_text = false;
        let pipeline = Pipeline::new(config).unwrap();

        let records = vec![
            raw("1", "Vikram Solar to raise funds", 0.2, "positive", None),
            raw("2", "Vikram Solar to raise funds", 0.2, "positive", None),
        ];
        let out = pipeline.run(&records).unwrap();
        assert_eq!(out.stats.duplicate, 0);
        assert_eq!(out.stats.not_ipo_related, 0);
        assert_eq!(out.aggregates[0].record_count, 2);
    }
}

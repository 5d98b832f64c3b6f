//! Signal scoring engine
//!
//! Turns entity aggregates and weekly trend buckets into one ranked
//! APPLY / NEUTRAL / AVOID signal per entity. Four sub-scores, each in
//! [0, 1], are combined with configurable weights:
//!
//! - sentiment: amplified mean sentiment
//! - consistency: amplified gap between positive and negative ratios
//! - buzz: log record count, min-max normalized within the run
//! - trend: late-weeks minus early-weeks mean sentiment

use std::collections::HashMap;

use crate::config::{ConfidenceBands, JunkNames, ScoringConfig, SignalThresholds};
use crate::models::*;

/// Buzz assigned to every entity when all log counts are equal
pub const FLAT_BUZZ: f64 = 0.5;

/// Score every entity that passes the entity-level junk filter.
///
/// Results are sorted by final score, highest first; equal scores keep the
/// order of `entities`.
pub fn score_entities(
    entities: &[EntityAggregate],
    trends: &[TrendBucket],
    scoring: &ScoringConfig,
    junk: &JunkNames,
) -> Vec<SignalResult> {
    let surviving: Vec<&EntityAggregate> = entities
        .iter()
        .filter(|e| {
            let keep = is_scoreable_entity(&e.entity_id, junk);
            if !keep {
                tracing::debug!(entity = %e.entity_id, "Dropped entity before scoring");
            }
            keep
        })
        .collect();

    let mut buckets_by_entity: HashMap<&str, Vec<&TrendBucket>> = HashMap::new();
    for bucket in trends {
        buckets_by_entity
            .entry(bucket.entity_id.as_str())
            .or_default()
            .push(bucket);
    }

    let counts: Vec<usize> = surviving.iter().map(|e| e.record_count).collect();
    let buzz = buzz_scores(&counts);

    let mut results: Vec<SignalResult> = surviving
        .iter()
        .zip(buzz)
        .map(|(entity, score_buzz)| {
            let buckets = buckets_by_entity
                .get(entity.entity_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            score_entity(entity, buckets, score_buzz, scoring)
        })
        .collect();

    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    results
}

fn score_entity(
    entity: &EntityAggregate,
    buckets: &[&TrendBucket],
    score_buzz: f64,
    scoring: &ScoringConfig,
) -> SignalResult {
    let score_sentiment = sentiment_score(entity.mean_sentiment, scoring.sentiment_amplification);
    let score_consistency = consistency_score(
        entity.positive_ratio,
        entity.negative_ratio,
        scoring.consistency_amplification,
    );
    let score_trend = trend_score(buckets);

    let w = &scoring.weights;
    let final_score = round4(
        w.sentiment * score_sentiment
            + w.consistency * score_consistency
            + w.buzz * score_buzz
            + w.trend * score_trend,
    );

    SignalResult {
        entity_id: entity.entity_id.clone(),
        signal: Signal::from_score(final_score, &scoring.signal),
        confidence: Confidence::from_score(final_score, &scoring.confidence),
        final_score,
        record_count: entity.record_count,
        mean_sentiment: entity.mean_sentiment,
        score_sentiment,
        score_buzz,
        score_consistency,
        score_trend,
    }
}

/// Entity-level junk filter, coarser than the mention-level one.
///
/// Drops curated junk, names under 5 characters, and single words under 6.
pub fn is_scoreable_entity(name: &str, junk: &JunkNames) -> bool {
    if junk.is_entity_junk(name) {
        return false;
    }

    let len = name.chars().count();
    if len < 5 {
        return false;
    }

    name.split_whitespace().count() >= 2 || len >= 6
}

/// Map [-1, 1] onto [0, 1]
fn rescale(x: f64) -> f64 {
    (x.clamp(-1.0, 1.0) + 1.0) / 2.0
}

pub fn sentiment_score(mean_sentiment: f64, amplification: f64) -> f64 {
    round4(rescale(mean_sentiment * amplification))
}

pub fn consistency_score(positive_ratio: f64, negative_ratio: f64, amplification: f64) -> f64 {
    round4(rescale((positive_ratio - negative_ratio) * amplification))
}

/// Min-max normalized `ln(1 + count)`, relative to this run only
pub fn buzz_scores(record_counts: &[usize]) -> Vec<f64> {
    let logs: Vec<f64> = record_counts.iter().map(|&c| (c as f64).ln_1p()).collect();

    let min = logs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    logs.iter()
        .map(|&x| {
            if range == 0.0 {
                FLAT_BUZZ
            } else {
                round4((x - min) / range)
            }
        })
        .collect()
}

/// Second-half minus first-half mean of chronologically ordered weekly means,
/// clipped to [-1, 1].
///
/// The split is at `len / 2`, so with an odd count the middle week belongs to
/// the second half. Fewer than two weeks gives 0.
pub fn trend_delta(weekly_means: &[f64]) -> f64 {
    if weekly_means.len() < 2 {
        return 0.0;
    }

    let mid = weekly_means.len() / 2;
    let (early, late) = weekly_means.split_at(mid);
    (mean(late) - mean(early)).clamp(-1.0, 1.0)
}

/// Rescaled trend sub-score for one entity's buckets (any order)
pub fn trend_score(buckets: &[&TrendBucket]) -> f64 {
    let mut ordered = buckets.to_vec();
    ordered.sort_by_key(|b| b.week_start);

    let means: Vec<f64> = ordered.iter().map(|b| b.mean_sentiment).collect();
    round4(rescale(trend_delta(&means)))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl Signal {
    pub fn from_score(final_score: f64, thresholds: &SignalThresholds) -> Self {
        if final_score >= thresholds.apply {
            Signal::Apply
        } else if final_score <= thresholds.avoid {
            Signal::Avoid
        } else {
            Signal::Neutral
        }
    }
}

impl Confidence {
    pub fn from_score(final_score: f64, bands: &ConfidenceBands) -> Self {
        let distance = (final_score - 0.5).abs();
        if distance >= bands.high {
            Confidence::High
        } else if distance >= bands.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Count results per signal
pub fn summarize(results: &[SignalResult]) -> SignalSummary {
    results
        .iter()
        .fold(SignalSummary::default(), |mut summary, r| {
            match r.signal {
                Signal::Apply => summary.apply += 1,
                Signal::Neutral => summary.neutral += 1,
                Signal::Avoid => summary.avoid += 1,
            }
            summary
        })
}

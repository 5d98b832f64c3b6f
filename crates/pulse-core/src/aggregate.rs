//! Per-entity aggregation
//!
//! Pure group-by-and-reduce over resolved records. Entities come out ordered
//! by entity id, trend buckets by (entity id, week start).

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::*;

/// Output of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub entities: Vec<EntityAggregate>,
    pub trends: Vec<TrendBucket>,
}

#[derive(Debug, Default)]
struct SentimentAccumulator {
    count: usize,
    sum: f64,
    max: f64,
    min: f64,
    positive: usize,
    negative: usize,
    neutral: usize,
}

impl SentimentAccumulator {
    fn push(&mut self, record: &Record) {
        let score = record.sentiment_score;
        if self.count == 0 {
            self.max = score;
            self.min = score;
        } else {
            self.max = self.max.max(score);
            self.min = self.min.min(score);
        }
        self.count += 1;
        self.sum += score;

        match record.sentiment_label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    fn finish(self, entity_id: String) -> EntityAggregate {
        let n = self.count as f64;
        EntityAggregate {
            entity_id,
            record_count: self.count,
            mean_sentiment: round4(self.sum / n),
            max_sentiment: round4(self.max),
            min_sentiment: round4(self.min),
            positive_count: self.positive,
            negative_count: self.negative,
            neutral_count: self.neutral,
            positive_ratio: round4(self.positive as f64 / n),
            negative_ratio: round4(self.negative as f64 / n),
        }
    }
}

/// Group resolved records into entity aggregates and weekly trend buckets.
///
/// Records without a publication date count toward their entity but not
/// toward any trend bucket.
pub fn aggregate(records: &[ResolvedRecord]) -> Aggregates {
    let mut by_entity: BTreeMap<&str, SentimentAccumulator> = BTreeMap::new();
    let mut by_week: BTreeMap<(&str, NaiveDate), (f64, usize)> = BTreeMap::new();

    for resolved in records {
        let entity = resolved.entity_id.as_str();
        by_entity.entry(entity).or_default().push(&resolved.record);

        if let Some(date) = resolved.record.published_on() {
            let bucket = by_week.entry((entity, week_start(date))).or_insert((0.0, 0));
            bucket.0 += resolved.record.sentiment_score;
            bucket.1 += 1;
        }
    }

    let entities = by_entity
        .into_iter()
        .map(|(entity, acc)| acc.finish(entity.to_string()))
        .collect();

    let trends = by_week
        .into_iter()
        .map(|((entity, week), (sum, count))| TrendBucket {
            entity_id: entity.to_string(),
            week_start: week,
            mean_sentiment: round4(sum / count as f64),
            record_count: count,
        })
        .collect();

    Aggregates { entities, trends }
}

/// Monday of the calendar week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

//! CSV in, CSV/JSON out.
//!
//! Input columns are looked up by role, first match wins, so the scraper,
//! cleaner and sentiment stages can each hand over their own layout.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use pulse_core::{EntityAggregate, RawRecord, SignalResult, TrendBucket};
use serde::Serialize;

use crate::error::{AppError, AppResult};

const ID_COLUMNS: &[&str] = &["url", "link"];
const TITLE_COLUMNS: &[&str] = &["title"];
const BODY_COLUMNS: &[&str] = &["full_text", "summary", "text", "clean_text"];
const PUBLISHED_COLUMNS: &[&str] = &[
    "published_date",
    "date",
    "published",
    "pubDate",
    "scraped_at",
];
const LABEL_COLUMNS: &[&str] = &["sentiment_label"];
const SCORE_COLUMNS: &[&str] = &["sentiment_score"];

pub const SUMMARY_FILE: &str = "ipo_sentiment_summary.csv";
pub const TREND_FILE: &str = "ipo_sentiment_trend.csv";
pub const SIGNALS_FILE: &str = "ipo_final_signals.csv";
pub const SIGNALS_JSON_FILE: &str = "ipo_final_signals.json";

/// Records read from one input file
#[derive(Debug, Default)]
pub struct InputBatch {
    pub records: Vec<RawRecord>,
    /// Rows the CSV reader could not parse
    pub unreadable_rows: usize,
}

#[derive(Debug)]
struct Columns {
    id: Option<usize>,
    title: Option<usize>,
    body: Option<usize>,
    published: Option<usize>,
    label: Option<usize>,
    score: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> AppResult<Self> {
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        };

        let columns = Self {
            id: find(ID_COLUMNS),
            title: find(TITLE_COLUMNS),
            body: find(BODY_COLUMNS),
            published: find(PUBLISHED_COLUMNS),
            label: find(LABEL_COLUMNS),
            score: find(SCORE_COLUMNS),
        };

        if columns.title.is_none() && columns.body.is_none() {
            return Err(AppError::MissingColumn("text".to_string()));
        }
        if columns.label.is_none() {
            return Err(AppError::MissingColumn("sentiment_label".to_string()));
        }
        if columns.score.is_none() {
            return Err(AppError::MissingColumn("sentiment_score".to_string()));
        }
        Ok(columns)
    }

    fn to_raw(&self, row: &StringRecord, row_number: usize) -> RawRecord {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        RawRecord {
            id: field(self.id).unwrap_or_else(|| format!("row-{}", row_number)),
            title: field(self.title),
            body: field(self.body),
            published: field(self.published),
            sentiment_label: field(self.label),
            // Unparseable scores become missing and fail validation downstream
            sentiment_score: field(self.score).and_then(|s| s.parse::<f64>().ok()),
        }
    }
}

/// Read a sentiment-scored news CSV.
///
/// Rows that cannot be parsed as CSV are counted and skipped. Missing text,
/// label or score columns fail the whole read.
pub fn read_records(path: impl AsRef<Path>) -> AppResult<InputBatch> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let columns = Columns::from_headers(reader.headers()?)?;
    tracing::debug!(path = %path.display(), ?columns, "Resolved input columns");

    let mut batch = InputBatch::default();
    for (i, row) in reader.records().enumerate() {
        let row_number = i + 1;
        match row {
            Ok(row) => batch.records.push(columns.to_raw(&row, row_number)),
            Err(e) => {
                tracing::warn!(row = row_number, error = %e, "Skipping unreadable row");
                batch.unreadable_rows += 1;
            }
        }
    }

    tracing::info!(
        path = %path.display(),
        records = batch.records.len(),
        unreadable = batch.unreadable_rows,
        "Loaded input"
    );
    Ok(batch)
}

/// Paths of the files written by [`write_outputs`]
#[derive(Debug)]
pub struct WrittenFiles {
    pub summary: PathBuf,
    pub trend: PathBuf,
    pub signals: PathBuf,
    pub signals_json: Option<PathBuf>,
}

pub fn write_outputs(
    dir: impl AsRef<Path>,
    aggregates: &[EntityAggregate],
    trends: &[TrendBucket],
    signals: &[SignalResult],
    write_json: bool,
) -> AppResult<WrittenFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let summary = dir.join(SUMMARY_FILE);
    write_csv(&summary, aggregates)?;

    let trend = dir.join(TREND_FILE);
    write_csv(&trend, trends)?;

    let signals_path = dir.join(SIGNALS_FILE);
    write_csv(&signals_path, signals)?;

    let signals_json = if write_json {
        let path = dir.join(SIGNALS_JSON_FILE);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, signals)?;
        Some(path)
    } else {
        None
    };

    Ok(WrittenFiles {
        summary,
        trend,
        signals: signals_path,
        signals_json,
    })
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Pipeline, PipelineConfig};
    use std::io::Write;

    fn input_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_columns_by_role() {
        let file = input_file(
            "source,title,summary,url,published,sentiment_label,sentiment_score\n\
             feed,Meesho IPO opens,Price band set,https://a.example/1,2025-01-06,positive,0.61\n\
             feed,,Groww IPO GMP rises,,2025-01-07,positive,0.4\n",
        );

        let batch = read_records(file.path()).unwrap();
        assert_eq!(batch.unreadable_rows, 0);
        assert_eq!(batch.records.len(), 2);

        let first = &batch.records[0];
        assert_eq!(first.id, "https://a.example/1");
        assert_eq!(first.title.as_deref(), Some("Meesho IPO opens"));
        assert_eq!(first.body.as_deref(), Some("Price band set"));
        assert_eq!(first.published.as_deref(), Some("2025-01-06"));
        assert_eq!(first.sentiment_score, Some(0.61));

        let second = &batch.records[1];
        assert_eq!(second.id, "row-2");
        assert_eq!(second.title, None);
        assert_eq!(second.body.as_deref(), Some("Groww IPO GMP rises"));
    }

    #[test]
    fn test_body_column_priority() {
        let file = input_file(
            "text,summary,full_text,sentiment_label,sentiment_score\n\
             snippet,short,full article,neutral,0.1\n\
             snippet,short,,neutral,0.1\n",
        );
        let batch = read_records(file.path()).unwrap();
        assert_eq!(batch.records[0].body.as_deref(), Some("full article"));
        // Column choice is per file; a blank cell is not refilled from the next column
        assert_eq!(batch.records[1].body, None);
    }

    #[test]
    fn test_bad_score_and_short_row() {
        let file = input_file(
            "title,sentiment_label,sentiment_score\n\
             Meesho IPO opens,positive,high\n\
             Groww IPO opens\n",
        );
        let batch = read_records(file.path()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].sentiment_score, None);
        assert_eq!(batch.unreadable_rows, 1);
    }

    #[test]
    fn test_missing_required_columns() {
        let no_text = input_file("url,sentiment_score\nx,0.1\n");
        assert!(matches!(
            read_records(no_text.path()),
            Err(AppError::MissingColumn(_))
        ));

        let no_label = input_file("title,sentiment_score\nMeesho IPO opens,0.4\n");
        assert!(matches!(
            read_records(no_label.path()),
            Err(AppError::MissingColumn(column)) if column == "sentiment_label"
        ));

        let no_score = input_file("title,sentiment_label\nMeesho IPO,positive\n");
        assert!(matches!(
            read_records(no_score.path()),
            Err(AppError::MissingColumn(column)) if column == "sentiment_score"
        ));
    }

    #[test]
    fn test_pipeline_outputs_written() {
        let file = input_file(
            "title,published_date,sentiment_label,sentiment_score\n\
             Meesho IPO opens for subscription,2025-01-06,positive,0.7\n\
             Meesho IPO subscribed 12 times,2025-01-14,positive,0.9\n\
             Groww Invest IPO listing muted,2025-01-08,negative,-0.5\n",
        );
        let batch = read_records(file.path()).unwrap();
        let out = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .run(&batch.records)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(
            dir.path().join("processed"),
            &out.aggregates,
            &out.trends,
            &out.signals,
            true,
        )
        .unwrap();

        let summary = fs::read_to_string(&written.summary).unwrap();
        assert!(summary.starts_with(
            "entity_id,record_count,mean_sentiment,max_sentiment,min_sentiment,\
             positive_count,negative_count,neutral_count,positive_ratio,negative_ratio"
        ));

        let trend = fs::read_to_string(&written.trend).unwrap();
        assert!(trend.starts_with("entity_id,week,mean_sentiment,record_count"));
        assert!(trend.contains("Meesho,2025-01-06/2025-01-12,0.7,1"));

        let signals = fs::read_to_string(&written.signals).unwrap();
        let mut lines = signals.lines();
        assert_eq!(
            lines.next(),
            Some(
                "entity_id,signal,confidence,final_score,record_count,mean_sentiment,\
                 score_sentiment,score_buzz,score_consistency,score_trend"
            )
        );
        assert!(lines.next().unwrap().starts_with("Meesho,APPLY,HIGH,"));

        let json = fs::read_to_string(written.signals_json.unwrap()).unwrap();
        let parsed: Vec<SignalResult> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, out.signals);
    }
}

use pulse_core::{RunStats, SignalResult, SignalSummary};

const RULE: &str = "================================================================";

/// Ranked signal table, best first
pub fn print_signals(signals: &[SignalResult]) {
    println!("{}", RULE);
    println!("         IPO PULSE - Final Signals");
    println!("{}", RULE);
    println!(
        "{:<32} {:>8} {:>10} {:>7} {:>7} {:>9}",
        "ENTITY", "SIGNAL", "CONFIDENCE", "SCORE", "NEWS", "SENTIMENT"
    );

    for s in signals {
        println!(
            "{:<32} {:>8} {:>10} {:>7.4} {:>7} {:>9.4}",
            truncate(&s.entity_id, 32),
            s.signal.to_string(),
            s.confidence.to_string(),
            s.final_score,
            s.record_count,
            s.mean_sentiment,
        );
    }
}

pub fn print_summary(summary: &SignalSummary, stats: &RunStats) {
    println!("{}", RULE);
    println!(
        "[SIGNALS] APPLY: {}  NEUTRAL: {}  AVOID: {}",
        summary.apply, summary.neutral, summary.avoid
    );
    println!(
        "[RECORDS] in: {}  resolved: {}  skipped: {} \
         (invalid {}, off-topic {}, duplicate {}, no mention {}, rejected {})",
        stats.records_in,
        stats.records_resolved,
        stats.skipped(),
        stats.invalid_record,
        stats.not_ipo_related,
        stats.duplicate,
        stats.no_mention,
        stats.rejected_mention,
    );
    println!(
        "[ENTITIES] aggregated: {}  filtered: {}  scored: {}",
        stats.entities, stats.entities_filtered, stats.signals
    );
    if stats.unparseable_timestamp > 0 {
        println!(
            "[WARN] {} records had unparseable timestamps (excluded from trends)",
            stats.unparseable_timestamp
        );
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut out: String = name.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Meesho", 32), "Meesho");
        assert_eq!(truncate("Shadowfax Technologies", 12), "Shadowfax...");
    }
}

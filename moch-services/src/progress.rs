//! Weight progress aggregation and preference descriptions.
//!
//! Aggregates are computed from a fresh query every time; nothing here is
//! cached.

use serde::Serialize;

use moch_models::WeightEntry;

/// First and last measurement of a series and the difference between them.
#[derive(Debug, Clone, Serialize)]
pub struct WeightSummary {
    pub start: WeightEntry,
    pub end: WeightEntry,
    /// `end.weight - start.weight`, in kilograms.
    pub change: f64,
}

impl WeightSummary {
    pub fn is_gain(&self) -> bool {
        self.change > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.change < 0.0
    }
}

/// Summarize entries already sorted ascending by `recorded_at`.
///
/// Returns `None` for an empty slice. A single entry is both start and end
/// with a change of zero.
pub fn summarize(entries: &[WeightEntry]) -> Option<WeightSummary> {
    let start = entries.first()?;
    let end = entries.last()?;
    Some(WeightSummary {
        start: start.clone(),
        end: end.clone(),
        change: end.weight - start.weight,
    })
}

/// Human description of a reminder lead time, e.g.
/// "Alerts fire 6 hours before the event.".
///
/// Fractional hours are truncated. From 24 hours up the lead time is
/// phrased in whole days, rounding down.
pub fn lead_time_description(hours: f64) -> String {
    let hours = hours.trunc() as i64;
    if hours < 24 {
        return format!(
            "Alerts fire {hours} {} before the event.",
            if hours == 1 { "hour" } else { "hours" }
        );
    }
    let days = hours / 24;
    format!(
        "Alerts fire {days} {} before the event.",
        if days == 1 { "day" } else { "days" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn entry(weight: f64, day: u32) -> WeightEntry {
        WeightEntry::for_pet_id(
            Uuid::nil(),
            weight,
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        )
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_summarize_single_entry() {
        let only = entry(5.4, 1);
        let summary = summarize(std::slice::from_ref(&only)).unwrap();
        assert_eq!(summary.start, only);
        assert_eq!(summary.end, only);
        assert_eq!(summary.change, 0.0);
    }

    #[test]
    fn test_summarize_gain() {
        let entries = vec![entry(5.4, 1), entry(5.5, 8), entry(5.7, 15)];
        let summary = summarize(&entries).unwrap();
        assert_eq!(summary.start.weight, 5.4);
        assert_eq!(summary.end.weight, 5.7);
        assert!((summary.change - 0.3).abs() < 1e-9);
        assert!(summary.is_gain());
    }

    #[test]
    fn test_summarize_loss() {
        let summary = summarize(&[entry(6.0, 1), entry(5.5, 2)]).unwrap();
        assert!(summary.is_loss());
    }

    #[test]
    fn test_lead_time_description() {
        assert_eq!(lead_time_description(1.0), "Alerts fire 1 hour before the event.");
        assert_eq!(lead_time_description(6.9), "Alerts fire 6 hours before the event.");
        assert_eq!(lead_time_description(24.0), "Alerts fire 1 day before the event.");
        assert_eq!(lead_time_description(72.0), "Alerts fire 3 days before the event.");
        assert_eq!(lead_time_description(36.0), "Alerts fire 1 day before the event.");
    }
}

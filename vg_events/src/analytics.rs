//! ABOUTME: Pure aggregations over the motion event log
//! ABOUTME: Hour and weekday histograms, duration statistics, recency filters and a text summary

use crate::MotionEvent;
use chrono::{DateTime, Datelike, Duration, Local, Timelike, Weekday};
use serde::Serialize;
use std::fmt::Write;
use vg_core::format_timestamp;

/// Event counts per hour of day, indexed 0..24
pub type HourlyHistogram = [u32; 24];
/// Event counts per weekday, indexed Monday = 0
pub type WeekdayHistogram = [u32; 7];

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Summary of event durations in seconds; all zero for an empty log
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

/// Bucket events by the hour their start falls in
pub fn hourly_distribution(events: &[MotionEvent]) -> HourlyHistogram {
    let mut buckets = [0u32; 24];
    for event in events {
        buckets[event.start.hour() as usize] += 1;
    }
    buckets
}

/// Bucket events by the weekday their start falls on
pub fn weekday_distribution(events: &[MotionEvent]) -> WeekdayHistogram {
    let mut buckets = [0u32; 7];
    for event in events {
        buckets[event.start.weekday().num_days_from_monday() as usize] += 1;
    }
    buckets
}

/// Weekday by hour counts, rows Monday first
pub fn heatmap(events: &[MotionEvent]) -> [[u32; 24]; 7] {
    let mut grid = [[0u32; 24]; 7];
    for event in events {
        let day = event.start.weekday().num_days_from_monday() as usize;
        grid[day][event.start.hour() as usize] += 1;
    }
    grid
}

pub fn duration_statistics(events: &[MotionEvent]) -> DurationStats {
    if events.is_empty() {
        return DurationStats::default();
    }

    let mut durations: Vec<f64> = events.iter().map(|e| e.duration).collect();
    durations.sort_by(f64::total_cmp);

    let count = durations.len();
    let mean = durations.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        durations[count / 2]
    } else {
        (durations[count / 2 - 1] + durations[count / 2]) / 2.0
    };
    let variance = durations.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / count as f64;

    DurationStats {
        count,
        min: durations[0],
        max: durations[count - 1],
        mean,
        median,
        std_dev: variance.sqrt(),
    }
}

/// Events that started no earlier than `hours` before `now`
pub fn events_within(events: &[MotionEvent], now: DateTime<Local>, hours: i64) -> Vec<MotionEvent> {
    let cutoff = now - Duration::hours(hours);
    events.iter().filter(|e| e.start >= cutoff).copied().collect()
}

/// Hour with the most event starts; ties go to the earliest hour
pub fn peak_hour(events: &[MotionEvent]) -> Option<u32> {
    if events.is_empty() {
        return None;
    }
    let buckets = hourly_distribution(events);
    let mut best = 0;
    for (hour, &count) in buckets.iter().enumerate() {
        if count > buckets[best] {
            best = hour;
        }
    }
    Some(best as u32)
}

/// The `n` busiest weekdays, most events first; ties keep Monday-first order
pub fn busiest_weekdays(events: &[MotionEvent], n: usize) -> Vec<(Weekday, u32)> {
    let buckets = weekday_distribution(events);
    let mut days: Vec<(Weekday, u32)> = WEEKDAYS.iter().copied().zip(buckets).collect();
    days.sort_by(|a, b| b.1.cmp(&a.1));
    days.truncate(n);
    days
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Human readable summary of the whole log
pub fn summary_report(events: &[MotionEvent], now: DateTime<Local>) -> String {
    let (Some(earliest), Some(latest)) = (
        events.iter().map(|e| e.start).min(),
        events.iter().map(|e| e.end).max(),
    ) else {
        return "No motion events recorded yet.".to_string();
    };

    let durations = duration_statistics(events);
    let span_hours = vg_core::seconds_between(earliest, latest) / 3600.0;
    let last_hour = events_within(events, now, 1).len();
    let last_day = events_within(events, now, 24).len();
    let peak = peak_hour(events).unwrap_or(0);

    let mut report = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(report, "MOTION DETECTION SUMMARY REPORT");
    let _ = writeln!(report, "===============================");
    let _ = writeln!(report);
    let _ = writeln!(report, "OVERALL STATISTICS");
    let _ = writeln!(report, "  Total Events:              {}", events.len());
    let _ = writeln!(report, "  Time Period:               {:.1} hours", span_hours);
    let _ = writeln!(report, "  First Detection:           {}", format_timestamp(earliest));
    let _ = writeln!(report, "  Latest Detection:          {}", format_timestamp(latest));
    let _ = writeln!(report);
    let _ = writeln!(report, "DURATION STATISTICS");
    let _ = writeln!(report, "  Average Duration:          {:.2} seconds", durations.mean);
    let _ = writeln!(report, "  Median Duration:           {:.2} seconds", durations.median);
    let _ = writeln!(report, "  Shortest Event:            {:.2} seconds", durations.min);
    let _ = writeln!(report, "  Longest Event:             {:.2} seconds", durations.max);
    let _ = writeln!(report, "  Standard Deviation:        {:.2} seconds", durations.std_dev);
    let _ = writeln!(report);
    let _ = writeln!(report, "RECENT ACTIVITY");
    let _ = writeln!(report, "  Last Hour:                 {} event(s)", last_hour);
    let _ = writeln!(report, "  Last 24 Hours:             {} event(s)", last_day);
    let _ = writeln!(report, "  Peak Activity Hour:        {}:00", peak);
    let _ = writeln!(report);
    let _ = writeln!(report, "BUSIEST DAYS OF WEEK");
    for (day, count) in busiest_weekdays(events, 3) {
        let _ = writeln!(report, "  {:<12}              {} event(s)", weekday_name(day), count);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::{local_time, monday_at};

    fn event_at(start: DateTime<Local>, secs: i64) -> MotionEvent {
        MotionEvent::new(start, start + Duration::seconds(secs))
    }

    #[test]
    fn test_empty_log_gives_zero_results() {
        assert_eq!(hourly_distribution(&[]), [0; 24]);
        assert_eq!(weekday_distribution(&[]), [0; 7]);
        assert_eq!(duration_statistics(&[]), DurationStats::default());
        assert!(events_within(&[], monday_at(12, 0, 0), 24).is_empty());
        assert_eq!(peak_hour(&[]), None);
        assert_eq!(
            summary_report(&[], monday_at(12, 0, 0)),
            "No motion events recorded yet."
        );
    }

    #[test]
    fn test_all_at_hour_fourteen() {
        let events: Vec<MotionEvent> = (0..5)
            .map(|i| event_at(monday_at(14, i * 10, 0), 3))
            .collect();
        let hist = hourly_distribution(&events);
        assert_eq!(hist[14], 5);
        assert_eq!(hist.iter().sum::<u32>(), 5);
        assert!(hist.iter().enumerate().all(|(h, &c)| h == 14 || c == 0));
        assert_eq!(peak_hour(&events), Some(14));
    }

    #[test]
    fn test_weekday_buckets_and_heatmap() {
        let events = vec![
            event_at(monday_at(9, 0, 0), 1),
            event_at(local_time(2024, 1, 17, 9, 30, 0), 1), // Wednesday
            event_at(local_time(2024, 1, 21, 22, 0, 0), 1), // Sunday
            event_at(local_time(2024, 1, 24, 9, 0, 0), 1),  // Wednesday
        ];
        assert_eq!(weekday_distribution(&events), [1, 0, 2, 0, 0, 0, 1]);

        let grid = heatmap(&events);
        assert_eq!(grid[2][9], 2);
        assert_eq!(grid[6][22], 1);
        assert_eq!(grid.iter().flatten().sum::<u32>(), 4);

        let busiest = busiest_weekdays(&events, 3);
        assert_eq!(busiest[0], (Weekday::Wed, 2));
        assert_eq!(busiest[1], (Weekday::Mon, 1));
        assert_eq!(busiest[2], (Weekday::Sun, 1));
    }

    #[test]
    fn test_duration_statistics() {
        let t = monday_at(10, 0, 0);
        let events: Vec<MotionEvent> = [2, 4, 4, 4, 5, 5, 7, 9]
            .iter()
            .map(|&s| event_at(t, s))
            .collect();
        let stats = duration_statistics(&events);
        assert_eq!(stats.count, 8);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.median, 4.5);
        assert_eq!(stats.std_dev, 2.0);
    }

    #[test]
    fn test_events_within_window() {
        let now = monday_at(12, 0, 0);
        let events = vec![
            event_at(now - Duration::hours(30), 1),
            event_at(now - Duration::hours(24), 1),
            event_at(now - Duration::minutes(30), 1),
        ];
        assert_eq!(events_within(&events, now, 24).len(), 2);
        assert_eq!(events_within(&events, now, 1).len(), 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let events = vec![event_at(monday_at(8, 0, 0), 3), event_at(monday_at(9, 0, 0), 5)];
        assert_eq!(hourly_distribution(&events), hourly_distribution(&events));
        assert_eq!(duration_statistics(&events), duration_statistics(&events));
        let now = monday_at(10, 0, 0);
        assert_eq!(summary_report(&events, now), summary_report(&events, now));
    }

    #[test]
    fn test_summary_report_contents() {
        let events = vec![event_at(monday_at(8, 0, 0), 3), event_at(monday_at(9, 0, 0), 5)];
        let report = summary_report(&events, monday_at(9, 30, 0));

        assert!(report.contains("Total Events:              2"));
        assert!(report.contains("First Detection:           2024-01-15 08:00:00"));
        assert!(report.contains("Latest Detection:          2024-01-15 09:00:05"));
        assert!(report.contains("Average Duration:          4.00 seconds"));
        assert!(report.contains("Last Hour:                 1 event(s)"));
        assert!(report.contains("Last 24 Hours:             2 event(s)"));
        assert!(report.contains("Peak Activity Hour:        8:00"));
        assert!(report.contains("Monday"));
    }
}

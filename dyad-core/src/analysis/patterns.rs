//! Activity patterns
//!
//! Monthly volume, weekday/weekend split, hour-by-weekday heatmaps, burst
//! windows, daily streaks, and monthly trend series.
//!
//! Hour bucketing uses each message's UTC calendar hour: one fixed clock
//! for the whole conversation, never adjusted for participants' differing
//! time zones. Changing this would shift every downstream composite score,
//! so it stays as documented behavior.

use crate::analysis::sentiment;
use crate::analysis::session::Session;
use crate::analysis::timing::ResponseEvent;
use crate::config::PatternConfig;
use crate::types::UnifiedMessage;
use chrono::{DateTime, Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DAY_MS: i64 = 86_400_000;

/// Message counts by weekday (0=Sunday) and hour (0-23).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heatmap {
    /// `cells[weekday][hour]`
    pub cells: [[u32; 24]; 7],
}

impl Default for Heatmap {
    fn default() -> Self {
        Self {
            cells: [[0; 24]; 7],
        }
    }
}

impl Heatmap {
    /// Record one message at (weekday, hour).
    pub fn record(&mut self, weekday: usize, hour: usize) {
        self.cells[weekday % 7][hour % 24] += 1;
    }

    /// Total messages recorded.
    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .map(|&c| u64::from(c))
            .sum()
    }

    /// Peak cell as (weekday, hour, count).
    ///
    /// Ties resolve to the first-encountered cell in iteration order
    /// (weekday 0→6, hour 0→23). `None` when the heatmap is empty.
    pub fn peak(&self) -> Option<(usize, usize, u32)> {
        let mut best: Option<(usize, usize, u32)> = None;
        for (weekday, row) in self.cells.iter().enumerate() {
            for (hour, &count) in row.iter().enumerate() {
                if count > 0 && best.map_or(true, |(_, _, c)| count > c) {
                    best = Some((weekday, hour, count));
                }
            }
        }
        best
    }
}

/// Weekday vs weekend message split for one participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekdaySplit {
    /// Messages sent Monday-Friday
    pub weekday: usize,
    /// Messages sent Saturday/Sunday
    pub weekend: usize,
    /// Weekend share, 0-100
    pub weekend_share: f64,
}

/// A run of consecutive days with volume above the burst threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstWindow {
    /// First day of the window (`YYYY-MM-DD`, UTC)
    pub start_day: String,
    /// Last day of the window (`YYYY-MM-DD`, UTC)
    pub end_day: String,
    /// Days in the window
    pub days: usize,
    /// Total messages inside the window
    pub total_messages: usize,
    /// Day with the highest volume
    pub peak_day: String,
    /// Volume on the peak day
    pub peak_count: usize,
}

/// Daily-streak statistics for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    /// Consecutive active days ending on the conversation's final day
    pub current_days: i64,
    /// Longest run of consecutive active days
    pub longest_days: i64,
    /// Days with at least one message
    pub active_days: i64,
}

/// One month of trend data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrendPoint {
    /// `YYYY-MM`
    pub month: String,
    /// Messages in this month
    pub messages: usize,
    /// Mean reply latency for replies landing in this month (0 when none)
    pub avg_response_ms: f64,
    /// Mean message length in characters
    pub avg_message_chars: f64,
    /// Session-initiation share per person, 0-100
    pub initiation_share: BTreeMap<String, f64>,
    /// Mean sentiment of text messages, -1..1
    pub sentiment: f64,
}

/// Full activity-pattern report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// month -> person -> message count
    pub monthly_volume: BTreeMap<String, BTreeMap<String, usize>>,
    /// Weekday/weekend split per person
    pub weekday_split: BTreeMap<String, WeekdaySplit>,
    /// Hour-by-weekday heatmap per person
    pub heatmaps: BTreeMap<String, Heatmap>,
    /// Combined heatmap over all participants
    pub combined_heatmap: Heatmap,
    /// High-volume day windows
    pub bursts: Vec<BurstWindow>,
    /// Daily streaks per person
    pub streaks: BTreeMap<String, StreakStats>,
    /// Month-by-month trend series
    pub monthly_trends: Vec<MonthlyTrendPoint>,
}

/// Compute the full activity-pattern report.
pub fn compute_patterns(
    messages: &[UnifiedMessage],
    sessions: &[Session],
    events: &[ResponseEvent],
    participants: &[String],
    config: &PatternConfig,
) -> PatternReport {
    let mut report = PatternReport::default();
    for p in participants {
        report.heatmaps.entry(p.clone()).or_default();
        report.weekday_split.entry(p.clone()).or_default();
        report.streaks.entry(p.clone()).or_default();
    }
    if messages.is_empty() {
        return report;
    }

    let mut daily_total: BTreeMap<i64, usize> = BTreeMap::new();
    let mut daily_person: BTreeMap<String, BTreeMap<i64, usize>> = BTreeMap::new();
    let mut monthly_chars: BTreeMap<String, usize> = BTreeMap::new();
    let mut monthly_sentiment: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for msg in messages {
        let ts = msg.timestamp();
        let weekday = ts.weekday().num_days_from_sunday() as usize;
        let hour = ts.hour() as usize;
        let month = month_key(ts);
        let day = msg.timestamp_ms.div_euclid(DAY_MS);

        *report
            .monthly_volume
            .entry(month.clone())
            .or_default()
            .entry(msg.sender.clone())
            .or_default() += 1;

        report
            .heatmaps
            .entry(msg.sender.clone())
            .or_default()
            .record(weekday, hour);
        report.combined_heatmap.record(weekday, hour);

        let split = report.weekday_split.entry(msg.sender.clone()).or_default();
        if weekday == 0 || weekday == 6 {
            split.weekend += 1;
        } else {
            split.weekday += 1;
        }

        *daily_total.entry(day).or_default() += 1;
        *daily_person
            .entry(msg.sender.clone())
            .or_default()
            .entry(day)
            .or_default() += 1;

        *monthly_chars.entry(month.clone()).or_default() += msg.content.chars().count();
        if msg.is_text() {
            let entry = monthly_sentiment.entry(month).or_insert((0.0, 0));
            entry.0 += sentiment::score_text(&msg.content);
            entry.1 += 1;
        }
    }

    for split in report.weekday_split.values_mut() {
        let total = split.weekday + split.weekend;
        if total > 0 {
            split.weekend_share = split.weekend as f64 / total as f64 * 100.0;
        }
    }

    let first_day = messages[0].timestamp_ms.div_euclid(DAY_MS);
    let last_day = messages[messages.len() - 1].timestamp_ms.div_euclid(DAY_MS);
    report.bursts = detect_bursts(&daily_total, first_day, last_day, config.burst_multiplier);

    for (person, days) in &daily_person {
        if let Some(stats) = report.streaks.get_mut(person) {
            *stats = compute_streaks(days, last_day);
        }
    }

    report.monthly_trends = monthly_trends(
        &report.monthly_volume,
        &monthly_chars,
        &monthly_sentiment,
        sessions,
        events,
    );

    report
}

fn month_key(ts: DateTime<chrono::Utc>) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

fn day_label(day: i64) -> String {
    DateTime::from_timestamp_millis(day * DAY_MS)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Maximal runs of consecutive days with volume above
/// `multiplier x (average daily volume over the whole span)`.
fn detect_bursts(
    daily: &BTreeMap<i64, usize>,
    first_day: i64,
    last_day: i64,
    multiplier: f64,
) -> Vec<BurstWindow> {
    let span_days = (last_day - first_day + 1).max(1);
    let total: usize = daily.values().sum();
    let average = total as f64 / span_days as f64;
    let threshold = average * multiplier;

    let mut windows = Vec::new();
    let mut run: Vec<(i64, usize)> = Vec::new();

    for day in first_day..=last_day {
        let count = daily.get(&day).copied().unwrap_or(0);
        if count as f64 > threshold {
            run.push((day, count));
        } else if !run.is_empty() {
            windows.push(close_burst(&run));
            run.clear();
        }
    }
    if !run.is_empty() {
        windows.push(close_burst(&run));
    }

    windows
}

fn close_burst(run: &[(i64, usize)]) -> BurstWindow {
    let (peak_day, peak_count) = run
        .iter()
        .fold((run[0].0, run[0].1), |best, &(day, count)| {
            if count > best.1 {
                (day, count)
            } else {
                best
            }
        });
    BurstWindow {
        start_day: day_label(run[0].0),
        end_day: day_label(run[run.len() - 1].0),
        days: run.len(),
        total_messages: run.iter().map(|&(_, c)| c).sum(),
        peak_day: day_label(peak_day),
        peak_count,
    }
}

/// Streaks over a person's set of active days.
///
/// `current_days` is the run ending on the conversation's final day, so the
/// result is a pure function of the input rather than of the wall clock.
fn compute_streaks(days: &BTreeMap<i64, usize>, last_day: i64) -> StreakStats {
    let mut longest = 0i64;
    let mut streak = 0i64;
    let mut prev: Option<i64> = None;

    for &day in days.keys() {
        streak = match prev {
            Some(p) if day == p + 1 => streak + 1,
            _ => 1,
        };
        longest = longest.max(streak);
        prev = Some(day);
    }

    let mut current = 0i64;
    let mut day = last_day;
    while days.contains_key(&day) {
        current += 1;
        day -= 1;
    }

    StreakStats {
        current_days: current,
        longest_days: longest,
        active_days: days.len() as i64,
    }
}

fn monthly_trends(
    monthly_volume: &BTreeMap<String, BTreeMap<String, usize>>,
    monthly_chars: &BTreeMap<String, usize>,
    monthly_sentiment: &BTreeMap<String, (f64, usize)>,
    sessions: &[Session],
    events: &[ResponseEvent],
) -> Vec<MonthlyTrendPoint> {
    let mut response: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for event in events {
        if let Some(ts) = DateTime::from_timestamp_millis(event.reply_ms) {
            let entry = response.entry(month_key(ts)).or_insert((0.0, 0));
            entry.0 += event.delta_ms as f64;
            entry.1 += 1;
        }
    }

    let mut initiations: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for session in sessions {
        if let Some(ts) = DateTime::from_timestamp_millis(session.start_ms) {
            *initiations
                .entry(month_key(ts))
                .or_default()
                .entry(session.starter.clone())
                .or_default() += 1;
        }
    }
    monthly_volume
        .iter()
        .map(|(month, volume)| {
            let message_count: usize = volume.values().sum();
            let avg_response_ms = response
                .get(month)
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(0.0);
            let avg_message_chars = if message_count > 0 {
                monthly_chars.get(month).copied().unwrap_or(0) as f64 / message_count as f64
            } else {
                0.0
            };
            let sentiment = monthly_sentiment
                .get(month)
                .filter(|(_, n)| *n > 0)
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(0.0);

            let month_initiations = initiations.get(month);
            let total_initiations: usize =
                month_initiations.map(|m| m.values().sum()).unwrap_or(0);
            let initiation_share = month_initiations
                .map(|m| {
                    m.iter()
                        .map(|(person, count)| {
                            (
                                person.clone(),
                                *count as f64 / total_initiations as f64 * 100.0,
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();

            MonthlyTrendPoint {
                month: month.clone(),
                messages: message_count,
                avg_response_ms,
                avg_message_chars,
                initiation_share,
                sentiment,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::session::segment_sessions;
    use crate::analysis::timing::response_events;
    use crate::types::MessageKind;

    const HOUR_MS: i64 = 3_600_000;

    fn msg(index: usize, sender: &str, ts: i64, content: &str) -> UnifiedMessage {
        UnifiedMessage {
            index,
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp_ms: ts,
            kind: MessageKind::Text,
            reactions: vec![],
            has_media: false,
            has_link: false,
            is_unsent: false,
        }
    }

    fn participants() -> Vec<String> {
        vec!["ana".to_string(), "ben".to_string()]
    }

    fn run(messages: &[UnifiedMessage]) -> PatternReport {
        let sessions = segment_sessions(messages, 21_600_000);
        let events = response_events(messages);
        compute_patterns(
            messages,
            &sessions,
            &events,
            &participants(),
            &PatternConfig::default(),
        )
    }

    #[test]
    fn test_heatmap_buckets_by_utc_hour_and_weekday() {
        // 1970-01-01 was a Thursday (weekday 4, Sunday-based)
        let messages = vec![msg(0, "ana", 10 * HOUR_MS, "hi")];
        let report = run(&messages);
        assert_eq!(report.heatmaps["ana"].cells[4][10], 1);
        assert_eq!(report.combined_heatmap.cells[4][10], 1);
        assert_eq!(report.combined_heatmap.peak(), Some((4, 10, 1)));
    }

    #[test]
    fn test_heatmap_peak_tie_breaks_to_first_cell() {
        let mut heatmap = Heatmap::default();
        heatmap.record(3, 20);
        heatmap.record(1, 8);
        // Equal counts: weekday 1 comes first in iteration order
        assert_eq!(heatmap.peak(), Some((1, 8, 1)));
    }

    #[test]
    fn test_monthly_volume_keys() {
        let jan = msg(0, "ana", 0, "hello");
        let feb = msg(1, "ben", 32 * DAY_MS, "hello again");
        let report = run(&[jan, feb]);
        assert_eq!(report.monthly_volume["1970-01"]["ana"], 1);
        assert_eq!(report.monthly_volume["1970-02"]["ben"], 1);
        assert_eq!(report.monthly_trends.len(), 2);
        assert_eq!(report.monthly_trends[0].month, "1970-01");
    }

    #[test]
    fn test_weekend_split() {
        // Day 2 of epoch = Saturday 1970-01-03, day 4 = Monday 1970-01-05
        let saturday = msg(0, "ana", 2 * DAY_MS, "weekend");
        let monday = msg(1, "ana", 4 * DAY_MS, "weekday");
        let report = run(&[saturday, monday]);
        assert_eq!(report.weekday_split["ana"].weekend, 1);
        assert_eq!(report.weekday_split["ana"].weekday, 1);
        assert_eq!(report.weekday_split["ana"].weekend_share, 50.0);
    }

    #[test]
    fn test_burst_detection_finds_heavy_days() {
        let mut messages = Vec::new();
        let mut index = 0;
        // 10 quiet days with 1 message, then 2 days with 10 each
        for day in 0..10 {
            messages.push(msg(index, "ana", day * DAY_MS, "quiet"));
            index += 1;
        }
        for day in 10..12 {
            for m in 0..10 {
                messages.push(msg(index, "ben", day * DAY_MS + m * HOUR_MS, "busy"));
                index += 1;
            }
        }
        let report = run(&messages);
        assert_eq!(report.bursts.len(), 1);
        let burst = &report.bursts[0];
        assert_eq!(burst.days, 2);
        assert_eq!(burst.total_messages, 20);
        assert_eq!(burst.peak_count, 10);
        assert_eq!(burst.start_day, "1970-01-11");
    }

    #[test]
    fn test_streaks() {
        let mut messages = Vec::new();
        // Active days 0,1,2 then 5,6 (conversation ends day 6)
        for (i, day) in [0i64, 1, 2, 5, 6].iter().enumerate() {
            messages.push(msg(i, "ana", day * DAY_MS, "hi"));
        }
        let report = run(&messages);
        let streaks = &report.streaks["ana"];
        assert_eq!(streaks.longest_days, 3);
        assert_eq!(streaks.current_days, 2);
        assert_eq!(streaks.active_days, 5);
    }

    #[test]
    fn test_empty_timeline_yields_default_report() {
        let report = run(&[]);
        assert!(report.monthly_volume.is_empty());
        assert!(report.bursts.is_empty());
        assert_eq!(report.combined_heatmap.total(), 0);
    }
}

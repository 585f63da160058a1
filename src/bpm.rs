//! Tempo classification.
//!
//! Maps a BPM value onto the fixed six-color legend used across the
//! library UI. The table is configuration data, not a persisted entity.

use serde::Serialize;

/// One row of the tempo legend: a half-open `[min, max)` interval with its
/// display color and glyph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BpmColorRange {
    pub min: u16,
    pub max: u16,
    pub color: &'static str,
    pub emoji: &'static str,
}

pub const BPM_COLOR_RANGES: [BpmColorRange; 6] = [
    BpmColorRange { min: 70, max: 90, color: "blue", emoji: "\u{1f535}" },
    BpmColorRange { min: 90, max: 100, color: "green", emoji: "\u{1f7e2}" },
    BpmColorRange { min: 100, max: 110, color: "yellow", emoji: "\u{1f7e1}" },
    BpmColorRange { min: 110, max: 120, color: "orange", emoji: "\u{1f7e0}" },
    BpmColorRange { min: 120, max: 130, color: "red", emoji: "\u{1f534}" },
    BpmColorRange { min: 130, max: 140, color: "purple", emoji: "\u{1f7e3}" },
];

/// Returns the legend entry covering the given tempo, or `None` when the
/// value falls outside the table. Every range is half-open except the last
/// one: exactly 140 classifies as purple.
pub fn classify(bpm: f64) -> Option<&'static BpmColorRange> {
    let last = &BPM_COLOR_RANGES[BPM_COLOR_RANGES.len() - 1];
    if bpm == last.max as f64 {
        return Some(last);
    }
    BPM_COLOR_RANGES
        .iter()
        .find(|range| bpm >= range.min as f64 && bpm < range.max as f64)
}

pub fn color_name(bpm: f64) -> Option<&'static str> {
    classify(bpm).map(|range| range.color)
}

pub fn color_emoji(bpm: f64) -> Option<&'static str> {
    classify(bpm).map(|range| range.emoji)
}

/// Formats a duration in seconds as `m:ss`.
pub fn format_duration(seconds: u32) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    format!("{}:{:02}", mins, secs)
}

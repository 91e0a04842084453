//! Record to partition path mapping

use super::types::{PartitionPath, PartitionSegment};
use crate::record::WeatherRecord;
use crate::types::{PartitionLayout, RunTimestamp};
use chrono::Datelike;

const YEAR: &str = "year";
const MONTH: &str = "month";
const DAY: &str = "day";
const COUNTRY: &str = "country";
const CITY: &str = "city";

/// Segment keys of a layout, outermost first
pub fn layout_keys(layout: PartitionLayout) -> &'static [&'static str] {
    match layout {
        PartitionLayout::Date => &[YEAR, MONTH, DAY],
        PartitionLayout::DateCountry => &[YEAR, MONTH, DAY, COUNTRY],
        PartitionLayout::CountryDate => &[COUNTRY, YEAR, MONTH, DAY],
        PartitionLayout::HiveCompact => &[YEAR, MONTH, DAY, COUNTRY, CITY],
        PartitionLayout::CityDate => &[CITY, YEAR, MONTH, DAY],
    }
}

/// Compute the partition path of a record
///
/// Pure and deterministic: identical inputs always give identical paths.
pub fn plan(record: &WeatherRecord, layout: PartitionLayout, run_ts: &RunTimestamp) -> PartitionPath {
    let date = record.observed_at.date_naive();

    let segments = layout_keys(layout)
        .iter()
        .map(|&key| {
            let value = match key {
                YEAR => format!("{:04}", date.year()),
                MONTH => format!("{:02}", date.month()),
                DAY => format!("{:02}", date.day()),
                COUNTRY => sanitize_segment(&record.country),
                _ => sanitize_segment(&record.city),
            };
            PartitionSegment::new(key, value)
        })
        .collect();

    PartitionPath::new(segments, run_ts.file_stem())
}

/// Make a value safe as a single directory name
///
/// Path separators, NUL and `..` become `_`; an empty value becomes
/// `unknown`.
pub fn sanitize_segment(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }

    let cleaned: String = trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.replace("..", "_");

    if cleaned == "." {
        "_".to_string()
    } else {
        cleaned
    }
}

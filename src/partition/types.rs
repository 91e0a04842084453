//! Partition path types

use crate::types::{OutputFormat, SegmentStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One directory level of a partition path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartitionSegment {
    /// Dimension name (`year`, `country`, ...)
    pub key: &'static str,
    /// Rendered, path-safe value
    pub value: String,
}

impl PartitionSegment {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Directory name in the given style
    pub fn render(&self, style: SegmentStyle) -> String {
        match style {
            SegmentStyle::Plain => self.value.clone(),
            SegmentStyle::Hive => format!("{}={}", self.key, self.value),
        }
    }
}

/// Relative location of a record: directory segments plus file stem
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartitionPath {
    /// Segments, outermost first
    pub segments: Vec<PartitionSegment>,
    /// File name without extension
    pub stem: String,
}

impl PartitionPath {
    pub fn new(segments: Vec<PartitionSegment>, stem: impl Into<String>) -> Self {
        Self {
            segments,
            stem: stem.into(),
        }
    }

    /// Directory part relative to the dataset root
    pub fn relative_dir(&self, style: SegmentStyle) -> PathBuf {
        self.segments.iter().map(|s| s.render(style)).collect()
    }

    /// File name with the format's extension
    pub fn file_name(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.stem, format.extension())
    }

    /// `/`-joined segments and stem, as rendered on disk
    pub fn render(&self, style: SegmentStyle) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str(&segment.render(style));
            out.push('/');
        }
        out.push_str(&self.stem);
        out
    }

    /// Full file path under `base`
    pub fn to_path(&self, base: &Path, format: OutputFormat, style: SegmentStyle) -> PathBuf {
        base.join(self.relative_dir(style))
            .join(self.file_name(format))
    }
}

//! Partition planning
//!
//! Maps a record to the directory it belongs in and the file name it shares
//! with every other record of the same run.
//!
//! # Overview
//!
//! | layout | segments |
//! |---|---|
//! | `date` | year, month, day |
//! | `date_country` | year, month, day, country |
//! | `country_date` | country, year, month, day |
//! | `hive_compact` | year, month, day, country, city |
//! | `city_date` | city, year, month, day |
//!
//! Dates come from the observation instant. The file stem comes from the
//! run timestamp only, so each partition directory holds one file per run.

mod planner;
mod types;

pub use planner::{layout_keys, plan, sanitize_segment};
pub use types::{PartitionPath, PartitionSegment};

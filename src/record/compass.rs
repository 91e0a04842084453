//! Compass labels for wind direction

use serde::{Deserialize, Serialize};

/// The 16 compass points, clockwise from north
pub const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

const SECTOR_WIDTH: f64 = 22.5;
const HALF_SECTOR: f64 = SECTOR_WIDTH / 2.0;

/// Which of two neighbouring sectors owns the boundary between them
///
/// Each label covers a 22.5° sector centred on its bearing, so sector
/// boundaries fall on odd multiples of 11.25°.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorBoundary {
    /// A boundary belongs to the clockwise sector (11.25° is NNE)
    #[default]
    LowerInclusive,
    /// A boundary belongs to the counter-clockwise sector (11.25° is N)
    UpperInclusive,
}

/// Compass label for a bearing in degrees, with the default boundary rule
///
/// Returns `None` for values outside `[0, 360]` and for non-finite input.
pub fn wind_direction(degrees: f64) -> Option<&'static str> {
    wind_direction_with(degrees, SectorBoundary::default())
}

/// Compass label for a bearing using an explicit boundary rule
pub fn wind_direction_with(degrees: f64, boundary: SectorBoundary) -> Option<&'static str> {
    if !degrees.is_finite() || !(0.0..=360.0).contains(&degrees) {
        return None;
    }

    let position = (degrees + HALF_SECTOR) / SECTOR_WIDTH;
    let sector = match boundary {
        SectorBoundary::LowerInclusive => position.floor(),
        SectorBoundary::UpperInclusive => position.ceil() - 1.0,
    };

    let index = (sector as i64).rem_euclid(COMPASS_POINTS.len() as i64) as usize;
    Some(COMPASS_POINTS[index])
}

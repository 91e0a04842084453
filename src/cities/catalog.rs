//! Reference city catalog

use crate::error::{Error, Result};
use crate::types::CityId;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Decides whether a configured city exists
pub trait CityValidator: Send + Sync {
    /// True when the city may be fetched
    fn is_valid(&self, city: &CityId) -> bool;
}

impl<F> CityValidator for F
where
    F: Fn(&CityId) -> bool + Send + Sync,
{
    fn is_valid(&self, city: &CityId) -> bool {
        self(city)
    }
}

/// Normalize a city name for comparison ("  Lisboa " -> "lisboa")
pub fn normalize_city_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One entry of the OpenWeather `city.list.json`
#[derive(Debug, Deserialize)]
struct CityListEntry {
    name: String,
    country: String,
}

/// Set of known (name, country) pairs
#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    entries: HashSet<(String, String)>,
}

impl CityCatalog {
    /// Build a catalog from explicit entries
    pub fn from_entries<I, N, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, country)| {
                (
                    normalize_city_name(name.as_ref()),
                    country.as_ref().trim().to_uppercase(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Parse a JSON city list
    ///
    /// Entries are objects with at least `name` and `country`; every other
    /// field (`id`, `coord`, `state`, ...) is ignored.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let list: Vec<CityListEntry> = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid city list JSON: {e}")))?;
        Ok(Self::from_entries(
            list.into_iter().map(|entry| (entry.name, entry.country)),
        ))
    }

    /// Load a JSON city list from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            cities = catalog.len(),
            "loaded reference city list"
        );
        Ok(catalog)
    }

    /// Number of distinct entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the pair is in the catalog
    pub fn contains(&self, name: &str, country: &str) -> bool {
        self.entries
            .contains(&(normalize_city_name(name), country.trim().to_uppercase()))
    }
}

impl CityValidator for CityCatalog {
    fn is_valid(&self, city: &CityId) -> bool {
        self.contains(&city.name, &city.country)
    }
}

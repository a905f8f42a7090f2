//! Location-ID validation: static offline ID ranges, a durable negative
//! cache of confirmed-invalid IDs, and a live station probe as last resort.
//!
//! The point is to keep invalid-ID storms away from ESI: a station deleted
//! from the game would otherwise cost a 404 round-trip on every lookup.
use crate::repository::EsiRepository;
use evetrade_store::CacheStore;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// ESI identifiers never exceed the 32-bit signed maximum; anything larger
/// is malformed by construction.
pub const MAX_LOCATION_ID: i64 = i32::MAX as i64;
/// NPC station identifiers start here.
pub const STATION_ID_MIN: i64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Region,
    Constellation,
    SolarSystem,
    Station,
    Structure,
    ItemType,
}

/// One record of the static offline dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRange {
    pub min: i64,
    pub max: i64,
    #[serde(rename = "type")]
    pub kind: LocationType,
    #[serde(default)]
    pub description: Option<String>,
}

/// Immutable ID-range table, loaded once at startup and queried by
/// containment.
#[derive(Debug, Clone, Default)]
pub struct IdRangeTable {
    ranges: Vec<IdRange>,
}

impl IdRangeTable {
    pub fn new(ranges: Vec<IdRange>) -> Self {
        Self { ranges }
    }

    /// Load the dataset from a JSON file. A missing or malformed file
    /// degrades to an empty table: validation then always falls back to
    /// live probing.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    "id range dataset unavailable, using empty table: {}",
                    err
                );
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<IdRange>>(&content) {
            Ok(ranges) => Self::new(ranges),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    "id range dataset malformed, using empty table: {}",
                    err
                );
                Self::default()
            }
        }
    }

    pub fn classify(&self, id: i64) -> Option<LocationType> {
        self.ranges
            .iter()
            .find(|range| range.min <= id && id <= range.max)
            .map(|range| range.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

pub struct LocationValidator {
    ranges: IdRangeTable,
    store: Arc<dyn CacheStore>,
    repository: Arc<dyn EsiRepository>,
}

impl LocationValidator {
    pub fn new(
        ranges: IdRangeTable,
        store: Arc<dyn CacheStore>,
        repository: Arc<dyn EsiRepository>,
    ) -> Self {
        Self {
            ranges,
            store,
            repository,
        }
    }

    fn invalid_key(id: i64) -> String {
        format!("invalid-location:{}", id)
    }

    /// Static classification only; no store or network access.
    pub fn get_location_type(&self, id: i64) -> Option<LocationType> {
        self.ranges.classify(id)
    }

    /// Record an id as proven invalid. The mark never expires.
    pub async fn mark_location_id_as_invalid(&self, id: i64) {
        if let Err(err) =
            self.store.set_raw_value(&Self::invalid_key(id), "1").await
        {
            tracing::warn!(id, "failed to record invalid location id: {}", err);
        }
    }

    async fn is_marked_invalid(&self, id: i64) -> bool {
        match self.store.get_raw_value(&Self::invalid_key(id)).await {
            Ok(mark) => mark.is_some(),
            Err(err) => {
                // A store hiccup is a cache miss, not a validity answer.
                tracing::warn!(id, "negative cache lookup failed: {}", err);
                false
            }
        }
    }

    /// Whether an id denotes a valid station, solar system or structure.
    ///
    /// Statically known ranges and the negative cache answer without any
    /// network call; only unclassifiable ids hit the live station probe.
    pub async fn is_valid_location_id(&self, id: Option<i64>) -> bool {
        let Some(id) = id else {
            return false;
        };
        if self.is_marked_invalid(id).await {
            return false;
        }
        if id > MAX_LOCATION_ID {
            self.mark_location_id_as_invalid(id).await;
            return false;
        }
        if self.ranges.classify(id).is_some() {
            return true;
        }
        self.probe_station(id).await
    }

    /// Whether an id denotes a station specifically.
    pub async fn is_station(&self, id: i64) -> bool {
        if id < STATION_ID_MIN {
            return false;
        }
        if self.is_marked_invalid(id).await {
            return false;
        }
        match self.ranges.classify(id) {
            Some(LocationType::Station) => true,
            Some(_) => false,
            None => self.probe_station(id).await,
        }
    }

    /// Live probe against the station endpoint. 400/404 prove the id
    /// invalid and feed the negative cache; transient failures must not
    /// poison it.
    async fn probe_station(&self, id: i64) -> bool {
        match self.repository.get_station_details(id).await {
            Ok(_) => true,
            Err(err) if err.is_invalid_target() => {
                tracing::debug!(id, "station probe rejected id: {}", err);
                self.mark_location_id_as_invalid(id).await;
                false
            }
            Err(err) => {
                tracing::warn!(
                    id,
                    "station probe failed transiently, not caching: {}",
                    err
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> IdRangeTable {
        IdRangeTable::new(vec![
            IdRange {
                min: 30_000_000,
                max: 32_999_999,
                kind: LocationType::SolarSystem,
                description: None,
            },
            IdRange {
                min: 60_000_000,
                max: 63_999_999,
                kind: LocationType::Station,
                description: None,
            },
        ])
    }

    #[test]
    fn test_classify_by_containment() {
        let table = table();
        assert_eq!(table.classify(30_000_142), Some(LocationType::SolarSystem));
        assert_eq!(table.classify(60_003_760), Some(LocationType::Station));
        assert_eq!(table.classify(99_999_999), None);
    }

    #[test]
    fn test_missing_dataset_degrades_to_empty() {
        let table = IdRangeTable::load("/nonexistent/id_ranges.json");
        assert!(table.is_empty());
        assert_eq!(table.classify(30_000_142), None);
    }

    #[test]
    fn test_bundled_dataset_loads() {
        let table = IdRangeTable::load("data/id_ranges.json");
        assert!(!table.is_empty());
        // Jita and its 4-4 station fall inside the bundled ranges.
        assert_eq!(table.classify(30_000_142), Some(LocationType::SolarSystem));
        assert_eq!(table.classify(60_003_760), Some(LocationType::Station));
    }
}

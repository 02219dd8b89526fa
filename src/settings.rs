//! ## Dashboard Settings
//!
//! Locations of the two remote files and of the local cache directory they are written to.
//! The defaults point at the January 2024 yellow taxi release of the NYC Taxi & Limousine
//! Commission; the binary lets each value be overridden from the command line or environment.

use std::path::PathBuf;

/// Default trip-records parquet file.
pub const DEFAULT_TRIP_DATA_URL: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2024-01.parquet";

/// Default zone lookup table.
pub const DEFAULT_ZONE_LOOKUP_URL: &str =
    "https://d37ci6vzurychx.cloudfront.net/misc/taxi_zone_lookup.csv";

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "data/raw";

/// Where the dashboard reads its data from and where it caches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    pub trip_data_url: String,
    pub zone_lookup_url: String,
    pub cache_dir: PathBuf,
}

impl DashboardSettings {
    pub fn new(
        trip_data_url: impl Into<String>,
        zone_lookup_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            trip_data_url: trip_data_url.into(),
            zone_lookup_url: zone_lookup_url.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Cached copy of the trip data. Named after the last path segment of the URL.
    pub fn trip_data_path(&self) -> PathBuf {
        self.cache_dir
            .join(file_name_from_url(&self.trip_data_url, "trip_data.parquet"))
    }

    /// Cached copy of the zone lookup table. Named after the last path segment of the URL.
    pub fn zone_lookup_path(&self) -> PathBuf {
        self.cache_dir
            .join(file_name_from_url(&self.zone_lookup_url, "zone_lookup.csv"))
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_TRIP_DATA_URL,
            DEFAULT_ZONE_LOOKUP_URL,
            DEFAULT_CACHE_DIR,
        )
    }
}

/// Last non-empty path segment of `url` without query string, or `fallback`.
fn file_name_from_url(url: &str, fallback: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

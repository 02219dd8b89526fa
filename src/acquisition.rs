//! ## Data acquisition
//!
//! Retrieves the two TLC files and turns them into DataFrames:
//!
//! 1. Both remote files are downloaded and written to the cache directory, overwriting any
//!    previous copy (the directory is created when missing).
//! 2. The trip data is then fetched a second time and decoded straight into an in-memory table;
//!    the cached parquet copy is not read back.
//! 3. The zone lookup is read back from its cached CSV copy.
//!
//! There is no retry and no integrity check: a failed request aborts startup with
//! [`DashboardError::Download`], a malformed file surfaces as a Parquet/DataFusion error.
//!
//! The network sits behind the [`Fetcher`] trait so that the pipeline can be driven from
//! other sources; [`HttpFetcher`] is the `reqwest` implementation.

use crate::exceptions::{DashboardError, DashboardResult};
use crate::settings::DashboardSettings;
use async_trait::async_trait;
use bytes::Bytes;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Retrieves the raw bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> DashboardResult<Bytes>;
}

/// Plain HTTPS GET with `reqwest`; non-success status codes are failures.
pub struct HttpFetcher(reqwest::Client);

impl HttpFetcher {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self(client)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> DashboardResult<Bytes> {
        let download_error = |source: reqwest::Error| DashboardError::Download {
            url: url.to_string(),
            source,
        };
        let response = self
            .0
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download_error)?;
        response.bytes().await.map_err(download_error)
    }
}

/// The two raw tables, before any normalization.
pub struct RawTables {
    pub trips: DataFrame,
    pub zones: DataFrame,
}

/// Downloads `url` and writes it to `path`, replacing any existing file.
///
/// Returns the number of bytes written.
#[tracing::instrument(skip(fetcher, path), fields(path = %path.display()))]
pub async fn download_to_cache(
    fetcher: &dyn Fetcher,
    url: &str,
    path: &Path,
) -> DashboardResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = fetcher.fetch(url).await?;
    tokio::fs::write(path, &bytes).await?;
    info!(bytes = bytes.len(), "Cached remote file");
    Ok(bytes.len())
}

/// Writes both remote files into the cache directory.
pub async fn download_raw_files(
    settings: &DashboardSettings,
    fetcher: &dyn Fetcher,
) -> DashboardResult<()> {
    download_to_cache(fetcher, &settings.trip_data_url, &settings.trip_data_path()).await?;
    download_to_cache(
        fetcher,
        &settings.zone_lookup_url,
        &settings.zone_lookup_path(),
    )
    .await?;
    Ok(())
}

/// Decodes a parquet file held in memory into a DataFrame backed by a [`MemTable`].
pub fn trips_from_parquet_bytes(ctx: &SessionContext, bytes: Bytes) -> DashboardResult<DataFrame> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    debug!(rows, columns = schema.fields().len(), "Decoded parquet trip data");
    let table = MemTable::try_new(schema, vec![batches])?;
    ctx.read_table(Arc::new(table)).map_err(DashboardError::from)
}

/// Fetches the trip data from `url` and loads it into memory.
#[tracing::instrument(skip(ctx, fetcher))]
pub async fn load_remote_trips(
    ctx: &SessionContext,
    fetcher: &dyn Fetcher,
    url: &str,
) -> DashboardResult<DataFrame> {
    let bytes = fetcher.fetch(url).await?;
    trips_from_parquet_bytes(ctx, bytes)
}

/// Loads a previously cached trip data file.
pub async fn load_cached_trips(ctx: &SessionContext, path: &Path) -> DashboardResult<DataFrame> {
    let bytes = tokio::fs::read(path).await?;
    trips_from_parquet_bytes(ctx, Bytes::from(bytes))
}

/// Reads the zone lookup CSV (header row, comma separated).
pub async fn load_zone_lookup(ctx: &SessionContext, path: &Path) -> DashboardResult<DataFrame> {
    let path_str = path.to_str().ok_or_else(|| {
        DashboardError::InvalidParameter(format!("Path {} is not valid UTF-8", path.display()))
    })?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    let options = CsvReadOptions::new()
        .has_header(true)
        .file_extension(&extension);
    ctx.read_csv(path_str, options)
        .await
        .map_err(DashboardError::from)
}

/// Full acquisition: cache both files, load the trips from the network, the zones from the cache.
pub async fn acquire(
    ctx: &SessionContext,
    settings: &DashboardSettings,
    fetcher: &dyn Fetcher,
) -> DashboardResult<RawTables> {
    info!(
        trips = %settings.trip_data_url,
        zones = %settings.zone_lookup_url,
        cache_dir = %settings.cache_dir.display(),
        "Acquiring raw data"
    );
    download_raw_files(settings, fetcher).await?;
    let trips = load_remote_trips(ctx, fetcher, &settings.trip_data_url).await?;
    let zones = load_zone_lookup(ctx, &settings.zone_lookup_path()).await?;
    Ok(RawTables { trips, zones })
}

/// Loads both tables from the cache directory without touching the network.
pub async fn load_from_cache(
    ctx: &SessionContext,
    settings: &DashboardSettings,
) -> DashboardResult<RawTables> {
    info!(cache_dir = %settings.cache_dir.display(), "Loading raw data from cache");
    let trips = load_cached_trips(ctx, &settings.trip_data_path()).await?;
    let zones = load_zone_lookup(ctx, &settings.zone_lookup_path()).await?;
    Ok(RawTables { trips, zones })
}

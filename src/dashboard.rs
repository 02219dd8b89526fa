//! ## Dashboard passes
//!
//! [`Dashboard`] ties the stages together. It is built once from the raw tables (validating
//! their schemas), then [`Dashboard::run_pass`] is called for every filter selection:
//!
//! cleaning -> derivation -> filtering -> zone enrichment -> aggregation
//!
//! Every pass re-executes the whole plan from the raw in-memory tables; nothing computed in one
//! pass is reused by the next.

use crate::acquisition::{self, Fetcher, RawTables};
use crate::aggregation;
use crate::exceptions::DashboardResult;
use crate::filter_state::FilterState;
use crate::make_pipeline;
use crate::pipeline::Pipeline;
use crate::settings::DashboardSettings;
use crate::transformers::cleaning::{DropMissingTripFields, TripValidityFilter};
use crate::transformers::derivation::TripDerivations;
use crate::transformers::filtering::{TripFilter, ZoneEnrichment};
use crate::transformers::schema::{NormalizeTripSchema, NormalizeZoneSchema};
use crate::views::DashboardView;
use datafusion::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// The filters selected no trip; nothing was aggregated.
    NoData,
    /// Views for the selected trips.
    Ready(DashboardView),
}

/// The cleaning and derivation steps, in order.
pub fn trip_pipeline() -> Pipeline {
    make_pipeline!(
        ("normalize_schema", NormalizeTripSchema::new()),
        ("drop_missing", DropMissingTripFields::new()),
        ("valid_trips", TripValidityFilter::new()),
        ("derive_columns", TripDerivations::new()),
    )
}

/// A loaded dataset ready to answer filter selections.
pub struct Dashboard {
    raw_trips: DataFrame,
    pipeline: Pipeline,
    zone_enrichment: ZoneEnrichment,
}

impl Dashboard {
    /// Validates the raw tables against the cleaning pipeline and the zone lookup schema.
    ///
    /// A missing or mistyped column is fatal here, before any pass runs.
    pub async fn new(raw: RawTables) -> DashboardResult<Self> {
        let mut pipeline = trip_pipeline();
        debug!(steps = ?pipeline.step_names(), "Validating raw trip data");
        let derived = pipeline.fit(&raw.trips).await?;

        let mut zone_schema = NormalizeZoneSchema::new();
        zone_schema.fit(&raw.zones).await?;
        let zones = zone_schema.transform(raw.zones)?;
        let mut zone_enrichment = ZoneEnrichment::new(zones);
        zone_enrichment.fit(&derived).await?;

        Ok(Self {
            raw_trips: raw.trips,
            pipeline,
            zone_enrichment,
        })
    }

    /// Downloads the data described by `settings` and builds the dashboard.
    pub async fn acquire(
        settings: &DashboardSettings,
        fetcher: &dyn Fetcher,
    ) -> DashboardResult<Self> {
        let ctx = SessionContext::new();
        let raw = acquisition::acquire(&ctx, settings, fetcher).await?;
        Self::new(raw).await
    }

    /// Builds the dashboard from the files already in the cache directory.
    pub async fn from_cache(settings: &DashboardSettings) -> DashboardResult<Self> {
        let ctx = SessionContext::new();
        let raw = acquisition::load_from_cache(&ctx, settings).await?;
        Self::new(raw).await
    }

    /// Cleaned trips with the derived columns, as a lazy plan.
    pub fn derived_trips(&self) -> DashboardResult<DataFrame> {
        self.pipeline.transform(self.raw_trips.clone())
    }

    /// Cleaned trips restricted to `filters`.
    pub fn filtered_trips(&self, filters: &FilterState) -> DashboardResult<DataFrame> {
        TripFilter::new(filters.clone()).transform(self.derived_trips()?)
    }

    /// The filter selection that keeps every cleaned trip.
    pub async fn default_filters(&self) -> DashboardResult<FilterState> {
        FilterState::observed(&self.derived_trips()?).await
    }

    /// Runs one pass for `filters`.
    pub async fn run_pass(&self, filters: &FilterState) -> DashboardResult<PassOutcome> {
        let start = Instant::now();
        let filtered = self.filtered_trips(filters)?;
        let trip_count = filtered.clone().count().await?;
        if trip_count == 0 {
            warn!(%filters, "No data available for selected filters");
            return Ok(PassOutcome::NoData);
        }
        let enriched = self.zone_enrichment.transform(filtered.clone())?;
        let view = aggregation::compute_views(&filtered, &enriched).await?;
        info!(trips = trip_count, elapsed = ?start.elapsed(), %filters, "Dashboard pass complete");
        Ok(PassOutcome::Ready(view))
    }
}

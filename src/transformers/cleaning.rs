//! ## Transformers for removing unusable trips
//!
//! - **DropMissingTripFields**: Filters out rows with a missing value in any required column.
//! - **TripValidityFilter**: Keeps only physically plausible trips (positive distance, fare inside
//!   the open interval `(0, max_fare)`, pickup strictly before dropoff).
//!
//! Both run on the normalized trip schema produced by
//! [`NormalizeTripSchema`](crate::transformers::schema::NormalizeTripSchema).

use crate::exceptions::{DashboardError, DashboardResult};
use crate::impl_transformer;
use crate::transformers::schema::{
    DROPOFF_DATETIME, DROPOFF_LOCATION_ID, FARE_AMOUNT, PICKUP_DATETIME, PICKUP_LOCATION_ID,
    TRIP_DISTANCE,
};
use datafusion::logical_expr::{col, lit, Expr};
use datafusion::prelude::*;

/// Fares at or above this amount are treated as data-entry errors.
pub const DEFAULT_MAX_FARE: f64 = 500.0;

/// Validates that every column in `target_cols` exists in the DataFrame.
fn validate_columns(df: &DataFrame, target_cols: &[String]) -> DashboardResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        if schema.field_with_name(None, col_name).is_err() {
            return Err(DashboardError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

/// Removes rows that contain a missing value in any of the given columns.
pub struct DropMissingTripFields {
    pub columns: Vec<String>,
}

impl DropMissingTripFields {
    /// Checks the five fields every trip must carry: both timestamps, both location ids and the
    /// fare.
    pub fn new() -> Self {
        Self::with_columns(
            [
                PICKUP_DATETIME,
                DROPOFF_DATETIME,
                PICKUP_LOCATION_ID,
                DROPOFF_LOCATION_ID,
                FARE_AMOUNT,
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        )
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        if self.columns.is_empty() {
            return Err(DashboardError::InvalidParameter(
                "At least one required column must be given".to_string(),
            ));
        }
        validate_columns(df, &self.columns)
    }

    /// Returns a new DataFrame that excludes rows with any missing value in the required columns.
    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        validate_columns(&df, &self.columns)?;
        let combined = self
            .columns
            .iter()
            .map(|col_name| col(col_name).is_not_null())
            .reduce(|acc, expr| acc.and(expr))
            .ok_or_else(|| {
                DashboardError::InvalidParameter(
                    "At least one required column must be given".to_string(),
                )
            })?;
        df.filter(combined).map_err(DashboardError::from)
    }
}

impl Default for DropMissingTripFields {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(DropMissingTripFields);

/// Keeps trips with `trip_distance > 0`, `0 < fare_amount < max_fare` and
/// `pickup_datetime < dropoff_datetime`.
///
/// Rows where any of these columns is null fail the predicate and are dropped as well.
pub struct TripValidityFilter {
    pub max_fare: f64,
}

impl TripValidityFilter {
    pub fn new() -> Self {
        Self {
            max_fare: DEFAULT_MAX_FARE,
        }
    }

    pub fn with_max_fare(max_fare: f64) -> Self {
        Self { max_fare }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        if !self.max_fare.is_finite() || self.max_fare <= 0.0 {
            return Err(DashboardError::InvalidParameter(format!(
                "Maximum fare {} must be a positive number",
                self.max_fare
            )));
        }
        validate_columns(df, &Self::required_columns())
    }

    fn required_columns() -> Vec<String> {
        [TRIP_DISTANCE, FARE_AMOUNT, PICKUP_DATETIME, DROPOFF_DATETIME]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// The predicate a trip must satisfy to be kept.
    pub fn predicate(&self) -> Expr {
        col(TRIP_DISTANCE)
            .gt(lit(0.0))
            .and(col(FARE_AMOUNT).gt(lit(0.0)))
            .and(col(FARE_AMOUNT).lt(lit(self.max_fare)))
            .and(col(PICKUP_DATETIME).lt(col(DROPOFF_DATETIME)))
    }

    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        validate_columns(&df, &Self::required_columns())?;
        df.filter(self.predicate()).map_err(DashboardError::from)
    }
}

impl Default for TripValidityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(TripValidityFilter);

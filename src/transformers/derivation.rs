//! ## Transformer for the derived trip columns
//!
//! **TripDerivations** appends four columns to the cleaned trip table:
//!
//! | column                  | type    | definition                                          |
//! |-------------------------|---------|-----------------------------------------------------|
//! | `trip_duration_minutes` | Float64 | (dropoff - pickup) in seconds / 60                  |
//! | `trip_speed_mph`        | Float64 | distance / ((dropoff - pickup) in seconds / 3600)   |
//! | `pickup_hour`           | Int32   | hour of the pickup timestamp, 0-23                  |
//! | `pickup_weekday`        | Int32   | weekday of the pickup, Monday = 0 ... Sunday = 6    |
//!
//! The speed is only finite when pickup < dropoff, so this step must run after
//! [`TripValidityFilter`](crate::transformers::cleaning::TripValidityFilter).

use crate::exceptions::{DashboardError, DashboardResult};
use crate::impl_transformer;
use crate::transformers::schema::{
    timestamp_type, DROPOFF_DATETIME, PICKUP_DATETIME, PICKUP_HOUR, PICKUP_WEEKDAY,
    TRIP_DISTANCE, TRIP_DURATION_MINUTES, TRIP_SPEED_MPH,
};
use datafusion::arrow::datatypes::DataType;
use datafusion::prelude::*;
use datafusion_expr::{cast, col, lit, Expr};
use datafusion_functions::datetime::date_part;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Validates that a column exists and is a microsecond timestamp.
fn validate_timestamp_column(df: &DataFrame, col_name: &str) -> DashboardResult<()> {
    let field = df
        .schema()
        .field_with_name(None, col_name)
        .map_err(|_| DashboardError::MissingColumn(format!("Column '{}' not found", col_name)))?;
    if field.data_type() == &timestamp_type() {
        Ok(())
    } else {
        Err(DashboardError::UnsupportedFormat(format!(
            "Column '{}' must be {:?}, but found {:?}",
            col_name,
            timestamp_type(),
            field.data_type()
        )))
    }
}

/// Trip duration in (fractional) seconds.
///
/// Casting a microsecond timestamp to Int64 yields microseconds since the epoch, which keeps
/// sub-second precision that `to_unixtime` would truncate.
fn duration_seconds_expr() -> Expr {
    let dropoff = cast(col(DROPOFF_DATETIME), DataType::Int64);
    let pickup = cast(col(PICKUP_DATETIME), DataType::Int64);
    cast(dropoff - pickup, DataType::Float64) / lit(MICROS_PER_SECOND)
}

/// Weekday with Monday = 0. DataFusion's `dow` counts from Sunday = 0.
fn weekday_expr(ts: Expr) -> Expr {
    let dow = cast(date_part().call(vec![lit("dow"), ts]), DataType::Int32);
    (dow + lit(6_i32)) % lit(7_i32)
}

/// Appends duration, speed, pickup hour and pickup weekday to the trip table.
pub struct TripDerivations;

impl TripDerivations {
    pub fn new() -> Self {
        Self
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        validate_timestamp_column(df, PICKUP_DATETIME)?;
        validate_timestamp_column(df, DROPOFF_DATETIME)?;
        df.schema()
            .field_with_name(None, TRIP_DISTANCE)
            .map_err(|_| {
                DashboardError::MissingColumn(format!("Column '{}' not found", TRIP_DISTANCE))
            })?;
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        validate_timestamp_column(&df, PICKUP_DATETIME)?;
        validate_timestamp_column(&df, DROPOFF_DATETIME)?;

        // Retain all original columns.
        let mut exprs: Vec<Expr> = df.schema().fields().iter().map(|f| col(f.name())).collect();

        let pickup = col(PICKUP_DATETIME);
        exprs.push((duration_seconds_expr() / lit(60.0)).alias(TRIP_DURATION_MINUTES));
        exprs.push(
            (col(TRIP_DISTANCE) / (duration_seconds_expr() / lit(3600.0))).alias(TRIP_SPEED_MPH),
        );
        exprs.push(
            cast(
                date_part().call(vec![lit("hour"), pickup.clone()]),
                DataType::Int32,
            )
            .alias(PICKUP_HOUR),
        );
        exprs.push(weekday_expr(pickup).alias(PICKUP_WEEKDAY));

        df.select(exprs).map_err(DashboardError::from)
    }
}

impl Default for TripDerivations {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(TripDerivations);

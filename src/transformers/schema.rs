//! ## Schema normalization for the downloaded tables
//!
//! The TLC files use mixed-case column names (`PULocationID`) and their physical types drift
//! between releases (nanosecond vs microsecond timestamps, Int32 vs Int64 ids). This module
//! projects both downloaded tables onto the fixed, lower-case schema the rest of the dashboard
//! works with:
//!
//! - **NormalizeTripSchema:** keeps the eight trip columns the dashboard uses.
//! - **NormalizeZoneSchema:** keeps the location id, borough and zone name of the lookup table.
//!
//! A missing source column is a [`DashboardError::MissingColumn`], a column whose type cannot
//! be converted is a [`DashboardError::UnsupportedFormat`].

use crate::exceptions::{DashboardError, DashboardResult};
use crate::impl_transformer;
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::logical_expr::{cast, ident, Expr};
use datafusion::prelude::*;

pub const PICKUP_DATETIME: &str = "pickup_datetime";
pub const DROPOFF_DATETIME: &str = "dropoff_datetime";
pub const PICKUP_LOCATION_ID: &str = "pickup_location_id";
pub const DROPOFF_LOCATION_ID: &str = "dropoff_location_id";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const FARE_AMOUNT: &str = "fare_amount";
pub const TOTAL_AMOUNT: &str = "total_amount";
pub const PAYMENT_TYPE: &str = "payment_type";

pub const TRIP_DURATION_MINUTES: &str = "trip_duration_minutes";
pub const TRIP_SPEED_MPH: &str = "trip_speed_mph";
pub const PICKUP_HOUR: &str = "pickup_hour";
pub const PICKUP_WEEKDAY: &str = "pickup_weekday";

pub const LOCATION_ID: &str = "location_id";
pub const BOROUGH: &str = "borough";
pub const ZONE: &str = "zone";

/// Timestamp type every trip timestamp is converted to.
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, None)
}

/// What a source column must look like before it can be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Timestamp,
    Numeric,
    Text,
}

impl SourceKind {
    fn accepts(&self, data_type: &DataType) -> bool {
        match self {
            SourceKind::Timestamp => matches!(
                data_type,
                DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64
            ),
            SourceKind::Numeric => data_type.is_numeric(),
            SourceKind::Text => matches!(
                data_type,
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
            ),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            SourceKind::Timestamp => "a timestamp",
            SourceKind::Numeric => "numeric",
            SourceKind::Text => "a string",
        }
    }
}

/// One column of a normalized table: where it comes from and what it becomes.
struct ColumnMapping {
    source: &'static str,
    target: &'static str,
    kind: SourceKind,
    output_type: DataType,
}

impl ColumnMapping {
    fn new(source: &'static str, target: &'static str, kind: SourceKind, output: DataType) -> Self {
        Self {
            source,
            target,
            kind,
            output_type: output,
        }
    }

    /// Checks that the source column exists and has a convertible type.
    fn validate(&self, df: &DataFrame) -> DashboardResult<()> {
        let field = df
            .schema()
            .field_with_name(None, self.source)
            .map_err(|_| {
                DashboardError::MissingColumn(format!("Column '{}' not found", self.source))
            })?;
        if self.kind.accepts(field.data_type()) {
            Ok(())
        } else {
            Err(DashboardError::UnsupportedFormat(format!(
                "Column '{}' must be {}, but found {:?}",
                self.source,
                self.kind.describe(),
                field.data_type()
            )))
        }
    }

    /// `ident` keeps the mixed-case source name as is; `col` would lower-case it.
    fn expr(&self) -> Expr {
        cast(ident(self.source), self.output_type.clone()).alias(self.target)
    }
}

fn project(df: DataFrame, mappings: &[ColumnMapping]) -> DashboardResult<DataFrame> {
    for mapping in mappings {
        mapping.validate(&df)?;
    }
    let exprs: Vec<Expr> = mappings.iter().map(ColumnMapping::expr).collect();
    df.select(exprs).map_err(DashboardError::from)
}

/// Projects the raw TLC trip table onto the dashboard's trip schema.
pub struct NormalizeTripSchema {
    mappings: Vec<ColumnMapping>,
}

impl NormalizeTripSchema {
    pub fn new() -> Self {
        let mappings = vec![
            ColumnMapping::new(
                "tpep_pickup_datetime",
                PICKUP_DATETIME,
                SourceKind::Timestamp,
                timestamp_type(),
            ),
            ColumnMapping::new(
                "tpep_dropoff_datetime",
                DROPOFF_DATETIME,
                SourceKind::Timestamp,
                timestamp_type(),
            ),
            ColumnMapping::new(
                "PULocationID",
                PICKUP_LOCATION_ID,
                SourceKind::Numeric,
                DataType::Int64,
            ),
            ColumnMapping::new(
                "DOLocationID",
                DROPOFF_LOCATION_ID,
                SourceKind::Numeric,
                DataType::Int64,
            ),
            ColumnMapping::new(
                "trip_distance",
                TRIP_DISTANCE,
                SourceKind::Numeric,
                DataType::Float64,
            ),
            ColumnMapping::new(
                "fare_amount",
                FARE_AMOUNT,
                SourceKind::Numeric,
                DataType::Float64,
            ),
            ColumnMapping::new(
                "total_amount",
                TOTAL_AMOUNT,
                SourceKind::Numeric,
                DataType::Float64,
            ),
            ColumnMapping::new(
                "payment_type",
                PAYMENT_TYPE,
                SourceKind::Numeric,
                DataType::Int64,
            ),
        ];
        Self { mappings }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        for mapping in &self.mappings {
            mapping.validate(df)?;
        }
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        project(df, &self.mappings)
    }
}

impl Default for NormalizeTripSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(NormalizeTripSchema);

/// Projects the TLC zone lookup CSV onto `location_id`, `borough`, `zone`.
pub struct NormalizeZoneSchema {
    mappings: Vec<ColumnMapping>,
}

impl NormalizeZoneSchema {
    pub fn new() -> Self {
        let mappings = vec![
            ColumnMapping::new(
                "LocationID",
                LOCATION_ID,
                SourceKind::Numeric,
                DataType::Int64,
            ),
            ColumnMapping::new("Borough", BOROUGH, SourceKind::Text, DataType::Utf8),
            ColumnMapping::new("Zone", ZONE, SourceKind::Text, DataType::Utf8),
        ];
        Self { mappings }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        for mapping in &self.mappings {
            mapping.validate(df)?;
        }
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        project(df, &self.mappings)
    }
}

impl Default for NormalizeZoneSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(NormalizeZoneSchema);

//! ## Aggregations behind the dashboard charts
//!
//! Each function takes the filtered trip table (normalized schema plus the derived columns) and
//! returns a plain view from [`crate::views`]:
//!
//! - [`summary_metrics`]: trip count, mean fare, total revenue, mean distance, mean duration.
//! - [`top_zones`]: busiest pickup zones, most trips first, ties by zone name.
//! - [`average_fare_by_hour`]: mean fare per pickup hour; hours without trips are absent.
//! - [`distance_histogram`]: equal-width bins over the observed range of short trips.
//! - [`payment_breakdown`]: trips per payment type code.
//! - [`weekday_hour_heatmap`]: trips per (weekday, hour) pair.
//!
//! The grouping, sorting and counting run in DataFusion; only the small results are collected.

use crate::exceptions::{DashboardError, DashboardResult};
use crate::transformers::schema::{
    FARE_AMOUNT, PAYMENT_TYPE, PICKUP_HOUR, PICKUP_WEEKDAY, TOTAL_AMOUNT, TRIP_DISTANCE,
    TRIP_DURATION_MINUTES, ZONE,
};
use crate::views::{
    DashboardView, HeatmapCell, HistogramBin, HourlyFare, PaymentCount, SummaryMetrics,
    WeekdayHourHeatmap, ZoneCount,
};
use arrow::array::{Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, count, max, min, sum};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_expr::expr::Case as DFCase;
use datafusion_expr::{cast, col, lit, Expr};
use tracing::debug;

/// Number of zones shown in the top zones chart.
pub const TOP_ZONE_LIMIT: usize = 10;
/// Trips at or beyond this distance (miles) are left out of the histogram.
pub const HISTOGRAM_MAX_DISTANCE: f64 = 20.0;
/// Number of bins of the distance histogram.
pub const HISTOGRAM_BINS: usize = 40;

const TRIP_COUNT: &str = "trip_count";
const BIN_INDEX: &str = "bin_index";

/// Downcasts the named column of a batch to the expected array type.
fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> DashboardResult<&'a T> {
    let index = batch.schema().index_of(name)?;
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| {
            DashboardError::UnsupportedFormat(format!(
                "Unexpected array type {:?} for column {}",
                batch.column(index).data_type(),
                name
            ))
        })
}

/// Reads a single aggregate value as f64; null (no rows) becomes None.
fn scalar_f64(batch: &RecordBatch, name: &str) -> DashboardResult<Option<f64>> {
    let index = batch.schema().index_of(name)?;
    match ScalarValue::try_from_array(batch.column(index), 0)? {
        ScalarValue::Float64(value) => Ok(value),
        ScalarValue::Int64(value) => Ok(value.map(|v| v as f64)),
        other => Err(DashboardError::UnsupportedFormat(format!(
            "Expected a numeric aggregate for {}, found {:?}",
            name,
            other.data_type()
        ))),
    }
}

/// COUNT results as u64.
fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Trip count, mean fare, total revenue, mean distance and mean duration.
///
/// Means are 0.0 for an empty table; callers skip aggregation for empty passes.
pub async fn summary_metrics(df: &DataFrame) -> DashboardResult<SummaryMetrics> {
    let batches = df
        .clone()
        .aggregate(
            vec![],
            vec![
                count(col(FARE_AMOUNT)).alias(TRIP_COUNT),
                avg(col(FARE_AMOUNT)).alias("average_fare"),
                sum(col(TOTAL_AMOUNT)).alias("total_revenue"),
                avg(col(TRIP_DISTANCE)).alias("average_distance"),
                avg(col(TRIP_DURATION_MINUTES)).alias("average_duration"),
            ],
        )?
        .collect()
        .await?;
    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| DashboardError::UnsupportedFormat("Empty aggregate result".to_string()))?;
    let trip_count = typed_column::<Int64Array>(batch, TRIP_COUNT)?.value(0);
    Ok(SummaryMetrics {
        trip_count: to_count(trip_count),
        average_fare: scalar_f64(batch, "average_fare")?.unwrap_or(0.0),
        total_revenue: scalar_f64(batch, "total_revenue")?.unwrap_or(0.0),
        average_distance_miles: scalar_f64(batch, "average_distance")?.unwrap_or(0.0),
        average_duration_minutes: scalar_f64(batch, "average_duration")?.unwrap_or(0.0),
    })
}

/// The `limit` pickup zones with the most trips.
///
/// Expects the zone-enriched table. Trips without a zone are not counted as a zone.
pub async fn top_zones(df: &DataFrame, limit: usize) -> DashboardResult<Vec<ZoneCount>> {
    let batches = df
        .clone()
        .filter(col(ZONE).is_not_null())?
        .aggregate(vec![col(ZONE)], vec![count(col(ZONE)).alias(TRIP_COUNT)])?
        .sort(vec![
            col(TRIP_COUNT).sort(false, false),
            col(ZONE).sort(true, false),
        ])?
        .limit(0, Some(limit))?
        .collect()
        .await?;
    let mut zones = Vec::new();
    for batch in &batches {
        let names = typed_column::<StringArray>(batch, ZONE)?;
        let counts = typed_column::<Int64Array>(batch, TRIP_COUNT)?;
        for i in 0..batch.num_rows() {
            zones.push(ZoneCount {
                zone: names.value(i).to_string(),
                trip_count: to_count(counts.value(i)),
            });
        }
    }
    Ok(zones)
}

/// Mean fare per pickup hour, ordered by hour.
pub async fn average_fare_by_hour(df: &DataFrame) -> DashboardResult<Vec<HourlyFare>> {
    let batches = df
        .clone()
        .aggregate(
            vec![col(PICKUP_HOUR)],
            vec![avg(col(FARE_AMOUNT)).alias("average_fare")],
        )?
        .sort(vec![col(PICKUP_HOUR).sort(true, false)])?
        .collect()
        .await?;
    let mut fares = Vec::new();
    for batch in &batches {
        let hours = typed_column::<Int32Array>(batch, PICKUP_HOUR)?;
        let averages = typed_column::<Float64Array>(batch, "average_fare")?;
        for i in 0..batch.num_rows() {
            if hours.is_null(i) || averages.is_null(i) {
                continue;
            }
            fares.push(HourlyFare {
                hour: u8::try_from(hours.value(i)).map_err(|_| {
                    DashboardError::UnsupportedFormat(format!("Invalid hour {}", hours.value(i)))
                })?,
                average_fare: averages.value(i),
            });
        }
    }
    Ok(fares)
}

/// Bin index of a distance: `floor((d - lower) / width)`, with the maximum folded into the last
/// bin.
///
/// The quotient is never negative, so the truncating Float64 -> Int64 cast is a floor.
fn bin_index_expr(lower: f64, width: f64, bins: usize) -> Expr {
    let last = i64::try_from(bins.saturating_sub(1)).unwrap_or(i64::MAX);
    let raw = cast((col(TRIP_DISTANCE) - lit(lower)) / lit(width), DataType::Int64);
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(raw.clone().gt_eq(lit(last))), Box::new(lit(last)))],
        else_expr: Some(Box::new(raw)),
    })
}

/// Histogram of `trip_distance` for trips shorter than `max_distance`.
///
/// The `bins` equal-width bins span the observed minimum and maximum of those trips. An empty
/// selection yields no bins; a selection where every trip has the same distance yields a
/// single zero-width bin.
pub async fn distance_histogram(
    df: &DataFrame,
    max_distance: f64,
    bins: usize,
) -> DashboardResult<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(DashboardError::InvalidParameter(
            "Histogram needs at least one bin".to_string(),
        ));
    }
    let short_trips = df
        .clone()
        .filter(col(TRIP_DISTANCE).lt(lit(max_distance)))?;
    let range = short_trips
        .clone()
        .aggregate(
            vec![],
            vec![
                min(col(TRIP_DISTANCE)).alias("lower"),
                max(col(TRIP_DISTANCE)).alias("upper"),
                count(col(TRIP_DISTANCE)).alias(TRIP_COUNT),
            ],
        )?
        .collect()
        .await?;
    let Some(batch) = range.iter().find(|b| b.num_rows() > 0) else {
        return Ok(Vec::new());
    };
    let (Some(lower), Some(upper)) = (scalar_f64(batch, "lower")?, scalar_f64(batch, "upper")?)
    else {
        return Ok(Vec::new());
    };
    let total = to_count(typed_column::<Int64Array>(batch, TRIP_COUNT)?.value(0));

    let width = (upper - lower) / bins as f64;
    if width <= 0.0 {
        return Ok(vec![HistogramBin {
            lower,
            upper,
            count: total,
        }]);
    }

    let counted = short_trips
        .aggregate(
            vec![bin_index_expr(lower, width, bins).alias(BIN_INDEX)],
            vec![count(col(TRIP_DISTANCE)).alias(TRIP_COUNT)],
        )?
        .collect()
        .await?;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: lower + i as f64 * width,
            upper: if i + 1 == bins {
                upper
            } else {
                lower + (i + 1) as f64 * width
            },
            count: 0,
        })
        .collect();
    for batch in &counted {
        let indices = typed_column::<Int64Array>(batch, BIN_INDEX)?;
        let counts = typed_column::<Int64Array>(batch, TRIP_COUNT)?;
        for i in 0..batch.num_rows() {
            if indices.is_null(i) {
                continue;
            }
            let slot = usize::try_from(indices.value(i))
                .ok()
                .and_then(|idx| histogram.get_mut(idx))
                .ok_or_else(|| {
                    DashboardError::UnsupportedFormat(format!(
                        "Bin index {} outside 0-{}",
                        indices.value(i),
                        bins - 1
                    ))
                })?;
            slot.count += to_count(counts.value(i));
        }
    }
    debug!(lower, upper, width, trips = total, "Computed distance histogram");
    Ok(histogram)
}

/// Trips per payment type, most frequent first, ties by code.
pub async fn payment_breakdown(df: &DataFrame) -> DashboardResult<Vec<PaymentCount>> {
    let batches = df
        .clone()
        .aggregate(
            vec![col(PAYMENT_TYPE)],
            vec![count(col(FARE_AMOUNT)).alias(TRIP_COUNT)],
        )?
        .sort(vec![
            col(TRIP_COUNT).sort(false, false),
            col(PAYMENT_TYPE).sort(true, false),
        ])?
        .collect()
        .await?;
    let mut payments = Vec::new();
    for batch in &batches {
        let codes = typed_column::<Int64Array>(batch, PAYMENT_TYPE)?;
        let counts = typed_column::<Int64Array>(batch, TRIP_COUNT)?;
        for i in 0..batch.num_rows() {
            if codes.is_null(i) {
                continue;
            }
            payments.push(PaymentCount {
                payment_type: codes.value(i),
                trip_count: to_count(counts.value(i)),
            });
        }
    }
    Ok(payments)
}

/// Trips per (weekday, hour) pair, ordered by weekday then hour. Pairs without trips are absent.
pub async fn weekday_hour_heatmap(df: &DataFrame) -> DashboardResult<WeekdayHourHeatmap> {
    let batches = df
        .clone()
        .aggregate(
            vec![col(PICKUP_WEEKDAY), col(PICKUP_HOUR)],
            vec![count(col(FARE_AMOUNT)).alias(TRIP_COUNT)],
        )?
        .sort(vec![
            col(PICKUP_WEEKDAY).sort(true, false),
            col(PICKUP_HOUR).sort(true, false),
        ])?
        .collect()
        .await?;
    let mut cells = Vec::new();
    for batch in &batches {
        let weekdays = typed_column::<Int32Array>(batch, PICKUP_WEEKDAY)?;
        let hours = typed_column::<Int32Array>(batch, PICKUP_HOUR)?;
        let counts = typed_column::<Int64Array>(batch, TRIP_COUNT)?;
        for i in 0..batch.num_rows() {
            let (Ok(weekday), Ok(hour)) = (
                u8::try_from(weekdays.value(i)),
                u8::try_from(hours.value(i)),
            ) else {
                return Err(DashboardError::UnsupportedFormat(format!(
                    "Invalid weekday/hour pair ({}, {})",
                    weekdays.value(i),
                    hours.value(i)
                )));
            };
            cells.push(HeatmapCell {
                weekday,
                hour,
                trip_count: to_count(counts.value(i)),
            });
        }
    }
    Ok(WeekdayHourHeatmap { cells })
}

/// Computes every view of a pass.
///
/// `filtered` is the filtered trip table, `enriched` the same trips with zone names joined on.
/// Only the top zones read the enriched table.
pub async fn compute_views(
    filtered: &DataFrame,
    enriched: &DataFrame,
) -> DashboardResult<DashboardView> {
    let summary = summary_metrics(filtered).await?;
    let top_zones = top_zones(enriched, TOP_ZONE_LIMIT).await?;
    let fare_by_hour = average_fare_by_hour(filtered).await?;
    let distance_histogram =
        distance_histogram(filtered, HISTOGRAM_MAX_DISTANCE, HISTOGRAM_BINS).await?;
    let payment_breakdown = payment_breakdown(filtered).await?;
    let heatmap = weekday_hour_heatmap(filtered).await?;
    debug!(trips = summary.trip_count, "Computed dashboard views");
    Ok(DashboardView {
        summary,
        top_zones,
        fare_by_hour,
        distance_histogram,
        payment_breakdown,
        heatmap,
    })
}

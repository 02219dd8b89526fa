//! ## Filter state
//!
//! [`FilterState`] is the user's current selection: an inclusive pickup date range, an inclusive
//! pickup hour range and a set of payment-type codes. It is a plain value, rebuilt from user
//! input on every pass and handed explicitly to
//! [`TripFilter`](crate::transformers::filtering::TripFilter).

use crate::exceptions::{DashboardError, DashboardResult};
use crate::transformers::schema::{PAYMENT_TYPE, PICKUP_DATETIME};
use arrow::array::{Array, Int64Array};
use chrono::{DateTime, NaiveDate, Utc};
use datafusion::functions_aggregate::expr_fn::{max, min};
use datafusion::logical_expr::col;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use std::collections::BTreeSet;
use std::fmt;

/// Highest valid hour of day.
pub const MAX_HOUR: u8 = 23;

/// The user's filter selection for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hour_low: u8,
    pub hour_high: u8,
    pub payment_types: BTreeSet<i64>,
}

impl FilterState {
    /// Creates a validated filter state.
    pub fn new(
        (start_date, end_date): (NaiveDate, NaiveDate),
        (hour_low, hour_high): (u8, u8),
        payment_types: impl IntoIterator<Item = i64>,
    ) -> DashboardResult<Self> {
        let state = Self {
            start_date,
            end_date,
            hour_low,
            hour_high,
            payment_types: payment_types.into_iter().collect(),
        };
        state.validate()?;
        Ok(state)
    }

    /// Default selection for the given trips: every observed pickup date, all 24 hours and every
    /// observed payment code.
    ///
    /// Expects the normalized trip schema. An empty table yields a state covering the Unix
    /// epoch day with no payment codes, which filters everything out.
    pub async fn observed(df: &DataFrame) -> DashboardResult<Self> {
        let (start_date, end_date) = observed_date_range(df).await?.unwrap_or_else(|| {
            let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
            (epoch, epoch)
        });
        let payment_types = observed_payment_types(df).await?;
        Self::new((start_date, end_date), (0, MAX_HOUR), payment_types)
    }

    /// Checks the hour bounds (0-23, low <= high) and the date order.
    pub fn validate(&self) -> DashboardResult<()> {
        if self.hour_high > MAX_HOUR {
            return Err(DashboardError::InvalidParameter(format!(
                "Hour {} is outside 0-{}",
                self.hour_high, MAX_HOUR
            )));
        }
        if self.hour_low > self.hour_high {
            return Err(DashboardError::InvalidParameter(format!(
                "Hour range {}-{} is reversed",
                self.hour_low, self.hour_high
            )));
        }
        if self.start_date > self.end_date {
            return Err(DashboardError::InvalidParameter(format!(
                "Start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    pub fn with_hours(&self, hour_low: u8, hour_high: u8) -> DashboardResult<Self> {
        let state = Self {
            hour_low,
            hour_high,
            ..self.clone()
        };
        state.validate()?;
        Ok(state)
    }

    pub fn with_dates(&self, start_date: NaiveDate, end_date: NaiveDate) -> DashboardResult<Self> {
        let state = Self {
            start_date,
            end_date,
            ..self.clone()
        };
        state.validate()?;
        Ok(state)
    }

    pub fn with_payment_types(&self, payment_types: impl IntoIterator<Item = i64>) -> Self {
        Self {
            payment_types: payment_types.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Start of the first selected day and start of the day after the last one, in microseconds
    /// since the Unix epoch (half-open interval).
    pub fn pickup_bounds_micros(&self) -> DashboardResult<(i64, i64)> {
        let day_after = self.end_date.succ_opt().ok_or_else(|| {
            DashboardError::InvalidParameter(format!("End date {} is out of range", self.end_date))
        })?;
        Ok((midnight_micros(self.start_date)?, midnight_micros(day_after)?))
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payments: Vec<String> = self.payment_types.iter().map(|p| p.to_string()).collect();
        write!(
            f,
            "dates {} to {}, hours {}-{}, payment types [{}]",
            self.start_date,
            self.end_date,
            self.hour_low,
            self.hour_high,
            payments.join(", ")
        )
    }
}

fn midnight_micros(date: NaiveDate) -> DashboardResult<i64> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_micros())
        .ok_or_else(|| DashboardError::InvalidParameter(format!("Invalid date {}", date)))
}

fn micros_to_date(micros: i64) -> DashboardResult<NaiveDate> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| {
            DashboardError::UnsupportedFormat(format!("Timestamp {} is out of range", micros))
        })
}

/// First and last pickup date, or None when there are no trips.
async fn observed_date_range(df: &DataFrame) -> DashboardResult<Option<(NaiveDate, NaiveDate)>> {
    let batches = df
        .clone()
        .aggregate(
            vec![],
            vec![
                min(col(PICKUP_DATETIME)).alias("first_pickup"),
                max(col(PICKUP_DATETIME)).alias("last_pickup"),
            ],
        )?
        .collect()
        .await?;
    let Some(batch) = batches.first().filter(|b| b.num_rows() > 0) else {
        return Ok(None);
    };
    let first = ScalarValue::try_from_array(batch.column(0), 0)?;
    let last = ScalarValue::try_from_array(batch.column(1), 0)?;
    match (first, last) {
        (
            ScalarValue::TimestampMicrosecond(Some(first), _),
            ScalarValue::TimestampMicrosecond(Some(last), _),
        ) => Ok(Some((micros_to_date(first)?, micros_to_date(last)?))),
        (ScalarValue::TimestampMicrosecond(None, _), _)
        | (_, ScalarValue::TimestampMicrosecond(None, _)) => Ok(None),
        (other, _) => Err(DashboardError::UnsupportedFormat(format!(
            "Expected a microsecond timestamp for '{}', found {:?}",
            PICKUP_DATETIME,
            other.data_type()
        ))),
    }
}

/// Distinct non-null payment codes.
async fn observed_payment_types(df: &DataFrame) -> DashboardResult<BTreeSet<i64>> {
    let batches = df
        .clone()
        .select(vec![col(PAYMENT_TYPE)])?
        .distinct()?
        .collect()
        .await?;
    let mut codes = BTreeSet::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                DashboardError::UnsupportedFormat(format!(
                    "Expected Int64 array for column {}",
                    PAYMENT_TYPE
                ))
            })?;
        codes.extend((0..array.len()).filter(|&i| array.is_valid(i)).map(|i| array.value(i)));
    }
    Ok(codes)
}

//! ## Transformers applying the user's selection
//!
//! - **TripFilter:** keeps the trips matching a [`FilterState`]: pickup date inside the date
//!   range, pickup hour inside the hour range, payment type in the selected set.
//! - **ZoneEnrichment:** left-joins the zone lookup onto the pickup location id. Trips without a
//!   matching zone are kept with a null `zone` and `borough`.

use crate::exceptions::{DashboardError, DashboardResult};
use crate::filter_state::FilterState;
use crate::impl_transformer;
use crate::transformers::schema::{
    BOROUGH, LOCATION_ID, PAYMENT_TYPE, PICKUP_DATETIME, PICKUP_HOUR, PICKUP_LOCATION_ID, ZONE,
};
use datafusion::logical_expr::{col, lit, Expr, JoinType};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;

fn require_column(df: &DataFrame, col_name: &str) -> DashboardResult<()> {
    df.schema()
        .field_with_name(None, col_name)
        .map(|_| ())
        .map_err(|_| DashboardError::MissingColumn(format!("Column '{}' not found", col_name)))
}

fn timestamp_lit(micros: i64) -> Expr {
    lit(ScalarValue::TimestampMicrosecond(Some(micros), None))
}

/// Keeps the trips selected by a [`FilterState`].
pub struct TripFilter {
    pub state: FilterState,
}

impl TripFilter {
    pub fn new(state: FilterState) -> Self {
        Self { state }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        self.state.validate()?;
        for col_name in [PICKUP_DATETIME, PICKUP_HOUR, PAYMENT_TYPE] {
            require_column(df, col_name)?;
        }
        Ok(())
    }

    /// The filter predicate for the current state.
    pub fn predicate(&self) -> DashboardResult<Expr> {
        self.state.validate()?;
        let (start, end) = self.state.pickup_bounds_micros()?;
        let in_dates = col(PICKUP_DATETIME)
            .gt_eq(timestamp_lit(start))
            .and(col(PICKUP_DATETIME).lt(timestamp_lit(end)));
        let in_hours = col(PICKUP_HOUR).between(
            lit(i32::from(self.state.hour_low)),
            lit(i32::from(self.state.hour_high)),
        );
        // Nothing selected matches nothing.
        let in_payments = if self.state.payment_types.is_empty() {
            lit(false)
        } else {
            col(PAYMENT_TYPE).in_list(
                self.state.payment_types.iter().map(|code| lit(*code)).collect(),
                false,
            )
        };
        Ok(in_dates.and(in_hours).and(in_payments))
    }

    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        for col_name in [PICKUP_DATETIME, PICKUP_HOUR, PAYMENT_TYPE] {
            require_column(&df, col_name)?;
        }
        df.filter(self.predicate()?).map_err(DashboardError::from)
    }
}

impl_transformer!(TripFilter);

/// Adds `zone` and `borough` of the pickup location to each trip.
pub struct ZoneEnrichment {
    /// Zone lookup in the normalized schema (`location_id`, `borough`, `zone`).
    pub zones: DataFrame,
}

impl ZoneEnrichment {
    pub fn new(zones: DataFrame) -> Self {
        Self { zones }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()> {
        require_column(df, PICKUP_LOCATION_ID)?;
        for col_name in [LOCATION_ID, BOROUGH, ZONE] {
            require_column(&self.zones, col_name)?;
        }
        Ok(())
    }

    /// Returns the trips with `zone` and `borough` appended; the lookup's own id column is dropped.
    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        require_column(&df, PICKUP_LOCATION_ID)?;
        let mut exprs: Vec<Expr> = df.schema().fields().iter().map(|f| col(f.name())).collect();
        exprs.push(col(ZONE));
        exprs.push(col(BOROUGH));
        df.join(
            self.zones.clone(),
            JoinType::Left,
            &[PICKUP_LOCATION_ID],
            &[LOCATION_ID],
            None,
        )?
        .select(exprs)
        .map_err(DashboardError::from)
    }
}

impl_transformer!(ZoneEnrichment);

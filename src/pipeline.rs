//! ## Trip Processing Pipeline
//!
//! This module provides the abstractions used to chain the cleaning and derivation steps
//! applied to the raw trip table.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait defines a step of the pipeline. `fit` validates the step against
//!   the schema it receives; `transform` extends the DataFrame's logical plan without executing it.
//! - The [`Pipeline`] struct chains transformers. Fitting happens once when the dashboard is
//!   built, so a schema mismatch in a downloaded file is reported before any pass runs.
//!   Transforming is repeated on every pass and only builds a plan.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] simplify implementing
//!   transformers and assembling pipelines.

use crate::exceptions::{DashboardError, DashboardResult};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Trait for the steps of the trip processing pipeline.
#[async_trait]
pub trait Transformer {
    /// Validate the step against the given DataFrame (column presence, data types).
    async fn fit(&mut self, df: &DataFrame) -> DashboardResult<()>;

    /// Return a new DataFrame with the step applied.
    fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame>;
}

/// Macro to implement the [`Transformer`] trait for a step type.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> DashboardResult<()>`
/// - `fn transform(&self, DataFrame) -> DashboardResult<DataFrame>`
///
/// # Example
///
/// ```rust,no_run
/// use taxi_dashboard::exceptions::DashboardResult;
/// use datafusion::prelude::DataFrame;
/// use taxi_dashboard::impl_transformer;
///
/// pub struct KeepEverything;
///
/// impl KeepEverything {
///     pub async fn fit(&mut self, _df: &DataFrame) -> DashboardResult<()> {
///         Ok(())
///     }
///
///     pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
///         Ok(df)
///     }
/// }
///
/// impl_transformer!(KeepEverything);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::DashboardResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::DashboardResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
        }
    };
}

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output (a new logical plan) is the input of the next one.
/// Nothing executes until a terminal action (`collect`, `count`) is called on the result.
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>,
}

impl Pipeline {
    /// Creates a new pipeline from (name, transformer) pairs.
    pub fn new(steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>) -> Self {
        Self { steps }
    }

    /// Names of the steps, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Fits each transformer on the output of the previous one and returns the final plan.
    pub async fn fit(&mut self, df: &DataFrame) -> DashboardResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(DashboardError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let start = Instant::now();
            step.fit(&current_df).await.map_err(|e| with_step(name, e))?;
            current_df = step
                .transform(current_df)
                .map_err(|e| with_step(name, e))?;
            debug!(step = %name, elapsed = ?start.elapsed(), "Fitted pipeline step");
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer (without fitting).
    pub fn transform(&self, df: DataFrame) -> DashboardResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(DashboardError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            debug!(step = %name, "Applying pipeline step");
            current_df = step
                .transform(current_df)
                .map_err(|e| with_step(name, e))?;
        }
        Ok(current_df)
    }
}

/// Prefixes validation errors with the name of the failing step; other errors pass through.
fn with_step(name: &str, err: DashboardError) -> DashboardError {
    match err {
        DashboardError::MissingColumn(msg) => {
            DashboardError::MissingColumn(format!("{} (in step '{}')", msg, name))
        }
        DashboardError::UnsupportedFormat(msg) => {
            DashboardError::UnsupportedFormat(format!("{} (in step '{}')", msg, name))
        }
        DashboardError::InvalidParameter(msg) => {
            DashboardError::InvalidParameter(format!("{} (in step '{}')", msg, name))
        }
        other => other,
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use taxi_dashboard::make_pipeline;
/// use taxi_dashboard::transformers::cleaning::DropMissingTripFields;
///
/// let pipeline = make_pipeline!(("drop_missing", DropMissingTripFields::new()));
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, Box<dyn $crate::pipeline::Transformer + Send + Sync>)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps)
        }
    };
}

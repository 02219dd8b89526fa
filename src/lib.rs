//! # Taxi Dashboard
//!
//! A terminal dashboard over one month of NYC yellow taxi trips, built on Apache DataFusion.
//!
//! The data flows through these stages:
//!
//! 1. [`acquisition`] downloads the trip records (parquet) and the zone lookup (CSV), caching
//!    both on disk.
//! 2. [`transformers`] normalize the raw schema, drop incomplete and implausible trips and derive
//!    duration, speed, pickup hour and weekday.
//! 3. [`filter_state`] and [`transformers::filtering`] restrict the trips to the user's
//!    selection and attach zone names.
//! 4. [`aggregation`] turns the selection into the [`views`] rendered by [`presentation`].
//!
//! [`dashboard::Dashboard`] runs stages 2 to 4 as one pass, repeated whenever the selection
//! changes.

pub mod acquisition;
pub mod aggregation;
pub mod commands;
pub mod dashboard;
pub mod exceptions;
pub mod filter_state;
mod logging;
pub mod pipeline;
pub mod presentation;
pub mod settings;
pub mod transformers;
pub mod views;

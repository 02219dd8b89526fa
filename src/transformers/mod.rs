//! # Trip Transformers
//!
//! The submodules contain the pipeline steps applied to the trip table, in the order they run:
//! schema normalization, cleaning, derivation, and the per-pass filtering and zone enrichment.

pub mod cleaning;
pub mod derivation;
pub mod filtering;
pub mod schema;

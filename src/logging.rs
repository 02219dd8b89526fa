//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_TAXI_DASHBOARD` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or
//!   `"false"`, no logging will be initialized.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! ### Usage Example
//!
//! To see the download, cleaning and aggregation steps of every pass:
//!
//! ```sh
//! export DEBUG_TAXI_DASHBOARD=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Name of the environment variable that switches logging on.
pub const DEBUG_ENV_VAR: &str = "DEBUG_TAXI_DASHBOARD";

/// Returns true when the given value of [`DEBUG_ENV_VAR`] leaves logging disabled.
pub(crate) fn is_disabled(value: Option<&str>) -> bool {
    value.map_or(true, |v| v == "0" || v == "false" || v.is_empty())
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if !is_disabled(value.as_deref()) {
        // try_init: a host binary may already have installed a subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

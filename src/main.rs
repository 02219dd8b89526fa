//! CLI entry point for the taxi dashboard.
//!
//! Acquires the data once, renders the dashboard for the selection given on the command line and,
//! with `--interactive`, keeps reading filter commands from stdin and re-rendering.

use chrono::NaiveDate;
use clap::Parser;
use std::error::Error;
use std::io::{self, BufRead, Write};
use taxi_dashboard::acquisition::HttpFetcher;
use taxi_dashboard::commands::{parse_date, CommandEffect, FilterCommand, HELP};
use taxi_dashboard::dashboard::{Dashboard, PassOutcome};
use taxi_dashboard::exceptions::DashboardResult;
use taxi_dashboard::filter_state::FilterState;
use taxi_dashboard::presentation::{render_dashboard, render_no_data};
use taxi_dashboard::settings::{
    DashboardSettings, DEFAULT_CACHE_DIR, DEFAULT_TRIP_DATA_URL, DEFAULT_ZONE_LOOKUP_URL,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "taxi-dashboard")]
#[command(about = "NYC yellow taxi trip dashboard", long_about = None)]
struct Cli {
    /// Trip records parquet file to download
    #[arg(long, env = "TAXI_DASHBOARD_TRIP_URL", default_value = DEFAULT_TRIP_DATA_URL)]
    trip_url: String,

    /// Zone lookup CSV to download
    #[arg(long, env = "TAXI_DASHBOARD_ZONE_URL", default_value = DEFAULT_ZONE_LOOKUP_URL)]
    zone_url: String,

    /// Directory the downloaded files are cached in
    #[arg(long, env = "TAXI_DASHBOARD_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: String,

    /// First pickup date to include (YYYY-MM-DD); defaults to the earliest in the data
    #[arg(long, value_parser = parse_date_arg)]
    start_date: Option<NaiveDate>,

    /// Last pickup date to include (YYYY-MM-DD); defaults to the latest in the data
    #[arg(long, value_parser = parse_date_arg)]
    end_date: Option<NaiveDate>,

    /// Lowest pickup hour to include
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=23))]
    hour_low: u8,

    /// Highest pickup hour to include
    #[arg(long, default_value_t = 23, value_parser = clap::value_parser!(u8).range(0..=23))]
    hour_high: u8,

    /// Payment type code to include; repeat for several, all observed codes when omitted
    #[arg(long = "payment", value_name = "CODE")]
    payments: Vec<i64>,

    /// Load both files from the cache directory instead of downloading them
    #[arg(long)]
    offline: bool,

    /// Keep reading filter commands from stdin after the first render
    #[arg(short, long)]
    interactive: bool,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

impl Cli {
    fn settings(&self) -> DashboardSettings {
        DashboardSettings::new(&self.trip_url, &self.zone_url, &self.cache_dir)
    }

    /// Selection from the flags, falling back to `defaults` for anything not given.
    fn filters(&self, defaults: &FilterState) -> DashboardResult<FilterState> {
        let state = defaults
            .with_dates(
                self.start_date.unwrap_or(defaults.start_date),
                self.end_date.unwrap_or(defaults.end_date),
            )?
            .with_hours(self.hour_low, self.hour_high)?;
        if self.payments.is_empty() {
            Ok(state)
        } else {
            Ok(state.with_payment_types(self.payments.iter().copied()))
        }
    }
}

async fn render_pass(
    dashboard: &Dashboard,
    filters: &FilterState,
    out: &mut dyn Write,
) -> DashboardResult<()> {
    match dashboard.run_pass(filters).await? {
        PassOutcome::NoData => render_no_data(out)?,
        PassOutcome::Ready(view) => render_dashboard(out, &view)?,
    }
    out.flush()?;
    Ok(())
}

async fn interactive_session(
    dashboard: &Dashboard,
    mut filters: FilterState,
    defaults: &FilterState,
) -> DashboardResult<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "\n{}", HELP)?;
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        let effect = line
            .parse::<FilterCommand>()
            .and_then(|command| command.apply(&filters, defaults));
        match effect {
            Ok(CommandEffect::Rerun(next)) => {
                info!(%next, "Filter selection changed");
                filters = next;
                render_pass(dashboard, &filters, &mut stdout).await?;
            }
            Ok(CommandEffect::Show) => writeln!(stdout, "{}", filters)?,
            Ok(CommandEffect::Help) => writeln!(stdout, "{}", HELP)?,
            Ok(CommandEffect::Quit) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "Rejected command");
                writeln!(stdout, "{}", e)?;
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = cli.settings();

    let dashboard = if cli.offline {
        Dashboard::from_cache(&settings).await?
    } else {
        Dashboard::acquire(&settings, &HttpFetcher::new()).await?
    };

    let defaults = dashboard.default_filters().await?;
    let filters = cli.filters(&defaults)?;
    info!(%filters, "Initial filter selection");

    render_pass(&dashboard, &filters, &mut io::stdout()).await?;

    if cli.interactive {
        interactive_session(&dashboard, filters, &defaults).await?;
    }
    Ok(())
}

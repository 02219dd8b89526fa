//! ## Terminal presentation
//!
//! Renders a [`DashboardView`] as text: a row of five metrics followed by five charts. The
//! functions only format what they are given; every number shown comes from [`crate::aggregation`].

use crate::views::{
    weekday_from_index, DashboardView, HistogramBin, HourlyFare, PaymentCount, SummaryMetrics,
    WeekdayHourHeatmap, ZoneCount, DAYS_PER_WEEK, HOURS_PER_DAY,
};
use std::io::{self, Write};

/// Width, in characters, of the longest bar.
pub const BAR_WIDTH: usize = 40;

const BAR: char = '█';
const SHADES: [char; 4] = ['░', '▒', '▓', '█'];

/// `$1,234.56` style amount.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    format!(
        "{}${}.{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

/// `2,964,624` style count.
pub fn format_count(value: u64) -> String {
    group_thousands(value)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Label and formatted value of the five headline metrics, in display order.
pub fn metric_cells(summary: &SummaryMetrics) -> [(&'static str, String); 5] {
    [
        ("Total Trips", format_count(summary.trip_count)),
        ("Average Fare", format_currency(summary.average_fare)),
        ("Total Revenue", format_currency(summary.total_revenue)),
        (
            "Avg Distance",
            format!("{:.2} mi", summary.average_distance_miles),
        ),
        (
            "Avg Duration",
            format!("{:.2} min", summary.average_duration_minutes),
        ),
    ]
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    std::iter::repeat(BAR).take(len.max(1)).collect()
}

fn write_title(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

fn write_caption(out: &mut dyn Write, caption: &str) -> io::Result<()> {
    for line in caption.lines() {
        writeln!(out, "  {}", line)?;
    }
    Ok(())
}

pub fn render_metrics(out: &mut dyn Write, summary: &SummaryMetrics) -> io::Result<()> {
    let cells = metric_cells(summary);
    let width = cells
        .iter()
        .map(|(label, value)| label.len().max(value.chars().count()))
        .max()
        .unwrap_or(0)
        + 2;
    for (label, _) in &cells {
        write!(out, "{:<width$}", label, width = width)?;
    }
    writeln!(out)?;
    for (_, value) in &cells {
        write!(out, "{:<width$}", value, width = width)?;
    }
    writeln!(out)
}

pub fn render_top_zones(out: &mut dyn Write, zones: &[ZoneCount]) -> io::Result<()> {
    write_title(out, "Top 10 Busiest Pickup Zones")?;
    let label_width = zones.iter().map(|z| z.zone.chars().count()).max().unwrap_or(0);
    let max = zones.iter().map(|z| z.trip_count).max().unwrap_or(0) as f64;
    for zone in zones {
        writeln!(
            out,
            "  {:<label_width$} {} {}",
            zone.zone,
            bar(zone.trip_count as f64, max),
            format_count(zone.trip_count),
            label_width = label_width
        )?;
    }
    write_caption(
        out,
        "Midtown Manhattan zones dominate pickup activity, \
         reflecting commercial and tourism concentration.",
    )
}

pub fn render_fare_by_hour(out: &mut dyn Write, fares: &[HourlyFare]) -> io::Result<()> {
    write_title(out, "Average Fare by Hour")?;
    let max = fares.iter().map(|f| f.average_fare).fold(0.0, f64::max);
    for fare in fares {
        writeln!(
            out,
            "  {:>2}h {} {}",
            fare.hour,
            bar(fare.average_fare, max),
            format_currency(fare.average_fare)
        )?;
    }
    write_caption(
        out,
        "Fares peak during late evening and early morning hours.\n\
         Midday hours show more stable pricing.",
    )
}

pub fn render_distance_histogram(out: &mut dyn Write, bins: &[HistogramBin]) -> io::Result<()> {
    write_title(out, "Trip Distance Distribution (0-20 miles)")?;
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    for bin in bins {
        writeln!(
            out,
            "  {:>5.2}-{:<5.2} {} {}",
            bin.lower,
            bin.upper,
            bar(bin.count as f64, max),
            format_count(bin.count)
        )?;
    }
    write_caption(
        out,
        "Most trips are short-distance (under 5 miles).\n\
         Long-distance trips are comparatively rare.",
    )
}

pub fn render_payment_breakdown(out: &mut dyn Write, payments: &[PaymentCount]) -> io::Result<()> {
    write_title(out, "Payment Type Breakdown")?;
    let total: u64 = payments.iter().map(|p| p.trip_count).sum();
    for payment in payments {
        let share = if total == 0 {
            0.0
        } else {
            payment.trip_count as f64 / total as f64
        };
        writeln!(
            out,
            "  {} {:<12} {} {:>5.1}% ({})",
            payment.payment_type,
            payment.label(),
            bar(share, 1.0),
            share * 100.0,
            format_count(payment.trip_count)
        )?;
    }
    write_caption(
        out,
        "Credit card payments dominate transactions.\n\
         Cash usage represents a smaller share of total trips.",
    )
}

/// Shade of a heatmap cell; an absent pair is a zero count.
fn shade(count: u64, max: u64) -> char {
    if count == 0 || max == 0 {
        return '·';
    }
    let level = ((count as f64 / max as f64) * SHADES.len() as f64).ceil() as usize;
    SHADES[level.clamp(1, SHADES.len()) - 1]
}

pub fn render_heatmap(out: &mut dyn Write, heatmap: &WeekdayHourHeatmap) -> io::Result<()> {
    write_title(out, "Trips by Day and Hour")?;
    let matrix = heatmap.matrix();
    let max = matrix.iter().flatten().copied().max().unwrap_or(0);
    write!(out, "      ")?;
    for hour in 0..HOURS_PER_DAY {
        write!(out, "{:>3}", hour)?;
    }
    writeln!(out)?;
    for (day, row) in matrix.iter().enumerate().take(DAYS_PER_WEEK) {
        let label = u8::try_from(day)
            .ok()
            .and_then(weekday_from_index)
            .map(|w| w.to_string())
            .unwrap_or_default();
        write!(out, "  {:<4}", label)?;
        for &count in row {
            write!(out, "{:>3}", shade(count, max))?;
        }
        writeln!(out)?;
    }
    writeln!(
        out,
        "  · none  {} up to {}",
        SHADES.iter().collect::<String>(),
        format_count(max)
    )?;
    write_caption(
        out,
        "Weekday rush hours show peak demand during morning and evening commuting periods.\n\
         Weekend late-night activity is significantly higher than weekday nights.",
    )
}

/// Renders the full dashboard.
pub fn render_dashboard(out: &mut dyn Write, view: &DashboardView) -> io::Result<()> {
    render_metrics(out, &view.summary)?;
    render_top_zones(out, &view.top_zones)?;
    render_fare_by_hour(out, &view.fare_by_hour)?;
    render_distance_histogram(out, &view.distance_histogram)?;
    render_payment_breakdown(out, &view.payment_breakdown)?;
    render_heatmap(out, &view.heatmap)
}

/// Notice shown instead of the dashboard when the filters select no trip.
pub fn render_no_data(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "No data available for selected filters.")
}

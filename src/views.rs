//! ## Aggregate views
//!
//! Plain, read-only results of one dashboard pass. They are produced by
//! [`crate::aggregation`] and consumed by [`crate::presentation`]; neither side holds a
//! reference to the DataFrames they came from.

use chrono::Weekday;

/// Number of hours in the heatmap.
pub const HOURS_PER_DAY: usize = 24;
/// Number of weekdays in the heatmap.
pub const DAYS_PER_WEEK: usize = 7;

/// The five headline numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetrics {
    pub trip_count: u64,
    pub average_fare: f64,
    pub total_revenue: f64,
    pub average_distance_miles: f64,
    pub average_duration_minutes: f64,
}

/// Trip count of one pickup zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCount {
    pub zone: String,
    pub trip_count: u64,
}

/// Mean fare of the trips picked up during one hour of the day.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyFare {
    pub hour: u8,
    pub average_fare: f64,
}

/// One bar of the distance histogram, covering `[lower, upper)` (the last bin is closed).
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Trip count of one payment type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCount {
    pub payment_type: i64,
    pub trip_count: u64,
}

impl PaymentCount {
    pub fn label(&self) -> &'static str {
        payment_type_label(self.payment_type)
    }
}

/// Trip count of one (weekday, hour) pair. Weekday 0 is Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapCell {
    pub weekday: u8,
    pub hour: u8,
    pub trip_count: u64,
}

/// Weekday x hour trip counts. Only pairs with trips are stored; every other pair reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekdayHourHeatmap {
    pub cells: Vec<HeatmapCell>,
}

impl WeekdayHourHeatmap {
    pub fn count_at(&self, weekday: u8, hour: u8) -> u64 {
        self.cells
            .iter()
            .find(|c| c.weekday == weekday && c.hour == hour)
            .map_or(0, |c| c.trip_count)
    }

    /// Dense 7 x 24 matrix, rows indexed by weekday (Monday first), absent pairs as zero.
    pub fn matrix(&self) -> [[u64; HOURS_PER_DAY]; DAYS_PER_WEEK] {
        let mut matrix = [[0; HOURS_PER_DAY]; DAYS_PER_WEEK];
        for cell in &self.cells {
            let (day, hour) = (usize::from(cell.weekday), usize::from(cell.hour));
            if day < DAYS_PER_WEEK && hour < HOURS_PER_DAY {
                matrix[day][hour] += cell.trip_count;
            }
        }
        matrix
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|c| c.trip_count).sum()
    }
}

/// Everything one pass renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub summary: SummaryMetrics,
    pub top_zones: Vec<ZoneCount>,
    pub fare_by_hour: Vec<HourlyFare>,
    pub distance_histogram: Vec<HistogramBin>,
    pub payment_breakdown: Vec<PaymentCount>,
    pub heatmap: WeekdayHourHeatmap,
}

/// Name of a TLC payment type code.
pub fn payment_type_label(code: i64) -> &'static str {
    match code {
        0 => "Flex fare",
        1 => "Credit card",
        2 => "Cash",
        3 => "No charge",
        4 => "Dispute",
        5 => "Unknown",
        6 => "Voided trip",
        _ => "Other",
    }
}

/// Weekday for the 0-origin, Monday-first numbering of `pickup_weekday`.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

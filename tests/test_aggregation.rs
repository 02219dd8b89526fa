mod common;

use approx::assert_relative_eq;
use common::{derived_trips, january, raw_zones_df, sample_trips, sample_zones, RawTrip};
use datafusion::prelude::{DataFrame, SessionContext};
use taxi_dashboard::aggregation::{
    average_fare_by_hour, compute_views, distance_histogram, payment_breakdown, summary_metrics,
    top_zones, weekday_hour_heatmap, HISTOGRAM_BINS, HISTOGRAM_MAX_DISTANCE,
};
use taxi_dashboard::exceptions::DashboardResult;
use taxi_dashboard::filter_state::FilterState;
use taxi_dashboard::transformers::filtering::{TripFilter, ZoneEnrichment};
use taxi_dashboard::transformers::schema::NormalizeZoneSchema;
use taxi_dashboard::views::{HeatmapCell, PaymentCount, ZoneCount};

async fn filtered(
    ctx: &SessionContext,
    trips: &[RawTrip],
    state: FilterState,
) -> DashboardResult<DataFrame> {
    let derived = derived_trips(ctx, trips).await?;
    TripFilter::new(state).transform(derived)
}

fn enrich(ctx: &SessionContext, df: DataFrame) -> DashboardResult<DataFrame> {
    let zones = NormalizeZoneSchema::new().transform(raw_zones_df(ctx, &sample_zones())?)?;
    ZoneEnrichment::new(zones).transform(df)
}

#[tokio::test]
async fn test_summary_metrics() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    // Fares 10, 20, 30 with totals 12, 22, 33.
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4]).with_hours(8, 18)?).await?;
    let summary = summary_metrics(&df).await?;

    assert_eq!(summary.trip_count, 3);
    assert_relative_eq!(summary.average_fare, 20.0);
    assert_relative_eq!(summary.total_revenue, 67.0);
    assert_relative_eq!(summary.average_distance_miles, 11.0 / 3.0, epsilon = 1e-9);
    assert_relative_eq!(summary.average_duration_minutes, 80.0 / 3.0, epsilon = 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_top_zones_counts_and_skips_unknown_zone() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4])).await?;
    let zones = top_zones(&enrich(&ctx, df)?, 10).await?;
    assert_eq!(
        zones,
        vec![
            ZoneCount {
                zone: "Midtown Center".to_string(),
                trip_count: 2
            },
            ZoneCount {
                zone: "Upper East Side South".to_string(),
                trip_count: 1
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_top_zones_break_ties_by_name_and_respect_limit() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    let trips = vec![
        RawTrip::new("2024-01-04 09:00:00", "2024-01-04 09:20:00", 237, 2.0, 12.0, 14.0, 1),
        RawTrip::new("2024-01-04 10:00:00", "2024-01-04 10:20:00", 132, 2.0, 12.0, 14.0, 1),
        RawTrip::new("2024-01-04 11:00:00", "2024-01-04 11:20:00", 161, 2.0, 12.0, 14.0, 1),
    ];
    let df = enrich(&ctx, filtered(&ctx, &trips, january(&[1])).await?)?;

    let names: Vec<String> = top_zones(&df, 10).await?.into_iter().map(|z| z.zone).collect();
    assert_eq!(
        names,
        vec!["JFK Airport", "Midtown Center", "Upper East Side South"]
    );
    // Repeated passes give the same answer.
    let again: Vec<String> = top_zones(&df, 10).await?.into_iter().map(|z| z.zone).collect();
    assert_eq!(names, again);

    let limited = top_zones(&df, 2).await?;
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].zone, "JFK Airport");
    Ok(())
}

#[tokio::test]
async fn test_fare_by_hour_has_no_empty_hours() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4])).await?;
    let fares = average_fare_by_hour(&df).await?;

    let hours: Vec<u8> = fares.iter().map(|f| f.hour).collect();
    assert_eq!(hours, vec![8, 18, 23]);
    assert_relative_eq!(fares[0].average_fare, 15.0);
    assert_relative_eq!(fares[1].average_fare, 30.0);
    assert_relative_eq!(fares[2].average_fare, 70.0);
    Ok(())
}

#[tokio::test]
async fn test_distance_histogram_bins_short_trips() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    // Distances 3, 6, 2 and 25; the 25 mile trip is out of range.
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4])).await?;
    let bins = distance_histogram(&df, HISTOGRAM_MAX_DISTANCE, HISTOGRAM_BINS).await?;

    assert_eq!(bins.len(), HISTOGRAM_BINS);
    assert_relative_eq!(bins[0].lower, 2.0);
    assert_relative_eq!(bins[HISTOGRAM_BINS - 1].upper, 6.0);
    assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 3);
    assert_eq!(bins[0].count, 1);
    // The maximum falls into the closed last bin.
    assert_eq!(bins[HISTOGRAM_BINS - 1].count, 1);
    for pair in bins.windows(2) {
        assert_relative_eq!(pair[0].upper, pair[1].lower, epsilon = 1e-9);
    }
    Ok(())
}

#[tokio::test]
async fn test_distance_histogram_edge_cases() -> DashboardResult<()> {
    let ctx = SessionContext::new();

    let long_only = vec![RawTrip::new(
        "2024-01-04 09:00:00",
        "2024-01-04 09:50:00",
        132,
        21.0,
        70.0,
        80.0,
        1,
    )];
    let df = filtered(&ctx, &long_only, january(&[1])).await?;
    assert!(distance_histogram(&df, HISTOGRAM_MAX_DISTANCE, HISTOGRAM_BINS).await?.is_empty());

    let same_distance = vec![
        RawTrip::new("2024-01-04 09:00:00", "2024-01-04 09:20:00", 161, 1.5, 9.0, 11.0, 1),
        RawTrip::new("2024-01-04 10:00:00", "2024-01-04 10:20:00", 161, 1.5, 9.0, 11.0, 1),
    ];
    let df = filtered(&ctx, &same_distance, january(&[1])).await?;
    let bins = distance_histogram(&df, HISTOGRAM_MAX_DISTANCE, HISTOGRAM_BINS).await?;
    assert_eq!(bins.len(), 1);
    assert_eq!(bins[0].count, 2);
    assert_relative_eq!(bins[0].lower, 1.5);

    assert!(distance_histogram(&df, HISTOGRAM_MAX_DISTANCE, 0).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_payment_breakdown_sums_to_trip_count() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4])).await?;
    let payments = payment_breakdown(&df).await?;

    assert_eq!(
        payments,
        vec![
            PaymentCount {
                payment_type: 1,
                trip_count: 2
            },
            PaymentCount {
                payment_type: 2,
                trip_count: 1
            },
            PaymentCount {
                payment_type: 4,
                trip_count: 1
            },
        ]
    );
    let total: u64 = payments.iter().map(|p| p.trip_count).sum();
    assert_eq!(total, summary_metrics(&df).await?.trip_count);
    Ok(())
}

#[tokio::test]
async fn test_heatmap_cells() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4])).await?;
    let heatmap = weekday_hour_heatmap(&df).await?;

    assert_eq!(
        heatmap.cells,
        vec![
            HeatmapCell {
                weekday: 0,
                hour: 8,
                trip_count: 2
            },
            HeatmapCell {
                weekday: 1,
                hour: 18,
                trip_count: 1
            },
            HeatmapCell {
                weekday: 6,
                hour: 23,
                trip_count: 1
            },
        ]
    );
    assert_eq!(heatmap.count_at(3, 12), 0);
    assert_eq!(heatmap.total(), 4);
    Ok(())
}

#[tokio::test]
async fn test_compute_views_is_consistent() -> DashboardResult<()> {
    let ctx = SessionContext::new();
    let df = filtered(&ctx, &sample_trips(), january(&[1, 2, 4])).await?;
    let enriched = enrich(&ctx, df.clone())?;
    let view = compute_views(&df, &enriched).await?;

    assert_eq!(view.summary.trip_count, 4);
    assert_eq!(view.heatmap.total(), view.summary.trip_count);
    assert_eq!(
        view.payment_breakdown.iter().map(|p| p.trip_count).sum::<u64>(),
        view.summary.trip_count
    );
    // The unknown pickup zone is in the metrics but not in the zone chart.
    assert_eq!(view.top_zones.iter().map(|z| z.trip_count).sum::<u64>(), 3);
    assert_eq!(view.distance_histogram.len(), HISTOGRAM_BINS);
    Ok(())
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow::array::{Float64Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use datafusion::datasource::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use parquet::arrow::ArrowWriter;
use taxi_dashboard::acquisition::Fetcher;
use taxi_dashboard::dashboard::trip_pipeline;
use taxi_dashboard::exceptions::{DashboardError, DashboardResult};
use taxi_dashboard::filter_state::FilterState;
use taxi_dashboard::settings::DashboardSettings;

/// One row of the raw TLC trip table.
#[derive(Debug, Clone)]
pub struct RawTrip {
    pub pickup: Option<&'static str>,
    pub dropoff: Option<&'static str>,
    pub pickup_zone: Option<i32>,
    pub dropoff_zone: Option<i32>,
    pub distance: f64,
    pub fare: Option<f64>,
    pub total: f64,
    pub payment: Option<i64>,
}

impl RawTrip {
    pub fn new(
        pickup: &'static str,
        dropoff: &'static str,
        pickup_zone: i32,
        distance: f64,
        fare: f64,
        total: f64,
        payment: i64,
    ) -> Self {
        Self {
            pickup: Some(pickup),
            dropoff: Some(dropoff),
            pickup_zone: Some(pickup_zone),
            dropoff_zone: Some(pickup_zone),
            distance,
            fare: Some(fare),
            total,
            payment: Some(payment),
        }
    }
}

pub fn micros(ts: &str) -> i64 {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
        .unwrap()
        .and_utc()
        .timestamp_micros()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The columns of the yellow taxi parquet files the dashboard reads, with their published types.
pub fn raw_trip_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("VendorID", DataType::Int32, true),
        Field::new(
            "tpep_pickup_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(
            "tpep_dropoff_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("trip_distance", DataType::Float64, true),
        Field::new("PULocationID", DataType::Int32, true),
        Field::new("DOLocationID", DataType::Int32, true),
        Field::new("payment_type", DataType::Int64, true),
        Field::new("fare_amount", DataType::Float64, true),
        Field::new("total_amount", DataType::Float64, true),
    ]))
}

pub fn raw_trips_batch(trips: &[RawTrip]) -> DashboardResult<RecordBatch> {
    let batch = RecordBatch::try_new(
        raw_trip_schema(),
        vec![
            Arc::new(Int32Array::from(vec![Some(2); trips.len()])),
            Arc::new(TimestampMicrosecondArray::from(
                trips.iter().map(|t| t.pickup.map(micros)).collect::<Vec<_>>(),
            )),
            Arc::new(TimestampMicrosecondArray::from(
                trips.iter().map(|t| t.dropoff.map(micros)).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                trips.iter().map(|t| t.distance).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                trips.iter().map(|t| t.pickup_zone).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                trips.iter().map(|t| t.dropoff_zone).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                trips.iter().map(|t| t.payment).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                trips.iter().map(|t| t.fare).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                trips.iter().map(|t| t.total).collect::<Vec<_>>(),
            )),
        ],
    )?;
    Ok(batch)
}

pub fn raw_trips_df(ctx: &SessionContext, trips: &[RawTrip]) -> DashboardResult<DataFrame> {
    let batch = raw_trips_batch(trips)?;
    let table = MemTable::try_new(raw_trip_schema(), vec![vec![batch]])?;
    Ok(ctx.read_table(Arc::new(table))?)
}

/// The zone lookup as read from its CSV file.
pub fn raw_zones_df(
    ctx: &SessionContext,
    zones: &[(i64, &str, &str)],
) -> DashboardResult<DataFrame> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("LocationID", DataType::Int64, true),
        Field::new("Borough", DataType::Utf8, true),
        Field::new("Zone", DataType::Utf8, true),
        Field::new("service_zone", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(
                zones.iter().map(|z| z.0).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                zones.iter().map(|z| z.1).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                zones.iter().map(|z| z.2).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(vec!["Yellow Zone"; zones.len()])),
        ],
    )?;
    let table = MemTable::try_new(schema, vec![vec![batch]])?;
    Ok(ctx.read_table(Arc::new(table))?)
}

pub fn sample_zones() -> Vec<(i64, &'static str, &'static str)> {
    vec![
        (161, "Manhattan", "Midtown Center"),
        (237, "Manhattan", "Upper East Side South"),
        (132, "Queens", "JFK Airport"),
    ]
}

/// Three valid January 2024 trips (fares 10, 20, 30; totals 12, 22, 33) plus one valid late
/// Sunday trip from an unknown zone, and rows that cleaning must drop.
pub fn sample_trips() -> Vec<RawTrip> {
    let dropped = |distance: f64, fare: f64| {
        RawTrip::new(
            "2024-01-03 10:00:00",
            "2024-01-03 10:20:00",
            161,
            distance,
            fare,
            18.0,
            1,
        )
    };
    let mut missing_fare = dropped(2.0, 15.0);
    missing_fare.fare = None;
    let mut missing_pickup = dropped(2.0, 15.0);
    missing_pickup.pickup = None;
    let mut missing_dropoff = dropped(2.0, 15.0);
    missing_dropoff.dropoff = None;
    let mut missing_zone = dropped(2.0, 15.0);
    missing_zone.pickup_zone = None;
    let mut missing_dropoff_zone = dropped(2.0, 15.0);
    missing_dropoff_zone.dropoff_zone = None;
    let mut reversed = dropped(2.0, 15.0);
    reversed.pickup = Some("2024-01-03 10:20:00");
    reversed.dropoff = Some("2024-01-03 10:00:00");
    let mut instant = dropped(2.0, 15.0);
    instant.dropoff = instant.pickup;
    vec![
        // Monday
        RawTrip::new("2024-01-01 08:00:00", "2024-01-01 08:30:00", 161, 3.0, 10.0, 12.0, 1),
        RawTrip::new("2024-01-01 08:15:00", "2024-01-01 08:45:00", 161, 6.0, 20.0, 22.0, 2),
        // Tuesday
        RawTrip::new("2024-01-02 18:00:00", "2024-01-02 18:20:00", 237, 2.0, 30.0, 33.0, 1),
        // Sunday night, pickup zone absent from the lookup, beyond the histogram range
        RawTrip::new("2024-01-07 23:30:00", "2024-01-08 00:10:00", 264, 25.0, 70.0, 80.0, 4),
        // Dropped by cleaning
        dropped(0.0, 15.0),
        dropped(2.0, 0.0),
        dropped(2.0, -5.0),
        dropped(2.0, 500.0),
        reversed,
        instant,
        missing_fare,
        missing_pickup,
        missing_dropoff,
        missing_zone,
        missing_dropoff_zone,
    ]
}

/// Runs schema normalization, cleaning and derivation over the raw trips.
pub async fn derived_trips(ctx: &SessionContext, trips: &[RawTrip]) -> DashboardResult<DataFrame> {
    let raw = raw_trips_df(ctx, trips)?;
    let mut pipeline = trip_pipeline();
    pipeline.fit(&raw).await
}

/// Hours 0-23 over 2024-01-01..=2024-01-31 for the given payment codes.
pub fn january(payment_types: &[i64]) -> FilterState {
    FilterState::new(
        (date(2024, 1, 1), date(2024, 1, 31)),
        (0, 23),
        payment_types.iter().copied(),
    )
    .unwrap()
}

pub const TRIP_URL: &str = "https://example.test/trip-data/yellow_tripdata_2024-01.parquet";
pub const ZONE_URL: &str = "https://example.test/misc/taxi_zone_lookup.csv";

/// The zone lookup CSV as published (quoted header and strings).
pub const ZONE_CSV: &str = "\"LocationID\",\"Borough\",\"Zone\",\"service_zone\"
1,\"EWR\",\"Newark Airport\",\"EWR\"
132,\"Queens\",\"JFK Airport\",\"Airports\"
161,\"Manhattan\",\"Midtown Center\",\"Yellow Zone\"
237,\"Manhattan\",\"Upper East Side South\",\"Yellow Zone\"
";

/// Encodes raw trips as a parquet file.
pub fn parquet_bytes(trips: &[RawTrip]) -> DashboardResult<Bytes> {
    let batch = raw_trips_batch(trips)?;
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, raw_trip_schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(Bytes::from(buffer))
}

/// Serves fixed bytes per URL and counts the requests it receives.
pub struct StaticFetcher {
    files: HashMap<String, Bytes>,
    pub requests: AtomicUsize,
}

impl StaticFetcher {
    pub fn new(files: Vec<(&str, Bytes)>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(url, bytes)| (url.to_string(), bytes))
                .collect(),
            requests: AtomicUsize::new(0),
        }
    }

    /// The sample trips and the zone CSV under [`TRIP_URL`] and [`ZONE_URL`].
    pub fn sample() -> DashboardResult<Self> {
        Ok(Self::new(vec![
            (TRIP_URL, parquet_bytes(&sample_trips())?),
            (ZONE_URL, Bytes::from_static(ZONE_CSV.as_bytes())),
        ]))
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> DashboardResult<Bytes> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.files.get(url).cloned().ok_or_else(|| {
            DashboardError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", url),
            ))
        })
    }
}

pub fn settings_in(dir: &Path) -> DashboardSettings {
    DashboardSettings::new(TRIP_URL, ZONE_URL, dir.join("raw"))
}

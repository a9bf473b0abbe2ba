//! Movebank-style CSV ingestion.
//!
//! Reads tagged-animal fixes, projects lon/lat to Web-Mercator metres and
//! groups them into one [`RawTrack`] per individual, sorted by time. Rows
//! without a usable timestamp or position are dropped; validation of the
//! resulting tracks is left to [`skytrail_core::Dataset`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use skytrail_core::{RawTrack, Sample};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// WGS84 semi-major axis, the sphere radius Web Mercator uses.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Web Mercator's latitude limit.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Id given to rows without an individual identifier.
pub const DEFAULT_INDIVIDUAL: &str = "individual";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Tracks read from one file plus how many rows were unusable.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub tracks: Vec<RawTrack>,
    pub dropped_rows: usize,
}

#[derive(Debug, Deserialize)]
struct MovebankRow {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "location-long", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(rename = "location-lat", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(
        rename = "height-above-ellipsoid",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    height: Option<f64>,
    #[serde(rename = "individual-local-identifier", default)]
    individual: Option<String>,
}

/// Projects WGS84 lon/lat degrees to Web-Mercator metres.
pub fn lon_lat_to_xy(longitude: f64, latitude: f64) -> (f64, f64) {
    let lat = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = EARTH_RADIUS_M * longitude.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();
    (x, y)
}

/// Parses Movebank timestamps (`2014-08-14 06:05:30.000`, assumed UTC) or
/// RFC 3339 into Unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })?;
    Some(parsed.timestamp() as f64 + parsed.timestamp_subsec_nanos() as f64 * 1e-9)
}

impl MovebankRow {
    fn into_sample(self) -> Option<(String, Sample)> {
        let t = parse_timestamp(self.timestamp.as_deref()?)?;
        let (longitude, latitude) = (self.longitude?, self.latitude?);
        if !(longitude.is_finite() && latitude.is_finite()) {
            return None;
        }
        let (x, y) = lon_lat_to_xy(longitude, latitude);
        let z = self.height.filter(|h| h.is_finite()).unwrap_or(0.0);
        let individual = self
            .individual
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INDIVIDUAL.to_string());
        Some((individual, Sample::new(t, x, y, z)))
    }
}

/// Reads Movebank CSV from any reader.
pub fn read_movebank<R: Read>(reader: R) -> Result<IngestReport, IngestError> {
    let mut per_individual: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    let mut dropped_rows = 0;

    for row in csv::Reader::from_reader(reader).deserialize() {
        let row: MovebankRow = row?;
        match row.into_sample() {
            Some((individual, sample)) => per_individual.entry(individual).or_default().push(sample),
            None => dropped_rows += 1,
        }
    }

    let tracks = per_individual
        .into_iter()
        .map(|(individual, mut samples)| {
            samples.sort_by(|a, b| a.t.total_cmp(&b.t));
            debug!("Individual {}: {} fixes", individual, samples.len());
            RawTrack::new(individual, samples)
        })
        .collect::<Vec<_>>();

    info!(
        "Read {} individuals, dropped {} rows",
        tracks.len(),
        dropped_rows
    );
    Ok(IngestReport {
        tracks,
        dropped_rows,
    })
}

/// Reads a Movebank CSV file.
pub fn load_movebank_csv(path: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_movebank(file)
}

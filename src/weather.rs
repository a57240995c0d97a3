//! Normalization of Trafikverket weather station feeds.
//!
//! A feed is walked as a plain `serde_json::Value` since the upstream schema
//! changes without notice. Required structures (the result container, the
//! station's observation, its sample time and name) fail loudly as a
//! [`FeedError`], every measurement field is read by its own extractor that
//! yields `None` when the field is missing or malformed.
//!
//! The clock is passed in as `now` so that staleness is deterministic.

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use crate::config::MaxAge;
use crate::errors::FeedError;
use crate::models::observation::{WeatherObservation, WindDirection};

const PRECIPITATION_PREFIX: &str = "precipitation";

/// Outcome of normalizing one station in one feed
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A fresh observation, possibly recovered from the station's history
    Fresh(WeatherObservation),
    /// Both the current observation and the first history entry were too old
    Stale { age: i64 },
    /// The feed or the station entry did not have the expected shape
    Failed(FeedError),
    /// The station is not part of this feed
    StationNotFound,
}

impl Outcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Outcome::Fresh(_))
    }
}

/// Checks the top-level structure of a feed and returns its station list
///
/// # Arguments
///
/// * 'feed' - the parsed feed, None if it could not be fetched
/// * 'object_type' - name of the station list inside the first result
pub fn station_list<'a>(feed: Option<&'a Value>, object_type: &str) -> Result<&'a [Value], FeedError> {
    let feed = feed.ok_or_else(|| FeedError::Structure("no feed document".to_string()))?;

    let results = feed
        .pointer("/RESPONSE/RESULT")
        .ok_or_else(|| FeedError::Structure("missing RESPONSE.RESULT".to_string()))?
        .as_array()
        .ok_or_else(|| FeedError::Structure("RESPONSE.RESULT is not an array".to_string()))?;

    let first = results
        .first()
        .ok_or_else(|| FeedError::Structure("RESPONSE.RESULT is empty".to_string()))?;

    if let Some(error) = first.get("ERROR") {
        return Err(FeedError::Structure(format!("upstream reported {}", error)));
    }

    first
        .get(object_type)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| FeedError::Structure(format!("missing station list {}", object_type)))
}

/// Finds and normalizes one station out of a station list
///
/// # Arguments
///
/// * 'stations' - the station list from the feed
/// * 'target_id' - upstream identifier of the station, including any prefix
/// * 'max_age' - maximum accepted observation age
/// * 'now' - current time
pub fn normalize_station(stations: &[Value], target_id: &str, max_age: MaxAge, now: DateTime<Utc>) -> Outcome {
    let Some(station) = stations.iter().find(|s| s.get("Id").and_then(Value::as_str) == Some(target_id)) else {
        info!("station {} not present in feed", target_id);
        return Outcome::StationNotFound;
    };

    match build_observation(station, target_id, max_age, now) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("station {}: {}", target_id, e);
            Outcome::Failed(e)
        },
    }
}

fn build_observation(station: &Value, target_id: &str, max_age: MaxAge, now: DateTime<Utc>) -> Result<Outcome, FeedError> {
    let name = station
        .get("Name")
        .and_then(Value::as_str)
        .ok_or_else(|| FeedError::Shape("station has no Name".to_string()))?;

    let current = station
        .get("Observation")
        .filter(|o| o.is_object())
        .ok_or_else(|| FeedError::Shape("station has no Observation object".to_string()))?;

    let sample = sample_time(current)
        .ok_or_else(|| FeedError::Shape("Observation has no valid Sample time".to_string()))?;

    let mut entry = current;
    let mut sample_time_used = sample;
    let mut age = age_minutes(sample, now);

    if max_age.is_exceeded_by(age) {
        debug!("{}: current observation is {} minutes old, trying history", target_id, age);
        match history_fallback(station) {
            Some((h_entry, h_sample)) => {
                entry = h_entry;
                sample_time_used = h_sample;
                age = age_minutes(h_sample, now);
            },
            None => debug!("{}: no usable history entry", target_id),
        }
    }

    if max_age.is_exceeded_by(age) {
        warn!("{}: measurement too old ({} minutes, max {})", target_id, age, max_age);
        return Ok(Outcome::Stale { age });
    }

    let observation = WeatherObservation {
        station_id: target_id.to_string(),
        name: name.to_string(),
        sample_time: sample_time_used,
        temperature: air_temperature(entry),
        road_temperature: road_temperature(entry),
        wind_speed: wind_speed(entry),
        wind_gust: wind_gust(entry),
        wind_direction: wind_direction(entry),
        precipitation_type: precipitation_type(entry),
        precipitation_amount: precipitation_amount(entry).unwrap_or(0.0),
        dew_point: dew_point(entry),
        relative_humidity: relative_humidity(entry),
    };

    debug!("{}: temperature {:?}°C, wind {:?}mps from {:?} (gust {:?}mps), {:?}",
        observation.name, observation.temperature, observation.wind_speed,
        observation.wind_direction, observation.wind_gust, observation.precipitation_type);

    Ok(Outcome::Fresh(observation))
}

/// Returns the first entry of the station's measurement history, only if it
/// carries a valid sample time
///
/// # Arguments
///
/// * 'station' - the station entry
fn history_fallback(station: &Value) -> Option<(&Value, DateTime<FixedOffset>)> {
    let entry = station.pointer("/MeasurementHistory/0")?;
    sample_time(entry).map(|s| (entry, s))
}

/// Age in whole minutes, rounded to nearest with half minutes going to the even minute
///
/// # Arguments
///
/// * 'sample' - the time of the sample
/// * 'now' - current time
pub fn age_minutes(sample: DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    let seconds = (now - sample.with_timezone(&Utc)).num_seconds();
    (seconds as f64 / 60.0).round_ties_even() as i64
}

/// Smooths a temperature for display.
///
/// Values strictly between -0.1 and 0.1 become 0, values beyond +-2 are rounded
/// (half away from zero), everything else passes unchanged.
///
/// # Arguments
///
/// * 't' - raw temperature
pub fn smooth_temperature(t: f64) -> f64 {
    if t > -0.1 && t < 0.1 {
        0.0
    } else if t > 2.0 || t < -2.0 {
        t.round()
    } else {
        t
    }
}

/// Reads a finite number at the given path, accepting numeric strings
fn number(entry: &Value, path: &str) -> Option<f64> {
    let value = entry.pointer(path)?;
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub fn sample_time(entry: &Value) -> Option<DateTime<FixedOffset>> {
    entry
        .get("Sample")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

pub fn air_temperature(entry: &Value) -> Option<f64> {
    number(entry, "/Air/Temp").map(smooth_temperature)
}

pub fn road_temperature(entry: &Value) -> Option<f64> {
    number(entry, "/Road/Temp").map(smooth_temperature)
}

pub fn dew_point(entry: &Value) -> Option<f64> {
    number(entry, "/Air/Dewpoint")
}

pub fn relative_humidity(entry: &Value) -> Option<f64> {
    number(entry, "/Air/RelativeHumidity")
}

pub fn wind_speed(entry: &Value) -> Option<f64> {
    number(entry, "/Wind/Force")
}

pub fn wind_gust(entry: &Value) -> Option<f64> {
    number(entry, "/Wind/ForceMax")
}

/// Wind direction in degrees if available, otherwise the compass text
pub fn wind_direction(entry: &Value) -> Option<WindDirection> {
    number(entry, "/Wind/Direction")
        .map(WindDirection::Degrees)
        .or_else(|| {
            entry
                .pointer("/Wind/DirectionText")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(|s| WindDirection::Text(s.to_string()))
        })
}

/// Precipitation type, e.g. precipitationSnow -> snow
pub fn precipitation_type(entry: &Value) -> Option<String> {
    let icon = entry.pointer("/Precipitation/TypeIconId").and_then(Value::as_str)?;
    let kind = icon.strip_prefix(PRECIPITATION_PREFIX).unwrap_or(icon).to_lowercase();
    (!kind.is_empty()).then_some(kind)
}

pub fn precipitation_amount(entry: &Value) -> Option<f64> {
    number(entry, "/Precipitation/Amount")
}

/// Lists the distinct precipitation types found in the current observations
/// of all stations, in order of first appearance
///
/// # Arguments
///
/// * 'stations' - the station list from the feed
pub fn precipitation_types(stations: &[Value]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for kind in stations.iter().filter_map(|s| s.get("Observation").and_then(precipitation_type)) {
        if !found.contains(&kind) {
            found.push(kind);
        }
    }
    found
}

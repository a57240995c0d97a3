use std::fmt;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Version of the structured observation payload
pub const PAYLOAD_VERSION: u32 = 1;

/// Wind direction as reported upstream, either in degrees or as a compass text
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum WindDirection {
    Degrees(f64),
    Text(String),
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WindDirection::Degrees(d) => write!(f, "{}", d),
            WindDirection::Text(t) => write!(f, "{}", t),
        }
    }
}

/// A normalized observation from one weather station
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WeatherObservation {
    pub station_id: String,
    pub name: String,
    pub sample_time: DateTime<FixedOffset>,
    pub temperature: Option<f64>,
    pub road_temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_direction: Option<WindDirection>,
    pub precipitation_type: Option<String>,
    pub precipitation_amount: f64,
    pub dew_point: Option<f64>,
    pub relative_humidity: Option<f64>,
}

#[derive(Serialize)]
struct ObservationPayload<'a> {
    version: u32,
    #[serde(flatten)]
    observation: &'a WeatherObservation,
}

impl WeatherObservation {
    /// Returns the observation as compact, versioned JSON
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&ObservationPayload { version: PAYLOAD_VERSION, observation: self })
    }
}

/// Renders an optional scalar for publishing, None becomes the sentinel
///
/// # Arguments
///
/// * 'value' - value to render
/// * 'sentinel' - placeholder for a missing value
pub fn scalar<T: fmt::Display>(value: Option<&T>, sentinel: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => sentinel.to_string(),
    }
}

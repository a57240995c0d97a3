use std::fmt;
use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use serde::de::{self, Deserializer, Visitor};
use crate::errors::ConfigError;

/// Maximum accepted age of a weather observation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaxAge {
    Minutes(i64),
    Unbounded,
}

impl MaxAge {
    /// Returns true if an observation of the given age (in whole minutes) is too old
    ///
    /// # Arguments
    ///
    /// * 'age' - age of the observation in minutes
    pub fn is_exceeded_by(&self, age: i64) -> bool {
        match self {
            MaxAge::Minutes(max) => age > *max,
            MaxAge::Unbounded => false,
        }
    }
}

impl fmt::Display for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MaxAge::Minutes(m) => write!(f, "{} minutes", m),
            MaxAge::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Accepts either a non-negative integer or the string "unbounded"
impl<'de> Deserialize<'de> for MaxAge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MaxAgeVisitor;

        impl Visitor<'_> for MaxAgeVisitor {
            type Value = MaxAge;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a non-negative number of minutes or \"unbounded\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MaxAge, E> {
                if v < 0 {
                    Err(E::custom("max age must not be negative"))
                } else {
                    Ok(MaxAge::Minutes(v))
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MaxAge, E> {
                i64::try_from(v)
                    .map(MaxAge::Minutes)
                    .map_err(|_| E::custom("max age out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MaxAge, E> {
                if v.eq_ignore_ascii_case("unbounded") {
                    Ok(MaxAge::Unbounded)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(MaxAgeVisitor)
    }
}

#[derive(Deserialize)]
pub struct General {
    pub log_path: Option<String>,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    pub poll_interval_secs: Option<u64>,
}

#[derive(Deserialize)]
pub struct MqttParameters {
    pub broker: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub retain: bool,
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

#[derive(Deserialize)]
pub struct TrafikverketParameters {
    pub api_key: String,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_object_type")]
    pub object_type: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_tile_url")]
    pub tile_url: String,
}

#[derive(Deserialize, Default)]
pub struct Files {
    pub save_feed: Option<String>,
    pub load_feed: Option<String>,
}

/// Topics for one weather station, a topic left out is simply never published
#[derive(Deserialize, Default, Clone)]
pub struct WeatherTopics {
    pub observation: Option<String>,
    pub status: Option<String>,
    pub temperature: Option<String>,
    pub road_temperature: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_gust: Option<String>,
    pub wind_direction: Option<String>,
    pub precipitation_type: Option<String>,
    pub precipitation_amount: Option<String>,
    pub dew_point: Option<String>,
    pub relative_humidity: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct StationParameters {
    pub station_id: String,
    #[serde(default)]
    pub id_prefix: String,
    pub topics: WeatherTopics,
}

impl StationParameters {
    /// Returns the station identifier as it appears in the upstream feed
    pub fn target_id(&self) -> String {
        format!("{}{}", self.id_prefix, self.station_id)
    }
}

#[derive(Deserialize)]
pub struct WeatherParameters {
    pub max_age_minutes: MaxAge,
    #[serde(default)]
    pub stations: Vec<StationParameters>,
}

#[derive(Deserialize, Clone)]
pub struct TileParameters {
    pub road_name: String,
    pub zoom_level: u32,
    pub tile_x: u32,
    pub tile_y: u32,
}

#[derive(Deserialize, Default)]
pub struct RoadConditionParameters {
    pub topic: String,
    #[serde(default)]
    pub tiles: Vec<TileParameters>,
}

#[derive(Deserialize)]
pub struct Config {
    pub general: General,
    pub mqtt: MqttParameters,
    pub trafikverket: TrafikverketParameters,
    #[serde(default)]
    pub files: Files,
    pub weather: Option<WeatherParameters>,
    pub road_conditions: Option<RoadConditionParameters>,
}

fn default_mqtt_port() -> u16 { 1883 }
fn default_client_id() -> String { format!("trafikbridge-{}", std::process::id()) }
fn default_sentinel() -> String { "_".to_string() }
fn default_feed_url() -> String { "https://api.trafikinfo.trafikverket.se/v2/data.json".to_string() }
fn default_object_type() -> String { "WeatherMeasurepoint".to_string() }
fn default_schema_version() -> String { "2.1".to_string() }
fn default_tile_url() -> String { "https://maps.trafikinfo.trafikverket.se/TMS/.TMS/1.0.0/LPV".to_string() }

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml = fs::read_to_string(config_path)?;
    parse_config(&toml)
}

/// Parses and checks a configuration document
///
/// # Arguments
///
/// * 'toml' - the configuration as a toml string
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml)?;

    if config.weather.is_none() && config.road_conditions.is_none() {
        return Err(ConfigError::from("neither [weather] nor [road_conditions] is configured"));
    }
    if let Some(weather) = &config.weather {
        if weather.stations.iter().any(|s| s.station_id.is_empty()) {
            return Err(ConfigError::from("weather station with empty station_id"));
        }
    }

    Ok(config)
}

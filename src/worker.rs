use std::thread;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde_json::Value;
use crate::config::{Config, MaxAge, RoadConditionParameters, TileParameters, WeatherParameters};
use crate::initialization::Mgr;
use crate::manager_mqtt::Publish;
use crate::manager_trafikverket::errors::TrafikverketError;
use crate::manager_trafikverket::load_feed;
use crate::models::raster::RasterImage;
use crate::report::{report_road_condition, report_weather, PublishSettings};
use crate::tile_color::classify;
use crate::weather::{normalize_station, precipitation_types, station_list, Outcome};

/// Runs the configured pipelines once, or forever if a poll interval is configured
///
/// # Arguments
///
/// * 'config' - the configuration
/// * 'mgr' - the Trafikverket and MQTT managers
pub fn run(config: &Config, mgr: &mut Mgr) {
    loop {
        run_once(config, mgr);

        match config.general.poll_interval_secs {
            Some(secs) => thread::sleep(Duration::from_secs(secs)),
            None => break,
        }
    }
}

/// One pass over all configured weather stations and road tiles
///
/// # Arguments
///
/// * 'config' - the configuration
/// * 'mgr' - the Trafikverket and MQTT managers
fn run_once(config: &Config, mgr: &mut Mgr) {
    let settings = PublishSettings { retain: config.mqtt.retain, sentinel: &config.mqtt.sentinel };

    if let Some(weather) = &config.weather {
        let (feed, max_age) = match &config.files.load_feed {
            Some(path) => (log_failure(load_feed(path)), MaxAge::Unbounded),
            None => (log_failure(mgr.trafikverket.get_feed(config.files.save_feed.as_deref())), weather.max_age_minutes),
        };

        let published = run_weather(
            weather, &config.trafikverket.object_type, feed.as_ref(), max_age, Utc::now(), &mut mgr.mqtt, settings);
        info!("Published {} of {} weather stations", published, weather.stations.len());
    }

    if let Some(roads) = &config.road_conditions {
        let trafikverket = &mgr.trafikverket;
        run_road_conditions(roads, |t| trafikverket.get_tile(t), &mut mgr.mqtt, settings);
    }
}

fn log_failure(feed: Result<Value, TrafikverketError>) -> Option<Value> {
    feed.map_err(|e| error!("Failed to get weather feed: {}", e)).ok()
}

/// Normalizes and publishes every configured station from one feed.
/// Returns the number of stations with a fresh observation.
///
/// # Arguments
///
/// * 'weather' - weather configuration
/// * 'object_type' - name of the station list in the feed
/// * 'feed' - the feed, None if it could not be fetched
/// * 'max_age' - maximum accepted observation age
/// * 'now' - current time
/// * 'publisher' - where to publish
/// * 'settings' - retain flag and sentinel
pub fn run_weather(
    weather: &WeatherParameters,
    object_type: &str,
    feed: Option<&Value>,
    max_age: MaxAge,
    now: DateTime<Utc>,
    publisher: &mut dyn Publish,
    settings: PublishSettings) -> usize {

    let stations = station_list(feed, object_type);
    match &stations {
        Ok(stations) => debug!("Found the following precipitations: {:?}", precipitation_types(stations)),
        Err(e) => warn!("{}", e),
    }

    let mut published = 0;
    for station in &weather.stations {
        let outcome = match &stations {
            Ok(stations) => normalize_station(stations, &station.target_id(), max_age, now),
            Err(e) => Outcome::Failed(e.clone()),
        };
        if report_weather(publisher, &station.topics, &outcome, settings) {
            published += 1;
        }
    }

    published
}

/// Fetches, classifies and publishes every configured road tile
///
/// # Arguments
///
/// * 'roads' - road condition configuration
/// * 'fetch' - fetches and decodes a tile
/// * 'publisher' - where to publish
/// * 'settings' - retain flag and sentinel
pub fn run_road_conditions<F>(
    roads: &RoadConditionParameters,
    fetch: F,
    publisher: &mut dyn Publish,
    settings: PublishSettings)
where
    F: Fn(&TileParameters) -> Result<RasterImage, TrafikverketError>,
{
    for tile in &roads.tiles {
        let color = match fetch(tile) {
            Ok(image) => Some(classify(&image)),
            Err(e) => {
                warn!("Failed to get road condition tile for {}: {}", tile.road_name, e);
                None
            },
        };
        report_road_condition(publisher, &roads.topic, &tile.road_name, color.as_ref(), settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use crate::config::{StationParameters, WeatherTopics};
    use crate::manager_mqtt::tests::RecordingPublisher;
    use crate::models::raster::Pixel;

    const SETTINGS: PublishSettings = PublishSettings { retain: false, sentinel: "_" };

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn station(id: &str) -> StationParameters {
        StationParameters {
            station_id: id.to_string(),
            id_prefix: "SE_STA_VVIS".to_string(),
            topics: WeatherTopics {
                temperature: Some(format!("{}/temperature", id)),
                status: Some(format!("{}/status", id)),
                ..Default::default()
            },
        }
    }

    fn feed() -> Value {
        let sample = |m: i64| (fixed_now() - Duration::minutes(m)).to_rfc3339();
        json!({ "RESPONSE": { "RESULT": [ { "WeatherMeasurepoint": [
            { "Id": "SE_STA_VVIS1", "Name": "Fresh", "Observation": { "Sample": sample(5), "Air": { "Temp": 7.7 } } },
            { "Id": "SE_STA_VVIS2", "Name": "Old", "Observation": { "Sample": sample(300), "Air": { "Temp": 1.0 } } },
            { "Id": "SE_STA_VVIS3", "Observation": { "Sample": sample(5) } }
        ] } ] } })
    }

    #[test]
    fn test_stations_are_independent() {
        let weather = WeatherParameters {
            max_age_minutes: MaxAge::Minutes(30),
            stations: vec![station("1"), station("2"), station("3"), station("4")],
        };
        let mut publisher = RecordingPublisher::default();
        let doc = feed();
        let published = run_weather(
            &weather, "WeatherMeasurepoint", Some(&doc), weather.max_age_minutes, fixed_now(), &mut publisher, SETTINGS);

        assert_eq!(published, 1);
        assert_eq!(publisher.payload("1/temperature"), Some("8"));
        assert_eq!(publisher.payload("1/status"), Some("ok"));
        assert_eq!(publisher.payload("2/temperature"), Some("_"));
        assert_eq!(publisher.payload("2/status"), Some("stale"));
        assert_eq!(publisher.payload("3/status"), Some("json error"));
        assert_eq!(publisher.payload("4/status"), None);
    }

    #[test]
    fn test_missing_feed_degrades_every_station() {
        let weather = WeatherParameters { max_age_minutes: MaxAge::Minutes(30), stations: vec![station("1"), station("2")] };
        let mut publisher = RecordingPublisher::default();
        let published = run_weather(
            &weather, "WeatherMeasurepoint", None, weather.max_age_minutes, fixed_now(), &mut publisher, SETTINGS);

        assert_eq!(published, 0);
        assert_eq!(publisher.payload("1/status"), Some("api error"));
        assert_eq!(publisher.payload("2/temperature"), Some("_"));
    }

    #[test]
    fn test_upstream_error_reaches_every_station() {
        let weather = WeatherParameters { max_age_minutes: MaxAge::Minutes(30), stations: vec![station("1"), station("2")] };
        let doc = json!({ "RESPONSE": { "RESULT": [ { "ERROR": { "MESSAGE": "Invalid key" } } ] } });
        let mut publisher = RecordingPublisher::default();
        let published = run_weather(
            &weather, "WeatherMeasurepoint", Some(&doc), weather.max_age_minutes, fixed_now(), &mut publisher, SETTINGS);

        assert_eq!(published, 0);
        assert_eq!(publisher.payload("1/status"), Some("api error"));
        assert_eq!(publisher.payload("2/status"), Some("api error"));
        assert_eq!(publisher.payload("1/temperature"), Some("_"));
    }

    #[test]
    fn test_road_tiles_are_independent() {
        let roads = RoadConditionParameters {
            topic: "home/roadcondition".to_string(),
            tiles: vec![
                TileParameters { road_name: "102".to_string(), zoom_level: 11, tile_x: 1, tile_y: 1 },
                TileParameters { road_name: "E22".to_string(), zoom_level: 11, tile_x: 2, tile_y: 2 },
            ],
        };
        let fetch = |t: &TileParameters| {
            if t.tile_x == 1 {
                Ok(RasterImage::new(1, 1, vec![Pixel::rgb(230, 200, 10)]).expect("one pixel"))
            } else {
                Err(TrafikverketError::Http("http status: 404".to_string()))
            }
        };
        let mut publisher = RecordingPublisher::default();
        run_road_conditions(&roads, fetch, &mut publisher, SETTINGS);

        assert_eq!(publisher.payload("home/roadcondition/102/color"), Some("ffff00"));
        assert_eq!(publisher.payload("home/roadcondition/102/condition"), Some("yellow"));
        assert_eq!(publisher.payload("home/roadcondition/E22/condition"), Some("_"));
    }
}

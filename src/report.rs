use log::{error, info};
use crate::config::WeatherTopics;
use crate::manager_mqtt::Publish;
use crate::models::observation::{scalar, WeatherObservation};
use crate::errors::FeedError;
use crate::tile_color::TileColor;
use crate::weather::Outcome;

/// Settings shared by every publish in a run
#[derive(Clone, Copy)]
pub struct PublishSettings<'a> {
    pub retain: bool,
    pub sentinel: &'a str,
}

/// Publishes a value to a topic if the topic is configured, logging but otherwise
/// ignoring failures
fn send(publisher: &mut dyn Publish, topic: Option<&String>, payload: &str, retain: bool) {
    if let Some(topic) = topic {
        if let Err(e) = publisher.publish(topic, payload, retain) {
            error!("failed to publish to {}: {}", topic, e);
        }
    }
}

/// Scalar topics paired with the rendered values of an observation, or with
/// the sentinel when there is no observation
fn scalars<'t>(topics: &'t WeatherTopics, observation: Option<&WeatherObservation>, sentinel: &str)
    -> [(Option<&'t String>, String); 9] {

    let o = observation;
    [
        (topics.temperature.as_ref(), scalar(o.and_then(|o| o.temperature.as_ref()), sentinel)),
        (topics.road_temperature.as_ref(), scalar(o.and_then(|o| o.road_temperature.as_ref()), sentinel)),
        (topics.wind_speed.as_ref(), scalar(o.and_then(|o| o.wind_speed.as_ref()), sentinel)),
        (topics.wind_gust.as_ref(), scalar(o.and_then(|o| o.wind_gust.as_ref()), sentinel)),
        (topics.wind_direction.as_ref(), scalar(o.and_then(|o| o.wind_direction.as_ref()), sentinel)),
        (topics.precipitation_type.as_ref(), scalar(o.and_then(|o| o.precipitation_type.as_ref()), sentinel)),
        (topics.precipitation_amount.as_ref(), scalar(o.map(|o| &o.precipitation_amount), sentinel)),
        (topics.dew_point.as_ref(), scalar(o.and_then(|o| o.dew_point.as_ref()), sentinel)),
        (topics.relative_humidity.as_ref(), scalar(o.and_then(|o| o.relative_humidity.as_ref()), sentinel)),
    ]
}

/// Publishes the outcome of normalizing one station and returns whether a fresh
/// observation was published.
///
/// A fresh observation goes out as one structured record plus one value per field.
/// Stale and failed outcomes put the sentinel on every scalar topic and skip the record.
/// A station missing from the feed publishes nothing.
///
/// # Arguments
///
/// * 'publisher' - where to publish
/// * 'topics' - the station's topics
/// * 'outcome' - the normalization outcome
/// * 'settings' - retain flag and sentinel
pub fn report_weather(publisher: &mut dyn Publish, topics: &WeatherTopics, outcome: &Outcome, settings: PublishSettings) -> bool {
    let (observation, status) = match outcome {
        Outcome::Fresh(o) => (Some(o), "ok"),
        Outcome::Stale { .. } => (None, "stale"),
        Outcome::Failed(FeedError::Structure(_)) => (None, "api error"),
        Outcome::Failed(FeedError::Shape(_)) => (None, "json error"),
        Outcome::StationNotFound => return false,
    };

    if let Some(o) = observation {
        match o.to_payload() {
            Ok(payload) => send(publisher, topics.observation.as_ref(), &payload, settings.retain),
            Err(e) => error!("failed to serialize observation for {}: {}", o.station_id, e),
        }
    }

    for (topic, value) in scalars(topics, observation, settings.sentinel) {
        send(publisher, topic, &value, settings.retain);
    }
    send(publisher, topics.status.as_ref(), status, settings.retain);

    outcome.is_published()
}

/// Publishes the color and condition of a road
///
/// # Arguments
///
/// * 'publisher' - where to publish
/// * 'topic_root' - root topic for road conditions
/// * 'road_name' - name of the road
/// * 'color' - the classified tile, None if the tile could not be fetched
/// * 'settings' - retain flag and sentinel
pub fn report_road_condition(
    publisher: &mut dyn Publish,
    topic_root: &str,
    road_name: &str,
    color: Option<&TileColor>,
    settings: PublishSettings) {

    let (hex, name) = match color {
        Some(c) => {
            info!("Most prominent color for {} is {} {} -> {}", road_name, c.name, c.dominant, c.saturated);
            (c.saturated.to_hex(), c.name.to_string())
        },
        None => (settings.sentinel.to_string(), settings.sentinel.to_string()),
    };

    let color_topic = format!("{}/{}/color", topic_root, road_name);
    let condition_topic = format!("{}/{}/condition", topic_root, road_name);
    send(publisher, Some(&color_topic), &hex, settings.retain);
    send(publisher, Some(&condition_topic), &name, settings.retain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use crate::manager_mqtt::tests::RecordingPublisher;
    use crate::models::raster::Rgb;
    use crate::tile_color::ColorName;

    const SETTINGS: PublishSettings = PublishSettings { retain: true, sentinel: "_" };

    fn topics() -> WeatherTopics {
        let t = |name: &str| Some(format!("home/weather/{}", name));
        WeatherTopics {
            observation: t("observation"),
            status: t("status"),
            temperature: t("temperature"),
            road_temperature: t("road_temperature"),
            wind_speed: t("wind_speed"),
            wind_gust: t("wind_gust"),
            wind_direction: t("wind_direction"),
            precipitation_type: t("precipitation_type"),
            precipitation_amount: t("precipitation_amount"),
            dew_point: t("dew_point"),
            relative_humidity: t("relative_humidity"),
        }
    }

    fn observation() -> WeatherObservation {
        WeatherObservation {
            station_id: "SE_STA_VVIS1415".to_string(),
            name: "Lund".to_string(),
            sample_time: DateTime::parse_from_rfc3339("2024-05-01T14:55:00+02:00").expect("valid time"),
            temperature: Some(0.0),
            road_temperature: Some(5.0),
            wind_speed: Some(3.4),
            wind_gust: None,
            wind_direction: None,
            precipitation_type: Some("rain".to_string()),
            precipitation_amount: 0.0,
            dew_point: Some(-1.2),
            relative_humidity: Some(81.0),
        }
    }

    #[test]
    fn test_fresh_observation_publishes_record_and_scalars() {
        let mut publisher = RecordingPublisher::default();
        let published = report_weather(&mut publisher, &topics(), &Outcome::Fresh(observation()), SETTINGS);

        assert!(published);
        assert_eq!(publisher.published.len(), 11);
        assert!(publisher.published.iter().all(|(_, _, retain)| *retain));
        assert_eq!(publisher.payload("home/weather/temperature"), Some("0"));
        assert_eq!(publisher.payload("home/weather/wind_speed"), Some("3.4"));
        assert_eq!(publisher.payload("home/weather/wind_gust"), Some("_"));
        assert_eq!(publisher.payload("home/weather/precipitation_amount"), Some("0"));
        assert_eq!(publisher.payload("home/weather/status"), Some("ok"));

        let record = publisher.payload("home/weather/observation").expect("record published");
        let value: serde_json::Value = serde_json::from_str(record).expect("record is json");
        assert_eq!(value["version"], 1);
        assert_eq!(value["name"], "Lund");
    }

    #[test]
    fn test_stale_publishes_sentinel_on_every_scalar() {
        let mut publisher = RecordingPublisher::default();
        let published = report_weather(&mut publisher, &topics(), &Outcome::Stale { age: 90 }, SETTINGS);

        assert!(!published);
        assert_eq!(publisher.payload("home/weather/observation"), None);
        for (topic, payload, _) in &publisher.published {
            if topic != "home/weather/status" {
                assert_eq!(payload, "_", "{} should carry the sentinel", topic);
            }
        }
        assert_eq!(publisher.published.len(), 10);
        assert_eq!(publisher.payload("home/weather/status"), Some("stale"));
    }

    #[test]
    fn test_failures_report_their_kind() {
        let mut publisher = RecordingPublisher::default();
        let outcome = Outcome::Failed(FeedError::Structure("no feed document".to_string()));
        assert!(!report_weather(&mut publisher, &topics(), &outcome, SETTINGS));
        assert_eq!(publisher.payload("home/weather/status"), Some("api error"));

        let outcome = Outcome::Failed(FeedError::Shape("station has no Name".to_string()));
        assert!(!report_weather(&mut publisher, &topics(), &outcome, SETTINGS));
        assert_eq!(publisher.payload("home/weather/status"), Some("json error"));
        assert_eq!(publisher.payload("home/weather/temperature"), Some("_"));
    }

    #[test]
    fn test_station_not_found_writes_nothing() {
        let mut publisher = RecordingPublisher::default();
        assert!(!report_weather(&mut publisher, &topics(), &Outcome::StationNotFound, SETTINGS));
        assert!(publisher.published.is_empty());
    }

    #[test]
    fn test_unconfigured_topics_are_skipped() {
        let mut publisher = RecordingPublisher::default();
        let topics = WeatherTopics { temperature: Some("t".to_string()), ..Default::default() };
        report_weather(&mut publisher, &topics, &Outcome::Fresh(observation()), SETTINGS);

        assert_eq!(publisher.topics(), vec!["t"]);
    }

    #[test]
    fn test_publish_failure_does_not_stop_siblings() {
        let mut publisher = RecordingPublisher {
            failing_topics: vec!["home/weather/temperature".to_string()],
            ..Default::default()
        };
        let published = report_weather(&mut publisher, &topics(), &Outcome::Fresh(observation()), SETTINGS);

        assert!(published);
        assert_eq!(publisher.published.len(), 10);
        assert_eq!(publisher.payload("home/weather/relative_humidity"), Some("81"));
    }

    #[test]
    fn test_road_condition_topics() {
        let mut publisher = RecordingPublisher::default();
        let color = TileColor { dominant: Rgb(20, 190, 30), saturated: Rgb(0, 255, 0), name: ColorName::Green };
        report_road_condition(&mut publisher, "home/roadcondition", "102", Some(&color), SETTINGS);

        assert_eq!(publisher.payload("home/roadcondition/102/color"), Some("00ff00"));
        assert_eq!(publisher.payload("home/roadcondition/102/condition"), Some("green"));
    }

    #[test]
    fn test_failed_tile_publishes_sentinel() {
        let mut publisher = RecordingPublisher::default();
        report_road_condition(&mut publisher, "home/roadcondition", "E22", None, SETTINGS);

        assert_eq!(publisher.payload("home/roadcondition/E22/color"), Some("_"));
        assert_eq!(publisher.payload("home/roadcondition/E22/condition"), Some("_"));
    }
}

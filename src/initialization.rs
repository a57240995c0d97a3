use std::env;
use std::str::FromStr;
use log::info;
use log4rs::Handle;
use crate::config::{load_config, Config};
use crate::errors::InitError;
use crate::logging::setup_logger;
use crate::manager_mqtt::Mqtt;
use crate::manager_trafikverket::Trafikverket;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Managers used by every pipeline run
pub struct Mgr {
    pub trafikverket: Trafikverket,
    pub mqtt: Mqtt,
}

/// Loads configuration, sets up logging and connects to the MQTT broker
///
pub fn init() -> Result<(Config, Mgr, Handle), InitError> {
    let config_path = env::var("CONFIG_PATH").unwrap_or(DEFAULT_CONFIG_PATH.to_string());
    let verbose = env::var("VERBOSE")
        .ok()
        .and_then(|v| bool::from_str(&v).ok())
        .unwrap_or(false);

    let config = load_config(&config_path)?;
    let log_handle = setup_logger(&config.general, verbose)?;

    info!("---[ Starting trafikbridge {} ]---", env!("CARGO_PKG_VERSION"));
    info!("using configuration from {}", config_path);

    let trafikverket = Trafikverket::new(&config.trafikverket);
    let mqtt = Mqtt::connect(&config.mqtt)?;

    Ok((config, Mgr { trafikverket, mqtt }, log_handle))
}

use thiserror::Error;

#[derive(Error, Debug)]
#[error("error while loading configuration: {0}")]
pub struct ConfigError(pub String);
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self { ConfigError(e.to_string()) }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self { ConfigError(e.to_string()) }
}
impl From<&str> for ConfigError {
    fn from(e: &str) -> Self { ConfigError(e.to_string()) }
}

#[derive(Error, Debug)]
#[error("error while setting up logging: {0}")]
pub struct LoggingError(pub String);
impl From<std::io::Error> for LoggingError {
    fn from(e: std::io::Error) -> Self { LoggingError(e.to_string()) }
}
impl From<log4rs::config::runtime::ConfigErrors> for LoggingError {
    fn from(e: log4rs::config::runtime::ConfigErrors) -> Self { LoggingError(e.to_string()) }
}
impl From<log::SetLoggerError> for LoggingError {
    fn from(e: log::SetLoggerError) -> Self { LoggingError(e.to_string()) }
}

/// Failures found while walking a weather feed document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    /// The document as a whole is missing or lacks its top-level containers
    #[error("API error: {0}")]
    Structure(String),
    /// A station entry lacks a required nested structure
    #[error("JSON shape error: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
#[error("error while setting up the application: {0}")]
pub struct InitError(pub String);
impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self { InitError(e.to_string()) }
}
impl From<LoggingError> for InitError {
    fn from(e: LoggingError) -> Self { InitError(e.to_string()) }
}
impl From<crate::manager_mqtt::errors::MqttError> for InitError {
    fn from(e: crate::manager_mqtt::errors::MqttError) -> Self { InitError(e.to_string()) }
}

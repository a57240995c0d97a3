use thiserror::Error;

#[derive(Error, Debug)]
#[error("error in communication with MQTT broker: {0}")]
pub struct MqttError(pub String);
impl From<rumqttc::ClientError> for MqttError {
    fn from(e: rumqttc::ClientError) -> MqttError {
        MqttError(format!("client error: {}", e))
    }
}
impl From<rumqttc::ConnectionError> for MqttError {
    fn from(e: rumqttc::ConnectionError) -> MqttError {
        MqttError(format!("connection error: {}", e))
    }
}

pub mod errors;

use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use log::{debug, info, warn};
use rumqttc::{Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Outgoing, Packet, QoS};
use crate::config::MqttParameters;
use crate::manager_mqtt::errors::MqttError;

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Something that can deliver a value to a topic on the message bus
pub trait Publish {
    /// Publishes a payload to a topic
    ///
    /// # Arguments
    ///
    /// * 'topic' - the topic to publish to
    /// * 'payload' - the value to publish
    /// * 'retain' - whether the broker should retain the value
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), MqttError>;
}

/// Struct for publishing values to an MQTT broker
pub struct Mqtt {
    client: Client,
    event_loop: Option<JoinHandle<()>>,
}

impl Mqtt {
    /// Connects to the broker, retrying once a second until a connection is acknowledged,
    /// and returns a Mqtt struct ready for publishing
    ///
    /// # Arguments
    ///
    /// * 'config' - MQTT configuration
    pub fn connect(config: &MqttParameters) -> Result<Self, MqttError> {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 64);
        wait_for_connack(&mut connection, &config.broker)?;
        info!("Connected to MQTT broker at {}:{}", config.broker, config.port);

        let event_loop = thread::spawn(move || drive(connection));

        Ok(Self { client, event_loop: Some(event_loop) })
    }

    /// Disconnects from the broker after all queued publishes have been sent
    pub fn close(mut self) -> Result<(), MqttError> {
        self.client.disconnect()?;
        if let Some(handle) = self.event_loop.take() {
            if handle.join().is_err() {
                return Err(MqttError("event loop thread panicked".to_string()));
            }
        }
        Ok(())
    }
}

impl Publish for Mqtt {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), MqttError> {
        debug!("publish {} {}", topic, payload);
        self.client.publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec())?;
        Ok(())
    }
}

/// State of the connection handshake after one notification
enum Handshake {
    Accepted,
    Pending,
    Refused(ConnectReturnCode),
    Retry(ConnectionError),
}

/// Classifies a notification seen while waiting for the broker to acknowledge
///
/// # Arguments
///
/// * 'notification' - the notification from the connection
fn handshake(notification: Result<Event, ConnectionError>) -> Handshake {
    match notification {
        Ok(Event::Incoming(Packet::ConnAck(ack))) if ack.code == ConnectReturnCode::Success => Handshake::Accepted,
        Ok(Event::Incoming(Packet::ConnAck(ack))) => Handshake::Refused(ack.code),
        Ok(_) => Handshake::Pending,
        Err(ConnectionError::ConnectionRefused(code)) => Handshake::Refused(code),
        Err(e) => Handshake::Retry(e),
    }
}

/// Polls the connection until the broker acknowledges it. Connection failures are
/// retried forever, a refused connection is an error.
///
/// # Arguments
///
/// * 'connection' - the connection to poll
/// * 'broker' - broker address, for logging
fn wait_for_connack(connection: &mut Connection, broker: &str) -> Result<(), MqttError> {
    let mut warned = false;

    for notification in connection.iter() {
        match handshake(notification) {
            Handshake::Accepted => return Ok(()),
            Handshake::Pending => {},
            Handshake::Refused(code) => {
                return Err(MqttError(format!("connection refused by {}: {:?}", broker, code)));
            },
            Handshake::Retry(e) => {
                if !warned {
                    warn!("Failed to connect to MQTT broker at {} ({}), will retry", broker, e);
                    warned = true;
                }
                thread::sleep(RETRY_DELAY);
            },
        }
    }

    Err(MqttError(format!("connection to {} closed", broker)))
}

/// Drives the network event loop until our own disconnect has gone out
///
/// # Arguments
///
/// * 'connection' - the connection to drive
fn drive(mut connection: Connection) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {},
            Err(e) => {
                warn!("MQTT connection error: {}", e);
                thread::sleep(RETRY_DELAY);
            },
        }
    }
}

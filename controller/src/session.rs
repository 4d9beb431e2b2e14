//! MQTT session management.
//!
//! Wraps the rumqttc client and event loop behind a small connection
//! state machine. The broker holds a retained last-will on
//! `<deviceId>/system/status` so an unclean drop is announced without
//! our help; a clean connect overwrites it with `online` and re-issues
//! the command subscriptions.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, Incoming, LastWill, MqttOptions, Outgoing, QoS};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use aircon_common::topics::{
    CommandTopic, DeviceTopics, STATUS_OFFLINE, STATUS_ONLINE, SUFFIX_SYSTEM_STATUS,
};
use aircon_common::DeviceConfig;

use crate::device::OutboundMessage;

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What one `poll` surfaced to the run loop.
#[derive(Debug)]
pub enum SessionEvent {
    Connected,
    Message { suffix: String, payload: Vec<u8> },
    Disconnected,
    Idle,
}

pub struct BrokerSession {
    client: AsyncClient,
    eventloop: rumqttc::EventLoop,
    topics: DeviceTopics,
    state: ConnectionState,
    reconnect_delay: Duration,
    retry_at: Option<Instant>,
}

impl BrokerSession {
    pub fn new(config: &DeviceConfig) -> Self {
        let topics = DeviceTopics::new(config.device_id.clone());

        let mut options = MqttOptions::new(
            config.device_id.clone(),
            config.mqtt.host.clone(),
            config.mqtt.port,
        );
        options.set_keep_alive(Duration::from_secs(config.mqtt.keep_alive_secs));
        options.set_last_will(LastWill::new(
            topics.full(SUFFIX_SYSTEM_STATUS),
            STATUS_OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));
        if !config.mqtt.user.is_empty() {
            options.set_credentials(config.mqtt.user.clone(), config.mqtt.pass.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, EVENT_CHANNEL_CAPACITY);

        Self {
            client,
            eventloop,
            topics,
            state: ConnectionState::Disconnected,
            reconnect_delay: Duration::from_millis(config.mqtt.reconnect_delay_ms),
            retry_at: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Drives the transport one step. After a failure the next attempt
    /// waits out the reconnect delay first; the sleep is cancel-safe, so
    /// an interrupted poll resumes the same deadline.
    pub async fn poll(&mut self) -> SessionEvent {
        if let Some(deadline) = self.retry_at {
            tokio::time::sleep_until(deadline).await;
            self.retry_at = None;
            self.state = ConnectionState::Connecting;
        }

        match self.eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("mqtt connected");
                self.state = ConnectionState::Connected;
                self.announce_online().await;
                SessionEvent::Connected
            }
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                if publish.payload.len() > MAX_MQTT_PAYLOAD_BYTES {
                    warn!(
                        topic = %publish.topic,
                        bytes = publish.payload.len(),
                        "dropping oversized mqtt payload"
                    );
                    return SessionEvent::Idle;
                }
                match self.topics.strip_device(&publish.topic) {
                    Some(suffix) => SessionEvent::Message {
                        suffix: suffix.to_string(),
                        payload: publish.payload.to_vec(),
                    },
                    None => {
                        debug!(topic = %publish.topic, "message outside device namespace");
                        SessionEvent::Idle
                    }
                }
            }
            Ok(_) => SessionEvent::Idle,
            Err(err) => {
                warn!("mqtt poll error: {err}");
                self.state = ConnectionState::Disconnected;
                self.retry_at = Some(Instant::now() + self.reconnect_delay);
                SessionEvent::Disconnected
            }
        }
    }

    /// Publish retained `online` and (re-)subscribe the command topics.
    /// Runs on every ConnAck; the broker may have dropped our session
    /// state across the reconnect.
    async fn announce_online(&self) {
        if let Err(err) = self
            .client
            .publish(
                self.topics.full(SUFFIX_SYSTEM_STATUS),
                QoS::AtLeastOnce,
                true,
                STATUS_ONLINE,
            )
            .await
        {
            warn!("online status publish failed: {err}");
        }

        for topic in CommandTopic::ALL {
            let full = self.topics.full(topic.suffix());
            if let Err(err) = self.client.subscribe(&full, QoS::AtLeastOnce).await {
                warn!(topic = %full, "subscribe failed: {err}");
            }
        }
    }

    pub async fn send_all(&self, messages: &[OutboundMessage]) {
        for message in messages {
            self.send(message).await;
        }
    }

    /// Best-effort publish; telemetry is dropped silently while the
    /// session is down, status messages ride QoS 1 with the retained bit.
    pub async fn send(&self, message: &OutboundMessage) {
        if !self.is_connected() {
            debug!(suffix = message.suffix, "not connected, dropping publish");
            return;
        }

        let qos = if message.retained {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        if let Err(err) = self
            .client
            .publish(
                self.topics.full(message.suffix),
                qos,
                message.retained,
                message.payload.clone(),
            )
            .await
        {
            warn!(suffix = message.suffix, "publish failed: {err}");
        }
    }

    /// Clean shutdown: overwrite the retained status with `offline` so
    /// the last-will never fires, then drop the connection.
    pub async fn shutdown(&mut self) {
        if let Err(err) = self
            .client
            .publish(
                self.topics.full(SUFFIX_SYSTEM_STATUS),
                QoS::AtLeastOnce,
                true,
                STATUS_OFFLINE,
            )
            .await
        {
            warn!("offline status publish failed: {err}");
        }
        if let Err(err) = self.client.disconnect().await {
            warn!("mqtt disconnect failed: {err}");
        }
        // publish and disconnect only enqueue; drive the event loop until
        // the disconnect actually leaves the socket
        for _ in 0..8 {
            match self.eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}

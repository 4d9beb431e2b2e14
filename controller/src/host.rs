use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::info;

use aircon_common::DeviceConfig;

use crate::device::Device;
use crate::session::{BrokerSession, SessionEvent};

/// Connect attempts allowed at boot before giving up; exiting is the
/// restart path, the process supervisor brings the firmware back up.
const BOOT_CONNECT_ATTEMPTS: u32 = 10;

/// Cadence of the blink state machine check.
const LED_TICK_MS: u64 = 100;

// Hardware integration point:
// the esp target reads these from the Wi-Fi driver and the IDF heap
// allocator for the heartbeat payload.
const SIMULATED_WIFI_RSSI: i32 = -55;
const SIMULATED_FREE_HEAP: u64 = 180_000;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = config_from_env();
    info!(
        device_id = %config.device_id,
        broker = %config.mqtt.host,
        port = config.mqtt.port,
        "starting aircon controller"
    );

    let mut session = BrokerSession::new(&config);
    let mut device = Device::new(&config);

    let mut attempts = 0u32;
    loop {
        match session.poll().await {
            SessionEvent::Connected => break,
            SessionEvent::Disconnected => {
                attempts += 1;
                if attempts >= BOOT_CONNECT_ATTEMPTS {
                    anyhow::bail!(
                        "mqtt broker unreachable after {BOOT_CONNECT_ATTEMPTS} connect attempts"
                    );
                }
            }
            SessionEvent::Message { .. } | SessionEvent::Idle => {}
        }
    }
    device.on_connected(monotonic_ms());

    let mut sample_timer =
        tokio::time::interval(Duration::from_millis(device.sampling().sample_interval_ms));
    let mut heartbeat_timer =
        tokio::time::interval(Duration::from_millis(device.sampling().heartbeat_interval_ms));
    let mut led_timer = tokio::time::interval(Duration::from_millis(LED_TICK_MS));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = session.poll() => match event {
                SessionEvent::Connected => device.on_connected(monotonic_ms()),
                SessionEvent::Message { suffix, payload } => {
                    let out = device.handle_message(
                        &suffix,
                        &payload,
                        monotonic_ms(),
                        Utc::now().timestamp(),
                    );
                    session.send_all(&out).await;

                    if device.take_config_changed() {
                        sample_timer = tokio::time::interval(Duration::from_millis(
                            device.sampling().sample_interval_ms,
                        ));
                        heartbeat_timer = tokio::time::interval(Duration::from_millis(
                            device.sampling().heartbeat_interval_ms,
                        ));
                    }
                    if device.reboot_requested() {
                        info!("shutting down for remote reboot");
                        session.shutdown().await;
                        return Ok(());
                    }
                }
                SessionEvent::Disconnected | SessionEvent::Idle => {}
            },

            _ = sample_timer.tick() => {
                let out = device.sample_tick(Utc::now().timestamp());
                session.send_all(&out).await;
            }

            _ = heartbeat_timer.tick() => {
                let out = device.heartbeat_tick(
                    monotonic_ms(),
                    SIMULATED_WIFI_RSSI,
                    SIMULATED_FREE_HEAP,
                );
                session.send_all(&out).await;
            }

            _ = led_timer.tick() => device.advance_led(monotonic_ms()),

            _ = &mut ctrl_c => {
                info!("interrupt received, going offline");
                session.shutdown().await;
                return Ok(());
            }
        }
    }
}

fn config_from_env() -> DeviceConfig {
    let mut config = DeviceConfig::default();
    if let Ok(id) = std::env::var("DEVICE_ID") {
        config.device_id = id;
    }
    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.mqtt.host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.mqtt.port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        config.mqtt.user = user;
        config.mqtt.pass = std::env::var("MQTT_PASS").unwrap_or_default();
    }
    config.sampling.sanitize();
    config
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

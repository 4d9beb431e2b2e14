//! Topic layout: every topic lives under the device id namespace,
//! `"<deviceId>/<suffix>"`.

pub const SUFFIX_AC_COMMAND: &str = "ac/command";
pub const SUFFIX_AC_STATUS: &str = "ac/status";
pub const SUFFIX_LED_COMMAND: &str = "led/command";
pub const SUFFIX_LED_STATUS: &str = "led/status";
pub const SUFFIX_CONFIG_UPDATE: &str = "config/update";
pub const SUFFIX_SYSTEM_REBOOT: &str = "system/reboot";
pub const SUFFIX_SYSTEM_STATUS: &str = "system/status";
pub const SUFFIX_SYSTEM_HEARTBEAT: &str = "system/heartbeat";
pub const SUFFIX_SENSOR_RAW: &str = "sensor/raw";
pub const SUFFIX_SENSOR_AVG: &str = "sensor/avg";

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

/// Inbound command topics; the routing table is this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTopic {
    AcCommand,
    LedCommand,
    ConfigUpdate,
    SystemReboot,
}

impl CommandTopic {
    pub const ALL: [CommandTopic; 4] = [
        CommandTopic::AcCommand,
        CommandTopic::LedCommand,
        CommandTopic::ConfigUpdate,
        CommandTopic::SystemReboot,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::AcCommand => SUFFIX_AC_COMMAND,
            Self::LedCommand => SUFFIX_LED_COMMAND,
            Self::ConfigUpdate => SUFFIX_CONFIG_UPDATE,
            Self::SystemReboot => SUFFIX_SYSTEM_REBOOT,
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            SUFFIX_AC_COMMAND => Some(Self::AcCommand),
            SUFFIX_LED_COMMAND => Some(Self::LedCommand),
            SUFFIX_CONFIG_UPDATE => Some(Self::ConfigUpdate),
            SUFFIX_SYSTEM_REBOOT => Some(Self::SystemReboot),
            _ => None,
        }
    }
}

/// Namespaces topics with the device id, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct DeviceTopics {
    device_id: String,
}

impl DeviceTopics {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn full(&self, suffix: &str) -> String {
        format!("{}/{}", self.device_id, suffix)
    }

    /// Strips the device namespace off an incoming topic, returning the
    /// routing suffix; `None` for topics addressed to other devices.
    pub fn strip_device<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.device_id.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

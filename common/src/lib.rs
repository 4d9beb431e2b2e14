pub mod ac;
pub mod buffer;
pub mod config;
pub mod ir;
pub mod ir_codes;
pub mod sensor;
pub mod topics;
pub mod types;

pub use ac::{AcController, AcSignal, AcState, MIN_COMMAND_INTERVAL_MS};
pub use buffer::SampleBuffer;
pub use config::{DeviceConfig, MqttConfig, SamplingConfig};
pub use ir::{AcMode, AcProtocolVariant, FanSpeed};
pub use sensor::{RawReading, SensorError, SensorMonitor, SensorSample};
pub use topics::*;
pub use types::{
    AcCommandMessage, AcStatusPayload, ConfigUpdateMessage, HeartbeatPayload, LedCommandMessage,
    LedStatusPayload, RebootMessage, SensorAvgPayload, SensorRawPayload,
};

use crate::identity::SensorIdentifier;

/// A single sensor measurement, built per sample and consumed by the publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_id: String,
    pub sensor_type: String,
    pub value: f32,
    pub unit: String,
    pub pin: i32,
    /// Seconds, wall-clock or uptime depending on the caller.
    pub timestamp: u64,
}

impl Reading {
    pub fn new(
        sensor_id: &SensorIdentifier,
        sensor_type: &str,
        value: f32,
        unit: &str,
        pin: i32,
        timestamp: u64,
    ) -> Reading {
        Reading {
            sensor_id: sensor_id.as_str().to_owned(),
            sensor_type: sensor_type.to_owned(),
            value,
            unit: unit.to_owned(),
            pin,
            timestamp,
        }
    }
}

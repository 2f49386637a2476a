use crate::identity::SensorIdentifier;

/// A control command addressed to one sensor or actuator, e.g. `set_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub sensor_id: String,
    pub sensor_type: String,
    pub unit: String,
    pub value: f32,
    pub command: String,
    /// Where the command came from, e.g. `dashboard`.
    pub source: String,
    pub requestor_id: String,
    pub timestamp: u64,
}

impl ControlMessage {
    pub fn new(sensor_id: &SensorIdentifier, sensor_type: &str, command: &str) -> ControlMessage {
        ControlMessage {
            sensor_id: sensor_id.as_str().to_owned(),
            sensor_type: sensor_type.to_owned(),
            unit: String::new(),
            value: 0.0,
            command: command.to_owned(),
            source: String::new(),
            requestor_id: String::new(),
            timestamp: 0,
        }
    }

    pub fn with_value(mut self, value: f32, unit: &str) -> ControlMessage {
        self.value = value;
        self.unit = unit.to_owned();
        self
    }

    pub fn with_requestor(mut self, source: &str, requestor_id: &str) -> ControlMessage {
        self.source = source.to_owned();
        self.requestor_id = requestor_id.to_owned();
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> ControlMessage {
        self.timestamp = timestamp;
        self
    }
}

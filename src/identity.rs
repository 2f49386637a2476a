pub const LOCATION: &str = "excessus-home";
pub const STATION_NAME: &str = "garden-hydrant";
pub const CONTROLLER_ID: &str = "uno-r4-wifi-primary";

pub const TOPIC_PREFIX: &str = "controlcore/data";
pub const COMMAND_TOPIC_PREFIX: &str = "controlcore/command";

/// Longest topic, in bytes. Same 128-byte buffer bound as sensor ids.
pub const MAX_TOPIC_LEN: usize = 127;

/// Longest sensor identifier, in bytes.
pub const MAX_SENSOR_ID_LEN: usize = 127;

pub const SENSOR_ID_DELIMITER: char = '_';

/// Station and controller identity of this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    location: String,
    station_name: String,
    controller_id: String,
    topic_prefix: String,
    command_topic_prefix: String,
    max_topic_len: usize,
}

impl Identity {
    pub fn new(
        location: impl Into<String>,
        station_name: impl Into<String>,
        controller_id: impl Into<String>,
    ) -> Identity {
        Identity {
            location: location.into(),
            station_name: station_name.into(),
            controller_id: controller_id.into(),
            topic_prefix: TOPIC_PREFIX.to_owned(),
            command_topic_prefix: COMMAND_TOPIC_PREFIX.to_owned(),
            max_topic_len: MAX_TOPIC_LEN,
        }
    }

    pub fn with_topic_prefix(mut self, topic_prefix: impl Into<String>) -> Identity {
        self.topic_prefix = topic_prefix.into();
        self
    }

    pub fn with_command_topic_prefix(mut self, prefix: impl Into<String>) -> Identity {
        self.command_topic_prefix = prefix.into();
        self
    }

    pub fn with_max_topic_len(mut self, max_topic_len: usize) -> Identity {
        self.max_topic_len = max_topic_len;
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    pub fn command_topic_prefix(&self) -> &str {
        &self.command_topic_prefix
    }

    pub fn max_topic_len(&self) -> usize {
        self.max_topic_len
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity::new(LOCATION, STATION_NAME, CONTROLLER_ID)
    }
}

/// A sensor identifier of the form `location_station_controller_type_name`.
///
/// Identifiers longer than [`MAX_SENSOR_ID_LEN`] are cut down to the limit and
/// flagged, so callers can decide whether a truncated id is acceptable.
/// Underscores inside the parts are kept as-is, which makes the id ambiguous
/// to split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorIdentifier {
    id: String,
    truncated: bool,
}

impl SensorIdentifier {
    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl std::fmt::Display for SensorIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

pub fn build_sensor_id(
    identity: &Identity,
    sensor_type: &str,
    logical_name: &str,
) -> SensorIdentifier {
    let parts = [
        identity.location(),
        identity.station_name(),
        identity.controller_id(),
        sensor_type,
        logical_name,
    ];

    let mut id = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            id.push(SENSOR_ID_DELIMITER);
        }
        id.push_str(part);
    }

    let truncated = truncate(&mut id, MAX_SENSOR_ID_LEN);

    SensorIdentifier { id, truncated }
}

/// The caller-supplied parts of a sensor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorIdParts<'a> {
    pub sensor_type: &'a str,
    pub logical_name: &'a str,
}

/// Splits an id made by [`build_sensor_id`] for `identity` back into its
/// sensor type and logical name.
///
/// Returns `None` if the id belongs to another identity, or if the remainder
/// does not contain exactly one delimiter and so cannot be split unambiguously.
pub fn parse_sensor_id<'a>(identity: &Identity, id: &'a str) -> Option<SensorIdParts<'a>> {
    let rest = id
        .strip_prefix(identity.location())?
        .strip_prefix(SENSOR_ID_DELIMITER)?
        .strip_prefix(identity.station_name())?
        .strip_prefix(SENSOR_ID_DELIMITER)?
        .strip_prefix(identity.controller_id())?
        .strip_prefix(SENSOR_ID_DELIMITER)?;

    let (sensor_type, logical_name) = rest.split_once(SENSOR_ID_DELIMITER)?;
    if sensor_type.is_empty()
        || logical_name.is_empty()
        || logical_name.contains(SENSOR_ID_DELIMITER)
    {
        return None;
    }

    Some(SensorIdParts {
        sensor_type,
        logical_name,
    })
}

/// Shortens `s` to at most `max` bytes without splitting a character.
/// Returns whether anything was dropped.
fn truncate(s: &mut String, max: usize) -> bool {
    if s.len() <= max {
        return false;
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sensor_id() {
        let identity = Identity::default();
        let id = build_sensor_id(&identity, "temp", "bed1");

        assert_eq!(
            id.as_str(),
            "excessus-home_garden-hydrant_uno-r4-wifi-primary_temp_bed1"
        );
        assert!(!id.is_truncated());
    }

    #[test]
    fn test_build_sensor_id_is_deterministic() {
        let identity = Identity::new("loc", "garden-hydrant", "ctrl");

        let a = build_sensor_id(&identity, "moisture", "bed2");
        let b = build_sensor_id(&identity, "moisture", "bed2");

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "loc_garden-hydrant_ctrl_moisture_bed2");
    }

    #[test]
    fn test_build_sensor_id_keeps_embedded_delimiters() {
        let identity = Identity::new("loc", "st", "ctrl");
        let id = build_sensor_id(&identity, "soil_moisture", "bed_1");

        assert_eq!(id.as_str(), "loc_st_ctrl_soil_moisture_bed_1");
        assert!(!id.is_truncated());
    }

    #[test]
    fn test_build_sensor_id_truncates_long_ids() {
        let identity = Identity::default();
        let name = "x".repeat(200);
        let id = build_sensor_id(&identity, "temp", &name);

        assert!(id.is_truncated());
        assert_eq!(id.as_str().len(), MAX_SENSOR_ID_LEN);
        assert!(
            id.as_str()
                .starts_with("excessus-home_garden-hydrant_uno-r4-wifi-primary_temp_xxx")
        );
    }

    #[test]
    fn test_build_sensor_id_at_exact_limit() {
        let identity = Identity::new("a", "b", "c");
        // "a_b_c_t_" is 8 bytes
        let name = "n".repeat(MAX_SENSOR_ID_LEN - 8);
        let id = build_sensor_id(&identity, "t", &name);

        assert!(!id.is_truncated());
        assert_eq!(id.as_str().len(), MAX_SENSOR_ID_LEN);
    }

    #[test]
    fn test_build_sensor_id_truncates_multibyte_names() {
        let identity = Identity::new("a", "b", "c");
        // 8 ASCII bytes of prefix leave an odd number of bytes for two-byte chars
        let name = "é".repeat(100);
        let id = build_sensor_id(&identity, "t", &name);

        assert!(id.is_truncated());
        assert!(id.as_str().len() <= MAX_SENSOR_ID_LEN);
        assert_eq!(id.as_str().len(), MAX_SENSOR_ID_LEN - 1);
        assert!(id.as_str().ends_with('é'));
    }

    #[test]
    fn test_parse_sensor_id() {
        let identity = Identity::default();
        let id = build_sensor_id(&identity, "temp", "bed1");

        let parts = parse_sensor_id(&identity, id.as_str()).unwrap();
        assert_eq!(parts.sensor_type, "temp");
        assert_eq!(parts.logical_name, "bed1");
    }

    #[test]
    fn test_parse_sensor_id_with_delimiters_in_identity() {
        let identity = Identity::new("home_1", "garden_hydrant", "ctrl");
        let id = build_sensor_id(&identity, "flow", "main");

        let parts = parse_sensor_id(&identity, id.as_str()).unwrap();
        assert_eq!(parts.sensor_type, "flow");
        assert_eq!(parts.logical_name, "main");
    }

    #[test]
    fn test_parse_sensor_id_ambiguous() {
        let identity = Identity::new("loc", "st", "ctrl");
        let id = build_sensor_id(&identity, "soil_moisture", "bed1");

        assert_eq!(parse_sensor_id(&identity, id.as_str()), None);
    }

    #[test]
    fn test_parse_sensor_id_foreign_identity() {
        let identity = Identity::new("loc", "st", "ctrl");
        let other = Identity::new("loc", "st", "ctrl2");
        let id = build_sensor_id(&other, "temp", "bed1");

        assert_eq!(parse_sensor_id(&identity, id.as_str()), None);
        assert_eq!(parse_sensor_id(&identity, "loc_st_ctrl_temp"), None);
        assert_eq!(parse_sensor_id(&identity, "loc_st_ctrl__bed1"), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut s = String::from("aé");
        assert!(truncate(&mut s, 2));
        assert_eq!(s, "a");

        let mut s = String::from("abc");
        assert!(!truncate(&mut s, 3));
        assert_eq!(s, "abc");
    }
}

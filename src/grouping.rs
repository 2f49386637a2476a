use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::db::SensorDataRecord;

/// Readings older than this many seconds are considered stale.
pub const MAX_READING_AGE_SECS: i64 = 5 * 60;

/// station -> controller -> readings
pub type PhysicalGroups<'a> = BTreeMap<&'a str, BTreeMap<&'a str, Vec<&'a SensorDataRecord>>>;

/// sensor type -> readings
pub type LogicalGroups<'a> = BTreeMap<&'a str, Vec<&'a SensorDataRecord>>;

pub fn group_physically(records: &[SensorDataRecord]) -> PhysicalGroups<'_> {
    let mut grouped = PhysicalGroups::new();
    for record in records {
        grouped
            .entry(record.station.as_str())
            .or_default()
            .entry(record.controller.as_str())
            .or_default()
            .push(record);
    }
    grouped
}

pub fn group_logically(records: &[SensorDataRecord]) -> LogicalGroups<'_> {
    let mut grouped = LogicalGroups::new();
    for record in records {
        grouped
            .entry(record.sensor_type.as_str())
            .or_default()
            .push(record);
    }
    grouped
}

/// Whether a reading stamped `timestamp` (Unix seconds) is at most `max_age`
/// old at `now`. Timestamps in the future count as fresh, timestamps chrono
/// cannot represent do not.
pub fn is_fresh(timestamp: u64, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
    let Some(at) = i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    else {
        return false;
    };

    now - at <= max_age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        station: &str,
        controller: &str,
        sensor_type: &str,
        sensor_id: &str,
    ) -> SensorDataRecord {
        SensorDataRecord {
            station: station.to_owned(),
            controller: controller.to_owned(),
            sensor_id: sensor_id.to_owned(),
            sensor_type: sensor_type.to_owned(),
            value: 1.0,
            unit: "C".to_owned(),
            pin: 0,
            timestamp: 1_719_000_000,
        }
    }

    fn records() -> Vec<SensorDataRecord> {
        vec![
            record("garden-hydrant", "primary", "temperature", "t1"),
            record("garden-hydrant", "primary", "flow", "f1"),
            record("garden-hydrant", "backup", "temperature", "t2"),
            record("greenhouse", "primary", "humidity", "h1"),
        ]
    }

    #[test]
    fn test_group_physically() {
        let records = records();
        let grouped = group_physically(&records);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["garden-hydrant"].len(), 2);
        let ids: Vec<&str> = grouped["garden-hydrant"]["primary"]
            .iter()
            .map(|r| r.sensor_id.as_str())
            .collect();
        assert_eq!(ids, ["t1", "f1"]);
        assert_eq!(grouped["greenhouse"]["primary"][0].sensor_id, "h1");
    }

    #[test]
    fn test_group_logically() {
        let records = records();
        let grouped = group_logically(&records);

        let types: Vec<&str> = grouped.keys().copied().collect();
        assert_eq!(types, ["flow", "humidity", "temperature"]);
        let ids: Vec<&str> = grouped["temperature"]
            .iter()
            .map(|r| r.sensor_id.as_str())
            .collect();
        assert_eq!(ids, ["t1", "t2"]);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_physically(&[]).is_empty());
        assert!(group_logically(&[]).is_empty());
    }

    #[test]
    fn test_is_fresh() {
        let now = DateTime::from_timestamp(1_719_000_000, 0).unwrap();
        let max_age = TimeDelta::seconds(MAX_READING_AGE_SECS);

        assert!(is_fresh(1_719_000_000, now, max_age));
        assert!(is_fresh(1_719_000_000 - 300, now, max_age));
        assert!(!is_fresh(1_719_000_000 - 301, now, max_age));
        assert!(is_fresh(1_719_000_060, now, max_age));
        assert!(!is_fresh(u64::MAX, now, max_age));
    }
}

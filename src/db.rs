use anyhow::Context;
use chrono::Utc;
use rusqlite::{Connection, Transaction};
use serde::Deserialize;

use crate::{
    identity::{COMMAND_TOPIC_PREFIX, TOPIC_PREFIX},
    publish::Publisher,
};

pub const JOURNAL_FILE: &str = "./controlcore-journal.db";

/// Pin recorded when a data payload does not name one.
pub const UNKNOWN_PIN: i32 = -1;

/// A message as it was handed to the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub topic: String,
    pub payload: String,
    pub published_at: String,
}

/// A decoded `controlcore/data/...` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorDataRecord {
    pub station: String,
    pub controller: String,
    pub sensor_id: String,
    #[serde(rename = "type", default)]
    pub sensor_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "unknown_pin")]
    pub pin: i32,
    #[serde(default = "now_secs")]
    pub timestamp: u64,
}

/// A decoded `controlcore/command/...` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlRecord {
    pub station: String,
    pub controller: String,
    pub sensor_id: String,
    #[serde(default)]
    pub sensor_type: String,
    pub command: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub requestor_id: String,
    #[serde(default = "now_secs")]
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    SensorData,
    Control,
}

fn unknown_pin() -> i32 {
    UNKNOWN_PIN
}

fn now_secs() -> u64 {
    Utc::now().timestamp().try_into().unwrap_or_default()
}

/// Local message sink that records every published message in SQLite and
/// decodes data and command payloads into their own tables.
#[derive(Debug)]
pub struct Journal {
    conn: Connection,
}

impl Journal {
    pub fn open(path: &str) -> Result<Self, anyhow::Error> {
        let conn = Connection::open(path).context("Failed to open journal file")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, anyhow::Error> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory journal")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), anyhow::Error> {
        self.conn
            .execute_batch(
                r"
                CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    topic TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    published_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS sensor_data (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    sensor_id TEXT NOT NULL,
                    controller_id TEXT NOT NULL,
                    station_id TEXT NOT NULL,
                    sensor_type TEXT NOT NULL,
                    pin INTEGER NOT NULL,
                    value REAL NOT NULL,
                    unit TEXT NOT NULL,
                    timestamp INTEGER NOT NULL,
                    received_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS control_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    station TEXT NOT NULL,
                    controller_id TEXT NOT NULL,
                    sensor_id TEXT NOT NULL,
                    sensor_type TEXT NOT NULL,
                    command TEXT NOT NULL,
                    value REAL,
                    unit TEXT NOT NULL,
                    source TEXT NOT NULL,
                    requestor_id TEXT NOT NULL,
                    timestamp INTEGER NOT NULL,
                    received_at TEXT NOT NULL
                );
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    /// Records `payload` and decodes it into `sensor_data` or `control_log`
    /// depending on the topic prefix. Nothing is written if the topic is
    /// unknown or the payload does not decode.
    pub fn ingest(&mut self, topic: &str, payload: &str) -> Result<MessageKind, anyhow::Error> {
        let kind = classify(topic).with_context(|| format!("Unknown topic: {topic}"))?;
        let received_at = Utc::now().to_rfc3339();

        let tx = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        tx.execute(
            r"
            INSERT INTO messages (topic, payload, published_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![topic, payload, received_at],
        )
        .context("Failed to insert message into journal")?;

        match kind {
            MessageKind::SensorData => {
                let record: SensorDataRecord =
                    serde_json::from_str(payload).context("Invalid sensor data payload")?;
                insert_sensor_data(&tx, &record, &received_at)?;
            }
            MessageKind::Control => {
                let record: ControlRecord =
                    serde_json::from_str(payload).context("Invalid control payload")?;
                insert_control_log(&tx, &record, &received_at)?;
            }
        }

        tx.commit().context("Failed to commit journal entry")?;

        Ok(kind)
    }

    /// Newest entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>, anyhow::Error> {
        let mut stmt = self
            .conn
            .prepare(
                r"
                SELECT topic, payload, published_at FROM messages ORDER BY id DESC LIMIT ?1",
            )
            .context("Failed to prepare journal query")?;

        let entries = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(JournalEntry {
                    topic: row.get(0)?,
                    payload: row.get(1)?,
                    published_at: row.get(2)?,
                })
            })
            .context("Failed to query journal")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read journal row")?;

        Ok(entries)
    }

    /// Newest rows first.
    pub fn recent_sensor_data(
        &self,
        limit: usize,
    ) -> Result<Vec<SensorDataRecord>, anyhow::Error> {
        let mut stmt = self
            .conn
            .prepare(
                r"
                SELECT station_id, controller_id, sensor_id, sensor_type, value, unit, pin, timestamp
                FROM sensor_data ORDER BY id DESC LIMIT ?1",
            )
            .context("Failed to prepare sensor data query")?;

        let records = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(SensorDataRecord {
                    station: row.get(0)?,
                    controller: row.get(1)?,
                    sensor_id: row.get(2)?,
                    sensor_type: row.get(3)?,
                    value: row.get(4)?,
                    unit: row.get(5)?,
                    pin: row.get(6)?,
                    timestamp: row.get::<_, i64>(7)? as u64,
                })
            })
            .context("Failed to query sensor data")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read sensor data row")?;

        Ok(records)
    }

    /// Newest rows first.
    pub fn recent_control_log(
        &self,
        limit: usize,
    ) -> Result<Vec<ControlRecord>, anyhow::Error> {
        let mut stmt = self
            .conn
            .prepare(
                r"
                SELECT station, controller_id, sensor_id, sensor_type, command, value, unit,
                    source, requestor_id, timestamp
                FROM control_log ORDER BY id DESC LIMIT ?1",
            )
            .context("Failed to prepare control log query")?;

        let records = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(ControlRecord {
                    station: row.get(0)?,
                    controller: row.get(1)?,
                    sensor_id: row.get(2)?,
                    sensor_type: row.get(3)?,
                    command: row.get(4)?,
                    value: row.get(5)?,
                    unit: row.get(6)?,
                    source: row.get(7)?,
                    requestor_id: row.get(8)?,
                    timestamp: row.get::<_, i64>(9)? as u64,
                })
            })
            .context("Failed to query control log")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read control log row")?;

        Ok(records)
    }
}

fn classify(topic: &str) -> Option<MessageKind> {
    let under = |prefix: &str| {
        topic
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
    };

    if under(TOPIC_PREFIX) {
        Some(MessageKind::SensorData)
    } else if under(COMMAND_TOPIC_PREFIX) {
        Some(MessageKind::Control)
    } else {
        None
    }
}

fn insert_sensor_data(
    tx: &Transaction<'_>,
    record: &SensorDataRecord,
    received_at: &str,
) -> Result<(), anyhow::Error> {
    tx.execute(
        r"
        INSERT INTO sensor_data (
            sensor_id, controller_id, station_id, sensor_type, pin, value, unit, timestamp, received_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            record.sensor_id,
            record.controller,
            record.station,
            record.sensor_type,
            record.pin,
            record.value,
            record.unit,
            record.timestamp as i64,
            received_at,
        ],
    )
    .context("Failed to insert sensor data")?;
    Ok(())
}

fn insert_control_log(
    tx: &Transaction<'_>,
    record: &ControlRecord,
    received_at: &str,
) -> Result<(), anyhow::Error> {
    tx.execute(
        r"
        INSERT INTO control_log (
            station, controller_id, sensor_id, sensor_type, command, value, unit,
            source, requestor_id, timestamp, received_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            record.station,
            record.controller,
            record.sensor_id,
            record.sensor_type,
            record.command,
            record.value,
            record.unit,
            record.source,
            record.requestor_id,
            record.timestamp as i64,
            received_at,
        ],
    )
    .context("Failed to insert control log")?;
    Ok(())
}

impl Publisher for Journal {
    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        match self.ingest(topic, payload) {
            Ok(MessageKind::SensorData) => {
                log::debug!("Logged sensor data on {topic}");
                true
            }
            Ok(MessageKind::Control) => {
                log::debug!("Logged control command on {topic}");
                true
            }
            Err(e) => {
                log::error!("{e:#}");
                false
            }
        }
    }
}

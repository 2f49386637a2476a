use std::time::Duration;

use anyhow::Context;
use backon::{BlockingRetryable, ConstantBuilder};
use chrono::Utc;
use controlcore_node::db::{JOURNAL_FILE, Journal};
use controlcore_node::identity::{Identity, SensorIdentifier, build_sensor_id};
use controlcore_node::publish::publish_reading;
use controlcore_node::reading::Reading;
use controlcore_node::sensor::ThermalZone;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(60);
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(100);
pub const READ_RETRY_TIMES: usize = 20;

pub const SENSOR_TYPE: &str = "temperature";
pub const SENSOR_NAME: &str = "cpu";
pub const SENSOR_UNIT: &str = "C";
/// The thermal zone is not wired to a GPIO pin.
pub const SENSOR_PIN: i32 = -1;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logger()?;

    if let Err(e) = run().await {
        log::error!("{e:#}");
    }

    Ok(())
}

fn init_logger() -> Result<(), anyhow::Error> {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .map_err(|_| anyhow::anyhow!("Failed to set time offset to local"))?
        .build();

    TermLogger::init(
        LevelFilter::Info,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")
}

fn log_retry(e: &anyhow::Error, dur: Duration) {
    log::warn!("{e:#}, retrying in {dur:?}");
}

/// Reads the thermal zone, retrying transient read failures.
fn sample(zone: &ThermalZone, sensor_id: &SensorIdentifier) -> Result<Reading, anyhow::Error> {
    let retry = ConstantBuilder::default()
        .with_delay(READ_RETRY_DELAY)
        .with_max_times(READ_RETRY_TIMES);

    let value = (|| zone.read_celsius())
        .retry(retry)
        .notify(log_retry)
        .call()
        .context("Failed to read thermal zone")?;

    let timestamp: u64 = Utc::now().timestamp().try_into().unwrap_or_default();

    Ok(Reading::new(
        sensor_id,
        SENSOR_TYPE,
        value,
        SENSOR_UNIT,
        SENSOR_PIN,
        timestamp,
    ))
}

pub async fn run() -> Result<(), anyhow::Error> {
    let identity = Identity::default();
    let sensor_id = build_sensor_id(&identity, SENSOR_TYPE, SENSOR_NAME);
    if sensor_id.is_truncated() {
        log::warn!("Sensor id was truncated to {sensor_id}");
    }
    log::info!("Publishing as {sensor_id}");

    let zone = ThermalZone::default();

    let mut journal = Journal::open(JOURNAL_FILE).context("Failed to open journal")?;
    journal.init().context("Failed to initialize journal")?;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
        loop {
            ticker.tick().await;

            let reading = match sample(&zone, &sensor_id) {
                Ok(reading) => reading,
                Err(e) => {
                    log::error!("{e:#}");
                    continue;
                }
            };

            // A lost reading is tolerated; the next tick publishes a fresh one.
            match publish_reading(&identity, &mut journal, &reading) {
                Ok(()) => log::info!("{reading:?}"),
                Err(e) => log::error!("Failed to publish reading: {e}"),
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl+C signal")?;

    Ok(())
}

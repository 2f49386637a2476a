use crate::{command::ControlMessage, identity::Identity, reading::Reading};

/// Anything that can deliver a payload on a topic, e.g. a connected MQTT client.
pub trait Publisher {
    /// Returns `false` if the message was not accepted.
    fn publish(&mut self, topic: &str, payload: &str) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Topic is {len} bytes long, limit is {max}")]
    TopicTooLong { len: usize, max: usize },

    #[error("Value {0} is not a finite number")]
    NonFiniteValue(f32),

    #[error("Failed to publish to {topic}")]
    PublishFailed { topic: String },
}

/// Data topic for a sensor: `<prefix>/<station>/<sensor_id>`.
pub fn build_topic(identity: &Identity, sensor_id: &str) -> Result<String, PublishError> {
    checked_topic(identity, identity.topic_prefix(), sensor_id)
}

/// Command topic for a sensor: `<command prefix>/<station>/<sensor_id>`.
pub fn build_command_topic(
    identity: &Identity,
    sensor_id: &str,
) -> Result<String, PublishError> {
    checked_topic(identity, identity.command_topic_prefix(), sensor_id)
}

fn checked_topic(
    identity: &Identity,
    prefix: &str,
    sensor_id: &str,
) -> Result<String, PublishError> {
    let topic = format!("{}/{}/{}", prefix, identity.station_name(), sensor_id);

    if topic.len() > identity.max_topic_len() {
        return Err(PublishError::TopicTooLong {
            len: topic.len(),
            max: identity.max_topic_len(),
        });
    }

    Ok(topic)
}

/// Renders `reading` as a JSON object with a fixed key order and the value
/// rounded to two decimals.
pub fn build_payload(identity: &Identity, reading: &Reading) -> Result<String, PublishError> {
    let value = fixed_2(reading.value)?;

    Ok(format!(
        r#"{{"station":{},"controller":{},"sensor_id":{},"value":{},"unit":{},"type":{},"pin":{},"timestamp":{}}}"#,
        json_string(identity.station_name()),
        json_string(identity.controller_id()),
        json_string(&reading.sensor_id),
        value,
        json_string(&reading.unit),
        json_string(&reading.sensor_type),
        reading.pin,
        reading.timestamp,
    ))
}

/// Same conventions as [`build_payload`], with the command fields.
pub fn build_command_payload(
    identity: &Identity,
    message: &ControlMessage,
) -> Result<String, PublishError> {
    let value = fixed_2(message.value)?;

    Ok(format!(
        r#"{{"station":{},"controller":{},"sensor_id":{},"sensor_type":{},"unit":{},"value":{},"command":{},"source":{},"requestor_id":{},"timestamp":{}}}"#,
        json_string(identity.station_name()),
        json_string(identity.controller_id()),
        json_string(&message.sensor_id),
        json_string(&message.sensor_type),
        json_string(&message.unit),
        value,
        json_string(&message.command),
        json_string(&message.source),
        json_string(&message.requestor_id),
        message.timestamp,
    ))
}

/// `{:.2}` rounds the exact binary value half to even: 0.125 -> 0.12.
fn fixed_2(value: f32) -> Result<String, PublishError> {
    if !value.is_finite() {
        return Err(PublishError::NonFiniteValue(value));
    }
    Ok(format!("{value:.2}"))
}

/// Quoted and escaped JSON string literal.
fn json_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Builds the topic and payload for `reading` and makes a single publish attempt.
pub fn publish_reading<P: Publisher + ?Sized>(
    identity: &Identity,
    client: &mut P,
    reading: &Reading,
) -> Result<(), PublishError> {
    let topic = build_topic(identity, &reading.sensor_id)?;
    let payload = build_payload(identity, reading)?;

    send(client, topic, &payload)
}

/// Builds the command topic and payload for `message` and makes a single
/// publish attempt.
pub fn publish_command<P: Publisher + ?Sized>(
    identity: &Identity,
    client: &mut P,
    message: &ControlMessage,
) -> Result<(), PublishError> {
    let topic = build_command_topic(identity, &message.sensor_id)?;
    let payload = build_command_payload(identity, message)?;

    send(client, topic, &payload)
}

fn send<P: Publisher + ?Sized>(
    client: &mut P,
    topic: String,
    payload: &str,
) -> Result<(), PublishError> {
    if !client.publish(&topic, payload) {
        return Err(PublishError::PublishFailed { topic });
    }

    log::debug!("Published {payload} to {topic}");

    Ok(())
}

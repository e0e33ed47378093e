//! Mapping between MQTT topics and controller events

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ledstrip_rules_lib::{parse_payload, Channel, Event, EventKind, Outbound, Result};
use log::debug;
use rumqttc::{QoS, SubscribeFilter};
use serde_json::json;

pub const CONFIG: &str = "plugin/led-strip/config";
pub const DATA: &str = "plugin/led-strip/data";
pub const DATA_SET: &str = "plugin/led-strip/data/set";
pub const DATA_SET_OK: &str = "plugin/led-strip/data/set/ok";
pub const DATA_GET: &str = "plugin/led-strip/data/get";
pub const STRIP_SET: &str = "nodes/base/led-strip/-/set";
pub const STRIP_CONFIG_SET: &str = "nodes/base/led-strip/-/config/set";
const LEGACY_SET: &str = "plugin/led-strip/set";
const LEGACY_CONFIG_SET: &str = "plugin/led-strip/config/set";

const THERMOMETERS: [&str; 2] = [
    "nodes/remote/thermometer/i2c0-49",
    "nodes/remote/thermometer/i2c1-49",
];
const HUMIDITY_SENSORS: [&str; 2] = [
    "nodes/remote/humidity-sensor/i2c0-40",
    "nodes/remote/humidity-sensor/i2c1-40",
];

/// Filters subscribed on every (re)connect
pub const SUBSCRIPTIONS: [&str; 7] = [
    CONFIG,
    "plugin/led-strip/data/+",
    "nodes/remote/+/+",
    "nodes/base/+/+",
    STRIP_CONFIG_SET,
    LEGACY_CONFIG_SET,
    LEGACY_SET,
];

/// All subscriptions, sent as one request
#[must_use]
pub fn subscription_filters() -> Vec<SubscribeFilter> {
    SUBSCRIPTIONS
        .iter()
        .map(|topic| SubscribeFilter::new((*topic).to_string(), QoS::AtMostOnce))
        .collect()
}

/// An outgoing publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Turn an incoming publish into an [`Event`].
///
/// Returns `Ok(None)` for topics this plugin does not handle. The payload is
/// only decoded once the topic is known.
///
/// # Errors
/// Returns a parse error if a handled topic carries a payload that is not JSON.
pub fn route(topic: &str, payload: &[u8]) -> Result<Option<Event>> {
    if topic == DATA_GET {
        return Ok(Some(Event::DataGet));
    }
    if topic == CONFIG && payload.is_empty() {
        return Ok(Some(Event::ConfigReset));
    }

    let telemetry_channel = if THERMOMETERS.contains(&topic) {
        Some(Channel::Temperature)
    } else if HUMIDITY_SENSORS.contains(&topic) {
        Some(Channel::RelativeHumidity)
    } else {
        None
    };

    let handled = telemetry_channel.is_some()
        || [CONFIG, DATA_SET, STRIP_CONFIG_SET, LEGACY_SET, LEGACY_CONFIG_SET].contains(&topic);
    if !handled {
        debug!("Ignoring {topic}");
        return Ok(None);
    }

    let value = parse_payload(payload)?;

    if let Some(channel) = telemetry_channel {
        return Ok(Some(Event::Telemetry {
            channel,
            payload: value,
        }));
    }

    let event = match topic {
        CONFIG => Some(Event::ConfigReplace(value)),
        DATA_SET => Some(Event::DataUpdate(value)),
        STRIP_CONFIG_SET => Some(Event::StripConfig(value)),
        LEGACY_SET if value.get("color").is_some() => Some(Event::DataUpdate(value)),
        LEGACY_CONFIG_SET if value.get("brightness").is_some() => Some(Event::DataUpdate(value)),
        _ => {
            debug!("Ignoring legacy {topic} without a usable field");
            None
        }
    };
    Ok(event)
}

/// Where to report a rejected event that arrived on `topic`
#[must_use]
pub fn error_topic(kind: EventKind, topic: &str) -> String {
    match kind {
        // Legacy aliases report on the topic they were rewritten to
        EventKind::Data => format!("{DATA_SET}/error"),
        EventKind::StripConfig => format!("{topic}/error"),
        EventKind::Telemetry(_) | EventKind::Config => format!("{topic}/-/error"),
    }
}

/// Serialize an effect for publishing. `source_topic` is the topic of the
/// event that produced it.
///
/// # Errors
/// Fails only if serialization fails.
pub fn to_message(outbound: &Outbound, source_topic: &str) -> serde_json::Result<Message> {
    let (topic, payload) = match outbound {
        Outbound::Pixels(pixels) => (
            STRIP_SET.to_string(),
            json!({ "pixels": BASE64.encode(pixels) }),
        ),
        Outbound::DataAccepted(update) => (DATA_SET_OK.to_string(), serde_json::to_value(update)?),
        Outbound::DataSnapshot(snapshot) => (DATA.to_string(), serde_json::to_value(snapshot)?),
        Outbound::Rejected(rejection) => (
            error_topic(rejection.kind, source_topic),
            json!({ "msg": rejection.message() }),
        ),
    };
    Ok(Message {
        topic,
        payload: serde_json::to_vec(&payload)?,
    })
}

//! Event dispatch.
//!
//! [`Controller`] owns the whole session: the accepted state and the telemetry
//! tracker. Each inbound [`Event`] is handled to completion and produces a list
//! of [`Outbound`] effects for the transport to publish, in order.
//!
//! A rejected event never touches state. The only effect it produces is an
//! [`Outbound::Rejected`] describing why.

use std::time::Instant;

use log::{debug, error, info};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::rules::RuleSet;
use crate::staleness::{Channel, StalenessTracker};
use crate::state::{ControllerState, DataSnapshot, DataUpdate, StripConfig};
use crate::validate::validate;

/// Inbound events, already routed but not yet validated
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Sensor payload such as `{"temperature": [21.5, "℃"]}`
    Telemetry { channel: Channel, payload: Value },
    /// Full replacement of the rule-set configuration
    ConfigReplace(Value),
    /// Go back to the built-in rule-set
    ConfigReset,
    DataUpdate(Value),
    StripConfig(Value),
    DataGet,
}

/// Which kind of input a rejection refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Telemetry(Channel),
    Config,
    Data,
    StripConfig,
}

impl EventKind {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Telemetry(channel) => channel.key(),
            Self::Config => "config",
            Self::Data => "data",
            Self::StripConfig => "led-strip config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: EventKind,
    pub error: Error,
}

impl Rejection {
    /// Human readable message, e.g. `Invalid data: brightness out of range`
    #[must_use]
    pub fn message(&self) -> String {
        format!("Invalid {}: {}", self.kind.describe(), self.error)
    }
}

/// Effects produced by handling an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded strip buffer
    Pixels(Vec<u8>),
    /// The fields of a data update that were applied
    DataAccepted(DataUpdate),
    DataSnapshot(DataSnapshot),
    Rejected(Rejection),
}

/// Decode a raw bus payload as JSON.
///
/// # Errors
/// Returns [`Error::Parse`] if the payload is not UTF-8 JSON.
pub fn parse_payload(payload: &[u8]) -> Result<Value> {
    serde_json::from_slice(payload).map_err(|e| Error::parse(format!("malformed payload: {e}")))
}

/// Extract the first element of `payload[channel]` as a finite number.
///
/// Sensors send `[value, unit]`; the value may also arrive as a numeric string.
///
/// # Errors
/// Returns [`Error::Value`] for a missing key, a non-list value, or a value
/// that is not a finite number.
pub fn parse_telemetry(channel: Channel, payload: &Value) -> Result<f64> {
    let key = channel.key();
    let first = payload
        .get(key)
        .ok_or_else(|| Error::value(format!("missing key: {key}")))?
        .as_array()
        .ok_or_else(|| Error::value(format!("{key} must be type list")))?
        .first()
        .ok_or_else(|| Error::value(format!("{key} is empty")))?;

    let value = match first {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::value(format!("could not convert {first} to float")))
}

/// Session state plus the logic to drive it from events
#[derive(Debug, Clone, Default)]
pub struct Controller {
    state: ControllerState,
    tracker: StalenessTracker,
}

impl Controller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &ControllerState {
        &self.state
    }

    #[must_use]
    pub const fn tracker(&self) -> &StalenessTracker {
        &self.tracker
    }

    /// Handle one event. `now` is the single timestamp used for the whole event.
    pub fn handle(&mut self, event: Event, now: Instant) -> Vec<Outbound> {
        let kind = match &event {
            Event::Telemetry { channel, .. } => EventKind::Telemetry(*channel),
            Event::ConfigReplace(_) | Event::ConfigReset => EventKind::Config,
            Event::DataUpdate(_) => EventKind::Data,
            Event::StripConfig(_) => EventKind::StripConfig,
            Event::DataGet => {
                debug!("Data snapshot requested");
                return vec![Outbound::DataSnapshot(self.state.snapshot())];
            }
        };

        let mut outbound = match self.apply(event, now) {
            Ok(outbound) => outbound,
            Err(error) => {
                let rejection = Rejection { kind, error };
                error!("{}", rejection.message());
                return vec![Outbound::Rejected(rejection)];
            }
        };

        if let Some(pixels) = self.state.render(&self.tracker, now) {
            outbound.push(Outbound::Pixels(pixels));
        } else {
            debug!("No color resolved, leaving strip unchanged");
        }
        outbound
    }

    /// Validate and apply an event, returning effects that precede the redraw
    fn apply(&mut self, event: Event, now: Instant) -> Result<Vec<Outbound>> {
        match event {
            Event::Telemetry { channel, payload } => {
                let value = parse_telemetry(channel, &payload)?;
                debug!("{}: {value}", channel.key());
                self.tracker.record(channel, value, now);
                Ok(Vec::new())
            }
            Event::ConfigReplace(raw) => {
                let rule_set = validate(raw)?;
                self.state.apply_config(rule_set);
                Ok(Vec::new())
            }
            Event::ConfigReset => {
                info!("Empty config received, restoring default rules");
                self.state.apply_config(RuleSet::default());
                Ok(Vec::new())
            }
            Event::DataUpdate(raw) => {
                let update = DataUpdate::from_json(&raw)?;
                if update.is_empty() {
                    return Ok(Vec::new());
                }
                self.state.apply_update(&update);
                Ok(vec![Outbound::DataAccepted(update)])
            }
            Event::StripConfig(raw) => {
                let strip = StripConfig::from_json(&raw)?;
                self.state.apply_strip_config(strip);
                Ok(Vec::new())
            }
            Event::DataGet => Ok(vec![Outbound::DataSnapshot(self.state.snapshot())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::pixels::ChannelMode;
    use crate::state::Mode;
    use serde_json::json;
    use std::time::Duration;

    fn pixels(outbound: &[Outbound]) -> Option<&[u8]> {
        outbound.iter().find_map(|o| match o {
            Outbound::Pixels(p) => Some(p.as_slice()),
            _ => None,
        })
    }

    fn rejection(outbound: &[Outbound]) -> &Rejection {
        match outbound {
            [Outbound::Rejected(r)] => r,
            other => panic!("expected a single rejection, got {other:?}"),
        }
    }

    fn humidity(value: f64) -> Event {
        Event::Telemetry {
            channel: Channel::RelativeHumidity,
            payload: json!({"relative-humidity": [value, "%"]}),
        }
    }

    #[test]
    fn test_humid_reading_turns_strip_green() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(humidity(65.0), now);
        let buf = pixels(&out).unwrap();
        assert_eq!(buf.len(), 144 * 4);
        assert_eq!(&buf[..4], &[0, 255, 0, 0]);
    }

    #[test]
    fn test_expired_reading_falls_back_to_warm_white() {
        let t0 = Instant::now();
        let mut controller = Controller::new();
        controller.handle(humidity(65.0), t0);

        // Any successful event triggers a redraw; a strip config is a cheap one
        let out = controller.handle(
            Event::StripConfig(json!({"mode": "rgbw", "count": 1})),
            t0 + Duration::from_secs(181),
        );
        assert_eq!(pixels(&out), Some(&[0u8, 0, 0, 230][..]));
    }

    #[test]
    fn test_data_update_echo_precedes_pixels() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(
            Event::DataUpdate(json!({"state": "color", "color": [10, 20, 30, 40]})),
            now,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            Outbound::DataAccepted(DataUpdate {
                color: Some(Color::new(10, 20, 30, 40)),
                state: Some(Mode::Color),
                brightness: None,
            })
        );
        assert!(matches!(out[1], Outbound::Pixels(_)));
    }

    #[test]
    fn test_empty_data_update_redraws_without_echo() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(Event::DataUpdate(json!({"unrelated": 1})), now);
        assert!(out.iter().all(|o| matches!(o, Outbound::Pixels(_))));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_manual_color_on_three_pixel_strip() {
        let now = Instant::now();
        let mut controller = Controller::new();
        controller.handle(Event::StripConfig(json!({"mode": "rgbw", "count": 3})), now);
        let out = controller.handle(
            Event::DataUpdate(json!({"state": "color", "color": [10, 20, 30, 40], "brightness": 255})),
            now,
        );
        assert_eq!(pixels(&out), Some(&[10u8, 20, 30, 40, 10, 20, 30, 40, 10, 20, 30, 40][..]));
    }

    #[test]
    fn test_disabled_publishes_no_pixels() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(Event::DataUpdate(json!({"state": "disable"})), now);
        assert_eq!(pixels(&out), None);

        let out = controller.handle(humidity(65.0), now);
        assert!(out.is_empty());
    }

    #[test]
    fn test_rejected_events_leave_state_untouched() {
        let now = Instant::now();
        let mut controller = Controller::new();
        controller.handle(humidity(40.0), now);
        let before_state = controller.state().clone();
        let before_reading = controller.tracker().last_reading(Channel::RelativeHumidity);

        let bad_events = [
            Event::ConfigReplace(json!({"rules": [{"color": [0, 0, 0]}]})),
            Event::ConfigReplace(json!({"rules": []})),
            Event::DataUpdate(json!({"brightness": 300, "state": "color"})),
            Event::DataUpdate(json!({"color": [1, 2, 3, 4], "state": "off"})),
            Event::StripConfig(json!({"mode": "grb", "count": 10})),
            Event::StripConfig(json!({"mode": "rgb", "count": 0})),
            humidity_payload(json!({"relative-humidity": ["wet"]})),
            humidity_payload(json!({"temperature": [20]})),
        ];
        for event in bad_events {
            let out = controller.handle(event.clone(), now + Duration::from_secs(1));
            rejection(&out);
            assert_eq!(controller.state(), &before_state, "{event:?}");
            assert_eq!(
                controller.tracker().last_reading(Channel::RelativeHumidity),
                before_reading
            );
        }
    }

    fn humidity_payload(payload: Value) -> Event {
        Event::Telemetry {
            channel: Channel::RelativeHumidity,
            payload,
        }
    }

    #[test]
    fn test_rejection_messages() {
        let now = Instant::now();
        let mut controller = Controller::new();

        let out = controller.handle(Event::DataUpdate(json!({"brightness": 300})), now);
        let r = rejection(&out);
        assert_eq!(r.kind, EventKind::Data);
        assert_eq!(r.message(), "Invalid data: brightness out of range");

        let out = controller.handle(Event::ConfigReplace(json!({"rules": [{}]})), now);
        assert_eq!(
            rejection(&out).message(),
            "Invalid config: rule 0: empty rule not allowed"
        );

        let out = controller.handle(Event::StripConfig(json!({"count": 3})), now);
        assert_eq!(
            rejection(&out).message(),
            "Invalid led-strip config: mode values is rgb or rgbw"
        );

        let out = controller.handle(
            Event::Telemetry {
                channel: Channel::Temperature,
                payload: json!({"temperature": [null]}),
            },
            now,
        );
        assert_eq!(
            rejection(&out).message(),
            "Invalid temperature: could not convert null to float"
        );
    }

    #[test]
    fn test_config_replace_and_reset() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(
            Event::ConfigReplace(json!({"rules": [{"color": [1, 1, 1, 1]}]})),
            now,
        );
        assert_eq!(pixels(&out).map(|p| &p[..4]), Some(&[1u8, 1, 1, 1][..]));
        assert_eq!(controller.state().rule_set().len(), 1);

        controller.handle(Event::ConfigReset, now);
        assert_eq!(controller.state().rule_set(), &RuleSet::default());
    }

    #[test]
    fn test_data_get_returns_snapshot_only() {
        let now = Instant::now();
        let mut controller = Controller::new();
        controller.handle(Event::DataUpdate(json!({"brightness": 42})), now);
        let out = controller.handle(Event::DataGet, now);
        assert_eq!(out, vec![Outbound::DataSnapshot(controller.state().snapshot())]);
        assert_eq!(controller.state().snapshot().brightness, 42);
    }

    #[test]
    fn test_oversized_strip_is_rejected_without_rendering() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(
            Event::StripConfig(json!({"mode": "rgbw", "count": 4_611_686_018_427_387_904u64})),
            now,
        );
        assert_eq!(
            rejection(&out).message(),
            "Invalid led-strip config: count out of range"
        );
        assert_eq!(controller.state().strip().count, 144);

        // Later events still render the previous geometry
        let out = controller.handle(humidity(65.0), now);
        assert_eq!(pixels(&out).map(<[u8]>::len), Some(144 * 4));
    }

    #[test]
    fn test_strip_config_changes_geometry() {
        let now = Instant::now();
        let mut controller = Controller::new();
        let out = controller.handle(Event::StripConfig(json!({"mode": "rgb", "count": 5})), now);
        assert_eq!(controller.state().strip().mode, ChannelMode::Rgb);
        assert_eq!(pixels(&out).map(<[u8]>::len), Some(15));
    }

    #[test]
    fn test_parse_telemetry() {
        let t = |payload: Value| parse_telemetry(Channel::Temperature, &payload);
        assert_eq!(t(json!({"temperature": [21.5, "\u{2103}"]})), Ok(21.5));
        assert_eq!(t(json!({"temperature": [-4]})), Ok(-4.0));
        assert_eq!(t(json!({"temperature": [" 19.25 "]})), Ok(19.25));
        assert!(t(json!({"temperature": ["NaN"]})).is_err());
        assert!(t(json!({"temperature": []})).is_err());
        assert!(t(json!({"temperature": 21.5})).is_err());
        assert!(t(json!({})).is_err());
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(b"{\"a\": 1}"), Ok(json!({"a": 1})));
        assert!(matches!(parse_payload(b"{nope"), Err(Error::Parse { .. })));
        assert!(matches!(parse_payload(b""), Err(Error::Parse { .. })));
    }
}

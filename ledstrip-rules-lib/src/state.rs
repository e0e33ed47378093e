//! Controller state and the partial updates that mutate it

use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::pixels::{encode, ChannelMode};
use crate::rules::{select_color, RuleSet};
use crate::staleness::StalenessTracker;
use crate::validate::parse_color;

/// What drives the strip color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Color follows the active rule-set and current telemetry
    #[default]
    Rules,
    /// Fixed manual color
    Color,
    /// Nothing is rendered
    #[serde(rename = "disable", alias = "disabled")]
    Disabled,
}

const fn default_brightness() -> u8 {
    255
}

const fn default_manual_color() -> Color {
    Color::new(255, 0, 0, 0)
}

/// Strip length used until the base unit reports its geometry
pub const DEFAULT_STRIP_COUNT: usize = 144;

/// Longest strip accepted from a strip configuration
pub const MAX_STRIP_COUNT: usize = 4096;

/// A partial data update. Absent fields leave the current value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Mode>,
}

impl DataUpdate {
    /// Validate each field of a raw data payload.
    ///
    /// Unrelated keys are ignored. Any invalid field rejects the whole update.
    ///
    /// # Errors
    /// Returns [`Error::Value`] naming the first bad field.
    pub fn from_json(payload: &Value) -> Result<Self> {
        let Value::Object(fields) = payload else {
            return Err(Error::value("data must be type object"));
        };

        let color = fields
            .get("color")
            .map(|c| parse_color(c).ok_or_else(|| Error::value(format!("bad color {c}"))))
            .transpose()?;

        let brightness = fields.get("brightness").map(parse_brightness).transpose()?;

        let state = fields
            .get("state")
            .map(|s| {
                s.as_str()
                    .and_then(|_| Mode::deserialize(s).ok())
                    .ok_or_else(|| Error::value("state values is rules, color or disable"))
            })
            .transpose()?;

        Ok(Self {
            color,
            brightness,
            state,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.color.is_none() && self.brightness.is_none() && self.state.is_none()
    }
}

/// Brightness as a number or an integer string. Fractions are truncated.
fn parse_brightness(value: &Value) -> Result<u8> {
    #[allow(clippy::cast_precision_loss)] // only compared against 0..=255
    let whole = match value {
        Value::Number(n) => n.as_f64().map(f64::trunc),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|i| i as f64),
        _ => None,
    }
    .filter(|b| b.is_finite())
    .ok_or_else(|| Error::value(format!("brightness {value} is not an integer")))?;

    if !(0.0..=255.0).contains(&whole) {
        return Err(Error::value("brightness out of range"));
    }
    // Range checked above
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let brightness = whole as u8;
    Ok(brightness)
}

/// Strip geometry as reported by the base unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StripConfig {
    pub mode: ChannelMode,
    pub count: usize,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::default(),
            count: DEFAULT_STRIP_COUNT,
        }
    }
}

impl StripConfig {
    /// # Errors
    /// Returns [`Error::Value`] if `mode` is not `rgb`/`rgbw` or `count` is not
    /// an integer in `1..=MAX_STRIP_COUNT`.
    pub fn from_json(payload: &Value) -> Result<Self> {
        let mode = payload
            .get("mode")
            .filter(|m| m.is_string())
            .and_then(|m| ChannelMode::deserialize(m).ok())
            .ok_or_else(|| Error::value("mode values is rgb or rgbw"))?;

        let count = payload
            .get("count")
            .and_then(Value::as_u64)
            .filter(|&c| c >= 1)
            .ok_or_else(|| Error::value("count must be a positive integer"))?;
        let count = usize::try_from(count)
            .ok()
            .filter(|&c| c <= MAX_STRIP_COUNT)
            .ok_or_else(|| Error::value("count out of range"))?;

        Ok(Self { mode, count })
    }
}

/// Data topic view of the state, as published on request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSnapshot {
    pub brightness: u8,
    pub state: Mode,
    pub color: Color,
}

/// Everything that decides what the strip shows, apart from telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    mode: Mode,
    brightness: u8,
    manual_color: Color,
    rule_set: RuleSet,
    strip: StripConfig,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            brightness: default_brightness(),
            manual_color: default_manual_color(),
            rule_set: RuleSet::default(),
            strip: StripConfig::default(),
        }
    }
}

impl ControllerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    #[must_use]
    pub const fn manual_color(&self) -> Color {
        self.manual_color
    }

    #[must_use]
    pub const fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    #[must_use]
    pub const fn strip(&self) -> StripConfig {
        self.strip
    }

    /// Replace the active rule-set. `rule_set` must already be validated.
    pub fn apply_config(&mut self, rule_set: RuleSet) {
        info!("Rule-set replaced ({} rules)", rule_set.len());
        self.rule_set = rule_set;
    }

    /// Merge the fields present in `update`
    pub fn apply_update(&mut self, update: &DataUpdate) {
        if let Some(color) = update.color {
            self.manual_color = color;
        }
        if let Some(brightness) = update.brightness {
            self.brightness = brightness;
        }
        if let Some(mode) = update.state {
            if mode != self.mode {
                info!("Mode changed: {:?} -> {mode:?}", self.mode);
            }
            self.mode = mode;
        }
        debug!(
            "Data: mode={:?} brightness={} color={:?}",
            self.mode,
            self.brightness,
            self.manual_color.components()
        );
    }

    pub fn apply_strip_config(&mut self, strip: StripConfig) {
        info!("Strip geometry: {} x {:?}", strip.count, strip.mode);
        self.strip = strip;
    }

    /// The color the strip should show now, or `None` to leave it unchanged
    #[must_use]
    pub fn resolve_color(&self, tracker: &StalenessTracker, now: Instant) -> Option<Color> {
        match self.mode {
            Mode::Disabled => None,
            Mode::Color => Some(match self.strip.mode {
                ChannelMode::Rgb => self.manual_color.without_white(),
                ChannelMode::Rgbw => self.manual_color,
            }),
            Mode::Rules => select_color(&self.rule_set, tracker, now),
        }
    }

    /// Encoded pixel buffer for the current state, if a color resolves
    #[must_use]
    pub fn render(&self, tracker: &StalenessTracker, now: Instant) -> Option<Vec<u8>> {
        let color = self.resolve_color(tracker, now)?;
        Some(encode(color, self.brightness, self.strip.mode, self.strip.count))
    }

    #[must_use]
    pub const fn snapshot(&self) -> DataSnapshot {
        DataSnapshot {
            brightness: self.brightness,
            state: self.mode,
            color: self.manual_color,
        }
    }
}

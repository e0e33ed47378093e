//! Rule-set configuration checking.
//!
//! Raw configuration goes through two passes:
//!
//! 1. [`normalize_config`] rewrites older layouts into the current one:
//!    the rule list used to be called `values`, and the config object used
//!    to carry a `brightness` that now lives in the data topic.
//! 2. [`validate`] applies the strict schema to the normalized object and
//!    builds a [`RuleSet`].
//!
//! Validation stops at the first violation and reports it as
//! [`Error::Schema`].

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::rules::{Range, Rule, RuleSet};
use crate::staleness::Channel;

const RULES_KEY: &str = "rules";
const LEGACY_RULES_KEY: &str = "values";
const LEGACY_BRIGHTNESS_KEY: &str = "brightness";

const RULE_KEYS: [&str; 4] = ["color", "temperature", "relative-humidity", "label"];

/// Map legacy keys onto the current layout. Does not check anything else.
///
/// # Errors
/// Returns [`Error::Schema`] if `raw` is not a JSON object.
pub fn normalize_config(raw: Value) -> Result<Map<String, Value>> {
    let Value::Object(mut config) = raw else {
        return Err(Error::schema("config must be type object"));
    };

    if let Some(values) = config.remove(LEGACY_RULES_KEY) {
        if config.contains_key(RULES_KEY) {
            warn!("Config has both `{RULES_KEY}` and legacy `{LEGACY_RULES_KEY}`, using `{LEGACY_RULES_KEY}`");
        }
        config.insert(RULES_KEY.to_string(), values);
    }

    if config.remove(LEGACY_BRIGHTNESS_KEY).is_some() {
        debug!("Discarding legacy `{LEGACY_BRIGHTNESS_KEY}` from config");
    }

    Ok(config)
}

/// Check a raw configuration and build the rule-set it describes.
///
/// # Errors
/// Returns [`Error::Schema`] describing the first violation found.
pub fn validate(raw: Value) -> Result<RuleSet> {
    let config = normalize_config(raw)?;

    let unknown: Vec<&str> = config
        .keys()
        .map(String::as_str)
        .filter(|key| *key != RULES_KEY)
        .collect();
    if !unknown.is_empty() {
        return Err(Error::schema(format!("unknown key(s): {}", unknown.join(", "))));
    }

    let rows = match config.get(RULES_KEY) {
        None => return Err(Error::schema(format!("missing key: {RULES_KEY}"))),
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(Error::schema(format!("{RULES_KEY} must be type list"))),
    };

    let rules = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            validate_rule(row).map_err(|e| Error::schema(format!("rule {index}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    RuleSet::new(rules)
}

fn validate_rule(row: &Value) -> Result<Rule> {
    let Value::Object(row) = row else {
        return Err(Error::schema("rule must be type object"));
    };
    if row.is_empty() {
        return Err(Error::schema("empty rule not allowed"));
    }

    let unknown: Vec<&str> = row
        .keys()
        .map(String::as_str)
        .filter(|key| !RULE_KEYS.contains(key))
        .collect();
    if !unknown.is_empty() {
        return Err(Error::schema(format!("unknown key(s): {}", unknown.join(", "))));
    }

    let color = row
        .get("color")
        .ok_or_else(|| Error::schema("missing key: color"))?;
    let color = parse_color(color).ok_or_else(|| Error::schema(format!("bad color {color}")))?;

    let label = match row.get("label") {
        None => None,
        Some(Value::String(label)) => Some(label.clone()),
        Some(other) => return Err(Error::schema(format!("label {other} is not type string"))),
    };

    let range_for = |channel: Channel| {
        row.get(channel.key())
            .map(|value| parse_range(channel.key(), value))
            .transpose()
    };

    Ok(Rule {
        color,
        temperature: range_for(Channel::Temperature)?,
        relative_humidity: range_for(Channel::RelativeHumidity)?,
        label,
    })
}

fn parse_range(key: &str, value: &Value) -> Result<Range> {
    let Value::Object(bounds) = value else {
        return Err(Error::schema(format!("key {key} is not type object")));
    };

    let mut range = Range::default();
    for (bound, limit) in bounds {
        let slot = match bound.as_str() {
            "from" => &mut range.from,
            "to" => &mut range.to,
            _ => return Err(Error::schema(format!("unknown key in {key}: {bound}"))),
        };
        let Some(limit) = limit.as_f64() else {
            return Err(Error::schema(format!(
                "value {limit} of key {bound} is not type int or float"
            )));
        };
        *slot = Some(limit);
    }

    if range.is_empty() {
        // Accepted, but almost certainly an authoring mistake
        warn!("Rule condition on {key} has neither `from` nor `to`, it matches any current reading");
    }

    Ok(range)
}

/// Parse a `[r, g, b, w]` array of integers in `0..=255`.
///
/// Shared by rule validation and manual color updates; returns `None` on any
/// shape or range violation so each caller can word its own error.
#[must_use]
pub fn parse_color(value: &Value) -> Option<Color> {
    Color::deserialize(value).ok()
}

//! Threshold rules and first-match color selection

use std::time::Instant;

use log::debug;
use serde::Serialize;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::staleness::{Channel, StalenessTracker};

/// Inclusive bounds on a sensor value.
///
/// Both bounds are optional. A range with neither bound accepts any current
/// value, but still requires the channel to have a fresh reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Range {
    /// Lower bound (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    /// Upper bound (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

impl Range {
    #[must_use]
    pub const fn new(from: Option<f64>, to: Option<f64>) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if self.to.is_some_and(|to| value > to) {
            return false;
        }
        if self.from.is_some_and(|from| value < from) {
            return false;
        }
        true
    }
}

/// A color with optional conditions on temperature and relative humidity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Range>,
    #[serde(rename = "relative-humidity", skip_serializing_if = "Option::is_none")]
    pub relative_humidity: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Rule {
    /// Unconditional rule, typically placed last as a fallback
    #[must_use]
    pub const fn fallback(color: Color) -> Self {
        Self {
            color,
            temperature: None,
            relative_humidity: None,
            label: None,
        }
    }

    #[must_use]
    pub const fn condition(&self, channel: Channel) -> Option<&Range> {
        match channel {
            Channel::Temperature => self.temperature.as_ref(),
            Channel::RelativeHumidity => self.relative_humidity.as_ref(),
        }
    }

    /// Whether every condition this rule declares holds for the current readings.
    ///
    /// A declared condition on a channel without a current reading fails.
    #[must_use]
    pub fn matches(&self, tracker: &StalenessTracker, now: Instant) -> bool {
        Channel::ALL
            .iter()
            .all(|&channel| match self.condition(channel) {
                None => true,
                Some(range) => tracker
                    .current_value(channel, now)
                    .is_some_and(|value| range.contains(value)),
            })
    }
}

/// Ordered, non-empty list of rules. Earlier rules take priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// # Errors
    /// Returns [`Error::Schema`] if `rules` is empty.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::schema("rules must not be empty"));
        }
        Ok(Self { rules })
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl Default for RuleSet {
    /// Humid is green, dry is yellow, hot is red, cold is blue, otherwise warm white
    fn default() -> Self {
        Self {
            rules: vec![
                Rule {
                    relative_humidity: Some(Range::new(Some(60.0), None)),
                    ..Rule::fallback(Color::new(0, 255, 0, 0))
                },
                Rule {
                    relative_humidity: Some(Range::new(None, Some(30.0))),
                    ..Rule::fallback(Color::new(255, 255, 0, 0))
                },
                Rule {
                    temperature: Some(Range::new(Some(26.0), None)),
                    ..Rule::fallback(Color::new(255, 0, 0, 0))
                },
                Rule {
                    temperature: Some(Range::new(None, Some(22.0))),
                    ..Rule::fallback(Color::new(0, 0, 255, 0))
                },
                Rule::fallback(Color::new(0, 0, 0, 230)),
            ],
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Pick the color of the first rule whose conditions all hold.
///
/// `None` means no rule matched; callers should leave the strip as it is
/// rather than blank it (an all-zero color rule is how you turn it off).
#[must_use]
pub fn select_color(rule_set: &RuleSet, tracker: &StalenessTracker, now: Instant) -> Option<Color> {
    let (index, rule) = rule_set
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.matches(tracker, now))?;
    debug!(
        "Rule {index}{} matched, color={:?}",
        rule.label.as_deref().map(|l| format!(" ({l})")).unwrap_or_default(),
        rule.color.components()
    );
    Some(rule.color)
}

//! Last-seen bookkeeping for telemetry channels

use std::time::{Duration, Instant};

/// A reading older than this is treated as if it had never been received
pub const STALENESS_WINDOW: Duration = Duration::from_secs(180);

/// Telemetry channels that rules can compare against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    RelativeHumidity,
}

impl Channel {
    pub const ALL: [Self; 2] = [Self::Temperature, Self::RelativeHumidity];

    /// Key used for this channel in telemetry payloads and rule objects
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::RelativeHumidity => "relative-humidity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub value: f64,
    pub observed_at: Instant,
}

/// Latest reading per channel.
///
/// Writes are last-write-wins with no ordering guard; a reading delivered
/// late simply replaces a newer one.
#[derive(Debug, Clone, Default)]
pub struct StalenessTracker {
    temperature: Option<SensorReading>,
    relative_humidity: Option<SensorReading>,
}

impl StalenessTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, channel: Channel) -> &Option<SensorReading> {
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::RelativeHumidity => &self.relative_humidity,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<SensorReading> {
        match channel {
            Channel::Temperature => &mut self.temperature,
            Channel::RelativeHumidity => &mut self.relative_humidity,
        }
    }

    pub fn record(&mut self, channel: Channel, value: f64, at: Instant) {
        *self.slot_mut(channel) = Some(SensorReading {
            value,
            observed_at: at,
        });
    }

    /// Current value of `channel`, or `None` if it was never seen or has expired.
    ///
    /// A reading exactly [`STALENESS_WINDOW`] old is still current.
    #[must_use]
    pub fn current_value(&self, channel: Channel, now: Instant) -> Option<f64> {
        let reading = self.slot(channel).as_ref()?;
        // `now` before `observed_at` saturates to zero age
        if now.saturating_duration_since(reading.observed_at) > STALENESS_WINDOW {
            None
        } else {
            Some(reading.value)
        }
    }

    /// Raw last reading, regardless of age
    #[must_use]
    pub fn last_reading(&self, channel: Channel) -> Option<SensorReading> {
        *self.slot(channel)
    }
}

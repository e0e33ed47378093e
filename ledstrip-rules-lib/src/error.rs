use derive_more::{Display, Error};

/// Why an inbound event was rejected.
///
/// None of these are fatal: the event is dropped and the previously accepted
/// state stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Error {
    /// Malformed rule-set configuration (unknown key, wrong type, out of range)
    #[display("{message}")]
    Schema { message: String },
    /// Malformed telemetry, data update or strip configuration field
    #[display("{message}")]
    Value { message: String },
    /// Payload is not valid JSON
    #[display("{message}")]
    Parse { message: String },
}

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::Value {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

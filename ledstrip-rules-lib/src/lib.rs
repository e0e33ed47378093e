//! Color selection logic for a telemetry-driven LED strip
//!
//! This library decides what color an LED strip shows based on recent
//! temperature and relative humidity readings, a user-supplied rule-set and
//! manual overrides, and encodes the result as a raw strip buffer. It knows
//! nothing about the message bus and can be tested without a broker.
//!
//! The entry point is [`Controller::handle`], which takes one typed [`Event`]
//! and returns the [`Outbound`] effects to publish.

pub mod color;
pub mod controller;
pub mod error;
pub mod pixels;
pub mod rules;
pub mod staleness;
pub mod state;
pub mod validate;

pub use color::Color;
pub use controller::{parse_payload, Controller, Event, EventKind, Outbound, Rejection};
pub use error::{Error, Result};
pub use pixels::{encode, ChannelMode};
pub use rgb::RGB8;
pub use rules::{select_color, Range, Rule, RuleSet};
pub use staleness::{Channel, StalenessTracker, STALENESS_WINDOW};
pub use state::{ControllerState, DataSnapshot, DataUpdate, Mode, StripConfig};
pub use validate::validate;

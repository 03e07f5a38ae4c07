//! Typed configuration for a request queue.
//!
//! Loads from environment variables or any serde source; unset values fall
//! back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::CourierError;

pub const ENV_DISPATCHERS: &str = "COURIER_DISPATCHERS";
pub const ENV_QUEUE_CAPACITY: &str = "COURIER_QUEUE_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Number of dispatcher loops sharing the work queue.
    pub dispatchers: usize,

    /// `None` means unbounded.
    pub queue_capacity: Option<usize>,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            dispatchers: 3,
            queue_capacity: None,
        }
    }
}

impl CourierConfig {
    /// Load from `COURIER_DISPATCHERS` / `COURIER_QUEUE_CAPACITY`.
    pub fn from_env() -> Result<Self, CourierError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CourierError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_DISPATCHERS) {
            config.dispatchers = parse_count(ENV_DISPATCHERS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_QUEUE_CAPACITY) {
            config.queue_capacity = match raw.trim() {
                "" | "unbounded" => None,
                other => Some(parse_count(ENV_QUEUE_CAPACITY, other)?),
            };
        }
        Ok(config)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize, CourierError> {
    raw.trim()
        .parse()
        .map_err(|e| CourierError::Config(format!("{name}={raw:?}: {e}")))
}

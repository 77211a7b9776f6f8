//! Tunable business rules.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use convene_shared::constants::MAX_IMAGE_SIZE;
use convene_shared::ParseError;

/// What happens when a host confirms more attendees than an event holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// The counter may exceed `max_attendees`.
    #[default]
    Unenforced,
    /// A confirmation past `max_attendees` fails and writes nothing.
    Enforced,
}

impl CapacityPolicy {
    pub fn is_enforced(&self) -> bool {
        matches!(self, CapacityPolicy::Enforced)
    }
}

impl FromStr for CapacityPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unenforced" => Ok(CapacityPolicy::Unenforced),
            "enforced" => Ok(CapacityPolicy::Enforced),
            other => Err(ParseError::UnknownCapacityPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub capacity: CapacityPolicy,
    /// Only attendees with a confirmed conversation may review an event.
    pub review_requires_confirmation: bool,
    /// Largest accepted image, in bytes.
    pub max_image_size: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            capacity: CapacityPolicy::Unenforced,
            review_requires_confirmation: true,
            max_image_size: MAX_IMAGE_SIZE,
        }
    }
}

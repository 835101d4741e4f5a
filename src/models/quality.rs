//! Recall-quality grade on the SM-2 scale.
//!
//! - 0: complete blackout
//! - 1: incorrect, but the answer was recognised
//! - 2: incorrect, but the answer seemed easy once shown
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect response

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;
    /// Lowest grade counted as a successful recall.
    pub const PASS: u8 = 3;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(Error::InvalidArgument(format!(
                "quality must be between 0 and {}, got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 >= Self::PASS
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl TryFrom<i64> for Quality {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .map_err(|_| {
                Error::InvalidArgument(format!(
                    "quality must be between 0 and {}, got {value}",
                    Quality::MAX
                ))
            })
            .and_then(Quality::new)
    }
}

impl TryFrom<f64> for Quality {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(Error::InvalidArgument(format!(
                "quality must be a whole number, got {value}"
            )));
        }
        if !(0.0..=Quality::MAX as f64).contains(&value) {
            return Err(Error::InvalidArgument(format!(
                "quality must be between 0 and {}, got {value}",
                Quality::MAX
            )));
        }
        Ok(Self(value as u8))
    }
}

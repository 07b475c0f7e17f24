//! Physical quantities with explicit units.
//!
//! Each quantity stores its value in one internal unit (seconds, elementary
//! charges, Angstroms) and parses strings such as `"5 s"`, `"-1 e"` or
//! `"1.2 A"`. Parsing fails on unknown units instead of guessing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ELEMENTARY_CHARGE_IN_COULOMB: f64 = 1.602_176_634e-19;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum UnitError {
    #[error("Could not parse a {quantity} from '{input}'")]
    Parse {
        quantity: &'static str,
        input: String,
    },
    #[error("Unknown {quantity} unit '{unit}'. Valid units are: {valid}")]
    UnknownUnit {
        quantity: &'static str,
        unit: String,
        valid: &'static str,
    },
    #[error("{quantity} must be a finite, non-negative value, got {value}")]
    OutOfRange {
        quantity: &'static str,
        value: String,
    },
}

/// Splits `"1.5 ns"`, `"1.5ns"` or `"1.5"` into its number and unit parts.
fn split_quantity<'a>(input: &'a str, quantity: &'static str) -> Result<(f64, &'a str), UnitError> {
    let trimmed = input.trim();
    let split = trimmed
        .char_indices()
        .find(|&(i, c)| {
            c.is_alphabetic()
                && !((c == 'e' || c == 'E')
                    && trimmed[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|n| n.is_ascii_digit() || n == '-' || n == '+'))
        })
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let value = number.trim().parse::<f64>().map_err(|_| UnitError::Parse {
        quantity,
        input: input.to_string(),
    })?;
    Ok((value, unit.trim()))
}

/// A time span, stored in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Time(f64);

impl Time {
    const UNITS: &'static str = "fs, ps, ns, us, ms, s, min, h, day";

    pub fn seconds(value: f64) -> Self {
        Self(value)
    }

    pub fn milliseconds(value: f64) -> Self {
        Self(value * 1e-3)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0
    }

    /// Converts to a [`Duration`], rejecting negative or non-finite spans.
    pub fn to_duration(&self) -> Result<Duration, UnitError> {
        Duration::try_from_secs_f64(self.0).map_err(|_| UnitError::OutOfRange {
            quantity: "time",
            value: self.to_string(),
        })
    }

    fn scale(unit: &str) -> Option<f64> {
        match unit.to_lowercase().as_str() {
            "fs" | "femtosecond" | "femtoseconds" => Some(1e-15),
            "ps" | "picosecond" | "picoseconds" => Some(1e-12),
            "ns" | "nanosecond" | "nanoseconds" => Some(1e-9),
            "us" | "microsecond" | "microseconds" => Some(1e-6),
            "ms" | "millisecond" | "milliseconds" => Some(1e-3),
            "s" | "sec" | "second" | "seconds" => Some(1.0),
            "min" | "minute" | "minutes" => Some(60.0),
            "h" | "hour" | "hours" => Some(3600.0),
            "day" | "days" => Some(86400.0),
            _ => None,
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::seconds(5.0)
    }
}

impl FromStr for Time {
    type Err = UnitError;

    /// A time must carry a unit; a bare number is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_quantity(s, "time")?;
        let scale = Self::scale(unit).ok_or_else(|| UnitError::UnknownUnit {
            quantity: "time",
            unit: unit.to_string(),
            valid: Self::UNITS,
        })?;
        Ok(Self(value * scale))
    }
}

impl TryFrom<String> for Time {
    type Error = UnitError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Time> for String {
    fn from(value: Time) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.0)
    }
}

/// An electric charge, stored in elementary charges.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Charge(f64);

impl Charge {
    pub fn elementary(value: f64) -> Self {
        Self(value)
    }

    pub fn coulombs(value: f64) -> Self {
        Self(value / ELEMENTARY_CHARGE_IN_COULOMB)
    }

    /// Magnitude in elementary charges, keeping the sign.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl FromStr for Charge {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_quantity(s, "charge")?;
        match unit.to_lowercase().as_str() {
            "" | "e" | "|e|" | "electron charge" | "electron charges" => Ok(Self(value)),
            "c" | "coulomb" | "coulombs" => Ok(Self::coulombs(value)),
            _ => Err(UnitError::UnknownUnit {
                quantity: "charge",
                unit: unit.to_string(),
                valid: "e, C",
            }),
        }
    }
}

impl fmt::Display for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} |e|", self.0)
    }
}

/// A distance, stored in Angstroms.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(f64);

impl Length {
    pub fn angstrom(value: f64) -> Self {
        Self(value)
    }

    pub fn nanometer(value: f64) -> Self {
        Self(value * 10.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl FromStr for Length {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_quantity(s, "length")?;
        match unit {
            "" | "A" | "Å" | "angstrom" | "angstroms" => Ok(Self(value)),
            "nm" | "nanometer" | "nanometers" => Ok(Self::nanometer(value)),
            "pm" | "picometer" | "picometers" => Ok(Self(value * 0.01)),
            _ => Err(UnitError::UnknownUnit {
                quantity: "length",
                unit: unit.to_string(),
                valid: "A, nm, pm",
            }),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} A", self.0)
    }
}

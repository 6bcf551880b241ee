//! Core types for thermostat readings.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};

/// Number of consecutive samples the trend rule looks at.
///
/// The history store trims every device's history to exactly this depth and
/// the classifier evaluates exactly this many samples. Both sides import this
/// constant; changing it changes the trend rule.
pub const TREND_WINDOW: usize = 3;

/// Operating state of the HVAC system as reported by the thermostat.
///
/// # Display vs Serialization
///
/// Both `Display` and serde use the upstream spelling (`"HEATING"`, ...),
/// so values round-trip through the history store unchanged.
///
/// ```
/// use nestwatch_types::HvacState;
///
/// assert_eq!("COOLING".parse::<HvacState>(), Ok(HvacState::Cooling));
/// assert_eq!("DEFROST".parse::<HvacState>(), Ok(HvacState::Unknown));
/// assert_eq!(HvacState::Heating.to_string(), "HEATING");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum HvacState {
    /// HVAC is idle.
    Off,
    /// HVAC is actively heating.
    Heating,
    /// HVAC is actively cooling.
    Cooling,
    /// Status missing or not one of the above.
    #[default]
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl HvacState {
    /// Whether the state is an active mode (heating or cooling).
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, HvacState::Heating | HvacState::Cooling)
    }
}

impl FromStr for HvacState {
    type Err = ParseError;

    /// Parse an upstream HVAC status. Never fails: unrecognized input maps
    /// to [`HvacState::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "OFF" => HvacState::Off,
            "HEATING" => HvacState::Heating,
            "COOLING" => HvacState::Cooling,
            _ => HvacState::Unknown,
        })
    }
}

impl fmt::Display for HvacState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HvacState::Off => write!(f, "OFF"),
            HvacState::Heating => write!(f, "HEATING"),
            HvacState::Cooling => write!(f, "COOLING"),
            HvacState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Temperature unit the thermostat displays to its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TemperatureUnit {
    /// Degrees Celsius (the upstream API's native unit).
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit.
    ///
    /// ```
    /// use nestwatch_types::TemperatureUnit;
    ///
    /// assert_eq!(TemperatureUnit::Fahrenheit.convert_celsius(100.0), 212.0);
    /// assert_eq!(TemperatureUnit::Celsius.convert_celsius(21.5), 21.5);
    /// ```
    #[must_use]
    pub fn convert_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CELSIUS" | "C" => Ok(TemperatureUnit::Celsius),
            "FAHRENHEIT" | "F" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(ParseError::UnknownUnit(other.to_string())),
        }
    }
}

/// Convert Celsius to Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// One normalized observation of a thermostat.
///
/// Temperatures are already in the device's display unit. Conversion happens
/// once, in the normalization step that builds the reading; nothing
/// downstream converts again.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Stable device identifier.
    pub device_id: String,
    /// Measured ambient temperature.
    pub ambient: f64,
    /// Heating setpoint.
    pub heat_setpoint: f64,
    /// Cooling setpoint.
    pub cool_setpoint: f64,
    /// HVAC operating state at observation time.
    pub hvac_state: HvacState,
    /// When the reading was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl Reading {
    /// Create a reading stamped with the current time and zeroed setpoints.
    pub fn new(device_id: impl Into<String>, ambient: f64, hvac_state: HvacState) -> Self {
        Self {
            device_id: device_id.into(),
            ambient,
            heat_setpoint: 0.0,
            cool_setpoint: 0.0,
            hvac_state,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Set both setpoints.
    #[must_use]
    pub fn with_setpoints(mut self, heat: f64, cool: f64) -> Self {
        self.heat_setpoint = heat;
        self.cool_setpoint = cool;
        self
    }

    /// Set the observation time.
    #[must_use]
    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check the reading is usable by the trend pipeline.
    ///
    /// A thermostat in a single mode reports only one setpoint; the other
    /// stays at its zero default and passes. Every temperature must be
    /// finite, since the history store cannot round-trip NaN or infinity.
    pub fn validate(&self) -> ParseResult<()> {
        if self.device_id.trim().is_empty() {
            return Err(ParseError::EmptyDeviceId);
        }
        for (field, value) in [
            ("ambient", self.ambient),
            ("heat_setpoint", self.heat_setpoint),
            ("cool_setpoint", self.cool_setpoint),
        ] {
            if !value.is_finite() {
                return Err(ParseError::NonFiniteTemperature {
                    device_id: self.device_id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1} ({}, heat {:.1}, cool {:.1})",
            self.device_id, self.ambient, self.hvac_state, self.heat_setpoint, self.cool_setpoint
        )
    }
}

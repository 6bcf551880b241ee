//! Three-sample trend classification.
//!
//! A trend is flagged when ambient temperature moves strictly against the
//! active HVAC mode for [`TREND_WINDOW`] consecutive samples of the same
//! state: rising while cooling, or falling while heating.
//!
//! # Example
//!
//! ```
//! use nestwatch_core::{TrendKind, evaluate};
//! use nestwatch_types::{HvacState, Reading};
//!
//! // Newest first, as returned by the history store
//! let history = vec![
//!     Reading::new("hall", 22.0, HvacState::Cooling),
//!     Reading::new("hall", 21.0, HvacState::Cooling),
//!     Reading::new("hall", 20.0, HvacState::Cooling),
//! ];
//!
//! assert_eq!(evaluate(&history).kind(), TrendKind::CoolingRising);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use nestwatch_types::{HvacState, Reading, TREND_WINDOW};

/// Ambient values of the evaluated window, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientWindow {
    /// Oldest sample.
    pub oldest: f64,
    /// Middle sample.
    pub middle: f64,
    /// Newest sample.
    pub newest: f64,
}

impl fmt::Display for AmbientWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} → {:.1} → {:.1}",
            self.oldest, self.middle, self.newest
        )
    }
}

/// Outcome of classifying a device's recent history.
///
/// Ephemeral: produced and consumed within one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrendVerdict {
    /// No actionable trend, or not enough data.
    #[default]
    None,
    /// Cooling, yet ambient rose strictly across the window.
    CoolingRising(AmbientWindow),
    /// Heating, yet ambient fell strictly across the window.
    HeatingFalling(AmbientWindow),
}

impl TrendVerdict {
    /// The verdict without its ambient values.
    pub fn kind(&self) -> TrendKind {
        match self {
            TrendVerdict::None => TrendKind::None,
            TrendVerdict::CoolingRising(_) => TrendKind::CoolingRising,
            TrendVerdict::HeatingFalling(_) => TrendKind::HeatingFalling,
        }
    }

    /// The window that produced the verdict, if any.
    pub fn window(&self) -> Option<&AmbientWindow> {
        match self {
            TrendVerdict::None => None,
            TrendVerdict::CoolingRising(w) | TrendVerdict::HeatingFalling(w) => Some(w),
        }
    }
}

/// Discriminant of a [`TrendVerdict`], for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendKind {
    /// No trend.
    #[default]
    None,
    /// Ambient rising while cooling.
    CoolingRising,
    /// Ambient falling while heating.
    HeatingFalling,
}

impl fmt::Display for TrendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendKind::None => write!(f, "NONE"),
            TrendKind::CoolingRising => write!(f, "COOLING_RISING"),
            TrendKind::HeatingFalling => write!(f, "HEATING_FALLING"),
        }
    }
}

/// Classify a device's history.
///
/// `history` is newest first. Only the newest [`TREND_WINDOW`] readings are
/// considered; fewer than that yields [`TrendVerdict::None`]. All readings
/// in the window must share the same HVAC state and every step must be a
/// strict change, so ties and `NaN` values yield `None`.
pub fn evaluate(history: &[Reading]) -> TrendVerdict {
    let Some(window) = history.first_chunk::<TREND_WINDOW>() else {
        return TrendVerdict::None;
    };
    let [newest, middle, oldest] = window;

    let state = newest.hvac_state;
    if middle.hvac_state != state || oldest.hvac_state != state {
        return TrendVerdict::None;
    }

    let ambient = AmbientWindow {
        oldest: oldest.ambient,
        middle: middle.ambient,
        newest: newest.ambient,
    };

    match state {
        HvacState::Cooling if ambient.oldest < ambient.middle && ambient.middle < ambient.newest => {
            TrendVerdict::CoolingRising(ambient)
        }
        HvacState::Heating if ambient.oldest > ambient.middle && ambient.middle > ambient.newest => {
            TrendVerdict::HeatingFalling(ambient)
        }
        _ => TrendVerdict::None,
    }
}

//! Smart Device Management device listing and its normalization.
//!
//! The SDM API returns every device with a map of traits. Only four traits
//! matter here; they are decoded into typed structs and collapsed into one
//! [`Reading`] per thermostat, already converted to the display unit.

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::debug;

use nestwatch_types::{HvacState, Reading, TemperatureUnit};

/// Body of `GET enterprises/{project}/devices`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    /// Listed devices. SDM omits the field when there are none.
    #[serde(default)]
    pub devices: Vec<SdmDevice>,
}

/// One device as listed by SDM.
#[derive(Debug, Clone, Deserialize)]
pub struct SdmDevice {
    /// Resource name, `enterprises/{project}/devices/{id}`.
    pub name: String,
    /// Device type, e.g. `sdm.devices.types.THERMOSTAT`.
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    /// Trait values.
    #[serde(default)]
    pub traits: DeviceTraits,
}

/// The traits read from each device. Unknown traits are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceTraits {
    #[serde(rename = "sdm.devices.traits.Temperature")]
    pub temperature: Option<TemperatureTrait>,
    #[serde(rename = "sdm.devices.traits.ThermostatTemperatureSetpoint")]
    pub setpoint: Option<SetpointTrait>,
    #[serde(rename = "sdm.devices.traits.ThermostatHvac")]
    pub hvac: Option<HvacTrait>,
    #[serde(rename = "sdm.devices.traits.Settings")]
    pub settings: Option<SettingsTrait>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureTrait {
    pub ambient_temperature_celsius: Option<f64>,
}

/// Setpoints. Heat-only and cool-only modes report a single value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetpointTrait {
    pub heat_celsius: Option<f64>,
    pub cool_celsius: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HvacTrait {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsTrait {
    #[serde(default)]
    pub display_temperature_unit: String,
}

impl SdmDevice {
    /// Device ID: the last segment of the resource name.
    pub fn device_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Display unit, Celsius when missing or unrecognized.
    pub fn display_unit(&self) -> TemperatureUnit {
        let Some(settings) = &self.traits.settings else {
            return TemperatureUnit::Celsius;
        };
        settings
            .display_temperature_unit
            .parse()
            .unwrap_or_else(|e| {
                debug!("{}: {}, using Celsius", self.device_id(), e);
                TemperatureUnit::Celsius
            })
    }

    /// Collapse the traits into a reading in the display unit.
    ///
    /// Returns `None` for devices without an ambient temperature (cameras,
    /// doorbells and displays share the same listing).
    pub fn to_reading(&self, timestamp: OffsetDateTime) -> Option<Reading> {
        let ambient_c = self
            .traits
            .temperature
            .as_ref()?
            .ambient_temperature_celsius?;

        let unit = self.display_unit();
        let setpoint = self.traits.setpoint.clone().unwrap_or_default();
        let hvac_state = self
            .traits
            .hvac
            .as_ref()
            .and_then(|h| h.status.parse().ok())
            .unwrap_or(HvacState::Unknown);

        Some(
            Reading::new(self.device_id(), unit.convert_celsius(ambient_c), hvac_state)
                .with_setpoints(
                    unit.convert_celsius(setpoint.heat_celsius.unwrap_or_default()),
                    unit.convert_celsius(setpoint.cool_celsius.unwrap_or_default()),
                )
                .at(timestamp),
        )
    }
}

impl DeviceList {
    /// Readings for every device that reports an ambient temperature, in
    /// listing order.
    pub fn readings(&self, timestamp: OffsetDateTime) -> Vec<Reading> {
        self.devices
            .iter()
            .filter_map(|device| {
                let reading = device.to_reading(timestamp);
                if reading.is_none() {
                    debug!("Ignoring {} (no ambient temperature)", device.name);
                }
                reading
            })
            .collect()
    }
}

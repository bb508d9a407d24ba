//! Irrigation configuration
//!
//! Loaded once at startup and read-only afterwards.  Durations are
//! stored as integer milliseconds in the JSON document.

use core::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::drivers::relay::RelayWiring;
use crate::error::ConfigError;
use crate::pins::{self, MAX_RELAYS, PinNumber, ValveNumber};

/// Maps an operator-facing valve number onto the relay pin that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveMapping {
    pub pin: PinNumber,
    pub valve_number: ValveNumber,
}

/// Core irrigation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrigationConfig {
    /// Relay pin of the shared master control valve.
    pub master_control_valve_pin: PinNumber,
    /// How long each irrigated zone is re-opened after a batch to vent the manifold.
    #[serde(rename = "pressure_bleed_ms", with = "duration_ms")]
    pub pressure_bleed_time: Duration,
    /// Pause between consecutive zones within one batch.
    #[serde(rename = "zone_switch_delay_ms", with = "duration_ms")]
    pub zone_switch_delay: Duration,
    /// How the relay board is wired (shared by every relay).
    #[serde(default)]
    pub relay_wiring: RelayWiring,
    /// Zone valves, in configuration order.
    pub valves: Vec<ValveMapping>,
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        Self {
            master_control_valve_pin: pins::MCV_GPIO,
            pressure_bleed_time: Duration::from_secs(10),
            zone_switch_delay: Duration::from_secs(5),
            relay_wiring: RelayWiring::NormallyOpen,
            valves: pins::ZONE_GPIOS
                .iter()
                .enumerate()
                .map(|(i, &pin)| ValveMapping {
                    pin,
                    valve_number: i as ValveNumber + 1,
                })
                .collect(),
        }
    }
}

impl IrrigationConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            warn!("Config parse failed: {}", e);
            ConfigError::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialise to pretty JSON (for read-back over the operator console).
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            warn!("Config serialise failed: {}", e);
            ConfigError::Malformed
        })
    }

    /// Check the invariants the relay board and the processor rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.valves.is_empty() {
            return Err(ConfigError::Invalid("at least one valve must be configured"));
        }
        if self.valves.len() + 1 > MAX_RELAYS {
            return Err(ConfigError::TooManyRelays);
        }

        let mut seen_pins: heapless::Vec<PinNumber, MAX_RELAYS> = heapless::Vec::new();
        for pin in self.board_pins() {
            if seen_pins.contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
            // Capacity checked above.
            let _ = seen_pins.push(pin);
        }

        for (i, valve) in self.valves.iter().enumerate() {
            if self.valves[..i]
                .iter()
                .any(|v| v.valve_number == valve.valve_number)
            {
                return Err(ConfigError::DuplicateValve(valve.valve_number));
            }
        }

        Ok(())
    }

    /// Every pin the relay board must own: the MCV first, then each zone.
    pub fn board_pins(&self) -> impl Iterator<Item = PinNumber> + '_ {
        core::iter::once(self.master_control_valve_pin).chain(self.valves.iter().map(|v| v.pin))
    }

    /// Zone pins only, in configuration order.
    pub fn zone_pins(&self) -> impl Iterator<Item = PinNumber> + '_ {
        self.valves.iter().map(|v| v.pin)
    }

    /// Resolve a job's valve number to its relay pin.
    pub fn pin_for_valve(&self, valve: ValveNumber) -> Result<PinNumber, ConfigError> {
        self.valves
            .iter()
            .find(|v| v.valve_number == valve)
            .map(|v| v.pin)
            .ok_or(ConfigError::UnmappedValve(valve))
    }
}

/// `Duration` <-> integer milliseconds.
pub(crate) mod duration_ms {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

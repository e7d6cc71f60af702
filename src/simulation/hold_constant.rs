// simulation/hold_constant.rs
// Which ideal-gas quantity is held fixed, and the per-step compensation that keeps it there

use super::pressure;
use super::thermal;
use super::Simulation;
use crate::error::Error;
use crate::profile_scope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldConstant {
    #[default]
    Nothing,
    Volume,
    Temperature,
    /// Pressure held by resizing the container
    PressureV,
    /// Pressure held by rescaling particle speeds
    PressureT,
}

impl HoldConstant {
    pub fn holds_pressure(self) -> bool {
        matches!(self, HoldConstant::PressureV | HoldConstant::PressureT)
    }

    /// Modes that fix the temperature, directly or as the adjusted quantity.
    pub fn holds_temperature(self) -> bool {
        matches!(self, HoldConstant::Temperature | HoldConstant::PressureT)
    }

    /// Modes in which the user may not change the width.
    pub fn locks_width(self) -> bool {
        matches!(self, HoldConstant::Volume | HoldConstant::PressureV)
    }

    pub fn name(self) -> &'static str {
        match self {
            HoldConstant::Nothing => "nothing",
            HoldConstant::Volume => "volume",
            HoldConstant::Temperature => "temperature",
            HoldConstant::PressureV => "pressureV",
            HoldConstant::PressureT => "pressureT",
        }
    }
}

impl fmt::Display for HoldConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HoldConstant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_ascii_lowercase();
        match key.as_str() {
            "nothing" | "none" => Ok(HoldConstant::Nothing),
            "volume" => Ok(HoldConstant::Volume),
            "temperature" => Ok(HoldConstant::Temperature),
            "pressurev" => Ok(HoldConstant::PressureV),
            "pressuret" => Ok(HoldConstant::PressureT),
            _ => Err(Error::UnknownName { kind: "hold-constant mode", name: s.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertReason {
    EmptyContainer,
    /// Pressure is still latched at zero
    NoPressure,
    LidOpen,
    VolumeTooLarge,
    VolumeTooSmall,
    TemperatureCeiling,
}

/// One-shot notices for the UI. Polled with `Simulation::drain_notifications`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    ModeReverted { from: HoldConstant, reason: RevertReason },
    HoldConstantRejected { requested: HoldConstant, reason: RevertReason },
    /// Temperature reached the ceiling and the container was emptied
    TemperatureCeiling { temperature: f64 },
    LidBlownOff { pressure: f64 },
}

/// Round to `decimals` places so repeated compensation does not drift.
fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

impl Simulation {
    /// Switch modes, or refuse with a notification when the current state cannot support it.
    pub fn set_hold_constant(&mut self, mode: HoldConstant) -> bool {
        if let Err(reason) = self.check_hold_constant(mode) {
            warn!(requested = %mode, ?reason, "hold-constant mode rejected");
            self.notify(Notification::HoldConstantRejected { requested: mode, reason });
            return false;
        }
        if mode != self.hold_constant {
            info!(from = %self.hold_constant, to = %mode, "hold-constant mode changed");
        }
        self.hold_constant = mode;
        true
    }

    fn check_hold_constant(&self, mode: HoldConstant) -> Result<(), RevertReason> {
        let n = self.particles.total_inside();
        let lid_open = self.container.is_lid_open();
        let pressure_ready = self.pressure.enabled && self.pressure.value > 0.0;
        match mode {
            HoldConstant::Nothing | HoldConstant::Volume => Ok(()),
            HoldConstant::Temperature => {
                if n == 0 {
                    Err(RevertReason::EmptyContainer)
                } else if lid_open {
                    Err(RevertReason::LidOpen)
                } else {
                    Ok(())
                }
            }
            HoldConstant::PressureV | HoldConstant::PressureT => {
                if n == 0 {
                    Err(RevertReason::EmptyContainer)
                } else if mode == HoldConstant::PressureT && lid_open {
                    Err(RevertReason::LidOpen)
                } else if !pressure_ready {
                    Err(RevertReason::NoPressure)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub(crate) fn revert_hold_constant(&mut self, reason: RevertReason) {
        let from = self.hold_constant;
        if from == HoldConstant::Nothing {
            return;
        }
        warn!(%from, ?reason, "hold-constant mode reverted to nothing");
        self.hold_constant = HoldConstant::Nothing;
        self.notify(Notification::ModeReverted { from, reason });
    }

    /// Adjust volume or temperature so the held quantity stays put after this step's
    /// changes to N and V. Returns the temperature it forced, if any.
    pub(crate) fn compensate(&mut self) -> Option<f64> {
        profile_scope!("hold_constant");
        let n = self.particles.total_inside();
        match self.hold_constant {
            HoldConstant::Nothing | HoldConstant::Volume => None,
            HoldConstant::Temperature => {
                if n == 0 {
                    self.revert_hold_constant(RevertReason::EmptyContainer);
                } else if self.container.is_lid_open() {
                    self.revert_hold_constant(RevertReason::LidOpen);
                }
                None
            }
            HoldConstant::PressureV => {
                if n == 0 {
                    self.revert_hold_constant(RevertReason::EmptyContainer);
                    return None;
                }
                let held = self.pressure.value;
                if !self.pressure.enabled || held <= 0.0 {
                    return None;
                }
                let t = thermal::compute_temperature(&self.particles)?;
                let volume = pressure::ideal_volume(n, t, held);
                let width = round_to(self.container.width_for_volume(volume), self.config.width_rounding_decimals);
                let range = self.container.width_range;
                if range.contains(width) {
                    self.resize_container(width);
                } else {
                    let reason = if width > range.max {
                        RevertReason::VolumeTooLarge
                    } else {
                        RevertReason::VolumeTooSmall
                    };
                    self.revert_hold_constant(reason);
                    self.resize_container(range.clamp(width));
                }
                None
            }
            HoldConstant::PressureT => {
                if n == 0 {
                    self.revert_hold_constant(RevertReason::EmptyContainer);
                    return None;
                }
                if self.container.is_lid_open() {
                    self.revert_hold_constant(RevertReason::LidOpen);
                    return None;
                }
                let held = self.pressure.value;
                if !self.pressure.enabled || held <= 0.0 {
                    return None;
                }
                let t = pressure::ideal_temperature(n, held, self.container.volume());
                self.particles.set_temperature(t);
                Some(t)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse() {
        assert_eq!("pressure-v".parse::<HoldConstant>().unwrap(), HoldConstant::PressureV);
        assert_eq!("PressureT".parse::<HoldConstant>().unwrap(), HoldConstant::PressureT);
        assert_eq!("none".parse::<HoldConstant>().unwrap(), HoldConstant::Nothing);
        assert!("entropy".parse::<HoldConstant>().is_err());
        for mode in [
            HoldConstant::Nothing,
            HoldConstant::Volume,
            HoldConstant::Temperature,
            HoldConstant::PressureV,
            HoldConstant::PressureT,
        ] {
            assert_eq!(mode.name().parse::<HoldConstant>().unwrap(), mode);
        }
    }

    #[test]
    fn rounding_keeps_requested_decimals() {
        assert_eq!(round_to(1.234567, 5), 1.23457);
        assert_eq!(round_to(9999.999999, 5), 10000.0);
    }
}

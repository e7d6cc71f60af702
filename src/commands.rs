// commands.rs
// Handles processing of SimCommand messages for the simulation

use crate::container::Side;
use crate::error::{Error, Result};
use crate::simulation::{HoldConstant, Simulation};
use crate::species::Species;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimCommand {
    SetSpeciesCount { species: Species, count: usize },
    SetContainerWidth { width: f64, animate: bool },
    SetHeatCoolFactor { factor: f64 },
    SetHoldConstant { mode: HoldConstant },
    SetCollisionsEnabled { enabled: bool },
    /// Width of the lid itself; the opening is whatever of the top wall it leaves uncovered.
    SetLidWidth { width: f64 },
    ReturnLid,
    SetDivider { present: bool },
    /// `None` injects at the container's current temperature.
    SetInjectionTemperature { temperature: Option<f64> },
    SetSpeciesMass { species: Species, mass: f64 },
    SetSpeciesRadius { species: Species, radius: f64 },
    SetSideCount { side: Side, species: Species, count: usize },
    StartCollisionCounter,
    StopCollisionCounter,
    Reset,
    StepOnce,
    SetPaused { paused: bool },
}

impl SimCommand {
    /// Commands that change state the derived quantities depend on.
    fn mutates(&self) -> bool {
        !matches!(
            self,
            SimCommand::StepOnce
                | SimCommand::SetPaused { .. }
                | SimCommand::StartCollisionCounter
                | SimCommand::StopCollisionCounter
        )
    }
}

fn finite(name: &str, v: f64) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(Error::invalid(format!("{name} must be finite, got {v}")))
    }
}

/// Process a single SimCommand
pub fn process_command(cmd: SimCommand, simulation: &mut Simulation) -> Result<()> {
    debug!(?cmd, "processing command");
    let mutates = cmd.mutates();
    match cmd {
        SimCommand::SetSpeciesCount { species, count } => {
            simulation.set_species_count(species, count);
        }

        SimCommand::SetContainerWidth { width, animate } => {
            handle_set_width(simulation, width, animate)?;
        }

        SimCommand::SetHeatCoolFactor { factor } => {
            let factor = finite("heat/cool factor", factor)?;
            if !(-1.0..=1.0).contains(&factor) {
                return Err(Error::invalid(format!("heat/cool factor must lie in [-1, 1], got {factor}")));
            }
            simulation.set_heat_cool_factor(factor);
        }

        SimCommand::SetHoldConstant { mode } => {
            simulation.set_hold_constant(mode);
        }

        SimCommand::SetCollisionsEnabled { enabled } => {
            simulation.set_collisions_enabled(enabled);
        }

        SimCommand::SetLidWidth { width } => {
            let width = finite("lid width", width)?;
            if width < 0.0 {
                return Err(Error::invalid(format!("lid width must be >= 0, got {width}")));
            }
            let container = &mut simulation.container;
            container.set_opening_width(container.width - width);
        }

        SimCommand::ReturnLid => {
            simulation.container.return_lid();
        }

        SimCommand::SetDivider { present } => {
            simulation.set_divider(present);
        }

        SimCommand::SetInjectionTemperature { temperature } => {
            if let Some(t) = temperature {
                let t = finite("injection temperature", t)?;
                let range = simulation.config.injection_temperature_range;
                if !range.contains(t) {
                    return Err(Error::invalid(format!(
                        "injection temperature {t} outside [{}, {}]",
                        range.min, range.max
                    )));
                }
            }
            simulation.injection_temperature = temperature;
        }

        SimCommand::SetSpeciesMass { species, mass } => {
            let mass = finite("mass", mass)?;
            simulation
                .set_species_mass(species, mass)
                .ok_or_else(|| Error::invalid(format!("{} has a fixed mass", species.name())))?;
        }

        SimCommand::SetSpeciesRadius { species, radius } => {
            let radius = finite("radius", radius)?;
            simulation
                .set_species_radius(species, radius)
                .ok_or_else(|| Error::invalid(format!("{} has a fixed radius", species.name())))?;
        }

        SimCommand::SetSideCount { side, species, count } => {
            simulation.set_side_count(side, species, count);
        }

        SimCommand::StartCollisionCounter => simulation.collision_counter.start(),

        SimCommand::StopCollisionCounter => simulation.collision_counter.stop(),

        SimCommand::Reset => {
            simulation.reset();
        }

        SimCommand::StepOnce => {
            simulation.step_once();
        }

        SimCommand::SetPaused { paused } => {
            simulation.paused = paused;
        }
    }
    if mutates && simulation.paused {
        simulation.update_while_paused();
    }
    Ok(())
}

fn handle_set_width(simulation: &mut Simulation, width: f64, animate: bool) -> Result<()> {
    let width = finite("width", width)?;
    if width <= 0.0 {
        return Err(Error::invalid(format!("width must be > 0, got {width}")));
    }
    if simulation.container.has_divider {
        return Err(Error::invalid("width is fixed while the divider is in"));
    }
    if simulation.hold_constant.locks_width() {
        debug!(mode = %simulation.hold_constant, "width change ignored while volume is controlled");
        return Ok(());
    }
    if animate {
        simulation.container.set_desired_width(width, true);
    } else {
        simulation.resize_container(width);
    }
    Ok(())
}

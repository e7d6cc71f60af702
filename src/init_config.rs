// init_config.rs
// Handles loading and parsing the initial scenario from init_config.toml

use crate::commands::{process_command, SimCommand};
use crate::config::SimConfig;
use crate::container::Side;
use crate::error::Result;
use crate::simulation::{HoldConstant, Simulation};
use crate::species::Species;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct InitConfig {
    /// Tunables; omitted fields keep their defaults.
    #[serde(default)]
    pub config: Option<SimConfig>,
    pub simulation: Option<SimulationConfig>,
    #[serde(default)]
    pub particles: BTreeMap<String, usize>,
    #[serde(default)]
    pub diffusion: Option<DiffusionConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Container width (pm)
    pub width: Option<f64>,
    /// Injection temperature (K). Omit to inject at the container's temperature.
    pub initial_temperature: Option<f64>,
    /// Hold-constant mode name, e.g. "volume" or "pressureV"
    pub hold_constant: Option<String>,
    pub collisions: Option<bool>,
    pub divider: Option<bool>,
    /// Steps to run before the hold-constant mode is applied, so pressure is established
    pub warmup_steps: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DiffusionConfig {
    #[serde(default)]
    pub left: BTreeMap<String, usize>,
    #[serde(default)]
    pub right: BTreeMap<String, usize>,
}

impl InitConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.as_ref().display(), "init config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_default() -> Result<Self> {
        Self::load_from_file("init_config.toml")
    }

    /// Tunables for `Simulation::with_config`.
    pub fn sim_config(&self) -> SimConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Issue the commands that set up this scenario. Names are checked before
    /// anything is applied.
    pub fn apply_to(&self, sim: &mut Simulation) -> Result<()> {
        let counts = parse_counts(&self.particles)?;
        let sides = match &self.diffusion {
            Some(d) => Some((parse_counts(&d.left)?, parse_counts(&d.right)?)),
            None => None,
        };
        let sim_cfg = self.simulation.as_ref();
        let hold = sim_cfg
            .and_then(|s| s.hold_constant.as_deref())
            .map(str::parse::<HoldConstant>)
            .transpose()?;

        if let Some(s) = sim_cfg {
            if let Some(enabled) = s.collisions {
                process_command(SimCommand::SetCollisionsEnabled { enabled }, sim)?;
            }
            if let Some(width) = s.width {
                process_command(SimCommand::SetContainerWidth { width, animate: false }, sim)?;
            }
            if let Some(t) = s.initial_temperature {
                process_command(SimCommand::SetInjectionTemperature { temperature: Some(t) }, sim)?;
            }
            if let Some(present) = s.divider {
                process_command(SimCommand::SetDivider { present }, sim)?;
            }
        }
        for (species, count) in counts {
            process_command(SimCommand::SetSpeciesCount { species, count }, sim)?;
        }
        if let Some((left, right)) = sides {
            for (side, counts) in [(Side::Left, left), (Side::Right, right)] {
                for (species, count) in counts {
                    process_command(SimCommand::SetSideCount { side, species, count }, sim)?;
                }
            }
        }
        if let Some(mode) = hold {
            let warmup = sim_cfg.and_then(|s| s.warmup_steps).unwrap_or(0);
            for _ in 0..warmup {
                sim.step_once();
            }
            process_command(SimCommand::SetHoldConstant { mode }, sim)?;
        }
        Ok(())
    }
}

fn parse_counts(table: &BTreeMap<String, usize>) -> Result<Vec<(Species, usize)>> {
    table
        .iter()
        .map(|(name, &count)| Ok((name.parse::<Species>()?, count)))
        .collect()
}

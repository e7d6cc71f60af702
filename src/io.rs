// io.rs
// Snapshot save/restore: bincode, gzip-compressed when the file asks for it

use crate::config::SimConfig;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::profile_scope;
use crate::simulation::particle_system::ParticleSystem;
use crate::simulation::{HoldConstant, Simulation};
use crate::species::SpeciesTable;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Plain data needed to rebuild a simulation. Transient caches are not stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub config: SimConfig,
    pub species: SpeciesTable,
    pub container: Container,
    pub particles: ParticleSystem,
    pub hold_constant: HoldConstant,
    pub heat_cool_factor: f64,
    pub collisions_enabled: bool,
    pub injection_temperature: Option<f64>,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub frame: usize,
}

impl SimulationState {
    pub fn from_simulation(sim: &Simulation) -> Self {
        Self {
            config: sim.config.clone(),
            species: sim.species.clone(),
            container: sim.container.clone(),
            particles: sim.particles.clone(),
            hold_constant: sim.hold_constant,
            heat_cool_factor: sim.heat_cool_factor,
            collisions_enabled: sim.detector.particle_particle_enabled,
            injection_temperature: sim.injection_temperature,
            time: sim.time,
            frame: sim.frame,
        }
    }

    /// Overwrite `sim` with this state and rebuild everything derived from it.
    /// A state carrying an invalid config is refused and `sim` is left untouched.
    pub fn apply_to(self, sim: &mut Simulation) -> Result<()> {
        self.config.validate()?;
        let c = &self.container;
        if c.width_range != self.config.width_range
            || c.height != self.config.container_height
            || !c.width_range.contains(c.width)
        {
            return Err(Error::invalid("snapshot container does not match its config"));
        }
        let rebuild_grid = sim.config != self.config || sim.container.max_bounds() != self.container.max_bounds();
        sim.config = self.config;
        sim.species = self.species;
        sim.container = self.container;
        sim.particles = self.particles;
        sim.hold_constant = self.hold_constant;
        sim.heat_cool_factor = self.heat_cool_factor;
        sim.injection_temperature = self.injection_temperature;
        sim.time = self.time;
        sim.frame = self.frame;
        if rebuild_grid {
            sim.detector = crate::simulation::collision::CollisionDetector::new(&sim.container, &sim.config);
            sim.pressure = crate::simulation::pressure::PressureModel::new(&sim.config);
        }
        sim.detector.particle_particle_enabled = self.collisions_enabled;
        sim.invalidate_caches();
        Ok(())
    }
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

pub fn save_state<P: AsRef<Path>>(path: P, sim: &Simulation) -> Result<()> {
    profile_scope!("save_state");
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let state = SimulationState::from_simulation(sim);
    // Write to a temporary file first to avoid truncation on interruption
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    {
        let file = std::fs::File::create(&tmp_path)?;
        let writer = BufWriter::new(file);
        if is_gzip_path(path) {
            let mut encoder = GzEncoder::new(writer, Compression::fast());
            bincode::serialize_into(&mut encoder, &state)?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
        } else {
            let mut writer = writer;
            bincode::serialize_into(&mut writer, &state)?;
            writer.flush()?;
        }
    }
    std::fs::rename(&tmp_path, path)?;
    info!(path = %path.display(), particles = sim.particles.total_inside(), "state saved");
    Ok(())
}

pub fn load_state<P: AsRef<Path>>(path: P) -> Result<SimulationState> {
    profile_scope!("load_state");
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let state = match maybe_decompress_gzip(&data)? {
        Some(decoded) => bincode::deserialize::<SimulationState>(&decoded)?,
        None => bincode::deserialize::<SimulationState>(&data)?,
    };
    info!(path = %path.display(), "state loaded");
    Ok(state)
}

fn maybe_decompress_gzip(data: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }
    let mut decoder = GzDecoder::new(Cursor::new(data));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(Some(decoded))
}

use crate::config::ValueRange;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Heavy,
    Light,
    Diffusion1,
    Diffusion2,
}

impl Species {
    pub const COUNT: usize = 4;
    pub const ALL: [Species; Species::COUNT] =
        [Species::Heavy, Species::Light, Species::Diffusion1, Species::Diffusion2];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Heavy => "heavy",
            Species::Light => "light",
            Species::Diffusion1 => "diffusion1",
            Species::Diffusion2 => "diffusion2",
        }
    }

    /// Only the diffusion species can change mass and radius at runtime.
    pub fn is_adjustable(self) -> bool {
        matches!(self, Species::Diffusion1 | Species::Diffusion2)
    }

    pub fn default_props(self) -> SpeciesProps {
        match self {
            // N2-like
            Species::Heavy => SpeciesProps { mass: 28.0, radius: 125.0, color: [119, 74, 217, 255] },
            // He-like
            Species::Light => SpeciesProps { mass: 4.0, radius: 62.5, color: [232, 78, 31, 255] },
            Species::Diffusion1 => SpeciesProps { mass: 28.0, radius: 125.0, color: [0, 170, 255, 255] },
            Species::Diffusion2 => SpeciesProps { mass: 28.0, radius: 125.0, color: [255, 20, 140, 255] },
        }
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heavy" => Ok(Species::Heavy),
            "light" => Ok(Species::Light),
            "diffusion1" => Ok(Species::Diffusion1),
            "diffusion2" => Ok(Species::Diffusion2),
            _ => Err(Error::UnknownName { kind: "species", name: s.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProps {
    /// AMU
    pub mass: f64,
    /// pm
    pub radius: f64,
    pub color: [u8; 4],
}

pub const ADJUSTABLE_MASS_RANGE: ValueRange = ValueRange::new(4.0, 32.0);
pub const ADJUSTABLE_RADIUS_RANGE: ValueRange = ValueRange::new(50.0, 150.0);

/// Per-simulation species properties. Diffusion species may be edited at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    props: [SpeciesProps; Species::COUNT],
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self { props: Species::ALL.map(Species::default_props) }
    }
}

impl SpeciesTable {
    #[inline]
    pub fn get(&self, species: Species) -> SpeciesProps {
        self.props[species.index()]
    }

    /// Clamped to the adjustable range. Returns the value actually stored, or `None`
    /// if the species is not adjustable.
    pub fn set_mass(&mut self, species: Species, mass: f64) -> Option<f64> {
        if !species.is_adjustable() || !mass.is_finite() {
            return None;
        }
        let mass = ADJUSTABLE_MASS_RANGE.clamp(mass);
        self.props[species.index()].mass = mass;
        Some(mass)
    }

    pub fn set_radius(&mut self, species: Species, radius: f64) -> Option<f64> {
        if !species.is_adjustable() || !radius.is_finite() {
            return None;
        }
        let radius = ADJUSTABLE_RADIUS_RANGE.clamp(radius);
        self.props[species.index()].radius = radius;
        Some(radius)
    }

    /// Largest radius of any species, used to size injection margins.
    pub fn max_radius(&self) -> f64 {
        self.props.iter().map(|p| p.radius).fold(0.0_f64, f64::max)
    }
}

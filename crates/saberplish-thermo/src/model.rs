use crate::{
    error::SolverError,
    params::{
        self, GAS_CONSTANT, INIT, KELVIN, MAX_TABULATED_HAIRPIN, SALT_ENTROPY_FACTOR,
        TERMINAL_AT, WATER_MOLARITY,
    },
};
use serde::{Deserialize, Serialize};

const MIN_SODIUM: f64 = 0.05;
const MAX_SODIUM: f64 = 1.1;
const MIN_CELSIUS: f64 = 0.0;
const MAX_CELSIUS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    Dna,
}

/// Bounds on the structures enumerated per complex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationLimits {
    pub min_helix_length: usize,
    pub max_helices_per_pair: usize,
    pub max_helices: usize,
}

impl Default for EnumerationLimits {
    fn default() -> Self {
        Self {
            min_helix_length: 4,
            max_helices_per_pair: 8,
            max_helices: 4,
        }
    }
}

/// Buffer and temperature conditions for a tube analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub material: Material,
    pub celsius: f64,
    /// Na+ in mol/L.
    pub sodium: f64,
    pub limits: EnumerationLimits,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            material: Material::Dna,
            celsius: 37.0,
            sodium: 1.0,
            limits: EnumerationLimits::default(),
        }
    }
}

impl Model {
    pub fn new(material: Material, sodium: f64, celsius: f64) -> Self {
        Self {
            material,
            celsius,
            sodium,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.sodium.is_finite() || !(MIN_SODIUM..=MAX_SODIUM).contains(&self.sodium) {
            return Err(SolverError::InvalidModel(format!(
                "sodium {} M outside [{MIN_SODIUM}, {MAX_SODIUM}]",
                self.sodium
            )));
        }
        if !self.celsius.is_finite() || !(MIN_CELSIUS..=MAX_CELSIUS).contains(&self.celsius) {
            return Err(SolverError::InvalidModel(format!(
                "temperature {} C outside [{MIN_CELSIUS}, {MAX_CELSIUS}]",
                self.celsius
            )));
        }
        if self.limits.min_helix_length < 2 {
            return Err(SolverError::InvalidModel(
                "min_helix_length must be at least 2".to_string(),
            ));
        }
        if self.limits.max_helices == 0 || self.limits.max_helices_per_pair == 0 {
            return Err(SolverError::InvalidModel(
                "helix limits must be positive".to_string(),
            ));
        }
        Ok(())
    }

    #[inline(always)]
    pub fn kelvin(&self) -> f64 {
        self.celsius + KELVIN
    }

    /// RT in kcal/mol.
    #[inline(always)]
    pub fn rt(&self) -> f64 {
        GAS_CONSTANT * self.kelvin()
    }

    #[inline(always)]
    pub fn water_molarity(&self) -> f64 {
        WATER_MOLARITY
    }

    #[inline(always)]
    fn free_energy(&self, (dh, ds): (f64, f64)) -> f64 {
        dh - self.kelvin() * ds / 1000.0
    }

    pub fn stack_dg(&self, x: u8, y: u8) -> f64 {
        let (dh, ds) = params::stack(x, y);
        self.free_energy((dh, ds + SALT_ENTROPY_FACTOR * self.sodium.ln()))
    }

    /// Terminal penalty for a helix end whose pair involves `base`.
    pub fn terminal_dg(&self, base: u8) -> f64 {
        match base {
            b'A' | b'T' => self.free_energy(TERMINAL_AT),
            _ => 0.0,
        }
    }

    pub fn association_dg(&self) -> f64 {
        self.free_energy(INIT)
    }

    /// Hairpin loop free energy, extrapolated beyond 30 nt after
    /// Jacobson-Stockmayer. `None` for loops too short to close.
    pub fn hairpin_dg(&self, len: usize) -> Option<f64> {
        if let Some(ds) = params::hairpin_loop_entropy(len) {
            return Some(self.free_energy((0.0, ds)));
        }
        if len > MAX_TABULATED_HAIRPIN {
            let base = self.hairpin_dg(MAX_TABULATED_HAIRPIN)?;
            let ratio = len as f64 / MAX_TABULATED_HAIRPIN as f64;
            return Some(base + 2.44 * self.rt() * ratio.ln());
        }
        None
    }
}

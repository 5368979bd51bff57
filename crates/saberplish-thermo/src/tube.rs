use crate::{
    equilibrium::MassAction,
    error::SolverError,
    model::Model,
    strand::{Complex, Strand},
    structure::{fold_complex, ComplexResult},
};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compute {
    Pfunc,
    Mfe,
}

/// Which complexes a tube considers: every multiset of its strands up to
/// `max_size`, plus anything listed in `include`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSpec {
    pub max_size: usize,
    #[serde(default)]
    pub include: Vec<Complex>,
}

impl SetSpec {
    pub fn new(max_size: usize, include: Vec<Complex>) -> Self {
        Self { max_size, include }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tube {
    name: String,
    /// (strand, concentration in mol/L)
    strands: Vec<(Strand, f64)>,
    complexes: SetSpec,
}

impl Tube {
    pub fn new<I>(strands: I, complexes: SetSpec, name: &str) -> Result<Self, SolverError>
    where
        I: IntoIterator<Item = (Strand, f64)>,
    {
        let strands: Vec<(Strand, f64)> = strands.into_iter().collect();
        let invalid = |reason: String| SolverError::InvalidTube {
            tube: name.to_string(),
            reason,
        };

        if strands.is_empty() {
            return Err(invalid("no strands".to_string()));
        }
        if complexes.max_size == 0 {
            return Err(invalid("max_size must be at least 1".to_string()));
        }
        let mut seen = HashSet::new();
        for (strand, conc) in &strands {
            if !conc.is_finite() || *conc <= 0.0 {
                return Err(invalid(format!(
                    "concentration of '{}' must be positive, got {conc}",
                    strand.name()
                )));
            }
            if !seen.insert(strand) {
                return Err(invalid(format!("strand '{}' listed twice", strand.name())));
            }
        }
        for complex in &complexes.include {
            if complex.size() == 0 {
                return Err(invalid("empty complex in include list".to_string()));
            }
            if let Some(missing) = complex.strands().iter().find(|s| !seen.contains(s)) {
                return Err(invalid(format!(
                    "complex {complex} uses strand '{}' which is not in the tube",
                    missing.name()
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            strands,
            complexes,
        })
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn strands(&self) -> &[(Strand, f64)] {
        &self.strands
    }

    #[inline(always)]
    pub fn complexes(&self) -> &SetSpec {
        &self.complexes
    }

    /// All complexes in this tube's ensemble, monomers first.
    pub fn ensemble(&self) -> Vec<Complex> {
        let strands: Vec<&Strand> = self.strands.iter().map(|(s, _)| s).collect();
        (1..=self.complexes.max_size)
            .flat_map(|size| {
                strands
                    .iter()
                    .copied()
                    .combinations_with_replacement(size)
                    .map(|members| Complex::new(members.into_iter().cloned()))
                    .collect::<Vec<_>>()
            })
            .chain(self.complexes.include.iter().cloned())
            .unique()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexConcentration {
    pub complex: Complex,
    /// mol/L
    pub concentration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeResult {
    pub name: String,
    pub complex_concentrations: Vec<ComplexConcentration>,
}

impl TubeResult {
    pub fn concentration(&self, complex: &Complex) -> Result<f64, SolverError> {
        self.complex_concentrations
            .iter()
            .find(|c| &c.complex == complex)
            .map(|c| c.concentration)
            .ok_or_else(|| {
                SolverError::MissingResult(format!(
                    "concentration of {complex} in tube '{}'",
                    self.name
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexEntry {
    pub complex: Complex,
    pub result: ComplexResult,
}

/// Results of one batched analysis, looked up by tube or by complex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeAnalysis {
    pub model: Model,
    pub tubes: Vec<TubeResult>,
    pub complexes: Vec<ComplexEntry>,
}

impl TubeAnalysis {
    pub fn tube(&self, tube: &Tube) -> Result<&TubeResult, SolverError> {
        self.tubes
            .iter()
            .find(|t| t.name == tube.name())
            .ok_or_else(|| SolverError::MissingResult(format!("tube '{}'", tube.name())))
    }

    pub fn complex(&self, complex: &Complex) -> Result<&ComplexResult, SolverError> {
        self.complexes
            .iter()
            .find(|entry| &entry.complex == complex)
            .map(|entry| &entry.result)
            .ok_or_else(|| SolverError::MissingResult(format!("complex {complex}")))
    }
}

/// Computes partition functions, MFE structures and equilibrium
/// concentrations for a batch of tubes.
pub trait TubeSolver {
    fn analyze(
        &self,
        tubes: &[Tube],
        model: &Model,
        compute: &[Compute],
    ) -> Result<TubeAnalysis, SolverError>;
}

/// Helix-level nearest-neighbor model with a mass-action concentration solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborSolver;

impl NearestNeighborSolver {
    fn concentrations(
        tube: &Tube,
        model: &Model,
        results: &HashMap<&Complex, &ComplexResult>,
    ) -> Result<TubeResult, SolverError> {
        let ensemble = tube.ensemble();
        let ln_water = model.water_molarity().ln();

        let counts: Vec<Vec<usize>> = ensemble
            .iter()
            .map(|c| tube.strands().iter().map(|(s, _)| c.count(s)).collect())
            .collect();
        let log_weights: Vec<f64> = ensemble
            .iter()
            .map(|c| {
                // 1 M standard state to mole fractions
                results[c].log_pfunc + (c.size() - 1) as f64 * ln_water
            })
            .collect();
        let totals: Vec<f64> = tube
            .strands()
            .iter()
            .map(|(_, conc)| conc / model.water_molarity())
            .collect();

        let fractions = MassAction {
            tube: tube.name(),
            counts: &counts,
            log_weights: &log_weights,
            totals: &totals,
        }
        .solve()?;

        Ok(TubeResult {
            name: tube.name().to_string(),
            complex_concentrations: ensemble
                .into_iter()
                .zip(fractions)
                .map(|(complex, x)| ComplexConcentration {
                    complex,
                    concentration: x * model.water_molarity(),
                })
                .collect(),
        })
    }
}

impl TubeSolver for NearestNeighborSolver {
    fn analyze(
        &self,
        tubes: &[Tube],
        model: &Model,
        compute: &[Compute],
    ) -> Result<TubeAnalysis, SolverError> {
        model.validate()?;
        if let Some(dup) = tubes.iter().map(Tube::name).duplicates().next() {
            return Err(SolverError::InvalidTube {
                tube: dup.to_string(),
                reason: "tube name used twice in one analysis".to_string(),
            });
        }

        let with_mfe = compute.contains(&Compute::Mfe);
        let unique: Vec<Complex> = tubes.iter().flat_map(Tube::ensemble).unique().collect();
        info!(
            tubes = tubes.len(),
            complexes = unique.len(),
            celsius = model.celsius,
            sodium = model.sodium,
            "running tube analysis"
        );

        let complexes: Vec<ComplexEntry> = unique
            .into_par_iter()
            .map(|complex| {
                let result = fold_complex(&complex, model, with_mfe);
                ComplexEntry { complex, result }
            })
            .collect();

        let tube_results = if compute.contains(&Compute::Pfunc) {
            let lookup: HashMap<&Complex, &ComplexResult> = complexes
                .iter()
                .map(|entry| (&entry.complex, &entry.result))
                .collect();
            tubes
                .iter()
                .map(|tube| Self::concentrations(tube, model, &lookup))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            debug!("pfunc not requested, skipping concentrations");
            tubes
                .iter()
                .map(|tube| TubeResult {
                    name: tube.name().to_string(),
                    complex_concentrations: vec![],
                })
                .collect()
        };

        Ok(TubeAnalysis {
            model: *model,
            tubes: tube_results,
            complexes,
        })
    }
}

/// Analyze `tubes` with the built-in nearest-neighbor solver.
pub fn tube_analysis(
    tubes: &[Tube],
    model: &Model,
    compute: &[Compute],
) -> Result<TubeAnalysis, SolverError> {
    NearestNeighborSolver.analyze(tubes, model, compute)
}

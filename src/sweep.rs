//! Parameter sweeps over probe layouts and buffer conditions.

use crate::assembly::{ReportParams, ReportRecord, SaberPlishDesign};
use crate::config::{BridgeInput, DEFAULT_IS_BRIDGE_NAME, DEFAULT_SF_BRIDGE_NAME};
use crate::error::{Result, SaberPlishError};
use crate::probe::ProbeParams;
use itertools::iproduct;
use rayon::prelude::*;
use regex::Regex;
use saberplish_thermo::{NearestNeighborSolver, TubeSolver};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path};
use tracing::{debug, info, warn};

/// Upper bound on the number of points one sweep may expand to.
pub const MAX_SWEEP_POINTS: usize = 100_000;

/// Probe positions, as a list or as a range string such as `"-5..=5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Positions {
    List(Vec<i64>),
    Range(String),
}

impl Default for Positions {
    fn default() -> Self {
        Self::List(vec![0])
    }
}

impl Positions {
    pub fn expand(&self) -> Result<Vec<i64>> {
        let range = match self {
            Self::List(list) => return Ok(list.clone()),
            Self::Range(range) => range,
        };
        let re = Regex::new(r"^\s*(-?\d+)\s*\.\.(=?)\s*(-?\d+)\s*$")
            .map_err(|e| SaberPlishError::InvalidParameter(e.to_string()))?;
        let caps = re.captures(range).ok_or_else(|| {
            SaberPlishError::InvalidParameter(format!(
                "position range '{range}' is not of the form 'a..b' or 'a..=b'"
            ))
        })?;
        let bound = |i: usize| {
            caps[i].parse::<i64>().map_err(|e| {
                SaberPlishError::InvalidParameter(format!("position range '{range}': {e}"))
            })
        };
        let (start, end) = (bound(1)?, bound(3)?);
        let inclusive = &caps[2] == "=";
        let count = (end as i128 - start as i128 + i128::from(inclusive)).max(0);
        if count > MAX_SWEEP_POINTS as i128 {
            return Err(SaberPlishError::InvalidParameter(format!(
                "position range '{range}' has {count} positions, more than {MAX_SWEEP_POINTS}"
            )));
        }
        Ok(match &caps[2] {
            "=" => (start..=end).collect(),
            _ => (start..end).collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToeholdVariant {
    pub toehold: bool,
    pub toe_len: usize,
    pub stem_len: usize,
}

impl Default for ToeholdVariant {
    fn default() -> Self {
        let probe = ProbeParams::default();
        Self {
            toehold: probe.toehold,
            toe_len: probe.toe_len,
            stem_len: probe.stem_len,
        }
    }
}

fn default_probe_lens() -> Vec<usize> {
    vec![ProbeParams::default().probe_len]
}

fn default_toeholds() -> Vec<ToeholdVariant> {
    vec![ToeholdVariant::default()]
}

fn default_sodium() -> Vec<f64> {
    vec![ReportParams::default().sodium]
}

fn default_celsius() -> Vec<f64> {
    vec![ReportParams::default().celsius]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub is_bridge: BridgeInput,
    pub sf_bridge: BridgeInput,
    #[serde(default)]
    pub primer: String,
    #[serde(default = "default_probe_lens")]
    pub probe_lens: Vec<usize>,
    #[serde(default)]
    pub positions: Positions,
    #[serde(default = "default_toeholds")]
    pub toeholds: Vec<ToeholdVariant>,
    #[serde(default = "default_sodium")]
    pub sodium: Vec<f64>,
    #[serde(default = "default_celsius")]
    pub celsius: Vec<f64>,
}

impl SweepConfig {
    /// Every combination, probe length varying slowest.
    pub fn points(&self) -> Result<Vec<ReportParams>> {
        let positions = self.positions.expand()?;
        let total = [
            self.probe_lens.len(),
            positions.len(),
            self.toeholds.len(),
            self.sodium.len(),
            self.celsius.len(),
        ]
        .into_iter()
        .try_fold(1usize, usize::checked_mul)
        .filter(|total| *total <= MAX_SWEEP_POINTS)
        .ok_or_else(|| {
            SaberPlishError::InvalidParameter(format!(
                "sweep expands to more than {MAX_SWEEP_POINTS} points"
            ))
        })?;
        debug!(total, "expanding sweep");
        Ok(iproduct!(
            &self.probe_lens,
            &positions,
            &self.toeholds,
            &self.sodium,
            &self.celsius
        )
        .map(|(probe_len, pos, toehold, sodium, celsius)| ReportParams {
            probe: ProbeParams {
                probe_len: *probe_len,
                pos: *pos,
                toehold: toehold.toehold,
                toe_len: toehold.toe_len,
                stem_len: toehold.stem_len,
            },
            sodium: *sodium,
            celsius: *celsius,
        })
        .collect())
    }
}

/// Run every point of `config` through `solver`. Points whose probe cannot be
/// built are skipped; any other error ends the sweep.
pub fn run_sweep_with<S: TubeSolver + Sync + ?Sized>(
    solver: &S,
    config: &SweepConfig,
) -> Result<Vec<ReportRecord>> {
    let is_bridge = config.is_bridge.to_strand(DEFAULT_IS_BRIDGE_NAME)?;
    let sf_bridge = config.sf_bridge.to_strand(DEFAULT_SF_BRIDGE_NAME)?;
    let points = config.points()?;
    info!(points = points.len(), "starting sweep");

    let records = points
        .into_par_iter()
        .map(|params| {
            let design = match SaberPlishDesign::new(&is_bridge, &sf_bridge, &config.primer, &params)
            {
                Ok(design) => design,
                Err(SaberPlishError::InvalidParameter(reason)) => {
                    warn!(
                        probe_len = params.probe.probe_len,
                        pos = params.probe.pos,
                        toehold = params.probe.toehold,
                        "skipping sweep point: {reason}"
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let analysis = design.analyze(solver)?;
            design.record(&analysis).map(Some)
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    info!(records = records.len(), "sweep finished");
    Ok(records)
}

pub fn run_sweep(config: &SweepConfig) -> Result<Vec<ReportRecord>> {
    run_sweep_with(&NearestNeighborSolver, config)
}

pub fn write_csv<W: Write>(records: &[ReportRecord], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv_path<P: AsRef<Path>>(records: &[ReportRecord], path: P) -> Result<()> {
    write_csv(records, File::create(path)?)
}

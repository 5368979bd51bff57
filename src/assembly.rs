//! Strands, complexes and tubes of one SABER-PLISH design, and the flat
//! report extracted from their analysis.

use crate::error::{Result, SaberPlishError};
use crate::probe::{build_probe, ProbeParams};
use saberplish_render::{draw_structure, DrawOptions};
use saberplish_thermo::{
    Complex, Compute, Material, Model, NearestNeighborSolver, SetSpec, SolverError, Strand, Tube,
    TubeAnalysis, TubeSolver,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const STRAND_CONCENTRATION: f64 = 1e-6;
pub const LIGATION_BRIDGE: &str = "Ligation bridge";

pub const UNLIGATED_TUBE: &str = "unligated SABER-PLISH";
pub const LIGATED_TUBE: &str = "ligated SABER-PLISH";
pub const NO_IMMUNOSABER_TUBE: &str = "neg control (no-immunoSaber)";
pub const NO_SABERFISH_TUBE: &str = "negative control (no saber-FISH)";

/// Complex names accepted by [`SaberPlishDesign::complex`].
pub const COMPLEX_NAMES: [&str; 4] = ["c3", "c3L", "bc1", "bc2"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    #[serde(flatten)]
    pub probe: ProbeParams,
    /// Na+ in mol/L.
    pub sodium: f64,
    pub celsius: f64,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            probe: ProbeParams::default(),
            sodium: 0.39,
            celsius: 42.0,
        }
    }
}

/// One row of a report. Concentrations are in mol/L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub strand: String,
    pub pos: i64,
    pub probe_len: usize,
    pub celsius: f64,
    pub sodium: f64,
    pub toehold: bool,
    pub toe_len: usize,
    pub stem_len: usize,
    pub c3: f64,
    #[serde(rename = "c3L")]
    pub c3_l: f64,
    pub bc1: f64,
    pub bc2: f64,
    pub bc1_nc: f64,
    pub bc2_nc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaberPlishDesign {
    pub params: ReportParams,
    pub is_bridge: Strand,
    pub sf_bridge: Strand,
    pub probe: Strand,
    pub ligation_bridge: Strand,
    /// SaberFISH bridge, probe and ImmunoSaber bridge
    pub c3: Complex,
    /// ligated bridge and probe
    pub c3_l: Complex,
    /// SaberFISH bridge and probe
    pub bc1: Complex,
    /// ImmunoSaber bridge and probe
    pub bc2: Complex,
    /// unligated, ligated, no ImmunoSaber, no SaberFISH
    pub tubes: [Tube; 4],
    pub model: Model,
}

impl SaberPlishDesign {
    pub fn new(
        is_bridge: &Strand,
        sf_bridge: &Strand,
        primer: &str,
        params: &ReportParams,
    ) -> Result<Self> {
        let probe = build_probe(is_bridge.sequence(), sf_bridge.sequence(), primer, &params.probe)?;
        let ligation_bridge = Strand::new(
            &format!("{}{}", is_bridge.sequence(), sf_bridge.sequence()),
            LIGATION_BRIDGE,
        )?;

        let is_bridge = is_bridge.clone();
        let sf_bridge = sf_bridge.clone();
        let c3 = Complex::new([sf_bridge.clone(), probe.clone(), is_bridge.clone()]);
        let c3_l = Complex::new([ligation_bridge.clone(), probe.clone()]);
        let bc1 = Complex::new([sf_bridge.clone(), probe.clone()]);
        let bc2 = Complex::new([is_bridge.clone(), probe.clone()]);

        let conc = |s: &Strand| (s.clone(), STRAND_CONCENTRATION);
        let tubes = [
            Tube::new(
                [conc(&sf_bridge), conc(&is_bridge), conc(&probe)],
                SetSpec::new(3, vec![c3.clone(), bc1.clone(), bc2.clone()]),
                UNLIGATED_TUBE,
            )?,
            Tube::new(
                [conc(&ligation_bridge), conc(&probe)],
                SetSpec::new(2, vec![c3_l.clone()]),
                LIGATED_TUBE,
            )?,
            Tube::new(
                [conc(&sf_bridge), conc(&probe)],
                SetSpec::new(2, vec![bc1.clone()]),
                NO_IMMUNOSABER_TUBE,
            )?,
            Tube::new(
                [conc(&is_bridge), conc(&probe)],
                SetSpec::new(2, vec![bc2.clone()]),
                NO_SABERFISH_TUBE,
            )?,
        ];
        debug!(probe = probe.name(), len = probe.len(), "assembled design");

        Ok(Self {
            params: *params,
            is_bridge,
            sf_bridge,
            probe,
            ligation_bridge,
            c3,
            c3_l,
            bc1,
            bc2,
            tubes,
            model: Model::new(Material::Dna, params.sodium, params.celsius),
        })
    }

    pub fn complex(&self, name: &str) -> Option<&Complex> {
        match name {
            "c3" => Some(&self.c3),
            "c3L" => Some(&self.c3_l),
            "bc1" => Some(&self.bc1),
            "bc2" => Some(&self.bc2),
            _ => None,
        }
    }

    /// One batched solver call over all four tubes.
    pub fn analyze<S: TubeSolver + ?Sized>(&self, solver: &S) -> Result<TubeAnalysis> {
        Ok(solver.analyze(&self.tubes, &self.model, &[Compute::Pfunc, Compute::Mfe])?)
    }

    pub fn record(&self, analysis: &TubeAnalysis) -> Result<ReportRecord> {
        let [unligated, ligated, no_is, no_sf] = &self.tubes;
        let unligated = analysis.tube(unligated)?;
        let probe = &self.params.probe;
        Ok(ReportRecord {
            strand: self.probe.sequence().to_string(),
            pos: probe.pos,
            probe_len: probe.probe_len,
            celsius: self.params.celsius,
            sodium: self.params.sodium,
            toehold: probe.toehold,
            toe_len: probe.toe_len,
            stem_len: probe.stem_len,
            c3: unligated.concentration(&self.c3)?,
            c3_l: analysis.tube(ligated)?.concentration(&self.c3_l)?,
            bc1: unligated.concentration(&self.bc1)?,
            bc2: unligated.concentration(&self.bc2)?,
            bc1_nc: analysis.tube(no_is)?.concentration(&self.bc1)?,
            bc2_nc: analysis.tube(no_sf)?.concentration(&self.bc2)?,
        })
    }
}

pub fn report_with<S: TubeSolver + ?Sized>(
    solver: &S,
    is_bridge: &Strand,
    sf_bridge: &Strand,
    primer: &str,
    params: &ReportParams,
) -> Result<ReportRecord> {
    let design = SaberPlishDesign::new(is_bridge, sf_bridge, primer, params)?;
    let analysis = design.analyze(solver)?;
    let record = design.record(&analysis)?;
    info!(
        probe = design.probe.name(),
        celsius = params.celsius,
        sodium = params.sodium,
        c3 = record.c3,
        c3_l = record.c3_l,
        "report"
    );
    Ok(record)
}

/// [`report_with`] using the built-in nearest-neighbor solver.
pub fn report(
    is_bridge: &Strand,
    sf_bridge: &Strand,
    primer: &str,
    params: &ReportParams,
) -> Result<ReportRecord> {
    report_with(&NearestNeighborSolver, is_bridge, sf_bridge, primer, params)
}

/// SVG drawing of the MFE structure of `complex`.
pub fn draw_complex(
    analysis: &TubeAnalysis,
    complex: &Complex,
    options: &DrawOptions,
) -> Result<String> {
    let mfe = analysis.complex(complex)?.mfe.first().ok_or_else(|| {
        SaberPlishError::Solver(SolverError::MissingResult(format!(
            "MFE structure of {complex}"
        )))
    })?;
    Ok(draw_structure(&mfe.structure, &complex.sequence(), options)?)
}


#[cfg(test)]
mod solver_tests {
    use super::*;

    const IS: &str = "AAAACCCCGGGGTTTT";
    const SF: &str = "TTTTGGGGCCCCAAAA";
    const PRIMER: &str = "ACGTACGTAC";

    fn bridges() -> (Strand, Strand) {
        (
            Strand::new(IS, "IS bridge").unwrap(),
            Strand::new(SF, "SF bridge").unwrap(),
        )
    }

    fn params(sodium: f64, celsius: f64) -> ReportParams {
        ReportParams {
            probe: ProbeParams {
                probe_len: 10,
                ..Default::default()
            },
            sodium,
            celsius,
        }
    }

    fn values(r: &ReportRecord) -> [f64; 6] {
        [r.c3, r.c3_l, r.bc1, r.bc2, r.bc1_nc, r.bc2_nc]
    }

    #[test]
    fn test_report_concentrations_are_physical() {
        let (is, sf) = bridges();
        let record = report(&is, &sf, PRIMER, &params(0.39, 42.0)).unwrap();
        assert_eq!(record.strand, "CAAAAAAAACTTACGTACGTAC");
        for c in values(&record) {
            assert!(c.is_finite());
            assert!(c >= 0.0);
            assert!(c <= STRAND_CONCENTRATION * (1.0 + 1e-6));
        }
    }

    #[test]
    fn test_buffer_changes_concentrations_not_strand() {
        let (is, sf) = bridges();
        let warm = report(&is, &sf, PRIMER, &params(0.39, 42.0)).unwrap();
        let cold = report(&is, &sf, PRIMER, &params(0.39, 10.0)).unwrap();
        let salty = report(&is, &sf, PRIMER, &params(1.0, 42.0)).unwrap();

        assert_eq!(warm.strand, cold.strand);
        assert_eq!(warm.strand, salty.strand);
        assert_ne!(values(&warm), values(&cold));
        assert_ne!(values(&warm), values(&salty));
    }

    #[test]
    fn test_invalid_buffer_is_solver_error() {
        let (is, sf) = bridges();
        let err = report(&is, &sf, PRIMER, &params(3.0, 42.0)).unwrap_err();
        assert!(matches!(
            err,
            SaberPlishError::Solver(SolverError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_mfe_of_each_complex_can_be_drawn() {
        let (is, sf) = bridges();
        let design = SaberPlishDesign::new(&is, &sf, PRIMER, &params(0.39, 25.0)).unwrap();
        let analysis = design.analyze(&NearestNeighborSolver).unwrap();
        for name in COMPLEX_NAMES {
            let complex = design.complex(name).unwrap();
            let svg = draw_complex(&analysis, complex, &DrawOptions::default()).unwrap();
            assert!(svg.starts_with("<svg"));
            assert_eq!(
                svg.matches("class=\"backbone\"").count(),
                complex.size(),
                "{name}"
            );
        }
    }
}

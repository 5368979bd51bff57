//! Tube solver for small DNA hybridization systems.
//!
//! Strands, complexes and tubes describe what is mixed; [`TubeSolver`]
//! turns them into partition functions, MFE structures and equilibrium
//! concentrations. [`NearestNeighborSolver`] is a helix-level
//! nearest-neighbor implementation:
//!
//! ```
//! use saberplish_thermo::{tube_analysis, Complex, Compute, Model, SetSpec, Strand, Tube};
//!
//! let a = Strand::new("GGATCCAGTCAGGTCAAC", "a").unwrap();
//! let b = Strand::new("GTTGACCTGACTGGATCC", "b").unwrap();
//! let duplex = Complex::new([a.clone(), b.clone()]);
//! let tube = Tube::new([(a, 1e-6), (b, 1e-6)], SetSpec::new(2, vec![]), "t").unwrap();
//! let result = tube_analysis(&[tube.clone()], &Model::default(), &[Compute::Pfunc]).unwrap();
//! assert!(result.tube(&tube).unwrap().concentration(&duplex).unwrap() > 0.9e-6);
//! ```

mod equilibrium;
mod error;
mod model;
mod params;
mod strand;
mod structure;
mod tube;

pub use error::SolverError;
pub use model::{EnumerationLimits, Material, Model};
pub use strand::{complement, is_complementary, is_dna_base, Complex, Strand};
pub use structure::{fold_complex, ComplexResult, MfeStructure};
pub use tube::{
    tube_analysis, ComplexConcentration, ComplexEntry, Compute, NearestNeighborSolver, SetSpec,
    Tube, TubeAnalysis, TubeResult, TubeSolver,
};

//! SABER-PLISH probe construction and hybridization reports.
//!
//! ```
//! use saberplish::probe::{build_probe, ProbeParams};
//!
//! let params = ProbeParams { probe_len: 10, ..Default::default() };
//! let probe = build_probe("AAAACCCCGGGGTTTT", "TTTTGGGGCCCCAAAA", "ACGTACGTAC", &params).unwrap();
//! assert_eq!(probe.sequence(), "CAAAAAAAACTTACGTACGTAC");
//! ```

pub mod about;
pub mod assembly;
pub mod config;
pub mod error;
pub mod probe;
pub mod sweep;

pub use assembly::{draw_complex, report, report_with, ReportParams, ReportRecord, SaberPlishDesign};
pub use error::SaberPlishError;
pub use probe::{build_probe, ProbeParams};
pub use saberplish_render as render;
pub use saberplish_thermo as thermo;

//! Error types for the tube solver.

/// Everything that can go wrong while setting up or solving a tube analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// Buffer or temperature outside what the parameter set covers.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A strand that cannot be folded (empty, or not A/C/G/T).
    #[error("invalid strand '{name}': {reason}")]
    InvalidStrand { name: String, reason: String },

    /// Inconsistent tube definition (bad concentration, unknown strand, ...).
    #[error("invalid tube '{tube}': {reason}")]
    InvalidTube { tube: String, reason: String },

    /// The mass-action solve did not reach the requested tolerance.
    #[error(
        "concentration solve for tube '{tube}' did not converge after {iterations} iterations (residual={residual:.2e}, tol={tolerance:.2e})"
    )]
    NonConvergence {
        tube: String,
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },

    /// A result was requested for a tube or complex that was not analyzed.
    #[error("no result for {0}")]
    MissingResult(String),
}

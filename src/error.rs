use saberplish_render::RenderError;
use saberplish_thermo::SolverError;

#[derive(Debug, thiserror::Error)]
pub enum SaberPlishError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("could not render structure: {0}")]
    Render(#[from] RenderError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = SaberPlishError> = std::result::Result<T, E>;

use thiserror::Error;

use crate::analyzer::Diagnostic;

#[derive(Error, Debug)]
pub enum ResolutionError {
    // Structural errors, raised before solving
    #[error("Mods share ID with builtin mod {builtin}: {others}")]
    BuiltinCollision { builtin: String, others: String },

    #[error("duplicate mod {0}")]
    DuplicateMod(String),

    #[error("Invalid phase ordering: {0}")]
    InvalidPhaseOrdering(String),

    // Solver errors
    #[error("Mod resolution encountered an incompatible mod set!\n{0}")]
    Unsatisfiable(Box<Diagnostic>),

    #[error("Solving failed: exceeded the limit of {0} decisions")]
    SolverBudgetExceeded(u64),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse resolver configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResolutionError {
    /// The solver diagnostic, if this is an unsatisfiable mod set
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ResolutionError::Unsatisfiable(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolutionError>;

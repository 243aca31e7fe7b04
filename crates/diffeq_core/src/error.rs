use thiserror::Error;

/// Failures the numerical core can report.
///
/// Non-convergence of the Newton solver is deliberately absent: the solver
/// returns its last iterate and flags it in `NewtonSolution::converged`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("matrix is singular: no nonzero pivot in column {column}")]
    SingularMatrix { column: usize },

    #[error("unknown integration method: {0}")]
    UnknownMethod(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

// src/error.rs
use std::fmt;

/// Custom error types for the dengue-sde library
#[derive(Debug, Clone, PartialEq)]
pub enum SdeError {
    /// Invalid argument or parameter value
    InvalidArgument {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Inconsistent shapes between state, drift, diffusion or parameters
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A drift or diffusion evaluation produced an unusable value
    EvaluationFailure { evaluator: String, reason: String },

    /// Symbol resolution failed while compiling an expression
    CompilationError { reason: String },

    /// Expression text could not be parsed
    ParseError {
        input: String,
        position: usize,
        reason: String,
    },

    /// Writing results failed
    Io { path: String, reason: String },
}

impl fmt::Display for SdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdeError::InvalidArgument {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid argument '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            SdeError::DimensionMismatch {
                context,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Dimension mismatch in {}: expected {}, found {}",
                    context, expected, found
                )
            }
            SdeError::EvaluationFailure { evaluator, reason } => {
                write!(f, "Evaluation of {} failed: {}", evaluator, reason)
            }
            SdeError::CompilationError { reason } => {
                write!(f, "Expression compilation failed: {}", reason)
            }
            SdeError::ParseError {
                input,
                position,
                reason,
            } => {
                write!(
                    f,
                    "Parse error at position {} in '{}': {}",
                    position, input, reason
                )
            }
            SdeError::Io { path, reason } => {
                write!(f, "I/O error on '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for SdeError {}

/// Result type alias for dengue-sde operations
pub type SdeResult<T> = Result<T, SdeError>;

/// Validation utilities
pub mod validation {
    use super::{SdeError, SdeResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> SdeResult<()> {
        if !(value > 0.0) {
            Err(SdeError::InvalidArgument {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> SdeResult<()> {
        if !(value >= 0.0) {
            Err(SdeError::InvalidArgument {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> SdeResult<()> {
        if !value.is_finite() {
            Err(SdeError::InvalidArgument {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate steps count
    pub fn validate_steps(steps: usize) -> SdeResult<()> {
        if steps == 0 {
            Err(SdeError::InvalidArgument {
                parameter: "n_steps".to_string(),
                value: 0.0,
                constraint: "must be greater than 0".to_string(),
            })
        } else if steps > 50_000_000 {
            Err(SdeError::InvalidArgument {
                parameter: "n_steps".to_string(),
                value: steps as f64,
                constraint: "exceeds maximum allowed (50 million)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate ensemble size
    pub fn validate_trajectories(trajectories: usize) -> SdeResult<()> {
        if trajectories == 0 {
            Err(SdeError::InvalidArgument {
                parameter: "trajectories".to_string(),
                value: 0.0,
                constraint: "must be greater than 0".to_string(),
            })
        } else if trajectories > 1_000_000 {
            Err(SdeError::InvalidArgument {
                parameter: "trajectories".to_string(),
                value: trajectories as f64,
                constraint: "exceeds maximum allowed (1 million)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a length matches what a consumer expects
    pub fn validate_dimension(context: &str, expected: usize, found: usize) -> SdeResult<()> {
        if expected != found {
            Err(SdeError::DimensionMismatch {
                context: context.to_string(),
                expected,
                found,
            })
        } else {
            Ok(())
        }
    }
}

use thiserror::Error;

/// Lengths below this threshold are treated as degenerate when normalizing.
pub const MIN_LENGTH: f64 = 1e-12;

/// Errors that can occur while integrating a system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("{buffer} has {found} elements, expected {expected}")]
    Cardinality {
        buffer: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{law} cannot normalize a vector of length {length}")]
    DegenerateLength { law: &'static str, length: f64 },

    #[error("non-finite derivative for element {index}")]
    NonFiniteDerivative { index: usize },

    #[error("step size must be finite and positive, got {h}")]
    InvalidStep { h: f64 },

    #[error("modified midpoint needs at least 2 substeps, got {substeps}")]
    InvalidSubsteps { substeps: usize },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("failed to allocate scratch buffers for {len} elements")]
    Allocation { len: usize },

    #[error("{law} references element {index}, but only {len} exist")]
    IndexOutOfRange {
        law: &'static str,
        index: usize,
        len: usize,
    },
}

impl IntegrationError {
    /// Validates that `h` is usable as a step size.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidStep`] if `h` is not finite or not
    /// strictly positive.
    pub fn check_step(h: f64) -> Result<(), Self> {
        if h.is_finite() && h > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidStep { h })
        }
    }
}

/// Checks that a buffer has the cardinality an integrator was sized for.
///
/// # Errors
///
/// Returns [`IntegrationError::Cardinality`] naming `buffer` on mismatch.
pub fn ensure_len(
    buffer: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), IntegrationError> {
    if expected == found {
        Ok(())
    } else {
        Err(IntegrationError::Cardinality {
            buffer,
            expected,
            found,
        })
    }
}

use super::{ScaleGrow, ScaleShrink};

/// Configuration for the adaptive steppers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-derive", serde(default))]
pub struct AdaptiveConfig {
    pub min_step: f64,
    pub max_step: f64,
    pub shrink_factor: f64,
    pub grow_factor: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_step: 1e-6,
            max_step: 1.0,
            shrink_factor: 0.5,
            grow_factor: 1.259_921,
        }
    }
}

impl AdaptiveConfig {
    /// Validates step bounds and scale factors.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound is non-positive or non-finite, if
    /// `min_step > max_step`, or if a factor would not shrink or grow.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.min_step.is_finite() || self.min_step <= 0.0 {
            return Err("min_step must be finite and positive");
        }
        if !self.max_step.is_finite() || self.max_step <= 0.0 {
            return Err("max_step must be finite and positive");
        }
        if self.min_step > self.max_step {
            return Err("min_step must not exceed max_step");
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err("shrink_factor must be in (0, 1)");
        }
        if !self.grow_factor.is_finite() || self.grow_factor < 1.0 {
            return Err("grow_factor must be finite and at least 1");
        }
        Ok(())
    }

    /// Shrink policy built from `shrink_factor` and `min_step`.
    #[must_use]
    pub fn shrink_policy(&self) -> ScaleShrink {
        ScaleShrink {
            factor: self.shrink_factor,
            min_step: self.min_step,
        }
    }

    /// Grow policy built from `grow_factor` and `max_step`.
    #[must_use]
    pub fn grow_policy(&self) -> ScaleGrow {
        ScaleGrow {
            factor: self.grow_factor,
            max_step: self.max_step,
        }
    }
}

use sinew_core::{GrowPolicy, ShrinkPolicy};

/// Multiplies the step by `factor`, never going below `min_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleShrink {
    pub factor: f64,
    pub min_step: f64,
}

impl Default for ScaleShrink {
    fn default() -> Self {
        Self {
            factor: 0.5,
            min_step: 1e-6,
        }
    }
}

impl ShrinkPolicy for ScaleShrink {
    fn shrink(&self, h: f64) -> f64 {
        (self.factor * h).max(self.min_step)
    }
}

/// Multiplies the step by `factor`, never going above `max_step`.
///
/// The default factor is the cube root of two, so three consecutive
/// acceptances double the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleGrow {
    pub factor: f64,
    pub max_step: f64,
}

impl Default for ScaleGrow {
    fn default() -> Self {
        Self {
            factor: 1.259_921,
            max_step: 1.0,
        }
    }
}

impl GrowPolicy for ScaleGrow {
    fn grow(&self, h: f64) -> f64 {
        (self.factor * h).min(self.max_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn shrink_halves_down_to_the_floor() {
        let shrink = ScaleShrink::default();
        assert_relative_eq!(shrink.shrink(0.1), 0.05);
        assert_relative_eq!(shrink.shrink(1.5e-6), 1e-6);
        assert_relative_eq!(shrink.shrink(1e-6), 1e-6);
    }

    #[test]
    fn grow_scales_up_to_the_ceiling() {
        let grow = ScaleGrow::default();
        assert_relative_eq!(grow.grow(0.1), 0.125_992_1);
        assert_relative_eq!(grow.grow(0.9), 1.0);
    }

    #[test]
    fn three_growths_nearly_double() {
        let grow = ScaleGrow::default();
        let h = grow.grow(grow.grow(grow.grow(0.01)));
        assert_relative_eq!(h, 0.02, max_relative = 1e-5);
    }
}

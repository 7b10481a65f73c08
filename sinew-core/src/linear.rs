use std::ops::{Add, Mul};

use crate::StepLaw;

/// The plain explicit step `S' = S + D * h`.
///
/// Suitable for any state whose derivative scales into a state increment,
/// such as `f64` or vector types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinearStep;

impl<S, D> StepLaw<S, D> for LinearStep
where
    S: Clone + Add<Output = S>,
    D: Clone + Mul<f64, Output = S>,
{
    fn step(&self, initial: &[S], derivative: &[D], h: f64, out: &mut [S]) {
        for ((out, s), d) in out.iter_mut().zip(initial).zip(derivative) {
            *out = s.clone() + d.clone() * h;
        }
    }
}

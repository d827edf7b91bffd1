/// Easing curves applied to normalized tween progress.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Ease {
    /// Used by scroll-bound tweens so the camera tracks the page 1:1.
    Linear,
    /// Quadratic ease-out; the default for fixed-duration tweens.
    #[default]
    Power1Out,
}

impl Ease {
    /// Maps `t` in `[0, 1]` to eased progress. Input is clamped.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

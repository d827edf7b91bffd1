use foundation::time::Time;

/// Frame metadata handed to everything that advances per tick.
///
/// The browser drives frames with a variable delta; tests drive them with a
/// fixed one. Both go through [`Frame::advance`] so the timebase stays the
/// single source of truth for tween progress.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Delta time since the previous frame (seconds).
    pub dt_s: f64,
    /// Engine time at the start of the frame (seconds).
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    /// The frame before any time has elapsed.
    pub fn origin() -> Self {
        Self::new(0, 0.0)
    }

    /// Advance by a caller-measured delta. Negative or non-finite deltas
    /// count as zero so a hiccup in the host clock never rewinds tweens.
    pub fn advance(self, dt_s: f64) -> Self {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        Self {
            index: self.index + 1,
            dt_s,
            time: self.time.advance(dt_s),
        }
    }
}

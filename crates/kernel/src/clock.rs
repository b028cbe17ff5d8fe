/// Number of recent deltas kept for the frame-rate estimate.
const HISTORY: usize = 60;

/// Turns the host's elapsed-time signal into per-tick deltas.
///
/// # Invariants
/// - Deltas are never negative and never exceed `max_delta`.
/// - A backwards or non-finite elapsed time yields a zero delta and leaves
///   the reference point unchanged.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: f64,
    max_delta: f64,
    frames: u64,
    history: [f64; HISTORY],
    index: usize,
    filled: bool,
}

impl FrameClock {
    /// A clock starting at elapsed time zero. A non-positive `max_delta`
    /// disables the clamp.
    pub fn new(max_delta: f64) -> Self {
        Self {
            last: 0.0,
            max_delta,
            frames: 0,
            history: [0.0; HISTORY],
            index: 0,
            filled: false,
        }
    }

    /// Record a new elapsed time (seconds since the host started) and return
    /// the delta since the previous call.
    pub fn advance(&mut self, elapsed: f64) -> f64 {
        self.frames += 1;
        if !elapsed.is_finite() {
            tracing::warn!(elapsed, "non-finite elapsed time; delta forced to 0");
            self.record(0.0);
            return 0.0;
        }
        if elapsed < self.last {
            tracing::warn!(elapsed, last = self.last, "clock went backwards; delta forced to 0");
            self.record(0.0);
            return 0.0;
        }

        let raw = elapsed - self.last;
        self.last = elapsed;
        let delta = clamp_delta(raw, self.max_delta);
        if delta < raw {
            tracing::debug!(raw, delta, "delta clamped");
        }
        self.record(delta);
        delta
    }

    fn record(&mut self, delta: f64) {
        self.history[self.index] = delta;
        self.index = (self.index + 1) % HISTORY;
        if self.index == 0 {
            self.filled = true;
        }
    }

    /// Elapsed time of the last accepted sample.
    pub fn last_elapsed(&self) -> f64 {
        self.last
    }

    /// Calls to [`advance`](Self::advance) so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mean delta over the recent history.
    pub fn average_delta(&self) -> f64 {
        let count = if self.filled { HISTORY } else { self.index };
        if count == 0 {
            return 0.0;
        }
        self.history[..count].iter().sum::<f64>() / count as f64
    }

    /// Frames per second from the recent history, or 0 with no timing yet.
    pub fn fps(&self) -> f64 {
        let avg = self.average_delta();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.25)
    }
}

/// Clamp a delta into `[0, max]`. Non-finite deltas become 0; a
/// non-positive `max` disables the upper bound.
pub fn clamp_delta(delta: f64, max: f64) -> f64 {
    if !delta.is_finite() || delta <= 0.0 {
        return 0.0;
    }
    if max > 0.0 { delta.min(max) } else { delta }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_follow_elapsed() {
        let mut clock = FrameClock::new(1.0);
        assert!((clock.advance(0.016) - 0.016).abs() < 1e-12);
        assert!((clock.advance(0.048) - 0.032).abs() < 1e-12);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn backwards_time_yields_zero() {
        let mut clock = FrameClock::new(1.0);
        clock.advance(2.0);
        assert_eq!(clock.advance(1.5), 0.0);
        assert_eq!(clock.last_elapsed(), 2.0);
        assert!((clock.advance(2.1) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn nan_yields_zero() {
        let mut clock = FrameClock::new(1.0);
        clock.advance(1.0);
        assert_eq!(clock.advance(f64::NAN), 0.0);
        assert_eq!(clock.last_elapsed(), 1.0);
    }

    #[test]
    fn large_gaps_are_clamped() {
        let mut clock = FrameClock::new(0.25);
        assert_eq!(clock.advance(10.0), 0.25);
        assert_eq!(clock.last_elapsed(), 10.0);
    }

    #[test]
    fn fps_from_history() {
        let mut clock = FrameClock::new(1.0);
        assert_eq!(clock.fps(), 0.0);
        for i in 1..=100 {
            clock.advance(i as f64 * 0.02);
        }
        assert!((clock.fps() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_delta_edges() {
        assert_eq!(clamp_delta(-1.0, 0.25), 0.0);
        assert_eq!(clamp_delta(f64::INFINITY, 0.25), 0.0);
        assert_eq!(clamp_delta(0.5, 0.25), 0.25);
        assert_eq!(clamp_delta(5.0, 0.0), 5.0);
    }
}

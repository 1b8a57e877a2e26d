//! Fixed-step timing.
//!
//! The world always advances in whole ticks of `fixed_dt`. In realtime mode
//! wall-clock frame time is accumulated and converted into ticks; otherwise
//! the runner steps as fast as it can.

use std::time::{Duration, Instant};

/// Most ticks run for a single frame before the backlog is dropped.
pub const MAX_STEPS_PER_FRAME: u32 = 10;

/// Converts elapsed time into fixed ticks.
#[derive(Debug)]
pub struct FixedStep {
    fixed_dt: f32,
    accumulator: f32,
    max_frame_dt: f32,
    last_frame: Instant,
}

impl FixedStep {
    /// Creates a stepper ticking every `fixed_dt` seconds.
    #[must_use]
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(0.001),
            accumulator: 0.0,
            max_frame_dt: 0.25,
            last_frame: Instant::now(),
        }
    }

    /// Tick length in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Seconds since the previous call, capped to avoid a spiral of death.
    pub fn frame_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(self.max_frame_dt)
    }

    /// Accumulates `dt` and returns how many ticks are due.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the cap: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleeps until one tick has passed since the last frame.
    pub fn wait_for_tick(&self) {
        let budget = Duration::from_secs_f32(self.fixed_dt);
        let elapsed = self.last_frame.elapsed();
        if elapsed < budget {
            std::thread::sleep(budget - elapsed);
        }
    }

    /// Forgets accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_frame = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_whole_ticks() {
        let mut step = FixedStep::new(0.1);
        assert_eq!(step.accumulate(0.05), 0);
        assert_eq!(step.accumulate(0.06), 1);
        assert_eq!(step.accumulate(0.2), 2);
    }

    #[test]
    fn test_accumulate_caps_backlog() {
        let mut step = FixedStep::new(0.01);
        assert_eq!(step.accumulate(1.0), MAX_STEPS_PER_FRAME);
        // Backlog dropped, so a tiny frame yields nothing
        assert_eq!(step.accumulate(0.001), 0);
    }

    #[test]
    fn test_negative_time_ignored() {
        let mut step = FixedStep::new(0.1);
        assert_eq!(step.accumulate(-1.0), 0);
        assert_eq!(step.accumulate(0.1), 1);
    }

    #[test]
    fn test_frame_time_capped() {
        let mut step = FixedStep::new(1.0 / 60.0);
        step.reset();
        assert!(step.frame_time() <= 0.25);
    }
}

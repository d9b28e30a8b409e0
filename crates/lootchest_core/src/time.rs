use std::time::{Duration, Instant};

/// Frame clock. Ticked once per frame by the window loop.
#[derive(Debug, Clone)]
pub struct Time {
    last_update: Instant,
    delta: Duration,
    elapsed: Duration,
    frame: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            last_update: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame: 0,
        }
    }
}

impl Time {
    /// Called by the engine loop once per frame
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_update;
        self.last_update = now;
        self.advance(delta);
    }

    /// Advances the clock by an explicit delta. `update` goes through here too,
    /// so frame accounting stays identical for measured and scripted ticks.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame += 1;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Returns time in seconds since last frame (e.g., 0.016 for 60fps)
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Returns total ticked time
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Fixed-step accumulator for the physics world.
///
/// Real frame time is accumulated and consumed in `fixed_dt` slices, at most
/// `max_substeps` per frame. Whatever is left over after the cap is folded
/// back under one slice so a long stall can't snowball into later frames.
#[derive(Debug, Clone)]
pub struct FixedStep {
    pub accumulator: f32,
    pub fixed_dt: f32,
    pub max_substeps: u32,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self {
            accumulator: 0.0,
            fixed_dt: 1.0 / 60.0,
            max_substeps: 3,
        }
    }
}

impl FixedStep {
    pub fn new(fixed_dt: f32, max_substeps: u32) -> Self {
        Self {
            accumulator: 0.0,
            fixed_dt,
            max_substeps,
        }
    }

    /// Feeds `dt` seconds in and returns how many fixed steps to run now.
    pub fn substeps(&mut self, dt: f32) -> u32 {
        // NaN or infinite input would poison the accumulator for good.
        if !dt.is_finite() || dt <= 0.0 || self.fixed_dt <= 0.0 {
            return 0;
        }

        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_substeps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }

        self.accumulator %= self.fixed_dt;
        steps
    }
}

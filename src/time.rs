use std::time::{Duration, Instant};

pub struct Time {
    start: Instant,
    last: Instant,
    pub delta: Duration,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, delta: Duration::from_secs_f32(0.0) }
    }
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last;
        self.last = now;
    }
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FrameTick {
    pub dt: f32,
    /// Raw delta when it exceeded the cap, e.g. after the window was backgrounded.
    pub stalled: Option<f32>,
}

/// Wall clock for the render loop that never hands out more than `max_dt` per frame.
pub struct FrameClock {
    time: Time,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self { time: Time::new(), max_dt }
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn tick(&mut self) -> FrameTick {
        self.time.tick();
        let raw = self.time.delta_seconds();
        let dt = clamp_frame_dt(raw, self.max_dt);
        FrameTick { dt, stalled: (raw > self.max_dt).then_some(raw) }
    }
}

pub fn clamp_frame_dt(raw: f32, max_dt: f32) -> f32 {
    if raw.is_finite() {
        raw.clamp(0.0, max_dt.max(0.0))
    } else {
        0.0
    }
}

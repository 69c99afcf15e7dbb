use crate::assets::{SpriteSheet, FRAME_SIZE};
use crate::timer::{Millis, TimerId, TimerQueue};

/// Frame cycling for the agent's current sprite sheet.
///
/// Owns the single frame ticker. Free-running stationary cycles and
/// movement-locked cycles share it, so starting either cancels the other.
#[derive(Debug, Default)]
pub struct SpriteFrameController {
    frame: u32,
    frame_count: u32,
    ticker: Option<TimerId>,
}

impl SpriteFrameController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a free-running cycle from frame 0. Single-frame sheets never tick.
    pub fn start<E: Clone>(
        &mut self,
        sheet: &SpriteSheet,
        timers: &mut TimerQueue<E>,
        now: Millis,
        event: E,
    ) {
        self.stop(timers);
        self.frame = 0;
        self.frame_count = sheet.info.frame_count;
        if self.frame_count <= 1 {
            return;
        }
        self.ticker = Some(timers.every(now, sheet.frame_interval, event));
    }

    /// Take over the ticker at a caller-chosen interval (movement-locked frames).
    pub fn drive<E: Clone>(
        &mut self,
        frame_count: u32,
        interval: Millis,
        timers: &mut TimerQueue<E>,
        now: Millis,
        event: E,
    ) {
        self.stop(timers);
        self.frame = 0;
        self.frame_count = frame_count.max(1);
        self.ticker = Some(timers.every(now, interval, event));
    }

    /// Cancel the running ticker. Idempotent.
    pub fn stop<E: Clone>(&mut self, timers: &mut TimerQueue<E>) {
        if let Some(id) = self.ticker.take() {
            timers.cancel(id);
        }
    }

    /// One tick: next frame, wrapping.
    pub fn advance(&mut self) -> u32 {
        if self.frame_count > 1 {
            self.frame = (self.frame + 1) % self.frame_count;
        }
        self.frame
    }

    /// Back to the first frame for a clean stop.
    pub fn rewind(&mut self) {
        self.frame = 0;
    }

    /// Whether `id` is the ticker this controller currently runs.
    pub fn owns(&self, id: TimerId) -> bool {
        self.ticker == Some(id)
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Horizontal background shift that shows the current frame.
    pub fn background_offset(&self) -> f64 {
        -(self.frame as f64) * FRAME_SIZE as f64
    }
}

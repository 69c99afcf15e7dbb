use crate::agent::Direction;
use crate::dice::Dice;
use crate::spatial::{SpatialModel, Zone};
use crate::timer::Millis;

/// Chance that crossing into the toy's zone turns into an attack.
pub const TOY_POUNCE_CHANCE: f64 = 0.33;

/// Where the scheduler wants the agent to go next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementIntent {
    pub direction: Direction,
    /// Distance in cases.
    pub distance: f64,
}

impl MovementIntent {
    /// Target case, clamped onto the stage.
    pub fn target(&self, from: f64, max_cases: f64) -> f64 {
        let raw = match self.direction {
            Direction::Left => from - self.distance,
            Direction::Right => from + self.distance,
        };
        raw.clamp(0.0, max_cases)
    }
}

/// How a tick of a running movement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    /// Still travelling.
    Continue,
    /// Crossed into the toy zone and won the pounce roll.
    PounceOnToy,
    /// Crossed into the bed zone; always wins over finishing the trip.
    ReachedBed,
    /// Nominal target reached.
    Arrived,
}

/// One frame-locked trip from `from` to `to` over a fixed wall-clock duration.
///
/// The sprite completes one full frame cycle per case travelled, so the tick
/// interval is `duration / (distance * frame_count)`.
#[derive(Debug, Clone)]
pub struct Movement {
    from: f64,
    to: f64,
    started_at: Millis,
    duration: Millis,
    frame_count: u32,
    position: f64,
}

impl Movement {
    /// `None` when there is nothing to interpolate: single-frame sheets,
    /// zero distance, or zero duration. The caller then jumps straight to `to`.
    pub fn begin(
        from: f64,
        to: f64,
        duration: Millis,
        frame_count: u32,
        now: Millis,
    ) -> Option<Self> {
        let distance = (to - from).abs();
        if frame_count <= 1 || distance <= f64::EPSILON || duration == 0 {
            return None;
        }
        Some(Self {
            from,
            to,
            started_at: now,
            duration,
            frame_count,
            position: from,
        })
    }

    /// Ticker period, rounded to whole milliseconds.
    pub fn tick_interval(&self) -> Millis {
        let total_frames = (self.to - self.from).abs() * self.frame_count as f64;
        ((self.duration as f64 / total_frames).round() as Millis).max(1)
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Last interpolated (or snapped) position.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn progress(&self, now: Millis) -> f64 {
        let elapsed = now.saturating_sub(self.started_at) as f64;
        (elapsed / self.duration as f64).min(1.0)
    }

    /// Interpolate to `now` and test zone crossings against the previous tick.
    ///
    /// Pass `toy: None` while the agent is already attacking. On every terminal
    /// step `position()` holds where the agent is at that instant; bed and toy
    /// snapping is left to the caller.
    pub fn step(
        &mut self,
        now: Millis,
        spatial: &SpatialModel,
        bed: Option<Zone>,
        toy: Option<Zone>,
        dice: &mut dyn Dice,
    ) -> MoveStep {
        let progress = self.progress(now);
        let next = self.from + (self.to - self.from) * progress;

        let prev_px = spatial.case_to_pixel(self.position);
        let next_px = spatial.case_to_pixel(next);
        self.position = next;

        if let Some(toy) = toy {
            if spatial.crossed_zone(prev_px, next_px, &toy) && dice.chance(TOY_POUNCE_CHANCE) {
                return MoveStep::PounceOnToy;
            }
        }

        if let Some(bed) = bed {
            if spatial.crossed_zone(prev_px, next_px, &bed) {
                return MoveStep::ReachedBed;
            }
        }

        if progress >= 1.0 {
            self.position = self.to;
            return MoveStep::Arrived;
        }
        MoveStep::Continue
    }
}

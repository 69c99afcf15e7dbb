use crate::agent::Direction;
use crate::dice::Dice;
use crate::movement::MovementIntent;
use crate::scenario::{draw_weighted, Scenario};
use crate::timer::{Millis, TimerId, TimerQueue};

/// Re-check interval while the agent is busy.
pub const BUSY_POLL_MS: Millis = 500;
/// Back-off after a failed cycle.
pub const RETRY_MS: Millis = 2000;
/// Random delay added after every scenario's settle time, and used for the first cycle.
pub const JITTER_MS: (f64, f64) = (1000.0, 3000.0);
/// Chance to stay asleep on each decision while on the bed.
pub const SLEEP_ON_BED_CHANCE: f64 = 0.7;

/// What the next cycle will do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub scenario: Scenario,
    /// `Some` for movement scenarios.
    pub intent: Option<MovementIntent>,
}

/// Weighted draw plus the bed rules: sleep only happens on the bed, and only a
/// movement can get the agent off it.
pub fn choose_scenario(on_bed: bool, dice: &mut dyn Dice) -> Scenario {
    let drawn = draw_weighted(dice);
    if on_bed {
        if dice.chance(SLEEP_ON_BED_CHANCE) || !drawn.is_movement() {
            return Scenario::Sleep;
        }
        return drawn;
    }
    if drawn == Scenario::Sleep {
        Scenario::Idle
    } else {
        drawn
    }
}

/// Pick a distance in the scenario's range and a direction with room for it.
///
/// When neither direction has room, travel the larger of the two spans instead.
pub fn derive_intent(
    scenario: Scenario,
    position: f64,
    max_cases: f64,
    dice: &mut dyn Dice,
) -> Option<MovementIntent> {
    let (lo, hi) = scenario.descriptor().distance_range?;
    let distance = dice.pick(lo, hi) as f64;

    let room_left = position;
    let room_right = max_cases - position;
    let intent = match (distance <= room_left, distance <= room_right) {
        (true, true) => {
            let direction = if dice.chance(0.5) {
                Direction::Left
            } else {
                Direction::Right
            };
            MovementIntent {
                direction,
                distance,
            }
        }
        (true, false) => MovementIntent {
            direction: Direction::Left,
            distance,
        },
        (false, true) => MovementIntent {
            direction: Direction::Right,
            distance,
        },
        (false, false) if room_left >= room_right => MovementIntent {
            direction: Direction::Left,
            distance: room_left.max(0.0),
        },
        (false, false) => MovementIntent {
            direction: Direction::Right,
            distance: room_right.max(0.0),
        },
    };
    Some(intent)
}

/// Decide the next scenario and, for movements, where to go.
pub fn plan(on_bed: bool, position: f64, max_cases: f64, dice: &mut dyn Dice) -> Plan {
    let scenario = choose_scenario(on_bed, dice);
    let intent = derive_intent(scenario, position, max_cases, dice);
    Plan { scenario, intent }
}

/// Random jitter in whole milliseconds.
pub fn jitter(dice: &mut dyn Dice) -> Millis {
    dice.between(JITTER_MS.0, JITTER_MS.1).round() as Millis
}

/// Delay before the decision that follows `scenario`.
pub fn settle_delay(scenario: Scenario, dice: &mut dyn Dice) -> Millis {
    scenario.settle_ms() + jitter(dice)
}

/// The decision loop's single pending wake-up.
///
/// Only one cycle is ever armed: arming again replaces the previous timer.
#[derive(Debug, Default)]
pub struct BehaviorScheduler {
    pending: Option<TimerId>,
}

impl BehaviorScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm<E: Clone>(
        &mut self,
        timers: &mut TimerQueue<E>,
        now: Millis,
        delay: Millis,
        event: E,
    ) {
        self.disarm(timers);
        self.pending = Some(timers.after(now, delay, event));
    }

    pub fn disarm<E: Clone>(&mut self, timers: &mut TimerQueue<E>) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
    }

    /// Claim a firing. False for anything but the currently armed cycle.
    pub fn fired(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDice;

    #[test]
    fn sleep_is_forced_on_the_bed_unless_moving_off() {
        // 0.6 draws Idle; anything stationary on the bed becomes sleep.
        let mut dice = ScriptedDice::new(&[0.6, 0.9], 0.0);
        assert_eq!(choose_scenario(true, &mut dice), Scenario::Sleep);

        // Run drawn, override roll lost: the agent gets up.
        let mut dice = ScriptedDice::new(&[0.1, 0.9], 0.0);
        assert_eq!(choose_scenario(true, &mut dice), Scenario::Run);

        // Run drawn, override roll won.
        let mut dice = ScriptedDice::new(&[0.1, 0.2], 0.0);
        assert_eq!(choose_scenario(true, &mut dice), Scenario::Sleep);
    }

    #[test]
    fn off_the_bed_never_sleeps() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..2_000 {
            assert_ne!(choose_scenario(false, &mut rng), Scenario::Sleep);
        }
    }

    #[test]
    fn stationary_scenarios_have_no_intent() {
        let mut dice = ScriptedDice::new(&[], 0.5);
        assert_eq!(derive_intent(Scenario::Sitting, 10.0, 20.0, &mut dice), None);
        assert_eq!(dice.draws(), 0);
    }

    #[test]
    fn direction_is_random_when_both_sides_have_room() {
        // pick(2..=8) with 0.5 -> 5; chance(0.5) with 0.4 -> left.
        let mut dice = ScriptedDice::new(&[0.5, 0.4], 0.0);
        let intent = derive_intent(Scenario::Run, 10.0, 20.0, &mut dice).unwrap();
        assert_eq!(intent.direction, Direction::Left);
        assert_eq!(intent.distance, 5.0);

        let mut dice = ScriptedDice::new(&[0.5, 0.6], 0.0);
        let intent = derive_intent(Scenario::Run, 10.0, 20.0, &mut dice).unwrap();
        assert_eq!(intent.direction, Direction::Right);
    }

    #[test]
    fn direction_is_forced_toward_the_room() {
        let mut dice = ScriptedDice::new(&[0.99], 0.0);
        let intent = derive_intent(Scenario::Run, 18.0, 20.0, &mut dice).unwrap();
        assert_eq!(intent.direction, Direction::Left);
        assert_eq!(intent.distance, 8.0);

        let mut dice = ScriptedDice::new(&[0.99], 0.0);
        let intent = derive_intent(Scenario::Jump, 0.5, 20.0, &mut dice).unwrap();
        assert_eq!(intent.direction, Direction::Right);
        assert_eq!(intent.distance, 2.0);
    }

    #[test]
    fn cramped_stage_clamps_to_the_larger_span() {
        // Stage of 6 cases, agent at 2: run of 8 fits neither way.
        let mut dice = ScriptedDice::new(&[0.99], 0.0);
        let intent = derive_intent(Scenario::Run, 2.0, 6.0, &mut dice).unwrap();
        assert_eq!(intent.direction, Direction::Right);
        assert_eq!(intent.distance, 4.0);
        assert_eq!(intent.target(2.0, 6.0), 6.0);
    }

    #[test]
    fn targets_always_stay_on_stage() {
        let mut rng = fastrand::Rng::with_seed(42);
        for i in 0..=80 {
            let start = i as f64 * 0.25;
            for scenario in [Scenario::Run, Scenario::Jump] {
                let intent = derive_intent(scenario, start, 20.0, &mut rng).unwrap();
                let target = intent.target(start, 20.0);
                assert!((0.0..=20.0).contains(&target), "{start} -> {target}");
                assert_eq!((target - start).abs(), intent.distance);
            }
        }
    }

    #[test]
    fn settle_delay_adds_jitter() {
        let mut dice = ScriptedDice::new(&[0.0, 0.5, 0.9999], 0.0);
        assert_eq!(settle_delay(Scenario::Sitting, &mut dice), 9_000);
        assert_eq!(settle_delay(Scenario::Run, &mut dice), 3_000);
        assert_eq!(settle_delay(Scenario::Sleep, &mut dice), 8_000);
    }

    #[test]
    fn only_one_cycle_is_armed() {
        let mut timers = TimerQueue::new();
        let mut scheduler = BehaviorScheduler::new();
        scheduler.arm(&mut timers, 0, 1_000, "cycle");
        scheduler.arm(&mut timers, 0, 3_000, "cycle");
        assert_eq!(timers.len(), 1);

        let (at, id, _) = timers.pop_due(5_000).unwrap();
        assert_eq!(at, 3_000);
        assert!(scheduler.fired(id));
        assert!(!scheduler.fired(id));
        assert!(!scheduler.is_armed());
    }
}

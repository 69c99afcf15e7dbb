use crate::dice::Dice;
use crate::timer::Millis;

/// Default time between sprite frames.
pub const DEFAULT_FRAME_INTERVAL: Millis = 400;

/// Something the pet can be doing, each backed by one sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Idle,
    Idle2,
    Run,
    Jump,
    Sleep,
    Sitting,
    Attack,
    Hurt,
    Die,
}

/// Static scheduling data for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioDescriptor {
    /// Relative draw weight; `None` if the scheduler never draws it.
    pub weight: Option<u32>,
    pub is_movement: bool,
    /// Inclusive distance range in cases, movement scenarios only.
    pub distance_range: Option<(u32, u32)>,
}

/// Scenarios the scheduler draws from, in walk order.
pub const WEIGHTED: [Scenario; 5] = [
    Scenario::Run,
    Scenario::Sitting,
    Scenario::Idle,
    Scenario::Idle2,
    Scenario::Jump,
];

impl Scenario {
    pub fn descriptor(self) -> ScenarioDescriptor {
        let (weight, distance_range) = match self {
            Scenario::Run => (Some(30), Some((2, 8))),
            Scenario::Sitting => (Some(25), None),
            Scenario::Idle => (Some(20), None),
            Scenario::Idle2 => (Some(15), None),
            Scenario::Jump => (Some(10), Some((1, 2))),
            Scenario::Sleep | Scenario::Attack | Scenario::Hurt | Scenario::Die => (None, None),
        };
        ScenarioDescriptor {
            weight,
            is_movement: distance_range.is_some(),
            distance_range,
        }
    }

    pub fn is_movement(self) -> bool {
        self.descriptor().is_movement
    }

    /// Travel time per case crossed.
    pub fn ms_per_case(self) -> Millis {
        match self {
            Scenario::Jump => 800,
            _ => 1200,
        }
    }

    /// Pause after the scenario before the scheduler decides again (before jitter).
    pub fn settle_ms(self) -> Millis {
        match self {
            Scenario::Run => 1000,
            Scenario::Jump => 800,
            Scenario::Sleep => 5000,
            Scenario::Sitting => 8000,
            Scenario::Idle | Scenario::Idle2 => 3000,
            Scenario::Attack | Scenario::Hurt | Scenario::Die => 2000,
        }
    }

    pub fn frame_interval(self) -> Millis {
        match self {
            Scenario::Attack => 800,
            Scenario::Hurt => 600,
            Scenario::Die => 700,
            _ => DEFAULT_FRAME_INTERVAL,
        }
    }

    pub fn sprite_file(self) -> &'static str {
        match self {
            Scenario::Idle => "idlecat.png",
            Scenario::Idle2 => "idle2cat.png",
            Scenario::Run => "runcat.png",
            Scenario::Jump => "jumpcat.png",
            Scenario::Sleep => "sleepcat.png",
            Scenario::Sitting => "sittingcat.png",
            Scenario::Attack => "attackcat.png",
            Scenario::Hurt => "hurtcat.png",
            Scenario::Die => "diecat.png",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scenario::Idle => "idle",
            Scenario::Idle2 => "idle2",
            Scenario::Run => "run",
            Scenario::Jump => "jump",
            Scenario::Sleep => "sleep",
            Scenario::Sitting => "sitting",
            Scenario::Attack => "attack",
            Scenario::Hurt => "hurt",
            Scenario::Die => "die",
        }
    }
}

pub fn total_weight() -> u32 {
    WEIGHTED
        .iter()
        .filter_map(|s| s.descriptor().weight)
        .sum()
}

/// Cumulative-weight draw: uniform `r` in `[0, total)`, first scenario whose
/// running sum reaches `r` wins.
pub fn draw_weighted(dice: &mut dyn Dice) -> Scenario {
    let r = dice.unit() * total_weight() as f64;
    let mut acc = 0.0;
    for scenario in WEIGHTED {
        acc += scenario.descriptor().weight.unwrap_or(0) as f64;
        if acc >= r {
            return scenario;
        }
    }
    Scenario::Idle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDice;

    #[test]
    fn weighted_table_is_positive_and_movement_has_ranges() {
        assert_eq!(total_weight(), 100);
        for scenario in WEIGHTED {
            let d = scenario.descriptor();
            assert!(d.weight.unwrap_or(0) > 0, "{scenario:?}");
            assert_eq!(d.is_movement, d.distance_range.is_some());
        }
        assert!(Scenario::Run.is_movement());
        assert!(Scenario::Jump.is_movement());
        assert!(!Scenario::Sleep.is_movement());
        assert_eq!(Scenario::Sleep.descriptor().weight, None);
    }

    #[test]
    fn draw_walks_cumulative_sums() {
        // r = unit * 100
        let mut dice = ScriptedDice::new(&[0.0, 0.29, 0.31, 0.54, 0.56, 0.76, 0.89, 0.95], 0.0);
        let drawn: Vec<_> = (0..8).map(|_| draw_weighted(&mut dice)).collect();
        assert_eq!(
            drawn,
            vec![
                Scenario::Run,
                Scenario::Run,
                Scenario::Sitting,
                Scenario::Sitting,
                Scenario::Idle,
                Scenario::Idle2,
                Scenario::Idle2,
                Scenario::Jump,
            ]
        );
    }

    #[test]
    fn draws_converge_to_weights() {
        const N: usize = 20_000;
        let mut rng = fastrand::Rng::with_seed(0x5EED);
        let mut counts = std::collections::HashMap::new();
        for _ in 0..N {
            *counts.entry(draw_weighted(&mut rng)).or_insert(0usize) += 1;
        }
        for scenario in WEIGHTED {
            let expected = scenario.descriptor().weight.unwrap_or(0) as f64 / 100.0;
            let observed = counts.get(&scenario).copied().unwrap_or(0) as f64 / N as f64;
            assert!(
                (observed - expected).abs() < 0.015,
                "{scenario:?}: expected {expected}, observed {observed}"
            );
        }
    }

    #[test]
    fn special_intervals_run_slower() {
        assert_eq!(Scenario::Attack.frame_interval(), 800);
        assert_eq!(Scenario::Hurt.frame_interval(), 600);
        assert_eq!(Scenario::Die.frame_interval(), 700);
        assert_eq!(Scenario::Sitting.frame_interval(), DEFAULT_FRAME_INTERVAL);
    }
}

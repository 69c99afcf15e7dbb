use crate::error::TransitionError;
use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// What the agent is busy with. Replaces ad hoc moving/hurt/attacking/dead flags:
/// at most one of them can hold at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentActivity {
    /// Nothing playing yet, or between a movement and the next decision.
    Idle,
    /// A stationary scenario is playing.
    Scheduled,
    Moving,
    Hurt,
    Attacking,
    Dead,
}

impl AgentActivity {
    /// The scheduler defers while the agent is in one of these.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            AgentActivity::Moving | AgentActivity::Hurt | AgentActivity::Attacking | AgentActivity::Dead
        )
    }

    pub fn can_become(self, to: AgentActivity) -> bool {
        use AgentActivity::*;
        match (self, to) {
            (Dead, _) => false,
            (_, Dead) => true,
            (Idle | Scheduled, Scheduled | Moving | Hurt | Attacking) => true,
            (Scheduled, Idle) => true,
            (Moving, Idle | Scheduled | Attacking | Hurt) => true,
            (Hurt, Hurt | Moving | Idle) => true,
            (Attacking, Idle | Scheduled | Hurt) => true,
            _ => false,
        }
    }
}

/// Live state of the one pet on stage.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Continuous position in cases, `[0, max_cases]`.
    pub position: f64,
    pub direction: Direction,
    pub scenario: Scenario,
    pub on_bed: bool,
    activity: AgentActivity,
}

impl Agent {
    pub fn new(position: f64, on_bed: bool) -> Self {
        Self {
            position,
            direction: Direction::Right,
            scenario: Scenario::Idle,
            on_bed,
            activity: AgentActivity::Idle,
        }
    }

    pub fn activity(&self) -> AgentActivity {
        self.activity
    }

    pub fn transition(&mut self, to: AgentActivity) -> Result<(), TransitionError> {
        if !self.activity.can_become(to) {
            return Err(TransitionError {
                from: self.activity,
                to,
            });
        }
        log::debug!("activity {:?} -> {:?}", self.activity, to);
        self.activity = to;
        Ok(())
    }
}

use crate::timer::{Millis, TimerId, TimerQueue};

/// Clicks inside one window that kill the agent.
pub const DEATH_CLICKS: u32 = 5;
/// Quiet time after the last click before the counter resets.
pub const CLICK_RESET_MS: Millis = 2000;
/// How long a hurt agent stays hurt before fleeing.
pub const HURT_MS: Millis = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Normal,
    Hurt,
    Dead,
}

/// What a click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Agent is already dead.
    Ignored,
    Hurt,
    Died,
}

/// Click-driven Normal -> Hurt -> (Normal | Dead) machine. Dead is terminal.
///
/// Owns the click-reset and hurt-recovery timers; both restart on every
/// qualifying click and die with the agent.
#[derive(Debug)]
pub struct MoodMachine {
    mood: Mood,
    clicks: u32,
    reset: Option<TimerId>,
    recover: Option<TimerId>,
}

impl Default for MoodMachine {
    fn default() -> Self {
        Self {
            mood: Mood::Normal,
            clicks: 0,
            reset: None,
            recover: None,
        }
    }
}

impl MoodMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn click<E: Clone>(
        &mut self,
        timers: &mut TimerQueue<E>,
        now: Millis,
        reset_event: E,
        recover_event: E,
    ) -> ClickOutcome {
        if self.mood == Mood::Dead {
            return ClickOutcome::Ignored;
        }

        self.clicks += 1;
        if self.clicks >= DEATH_CLICKS {
            self.mood = Mood::Dead;
            self.cancel(timers);
            return ClickOutcome::Died;
        }

        if let Some(id) = self.reset.take() {
            timers.cancel(id);
        }
        self.reset = Some(timers.after(now, CLICK_RESET_MS, reset_event));

        if let Some(id) = self.recover.take() {
            timers.cancel(id);
        }
        self.recover = Some(timers.after(now, HURT_MS, recover_event));
        self.mood = Mood::Hurt;
        ClickOutcome::Hurt
    }

    /// Click window elapsed. False if `id` is not the live reset timer.
    pub fn reset_clicks(&mut self, id: TimerId) -> bool {
        if self.reset != Some(id) {
            return false;
        }
        self.reset = None;
        self.clicks = 0;
        true
    }

    /// Hurt period over. True when the agent should flee now.
    pub fn recover(&mut self, id: TimerId) -> bool {
        if self.recover != Some(id) {
            return false;
        }
        self.recover = None;
        if self.mood != Mood::Hurt {
            return false;
        }
        self.mood = Mood::Normal;
        true
    }

    /// Drop both timers without changing the mood.
    pub fn cancel<E: Clone>(&mut self, timers: &mut TimerQueue<E>) {
        for id in [self.reset.take(), self.recover.take()].into_iter().flatten() {
            timers.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ev {
        Reset,
        Recover,
    }

    /// Fire everything due by `now` into the machine; returns recoveries seen.
    fn run_until(m: &mut MoodMachine, timers: &mut TimerQueue<Ev>, now: Millis) -> usize {
        let mut recovered = 0;
        while let Some((_, id, ev)) = timers.pop_due(now) {
            match ev {
                Ev::Reset => {
                    m.reset_clicks(id);
                }
                Ev::Recover => {
                    if m.recover(id) {
                        recovered += 1;
                    }
                }
            }
        }
        recovered
    }

    #[test]
    fn single_click_hurts_then_recovers_at_one_second() {
        let mut timers = TimerQueue::new();
        let mut m = MoodMachine::new();
        assert_eq!(m.click(&mut timers, 0, Ev::Reset, Ev::Recover), ClickOutcome::Hurt);
        assert_eq!(m.mood(), Mood::Hurt);

        assert_eq!(run_until(&mut m, &mut timers, 999), 0);
        assert_eq!(run_until(&mut m, &mut timers, 1_000), 1);
        assert_eq!(m.mood(), Mood::Normal);
        assert_eq!(m.clicks(), 1);

        run_until(&mut m, &mut timers, 2_000);
        assert_eq!(m.clicks(), 0);
    }

    #[test]
    fn five_quick_clicks_kill_and_cancel_timers() {
        let mut timers = TimerQueue::new();
        let mut m = MoodMachine::new();
        for i in 0..4 {
            assert_eq!(
                m.click(&mut timers, i * 300, Ev::Reset, Ev::Recover),
                ClickOutcome::Hurt
            );
        }
        assert_eq!(m.click(&mut timers, 1_200, Ev::Reset, Ev::Recover), ClickOutcome::Died);
        assert_eq!(m.mood(), Mood::Dead);
        assert_eq!(timers.len(), 0);
        assert_eq!(
            m.click(&mut timers, 1_300, Ev::Reset, Ev::Recover),
            ClickOutcome::Ignored
        );
    }

    #[test]
    fn gap_of_two_seconds_resets_the_count() {
        let mut timers = TimerQueue::new();
        let mut m = MoodMachine::new();
        for i in 0..4 {
            m.click(&mut timers, i * 100, Ev::Reset, Ev::Recover);
        }
        run_until(&mut m, &mut timers, 300 + 2_100);
        assert_eq!(m.clicks(), 0);

        let start = 2_400;
        for i in 0..4 {
            m.click(&mut timers, start + i * 100, Ev::Reset, Ev::Recover);
        }
        assert_ne!(m.mood(), Mood::Dead);
        assert_eq!(m.clicks(), 4);
    }

    #[test]
    fn every_click_restarts_the_hurt_timer() {
        let mut timers = TimerQueue::new();
        let mut m = MoodMachine::new();
        m.click(&mut timers, 0, Ev::Reset, Ev::Recover);
        m.click(&mut timers, 800, Ev::Reset, Ev::Recover);
        assert_eq!(run_until(&mut m, &mut timers, 1_500), 0);
        assert_eq!(m.mood(), Mood::Hurt);
        assert_eq!(run_until(&mut m, &mut timers, 1_800), 1);
    }
}

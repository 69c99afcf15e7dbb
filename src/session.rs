use crate::agent::{Agent, AgentActivity, Direction};
use crate::assets::SpriteLibrary;
use crate::config::SettingsPatch;
use crate::controller::Alarm;
use crate::dice::Dice;
use crate::error::{SessionError, TransitionError};
use crate::landmark::Landmarks;
use crate::mood::{ClickOutcome, Mood, MoodMachine};
use crate::movement::{MoveStep, Movement, MovementIntent};
use crate::scenario::Scenario;
use crate::scheduler::{self, BehaviorScheduler, BUSY_POLL_MS, RETRY_MS};
use crate::spatial::SpatialModel;
use crate::sprite::SpriteFrameController;
use crate::stage::{ElementKind, Stage, AGENT_SCALE};
use crate::store::SettingsStore;
use crate::timer::{Millis, TimerId, TimerQueue};

/// Delay before the first pose after spawning.
pub const INITIAL_POSE_MS: Millis = 100;
/// Scale of the "pop" when the agent lands on the bed.
pub const POP_SCALE: f64 = 2.3;
pub const POP_MS: Millis = 200;
/// Delay between a pounce and the first swipe at the toy.
pub const POUNCE_DELAY_MS: Millis = 100;
/// Time between the two swipes, and after the last one.
pub const ATTACK_GAP_MS: Millis = 1000;
/// Scheduler delay after an attack when no cycle is armed.
pub const AFTER_ATTACK_MS: Millis = 1000;
/// Death animation length before the fade.
pub const DEATH_FADE_DELAY_MS: Millis = 3000;
pub const DEATH_FADE_MS: Millis = 1000;

/// Wake-up reasons for one session's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Scheduler decision cycle.
    Scenario,
    /// Free-running frame tick.
    Frame,
    /// Movement-locked frame tick.
    MovementTick,
    /// End of the bed "pop".
    Pop,
    ClickReset,
    HurtRecover,
    /// Attack sequence step 0..=2.
    AttackStep(u8),
    InitialPose,
    DeathFade,
    DeathRemove,
}

/// What the controller should do with the session after a wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    /// Death sequence done; the agent element is gone.
    Finished,
    /// The element was removed from under the session; it stopped itself.
    Detached,
}

/// Everything a session touches that it does not own.
pub struct Context<'a> {
    pub now: Millis,
    pub timers: &'a mut TimerQueue<Alarm>,
    pub stage: &'a mut Stage,
    pub store: &'a mut dyn SettingsStore,
    pub sprites: &'a mut SpriteLibrary,
    pub dice: &'a mut dyn Dice,
    pub spatial: &'a SpatialModel,
    pub landmarks: &'a Landmarks,
}

/// One live agent: its element, state and every timer it has armed.
///
/// Timers are tagged with the session's generation; a newer session (after
/// death or re-enable) never sees an older one's wake-ups.
pub struct AgentSession {
    generation: u64,
    element: hecs::Entity,
    skin: String,
    agent: Agent,
    frames: SpriteFrameController,
    movement: Option<Movement>,
    scheduler: BehaviorScheduler,
    /// Scenario whose settle delay is due once the running movement ends.
    awaiting: Option<Scenario>,
    mood: MoodMachine,
    pose: Option<TimerId>,
    pop: Option<TimerId>,
    attack: Option<TimerId>,
    death: Option<TimerId>,
}

fn alarm(generation: u64, wake: Wake) -> Alarm {
    Alarm::Session { generation, wake }
}

fn cancel(timers: &mut TimerQueue<Alarm>, slot: &mut Option<TimerId>) {
    if let Some(id) = slot.take() {
        timers.cancel(id);
    }
}

impl AgentSession {
    /// Mount the agent and start its lifecycle.
    ///
    /// Placement: the saved position if any (on the bed iff inside the bed zone),
    /// else the bed centre, else mid-stage.
    pub fn spawn(
        ctx: &mut Context<'_>,
        generation: u64,
        skin: &str,
        saved_position: Option<f64>,
    ) -> Self {
        let bed_zone = ctx.landmarks.bed_zone(ctx.stage);
        let (position, on_bed) = match (saved_position, bed_zone) {
            (Some(pos), zone) => {
                let pos = ctx.spatial.clamp_case(pos);
                let px = ctx.spatial.case_to_pixel(pos);
                (pos, zone.map_or(false, |z| ctx.spatial.is_within_zone(px, &z)))
            }
            (None, Some(zone)) => {
                let center = (zone.start + zone.end) / 2.0;
                (ctx.spatial.clamp_case(ctx.spatial.pixel_to_case(center)), true)
            }
            (None, None) => (ctx.spatial.max_cases() / 2.0, false),
        };

        let element = ctx
            .stage
            .mount(ElementKind::Agent, ctx.spatial.sprite_left(position));
        let url = ctx.sprites.url_for(skin, Scenario::Idle);
        ctx.stage.set_sprite(element, &url);

        let mut session = Self {
            generation,
            element,
            skin: skin.to_string(),
            agent: Agent::new(position, on_bed),
            frames: SpriteFrameController::new(),
            movement: None,
            scheduler: BehaviorScheduler::new(),
            awaiting: None,
            mood: MoodMachine::new(),
            pose: None,
            pop: None,
            attack: None,
            death: None,
        };
        session.pose = Some(ctx.timers.after(
            ctx.now,
            INITIAL_POSE_MS,
            alarm(generation, Wake::InitialPose),
        ));
        let first = scheduler::jitter(ctx.dice);
        session
            .scheduler
            .arm(ctx.timers, ctx.now, first, alarm(generation, Wake::Scenario));

        log::info!(
            "Agent #{generation} spawned at case {position:.2}{}",
            if on_bed { " (on bed)" } else { "" }
        );
        session
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn element(&self) -> hecs::Entity {
        self.element
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn activity(&self) -> AgentActivity {
        self.agent.activity()
    }

    pub fn mood(&self) -> Mood {
        self.mood.mood()
    }

    pub fn frame(&self) -> u32 {
        self.frames.frame()
    }

    pub fn skin(&self) -> &str {
        &self.skin
    }

    pub fn is_moving(&self) -> bool {
        self.movement.is_some()
    }

    /// Settle timer or poll pending.
    pub fn scheduler_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn on_wake(&mut self, ctx: &mut Context<'_>, id: TimerId, wake: Wake) -> SessionStatus {
        if !ctx.stage.is_attached(self.element) {
            log::debug!("agent #{} detached, stopping", self.generation);
            self.stop_timers(ctx.timers);
            return SessionStatus::Detached;
        }

        match wake {
            Wake::Scenario => {
                if self.scheduler.fired(id) {
                    if let Err(e) = self.run_cycle(ctx) {
                        log::error!("Scenario cycle failed, retrying in {RETRY_MS}ms: {e}");
                        self.arm_scheduler(ctx, RETRY_MS);
                    }
                }
            }
            Wake::Frame => {
                if self.frames.owns(id) {
                    self.frames.advance();
                    ctx.stage
                        .set_frame_offset(self.element, self.frames.background_offset());
                }
            }
            Wake::MovementTick => {
                if self.frames.owns(id) {
                    self.movement_tick(ctx);
                }
            }
            Wake::Pop => {
                if self.pop == Some(id) {
                    self.pop = None;
                    self.apply_direction(ctx);
                }
            }
            Wake::ClickReset => {
                self.mood.reset_clicks(id);
            }
            Wake::HurtRecover => {
                if self.mood.recover(id) {
                    if let Err(e) = self.flee(ctx) {
                        log::error!("Flight after hurt failed: {e}");
                    }
                }
            }
            Wake::AttackStep(step) => {
                if self.attack == Some(id) {
                    self.attack = None;
                    self.attack_step(ctx, step);
                }
            }
            Wake::InitialPose => {
                if self.pose == Some(id) {
                    self.pose = None;
                    self.initial_pose(ctx);
                }
            }
            Wake::DeathFade => {
                if self.death == Some(id) {
                    self.fade_out(ctx);
                }
            }
            Wake::DeathRemove => {
                if self.death == Some(id) {
                    self.death = None;
                    self.frames.stop(ctx.timers);
                    ctx.stage.remove(self.element);
                    log::info!("Agent #{} removed", self.generation);
                    return SessionStatus::Finished;
                }
            }
        }
        SessionStatus::Running
    }

    pub fn on_click(&mut self, ctx: &mut Context<'_>) {
        if !ctx.stage.is_attached(self.element) {
            return;
        }
        let reset = alarm(self.generation, Wake::ClickReset);
        let recover = alarm(self.generation, Wake::HurtRecover);
        match self.mood.click(ctx.timers, ctx.now, reset, recover) {
            ClickOutcome::Ignored => {}
            ClickOutcome::Hurt => {
                log::debug!("agent hurt ({} clicks)", self.mood.clicks());
                self.hurt(ctx);
            }
            ClickOutcome::Died => self.die(ctx),
        }
    }

    /// Re-render at the new case width. Case positions are kept as they are.
    pub fn on_resize(&mut self, ctx: &mut Context<'_>) {
        self.render_position(ctx);
    }

    pub fn on_skin(&mut self, ctx: &mut Context<'_>, skin: &str) {
        self.skin = skin.to_string();
        if self.agent.activity() == AgentActivity::Scheduled {
            self.play_stationary(ctx, self.agent.scenario);
        } else {
            let url = ctx.sprites.url_for(skin, self.agent.scenario);
            ctx.stage.set_sprite_url(self.element, &url);
        }
    }

    /// Stop everything and take the element off the stage.
    pub fn teardown(&mut self, ctx: &mut Context<'_>) {
        self.stop_timers(ctx.timers);
        ctx.stage.remove(self.element);
    }

    // -----------------------------------------------------------------------
    // Scheduler
    // -----------------------------------------------------------------------

    fn arm_scheduler(&mut self, ctx: &mut Context<'_>, delay: Millis) {
        let wake = alarm(self.generation, Wake::Scenario);
        self.scheduler.arm(ctx.timers, ctx.now, delay, wake);
    }

    fn run_cycle(&mut self, ctx: &mut Context<'_>) -> Result<(), SessionError> {
        if self.agent.activity().is_busy() {
            self.arm_scheduler(ctx, BUSY_POLL_MS);
            return Ok(());
        }

        ctx.landmarks.tidy(ctx.stage, ctx.store);

        let plan = scheduler::plan(
            self.agent.on_bed,
            self.agent.position,
            ctx.spatial.max_cases(),
            ctx.dice,
        );
        log::debug!("next scenario: {} {:?}", plan.scenario.label(), plan.intent);
        if plan.intent.is_some() {
            self.agent.on_bed = false;
        }

        if self.start_scenario(ctx, plan.scenario, plan.intent)? {
            self.awaiting = Some(plan.scenario);
        } else {
            let delay = scheduler::settle_delay(plan.scenario, ctx.dice);
            self.arm_scheduler(ctx, delay);
        }
        Ok(())
    }

    /// Play `scenario`, moving if there is somewhere to go. True while a
    /// movement is running.
    fn start_scenario(
        &mut self,
        ctx: &mut Context<'_>,
        scenario: Scenario,
        intent: Option<MovementIntent>,
    ) -> Result<bool, SessionError> {
        let Some(intent) = intent.filter(|i| i.distance > 0.0) else {
            self.agent.transition(AgentActivity::Scheduled)?;
            self.play_stationary(ctx, scenario);
            return Ok(false);
        };

        self.agent.transition(AgentActivity::Moving)?;
        self.agent.scenario = scenario;
        self.agent.direction = intent.direction;
        self.agent.on_bed = false;

        let sheet = ctx.sprites.sheet(&self.skin, scenario);
        ctx.stage.set_sprite(self.element, &sheet.url);
        self.apply_direction(ctx);

        let from = self.agent.position;
        let target = intent.target(from, ctx.spatial.max_cases());
        let duration = (intent.distance * scenario.ms_per_case() as f64).round() as Millis;

        match Movement::begin(from, target, duration, sheet.info.frame_count, ctx.now) {
            Some(movement) => {
                log::debug!(
                    "{} {from:.2} -> {target:.2} over {duration}ms",
                    scenario.label()
                );
                let tick = alarm(self.generation, Wake::MovementTick);
                self.frames.drive(
                    movement.frame_count(),
                    movement.tick_interval(),
                    ctx.timers,
                    ctx.now,
                    tick,
                );
                self.movement = Some(movement);
                Ok(true)
            }
            None => {
                self.frames.stop(ctx.timers);
                self.frames.rewind();
                ctx.stage.set_frame_offset(self.element, 0.0);
                self.agent.position = target;
                self.render_position(ctx);
                self.persist_position(ctx);
                self.agent.transition(AgentActivity::Idle)?;
                Ok(false)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    fn movement_tick(&mut self, ctx: &mut Context<'_>) {
        let Some(movement) = self.movement.as_mut() else {
            self.frames.stop(ctx.timers);
            return;
        };

        self.frames.advance();
        ctx.stage
            .set_frame_offset(self.element, self.frames.background_offset());

        let toy = if self.agent.activity() == AgentActivity::Attacking {
            None
        } else {
            ctx.landmarks.toy_zone(ctx.stage)
        };
        let bed = ctx.landmarks.bed_zone(ctx.stage);
        let step = movement.step(ctx.now, ctx.spatial, bed, toy, ctx.dice);
        self.agent.position = movement.position();

        if step == MoveStep::Continue {
            self.render_position(ctx);
            return;
        }

        // Terminal: clean stop on the first frame.
        self.movement = None;
        self.frames.stop(ctx.timers);
        self.frames.rewind();
        ctx.stage.set_frame_offset(self.element, 0.0);
        log::debug!("movement ended: {step:?} at case {:.2}", self.agent.position);

        let result = match step {
            MoveStep::PounceOnToy => self.pounce(ctx),
            MoveStep::ReachedBed => self.sleep_on_bed(ctx),
            _ => {
                self.render_position(ctx);
                self.persist_position(ctx);
                self.agent.transition(AgentActivity::Idle)
            }
        };
        if let Err(e) = result {
            log::error!("Movement ending failed: {e}");
        }

        if let Some(scenario) = self.awaiting.take() {
            let delay = scheduler::settle_delay(scenario, ctx.dice);
            self.arm_scheduler(ctx, delay);
        }
    }

    /// Cut a running movement short, keeping the last interpolated position.
    fn abort_movement(&mut self, ctx: &mut Context<'_>) {
        if self.movement.take().is_none() {
            return;
        }
        self.frames.stop(ctx.timers);
        self.render_position(ctx);
        self.persist_position(ctx);
        if self.awaiting.take().is_some() && !self.scheduler.is_armed() {
            self.arm_scheduler(ctx, BUSY_POLL_MS);
        }
    }

    // -----------------------------------------------------------------------
    // Bed
    // -----------------------------------------------------------------------

    fn initial_pose(&mut self, ctx: &mut Context<'_>) {
        if self.agent.activity().is_busy() {
            return;
        }
        let result = if self.agent.on_bed {
            self.sleep_on_bed(ctx)
        } else {
            self.agent
                .transition(AgentActivity::Scheduled)
                .map(|()| self.play_stationary(ctx, Scenario::Idle))
        };
        if let Err(e) = result {
            log::error!("Initial pose failed: {e}");
        }
    }

    /// Snap to the bed centre, pop, and sleep. Ignored while hurt or dead.
    fn sleep_on_bed(&mut self, ctx: &mut Context<'_>) -> Result<(), TransitionError> {
        if matches!(
            self.agent.activity(),
            AgentActivity::Hurt | AgentActivity::Dead
        ) {
            return Ok(());
        }
        self.agent.transition(AgentActivity::Scheduled)?;

        if let Some(center) = ctx.landmarks.bed.and_then(|bed| bed.center(ctx.stage)) {
            self.agent.position = ctx.spatial.clamp_case(ctx.spatial.pixel_to_case(center));
        }
        self.agent.on_bed = true;
        self.render_position(ctx);
        self.persist_position(ctx);

        let flipped = self.agent.direction == Direction::Left;
        ctx.stage.set_transform(self.element, POP_SCALE, flipped);
        cancel(ctx.timers, &mut self.pop);
        self.pop = Some(ctx.timers.after(
            ctx.now,
            POP_MS,
            alarm(self.generation, Wake::Pop),
        ));

        self.play_stationary(ctx, Scenario::Sleep);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Toy
    // -----------------------------------------------------------------------

    fn pounce(&mut self, ctx: &mut Context<'_>) -> Result<(), TransitionError> {
        self.agent.transition(AgentActivity::Attacking)?;
        if let Some(center) = ctx.landmarks.toy.and_then(|toy| toy.center(ctx.stage)) {
            self.agent.position = ctx.spatial.clamp_case(ctx.spatial.pixel_to_case(center));
        }
        self.render_position(ctx);
        self.persist_position(ctx);
        log::debug!("pounce on toy at case {:.2}", self.agent.position);
        self.arm_attack(ctx, POUNCE_DELAY_MS, 0);
        Ok(())
    }

    fn arm_attack(&mut self, ctx: &mut Context<'_>, delay: Millis, step: u8) {
        cancel(ctx.timers, &mut self.attack);
        self.attack = Some(ctx.timers.after(
            ctx.now,
            delay,
            alarm(self.generation, Wake::AttackStep(step)),
        ));
    }

    /// Two swipes one second apart, then back to idle.
    fn attack_step(&mut self, ctx: &mut Context<'_>, step: u8) {
        if self.agent.activity() != AgentActivity::Attacking {
            return;
        }
        if step < 2 {
            self.play_stationary(ctx, Scenario::Attack);
            self.arm_attack(ctx, ATTACK_GAP_MS, step + 1);
            return;
        }
        if let Err(e) = self.agent.transition(AgentActivity::Scheduled) {
            log::error!("Attack ending failed: {e}");
            return;
        }
        self.play_stationary(ctx, Scenario::Idle);
        if !self.scheduler.is_armed() {
            self.arm_scheduler(ctx, AFTER_ATTACK_MS);
        }
    }

    // -----------------------------------------------------------------------
    // Clicks
    // -----------------------------------------------------------------------

    fn hurt(&mut self, ctx: &mut Context<'_>) {
        self.abort_movement(ctx);
        cancel(ctx.timers, &mut self.attack);
        if let Err(e) = self.agent.transition(AgentActivity::Hurt) {
            log::error!("Cannot hurt agent: {e}");
            return;
        }
        self.agent.on_bed = false;
        self.play_stationary(ctx, Scenario::Hurt);
    }

    /// Startled run after the hurt period.
    fn flee(&mut self, ctx: &mut Context<'_>) -> Result<(), SessionError> {
        self.agent.transition(AgentActivity::Idle)?;
        let intent = scheduler::derive_intent(
            Scenario::Run,
            self.agent.position,
            ctx.spatial.max_cases(),
            ctx.dice,
        );
        log::debug!("fleeing {intent:?}");
        self.start_scenario(ctx, Scenario::Run, intent)?;
        Ok(())
    }

    fn die(&mut self, ctx: &mut Context<'_>) {
        self.abort_movement(ctx);
        self.scheduler.disarm(ctx.timers);
        self.awaiting = None;
        cancel(ctx.timers, &mut self.attack);
        cancel(ctx.timers, &mut self.pose);
        cancel(ctx.timers, &mut self.pop);
        if let Err(e) = self.agent.transition(AgentActivity::Dead) {
            log::error!("Cannot kill agent: {e}");
            return;
        }
        self.agent.on_bed = false;
        self.play_stationary(ctx, Scenario::Die);
        self.death = Some(ctx.timers.after(
            ctx.now,
            DEATH_FADE_DELAY_MS,
            alarm(self.generation, Wake::DeathFade),
        ));
        log::info!("Agent #{} died", self.generation);
    }

    /// Fade agent, bed and toy out together.
    fn fade_out(&mut self, ctx: &mut Context<'_>) {
        ctx.stage.fade(self.element, 0.0, DEATH_FADE_MS);
        for landmark in [ctx.landmarks.bed, ctx.landmarks.toy].into_iter().flatten() {
            ctx.stage.fade(landmark.entity, 0.0, DEATH_FADE_MS);
        }
        self.death = Some(ctx.timers.after(
            ctx.now,
            DEATH_FADE_MS,
            alarm(self.generation, Wake::DeathRemove),
        ));
    }

    // -----------------------------------------------------------------------
    // Rendering & persistence
    // -----------------------------------------------------------------------

    /// Show `scenario` in place, cycling its frames.
    fn play_stationary(&mut self, ctx: &mut Context<'_>, scenario: Scenario) {
        self.agent.scenario = scenario;
        let sheet = ctx.sprites.sheet(&self.skin, scenario);
        ctx.stage.set_sprite(self.element, &sheet.url);
        if self.pop.is_none() {
            self.apply_direction(ctx);
        }
        let tick = alarm(self.generation, Wake::Frame);
        self.frames.start(&sheet, ctx.timers, ctx.now, tick);
    }

    fn apply_direction(&self, ctx: &mut Context<'_>) {
        let flipped = self.agent.direction == Direction::Left;
        ctx.stage.set_transform(self.element, AGENT_SCALE, flipped);
    }

    fn render_position(&self, ctx: &mut Context<'_>) {
        let left = ctx.spatial.sprite_left(self.agent.position);
        ctx.stage.set_left(self.element, left);
    }

    fn persist_position(&self, ctx: &mut Context<'_>) {
        let patch = SettingsPatch {
            agent_position: Some(Some(self.agent.position)),
            ..SettingsPatch::default()
        };
        if let Err(e) = ctx.store.save(&patch) {
            log::warn!("Failed to save agent position: {e}");
        }
    }

    fn stop_timers(&mut self, timers: &mut TimerQueue<Alarm>) {
        self.frames.stop(timers);
        self.scheduler.disarm(timers);
        self.mood.cancel(timers);
        self.movement = None;
        self.awaiting = None;
        let generation = self.generation;
        timers.retain(|a| !matches!(a, Alarm::Session { generation: g, .. } if *g == generation));
        self.pose = None;
        self.pop = None;
        self.attack = None;
        self.death = None;
    }
}

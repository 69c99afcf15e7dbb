use crate::agent::AgentActivity;
use crate::assets::{AssetResolver, SpriteLibrary};
use crate::config::{Settings, SettingsChange, SettingsPatch};
use crate::dice::Dice;
use crate::landmark::{LandmarkKind, Landmarks};
use crate::mood::Mood;
use crate::session::{AgentSession, Context, SessionStatus, Wake};
use crate::spatial::SpatialModel;
use crate::stage::Stage;
use crate::store::SettingsStore;
use crate::timer::{Millis, TimerId, TimerQueue};

/// Delay between `disabled=false` and the rebuilt overlay.
pub const REENABLE_DELAY_MS: Millis = 100;
/// Delay between the dead agent's removal and a fresh one.
pub const RESPAWN_DELAY_MS: Millis = 5000;

/// Every timer the engine can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// Owned by the session of that generation.
    Session { generation: u64, wake: Wake },
    Respawn,
    Reenable,
}

/// Input delivered by the host surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Click,
    Resize { width: f64, height: f64 },
    /// End of a drag on the bed or toy.
    MoveLandmark { kind: LandmarkKind, left: f64 },
}

/// Snapshot for status lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub generation: u64,
    /// Position in cases.
    pub case: f64,
    /// Sprite left edge in pixels, as rendered.
    pub left: f64,
    pub scenario: &'static str,
    pub frame: u32,
    pub activity: AgentActivity,
    pub mood: Mood,
    pub on_bed: bool,
    pub moving: bool,
    pub scheduler_armed: bool,
    pub skin: String,
}

/// Owns the stage, the landmarks and at most one live agent session.
///
/// Lifecycle: `start` builds everything unless disabled; a dead agent is
/// replaced after [`RESPAWN_DELAY_MS`] while the bed is still on stage;
/// `disabled` settings changes tear everything down and rebuild it.
pub struct PetController {
    now: Millis,
    timers: TimerQueue<Alarm>,
    stage: Stage,
    spatial: SpatialModel,
    store: Box<dyn SettingsStore>,
    sprites: SpriteLibrary,
    dice: Box<dyn Dice>,
    landmarks: Landmarks,
    session: Option<AgentSession>,
    generation: u64,
    skin: String,
    disabled: bool,
}

impl PetController {
    pub fn new(
        stage: Stage,
        store: Box<dyn SettingsStore>,
        assets: Box<dyn AssetResolver>,
        dice: Box<dyn Dice>,
    ) -> Self {
        let spatial = SpatialModel::new(stage.width());
        Self {
            now: 0,
            timers: TimerQueue::new(),
            stage,
            spatial,
            store,
            sprites: SpriteLibrary::new(assets),
            dice,
            landmarks: Landmarks::default(),
            session: None,
            generation: 0,
            skin: Settings::default().skin,
            disabled: false,
        }
    }

    /// Load settings and build the overlay unless disabled.
    pub fn start(&mut self) {
        let settings = self.load_settings();
        self.skin = settings.skin.clone();
        self.disabled = settings.disabled;
        if self.disabled {
            log::info!("Pet is disabled, nothing to show");
            return;
        }
        self.build(&settings);
    }

    /// Run every timer due up to `now`, in order.
    pub fn advance(&mut self, now: Millis) {
        while let Some((at, id, alarm)) = self.timers.pop_due(now) {
            self.now = at;
            self.dispatch(id, alarm);
        }
        self.now = self.now.max(now);
    }

    pub fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::Click => {
                self.with_session(|session, ctx| session.on_click(ctx));
            }
            HostEvent::Resize { width, height } => {
                self.stage.resize(width, height);
                self.spatial.resize(width);
                log::debug!(
                    "stage resized to {}x{}, case width {:.1}px",
                    self.stage.width(),
                    self.stage.height(),
                    self.spatial.case_width()
                );
                self.landmarks.tidy(&mut self.stage, self.store.as_mut());
                self.with_session(|session, ctx| session.on_resize(ctx));
            }
            HostEvent::MoveLandmark { kind, left } => {
                if let Some(landmark) = self.landmarks.get(kind) {
                    landmark.drag_to(&mut self.stage, self.store.as_mut(), left);
                }
            }
        }
    }

    /// Write settings through the store and react to what changed.
    pub fn apply_settings(&mut self, patch: &SettingsPatch) {
        if let Err(e) = self.store.save(patch) {
            log::warn!("Failed to save settings: {e}");
        }
        self.sync_settings();
    }

    /// Pull external edits and react to skin and disabled changes.
    pub fn sync_settings(&mut self) {
        if let Err(e) = self.store.refresh() {
            log::warn!("Failed to refresh settings: {e}");
        }
        for change in self.store.take_changes() {
            match change {
                SettingsChange::Skin(skin) => {
                    log::info!("Skin changed to {skin}");
                    self.skin = skin.clone();
                    self.with_session(|session, ctx| session.on_skin(ctx, &skin));
                }
                SettingsChange::Disabled(true) if !self.disabled => {
                    log::info!("Pet disabled");
                    self.disabled = true;
                    self.destroy_all();
                }
                SettingsChange::Disabled(false) if self.disabled => {
                    log::info!("Pet re-enabled");
                    self.disabled = false;
                    self.timers.after(self.now, REENABLE_DELAY_MS, Alarm::Reenable);
                }
                _ => {}
            }
        }
    }

    /// Remove the agent, bed and toy.
    pub fn destroy_all(&mut self) {
        let (slot, mut ctx) = self.split();
        if let Some(mut session) = slot.take() {
            session.teardown(&mut ctx);
        }
        self.landmarks.remove(&mut self.stage);
        self.sprites.clear();
        self.timers.retain(|a| !matches!(a, Alarm::Respawn));
    }

    /// Tear down and drop every pending timer.
    pub fn dispose(&mut self) {
        self.destroy_all();
        self.timers.clear();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.timers.next_due()
    }

    pub fn status(&self) -> Option<Status> {
        self.session.as_ref().map(|s| Status {
            generation: s.generation(),
            case: s.agent().position,
            left: self
                .stage
                .left(s.element())
                .unwrap_or_else(|| self.spatial.sprite_left(s.agent().position)),
            scenario: s.agent().scenario.label(),
            frame: s.frame(),
            activity: s.activity(),
            mood: s.mood(),
            on_bed: s.agent().on_bed,
            moving: s.is_moving(),
            scheduler_armed: s.scheduler_armed(),
            skin: s.skin().to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load_settings(&mut self) -> Settings {
        match self.store.load() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings, using defaults: {e}");
                Settings::default()
            }
        }
    }

    fn build(&mut self, settings: &Settings) {
        self.landmarks = Landmarks::place(
            &mut self.stage,
            &self.sprites,
            settings.bed_position,
            settings.toy_position,
        );
        self.spawn(settings.agent_position);
    }

    fn spawn(&mut self, saved_position: Option<f64>) {
        self.generation += 1;
        let generation = self.generation;
        let skin = self.skin.clone();
        let (slot, mut ctx) = self.split();
        *slot = Some(AgentSession::spawn(&mut ctx, generation, &skin, saved_position));
    }

    fn dispatch(&mut self, id: TimerId, alarm: Alarm) {
        match alarm {
            Alarm::Session { generation, wake } => {
                if self.session.as_ref().map(|s| s.generation()) != Some(generation) {
                    log::trace!("dropping stale {wake:?} for agent #{generation}");
                    return;
                }
                let status = self.with_session(|session, ctx| session.on_wake(ctx, id, wake));
                match status {
                    Some(SessionStatus::Finished) => {
                        self.session = None;
                        self.timers.after(self.now, RESPAWN_DELAY_MS, Alarm::Respawn);
                    }
                    Some(SessionStatus::Detached) => self.session = None,
                    _ => {}
                }
            }
            Alarm::Respawn => self.respawn(),
            Alarm::Reenable => {
                if self.disabled || self.session.is_some() {
                    return;
                }
                let settings = self.load_settings();
                self.skin = settings.skin.clone();
                if settings.disabled {
                    self.disabled = true;
                    return;
                }
                self.build(&settings);
            }
        }
    }

    /// Fresh agent after a death, only while the bed is still on stage.
    fn respawn(&mut self) {
        if self.disabled || self.session.is_some() || !self.landmarks.bed_attached(&self.stage) {
            return;
        }
        let settings = self.load_settings();
        for landmark in [self.landmarks.bed, self.landmarks.toy].into_iter().flatten() {
            self.stage.fade(landmark.entity, 1.0, 0);
        }
        log::info!("Respawning agent");
        self.spawn(settings.agent_position);
    }

    fn split(&mut self) -> (&mut Option<AgentSession>, Context<'_>) {
        (
            &mut self.session,
            Context {
                now: self.now,
                timers: &mut self.timers,
                stage: &mut self.stage,
                store: self.store.as_mut(),
                sprites: &mut self.sprites,
                dice: self.dice.as_mut(),
                spatial: &self.spatial,
                landmarks: &self.landmarks,
            },
        )
    }

    fn with_session<R>(
        &mut self,
        f: impl FnOnce(&mut AgentSession, &mut Context<'_>) -> R,
    ) -> Option<R> {
        let (slot, mut ctx) = self.split();
        let session = slot.as_mut()?;
        Some(f(session, &mut ctx))
    }
}

#[cfg(test)]
impl PetController {
    pub fn spatial(&self) -> &SpatialModel {
        &self.spatial
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn session(&self) -> Option<&AgentSession> {
        self.session.as_ref()
    }

    pub fn skin(&self) -> &str {
        &self.skin
    }
}

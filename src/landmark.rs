use crate::assets::SpriteLibrary;
use crate::config::SettingsPatch;
use crate::spatial::Zone;
use crate::stage::{ElementKind, Stage};
use crate::store::SettingsStore;

/// Gap kept between a default-placed toy and the bed's left edge.
const TOY_BED_GAP: f64 = 80.0;
/// Smallest default left for the toy.
const TOY_MIN_LEFT: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkKind {
    Bed,
    Toy,
}

impl LandmarkKind {
    /// Rendered width in pixels.
    pub fn width(self) -> f64 {
        match self {
            LandmarkKind::Bed => 128.0,
            LandmarkKind::Toy => 64.0,
        }
    }

    /// Zone half-width around the centre.
    pub fn radius(self) -> f64 {
        self.width() / 2.0
    }

    pub fn element(self) -> ElementKind {
        match self {
            LandmarkKind::Bed => ElementKind::Bed,
            LandmarkKind::Toy => ElementKind::Toy,
        }
    }

    pub fn asset(self) -> &'static str {
        match self {
            LandmarkKind::Bed => "assets/materials/catBed.png",
            LandmarkKind::Toy => "assets/materials/toy.png",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LandmarkKind::Bed => "bed",
            LandmarkKind::Toy => "toy",
        }
    }

    /// Bed sits at two thirds of the viewport; the toy just left of the bed,
    /// or at one third when there is no bed.
    pub fn default_left(self, viewport_width: f64, bed_left: Option<f64>) -> f64 {
        match (self, bed_left) {
            (LandmarkKind::Bed, _) => viewport_width * 2.0 / 3.0 - 64.0,
            (LandmarkKind::Toy, Some(bed)) => {
                (bed - TOY_BED_GAP).max(TOY_MIN_LEFT).min(viewport_width - 64.0)
            }
            (LandmarkKind::Toy, None) => viewport_width / 3.0 - 32.0,
        }
    }

    /// Drag range: fully on screen.
    pub fn clamp_left(self, left: f64, viewport_width: f64) -> f64 {
        left.min(viewport_width - self.width()).max(0.0)
    }

    fn patch(self, left: f64) -> SettingsPatch {
        match self {
            LandmarkKind::Bed => SettingsPatch {
                bed_position: Some(Some(left)),
                ..SettingsPatch::default()
            },
            LandmarkKind::Toy => SettingsPatch {
                toy_position: Some(Some(left)),
                ..SettingsPatch::default()
            },
        }
    }
}

/// A draggable bed or toy mounted on the stage.
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    pub kind: LandmarkKind,
    pub entity: hecs::Entity,
}

impl Landmark {
    /// Mount the landmark, or adopt the element already on stage.
    pub fn place(
        stage: &mut Stage,
        sprites: &SpriteLibrary,
        kind: LandmarkKind,
        saved: Option<f64>,
        bed_left: Option<f64>,
    ) -> Self {
        if let Some(entity) = stage.find(kind.element()) {
            return Self { kind, entity };
        }
        let left = saved
            .unwrap_or_else(|| kind.default_left(stage.width(), bed_left))
            .max(0.0);
        let entity = stage.mount(kind.element(), left);
        stage.set_sprite(entity, &sprites.resolve(kind.asset()));
        log::debug!("{} placed at {left}px", kind.label());
        Self { kind, entity }
    }

    pub fn is_attached(&self, stage: &Stage) -> bool {
        stage.is_attached(self.entity)
    }

    pub fn left(&self, stage: &Stage) -> Option<f64> {
        stage.left(self.entity)
    }

    pub fn center(&self, stage: &Stage) -> Option<f64> {
        self.left(stage).map(|left| left + self.kind.width() / 2.0)
    }

    pub fn zone(&self, stage: &Stage) -> Option<Zone> {
        self.center(stage)
            .map(|center| Zone::around(center, self.kind.radius()))
    }

    /// Reposition (end of a drag gesture) and persist.
    pub fn drag_to(&self, stage: &mut Stage, store: &mut dyn SettingsStore, left: f64) {
        if !self.is_attached(stage) {
            return;
        }
        let left = self.kind.clamp_left(left, stage.width());
        stage.set_left(self.entity, left);
        self.save(stage, store);
    }

    pub fn save(&self, stage: &Stage, store: &mut dyn SettingsStore) {
        let Some(left) = self.left(stage) else {
            return;
        };
        if let Err(e) = store.save(&self.kind.patch(left)) {
            log::warn!("Failed to save {} position: {e}", self.kind.label());
        }
    }

    /// Put a landmark that ended up completely off screen back at its default.
    pub fn reset_if_offscreen(
        &self,
        stage: &mut Stage,
        store: &mut dyn SettingsStore,
        bed_left: Option<f64>,
    ) -> bool {
        let Some(left) = self.left(stage) else {
            return false;
        };
        let width = stage.width();
        if left >= -self.kind.width() && left <= width {
            return false;
        }
        let reset = self.kind.default_left(width, bed_left);
        log::warn!(
            "{} was off screen at {left}px, moved back to {reset}px",
            self.kind.label()
        );
        stage.set_left(self.entity, reset);
        self.save(stage, store);
        true
    }
}

/// The bed and toy of one stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct Landmarks {
    pub bed: Option<Landmark>,
    pub toy: Option<Landmark>,
}

impl Landmarks {
    /// Place the bed first so the toy can default next to it.
    pub fn place(
        stage: &mut Stage,
        sprites: &SpriteLibrary,
        bed_saved: Option<f64>,
        toy_saved: Option<f64>,
    ) -> Self {
        let bed = Landmark::place(stage, sprites, LandmarkKind::Bed, bed_saved, None);
        let bed_left = bed.left(stage);
        let toy = Landmark::place(stage, sprites, LandmarkKind::Toy, toy_saved, bed_left);
        Self {
            bed: Some(bed),
            toy: Some(toy),
        }
    }

    pub fn get(&self, kind: LandmarkKind) -> Option<Landmark> {
        match kind {
            LandmarkKind::Bed => self.bed,
            LandmarkKind::Toy => self.toy,
        }
    }

    pub fn bed_zone(&self, stage: &Stage) -> Option<Zone> {
        self.bed.and_then(|bed| bed.zone(stage))
    }

    pub fn toy_zone(&self, stage: &Stage) -> Option<Zone> {
        self.toy.and_then(|toy| toy.zone(stage))
    }

    pub fn bed_attached(&self, stage: &Stage) -> bool {
        self.bed.map_or(false, |bed| bed.is_attached(stage))
    }

    /// Off-screen check for both landmarks.
    pub fn tidy(&self, stage: &mut Stage, store: &mut dyn SettingsStore) {
        if let Some(bed) = self.bed {
            bed.reset_if_offscreen(stage, store, None);
        }
        if let Some(toy) = self.toy {
            let bed_left = self.bed.and_then(|bed| bed.left(stage));
            toy.reset_if_offscreen(stage, store, bed_left);
        }
    }

    pub fn remove(&mut self, stage: &mut Stage) {
        for landmark in [self.bed.take(), self.toy.take()].into_iter().flatten() {
            stage.remove(landmark.entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::testing::{FixedAssets, MemoryStore};

    fn sprites() -> SpriteLibrary {
        SpriteLibrary::new(Box::new(FixedAssets::new(64)))
    }

    #[test]
    fn default_placement() {
        let mut stage = Stage::new(1200.0, 800.0);
        let landmarks = Landmarks::place(&mut stage, &sprites(), None, None);
        let bed = landmarks.bed.unwrap();
        let toy = landmarks.toy.unwrap();
        assert_eq!(bed.left(&stage), Some(736.0));
        assert_eq!(toy.left(&stage), Some(656.0));
        assert_eq!(bed.zone(&stage), Some(Zone::around(800.0, 64.0)));
        assert_eq!(toy.zone(&stage), Some(Zone::around(688.0, 32.0)));
        assert_eq!(
            stage.sprite(bed.entity).unwrap().url,
            "ext://assets/materials/catBed.png"
        );
    }

    #[test]
    fn toy_default_keeps_clear_of_edges() {
        assert_eq!(LandmarkKind::Toy.default_left(1000.0, Some(50.0)), 32.0);
        assert_eq!(LandmarkKind::Toy.default_left(300.0, Some(400.0)), 236.0);
        assert_eq!(LandmarkKind::Toy.default_left(900.0, None), 268.0);
    }

    #[test]
    fn saved_positions_win_and_existing_elements_are_adopted() {
        let mut stage = Stage::new(1000.0, 800.0);
        let first = Landmarks::place(&mut stage, &sprites(), Some(100.0), Some(-20.0));
        assert_eq!(first.bed.unwrap().left(&stage), Some(100.0));
        assert_eq!(first.toy.unwrap().left(&stage), Some(0.0));

        let second = Landmarks::place(&mut stage, &sprites(), Some(500.0), None);
        assert_eq!(second.bed.unwrap().entity, first.bed.unwrap().entity);
        assert_eq!(second.bed.unwrap().left(&stage), Some(100.0));
    }

    #[test]
    fn drag_clamps_and_persists() {
        let mut stage = Stage::new(1000.0, 800.0);
        let mut store = MemoryStore::new(Settings::default());
        let landmarks = Landmarks::place(&mut stage, &sprites(), None, None);

        landmarks.bed.unwrap().drag_to(&mut stage, &mut store, 990.0);
        landmarks.toy.unwrap().drag_to(&mut stage, &mut store, -40.0);
        assert_eq!(landmarks.bed.unwrap().left(&stage), Some(872.0));
        assert_eq!(landmarks.toy.unwrap().left(&stage), Some(0.0));

        let saved = store.settings();
        assert_eq!(saved.bed_position, Some(872.0));
        assert_eq!(saved.toy_position, Some(0.0));
    }

    #[test]
    fn offscreen_landmarks_reset_after_shrink() {
        let mut stage = Stage::new(1500.0, 800.0);
        let mut store = MemoryStore::new(Settings::default());
        let landmarks = Landmarks::place(&mut stage, &sprites(), Some(1300.0), Some(1400.0));

        stage.resize(900.0, 800.0);
        landmarks.tidy(&mut stage, &mut store);
        assert_eq!(landmarks.bed.unwrap().left(&stage), Some(536.0));
        assert_eq!(landmarks.toy.unwrap().left(&stage), Some(456.0));
        assert_eq!(store.settings().bed_position, Some(536.0));

        // Partly visible is fine.
        stage.set_left(landmarks.toy.unwrap().entity, -60.0);
        assert!(!landmarks
            .toy
            .unwrap()
            .reset_if_offscreen(&mut stage, &mut store, None));
    }

    #[test]
    fn detached_landmarks_have_no_zone() {
        let mut stage = Stage::new(1000.0, 800.0);
        let mut landmarks = Landmarks::place(&mut stage, &sprites(), None, None);
        let bed = landmarks.bed.unwrap();
        landmarks.remove(&mut stage);
        assert!(!bed.is_attached(&stage));
        assert_eq!(bed.zone(&stage), None);
        assert_eq!(landmarks.bed_zone(&stage), None);
        assert!(!landmarks.bed_attached(&stage));
    }
}

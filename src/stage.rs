use crate::timer::Millis;

/// Rendering scale of the agent sprite (32px frames drawn at 64px).
pub const AGENT_SCALE: f64 = 2.0;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Which overlay element an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Agent,
    Bed,
    Toy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element(pub ElementKind);

/// Left offset in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Left(pub f64);

/// Sprite sheet shown by the element and the background shift selecting a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub url: String,
    pub offset_x: f64,
}

/// Target opacity and the transition length used to reach it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opacity {
    pub alpha: f64,
    pub fade_ms: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub flipped: bool,
}

/// Everything a renderer needs for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementView {
    pub kind: ElementKind,
    pub left: f64,
    pub sprite: Option<Sprite>,
    pub opacity: Opacity,
    pub transform: Transform,
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The host surface: a viewport plus the overlay elements mounted on it.
///
/// An element is attached while its entity lives in the world. Every mutator
/// is a silent no-op on detached elements.
pub struct Stage {
    world: hecs::World,
    width: f64,
    height: f64,
}

impl Stage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            world: hecs::World::new(),
            width,
            height,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn mount(&mut self, kind: ElementKind, left: f64) -> hecs::Entity {
        self.world.spawn((
            Element(kind),
            Left(left),
            Opacity {
                alpha: 1.0,
                fade_ms: 0,
            },
            Transform {
                scale: if kind == ElementKind::Agent { AGENT_SCALE } else { 1.0 },
                flipped: false,
            },
        ))
    }

    /// First attached element of `kind`.
    pub fn find(&self, kind: ElementKind) -> Option<hecs::Entity> {
        self.world
            .query::<&Element>()
            .iter()
            .find(|(_, el)| el.0 == kind)
            .map(|(entity, _)| entity)
    }

    pub fn remove(&mut self, entity: hecs::Entity) {
        let _ = self.world.despawn(entity);
    }

    pub fn is_attached(&self, entity: hecs::Entity) -> bool {
        self.world.contains(entity)
    }

    pub fn left(&self, entity: hecs::Entity) -> Option<f64> {
        self.world.get::<&Left>(entity).ok().map(|l| l.0)
    }

    pub fn set_left(&mut self, entity: hecs::Entity, left: f64) {
        if let Ok(mut l) = self.world.get::<&mut Left>(entity) {
            l.0 = left;
        }
    }

    /// Swap the sprite sheet, showing its first frame.
    pub fn set_sprite(&mut self, entity: hecs::Entity, url: &str) {
        if !self.world.contains(entity) {
            return;
        }
        let sprite = Sprite {
            url: url.to_string(),
            offset_x: 0.0,
        };
        let _ = self.world.insert_one(entity, sprite);
    }

    /// Change the sheet URL but keep the current frame (skin swap).
    pub fn set_sprite_url(&mut self, entity: hecs::Entity, url: &str) {
        if let Ok(mut sprite) = self.world.get::<&mut Sprite>(entity) {
            sprite.url = url.to_string();
            return;
        }
        self.set_sprite(entity, url);
    }

    pub fn set_frame_offset(&mut self, entity: hecs::Entity, offset_x: f64) {
        if let Ok(mut sprite) = self.world.get::<&mut Sprite>(entity) {
            sprite.offset_x = offset_x;
        }
    }

    pub fn fade(&mut self, entity: hecs::Entity, alpha: f64, fade_ms: Millis) {
        if let Ok(mut opacity) = self.world.get::<&mut Opacity>(entity) {
            *opacity = Opacity { alpha, fade_ms };
        }
    }

    pub fn set_transform(&mut self, entity: hecs::Entity, scale: f64, flipped: bool) {
        if let Ok(mut t) = self.world.get::<&mut Transform>(entity) {
            *t = Transform { scale, flipped };
        }
    }

    #[cfg(test)]
    pub fn opacity(&self, entity: hecs::Entity) -> Option<Opacity> {
        self.world.get::<&Opacity>(entity).ok().map(|o| *o)
    }

    #[cfg(test)]
    pub fn transform(&self, entity: hecs::Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    #[cfg(test)]
    pub fn sprite(&self, entity: hecs::Entity) -> Option<Sprite> {
        self.world.get::<&Sprite>(entity).ok().map(|s| (*s).clone())
    }

    /// Views of every attached element.
    pub fn snapshot(&self) -> Vec<ElementView> {
        self.world
            .query::<(&Element, &Left, Option<&Sprite>, &Opacity, &Transform)>()
            .iter()
            .map(|(_, (element, left, sprite, opacity, transform))| ElementView {
                kind: element.0,
                left: left.0,
                sprite: sprite.cloned(),
                opacity: *opacity,
                transform: *transform,
            })
            .collect()
    }
}

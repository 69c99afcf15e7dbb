//! Deterministic doubles shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::assets::AssetResolver;
use crate::config::{Settings, SettingsChange, SettingsPatch};
use crate::dice::Dice;
use crate::error::{AssetError, StorageError};
use crate::store::SettingsStore;

/// Replays queued unit draws, then returns `fallback` forever.
pub struct ScriptedDice {
    queue: VecDeque<f64>,
    fallback: f64,
    draws: usize,
}

impl ScriptedDice {
    pub fn new(values: &[f64], fallback: f64) -> Self {
        Self {
            queue: values.iter().copied().collect(),
            fallback,
            draws: 0,
        }
    }

    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl Dice for ScriptedDice {
    fn unit(&mut self) -> f64 {
        self.draws += 1;
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

/// Assets that all share one made-up image width.
pub struct FixedAssets {
    width: u32,
    failing: Vec<String>,
    lookups: Rc<Cell<usize>>,
}

impl FixedAssets {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            failing: Vec::new(),
            lookups: Rc::new(Cell::new(0)),
        }
    }

    pub fn failing(mut self, file: &str) -> Self {
        self.failing.push(file.to_string());
        self
    }

    /// Counter of `image_width` calls, shared with the resolver.
    pub fn lookups(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.lookups)
    }
}

impl AssetResolver for FixedAssets {
    fn resolve(&self, relative: &str) -> String {
        format!("ext://{relative}")
    }

    fn image_width(&self, url: &str) -> Result<u32, AssetError> {
        self.lookups.set(self.lookups.get() + 1);
        let file = url.rsplit('/').next().unwrap_or(url);
        if self.failing.iter().any(|f| f == file) {
            return Err(AssetError::Missing(url.to_string()));
        }
        Ok(self.width)
    }
}

#[derive(Default)]
struct MemoryInner {
    settings: Settings,
    changes: Vec<SettingsChange>,
    writes: Vec<SettingsPatch>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory store. Clones share state so a test can keep a handle after
/// giving the store away.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryInner {
                settings,
                ..MemoryInner::default()
            })),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.borrow().settings.clone()
    }

    /// Every patch written through `save`, in order.
    pub fn writes(&self) -> Vec<SettingsPatch> {
        self.inner.borrow().writes.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Change settings as another process would.
    pub fn set_external(&self, patch: SettingsPatch) {
        let mut inner = self.inner.borrow_mut();
        let changes = patch.apply(&mut inner.settings);
        inner.changes.extend(changes);
    }
}

impl SettingsStore for MemoryStore {
    fn load(&mut self) -> Result<Settings, StorageError> {
        let inner = self.inner.borrow();
        if inner.fail_reads {
            return Err(StorageError::Unavailable("reads disabled".into()));
        }
        Ok(inner.settings.clone())
    }

    fn save(&mut self, patch: &SettingsPatch) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        inner.writes.push(patch.clone());
        let changes = patch.apply(&mut inner.settings);
        inner.changes.extend(changes);
        Ok(())
    }

    fn take_changes(&mut self) -> Vec<SettingsChange> {
        std::mem::take(&mut self.inner.borrow_mut().changes)
    }
}

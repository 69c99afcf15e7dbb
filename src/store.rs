use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{settings_path, Settings, SettingsChange, SettingsPatch};
use crate::error::StorageError;

/// Key-value settings persistence with a pulled change feed.
///
/// Writes made through `save` show up in `take_changes` like any other change,
/// so the controller reacts to every source the same way.
pub trait SettingsStore {
    fn load(&mut self) -> Result<Settings, StorageError>;

    fn save(&mut self, patch: &SettingsPatch) -> Result<(), StorageError>;

    /// Pick up edits made behind the store's back.
    fn refresh(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Drain changes observed since the last call.
    fn take_changes(&mut self) -> Vec<SettingsChange>;
}

/// `settings.json` on disk, written atomically.
pub struct JsonFileStore {
    path: PathBuf,
    cached: Settings,
    changes: Vec<SettingsChange>,
}

impl JsonFileStore {
    /// Open the store at `path`, writing the defaults if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let cached = if path.exists() {
            read_settings(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable settings at {}: {e}", path.display());
                Settings::default()
            })
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let defaults = Settings::default();
            write_atomic(&path, &defaults)?;
            log::info!("Created default settings at {}", path.display());
            defaults
        };
        Ok(Self {
            path,
            cached,
            changes: Vec::new(),
        })
    }

    /// Open the store in the platform data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(settings_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&mut self) -> Result<Settings, StorageError> {
        self.cached = read_settings(&self.path)?;
        Ok(self.cached.clone())
    }

    fn save(&mut self, patch: &SettingsPatch) -> Result<(), StorageError> {
        // Report external edits made since the last refresh before they are merged.
        if let Ok(on_disk) = read_settings(&self.path) {
            let external = SettingsPatch::replace_all(&on_disk).apply(&mut self.cached);
            self.changes.extend(external);
        }
        let mut next = self.cached.clone();
        let changes = patch.apply(&mut next);
        write_atomic(&self.path, &next)?;
        self.cached = next;
        self.changes.extend(changes);
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), StorageError> {
        let on_disk = read_settings(&self.path)?;
        let changes = SettingsPatch::replace_all(&on_disk).apply(&mut self.cached);
        if !changes.is_empty() {
            log::debug!("settings changed on disk: {changes:?}");
        }
        self.changes.extend(changes);
        Ok(())
    }

    fn take_changes(&mut self) -> Vec<SettingsChange> {
        std::mem::take(&mut self.changes)
    }
}

fn read_settings(path: &Path) -> Result<Settings, StorageError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_atomic(path: &Path, settings: &Settings) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(settings)?;
    fs::write(&tmp, data)?;
    // Replaces the target in one step on every platform std supports.
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_defaults_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.load().unwrap(), Settings::default());
        assert!(!dir.path().join("nested").join("settings.json.tmp").exists());
    }

    #[test]
    fn save_merges_and_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = JsonFileStore::open(&path).unwrap();

        store
            .save(&SettingsPatch {
                bed_position: Some(Some(512.0)),
                ..SettingsPatch::default()
            })
            .unwrap();
        store
            .save(&SettingsPatch {
                skin: Some("tiger".into()),
                ..SettingsPatch::default()
            })
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap().load().unwrap();
        assert_eq!(reopened.bed_position, Some(512.0));
        assert_eq!(reopened.skin, "tiger");
        assert_eq!(
            store.take_changes(),
            vec![
                SettingsChange::BedPosition(Some(512.0)),
                SettingsChange::Skin("tiger".into()),
            ]
        );
        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn refresh_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = JsonFileStore::open(&path).unwrap();

        fs::write(&path, r#"{"skin":"default","disabled":true}"#).unwrap();
        store.refresh().unwrap();
        assert_eq!(store.take_changes(), vec![SettingsChange::Disabled(true)]);

        store.refresh().unwrap();
        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn save_reports_external_edits_it_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = JsonFileStore::open(&path).unwrap();

        fs::write(&path, r#"{"skin":"tiger","disabled":true}"#).unwrap();
        store
            .save(&SettingsPatch {
                agent_position: Some(Some(7.0)),
                ..SettingsPatch::default()
            })
            .unwrap();
        store.refresh().unwrap();

        assert_eq!(
            store.take_changes(),
            vec![
                SettingsChange::Skin("tiger".into()),
                SettingsChange::Disabled(true),
                SettingsChange::AgentPosition(Some(7.0)),
            ]
        );
        let saved = store.load().unwrap();
        assert!(saved.disabled);
        assert_eq!(saved.skin, "tiger");
        assert_eq!(saved.agent_position, Some(7.0));
    }

    #[test]
    fn save_replaces_the_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        for pos in [1.0, 2.0] {
            store
                .save(&SettingsPatch {
                    bed_position: Some(Some(pos)),
                    ..SettingsPatch::default()
                })
                .unwrap();
        }
        assert_eq!(store.load().unwrap().bed_position, Some(2.0));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn malformed_file_opens_but_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(matches!(store.load(), Err(StorageError::Malformed(_))));

        // A save repairs the file from the cached defaults.
        store
            .save(&SettingsPatch {
                disabled: Some(true),
                ..SettingsPatch::default()
            })
            .unwrap();
        assert!(store.load().unwrap().disabled);
    }
}

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Skin used when nothing has been chosen yet.
pub const DEFAULT_SKIN: &str = "default";

/// Persisted user settings. Positions are pixels (agent: cases); `None` means
/// "use the default placement".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub skin: String,
    pub disabled: bool,
    pub agent_position: Option<f64>,
    pub bed_position: Option<f64>,
    pub toy_position: Option<f64>,
    pub first_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skin: DEFAULT_SKIN.to_string(),
            disabled: false,
            agent_position: None,
            bed_position: None,
            toy_position: None,
            first_run: true,
        }
    }
}

/// A key that changed, with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsChange {
    Skin(String),
    Disabled(bool),
    AgentPosition(Option<f64>),
    BedPosition(Option<f64>),
    ToyPosition(Option<f64>),
    FirstRun(bool),
}

/// Partial update. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub skin: Option<String>,
    pub disabled: Option<bool>,
    pub agent_position: Option<Option<f64>>,
    pub bed_position: Option<Option<f64>>,
    pub toy_position: Option<Option<f64>>,
    pub first_run: Option<bool>,
}

impl SettingsPatch {
    /// Patch that overwrites every key with `settings`.
    pub fn replace_all(settings: &Settings) -> Self {
        Self {
            skin: Some(settings.skin.clone()),
            disabled: Some(settings.disabled),
            agent_position: Some(settings.agent_position),
            bed_position: Some(settings.bed_position),
            toy_position: Some(settings.toy_position),
            first_run: Some(settings.first_run),
        }
    }

    /// Write into `settings`, reporting only keys whose value actually changed.
    pub fn apply(&self, settings: &mut Settings) -> Vec<SettingsChange> {
        let mut changes = Vec::new();
        if let Some(skin) = &self.skin {
            if *skin != settings.skin {
                settings.skin = skin.clone();
                changes.push(SettingsChange::Skin(skin.clone()));
            }
        }
        if let Some(disabled) = self.disabled {
            if disabled != settings.disabled {
                settings.disabled = disabled;
                changes.push(SettingsChange::Disabled(disabled));
            }
        }
        if let Some(pos) = self.agent_position {
            if pos != settings.agent_position {
                settings.agent_position = pos;
                changes.push(SettingsChange::AgentPosition(pos));
            }
        }
        if let Some(pos) = self.bed_position {
            if pos != settings.bed_position {
                settings.bed_position = pos;
                changes.push(SettingsChange::BedPosition(pos));
            }
        }
        if let Some(pos) = self.toy_position {
            if pos != settings.toy_position {
                settings.toy_position = pos;
                changes.push(SettingsChange::ToyPosition(pos));
            }
        }
        if let Some(first_run) = self.first_run {
            if first_run != settings.first_run {
                settings.first_run = first_run;
                changes.push(SettingsChange::FirstRun(first_run));
            }
        }
        changes
    }
}

/// Platform data directory holding `settings.json`.
pub fn settings_path() -> Result<PathBuf, StorageError> {
    let proj = ProjectDirs::from("com", "catnap", "Catnap")
        .ok_or_else(|| StorageError::Unavailable("could not resolve project directories".into()))?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)?;
    Ok(dir.join("settings.json"))
}

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, GuildId};
use std::{collections::HashMap, fs, path::PathBuf};
use tokio::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChimeMode {
    Off,
    Max,
    Specific,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSetting {
    pub mode: ChimeMode,
    #[serde(
        rename = "specificChannelId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub specific_channel_id: Option<ChannelId>,
}

impl GuildSetting {
    pub fn max() -> GuildSetting {
        GuildSetting {
            mode: ChimeMode::Max,
            specific_channel_id: None,
        }
    }

    pub fn specific(channel_id: ChannelId) -> GuildSetting {
        GuildSetting {
            mode: ChimeMode::Specific,
            specific_channel_id: Some(channel_id),
        }
    }
}

impl Default for GuildSetting {
    // a guild without a stored entry is off
    fn default() -> GuildSetting {
        GuildSetting {
            mode: ChimeMode::Off,
            specific_channel_id: None,
        }
    }
}

pub trait SettingsRepository: Send + Sync {
    fn load(&self) -> anyhow::Result<HashMap<GuildId, GuildSetting>>;
    fn save(&self, entries: &HashMap<GuildId, GuildSetting>) -> anyhow::Result<()>;
}

pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: PathBuf) -> JsonFileRepository {
        JsonFileRepository { path }
    }
}

impl SettingsRepository for JsonFileRepository {
    fn load(&self) -> anyhow::Result<HashMap<GuildId, GuildSetting>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    fn save(&self, entries: &HashMap<GuildId, GuildSetting>) -> anyhow::Result<()> {
        let raw = serde_json::to_string(entries).context("failed to serialize guild settings")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Per-guild chime settings. The whole mapping is rewritten on every
/// mutation; losing the last write only reverts a guild to its previous mode.
pub struct SettingsStore {
    repository: Box<dyn SettingsRepository>,
    entries: Mutex<HashMap<GuildId, GuildSetting>>,
}

impl SettingsStore {
    pub fn load(repository: Box<dyn SettingsRepository>) -> anyhow::Result<SettingsStore> {
        let entries = repository.load()?;
        Ok(SettingsStore {
            repository,
            entries: Mutex::new(entries),
        })
    }

    pub async fn get(&self, guild_id: GuildId) -> GuildSetting {
        let entries = self.entries.lock().await;
        entries.get(&guild_id).cloned().unwrap_or_default()
    }

    pub async fn set(&self, guild_id: GuildId, setting: GuildSetting) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(guild_id, setting);
        self.repository.save(&entries)
    }

    pub async fn remove(&self, guild_id: GuildId) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(&guild_id);
        self.repository.save(&entries)
    }

    pub async fn enabled(&self) -> Vec<(GuildId, GuildSetting)> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|(_, setting)| setting.mode != ChimeMode::Off)
            .map(|(guild_id, setting)| (*guild_id, setting.clone()))
            .collect()
    }

    pub async fn snapshot(&self) -> HashMap<GuildId, GuildSetting> {
        self.entries.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_at(path: PathBuf) -> SettingsStore {
        SettingsStore::load(Box::new(JsonFileRepository::new(path)))
            .expect("failed to load store")
    }

    #[tokio::test]
    async fn unknown_guild_defaults_to_off() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().join("guilds.json"));
        assert_eq!(store.get(GuildId::new(1)).await, GuildSetting::default());
    }

    #[tokio::test]
    async fn remove_matches_absence() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().join("guilds.json"));
        store.set(GuildId::new(1), GuildSetting::max()).await.unwrap();
        store.remove(GuildId::new(1)).await.unwrap();
        assert_eq!(store.get(GuildId::new(1)).await, GuildSetting::default());
        assert!(store.enabled().await.is_empty());
    }

    #[tokio::test]
    async fn settings_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guilds.json");
        let setting = GuildSetting::specific(ChannelId::new(42));
        {
            let store = store_at(path.clone());
            store.set(GuildId::new(9), setting.clone()).await.unwrap();
        }
        let reloaded = store_at(path);
        assert_eq!(reloaded.get(GuildId::new(9)).await, setting);
    }

    #[tokio::test]
    async fn enabled_skips_off_entries() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().join("guilds.json"));
        store.set(GuildId::new(1), GuildSetting::default()).await.unwrap();
        store.set(GuildId::new(2), GuildSetting::max()).await.unwrap();
        let enabled = store.enabled().await;
        assert_eq!(enabled, vec![(GuildId::new(2), GuildSetting::max())]);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let repository = JsonFileRepository::new(dir.path().join("guilds.json"));
        assert!(repository.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_fails_to_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guilds.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonFileRepository::new(path).load().is_err());
    }

    #[test]
    fn wire_format_matches_persisted_layout() {
        let specific = GuildSetting::specific(ChannelId::new(42));
        assert_eq!(
            serde_json::to_value(&specific).unwrap(),
            serde_json::json!({"mode": "specific", "specificChannelId": "42"})
        );
        assert_eq!(
            serde_json::to_value(GuildSetting::max()).unwrap(),
            serde_json::json!({"mode": "max"})
        );
        assert_eq!(
            serde_json::to_value(GuildSetting::default()).unwrap(),
            serde_json::json!({"mode": "off"})
        );
    }
}

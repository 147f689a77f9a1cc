use crate::{
    Result,
    SyncError,
    events::EventCategory,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::Path,
    time::Duration,
};

pub const DEFAULT_EVENT_POLL_MS: u64 = 200;
pub const DEFAULT_GAME_POLL_MS: u64 = 5_000;
pub const DEFAULT_LOBBY_POLL_MS: u64 = 10_000;
pub const DEFAULT_MAX_WINDOW_BLOCKS: u64 = 5;
pub const DEFAULT_CATEGORY_PAUSE_MS: u64 = 100;
pub const DEFAULT_DEDUP_CAPACITY: usize = 100;
pub const DEFAULT_LOBBY_BATCH_SIZE: usize = 10;
pub const DEFAULT_LOBBY_DISPLAY_CAP: usize = 50;
pub const DEFAULT_HISTORY_PAGE_SIZE: u64 = 10;

/// Presentation order of the lobby batch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum DisplayOrder {
    /// Most recently created first.
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub event_poll_ms: u64,
    pub game_poll_ms: u64,
    pub lobby_poll_ms: u64,
    /// Upper bound on blocks covered by one event scan.
    pub max_window_blocks: u64,
    /// Pause between two category queries of the same scan.
    pub category_pause_ms: u64,
    pub dedup_capacity: usize,
    /// Records read concurrently while loading the lobby.
    pub lobby_batch_size: usize,
    pub lobby_display_cap: usize,
    pub lobby_order: DisplayOrder,
    pub history_page_size: u64,
    pub categories: Vec<EventCategory>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            event_poll_ms: DEFAULT_EVENT_POLL_MS,
            game_poll_ms: DEFAULT_GAME_POLL_MS,
            lobby_poll_ms: DEFAULT_LOBBY_POLL_MS,
            max_window_blocks: DEFAULT_MAX_WINDOW_BLOCKS,
            category_pause_ms: DEFAULT_CATEGORY_PAUSE_MS,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            lobby_batch_size: DEFAULT_LOBBY_BATCH_SIZE,
            lobby_display_cap: DEFAULT_LOBBY_DISPLAY_CAP,
            lobby_order: DisplayOrder::default(),
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            categories: EventCategory::ALL.to_vec(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("reading {}: {e}", path.display()))
        })?;
        let config: SyncConfig = serde_json::from_str(&raw).map_err(|e| {
            SyncError::Config(format!("parsing {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("event_poll_ms", self.event_poll_ms),
            ("game_poll_ms", self.game_poll_ms),
            ("lobby_poll_ms", self.lobby_poll_ms),
            ("max_window_blocks", self.max_window_blocks),
            ("dedup_capacity", self.dedup_capacity as u64),
            ("lobby_batch_size", self.lobby_batch_size as u64),
            ("lobby_display_cap", self.lobby_display_cap as u64),
            ("history_page_size", self.history_page_size),
        ];
        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(SyncError::Config(format!("{name} must be greater than zero")));
        }
        if self.categories.is_empty() {
            return Err(SyncError::Config(
                "at least one event category must be polled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_ms)
    }

    pub fn game_poll_interval(&self) -> Duration {
        Duration::from_millis(self.game_poll_ms)
    }

    pub fn lobby_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lobby_poll_ms)
    }

    pub fn category_pause(&self) -> Duration {
        Duration::from_millis(self.category_pause_ms)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::fs;

    #[test]
    fn validate__accepts_defaults() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn validate__rejects_zero_window() {
        let config = SyncConfig {
            max_window_blocks: 0,
            ..SyncConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            SyncError::Config("max_window_blocks must be greater than zero".to_string())
        );
    }

    #[test]
    fn validate__rejects_empty_categories() {
        let config = SyncConfig {
            categories: Vec::new(),
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load__fills_missing_fields_with_defaults() {
        // given
        let dir = tempdir::TempDir::new("rps-sync-config").unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "game_poll_ms": 7000, "lobby_order": "OldestFirst" }"#)
            .unwrap();

        // when
        let config = SyncConfig::load(&path).unwrap();

        // then
        assert_eq!(config.game_poll_interval(), Duration::from_secs(7));
        assert_eq!(config.lobby_order, DisplayOrder::OldestFirst);
        assert_eq!(config.max_window_blocks, DEFAULT_MAX_WINDOW_BLOCKS);
        assert_eq!(config.categories, EventCategory::ALL.to_vec());
    }

    #[test]
    fn load__reports_invalid_json() {
        let dir = tempdir::TempDir::new("rps-sync-config").unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SyncConfig::load(&path).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const STORE_PATH: &str = "deeplink_client_state.json";

/// Namespace key of the dismissal record.
pub const DISMISSAL_KEY: &str = "deeplink.banner.dismissal";

/// How long a dismissal suppresses the banner.
pub const DISMISSAL_TTL_MILLIS: i64 = 86_400_000;

/// Durable key-value slot scoped to one browsing client.
pub trait DismissalSlot {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Persisted shape of a dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerDismissal {
    pub dismissed_at_epoch_millis: i64,
}

impl BannerDismissal {
    pub fn suppresses(&self, now_millis: i64, ttl_millis: i64) -> bool {
        now_millis < self.expires_at(ttl_millis)
    }

    /// Suppression left at `now_millis`, never negative.
    pub fn remaining_millis(&self, now_millis: i64, ttl_millis: i64) -> i64 {
        self.expires_at(ttl_millis).saturating_sub(now_millis).max(0)
    }

    fn expires_at(&self, ttl_millis: i64) -> i64 {
        self.dismissed_at_epoch_millis.saturating_add(ttl_millis)
    }
}

/// Time-boxed "user dismissed the suggestion" record.
///
/// Every read failure is treated as "not dismissed" so the banner fails
/// open; write failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct DismissalStore<S> {
    slot: S,
    ttl_millis: i64,
}

impl<S: DismissalSlot> DismissalStore<S> {
    pub fn new(slot: S) -> Self {
        Self::with_ttl(slot, DISMISSAL_TTL_MILLIS)
    }

    pub fn with_ttl(slot: S, ttl_millis: i64) -> Self {
        Self { slot, ttl_millis }
    }

    pub fn ttl_millis(&self) -> i64 {
        self.ttl_millis
    }

    pub fn record(&self) -> Option<BannerDismissal> {
        let raw = match self.slot.read(DISMISSAL_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("[STORE] dismissal slot unreadable: {:#}", e);
                return None;
            }
        };

        match serde_json::from_str::<BannerDismissal>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("[STORE] ignoring corrupt dismissal record {:?}: {}", raw, e);
                None
            }
        }
    }

    pub fn is_dismissed(&self, now_millis: i64) -> bool {
        self.record()
            .map(|r| r.suppresses(now_millis, self.ttl_millis))
            .unwrap_or(false)
    }

    /// Overwrites any previous record.
    pub fn dismiss(&mut self, now_millis: i64) {
        let record = BannerDismissal {
            dismissed_at_epoch_millis: now_millis,
        };
        let result = serde_json::to_string(&record)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.slot.write(DISMISSAL_KEY, &raw));

        match result {
            Ok(()) => log::debug!("[STORE] banner dismissed at {}", now_millis),
            Err(e) => log::warn!("[STORE] could not persist dismissal: {:#}", e),
        }
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.slot.remove(DISMISSAL_KEY) {
            log::warn!("[STORE] could not clear dismissal: {:#}", e);
        }
    }
}

/// Ephemeral slot. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DismissalSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Slot backed by a JSON object file, one per client installation.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

impl DismissalSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        // An unreadable file is replaced rather than blocking the write.
        let mut entries = self.load().unwrap_or_else(|e| {
            log::warn!("[STORE] resetting unreadable state file: {:#}", e);
            HashMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Wall clock in epoch milliseconds, the unit of [`BannerDismissal`].
pub fn now_epoch_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: i64 = 86_400_000;

    // Global counter to ensure unique paths
    static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_state_path() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let count = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.push(format!(
            "deeplink_store_test_{}_{}_{}",
            std::process::id(),
            now_epoch_millis(),
            count
        ));
        std::fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir.push(STORE_PATH);
        dir
    }

    #[test]
    fn ttl_window_is_half_open() {
        let mut store = DismissalStore::new(MemorySlot::new());
        store.dismiss(0);

        assert!(store.is_dismissed(0));
        assert!(store.is_dismissed(DAY - 1));
        assert!(!store.is_dismissed(DAY));
        assert!(!store.is_dismissed(DAY + 1));
    }

    #[test]
    fn dismiss_twice_is_same_as_once() {
        let mut once = DismissalStore::new(MemorySlot::new());
        let mut twice = DismissalStore::new(MemorySlot::new());

        once.dismiss(1_000);
        twice.dismiss(1_000);
        twice.dismiss(1_000);

        assert_eq!(once.record(), twice.record());
        for now in [1_000, DAY, DAY + 999, DAY + 1_000] {
            assert_eq!(once.is_dismissed(now), twice.is_dismissed(now));
        }
    }

    #[test]
    fn later_dismiss_overwrites() {
        let mut store = DismissalStore::new(MemorySlot::new());
        store.dismiss(0);
        store.dismiss(DAY);

        assert!(store.is_dismissed(DAY + 10));
        assert_eq!(store.record().map(|r| r.dismissed_at_epoch_millis), Some(DAY));
    }

    #[test]
    fn missing_or_corrupt_record_is_not_dismissed() {
        let mut slot = MemorySlot::new();
        let store = DismissalStore::new(slot.clone());
        assert!(!store.is_dismissed(0));

        slot.write(DISMISSAL_KEY, "{not json").unwrap();
        assert!(!store.is_dismissed(0));

        slot.write(DISMISSAL_KEY, r#"{"dismissedAt":5}"#).unwrap();
        assert!(!store.is_dismissed(5));
    }

    #[test]
    fn remaining_saturates_on_extreme_records() {
        let latest = BannerDismissal { dismissed_at_epoch_millis: i64::MAX };
        assert_eq!(latest.remaining_millis(0, DAY), i64::MAX);
        assert!(latest.suppresses(i64::MAX - 1, DAY));

        let earliest = BannerDismissal { dismissed_at_epoch_millis: -i64::MAX };
        assert_eq!(earliest.remaining_millis(DAY, DAY), 0);
        assert!(!earliest.suppresses(0, DAY));

        let regular = BannerDismissal { dismissed_at_epoch_millis: 1_000 };
        assert_eq!(regular.remaining_millis(1_000, DAY), DAY);
        assert_eq!(regular.remaining_millis(DAY + 2_000, DAY), 0);
    }

    #[test]
    fn clear_removes_record() {
        let mut store = DismissalStore::new(MemorySlot::new());
        store.dismiss(0);
        store.clear();
        assert!(!store.is_dismissed(1));
    }

    #[test]
    fn file_slot_survives_reload() {
        let path = temp_state_path();

        let mut store = DismissalStore::new(FileSlot::new(&path));
        store.dismiss(42);

        let reloaded = DismissalStore::new(FileSlot::new(&path));
        assert_eq!(
            reloaded.record(),
            Some(BannerDismissal { dismissed_at_epoch_millis: 42 })
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(DISMISSAL_KEY));
        assert!(raw.contains("dismissedAtEpochMillis"));
    }

    #[test]
    fn corrupt_file_fails_open_and_is_rewritten() {
        let path = temp_state_path();
        std::fs::write(&path, "garbage").unwrap();

        let mut store = DismissalStore::new(FileSlot::new(&path));
        assert!(!store.is_dismissed(0));

        store.dismiss(0);
        assert!(store.is_dismissed(1));
    }
}

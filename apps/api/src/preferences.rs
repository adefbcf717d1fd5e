use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::profile::CanonicalProfile;
use crate::store::{get_json, set_json, KeyValueStore, StoreError, GHOST_MODE_KEY, LAST_PROFILE_KEY};

/// User preferences plus the CV hand-off they gate.
/// With ghost mode on, parsed profiles are not written to `LAST_PROFILE_KEY`.
#[derive(Clone)]
pub struct PreferencesState {
    store: Arc<dyn KeyValueStore>,
    ghost_mode: Arc<AtomicBool>,
    /// Sequence of the extraction whose profile is currently stored.
    handed_off: Arc<Mutex<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandOff {
    Stored,
    GhostMode,
    /// A newer extraction's profile is already stored.
    Stale,
}

impl PreferencesState {
    /// Reads the persisted flag. An unreadable value is logged and treated as off.
    pub async fn init_from_store(store: Arc<dyn KeyValueStore>) -> Self {
        let ghost_mode = match get_json::<bool>(store.as_ref(), GHOST_MODE_KEY).await {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!("Could not read ghost mode preference: {e}");
                false
            }
        };
        Self {
            store,
            ghost_mode: Arc::new(AtomicBool::new(ghost_mode)),
            handed_off: Arc::new(Mutex::new(0)),
        }
    }

    pub fn ghost_mode(&self) -> bool {
        self.ghost_mode.load(Ordering::SeqCst)
    }

    pub async fn set_ghost_mode(&self, enabled: bool) -> Result<(), StoreError> {
        set_json(self.store.as_ref(), GHOST_MODE_KEY, &enabled).await?;
        self.ghost_mode.store(enabled, Ordering::SeqCst);
        info!("Ghost mode {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Stores `profile` unless ghost mode is on or an extraction issued after
    /// `sequence` has already stored its own.
    pub async fn hand_off_profile(
        &self,
        profile: &CanonicalProfile,
        sequence: u64,
    ) -> Result<HandOff, StoreError> {
        if self.ghost_mode() {
            return Ok(HandOff::GhostMode);
        }
        // Held across the write so an older extraction cannot land after a newer one.
        let mut newest = self.handed_off.lock().await;
        if sequence <= *newest {
            debug!("Skipping profile hand-off {sequence}; {} already stored", *newest);
            return Ok(HandOff::Stale);
        }
        set_json(self.store.as_ref(), LAST_PROFILE_KEY, profile).await?;
        *newest = sequence;
        Ok(HandOff::Stored)
    }

    pub async fn latest_profile(&self) -> Result<Option<CanonicalProfile>, StoreError> {
        get_json(self.store.as_ref(), LAST_PROFILE_KEY).await
    }
}

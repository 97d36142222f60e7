//! Crash recovery for the tracking wizard
//!
//! The in-progress draft is snapshotted to storage so an app restart can
//! resume where the user left off. Snapshots carry the session id they were
//! written under and expire after [`DEFAULT_MAX_AGE_HOURS`].

use crate::clock::Clock;
use crate::error::ClientError;
use crate::storage::{keys, StorageAdapter};
use crate::wizard::{FormDraft, TrackingWizard, WizardStep};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySnapshot {
    pub draft: FormDraft,
    pub step: WizardStep,
    pub saved_at: DateTime<Utc>,
    pub session_id: String,
}

#[derive(Clone)]
pub struct RecoveryStore {
    storage: Arc<StorageAdapter>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl RecoveryStore {
    pub fn new(storage: Arc<StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            max_age: Duration::hours(DEFAULT_MAX_AGE_HOURS),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Persisted session id, created on first use
    pub fn session_id(&self) -> Result<String, ClientError> {
        if let Some(id) = self
            .storage
            .get_item(keys::SESSION_ID)?
            .filter(|id| !id.is_empty())
        {
            return Ok(id);
        }
        let id = Uuid::new_v4().to_string();
        self.storage.set_item(keys::SESSION_ID, &id)?;
        debug!(session_id = %id, "created session id");
        Ok(id)
    }

    pub fn save(&self, wizard: &TrackingWizard) -> Result<RecoverySnapshot, ClientError> {
        let snapshot = RecoverySnapshot {
            draft: wizard.draft().clone(),
            step: wizard.step(),
            saved_at: self.clock.now(),
            session_id: self.session_id()?,
        };
        self.storage.set_object(keys::RECOVERY_SNAPSHOT, &snapshot)?;
        Ok(snapshot)
    }

    /// Latest snapshot, if one exists and is younger than the max age.
    /// Stale snapshots are removed.
    pub fn load(&self) -> Result<Option<RecoverySnapshot>, ClientError> {
        let Some(snapshot) = self
            .storage
            .get_object::<RecoverySnapshot>(keys::RECOVERY_SNAPSHOT)?
        else {
            return Ok(None);
        };

        if self.clock.now() - snapshot.saved_at > self.max_age {
            warn!(saved_at = %snapshot.saved_at, "discarding stale recovery snapshot");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Load the snapshot into `wizard`; returns whether anything was restored
    pub fn restore_into(&self, wizard: &mut TrackingWizard) -> Result<bool, ClientError> {
        match self.load()? {
            Some(snapshot) => {
                wizard.restore(snapshot.draft, snapshot.step);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        self.storage.remove_item(keys::RECOVERY_SNAPSHOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn setup() -> (RecoveryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let storage = Arc::new(StorageAdapter::new(Arc::new(MemoryStore::new())));
        (RecoveryStore::new(storage, clock.clone()), clock)
    }

    #[test]
    fn test_session_id_is_stable() {
        let (store, _) = setup();
        let first = store.session_id().unwrap();
        assert!(Uuid::parse_str(&first).is_ok());
        assert_eq!(store.session_id().unwrap(), first);
    }

    #[test]
    fn test_save_and_restore() {
        let (store, clock) = setup();
        let mut wizard = TrackingWizard::new(clock.clone());
        wizard.toggle(Category::Location, "car").unwrap();
        wizard.advance().unwrap();
        wizard.advance().unwrap();
        store.save(&wizard).unwrap();

        let mut resumed = TrackingWizard::new(clock);
        assert!(store.restore_into(&mut resumed).unwrap());
        assert_eq!(resumed.step(), WizardStep::Environment);
        assert!(resumed.is_selected(Category::Location, "car"));
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let (store, clock) = setup();
        let wizard = TrackingWizard::new(clock.clone());
        store.save(&wizard).unwrap();

        clock.advance(Duration::hours(DEFAULT_MAX_AGE_HOURS + 1));
        assert_eq!(store.load().unwrap(), None);
        // Removed, not just skipped
        clock.set(wizard.draft().time);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let (store, clock) = setup();
        store.save(&TrackingWizard::new(clock)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}

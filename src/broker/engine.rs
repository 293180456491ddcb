//! Broker engine
//!
//! The broker owns the folder store and the retention policy and implements
//! the two operations clients see:
//! - `fetch`: read a folder, expire stale records, return records at or after
//!   a cursor
//! - `post`: append a record stamped with the current time
//!
//! Concurrency and usage notes:
//! - Every folder has its own mutex, held for the whole read-filter-write or
//!   append sequence. Operations on different folders run in parallel. Idle
//!   folders hold no lock entry.
//! - All methods do blocking file I/O. Async callers should run them on the
//!   blocking pool (`tokio::task::spawn_blocking`).
//! - Fetch is fail-open: a log that cannot be read is treated as empty and a
//!   failed compaction is logged, the caller still gets its records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::broker::record::{RECORD_SEPARATOR, Record, log_lines};
use crate::broker::sweep::{CompactionTrigger, sweep};
use crate::broker::topic::FolderName;
use crate::config::StoreSettings;
use crate::persistence::FolderStore;
use crate::utils::error::BrokerError;

/// How long records live and how large folders may grow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub window_secs: u64,
    pub trigger: CompactionTrigger,
    pub max_payload_bytes: usize,
    pub max_records: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window_secs: 300,
            trigger: CompactionTrigger::AnyStale,
            max_payload_bytes: 1024,
            max_records: None,
        }
    }
}

impl RetentionPolicy {
    fn window(&self) -> i64 {
        i64::try_from(self.window_secs).unwrap_or(i64::MAX)
    }
}

#[derive(Debug)]
pub struct Broker {
    store: FolderStore,
    policy: RetentionPolicy,
    locks: Mutex<HashMap<FolderName, Arc<Mutex<()>>>>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(FolderStore::default(), RetentionPolicy::default())
    }
}

impl Broker {
    pub fn new(store: FolderStore, policy: RetentionPolicy) -> Self {
        Self {
            store,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Self {
        let policy = RetentionPolicy {
            window_secs: settings.retention_secs,
            trigger: settings.compaction,
            max_payload_bytes: settings.max_payload_bytes,
            max_records: settings.max_records_per_folder,
        };
        Self::new(FolderStore::new(&settings.data_dir), policy)
    }

    pub fn store(&self) -> &FolderStore {
        &self.store
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn fetch(&self, folder: &str, cursor: i64) -> Result<Vec<Record>, BrokerError> {
        self.fetch_at(folder, cursor, Utc::now().timestamp())
    }

    /// `fetch` with an explicit clock.
    pub fn fetch_at(
        &self,
        folder: &str,
        cursor: i64,
        now: i64,
    ) -> Result<Vec<Record>, BrokerError> {
        let name = Self::folder_name(folder)?;
        Ok(self.with_folder_lock(&name, || self.sweep_folder(&name, cursor, now)))
    }

    /// Read, expire and compact one folder. Caller holds the folder lock.
    fn sweep_folder(&self, name: &FolderName, cursor: i64, now: i64) -> Vec<Record> {
        let contents = match self.store.read(name) {
            Ok(Some(contents)) => contents,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(folder = %name, error = %e, "treating unreadable folder as empty");
                return Vec::new();
            }
        };

        let swept = sweep(
            &contents,
            now,
            self.policy.window(),
            cursor,
            self.policy.trigger,
        );

        if swept.compact {
            let result = if swept.retained.is_empty() {
                self.store.remove(name)
            } else {
                self.store.replace(name, &swept.retained)
            };
            match result {
                Ok(()) => debug!(
                    folder = %name,
                    retained = swept.retained.len(),
                    "compacted folder"
                ),
                Err(e) => warn!(folder = %name, error = %e, "failed to compact folder"),
            }
        }

        swept.matched
    }

    pub fn post(&self, folder: &str, payload: &str) -> Result<Record, BrokerError> {
        self.post_at(folder, payload, Utc::now().timestamp())
    }

    /// `post` with an explicit clock.
    ///
    /// Once the record is appended the post succeeds; a failure to trim the
    /// folder to `max_records` is logged and retried on the next post.
    pub fn post_at(&self, folder: &str, payload: &str, now: i64) -> Result<Record, BrokerError> {
        let name = Self::folder_name(folder)?;
        self.check_payload(payload)?;

        let record = Record::new(now, payload);
        self.with_folder_lock(&name, || -> Result<(), BrokerError> {
            self.store.append(&name, &record)?;
            if let Some(max) = self.policy.max_records {
                if let Err(e) = self.enforce_cap(&name, max) {
                    warn!(folder = %name, error = %e, "failed to trim folder to record cap");
                }
            }
            Ok(())
        })?;

        info!(folder = %name, timestamp = record.timestamp, "posted message");
        Ok(record)
    }

    /// Keep only the newest `max` records. Caller holds the folder lock.
    fn enforce_cap(&self, name: &FolderName, max: usize) -> Result<(), BrokerError> {
        let Some(contents) = self.store.read(name)? else {
            return Ok(());
        };
        let records: Vec<Record> = log_lines(&contents).filter_map(Record::parse).collect();
        if records.len() <= max {
            return Ok(());
        }

        let dropped = records.len() - max;
        self.store.replace(name, &records[dropped..])?;
        debug!(folder = %name, dropped, "trimmed folder to record cap");
        Ok(())
    }

    fn check_payload(&self, payload: &str) -> Result<(), BrokerError> {
        if payload.is_empty() {
            return Err(BrokerError::InvalidPayload("message is empty".to_string()));
        }
        if payload.contains(['\n', '\r']) {
            return Err(BrokerError::InvalidPayload(
                "message contains a line break".to_string(),
            ));
        }
        if payload.contains(RECORD_SEPARATOR) {
            return Err(BrokerError::InvalidPayload(format!(
                "message contains the record separator {RECORD_SEPARATOR:?}"
            )));
        }
        if payload.len() > self.policy.max_payload_bytes {
            return Err(BrokerError::InvalidPayload(format!(
                "message is {} bytes, limit is {}",
                payload.len(),
                self.policy.max_payload_bytes
            )));
        }
        Ok(())
    }

    fn folder_name(folder: &str) -> Result<FolderName, BrokerError> {
        FolderName::parse(folder).ok_or_else(|| BrokerError::InvalidFolder(folder.to_string()))
    }

    /// Run `f` holding the folder's mutex. The map entry is dropped again once
    /// no other caller holds or waits on it, so the map only holds folders
    /// that are in use.
    fn with_folder_lock<R>(&self, name: &FolderName, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(name.clone()).or_default().clone()
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Handles are only cloned under the map lock: two means the map and us.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
        result
    }

    /// Number of folders with a live lock entry.
    pub fn active_folders(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

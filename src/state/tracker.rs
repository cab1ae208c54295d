//! Installation journal: one record per install run, persisted after every
//! change so an interrupted run can still be rolled back later.

use crate::environment::EnvironmentData;
use crate::error::{Result, StackmatchError};
use crate::packages::runner::CancelToken;
use crate::packages::traits::Installer;
use crate::state::io;
use crate::state::types::{
    FAILURE_REASON_KEY, InstallationRecord, InstallationStatus, Journal, ROLLBACK_ERROR_KEY,
    RollbackOutcome, TrackedPackage,
};
use crate::ui;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Owns the journal file and its in-memory copy. Every operation holds the
/// lock until the journal is written, and a change only becomes visible in
/// memory once it is on disk.
pub struct InstallationTracker {
    path: PathBuf,
    journal: Mutex<Journal>,
}

impl InstallationTracker {
    /// Load (or start) the journal at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let journal = io::load_journal(&path)?;
        Ok(Self {
            path,
            journal: Mutex::new(journal),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Journal>> {
        self.journal
            .lock()
            .map_err(|_| StackmatchError::LockError("journal mutex poisoned".to_string()))
    }

    /// Apply `change` to a copy of the journal, persist it, then publish it.
    fn commit<R>(
        &self,
        guard: &mut MutexGuard<'_, Journal>,
        change: impl FnOnce(&mut Journal) -> Result<R>,
    ) -> Result<R> {
        let mut next = (**guard).clone();
        let result = change(&mut next)?;
        io::save_journal(&next, &self.path)?;
        next.meta.revision += 1;
        **guard = next;
        Ok(result)
    }

    fn update_record<R>(
        &self,
        id: &str,
        change: impl FnOnce(&mut InstallationRecord) -> R,
    ) -> Result<R> {
        let mut guard = self.lock()?;
        self.commit(&mut guard, |journal| {
            let record = journal
                .installations
                .get_mut(id)
                .ok_or_else(|| StackmatchError::RecordNotFound(id.to_string()))?;
            Ok(change(record))
        })
    }

    /// New `in_progress` record, persisted before it is returned. Nothing is
    /// kept when the write fails.
    pub fn start_installation(
        &self,
        environment: Option<EnvironmentData>,
    ) -> Result<InstallationRecord> {
        let mut guard = self.lock()?;
        let id = next_id(&guard);
        self.commit(&mut guard, |journal| {
            let record = InstallationRecord::new(id.clone(), environment);
            journal.installations.insert(id, record.clone());
            Ok(record)
        })
    }

    /// Track a package under a record. Adding a name again replaces it and
    /// moves it to the end of the rollback order.
    pub fn add_package(&self, id: &str, mut package: TrackedPackage) -> Result<()> {
        self.update_record(id, |record| {
            package.sequence = record.next_sequence();
            package.rollback = None;
            record.packages.insert(package.name.clone(), package);
        })
    }

    pub fn complete_installation(&self, id: &str) -> Result<()> {
        self.update_record(id, |record| {
            record.status = InstallationStatus::Completed;
            record.timestamp = Utc::now();
        })
    }

    pub fn fail_installation(&self, id: &str, reason: &str) -> Result<()> {
        self.update_record(id, |record| {
            record.status = InstallationStatus::Failed;
            record
                .metadata
                .insert(FAILURE_REASON_KEY.to_string(), reason.to_string());
        })
    }

    /// Uninstall every tracked package, newest first, continuing past
    /// failures. The record ends `rolled_back` or `rollback_failed` either
    /// way; uninstall failures are still returned as `RollbackFailed`.
    pub fn rollback(&self, id: &str, installer: &dyn Installer, cancel: &CancelToken) -> Result<()> {
        let mut guard = self.lock()?;
        let record = guard
            .installations
            .get(id)
            .cloned()
            .ok_or_else(|| StackmatchError::RecordNotFound(id.to_string()))?;

        self.commit(&mut guard, |journal| {
            if let Some(r) = journal.installations.get_mut(id) {
                r.status = InstallationStatus::RollingBack;
            }
            Ok(())
        })?;

        let mut outcomes: Vec<(String, RollbackOutcome)> = Vec::new();
        let mut failures: Vec<(String, String)> = Vec::new();
        for package in record.packages_in_order().into_iter().rev() {
            let result = if package.manager_type != installer.manager_type() {
                Err(StackmatchError::Other(format!(
                    "installed with {}, not {}",
                    package.manager_type.display_name(),
                    installer.manager_type().display_name()
                )))
            } else {
                ui::debug(&format!("Rolling back {}", package.name));
                installer.uninstall_package(cancel, &package.name)
            };

            let outcome = match result {
                Ok(()) => RollbackOutcome::Uninstalled,
                Err(e) => {
                    failures.push((package.name.clone(), e.to_string()));
                    RollbackOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push((package.name.clone(), outcome));
        }

        let error = (!failures.is_empty()).then(|| StackmatchError::RollbackFailed {
            failures: failures.clone(),
        });
        self.commit(&mut guard, |journal| {
            let record = journal
                .installations
                .get_mut(id)
                .ok_or_else(|| StackmatchError::RecordNotFound(id.to_string()))?;
            for (name, outcome) in outcomes {
                if let Some(package) = record.packages.get_mut(&name) {
                    package.rollback = Some(outcome);
                }
            }
            record.timestamp = Utc::now();
            match &error {
                Some(e) => {
                    record.status = InstallationStatus::RollbackFailed;
                    record
                        .metadata
                        .insert(ROLLBACK_ERROR_KEY.to_string(), e.to_string());
                }
                None => {
                    record.status = InstallationStatus::RolledBack;
                    record.metadata.remove(ROLLBACK_ERROR_KEY);
                }
            }
            Ok(())
        })?;

        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Copy of a record.
    pub fn get_installation(&self, id: &str) -> Result<Option<InstallationRecord>> {
        Ok(self.lock()?.installations.get(id).cloned())
    }

    /// Copies of all records, oldest first.
    pub fn list_installations(&self) -> Result<Vec<InstallationRecord>> {
        Ok(self.lock()?.installations.values().cloned().collect())
    }
}

/// `inst_<nanoseconds since epoch>`, zero-padded so ids sort by start time.
fn next_id(journal: &Journal) -> String {
    let mut nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    loop {
        let id = format!("inst_{:020}", nanos);
        if !journal.installations.contains_key(&id) {
            return id;
        }
        nanos += 1;
    }
}

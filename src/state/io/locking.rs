use crate::error::{Result, StackmatchError};
use crate::project_identity;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_WAIT: Duration = Duration::from_secs(10);
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Exclusive lock on `<journal>.lock`, released on drop. The lock file is
/// left in place; removing it would let a waiter lock a stale inode.
pub struct JournalLock {
    file: File,
    path: PathBuf,
}

impl JournalLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JournalLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn lock_path_for(journal: &Path) -> PathBuf {
    let mut name = journal.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

pub fn acquire_lock(journal: &Path) -> Result<JournalLock> {
    acquire_lock_within(journal, LOCK_WAIT)
}

fn acquire_lock_within(journal: &Path, wait: Duration) -> Result<JournalLock> {
    let lock_path = lock_path_for(journal);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| StackmatchError::IoError {
            path: lock_path.clone(),
            source: e,
        })?;

    let started = Instant::now();
    while file.try_lock_exclusive().is_err() {
        if started.elapsed() >= wait {
            return Err(StackmatchError::LockError(format!(
                "Another {} process is writing the journal.\n\
                 Lock file: {}\n\
                 Wait for it to complete, then retry.",
                project_identity::BINARY_NAME,
                lock_path.display()
            )));
        }
        thread::sleep(LOCK_RETRY);
    }

    let _ = file.set_len(0);
    let _ = writeln!(file, "{}", std::process::id());

    Ok(JournalLock {
        file,
        path: lock_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_contention_returns_error() {
        let dir = tempdir().expect("tempdir");
        let journal = dir.path().join("installations.json");

        let _lock = acquire_lock(&journal).expect("first lock");
        match acquire_lock_within(&journal, Duration::from_millis(120)) {
            Ok(_) => panic!("second lock should fail"),
            Err(err) => assert!(err.to_string().contains("writing the journal")),
        }
    }

    #[test]
    fn lock_is_reusable_after_drop() {
        let dir = tempdir().expect("tempdir");
        let journal = dir.path().join("installations.json");

        let lock = acquire_lock(&journal).expect("first lock");
        assert!(lock.path().ends_with("installations.json.lock"));
        drop(lock);
        assert!(acquire_lock_within(&journal, Duration::from_millis(120)).is_ok());
    }
}

//! Identity Store: the durable set of post identities already seen.
//!
//! The store is a single JSON document (`{"post_ids": [...]}`) replaced
//! atomically on every commit via a temp file in the same directory.  While
//! an [`IdentityStore`] is open it holds an exclusive `fs2` lock on
//! `<path>.lock`, so a second process against the same file fails at
//! [`IdentityStore::open`] instead of racing on `filter_new`.
//!
//! Identities are append-only: nothing here ever removes one.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use bw_domain::error::{Error, Result};
use bw_domain::listing::Listing;
use bw_domain::trace::TraceEvent;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    post_ids: BTreeSet<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Staged identities
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Entries of a listing that were not in the store when staged.
///
/// Nothing is recorded until the value is passed to
/// [`IdentityStore::commit`]; dropping it discards the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "staged identities are only recorded once committed"]
pub struct StagedIdentities {
    new: Listing,
}

impl StagedIdentities {
    /// The new entries, in listing order.
    pub fn posts(&self) -> &Listing {
        &self.new
    }

    pub fn len(&self) -> usize {
        self.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct IdentityStore {
    path: PathBuf,
    seen: BTreeSet<String>,
    // Held for the lifetime of the store; dropping it releases the lock.
    lock: File,
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("path", &self.path)
            .field("len", &self.seen.len())
            .finish()
    }
}

/// `<path>.lock`, next to the store file.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn store_err(action: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Store(format!("{action} {}: {e}", path.display()))
}

impl IdentityStore {
    /// Open the store at `path`, creating it (and its parent directories)
    /// when missing.
    ///
    /// # Errors
    ///
    /// `Error::Store` when another process holds the lock, or the file is
    /// unreadable or not a valid store document.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| store_err("creating directory for", &path, e))?;
        }

        let lock_file = lock_path(&path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_file)
            .map_err(|e| store_err("opening lock file", &lock_file, e))?;
        lock.try_lock_exclusive().map_err(|_| {
            Error::Store(format!(
                "another bulletin-watch instance is using {} (lock {} is held)",
                path.display(),
                lock_file.display()
            ))
        })?;

        let seen = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| store_err("reading", &path, e))?;
            if raw.trim().is_empty() {
                BTreeSet::new()
            } else {
                serde_json::from_str::<Document>(&raw)
                    .map_err(|e| store_err("corrupt store", &path, e))?
                    .post_ids
            }
        } else {
            let empty = BTreeSet::new();
            write_atomic(&path, &empty)?;
            tracing::info!(path = %path.display(), "created identity store");
            empty
        };

        tracing::debug!(path = %path.display(), seen = seen.len(), "identity store opened");
        Ok(Self { path, seen, lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Seen identities in lexical order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// Select the entries of `listing` not yet in the store.  Writes nothing.
    pub fn stage(&self, listing: &Listing) -> StagedIdentities {
        let new = listing
            .iter()
            .filter(|(id, _)| !self.seen.contains(*id))
            .map(|(id, title)| (id.to_owned(), title.to_owned()))
            .collect();
        StagedIdentities { new }
    }

    /// Record every staged identity in one atomic file replacement.
    ///
    /// Either all of them become durable or, on error, none do (the
    /// in-memory set is rolled back too).  Returns the number added.
    pub fn commit(&mut self, staged: StagedIdentities) -> Result<usize> {
        let added: Vec<String> = staged
            .new
            .ids()
            .filter(|id| !self.seen.contains(*id))
            .map(str::to_owned)
            .collect();
        if added.is_empty() {
            return Ok(0);
        }

        self.seen.extend(added.iter().cloned());
        if let Err(e) = write_atomic(&self.path, &self.seen) {
            for id in &added {
                self.seen.remove(id);
            }
            return Err(e);
        }

        TraceEvent::StoreCommitted {
            path: self.path.display().to_string(),
            added: added.len(),
            total: self.seen.len(),
        }
        .emit();
        Ok(added.len())
    }

    /// Stage and commit in one call: returns the entries of `listing` that
    /// were new, after durably recording them.
    pub fn filter_new(&mut self, listing: &Listing) -> Result<Listing> {
        let staged = self.stage(listing);
        let new = staged.new.clone();
        self.commit(staged)?;
        Ok(new)
    }

    /// Release the lock.  Every commit is already on disk.
    pub fn close(self) -> Result<()> {
        FileExt::unlock(&self.lock).map_err(|e| store_err("unlocking", &self.path, e))?;
        tracing::debug!(path = %self.path.display(), "identity store closed");
        Ok(())
    }
}

/// Replace `path` with a fresh document: write a temp file in the same
/// directory, fsync, then rename over the target.
fn write_atomic(path: &Path, ids: &BTreeSet<String>) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let doc = Document {
        post_ids: ids.clone(),
    };
    let json = serde_json::to_vec_pretty(&doc)?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| store_err("creating temp file for", path, e))?;
    tmp.write_all(&json)
        .and_then(|_| tmp.write_all(b"\n"))
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| store_err("writing", path, e))?;
    tmp.persist(path)
        .map_err(|e| store_err("replacing", path, e.error))?;
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

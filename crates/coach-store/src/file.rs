use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use coach_types::{AccountId, TransactionId};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::memory::{InMemoryAccountStore, StoreState};
use crate::record::{AccountRecord, Commit, JournalEntry, PurchaseRecord, Versioned};
use crate::traits::AccountStore;

/// Account store persisted as a single JSON snapshot.
///
/// Every mutation is applied to a copy of the state, the copy is written to
/// a temp file in the same directory and renamed over the snapshot, and only
/// then does it replace the live state. A crash mid-write leaves the previous
/// snapshot intact. Suited to single-node deployments with modest account
/// counts; each commit rewrites the whole file.
pub struct FileAccountStore {
    path: PathBuf,
    inner: InMemoryAccountStore,
}

impl FileAccountStore {
    /// Open the snapshot at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let state = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice::<StoreState>(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?
        } else {
            StoreState::default()
        };

        debug!(path = %path.display(), accounts = state.account_count(), "opened account snapshot");
        Ok(Self {
            path,
            inner: InMemoryAccountStore::from_state(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(path: &Path, state: &StoreState) -> StoreResult<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, state)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> StoreResult<R>) -> StoreResult<R> {
        self.inner.write(|state| {
            let mut next = state.clone();
            let result = f(&mut next)?;
            Self::persist(&self.path, &next)?;
            *state = next;
            Ok(result)
        })
    }
}

impl AccountStore for FileAccountStore {
    fn create(&self, id: &AccountId, record: AccountRecord) -> StoreResult<Versioned<AccountRecord>> {
        self.mutate(|state| state.create(id, record))
    }

    fn load(&self, id: &AccountId) -> StoreResult<Option<Versioned<AccountRecord>>> {
        self.inner.load(id)
    }

    fn commit(&self, commit: Commit) -> StoreResult<u64> {
        self.mutate(|state| state.apply_commit(commit))
    }

    fn purchase(&self, transaction: &TransactionId) -> StoreResult<Option<PurchaseRecord>> {
        self.inner.purchase(transaction)
    }

    fn journal(&self, id: &AccountId) -> StoreResult<Vec<JournalEntry>> {
        self.inner.journal(id)
    }

    fn account_ids(&self) -> StoreResult<Vec<AccountId>> {
        self.inner.account_ids()
    }
}

impl std::fmt::Debug for FileAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAccountStore")
            .field("path", &self.path)
            .field("account_count", &self.inner.len())
            .finish()
    }
}

//! Persistence of analysis results
//!
//! Stored datasets live in two sled trees. The `datasets` tree maps big-endian u64 identifiers
//! from [sled::Db::generate_id] to the JSON encoded [StoredDataset]. The `history` tree maps a
//! user prefix followed by the identifier to the JSON encoded [DatasetMeta], so one user's
//! history is a single prefix scan in upload order. Both trees are written in one transaction, so
//! readers never observe a partially written result. Listing or pruning a user's history never
//! decodes another user's records.

use crate::error::ChemvizError;
use crate::models::{AnalysisResult, DatasetMeta, StoredDataset};

use sled::transaction::{ConflictableTransactionResult, TransactionError, Transactional};
use std::path::Path;
use time::OffsetDateTime;
use tracing::{event, Level};

/// Name of the sled tree holding stored datasets.
const DATASETS_TREE: &str = "datasets";

/// Name of the sled tree indexing dataset metadata by user.
const HISTORY_TREE: &str = "history";

/// Storage capability required by the API.
pub trait DatasetStore: Send + Sync {
    /// Store an analysis result, allocating a new dataset identifier.
    ///
    /// # Arguments
    ///
    /// * `user`: User the upload is attributed to
    /// * `filename`: Name of the uploaded file
    /// * `file_size`: Size of the uploaded file in bytes
    /// * `result`: The analysis of the upload
    fn store(
        &self,
        user: &str,
        filename: &str,
        file_size: usize,
        result: AnalysisResult,
    ) -> Result<StoredDataset, ChemvizError>;

    /// Load a stored dataset.
    fn load(&self, id: u64) -> Result<Option<StoredDataset>, ChemvizError>;

    /// List a user's stored datasets, newest first.
    fn history(&self, user: &str) -> Result<Vec<DatasetMeta>, ChemvizError>;

    /// Delete a user's stored dataset.
    ///
    /// Returns whether a dataset was deleted. Datasets of other users are left alone.
    fn delete(&self, id: u64, user: &str) -> Result<bool, ChemvizError>;
}

/// Key prefix of a user's history entries.
///
/// The user name is length prefixed, so no user's prefix is a prefix of another's.
fn history_prefix(user: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + user.len() + 8);
    prefix.extend_from_slice(&(user.len() as u32).to_be_bytes());
    prefix.extend_from_slice(user.as_bytes());
    prefix
}

fn history_key(user: &str, id: u64) -> Vec<u8> {
    let mut key = history_prefix(user);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Dataset identifier at the end of a history key.
fn history_id(key: &[u8]) -> Option<u64> {
    let start = key.len().checked_sub(8)?;
    Some(u64::from_be_bytes(key[start..].try_into().ok()?))
}

fn storage_error(error: TransactionError<sled::Error>) -> ChemvizError {
    match error {
        TransactionError::Abort(error) | TransactionError::Storage(error) => error.into(),
    }
}

/// A [DatasetStore] backed by a sled database.
pub struct SledStore {
    db: sled::Db,
    datasets: sled::Tree,
    history: sled::Tree,
    /// Number of datasets kept per user
    history_limit: usize,
}

impl SledStore {
    /// Open or create a store at the given path.
    ///
    /// # Arguments
    ///
    /// * `path`: Path to the sled database directory
    /// * `history_limit`: Number of datasets kept per user
    pub fn open<P: AsRef<Path>>(path: P, history_limit: usize) -> Result<Self, sled::Error> {
        Self::from_db(sled::open(path)?, history_limit)
    }

    /// Create a store that is deleted when dropped.
    pub fn temporary(history_limit: usize) -> Result<Self, sled::Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, history_limit)
    }

    fn from_db(db: sled::Db, history_limit: usize) -> Result<Self, sled::Error> {
        let datasets = db.open_tree(DATASETS_TREE)?;
        let history = db.open_tree(HISTORY_TREE)?;
        Ok(Self {
            db,
            datasets,
            history,
            history_limit,
        })
    }

    /// Remove a dataset and its history entry together.
    fn remove(&self, id: u64, history_key: &[u8]) -> Result<(), ChemvizError> {
        (&self.datasets, &self.history)
            .transaction(|(datasets, history)| -> ConflictableTransactionResult<(), sled::Error> {
                datasets.remove(&id.to_be_bytes()[..])?;
                history.remove(history_key)?;
                Ok(())
            })
            .map_err(storage_error)
    }

    /// Delete a user's datasets beyond the history limit.
    ///
    /// Only history keys are read, so entries that fail to decode are pruned like any other.
    fn prune(&self, user: &str) -> Result<(), ChemvizError> {
        let expired: Vec<sled::IVec> = self
            .history
            .scan_prefix(history_prefix(user))
            .keys()
            .rev()
            .skip(self.history_limit)
            .collect::<Result<_, _>>()?;
        for key in expired {
            match history_id(&key) {
                Some(id) => {
                    self.remove(id, &key)?;
                    event!(Level::DEBUG, id, user, "pruned dataset");
                }
                None => {
                    self.history.remove(&key)?;
                    event!(Level::WARN, user, "pruned malformed history key");
                }
            }
        }
        Ok(())
    }
}

impl DatasetStore for SledStore {
    fn store(
        &self,
        user: &str,
        filename: &str,
        file_size: usize,
        result: AnalysisResult,
    ) -> Result<StoredDataset, ChemvizError> {
        let id = self.db.generate_id()?;
        let stored = StoredDataset {
            dataset: DatasetMeta {
                id,
                user: user.to_string(),
                filename: filename.to_string(),
                file_size,
                upload_date: OffsetDateTime::now_utc(),
                equipment_count: result.dataset_info.cleaned_rows,
            },
            analysis_results: result,
        };
        let value = serde_json::to_vec(&stored)?;
        let meta = serde_json::to_vec(&stored.dataset)?;
        let key = history_key(user, id);
        (&self.datasets, &self.history)
            .transaction(|(datasets, history)| -> ConflictableTransactionResult<(), sled::Error> {
                datasets.insert(&id.to_be_bytes()[..], &value[..])?;
                history.insert(&key[..], &meta[..])?;
                Ok(())
            })
            .map_err(storage_error)?;
        // The dataset is committed, so a pruning failure only delays cleanup.
        if let Err(error) = self.prune(user) {
            event!(Level::WARN, %error, user, "failed to prune dataset history");
        }
        Ok(stored)
    }

    fn load(&self, id: u64) -> Result<Option<StoredDataset>, ChemvizError> {
        match self.datasets.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn history(&self, user: &str) -> Result<Vec<DatasetMeta>, ChemvizError> {
        let mut history = Vec::new();
        for item in self.history.scan_prefix(history_prefix(user)).rev() {
            let (key, value) = item?;
            match serde_json::from_slice::<DatasetMeta>(&value) {
                Ok(meta) => history.push(meta),
                Err(error) => event!(
                    Level::WARN,
                    %error,
                    user,
                    id = history_id(&key),
                    "skipped undecodable history entry"
                ),
            }
        }
        Ok(history)
    }

    fn delete(&self, id: u64, user: &str) -> Result<bool, ChemvizError> {
        let key = history_key(user, id);
        if !self.history.contains_key(&key)? {
            return Ok(false);
        }
        self.remove(id, &key)?;
        Ok(true)
    }
}

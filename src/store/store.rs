//!
//! Documentation of the store module.
//! A keyed collection store backed by a single JSON document.
//!
//! Every collection is an ordered list of records (JSON objects) under an
//! entity name such as `"User"` or `"Ride"`. The store knows nothing about
//! rides or users beyond those names: the caller queries, patches and
//! deletes with field-equals filters, then calls [`EntityStore::persist`].
//!

use super::models::KNOWN_ENTITIES;
use super::store_utils::matches_filter;

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use log::{debug, error, info, trace, warn};

/// One stored entity, a JSON object keyed by field name
pub type Record = Map<String, Value>;

/// Errors raised while loading, persisting or converting records
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid {entity} record: {reason}")]
    InvalidRecord {
        entity: String,
        reason: String,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    /// Where the document lives, `None` keeps everything in memory
    path: Option<PathBuf>,
    entities: BTreeMap<String, Vec<Record>>,
}

impl EntityStore {
    /// A store that never touches the disk, `persist` is a no-op
    pub fn in_memory() -> Self {
        let mut store = EntityStore::default();
        store.reset();
        store
    }

    ///
    /// Opens the document at `path` and loads it
    ///
    /// # Arguments
    ///
    /// * `path` - The JSON document, it does not have to exist yet
    ///
    /// # Output
    ///
    /// * Err(_) - the file exists but could not be read or parsed
    /// * Ok(store) - loaded store, empty collections when the file is absent
    ///
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut store = EntityStore {
            path: Some(path.as_ref().to_path_buf()),
            entities: BTreeMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Empty every collection, keeping the known ones present
    fn reset(&mut self) {
        self.entities.clear();
        for name in KNOWN_ENTITIES {
            self.entities.insert(name.to_string(), vec![]);
        }
    }

    ///
    /// Hydrate the store from its document
    ///
    /// # Log
    ///
    /// * `info` - "Store loaded ...", indicating success
    /// * `warn` - "No store document ...", indicating a fresh start
    ///
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.reset();
        let path = match &self.path {
            None => return Ok(()),
            Some(value) => value.clone(),
        };

        let raw = match fs::read_to_string(&path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{}", format!("No store document at {}, starting empty", path.display()));
                return Ok(());
            },
            Err(e) => return Err(StoreError::io(&path, e)),
            Ok(value) => value,
        };

        let document: BTreeMap<String, Vec<Record>> = serde_json::from_str(&raw)?;
        for (name, records) in document {
            self.entities.insert(name, records);
        }

        info!("{}", format!("Store loaded from {} ({} collections)", path.display(), self.entities.len()));
        Ok(())
    }

    ///
    /// Write the whole document to disk
    ///
    /// The document goes to a sibling temp file first and is renamed over
    /// the target, so a failed write leaves the previous document intact.
    ///
    /// # Log
    ///
    /// * `error` - "Could not persist ...", indicating the write failed
    ///
    pub fn persist(&self) -> Result<(), StoreError> {
        let path = match &self.path {
            None => return Ok(()),
            Some(value) => value,
        };

        let body = serde_json::to_string_pretty(&self.entities)?;
        let tmp = path.with_extension("json.tmp");

        let written = fs::write(&tmp, body).and_then(|_| fs::rename(&tmp, path));
        if let Err(e) = written {
            error!("{}", format!("Could not persist store to {}: {}", path.display(), e));
            return Err(StoreError::io(path, e));
        }

        trace!("{}", format!("Store persisted to {}", path.display()));
        Ok(())
    }

    /// Every record of an entity, `None` for an unknown entity
    pub fn get(&self, entity: &str) -> Option<&[Record]> {
        self.entities.get(entity).map(|records| records.as_slice())
    }

    /// Records of an entity whose fields equal every pair of `filter`
    pub fn get_filtered(&self, entity: &str, filter: &Record) -> Vec<Record> {
        match self.entities.get(entity) {
            None => vec![],
            Some(records) => records
                .iter()
                .filter(|record| matches_filter(record, filter))
                .cloned()
                .collect(),
        }
    }

    /// Append a record, creating the collection if needed
    pub fn add(&mut self, entity: &str, record: Record) {
        debug!("{}", format!("Adding a {} record", entity));
        self.entities
            .entry(entity.to_string())
            .or_insert_with(Vec::new)
            .push(record);
    }

    ///
    /// Merge `patch` into every matching record
    ///
    /// # Output
    ///
    /// * the number of records patched
    ///
    pub fn update_filtered(&mut self, entity: &str, filter: &Record, patch: &Record) -> usize {
        let records = match self.entities.get_mut(entity) {
            None => return 0,
            Some(value) => value,
        };

        let mut count = 0;
        for record in records.iter_mut().filter(|record| matches_filter(record, filter)) {
            for (key, value) in patch {
                record.insert(key.clone(), value.clone());
            }
            count += 1;
        }
        count
    }

    /// Remove every matching record, returns how many went
    pub fn delete_filtered(&mut self, entity: &str, filter: &Record) -> usize {
        let records = match self.entities.get_mut(entity) {
            None => return 0,
            Some(value) => value,
        };

        let before = records.len();
        records.retain(|record| !matches_filter(record, filter));
        before - records.len()
    }
}

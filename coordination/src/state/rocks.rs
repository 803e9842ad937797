//! RocksDB-backed session store
//!
//! Provides persistent storage with column families for logical data separation.
//! Values are stored as JSON so the on-disk documents match the wire contract.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};

use super::schema::{self, keys, ALL_CFS};
use super::store::{SessionStore, SharedSessionStore, StoreError, StoreResult};
use super::types::{Session, SwipeRecord};
use crate::events::TurboEvent;

/// RocksDB-backed persistent session store
pub struct RocksStore {
    db: DB,
    /// Serializes read-check-write sequences so revision checks are atomic
    write_lock: Mutex<()>,
    path: PathBuf,
}

impl RocksStore {
    /// Open or create a store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
            path,
        })
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedSessionStore {
        Arc::new(self)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    fn cf(&self, cf_name: &str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> StoreResult<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key.as_bytes(), Self::encode(value)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List all values under a key prefix in a column family
    fn scan_prefix<T: DeserializeOwned>(&self, cf_name: &str, prefix: &str) -> StoreResult<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();

        for item in self.db.prefix_iterator_cf(cf, prefix.as_bytes()) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break; // Prefix no longer matches
            }
            values.push(Self::decode(&value)?);
        }

        Ok(values)
    }

    fn check_revision(&self, session: &Session, expected_revision: u64) -> StoreResult<()> {
        let key = keys::session(&session.id);
        let stored: Session = self
            .get(schema::CF_SESSIONS, &key)?
            .ok_or(StoreError::NotFound(key))?;
        if stored.revision != expected_revision {
            return Err(StoreError::Conflict {
                session_id: session.id.clone(),
                expected: expected_revision,
                found: stored.revision,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RocksStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let key = keys::session(&session.id);
        if self.get::<Session>(schema::CF_SESSIONS, &key)?.is_some() {
            return Err(StoreError::AlreadyExists(key));
        }
        self.put(schema::CF_SESSIONS, &key, session)
    }

    async fn load_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        self.get(schema::CF_SESSIONS, &keys::session(session_id))
    }

    async fn compare_and_swap(
        &self,
        session: &Session,
        expected_revision: u64,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.check_revision(session, expected_revision)?;
        self.put(schema::CF_SESSIONS, &keys::session(&session.id), session)
    }

    async fn commit_swipe(
        &self,
        session: &Session,
        expected_revision: u64,
        swipe: &SwipeRecord,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.check_revision(session, expected_revision)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(schema::CF_SWIPES)?,
            keys::swipe(&swipe.session_id, &swipe.participant_id, &swipe.activity_id),
            Self::encode(swipe)?,
        );
        batch.put_cf(
            self.cf(schema::CF_SESSIONS)?,
            keys::session(&session.id),
            Self::encode(session)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_swipe(
        &self,
        session_id: &str,
        participant_id: &str,
        activity_id: &str,
    ) -> StoreResult<Option<SwipeRecord>> {
        let key = keys::swipe(session_id, participant_id, activity_id);
        self.get(schema::CF_SWIPES, &key)
    }

    async fn list_swipes(&self, session_id: &str) -> StoreResult<Vec<SwipeRecord>> {
        self.scan_prefix(schema::CF_SWIPES, &keys::swipe_prefix(session_id))
    }

    async fn append_events(
        &self,
        session_id: &str,
        revision: u64,
        events: &[TurboEvent],
    ) -> StoreResult<()> {
        let cf = self.cf(schema::CF_EVENTS)?;
        let mut batch = WriteBatch::default();
        for (index, event) in events.iter().enumerate() {
            batch.put_cf(
                cf,
                keys::event(session_id, revision, index),
                Self::encode(event)?,
            );
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn session_events(&self, session_id: &str) -> StoreResult<Vec<TurboEvent>> {
        self.scan_prefix(schema::CF_EVENTS, &keys::event_prefix(session_id))
    }
}

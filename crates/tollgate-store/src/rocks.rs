//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
    WriteBatch,
};
use tollgate_core::UserId;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::User;
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes writers so index uniqueness checks and writes are atomic.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Resolve an index entry to the user ID it points at.
    fn lookup_index(&self, cf_name: &str, key: &[u8]) -> Result<Option<UserId>> {
        let cf = self.cf(cf_name)?;
        let value = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match value {
            Some(bytes) => keys::decode_user_id(&bytes)
                .map(Some)
                .ok_or_else(|| StoreError::Serialization(format!("corrupt index in {cf_name}"))),
            None => Ok(None),
        }
    }

    /// Fail if `key` in the given index belongs to a user other than `owner`.
    fn check_unique(
        &self,
        cf_name: &str,
        key: &[u8],
        owner: &UserId,
        conflict: fn() -> StoreError,
    ) -> Result<()> {
        match self.lookup_index(cf_name, key)? {
            Some(existing) if existing != *owner => Err(conflict()),
            _ => Ok(()),
        }
    }

    /// Overwrite `old` with `user`, moving index entries. Caller holds `write_lock`.
    fn replace_locked(&self, old: &User, user: &User) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;
        let cf_by_username = self.cf(cf::USERS_BY_USERNAME)?;

        let user_key = keys::user_key(&user.user_id);
        let email_key = keys::email_key(&user.email);
        let username_key = keys::username_key(&user.username);
        let value = Self::serialize(user)?;

        self.check_unique(cf::USERS_BY_EMAIL, &email_key, &user.user_id, || {
            StoreError::EmailTaken
        })?;
        self.check_unique(cf::USERS_BY_USERNAME, &username_key, &user.user_id, || {
            StoreError::UsernameTaken
        })?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, &user_key, &value);

        // Move index entries if the indexed values changed
        let old_email_key = keys::email_key(&old.email);
        if old_email_key != email_key {
            batch.delete_cf(&cf_by_email, &old_email_key);
        }
        batch.put_cf(&cf_by_email, &email_key, &user_key);

        let old_username_key = keys::username_key(&old.username);
        if old_username_key != username_key {
            batch.delete_cf(&cf_by_username, &old_username_key);
        }
        batch.put_cf(&cf_by_username, &username_key, &user_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    fn insert_user(&self, user: &User) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;
        let cf_by_username = self.cf(cf::USERS_BY_USERNAME)?;

        let user_key = keys::user_key(&user.user_id);
        let email_key = keys::email_key(&user.email);
        let username_key = keys::username_key(&user.username);
        let value = Self::serialize(user)?;

        let _guard = self.write_lock.lock();

        if self.lookup_index(cf::USERS_BY_EMAIL, &email_key)?.is_some() {
            return Err(StoreError::EmailTaken);
        }
        if self
            .lookup_index(cf::USERS_BY_USERNAME, &username_key)?
            .is_some()
        {
            return Err(StoreError::UsernameTaken);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, &user_key, &value);
        batch.put_cf(&cf_by_email, &email_key, &user_key);
        batch.put_cf(&cf_by_username, &username_key, &user_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn put_user(&self, user: &User) -> Result<()> {
        let _guard = self.write_lock.lock();

        let old = self.get_user(&user.user_id)?.ok_or(StoreError::NotFound)?;
        self.replace_locked(&old, user)
    }

    fn update_user<F, E>(&self, user_id: &UserId, apply: F) -> std::result::Result<User, E>
    where
        F: FnOnce(&mut User) -> std::result::Result<(), E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock();

        let old = self.get_user(user_id)?.ok_or(StoreError::NotFound)?;
        let mut user = old.clone();
        apply(&mut user)?;

        self.replace_locked(&old, &user)?;
        Ok(user)
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.lookup_index(cf::USERS_BY_EMAIL, &keys::email_key(email))? {
            Some(user_id) => self.get_user(&user_id),
            None => Ok(None),
        }
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.lookup_index(cf::USERS_BY_USERNAME, &keys::username_key(username))? {
            Some(user_id) => self.get_user(&user_id),
            None => Ok(None),
        }
    }

    fn delete_user(&self, user_id: &UserId) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;
        let cf_by_username = self.cf(cf::USERS_BY_USERNAME)?;

        let _guard = self.write_lock.lock();

        let user = self.get_user(user_id)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_users, keys::user_key(user_id));
        batch.delete_cf(&cf_by_email, keys::email_key(&user.email));
        batch.delete_cf(&cf_by_username, keys::username_key(&user.username));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

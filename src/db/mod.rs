use std::path::Path;

use anyhow::{Context, Result};
use rocksdb::{Direction, IteratorMode, Options, TransactionDB, TransactionDBOptions};
use serde::{de::DeserializeOwned, Serialize};

use crate::model::{device::Device, objection::Objection, rfi::Rfi, user::User};

/// How [`DBLayer::update_active_device`] should change the user's devices.
#[derive(Debug)]
pub enum ActiveDeviceWrite {
    Keep,
    /// Store the row and point the user's active device at it.
    Activate(Device),
    /// Like `Activate`, and every other active row is deactivated with the reason.
    Replace(Device, &'static str),
}

pub struct DBLayer {
    db: TransactionDB,
}

impl DBLayer {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = TransactionDB::open(&opts, &TransactionDBOptions::default(), path)
            .with_context(|| format!("failed to open rocksdb at {}", path.display()))?;
        Ok(Self { db })
    }

    // ============================================================
    // KEYS
    // ============================================================
    fn user_key(user_id: &str) -> String {
        format!("user:{user_id}")
    }

    fn user_email_key(email: &str) -> String {
        format!("user_email:{}", email.trim().to_lowercase())
    }

    fn device_prefix(user_id: &str) -> String {
        format!("device:{user_id}:")
    }

    fn device_key(user_id: &str, record_id: &str) -> String {
        format!("{}{record_id}", Self::device_prefix(user_id))
    }

    // One pointer per user: this key is what keeps a single active device.
    fn active_device_key(user_id: &str) -> String {
        format!("active_device:{user_id}")
    }

    fn rfi_key(rfi_id: &str) -> String {
        format!("rfi:{rfi_id}")
    }

    fn rfi_number_key(number: &str) -> String {
        format!("rfi_number:{}", number.trim().to_uppercase())
    }

    fn objection_key(objection_id: &str) -> String {
        format!("objection:{objection_id}")
    }

    // ============================================================
    // HELPERS
    // ============================================================
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.db
            .get(key)?
            .map(|v| serde_json::from_slice(&v).with_context(|| format!("corrupt record at {key}")))
            .transpose()
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.db.put(key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();

        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = std::str::from_utf8(&key)?;
            if !k.starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(&val)?);
        }

        Ok(out)
    }

    // Claims `index_key` and writes the record in one transaction. The index key stays
    // locked from the check until commit, so a concurrent insert waits and then sees it.
    fn insert_unique<T: Serialize>(
        &self,
        index_key: &str,
        record_key: &str,
        id: &str,
        value: &T,
    ) -> Result<bool> {
        let txn = self.db.transaction();
        if txn.get_for_update(index_key, true)?.is_some() {
            txn.rollback()?;
            return Ok(false);
        }
        txn.put(record_key, serde_json::to_vec(value)?)?;
        txn.put(index_key, id.as_bytes())?;
        txn.commit()?;
        Ok(true)
    }

    // ============================================================
    // USER STORAGE
    // ============================================================

    /// Insert a new user; `false` when the email is already registered.
    pub async fn insert_user(&self, user: &User) -> Result<bool> {
        self.insert_unique(
            &Self::user_email_key(&user.email),
            &Self::user_key(&user.id),
            &user.id,
            user,
        )
    }

    pub async fn save_user(&self, user: &User) -> Result<()> {
        self.put_json(&Self::user_key(&user.id), user)
    }

    pub async fn load_user(&self, id: &str) -> Result<Option<User>> {
        self.get_json(&Self::user_key(id))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(user_id) = self.db.get(Self::user_email_key(email))? else {
            return Ok(None);
        };
        let user_id = String::from_utf8(user_id)?;
        self.load_user(&user_id).await
    }

    // ============================================================
    // DEVICE STORAGE
    // ============================================================
    pub async fn load_device(&self, user_id: &str, record_id: &str) -> Result<Option<Device>> {
        self.get_json(&Self::device_key(user_id, record_id))
    }

    pub async fn list_devices_for_user(&self, user_id: &str) -> Result<Vec<Device>> {
        self.devices_for_user(user_id)
    }

    fn devices_for_user(&self, user_id: &str) -> Result<Vec<Device>> {
        let mut devices: Vec<Device> = self.scan_prefix(&Self::device_prefix(user_id))?;
        devices.sort_by(|a, b| b.last_seen_ts.cmp(&a.last_seen_ts));
        Ok(devices)
    }

    /// The device the active pointer refers to, if that row is still active.
    pub async fn active_device(&self, user_id: &str) -> Result<Option<Device>> {
        let Some(record_id) = self.db.get(Self::active_device_key(user_id))? else {
            return Ok(None);
        };
        let record_id = String::from_utf8(record_id)?;
        Ok(self
            .load_device(user_id, &record_id)
            .await?
            .filter(|d| d.is_active))
    }

    /// Compare-and-set on the user's active device.
    ///
    /// `decide` sees the active device and all of the user's rows (most recent first)
    /// while the active pointer is locked; its write is applied in the same
    /// transaction. Every device write takes this lock, so two logins for one user
    /// are decided one after the other.
    pub async fn update_active_device<R>(
        &self,
        user_id: &str,
        decide: impl FnOnce(Option<&Device>, &[Device]) -> (ActiveDeviceWrite, R),
    ) -> Result<R> {
        let pointer_key = Self::active_device_key(user_id);
        let txn = self.db.transaction();
        let pointer = txn
            .get_for_update(&pointer_key, true)?
            .map(String::from_utf8)
            .transpose()?;

        let devices = self.devices_for_user(user_id)?;
        let active = pointer
            .as_deref()
            .and_then(|id| devices.iter().find(|d| d.id == id && d.is_active));
        let (write, out) = decide(active, &devices);

        let (device, replace_reason) = match write {
            ActiveDeviceWrite::Keep => {
                txn.rollback()?;
                return Ok(out);
            }
            ActiveDeviceWrite::Activate(device) => (device, None),
            ActiveDeviceWrite::Replace(device, reason) => (device, Some(reason)),
        };

        if let Some(reason) = replace_reason {
            for mut other in devices
                .into_iter()
                .filter(|d| d.is_active && d.id != device.id)
            {
                other.deactivate(reason);
                txn.put(Self::device_key(user_id, &other.id), serde_json::to_vec(&other)?)?;
            }
        }
        txn.put(Self::device_key(user_id, &device.id), serde_json::to_vec(&device)?)?;
        txn.put(&pointer_key, device.id.as_bytes())?;
        txn.commit()?;
        Ok(out)
    }

    /// Deactivate the user's active rows, or only `record_id` when given, under the
    /// active pointer lock. The pointer is dropped if it referred to one of them.
    /// Returns the rows that changed.
    pub async fn deactivate_devices(
        &self,
        user_id: &str,
        record_id: Option<&str>,
        reason: &str,
    ) -> Result<Vec<Device>> {
        let pointer_key = Self::active_device_key(user_id);
        let txn = self.db.transaction();
        let pointer = txn
            .get_for_update(&pointer_key, true)?
            .map(String::from_utf8)
            .transpose()?;

        let mut changed = Vec::new();
        for mut device in self.devices_for_user(user_id)? {
            if !device.is_active || record_id.is_some_and(|id| id != device.id) {
                continue;
            }
            device.deactivate(reason);
            txn.put(Self::device_key(user_id, &device.id), serde_json::to_vec(&device)?)?;
            if pointer.as_deref() == Some(device.id.as_str()) {
                txn.delete(&pointer_key)?;
            }
            changed.push(device);
        }
        txn.commit()?;
        Ok(changed)
    }

    // ============================================================
    // RFI STORAGE
    // ============================================================

    /// Insert a new RFI; `false` when the number is already taken.
    pub async fn insert_rfi(&self, rfi: &Rfi) -> Result<bool> {
        self.insert_unique(
            &Self::rfi_number_key(&rfi.number),
            &Self::rfi_key(&rfi.id),
            &rfi.id,
            rfi,
        )
    }

    pub async fn load_rfi(&self, id: &str) -> Result<Option<Rfi>> {
        self.get_json(&Self::rfi_key(id))
    }

    pub async fn list_rfis(&self) -> Result<Vec<Rfi>> {
        let mut rfis: Vec<Rfi> = self.scan_prefix("rfi:")?;
        rfis.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rfis)
    }

    // ============================================================
    // OBJECTION STORAGE
    // ============================================================
    pub async fn save_objection(&self, objection: &Objection) -> Result<()> {
        self.put_json(&Self::objection_key(&objection.id), objection)
    }

    pub async fn load_objection(&self, id: &str) -> Result<Option<Objection>> {
        self.get_json(&Self::objection_key(id))
    }

    pub async fn list_objections(&self) -> Result<Vec<Objection>> {
        let mut objections: Vec<Objection> = self.scan_prefix("objection:")?;
        objections.sort_by_key(|o| o.created_ts);
        Ok(objections)
    }
}

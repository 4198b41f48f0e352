//! Medicine record persistence.
//!
//! `MedicineStore` is the seam between the projector and wherever records
//! live. Two implementations are provided:
//! - `MemoryStore` keeps records in-process (tests, embedding)
//! - `JsonFileStore` keeps them in a JSON file with file locking, so that
//!   each load-modify-save cycle is atomic with respect to other processes

use crate::projector;
use crate::{
    DecayUpdate, Error, MedicineId, MedicineRecord, MedicineUpdate, NewMedicine, Result,
};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Read and write access to medicine records
pub trait MedicineStore {
    /// All records, in insertion order
    fn list(&self) -> Result<Vec<MedicineRecord>>;

    fn get(&self, id: MedicineId) -> Result<Option<MedicineRecord>>;

    fn find_by_name(&self, generic_name: &str) -> Result<Option<MedicineRecord>>;

    /// Insert a new record observed on `today`
    ///
    /// Fails with `DuplicateKey` if the generic name is taken.
    fn insert(&mut self, medicine: NewMedicine, today: NaiveDate) -> Result<MedicineRecord>;

    /// Apply a partial update and stamp the record as observed on `today`
    ///
    /// Decay pending since the last observation is folded in before the
    /// fields are applied. A rejected update writes nothing.
    fn update(
        &mut self,
        id: MedicineId,
        update: MedicineUpdate,
        today: NaiveDate,
    ) -> Result<MedicineRecord>;

    /// Commit a projector decay; returns whether the record changed
    fn apply_decay(&mut self, id: MedicineId, decay: &DecayUpdate) -> Result<bool>;

    fn delete_by_name(&mut self, generic_name: &str) -> Result<MedicineRecord>;
}

// ============================================================================
// Record set (shared mutation rules)
// ============================================================================

/// On-disk document and in-memory collection of records
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub medicines: Vec<MedicineRecord>,
}

impl RecordSet {
    fn position(&self, id: MedicineId) -> Option<usize> {
        self.medicines.iter().position(|m| m.id == id)
    }

    fn by_name(&self, generic_name: &str) -> Option<&MedicineRecord> {
        let name = generic_name.trim();
        self.medicines.iter().find(|m| m.generic_name == name)
    }

    fn insert(&mut self, medicine: NewMedicine, today: NaiveDate) -> Result<MedicineRecord> {
        let record = medicine.into_record(today)?;
        if self.by_name(&record.generic_name).is_some() {
            return Err(Error::DuplicateKey {
                name: record.generic_name,
            });
        }
        self.medicines.push(record.clone());
        tracing::info!("Added medicine {} ({})", record.generic_name, record.id);
        Ok(record)
    }

    fn update(
        &mut self,
        id: MedicineId,
        update: MedicineUpdate,
        today: NaiveDate,
    ) -> Result<MedicineRecord> {
        let idx = self
            .position(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let Some(name) = update.new_name()? {
            if self.by_name(&name).is_some_and(|other| other.id != id) {
                return Err(Error::DuplicateKey { name });
            }
        }

        let mut record = self.medicines[idx].clone();
        if let Some(decay) = projector::propose_decay(&record, today) {
            decay.apply(&mut record);
        }
        update.apply(&mut record)?;
        record.last_updated = Some(record.last_updated.map_or(today, |d| d.max(today)));
        self.medicines[idx] = record.clone();

        tracing::info!("Updated medicine {} ({})", record.generic_name, record.id);
        Ok(record)
    }

    fn apply_decay(&mut self, id: MedicineId, decay: &DecayUpdate) -> Result<bool> {
        let record = self
            .medicines
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let applied = decay.apply(record);
        if applied {
            tracing::debug!(
                "Committed decay for {}: {} doses, {} days as of {}",
                record.generic_name,
                record.doses_left,
                record.intended_duration_days,
                decay.last_updated
            );
        }
        Ok(applied)
    }

    fn delete_by_name(&mut self, generic_name: &str) -> Result<MedicineRecord> {
        let name = generic_name.trim();
        let idx = self
            .medicines
            .iter()
            .position(|m| m.generic_name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let removed = self.medicines.remove(idx);
        tracing::info!("Deleted medicine {} ({})", removed.generic_name, removed.id);
        Ok(removed)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Records held in process memory
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: RecordSet,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MedicineStore for MemoryStore {
    fn list(&self) -> Result<Vec<MedicineRecord>> {
        Ok(self.records.medicines.clone())
    }

    fn get(&self, id: MedicineId) -> Result<Option<MedicineRecord>> {
        Ok(self.records.medicines.iter().find(|m| m.id == id).cloned())
    }

    fn find_by_name(&self, generic_name: &str) -> Result<Option<MedicineRecord>> {
        Ok(self.records.by_name(generic_name).cloned())
    }

    fn insert(&mut self, medicine: NewMedicine, today: NaiveDate) -> Result<MedicineRecord> {
        self.records.insert(medicine, today)
    }

    fn update(
        &mut self,
        id: MedicineId,
        update: MedicineUpdate,
        today: NaiveDate,
    ) -> Result<MedicineRecord> {
        self.records.update(id, update, today)
    }

    fn apply_decay(&mut self, id: MedicineId, decay: &DecayUpdate) -> Result<bool> {
        self.records.apply_decay(id, decay)
    }

    fn delete_by_name(&mut self, generic_name: &str) -> Result<MedicineRecord> {
        self.records.delete_by_name(generic_name)
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Records persisted as a single JSON document
///
/// Readers take a shared lock and writers an exclusive lock on a sidecar
/// `.lock` file; the document itself is replaced by atomic rename.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Load the document; a missing file is an empty inventory
    ///
    /// A corrupted file is an error rather than an empty inventory, since
    /// this file is the only copy of the user's records.
    fn read_unlocked(&self) -> Result<RecordSet> {
        if !self.path.exists() {
            tracing::debug!("No inventory file at {:?}, starting empty", self.path);
            return Ok(RecordSet::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(RecordSet::default());
        }

        let records: RecordSet = serde_json::from_str(&contents).map_err(|e| {
            tracing::error!("Failed to parse inventory file {:?}: {}", self.path, e);
            e
        })?;
        tracing::debug!(
            "Loaded {} medicines from {:?}",
            records.medicines.len(),
            self.path
        );
        Ok(records)
    }

    /// Atomically replace the document (temp file, fsync, rename)
    fn write_unlocked(&self, records: &RecordSet) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "inventory path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved {} medicines to {:?}",
            records.medicines.len(),
            self.path
        );
        Ok(())
    }

    /// Load under a shared lock
    pub fn load(&self) -> Result<RecordSet> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let result = self.read_unlocked();
        let unlocked = lock.unlock();
        let records = result?;
        unlocked?;
        Ok(records)
    }

    /// Load, modify, and save back under one exclusive lock
    ///
    /// Nothing is written if `f` fails or leaves the records unchanged.
    pub fn modify<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut RecordSet) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;
        let result = self.read_unlocked().and_then(|mut records| {
            let before = records.clone();
            let value = f(&mut records)?;
            if records == before {
                tracing::debug!("No changes to {:?}, skipping save", self.path);
            } else {
                self.write_unlocked(&records)?;
            }
            Ok(value)
        });
        // An error from `f` takes precedence over a failed unlock
        let unlocked = lock.unlock();
        let value = result?;
        unlocked?;
        Ok(value)
    }
}

impl MedicineStore for JsonFileStore {
    fn list(&self) -> Result<Vec<MedicineRecord>> {
        Ok(self.load()?.medicines)
    }

    fn get(&self, id: MedicineId) -> Result<Option<MedicineRecord>> {
        Ok(self.load()?.medicines.into_iter().find(|m| m.id == id))
    }

    fn find_by_name(&self, generic_name: &str) -> Result<Option<MedicineRecord>> {
        Ok(self.load()?.by_name(generic_name).cloned())
    }

    fn insert(&mut self, medicine: NewMedicine, today: NaiveDate) -> Result<MedicineRecord> {
        self.modify(|records| records.insert(medicine, today))
    }

    fn update(
        &mut self,
        id: MedicineId,
        update: MedicineUpdate,
        today: NaiveDate,
    ) -> Result<MedicineRecord> {
        self.modify(|records| records.update(id, update, today))
    }

    fn apply_decay(&mut self, id: MedicineId, decay: &DecayUpdate) -> Result<bool> {
        self.modify(|records| records.apply_decay(id, decay))
    }

    fn delete_by_name(&mut self, generic_name: &str) -> Result<MedicineRecord> {
        self.modify(|records| records.delete_by_name(generic_name))
    }
}

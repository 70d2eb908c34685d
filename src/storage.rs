//! rocksdb-backed storage adapter.
//!
//! Three column families:
//! - `records` -- flat byte records under the wire-format key layout
//!   (`metadata`, `deadqueue`, and the per-block `manifest:`/`contents:`/
//!   `links:` keys);
//! - `values` and `machines` -- content-addressed subobject stores with
//!   reference semantics. Each entry is `refcount (u64 LE) || payload`;
//!   a put inserts at refcount 1 or increments, a delete decrements and
//!   removes the key at zero.
//!
//! Single-key writes are atomic (rocksdb guarantee); multi-key sequences are
//! not, and the callers in `index`/`gc` order their writes so a crash in the
//! middle leaves a state the recovery paths tolerate.

use std::path::Path;

use parking_lot::Mutex;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

use crate::block_id::Hash;
use crate::error::{Result, StoreError};
use crate::machine::Machine;
use crate::value::Value;

const CF_RECORDS: &str = "records";
const CF_VALUES: &str = "values";
const CF_MACHINES: &str = "machines";

pub struct CheckpointStorage {
    db: DB,
    initial_machine: Machine,
    /// Serializes read-modify-write cycles on the dead queue, which is the
    /// one record both the reconciler (caller task) and GC (writer task)
    /// rewrite.
    pub(crate) dead_queue_lock: Mutex<()>,
}

impl CheckpointStorage {
    /// Open (or create) the database at `db_path` and bootstrap the initial
    /// machine from `code_file_path`. Either failing is fatal to
    /// construction.
    pub fn open(db_path: &Path, code_file_path: &Path) -> Result<Self> {
        let initial_machine = Machine::from_code_file(code_file_path).map_err(|e| {
            StoreError::Init(format!("code file {}: {e}", code_file_path.display()))
        })?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_RECORDS, Options::default()),
            ColumnFamilyDescriptor::new(CF_VALUES, Options::default()),
            ColumnFamilyDescriptor::new(CF_MACHINES, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&db_opts, db_path, cfs).map_err(|e| {
            StoreError::Init(format!("open rocksdb at {}: {e}", db_path.display()))
        })?;

        Ok(Self { db, initial_machine, dead_queue_lock: Mutex::new(()) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Internal(format!("cf:{name} missing")))
    }

    // ── records ──────────────────────────────────────────────────────────

    pub fn get_bytes(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get_cf(self.cf(CF_RECORDS)?, key)?)
    }

    pub fn put_bytes(&self, key: &[u8], bytes: &[u8]) -> Result<()> {
        self.db.put_cf(self.cf(CF_RECORDS)?, key, bytes)?;
        Ok(())
    }

    pub fn delete_bytes(&self, key: &[u8]) -> Result<()> {
        self.db.delete_cf(self.cf(CF_RECORDS)?, key)?;
        Ok(())
    }

    // ── refcounted subobjects ────────────────────────────────────────────

    fn bump(&self, cf_name: &str, key: &Hash, payload: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(mut entry) => {
                let count = refcount_of(&entry)?;
                entry[..8].copy_from_slice(&(count + 1).to_le_bytes());
                self.db.put_cf(cf, key, entry)?;
            }
            None => {
                let mut entry = Vec::with_capacity(8 + payload.len());
                entry.extend_from_slice(&1u64.to_le_bytes());
                entry.extend_from_slice(payload);
                self.db.put_cf(cf, key, entry)?;
            }
        }
        Ok(())
    }

    fn unbump(&self, cf_name: &str, key: &Hash) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let Some(mut entry) = self.db.get_cf(cf, key)? else {
            // already reclaimed; GC replays of a crashed tick land here
            return Ok(());
        };
        let count = refcount_of(&entry)?;
        if count <= 1 {
            self.db.delete_cf(cf, key)?;
        } else {
            entry[..8].copy_from_slice(&(count - 1).to_le_bytes());
            self.db.put_cf(cf, key, entry)?;
        }
        Ok(())
    }

    fn read_payload(&self, cf_name: &str, key: &Hash) -> Result<Option<Vec<u8>>> {
        match self.db.get_cf(self.cf(cf_name)?, key)? {
            Some(entry) => {
                refcount_of(&entry)?;
                Ok(Some(entry[8..].to_vec()))
            }
            None => Ok(None),
        }
    }

    pub fn put_value(&self, value: &Value) -> Result<Hash> {
        let hash = value.hash();
        self.bump(CF_VALUES, &hash, value.as_bytes())?;
        Ok(hash)
    }

    pub fn get_value(&self, hash: &Hash) -> Result<Option<Value>> {
        Ok(self.read_payload(CF_VALUES, hash)?.map(Value::from_bytes))
    }

    pub fn delete_value(&self, hash: &Hash) -> Result<()> {
        self.unbump(CF_VALUES, hash)
    }

    pub fn put_machine(&self, machine: &Machine) -> Result<Hash> {
        let hash = machine.hash();
        self.bump(CF_MACHINES, &hash, machine.as_bytes())?;
        Ok(hash)
    }

    pub fn get_machine(&self, hash: &Hash) -> Result<Option<Machine>> {
        Ok(self.read_payload(CF_MACHINES, hash)?.map(Machine::from_bytes))
    }

    pub fn delete_machine(&self, hash: &Hash) -> Result<()> {
        self.unbump(CF_MACHINES, hash)
    }

    /// Pristine machine rebuilt from the configured code file. The database
    /// itself closes when this adapter drops.
    pub fn initial_machine(&self) -> Machine {
        self.initial_machine.clone()
    }
}

fn refcount_of(entry: &[u8]) -> Result<u64> {
    let head: [u8; 8] = entry
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| StoreError::Internal("short subobject entry".into()))?;
    Ok(u64::from_le_bytes(head))
}

#[cfg(test)]
pub(crate) mod testutil {
    use tempfile::TempDir;

    use super::CheckpointStorage;

    /// Fresh on-disk storage rooted in a temp dir, with a throwaway code
    /// file for the initial machine.
    pub(crate) fn temp_storage() -> (CheckpointStorage, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let code = dir.path().join("machine.code");
        std::fs::write(&code, b"\x00demo machine code\x01").expect("write code file");
        let st = CheckpointStorage::open(&dir.path().join("db"), &code).expect("open storage");
        (st, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::temp_storage;
    use crate::value::Value;

    #[test]
    fn record_put_get_delete() {
        let (st, _dir) = temp_storage();
        assert_eq!(st.get_bytes(b"metadata").expect("get"), None);
        st.put_bytes(b"metadata", b"payload").expect("put");
        assert_eq!(st.get_bytes(b"metadata").expect("get"), Some(b"payload".to_vec()));
        st.delete_bytes(b"metadata").expect("delete");
        assert_eq!(st.get_bytes(b"metadata").expect("get"), None);
    }

    #[test]
    fn value_refcounts_survive_one_delete() {
        let (st, _dir) = temp_storage();
        let value = Value::from_bytes(b"shared".to_vec());
        let hash = st.put_value(&value).expect("first put");
        assert_eq!(st.put_value(&value).expect("second put"), hash);

        st.delete_value(&hash).expect("first delete");
        assert_eq!(st.get_value(&hash).expect("get"), Some(value));

        st.delete_value(&hash).expect("second delete");
        assert_eq!(st.get_value(&hash).expect("get"), None);
    }

    #[test]
    fn deleting_a_missing_value_is_a_noop() {
        let (st, _dir) = temp_storage();
        st.delete_value(&[7u8; 32]).expect("idempotent delete");
    }

    #[test]
    fn machine_roundtrip_and_initial_machine() {
        let (st, _dir) = temp_storage();
        let machine = st.initial_machine();
        assert!(!machine.as_bytes().is_empty());

        let hash = st.put_machine(&machine).expect("put machine");
        assert_eq!(machine.hash(), hash);
        assert_eq!(st.get_machine(&hash).expect("get"), Some(machine));
    }
}

//! Construction-time configuration for a checkpoint store.

use std::path::PathBuf;

use crate::address::Address;

/// Base directory for stores opened without an explicit `database_path`.
pub const DB_PATH_BASE: &str = "./data/checkpoints";

#[derive(Clone, Debug)]
pub struct CheckpointerCfg {
    /// Rollup this store belongs to; keys the default database directory.
    pub rollup_address: Address,
    /// Executable code file that bootstraps the initial machine.
    pub code_file_path: PathBuf,
    /// Explicit store directory; empty means derive it from the address.
    pub database_path: PathBuf,
    /// Advisory reorg horizon for `trim_before` callers; the store itself
    /// does not enforce it.
    pub max_reorg_depth: u64,
    /// Remove any existing store directory before opening. Intended for
    /// tests only; acted on exactly once, at construction.
    pub force_fresh_start: bool,
}

impl Default for CheckpointerCfg {
    fn default() -> Self {
        Self {
            rollup_address: Address::default(),
            code_file_path: PathBuf::new(),
            database_path: PathBuf::new(),
            max_reorg_depth: 100,
            force_fresh_start: false,
        }
    }
}

impl CheckpointerCfg {
    /// Resolved store directory for this config.
    pub fn db_path(&self) -> PathBuf {
        if self.database_path.as_os_str().is_empty() {
            default_db_path(&self.rollup_address)
        } else {
            self.database_path.clone()
        }
    }
}

/// `<base>/<rollup address, lowercase hex, no 0x prefix>`
pub fn default_db_path(addr: &Address) -> PathBuf {
    PathBuf::from(DB_PATH_BASE).join(addr.to_hex())
}

//! Marshalling contexts for the save and restore paths.

use crate::block_id::Hash;
use crate::error::{Result, StoreError};
use crate::machine::Machine;
use crate::storage::CheckpointStorage;
use crate::value::Value;
use crate::wire::Manifest;

/// Collects the values and machine states a checkpoint's contents refer to.
///
/// The caller builds one of these while serializing its state: every
/// subobject registered here is written to the content-addressed stores when
/// the save commits, and the resulting [`Manifest`] is what GC later walks
/// to reclaim them.
#[derive(Debug, Default)]
pub struct CheckpointContext {
    values: Vec<Value>,
    machines: Vec<Machine>,
}

impl CheckpointContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value dependency; returns its content hash so the caller can
    /// embed the reference in its contents blob.
    pub fn add_value(&mut self, value: Value) -> Hash {
        let hash = value.hash();
        self.values.push(value);
        hash
    }

    /// Record a machine-state dependency; returns its content hash.
    pub fn add_machine(&mut self, machine: Machine) -> Hash {
        let hash = machine.hash();
        self.machines.push(machine);
        hash
    }

    /// Manifest naming every recorded dependency, in insertion order.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            value_hashes: self.values.iter().map(Value::hash).collect(),
            machine_hashes: self.machines.iter().map(Machine::hash).collect(),
        }
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn machines(&self) -> &[Machine] {
        &self.machines
    }
}

/// Capability handed to the restore callback: resolves the hashes in a
/// checkpoint's manifest against the store the checkpoint was read from.
pub struct RestoreContext<'a> {
    st: &'a CheckpointStorage,
}

impl<'a> RestoreContext<'a> {
    pub(crate) fn new(st: &'a CheckpointStorage) -> Self {
        Self { st }
    }

    pub fn value(&self, hash: &Hash) -> Result<Value> {
        self.st.get_value(hash)?.ok_or(StoreError::NotFound)
    }

    pub fn machine(&self, hash: &Hash) -> Result<Machine> {
        self.st.get_machine(hash)?.ok_or(StoreError::NotFound)
    }
}

//! Block identifiers.

/// 32-byte tag: block header hashes and the content addresses of values and
/// machine states.
pub type Hash = [u8; 32];

/// Names one chain block: height plus header hash.
///
/// Two ids are equal iff both fields match. Where the store orders ids it
/// compares **heights only** -- callers must not rely on any ordering
/// between two ids at the same height.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct BlockId {
    pub height: u64,
    pub header_hash: Hash,
}

impl BlockId {
    #[inline]
    pub fn new(height: u64, header_hash: Hash) -> Self {
        Self { height, header_hash }
    }
}

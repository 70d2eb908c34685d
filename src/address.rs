//! Rollup contract address.
//!
//! An address is **exactly 20 bytes**. The store uses it for one thing:
//! deriving the default on-disk database directory for a rollup when no
//! explicit path is configured (lowercase hex, no `0x` prefix).

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Construct from a 20-byte array (canonical form).
    #[inline]
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Address(b)
    }

    /// Borrow the underlying 20-byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex rendering without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Address {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

//! On-disk wire format for checkpoint records, and the key layout they are
//! stored under.
//!
//! Every record is a flat sequence of fields, each encoded as
//! `tag (1 byte) || len (u32 LE) || payload`. Encoders emit fields in
//! ascending tag order, repeated fields once per element in order, so the
//! same record always produces the same bytes across processes and
//! versions. Decoders skip tags they do not know, which keeps readers on an
//! older `format_version` working against records written mid-upgrade by a
//! newer one.
//!
//! Key layout: the singletons `metadata` and `deadqueue`, plus three
//! per-block records `manifest:`, `contents:` and `links:`, each suffixed
//! with the canonical [`BlockId`] encoding.

use thiserror::Error;

use crate::block_id::{BlockId, Hash};

/// Current metadata format version.
pub const FORMAT_VERSION: u32 = 1;

/// Singleton key for the store-wide [`Metadata`] record.
pub const KEY_METADATA: &[u8] = b"metadata";
/// Singleton key for the persisted [`DeadQueue`].
pub const KEY_DEAD_QUEUE: &[u8] = b"deadqueue";

const PREFIX_MANIFEST: &[u8] = b"manifest:";
const PREFIX_CONTENTS: &[u8] = b"contents:";
const PREFIX_LINKS: &[u8] = b"links:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated record")]
    Truncated,
    #[error("field {0}: bad payload length")]
    BadField(u8),
    #[error("missing required field {0}")]
    MissingField(u8),
}

fn put_field(out: &mut Vec<u8>, tag: u8, payload: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

/// Iterates `(tag, payload)` pairs off a record buffer.
struct Fields<'a> {
    buf: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<(u8, &'a [u8]), CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() < 5 {
            self.buf = &[];
            return Some(Err(CodecError::Truncated));
        }
        let tag = self.buf[0];
        let len = u32::from_le_bytes(self.buf[1..5].try_into().unwrap()) as usize;
        if self.buf.len() < 5 + len {
            self.buf = &[];
            return Some(Err(CodecError::Truncated));
        }
        let payload = &self.buf[5..5 + len];
        self.buf = &self.buf[5 + len..];
        Some(Ok((tag, payload)))
    }
}

/// Minimal little-endian bytes of a big-unsigned height; empty for zero.
fn height_bytes(mut h: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    while h != 0 {
        out.push(h as u8);
        h >>= 8;
    }
    out
}

fn height_from_bytes(b: &[u8]) -> Option<u64> {
    if b.len() > 8 {
        return None;
    }
    let mut h = 0u64;
    for (i, &byte) in b.iter().enumerate() {
        h |= (byte as u64) << (8 * i);
    }
    Some(h)
}

impl BlockId {
    /// Canonical encoding, also embedded verbatim in per-block keys.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + 8 + 5 + 32);
        put_field(&mut out, 1, &height_bytes(self.height));
        put_field(&mut out, 2, &self.header_hash);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut id = BlockId::default();
        for field in Fields::new(buf) {
            let (tag, payload) = field?;
            match tag {
                1 => id.height = height_from_bytes(payload).ok_or(CodecError::BadField(1))?,
                2 => {
                    id.header_hash =
                        payload.try_into().map_err(|_| CodecError::BadField(2))?;
                }
                _ => {} // unknown field, skip
            }
        }
        Ok(id)
    }
}

/// Store-wide singleton: the ends of the checkpoint chain.
/// Absent from the store iff no checkpoint exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub format_version: u32,
    pub oldest: BlockId,
    pub newest: BlockId,
}

impl Metadata {
    pub fn new(oldest: BlockId, newest: BlockId) -> Self {
        Self { format_version: FORMAT_VERSION, oldest, newest }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_field(&mut out, 1, &self.format_version.to_le_bytes());
        put_field(&mut out, 2, &self.oldest.encode());
        put_field(&mut out, 3, &self.newest.encode());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut format_version = None;
        let mut oldest = None;
        let mut newest = None;
        for field in Fields::new(buf) {
            let (tag, payload) = field?;
            match tag {
                1 => {
                    let raw: [u8; 4] =
                        payload.try_into().map_err(|_| CodecError::BadField(1))?;
                    format_version = Some(u32::from_le_bytes(raw));
                }
                2 => oldest = Some(BlockId::decode(payload)?),
                3 => newest = Some(BlockId::decode(payload)?),
                _ => {}
            }
        }
        Ok(Metadata {
            format_version: format_version.ok_or(CodecError::MissingField(1))?,
            oldest: oldest.ok_or(CodecError::MissingField(2))?,
            newest: newest.ok_or(CodecError::MissingField(3))?,
        })
    }
}

/// Per-block chain links. A freshly written tip self-links its `next`; the
/// oldest record self-links its `prev`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Links {
    pub prev: BlockId,
    pub next: BlockId,
}

impl Links {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_field(&mut out, 1, &self.prev.encode());
        put_field(&mut out, 2, &self.next.encode());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut prev = None;
        let mut next = None;
        for field in Fields::new(buf) {
            let (tag, payload) = field?;
            match tag {
                1 => prev = Some(BlockId::decode(payload)?),
                2 => next = Some(BlockId::decode(payload)?),
                _ => {}
            }
        }
        Ok(Links {
            prev: prev.ok_or(CodecError::MissingField(1))?,
            next: next.ok_or(CodecError::MissingField(2))?,
        })
    }
}

/// Ordered multiset of the value and machine hashes a checkpoint's contents
/// depend on. GC reclaims subobjects through this record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    pub value_hashes: Vec<Hash>,
    pub machine_hashes: Vec<Hash>,
}

impl Manifest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for hash in &self.value_hashes {
            put_field(&mut out, 1, hash);
        }
        for hash in &self.machine_hashes {
            put_field(&mut out, 2, hash);
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut manifest = Manifest::default();
        for field in Fields::new(buf) {
            let (tag, payload) = field?;
            match tag {
                1 => manifest
                    .value_hashes
                    .push(payload.try_into().map_err(|_| CodecError::BadField(1))?),
                2 => manifest
                    .machine_hashes
                    .push(payload.try_into().map_err(|_| CodecError::BadField(2))?),
                _ => {}
            }
        }
        Ok(manifest)
    }
}

/// Persisted FIFO of block ids awaiting physical deletion. May contain ids
/// whose records are already gone; the consumer is idempotent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeadQueue {
    pub ids: Vec<BlockId>,
}

impl DeadQueue {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for id in &self.ids {
            put_field(&mut out, 1, &id.encode());
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut queue = DeadQueue::default();
        for field in Fields::new(buf) {
            let (tag, payload) = field?;
            match tag {
                1 => queue.ids.push(BlockId::decode(payload)?),
                _ => {}
            }
        }
        Ok(queue)
    }
}

fn key_for(prefix: &[u8], id: &BlockId) -> Vec<u8> {
    let enc = id.encode();
    let mut key = Vec::with_capacity(prefix.len() + enc.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(&enc);
    key
}

pub fn manifest_key(id: &BlockId) -> Vec<u8> {
    key_for(PREFIX_MANIFEST, id)
}

pub fn contents_key(id: &BlockId) -> Vec<u8> {
    key_for(PREFIX_CONTENTS, id)
}

pub fn links_key(id: &BlockId) -> Vec<u8> {
    key_for(PREFIX_LINKS, id)
}

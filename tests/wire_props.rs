//! Property tests for the record codec: every record type must round-trip
//! bit-exactly, and decoders must tolerate unknown trailing fields.

use proptest::prelude::*;

use rollup_checkpoint::wire::{DeadQueue, Links, Manifest, Metadata};
use rollup_checkpoint::{BlockId, Hash};

prop_compose! {
    fn arb_hash()(bytes in any::<[u8; 32]>()) -> Hash {
        bytes
    }
}

prop_compose! {
    fn arb_block_id()(height in any::<u64>(), hash in arb_hash()) -> BlockId {
        BlockId::new(height, hash)
    }
}

proptest! {
    #[test]
    fn block_id_roundtrips(id in arb_block_id()) {
        let decoded = BlockId::decode(&id.encode()).expect("decode");
        prop_assert_eq!(decoded, id);
    }

    #[test]
    fn block_id_encoding_is_deterministic(id in arb_block_id()) {
        prop_assert_eq!(id.encode(), id.encode());
    }

    #[test]
    fn metadata_roundtrips(oldest in arb_block_id(), newest in arb_block_id()) {
        let meta = Metadata::new(oldest, newest);
        prop_assert_eq!(Metadata::decode(&meta.encode()).expect("decode"), meta);
    }

    #[test]
    fn links_roundtrip(prev in arb_block_id(), next in arb_block_id()) {
        let links = Links { prev, next };
        prop_assert_eq!(Links::decode(&links.encode()).expect("decode"), links);
    }

    #[test]
    fn manifest_roundtrips_preserving_order_and_duplicates(
        value_hashes in prop::collection::vec(arb_hash(), 0..8),
        machine_hashes in prop::collection::vec(arb_hash(), 0..4),
    ) {
        let manifest = Manifest { value_hashes, machine_hashes };
        prop_assert_eq!(Manifest::decode(&manifest.encode()).expect("decode"), manifest);
    }

    #[test]
    fn dead_queue_roundtrips(ids in prop::collection::vec(arb_block_id(), 0..12)) {
        let queue = DeadQueue { ids };
        prop_assert_eq!(DeadQueue::decode(&queue.encode()).expect("decode"), queue);
    }

    #[test]
    fn decoders_skip_unknown_trailing_fields(
        oldest in arb_block_id(),
        newest in arb_block_id(),
        extra in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let meta = Metadata::new(oldest, newest);
        let mut buf = meta.encode();
        // a future field: unknown tag, well-formed length prefix
        buf.push(200);
        buf.extend_from_slice(&(extra.len() as u32).to_le_bytes());
        buf.extend_from_slice(&extra);
        prop_assert_eq!(Metadata::decode(&buf).expect("tolerant decode"), meta);
    }
}

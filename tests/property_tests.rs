//! Property-based tests using proptest
//!
//! These tests validate codec and session-state invariants across a wide range of
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::Bytes;
use im_protocol::core::packer::{CountPrefix, TlvPacker};
use im_protocol::core::packet::PacketReader;
use im_protocol::core::tlv::{Tlv, TlvBlock};
use im_protocol::protocol::state::SessionState;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Entry {
    Absent,
    EmptyRaw,
    Raw(Tlv),
    Value(Tlv),
}

fn tlv_strategy() -> impl Strategy<Value = Tlv> {
    (any::<u16>(), prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(tag, value)| Tlv::new(tag, value).expect("value fits"))
}

fn entry_strategy() -> impl Strategy<Value = Entry> {
    prop_oneof![
        Just(Entry::Absent),
        Just(Entry::EmptyRaw),
        tlv_strategy().prop_map(Entry::Raw),
        tlv_strategy().prop_map(Entry::Value),
    ]
}

fn pack(entries: &[Entry]) -> TlvPacker {
    let mut packer = TlvPacker::new();
    for entry in entries {
        match entry {
            Entry::Absent => {
                packer.put_tlv(None::<&Tlv>).unwrap();
            }
            Entry::EmptyRaw => {
                packer.put_raw(&b""[..]).unwrap();
            }
            Entry::Raw(tlv) => {
                packer.put_raw(&tlv.to_bytes()[..]).unwrap();
            }
            Entry::Value(tlv) => {
                packer.put_tlv(tlv).unwrap();
            }
        }
    }
    packer
}

// Property: the record count equals the number of present, non-empty entries
proptest! {
    #[test]
    fn prop_count_integrity(entries in prop::collection::vec(entry_strategy(), 0..40)) {
        let expected: Vec<Tlv> = entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Raw(tlv) | Entry::Value(tlv) => Some(tlv.clone()),
                _ => None,
            })
            .collect();

        let packer = pack(&entries);
        prop_assert_eq!(packer.count() as usize, expected.len());

        let block = TlvBlock::parse(&packer.to_bytes(CountPrefix::Always)).expect("block parses");
        prop_assert_eq!(block.records(), expected.as_slice());
    }
}

// Property: decoding an encoded TLV gives back the same tag and bytes
proptest! {
    #[test]
    fn prop_tlv_roundtrip(tlv in tlv_strategy()) {
        let encoded = tlv.to_bytes();
        prop_assert_eq!(encoded.len(), tlv.encoded_len());

        let mut reader = PacketReader::new(&encoded);
        let decoded = Tlv::decode(&mut reader).expect("decode should not fail");
        prop_assert!(reader.is_empty());
        prop_assert_eq!(decoded, tlv);
    }
}

// Property: finalizing an unmodified packer twice is byte-identical
proptest! {
    #[test]
    fn prop_finalize_is_idempotent(entries in prop::collection::vec(entry_strategy(), 0..20)) {
        let packer = pack(&entries);
        let first = packer.finalize(CountPrefix::Always).get_bytes();
        let second = packer.finalize(CountPrefix::Always).get_bytes();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, packer.to_bytes(CountPrefix::Omit));
    }
}

// Property: truncating a valid block anywhere is reported, never panics
proptest! {
    #[test]
    fn prop_truncated_block_is_rejected(
        entries in prop::collection::vec(tlv_strategy().prop_map(Entry::Value), 1..10),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = pack(&entries).to_bytes(CountPrefix::Always);
        let cut = cut.index(bytes.len());
        prop_assert!(TlvBlock::parse(&bytes[..cut]).is_err());
    }
}

// Property: out-of-order pull completions never regress or clear the cursor
proptest! {
    #[test]
    fn prop_cursor_monotonic(
        responses in prop::collection::vec(prop::option::of(1u8..=255), 1..12)
            .prop_flat_map(|responses| {
                let order: Vec<usize> = (0..responses.len()).collect();
                (Just(responses), Just(order).prop_shuffle())
            })
    ) {
        let (responses, order) = responses;
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        runtime.block_on(async {
            let state = SessionState::new();
            let seed = state.begin_pull().await;
            state.commit_pull(&seed, Some(Bytes::from_static(&[0]))).await;

            let mut tickets = Vec::new();
            for _ in &responses {
                tickets.push(state.begin_pull().await);
            }

            let mut newest_committed: Option<usize> = None;
            for &i in &order {
                let cursor = responses[i].map(|b| Bytes::from(vec![b]));
                let stored = state.commit_pull(&tickets[i], cursor).await;
                if stored {
                    // only a strictly newer pull may win
                    assert!(newest_committed.map_or(true, |prev| i > prev));
                    newest_committed = Some(i);
                }

                let current = state.sync_cursor().await;
                assert!(current.is_some());
            }

            let expected = match newest_committed {
                Some(i) => Bytes::from(vec![responses[i].unwrap()]),
                None => Bytes::from_static(&[0]),
            };
            assert_eq!(state.sync_cursor().await, Some(expected));
        });
    }
}

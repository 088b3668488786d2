// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Receipt/lane vector fixtures over the array-mapped trie.

use cid::multihash::Code;
use cid::Cid;
use lantern::bigint::bigint_ser;
use lantern::blockstore::{BlockStore, MemoryDB, TrackingStore};
use lantern::encoding::tuple::*;
use lantern::ipld_amt::{Amt, Amtv0};
use lantern::message::TokenAmount;
use lantern::utils::cid::new_from_cbor;

/// Payment channel lane state, the value type of the lane fixtures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
struct LaneState {
    #[serde(with = "bigint_ser")]
    redeemed: TokenAmount,
    nonce: u64,
}

const SINGLE_LANE_ROOT: &str = "bafy2bzacecgrc3fdxb227cvq4gppwctyypuw3j2upj2u2xvhpc3mhyfa7ao6u";
const SINGLE_LANE_NODE_B64: &str = "hAMAAYNBEICBgkMABfAB";

#[test]
fn single_lane_fixture() {
    let root: Cid = SINGLE_LANE_ROOT.parse().unwrap();
    let node = base64::decode(SINGLE_LANE_NODE_B64).unwrap();

    // The fixture's content address is the blake2b-256 of its bytes.
    assert_eq!(new_from_cbor(&node, Code::Blake2b256), root);

    let store = MemoryDB::default();
    store.put_keyed(&root, &node).unwrap();

    let amt: Amt<LaneState, _> = Amt::load(&root, &store).unwrap();
    assert_eq!(amt.bit_width(), 3);
    assert_eq!(amt.height(), 0);
    assert_eq!(amt.count(), 1);

    let mut lanes = Vec::new();
    amt.for_each(|i, lane| {
        lanes.push((i, lane.clone()));
        Ok(())
    })
    .unwrap();

    assert_eq!(lanes.len(), 1);
    let (idx, lane) = &lanes[0];
    assert_eq!(*idx, 4);
    assert_eq!(lane.nonce, 1);
    assert_eq!(lane.redeemed, TokenAmount::from(1520u32));

    assert_eq!(amt.get(4).unwrap(), Some(lane));
    assert_eq!(amt.get(5).unwrap(), None);
}

#[test]
fn spaced_lanes_fixture() {
    let mem = MemoryDB::default();
    let store = TrackingStore::new(&mem);

    let indices: [u64; 8] = [0, 1, 2, 3, 4, 5, 13, 20];

    let mut amt: Amtv0<LaneState, _> = Amtv0::new(&store);
    for i in indices {
        amt.set(
            i,
            LaneState {
                redeemed: TokenAmount::from(i + 1),
                nonce: i + 1,
            },
        )
        .unwrap();
    }
    let root = amt.flush().unwrap();

    // Lanes spread over three leaves under one link node: four blocks.
    assert_eq!(store.stats.borrow().w, 4);

    let loaded: Amtv0<LaneState, _> = Amtv0::load(&root, &store).unwrap();
    assert_eq!(loaded.count(), 8);
    assert_eq!(loaded.height(), 1);

    let mut seen = Vec::new();
    loaded
        .for_each(|i, lane| {
            assert_eq!(lane.nonce, i + 1);
            assert_eq!(lane.redeemed, TokenAmount::from(i + 1));
            seen.push(i);
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, indices);

    for i in indices {
        assert_eq!(loaded.get(i).unwrap().map(|l| l.nonce), Some(i + 1));
    }
    assert_eq!(loaded.get(7).unwrap(), None);
    // Beyond the tree's capacity: resolved with no fetch at all.
    let reads = store.stats.borrow().r;
    assert_eq!(loaded.get(64).unwrap(), None);
    assert_eq!(store.stats.borrow().r, reads);
}

#[test]
fn per_get_fetches_bounded_by_height() {
    let mem = MemoryDB::default();
    let mut amt: Amtv0<u64, _> = Amtv0::new(&mem);
    for i in 0..600u64 {
        amt.set(i, i).unwrap();
    }
    let height = amt.height();
    let root = amt.flush().unwrap();

    let store = TrackingStore::new(&mem);
    let loaded: Amtv0<u64, _> = Amtv0::load(&root, &store).unwrap();
    for i in [0u64, 63, 311, 599] {
        let before = store.stats.borrow().r;
        assert_eq!(loaded.get(i).unwrap(), Some(&i));
        let fetched = store.stats.borrow().r - before;
        assert!(fetched as u32 <= height + 1);
    }
}

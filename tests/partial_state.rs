// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Partial state access: a selector for one actor must touch only the trie
//! nodes on the path to that actor's leaf, never the full state.

use cid::multihash::Code;
use lantern::address::Address;
use lantern::blockstore::{BlockStore, MemoryDB, TrackingStore};
use lantern::ipld::selector::{actor_state_selector, walk_matching};
use lantern::ipld::{from_ipld, Ipld, ReifierRegistry};
use lantern::message::TokenAmount;
use lantern::state_tree::{ActorState, StateTree};
use lantern::utils::cid::new_from_cbor;

#[test]
fn selector_walks_only_the_actor_path() {
    let mem = MemoryDB::default();
    let code = new_from_cbor(b"storage-miner-actor", Code::Blake2b256);
    let head = new_from_cbor(b"account-actor", Code::Blake2b256);

    // Fill the state with a bunch of actors.
    let mut tree = StateTree::new(&mem);
    for i in 0..10_000u64 {
        let addr = Address::new_id(i);
        tree.set_actor(
            &addr,
            ActorState::new(code, head, i, TokenAmount::from(1_258_812_523u64 + i)),
        )
        .unwrap();
    }
    let root = tree.flush().unwrap();

    // Walk to a single actor over a read-counting store.
    let store = TrackingStore::new(&mem);
    let root_bytes = store.get_bytes(&root).unwrap().unwrap();
    let root_node: Ipld = lantern::encoding::from_slice(&root_bytes).unwrap();

    let actor = Address::new_id(1000);
    let selector = actor_state_selector(&actor);

    let mut matched = Vec::new();
    walk_matching(
        &root_node,
        selector,
        &store,
        &ReifierRegistry::default(),
        &mut |node| {
            matched.push(node.clone());
            Ok(())
        },
    )
    .unwrap();

    assert_eq!(matched.len(), 1);
    let state: ActorState = from_ipld(matched[0].clone()).unwrap();
    assert_eq!(state.sequence, 1000);
    assert_eq!(state.code, code);
    assert_eq!(state.balance, TokenAmount::from(1_258_812_523u64 + 1000));

    // Root plus two inner nodes; the rest of the 10k-actor tree stays
    // untouched.
    assert_eq!(store.stats.borrow().r, 3);
}

#[test]
fn absent_actor_matches_nothing() {
    let mem = MemoryDB::default();
    let code = new_from_cbor(b"code", Code::Blake2b256);

    let mut tree = StateTree::new(&mem);
    for i in 0..100u64 {
        tree.set_actor(
            &Address::new_id(i),
            ActorState::new(code, code, i, TokenAmount::from(1u8)),
        )
        .unwrap();
    }
    let root = tree.flush().unwrap();

    let root_bytes = mem.get_bytes(&root).unwrap().unwrap();
    let root_node: Ipld = lantern::encoding::from_slice(&root_bytes).unwrap();

    let mut matched = 0;
    walk_matching(
        &root_node,
        actor_state_selector(&Address::new_id(100_000)),
        &mem,
        &ReifierRegistry::default(),
        &mut |_| {
            matched += 1;
            Ok(())
        },
    )
    .unwrap();
    assert_eq!(matched, 0);
}

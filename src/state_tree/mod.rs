// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Actor state tree: a HAMT from wire-form address bytes to actor records.

use cid::Cid;

use crate::address::Address;
use crate::bigint::bigint_ser;
use crate::blockstore::BlockStore;
use crate::encoding::tuple::*;
use crate::encoding::Cbor;
use crate::ipld_hamt::{BytesKey, Error as HamtError, Hamt};
use crate::message::TokenAmount;

/// State of an actor in the chain state tree: `(code, head, sequence,
/// balance)` on the wire.
#[derive(PartialEq, Eq, Clone, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct ActorState {
    /// Link to code for the actor.
    pub code: Cid,
    /// Link to the state root of the actor.
    pub state: Cid,
    /// Sequence (nonce) of the actor.
    pub sequence: u64,
    /// Token balance of the actor.
    #[serde(with = "bigint_ser")]
    pub balance: TokenAmount,
}

impl Cbor for ActorState {}

impl ActorState {
    pub fn new(code: Cid, state: Cid, sequence: u64, balance: TokenAmount) -> Self {
        Self {
            code,
            state,
            sequence,
            balance,
        }
    }
}

/// The chain state map over a block store. Lookups fetch only the trie nodes
/// on the path to the requested actor.
pub struct StateTree<BS> {
    map: Hamt<BS, ActorState>,
}

impl<BS> StateTree<BS>
where
    BS: BlockStore,
{
    pub fn new(store: BS) -> Self {
        Self {
            map: Hamt::new(store),
        }
    }

    /// Constructs the state tree for a given root Cid.
    pub fn load(root: &Cid, store: BS) -> Result<Self, HamtError> {
        Ok(Self {
            map: Hamt::load(root, store)?,
        })
    }

    /// Get the state of an actor by address.
    pub fn get_actor(&self, addr: &Address) -> Result<Option<&ActorState>, HamtError> {
        self.map.get(&BytesKey(addr.to_bytes()))
    }

    /// Set the state of an actor by address.
    pub fn set_actor(&mut self, addr: &Address, actor: ActorState) -> Result<(), HamtError> {
        self.map.set(BytesKey(addr.to_bytes()), actor)?;
        Ok(())
    }

    /// Flushes the tree and returns its root Cid.
    pub fn flush(&mut self) -> Result<Cid, HamtError> {
        self.map.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::MemoryDB;
    use crate::utils::cid::new_from_cbor;
    use cid::multihash::Code;

    #[test]
    fn set_and_get_actor() {
        let store = MemoryDB::default();
        let mut tree = StateTree::new(&store);
        let code = new_from_cbor(b"account", Code::Blake2b256);
        let head = new_from_cbor(b"head", Code::Blake2b256);

        let addr = Address::new_id(42);
        let actor = ActorState::new(code, head, 7, TokenAmount::from(1000u32));
        tree.set_actor(&addr, actor.clone()).unwrap();
        let root = tree.flush().unwrap();

        let loaded = StateTree::load(&root, &store).unwrap();
        assert_eq!(loaded.get_actor(&addr).unwrap(), Some(&actor));
        assert_eq!(loaded.get_actor(&Address::new_id(43)).unwrap(), None);
    }
}

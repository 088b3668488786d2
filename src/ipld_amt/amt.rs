// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::multihash::Code;
use cid::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::node::Link;
use super::root::version::{Version as AmtVersion, V0, V3};
use super::root::RootImpl;
use super::{
    init_sized_vec, nodes_for_height, Error, Node, DEFAULT_BIT_WIDTH, MAX_HEIGHT, MAX_INDEX,
};
use crate::blockstore::BlockStore;

#[derive(Debug)]
#[doc(hidden)]
pub struct AmtImpl<V, BS, Ver> {
    pub(super) root: RootImpl<V, Ver>,
    pub(super) block_store: BS,
    /// Remember the last flushed CID until it changes.
    flushed_cid: Option<Cid>,
}

/// Array mapped trie over sparse indices, lazily fetched from a block store
/// and serializable to a CID. Not thread-safe.
pub type Amt<V, BS> = AmtImpl<V, BS, V3>;
/// Legacy `amt v0`, fixed node width of 8 (bit width 3). Receipt vectors
/// are rooted in this format.
pub type Amtv0<V, BS> = AmtImpl<V, BS, V0>;

impl<V, BS, Ver> AmtImpl<V, BS, Ver>
where
    Ver: AmtVersion,
{
    /// Constructor for the root AMT node.
    pub fn new(block_store: BS) -> Self {
        Self::new_with_bit_width(block_store, DEFAULT_BIT_WIDTH)
    }

    /// Construct a new AMT with the given bit width.
    pub fn new_with_bit_width(block_store: BS, bit_width: u32) -> Self {
        Self {
            root: RootImpl::new_with_bit_width(bit_width),
            block_store,
            flushed_cid: None,
        }
    }

    /// Gets the bit width of the AMT; nodes hold `2^bit_width` slots.
    pub fn bit_width(&self) -> u32 {
        self.root.bit_width
    }

    /// Gets the height of the AMT.
    pub fn height(&self) -> u32 {
        self.root.height
    }

    /// Gets the count of elements added to the AMT.
    pub fn count(&self) -> u64 {
        self.root.count
    }
}

impl<V, BS, Ver> AmtImpl<V, BS, Ver>
where
    V: DeserializeOwned + Serialize,
    BS: BlockStore,
    Ver: AmtVersion,
{
    /// Constructs an AMT with a block store and the Cid of the root.
    pub fn load(cid: &Cid, block_store: BS) -> Result<Self, Error> {
        let root: RootImpl<V, Ver> = block_store
            .get(cid)?
            .ok_or_else(|| Error::CidNotFound(cid.to_string()))?;

        // Sanity check, this should never be possible.
        if root.height > MAX_HEIGHT {
            return Err(Error::MaxHeight(root.height, MAX_HEIGHT));
        }

        Ok(Self {
            root,
            block_store,
            flushed_cid: Some(*cid),
        })
    }

    /// Get value at index of the AMT. Indices beyond the tree's capacity
    /// resolve to `None` without touching the store.
    pub fn get(&self, i: u64) -> Result<Option<&V>, Error> {
        if i > MAX_INDEX {
            return Err(Error::OutOfRange(i));
        }

        if i >= nodes_for_height(self.bit_width(), self.height() + 1) {
            return Ok(None);
        }

        self.root
            .node
            .get(&self.block_store, self.height(), self.bit_width(), i)
    }

    /// Set value at index.
    pub fn set(&mut self, i: u64, val: V) -> Result<(), Error> {
        if i > MAX_INDEX {
            return Err(Error::OutOfRange(i));
        }

        while i >= nodes_for_height(self.bit_width(), self.height() + 1) {
            // The tree is too shallow for the index; expand by pushing the
            // current root down one level.
            if !self.root.node.is_empty() {
                let mut new_links: Vec<Option<Link<V>>> = init_sized_vec(self.root.bit_width);
                let node = std::mem::replace(&mut self.root.node, Node::empty());
                new_links[0] = Some(Link::Dirty(Box::new(node)));
                self.root.node = Node::Link { links: new_links };
            } else {
                // If the first expansion is before any value is inserted,
                // convert the base node to a link node.
                self.root.node = Node::Link {
                    links: init_sized_vec(self.bit_width()),
                };
            }
            self.root.height += 1;
        }

        if self
            .root
            .node
            .set(&self.block_store, self.height(), self.bit_width(), i, val)?
            .is_none()
        {
            self.root.count += 1;
        }

        self.flushed_cid = None;

        Ok(())
    }

    /// Sets values sequentially starting from index 0.
    pub fn batch_set(&mut self, vals: impl IntoIterator<Item = V>) -> Result<(), Error> {
        for (i, val) in (0u64..).zip(vals) {
            self.set(i, val)?;
        }

        Ok(())
    }

    /// Flush the underlying tree and return the Cid used as the key in the
    /// block store.
    pub fn flush(&mut self) -> Result<Cid, Error> {
        if let Some(cid) = self.flushed_cid {
            return Ok(cid);
        }
        self.root.node.flush(&self.block_store)?;
        let cid = self.block_store.put(&self.root, Code::Blake2b256)?;
        self.flushed_cid = Some(cid);
        Ok(cid)
    }

    /// Iterates over each value in the AMT in ascending index order,
    /// lazily fetching blocks.
    #[inline]
    pub fn for_each<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(u64, &V) -> anyhow::Result<()>,
    {
        self.for_each_while(|i, x| {
            f(i, x)?;
            Ok(true)
        })
    }

    /// Iterates over each value in the AMT for as long as the function
    /// keeps returning `true`.
    pub fn for_each_while<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(u64, &V) -> anyhow::Result<bool>,
    {
        self.root
            .node
            .for_each_while(
                &self.block_store,
                self.height(),
                self.bit_width(),
                0,
                &mut f,
            )
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::{MemoryDB, TrackingStore};

    #[test]
    fn out_of_capacity_get_is_fetch_free() {
        let mem = MemoryDB::default();
        let store = TrackingStore::new(&mem);
        let mut amt: Amt<u64, _> = Amt::new(&store);
        amt.set(0, 7).unwrap();
        let cid = amt.flush().unwrap();

        let loaded: Amt<u64, _> = Amt::load(&cid, &store).unwrap();
        let reads_before = store.stats.borrow().r;
        // Height 0 with bit width 3 covers [0, 8); index 8 is beyond it.
        assert_eq!(loaded.get(8).unwrap(), None);
        assert_eq!(store.stats.borrow().r, reads_before);
    }

    #[test]
    fn get_fetch_count_bounded_by_height() {
        let mem = MemoryDB::default();
        let mut amt: Amt<u64, _> = Amt::new(&mem);
        for i in 0..100u64 {
            amt.set(i, i + 1).unwrap();
        }
        let height = amt.height();
        let cid = amt.flush().unwrap();

        let store = TrackingStore::new(&mem);
        let loaded: Amt<u64, _> = Amt::load(&cid, &store).unwrap();
        let reads_root = store.stats.borrow().r;
        assert_eq!(loaded.get(77).unwrap(), Some(&78));
        let reads = store.stats.borrow().r - reads_root;
        assert!(reads as u32 <= height + 1);
    }

    #[test]
    fn iteration_is_in_ascending_order() {
        let mem = MemoryDB::default();
        let mut amt: Amt<u64, _> = Amt::new(&mem);
        for i in [20u64, 5, 0, 13, 1] {
            amt.set(i, i).unwrap();
        }
        let cid = amt.flush().unwrap();

        let loaded: Amt<u64, _> = Amt::load(&cid, &mem).unwrap();
        let mut seen = Vec::new();
        loaded
            .for_each(|i, v| {
                assert_eq!(i, *v);
                seen.push(i);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 5, 13, 20]);
        assert_eq!(loaded.count(), 5);
    }
}

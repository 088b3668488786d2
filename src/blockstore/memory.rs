// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;
use std::sync::RwLock;

use cid::Cid;

use super::BlockStore;

/// In-memory block store backed by a HashMap, usable across client tasks.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored block. Lets a drained response or a test
    /// fixture be replayed into another store.
    pub fn entries(&self) -> Vec<(Cid, Vec<u8>)> {
        self.blocks
            .read()
            .expect("block store lock poisoned")
            .iter()
            .map(|(cid, bytes)| (*cid, bytes.clone()))
            .collect()
    }
}

impl BlockStore for MemoryDB {
    fn get_bytes(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self
            .blocks
            .read()
            .expect("block store lock poisoned")
            .get(cid)
            .cloned())
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> anyhow::Result<()> {
        self.blocks
            .write()
            .expect("block store lock poisoned")
            .insert(*cid, bytes.to_vec());
        Ok(())
    }
}

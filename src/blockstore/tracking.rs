// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cell::RefCell;

use cid::Cid;

use super::BlockStore;

/// Stats for a [TrackingStore], the amount of data read from and written to
/// the wrapped store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BSStats {
    /// Number of reads
    pub r: usize,
    /// Number of writes
    pub w: usize,
    /// Bytes read
    pub br: usize,
    /// Bytes written
    pub bw: usize,
}

/// Wrapper around a [BlockStore] tracking reads and writes for verification.
/// This struct should only be used for testing.
#[derive(Debug)]
pub struct TrackingStore<BS> {
    base: BS,
    pub stats: RefCell<BSStats>,
}

impl<BS> TrackingStore<BS>
where
    BS: BlockStore,
{
    pub fn new(base: BS) -> Self {
        Self {
            base,
            stats: Default::default(),
        }
    }
}

impl<BS> BlockStore for TrackingStore<BS>
where
    BS: BlockStore,
{
    fn get_bytes(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.stats.borrow_mut().r += 1;
        let bytes = self.base.get_bytes(cid)?;
        if let Some(bytes) = &bytes {
            self.stats.borrow_mut().br += bytes.len();
        }
        Ok(bytes)
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> anyhow::Result<()> {
        self.stats.borrow_mut().w += 1;
        self.stats.borrow_mut().bw += bytes.len();
        self.base.put_keyed(cid, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::MemoryDB;
    use cid::multihash::Code;

    #[test]
    fn basic_tracking_store() {
        let mem = MemoryDB::default();
        let tr_store = TrackingStore::new(&mem);
        assert_eq!(*tr_store.stats.borrow(), BSStats::default());

        type TestType = (u8, String);
        let object: TestType = (8, "test".to_string());
        let obj_bytes_len = crate::encoding::to_vec(&object).unwrap().len();

        let put_cid = tr_store.put(&object, Code::Blake2b256).unwrap();
        assert_eq!(tr_store.get::<TestType>(&put_cid).unwrap(), Some(object));
        assert_eq!(
            *tr_store.stats.borrow(),
            BSStats {
                r: 1,
                br: obj_bytes_len,
                w: 1,
                bw: obj_bytes_len,
            }
        );
    }
}

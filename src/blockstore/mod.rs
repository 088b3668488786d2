// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod memory;
mod tracking;

pub use self::memory::MemoryDB;
pub use self::tracking::{BSStats, TrackingStore};

use cid::multihash::{Code, MultihashDigest};
use cid::Cid;
use serde::{de::DeserializeOwned, Serialize};

use crate::encoding::{from_slice, to_vec};
use crate::utils::cid::DAG_CBOR;

/// Content-addressed get/put over immutable blocks. Backends are pluggable;
/// the core only ever sees this facade.
pub trait BlockStore {
    /// Get raw bytes from the store by Cid. An unknown Cid yields `None`.
    fn get_bytes(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>>;

    /// Write a block already keyed by its Cid.
    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> anyhow::Result<()>;

    /// Get a typed object from the store, decoding from dag-cbor.
    fn get<T>(&self, cid: &Cid) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
        Self: Sized,
    {
        match self.get_bytes(cid)? {
            Some(bz) => Ok(Some(from_slice(&bz)?)),
            None => Ok(None),
        }
    }

    /// Put raw bytes in the store and return the derived Cid.
    fn put_raw(&self, bytes: Vec<u8>, code: Code) -> anyhow::Result<Cid>
    where
        Self: Sized,
    {
        let cid = Cid::new_v1(DAG_CBOR, code.digest(&bytes));
        self.put_keyed(&cid, &bytes)?;
        Ok(cid)
    }

    /// Put a serializable object in the store and return its Cid.
    fn put<S>(&self, obj: &S, code: Code) -> anyhow::Result<Cid>
    where
        S: Serialize,
        Self: Sized,
    {
        let bytes = to_vec(obj)?;
        self.put_raw(bytes, code)
    }

    /// Batch put dag-cbor objects into the store, returning their Cids.
    fn bulk_put<'a, S, V>(&self, values: V, code: Code) -> anyhow::Result<Vec<Cid>>
    where
        Self: Sized,
        S: Serialize + 'a,
        V: IntoIterator<Item = &'a S>,
    {
        values
            .into_iter()
            .map(|value| self.put(value, code))
            .collect()
    }
}

impl<T: BlockStore> BlockStore for &T {
    fn get_bytes(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        (*self).get_bytes(cid)
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> anyhow::Result<()> {
        (*self).put_keyed(cid, bytes)
    }
}

impl<T: BlockStore> BlockStore for std::sync::Arc<T> {
    fn get_bytes(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.as_ref().get_bytes(cid)
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> anyhow::Result<()> {
        self.as_ref().put_keyed(cid, bytes)
    }
}

/// Checks that a block's bytes hash to its Cid. Blocks arriving from the
/// network go through this before they are stored; an integrity failure is
/// surfaced and the same bytes are never retried.
pub fn verify_block(cid: &Cid, bytes: &[u8]) -> anyhow::Result<()> {
    let code = Code::try_from(cid.hash().code())
        .map_err(|_| anyhow::anyhow!("unsupported multihash code {:#x}", cid.hash().code()))?;
    let digest = code.digest(bytes);
    if digest.digest() != cid.hash().digest() {
        anyhow::bail!("block bytes do not hash to the cid {}", cid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_bytes() {
        let db = MemoryDB::default();
        let cid = db.put(&"cross-check".to_string(), Code::Blake2b256).unwrap();
        let bytes = db.get_bytes(&cid).unwrap().unwrap();
        verify_block(&cid, &bytes).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_bytes() {
        let db = MemoryDB::default();
        let cid = db.put(&"cross-check".to_string(), Code::Blake2b256).unwrap();
        let mut bytes = db.get_bytes(&cid).unwrap().unwrap();
        bytes[0] ^= 1;
        assert!(verify_block(&cid, &bytes).is_err());
    }
}

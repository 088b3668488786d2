// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use num_bigint::BigUint;
use serde::{de, ser, Deserialize, Serialize};

use super::{BlockHeader, ChainEpoch, Error};
use crate::encoding::Cbor;

/// A set of CIDs forming a unique key for a tipset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Ord, PartialOrd)]
pub struct TipsetKeys {
    pub cids: Vec<Cid>,
}

impl TipsetKeys {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self { cids }
    }

    /// Returns tipset header cids.
    pub fn cids(&self) -> &[Cid] {
        &self.cids
    }
}

impl ser::Serialize for TipsetKeys {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        self.cids.serialize(serializer)
    }
}

impl<'de> de::Deserialize<'de> for TipsetKeys {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let cids: Vec<Cid> = Deserialize::deserialize(deserializer)?;
        Ok(TipsetKeys { cids })
    }
}

impl Cbor for TipsetKeys {}

/// An immutable set of sibling blocks: same height, same parent set.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct Tipset {
    blocks: Vec<BlockHeader>,
    key: TipsetKeys,
}

#[allow(clippy::len_without_is_empty)]
impl Tipset {
    /// Builds a new Tipset from a collection of headers. All headers must
    /// agree on parents, epoch, state root and receipt root.
    pub fn new(headers: Vec<BlockHeader>) -> Result<Self, Error> {
        if headers.is_empty() {
            return Err(Error::NoBlocks);
        }

        let mut cids = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            if i > 0 {
                if header.parents() != headers[0].parents() {
                    return Err(Error::InvalidTipset("parent cids are not equal".into()));
                }
                if header.epoch() != headers[0].epoch() {
                    return Err(Error::InvalidTipset("epochs are not equal".into()));
                }
                if header.state_root() != headers[0].state_root() {
                    return Err(Error::InvalidTipset("state_roots are not equal".into()));
                }
                if header.message_receipts() != headers[0].message_receipts() {
                    return Err(Error::InvalidTipset(
                        "message_receipts are not equal".into(),
                    ));
                }
            }
            cids.push(*header.cid()?);
        }

        Ok(Self {
            blocks: headers,
            key: TipsetKeys { cids },
        })
    }

    /// Returns the epoch of the tipset.
    pub fn epoch(&self) -> ChainEpoch {
        self.blocks[0].epoch()
    }

    /// Returns all block headers in the tipset.
    pub fn blocks(&self) -> &[BlockHeader] {
        &self.blocks
    }

    /// Returns the number of blocks in the tipset.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns a key for the tipset.
    pub fn key(&self) -> &TipsetKeys {
        &self.key
    }

    /// Returns the CIDs of the parents of the blocks in the tipset.
    pub fn parents(&self) -> &TipsetKeys {
        self.blocks[0].parents()
    }

    /// Returns the state root of the tipset's parent.
    pub fn parent_state(&self) -> &Cid {
        self.blocks[0].state_root()
    }

    /// Returns the tipset's calculated weight.
    pub fn weight(&self) -> &BigUint {
        self.blocks[0].weight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    #[test]
    fn tipset_rejects_mismatched_epochs() {
        let a = BlockHeader::builder()
            .miner_address(Address::new_id(1))
            .epoch(1)
            .build()
            .unwrap();
        let b = BlockHeader::builder()
            .miner_address(Address::new_id(2))
            .epoch(2)
            .build()
            .unwrap();
        assert!(matches!(
            Tipset::new(vec![a, b]),
            Err(Error::InvalidTipset(_))
        ));
    }

    #[test]
    fn empty_tipset_rejected() {
        assert_eq!(Tipset::new(vec![]).unwrap_err(), Error::NoBlocks);
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;

use super::BlockHeader;
use crate::encoding::tuple::*;
use crate::encoding::Cbor;

/// Block message used as the serialized gossipsub payload on the blocks
/// topic. The block's identity is `header.cid()`; the envelope is larger
/// than the header, so it is never hashed directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct GossipBlock {
    pub header: BlockHeader,
    pub bls_messages: Vec<Cid>,
    pub secpk_messages: Vec<Cid>,
}

impl Cbor for GossipBlock {}

impl GossipBlock {
    /// The CID of the block, derived by re-encoding the header array.
    pub fn cid(&self) -> Result<&Cid, super::Error> {
        self.header.cid()
    }
}

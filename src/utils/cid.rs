// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::multihash::{Code, MultihashDigest};
use cid::Cid;
use serde::Serialize;

use crate::encoding;

/// Multicodec identifier for the dag-cbor codec.
pub const DAG_CBOR: u64 = 0x71;

/// Content address for raw encoded bytes: CID v1 over the dag-cbor codec.
pub fn new_from_cbor(bz: &[u8], code: Code) -> Cid {
    Cid::new_v1(DAG_CBOR, code.digest(bz))
}

/// Extension methods for constructing dag-cbor [Cid]s.
pub trait CidCborExt {
    /// Default CID builder for Filecoin-shaped chains.
    fn from_cbor_blake2b256<S: Serialize>(obj: &S) -> Result<Cid, encoding::Error>;
}

impl CidCborExt for Cid {
    fn from_cbor_blake2b256<S: Serialize>(obj: &S) -> Result<Cid, encoding::Error> {
        let bytes = encoding::to_vec(obj)?;
        Ok(new_from_cbor(&bytes, Code::Blake2b256))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_blake2b_prefix() {
        let cid = new_from_cbor(&[0x80], Code::Blake2b256);
        assert_eq!(cid.version(), cid::Version::V1);
        assert_eq!(cid.codec(), DAG_CBOR);
        assert_eq!(cid.hash().code(), u64::from(Code::Blake2b256));
        assert_eq!(cid.hash().size(), 32);
    }
}

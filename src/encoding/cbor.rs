// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use serde::{de::DeserializeOwned, Serialize};

use super::errors::{CodecProtocol, Error};
use crate::utils::cid::CidCborExt;

/// Encodes a value into its canonical tagged binary (DAG-CBOR) form.
///
/// Map keys are sorted canonically, integers take their minimal-length
/// encoding and records are fixed-arity arrays.
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, Error>
where
    T: Serialize,
{
    serde_ipld_dagcbor::to_vec(value).map_err(|e| Error::Marshalling {
        description: e.to_string(),
        protocol: CodecProtocol::Cbor,
    })
}

/// Decodes bytes into a value. Malformed input, unsupported tags and
/// trailing bytes are all decode errors.
pub fn from_slice<T>(bz: &[u8]) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    serde_ipld_dagcbor::from_slice(bz).map_err(|e| Error::Unmarshalling {
        description: e.to_string(),
        protocol: CodecProtocol::Cbor,
    })
}

/// Content-addressable marshaling for wire types.
pub trait Cbor: Serialize + DeserializeOwned {
    fn marshal_cbor(&self) -> Result<Vec<u8>, Error> {
        to_vec(self)
    }

    fn unmarshal_cbor(bz: &[u8]) -> Result<Self, Error> {
        from_slice(bz)
    }

    /// Content address of the encoded form (CID v1, dag-cbor, blake2b-256).
    fn cid(&self) -> Result<Cid, Error> {
        Cid::from_cbor_blake2b256(self)
    }
}

impl Cbor for Cid {}

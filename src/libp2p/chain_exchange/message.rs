// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::convert::TryFrom;

use cid::Cid;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::blocks::{BlockHeader, Tipset};
use crate::encoding::tuple::*;
use crate::message::{SignedMessage, UnsignedMessage};

/// Requested headers in the response.
pub const HEADERS: u64 = 1;
/// Requested messages in the response.
pub const MESSAGES: u64 = 2;

/// The payload that gets sent to another node to request for blocks and
/// messages, sent as `[start, length, options]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ChainExchangeRequest {
    /// The tipset `[Cid]` to start the request from.
    pub start: Vec<Cid>,
    /// The amount of epochs to request.
    pub request_len: u64,
    /// 1 = Block headers, 2 = Messages, 3 = Blocks and Messages.
    pub options: u64,
}

impl ChainExchangeRequest {
    /// If a request has the [HEADERS] bit set and requests Tipsets.
    pub fn include_blocks(&self) -> bool {
        self.options & HEADERS > 0
    }

    /// If a request has the [MESSAGES] bit set and requests messages.
    pub fn include_messages(&self) -> bool {
        self.options & MESSAGES > 0
    }

    /// A request is valid if it requests anything at all.
    pub fn is_options_valid(&self) -> bool {
        self.options & (HEADERS | MESSAGES) > 0
    }
}

/// Status codes of a chain exchange response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u64)]
pub enum ChainExchangeResponseStatus {
    /// All is well.
    Success = 0,
    /// We could not fetch all blocks requested (but at least we returned
    /// the `Head` requested).
    PartialResponse = 101,
    /// Request.Start not found.
    BlockNotFound = 201,
    /// Requester is making too many requests.
    GoAway = 202,
    /// Internal error occurred.
    InternalError = 203,
    /// Request was bad.
    BadRequest = 204,
}

impl Serialize for ChainExchangeResponseStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (*self as u64).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChainExchangeResponseStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code: u64 = Deserialize::deserialize(deserializer)?;
        Self::from_u64(code)
            .ok_or_else(|| de::Error::custom(format!("unknown response status code {}", code)))
    }
}

/// The response to a ChainExchange request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ChainExchangeResponse {
    /// Status code of the response.
    pub status: ChainExchangeResponseStatus,
    /// Status message indicating failure reason.
    pub message: String,
    /// The tipsets requested.
    pub chain: Vec<TipsetBundle>,
}

impl ChainExchangeResponse {
    /// Converts the response into a result, where any status other than
    /// success or partial fails with the protocol error string.
    pub fn into_result(self) -> Result<Vec<TipsetBundle>, String> {
        match self.status {
            ChainExchangeResponseStatus::Success | ChainExchangeResponseStatus::PartialResponse => {
                Ok(self.chain)
            }
            status => Err(format!(
                "Chain exchange failed with status {:?}: {}",
                status, self.message
            )),
        }
    }
}

/// Contains all BLS and SECP messages and their indexes per block in a
/// tipset.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct CompactedMessages {
    /// Unsigned BLS messages.
    pub bls_msgs: Vec<UnsignedMessage>,
    /// Describes which block each BLS message belongs to; `bls_msg_includes[i]`
    /// are indices into `bls_msgs` for the tipset's `i`-th block.
    pub bls_msg_includes: Vec<Vec<u64>>,
    /// Signed SECP messages.
    pub secp_msgs: Vec<SignedMessage>,
    /// Describes which block each SECP message belongs to.
    pub secp_msg_includes: Vec<Vec<u64>>,
}

/// Contains the blocks and messages in a particular tipset.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct TipsetBundle {
    /// The blocks in the tipset.
    pub blocks: Vec<BlockHeader>,
    /// Compressed messages format.
    pub messages: Option<CompactedMessages>,
}

impl TryFrom<TipsetBundle> for Tipset {
    type Error = String;

    fn try_from(tsb: TipsetBundle) -> Result<Tipset, Self::Error> {
        Tipset::new(tsb.blocks).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn status_codes_roundtrip() {
        for status in [
            ChainExchangeResponseStatus::Success,
            ChainExchangeResponseStatus::PartialResponse,
            ChainExchangeResponseStatus::BlockNotFound,
            ChainExchangeResponseStatus::GoAway,
            ChainExchangeResponseStatus::InternalError,
            ChainExchangeResponseStatus::BadRequest,
        ] {
            let bz = to_vec(&status).unwrap();
            let back: ChainExchangeResponseStatus = from_slice(&bz).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn non_ok_status_fails_into_result() {
        let resp = ChainExchangeResponse {
            status: ChainExchangeResponseStatus::BlockNotFound,
            message: "Start tipset was not found in the database".into(),
            chain: vec![],
        };
        assert!(resp.into_result().is_err());

        let ok = ChainExchangeResponse {
            status: ChainExchangeResponseStatus::PartialResponse,
            message: String::new(),
            chain: vec![],
        };
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn options_bits() {
        let req = ChainExchangeRequest {
            start: vec![],
            request_len: 1,
            options: HEADERS,
        };
        assert!(req.include_blocks());
        assert!(!req.include_messages());
        assert!(req.is_options_valid());

        let bad = ChainExchangeRequest {
            start: vec![],
            request_len: 1,
            options: 0,
        };
        assert!(!bad.is_options_valid());
    }
}

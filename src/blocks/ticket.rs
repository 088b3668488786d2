// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Consensus artifacts carried in headers. The light client never validates
//! these; they are passed through so headers round-trip byte-exactly.

use crate::encoding::tuple::*;

/// A ticket, part of the leader election chain.
#[derive(Clone, Debug, PartialEq, Eq, Default, Hash, Serialize_tuple, Deserialize_tuple)]
pub struct Ticket {
    #[serde(with = "serde_bytes")]
    pub vrfproof: Vec<u8>,
}

/// Proof of a winning leader election.
#[derive(Clone, Debug, PartialEq, Eq, Default, Hash, Serialize_tuple, Deserialize_tuple)]
pub struct ElectionProof {
    pub win_count: i64,
    #[serde(with = "serde_bytes")]
    pub vrfproof: Vec<u8>,
}

/// A verifiable oracle randomness entry.
#[derive(Clone, Debug, PartialEq, Eq, Default, Hash, Serialize_tuple, Deserialize_tuple)]
pub struct BeaconEntry {
    pub round: u64,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// A winning proof-of-spacetime proof.
#[derive(Clone, Debug, PartialEq, Eq, Default, Hash, Serialize_tuple, Deserialize_tuple)]
pub struct PoStProof {
    pub post_proof: i64,
    #[serde(with = "serde_bytes")]
    pub proof_bytes: Vec<u8>,
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use derive_builder::Builder;
use num_bigint::BigUint;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{BeaconEntry, ChainEpoch, ElectionProof, Error, PoStProof, Ticket, TipsetKeys};
use crate::bigint::bigint_ser::{BigIntDe, BigIntSer};
use crate::bigint::biguint_ser::{BigUintDe, BigUintSer};
use crate::crypto::Signature;
use crate::encoding::{to_vec, Cbor, Error as EncodingError};
use crate::message::TokenAmount;
use crate::utils::cid::new_from_cbor;
use crate::address::Address;

/// Header of a block. The wire form is a fixed 16-field ordered array; the
/// light client interprets parents, epoch, the three roots and the parent
/// base fee and passes everything else through opaquely.
///
/// The CID of a block is derived from the header alone: gossiped block
/// envelopes are larger than the header, so the header array is re-encoded
/// and hashed rather than hashing the envelope bytes.
#[derive(Clone, Debug, Builder)]
#[builder(name = "BlockHeaderBuilder")]
pub struct BlockHeader {
    // MINER INFO
    /// The address of the miner actor that mined this block.
    miner_address: Address,

    // CONSENSUS ARTIFACTS (opaque to the light client)
    #[builder(default)]
    ticket: Option<Ticket>,
    #[builder(default)]
    election_proof: Option<ElectionProof>,
    #[builder(default)]
    beacon_entries: Vec<BeaconEntry>,
    #[builder(default)]
    winning_post_proof: Vec<PoStProof>,

    // CHAIN LINKING
    /// The set of parents this block was based on. Typically one, but can
    /// be several in the case where there were multiple winning ticket
    /// holders for an epoch.
    #[builder(default)]
    parents: TipsetKeys,
    /// Aggregate chain weight of the parent set.
    #[builder(default)]
    weight: BigUint,
    /// The period in which a new block is generated.
    #[builder(default)]
    epoch: ChainEpoch,

    // STATE
    /// CID of the parent state root after calculating the parent tipset.
    #[builder(default)]
    state_root: Cid,
    /// CID of the root of an array of message receipts.
    #[builder(default)]
    message_receipts: Cid,
    /// CID of the merkle links for bls_messages and secp_messages.
    #[builder(default)]
    messages: Cid,

    // SIGNATURES
    #[builder(default)]
    bls_aggregate: Option<Signature>,
    /// Seconds since the Unix epoch at which this block was created.
    #[builder(default)]
    timestamp: u64,
    #[builder(default)]
    signature: Option<Signature>,
    #[builder(default)]
    fork_signal: u64,
    /// The base fee of the parent block, big-endian byte form on the wire.
    #[builder(default)]
    parent_base_fee: TokenAmount,

    // CACHE
    /// Stores the cid for the block after the first call to `cid()`.
    #[builder(default, setter(skip))]
    cached_cid: OnceCell<Cid>,
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.miner_address == other.miner_address
            && self.ticket == other.ticket
            && self.election_proof == other.election_proof
            && self.beacon_entries == other.beacon_entries
            && self.winning_post_proof == other.winning_post_proof
            && self.parents == other.parents
            && self.weight == other.weight
            && self.epoch == other.epoch
            && self.state_root == other.state_root
            && self.message_receipts == other.message_receipts
            && self.messages == other.messages
            && self.bls_aggregate == other.bls_aggregate
            && self.timestamp == other.timestamp
            && self.signature == other.signature
            && self.fork_signal == other.fork_signal
            && self.parent_base_fee == other.parent_base_fee
    }
}

impl Eq for BlockHeader {}

impl Serialize for BlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (
            &self.miner_address,
            &self.ticket,
            &self.election_proof,
            &self.beacon_entries,
            &self.winning_post_proof,
            &self.parents,
            BigUintSer(&self.weight),
            &self.epoch,
            &self.state_root,
            &self.message_receipts,
            &self.messages,
            &self.bls_aggregate,
            &self.timestamp,
            &self.signature,
            &self.fork_signal,
            BigIntSer(&self.parent_base_fee),
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (
            miner_address,
            ticket,
            election_proof,
            beacon_entries,
            winning_post_proof,
            parents,
            BigUintDe(weight),
            epoch,
            state_root,
            message_receipts,
            messages,
            bls_aggregate,
            timestamp,
            signature,
            fork_signal,
            BigIntDe(parent_base_fee),
        ) = Deserialize::deserialize(deserializer)?;

        Ok(BlockHeader {
            miner_address,
            ticket,
            election_proof,
            beacon_entries,
            winning_post_proof,
            parents,
            weight,
            epoch,
            state_root,
            message_receipts,
            messages,
            bls_aggregate,
            timestamp,
            signature,
            fork_signal,
            parent_base_fee,
            cached_cid: OnceCell::new(),
        })
    }
}

impl BlockHeader {
    /// Generates a BlockHeader builder as a constructor.
    pub fn builder() -> BlockHeaderBuilder {
        BlockHeaderBuilder::default()
    }

    pub fn miner_address(&self) -> &Address {
        &self.miner_address
    }
    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }
    pub fn parents(&self) -> &TipsetKeys {
        &self.parents
    }
    pub fn weight(&self) -> &BigUint {
        &self.weight
    }
    pub fn epoch(&self) -> ChainEpoch {
        self.epoch
    }
    pub fn state_root(&self) -> &Cid {
        &self.state_root
    }
    pub fn message_receipts(&self) -> &Cid {
        &self.message_receipts
    }
    pub fn messages(&self) -> &Cid {
        &self.messages
    }
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
    pub fn parent_base_fee(&self) -> &TokenAmount {
        &self.parent_base_fee
    }

    /// Content address of the header: re-encode the 16-field array and hash.
    /// Cached after the first derivation; headers are immutable.
    pub fn cid(&self) -> Result<&Cid, Error> {
        self.cached_cid.get_or_try_init(|| {
            let bytes = to_vec(self)?;
            Ok(new_from_cbor(&bytes, cid::multihash::Code::Blake2b256))
        })
    }
}

impl Cbor for BlockHeader {
    fn cid(&self) -> Result<Cid, EncodingError> {
        BlockHeader::cid(self)
            .copied()
            .map_err(|e| EncodingError::Marshalling {
                description: e.to_string(),
                protocol: crate::encoding::CodecProtocol::Cbor,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::from_slice;

    fn header() -> BlockHeader {
        BlockHeader::builder()
            .miner_address(Address::new_id(100))
            .epoch(22)
            .timestamp(1_662_000_000)
            .parent_base_fee(TokenAmount::from(100u8))
            .build()
            .unwrap()
    }

    #[test]
    fn header_roundtrip_preserves_cid() {
        let h = header();
        let bz = h.marshal_cbor().unwrap();
        let back: BlockHeader = from_slice(&bz).unwrap();
        assert_eq!(back, h);
        assert_eq!(back.cid().unwrap(), h.cid().unwrap());
    }

    #[test]
    fn distinct_headers_have_distinct_cids() {
        let a = header();
        let b = BlockHeader::builder()
            .miner_address(Address::new_id(101))
            .build()
            .unwrap();
        assert_ne!(a.cid().unwrap(), b.cid().unwrap());
    }
}

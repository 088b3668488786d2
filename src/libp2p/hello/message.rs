// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use num_bigint::BigUint;

use crate::bigint::biguint_ser;
use crate::blocks::ChainEpoch;
use crate::encoding::tuple::*;

/// Handshake sent to every newly connected peer, naming the sender's view
/// of the chain.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct HelloRequest {
    pub heaviest_tip_set: Vec<Cid>,
    pub heaviest_tipset_height: ChainEpoch,
    #[serde(with = "biguint_ser")]
    pub heaviest_tipset_weight: BigUint,
    pub genesis_cid: Cid,
}

/// Response to a Hello.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct HelloResponse {
    /// Time of arrival in unix nanoseconds.
    pub arrival: i64,
    /// Time sent in unix nanoseconds.
    pub sent: i64,
}

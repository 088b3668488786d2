// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod gossip_block;
mod header;
mod ticket;
mod tipset;

pub use self::errors::Error;
pub use self::gossip_block::GossipBlock;
pub use self::header::{BlockHeader, BlockHeaderBuilder};
pub use self::ticket::{BeaconEntry, ElectionProof, PoStProof, Ticket};
pub use self::tipset::{Tipset, TipsetKeys};

/// The height of a block in the chain.
pub type ChainEpoch = i64;

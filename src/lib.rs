// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Lantern is a light-client library for a Filecoin-compatible network.
//!
//! An untrusted peer can participate in the chain without running a full
//! node: it follows gossiped blocks and messages, signs and publishes
//! transactions, and retrieves selected pieces of on-chain state from peers
//! through verifiable content-addressed traversal.

pub mod address;
pub mod bigint;
pub mod blocks;
pub mod blockstore;
pub mod client;
pub mod crypto;
pub mod encoding;
pub mod ipld;
pub mod ipld_amt;
pub mod ipld_hamt;
pub mod key_management;
pub mod libp2p;
pub mod message;
pub mod state_tree;
pub mod utils;

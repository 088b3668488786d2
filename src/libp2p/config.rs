// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::Multiaddr;
use serde::Deserialize;

use super::GossipParams;

/// Libp2p config for the light client.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Libp2pConfig {
    /// Local address.
    pub listening_multiaddr: Multiaddr,
    /// Bootstrap peer list.
    pub bootstrap_peers: Vec<Multiaddr>,
    /// Target peer count.
    pub target_peer_count: u32,
    /// Gossip scoring parameters.
    #[serde(skip)]
    pub gossip_params: GossipParams,
}

impl Default for Libp2pConfig {
    fn default() -> Self {
        Self {
            listening_multiaddr: "/ip4/0.0.0.0/tcp/0"
                .parse()
                .expect("static multiaddr is valid"),
            bootstrap_peers: vec![],
            target_peer_count: 75,
            gossip_params: GossipParams::default(),
        }
    }
}

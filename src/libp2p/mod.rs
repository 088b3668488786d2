// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod chain_exchange;
mod config;
mod gossip_params;
pub mod hello;
pub mod rpc;
mod service;

mod behaviour;

pub use self::behaviour::{LanternBehaviour, LanternBehaviourEvent};
pub use self::config::Libp2pConfig;
pub use self::gossip_params::GossipParams;
pub use self::service::{
    blocks_topic, messages_topic, build_transport, Libp2pService, NetworkEvent, NetworkMessage,
    PubsubMessage, PUBSUB_BLOCK_STR, PUBSUB_MSG_STR,
};

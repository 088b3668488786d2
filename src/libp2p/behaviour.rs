// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::anyhow;
use libp2p::gossipsub::{
    Gossipsub, GossipsubConfigBuilder, GossipsubMessage, IdentTopic as Topic, MessageAuthenticity,
    MessageId, PublishError, SubscriptionError, ValidationMode,
};
use libp2p::identity::Keypair;
use libp2p::ping;
use libp2p::request_response::{ProtocolSupport, RequestResponse, RequestResponseConfig};
use libp2p::NetworkBehaviour;

use super::chain_exchange::{ChainExchangeCodec, ChainExchangeProtocolName};
use super::hello::{HelloCodec, HelloProtocolName};
use super::Libp2pConfig;
use crate::encoding::blake2b_256;

/// Libp2p behaviour for the light client: gossip over the chain topics plus
/// the hello and chain-exchange request-response protocols.
#[derive(NetworkBehaviour)]
pub struct LanternBehaviour {
    pub(super) gossipsub: Gossipsub,
    pub(super) hello: RequestResponse<HelloCodec>,
    pub(super) chain_exchange: RequestResponse<ChainExchangeCodec>,
    ping: ping::Behaviour,
}

impl LanternBehaviour {
    pub fn new(
        local_key: &Keypair,
        config: &Libp2pConfig,
        network_name: &str,
    ) -> anyhow::Result<Self> {
        let mut gs_config_builder = GossipsubConfigBuilder::default();
        gs_config_builder.max_transmit_size(1 << 20);
        gs_config_builder.validation_mode(ValidationMode::Strict);
        gs_config_builder.message_id_fn(|msg: &GossipsubMessage| {
            let s = blake2b_256(&msg.data);
            MessageId::from(s.to_vec())
        });

        let gossipsub_config = gs_config_builder.build().map_err(|e| anyhow!(e))?;
        let mut gossipsub = Gossipsub::new(
            MessageAuthenticity::Signed(local_key.clone()),
            gossipsub_config,
        )
        .map_err(|e| anyhow!(e))?;

        gossipsub
            .with_peer_score(
                config.gossip_params.build_peer_score_params(network_name),
                config.gossip_params.build_peer_score_threshold(),
            )
            .map_err(|e| anyhow!(e))?;

        Ok(LanternBehaviour {
            gossipsub,
            hello: RequestResponse::new(
                HelloCodec::default(),
                std::iter::once((HelloProtocolName, ProtocolSupport::Full)),
                RequestResponseConfig::default(),
            ),
            chain_exchange: RequestResponse::new(
                ChainExchangeCodec::default(),
                std::iter::once((ChainExchangeProtocolName, ProtocolSupport::Full)),
                RequestResponseConfig::default(),
            ),
            ping: Default::default(),
        })
    }

    /// Publish data over the gossip network.
    pub fn publish(
        &mut self,
        topic: Topic,
        data: impl Into<Vec<u8>>,
    ) -> Result<MessageId, PublishError> {
        self.gossipsub.publish(topic, data)
    }

    /// Subscribe to a gossip topic.
    pub fn subscribe(&mut self, topic: &Topic) -> Result<bool, SubscriptionError> {
        self.gossipsub.subscribe(topic)
    }
}

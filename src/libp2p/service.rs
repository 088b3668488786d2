// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cid::Cid;
use futures::channel::oneshot::Sender as OneShotSender;
use futures::select;
use futures_util::stream::StreamExt;
use libp2p::gossipsub::GossipsubEvent;
pub use libp2p::gossipsub::IdentTopic;
use libp2p::request_response::{
    RequestId, RequestResponseEvent, RequestResponseMessage,
};
use libp2p::{
    core,
    core::muxing::StreamMuxerBox,
    core::transport::Boxed,
    identity::Keypair,
    mplex, noise,
    swarm::{ConnectionLimits, SwarmBuilder, SwarmEvent},
    yamux, Multiaddr, PeerId, Swarm, Transport,
};
use log::{debug, error, trace, warn};

use super::chain_exchange::{
    ChainExchangeRequest, ChainExchangeResponse, ChainExchangeResponseStatus,
};
use super::hello::{HelloRequest, HelloResponse};
use super::rpc::RequestResponseError;
use super::{Libp2pConfig, LanternBehaviour, LanternBehaviourEvent};
use crate::blocks::GossipBlock;
use crate::encoding::from_slice;
use crate::message::SignedMessage;

/// Gossipsub blocks topic identifier.
pub const PUBSUB_BLOCK_STR: &str = "/fil/blocks";
/// Gossipsub messages topic identifier.
pub const PUBSUB_MSG_STR: &str = "/fil/msgs";

/// Blocks topic for a network name.
pub fn blocks_topic(network_name: &str) -> IdentTopic {
    IdentTopic::new(format!("{}/{}", PUBSUB_BLOCK_STR, network_name))
}

/// Messages topic for a network name.
pub fn messages_topic(network_name: &str) -> IdentTopic {
    IdentTopic::new(format!("{}/{}", PUBSUB_MSG_STR, network_name))
}

/// Events emitted by this service to its consumer.
#[allow(clippy::large_enum_variant)]
#[derive(Debug)]
pub enum NetworkEvent {
    PubsubMessage {
        source: PeerId,
        message: PubsubMessage,
    },
    HelloRequestInbound {
        source: PeerId,
    },
    HelloResponseOutbound {
        source: PeerId,
        request: HelloRequest,
    },
    HelloRequestOutbound {
        request_id: RequestId,
    },
    HelloResponseInbound {
        request_id: RequestId,
    },
    ChainExchangeRequestOutbound {
        request_id: RequestId,
    },
    ChainExchangeResponseInbound {
        request_id: RequestId,
    },
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
}

/// Message types that can come over the gossip network.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum PubsubMessage {
    /// Messages that come over the block topic.
    Block(GossipBlock),
    /// Messages that come over the message topic.
    Message(SignedMessage),
}

/// Messages into the service to handle.
#[derive(Debug)]
pub enum NetworkMessage {
    PubsubMessage {
        topic: IdentTopic,
        message: Vec<u8>,
    },
    HelloRequest {
        peer_id: PeerId,
        request: HelloRequest,
        response_channel: OneShotSender<Result<HelloResponse, RequestResponseError>>,
    },
    ChainExchangeRequest {
        peer_id: PeerId,
        request: ChainExchangeRequest,
        response_channel: OneShotSender<Result<ChainExchangeResponse, RequestResponseError>>,
    },
    Dial {
        addr: Multiaddr,
    },
}

/// The `Libp2pService` drives the swarm and bridges it to the client over
/// flume channels. The listener side must never block the gossip
/// dispatcher; heavy work belongs on the consumer side of the event
/// channel.
pub struct Libp2pService {
    config: Libp2pConfig,
    swarm: Swarm<LanternBehaviour>,
    network_receiver_in: flume::Receiver<NetworkMessage>,
    network_sender_in: flume::Sender<NetworkMessage>,
    network_receiver_out: flume::Receiver<NetworkEvent>,
    network_sender_out: flume::Sender<NetworkEvent>,
    network_name: String,
    genesis_cid: Cid,
}

impl Libp2pService {
    pub fn new(
        config: Libp2pConfig,
        net_keypair: Keypair,
        network_name: &str,
        genesis_cid: Cid,
    ) -> anyhow::Result<Self> {
        let peer_id = PeerId::from(net_keypair.public());

        let transport = build_transport(net_keypair.clone());

        let limits = ConnectionLimits::default()
            .with_max_pending_incoming(Some(10))
            .with_max_pending_outgoing(Some(30))
            .with_max_established_incoming(Some(config.target_peer_count))
            .with_max_established_outgoing(Some(config.target_peer_count))
            .with_max_established_per_peer(Some(5));

        let behaviour = LanternBehaviour::new(&net_keypair, &config, network_name)?;
        let mut swarm = SwarmBuilder::with_tokio_executor(transport, behaviour, peer_id)
            .connection_limits(limits)
            .build();

        // Subscribe to gossipsub topics with the network name suffix.
        for topic in [blocks_topic(network_name), messages_topic(network_name)] {
            swarm.behaviour_mut().subscribe(&topic).map_err(|e| {
                anyhow::anyhow!("could not subscribe to topic {}: {:?}", topic, e)
            })?;
        }

        let (network_sender_in, network_receiver_in) = flume::unbounded();
        let (network_sender_out, network_receiver_out) = flume::unbounded();

        Ok(Libp2pService {
            config,
            swarm,
            network_receiver_in,
            network_sender_in,
            network_receiver_out,
            network_sender_out,
            network_name: network_name.into(),
            genesis_cid,
        })
    }

    /// Starts the libp2p service networking stack. This future resolves
    /// when shutdown occurs.
    pub async fn run(mut self) -> anyhow::Result<()> {
        log::info!("Running libp2p service");
        Swarm::listen_on(&mut self.swarm, self.config.listening_multiaddr.clone())?;

        for addr in &self.config.bootstrap_peers {
            if let Err(e) = Swarm::dial(&mut self.swarm, addr.clone()) {
                warn!("Failed to dial bootstrap peer {}: {}", addr, e);
            }
        }

        let mut swarm_stream = self.swarm.fuse();
        let mut network_stream = self.network_receiver_in.stream().fuse();

        let mut hello_request_table = HashMap::new();
        let mut cx_request_table = HashMap::new();

        loop {
            select! {
                swarm_event = swarm_stream.next() => match swarm_event {
                    Some(SwarmEvent::Behaviour(event)) => {
                        handle_behaviour_event(
                            swarm_stream.get_mut(),
                            event,
                            &self.genesis_cid,
                            &self.network_sender_out,
                            &mut hello_request_table,
                            &mut cx_request_table,
                        ).await;
                    },
                    Some(SwarmEvent::ConnectionEstablished { peer_id, num_established, .. }) => {
                        if num_established.get() == 1 {
                            emit_event(&self.network_sender_out, NetworkEvent::PeerConnected(peer_id)).await;
                        }
                    },
                    Some(SwarmEvent::ConnectionClosed { peer_id, num_established, .. }) => {
                        if num_established == 0 {
                            emit_event(&self.network_sender_out, NetworkEvent::PeerDisconnected(peer_id)).await;
                        }
                    },
                    None => { break; },
                    _ => { },
                },
                rpc_message = network_stream.next() => match rpc_message {
                    Some(message) => {
                        handle_network_message(
                            swarm_stream.get_mut(),
                            message,
                            &self.network_sender_out,
                            &mut hello_request_table,
                            &mut cx_request_table,
                        ).await;
                    }
                    None => { break; }
                },
            };
        }
        Ok(())
    }

    /// Returns a sender which allows sending messages to the libp2p
    /// service.
    pub fn network_sender(&self) -> flume::Sender<NetworkMessage> {
        self.network_sender_in.clone()
    }

    /// Returns a receiver to listen to network events emitted from the
    /// service.
    pub fn network_receiver(&self) -> flume::Receiver<NetworkEvent> {
        self.network_receiver_out.clone()
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn peer_id(&self) -> &PeerId {
        Swarm::local_peer_id(&self.swarm)
    }
}

async fn handle_network_message(
    swarm: &mut Swarm<LanternBehaviour>,
    message: NetworkMessage,
    network_sender_out: &flume::Sender<NetworkEvent>,
    hello_request_table: &mut HashMap<
        RequestId,
        OneShotSender<Result<HelloResponse, RequestResponseError>>,
    >,
    cx_request_table: &mut HashMap<
        RequestId,
        OneShotSender<Result<ChainExchangeResponse, RequestResponseError>>,
    >,
) {
    match message {
        NetworkMessage::PubsubMessage { topic, message } => {
            if let Err(e) = swarm.behaviour_mut().publish(topic, message) {
                warn!("Failed to send gossipsub message: {:?}", e);
            }
        }
        NetworkMessage::HelloRequest {
            peer_id,
            request,
            response_channel,
        } => {
            let request_id = swarm.behaviour_mut().hello.send_request(&peer_id, request);
            hello_request_table.insert(request_id, response_channel);
            emit_event(
                network_sender_out,
                NetworkEvent::HelloRequestOutbound { request_id },
            )
            .await;
        }
        NetworkMessage::ChainExchangeRequest {
            peer_id,
            request,
            response_channel,
        } => {
            let request_id = swarm
                .behaviour_mut()
                .chain_exchange
                .send_request(&peer_id, request);
            cx_request_table.insert(request_id, response_channel);
            emit_event(
                network_sender_out,
                NetworkEvent::ChainExchangeRequestOutbound { request_id },
            )
            .await;
        }
        NetworkMessage::Dial { addr } => {
            if let Err(e) = Swarm::dial(swarm, addr.clone()) {
                warn!("Failed to dial {}: {}", addr, e);
            }
        }
    }
}

async fn handle_behaviour_event(
    swarm: &mut Swarm<LanternBehaviour>,
    event: LanternBehaviourEvent,
    genesis_cid: &Cid,
    network_sender_out: &flume::Sender<NetworkEvent>,
    hello_request_table: &mut HashMap<
        RequestId,
        OneShotSender<Result<HelloResponse, RequestResponseError>>,
    >,
    cx_request_table: &mut HashMap<
        RequestId,
        OneShotSender<Result<ChainExchangeResponse, RequestResponseError>>,
    >,
) {
    match event {
        LanternBehaviourEvent::Gossipsub(e) => {
            if let GossipsubEvent::Message {
                propagation_source: source,
                message,
                message_id: _,
            } = e
            {
                let topic = message.topic.as_str();
                let message = message.data;
                trace!("Got a Gossip Message from {:?}", source);
                if topic.starts_with(PUBSUB_BLOCK_STR) {
                    match from_slice::<GossipBlock>(&message) {
                        Ok(b) => {
                            emit_event(
                                network_sender_out,
                                NetworkEvent::PubsubMessage {
                                    source,
                                    message: PubsubMessage::Block(b),
                                },
                            )
                            .await;
                        }
                        Err(e) => {
                            warn!("Gossip block from peer {source:?} could not be deserialized: {e}");
                        }
                    }
                } else if topic.starts_with(PUBSUB_MSG_STR) {
                    match from_slice::<SignedMessage>(&message) {
                        Ok(m) => {
                            emit_event(
                                network_sender_out,
                                NetworkEvent::PubsubMessage {
                                    source,
                                    message: PubsubMessage::Message(m),
                                },
                            )
                            .await;
                        }
                        Err(e) => {
                            warn!("Gossip message from peer {source:?} could not be deserialized: {e}");
                        }
                    }
                } else {
                    warn!("Getting gossip messages from unknown topic: {topic}");
                }
            }
        }
        LanternBehaviourEvent::Hello(rr_event) => match rr_event {
            RequestResponseEvent::Message { peer, message } => match message {
                RequestResponseMessage::Request {
                    request,
                    channel,
                    request_id: _,
                } => {
                    emit_event(
                        network_sender_out,
                        NetworkEvent::HelloRequestInbound { source: peer },
                    )
                    .await;

                    let arrival = unix_nanos();

                    trace!("Received hello request: {:?}", request);
                    if &request.genesis_cid != genesis_cid {
                        warn!(
                            "Genesis hash mismatch: {} received, {genesis_cid} expected. Banning {peer}",
                            request.genesis_cid
                        );
                        swarm.ban_peer_id(peer);
                    } else {
                        let sent = unix_nanos();

                        // Send the response immediately; no need for the
                        // overhead of a channel round-trip here.
                        if let Err(e) = swarm
                            .behaviour_mut()
                            .hello
                            .send_response(channel, HelloResponse { arrival, sent })
                        {
                            warn!("Failed to send HelloResponse: {e:?}");
                        } else {
                            emit_event(
                                network_sender_out,
                                NetworkEvent::HelloResponseOutbound {
                                    source: peer,
                                    request,
                                },
                            )
                            .await;
                        }
                    }
                }
                RequestResponseMessage::Response {
                    request_id,
                    response,
                } => {
                    if let Some(tx) = hello_request_table.remove(&request_id) {
                        if tx.send(Ok(response)).is_err() {
                            warn!("RPCResponse receive timed out");
                        } else {
                            emit_event(
                                network_sender_out,
                                NetworkEvent::HelloResponseInbound { request_id },
                            )
                            .await;
                        }
                    } else {
                        warn!("RPCResponse receive failed: channel not found");
                    };
                }
            },
            RequestResponseEvent::OutboundFailure {
                peer,
                request_id,
                error,
            } => {
                debug!(
                    "Hello outbound error (peer: {:?}) (id: {:?}): {:?}",
                    peer, request_id, error
                );

                if let Some(tx) = hello_request_table.remove(&request_id) {
                    if tx.send(Err(error.into())).is_err() {
                        warn!("RPCResponse receive failed");
                    }
                }
            }
            RequestResponseEvent::InboundFailure {
                peer,
                error,
                request_id: _,
            } => {
                debug!("Hello inbound error (peer: {:?}): {:?}", peer, error);
            }
            RequestResponseEvent::ResponseSent { .. } => (),
        },
        LanternBehaviourEvent::ChainExchange(ce_event) => match ce_event {
            RequestResponseEvent::Message { peer, message } => match message {
                RequestResponseMessage::Request {
                    channel,
                    request_id: _,
                    request: _,
                } => {
                    // The light client holds no chain data to serve.
                    trace!("Received chain exchange request from {peer:?}");
                    let response = ChainExchangeResponse {
                        status: ChainExchangeResponseStatus::GoAway,
                        message: "Peer does not serve chain data".into(),
                        chain: vec![],
                    };
                    if let Err(e) = swarm
                        .behaviour_mut()
                        .chain_exchange
                        .send_response(channel, response)
                    {
                        warn!("Failed to send ChainExchangeResponse: {e:?}");
                    }
                }
                RequestResponseMessage::Response {
                    request_id,
                    response,
                } => {
                    emit_event(
                        network_sender_out,
                        NetworkEvent::ChainExchangeResponseInbound { request_id },
                    )
                    .await;
                    if let Some(tx) = cx_request_table.remove(&request_id) {
                        if tx.send(Ok(response)).is_err() {
                            warn!("RPCResponse receive timed out");
                        }
                    } else {
                        warn!("RPCResponse receive failed: channel not found");
                    };
                }
            },
            RequestResponseEvent::OutboundFailure {
                peer,
                request_id,
                error,
            } => {
                warn!(
                    "ChainExchange outbound error (peer: {:?}) (id: {:?}): {:?}",
                    peer, request_id, error
                );

                if let Some(tx) = cx_request_table.remove(&request_id) {
                    if tx.send(Err(error.into())).is_err() {
                        warn!("RPCResponse receive failed");
                    }
                }
            }
            RequestResponseEvent::InboundFailure {
                peer,
                error,
                request_id: _,
            } => {
                debug!("ChainExchange inbound error (peer: {:?}): {:?}", peer, error);
            }
            RequestResponseEvent::ResponseSent { .. } => (),
        },
        LanternBehaviourEvent::Ping(ping_event) => match ping_event.result {
            Ok(libp2p::ping::Success::Ping { rtt }) => {
                trace!(
                    "PingSuccess::Ping rtt to {} is {} ms",
                    ping_event.peer.to_base58(),
                    rtt.as_millis()
                );
            }
            Ok(libp2p::ping::Success::Pong) => {
                trace!("PingSuccess::Pong from {}", ping_event.peer.to_base58());
            }
            Err(err) => {
                debug!("Ping failure from {}: {}", ping_event.peer.to_base58(), err);
            }
        },
    }
}

async fn emit_event(sender: &flume::Sender<NetworkEvent>, event: NetworkEvent) {
    if sender.send_async(event).await.is_err() {
        error!("Failed to emit event: Network channel receiver has been dropped");
    }
}

fn unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as i64
}

/// Builds the transport stack that libp2p will communicate over.
pub fn build_transport(local_key: Keypair) -> Boxed<(PeerId, StreamMuxerBox)> {
    let tcp_transport =
        || libp2p::tcp::tokio::Transport::new(libp2p::tcp::Config::new().nodelay(true));
    let transport =
        libp2p::dns::TokioDnsConfig::system(tcp_transport()).expect("system dns resolver");
    let auth_config = {
        let dh_keys = noise::Keypair::<noise::X25519Spec>::new()
            .into_authentic(&local_key)
            .expect("Noise key generation failed");

        noise::NoiseConfig::xx(dh_keys).into_authenticated()
    };

    let mplex_config = {
        let mut mplex_config = mplex::MplexConfig::new();
        mplex_config.set_max_buffer_size(usize::MAX);

        let mut yamux_config = yamux::YamuxConfig::default();
        yamux_config.set_max_buffer_size(16 * 1024 * 1024);
        yamux_config.set_receive_window_size(16 * 1024 * 1024);
        core::upgrade::SelectUpgrade::new(yamux_config, mplex_config)
    };

    transport
        .upgrade(core::upgrade::Version::V1)
        .authenticate(auth_config)
        .multiplex(mplex_config)
        .timeout(Duration::from_secs(20))
        .boxed()
}

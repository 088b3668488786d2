// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! The client orchestrator: owns the pub/sub session, the key store, the
//! nonce tracker and the cached head, and drives message publication and
//! wait-for-inclusion against the network collaborators.

mod errors;
mod graph_exchange;
mod nonce;

pub use self::errors::Error;
pub use self::graph_exchange::GraphExchange;
pub use self::nonce::NonceTracker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use cid::Cid;
use libp2p::PeerId;
use log::{debug, trace, warn};
use tokio_util::sync::CancellationToken;

use crate::address::Address;
use crate::blocks::{BlockHeader, GossipBlock};
use crate::blockstore::BlockStore;
use crate::crypto::{Signature, Signer};
use crate::encoding::Cbor;
use crate::ipld::selector::{actor_state_selector, explore_all_recursive};
use crate::ipld::{from_ipld, Ipld, ReifierRegistry};
use crate::ipld_amt::Amtv0;
use crate::key_management::{wallet_helpers, Key, KeyInfo, KeyStore};
use crate::libp2p::chain_exchange::{ChainExchangeRequest, TipsetBundle, HEADERS, MESSAGES};
use crate::libp2p::hello::HelloRequest;
use crate::libp2p::{messages_topic, NetworkEvent, NetworkMessage, PubsubMessage};
use crate::message::{MessageReceipt, SignedMessage, UnsignedMessage};
use crate::state_tree::ActorState;

/// Number of observed blocks after which a pushed message is considered not
/// included.
const MESSAGE_INCLUSION_HORIZON: u64 = 6;

type Subscribers = Arc<Mutex<HashMap<usize, flume::Sender<(PeerId, GossipBlock)>>>>;

/// A cancellable handle on the stream of gossiped blocks. Dropping the
/// handle or calling [`BlockSubscription::cancel`] detaches the listener.
pub struct BlockSubscription {
    id: usize,
    receiver: flume::Receiver<(PeerId, GossipBlock)>,
    subscribers: Subscribers,
}

impl BlockSubscription {
    /// Wait for the next gossiped block and its propagation source.
    pub async fn recv(&self) -> Result<(PeerId, GossipBlock), Error> {
        self.receiver
            .recv_async()
            .await
            .map_err(|_| Error::Network("block listener stopped".into()))
    }

    /// Detach this subscription from the dispatcher.
    pub fn cancel(self) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.remove(&self.id);
        }
    }
}

/// Signs with a single resolved key; the orchestrator constructs one per
/// push after default-key selection.
struct KeySigner {
    key: Key,
}

impl Signer for KeySigner {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> anyhow::Result<Signature> {
        if address != &self.key.address {
            anyhow::bail!("no key loaded for address {}", address);
        }
        Ok(wallet_helpers::sign(
            *self.key.key_info.key_type(),
            self.key.key_info.private_key(),
            data,
        )?)
    }
}

/// The light client. Observes gossiped blocks, publishes signed messages,
/// and reads partial state through the graph-exchange collaborator.
pub struct LightClient<BS, GX> {
    store: Arc<BS>,
    graph_exchange: GX,
    network_sender: flume::Sender<NetworkMessage>,
    network_name: String,
    genesis_cid: Cid,
    keystore: RwLock<KeyStore>,
    nonce_tracker: NonceTracker,
    head: RwLock<Option<BlockHeader>>,
    subscribers: Subscribers,
    next_sub_id: AtomicUsize,
    reifiers: ReifierRegistry<Arc<BS>>,
}

impl<BS, GX> LightClient<BS, GX>
where
    BS: BlockStore + Send + Sync + 'static,
    GX: GraphExchange + 'static,
{
    pub fn new(
        store: Arc<BS>,
        graph_exchange: GX,
        network_sender: flume::Sender<NetworkMessage>,
        network_name: &str,
        genesis_cid: Cid,
    ) -> Self {
        Self {
            store,
            graph_exchange,
            network_sender,
            network_name: network_name.to_string(),
            genesis_cid,
            keystore: RwLock::new(KeyStore::new()),
            nonce_tracker: NonceTracker::new(),
            head: RwLock::new(None),
            subscribers: Default::default(),
            next_sub_id: AtomicUsize::new(0),
            reifiers: ReifierRegistry::default(),
        }
    }

    /// Spawns the network event listener. The listener updates the cached
    /// head and fans blocks out to subscribers; it never blocks the gossip
    /// dispatcher, so heavy work stays with the subscribers.
    pub fn spawn_listener(
        self: Arc<Self>,
        events: flume::Receiver<NetworkEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let client = self;
        tokio::spawn(async move {
            while let Ok(event) = events.recv_async().await {
                match event {
                    NetworkEvent::PubsubMessage {
                        source,
                        message: PubsubMessage::Block(block),
                    } => client.deliver_block(source, block),
                    NetworkEvent::PeerConnected(peer) => client.greet_peer(peer).await,
                    _ => {}
                }
            }
            trace!("network event channel closed, listener exiting");
        })
    }

    /// Handle a gossiped block: replace the head (last-write-wins) and fan
    /// out to subscribers. Dead subscriptions are detached here.
    fn deliver_block(&self, source: PeerId, block: GossipBlock) {
        match block.cid() {
            Ok(cid) => debug!("new head candidate {} from {}", cid, source),
            Err(e) => {
                warn!("dropping gossiped block with unhashable header: {}", e);
                return;
            }
        }

        if let Ok(mut head) = self.head.write() {
            *head = Some(block.header.clone());
        }

        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|_, tx| tx.send((source, block.clone())).is_ok());
        }
    }

    /// Sends the hello handshake to a newly connected peer, naming our view
    /// of the chain.
    async fn greet_peer(&self, peer: PeerId) {
        let request = {
            let head = self.head.read().ok().and_then(|h| h.clone());
            match head {
                Some(header) => HelloRequest {
                    heaviest_tip_set: header.cid().map(|c| vec![*c]).unwrap_or_default(),
                    heaviest_tipset_height: header.epoch(),
                    heaviest_tipset_weight: header.weight().clone(),
                    genesis_cid: self.genesis_cid,
                },
                None => HelloRequest {
                    heaviest_tip_set: vec![self.genesis_cid],
                    genesis_cid: self.genesis_cid,
                    ..Default::default()
                },
            }
        };

        let (tx, rx) = futures::channel::oneshot::channel();
        if self
            .network_sender
            .send_async(NetworkMessage::HelloRequest {
                peer_id: peer,
                request,
                response_channel: tx,
            })
            .await
            .is_err()
        {
            warn!("network service dropped, could not greet {}", peer);
            return;
        }
        tokio::spawn(async move {
            match rx.await {
                Ok(Ok(response)) => trace!("hello response from {}: {:?}", peer, response),
                Ok(Err(e)) => debug!("hello to {} failed: {}", peer, e),
                Err(_) => debug!("hello to {} was dropped", peer),
            }
        });
    }

    /// Imports a key into the process-local key store and returns its
    /// address.
    pub fn import_key(&self, key_info: KeyInfo) -> Result<Address, Error> {
        let key = Key::try_from(key_info)?;
        let address = key.address;
        self.keystore
            .write()
            .map_err(|_| Error::Other("keystore lock poisoned".into()))?
            .put(address.to_string(), key.key_info)?;
        Ok(address)
    }

    /// Subscribe to gossiped blocks. The returned handle must be cancelled
    /// (or dropped) to detach the listener.
    pub fn subscribe_blocks(&self) -> BlockSubscription {
        let (tx, rx) = flume::unbounded();
        let id = self.next_sub_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.insert(id, tx);
        }
        BlockSubscription {
            id,
            receiver: rx,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Returns the cached head if one was observed.
    pub fn head(&self) -> Option<BlockHeader> {
        self.head.read().ok().and_then(|h| h.clone())
    }

    /// Returns the current head, waiting for the next gossiped block when
    /// none has been observed yet.
    pub async fn get_head(&self, token: &CancellationToken) -> Result<BlockHeader, Error> {
        if let Some(header) = self.head() {
            return Ok(header);
        }

        let sub = self.subscribe_blocks();
        let result = tokio::select! {
            _ = token.cancelled() => Err(Error::Cancelled),
            block = sub.recv() => block.map(|(_, b)| b.header),
        };
        sub.cancel();
        result
    }

    /// Signs and publishes a message on the network's message topic,
    /// returning the CID of the signed wire form.
    ///
    /// The sender is the deterministic default key (the lexicographically
    /// first stored address); `from` on the passed message is overwritten.
    /// A zero `sequence` is assigned from the nonce tracker, and gas fields
    /// left unset are estimated from the current head's parent base fee.
    pub async fn push_message(
        &self,
        mut msg: UnsignedMessage,
        token: &CancellationToken,
    ) -> Result<Cid, Error> {
        let key = self.default_key()?;
        msg.from = key.address;
        msg.sequence = self.nonce_tracker.assign(&key.address, msg.sequence).await;

        let head = self.get_head(token).await?;
        crate::message::gas::estimate_gas(&mut msg, head.parent_base_fee());

        let signer = KeySigner { key };
        let smsg = SignedMessage::new(msg, &signer)?;
        let bytes = smsg.marshal_cbor()?;

        self.network_sender
            .send_async(NetworkMessage::PubsubMessage {
                topic: messages_topic(&self.network_name),
                message: bytes,
            })
            .await
            .map_err(|_| Error::Network("network service dropped".into()))?;

        Ok(smsg.cid()?)
    }

    /// Waits for a pushed message to land on chain and resolves its
    /// receipt.
    ///
    /// Observes gossiped blocks, scanning each secp message list for the
    /// CID. On a hit at index `k` the next block's receipt root is fetched
    /// through graph exchange and the receipt at `k` resolved from the
    /// receipts vector. More than six blocks without a hit fails with
    /// [`Error::NotIncludedOnChain`].
    pub async fn wait_message(
        &self,
        cid: Cid,
        token: &CancellationToken,
    ) -> Result<MessageReceipt, Error> {
        let sub = self.subscribe_blocks();
        let result = self.wait_message_inner(&sub, cid, token).await;
        sub.cancel();
        result
    }

    async fn wait_message_inner(
        &self,
        sub: &BlockSubscription,
        cid: Cid,
        token: &CancellationToken,
    ) -> Result<MessageReceipt, Error> {
        let mut included_at: Option<u64> = None;
        let mut blocks_seen = 0u64;

        loop {
            let (source, block) = tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                block = sub.recv() => block?,
            };

            match included_at {
                None => {
                    if let Some(k) = block.secpk_messages.iter().position(|c| c == &cid) {
                        debug!("message {} included at index {}", cid, k);
                        included_at = Some(k as u64);
                    } else {
                        blocks_seen += 1;
                        if blocks_seen > MESSAGE_INCLUSION_HORIZON {
                            return Err(Error::NotIncludedOnChain);
                        }
                    }
                }
                Some(k) => {
                    // The next block's header carries the receipts root for
                    // the tipset the message executed in.
                    let receipts_root = *block.header.message_receipts();
                    let receipts = self.fetch_receipts(&receipts_root, source, &[k]).await?;
                    return receipts.into_iter().next().ok_or(Error::ReceiptNotFound);
                }
            }
        }
    }

    /// Fetches receipts at the given indices from a receipts vector rooted
    /// at `root`, pulling the blocks from `peer` through graph exchange.
    /// Absent indices are omitted, not failures.
    pub async fn fetch_receipts(
        &self,
        root: &Cid,
        peer: PeerId,
        indices: &[u64],
    ) -> Result<Vec<MessageReceipt>, Error> {
        self.graph_exchange
            .fetch(peer, *root, explore_all_recursive(10))
            .await
            .map_err(|e| Error::Exchange(e.to_string()))?;

        let amt: Amtv0<MessageReceipt, _> = Amtv0::load(root, Arc::clone(&self.store))?;
        let mut receipts = Vec::with_capacity(indices.len());
        for i in indices {
            if let Some(receipt) = amt.get(*i)? {
                receipts.push(receipt.clone());
            }
        }
        Ok(receipts)
    }

    /// Fetches the state of one actor from a peer: only the trie nodes on
    /// the path from the state root to the actor's leaf are transferred and
    /// touched.
    pub async fn fetch_actor_state(
        &self,
        peer: PeerId,
        state_root: &Cid,
        actor: &Address,
    ) -> Result<Option<ActorState>, Error> {
        let selector = actor_state_selector(actor);
        self.graph_exchange
            .fetch(peer, *state_root, selector.clone())
            .await
            .map_err(|e| Error::Exchange(e.to_string()))?;

        let root_bytes = self
            .store
            .get_bytes(state_root)?
            .ok_or_else(|| Error::Other(format!("state root {} not found", state_root)))?;
        let root: Ipld = crate::encoding::from_slice(&root_bytes)?;

        let mut found = None;
        crate::ipld::selector::walk_matching(
            &root,
            selector,
            &self.store,
            &self.reifiers,
            &mut |node| {
                found = Some(
                    from_ipld::<ActorState>(node.clone())
                        .map_err(|e| anyhow::anyhow!("actor leaf does not match schema: {}", e))?,
                );
                Ok(())
            },
        )
        .map_err(|e| Error::Other(e.to_string()))?;

        Ok(found)
    }

    /// Requests a range of tipsets from a peer over the chain-exchange
    /// protocol. Any response status other than ok or partial fails with
    /// the protocol error string.
    pub async fn chain_exchange_request(
        &self,
        peer: PeerId,
        start: Vec<Cid>,
        request_len: u64,
    ) -> Result<Vec<TipsetBundle>, Error> {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.network_sender
            .send_async(NetworkMessage::ChainExchangeRequest {
                peer_id: peer,
                request: ChainExchangeRequest {
                    start,
                    request_len,
                    options: HEADERS | MESSAGES,
                },
                response_channel: tx,
            })
            .await
            .map_err(|_| Error::Network("network service dropped".into()))?;

        let response = rx
            .await
            .map_err(|_| Error::Network("chain exchange response dropped".into()))?
            .map_err(|e| Error::Network(e.to_string()))?;

        response.into_result().map_err(Error::ChainExchange)
    }

    fn default_key(&self) -> Result<Key, Error> {
        let keystore = self
            .keystore
            .read()
            .map_err(|_| Error::Other("keystore lock poisoned".into()))?;
        let mut addresses = keystore.list();
        if addresses.is_empty() {
            return Err(crate::key_management::Error::NoKeys.into());
        }
        addresses.sort();
        let key_info = keystore.get(&addresses[0])?;
        Ok(Key::try_from(key_info)?)
    }
}

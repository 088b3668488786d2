// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Orchestrator flows against mocked network collaborators: push, wait for
//! inclusion, receipt resolution, nonce progression and cancellation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cid::multihash::Code;
use cid::Cid;
use lantern::address::Address;
use lantern::blocks::{BlockHeader, GossipBlock};
use lantern::blockstore::{BlockStore, MemoryDB};
use lantern::client::{Error, GraphExchange, LightClient};
use lantern::crypto::SignatureType;
use lantern::encoding::Cbor;
use lantern::ipld::Selector;
use lantern::ipld_amt::Amtv0;
use lantern::key_management::KeyInfo;
use lantern::libp2p::chain_exchange::{
    ChainExchangeResponse, ChainExchangeResponseStatus,
};
use lantern::libp2p::{NetworkEvent, NetworkMessage, PubsubMessage};
use lantern::message::{ExitCode, MessageReceipt, SignedMessage, TokenAmount, UnsignedMessage};
use lantern::utils::cid::new_from_cbor;
use libp2p::PeerId;
use tokio_util::sync::CancellationToken;

const PRIVATE_KEY_B64: &str = "8EkrelmXXqGwOqnSzPK19VPNo8X2ibvap2sVcF5AZtg=";

/// Mock transport for partial-state queries: draining a request copies the
/// peer's blocks into the client store.
struct MockGraphExchange {
    remote: Arc<MemoryDB>,
    local: Arc<MemoryDB>,
    requests: std::sync::Mutex<Vec<(PeerId, Cid)>>,
}

#[async_trait]
impl GraphExchange for MockGraphExchange {
    async fn fetch(&self, peer: PeerId, root: Cid, _selector: Selector) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push((peer, root));
        for (cid, bytes) in self.remote.entries() {
            self.local.put_keyed(&cid, &bytes)?;
        }
        Ok(())
    }
}

struct Harness {
    client: Arc<LightClient<MemoryDB, MockGraphExchange>>,
    events: flume::Sender<NetworkEvent>,
    published: flume::Receiver<Vec<u8>>,
    remote: Arc<MemoryDB>,
    peer: PeerId,
}

fn genesis_cid() -> Cid {
    new_from_cbor(b"genesis", Code::Blake2b256)
}

fn harness() -> Harness {
    let store = Arc::new(MemoryDB::default());
    let remote = Arc::new(MemoryDB::default());
    let graphx = MockGraphExchange {
        remote: Arc::clone(&remote),
        local: Arc::clone(&store),
        requests: Default::default(),
    };

    let (network_sender, network_receiver) = flume::unbounded();
    let (event_sender, event_receiver) = flume::unbounded();
    let (published_tx, published_rx) = flume::unbounded();

    // Fake service loop: captures published gossip payloads and answers
    // chain exchange with an empty success.
    tokio::spawn(async move {
        while let Ok(msg) = network_receiver.recv_async().await {
            match msg {
                NetworkMessage::PubsubMessage { message, .. } => {
                    let _ = published_tx.send(message);
                }
                NetworkMessage::ChainExchangeRequest {
                    response_channel, ..
                } => {
                    let _ = response_channel.send(Ok(ChainExchangeResponse {
                        status: ChainExchangeResponseStatus::Success,
                        message: "Success".into(),
                        chain: vec![],
                    }));
                }
                NetworkMessage::HelloRequest {
                    response_channel, ..
                } => {
                    drop(response_channel);
                }
                NetworkMessage::Dial { .. } => {}
            }
        }
    });

    let client = Arc::new(LightClient::new(
        store,
        graphx,
        network_sender,
        "unit",
        genesis_cid(),
    ));
    Arc::clone(&client).spawn_listener(event_receiver);

    Harness {
        client,
        events: event_sender,
        published: published_rx,
        remote,
        peer: PeerId::random(),
    }
}

fn header(miner: u64) -> BlockHeader {
    BlockHeader::builder()
        .miner_address(Address::new_id(miner))
        .epoch(miner as i64)
        .parent_base_fee(TokenAmount::from(100u8))
        .build()
        .unwrap()
}

fn block(miner: u64, secpk_messages: Vec<Cid>) -> GossipBlock {
    GossipBlock {
        header: header(miner),
        bls_messages: vec![],
        secpk_messages,
    }
}

async fn deliver(h: &Harness, block: GossipBlock) {
    h.events
        .send_async(NetworkEvent::PubsubMessage {
            source: h.peer,
            message: PubsubMessage::Block(block),
        })
        .await
        .unwrap();
}

async fn wait_for_head(h: &Harness) {
    for _ in 0..100 {
        if h.client.head().is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("head never observed");
}

fn import_test_key(h: &Harness) -> Address {
    let info = KeyInfo::new(
        SignatureType::Secp256k1,
        base64::decode(PRIVATE_KEY_B64).unwrap(),
    );
    h.client.import_key(info).unwrap()
}

fn message_to(to: u64) -> UnsignedMessage {
    UnsignedMessage::builder()
        .to(Address::new_id(to))
        .from(Address::new_id(0))
        .value(TokenAmount::from(7u8))
        .build()
        .unwrap()
}

#[tokio::test]
async fn push_message_fills_signs_and_publishes() {
    let h = harness();
    let addr = import_test_key(&h);

    deliver(&h, block(1, vec![])).await;
    wait_for_head(&h).await;

    let token = CancellationToken::new();
    let cid = h.client.push_message(message_to(99), &token).await.unwrap();

    let bytes = h.published.recv_async().await.unwrap();
    let smsg = SignedMessage::unmarshal_cbor(&bytes).unwrap();

    assert_eq!(smsg.message().from, addr);
    assert_eq!(smsg.message().sequence, 0);
    // Gas estimation filled the unset fields from the head's base fee.
    assert_eq!(smsg.message().gas_limit, 500_000_000);
    assert_eq!(smsg.message().gas_premium, TokenAmount::from(150_000u64));
    assert_eq!(
        smsg.message().gas_fee_cap,
        TokenAmount::from(1054u64 + 150_000)
    );
    smsg.verify().unwrap();
    assert_eq!(smsg.cid().unwrap(), cid);
}

#[tokio::test]
async fn push_message_nonces_are_strictly_increasing() {
    let h = harness();
    import_test_key(&h);

    deliver(&h, block(1, vec![])).await;
    wait_for_head(&h).await;

    let token = CancellationToken::new();
    for expected in 0u64..3 {
        h.client.push_message(message_to(9), &token).await.unwrap();
        let bytes = h.published.recv_async().await.unwrap();
        let smsg = SignedMessage::unmarshal_cbor(&bytes).unwrap();
        assert_eq!(smsg.message().sequence, expected);
    }
}

#[tokio::test]
async fn push_message_requires_a_key() {
    let h = harness();
    deliver(&h, block(1, vec![])).await;
    wait_for_head(&h).await;

    let token = CancellationToken::new();
    let err = h
        .client
        .push_message(message_to(9), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyManagement(_)));
}

#[tokio::test]
async fn wait_message_resolves_receipt_from_next_block() {
    let h = harness();

    let msg_cid = new_from_cbor(b"the-message", Code::Blake2b256);
    let other_cid = new_from_cbor(b"some-other-message", Code::Blake2b256);

    // Receipts vector on the peer side; our message landed at index 1.
    let receipt = MessageReceipt {
        exit_code: ExitCode::OK,
        return_data: vec![0x01, 0x02],
        gas_used: 7_000,
    };
    let mut receipts: Amtv0<MessageReceipt, _> = Amtv0::new(h.remote.as_ref());
    receipts.set(0, MessageReceipt {
        exit_code: ExitCode::OK,
        return_data: vec![],
        gas_used: 1,
    })
    .unwrap();
    receipts.set(1, receipt.clone()).unwrap();
    let receipts_root = receipts.flush().unwrap();

    let waiter = {
        let client = Arc::clone(&h.client);
        let token = CancellationToken::new();
        tokio::spawn(async move { client.wait_message(msg_cid, &token).await })
    };
    // Give the waiter a beat to subscribe before blocks flow.
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A miss, then the inclusion, then the block carrying the receipts root.
    deliver(&h, block(1, vec![other_cid])).await;
    deliver(&h, block(2, vec![other_cid, msg_cid])).await;
    let mut follow_up = block(3, vec![]);
    follow_up.header = BlockHeader::builder()
        .miner_address(Address::new_id(3))
        .message_receipts(receipts_root)
        .parent_base_fee(TokenAmount::from(100u8))
        .build()
        .unwrap();
    deliver(&h, follow_up).await;

    let resolved = waiter.await.unwrap().unwrap();
    assert_eq!(resolved, receipt);
}

#[tokio::test]
async fn wait_message_fails_past_inclusion_horizon() {
    let h = harness();
    let msg_cid = new_from_cbor(b"never-included", Code::Blake2b256);

    let waiter = {
        let client = Arc::clone(&h.client);
        let token = CancellationToken::new();
        tokio::spawn(async move { client.wait_message(msg_cid, &token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    for i in 0..7 {
        deliver(&h, block(i + 1, vec![])).await;
    }

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::NotIncludedOnChain));
}

#[tokio::test]
async fn wait_message_honors_cancellation() {
    let h = harness();
    let msg_cid = new_from_cbor(b"cancelled", Code::Blake2b256);

    let token = CancellationToken::new();
    let waiter = {
        let client = Arc::clone(&h.client);
        let token = token.clone();
        tokio::spawn(async move { client.wait_message(msg_cid, &token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn get_head_waits_for_first_block() {
    let h = harness();

    let getter = {
        let client = Arc::clone(&h.client);
        tokio::spawn(async move { client.get_head(&CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    deliver(&h, block(5, vec![])).await;
    let head = getter.await.unwrap().unwrap();
    assert_eq!(head.epoch(), 5);

    // Cached for subsequent calls.
    assert_eq!(h.client.head().unwrap(), head);
}

#[tokio::test]
async fn chain_exchange_success_status_is_ok() {
    let h = harness();
    let bundles = h
        .client
        .chain_exchange_request(h.peer, vec![genesis_cid()], 5)
        .await
        .unwrap();
    assert!(bundles.is_empty());
}

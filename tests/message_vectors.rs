// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Wallet and message wire vectors shared with other client
//! implementations; the outputs are byte-exact.

use lantern::address::{Address, Network, Protocol};
use lantern::crypto::{Signature, SignatureType, Signer};
use lantern::encoding::Cbor;
use lantern::key_management::{wallet_helpers, Key, KeyInfo};
use lantern::message::{TokenAmount, UnsignedMessage};

/// Test key in multibase form ('M' prefix, base64pad).
const PRIVATE_KEY: &str = "M8EkrelmXXqGwOqnSzPK19VPNo8X2ibvap2sVcF5AZtg=";

const KEY_ADDRESS: &str = "t1izccwid4h3svp5sl2xow6jhuc72qmznv6gkbecq";
const TO_ADDRESS: &str = "t15ihq5ibzwki2b4ep2f46avlkrqzhpqgtga7pdrq";

const MESSAGE_HEX: &str = "8a005501ea0f0ea039b291a0f08fd179e0556a8c3277c0d3550146442b207c3ee557f64bd5dd6f24f417f50665b5182242000c187b4200ea4200ea0640";
const MESSAGE_CID: &str = "bafy2bzaceax4su4dipbrdsnqivh7i57flcprnmpd5u7jlax26geaze6de2eg4";

const SIGNATURE_HEX: &str = "efdbb8ac12e6a4fb427378df7ffc1e6d48fa4f4e2d2956f5e85e2c8bcd5b58e4384f7eaf7cfd5aab62b1f88db7c4f84b1451452d563c50b89ec936447a56b13c01";

fn decode_private_key() -> Vec<u8> {
    // Multibase 'M' selects base64pad.
    base64::decode(&PRIVATE_KEY[1..]).unwrap()
}

fn test_key() -> Key {
    let info = KeyInfo::new(SignatureType::Secp256k1, decode_private_key());
    Key::try_from(info).unwrap()
}

fn test_message() -> UnsignedMessage {
    UnsignedMessage::builder()
        .to(TO_ADDRESS.parse().unwrap())
        .from(KEY_ADDRESS.parse().unwrap())
        .sequence(34)
        .value(TokenAmount::from(12u8))
        .gas_limit(123)
        .gas_fee_cap(TokenAmount::from(234u8))
        .gas_premium(TokenAmount::from(234u8))
        .method_num(6)
        .build()
        .unwrap()
}

struct TestSigner(Key);

impl Signer for TestSigner {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> anyhow::Result<Signature> {
        assert_eq!(address, &self.0.address);
        Ok(wallet_helpers::sign(
            *self.0.key_info.key_type(),
            self.0.key_info.private_key(),
            data,
        )?)
    }
}

#[test]
fn private_key_to_address() {
    let key = test_key();
    assert_eq!(key.address.protocol(), Protocol::Secp256k1);
    assert_eq!(key.address.to_string(), KEY_ADDRESS);
}

#[test]
fn address_decode_to_wire_bytes() {
    let addr: Address = TO_ADDRESS.parse().unwrap();
    assert_eq!(addr.network(), Network::Testnet);
    assert_eq!(
        hex::encode(addr.to_bytes()),
        "01ea0f0ea039b291a0f08fd179e0556a8c3277c0d3"
    );
}

#[test]
fn unsigned_message_encoding() {
    let msg = test_message();
    let bytes = msg.marshal_cbor().unwrap();
    assert_eq!(hex::encode(&bytes), MESSAGE_HEX);
    assert_eq!(msg.cid().unwrap().to_string(), MESSAGE_CID);
}

#[test]
fn unsigned_message_decoding_roundtrip() {
    let bytes = hex::decode(MESSAGE_HEX).unwrap();
    let msg = UnsignedMessage::unmarshal_cbor(&bytes).unwrap();
    assert_eq!(msg, test_message());
    assert_eq!(msg.sequence, 34);
    assert_eq!(msg.value, TokenAmount::from(12u8));
}

#[test]
fn deterministic_signature() {
    use lantern::message::SignedMessage;

    let key = test_key();
    let smsg = SignedMessage::new(test_message(), &TestSigner(key)).unwrap();

    assert_eq!(hex::encode(smsg.signature().bytes()), SIGNATURE_HEX);
    // recovery id is the trailing byte
    assert_eq!(smsg.signature().bytes()[64], 1);

    smsg.verify().unwrap();
}

#[test]
fn signed_message_wire_form() {
    use lantern::message::SignedMessage;

    let smsg = SignedMessage::new(test_message(), &TestSigner(test_key())).unwrap();
    let bytes = smsg.marshal_cbor().unwrap();
    let encoded = hex::encode(&bytes);

    // Outer 2-array over the 10-field message array.
    assert!(encoded.starts_with("828a00"));
    // 66-byte signature byte string lead by the secp type byte.
    assert!(encoded.contains(&format!("584201{}", &SIGNATURE_HEX[..16])));

    // The published identity re-hashes the signed form, so it differs from
    // the unsigned CID used as the signing payload.
    let cid = smsg.cid().unwrap();
    assert_ne!(cid.to_string(), MESSAGE_CID);
    let back = SignedMessage::unmarshal_cbor(&bytes).unwrap();
    assert_eq!(back.cid().unwrap(), cid);
}

#[test]
fn bignum_fields_roundtrip_boundaries() {
    for v in [
        TokenAmount::from(0u8),
        TokenAmount::from(1u8),
        TokenAmount::from(u64::MAX - 1),
        TokenAmount::from(10u64).pow(18),
    ] {
        let msg = UnsignedMessage::builder()
            .to(Address::new_id(1))
            .from(Address::new_id(2))
            .value(v.clone())
            .build()
            .unwrap();
        let back = UnsignedMessage::unmarshal_cbor(&msg.marshal_cbor().unwrap()).unwrap();
        assert_eq!(back.value, v);
    }
}

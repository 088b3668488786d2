// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;

use libsecp256k1::{
    recover, Message as SecpMessage, RecoveryId, Signature as EcsdaSignature,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::Error;
use crate::address::{Address, Payload, Protocol};
use crate::encoding::blake2b_256;

/// Secp256k1 signature length: `r || s || v`, recovery byte included.
pub const SECP_SIG_LEN: usize = 65;

/// Signature variants understood on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Copy, FromPrimitive, Serialize, Deserialize, Hash)]
#[repr(u8)]
pub enum SignatureType {
    Secp256k1 = 1,
    BLS = 2,
}

/// A cryptographic signature, the wire form is `type_byte || raw bytes`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    sig_type: SignatureType,
    bytes: Vec<u8>,
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut bz = Vec::with_capacity(self.bytes.len() + 1);
        bz.push(self.sig_type as u8);
        bz.extend_from_slice(&self.bytes);
        serde_bytes::Bytes::new(&bz).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bz: Cow<'de, [u8]> = serde_bytes::Deserialize::deserialize(deserializer)?;
        if bz.is_empty() {
            return Err(de::Error::custom("Cannot deserialize an empty signature"));
        }
        let sig_type = SignatureType::from_u8(bz[0])
            .ok_or_else(|| de::Error::custom(format!("Invalid signature type byte {}", bz[0])))?;
        Ok(Signature {
            sig_type,
            bytes: bz[1..].to_vec(),
        })
    }
}

impl Signature {
    /// Creates a SECP signature from raw `r || s || v` bytes.
    pub fn new_secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Secp256k1,
            bytes,
        }
    }

    /// Creates a BLS signature wrapper. The light client never produces
    /// these, but gossiped messages may carry them.
    pub fn new_bls(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::BLS,
            bytes,
        }
    }

    pub fn signature_type(&self) -> SignatureType {
        self.sig_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Checks if the signature matches the given data for the address.
    /// Only key-based protocols can be verified locally.
    pub fn verify(&self, data: &[u8], addr: &Address) -> Result<(), Error> {
        match self.sig_type {
            SignatureType::Secp256k1 => verify_secp256k1_sig(&self.bytes, data, addr),
            SignatureType::BLS => Err(Error::VerificationFailure(
                "bls verification is not supported by the light client".to_owned(),
            )),
        }
    }
}

/// Returns `Ok` if the recovered public key hashes to the address payload.
fn verify_secp256k1_sig(signature: &[u8], data: &[u8], addr: &Address) -> Result<(), Error> {
    if addr.protocol() != Protocol::Secp256k1 {
        return Err(Error::VerificationFailure(format!(
            "cannot validate a secp256k1 signature against a {} address",
            addr.protocol()
        )));
    }
    if signature.len() != SECP_SIG_LEN {
        return Err(Error::VerificationFailure(format!(
            "invalid signature length, wanted {} got {}",
            SECP_SIG_LEN,
            signature.len()
        )));
    }

    let hash = blake2b_256(data);
    let pubkey = recover_pubkey(&hash, signature)?;

    let rec_addr =
        Address::new_secp256k1(&pubkey).map_err(|e| Error::InvalidPubKey(e.to_string()))?;

    if let (Payload::Secp256k1(a), Payload::Secp256k1(b)) = (addr.payload(), rec_addr.payload()) {
        if a == b {
            return Ok(());
        }
    }
    Err(Error::VerificationFailure(
        "Secp signature verification failed".to_owned(),
    ))
}

/// Recovers the uncompressed public key from a 65-byte recoverable signature
/// over an already-hashed message.
pub fn recover_pubkey(hash: &[u8; 32], signature: &[u8]) -> Result<[u8; 65], Error> {
    if signature.len() != SECP_SIG_LEN {
        return Err(Error::InvalidRecovery(format!(
            "invalid signature length, wanted {} got {}",
            SECP_SIG_LEN,
            signature.len()
        )));
    }
    let rec_id = RecoveryId::parse(signature[64]).map_err(|e| {
        Error::InvalidRecovery(format!("could not parse recovery id: {}", e))
    })?;

    let mut s = [0u8; 64];
    s.copy_from_slice(&signature[..64]);
    let sig = EcsdaSignature::parse_standard(&s)
        .map_err(|e| Error::InvalidRecovery(e.to_string()))?;

    let msg = SecpMessage::parse(hash);
    let pubkey = recover(&msg, &sig, &rec_id)
        .map_err(|e| Error::InvalidRecovery(e.to_string()))?;
    Ok(pubkey.serialize())
}

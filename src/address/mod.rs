// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod network;
mod payload;
mod protocol;

pub use self::errors::Error;
pub use self::network::Network;
pub use self::payload::Payload;
pub use self::protocol::Protocol;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use data_encoding::Encoding;
#[allow(unused_imports)]
use data_encoding_macro::{internal_new_encoding, new_encoding};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::encoding::blake2b_variable;

/// Lowercase base32 alphabet without padding, used for the string form.
const ADDRESS_ENCODER: Encoding = new_encoding! {
    symbols: "abcdefghijklmnopqrstuvwxyz234567",
    padding: None,
};

/// Hash length of payload for Secp and Actor addresses.
pub const PAYLOAD_HASH_LEN: usize = 20;

/// Uncompressed secp public key length used for deriving Secp addresses.
pub const SECP_PUB_LEN: usize = 65;

/// BLS public key length used for validation of BLS addresses.
pub const BLS_PUB_LEN: usize = 48;

/// Length of the checksum hash for string encodings.
pub const CHECKSUM_HASH_LEN: usize = 4;

const MAX_ADDRESS_LEN: usize = 84 + 2;

/// A Filecoin-shaped chain address: an addressing protocol plus its payload.
///
/// The wire form is `protocol_byte || payload` and carries no network; the
/// network only affects the string form, so equality and hashing ignore it.
#[derive(Copy, Clone, Debug, Eq)]
pub struct Address {
    network: Network,
    payload: Payload,
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl Address {
    fn new(network: Network, payload: Payload) -> Self {
        Self { network, payload }
    }

    /// Address constructor from encoded wire bytes (`protocol_byte || payload`).
    pub fn from_bytes(bz: &[u8]) -> Result<Self, Error> {
        if bz.len() < 2 {
            return Err(Error::InvalidLength);
        }
        let protocol = Protocol::from_byte(bz[0]).ok_or(Error::UnknownProtocol)?;
        Ok(Self::new(
            Network::default(),
            Payload::new(protocol, &bz[1..])?,
        ))
    }

    /// Generates new address using the ID protocol.
    pub fn new_id(id: u64) -> Self {
        Self::new(Network::default(), Payload::ID(id))
    }

    /// Generates new address from an uncompressed secp256k1 public key.
    pub fn new_secp256k1(pubkey: &[u8]) -> Result<Self, Error> {
        if pubkey.len() != SECP_PUB_LEN {
            return Err(Error::InvalidPayloadLength(SECP_PUB_LEN, pubkey.len()));
        }
        Ok(Self::new(
            Network::default(),
            Payload::Secp256k1(address_hash(pubkey)),
        ))
    }

    /// Generates new address using the Actor protocol.
    pub fn new_actor(data: &[u8]) -> Self {
        Self::new(Network::default(), Payload::Actor(address_hash(data)))
    }

    /// Generates new address from a BLS public key.
    pub fn new_bls(pubkey: &[u8]) -> Result<Self, Error> {
        if pubkey.len() != BLS_PUB_LEN {
            return Err(Error::InvalidBLSLength(BLS_PUB_LEN, pubkey.len()));
        }
        let mut key = [0u8; BLS_PUB_LEN];
        key.copy_from_slice(pubkey);
        Ok(Self::new(Network::default(), Payload::BLS(key)))
    }

    /// Returns protocol for Address.
    pub fn protocol(&self) -> Protocol {
        Protocol::from(self.payload)
    }

    /// Returns the raw payload of the Address.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the raw payload bytes (without the protocol byte).
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload.to_raw_bytes()
    }

    /// Returns the id payload, failing for any other protocol.
    pub fn id(&self) -> Result<u64, Error> {
        match self.payload {
            Payload::ID(id) => Ok(id),
            _ => Err(Error::NonIDAddress),
        }
    }

    /// Returns encoded wire bytes of Address.
    pub fn to_bytes(self) -> Vec<u8> {
        self.payload.to_bytes()
    }

    /// Returns the network the string form encodes for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Sets the network used by the string form.
    pub fn set_network(&mut self, network: Network) {
        self.network = network;
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.network.to_prefix();
        let protocol = self.protocol();

        match self.payload {
            Payload::ID(id) => write!(f, "{}{}{}", prefix, protocol, id),
            _ => {
                let raw = self.payload.to_raw_bytes();

                // Checksum over the protocol byte followed by the payload.
                let mut ingest = raw.clone();
                ingest.insert(0, protocol as u8);
                let cksm = checksum(&ingest);

                let mut bz = raw;
                bz.extend_from_slice(&cksm);
                write!(f, "{}{}{}", prefix, protocol, ADDRESS_ENCODER.encode(&bz))
            }
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(addr: &str) -> Result<Self, Error> {
        if addr.len() > MAX_ADDRESS_LEN || addr.len() < 3 {
            return Err(Error::InvalidLength);
        }
        let network = Network::from_prefix(addr.get(0..1).ok_or(Error::UnknownNetwork)?)
            .ok_or(Error::UnknownNetwork)?;

        let protocol = match addr.get(1..2).ok_or(Error::UnknownProtocol)? {
            "0" => Protocol::ID,
            "1" => Protocol::Secp256k1,
            "2" => Protocol::Actor,
            "3" => Protocol::BLS,
            _ => return Err(Error::UnknownProtocol),
        };

        let raw = &addr[2..];
        if protocol == Protocol::ID {
            if raw.len() > 20 {
                // 20 is the max length of a u64 as a string.
                return Err(Error::InvalidLength);
            }
            let id = raw.parse::<u64>().map_err(|_| Error::InvalidPayload)?;
            return Ok(Self::new(network, Payload::ID(id)));
        }

        let mut payload = ADDRESS_ENCODER
            .decode(raw.as_bytes())
            .map_err(|e| Error::Base32Decoding(e.to_string()))?;
        if payload.len() < CHECKSUM_HASH_LEN {
            return Err(Error::InvalidLength);
        }
        let cksm = payload.split_off(payload.len() - CHECKSUM_HASH_LEN);

        if (protocol == Protocol::Secp256k1 || protocol == Protocol::Actor)
            && payload.len() != PAYLOAD_HASH_LEN
        {
            return Err(Error::InvalidPayload);
        }

        let mut ingest = payload.clone();
        ingest.insert(0, protocol as u8);
        if !validate_checksum(&ingest, &cksm) {
            return Err(Error::InvalidChecksum);
        }

        Ok(Self::new(network, Payload::new(protocol, &payload)?))
    }
}

/// The wire form of an address is its byte encoding as a CBOR byte string.
impl Serialize for Address {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bz = self.to_bytes();
        serde_bytes::Bytes::new(&bz).serialize(s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bz: serde_bytes::ByteBuf = Deserialize::deserialize(deserializer)?;
        Address::from_bytes(&bz).map_err(de::Error::custom)
    }
}

/// Checksum calculates the 4 byte checksum hash.
pub fn checksum(ingest: &[u8]) -> Vec<u8> {
    blake2b_variable(ingest, CHECKSUM_HASH_LEN)
}

/// Validates the checksum against the ingest data.
pub fn validate_checksum(ingest: &[u8], expect: &[u8]) -> bool {
    checksum(ingest) == expect
}

/// Returns an address hash for given data.
fn address_hash(ingest: &[u8]) -> [u8; PAYLOAD_HASH_LEN] {
    let digest = blake2b_variable(ingest, PAYLOAD_HASH_LEN);
    let mut hash = [0u8; PAYLOAD_HASH_LEN];
    hash.copy_from_slice(&digest);
    hash
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::convert::TryInto;

use super::{Error, Protocol, BLS_PUB_LEN, PAYLOAD_HASH_LEN};

/// Payload is the data of the Address. Variants are the supported Address protocols.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Payload {
    /// ID protocol address, a leb128-encoded actor id.
    ID(u64),
    /// SECP256K1 key address, 20 byte hash of the uncompressed public key.
    Secp256k1([u8; PAYLOAD_HASH_LEN]),
    /// Actor protocol address, 20 byte hash of actor data.
    Actor([u8; PAYLOAD_HASH_LEN]),
    /// BLS key address, full 48 byte public key.
    BLS([u8; BLS_PUB_LEN]),
}

impl Payload {
    /// Returns encoded bytes of Address without the protocol byte.
    pub fn to_raw_bytes(self) -> Vec<u8> {
        use Payload::*;
        match self {
            ID(id) => {
                let mut buf = Vec::with_capacity(10);
                leb128::write::unsigned(&mut buf, id).expect("write to vec cannot fail");
                buf
            }
            Secp256k1(arr) => arr.to_vec(),
            Actor(arr) => arr.to_vec(),
            BLS(arr) => arr.to_vec(),
        }
    }

    /// Returns encoded bytes of Address including the protocol byte.
    pub fn to_bytes(self) -> Vec<u8> {
        let mut bz = self.to_raw_bytes();
        bz.insert(0, Protocol::from(self) as u8);
        bz
    }

    /// Generates payload from the raw bytes for the given protocol.
    pub fn new(protocol: Protocol, payload: &[u8]) -> Result<Self, Error> {
        let payload = match protocol {
            Protocol::ID => {
                let mut readable = payload;
                let id = leb128::read::unsigned(&mut readable)
                    .map_err(|_| Error::InvalidPayload)?;
                if !readable.is_empty() {
                    // Trailing bytes after a minimal leb128 id are invalid.
                    return Err(Error::InvalidPayload);
                }
                Self::ID(id)
            }
            Protocol::Secp256k1 => Self::Secp256k1(
                payload
                    .try_into()
                    .map_err(|_| Error::InvalidPayloadLength(PAYLOAD_HASH_LEN, payload.len()))?,
            ),
            Protocol::Actor => Self::Actor(
                payload
                    .try_into()
                    .map_err(|_| Error::InvalidPayloadLength(PAYLOAD_HASH_LEN, payload.len()))?,
            ),
            Protocol::BLS => Self::BLS(
                payload
                    .try_into()
                    .map_err(|_| Error::InvalidBLSLength(BLS_PUB_LEN, payload.len()))?,
            ),
        };
        Ok(payload)
    }
}

impl From<Payload> for Protocol {
    fn from(pl: Payload) -> Self {
        match pl {
            Payload::ID(_) => Self::ID,
            Payload::Secp256k1(_) => Self::Secp256k1,
            Payload::Actor(_) => Self::Actor,
            Payload::BLS(_) => Self::BLS,
        }
    }
}

impl From<&Payload> for Protocol {
    fn from(pl: &Payload) -> Self {
        Protocol::from(*pl)
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::convert::TryFrom;

use super::errors::Error;
use super::keystore::KeyInfo;
use super::wallet_helpers::{generate, new_address, to_public};
use crate::address::Address;
use crate::crypto::SignatureType;

/// A key, the derived public key and its address.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct Key {
    pub key_info: KeyInfo,
    pub public_key: Vec<u8>,
    pub address: Address,
}

impl TryFrom<KeyInfo> for Key {
    type Error = Error;

    fn try_from(key_info: KeyInfo) -> Result<Self, Self::Error> {
        let public_key = to_public(*key_info.key_type(), key_info.private_key())?;
        let address = new_address(*key_info.key_type(), &public_key)?;
        Ok(Key {
            key_info,
            public_key,
            address,
        })
    }
}

/// Generate a new key of the given signature type.
pub fn generate_key(typ: SignatureType) -> Result<Key, Error> {
    let private_key = generate(typ)?;
    let key_info = KeyInfo::new(typ, private_key);
    Key::try_from(key_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Protocol;

    #[test]
    fn generated_key_has_secp_address() {
        let key = generate_key(SignatureType::Secp256k1).unwrap();
        assert_eq!(key.address.protocol(), Protocol::Secp256k1);
        assert_eq!(key.public_key.len(), 65);
    }
}

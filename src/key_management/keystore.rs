// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::Error;
use crate::crypto::SignatureType;

/// KeyInfo pairs the type of key with the raw private key bytes.
///
/// This store is deliberately process-local and unencrypted: the client is
/// ephemeral and never persists wallet state.
#[derive(Clone, PartialEq, Debug, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    key_type: SignatureType,
    private_key: Vec<u8>,
}

impl KeyInfo {
    /// Return a new KeyInfo given the key_type and private_key.
    pub fn new(key_type: SignatureType, private_key: Vec<u8>) -> Self {
        KeyInfo {
            key_type,
            private_key,
        }
    }

    /// Return a reference to the key_type.
    pub fn key_type(&self) -> &SignatureType {
        &self.key_type
    }

    /// Return a reference to the private_key.
    pub fn private_key(&self) -> &Vec<u8> {
        &self.private_key
    }
}

/// In-memory set of KeyInfos resolved by their address string.
#[derive(Clone, PartialEq, Debug, Eq, Default)]
pub struct KeyStore {
    key_info: HashMap<String, KeyInfo>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all of the keys that are stored in the KeyStore.
    pub fn list(&self) -> Vec<String> {
        self.key_info.keys().cloned().collect()
    }

    /// Return the KeyInfo that corresponds to a given key.
    pub fn get(&self, k: &str) -> Result<KeyInfo, Error> {
        self.key_info.get(k).cloned().ok_or(Error::KeyInfo)
    }

    /// Save a key/key_info pair to the KeyStore.
    pub fn put(&mut self, key: String, key_info: KeyInfo) -> Result<(), Error> {
        if self.key_info.contains_key(&key) {
            return Err(Error::KeyExists);
        }
        self.key_info.insert(key, key_info);
        Ok(())
    }

    /// Remove the key and corresponding key_info from the KeyStore.
    pub fn remove(&mut self, key: String) -> Result<KeyInfo, Error> {
        self.key_info.remove(&key).ok_or(Error::KeyInfo)
    }

    pub fn is_empty(&self) -> bool {
        self.key_info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let mut ks = KeyStore::new();
        let info = KeyInfo::new(SignatureType::Secp256k1, vec![1; 32]);
        ks.put("t1test".to_string(), info.clone()).unwrap();
        assert_eq!(ks.get("t1test").unwrap(), info);
        assert_eq!(
            ks.put("t1test".to_string(), info.clone()),
            Err(Error::KeyExists)
        );
        assert_eq!(ks.remove("t1test".to_string()).unwrap(), info);
        assert_eq!(ks.get("t1test"), Err(Error::KeyInfo));
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::address::Address;

/// Per-sender nonce counters. Assignments are serialized behind a lock so
/// concurrent pushes observe distinct, consecutive nonces.
///
/// The counters are not persisted; a restarted client will reuse nonces.
/// This is an accepted limitation of the ephemeral client.
#[derive(Debug, Default)]
pub struct NonceTracker {
    counters: Mutex<HashMap<Address, u64>>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next nonce for a sender. A non-zero caller value seeds
    /// the counter; zero continues the tracked sequence.
    pub async fn assign(&self, addr: &Address, caller_nonce: u64) -> u64 {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(*addr).or_insert(0);
        let nonce = if caller_nonce != 0 {
            caller_nonce
        } else {
            *counter
        };
        *counter = nonce + 1;
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nonces_are_consecutive() {
        let tracker = NonceTracker::new();
        let addr = Address::new_id(5);
        assert_eq!(tracker.assign(&addr, 0).await, 0);
        assert_eq!(tracker.assign(&addr, 0).await, 1);
        assert_eq!(tracker.assign(&addr, 0).await, 2);
    }

    #[tokio::test]
    async fn caller_nonce_seeds_the_counter() {
        let tracker = NonceTracker::new();
        let addr = Address::new_id(5);
        assert_eq!(tracker.assign(&addr, 42).await, 42);
        assert_eq!(tracker.assign(&addr, 0).await, 43);
    }

    #[tokio::test]
    async fn concurrent_assignments_are_distinct() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let tracker = Arc::new(NonceTracker::new());
        let addr = Address::new_id(5);
        let mut handles = vec![];
        for _ in 0..16 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(
                async move { tracker.assign(&addr, 0).await },
            ));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen.len(), 16);
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;
use cid::Cid;
use libp2p::PeerId;

use crate::ipld::Selector;

/// Transport collaborator for partial-state queries: a request names a root
/// and a selector, and draining the response populates the client's block
/// store with every block the selector matched. The core never performs
/// transport negotiation itself.
#[async_trait]
pub trait GraphExchange: Send + Sync {
    /// Fetch all blocks the selector matches from the peer into the shared
    /// block store.
    async fn fetch(&self, peer: PeerId, root: Cid, selector: Selector) -> anyhow::Result<()>;
}

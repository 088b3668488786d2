// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

pub(super) const MAINNET_PREFIX: &str = "f";
pub(super) const TESTNET_PREFIX: &str = "t";

/// Network defines the preconfigured networks to use with address encoding.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Default for Network {
    /// Addresses constructed from keys or wire bytes default to the test
    /// network prefix; `set_network` switches the string form.
    fn default() -> Self {
        Network::Testnet
    }
}

impl Network {
    /// String prefix used when encoding an address for this network.
    pub(super) fn to_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_PREFIX,
            Network::Testnet => TESTNET_PREFIX,
        }
    }

    pub(super) fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            MAINNET_PREFIX => Some(Network::Mainnet),
            TESTNET_PREFIX => Some(Network::Testnet),
            _ => None,
        }
    }
}

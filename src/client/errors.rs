// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Light client error
#[derive(Debug, Error)]
pub enum Error {
    /// Inclusion horizon passed without observing the message
    #[error("not included on chain")]
    NotIncludedOnChain,
    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,
    /// The connection to the network service was lost
    #[error("network service unavailable: {0}")]
    Network(String),
    /// A graph-exchange request failed
    #[error("graph exchange request failed: {0}")]
    Exchange(String),
    /// A chain-exchange response carried a failure status
    #[error("chain exchange failed: {0}")]
    ChainExchange(String),
    /// Receipt absent at the resolved index
    #[error("no receipt found for included message")]
    ReceiptNotFound,
    #[error(transparent)]
    KeyManagement(#[from] crate::key_management::Error),
    #[error(transparent)]
    Crypto(#[from] crate::crypto::Error),
    #[error(transparent)]
    Encoding(#[from] crate::encoding::Error),
    #[error(transparent)]
    Amt(#[from] crate::ipld_amt::Error),
    #[error(transparent)]
    Blocks(#[from] crate::blocks::Error),
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Key management error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Info that corresponds to key does not exist
    #[error("Key info not found")]
    KeyInfo,
    /// Key already exists in the key store
    #[error("Key already exists")]
    KeyExists,
    #[error("Key does not exist")]
    KeyNotExists,
    #[error("Key store is empty")]
    NoKeys,
    #[error("{0}")]
    Other(String),
}

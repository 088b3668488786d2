// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Blockchain blocks error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Tipset contains no blocks
    #[error("No blocks for tipset")]
    NoBlocks,
    /// Tipset headers are inconsistent with each other
    #[error("Invalid tipset: {0}")]
    InvalidTipset(String),
    /// Header could not be encoded for hashing
    #[error("Could not encode header: {0}")]
    Encoding(String),
}

impl From<crate::encoding::Error> for Error {
    fn from(e: crate::encoding::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

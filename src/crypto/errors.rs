// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Crypto error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Failed to produce a signature
    #[error("Could not sign data: {0}")]
    SigningError(String),
    /// Unable to perform ecrecover with the given params
    #[error("Could not recover public key from signature: {0}")]
    InvalidRecovery(String),
    /// Provided public key is not understood
    #[error("Invalid generated pub key to create address: {0}")]
    InvalidPubKey(String),
    /// Signature verification failed against the given address
    #[error("Signature verification failed: {0}")]
    VerificationFailure(String),
}

impl From<libsecp256k1::Error> for Error {
    fn from(err: libsecp256k1::Error) -> Error {
        Error::SigningError(err.to_string())
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use thiserror::Error;

/// Error type for encoding and decoding data through any supported protocol.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Could not decode in format {protocol}: {description}")]
    Unmarshalling {
        description: String,
        protocol: CodecProtocol,
    },
    #[error("Could not encode in format {protocol}: {description}")]
    Marshalling {
        description: String,
        protocol: CodecProtocol,
    },
}

/// The protocol in which data is encoded or decoded.
#[derive(Debug, PartialEq, Eq)]
pub enum CodecProtocol {
    Cbor,
}

impl fmt::Display for CodecProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CodecProtocol::Cbor => write!(f, "Cbor"),
        }
    }
}

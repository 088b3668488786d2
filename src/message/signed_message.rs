// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;

use super::UnsignedMessage;
use crate::crypto::{Signature, Signer};
use crate::encoding::tuple::*;
use crate::encoding::{Cbor, Error as EncodingError};

/// Represents a wrapped message with signature bytes.
#[derive(PartialEq, Clone, Debug, Serialize_tuple, Deserialize_tuple, Hash, Eq)]
pub struct SignedMessage {
    pub message: UnsignedMessage,
    pub signature: Signature,
}

impl SignedMessage {
    /// Generate a new signed message from an unsigned message and a signer.
    ///
    /// The signed payload is the CID bytes of the encoded unsigned message,
    /// not the raw encoded bytes.
    pub fn new<S: Signer>(message: UnsignedMessage, signer: &S) -> anyhow::Result<SignedMessage> {
        let unsigned_cid = message.cid()?;
        let signature = signer.sign_bytes(&unsigned_cid.to_bytes(), &message.from)?;

        Ok(SignedMessage { message, signature })
    }

    /// Generate a new signed message from fields. The signature is not
    /// checked.
    pub fn new_unchecked(message: UnsignedMessage, signature: Signature) -> SignedMessage {
        SignedMessage { message, signature }
    }

    /// Returns reference to the unsigned message.
    pub fn message(&self) -> &UnsignedMessage {
        &self.message
    }

    /// Returns signature of the signed message.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Consumes self and returns the unsigned message.
    pub fn into_message(self) -> UnsignedMessage {
        self.message
    }

    /// Verifies that the from address of the message generated the signature.
    pub fn verify(&self) -> anyhow::Result<()> {
        let unsigned_cid = self.message.cid()?;
        self.signature
            .verify(&unsigned_cid.to_bytes(), &self.message.from)?;
        Ok(())
    }

    /// The published identity of a secp message re-hashes the signed wire
    /// form; the unsigned CID is only ever the signing payload.
    pub fn cid(&self) -> Result<Cid, EncodingError> {
        Cbor::cid(self)
    }
}

impl Cbor for SignedMessage {}

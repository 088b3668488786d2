// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Signature;
use crate::address::Address;

/// Signer is a trait which allows a key implementation to sign data for an
/// address.
pub trait Signer {
    /// Signs arbitrary data with the key belonging to the [Address].
    fn sign_bytes(&self, data: &[u8], address: &Address) -> anyhow::Result<Signature>;
}

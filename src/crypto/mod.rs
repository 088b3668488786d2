// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
pub mod signature;
mod signer;

pub use self::errors::Error;
pub use self::signature::{Signature, SignatureType, SECP_SIG_LEN};
pub use self::signer::Signer;

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod keystore;
mod wallet;
pub mod wallet_helpers;

pub use self::errors::Error;
pub use self::keystore::{KeyInfo, KeyStore};
pub use self::wallet::{generate_key, Key};

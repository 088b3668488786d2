// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod bytes;
mod cbor;
mod errors;
mod hash;

pub use self::bytes::*;
pub use self::cbor::*;
pub use self::errors::*;
pub use self::hash::*;

pub use serde::{de, ser, Deserialize, Serialize};

/// Fixed-arity array (tuple) serialization for record types.
pub mod tuple {
    pub use serde_tuple::{self, Deserialize_tuple, Serialize_tuple};
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod bigint_ser;
pub mod biguint_ser;

pub use num_bigint::{BigInt, BigUint};

/// Largest encoded big integer the wire accepts, in bytes.
pub const MAX_ENCODED_SIZE: usize = 128;

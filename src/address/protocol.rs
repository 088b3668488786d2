// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use num_derive::FromPrimitive;

/// Protocol defines the addressing protocol used to derive data to an address.
#[derive(PartialEq, Eq, Copy, Clone, FromPrimitive, Debug, Hash)]
#[repr(u8)]
pub enum Protocol {
    /// ID protocol addressing
    ID = 0,
    /// SECP256K1 key addressing
    Secp256k1 = 1,
    /// Actor protocol addressing
    Actor = 2,
    /// BLS key addressing
    BLS = 3,
}

impl Protocol {
    /// Returns the protocol for the identifier byte, if it is known.
    pub(super) fn from_byte(b: u8) -> Option<Protocol> {
        num_traits::FromPrimitive::from_u8(b)
    }
}

/// Protocol format in an address string is its numeric identifier.
impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

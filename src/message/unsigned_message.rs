// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use derive_builder::Builder;

use super::{MethodNum, TokenAmount};
use crate::address::Address;
use crate::bigint::bigint_ser;
use crate::encoding::tuple::*;
use crate::encoding::Cbor;

/// Default Unsigned VM message type which includes all data needed for a
/// state transition. The wire form is a fixed 10-element array in field
/// order; record semantics live only at this codec boundary.
///
/// Usage:
/// ```ignore
/// let message = UnsignedMessage::builder()
///     .to(to_addr)
///     .from(from_addr)
///     .sequence(0) // optional
///     .value(TokenAmount::default()) // optional
///     .method_num(0) // optional
///     .params(Vec::new()) // optional
///     .gas_limit(0) // optional
///     .gas_premium(TokenAmount::default()) // optional
///     .build()
///     .unwrap();
/// ```
#[derive(PartialEq, Clone, Debug, Builder, Serialize_tuple, Deserialize_tuple, Hash, Eq)]
#[builder(name = "MessageBuilder")]
pub struct UnsignedMessage {
    #[builder(default)]
    pub version: u64,
    pub to: Address,
    pub from: Address,
    /// Nonce of the message for the sending actor.
    #[builder(default)]
    pub sequence: u64,
    #[builder(default)]
    #[serde(with = "bigint_ser")]
    pub value: TokenAmount,
    #[builder(default)]
    pub gas_limit: u64,
    #[builder(default)]
    #[serde(with = "bigint_ser")]
    pub gas_fee_cap: TokenAmount,
    #[builder(default)]
    #[serde(with = "bigint_ser")]
    pub gas_premium: TokenAmount,
    #[builder(default)]
    pub method_num: MethodNum,
    #[builder(default)]
    #[serde(with = "serde_bytes")]
    pub params: Vec<u8>,
}

impl UnsignedMessage {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }
}

impl Cbor for UnsignedMessage {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn builder_roundtrip() {
        let msg = UnsignedMessage::builder()
            .to(Address::new_id(1))
            .from(Address::new_id(2))
            .sequence(10)
            .value(TokenAmount::from(9u8))
            .build()
            .unwrap();

        let bz = to_vec(&msg).unwrap();
        let back: UnsignedMessage = from_slice(&bz).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.sequence, 10);
    }

    #[test]
    fn missing_required_field_fails() {
        assert!(UnsignedMessage::builder()
            .to(Address::new_id(1))
            .build()
            .is_err());
    }
}

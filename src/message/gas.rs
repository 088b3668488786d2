// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Static gas estimation from the current base fee.
//!
//! The estimator is deliberately a fixed-formula over-approximation; it never
//! simulates execution on a node.

use num_bigint::BigInt;
use num_traits::Zero;

use super::{TokenAmount, UnsignedMessage};

/// Gas target for a full block.
pub const BLOCK_GAS_TARGET: u64 = 5_000_000_000;

/// Smallest premium accepted by the network fee market.
pub const MIN_GAS_PREMIUM: u64 = 100_000;

/// Number of epochs the fee cap must survive base-fee growth for.
const BASE_FEE_LOOKAHEAD: u32 = 20;

/// Fixed-point precision of the base-fee growth multiplier.
const FEE_CAP_PRECISION: u8 = 8;

/// Base-fee growth multiplier, `round((1 + 1/8)^20 * 2^8)`, computed in the
/// integer domain. The fixed-point rounding here is consensus-relevant for
/// matching estimates; a floating point rendition rounds differently.
fn base_fee_multiplier() -> BigInt {
    let num = BigInt::from(9u8).pow(BASE_FEE_LOOKAHEAD) << FEE_CAP_PRECISION;
    let den = BigInt::from(8u8).pow(BASE_FEE_LOOKAHEAD);
    (num + (&den >> 1)) / den
}

/// Fills in the gas fields of a message that the caller left unset, from the
/// parent base fee of the current head. Fields carrying caller values are
/// untouched.
pub fn estimate_gas(msg: &mut UnsignedMessage, base_fee: &TokenAmount) {
    if msg.gas_limit == 0 {
        msg.gas_limit = BLOCK_GAS_TARGET / 10;
    }
    if msg.gas_premium.is_zero() {
        msg.gas_premium = TokenAmount::from(MIN_GAS_PREMIUM) * 3u8 / 2u8;
    }
    if msg.gas_fee_cap.is_zero() {
        let bound = (base_fee * base_fee_multiplier()) >> FEE_CAP_PRECISION;
        msg.gas_fee_cap = bound + &msg.gas_premium;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    fn message() -> UnsignedMessage {
        UnsignedMessage::builder()
            .to(Address::new_id(1))
            .from(Address::new_id(2))
            .build()
            .unwrap()
    }

    #[test]
    fn multiplier_is_integer_rounded() {
        // (9/8)^20 * 2^8 = 2699.54..; rounds up in the integer domain.
        assert_eq!(base_fee_multiplier(), BigInt::from(2700u32));
    }

    #[test]
    fn fills_only_unset_fields() {
        let mut msg = message();
        msg.gas_limit = 777;
        estimate_gas(&mut msg, &TokenAmount::from(100u8));
        assert_eq!(msg.gas_limit, 777);
        assert_eq!(msg.gas_premium, TokenAmount::from(150_000u64));
        // (100 * 2700) / 256 + 150_000
        assert_eq!(msg.gas_fee_cap, TokenAmount::from(1054u64 + 150_000u64));
    }

    #[test]
    fn default_gas_limit_is_tenth_of_block_target() {
        let mut msg = message();
        estimate_gas(&mut msg, &TokenAmount::zero());
        assert_eq!(msg.gas_limit, BLOCK_GAS_TARGET / 10);
        // Zero base fee leaves only the premium in the cap.
        assert_eq!(msg.gas_fee_cap, msg.gas_premium);
    }
}

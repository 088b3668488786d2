// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod gas;
mod message_receipt;
mod signed_message;
mod unsigned_message;

pub use self::message_receipt::{ExitCode, MessageReceipt};
pub use self::signed_message::SignedMessage;
pub use self::unsigned_message::{MessageBuilder, UnsignedMessage};

use num_bigint::BigInt;

/// Token amounts carried by messages and headers, arbitrary precision.
pub type TokenAmount = BigInt;

/// Method number indicator for calling actor methods.
pub type MethodNum = u64;

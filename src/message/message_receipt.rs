// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::encoding::tuple::*;
use crate::encoding::Cbor;

/// Exit code of an executed message; zero is success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitCode(pub u32);

impl ExitCode {
    pub const OK: ExitCode = ExitCode(0);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

/// Result of a state transition from a message.
#[derive(PartialEq, Eq, Clone, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct MessageReceipt {
    pub exit_code: ExitCode,
    #[serde(with = "serde_bytes")]
    pub return_data: Vec<u8>,
    pub gas_used: i64,
}

impl Cbor for MessageReceipt {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn receipt_roundtrip() {
        let receipt = MessageReceipt {
            exit_code: ExitCode::OK,
            return_data: vec![0xde, 0xad],
            gas_used: 42,
        };
        let bz = to_vec(&receipt).unwrap();
        let back: MessageReceipt = from_slice(&bz).unwrap();
        assert_eq!(back, receipt);
        assert!(back.exit_code.is_success());
    }
}

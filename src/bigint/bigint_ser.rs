// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;

use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};

use super::MAX_ENCODED_SIZE;

/// Wrapper for serializing big ints as sign-prefixed big-endian bytes.
#[derive(Serialize)]
#[serde(transparent)]
pub struct BigIntSer<'a>(#[serde(with = "self")] pub &'a BigInt);

/// Wrapper for deserializing a BigInt from its byte form.
#[derive(Deserialize, Serialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(transparent)]
pub struct BigIntDe(#[serde(with = "self")] pub BigInt);

pub fn serialize<S>(int: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let (sign, mut bz) = int.to_bytes_be();

    // Sign byte prefixes the magnitude; zero is the empty byte string.
    match sign {
        Sign::Minus => bz.insert(0, 1),
        Sign::Plus => bz.insert(0, 0),
        Sign::NoSign => bz = Vec::new(),
    }
    if bz.len() > MAX_ENCODED_SIZE {
        return Err(serde::ser::Error::custom(format!(
            "encoded big int was too large ({} bytes)",
            bz.len()
        )));
    }

    serde_bytes::Serialize::serialize(&bz, serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let bz: Cow<'de, [u8]> = serde_bytes::Deserialize::deserialize(deserializer)?;
    if bz.is_empty() {
        return Ok(BigInt::default());
    }
    if bz.len() > MAX_ENCODED_SIZE {
        return Err(serde::de::Error::custom(format!(
            "decoded big int was too large ({} bytes)",
            bz.len()
        )));
    }
    let sign: Sign = match bz[0] {
        1 => Sign::Minus,
        0 => Sign::Plus,
        _ => {
            return Err(serde::de::Error::custom(
                "First byte must be valid sign (0, 1)",
            ));
        }
    };
    Ok(BigInt::from_bytes_be(sign, &bz[1..]))
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use crate::encoding::{from_slice, to_vec};

    use super::{BigIntDe, BigIntSer};

    fn roundtrip(v: BigInt) {
        let bz = to_vec(&BigIntSer(&v)).unwrap();
        let BigIntDe(out) = from_slice(&bz).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn bigint_roundtrips() {
        roundtrip(BigInt::from(0u8));
        roundtrip(BigInt::from(1u8));
        roundtrip(BigInt::from(u64::MAX - 1));
        roundtrip(BigInt::from(10u8).pow(18));
        roundtrip(BigInt::from(-1234567i64));
    }

    #[test]
    fn zero_is_empty_bytes() {
        let bz = to_vec(&BigIntSer(&BigInt::default())).unwrap();
        // cbor empty byte string
        assert_eq!(bz, vec![0x40]);
    }

    #[test]
    fn oversized_encoding_rejected() {
        let big = BigInt::from_bytes_be(num_bigint::Sign::Plus, &[0xff; 128]);
        assert!(to_vec(&BigIntSer(&big)).is_err());
    }
}

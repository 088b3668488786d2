// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Serializes unit selector variants as the empty map the selector wire
//! format requires.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    BTreeMap::<String, ()>::new().serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: Deserializer<'de>,
{
    let map = BTreeMap::<String, ()>::deserialize(deserializer)?;
    if !map.is_empty() {
        return Err(de::Error::custom("Expected an empty map"));
    }
    Ok(())
}

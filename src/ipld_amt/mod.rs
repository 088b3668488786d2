// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Array-mapped trie used as a sparse vector over `u64` indices.
//!
//! Data structure reference:
//! <https://github.com/ipld/specs/blob/51fab05b4fe4930d3d851d50cc1e5f1a02092deb/data-structures/vector.md>

mod amt;
mod error;
mod node;
mod root;

pub use self::amt::{Amt, Amtv0};
pub use self::error::Error;
use self::node::Node;

const DEFAULT_BIT_WIDTH: u32 = 3;
const MAX_HEIGHT: u32 = 64;

/// Maximum index for elements in the AMT. This is `u64::MAX - 1` so we
/// don't overflow `u64::MAX` when computing the length.
pub const MAX_INDEX: u64 = u64::MAX - 1;

/// Capacity of a subtree rooted at the given height.
fn nodes_for_height(bit_width: u32, height: u32) -> u64 {
    let height_log_two = bit_width as u64 * height as u64;
    if height_log_two >= 64 {
        return u64::MAX;
    }
    1 << height_log_two
}

fn init_sized_vec<V>(bit_width: u32) -> Vec<Option<V>> {
    std::iter::repeat_with(|| None).take(1 << bit_width).collect()
}

fn bmap_bytes(bit_width: u32) -> usize {
    if bit_width <= 3 {
        1
    } else {
        1 << (bit_width - 3)
    }
}

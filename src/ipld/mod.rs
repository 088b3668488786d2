// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Untyped IPLD values, selectors and the partial traversal engine.
//!
//! Decoded blocks surface as the [Ipld] sum type at the codec boundary and
//! are converted into typed records immediately; only the traversal engine
//! works on the untyped form.

mod path_segment;
pub mod reifier;
pub mod selector;

pub use self::path_segment::PathSegment;
pub use self::reifier::{ReifiedNode, ReifierRegistry, HAMT_REIFIER};
pub use self::selector::{RecursionLimit, Selector};

pub use libipld_core::ipld::Ipld;
pub use libipld_core::serde::{from_ipld, to_ipld};

pub(crate) fn lookup_segment<'a>(ipld: &'a Ipld, segment: &PathSegment) -> Option<&'a Ipld> {
    match ipld {
        Ipld::Map(map) => match segment {
            PathSegment::String(s) => map.get(s),
            PathSegment::Int(i) => map.get(&i.to_string()),
        },
        Ipld::List(list) => list.get(segment.to_index()?),
        _ => None,
    }
}

// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

mod empty_map;
mod walk;

pub use self::walk::walk_matching;

use std::ops::SubAssign;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Ipld, PathSegment};
use crate::encoding::Cbor;
use crate::ipld_hamt::BytesKey;
use Selector::*;

/// Selectors are expressions that identify and select a subset of data from
/// an IPLD DAG. Selectors are themselves IPLD and can be serialized and
/// deserialized as such.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Selector {
    /// Matcher marks a node to be included in the "result" set.
    /// (All nodes traversed by a selector are in the "covered" set, which is
    /// the merkle proof; the "result" set is a subset of the "covered" set.)
    #[serde(rename = ".", with = "empty_map")]
    Matcher,

    /// ExploreAll is similar to a `*`: it traverses all elements of an array
    /// or all entries in a map, and applies a next selector to the reached
    /// nodes.
    #[serde(rename = "a")]
    ExploreAll {
        #[serde(rename = ">")]
        next: Box<Selector>,
    },

    /// ExploreFields traverses named fields in a map and applies a next
    /// selector to the reached nodes. Field order is maintained and
    /// traversed in that order. Keys are raw byte strings so that reified
    /// views (whose keys are wire-form address bytes) can be addressed.
    #[serde(rename = "f")]
    ExploreFields {
        #[serde(rename = "f>")]
        fields: IndexMap<BytesKey, Selector>,
    },

    /// ExploreIndex traverses a specific index in a list, and applies a next
    /// selector to the reached node.
    #[serde(rename = "i")]
    ExploreIndex {
        #[serde(rename = "i")]
        index: usize,
        #[serde(rename = ">")]
        next: Box<Selector>,
    },

    /// ExploreRange traverses a list, and for each element in the range
    /// specified applies a next selector to the reached nodes.
    #[serde(rename = "r")]
    ExploreRange {
        #[serde(rename = "^")]
        start: usize,
        #[serde(rename = "$")]
        end: usize,
        #[serde(rename = ">")]
        next: Box<Selector>,
    },

    /// ExploreRecursive traverses some structure recursively. To guide this
    /// exploration it uses a "sequence", another Selector tree; some leaf in
    /// the sequence contains an ExploreRecursiveEdge selector denoting the
    /// place recursion should occur. Whenever evaluation reaches the edge,
    /// the implementation logically produces another copy of the original
    /// ExploreRecursive selector with a decremented depth limit.
    #[serde(rename = "R")]
    ExploreRecursive {
        #[serde(rename = ":>")]
        sequence: Box<Selector>,
        #[serde(rename = "l")]
        limit: RecursionLimit,
        /// Tracks the selector to apply at the current level.
        #[serde(skip_deserializing, skip_serializing)]
        current: Option<Box<Selector>>,
    },

    /// ExploreRecursiveEdge is a sentinel marking the end of a sequence
    /// started by an ExploreRecursive selector: the recursion goes back to
    /// the initial state of the earlier ExploreRecursive and proceeds with a
    /// decremented depth. An edge without an enclosing ExploreRecursive is
    /// an error.
    #[serde(rename = "@", with = "empty_map")]
    ExploreRecursiveEdge,

    /// ExploreUnion allows selection to continue with two or more distinct
    /// selectors while exploring the same tree of data.
    #[serde(rename = "|")]
    ExploreUnion(Vec<Selector>),

    /// ExploreInterpretAs triggers the named reifier on the loaded node and
    /// continues exploration through the reified view.
    #[serde(rename = "~")]
    ExploreInterpretAs {
        #[serde(rename = "as")]
        reifier: String,
        #[serde(rename = ">")]
        next: Box<Selector>,
    },
}

impl Cbor for Selector {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Copy)]
pub enum RecursionLimit {
    #[serde(rename = "none", with = "empty_map")]
    None,
    #[serde(rename = "depth")]
    Depth(u64),
}

impl SubAssign<u64> for RecursionLimit {
    fn sub_assign(&mut self, other: u64) {
        if let RecursionLimit::Depth(v) = self {
            *v -= other;
        }
    }
}

impl Selector {
    /// Returns a vector of all path segments of interest; the `None` variant
    /// is synonymous with all.
    pub fn interests(&self) -> Option<Vec<PathSegment>> {
        match self {
            ExploreAll { .. } => None,
            ExploreFields { fields } => Some(
                fields
                    .keys()
                    .filter_map(|k| std::str::from_utf8(k.as_ref()).ok())
                    .map(PathSegment::from)
                    .collect(),
            ),
            ExploreIndex { index, .. } => Some(vec![(*index).into()]),
            ExploreRange { start, end, .. } => {
                if end < start {
                    return None;
                }
                Some((*start..*end).map(PathSegment::from).collect())
            }
            ExploreRecursive {
                current, sequence, ..
            } => {
                if let Some(selector) = current {
                    selector.interests()
                } else {
                    sequence.interests()
                }
            }
            ExploreRecursiveEdge => {
                // Should never be called on this variant.
                Some(vec![])
            }
            ExploreUnion(selectors) => {
                let mut segs = Vec::new();
                for m in selectors {
                    if let Some(i) = m.interests() {
                        segs.extend_from_slice(&i);
                    } else {
                        // if any member has all interests, the union does too
                        return None;
                    }
                }
                Some(segs)
            }
            ExploreInterpretAs { .. } => Some(vec![]),
            Matcher => Some(vec![]),
        }
    }

    /// Processes the selector against a node at the given path segment and
    /// returns the resultant selector, if the segment is explored.
    pub fn explore(self, ipld: &Ipld, p: &PathSegment) -> Option<Selector> {
        match self {
            ExploreAll { next } => Some(*next),
            ExploreFields { mut fields } => {
                match ipld {
                    Ipld::Map(m) => {
                        // Check the field exists before exploring.
                        match p {
                            PathSegment::String(s) => {
                                m.get(s)?;
                                fields.remove(&BytesKey(s.clone().into_bytes()))
                            }
                            PathSegment::Int(i) => {
                                let key = i.to_string();
                                m.get(&key)?;
                                fields.remove(&BytesKey(key.into_bytes()))
                            }
                        }
                    }
                    Ipld::List(l) => {
                        if p.to_index()? >= l.len() {
                            return None;
                        }
                        fields.remove(&BytesKey(p.to_string().into_bytes()))
                    }
                    _ => None,
                }
            }
            ExploreIndex { index, next } => match ipld {
                Ipld::List(l) => {
                    let i = p.to_index()?;
                    if i != index || i >= l.len() {
                        None
                    } else {
                        Some(*next)
                    }
                }
                _ => None,
            },
            ExploreRange { start, end, next } => match ipld {
                Ipld::List(l) => {
                    let i = p.to_index()?;
                    if i < start || i >= end || i >= l.len() {
                        None
                    } else {
                        Some(*next)
                    }
                }
                _ => None,
            },
            ExploreRecursive {
                current,
                sequence,
                mut limit,
            } => {
                let next = current.unwrap_or_else(|| sequence.clone()).explore(ipld, p)?;

                if !has_recursive_edge(&next) {
                    return Some(ExploreRecursive {
                        sequence,
                        current: Some(next.into()),
                        limit,
                    });
                }

                if let RecursionLimit::Depth(depth) = limit {
                    if depth < 2 {
                        // Replace the recursive edge with None on the last
                        // iteration.
                        return replace_recursive_edge(next, None);
                    }
                    limit -= 1;
                }

                Some(ExploreRecursive {
                    current: replace_recursive_edge(next, Some(*sequence.clone())).map(Box::new),
                    sequence,
                    limit,
                })
            }
            ExploreUnion(selectors) => {
                let replace_selectors: Vec<_> = selectors
                    .into_iter()
                    .filter_map(|s| s.explore(ipld, p))
                    .collect();

                Selector::from_selectors(replace_selectors)
            }
            // An edge outside of its enclosing recursion is malformed.
            ExploreRecursiveEdge => None,
            // Reified views are explored through the walk engine directly.
            ExploreInterpretAs { .. } => None,
            // Matcher is a terminal selector.
            Matcher => None,
        }
    }

    /// Returns true if the node the selector sits on is part of the result
    /// set.
    pub fn decide(&self) -> bool {
        match self {
            Matcher => true,
            ExploreUnion(selectors) => selectors.iter().any(|s| s.decide()),
            ExploreRecursive {
                current, sequence, ..
            } => {
                if let Some(curr) = current {
                    curr.decide()
                } else {
                    sequence.decide()
                }
            }
            _ => false,
        }
    }

    fn from_selectors(mut vec: Vec<Self>) -> Option<Self> {
        match vec.len() {
            0 | 1 => vec.pop(),
            _ => Some(ExploreUnion(vec)),
        }
    }
}

fn replace_recursive_edge(next_sel: Selector, replace: Option<Selector>) -> Option<Selector> {
    match next_sel {
        ExploreRecursiveEdge => replace,
        ExploreUnion(selectors) => {
            let replace_selectors: Vec<_> = selectors
                .into_iter()
                .filter_map(|s| replace_recursive_edge(s, replace.clone()))
                .collect();

            Selector::from_selectors(replace_selectors)
        }
        _ => Some(next_sel),
    }
}

fn has_recursive_edge(next_sel: &Selector) -> bool {
    match next_sel {
        ExploreRecursiveEdge { .. } => true,
        ExploreUnion(selectors) => selectors.iter().any(has_recursive_edge),
        _ => false,
    }
}

/// Selector that walks the path to one actor in a reified state trie:
/// a reify-as guard over a single-field exploration keyed by the actor's
/// wire-form address bytes.
pub fn actor_state_selector(actor: &crate::address::Address) -> Selector {
    let mut fields = IndexMap::new();
    fields.insert(BytesKey(actor.to_bytes()), Matcher);
    ExploreInterpretAs {
        reifier: super::HAMT_REIFIER.to_string(),
        next: Box::new(ExploreFields { fields }),
    }
}

/// Selector fetching every link reachable from a root to a bounded depth;
/// this is the shape of receipt-vector prefetches.
pub fn explore_all_recursive(depth: u64) -> Selector {
    ExploreRecursive {
        sequence: Box::new(ExploreAll {
            next: Box::new(ExploreRecursiveEdge),
        }),
        limit: RecursionLimit::Depth(depth),
        current: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn selector_cbor_roundtrip() {
        let sel = explore_all_recursive(10);
        let bz = to_vec(&sel).unwrap();
        let back: Selector = from_slice(&bz).unwrap();
        assert_eq!(back, sel);
    }

    #[test]
    fn matcher_is_empty_map() {
        let bz = to_vec(&Matcher).unwrap();
        // {".": {}}
        assert_eq!(bz, vec![0xa1, 0x61, 0x2e, 0xa0]);
    }

    #[test]
    fn recursive_depth_decrements() {
        let sel = explore_all_recursive(2);
        let ipld = Ipld::List(vec![Ipld::Integer(1)]);
        let explored = sel.explore(&ipld, &PathSegment::Int(0)).unwrap();
        match explored {
            ExploreRecursive { limit, .. } => assert_eq!(limit, RecursionLimit::Depth(1)),
            other => panic!("expected recursion, got {:?}", other),
        }
    }
}

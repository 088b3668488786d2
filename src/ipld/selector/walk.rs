// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::anyhow;

use super::super::{lookup_segment, PathSegment};
use super::Selector;
use crate::blockstore::BlockStore;
use crate::encoding::from_slice;
use crate::ipld::reifier::ReifierRegistry;
use crate::ipld::Ipld;

/// Walks a selector against a block store, invoking the callback on every
/// node the selector marks as a result. Links are resolved lazily; the
/// engine touches exactly the blocks the selector describes, never the full
/// graph.
pub fn walk_matching<BS, F>(
    root: &Ipld,
    selector: Selector,
    store: &BS,
    reifiers: &ReifierRegistry<BS>,
    f: &mut F,
) -> anyhow::Result<()>
where
    BS: BlockStore,
    F: FnMut(&Ipld) -> anyhow::Result<()>,
{
    let selector = match selector {
        // A reify-as guard promotes the loaded node before exploration; the
        // reified view performs its own path-limited fetches on field
        // access.
        Selector::ExploreInterpretAs { reifier, next } => {
            let reify = reifiers
                .get(&reifier)
                .ok_or_else(|| anyhow!("no reifier registered under name {}", reifier))?;
            let view = reify(root.clone())?;
            return match *next {
                Selector::ExploreFields { fields } => {
                    for (key, sub) in fields {
                        if let Some(child) = view.lookup_field(store, key.as_ref())? {
                            walk_matching(&child, sub, store, reifiers, f)?;
                        }
                    }
                    Ok(())
                }
                _ => Err(anyhow!("reified views only support field exploration")),
            };
        }
        other => other,
    };

    if selector.decide() {
        f(root)?;
    }

    let segments: Vec<PathSegment> = match selector.interests() {
        Some(segments) => segments,
        None => match root {
            Ipld::Map(m) => m.keys().cloned().map(PathSegment::from).collect(),
            Ipld::List(l) => (0..l.len()).map(PathSegment::from).collect(),
            _ => Vec::new(),
        },
    };

    for segment in segments {
        let child = match lookup_segment(root, &segment) {
            Some(child) => child,
            None => continue,
        };
        if let Some(next) = selector.clone().explore(root, &segment) {
            let resolved = resolve_link(child, store)?;
            walk_matching(&resolved, next, store, reifiers, f)?;
        }
    }

    Ok(())
}

/// Loads the block behind a link and decodes it as an untyped value; any
/// other node passes through unchanged.
fn resolve_link<BS: BlockStore>(ipld: &Ipld, store: &BS) -> anyhow::Result<Ipld> {
    match ipld {
        Ipld::Link(cid) => {
            let bytes = store
                .get_bytes(cid)?
                .ok_or_else(|| anyhow!("block not found: {}", cid))?;
            Ok(from_slice(&bytes)?)
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::{MemoryDB, TrackingStore};
    use crate::ipld::selector::{explore_all_recursive, Selector::Matcher};
    use crate::ipld::RecursionLimit;
    use cid::multihash::Code;

    #[test]
    fn recursive_walk_resolves_links() {
        let mem = MemoryDB::default();
        let leaf = Ipld::List(vec![Ipld::Integer(7)]);
        let leaf_cid = mem.put(&leaf, Code::Blake2b256).unwrap();
        let root = Ipld::List(vec![Ipld::Link(leaf_cid), Ipld::Integer(9)]);

        // Union of a matcher with the recursion: every traversed node lands
        // in the result set.
        let selector = Selector::ExploreRecursive {
            sequence: Box::new(Selector::ExploreUnion(vec![
                Matcher,
                Selector::ExploreAll {
                    next: Box::new(Selector::ExploreRecursiveEdge),
                },
            ])),
            limit: RecursionLimit::Depth(3),
            current: None,
        };

        let store = TrackingStore::new(&mem);
        let mut visited = 0;
        walk_matching(&root, selector, &store, &ReifierRegistry::default(), &mut |_| {
            visited += 1;
            Ok(())
        })
        .unwrap();
        // root, the resolved leaf list, the integer inside it and the
        // trailing integer
        assert_eq!(visited, 4);
        assert_eq!(store.stats.borrow().r, 1);
    }

    #[test]
    fn missing_block_surfaces_error() {
        let store = MemoryDB::default();
        let absent = crate::utils::cid::new_from_cbor(b"gone", Code::Blake2b256);
        let root = Ipld::List(vec![Ipld::Link(absent)]);

        let res = walk_matching(
            &root,
            explore_all_recursive(3),
            &store,
            &ReifierRegistry::default(),
            &mut |_| Ok(()),
        );
        assert!(res.is_err());
    }
}

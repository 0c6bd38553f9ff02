//! The path index: a nested mapping from path segments to row ids.
//!
//! [`PathMapper`] is purely in-memory. The store owns the persisted copy and
//! decides when to write it back; see `pathstore-sdk`.

use std::collections::{BTreeMap, HashSet};

use pathstore_types::{IdCounter, RowId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::path::StorePath;

/// One entry of the nested mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A saved payload.
    Leaf(RowId),
    /// A group of further segments.
    Branch(BTreeMap<String, Node>),
}

/// Outcome of walking a path through the mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The path ends at a leaf.
    Found(RowId),
    /// Segment `depth` (zero-based) is absent; everything before it is a group.
    Missing { depth: usize },
    /// The full path names a group rather than a leaf.
    LeafIsSubtree,
    /// Segment `depth` is a leaf but more segments follow it.
    ThroughLeaf { depth: usize, id: RowId },
}

impl Resolution {
    /// The row id, if the path ends at a leaf.
    pub fn row_id(&self) -> Option<RowId> {
        match self {
            Self::Found(id) => Some(*id),
            _ => None,
        }
    }
}

/// Nested mapping from path segments to row ids.
///
/// Every leaf id is unique across the mapper, and a path's depth equals its
/// segment count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapper {
    root: BTreeMap<String, Node>,
}

impl PathMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `path` one segment at a time.
    pub fn resolve(&self, path: &StorePath) -> Resolution {
        // StorePath guarantees at least one segment.
        let Some((leaf, parents)) = path.segments().split_last() else {
            return Resolution::Missing { depth: 0 };
        };

        let mut level = &self.root;
        for (depth, segment) in parents.iter().enumerate() {
            match level.get(segment) {
                None => return Resolution::Missing { depth },
                Some(Node::Leaf(id)) => return Resolution::ThroughLeaf { depth, id: *id },
                Some(Node::Branch(children)) => level = children,
            }
        }

        match level.get(leaf) {
            None => Resolution::Missing {
                depth: parents.len(),
            },
            Some(Node::Leaf(id)) => Resolution::Found(*id),
            Some(Node::Branch(_)) => Resolution::LeafIsSubtree,
        }
    }

    /// The row id `path` maps to, if it ends at a leaf.
    pub fn get(&self, path: &StorePath) -> Option<RowId> {
        self.resolve(path).row_id()
    }

    pub fn contains(&self, path: &StorePath) -> bool {
        self.get(path).is_some()
    }

    /// Map a new path to `id`, creating missing groups along the way.
    ///
    /// Fails without modifying the mapper if the path already ends at a
    /// leaf, runs through a leaf, or names a group.
    pub fn insert(&mut self, path: &StorePath, id: RowId) -> IndexResult<()> {
        let missing_from = match self.resolve(path) {
            Resolution::Missing { depth } => depth,
            Resolution::Found(existing) => {
                return Err(IndexError::AlreadyMapped {
                    path: path.to_string(),
                    id: existing,
                })
            }
            Resolution::ThroughLeaf { depth, .. } => {
                return Err(IndexError::PathConflict {
                    path: path.to_string(),
                    prefix: path.prefix(depth + 1),
                })
            }
            Resolution::LeafIsSubtree => {
                return Err(IndexError::PathConflict {
                    path: path.to_string(),
                    prefix: path.to_string(),
                })
            }
        };

        let segments = path.segments();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => {
                return Err(IndexError::InvalidPath {
                    path: path.to_string(),
                    reason: "path has no segments".into(),
                })
            }
        };

        let mut level = &mut self.root;
        for segment in parents {
            let node = level
                .entry(segment.clone())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            level = match node {
                Node::Branch(children) => children,
                // resolve() reported every existing parent as a group
                Node::Leaf(_) => {
                    return Err(IndexError::PathConflict {
                        path: path.to_string(),
                        prefix: segment.clone(),
                    })
                }
            };
        }
        level.insert(leaf.clone(), Node::Leaf(id));

        debug!(path = %path, id = %id, created_groups = parents.len().saturating_sub(missing_from), "mapped path");
        Ok(())
    }

    /// Number of mapped paths.
    pub fn len(&self) -> usize {
        fn count(level: &BTreeMap<String, Node>) -> usize {
            level
                .values()
                .map(|node| match node {
                    Node::Leaf(_) => 1,
                    Node::Branch(children) => count(children),
                })
                .sum()
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every mapped path, joined with `separator`, with its row id.
    ///
    /// Paths are listed depth-first in segment order.
    pub fn entries(&self, separator: &str) -> Vec<(String, RowId)> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect(&self.root, &mut prefix, separator, &mut out);
        out
    }

    /// The largest mapped row id.
    pub fn max_id(&self) -> Option<RowId> {
        self.entries(".").into_iter().map(|(_, id)| id).max()
    }

    /// Check the mapper against the counter it was built with.
    ///
    /// Every id must be unique and already handed out by `counter`, and no
    /// segment may be empty.
    pub fn verify(&self, counter: &IdCounter) -> IndexResult<()> {
        let mut seen = HashSet::new();
        let mut stack: Vec<(&str, &BTreeMap<String, Node>)> = vec![("", &self.root)];
        while let Some((parent, level)) = stack.pop() {
            for (segment, node) in level {
                if segment.is_empty() {
                    return Err(IndexError::EmptySegment(parent.to_string()));
                }
                match node {
                    Node::Leaf(id) => {
                        if !seen.insert(*id) {
                            return Err(IndexError::DuplicateId(*id));
                        }
                        if !counter.has_assigned(*id) {
                            return Err(IndexError::IdOutOfRange {
                                id: *id,
                                last: counter.last(),
                            });
                        }
                    }
                    Node::Branch(children) => stack.push((segment.as_str(), children)),
                }
            }
        }
        Ok(())
    }

    /// Serialize for the `data_mapper` config entry.
    pub fn to_bytes(&self) -> IndexResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| IndexError::Serialization(e.to_string()))
    }

    /// Deserialize a `data_mapper` config entry.
    pub fn from_bytes(bytes: &[u8]) -> IndexResult<Self> {
        bincode::deserialize(bytes).map_err(|e| IndexError::Serialization(e.to_string()))
    }
}

fn collect<'a>(
    level: &'a BTreeMap<String, Node>,
    prefix: &mut Vec<&'a str>,
    separator: &str,
    out: &mut Vec<(String, RowId)>,
) {
    for (segment, node) in level {
        prefix.push(segment);
        match node {
            Node::Leaf(id) => out.push((prefix.join(separator), *id)),
            Node::Branch(children) => collect(children, prefix, separator, out),
        }
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(raw: &str) -> StorePath {
        StorePath::parse(raw, ".").unwrap()
    }

    fn id(n: i64) -> RowId {
        RowId::new(n)
    }

    fn sample() -> PathMapper {
        let mut mapper = PathMapper::new();
        mapper.insert(&p("test.test_npy1.1"), id(0)).unwrap();
        mapper.insert(&p("test.test_obj1"), id(1)).unwrap();
        mapper.insert(&p("top"), id(2)).unwrap();
        mapper
    }

    // ---------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------

    #[test]
    fn resolve_found() {
        let mapper = sample();
        assert_eq!(mapper.resolve(&p("test.test_npy1.1")), Resolution::Found(id(0)));
        assert_eq!(mapper.resolve(&p("top")), Resolution::Found(id(2)));
        assert_eq!(mapper.get(&p("test.test_obj1")), Some(id(1)));
    }

    #[test]
    fn resolve_missing_reports_first_absent_segment() {
        let mapper = sample();
        assert_eq!(mapper.resolve(&p("other")), Resolution::Missing { depth: 0 });
        assert_eq!(mapper.resolve(&p("test.test_npy2")), Resolution::Missing { depth: 1 });
        assert_eq!(
            mapper.resolve(&p("test.test_npy1.2")),
            Resolution::Missing { depth: 2 }
        );
        assert_eq!(mapper.resolve(&p("1.2.3")), Resolution::Missing { depth: 0 });
    }

    #[test]
    fn resolve_group_is_subtree() {
        let mapper = sample();
        assert_eq!(mapper.resolve(&p("test")), Resolution::LeafIsSubtree);
        assert_eq!(mapper.resolve(&p("test.test_npy1")), Resolution::LeafIsSubtree);
        assert!(!mapper.contains(&p("test")));
    }

    #[test]
    fn resolve_through_leaf() {
        let mapper = sample();
        assert_eq!(
            mapper.resolve(&p("top.child")),
            Resolution::ThroughLeaf { depth: 0, id: id(2) }
        );
        assert_eq!(
            mapper.resolve(&p("test.test_obj1.x.y")),
            Resolution::ThroughLeaf { depth: 1, id: id(1) }
        );
    }

    #[test]
    fn resolve_on_empty_mapper() {
        let mapper = PathMapper::new();
        assert_eq!(mapper.resolve(&p("a.b")), Resolution::Missing { depth: 0 });
        assert!(mapper.is_empty());
    }

    // ---------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------

    #[test]
    fn insert_creates_groups_lazily() {
        let mut mapper = PathMapper::new();
        mapper.insert(&p("a.b.c.d"), id(0)).unwrap();
        assert_eq!(mapper.resolve(&p("a.b.c")), Resolution::LeafIsSubtree);
        assert_eq!(mapper.get(&p("a.b.c.d")), Some(id(0)));
        assert_eq!(mapper.len(), 1);
    }

    #[test]
    fn insert_existing_path_fails_unchanged() {
        let mut mapper = sample();
        let before = mapper.clone();
        let err = mapper.insert(&p("top"), id(9)).unwrap_err();
        assert_eq!(
            err,
            IndexError::AlreadyMapped {
                path: "top".into(),
                id: id(2)
            }
        );
        assert_eq!(mapper, before);
    }

    #[test]
    fn insert_through_leaf_conflicts() {
        let mut mapper = sample();
        let before = mapper.clone();
        let err = mapper.insert(&p("test.test_obj1.inner"), id(9)).unwrap_err();
        assert_eq!(
            err,
            IndexError::PathConflict {
                path: "test.test_obj1.inner".into(),
                prefix: "test.test_obj1".into()
            }
        );
        assert_eq!(mapper, before);
    }

    #[test]
    fn conflict_prefix_uses_the_path_separator() {
        let mut mapper = PathMapper::new();
        let slashed = |raw: &str| StorePath::parse(raw, "/").unwrap();
        mapper.insert(&slashed("runs/1"), id(0)).unwrap();
        let err = mapper.insert(&slashed("runs/1/loss"), id(1)).unwrap_err();
        assert_eq!(
            err,
            IndexError::PathConflict {
                path: "runs/1/loss".into(),
                prefix: "runs/1".into()
            }
        );
    }

    #[test]
    fn insert_onto_group_conflicts() {
        let mut mapper = sample();
        let err = mapper.insert(&p("test"), id(9)).unwrap_err();
        assert!(matches!(err, IndexError::PathConflict { .. }));
    }

    // ---------------------------------------------------------------
    // Enumeration and integrity
    // ---------------------------------------------------------------

    #[test]
    fn entries_are_depth_first_in_key_order() {
        let mapper = sample();
        let entries = mapper.entries(".");
        assert_eq!(
            entries,
            vec![
                ("test.test_npy1.1".to_string(), id(0)),
                ("test.test_obj1".to_string(), id(1)),
                ("top".to_string(), id(2)),
            ]
        );
        assert_eq!(mapper.entries("/")[0].0, "test/test_npy1/1");
        assert_eq!(mapper.max_id(), Some(id(2)));
        assert_eq!(mapper.len(), 3);
    }

    #[test]
    fn verify_accepts_consistent_mapper() {
        let mapper = sample();
        mapper.verify(&IdCounter::from_last(2).unwrap()).unwrap();
        PathMapper::new().verify(&IdCounter::new()).unwrap();
    }

    #[test]
    fn verify_rejects_ids_beyond_counter() {
        let mapper = sample();
        let err = mapper.verify(&IdCounter::from_last(1).unwrap()).unwrap_err();
        assert_eq!(err, IndexError::IdOutOfRange { id: id(2), last: 1 });
    }

    #[test]
    fn verify_rejects_duplicate_ids() {
        let mut mapper = sample();
        mapper.insert(&p("again"), id(1)).unwrap();
        let err = mapper.verify(&IdCounter::from_last(2).unwrap()).unwrap_err();
        assert_eq!(err, IndexError::DuplicateId(id(1)));
    }

    #[test]
    fn bytes_roundtrip_and_garbage() {
        let mapper = sample();
        let bytes = mapper.to_bytes().unwrap();
        assert_eq!(PathMapper::from_bytes(&bytes).unwrap(), mapper);

        let err = PathMapper::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, IndexError::Serialization(_)));
    }

    proptest! {
        #[test]
        fn inserted_paths_resolve_to_their_ids(
            paths in proptest::collection::btree_set("[a-c]{1,2}(\\.[a-c]{1,2}){0,2}", 1..12)
        ) {
            let mut mapper = PathMapper::new();
            let mut counter = IdCounter::new();
            let mut mapped = Vec::new();
            for raw in &paths {
                let path = p(raw);
                if let Resolution::Missing { .. } = mapper.resolve(&path) {
                    let next = counter.advance().unwrap();
                    mapper.insert(&path, next).unwrap();
                    mapped.push((path, next));
                }
            }
            for (path, expected) in &mapped {
                prop_assert_eq!(mapper.get(path), Some(*expected));
            }
            prop_assert_eq!(mapper.len(), mapped.len());
            prop_assert!(mapper.verify(&counter).is_ok());
        }
    }
}

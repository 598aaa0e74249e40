//! In-memory ordered index (spec §4.C).
//!
//! Unlike the Pager, a `BTreeIndex` never touches disk directly: it is
//! rebuilt from a full table scan every time the database is opened (see
//! `catalog::IndexManager`), and the catalog only persists the
//! `(table, field)` pair that says an index should exist, in `_indexes`.
//!
//! Structure: a small arena of [`BTreeNode`]s addressed by [`NodeId`].
//! Leaves hold a key-sorted array searched with binary search; internal
//! nodes fan out (default 32) to bound tree height. Keys compare via
//! [`key_cmp`], which orders `Null < Bool < Number < Text` and falls back
//! to the natural order within a type (spec: "any JSON-comparable
//! value").

mod node;
#[cfg(test)]
mod tests;

pub use node::{BTreeNode, NodeId, NodeType, FANOUT};

use common::RecordId;
use std::cmp::Ordering;
use types::Value;

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::Text(_) => 3,
    }
}

/// Total order over JSON-comparable scalars, used for index keys.
pub fn key_cmp(a: &Value, b: &Value) -> Ordering {
    match a.partial_compare(b) {
        Some(o) => o,
        None => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Summary statistics for `SHOW STATS` / `EXPLAIN`.
#[derive(Clone, Debug, Default)]
pub struct IndexStats {
    pub entry_count: usize,
    pub node_count: usize,
    pub height: usize,
}

/// An in-memory ordered index over one `(table, field)` pair.
#[derive(Clone, Debug)]
pub struct BTreeIndex {
    table: String,
    field: String,
    arena: Vec<BTreeNode>,
    root: NodeId,
}

impl BTreeIndex {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            arena: vec![BTreeNode::new_leaf()],
            root: NodeId(0),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn is_empty(&self) -> bool {
        self.stats().entry_count == 0
    }

    /// Insert a key -> row-reference mapping. Synchronous with the DML
    /// operation that changed the indexed field (spec §4.C
    /// "Consistency").
    pub fn insert(&mut self, key: Value, rid: RecordId) {
        if let Some((sep, new_node)) = self.insert_rec(self.root, key, rid) {
            let old_root = self.root;
            self.arena.push(BTreeNode::Internal {
                keys: vec![sep],
                children: vec![old_root, new_node],
            });
            self.root = NodeId(self.arena.len() - 1);
        }
    }

    fn child_index(keys: &[Value], key: &Value) -> usize {
        keys.partition_point(|k| key_cmp(k, key) != Ordering::Greater)
    }

    fn insert_rec(&mut self, node_id: NodeId, key: Value, rid: RecordId) -> Option<(Value, NodeId)> {
        if self.arena[node_id.0].is_leaf() {
            return self.insert_into_leaf(node_id, key, rid);
        }
        let (child_idx, child_id) = match &self.arena[node_id.0] {
            BTreeNode::Internal { keys, children } => {
                let idx = Self::child_index(keys, &key);
                (idx, children[idx])
            }
            BTreeNode::Leaf { .. } => unreachable!(),
        };
        let split = self.insert_rec(child_id, key, rid);
        let Some((sep, new_child)) = split else { return None };
        let BTreeNode::Internal { keys, children } = &mut self.arena[node_id.0] else {
            unreachable!()
        };
        keys.insert(child_idx, sep);
        children.insert(child_idx + 1, new_child);
        if keys.len() > FANOUT {
            Some(self.split_internal(node_id))
        } else {
            None
        }
    }

    fn insert_into_leaf(&mut self, node_id: NodeId, key: Value, rid: RecordId) -> Option<(Value, NodeId)> {
        let BTreeNode::Leaf { entries, .. } = &mut self.arena[node_id.0] else {
            unreachable!()
        };
        match entries.binary_search_by(|(k, _)| key_cmp(k, &key)) {
            Ok(i) => entries[i].1.push(rid),
            Err(i) => entries.insert(i, (key, vec![rid])),
        }
        if self.arena[node_id.0].len() > FANOUT {
            Some(self.split_leaf(node_id))
        } else {
            None
        }
    }

    fn split_leaf(&mut self, node_id: NodeId) -> (Value, NodeId) {
        let (right_entries, next_leaf) = match &mut self.arena[node_id.0] {
            BTreeNode::Leaf { entries, next_leaf } => {
                let mid = entries.len() / 2;
                (entries.split_off(mid), *next_leaf)
            }
            BTreeNode::Internal { .. } => unreachable!(),
        };
        let sep = right_entries[0].0.clone();
        self.arena.push(BTreeNode::Leaf { entries: right_entries, next_leaf });
        let new_id = NodeId(self.arena.len() - 1);
        if let BTreeNode::Leaf { next_leaf, .. } = &mut self.arena[node_id.0] {
            *next_leaf = Some(new_id);
        }
        (sep, new_id)
    }

    fn split_internal(&mut self, node_id: NodeId) -> (Value, NodeId) {
        let (mid_key, right_keys, right_children) = match &mut self.arena[node_id.0] {
            BTreeNode::Internal { keys, children } => {
                let mid = keys.len() / 2;
                let mid_key = keys[mid].clone();
                let right_keys = keys.split_off(mid + 1);
                keys.pop();
                let right_children = children.split_off(mid + 1);
                (mid_key, right_keys, right_children)
            }
            BTreeNode::Leaf { .. } => unreachable!(),
        };
        self.arena
            .push(BTreeNode::Internal { keys: right_keys, children: right_children });
        (mid_key, NodeId(self.arena.len() - 1))
    }

    fn leaf_for(&self, key: &Value) -> NodeId {
        let mut current = self.root;
        loop {
            match &self.arena[current.0] {
                BTreeNode::Leaf { .. } => return current,
                BTreeNode::Internal { keys, children } => {
                    current = children[Self::child_index(keys, key)];
                }
            }
        }
    }

    /// Exact-match lookup (spec §4.C `find`).
    pub fn find(&self, key: &Value) -> Vec<RecordId> {
        let leaf = self.leaf_for(key);
        let BTreeNode::Leaf { entries, .. } = &self.arena[leaf.0] else {
            return Vec::new();
        };
        match entries.binary_search_by(|(k, _)| key_cmp(k, key)) {
            Ok(i) => entries[i].1.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Inclusive range lookup (spec §4.C `range`). Walks leaves via their
    /// `next_leaf` links so the traversal cost is proportional to the
    /// number of matching entries, not the tree size.
    pub fn range(&self, lo: &Value, hi: &Value) -> Vec<RecordId> {
        let mut out = Vec::new();
        let mut leaf = Some(self.leaf_for(lo));
        while let Some(id) = leaf {
            let BTreeNode::Leaf { entries, next_leaf } = &self.arena[id.0] else {
                break;
            };
            for (k, rids) in entries {
                if key_cmp(k, lo) == Ordering::Less {
                    continue;
                }
                if key_cmp(k, hi) == Ordering::Greater {
                    return out;
                }
                out.extend(rids.iter().copied());
            }
            leaf = *next_leaf;
        }
        out
    }

    /// Remove a single `(key, rid)` mapping. If `rid` is `None`, removes
    /// every reference for `key`. No rebalancing is attempted on
    /// underflow; correctness of `find`/`range` does not depend on node
    /// occupancy.
    pub fn delete(&mut self, key: &Value, rid: Option<RecordId>) {
        let leaf = self.leaf_for(key);
        let BTreeNode::Leaf { entries, .. } = &mut self.arena[leaf.0] else {
            return;
        };
        if let Ok(i) = entries.binary_search_by(|(k, _)| key_cmp(k, key)) {
            match rid {
                Some(rid) => entries[i].1.retain(|r| *r != rid),
                None => entries[i].1.clear(),
            }
            if entries[i].1.is_empty() {
                entries.remove(i);
            }
        }
    }

    pub fn stats(&self) -> IndexStats {
        let entry_count = self
            .arena
            .iter()
            .filter_map(|n| match n {
                BTreeNode::Leaf { entries, .. } => Some(entries.iter().map(|(_, r)| r.len()).sum::<usize>()),
                BTreeNode::Internal { .. } => None,
            })
            .sum();
        let mut height = 1;
        let mut current = self.root;
        loop {
            match &self.arena[current.0] {
                BTreeNode::Leaf { .. } => break,
                BTreeNode::Internal { children, .. } => {
                    height += 1;
                    current = children[0];
                }
            }
        }
        IndexStats { entry_count, node_count: self.arena.len(), height }
    }

    /// All `(key, rid)` pairs, for consistency checks (spec §8 invariant
    /// 2: the index's multiset must equal the table's).
    pub fn all_entries(&self) -> Vec<(Value, RecordId)> {
        let mut out = Vec::new();
        for node in &self.arena {
            if let BTreeNode::Leaf { entries, .. } = node {
                for (k, rids) in entries {
                    for rid in rids {
                        out.push((k.clone(), *rid));
                    }
                }
            }
        }
        out
    }
}

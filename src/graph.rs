#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! Arena of small mapping nodes.
//!
//! Every node built by [`MapGraph::build_chained`] holds two entries: an
//! `A…` key pointing at the node it wraps, and a `B…` key pointing back at
//! itself. Nodes refer to each other by [`NodeId`], so the self-reference is
//! a stored index rather than an owning cycle.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

pub const DEPTH_KEY_PREFIX: char = 'A';
pub const SELF_KEY_PREFIX: char = 'B';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug, Default)]
pub struct MapNode {
    entries: HashMap<String, NodeId>,
}

impl MapNode {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Target of the first entry whose key starts with `prefix`.
    pub fn entry_with_prefix(&self, prefix: char) -> Option<NodeId> {
        self.entries
            .iter()
            .find(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| *v)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapGraph {
    nodes: Vec<MapNode>,
}

impl MapGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a mapping with no entries.
    pub fn empty_map(&mut self) -> NodeId {
        self.nodes.push(MapNode::default());
        NodeId(self.nodes.len() - 1)
    }

    /// # Panics
    /// If `id` was not produced by this graph.
    pub fn node(&self, id: NodeId) -> &MapNode {
        &self.nodes[id.0]
    }

    pub fn insert(&mut self, map: NodeId, key: impl Into<String>, target: NodeId) {
        self.nodes[map.0].entries.insert(key.into(), target);
    }

    /// Wraps `seed` in `count` new nodes and returns the outermost one.
    pub fn build_chained(&mut self, seed: NodeId, count: usize) -> NodeId {
        let mut head = seed;
        for _ in 0..count {
            let previous = head;
            head = self.empty_map();
            self.insert(head, stamped_key(DEPTH_KEY_PREFIX), previous);
            self.insert(head, stamped_key(SELF_KEY_PREFIX), head);
        }
        head
    }

    /// Wrapping sum of `key_hash(key) + len(target)` over the entries of `map`.
    pub fn sum(&self, map: NodeId) -> u64 {
        self.node(map).entries().fold(0u64, |acc, (key, target)| {
            let nested = self.node(target).len() as u64;
            acc.wrapping_add(key_hash(key).wrapping_add(nested))
        })
    }
}

pub fn key_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

fn stamped_key(prefix: char) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}{nanos}")
}

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use heap_pressure::graph::{key_hash, MapGraph, DEPTH_KEY_PREFIX, SELF_KEY_PREFIX};

#[test]
fn zero_count_returns_seed() {
    let mut g = MapGraph::new();
    let seed = g.empty_map();
    assert_eq!(g.build_chained(seed, 0), seed);
    assert_eq!(g.len(), 1);
}

#[test]
fn every_node_points_at_itself() {
    let mut g = MapGraph::new();
    let seed = g.empty_map();
    let head = g.build_chained(seed, 5);
    assert_eq!(g.len(), 6);
    assert_eq!(g.node(head).len(), 2);
    assert_eq!(g.node(head).entry_with_prefix(SELF_KEY_PREFIX), Some(head));
}

#[test]
fn depth_links_lead_back_to_seed() {
    let mut g = MapGraph::new();
    let seed = g.empty_map();
    let head = g.build_chained(seed, 4);
    let mut cursor = head;
    let mut depth = 0;
    while let Some(prev) = g.node(cursor).entry_with_prefix(DEPTH_KEY_PREFIX) {
        assert_eq!(g.node(cursor).entry_with_prefix(SELF_KEY_PREFIX), Some(cursor));
        cursor = prev;
        depth += 1;
    }
    assert_eq!(cursor, seed);
    assert_eq!(depth, 4);
    assert!(g.node(seed).is_empty());
}

#[test]
fn chaining_onto_existing_graph() {
    let mut g = MapGraph::new();
    let seed = g.empty_map();
    let first = g.build_chained(seed, 2);
    let second = g.build_chained(first, 3);
    let mut cursor = second;
    for _ in 0..3 {
        cursor = g.node(cursor).entry_with_prefix(DEPTH_KEY_PREFIX).unwrap();
    }
    assert_eq!(cursor, first);
}

#[test]
fn sum_of_single_entry() {
    let mut g = MapGraph::new();
    let seed = g.empty_map();
    let nested = g.build_chained(seed, 1);
    let map = g.empty_map();
    g.insert(map, "key", nested);
    assert_eq!(g.sum(map), key_hash("key") + 2);
}

#[test]
fn sum_of_empty_map_is_zero() {
    let mut g = MapGraph::new();
    let seed = g.empty_map();
    assert_eq!(g.sum(seed), 0);
}

#[test]
fn sum_folds_all_entries() {
    let mut g = MapGraph::new();
    let empty = g.empty_map();
    let map = g.empty_map();
    g.insert(map, "x", empty);
    g.insert(map, "y", map);
    let expected = key_hash("x").wrapping_add(key_hash("y")).wrapping_add(2);
    assert_eq!(g.sum(map), expected);
}

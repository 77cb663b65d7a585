//! Statistician (C9): a single traversal counting directives by kind,
//! following the same include-descent discipline as the query engine so
//! shared include targets aren't counted twice.

use crate::arena::{Arena, Position};
use crate::node::NodeKind;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Walks the tree once, counting nodes by their kind tag.
pub fn statistics(arena: &Arena, root: Position) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    let mut visited = HashSet::new();
    walk(arena, root, &mut visited, &mut counts);
    counts
}

/// [`statistics`] rendered as a flat JSON object, plus a `total` scalar
/// summing every count.
pub fn statistics_json(arena: &Arena, root: Position) -> Value {
    let counts = statistics(arena, root);
    let total: u64 = counts.values().sum();
    let mut map = Map::new();
    for (kind, count) in counts {
        map.insert(kind, Value::from(count));
    }
    map.insert("total".to_string(), Value::from(total));
    Value::Object(map)
}

fn walk(
    arena: &Arena,
    context: Position,
    visited: &mut HashSet<Position>,
    counts: &mut HashMap<String, u64>,
) {
    let node = arena.get(context);
    for &child_pos in &node.children {
        let child = arena.get(child_pos);
        *counts.entry(child.kind.tag()).or_insert(0) += 1;

        if matches!(child.kind, NodeKind::Include) {
            for &target in &child.children {
                if visited.insert(target) {
                    walk(arena, target, visited, counts);
                }
            }
        } else if child.kind.is_context() {
            walk(arena, child_pos, visited, counts);
        }
    }
}

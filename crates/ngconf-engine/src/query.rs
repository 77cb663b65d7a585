//! Query engine (C5): depth-first pre-order traversal matching a parsed
//! [`Keyword`], descending through `Include` edges into their target
//! `Config` nodes.

use crate::arena::{Arena, Position};
use crate::error::{EngineError, EngineResult};
use crate::keyword::Keyword;
use crate::node::NodeKind;
use std::collections::HashSet;

/// An opaque handle identifying a node by its parent context and index
/// within that context, tagged with the bundle generation it was issued
/// against so a later mutation can be detected as staleness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Queryer {
    pub parent: Position,
    pub index: usize,
    pub generation: u64,
}

impl Queryer {
    /// Resolves this handle back to the node it points at, failing if the
    /// bundle has been mutated since the handle was issued.
    pub fn resolve(&self, arena: &Arena, current_generation: u64) -> EngineResult<Position> {
        if self.generation != current_generation {
            return Err(EngineError::StaleQueryer);
        }
        let parent = arena.get(self.parent);
        parent
            .children
            .get(self.index)
            .copied()
            .ok_or(EngineError::StaleQueryer)
    }
}

/// Returns the first node matching `keyword` in depth-first pre-order,
/// starting from `root`.
pub fn query(
    arena: &Arena,
    root: Position,
    keyword: &Keyword,
    generation: u64,
) -> EngineResult<Queryer> {
    let mut visited = HashSet::new();
    find_first(arena, root, keyword, &mut visited, generation).ok_or(EngineError::NotFound)
}

/// Returns every node matching `keyword` in depth-first pre-order,
/// starting from `root`.
pub fn query_all(arena: &Arena, root: Position, keyword: &Keyword, generation: u64) -> Vec<Queryer> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    collect_all(arena, root, keyword, &mut visited, generation, &mut out);
    out
}

fn find_first(
    arena: &Arena,
    context: Position,
    keyword: &Keyword,
    visited: &mut HashSet<Position>,
    generation: u64,
) -> Option<Queryer> {
    let node = arena.get(context);
    for (index, &child_pos) in node.children.iter().enumerate() {
        let child = arena.get(child_pos);
        if child.kind.tag() == keyword.kind && keyword.matches_text(&child.query_text()) {
            return Some(Queryer {
                parent: context,
                index,
                generation,
            });
        }
        if matches!(child.kind, NodeKind::Include) {
            for &target in &child.children {
                if visited.insert(target)
                    && let Some(found) = find_first(arena, target, keyword, visited, generation)
                {
                    return Some(found);
                }
            }
        } else if child.kind.is_context()
            && let Some(found) = find_first(arena, child_pos, keyword, visited, generation)
        {
            return Some(found);
        }
    }
    None
}

fn collect_all(
    arena: &Arena,
    context: Position,
    keyword: &Keyword,
    visited: &mut HashSet<Position>,
    generation: u64,
    out: &mut Vec<Queryer>,
) {
    let node = arena.get(context);
    for (index, &child_pos) in node.children.iter().enumerate() {
        let child = arena.get(child_pos);
        if child.kind.tag() == keyword.kind && keyword.matches_text(&child.query_text()) {
            out.push(Queryer {
                parent: context,
                index,
                generation,
            });
        }
        if matches!(child.kind, NodeKind::Include) {
            for &target in &child.children {
                if visited.insert(target) {
                    collect_all(arena, target, keyword, visited, generation, out);
                }
            }
        } else if child.kind.is_context() {
            collect_all(arena, child_pos, keyword, visited, generation, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::parse_keyword;
    use crate::node::NodeData;

    fn build_simple() -> (Arena, Position) {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/etc/nginx/nginx.conf"));
        let http = arena.alloc(NodeData::new(NodeKind::Http, ""));
        let server = arena.alloc(NodeData::new(NodeKind::Server, ""));
        let listen = arena.alloc(NodeData::new(NodeKind::Key("listen".to_string()), "80"));
        arena.get_mut(server).children.push(listen);
        arena.get_mut(http).children.push(server);
        arena.get_mut(root).children.push(http);
        (arena, root)
    }

    #[test]
    fn finds_nested_node() {
        let (arena, root) = build_simple();
        let kw = parse_keyword("server").unwrap();
        let q = query(&arena, root, &kw, 0).unwrap();
        let resolved = q.resolve(&arena, 0).unwrap();
        assert_eq!(arena.get(resolved).kind, NodeKind::Server);
    }

    #[test]
    fn not_found_returns_error() {
        let (arena, root) = build_simple();
        let kw = parse_keyword("upstream").unwrap();
        let err = query(&arena, root, &kw, 0).unwrap_err();
        assert_eq!(err.tag(), "not-found");
    }

    #[test]
    fn query_all_collects_every_match() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/main.conf"));
        let http = arena.alloc(NodeData::new(NodeKind::Http, ""));
        for port in ["80", "81", "82"] {
            let server = arena.alloc(NodeData::new(NodeKind::Server, ""));
            let listen = arena.alloc(NodeData::new(NodeKind::Key("listen".to_string()), port));
            arena.get_mut(server).children.push(listen);
            arena.get_mut(http).children.push(server);
        }
        arena.get_mut(root).children.push(http);

        let kw = parse_keyword("key:sep: listen 80").unwrap();
        let matches = query_all(&arena, root, &kw, 0);
        assert_eq!(matches.len(), 1);

        let kw_all = parse_keyword("key:sep: :reg: ^listen").unwrap();
        let matches_all = query_all(&arena, root, &kw_all, 0);
        assert_eq!(matches_all.len(), 3);
    }

    #[test]
    fn stale_queryer_detected_after_generation_bump() {
        let (arena, root) = build_simple();
        let kw = parse_keyword("server").unwrap();
        let q = query(&arena, root, &kw, 0).unwrap();
        let err = q.resolve(&arena, 1).unwrap_err();
        assert_eq!(err.tag(), "stale-queryer");
    }
}

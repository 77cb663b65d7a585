//! Dumper (C8): produces a map from relative file path to rendered bytes,
//! one entry per `Config` node reachable through the include graph, without
//! flattening includes into their targets.

use crate::arena::{Arena, Position};
use crate::node::NodeKind;
use crate::tree;
use std::collections::HashMap;
use std::path::Path;

/// Dumps every `Config` node reachable from `root` to a map of relative
/// path -> rendered bytes. `root`'s own key is its bare filename; every
/// other `Config`'s key is its path relative to the directory containing
/// `root`'s file.
pub fn dump(arena: &Arena, root: Position) -> HashMap<String, Vec<u8>> {
    let mut out = HashMap::new();
    let root_path = Path::new(&arena.get(root).value);
    let base_dir = root_path.parent().unwrap_or_else(|| Path::new(""));

    let mut visited = std::collections::HashSet::new();
    let mut stack = vec![root];
    while let Some(config_pos) = stack.pop() {
        if !visited.insert(config_pos) {
            continue;
        }
        let node = arena.get(config_pos);
        let key = if config_pos == root {
            root_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| node.value.clone())
        } else {
            let abs = Path::new(&node.value);
            abs.strip_prefix(base_dir)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|_| node.value.clone())
        };
        out.insert(key, tree::bytes(arena, config_pos));

        for &child in &node.children {
            if matches!(arena.get(child).kind, NodeKind::Include) {
                stack.extend(arena.get(child).children.iter().copied());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;

    #[test]
    fn dumps_main_file_and_include_target_separately() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/etc/nginx/nginx.conf"));
        let include = arena.alloc(NodeData::new(NodeKind::Include, "conf.d/a.conf"));
        let target = arena.alloc(NodeData::new(NodeKind::Config, "/etc/nginx/conf.d/a.conf"));
        let server = arena.alloc(NodeData::new(NodeKind::Server, ""));
        arena.get_mut(target).children.push(server);
        arena.get_mut(include).children.push(target);
        arena.get_mut(root).children.push(include);

        let map = dump(&arena, root);
        assert_eq!(map.len(), 2);
        assert!(String::from_utf8_lossy(&map["nginx.conf"]).contains("include conf.d/a.conf;"));
        assert!(!String::from_utf8_lossy(&map["nginx.conf"]).contains("server"));
        assert!(String::from_utf8_lossy(&map["conf.d/a.conf"]).contains("server {"));
    }
}

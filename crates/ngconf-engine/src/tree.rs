//! Node-level rendering (C1 `bytes()`): turns a node and its children back
//! into Nginx-style text. Whitespace is normalized on output — this is not
//! a byte-exact round-tripper of the original source.

use crate::arena::{Arena, Position};
use crate::node::NodeKind;
use std::collections::HashSet;

/// Renders `position` and its owned subtree to Nginx configuration text,
/// indented starting at `depth` levels. `Include` nodes render as a plain
/// `include <pattern>;` directive — their resolved targets are not
/// flattened into this output (see the dumper, C8, for multi-file output).
pub fn render(arena: &Arena, position: Position, depth: usize) -> String {
    let node = arena.get(position);
    let indent = "    ".repeat(depth);
    match &node.kind {
        NodeKind::Config => render_children(arena, position, depth),
        NodeKind::Include => format!("{indent}include {};\n", node.value),
        NodeKind::Key(name) => {
            if node.value.is_empty() {
                format!("{indent}{name};\n")
            } else {
                format!("{indent}{name} {};\n", node.value)
            }
        }
        NodeKind::Comment => format!("{indent}# {}\n", node.value),
        other => {
            let name = other.tag();
            let header = if node.value.is_empty() {
                format!("{indent}{name} {{\n")
            } else {
                format!("{indent}{name} {} {{\n", node.value)
            };
            let body = render_children(arena, position, depth + 1);
            format!("{header}{body}{indent}}}\n")
        }
    }
}

fn render_children(arena: &Arena, position: Position, depth: usize) -> String {
    let node = arena.get(position);
    node.children
        .iter()
        .map(|&child| render(arena, child, depth))
        .collect()
}

/// Renders the whole subtree rooted at `position` as bytes.
pub fn bytes(arena: &Arena, position: Position) -> Vec<u8> {
    render(arena, position, 0).into_bytes()
}

/// Like [`render`], but splices each `Include`'s resolved target `Config`
/// children in place of the `include <pattern>;` line instead of printing
/// it literally — used by `Bundle::view` (SPEC_FULL.md's `View()`, which is
/// flattened through includes, unlike the dumper's per-file output). `path`
/// tracks `Config` positions currently being rendered on the active
/// recursion path, guarding against an include cycle recursing forever; it
/// does not suppress a diamond include appearing more than once.
pub fn render_flattened(
    arena: &Arena,
    position: Position,
    depth: usize,
    path: &mut HashSet<Position>,
) -> String {
    let node = arena.get(position);
    let indent = "    ".repeat(depth);
    match &node.kind {
        NodeKind::Config => render_children_flattened(arena, position, depth, path),
        NodeKind::Include => {
            let mut out = String::new();
            for &target in &node.children {
                if path.insert(target) {
                    out.push_str(&render_children_flattened(arena, target, depth, path));
                    path.remove(&target);
                }
            }
            out
        }
        NodeKind::Key(name) => {
            if node.value.is_empty() {
                format!("{indent}{name};\n")
            } else {
                format!("{indent}{name} {};\n", node.value)
            }
        }
        NodeKind::Comment => format!("{indent}# {}\n", node.value),
        other => {
            let name = other.tag();
            let header = if node.value.is_empty() {
                format!("{indent}{name} {{\n")
            } else {
                format!("{indent}{name} {} {{\n", node.value)
            };
            let body = render_children_flattened(arena, position, depth + 1, path);
            format!("{header}{body}{indent}}}\n")
        }
    }
}

fn render_children_flattened(
    arena: &Arena,
    position: Position,
    depth: usize,
    path: &mut HashSet<Position>,
) -> String {
    let node = arena.get(position);
    node.children
        .iter()
        .map(|&child| render_flattened(arena, child, depth, path))
        .collect()
}

/// Renders the whole subtree rooted at `position` as bytes, flattened
/// through includes (see [`render_flattened`]).
pub fn bytes_flattened(arena: &Arena, position: Position) -> Vec<u8> {
    let mut path = HashSet::new();
    path.insert(position);
    render_flattened(arena, position, 0, &mut path).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;

    #[test]
    fn renders_block_with_children() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/main.conf"));
        let http = arena.alloc(NodeData::new(NodeKind::Http, ""));
        let server = arena.alloc(NodeData::new(NodeKind::Server, ""));
        let listen = arena.alloc(NodeData::new(NodeKind::Key("listen".to_string()), "80"));
        arena.get_mut(server).children.push(listen);
        arena.get_mut(http).children.push(server);
        arena.get_mut(root).children.push(http);

        let text = render(&arena, root, 0);
        assert_eq!(text, "http {\n    server {\n        listen 80;\n    }\n}\n");
    }

    #[test]
    fn renders_comment_and_include() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/main.conf"));
        let comment = arena.alloc(NodeData::new(NodeKind::Comment, "managed by ngconf"));
        let include = arena.alloc(NodeData::new(NodeKind::Include, "conf.d/*.conf"));
        arena.get_mut(root).children.push(comment);
        arena.get_mut(root).children.push(include);

        let text = render(&arena, root, 0);
        assert_eq!(text, "# managed by ngconf\ninclude conf.d/*.conf;\n");
    }

    #[test]
    fn flattened_render_splices_include_target_content() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/main.conf"));
        let include = arena.alloc(NodeData::new(NodeKind::Include, "conf.d/a.conf"));
        let target = arena.alloc(NodeData::new(NodeKind::Config, "/conf.d/a.conf"));
        let server = arena.alloc(NodeData::new(NodeKind::Server, ""));
        let listen = arena.alloc(NodeData::new(NodeKind::Key("listen".to_string()), "81"));
        arena.get_mut(server).children.push(listen);
        arena.get_mut(target).children.push(server);
        arena.get_mut(include).children.push(target);
        arena.get_mut(root).children.push(include);

        let mut path = HashSet::new();
        path.insert(root);
        let text = render_flattened(&arena, root, 0, &mut path);
        assert_eq!(text, "server {\n    listen 81;\n}\n");
        assert!(!text.contains("include"));
    }
}

//! JSON view of a configuration tree (§6): a recursive object
//! `{"kind", "value", "children": [...]}`. `Include` nodes embed their
//! resolved `Config` targets inline as `children`; loading back from JSON
//! rebuilds identity by matching each embedded `Config`'s `value` path
//! rather than by any stored position.

use crate::arena::{Arena, Position};
use crate::error::{EngineError, EngineResult};
use crate::loader::OwnerMap;
use crate::loop_preventer::LoopPreventer;
use crate::node::{NodeData, NodeKind};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/// Renders `root` and its owned subtree (descending into `Include`
/// targets) as the recursive JSON shape described in §6.
pub fn to_json(arena: &Arena, root: Position) -> Value {
    let node = arena.get(root);
    let mut map = Map::new();
    map.insert("kind".to_string(), Value::String(node.kind.json_tag()));
    map.insert("value".to_string(), Value::String(node.value.clone()));
    let children: Vec<Value> = node
        .children
        .iter()
        .map(|&child| to_json(arena, child))
        .collect();
    map.insert("children".to_string(), Value::Array(children));
    Value::Object(map)
}

/// The result of reconstructing a tree from JSON: same shape as
/// [`crate::loader::LoadedBundle`] but with no filesystem identity behind
/// any `Config` node beyond the `value` path string it carries.
pub struct LoadedFromJson {
    pub arena: Arena,
    pub root: Position,
    pub preventer: LoopPreventer,
    pub owner: OwnerMap,
    pub path_index: HashMap<PathBuf, Position>,
}

/// Parses the `Json()` shape back into a tree. Include edges are rebuilt
/// by matching the `value` path of nested `Config` objects — the same
/// absolute path appearing twice (e.g. two includes of the same file)
/// resolves to the same arena `Position`.
pub fn from_json_bytes(bytes: &[u8]) -> EngineResult<LoadedFromJson> {
    let value: Value = serde_json::from_slice(bytes)?;
    let mut arena = Arena::new();
    let mut preventer = LoopPreventer::new();
    let mut owner = OwnerMap::new();
    let mut path_index: HashMap<PathBuf, Position> = HashMap::new();

    let root = lower_value(&value, &mut arena, &mut preventer, &mut owner, &mut path_index, None)?;

    if arena.get(root).kind != NodeKind::Config {
        return Err(EngineError::TypeMismatch);
    }

    Ok(LoadedFromJson {
        arena,
        root,
        preventer,
        owner,
        path_index,
    })
}

fn lower_value(
    value: &Value,
    arena: &mut Arena,
    preventer: &mut LoopPreventer,
    owner: &mut OwnerMap,
    path_index: &mut HashMap<PathBuf, Position>,
    owning_config: Option<Position>,
) -> EngineResult<Position> {
    let obj = value
        .as_object()
        .ok_or_else(|| EngineError::ParseError("expected a JSON object node".to_string()))?;
    let kind_tag = obj
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::ParseError("node missing \"kind\"".to_string()))?;
    let node_value = obj
        .get("value")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let kind = NodeKind::from_json_tag(kind_tag)
        .ok_or_else(|| EngineError::ParseError(format!("unknown node kind \"{kind_tag}\"")))?;

    if kind == NodeKind::Config {
        let path = PathBuf::from(&node_value);
        if let Some(&existing) = path_index.get(&path) {
            if let Some(owning) = owning_config {
                if preventer.check(owning, existing) {
                    return Err(EngineError::IncludeLoop);
                }
                preventer.add_route(owning, existing);
            }
            return Ok(existing);
        }

        let pos = arena.alloc(NodeData::new(NodeKind::Config, node_value.clone()));
        path_index.insert(path, pos);
        owner.insert(pos, pos);
        if let Some(owning) = owning_config {
            if preventer.check(owning, pos) {
                return Err(EngineError::IncludeLoop);
            }
            preventer.add_route(owning, pos);
        }

        let children = obj.get("children").and_then(Value::as_array);
        let mut child_positions = Vec::new();
        if let Some(children) = children {
            for child in children {
                child_positions.push(lower_value(
                    child,
                    arena,
                    preventer,
                    owner,
                    path_index,
                    Some(pos),
                )?);
            }
        }
        arena.get_mut(pos).children = child_positions;
        return Ok(pos);
    }

    let owning = owning_config
        .ok_or_else(|| EngineError::ParseError("node outside a Config root".to_string()))?;
    let pos = arena.alloc(NodeData::new(kind, node_value));
    owner.insert(pos, owning);

    let children = obj.get("children").and_then(Value::as_array);
    let mut child_positions = Vec::new();
    if let Some(children) = children {
        for child in children {
            child_positions.push(lower_value(
                child,
                arena,
                preventer,
                owner,
                path_index,
                Some(owning),
            )?);
        }
    }
    arena.get_mut(pos).children = child_positions;
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;

    #[test]
    fn round_trips_simple_tree() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/main.conf"));
        let server = arena.alloc(NodeData::new(NodeKind::Server, ""));
        let listen = arena.alloc(NodeData::new(NodeKind::Key("listen".to_string()), "80"));
        arena.get_mut(server).children.push(listen);
        arena.get_mut(root).children.push(server);

        let json = to_json(&arena, root);
        let bytes = serde_json::to_vec(&json).unwrap();
        let loaded = from_json_bytes(&bytes).unwrap();

        assert_eq!(loaded.arena.get(loaded.root).kind, NodeKind::Config);
        assert_eq!(loaded.arena.get(loaded.root).value, "/main.conf");
        let server_pos = loaded.arena.get(loaded.root).children[0];
        assert_eq!(loaded.arena.get(server_pos).kind, NodeKind::Server);
    }

    #[test]
    fn rebuilds_shared_include_identity_by_path() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(NodeKind::Config, "/main.conf"));
        let inc_a = arena.alloc(NodeData::new(NodeKind::Include, "shared.conf"));
        let inc_b = arena.alloc(NodeData::new(NodeKind::Include, "shared.conf"));
        let shared = arena.alloc(NodeData::new(NodeKind::Config, "/shared.conf"));
        arena.get_mut(inc_a).children.push(shared);
        arena.get_mut(inc_b).children.push(shared);
        arena.get_mut(root).children.push(inc_a);
        arena.get_mut(root).children.push(inc_b);

        let json = to_json(&arena, root);
        let bytes = serde_json::to_vec(&json).unwrap();
        let loaded = from_json_bytes(&bytes).unwrap();

        let root_children = &loaded.arena.get(loaded.root).children;
        let first = loaded.arena.get(root_children[0]).children[0];
        let second = loaded.arena.get(root_children[1]).children[0];
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_unknown_kind_tag() {
        let bytes = br#"{"kind": "not-a-real-kind", "value": "", "children": []}"#;
        let err = from_json_bytes(bytes).unwrap_err();
        assert_eq!(err.tag(), "parse-error");
    }

    #[test]
    fn rejects_non_config_root() {
        let bytes = br#"{"kind": "server", "value": "", "children": []}"#;
        let err = from_json_bytes(bytes).unwrap_err();
        assert_eq!(err.tag(), "type-mismatch");
    }
}

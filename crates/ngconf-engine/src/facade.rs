//! Mutation façade (C7): the sole writer of a configuration tree. Holds the
//! root `Config`, a reader-writer lock, the loop preventer, and the current
//! fingerprint, exactly as described for the original `configuration`
//! struct, generalized from a single lock-guarded value to a `RwLock<Inner>`
//! so reads (`Query`, `View`, `Json`, `Dump`, `StatisticsByJson`) run
//! concurrently with each other and only block behind an in-flight write.
//!
//! Every write operation builds its result on a clone of the working state
//! and only publishes it on success, so a failed loop check, a stale
//! queryer, or an out-of-range index leaves the bundle exactly as it was —
//! the all-or-nothing guarantee §7 asks for.

use crate::arena::{Arena, Position};
use crate::dumper;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::Fingerprint;
use crate::json;
use crate::keyword::parse_keyword;
use crate::loader::{self, OwnerMap};
use crate::loop_preventer::LoopPreventer;
use crate::node::{NodeData, NodeKind};
use crate::query::{self, Queryer};
use crate::statistics;
use crate::tree;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A position-free description of a subtree to graft into a bundle, used by
/// the insert/modify operations below. Mirrors [`NodeKind`] without
/// exposing arena positions to callers, who have no arena of their own to
/// hold them in.
#[derive(Debug, Clone)]
pub enum InsertNode {
    Key {
        name: String,
        value: String,
    },
    Comment(String),
    /// An include pattern, resolved against the bundle's base directory at
    /// insert time exactly as a loaded `include` directive is.
    Include(String),
    Context {
        kind: NodeKind,
        value: String,
        children: Vec<InsertNode>,
    },
}

struct Inner {
    arena: Arena,
    root: Position,
    preventer: LoopPreventer,
    owner: OwnerMap,
    path_index: HashMap<PathBuf, Position>,
    fingerprint: Fingerprint,
    generation: u64,
}

impl Inner {
    fn base_dir(&self) -> PathBuf {
        Path::new(&self.arena.get(self.root).value)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// The mutation façade (C7). One `Bundle` guards exactly one loaded
/// configuration tree; a queryer obtained from one bundle is meaningless
/// against another.
pub struct Bundle {
    inner: RwLock<Inner>,
}

impl Bundle {
    /// Loads a configuration tree from `path`, following every `include`
    /// it transitively contains, and computes its initial fingerprint from
    /// [`Self::dump`]'s output.
    pub fn load(path: &Path) -> EngineResult<Bundle> {
        let loaded = loader::load_from_path(path)?;
        let fingerprint = Fingerprint::compute(&dumper::dump(&loaded.arena, loaded.root));
        Ok(Bundle {
            inner: RwLock::new(Inner {
                arena: loaded.arena,
                root: loaded.root,
                preventer: loaded.preventer,
                owner: loaded.owner,
                path_index: loaded.path_index,
                fingerprint,
                generation: 0,
            }),
        })
    }

    /// Returns the first node matching `keyword` in depth-first pre-order.
    pub fn query(&self, keyword: &str) -> EngineResult<Queryer> {
        let kw = parse_keyword(keyword)?;
        let inner = self.inner.read().expect("bundle lock poisoned");
        query::query(&inner.arena, inner.root, &kw, inner.generation)
    }

    /// Returns every node matching `keyword` in depth-first pre-order.
    pub fn query_all(&self, keyword: &str) -> EngineResult<Vec<Queryer>> {
        let kw = parse_keyword(keyword)?;
        let inner = self.inner.read().expect("bundle lock poisoned");
        Ok(query::query_all(
            &inner.arena,
            inner.root,
            &kw,
            inner.generation,
        ))
    }

    /// Looks up the node kind tag a resolved queryer currently points at.
    /// Useful for callers that need `Self().kind` without re-querying.
    pub fn kind_of(&self, queryer: Queryer) -> EngineResult<String> {
        let inner = self.inner.read().expect("bundle lock poisoned");
        let pos = queryer.resolve(&inner.arena, inner.generation)?;
        Ok(inner.arena.get(pos).kind.tag())
    }

    /// Rendered bytes of the whole tree, flattened through includes: each
    /// `include` directive's resolved target content is spliced in place of
    /// the directive itself rather than printed as literal `include`
    /// text — contrast [`Self::dump`], which keeps each `Config` as its own
    /// unflattened entry.
    pub fn view(&self) -> Vec<u8> {
        let inner = self.inner.read().expect("bundle lock poisoned");
        tree::bytes_flattened(&inner.arena, inner.root)
    }

    /// JSON serialization of the tree (§6).
    pub fn json(&self) -> serde_json::Value {
        let inner = self.inner.read().expect("bundle lock poisoned");
        json::to_json(&inner.arena, inner.root)
    }

    /// Map of relative path -> bytes, one entry per reachable `Config`.
    pub fn dump(&self) -> HashMap<String, Vec<u8>> {
        let inner = self.inner.read().expect("bundle lock poisoned");
        dumper::dump(&inner.arena, inner.root)
    }

    /// Flat JSON object of directive-kind counts plus a `total` scalar.
    pub fn statistics_by_json(&self) -> serde_json::Value {
        let inner = self.inner.read().expect("bundle lock poisoned");
        statistics::statistics_json(&inner.arena, inner.root)
    }

    /// Finds the target context by `keyword` and inserts `node` at the
    /// discovered index, shifting the existing child (and everything after
    /// it) down by one.
    pub fn insert_by_keyword(&self, node: InsertNode, keyword: &str) -> EngineResult<()> {
        let kw = parse_keyword(keyword)?;
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        let target = query::query(&inner.arena, inner.root, &kw, inner.generation)?;
        Self::insert_at(&mut inner, node, target.parent, target.index)
    }

    /// Same as [`Self::insert_by_keyword`], using a previously issued
    /// queryer's parent/index directly.
    pub fn insert_by_queryer(&self, node: InsertNode, queryer: Queryer) -> EngineResult<()> {
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        if queryer.generation != inner.generation {
            return Err(EngineError::StaleQueryer);
        }
        Self::insert_at(&mut inner, node, queryer.parent, queryer.index)
    }

    /// Finds the target by `keyword` and removes it. If the removed node is
    /// an `Include`, every route it registered with the loop preventer is
    /// released first.
    pub fn remove_by_keyword(&self, keyword: &str) -> EngineResult<()> {
        let kw = parse_keyword(keyword)?;
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        let target = query::query(&inner.arena, inner.root, &kw, inner.generation)?;
        Self::remove_at(&mut inner, target.parent, target.index)
    }

    /// Same as [`Self::remove_by_keyword`], using a previously issued
    /// queryer directly.
    pub fn remove_by_queryer(&self, queryer: Queryer) -> EngineResult<()> {
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        if queryer.generation != inner.generation {
            return Err(EngineError::StaleQueryer);
        }
        Self::remove_at(&mut inner, queryer.parent, queryer.index)
    }

    /// Finds the target by `keyword` and replaces it in place with `node`,
    /// preserving the order of its siblings.
    pub fn modify_by_keyword(&self, node: InsertNode, keyword: &str) -> EngineResult<()> {
        let kw = parse_keyword(keyword)?;
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        let target = query::query(&inner.arena, inner.root, &kw, inner.generation)?;
        Self::modify_at(&mut inner, node, target.parent, target.index)
    }

    /// Same as [`Self::modify_by_keyword`], using a previously issued
    /// queryer directly.
    pub fn modify_by_queryer(&self, node: InsertNode, queryer: Queryer) -> EngineResult<()> {
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        if queryer.generation != inner.generation {
            return Err(EngineError::StaleQueryer);
        }
        Self::modify_at(&mut inner, node, queryer.parent, queryer.index)
    }

    /// Loads a fresh tree from `bytes` (the shape [`Self::json`] produces)
    /// and, unless its dump fingerprint equals the current one, swaps it in
    /// atomically. A matching fingerprint fails with `same-fingerprint`
    /// rather than silently doing nothing, so a caller (typically the file
    /// watcher) can tell a no-op update apart from success.
    pub fn update_from_json_bytes(&self, bytes: &[u8]) -> EngineResult<()> {
        let loaded = json::from_json_bytes(bytes)?;
        let new_fingerprint = Fingerprint::compute(&dumper::dump(&loaded.arena, loaded.root));

        let mut inner = self.inner.write().expect("bundle lock poisoned");
        if inner.fingerprint.equals(&new_fingerprint) {
            return Err(EngineError::SameFingerprint);
        }

        inner.arena = loaded.arena;
        inner.root = loaded.root;
        inner.preventer = loaded.preventer;
        inner.owner = loaded.owner;
        inner.path_index = loaded.path_index;
        inner.fingerprint.renew(new_fingerprint);
        inner.generation += 1;
        Ok(())
    }

    /// Rebuilds the tree from `bytes` — the full current contents of the
    /// bundle's main file — re-resolving whatever `include`s it names. This
    /// is the file watcher's entry point (§4.10): it hands over raw file
    /// bytes, never JSON, and gets back success, `same-fingerprint`, or a
    /// parse error.
    pub fn update_from_config_bytes(&self, bytes: &[u8]) -> EngineResult<()> {
        let mut inner = self.inner.write().expect("bundle lock poisoned");
        let display_path = PathBuf::from(&inner.arena.get(inner.root).value);
        let loaded = loader::load_from_bytes(bytes, &display_path)?;
        let new_fingerprint = Fingerprint::compute(&dumper::dump(&loaded.arena, loaded.root));

        if inner.fingerprint.equals(&new_fingerprint) {
            return Err(EngineError::SameFingerprint);
        }

        inner.arena = loaded.arena;
        inner.root = loaded.root;
        inner.preventer = loaded.preventer;
        inner.owner = loaded.owner;
        inner.path_index = loaded.path_index;
        inner.fingerprint.renew(new_fingerprint);
        inner.generation += 1;
        Ok(())
    }

    fn insert_at(
        inner: &mut Inner,
        node: InsertNode,
        parent: Position,
        index: usize,
    ) -> EngineResult<()> {
        if index > inner.arena.get(parent).children.len() {
            return Err(EngineError::NotFound);
        }
        let owning_config = *inner.owner.get(&parent).ok_or(EngineError::TypeMismatch)?;
        let base_dir = inner.base_dir();

        let mut arena = inner.arena.clone();
        let mut preventer = inner.preventer.clone();
        let mut owner = inner.owner.clone();
        let mut path_index = inner.path_index.clone();

        let new_pos = lower_insert_node(
            node,
            &mut arena,
            &mut preventer,
            &mut owner,
            &mut path_index,
            &base_dir,
            owning_config,
        )?;
        arena.get_mut(parent).children.insert(index, new_pos);

        inner.arena = arena;
        inner.preventer = preventer;
        inner.owner = owner;
        inner.path_index = path_index;
        inner.generation += 1;
        Ok(())
    }

    fn remove_at(inner: &mut Inner, parent: Position, index: usize) -> EngineResult<()> {
        if index >= inner.arena.get(parent).children.len() {
            return Err(EngineError::NotFound);
        }

        let mut arena = inner.arena.clone();
        let mut preventer = inner.preventer.clone();

        let removed = arena.get_mut(parent).children.remove(index);
        if arena.get(removed).kind == NodeKind::Include {
            let owning = *inner.owner.get(&parent).ok_or(EngineError::TypeMismatch)?;
            for &target in &arena.get(removed).children.clone() {
                preventer.remove_route(owning, target);
            }
        }

        inner.arena = arena;
        inner.preventer = preventer;
        inner.generation += 1;
        Ok(())
    }

    fn modify_at(
        inner: &mut Inner,
        node: InsertNode,
        parent: Position,
        index: usize,
    ) -> EngineResult<()> {
        if index >= inner.arena.get(parent).children.len() {
            return Err(EngineError::NotFound);
        }
        let owning_config = *inner.owner.get(&parent).ok_or(EngineError::TypeMismatch)?;
        let base_dir = inner.base_dir();

        let mut arena = inner.arena.clone();
        let mut preventer = inner.preventer.clone();
        let mut owner = inner.owner.clone();
        let mut path_index = inner.path_index.clone();

        let old_pos = arena.get(parent).children[index];
        if arena.get(old_pos).kind == NodeKind::Include {
            for &target in &arena.get(old_pos).children.clone() {
                preventer.remove_route(owning_config, target);
            }
        }

        let new_pos = lower_insert_node(
            node,
            &mut arena,
            &mut preventer,
            &mut owner,
            &mut path_index,
            &base_dir,
            owning_config,
        )?;
        arena.get_mut(parent).children[index] = new_pos;

        inner.arena = arena;
        inner.preventer = preventer;
        inner.owner = owner;
        inner.path_index = path_index;
        inner.generation += 1;
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_insert_node(
    node: InsertNode,
    arena: &mut Arena,
    preventer: &mut LoopPreventer,
    owner: &mut OwnerMap,
    path_index: &mut HashMap<PathBuf, Position>,
    base_dir: &Path,
    owning_config: Position,
) -> EngineResult<Position> {
    match node {
        InsertNode::Key { name, value } => {
            let pos = arena.alloc(NodeData::new(NodeKind::Key(name), value));
            owner.insert(pos, owning_config);
            Ok(pos)
        }
        InsertNode::Comment(text) => {
            let pos = arena.alloc(NodeData::new(NodeKind::Comment, text));
            owner.insert(pos, owning_config);
            Ok(pos)
        }
        InsertNode::Include(pattern) => {
            let include_pos = arena.alloc(NodeData::new(NodeKind::Include, pattern.clone()));
            owner.insert(include_pos, owning_config);

            let mut targets = Vec::new();
            for target_path in loader::resolve_include_targets(base_dir, &pattern) {
                let target_pos =
                    loader::load_into(arena, preventer, owner, path_index, &target_path)?;
                if preventer.check(owning_config, target_pos) {
                    return Err(EngineError::IncludeLoop);
                }
                preventer.add_route(owning_config, target_pos);
                targets.push(target_pos);
            }
            arena.get_mut(include_pos).children = targets;
            Ok(include_pos)
        }
        InsertNode::Context {
            kind,
            value,
            children,
        } => {
            let pos = arena.alloc(NodeData::new(kind, value));
            owner.insert(pos, owning_config);
            let mut child_positions = Vec::with_capacity(children.len());
            for child in children {
                child_positions.push(lower_insert_node(
                    child,
                    arena,
                    preventer,
                    owner,
                    path_index,
                    base_dir,
                    owning_config,
                )?);
            }
            arena.get_mut(pos).children = child_positions;
            Ok(pos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn basic_roundtrip_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(
            dir.path(),
            "nginx.conf",
            "events { worker_connections 1024; } http { server { listen 80; } }",
        );
        let bundle = Bundle::load(&main).unwrap();
        let q = bundle.query("server").unwrap();
        assert_eq!(bundle.kind_of(q).unwrap(), "server");

        let rendered = bundle.view();
        let reparsed = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(reparsed.path(), &rendered).unwrap();
        let second = Bundle::load(reparsed.path()).unwrap();
        let first_fp = Fingerprint::compute(&bundle.dump());
        let second_fp = Fingerprint::compute(&second.dump());
        assert!(first_fp.equals(&second_fp));
    }

    #[test]
    fn loop_rejection_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let m_path = write(dir.path(), "m.conf", "include c.conf;");
        write(dir.path(), "c.conf", "server { listen 80; }");

        let bundle = Bundle::load(&m_path).unwrap();
        let before = bundle.view();

        let err = bundle
            .insert_by_keyword(InsertNode::Include("m.conf".to_string()), "server")
            .unwrap_err();
        assert_eq!(err.tag(), "include-loop");
        assert_eq!(bundle.view(), before);
    }

    #[test]
    fn modify_preserves_order_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "http { a; b; c; }");
        let bundle = Bundle::load(&main).unwrap();
        let fp_before = Fingerprint::compute(&bundle.dump());

        bundle
            .modify_by_keyword(
                InsertNode::Key {
                    name: "B".to_string(),
                    value: String::new(),
                },
                "key:sep: b",
            )
            .unwrap();

        let rendered = String::from_utf8(bundle.view()).unwrap();
        assert_eq!(rendered, "http {\n    a;\n    B;\n    c;\n}\n");
        let fp_after = Fingerprint::compute(&bundle.dump());
        assert!(!fp_before.equals(&fp_after));
    }

    #[test]
    fn same_fingerprint_update_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "http { server { listen 80; } }");
        let bundle = Bundle::load(&main).unwrap();
        let json_bytes = serde_json::to_vec(&bundle.json()).unwrap();

        let err = bundle.update_from_json_bytes(&json_bytes).unwrap_err();
        assert_eq!(err.tag(), "same-fingerprint");
    }

    #[test]
    fn stale_queryer_rejected_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "http { server { listen 80; } }");
        let bundle = Bundle::load(&main).unwrap();
        let q = bundle.query("server").unwrap();

        bundle
            .insert_by_keyword(InsertNode::Comment("note".to_string()), "http")
            .unwrap();

        let err = bundle.insert_by_queryer(InsertNode::Comment("x".to_string()), q);
        assert_eq!(err.unwrap_err().tag(), "stale-queryer");
    }

    #[test]
    fn update_from_config_bytes_replaces_tree() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "http { server { listen 80; } }");
        let bundle = Bundle::load(&main).unwrap();

        bundle
            .update_from_config_bytes(b"http { server { listen 8080; } }")
            .unwrap();
        assert!(bundle.query("key:sep: listen 8080").is_ok());

        let err = bundle
            .update_from_config_bytes(b"http { server { listen 8080; } }")
            .unwrap_err();
        assert_eq!(err.tag(), "same-fingerprint");
    }

    #[test]
    fn view_flattens_include_content_into_rendered_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("conf.d")).unwrap();
        write(
            &dir.path().join("conf.d"),
            "a.conf",
            "server { listen 81; }",
        );
        let main = write(dir.path(), "nginx.conf", "http { include conf.d/*.conf; }");

        let bundle = Bundle::load(&main).unwrap();
        let rendered = String::from_utf8(bundle.view()).unwrap();

        assert!(rendered.contains("server {"));
        assert!(rendered.contains("listen 81;"));
        assert!(!rendered.contains("include"));

        let dumped = bundle.dump();
        assert!(String::from_utf8_lossy(&dumped["nginx.conf"]).contains("include conf.d/a.conf;"));
    }

    #[test]
    fn remove_drops_include_from_tree_and_dump() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "include a.conf;");
        write(dir.path(), "a.conf", "server { listen 80; }");
        let bundle = Bundle::load(&main).unwrap();

        bundle.remove_by_keyword("include").unwrap();
        assert!(bundle.view().is_empty());
        assert_eq!(bundle.dump().len(), 1);
    }

    #[test]
    fn concurrent_inserts_are_linearized() {
        use std::sync::{Arc, Barrier};

        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "http { a; }");
        let bundle = Arc::new(Bundle::load(&main).unwrap());
        let before = bundle.query_all("key").unwrap().len();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let bundle = Arc::clone(&bundle);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    bundle
                        .insert_by_keyword(
                            InsertNode::Key {
                                name: format!("added{i}"),
                                value: String::new(),
                            },
                            "http",
                        )
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let after = bundle.query_all("key").unwrap().len();
        assert_eq!(after, before + 2);
    }

    #[test]
    fn concurrent_readers_see_pre_or_post_write_state_never_partial() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "nginx.conf", "http { a; b; }");
        let bundle = Arc::new(Bundle::load(&main).unwrap());
        let before_count = bundle.query_all("key").unwrap().len();

        let writer = {
            let bundle = Arc::clone(&bundle);
            std::thread::spawn(move || {
                for i in 0..20 {
                    bundle
                        .insert_by_keyword(
                            InsertNode::Key {
                                name: format!("w{i}"),
                                value: String::new(),
                            },
                            "http",
                        )
                        .unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let bundle = Arc::clone(&bundle);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let count = bundle.query_all("key").unwrap().len();
                        assert!(count >= before_count && count <= before_count + 20);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(bundle.query_all("key").unwrap().len(), before_count + 20);
    }
}

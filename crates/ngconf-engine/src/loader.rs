//! Loader (C2): builds a typed node tree from bytes on disk, resolving
//! `include` directives relative to the main file and threading loop
//! detection through every recursive load.

use crate::arena::{Arena, Position};
use crate::error::{EngineError, EngineResult};
use crate::loop_preventer::LoopPreventer;
use crate::node::{NodeData, NodeKind};
use ngconf_syntax::{RawBlock, RawConfig, RawItem};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Tracks which `Config` owns every node allocated under it, so that a
/// later mutation can find the nearest `Config` ancestor of any context
/// without walking parent pointers the arena doesn't keep.
pub type OwnerMap = HashMap<Position, Position>;

/// Everything a bundle needs to start operating: the arena, the root
/// `Config` position, the populated loop preventer, and the owning-config
/// lookup used by the mutation facade's loop-safety bookkeeping.
pub struct LoadedBundle {
    pub arena: Arena,
    pub root: Position,
    pub preventer: LoopPreventer,
    pub owner: OwnerMap,
    pub path_index: HashMap<PathBuf, Position>,
}

/// Loads a configuration tree from the main file at `path`, following
/// every `include` directive it (transitively) contains.
pub fn load_from_path(path: &Path) -> EngineResult<LoadedBundle> {
    let abs_path = std::fs::canonicalize(path)?;
    let mut arena = Arena::new();
    let mut preventer = LoopPreventer::new();
    let mut owner = OwnerMap::new();
    let mut path_index: HashMap<PathBuf, Position> = HashMap::new();
    let mut in_progress: HashSet<PathBuf> = HashSet::new();

    let root = load_config_file(
        &mut arena,
        &mut preventer,
        &mut owner,
        &mut path_index,
        &mut in_progress,
        &abs_path,
    )?;

    Ok(LoadedBundle {
        arena,
        root,
        preventer,
        owner,
        path_index,
    })
}

/// Rebuilds a whole tree from `bytes` — the full contents of the file at
/// `display_path` — re-resolving whatever `include`s it names relative to
/// its directory. Used by the file watcher collaborator, which hands over
/// freshly read file contents rather than a path to re-open.
pub fn load_from_bytes(bytes: &[u8], display_path: &Path) -> EngineResult<LoadedBundle> {
    let source = String::from_utf8_lossy(bytes);
    let raw = ngconf_syntax::parse_string(&source)?;

    let mut arena = Arena::new();
    let mut preventer = LoopPreventer::new();
    let mut owner = OwnerMap::new();
    let mut path_index: HashMap<PathBuf, Position> = HashMap::new();
    let mut in_progress: HashSet<PathBuf> = HashSet::new();

    let abs_path = display_path.to_path_buf();
    let config_pos = arena.alloc(NodeData::new(
        NodeKind::Config,
        abs_path.to_string_lossy().into_owned(),
    ));
    path_index.insert(abs_path.clone(), config_pos);
    owner.insert(config_pos, config_pos);
    in_progress.insert(abs_path.clone());

    let base_dir = abs_path.parent().unwrap_or_else(|| Path::new("."));
    let children = lower_items(
        &raw,
        &mut arena,
        &mut preventer,
        &mut owner,
        &mut path_index,
        &mut in_progress,
        base_dir,
        config_pos,
    )?;
    arena.get_mut(config_pos).children = children;

    Ok(LoadedBundle {
        arena,
        root: config_pos,
        preventer,
        owner,
        path_index,
    })
}

/// Loads a single additional file into an already-populated arena/owner/
/// path-index, as used by the mutation façade when grafting a freshly
/// resolved `include` target into a live bundle. Cycle detection here only
/// covers the file(s) reachable from `abs_path` itself — the façade layers
/// its own check against the bundle's existing routes on top.
pub(crate) fn load_into(
    arena: &mut Arena,
    preventer: &mut LoopPreventer,
    owner: &mut OwnerMap,
    path_index: &mut HashMap<PathBuf, Position>,
    abs_path: &Path,
) -> EngineResult<Position> {
    let mut in_progress = HashSet::new();
    load_config_file(arena, preventer, owner, path_index, &mut in_progress, abs_path)
}

fn load_config_file(
    arena: &mut Arena,
    preventer: &mut LoopPreventer,
    owner: &mut OwnerMap,
    path_index: &mut HashMap<PathBuf, Position>,
    in_progress: &mut HashSet<PathBuf>,
    abs_path: &Path,
) -> EngineResult<Position> {
    if let Some(&existing) = path_index.get(abs_path) {
        return Ok(existing);
    }
    if in_progress.contains(abs_path) {
        return Err(EngineError::IncludeLoop);
    }
    in_progress.insert(abs_path.to_path_buf());

    let raw = ngconf_syntax::parse_config(abs_path)?;
    let config_pos = arena.alloc(NodeData::new(
        NodeKind::Config,
        abs_path.to_string_lossy().into_owned(),
    ));
    path_index.insert(abs_path.to_path_buf(), config_pos);
    owner.insert(config_pos, config_pos);

    let base_dir = abs_path.parent().unwrap_or_else(|| Path::new("."));
    let children = lower_items(
        &raw,
        arena,
        preventer,
        owner,
        path_index,
        in_progress,
        base_dir,
        config_pos,
    )?;
    arena.get_mut(config_pos).children = children;

    in_progress.remove(abs_path);
    Ok(config_pos)
}

fn lower_items(
    raw: &RawConfig,
    arena: &mut Arena,
    preventer: &mut LoopPreventer,
    owner: &mut OwnerMap,
    path_index: &mut HashMap<PathBuf, Position>,
    in_progress: &mut HashSet<PathBuf>,
    base_dir: &Path,
    owning_config: Position,
) -> EngineResult<Vec<Position>> {
    let mut out = Vec::with_capacity(raw.items.len());
    for item in &raw.items {
        match item {
            RawItem::Comment(comment) => {
                let pos = arena.alloc(NodeData::new(NodeKind::Comment, comment.text.clone()));
                owner.insert(pos, owning_config);
                out.push(pos);
            }
            RawItem::Directive(directive) if directive.name == "include" => {
                let pattern = directive
                    .args
                    .first()
                    .map(|a| a.value.as_str().to_string())
                    .unwrap_or_default();
                let include_pos = arena.alloc(NodeData::new(NodeKind::Include, pattern.clone()));
                owner.insert(include_pos, owning_config);

                let mut targets = Vec::new();
                for target_path in resolve_include_targets(base_dir, &pattern) {
                    let target_pos = load_config_file(
                        arena,
                        preventer,
                        owner,
                        path_index,
                        in_progress,
                        &target_path,
                    )?;
                    if preventer.check(owning_config, target_pos) {
                        return Err(EngineError::IncludeLoop);
                    }
                    preventer.add_route(owning_config, target_pos);
                    targets.push(target_pos);
                }
                arena.get_mut(include_pos).children = targets;
                out.push(include_pos);
            }
            RawItem::Directive(directive) => {
                let pos = lower_directive_body(
                    directive.name.clone(),
                    &directive.args,
                    directive.block.as_ref(),
                    arena,
                    preventer,
                    owner,
                    path_index,
                    in_progress,
                    base_dir,
                    owning_config,
                )?;
                out.push(pos);
            }
        }
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn lower_directive_body(
    name: String,
    args: &[ngconf_syntax::RawArgument],
    block: Option<&RawBlock>,
    arena: &mut Arena,
    preventer: &mut LoopPreventer,
    owner: &mut OwnerMap,
    path_index: &mut HashMap<PathBuf, Position>,
    in_progress: &mut HashSet<PathBuf>,
    base_dir: &Path,
    owning_config: Position,
) -> EngineResult<Position> {
    let value = args
        .iter()
        .map(|a| a.value.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let Some(block) = block else {
        let pos = arena.alloc(NodeData::new(NodeKind::Key(name), value));
        owner.insert(pos, owning_config);
        return Ok(pos);
    };

    if let Some(raw_content) = &block.raw_content {
        // Opaque foreign-language body (e.g. `content_by_lua_block`): kept
        // verbatim as the directive's value rather than re-parsed.
        let pos = arena.alloc(NodeData::new(NodeKind::Key(name), raw_content.trim()));
        owner.insert(pos, owning_config);
        return Ok(pos);
    }

    let kind = NodeKind::block_for_name(&name);
    let pos = arena.alloc(NodeData::new(kind, value));
    owner.insert(pos, owning_config);
    let children = lower_items(
        &RawConfig {
            items: block.items.clone(),
        },
        arena,
        preventer,
        owner,
        path_index,
        in_progress,
        base_dir,
        owning_config,
    )?;
    arena.get_mut(pos).children = children;
    Ok(pos)
}

/// Resolves an `include` pattern against `base_dir`, returning canonical,
/// sorted, de-duplicated absolute paths. A pattern with no glob
/// metacharacters that matches nothing resolves to no targets rather than
/// erroring — the directive is preserved verbatim in the tree either way.
pub(crate) fn resolve_include_targets(base_dir: &Path, pattern: &str) -> Vec<PathBuf> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        base_dir.join(pattern).to_string_lossy().into_owned()
    };

    let mut matches: Vec<PathBuf> = glob::glob(&full_pattern)
        .map(|paths| {
            paths
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
                .collect()
        })
        .unwrap_or_default();
    matches.sort();
    matches.dedup();
    matches
}

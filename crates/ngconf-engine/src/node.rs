//! The typed node model (C1): a closed set of directive/block kinds instead
//! of an open parser interface.

use crate::arena::Position;
use serde::{Deserialize, Serialize};

/// The closed set of node kinds a configuration tree is built from.
///
/// `Block(name)` covers context-shaped directives that aren't one of the
/// primary named contexts — `mail`, `split_clients`, `match`, and any other
/// directive nginx treats as a block but this model doesn't name directly.
/// `Key(name)` is a leaf directive; its argument text lives in the node's
/// `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Config,
    Include,
    Http,
    Server,
    Location,
    Events,
    Stream,
    Upstream,
    If,
    Geo,
    Map,
    Types,
    LimitExcept,
    Block(String),
    Key(String),
    Comment,
}

impl NodeKind {
    /// The stable lowercase tag used by the selector grammar (C4). Loses
    /// the directive name carried by `Key`/`Block` — use [`json_tag`]
    /// for a round-trippable form.
    ///
    /// [`json_tag`]: NodeKind::json_tag
    pub fn tag(&self) -> String {
        match self {
            NodeKind::Config => "config".to_string(),
            NodeKind::Include => "include".to_string(),
            NodeKind::Http => "http".to_string(),
            NodeKind::Server => "server".to_string(),
            NodeKind::Location => "location".to_string(),
            NodeKind::Events => "events".to_string(),
            NodeKind::Stream => "stream".to_string(),
            NodeKind::Upstream => "upstream".to_string(),
            NodeKind::If => "if".to_string(),
            NodeKind::Geo => "geo".to_string(),
            NodeKind::Map => "map".to_string(),
            NodeKind::Types => "types".to_string(),
            NodeKind::LimitExcept => "limit_except".to_string(),
            NodeKind::Block(name) => name.clone(),
            NodeKind::Key(_) => "key".to_string(),
            NodeKind::Comment => "comment".to_string(),
        }
    }

    /// True for kinds that own an ordered child sequence in the tree sense.
    pub fn is_context(&self) -> bool {
        matches!(
            self,
            NodeKind::Config
                | NodeKind::Http
                | NodeKind::Server
                | NodeKind::Location
                | NodeKind::Events
                | NodeKind::Stream
                | NodeKind::Upstream
                | NodeKind::If
                | NodeKind::Geo
                | NodeKind::Map
                | NodeKind::Types
                | NodeKind::LimitExcept
                | NodeKind::Block(_)
        )
    }

    /// Builds the block-context kind for a directive name, falling back to
    /// `Block(name)` for anything not one of the primary named contexts.
    pub fn block_for_name(name: &str) -> NodeKind {
        match name {
            "http" => NodeKind::Http,
            "server" => NodeKind::Server,
            "location" => NodeKind::Location,
            "events" => NodeKind::Events,
            "stream" => NodeKind::Stream,
            "upstream" => NodeKind::Upstream,
            "if" => NodeKind::If,
            "geo" => NodeKind::Geo,
            "map" => NodeKind::Map,
            "types" => NodeKind::Types,
            "limit_except" => NodeKind::LimitExcept,
            other => NodeKind::Block(other.to_string()),
        }
    }

    /// A round-trippable tag for JSON serialization: `Key`/`Block` encode
    /// their directive name as `"key:<name>"`/`"block:<name>"` so a fresh
    /// load from JSON can recover the exact variant.
    pub fn json_tag(&self) -> String {
        match self {
            NodeKind::Key(name) => format!("key:{name}"),
            NodeKind::Block(name) => format!("block:{name}"),
            other => other.tag(),
        }
    }

    /// Parses a [`json_tag`](Self::json_tag) string back into a `NodeKind`.
    pub fn from_json_tag(tag: &str) -> Option<NodeKind> {
        if let Some(name) = tag.strip_prefix("key:") {
            return Some(NodeKind::Key(name.to_string()));
        }
        if let Some(name) = tag.strip_prefix("block:") {
            return Some(NodeKind::Block(name.to_string()));
        }
        Some(match tag {
            "config" => NodeKind::Config,
            "include" => NodeKind::Include,
            "http" => NodeKind::Http,
            "server" => NodeKind::Server,
            "location" => NodeKind::Location,
            "events" => NodeKind::Events,
            "stream" => NodeKind::Stream,
            "upstream" => NodeKind::Upstream,
            "if" => NodeKind::If,
            "geo" => NodeKind::Geo,
            "map" => NodeKind::Map,
            "types" => NodeKind::Types,
            "limit_except" => NodeKind::LimitExcept,
            "comment" => NodeKind::Comment,
            _ => return None,
        })
    }
}

/// One node in a configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub kind: NodeKind,
    /// Context value (e.g. a `location` path selector), directive argument
    /// text (`Key`), include pattern (`Include`), comment text (`Comment`),
    /// or the absolute main-file path (`Config`).
    pub value: String,
    #[serde(skip, default = "Position::from_index_default")]
    pub position: Position,
    /// Owned children in traversal order. Empty for leaves. For `Include`,
    /// holds the resolved target `Config` positions (referenced, not owned
    /// in the arena-destruction sense, but the vector shape is the same).
    pub children: Vec<Position>,
}

// serde(skip) above needs a zero-arg default; Position::from_index takes an
// index, so give it one directly here rather than deriving Default on Position.
impl Position {
    fn from_index_default() -> Self {
        Position::from_index(0)
    }
}

impl NodeData {
    pub fn new(kind: NodeKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            position: Position::from_index(0),
            children: Vec::new(),
        }
    }

    /// The text a query selector matches against for this node's kind. For
    /// `Key` directives this is `"<name> <value>"`, matching the combined
    /// form the selector grammar expects (e.g. `server_name test1.com`);
    /// for everything else it is just `value`.
    pub fn query_text(&self) -> String {
        match &self.kind {
            NodeKind::Key(name) => {
                if self.value.is_empty() {
                    name.clone()
                } else {
                    format!("{} {}", name, self.value)
                }
            }
            _ => self.value.clone(),
        }
    }
}

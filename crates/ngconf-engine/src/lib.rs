//! Core engine for an Nginx-style configuration tree: a typed node model
//! (C1), a loader that resolves `include` directives into an arena-backed
//! DAG (C2-C3), a keyword selector grammar and query engine (C4-C5), a
//! content fingerprint (C6), a mutation façade guarding all of the above
//! behind one reader-writer lock (C7), and a dumper/statistician pair for
//! multi-file write-back and reporting (C8-C9).
//!
//! Everything outside this crate talks to a tree through [`Bundle`]; the
//! arena, node, loader, query, and fingerprint modules are public mainly so
//! collaborator crates (`ngconf-watch`, `ngconf-auth`, the hosting binary)
//! can build byte buffers and keyword strings without re-deriving the
//! selector grammar themselves.

pub mod arena;
pub mod dumper;
pub mod error;
pub mod facade;
pub mod fingerprint;
pub mod json;
pub mod keyword;
pub mod loader;
pub mod loop_preventer;
pub mod node;
pub mod query;
pub mod statistics;
pub mod tree;

pub use arena::{Arena, Position};
pub use error::{EngineError, EngineResult};
pub use facade::{Bundle, InsertNode};
pub use fingerprint::Fingerprint;
pub use keyword::{Keyword, MatchMode, parse_keyword};
pub use loader::{LoadedBundle, load_from_path};
pub use loop_preventer::LoopPreventer;
pub use node::{NodeData, NodeKind};
pub use query::{Queryer, query, query_all};

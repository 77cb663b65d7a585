//! The hosting service bootstrap (§4.12), grounded on
//! `original_source/internal/pkg/bifrost/init.go` and `original_source/main.go`:
//! `config` loads the YAML `ServiceConfig` one or more hosted instances are
//! described by; `service` loads each instance's configuration tree into an
//! [`ngconf_engine::facade::Bundle`], starts its file watcher and periodic
//! backup task; `http` exposes the thin read/write front end per instance;
//! `cli` wires these into the `ngconf` binary's subcommands.
//!
//! The configuration engine itself (parser-tree model, query engine,
//! mutation façade, dumper, fingerprint) lives in `ngconf-engine`; the file
//! watcher and JWT auth collaborators live in `ngconf-watch` and
//! `ngconf-auth`. This crate only wires them together.

pub mod cli;
pub mod config;
pub mod http;
pub mod service;

//! GitHub tools exposed over MCP: issue search and creation, comments, pull
//! request listings, changed files, and a cross-repository last-activity
//! report, all gated by a repository allow-list.

pub mod activity;
pub mod allow;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod mcp;
pub mod models;
pub mod server;
pub mod tools;

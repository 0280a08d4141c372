//! contract_hub: contract document backend in Rust
//!
//! Accounts, reusable templates, a shared clause library and contracts that
//! collaborators can read and sign. Documents live in Sled; the HTTP surface
//! is Axum with bcrypt passwords and HS256 bearer tokens.
//!
//! This lib exposes the storage engine, access rules and router so the server,
//! the seed script and tests share one implementation.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
// REST API module: Axum handlers, auth middleware, OpenAPI docs
pub mod rest;
pub mod storage;
pub mod suggestions;

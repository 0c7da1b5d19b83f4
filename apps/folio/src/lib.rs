//! Folio
//!
//! Continuous document viewer with reading progress sync.
//!
//! # Modules
//!
//! - `viewer`: the viewer orchestrator (surfaces, active page tracking, minimap)
//! - `document`: rendering engine seam and shared document types
//! - `progress`: reading progress persistence collaborators
//! - `db`, `routes`, `state`: SQLite-backed progress API served by the binary
//! - `auth`, `config`, `error`: identity, configuration and HTTP errors

pub mod auth;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod progress;
pub mod routes;
pub mod state;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_support;

//! Pactum: contractual obligation extraction for PDF contracts.
//!
//! Uploaded contracts move through a sequential AI pipeline (blob store →
//! provider file upload → inference → normalization → SQLite) and surface
//! as a consolidated, exportable obligations registry.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod registry;

//! Clinic site backend service

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Request middleware and access control
pub mod middleware;

/// HTTP routes
pub mod routes;

/// Router assembly and server bootstrap
pub mod server;

/// Blob store and repository wiring
pub mod storage;

/// Shared types: configuration, errors, extractors
pub mod types;

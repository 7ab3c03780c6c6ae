//! PostgreSQL storage backend
//!
//! Implements provisioning, source scans, and archive upserts on top of a
//! `deadpool-postgres` connection pool.

pub mod adapter;
pub mod client;

pub use adapter::PostgreSQLAdapter;
pub use client::{redact_connection_string, PostgreSQLClient};

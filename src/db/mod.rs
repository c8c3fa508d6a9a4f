//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer implementing the user, bookmark and tag operations

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{EntityCounts, Repository};

//! Versioned, transactional SQLite table access for ads data.
//!
//! # Intention
//!
//! - Give each logical table one component that owns its name, its schema
//!   history and the SQL that writes its rows.
//! - Build commands and transactions without touching storage; execution
//!   happens behind the [`client::ExecutionClient`] boundary.
//!
//! # Architectural Boundaries
//!
//! - Tables append to caller-owned transactions so several tables can commit
//!   atomically together. Only `delete` dispatches on its own.
//! - Schema version bookkeeping lives outside this crate; tables only know
//!   which DDL each version needs.

pub mod client;
pub mod config;
pub mod error;
pub mod migration;
pub mod placeholders;
pub mod query;
pub mod sqlite;
pub mod tables;

pub use client::{
    ExecutionClient, ExecutionClientExt, ExecutionResult, ResponseStatus, SqliteClient,
    TransactionResponse,
};
pub use config::SqliteConfig;
pub use error::{DatabaseError, Result};
pub use sqlite::{Command, CommandType, Transaction, Value};
pub use tables::{CreativeAd, GeoTargets, Table};

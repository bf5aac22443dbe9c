//! # sqlx-sqlite-capability
//!
//! The opaque database capability that a session owns, plus the factory that
//! produces it. Callers above this crate never see SQLx types: they bind
//! [`SqlValue`]s, receive typed rows, and drive transactions through the
//! [`Database`] trait.
//!
//! ## Core Types
//!
//! - **[`Database`]**: statement execution, row iteration and transaction control
//! - **[`ConnectionProvider`]**: opens a [`Database`] for a path and deletes database files
//! - **[`SqlxDatabase`]** / **[`SqlxConnectionProvider`]**: the default SQLx-backed pair
//! - **[`ConnectionConfig`]**: per-connection settings for the SQLx provider
//! - **[`SqlValue`]**: a bound parameter or a cell read back from a row
//! - **[`Error`]**: error type for capability operations
//!
//! ## Ownership
//!
//! A [`Database`] is never shared. Every method takes `&mut self` and
//! [`Database::close`] consumes the handle, so exactly one owner can touch a
//! given connection at a time.

mod config;
mod database;
mod error;
mod provider;
mod sqlx_database;
mod value;

pub use config::ConnectionConfig;
pub use database::{Database, Row};
pub use error::{Error, Result};
pub use provider::{ConnectionProvider, OpenMode, SqlxConnectionProvider, remove_database_files};
pub use sqlx_database::SqlxDatabase;
pub use value::SqlValue;

//! # Database Crate
//!
//! The database boundary of a run: one connection, arbitrary trusted SQL text
//! in, "did it return rows, and how many columns" out.
//!
//! ## Public API
//!
//! - `connect_options`: builds the PostgreSQL connect options from the
//!   configured URL and credentials, adding schema selection when the URL
//!   carries no query parameters of its own. `through_tunnel` points them at a
//!   local port forward.
//! - `ScriptSession`: the execution seam the driver runs every script through.
//! - `PgSession`: the PostgreSQL implementation, wrapping exactly one connection.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod session;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect_options, normalize_url, through_tunnel};
pub use error::DbError;
pub use session::{PgSession, ScriptSession};
pub use sqlx::postgres::PgConnectOptions;

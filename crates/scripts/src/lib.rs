//! # Script Discovery and Loading
//!
//! The two filesystem-facing stages of a run:
//!
//! - `ScriptLocator`: walks the script directory and produces the ordered
//!   `ScriptBatch`. The order is imposed explicitly (files before
//!   subdirectories, each sorted by name) so it is identical on every run and
//!   every platform.
//! - `ScriptLoader`: reads one script and produces the text that is sent to
//!   the database, with trailing comments stripped and the placeholder token
//!   replaced by the schema name.

pub mod error;
pub mod loader;
pub mod locator;

pub use error::ScriptsError;
pub use loader::{LINE_SEPARATOR, ScriptLoader};
pub use locator::ScriptLocator;

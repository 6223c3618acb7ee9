pub mod enums;
pub mod outcome;
pub mod script;

// Re-export the core types to provide a clean public API.
pub use enums::{FailurePolicy, ScriptResult, StatementShape, SubstitutionMode};
pub use outcome::ExecutionOutcome;
pub use script::{ScriptBatch, ScriptFile};

use crate::enums::ScriptResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The reported result of one script, keyed by its 1-based position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub index: usize,
    pub path: PathBuf,
    pub result: ScriptResult,
}

impl ExecutionOutcome {
    /// The human-readable status line for this script.
    pub fn status_line(&self) -> String {
        match &self.result {
            ScriptResult::ResultSet { columns } => format!(
                "Script #{} {} has been executed and returned {} columns",
                self.index,
                self.path.display(),
                columns
            ),
            ScriptResult::NoResultSet => format!(
                "Script #{} {} has been executed and returned no Result Set",
                self.index,
                self.path.display()
            ),
            ScriptResult::Failed { detail } => format!(
                "Script #{} {} failed: {}",
                self.index,
                self.path.display(),
                detail
            ),
        }
    }
}

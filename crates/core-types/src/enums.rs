use serde::{Deserialize, Serialize};

/// What the database handed back after running one script's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementShape {
    /// The script produced a tabular result.
    Rows { columns: usize },
    /// DDL/DML or anything else that returned no rows.
    NoResultSet,
}

/// The reported result of a single script in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptResult {
    ResultSet { columns: usize },
    NoResultSet,
    /// Only recorded when the run continues past errors.
    Failed { detail: String },
}

impl ScriptResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, ScriptResult::Failed { .. })
    }
}

impl From<StatementShape> for ScriptResult {
    fn from(shape: StatementShape) -> Self {
        match shape {
            StatementShape::Rows { columns } => ScriptResult::ResultSet { columns },
            StatementShape::NoResultSet => ScriptResult::NoResultSet,
        }
    }
}

/// What the run does when a script fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the remaining batch on the first failing script.
    #[default]
    FailFast,
    /// Record the failure, keep going, and report the run as failed at the end.
    Continue,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::FailFast => "fail-fast",
            FailurePolicy::Continue => "continue",
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "failfast" => Ok(FailurePolicy::FailFast),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(format!(
                "unknown failure policy '{other}' (expected 'fail-fast' or 'continue')"
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the placeholder token is replaced in script text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubstitutionMode {
    /// Replace every occurrence, including inside longer identifiers.
    #[default]
    Literal,
    /// Replace only occurrences not touching an identifier character.
    Word,
}

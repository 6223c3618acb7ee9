use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use core_types::{ExecutionOutcome, ScriptResult};

/// The ordered outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    outcomes: Vec<ExecutionOutcome>,
}

impl RunReport {
    pub fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[ExecutionOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<ExecutionOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Scripts recorded as failed. Always zero under the fail-fast policy,
    /// where the first failure ends the run with an error instead.
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_failure())
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }

    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["#", "Script", "Result"]);

        for outcome in &self.outcomes {
            let result = match &outcome.result {
                ScriptResult::ResultSet { columns } => format!("{columns} columns"),
                ScriptResult::NoResultSet => "no result set".to_string(),
                ScriptResult::Failed { detail } => format!("FAILED: {detail}"),
            };
            table.add_row(vec![
                outcome.index.to_string(),
                outcome.path.display().to_string(),
                result,
            ]);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outcome(index: usize, name: &str, result: ScriptResult) -> ExecutionOutcome {
        ExecutionOutcome {
            index,
            path: PathBuf::from(format!("/srv/sql/{name}")),
            result,
        }
    }

    #[test]
    fn counts_failures() {
        let report = RunReport::new(vec![
            outcome(1, "a.sql", ScriptResult::NoResultSet),
            outcome(2, "b.sql", ScriptResult::Failed { detail: "boom".into() }),
            outcome(3, "c.sql", ScriptResult::ResultSet { columns: 2 }),
        ]);
        assert_eq!(report.len(), 3);
        assert_eq!(report.failures(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn empty_report_is_a_success() {
        let report = RunReport::default();
        assert!(report.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn summary_lists_every_script() {
        let report = RunReport::new(vec![
            outcome(1, "a.sql", ScriptResult::NoResultSet),
            outcome(2, "b.sql", ScriptResult::ResultSet { columns: 1 }),
        ]);
        let rendered = report.summary_table().to_string();
        assert!(rendered.contains("/srv/sql/a.sql"));
        assert!(rendered.contains("no result set"));
        assert!(rendered.contains("1 columns"));
    }
}

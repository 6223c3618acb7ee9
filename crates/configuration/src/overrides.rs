use core_types::FailurePolicy;
use std::path::PathBuf;

/// Values supplied on the command line. They win over both the file and the environment.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct Overrides {
    /// Directory to search for scripts (overrides `sql_dir`).
    #[cfg_attr(feature = "clap", arg(long))]
    pub sql_dir: Option<PathBuf>,

    /// Target schema (overrides `schema_name`).
    #[cfg_attr(feature = "clap", arg(long = "schema"))]
    pub schema_name: Option<String>,

    /// What to do when a script fails: `fail-fast` or `continue`.
    #[cfg_attr(feature = "clap", arg(long))]
    pub failure_policy: Option<FailurePolicy>,

    /// Run the whole batch inside one transaction.
    #[cfg_attr(feature = "clap", arg(long))]
    pub single_transaction: bool,
}

impl Overrides {
    pub(crate) fn apply(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let builder = builder
            .set_override_option(
                "sql_dir",
                self.sql_dir
                    .as_ref()
                    .map(|dir| dir.to_string_lossy().into_owned()),
            )?
            .set_override_option("schema_name", self.schema_name.clone())?
            .set_override_option(
                "failure_policy",
                self.failure_policy.map(|policy| policy.as_str().to_string()),
            )?;

        if self.single_transaction {
            return builder.set_override("single_transaction", true);
        }
        Ok(builder)
    }
}

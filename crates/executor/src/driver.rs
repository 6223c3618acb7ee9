use crate::error::{ExecutorError, ScriptFailure};
use crate::report::RunReport;
use configuration::Settings;
use configuration::error::ConfigError;
use core_types::{
    ExecutionOutcome, FailurePolicy, ScriptBatch, ScriptFile, ScriptResult, StatementShape,
};
use database::ScriptSession;
use scripts::ScriptLoader;

/// Runs a batch, in order, through one session.
///
/// Each driver is an independent value built from explicit settings, so
/// several runs (or tests) can exist side by side.
#[derive(Debug, Clone)]
pub struct ScriptDriver {
    loader: ScriptLoader,
    policy: FailurePolicy,
    single_transaction: bool,
}

impl ScriptDriver {
    pub fn new(loader: ScriptLoader, policy: FailurePolicy) -> Self {
        Self {
            loader,
            policy,
            single_transaction: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ExecutorError> {
        let loader = ScriptLoader::new(
            settings.comment_marker.as_str(),
            settings.placeholder.as_str(),
            settings.schema_name.as_str(),
        )
        .with_mode(settings.substitution);

        Self::new(loader, settings.failure_policy).with_single_transaction(settings.single_transaction)
    }

    /// Wraps the whole batch in one transaction. Not available under
    /// `FailurePolicy::Continue`: the first failed script aborts the transaction.
    pub fn with_single_transaction(mut self, enabled: bool) -> Result<Self, ExecutorError> {
        if enabled && self.policy == FailurePolicy::Continue {
            return Err(ConfigError::ValidationError(
                "'single_transaction' cannot be combined with the 'continue' failure policy"
                    .to_string(),
            )
            .into());
        }
        self.single_transaction = enabled;
        Ok(self)
    }

    /// Executes every script of `batch` and closes `session` afterwards,
    /// whether or not the batch succeeded.
    pub async fn execute<S: ScriptSession>(
        &self,
        mut session: S,
        batch: &ScriptBatch,
    ) -> Result<RunReport, ExecutorError> {
        let result = self.execute_batch(&mut session, batch).await;

        // Always release the session, even on error.
        let closed = session.close().await;

        match (result, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(error = %close_err, "Failed to close the database session after a failed run");
                Err(e)
            }
        }
    }

    async fn execute_batch<S: ScriptSession>(
        &self,
        session: &mut S,
        batch: &ScriptBatch,
    ) -> Result<RunReport, ExecutorError> {
        if self.single_transaction {
            session.begin().await?;
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        for (position, script) in batch.iter().enumerate() {
            let index = position + 1;

            match self.run_script(session, script).await {
                Ok(shape) => {
                    let outcome = ExecutionOutcome {
                        index,
                        path: script.path().to_path_buf(),
                        result: shape.into(),
                    };
                    tracing::info!(index, path = %script.path().display(), "{}", outcome.status_line());
                    outcomes.push(outcome);
                }
                Err(failure) => {
                    tracing::error!(
                        index,
                        path = %script.path().display(),
                        error = %failure,
                        "Error on script"
                    );

                    if self.policy == FailurePolicy::Continue {
                        outcomes.push(ExecutionOutcome {
                            index,
                            path: script.path().to_path_buf(),
                            result: ScriptResult::Failed {
                                detail: failure.to_string(),
                            },
                        });
                        continue;
                    }

                    if self.single_transaction
                        && let Err(e) = session.rollback().await
                    {
                        tracing::warn!(error = %e, "Failed to roll back the run transaction");
                    }
                    return Err(ExecutorError::Script {
                        index,
                        path: script.path().to_path_buf(),
                        source: failure,
                    });
                }
            }
        }

        if self.single_transaction {
            session.commit().await?;
        }

        Ok(RunReport::new(outcomes))
    }

    async fn run_script<S: ScriptSession>(
        &self,
        session: &mut S,
        script: &ScriptFile,
    ) -> Result<StatementShape, ScriptFailure> {
        let sql = self.loader.load(script)?;
        tracing::debug!(path = %script.path().display(), bytes = sql.len(), "Executing script");
        Ok(session.execute(&sql).await?)
    }
}

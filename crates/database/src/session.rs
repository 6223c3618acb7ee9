use crate::error::DbError;
use async_trait::async_trait;
use core_types::StatementShape;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Either, Row, Statement};

/// One live connection plus its execution context, owned by the driver for a whole run.
///
/// The driver never shares a session and calls `close` exactly once on every
/// exit path; implementations must treat calls after `close` as errors.
#[async_trait]
pub trait ScriptSession: Send {
    /// Runs the full text of one script and reports the shape of its first result.
    async fn execute(&mut self, sql: &str) -> Result<StatementShape, DbError>;

    async fn begin(&mut self) -> Result<(), DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;

    /// Releases the connection. A second call is a no-op.
    async fn close(&mut self) -> Result<(), DbError>;
}

/// The PostgreSQL session: exactly one `PgConnection`, never a pool.
pub struct PgSession {
    conn: Option<PgConnection>,
    in_transaction: bool,
}

impl PgSession {
    pub async fn connect(options: &PgConnectOptions) -> Result<Self, DbError> {
        let conn = options.connect().await.map_err(DbError::Connect)?;
        tracing::info!(
            host = options.get_host(),
            port = options.get_port(),
            database = options.get_database().unwrap_or_default(),
            user = options.get_username(),
            startup_options = options.get_options().unwrap_or_default(),
            "Connection created"
        );
        Ok(Self {
            conn: Some(conn),
            in_transaction: false,
        })
    }

    fn connection(&mut self) -> Result<&mut PgConnection, DbError> {
        self.conn.as_mut().ok_or(DbError::SessionClosed)
    }

    async fn control(&mut self, action: &'static str) -> Result<(), DbError> {
        let conn = self.connection()?;
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(action))
            .await
            .map_err(|source| DbError::Transaction { action, source })?;
        Ok(())
    }
}

/// What the first statement of a script sent back first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstResult {
    Row { columns: usize },
    Completed,
}

/// The shape of a script is the shape of its first statement.
///
/// A first statement that completed without rows is still a result set when
/// the statement itself describes columns (`SELECT ... WHERE false`).
fn classify(first: Option<FirstResult>, described_columns: Option<usize>) -> StatementShape {
    match (first, described_columns) {
        (Some(FirstResult::Row { columns }), _) => StatementShape::Rows { columns },
        (_, Some(columns)) if columns > 0 => StatementShape::Rows { columns },
        _ => StatementShape::NoResultSet,
    }
}

const DESCRIBE_SAVEPOINT: &str = "sqlrunner_describe";

/// Column count of `sql` as a single prepared statement, or `None` when it
/// cannot be prepared (several statements, or an error the run will report).
///
/// Inside a transaction the attempt is fenced by a savepoint so a failed
/// prepare does not abort the transaction.
async fn described_columns(
    conn: &mut PgConnection,
    sql: &str,
    in_transaction: bool,
) -> Option<usize> {
    if in_transaction {
        let savepoint = format!("SAVEPOINT {DESCRIBE_SAVEPOINT}");
        if sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&savepoint)).await.is_err() {
            return None;
        }
    }

    let columns = match sqlx::Executor::prepare(&mut *conn, sql).await {
        Ok(statement) => Some(statement.columns().len()),
        Err(e) => {
            tracing::trace!(error = %e, "Script is not a single describable statement");
            None
        }
    };

    if in_transaction {
        let restore = if columns.is_some() {
            format!("RELEASE SAVEPOINT {DESCRIBE_SAVEPOINT}")
        } else {
            format!("ROLLBACK TO SAVEPOINT {DESCRIBE_SAVEPOINT}; RELEASE SAVEPOINT {DESCRIBE_SAVEPOINT}")
        };
        if let Err(e) = sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&restore)).await {
            tracing::warn!(error = %e, "Failed to restore the describe savepoint");
        }
    }

    columns
}

#[async_trait]
impl ScriptSession for PgSession {
    async fn execute(&mut self, sql: &str) -> Result<StatementShape, DbError> {
        let in_transaction = self.in_transaction;
        let conn = self.connection()?;

        let described = described_columns(&mut *conn, sql, in_transaction).await;

        // The simple query protocol runs every statement in the text; only the
        // first thing the server sends back matters for the reported shape.
        let mut results = sqlx::raw_sql(sql).fetch_many(&mut *conn);
        let mut first = None;
        while let Some(step) = results.try_next().await.map_err(DbError::Execute)? {
            if first.is_none() {
                first = Some(match step {
                    Either::Right(row) => FirstResult::Row {
                        columns: row.columns().len(),
                    },
                    Either::Left(_) => FirstResult::Completed,
                });
            }
        }

        Ok(classify(first, described))
    }

    async fn begin(&mut self) -> Result<(), DbError> {
        self.control("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.in_transaction = false;
        self.control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.in_transaction = false;
        self.control("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<(), DbError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(DbError::Close)?;
            tracing::debug!("Database connection closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_decides_column_count() {
        let first = Some(FirstResult::Row { columns: 3 });
        assert_eq!(classify(first, None), StatementShape::Rows { columns: 3 });
        assert_eq!(classify(first, Some(3)), StatementShape::Rows { columns: 3 });
    }

    #[test]
    fn empty_select_reports_described_columns() {
        assert_eq!(
            classify(Some(FirstResult::Completed), Some(2)),
            StatementShape::Rows { columns: 2 }
        );
    }

    #[test]
    fn statement_without_columns_has_no_result_set() {
        assert_eq!(
            classify(Some(FirstResult::Completed), Some(0)),
            StatementShape::NoResultSet
        );
    }

    #[test]
    fn leading_ddl_hides_later_rows() {
        // `CREATE ...; SELECT 1;` cannot be prepared and its first result has no rows.
        assert_eq!(
            classify(Some(FirstResult::Completed), None),
            StatementShape::NoResultSet
        );
    }

    #[test]
    fn script_without_statements_has_no_result_set() {
        assert_eq!(classify(None, None), StatementShape::NoResultSet);
        assert_eq!(classify(None, Some(0)), StatementShape::NoResultSet);
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("Failed to connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("SQL execution failed: {0}")]
    Execute(#[source] sqlx::Error),

    #[error("Transaction control ({action}) failed: {source}")]
    Transaction {
        action: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to close the database connection: {0}")]
    Close(#[source] sqlx::Error),

    #[error("The database session is already closed.")]
    SessionClosed,
}

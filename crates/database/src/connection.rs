use crate::error::DbError;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;

/// Accepts JDBC-style URLs (`jdbc:postgresql://...`) by dropping the prefix.
pub fn normalize_url(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix("jdbc:").unwrap_or(url)
}

/// Builds the options for the run's single connection.
///
/// The configured user and password take precedence over any in the URL.
/// A JDBC `currentSchema` parameter becomes the session's `search_path`.
/// Otherwise, when the URL carries no query component, `search_path` is set
/// to `schema`; a URL that already has parameters is used as given.
pub fn connect_options(
    url: &str,
    user: &str,
    password: &str,
    schema: &str,
) -> Result<PgConnectOptions, DbError> {
    let url = normalize_url(url);
    let has_query = url.contains('?');
    let (url, current_schema) = split_current_schema(url);
    let options = PgConnectOptions::from_str(&url)
        .map_err(DbError::InvalidUrl)?
        .username(user)
        .password(password);

    Ok(match current_schema {
        Some(current) => options.options([("search_path", current.as_str())]),
        None if !has_query => options.options([("search_path", schema)]),
        None => options,
    })
}

/// Sends the connection to the local end of a port forward.
pub fn through_tunnel(options: PgConnectOptions, local_port: u16) -> PgConnectOptions {
    options.host("127.0.0.1").port(local_port)
}

/// Takes JDBC's `currentSchema` parameter, which libpq URLs do not know, off `url`.
fn split_current_schema(url: &str) -> (String, Option<String>) {
    let Some((base, query)) = url.split_once('?') else {
        return (url.to_string(), None);
    };

    let mut current = None;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| match pair.split_once('=') {
            Some(("currentSchema", value)) => {
                if !value.is_empty() {
                    current = Some(value.to_string());
                }
                false
            }
            _ => !pair.is_empty(),
        })
        .collect();

    let url = if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    };
    (url, current)
}

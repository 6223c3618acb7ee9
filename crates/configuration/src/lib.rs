use crate::error::ConfigError;
use config::{Environment, File, FileFormat};
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod overrides;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use core_types::{FailurePolicy, SubstitutionMode};
pub use overrides::Overrides;
pub use settings::{Settings, TunnelSettings};

/// Prefix for environment overrides, e.g. `SQLRUNNER_SCHEMA_NAME`.
pub const ENV_PREFIX: &str = "SQLRUNNER";

/// Base name looked up in the working directory when no file is given
/// (`config.toml`, `config.ini`, ...).
pub const DEFAULT_CONFIG_NAME: &str = "config";

/// Loads and validates the run configuration.
///
/// Sources are layered lowest to highest: the file, `SQLRUNNER_*` environment
/// variables, then `overrides`. An explicit `path` must exist; the default
/// `config.*` lookup is optional so a run can be configured from the
/// environment alone.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => file_source(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX));
    let builder = overrides.apply(builder)?;

    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;

    tracing::debug!(?settings, "Configuration loaded");
    Ok(settings)
}

/// The legacy `.properties` format is plain `key=value` lines, which the INI
/// parser reads as top-level keys. Every other extension is left to `config`.
fn file_source(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    let is_properties = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("properties"));

    if is_properties {
        File::from(path).format(FileFormat::Ini)
    } else {
        File::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn loads_legacy_properties_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.properties");
        fs::write(
            &path,
            "database_url=jdbc:postgresql://localhost:5432/app\n\
             database_user=app\n\
             database_password=secret\n\
             schema_name=tenant_a\n\
             sql_dir=/srv/sql\n",
        )
        .unwrap();

        let settings = load_config(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(settings.database_url, "jdbc:postgresql://localhost:5432/app");
        assert_eq!(settings.schema_name, "tenant_a");
        assert_eq!(settings.sql_dir, PathBuf::from("/srv/sql"));
        assert_eq!(settings.extensions, vec!["sql"]);
    }

    #[test]
    fn loads_toml_with_runner_options() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runner.toml");
        fs::write(
            &path,
            r##"
            database_url = "postgres://localhost/app"
            database_user = "app"
            database_password = "secret"
            schema_name = "tenant_a"
            sql_dir = "scripts"
            extensions = ["sql", ".DDL"]
            comment_marker = "#"
            failure_policy = "continue"
            substitution = "word"
            tunnel_host = "bastion"
            tunnel_user = "ops"
            tunnel_remote_host = "db.internal"
            tunnel_remote_port = 5432
            tunnel_local_port = 15432
            "##,
        )
        .unwrap();

        let settings = load_config(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(settings.extensions, vec!["sql", "DDL"]);
        assert_eq!(settings.comment_marker, "#");
        assert_eq!(settings.failure_policy, FailurePolicy::Continue);
        assert_eq!(settings.substitution, SubstitutionMode::Word);
        assert_eq!(settings.tunnel().unwrap().unwrap().remote_port, 5432);
    }

    #[test]
    fn comma_separated_extensions_are_split() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.properties");
        fs::write(
            &path,
            "database_url=postgres://localhost/app\ndatabase_user=app\ndatabase_password=pw\n\
             schema_name=s\nsql_dir=sql\nextensions=sql, psql\n",
        )
        .unwrap();

        let settings = load_config(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(settings.extensions, vec!["sql", "psql"]);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            database_url = "postgres://localhost/app"
            database_user = "app"
            database_password = "secret"
            schema_name = "from_file"
            sql_dir = "from_file"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            sql_dir: Some(PathBuf::from("from_cli")),
            schema_name: Some("from_cli".into()),
            failure_policy: Some(FailurePolicy::Continue),
            single_transaction: false,
        };
        let settings = load_config(Some(&path), &overrides).unwrap();
        assert_eq!(settings.schema_name, "from_cli");
        assert_eq!(settings.sql_dir, PathBuf::from("from_cli"));
        assert_eq!(settings.failure_policy, FailurePolicy::Continue);
        assert!(!settings.single_transaction);
    }

    #[test]
    fn missing_required_key_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            database_url = "postgres://localhost/app"
            database_user = "app"
            database_password = "secret"
            sql_dir = "sql"
            "#,
        )
        .unwrap();

        let err = load_config(Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("schema_name")));
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml")), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }
}

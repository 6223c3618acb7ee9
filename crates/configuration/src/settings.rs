use crate::error::ConfigError;
use core_types::{FailurePolicy, SubstitutionMode};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

const DEFAULT_TUNNEL_PORT: u16 = 22;

/// The root configuration for a run: a flat set of keys, the way the legacy
/// `config.properties` file laid them out.
///
/// Every field is optional at the deserialization layer; `validate` is what
/// enforces the required keys, so a missing key and an empty key fail the same way.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Connection string. A leading `jdbc:` prefix is accepted.
    pub database_url: String,
    pub database_user: String,
    pub database_password: String,
    /// Target schema; also the replacement for the placeholder token.
    pub schema_name: String,
    /// Root of the script tree.
    pub sql_dir: PathBuf,

    /// Accepted file extensions, compared case-insensitively.
    /// Accepts a list or a comma-separated string.
    #[serde(deserialize_with = "string_or_list")]
    pub extensions: Vec<String>,
    /// Everything from this marker to the end of a line is dropped.
    pub comment_marker: String,
    /// The token replaced by `schema_name` in every script.
    pub placeholder: String,
    pub substitution: SubstitutionMode,
    pub failure_policy: FailurePolicy,
    /// Wrap the whole batch in one transaction.
    pub single_transaction: bool,

    // --- SSH tunnel (optional) ---
    pub tunnel_host: Option<String>,
    pub tunnel_port: Option<u16>,
    pub tunnel_user: Option<String>,
    pub tunnel_password: Option<String>,
    pub tunnel_remote_host: Option<String>,
    pub tunnel_remote_port: Option<u16>,
    pub tunnel_local_port: Option<u16>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_user: String::new(),
            database_password: String::new(),
            schema_name: String::new(),
            sql_dir: PathBuf::new(),
            extensions: vec!["sql".to_string()],
            comment_marker: "--".to_string(),
            placeholder: "schema_name".to_string(),
            substitution: SubstitutionMode::default(),
            failure_policy: FailurePolicy::default(),
            single_transaction: false,
            tunnel_host: None,
            tunnel_port: None,
            tunnel_user: None,
            tunnel_password: None,
            tunnel_remote_host: None,
            tunnel_remote_port: None,
            tunnel_local_port: None,
        }
    }
}

// Manual impl so passwords never end up in logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("database_url", &self.database_url)
            .field("database_user", &self.database_user)
            .field("database_password", &"<redacted>")
            .field("schema_name", &self.schema_name)
            .field("sql_dir", &self.sql_dir)
            .field("extensions", &self.extensions)
            .field("comment_marker", &self.comment_marker)
            .field("placeholder", &self.placeholder)
            .field("substitution", &self.substitution)
            .field("failure_policy", &self.failure_policy)
            .field("single_transaction", &self.single_transaction)
            .field("tunnel_host", &self.tunnel_host)
            .finish_non_exhaustive()
    }
}

/// A fully specified local port forward.
#[derive(Clone, PartialEq, Eq)]
pub struct TunnelSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub remote_host: String,
    pub remote_port: u16,
    pub local_port: u16,
}

impl fmt::Debug for TunnelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remote_host", &self.remote_host)
            .field("remote_port", &self.remote_port)
            .field("local_port", &self.local_port)
            .finish()
    }
}

impl Settings {
    /// Checks every key the run needs before anything touches the disk or the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("database_url", &self.database_url)?;
        require("database_user", &self.database_user)?;
        require("database_password", &self.database_password)?;
        require("schema_name", &self.schema_name)?;
        if self.sql_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingKey("sql_dir"));
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "'extensions' must name at least one file extension".to_string(),
            ));
        }
        require("comment_marker", &self.comment_marker)?;
        require("placeholder", &self.placeholder)?;

        if self.single_transaction && self.failure_policy == FailurePolicy::Continue {
            return Err(ConfigError::ValidationError(
                "'single_transaction' cannot be combined with the 'continue' failure policy"
                    .to_string(),
            ));
        }

        self.tunnel()?;
        Ok(())
    }

    /// The tunnel to open before connecting, if `tunnel_host` is set.
    /// Once it is, the remaining tunnel keys become required.
    pub fn tunnel(&self) -> Result<Option<TunnelSettings>, ConfigError> {
        let Some(host) = non_empty(&self.tunnel_host) else {
            return Ok(None);
        };

        let user = non_empty(&self.tunnel_user).ok_or(ConfigError::MissingKey("tunnel_user"))?;
        let remote_host = non_empty(&self.tunnel_remote_host)
            .ok_or(ConfigError::MissingKey("tunnel_remote_host"))?;
        let remote_port = self
            .tunnel_remote_port
            .ok_or(ConfigError::MissingKey("tunnel_remote_port"))?;
        let local_port = self
            .tunnel_local_port
            .ok_or(ConfigError::MissingKey("tunnel_local_port"))?;

        Ok(Some(TunnelSettings {
            host: host.to_string(),
            port: self.tunnel_port.unwrap_or(DEFAULT_TUNNEL_PORT),
            user: user.to_string(),
            password: non_empty(&self.tunnel_password).map(str::to_string),
            remote_host: remote_host.to_string(),
            remote_port,
            local_port,
        }))
    }
}

fn require(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingKey(key));
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `["sql", "ddl"]` as well as `"sql, ddl"`, since key=value files
/// and environment variables can only carry strings.
/// Entries are trimmed and a leading dot is dropped.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let raw = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(',').map(str::to_string).collect(),
        OneOrMany::Many(v) => v,
    };

    Ok(raw
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .filter(|ext| !ext.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Settings {
        Settings {
            database_url: "postgres://localhost/app".into(),
            database_user: "app".into(),
            database_password: "secret".into(),
            schema_name: "tenant_a".into(),
            sql_dir: PathBuf::from("sql"),
            ..Settings::default()
        }
    }

    #[test]
    fn defaults_match_legacy_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.extensions, vec!["sql"]);
        assert_eq!(settings.comment_marker, "--");
        assert_eq!(settings.placeholder, "schema_name");
        assert_eq!(settings.failure_policy, FailurePolicy::FailFast);
        assert_eq!(settings.substitution, SubstitutionMode::Literal);
        assert!(!settings.single_transaction);
    }

    #[test]
    fn complete_settings_validate() {
        complete().validate().unwrap();
    }

    #[test]
    fn each_required_key_is_enforced() {
        let cases: [(&str, fn(&mut Settings)); 5] = [
            ("database_url", |s| s.database_url.clear()),
            ("database_user", |s| s.database_user = "  ".into()),
            ("database_password", |s| s.database_password.clear()),
            ("schema_name", |s| s.schema_name.clear()),
            ("sql_dir", |s| s.sql_dir = PathBuf::new()),
        ];
        for (key, clear) in cases {
            let mut settings = complete();
            clear(&mut settings);
            match settings.validate() {
                Err(ConfigError::MissingKey(missing)) => assert_eq!(missing, key),
                other => panic!("expected MissingKey({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn single_transaction_rejects_continue_policy() {
        let settings = Settings {
            single_transaction: true,
            failure_policy: FailurePolicy::Continue,
            ..complete()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn no_tunnel_without_host() {
        assert_eq!(complete().tunnel().unwrap(), None);
    }

    #[test]
    fn tunnel_requires_its_remaining_keys() {
        let settings = Settings {
            tunnel_host: Some("bastion.example.com".into()),
            tunnel_user: Some("ops".into()),
            tunnel_remote_host: Some("db.internal".into()),
            tunnel_remote_port: Some(5432),
            ..complete()
        };
        assert!(matches!(
            settings.tunnel(),
            Err(ConfigError::MissingKey("tunnel_local_port"))
        ));

        let settings = Settings {
            tunnel_local_port: Some(15432),
            ..settings
        };
        let tunnel = settings.tunnel().unwrap().unwrap();
        assert_eq!(tunnel.port, 22);
        assert_eq!(tunnel.local_port, 15432);
        assert_eq!(tunnel.password, None);
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let rendered = format!("{:?}", complete());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

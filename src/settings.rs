// src/settings.rs
//! Layered secrets reader.
//!
//! A named section is read from a local secrets file and then from environment
//! variables of the form `<Section>__<Field>`. Environment values win over the file.
//! Keys are matched without regard to case, so `Cluster`, `cluster` and `CLUSTER`
//! all bind to the same field.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Section holding the cluster credentials.
pub const DEFAULT_SECTION: &str = "MongoDBConfig";

/// Environment variable pointing at the secrets file.
pub const SECRETS_PATH_ENV: &str = "MONGO_EXAMPLES_SECRETS";

const ENV_SEPARATOR: &str = "__";
const FLAT_SEPARATORS: [&str; 2] = [":", "__"];

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct MongoSettings {
    pub cluster: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for MongoSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoSettings")
            .field("cluster", &self.cluster)
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration section '{0}' is not set in the secrets file or environment")]
    MissingSection(String),

    #[error("failed to read secrets file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse secrets file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration section '{section}' is invalid: {source}")]
    Deserialize {
        section: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SecretsReader {
    path: Option<PathBuf>,
}

impl SecretsReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Reader backed by environment variables only.
    pub fn env_only() -> Self {
        Self { path: None }
    }

    /// Picks the secrets file: an explicit path first, then `MONGO_EXAMPLES_SECRETS`,
    /// then `$HOME/.config/mongo-examples/secrets.yaml`.
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        let path = explicit
            .or_else(|| std::env::var_os(SECRETS_PATH_ENV).map(PathBuf::from))
            .or_else(default_secrets_path);
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn read_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, SettingsError> {
        let from_file = self.file_section(section)?;
        let from_env = env_section(section);

        if from_file.is_none() && from_env.is_empty() {
            return Err(SettingsError::MissingSection(section.to_string()));
        }

        let mut merged = from_file.unwrap_or_default();
        for (key, value) in from_env {
            merged.insert(key, Value::String(value));
        }

        serde_json::from_value(Value::Object(merged)).map_err(|source| {
            SettingsError::Deserialize {
                section: section.to_string(),
                source,
            }
        })
    }

    fn file_section(&self, section: &str) -> Result<Option<Map<String, Value>>, SettingsError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "secrets file not found, skipping");
                return Ok(None);
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(None);
        }

        let root: Value = serde_yaml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;

        Ok(extract_section(&root, section))
    }
}

fn default_secrets_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("mongo-examples")
            .join("secrets.yaml")
    })
}

/// Collects the section from a nested mapping (`Section: { Key: .. }`) and from
/// flattened keys (`"Section:Key"` or `Section__Key`). Flattened keys win.
fn extract_section(root: &Value, section: &str) -> Option<Map<String, Value>> {
    let Value::Object(entries) = root else {
        return None;
    };

    let mut found = false;
    let mut out = Map::new();

    for (key, value) in entries {
        if key.eq_ignore_ascii_case(section) {
            if let Value::Object(fields) = value {
                found = true;
                for (field, v) in fields {
                    out.insert(field.to_lowercase(), scalar_to_string(v));
                }
            }
        }
    }

    for (key, value) in entries {
        let Some(rest) = strip_prefix_ignore_case(key, section) else {
            continue;
        };
        let field = FLAT_SEPARATORS
            .iter()
            .find_map(|sep| rest.strip_prefix(sep))
            .filter(|field| !field.is_empty());
        if let Some(field) = field {
            found = true;
            out.insert(field.to_lowercase(), scalar_to_string(value));
        }
    }

    found.then_some(out)
}

// Variables whose name or value is not UTF-8 cannot belong to a section and are skipped.
fn env_section(section: &str) -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| {
            let key = key.to_str()?;
            let field = strip_prefix_ignore_case(key, section)?.strip_prefix(ENV_SEPARATOR)?;
            if field.is_empty() {
                return None;
            }
            Some((field.to_lowercase(), value.to_str()?.to_string()))
        })
        .collect()
}

fn strip_prefix_ignore_case<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let head = key.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        key.get(prefix.len()..)
    } else {
        None
    }
}

// Configuration values are text; unquoted YAML numbers and booleans are read back as strings.
fn scalar_to_string(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn secrets_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_nested_section_from_yaml() {
        let file = secrets_file(
            "FileOnlyConfig:\n  Cluster: cluster0.example.net\n  User: alice\n  Password: s3cret\n",
        );
        let settings: MongoSettings = SecretsReader::new(file.path())
            .read_section("FileOnlyConfig")
            .unwrap();

        assert_eq!(settings.cluster, "cluster0.example.net");
        assert_eq!(settings.user, "alice");
        assert_eq!(settings.password, "s3cret");
    }

    #[test]
    fn reads_flattened_json_keys() {
        let file = secrets_file(
            r#"{ "FlatConfig:Cluster": "c.example.net", "FlatConfig:User": "bob", "FlatConfig:Password": "pw" }"#,
        );
        let settings: MongoSettings = SecretsReader::new(file.path())
            .read_section("FlatConfig")
            .unwrap();

        assert_eq!(settings.user, "bob");
        assert_eq!(settings.cluster, "c.example.net");
    }

    #[test]
    fn environment_overrides_file() {
        let file = secrets_file(
            "OverrideConfig:\n  Cluster: from-file.example.net\n  User: file-user\n  Password: file-pw\n",
        );
        temp_env::with_var("OverrideConfig__Password", Some("env-pw"), || {
            let settings: MongoSettings = SecretsReader::new(file.path())
                .read_section("OverrideConfig")
                .unwrap();
            assert_eq!(settings.password, "env-pw");
            assert_eq!(settings.user, "file-user");
        });
    }

    #[test]
    fn environment_only_section() {
        temp_env::with_vars(
            [
                ("EnvConfig__Cluster", Some("env.example.net")),
                ("ENVCONFIG__USER", Some("carol")),
                ("envconfig__password", Some("pw")),
            ],
            || {
                let settings: MongoSettings =
                    SecretsReader::env_only().read_section("EnvConfig").unwrap();
                assert_eq!(settings.cluster, "env.example.net");
                assert_eq!(settings.user, "carol");
                assert_eq!(settings.password, "pw");
            },
        );
    }

    #[test]
    fn numeric_values_bind_to_string_fields() {
        let file = secrets_file("NumericConfig:\n  Cluster: h\n  User: u\n  Password: 1234\n");
        let settings: MongoSettings = SecretsReader::new(file.path())
            .read_section("NumericConfig")
            .unwrap();
        assert_eq!(settings.password, "1234");
    }

    #[test]
    fn missing_file_falls_back_to_environment() {
        temp_env::with_vars(
            [
                ("NoFileConfig__Cluster", Some("h")),
                ("NoFileConfig__User", Some("u")),
                ("NoFileConfig__Password", Some("p")),
            ],
            || {
                let reader = SecretsReader::new("/nonexistent/mongo-examples/secrets.yaml");
                let settings: MongoSettings = reader.read_section("NoFileConfig").unwrap();
                assert_eq!(settings.cluster, "h");
            },
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_environment_is_ignored() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let invalid = OsStr::from_bytes(b"\xff\xfe");
        temp_env::with_vars(
            [
                (OsStr::new("UNRELATED_BINARY_VAR"), Some(invalid)),
                (OsStr::new("BinaryEnvConfig__Cluster"), Some(OsStr::new("h"))),
                (OsStr::new("BinaryEnvConfig__User"), Some(OsStr::new("u"))),
                (OsStr::new("BinaryEnvConfig__Password"), Some(OsStr::new("p"))),
                (OsStr::new("BinaryEnvConfig__Extra"), Some(invalid)),
            ],
            || {
                let settings: MongoSettings = SecretsReader::env_only()
                    .read_section("BinaryEnvConfig")
                    .unwrap();
                assert_eq!(settings.cluster, "h");
                assert_eq!(settings.user, "u");
                assert_eq!(settings.password, "p");
            },
        );
    }

    #[test]
    fn missing_section_is_an_error() {
        let file = secrets_file("Other:\n  Cluster: h\n");
        let err = SecretsReader::new(file.path())
            .read_section::<MongoSettings>("AbsentConfig")
            .unwrap_err();
        assert!(matches!(err, SettingsError::MissingSection(ref s) if s == "AbsentConfig"));
        assert!(err.to_string().contains("AbsentConfig"));
    }

    #[test]
    fn incomplete_section_is_a_deserialize_error() {
        let file = secrets_file("PartialConfig:\n  Cluster: h\n");
        let err = SecretsReader::new(file.path())
            .read_section::<MongoSettings>("PartialConfig")
            .unwrap_err();
        assert!(matches!(err, SettingsError::Deserialize { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let file = secrets_file("BrokenConfig: [unclosed\n");
        let err = SecretsReader::new(file.path())
            .read_section::<MongoSettings>("BrokenConfig")
            .unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn locate_prefers_explicit_path() {
        temp_env::with_var(SECRETS_PATH_ENV, Some("/from/env.yaml"), || {
            let reader = SecretsReader::locate(Some(PathBuf::from("/explicit.yaml")));
            assert_eq!(reader.path(), Some(Path::new("/explicit.yaml")));

            let reader = SecretsReader::locate(None);
            assert_eq!(reader.path(), Some(Path::new("/from/env.yaml")));
        });
    }

    #[test]
    fn locate_defaults_under_home() {
        temp_env::with_vars(
            [(SECRETS_PATH_ENV, None), ("HOME", Some("/home/tester"))],
            || {
                let reader = SecretsReader::locate(None);
                assert_eq!(
                    reader.path(),
                    Some(Path::new("/home/tester/.config/mongo-examples/secrets.yaml"))
                );
            },
        );
    }

    #[test]
    fn debug_output_masks_password() {
        let settings = MongoSettings {
            cluster: "h".into(),
            user: "u".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("****"));
    }
}

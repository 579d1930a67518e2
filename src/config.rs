use serde::{Deserialize, Deserializer};
use std::{
    fs::File,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::*;

pub const CONFIG_FILE: &str = "config.yaml";
pub const LEDGER_FILE: &str = "ledger.csv";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("file not found: {0:?}")]
    MissingFile(PathBuf),
    #[error("unable to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid ledger {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Built once per invocation and handed to every command instead of relying
/// on a process-wide base path or clock.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub users: PathBuf,
    pub today: NaiveDate,
}

impl Workspace {
    pub fn new(users: impl Into<PathBuf>, today: NaiveDate) -> Self {
        Self {
            users: users.into(),
            today,
        }
    }

    pub fn user(&self, name: &str) -> UserDirectory {
        UserDirectory::new(&self.users, name)
    }
}

/// One user's data directory under an explicit base path.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    path: PathBuf,
}

impl UserDirectory {
    pub fn new(base: &Path, user: &str) -> Self {
        Self {
            path: base.join(user),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.path.join(LEDGER_FILE)
    }

    /// Path for a dated output file, e.g. `simulation_output_20240101.csv`.
    pub fn output_path(&self, prefix: &str, date: NaiveDate) -> PathBuf {
        self.path
            .join(format!("{}_{}.csv", prefix, date.format("%Y%m%d")))
    }

    pub fn load_config(&self) -> std::result::Result<Configuration, ConfigurationError> {
        let path = self.config_path();
        info!("loading {:?}", path);

        let file = open(&path)?;
        let config: Configuration =
            serde_yaml::from_reader(file).map_err(|source| ConfigurationError::Yaml {
                path: path.clone(),
                source,
            })?;

        debug!("{:?}", config);

        Ok(config)
    }
}

pub(crate) fn open(path: &Path) -> std::result::Result<File, ConfigurationError> {
    if !path.exists() {
        return Err(ConfigurationError::MissingFile(path.to_owned()));
    }

    File::open(path).map_err(|source| ConfigurationError::Io {
        path: path.to_owned(),
        source,
    })
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Configuration {
    #[serde(default)]
    pub account_nickname: Option<String>,
    #[serde(default, deserialize_with = "decimal_from_yaml")]
    pub current_balance: BigDecimal,
    #[serde(default, deserialize_with = "decimal_from_yaml")]
    pub target_balance: BigDecimal,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Configuration {
    pub fn is_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

// YAML numbers go through their text form so 1000.10 stays exactly 1000.10.
fn decimal_from_yaml<'de, D>(deserializer: D) -> std::result::Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let text = match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => return Ok(BigDecimal::zero()),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s,
        other => return Err(D::Error::custom(format!("expected a number, got {:?}", other))),
    };

    crate::parsing::parse_amount(&text)
        .or_else(|| BigDecimal::from_str(text.trim()).ok())
        .ok_or_else(|| D::Error::custom(format!("malformed balance '{}'", text)))
}

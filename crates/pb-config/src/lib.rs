//! # pb-config
//!
//! Layered settings: built-in defaults, then an optional
//! `config/pawboard.{toml,yaml,json}` file, then `PAWBOARD__*` environment
//! variables (`PAWBOARD__DATABASE__URL`, `PAWBOARD__LOG__JSON`, ...).
//! A `.env` file in the working directory is loaded first if present; its
//! path is kept on [`Settings`] so it can be logged once tracing is up.

use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "PAWBOARD";
const CONFIG_FILE: &str = "config/pawboard";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub reports: ReportSettings,
    pub log: LogSettings,
    /// The `.env` file that was applied, if any.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// May carry credentials, never logged.
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReportSettings {
    /// Document collection holding the report records.
    pub collection: String,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info,pb_engine=debug`.
    pub filter: String,
    pub json: bool,
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let env_file = dotenvy::dotenv().ok();
        let mut settings = Self::from_sources(Some(CONFIG_FILE), Self::environment())?;
        settings.env_file = env_file;
        Ok(settings)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn from_sources(file: Option<&str>, env: Environment) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("database.url", "sqlite://pawboard.db")?
            .set_default("database.max_connections", 5)?
            .set_default("reports.collection", "lostPets")?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::environment().source(Some(vars))
    }

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::from_sources(None, env(&[])).unwrap();
        assert_eq!(settings.database.url.expose_secret(), "sqlite://pawboard.db");
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.reports.collection, "lostPets");
        assert_eq!(settings.log.filter, "info");
        assert!(!settings.log.json);
        // only `load` reads a .env file
        assert_eq!(settings.env_file, None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_sources(
            None,
            env(&[
                ("PAWBOARD__DATABASE__URL", "sqlite://secret.db"),
                ("PAWBOARD__REPORTS__COLLECTION", "strays"),
                ("PAWBOARD__LOG__JSON", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.database.url.expose_secret(), "sqlite://secret.db");
        assert_eq!(settings.reports.collection, "strays");
        assert!(settings.log.json);
    }

    #[test]
    fn database_url_is_redacted_in_debug_output() {
        let settings = Settings::from_sources(
            None,
            env(&[("PAWBOARD__DATABASE__URL", "sqlite://user:pw@host/db")]),
        )
        .unwrap();
        assert!(!format!("{settings:?}").contains("pw@host"));
    }
}

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    aggregation::TOP_CATEGORY_LIMIT,
    currency::{CurrencyCode, LocaleConfig},
    errors::LedgerError,
    ledger::{BalancePolicy, LedgerOptions},
    storage::json_backend::DEFAULT_RETENTION,
    utils::paths::{app_data_dir, config_file_in, ensure_dir, ledger_file_in, write_atomic},
};

const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    /// Ledger document location; relative paths resolve against the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    pub backup_retention: usize,
    pub balance_policy: BalancePolicy,
    pub top_categories: usize,
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "pt-BR".into(),
            currency: "BRL".into(),
            data_file: None,
            backup_retention: DEFAULT_RETENTION,
            balance_policy: BalancePolicy::default(),
            top_categories: TOP_CATEGORY_LIMIT,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl Config {
    pub fn locale_config(&self) -> LocaleConfig {
        LocaleConfig::from_tag(&self.locale)
    }

    pub fn currency_code(&self) -> CurrencyCode {
        CurrencyCode::new(&self.currency)
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            balance_policy: self.balance_policy,
        }
    }

    pub fn ledger_path(&self, base: &Path) -> PathBuf {
        match &self.data_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base.join(path),
            None => ledger_file_in(base),
        }
    }
}

/// Loads and stores [`Config`] under the application data directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, LedgerError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, LedgerError> {
        ensure_dir(&base)?;
        let path = config_file_in(&base);
        Ok(Self { base, path })
    }

    /// Returns defaults when no configuration has been written yet.
    pub fn load(&self) -> Result<Config, LedgerError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path).map_err(|err| {
            LedgerError::Config(format!("cannot read {}: {}", self.path.display(), err))
        })?;
        serde_json::from_str(&data).map_err(|err| {
            LedgerError::Config(format!("invalid {}: {}", self.path.display(), err))
        })
    }

    pub fn save(&self, config: &Config) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.balance_policy, BalancePolicy::TrustStored);
    }

    #[test]
    fn save_then_load_keeps_changes() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = Config {
            locale: "en-US".into(),
            balance_policy: BalancePolicy::Recompute,
            ..Config::default()
        };
        manager.save(&config).unwrap();

        assert!(manager.path().ends_with("config/config.json"));
        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        write_atomic(manager.path(), r#"{ "balance_policy": "recompute" }"#).unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.balance_policy, BalancePolicy::Recompute);
        assert_eq!(config.currency, "BRL");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        write_atomic(manager.path(), "{ not json").unwrap();

        assert!(matches!(manager.load(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn relative_data_file_resolves_against_base() {
        let base = Path::new("/srv/nucleo");
        let config = Config {
            data_file: Some(PathBuf::from("books/household.json")),
            ..Config::default()
        };
        assert_eq!(
            config.ledger_path(base),
            PathBuf::from("/srv/nucleo/books/household.json")
        );
        assert_eq!(
            Config::default().ledger_path(base),
            PathBuf::from("/srv/nucleo/ledger.json")
        );
    }
}

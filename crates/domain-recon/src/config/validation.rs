//! Configuration validation.

use super::Config;
use crate::error::{ReconError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.host.is_empty() {
        return Err(ReconError::Config("source.host is required".into()));
    }
    if config.source.database.is_empty() {
        return Err(ReconError::Config("source.database is required".into()));
    }
    if config.source.user.is_empty() {
        return Err(ReconError::Config("source.user is required".into()));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(ReconError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(ReconError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(ReconError::Config("target.user is required".into()));
    }

    // Recon config validation - only check if explicitly set
    if let Some(0) = config.recon.workers {
        return Err(ReconError::Config("recon.workers must be at least 1".into()));
    }
    if let Some(0) = config.recon.page_size {
        return Err(ReconError::Config(
            "recon.page_size must be at least 1".into(),
        ));
    }
    if let Some(0) = config.recon.max_connections {
        return Err(ReconError::Config(
            "recon.max_connections must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReconConfig, StoreConfig};

    fn valid_config() -> Config {
        Config {
            source: StoreConfig {
                host: "localhost".to_string(),
                port: 5432,
                database: "staging".to_string(),
                user: "recon".to_string(),
                password: "password".to_string(),
                schema: "public".to_string(),
            },
            target: StoreConfig {
                host: "localhost".to_string(),
                port: 5432,
                database: "staging".to_string(),
                user: "recon".to_string(),
                password: "password".to_string(),
                schema: "public".to_string(),
            },
            recon: ReconConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_target_database() {
        let mut config = valid_config();
        config.target.database = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = valid_config();
        config.recon.workers = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = valid_config();
        config.recon.page_size = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unset_tuning_fields_are_fine() {
        let config = valid_config();
        assert!(config.recon.workers.is_none());
        assert!(validate(&config).is_ok());
    }
}

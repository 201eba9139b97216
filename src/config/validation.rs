use crate::config::types::{Config, CrawlerConfig, DatabaseConfig, FetcherConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_database_config(&config.database)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "https" && base.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if config.competition_id < 1 {
        return Err(ConfigError::Validation(format!(
            "competition-id must be positive, got {}",
            config.competition_id
        )));
    }

    if config.competition_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "competition-name cannot be empty".to_string(),
        ));
    }

    for season in &config.seasons {
        validate_season(season)?;
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 64, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Season filters are four-digit years as shown in the season dropdown
fn validate_season(season: &str) -> Result<(), ConfigError> {
    if season.len() != 4 || !season.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "season filter must be a four-digit year, got '{}'",
            season
        )));
    }
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.browser_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "browser-path cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    if config.max_connections < 1 {
        return Err(ConfigError::Validation(format!(
            "max-connections must be >= 1, got {}",
            config.max_connections
        )));
    }

    if config.connect_deadline_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-deadline-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dump_path.is_empty() {
        return Err(ConfigError::Validation(
            "dump-path cannot be empty".to_string(),
        ));
    }

    if config.progress_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "progress-interval-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            base_url: "https://www.nrl.com".to_string(),
            competition_id: 111,
            competition_name: "Mens NRL Premiership".to_string(),
            seasons: vec!["2024".to_string()],
            all_seasons: false,
            max_concurrent_fetches: 10,
            fetch_timeout_secs: 60,
        }
    }

    #[test]
    fn test_valid_crawler_config() {
        assert!(validate_crawler_config(&crawler_config()).is_ok());
    }

    #[test]
    fn test_validate_season() {
        assert!(validate_season("2024").is_ok());

        assert!(validate_season("").is_err());
        assert!(validate_season("24").is_err());
        assert!(validate_season("20x4").is_err());
        assert!(validate_season("20245").is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = crawler_config();
        config.base_url = "ftp://www.nrl.com".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.base_url = "not a url".to_string();
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = crawler_config();
        config.max_concurrent_fetches = 0;
        assert!(validate_crawler_config(&config).is_err());

        config.max_concurrent_fetches = 65;
        assert!(validate_crawler_config(&config).is_err());

        config.max_concurrent_fetches = 64;
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_database_config() {
        let mut config = DatabaseConfig {
            path: "./nrl.db".to_string(),
            max_connections: 4,
            connect_deadline_secs: 30,
        };
        assert!(validate_database_config(&config).is_ok());

        config.max_connections = 0;
        assert!(validate_database_config(&config).is_err());
    }
}

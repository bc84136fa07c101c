use crate::config::types::{
    ApiConfig, Config, CrawlerConfig, OutputConfig, RateLimitConfig, RetryConfig,
};
use crate::state::NodeId;
use crate::ConfigError;
use url::Url;

/// Largest page the provider API will return
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Validates the entire configuration
///
/// The bearer token is not checked here; commands that talk to the API call
/// [`Config::bearer_token`] before building a transport.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if let Some(seed) = &config.seed_user_id {
        NodeId::parse(seed)?;
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    for id in &config.denylist {
        NodeId::parse(id)?;
    }

    Ok(())
}

/// Validates rate limit configuration
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "max-requests must be >= 1, got {}",
            config.max_requests
        )));
    }

    if config.window_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "window-secs must be >= 1, got {}",
            config.window_secs
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a run ID before it is used as a directory name under `data-path`
///
/// IDs must be a single plain path component.
pub fn validate_run_id(run_id: &str) -> Result<(), ConfigError> {
    let trimmed = run_id.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Validation("run ID cannot be empty".to_string()));
    }

    if trimmed == "." || trimmed.contains("..") || trimmed.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "run ID '{}' must not contain path separators or '..'",
            run_id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_page_size() {
        let mut config = Config::default();
        config.api.page_size = 1000;
        assert!(validate(&config).is_ok());

        config.api.page_size = 1001;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.api.page_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "ftp://api.example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "http://127.0.0.1:8080".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_seed_and_denylist() {
        let mut config = Config::default();
        config.crawler.seed_user_id = Some("abc".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidNodeId(_))));

        config.crawler.seed_user_id = Some("123".to_string());
        config.crawler.denylist = vec!["456".to_string(), "x".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidNodeId(_))));
    }

    #[test]
    fn test_validate_workers_and_limits() {
        let mut config = Config::default();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_run_id() {
        assert!(validate_run_id("2244994945_20240101").is_ok());
        assert!(validate_run_id("my-run.v2").is_ok());

        for bad in ["", "  ", ".", "..", "../x", "a/b", "a\\b", "/tmp/run", "x..y"] {
            assert!(
                matches!(validate_run_id(bad), Err(ConfigError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_bearer_token_required() {
        let mut config = Config::default();
        assert!(matches!(
            config.bearer_token(),
            Err(ConfigError::MissingCredential(_))
        ));

        config.api.bearer_token = Some("   ".to_string());
        assert!(config.bearer_token().is_err());

        config.api.bearer_token = Some("AAAA".to_string());
        assert_eq!(config.bearer_token().unwrap(), "AAAA");
    }

    #[test]
    fn test_seed_user_id_required() {
        let mut config = Config::default();
        assert!(matches!(
            config.seed_user_id(),
            Err(ConfigError::Validation(_))
        ));

        config.crawler.seed_user_id = Some("2244994945".to_string());
        assert_eq!(config.seed_user_id().unwrap().as_str(), "2244994945");
    }
}

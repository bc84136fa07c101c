use crate::config::types::{Config, ConfigOverrides};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable holding the API bearer token
pub const ENV_BEARER_TOKEN: &str = "FOLLOWNET_BEARER_TOKEN";

/// Environment variable holding the default seed user ID
pub const ENV_SEED_USER_ID: &str = "FOLLOWNET_SEED_USER_ID";

/// Environment variable holding the base output directory
pub const ENV_DATA_PATH: &str = "FOLLOWNET_DATA_PATH";

/// Environment variable overriding the API base URL
pub const ENV_API_BASE_URL: &str = "FOLLOWNET_API_BASE_URL";

/// Loads the effective configuration
///
/// Layers are applied in order: built-in defaults, the TOML file (if any),
/// environment variables, then command-line overrides. The result is validated.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
/// * `overrides` - Values supplied on the command line
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use follownet::config::{load_config, ConfigOverrides};
/// use std::path::Path;
///
/// let config = load_config(Some(Path::new("follownet.toml")), &ConfigOverrides::default()).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            parse_config(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    apply_overrides(&mut config, overrides)?;

    validate(&config)?;

    Ok(config)
}

/// Parses a TOML document into a configuration without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies environment variable overrides using the given lookup
///
/// Empty values are ignored so an exported-but-blank variable does not clobber the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = lookup(ENV_BEARER_TOKEN) {
        config.api.bearer_token = Some(token);
    }
    if let Some(seed) = lookup(ENV_SEED_USER_ID) {
        config.crawler.seed_user_id = Some(seed);
    }
    if let Some(path) = lookup(ENV_DATA_PATH) {
        config.output.data_path = PathBuf::from(path);
    }
    if let Some(url) = lookup(ENV_API_BASE_URL) {
        config.api.base_url = url;
    }
}

/// Applies command-line overrides
///
/// Fails if the edge direction is not recognized.
pub fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
    if let Some(seed) = &overrides.seed_user_id {
        config.crawler.seed_user_id = Some(seed.clone());
    }
    if let Some(edge) = &overrides.edge {
        config.crawler.edge = edge.parse()?;
    }
    if let Some(depth) = overrides.max_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(workers) = overrides.workers {
        config.crawler.workers = workers;
    }
    if let Some(path) = &overrides.data_path {
        config.output.data_path = path.clone();
    }
    Ok(())
}

/// Computes a SHA-256 hash of the effective configuration
///
/// The bearer token is never serialized, so rotating credentials does not
/// change the hash. The hash is recorded in each run manifest to detect a
/// resumed run whose settings have changed.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash
/// * `Err(ConfigError)` - The configuration could not be serialized
pub fn compute_config_hash(config: &Config) -> Result<String, ConfigError> {
    let content = toml::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Renders the effective configuration as TOML (bearer token omitted)
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

//! Configuration module for Follownet
//!
//! This module handles loading, layering, and validating configuration. Values
//! come from built-in defaults, an optional TOML file, `FOLLOWNET_*` environment
//! variables, and command-line flags, in that order. The crawl engine itself
//! never reads the environment or files; it receives plain values from here.
//!
//! # Example
//!
//! ```no_run
//! use follownet::config::{load_config, ConfigOverrides};
//!
//! let config = load_config(None, &ConfigOverrides::default()).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, ConfigOverrides, CrawlerConfig, OutputConfig, RateLimitConfig, RetryConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, apply_overrides, compute_config_hash, load_config, parse_config,
    render_config, ENV_API_BASE_URL, ENV_BEARER_TOKEN, ENV_DATA_PATH, ENV_SEED_USER_ID,
};
pub use validation::{validate, validate_run_id, MAX_PAGE_SIZE};

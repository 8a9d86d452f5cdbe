//! Listener configuration (env-driven).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::listener::FailurePolicy;
use crate::mapping::{MapperRegistry, MappingFile};

const DEFAULT_ENDPOINT: &str = "https://api.segment.io";

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Segment source write key. Not needed in dry-run mode.
    pub write_key: Option<String>,

    /// Analytics API base URL.
    pub endpoint: String,

    /// Optional TOML mapping file; built-in mappings are used when absent.
    pub mappings_file: Option<PathBuf>,

    /// What to do when one mapper or call fails.
    pub failure_policy: FailurePolicy,

    /// Per-request timeout for the analytics API.
    pub http_timeout: Duration,

    /// Log calls instead of sending them.
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dry_run = var("SEGBRIDGE_DRY_RUN")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let write_key = var("SEGBRIDGE_WRITE_KEY").filter(|k| !k.trim().is_empty());
        if write_key.is_none() && !dry_run {
            anyhow::bail!("Missing write key. Set SEGBRIDGE_WRITE_KEY (or SEGBRIDGE_DRY_RUN=1).");
        }

        let endpoint = var("SEGBRIDGE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let mappings_file = var("SEGBRIDGE_MAPPINGS_FILE").map(PathBuf::from);

        let failure_policy: FailurePolicy = var("SEGBRIDGE_FAILURE_POLICY")
            .map(|v| v.parse())
            .transpose()
            .context("SEGBRIDGE_FAILURE_POLICY must be `isolate` or `fail_fast`.")?
            .unwrap_or_default();

        let timeout_ms: u64 = var("SEGBRIDGE_HTTP_TIMEOUT_MS")
            .map(|v| v.parse())
            .transpose()
            .context("SEGBRIDGE_HTTP_TIMEOUT_MS must be an integer (milliseconds).")?
            .unwrap_or(10_000);
        let http_timeout = Duration::from_millis(timeout_ms.max(100));

        let log_level = var("SEGBRIDGE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            write_key,
            endpoint,
            mappings_file,
            failure_policy,
            http_timeout,
            dry_run,
            log_level,
        })
    }

    /// Builds the mapper registry from the mapping file, or the built-in
    /// defaults when none is configured.
    pub fn mapper_registry(&self) -> Result<MapperRegistry> {
        let file = match &self.mappings_file {
            Some(path) => MappingFile::load(path)?,
            None => MappingFile::defaults(),
        };
        file.to_registry()
            .context("mapping file contains an invalid mapper definition")
    }
}

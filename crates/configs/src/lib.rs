use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "probe.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProbeConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub fixtures: FixtureConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// What the runner does with a suite whose login call fails.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailurePolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub setup_local_admin: bool,
    #[serde(default)]
    pub on_login_failure: LoginFailurePolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            setup_local_admin: true,
            on_login_failure: LoginFailurePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Project expected to exist on the backend; checks that need it skip on 404.
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default = "default_locked_day_offset")]
    pub locked_day_offset_days: i64,
    #[serde(default = "default_past_summary_offset")]
    pub past_summary_offset_days: i64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            project_id: default_project_id(),
            locked_day_offset_days: default_locked_day_offset(),
            past_summary_offset_days: default_past_summary_offset(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunConfig {
    /// Suites to run; empty means all.
    #[serde(default)]
    pub suites: Vec<String>,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_prefix() -> String {
    "TEST_".into()
}

fn default_project_id() -> String {
    "proj_17942869".into()
}

fn default_locked_day_offset() -> i64 {
    30
}

fn default_past_summary_offset() -> i64 {
    7
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    200
}

fn default_backoff_max() -> u64 {
    2000
}

/// Resolve the config path: explicit argument, then `PROBE_CONFIG`, then `probe.toml`.
pub fn resolve_path(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| common::env::var_non_empty("PROBE_CONFIG"))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<ProbeConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let cfg: ProbeConfig =
        toml::from_str(&content).with_context(|| format!("parsing {path}"))?;
    Ok(cfg)
}

/// Load the file when it exists, otherwise start from defaults so env-only setups work.
pub fn load_or_default(path: &str) -> Result<ProbeConfig> {
    if Path::new(path).exists() {
        load_from_file(path)
    } else {
        Ok(ProbeConfig::default())
    }
}

impl ProbeConfig {
    /// File (or defaults), then environment, then `base_url_override`, then validation.
    pub fn load_and_validate(
        explicit_path: Option<&str>,
        base_url_override: Option<&str>,
    ) -> Result<Self> {
        let path = resolve_path(explicit_path);
        let mut cfg = load_or_default(&path)?;
        cfg.apply_env(common::env::var_non_empty);
        if let Some(url) = base_url_override {
            cfg.backend.base_url = url.to_string();
        }
        cfg.normalize_and_validate()
            .with_context(|| format!("invalid config ({path})"))?;
        Ok(cfg)
    }

    /// Overlay environment values. `lookup` is injectable so tests avoid the process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let url_keys = ["FINANCE_BACKEND_URL", "REACT_APP_BACKEND_URL"];
        if let Some(url) = common::env::first_non_empty(&url_keys, &lookup) {
            self.backend.base_url = url;
        }
        if let Some(email) = lookup("FINANCE_TEST_EMAIL") {
            self.auth.email = email;
        }
        if let Some(password) = lookup("FINANCE_TEST_PASSWORD") {
            self.auth.password = password;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.backend.normalize()?;
        self.auth.validate()?;
        self.fixtures.validate()?;
        self.retry.validate()?;
        if let Some(0) = self.run.worker_threads {
            self.run.worker_threads = None;
        }
        Ok(())
    }
}

impl BackendConfig {
    fn normalize(&mut self) -> Result<()> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(anyhow!(
                "backend.base_url is empty; set it in the config file or FINANCE_BACKEND_URL"
            ));
        }
        let lower = trimmed.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("backend.base_url must start with http:// or https://"));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(anyhow!("backend timeouts must be positive seconds"));
        }
        self.base_url = trimmed;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AuthConfig {
    fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(anyhow!(
                "auth.email must be a valid address (or set FINANCE_TEST_EMAIL)"
            ));
        }
        if self.password.is_empty() {
            return Err(anyhow!("auth.password is empty (or set FINANCE_TEST_PASSWORD)"));
        }
        Ok(())
    }
}

impl FixtureConfig {
    fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(anyhow!(
                "fixtures.prefix must not be empty; created data must stay recognisable"
            ));
        }
        if self.locked_day_offset_days <= 0 || self.past_summary_offset_days <= 0 {
            return Err(anyhow!("fixtures day offsets must point into the past (>= 1)"));
        }
        Ok(())
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be >= 1"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(anyhow!("retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_STEM: &str = "azdo-toolbox";

/// Configuration file structure for azdo-toolbox.
///
/// Every field has a default, so the file is optional. The PAT is never
/// read from here; it comes from `AZURE_DEVOPS_PAT` only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Azure DevOps endpoints and API versions
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,

    /// Transport and retry behaviour
    #[serde(default)]
    pub http: HttpConfig,

    /// Pipeline cleanup behaviour
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureDevOpsConfig {
    /// Host serving the Build API
    #[serde(default = "default_core_url")]
    pub core_url: String,

    /// Host serving the Release Management API
    #[serde(default = "default_release_url")]
    pub release_url: String,

    /// Host serving the Graph API
    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_graph_api_version")]
    pub graph_api_version: String,

    /// Runs requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Retries for 429, 5xx and connection failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on in-flight requests across all callers
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CleanupConfig {
    /// Parallel delete calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Release `keepForever` and retention leases before deleting retained runs
    #[serde(default = "default_true")]
    pub remove_retention_leases: bool,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            core_url: default_core_url(),
            release_url: default_release_url(),
            graph_url: default_graph_url(),
            api_version: default_api_version(),
            graph_api_version: default_graph_api_version(),
            page_size: default_page_size(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            remove_retention_leases: true,
        }
    }
}

impl HttpConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_core_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_release_url() -> String {
    "https://vsrm.dev.azure.com".to_string()
}

fn default_graph_url() -> String {
    "https://vssps.dev.azure.com".to_string()
}

fn default_api_version() -> String {
    "7.1".to_string()
}

fn default_graph_api_version() -> String {
    "7.1-preview.1".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./azdo-toolbox.toml
    /// 3. ./azdo-toolbox.json
    /// 4. ./azdo-toolbox.yaml
    /// 5. ./azdo-toolbox.yml
    /// 6. `<config dir>/azdo-toolbox/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = Self::candidates(Path::new("."), dirs::config_dir().as_deref());
        match candidates.into_iter().find(|path| path.exists()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    fn candidates(working_dir: &Path, config_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = ["toml", "json", "yaml", "yml"]
            .iter()
            .map(|ext| working_dir.join(format!("{CONFIG_STEM}.{ext}")))
            .collect();

        if let Some(dir) = config_dir {
            candidates.push(dir.join(CONFIG_STEM).join("config.toml"));
        }

        candidates
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.azure_devops.page_size == 0 {
            anyhow::bail!("azure-devops.page-size must be at least 1");
        }
        if self.http.max_concurrent_requests == 0 {
            anyhow::bail!("http.max-concurrent-requests must be at least 1");
        }
        if self.cleanup.concurrency == 0 {
            anyhow::bail!("cleanup.concurrency must be at least 1");
        }
        Ok(())
    }
}

//! Configuration types for the conversion pipeline

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::core::{ConvertError, Result};

/// Modrinth allows 300 requests per minute per IP; half of that per chunk leaves room
/// for the release lookups that follow a search.
pub const DEFAULT_CHUNK_SIZE: usize = 150;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
pub const DEFAULT_API_BASE: &str = "https://api.modrinth.com";
pub const DEFAULT_OUTPUT_PATH: &str = "./modrinth.index.json";

/// Game and loader the pack is built for
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlatform {
    /// Version written to the manifest dependencies
    pub minecraft_version: String,
    /// Game versions a mod release may declare to be accepted
    pub game_versions: Vec<String>,
    pub loader: String,
    pub loader_version: String,
}

impl TargetPlatform {
    /// Dependency key used by the mrpack format for this loader
    pub fn loader_dependency_key(&self) -> &str {
        match self.loader.as_str() {
            "fabric" => "fabric-loader",
            "quilt" => "quilt-loader",
            other => other,
        }
    }
}

impl Default for TargetPlatform {
    fn default() -> Self {
        Self {
            minecraft_version: "1.20.1".to_string(),
            game_versions: vec!["1.20.1".to_string(), "1.20".to_string()],
            loader: "forge".to_string(),
            loader_version: "47.2.20".to_string(),
        }
    }
}

/// Identity of the generated pack
#[derive(Debug, Clone, PartialEq)]
pub struct PackMetadata {
    pub name: String,
    pub version_id: String,
}

impl Default for PackMetadata {
    fn default() -> Self {
        Self {
            name: "All the Mods 9".to_string(),
            version_id: "0.2.60".to_string(),
        }
    }
}

/// How the scheduler waits between chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingMode {
    /// Sleep the configured cooldown between every pair of chunks
    #[default]
    Fixed,
    /// Only wait when the remaining rate-limit budget cannot cover the next chunk
    QuotaAware,
}

/// What happens when a remote call fails for one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run; nothing is written
    #[default]
    Abort,
    /// Record the reference as unresolved and keep going
    Record,
}

/// Configuration for a conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Requests issued before a cooldown
    pub chunk_size: usize,
    /// Pause between chunks in fixed pacing, fallback wait in quota-aware pacing
    pub cooldown: Duration,
    pub pacing: PacingMode,
    pub failure_policy: FailurePolicy,
    pub target: TargetPlatform,
    pub pack: PackMetadata,
    pub output_path: PathBuf,
    pub pretty_output: bool,
    /// Base URL of the Modrinth API, without the `/v2` suffix
    pub api_base: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries for transient API failures (429, 5xx, timeouts)
    pub max_retries: usize,
    /// Initial delay between retries (doubles each retry)
    pub retry_delay: Duration,
    /// Ask for confirmation before contacting the API
    pub confirm_before_start: bool,
}

impl ConvertConfig {
    /// Apply `MODRINTH_API_BASE` and `MODRINTH_USER_AGENT` from the environment or a `.env` file
    pub fn with_env_overrides(mut self) -> Self {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded environment variables from .env file");
        }

        if let Ok(base) = std::env::var("MODRINTH_API_BASE") {
            debug!("Using API base from environment: {}", base);
            self.api_base = base;
        }
        if let Ok(agent) = std::env::var("MODRINTH_USER_AGENT") {
            self.user_agent = agent;
        }
        self
    }

    /// Check the values that would otherwise fail deep inside the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConvertError::Configuration {
                message: "chunk size must be at least 1".to_string(),
                field: Some("chunk_size".to_string()),
                suggestion: Some(format!("Use the default of {}", DEFAULT_CHUNK_SIZE)),
            });
        }

        if self.target.game_versions.is_empty() {
            return Err(ConvertError::Configuration {
                message: "at least one game version is required".to_string(),
                field: Some("target.game_versions".to_string()),
                suggestion: Some(format!("Pass --game-version {}", self.target.minecraft_version)),
            });
        }

        url::Url::parse(&self.api_base).map_err(|source| ConvertError::InvalidUrl {
            url: self.api_base.clone(),
            source,
        })?;

        Ok(())
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cooldown: DEFAULT_COOLDOWN,
            pacing: PacingMode::Fixed,
            failure_policy: FailurePolicy::Abort,
            target: TargetPlatform::default(),
            pack: PackMetadata::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            pretty_output: false,
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: concat!("curseforge-to-modrinth/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_millis(1000),
            confirm_before_start: true,
        }
    }
}

/// Fluent builder for [`ConvertConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    pub fn pacing(mut self, pacing: PacingMode) -> Self {
        self.config.pacing = pacing;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn minecraft_version<S: Into<String>>(mut self, version: S) -> Self {
        self.config.target.minecraft_version = version.into();
        self
    }

    pub fn game_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.target.game_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    pub fn loader<L: Into<String>, V: Into<String>>(mut self, loader: L, version: V) -> Self {
        self.config.target.loader = loader.into();
        self.config.target.loader_version = version.into();
        self
    }

    pub fn pack<N: Into<String>, V: Into<String>>(mut self, name: N, version_id: V) -> Self {
        self.config.pack = PackMetadata {
            name: name.into(),
            version_id: version_id.into(),
        };
        self
    }

    pub fn output_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn pretty_output(mut self, pretty: bool) -> Self {
        self.config.pretty_output = pretty;
        self
    }

    pub fn api_base<S: Into<String>>(mut self, base: S) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, agent: S) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn confirm_before_start(mut self, confirm: bool) -> Self {
        self.config.confirm_before_start = confirm;
        self
    }

    pub fn build(self) -> ConvertConfig {
        self.config
    }
}

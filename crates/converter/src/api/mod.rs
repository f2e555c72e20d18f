//! Remote project index abstraction
//!
//! The pipeline only talks to the target platform through [`ProjectIndex`], so tests
//! can substitute an in-memory index and the scheduler can query rate-limit headroom
//! through [`QuotaSource`] without knowing about HTTP.

pub mod modrinth_api;

pub use modrinth_api::{ModrinthApi, RateLimitStatus};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TargetPlatform;
use crate::core::{ReleaseRecord, Result, SearchHit};

/// Search response as returned by `GET /v2/search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total_hits: u32,
}

/// Loader and game version constraints for a release listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFilter {
    pub loaders: Vec<String>,
    pub game_versions: Vec<String>,
}

impl From<&TargetPlatform> for VersionFilter {
    fn from(target: &TargetPlatform) -> Self {
        Self {
            loaders: vec![target.loader.clone()],
            game_versions: target.game_versions.clone(),
        }
    }
}

/// Search and release lookup against the target platform
#[async_trait]
pub trait ProjectIndex: Send + Sync {
    /// Free-text project search, hits in relevance order
    async fn search(&self, query: &str) -> Result<SearchResponse>;

    /// Releases of a project, newest first, optionally restricted by `filter`
    async fn list_versions(
        &self,
        project_id: &str,
        filter: Option<&VersionFilter>,
    ) -> Result<Vec<ReleaseRecord>>;
}

/// Source of the remaining request budget, used by quota-aware pacing
pub trait QuotaSource: Send + Sync {
    fn rate_limit_status(&self) -> Option<RateLimitStatus>;
}

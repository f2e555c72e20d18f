//! `modrinth.index.json` document model and assembly

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{PackMetadata, TargetPlatform};
use crate::core::{
    ConvertError, FileHashes, FileOperation, MODRINTH_WEB_BASE, Resolution, ResolvedFile, Result,
    Unresolved,
};

pub const FORMAT_VERSION: u32 = 1;
pub const GAME: &str = "minecraft";

/// Environment requirement of a pack file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEnv {
    pub client: String,
    pub server: String,
}

impl FileEnv {
    /// Client-side mod not installed on servers
    pub fn client_only() -> Self {
        Self {
            client: "required".to_string(),
            server: "unsupported".to_string(),
        }
    }
}

/// One entry of the `files` array
///
/// Placeholders carry a `_comment` pointing at where the file can be found, an empty
/// path and hashes, no downloads and a zero size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    #[serde(rename = "_comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub path: String,
    #[serde(default)]
    pub hashes: FileHashes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<FileEnv>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub file_size: u64,
}

impl ManifestFile {
    /// Placeholder still waiting for a file
    pub fn is_pending(&self) -> bool {
        self.comment.is_some() && self.hashes.sha1.is_empty()
    }
}

impl From<&ResolvedFile> for ManifestFile {
    fn from(resolved: &ResolvedFile) -> Self {
        Self {
            comment: None,
            path: resolved.path(),
            hashes: resolved.file.hashes.clone(),
            env: Some(FileEnv::client_only()),
            downloads: vec![resolved.file.url.clone()],
            file_size: resolved.file.size_bytes,
        }
    }
}

impl From<&Unresolved> for ManifestFile {
    fn from(unresolved: &Unresolved) -> Self {
        let comment = unresolved
            .reference
            .source_url
            .clone()
            .filter(|url| !url.is_empty())
            .or_else(|| unresolved.hit.as_ref().map(|hit| hit.project_url()))
            .unwrap_or_else(|| search_url(&unresolved.reference.name));

        Self {
            comment: Some(comment),
            path: String::new(),
            hashes: FileHashes::default(),
            env: None,
            downloads: Vec::new(),
            file_size: 0,
        }
    }
}

impl From<&Resolution> for ManifestFile {
    fn from(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Resolved(resolved) => resolved.into(),
            Resolution::Unresolved(unresolved) => unresolved.into(),
        }
    }
}

fn search_url(name: &str) -> String {
    let mut url = format!("{}/mods", MODRINTH_WEB_BASE);
    if let Ok(mut parsed) = url::Url::parse(&url) {
        parsed.query_pairs_mut().append_pair("q", name);
        url = parsed.into();
    }
    url
}

/// The mrpack index document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub dependencies: BTreeMap<String, String>,
    pub files: Vec<ManifestFile>,
    pub name: String,
    pub version_id: String,
    pub game: String,
    pub format_version: u32,
}

impl Manifest {
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Write the document in one go, replacing any existing file
    pub async fn write(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = self.to_json(pretty)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ConvertError::file_system(path, FileOperation::Write, e))?;
        info!("Wrote {} file entries to {}", self.files.len(), path.display());
        Ok(())
    }

    /// Entries still lacking a file
    pub fn pending_count(&self) -> usize {
        self.files.iter().filter(|file| file.is_pending()).count()
    }
}

/// Builds the output document from the terminal state of every reference
#[derive(Debug, Clone)]
pub struct ManifestAssembler {
    target: TargetPlatform,
    pack: PackMetadata,
}

impl ManifestAssembler {
    pub fn new(target: TargetPlatform, pack: PackMetadata) -> Self {
        Self { target, pack }
    }

    /// One entry per outcome, ordered by input position
    pub fn assemble(&self, outcomes: &[Resolution]) -> Manifest {
        let mut ordered: Vec<&Resolution> = outcomes.iter().collect();
        ordered.sort_by_key(|outcome| outcome.index());

        let mut dependencies = BTreeMap::new();
        dependencies.insert(GAME.to_string(), self.target.minecraft_version.clone());
        dependencies.insert(
            self.target.loader_dependency_key().to_string(),
            self.target.loader_version.clone(),
        );

        Manifest {
            dependencies,
            files: ordered.into_iter().map(ManifestFile::from).collect(),
            name: self.pack.name.clone(),
            version_id: self.pack.version_id.clone(),
            game: GAME.to_string(),
            format_version: FORMAT_VERSION,
        }
    }
}

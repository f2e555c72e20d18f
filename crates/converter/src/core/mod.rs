//! Core types used throughout the conversion pipeline
//!
//! This module contains the fundamental types that all other modules depend on.
//! Every stage of the pipeline owns its output collection and hands it to the next
//! stage by value; nothing in here is shared mutable state.

pub mod error;
pub mod progress;

pub use error::{ConvertError, FileOperation, Result};
pub use progress::{
    BatchCallback, BatchEvent, ConsoleProgressReporter, IntoBatchCallback, NullProgressReporter,
    ProgressReporter,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Public web root of the target platform, used for labels and placeholder comments
pub const MODRINTH_WEB_BASE: &str = "https://modrinth.com";

/// One mod entry from the CurseForge modlist
///
/// Produced by the source list parser and never mutated afterwards. Duplicates are
/// not merged: two identical lines travel through the pipeline independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub name: String,
    pub author: String,
    pub source_url: Option<String>,
}

impl SourceReference {
    pub fn new<N: Into<String>, A: Into<String>>(name: N, author: A) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            source_url: None,
        }
    }

    pub fn with_source_url<S: Into<String>>(mut self, url: S) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (by {})", self.name, self.author)
    }
}

/// Kind of project on the target platform
///
/// Only `mod` projects are filtered by loader and game version when listing releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectType {
    Mod,
    ResourcePack,
    Shader,
    Other(String),
}

impl ProjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectType::Mod => "mod",
            ProjectType::ResourcePack => "resourcepack",
            ProjectType::Shader => "shader",
            ProjectType::Other(other) => other,
        }
    }

    /// Directory inside the pack where files of this type are installed
    pub fn path_root(&self) -> &'static str {
        match self {
            ProjectType::ResourcePack => "resourcepacks",
            ProjectType::Shader => "shaderpacks",
            ProjectType::Mod | ProjectType::Other(_) => "mods",
        }
    }

    /// Whether release listings are restricted to the target loader and game versions
    pub fn uses_release_filter(&self) -> bool {
        matches!(self, ProjectType::Mod)
    }
}

impl From<String> for ProjectType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mod" => ProjectType::Mod,
            "resourcepack" => ProjectType::ResourcePack,
            "shader" => ProjectType::Shader,
            _ => ProjectType::Other(value),
        }
    }
}

impl From<ProjectType> for String {
    fn from(value: ProjectType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search result from the target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub project_id: String,
    pub title: String,
    pub author: String,
    pub project_type: ProjectType,
    pub slug: String,
}

impl SearchHit {
    /// Canonical public page of the project
    pub fn project_url(&self) -> String {
        format!("{}/{}/{}", MODRINTH_WEB_BASE, self.project_type, self.slug)
    }
}

/// Hashes published for a release file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashes {
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub sha512: String,
}

impl FileHashes {
    pub fn is_empty(&self) -> bool {
        self.sha1.is_empty() && self.sha512.is_empty()
    }
}

/// A downloadable file of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub hashes: FileHashes,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
    #[serde(rename = "primary", default)]
    pub is_primary: bool,
}

/// A versioned publication of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    #[serde(rename = "id")]
    pub release_id: String,
    #[serde(default)]
    pub version_number: String,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

impl ReleaseRecord {
    /// The file flagged primary, otherwise the first file
    pub fn preferred_file(&self) -> Option<&FileRecord> {
        self.files
            .iter()
            .find(|file| file.is_primary)
            .or_else(|| self.files.first())
    }
}

/// Search output for one reference, as handed to the interactive resolver
#[derive(Debug, Clone)]
pub struct MatchCandidates {
    /// Position of the reference in the input list
    pub index: usize,
    pub reference: SourceReference,
    /// Hits in the remote relevance order
    pub hits: Vec<SearchHit>,
    /// First hit whose author and title match the reference exactly
    pub suggested: Option<usize>,
}

/// A reference bound to the hit the operator confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMatch {
    pub index: usize,
    pub reference: SourceReference,
    pub hit: SearchHit,
}

/// A reference resolved all the way down to a file
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFile {
    pub index: usize,
    pub reference: SourceReference,
    pub hit: SearchHit,
    pub file: FileRecord,
    pub project_type: ProjectType,
}

impl ResolvedFile {
    /// Install path of the file inside the pack
    pub fn path(&self) -> String {
        format!("{}/{}", self.project_type.path_root(), self.file.filename)
    }
}

/// Why a reference did not end up with a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The search returned no hits and the operator could only skip
    NoCandidates,
    /// The operator skipped the reference during disambiguation
    SkippedByOperator,
    /// The project has no releases at all
    NoRelease,
    /// The chosen release carries no files
    NoFile,
    /// The operator chose "none" when asked for a release
    AbandonedAtRelease,
    /// The operator chose "none" when asked for a file
    AbandonedAtFile,
    /// A remote call failed and the failure was recorded instead of aborting
    RemoteFailure(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoCandidates => write!(f, "no search results"),
            UnresolvedReason::SkippedByOperator => write!(f, "skipped"),
            UnresolvedReason::NoRelease => write!(f, "no release available"),
            UnresolvedReason::NoFile => write!(f, "release has no files"),
            UnresolvedReason::AbandonedAtRelease => write!(f, "no release chosen"),
            UnresolvedReason::AbandonedAtFile => write!(f, "no file chosen"),
            UnresolvedReason::RemoteFailure(error) => write!(f, "remote failure: {}", error),
        }
    }
}

/// A reference that will become a placeholder entry
#[derive(Debug, Clone, PartialEq)]
pub struct Unresolved {
    pub index: usize,
    pub reference: SourceReference,
    /// The hit chosen during disambiguation, when there was one
    pub hit: Option<SearchHit>,
    pub reason: UnresolvedReason,
}

/// Terminal state of one reference
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedFile),
    Unresolved(Unresolved),
}

impl Resolution {
    pub fn index(&self) -> usize {
        match self {
            Resolution::Resolved(resolved) => resolved.index,
            Resolution::Unresolved(unresolved) => unresolved.index,
        }
    }

    pub fn reference(&self) -> &SourceReference {
        match self {
            Resolution::Resolved(resolved) => &resolved.reference,
            Resolution::Unresolved(unresolved) => &unresolved.reference,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, primary: bool) -> FileRecord {
        FileRecord {
            filename: name.to_string(),
            url: format!("https://cdn.modrinth.com/data/x/{}", name),
            hashes: FileHashes::default(),
            size_bytes: 10,
            is_primary: primary,
        }
    }

    #[test]
    fn test_project_type_round_trips_unknown_values() {
        let parsed: ProjectType = serde_json::from_str("\"datapack\"").unwrap();
        assert_eq!(parsed, ProjectType::Other("datapack".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"datapack\"");
        assert_eq!(parsed.path_root(), "mods");
    }

    #[test]
    fn test_path_roots() {
        assert_eq!(ProjectType::Mod.path_root(), "mods");
        assert_eq!(ProjectType::ResourcePack.path_root(), "resourcepacks");
        assert_eq!(ProjectType::Shader.path_root(), "shaderpacks");
        assert!(ProjectType::Mod.uses_release_filter());
        assert!(!ProjectType::Shader.uses_release_filter());
    }

    #[test]
    fn test_preferred_file_picks_primary_regardless_of_order() {
        let release = ReleaseRecord {
            release_id: "r1".to_string(),
            version_number: "1.0".to_string(),
            game_versions: vec!["1.20.1".to_string()],
            loaders: vec!["forge".to_string()],
            files: vec![file("sources.jar", false), file("main.jar", true)],
        };
        assert_eq!(release.preferred_file().unwrap().filename, "main.jar");
    }

    #[test]
    fn test_preferred_file_falls_back_to_first() {
        let release = ReleaseRecord {
            release_id: "r1".to_string(),
            version_number: String::new(),
            game_versions: Vec::new(),
            loaders: Vec::new(),
            files: vec![file("a.jar", false), file("b.jar", false)],
        };
        assert_eq!(release.preferred_file().unwrap().filename, "a.jar");
    }

    #[test]
    fn test_release_record_from_modrinth_json() {
        let body = r#"{
            "id": "IIJJKKLL",
            "project_id": "AABBCCDD",
            "name": "Version 1.0.0",
            "version_number": "1.0.0",
            "game_versions": ["1.20.1"],
            "loaders": ["forge"],
            "files": [{
                "hashes": {"sha1": "abc", "sha512": "def"},
                "url": "https://cdn.modrinth.com/data/AABBCCDD/versions/IIJJKKLL/my_file.jar",
                "filename": "my_file.jar",
                "primary": true,
                "size": 1097270,
                "file_type": null
            }]
        }"#;

        let release: ReleaseRecord = serde_json::from_str(body).unwrap();
        assert_eq!(release.release_id, "IIJJKKLL");
        assert_eq!(release.files[0].size_bytes, 1097270);
        assert!(release.files[0].is_primary);
        assert_eq!(release.files[0].hashes.sha1, "abc");
    }

    #[test]
    fn test_project_url() {
        let hit = SearchHit {
            project_id: "P7dR8mSH".to_string(),
            title: "Fabric API".to_string(),
            author: "modmuss50".to_string(),
            project_type: ProjectType::Mod,
            slug: "fabric-api".to_string(),
        };
        assert_eq!(hit.project_url(), "https://modrinth.com/mod/fabric-api");
    }
}

//! Manual completion of placeholder entries
//!
//! Placeholders left by a conversion point at the CurseForge page of the mod. Once the
//! operator has downloaded the file by hand, [`backfill_entry`] hashes it and turns the
//! placeholder into a regular entry.

use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha512};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use url::Url;

use crate::core::{ConvertError, FileHashes, FileOperation, Result};
use crate::manifest::Manifest;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// A placeholder that still needs a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Position in the manifest `files` array
    pub entry: usize,
    pub comment: String,
    /// CurseForge file listing filtered to the target game version, when the comment
    /// points at a CurseForge project
    pub files_url: Option<String>,
}

/// File listing page for a CurseForge project URL
pub fn curseforge_files_url(project_url: &str, game_version: &str) -> String {
    format!(
        "{}/files/all?page=1&pageSize=20&version={}&gameVersionTypeId=1",
        project_url.trim_end_matches('/'),
        game_version
    )
}

/// Placeholders with a comment and no SHA-1, in manifest order
pub fn pending_entries(manifest: &Manifest) -> Vec<PendingEntry> {
    let game_version = manifest
        .dependencies
        .get("minecraft")
        .map(String::as_str)
        .unwrap_or_default();

    manifest
        .files
        .iter()
        .enumerate()
        .filter(|(_, file)| file.is_pending())
        .filter_map(|(entry, file)| {
            file.comment.as_ref().map(|comment| PendingEntry {
                entry,
                comment: comment.clone(),
                files_url: is_curseforge_page(comment)
                    .then(|| curseforge_files_url(comment, game_version)),
            })
        })
        .collect()
}

fn is_curseforge_page(comment: &str) -> bool {
    Url::parse(comment)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .is_some_and(|host| host == "curseforge.com" || host.ends_with(".curseforge.com"))
}

/// Hashes and size of a local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDigest {
    pub hashes: FileHashes,
    pub size: u64,
}

/// Stream a file through SHA-1 and SHA-512
pub async fn digest_file(path: &Path) -> Result<ArtifactDigest> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ConvertError::file_system(path, FileOperation::Read, e))?;

    let mut sha1 = Sha1::new();
    let mut sha512 = Sha512::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| ConvertError::file_system(path, FileOperation::Hash, e))?;
        if read == 0 {
            break;
        }
        sha1.update(&buffer[..read]);
        sha512.update(&buffer[..read]);
        size += read as u64;
    }

    debug!("Hashed {} ({} bytes)", path.display(), size);

    Ok(ArtifactDigest {
        hashes: FileHashes {
            sha1: hex::encode(sha1.finalize()),
            sha512: hex::encode(sha512.finalize()),
        },
        size,
    })
}

/// Fill a pending placeholder from a downloaded artifact
///
/// The artifact's file name becomes the install path under `mods/`. The `_comment` is
/// kept so the entry can still be traced back to its source page.
pub async fn backfill_entry(
    manifest: &mut Manifest,
    entry: usize,
    artifact: &Path,
    download_url: &str,
) -> Result<()> {
    if !manifest.files.get(entry).is_some_and(|file| file.is_pending()) {
        return Err(ConvertError::EntryNotFound { entry });
    }

    let filename = artifact
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ConvertError::Configuration {
            message: format!("{} is not a file path", artifact.display()),
            field: Some("file".to_string()),
            suggestion: Some("Pass the path of the downloaded .jar".to_string()),
        })?;

    let digest = digest_file(artifact).await?;

    let file = &mut manifest.files[entry];
    file.hashes = digest.hashes;
    file.path = format!("mods/{}", filename);
    file.downloads.push(download_url.to_string());
    file.file_size = digest.size;

    info!("Filled entry {} with {}", entry, file.path);
    Ok(())
}

/// Read a manifest written by a previous run
pub async fn load_manifest(path: &Path) -> Result<Manifest> {
    let data = match tokio::fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConvertError::InputMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(ConvertError::file_system(path, FileOperation::Read, e)),
    };

    Ok(serde_json::from_str(&data)?)
}

/// Save a manifest in the indented form used for hand editing
pub async fn save_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    manifest.write(path, true).await
}

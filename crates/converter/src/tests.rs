//! Pipeline scenarios against an in-memory project index

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::assert_ok;

use crate::api::{ProjectIndex, SearchResponse, VersionFilter};
use crate::config::{ConvertConfig, ConvertConfigBuilder, FailurePolicy};
use crate::core::{
    ConvertError, FileHashes, FileRecord, ProjectType, ReleaseRecord, Resolution, Result,
    SearchHit, SourceReference, UnresolvedReason,
};
use crate::pipeline::{Conversion, ConversionReport, Converter};
use crate::prompt::{ScriptedAnswer, ScriptedPrompter};

#[derive(Default)]
struct FakeIndex {
    hits: HashMap<String, Vec<SearchHit>>,
    filtered: HashMap<String, Vec<ReleaseRecord>>,
    unfiltered: HashMap<String, Vec<ReleaseRecord>>,
    failing_queries: Vec<String>,
    calls: AtomicUsize,
}

impl FakeIndex {
    fn with_project(mut self, name: &str, author: &str, filtered: Vec<ReleaseRecord>, unfiltered: Vec<ReleaseRecord>) -> Self {
        let slug = name.to_lowercase().replace(' ', "-");
        self.hits.insert(
            name.to_string(),
            vec![SearchHit {
                project_id: slug.clone(),
                title: name.to_string(),
                author: author.to_string(),
                project_type: ProjectType::Mod,
                slug: slug.clone(),
            }],
        );
        self.filtered.insert(slug.clone(), filtered);
        self.unfiltered.insert(slug, unfiltered);
        self
    }

    fn failing(mut self, query: &str) -> Self {
        self.failing_queries.push(query.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectIndex for FakeIndex {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.iter().any(|failing| failing == query) {
            return Err(ConvertError::ApiStatus {
                url: format!("https://api.modrinth.com/v2/search?query={}", query),
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let hits = self.hits.get(query).cloned().unwrap_or_default();
        Ok(SearchResponse {
            total_hits: hits.len() as u32,
            hits,
            ..Default::default()
        })
    }

    async fn list_versions(&self, project_id: &str, filter: Option<&VersionFilter>) -> Result<Vec<ReleaseRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let releases = match filter {
            Some(_) => &self.filtered,
            None => &self.unfiltered,
        };
        Ok(releases.get(project_id).cloned().unwrap_or_default())
    }
}

fn release(id: &str, files: &[(&str, bool)]) -> ReleaseRecord {
    ReleaseRecord {
        release_id: id.to_string(),
        version_number: id.to_string(),
        game_versions: vec!["1.20.1".to_string()],
        loaders: vec!["forge".to_string()],
        files: files
            .iter()
            .map(|(name, primary)| FileRecord {
                filename: name.to_string(),
                url: format!("https://cdn.modrinth.com/data/{}/{}", id, name),
                hashes: FileHashes {
                    sha1: format!("{}-sha1", name),
                    sha512: format!("{}-sha512", name),
                },
                size_bytes: 100,
                is_primary: *primary,
            })
            .collect(),
    }
}

fn config(output: &Path, policy: FailurePolicy) -> ConvertConfig {
    ConvertConfigBuilder::new()
        .chunk_size(2)
        .cooldown(Duration::ZERO)
        .failure_policy(policy)
        .output_path(output)
        .build()
}

fn references() -> Vec<SourceReference> {
    vec![
        SourceReference::new("Alpha", "Ann").with_source_url("https://www.curseforge.com/minecraft/mc-mods/alpha"),
        SourceReference::new("Beta", "Bob").with_source_url("https://www.curseforge.com/minecraft/mc-mods/beta"),
        SourceReference::new("Gamma", "Gil").with_source_url("https://www.curseforge.com/minecraft/mc-mods/gamma"),
    ]
}

fn index() -> FakeIndex {
    FakeIndex::default()
        .with_project(
            "Alpha",
            "ann",
            vec![release("a2", &[("alpha-sources.jar", false), ("alpha.jar", true)])],
            Vec::new(),
        )
        .with_project(
            "Beta",
            "Bob",
            Vec::new(),
            vec![release("b1", &[("beta-fabric.jar", true)]), release("b0", &[("beta-old.jar", true)])],
        )
}

fn finished(conversion: Conversion) -> ConversionReport {
    match conversion {
        Conversion::Finished(report) => report,
        Conversion::Declined => panic!("conversion was declined"),
    }
}

#[tokio::test]
async fn test_three_reference_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("modrinth.index.json");
    let prompter = Arc::new(ScriptedPrompter::new([
        ScriptedAnswer::Confirm(true),
        // Alpha and Beta are preselected, Gamma has no hits
        ScriptedAnswer::Default,
        ScriptedAnswer::Default,
        ScriptedAnswer::Default,
        // Beta has no forge release: pick the second release, then its only file
        ScriptedAnswer::Select(2),
        ScriptedAnswer::Select(1),
    ]));

    let converter = Converter::builder(config(&output, FailurePolicy::Abort))
        .index(Arc::new(index()))
        .prompter(prompter.clone())
        .build()
        .unwrap();

    let report = finished(converter.run(references()).await.unwrap());

    assert_eq!(prompter.remaining(), 0);
    assert!(report.is_written());
    assert_eq!(report.resolved_count(), 2);

    let files = &report.manifest.files;
    assert_eq!(files.len(), 3);
    assert_eq!(files.iter().filter(|file| !file.downloads.is_empty()).count(), 2);
    assert_eq!(files[0].path, "mods/alpha.jar");
    assert_eq!(files[1].path, "mods/beta-old.jar");
    assert_eq!(
        files[2].comment.as_deref(),
        Some("https://www.curseforge.com/minecraft/mc-mods/gamma")
    );

    let gamma = report.unresolved().next().unwrap();
    assert_eq!(gamma.reason, UnresolvedReason::NoCandidates);

    let written = tokio::fs::read_to_string(&output).await.unwrap();
    assert_eq!(written, report.manifest.to_json(false).unwrap());
}

#[tokio::test]
async fn test_manifest_has_one_entry_per_reference() {
    let dir = tempfile::tempdir().unwrap();
    let mut references = references();
    references.push(references[0].clone());

    let converter = Converter::builder(config(&dir.path().join("out.json"), FailurePolicy::Abort))
        .index(Arc::new(index()))
        .prompter(Arc::new(crate::prompt::AutoConfirmPrompter))
        .build()
        .unwrap();

    let report = finished(converter.run(references).await.unwrap());

    assert_eq!(report.manifest.files.len(), 4);
    assert_eq!(report.manifest.files[0], report.manifest.files[3]);
    // Beta escalates and the unattended prompter gives up at the release choice
    assert_eq!(
        report.unresolved().map(|unresolved| unresolved.reason.clone()).collect::<Vec<_>>(),
        vec![UnresolvedReason::AbandonedAtRelease, UnresolvedReason::NoCandidates]
    );
}

#[tokio::test]
async fn test_declined_gate_contacts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("modrinth.index.json");
    let index = Arc::new(index());

    let converter = Converter::builder(config(&output, FailurePolicy::Abort))
        .index(index.clone())
        .prompter(Arc::new(ScriptedPrompter::new([ScriptedAnswer::Default])))
        .build()
        .unwrap();

    let conversion = converter.run(references()).await.unwrap();

    assert!(matches!(conversion, Conversion::Declined));
    assert_eq!(index.calls(), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_remote_failure_aborts_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("modrinth.index.json");

    let converter = Converter::builder(config(&output, FailurePolicy::Abort))
        .index(Arc::new(index().failing("Beta")))
        .prompter(Arc::new(ScriptedPrompter::new([ScriptedAnswer::Confirm(true)])))
        .build()
        .unwrap();

    let result = converter.run(references()).await;

    assert!(matches!(result, Err(ConvertError::ApiStatus { status: 503, .. })));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_recorded_failure_keeps_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("modrinth.index.json");

    let converter = Converter::builder(config(&output, FailurePolicy::Record))
        .index(Arc::new(index().failing("Beta")))
        .prompter(Arc::new(ScriptedPrompter::new([
            ScriptedAnswer::Confirm(true),
            ScriptedAnswer::Default,
            ScriptedAnswer::Default,
        ])))
        .build()
        .unwrap();

    let report = finished(assert_ok!(converter.run(references()).await));

    assert_eq!(report.manifest.files.len(), 3);
    assert_eq!(report.resolved_count(), 1);
    match &report.outcomes[1] {
        Resolution::Unresolved(beta) => {
            assert!(matches!(beta.reason, UnresolvedReason::RemoteFailure(_)));
            assert_eq!(
                report.manifest.files[1].comment.as_deref(),
                Some("https://www.curseforge.com/minecraft/mc-mods/beta")
            );
        }
        other => panic!("expected Beta to be unresolved, got {:?}", other),
    }
    assert!(output.exists());
}

#[tokio::test]
async fn test_write_failure_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing").join("modrinth.index.json");

    let converter = Converter::builder(config(&output, FailurePolicy::Abort))
        .index(Arc::new(FakeIndex::default()))
        .prompter(Arc::new(crate::prompt::AutoConfirmPrompter))
        .build()
        .unwrap();

    let report = finished(converter.run(vec![SourceReference::new("Nothing", "Nobody")]).await.unwrap());

    assert!(!report.is_written());
    assert_eq!(report.manifest.files.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cooldowns_apply_to_both_phases() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConvertConfigBuilder::new()
        .chunk_size(1)
        .cooldown(Duration::from_secs(60))
        .output_path(dir.path().join("out.json"))
        .confirm_before_start(false)
        .build();

    let converter = Converter::builder(config)
        .index(Arc::new(index()))
        .prompter(Arc::new(crate::prompt::AutoConfirmPrompter))
        .build()
        .unwrap();

    let start = tokio::time::Instant::now();
    let report = finished(converter.run(references()).await.unwrap());

    // three searches need two pauses, two selections need one
    assert_eq!(start.elapsed(), Duration::from_secs(180));
    assert_eq!(report.manifest.files.len(), 3);
}

//! End-to-end conversion: search, disambiguate, select, assemble, write

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::api::{ModrinthApi, ProjectIndex, QuotaSource, VersionFilter};
use crate::batch::{BatchScheduler, Pacing};
use crate::config::{ConvertConfig, FailurePolicy, PacingMode};
use crate::core::{
    BatchCallback, ConvertError, MatchCandidates, Resolution, ResolvedMatch, Result, SearchHit,
    SourceReference, Unresolved, UnresolvedReason,
};
use crate::manifest::{Manifest, ManifestAssembler};
use crate::matcher::CandidateMatcher;
use crate::prompt::{CliPrompter, Prompter};
use crate::resolver::InteractiveResolver;
use crate::selector::VersionSelector;

const REQUESTS_PER_MINUTE: usize = 300;

/// Search result for one reference, or the placeholder a recorded failure left behind
type SearchOutcome = std::result::Result<MatchCandidates, Unresolved>;

/// How a run ended
#[derive(Debug)]
pub enum Conversion {
    /// The operator declined the start gate; nothing was contacted or written
    Declined,
    Finished(ConversionReport),
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct ConversionReport {
    pub manifest: Manifest,
    /// Terminal state of every reference, in input order
    pub outcomes: Vec<Resolution>,
    pub output_path: PathBuf,
    /// Set when the manifest could not be written
    pub write_error: Option<String>,
}

impl ConversionReport {
    pub fn resolved_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_resolved()).count()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Unresolved> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Resolution::Unresolved(unresolved) => Some(unresolved),
            Resolution::Resolved(_) => None,
        })
    }

    pub fn is_written(&self) -> bool {
        self.write_error.is_none()
    }
}

/// The conversion pipeline
pub struct Converter {
    config: ConvertConfig,
    index: Arc<dyn ProjectIndex>,
    quota: Option<Arc<dyn QuotaSource>>,
    prompter: Arc<dyn Prompter>,
    progress: Option<BatchCallback>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("quota_aware", &self.quota.is_some())
            .finish()
    }
}

impl Converter {
    pub fn builder(config: ConvertConfig) -> ConverterBuilder {
        ConverterBuilder::new(config)
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    fn scheduler(&self, phase: &'static str) -> BatchScheduler {
        let pacing = match (self.config.pacing, &self.quota) {
            (PacingMode::QuotaAware, Some(source)) => Pacing::QuotaAware {
                source: Arc::clone(source),
                fallback: self.config.cooldown,
            },
            _ => Pacing::Fixed(self.config.cooldown),
        };

        BatchScheduler::new(self.config.chunk_size, pacing)
            .with_phase(phase)
            .with_progress(self.progress.clone())
    }

    /// Ask before issuing any request; declining is a clean exit
    fn confirm_start(&self, total: usize) -> Result<bool> {
        if !self.config.confirm_before_start {
            return Ok(true);
        }

        let chunks = total.div_ceil(self.config.chunk_size.max(1));
        self.prompter.warn(&format!(
            "Modrinth allows {} requests per minute. {} references will be looked up in {} chunk(s) of {} with a {}s pause in between.",
            REQUESTS_PER_MINUTE,
            total,
            chunks,
            self.config.chunk_size,
            self.config.cooldown.as_secs()
        ));
        self.prompter.confirm("Start the conversion?", false)
    }

    /// Turn a remote failure into a placeholder or abort, depending on the policy
    fn on_failure(
        &self,
        index: usize,
        reference: SourceReference,
        hit: Option<SearchHit>,
        error: ConvertError,
    ) -> Result<Unresolved> {
        match self.config.failure_policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Record => {
                warn!("{}: {} (kept as placeholder)", reference, error);
                Ok(Unresolved {
                    index,
                    reference,
                    hit,
                    reason: UnresolvedReason::RemoteFailure(error.to_string()),
                })
            }
        }
    }

    /// Run the whole pipeline over the parsed modlist
    pub async fn run(&self, references: Vec<SourceReference>) -> Result<Conversion> {
        let total = references.len();
        if !self.confirm_start(total)? {
            info!("Conversion declined by operator");
            return Ok(Conversion::Declined);
        }

        let mut unresolved = Vec::new();

        let matcher = CandidateMatcher::new(Arc::clone(&self.index));
        let items: Vec<(usize, SourceReference)> = references.into_iter().enumerate().collect();
        let searched = self
            .scheduler("search")
            .run(
                items,
                async |(index, reference): (usize, SourceReference)| -> Result<SearchOutcome> {
                    match matcher.search(index, reference.clone()).await {
                        Ok(candidates) => Ok(Ok(candidates)),
                        Err(error) => self.on_failure(index, reference, None, error).map(Err),
                    }
                },
            )
            .await?;

        let mut candidates = Vec::with_capacity(searched.len());
        for outcome in searched {
            match outcome {
                Ok(found) => candidates.push(found),
                Err(failed) => unresolved.push(failed),
            }
        }

        let disambiguation = InteractiveResolver::new(Arc::clone(&self.prompter)).resolve(candidates)?;
        unresolved.extend(disambiguation.unresolved);

        let selector = VersionSelector::new(
            Arc::clone(&self.index),
            Arc::clone(&self.prompter),
            VersionFilter::from(&self.config.target),
        );
        let mut outcomes = self
            .scheduler("resolve")
            .run(
                disambiguation.matched,
                async |matched: ResolvedMatch| -> Result<Resolution> {
                    let (index, reference, hit) =
                        (matched.index, matched.reference.clone(), matched.hit.clone());
                    match selector.select(matched).await {
                        Ok(resolution) => Ok(resolution),
                        Err(error) => self
                            .on_failure(index, reference, Some(hit), error)
                            .map(Resolution::Unresolved),
                    }
                },
            )
            .await?;

        outcomes.extend(unresolved.into_iter().map(Resolution::Unresolved));
        outcomes.sort_by_key(Resolution::index);

        let manifest = ManifestAssembler::new(self.config.target.clone(), self.config.pack.clone())
            .assemble(&outcomes);

        let output_path = self.config.output_path.clone();
        let write_error = match manifest.write(&output_path, self.config.pretty_output).await {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to write {}: {}", output_path.display(), e);
                Some(e.to_string())
            }
        };

        Ok(Conversion::Finished(ConversionReport {
            manifest,
            outcomes,
            output_path,
            write_error,
        }))
    }
}

/// Builder for [`Converter`]
///
/// Without an explicit index the Modrinth HTTP client is created from the config and
/// also serves as the quota source. Without a prompter answers are read from stdin.
pub struct ConverterBuilder {
    config: ConvertConfig,
    index: Option<Arc<dyn ProjectIndex>>,
    quota: Option<Arc<dyn QuotaSource>>,
    prompter: Option<Arc<dyn Prompter>>,
    progress: Option<BatchCallback>,
}

impl ConverterBuilder {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            index: None,
            quota: None,
            prompter: None,
            progress: None,
        }
    }

    pub fn index(mut self, index: Arc<dyn ProjectIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn quota(mut self, quota: Arc<dyn QuotaSource>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn progress(mut self, progress: BatchCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn build(self) -> Result<Converter> {
        self.config.validate()?;

        let (index, quota) = match self.index {
            Some(index) => (index, self.quota),
            None => {
                let api = Arc::new(ModrinthApi::new(&self.config)?);
                let quota = self.quota.unwrap_or_else(|| api.clone() as Arc<dyn QuotaSource>);
                (api as Arc<dyn ProjectIndex>, Some(quota))
            }
        };

        Ok(Converter {
            config: self.config,
            index,
            quota,
            prompter: self.prompter.unwrap_or_else(|| Arc::new(CliPrompter::new())),
            progress: self.progress,
        })
    }
}

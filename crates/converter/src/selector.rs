//! Release and file selection with operator escalation
//!
//! Every matched project goes through at most three levels:
//!
//! 1. A release listing filtered to the target loader and game versions (mods only).
//!    The newest release's primary file is taken without asking.
//! 2. If that yields nothing, the unfiltered listing is shown and the operator picks a
//!    release or gives up.
//! 3. The operator then picks a file of that release or gives up.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ProjectIndex, VersionFilter};
use crate::core::{
    FileRecord, ReleaseRecord, Resolution, ResolvedFile, ResolvedMatch, Result, SearchHit,
    Unresolved, UnresolvedReason,
};
use crate::prompt::Prompter;

const NONE_LABEL: &str = "None (keep as placeholder)";

/// Result of one selection level
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A file was selected
    Found(FileRecord),
    /// This level could not decide; ask the operator
    Escalate,
    /// The reference ends up as a placeholder
    Abandoned(UnresolvedReason),
}

/// Picks a concrete file for every matched project
pub struct VersionSelector {
    index: Arc<dyn ProjectIndex>,
    prompter: Arc<dyn Prompter>,
    filter: VersionFilter,
}

impl VersionSelector {
    pub fn new(index: Arc<dyn ProjectIndex>, prompter: Arc<dyn Prompter>, filter: VersionFilter) -> Self {
        Self {
            index,
            prompter,
            filter,
        }
    }

    /// Resolve one matched reference down to a file or a placeholder reason
    pub async fn select(&self, matched: ResolvedMatch) -> Result<Resolution> {
        let step = match self.filtered_lookup(&matched.hit).await? {
            Step::Escalate => self.escalate(&matched).await?,
            step => step,
        };

        let ResolvedMatch { index, reference, hit } = matched;
        let resolution = match step {
            Step::Found(file) => Resolution::Resolved(ResolvedFile {
                index,
                reference,
                project_type: hit.project_type.clone(),
                hit,
                file,
            }),
            Step::Abandoned(reason) => Resolution::Unresolved(Unresolved {
                index,
                reference,
                hit: Some(hit),
                reason,
            }),
            Step::Escalate => Resolution::Unresolved(Unresolved {
                index,
                reference,
                hit: Some(hit),
                reason: UnresolvedReason::NoRelease,
            }),
        };

        Ok(resolution)
    }

    /// Newest release matching the target, primary file first
    pub async fn filtered_lookup(&self, hit: &SearchHit) -> Result<Step> {
        let filter = hit.project_type.uses_release_filter().then_some(&self.filter);
        let releases = self.index.list_versions(&hit.project_id, filter).await?;

        match releases.first().and_then(ReleaseRecord::preferred_file) {
            Some(file) => {
                debug!("{}: selected {}", hit.title, file.filename);
                Ok(Step::Found(file.clone()))
            }
            None => {
                info!(
                    "{}: no {} release for {:?}, asking for a manual choice",
                    hit.title,
                    self.filter.loaders.join("/"),
                    self.filter.game_versions
                );
                Ok(Step::Escalate)
            }
        }
    }

    /// Unfiltered listing, then an operator choice of release and file
    async fn escalate(&self, matched: &ResolvedMatch) -> Result<Step> {
        let releases = self.index.list_versions(&matched.hit.project_id, None).await?;
        if releases.is_empty() {
            self.prompter
                .warn(&format!("{} has no releases at all", matched.hit.title));
            return Ok(Step::Abandoned(UnresolvedReason::NoRelease));
        }

        let release = match self.choose_release(matched, &releases)? {
            Some(release) => release,
            None => return Ok(Step::Abandoned(UnresolvedReason::AbandonedAtRelease)),
        };

        if release.files.is_empty() {
            self.prompter.warn(&format!(
                "{} release {} has no files",
                matched.hit.title, release.version_number
            ));
            return Ok(Step::Abandoned(UnresolvedReason::NoFile));
        }

        match self.choose_file(matched, release)? {
            Some(file) => Ok(Step::Found(file.clone())),
            None => Ok(Step::Abandoned(UnresolvedReason::AbandonedAtFile)),
        }
    }

    fn choose_release<'r>(
        &self,
        matched: &ResolvedMatch,
        releases: &'r [ReleaseRecord],
    ) -> Result<Option<&'r ReleaseRecord>> {
        let mut choices = Vec::with_capacity(releases.len() + 1);
        choices.push(NONE_LABEL.to_string());
        choices.extend(releases.iter().map(release_label));

        let message = format!(
            "No compatible release of {} for {}. Pick a release",
            matched.hit.title, matched.reference
        );
        let choice = self.prompter.select(&message, &choices, 0)?;
        Ok(choice.checked_sub(1).and_then(|position| releases.get(position)))
    }

    fn choose_file<'r>(
        &self,
        matched: &ResolvedMatch,
        release: &'r ReleaseRecord,
    ) -> Result<Option<&'r FileRecord>> {
        let mut choices = Vec::with_capacity(release.files.len() + 1);
        choices.push(NONE_LABEL.to_string());
        choices.extend(release.files.iter().map(file_label));

        let message = format!(
            "Pick a file of {} {}",
            matched.hit.title, release.version_number
        );
        let choice = self.prompter.select(&message, &choices, 0)?;
        Ok(choice.checked_sub(1).and_then(|position| release.files.get(position)))
    }
}

fn release_label(release: &ReleaseRecord) -> String {
    format!(
        "{} (game versions: {}; loaders: {})",
        release.version_number,
        release.game_versions.join(", "),
        release.loaders.join(", ")
    )
}

fn file_label(file: &FileRecord) -> String {
    if file.is_primary {
        format!("{} (primary)", file.filename)
    } else {
        file.filename.clone()
    }
}

//! Operator-driven disambiguation of search candidates

use std::sync::Arc;

use tracing::{debug, info};

use crate::core::{MatchCandidates, ResolvedMatch, Result, SearchHit, Unresolved, UnresolvedReason};
use crate::prompt::Prompter;

const SKIP_LABEL: &str = "Skip (keep as placeholder)";

/// Outcome of the disambiguation phase
#[derive(Debug, Clone, Default)]
pub struct Disambiguation {
    /// References bound to a hit, in input order
    pub matched: Vec<ResolvedMatch>,
    /// References the operator skipped, in input order
    pub unresolved: Vec<Unresolved>,
}

/// Walks the operator through every reference, one prompt each
pub struct InteractiveResolver {
    prompter: Arc<dyn Prompter>,
}

impl InteractiveResolver {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter }
    }

    /// Ask the operator to confirm or pick a hit for every reference
    ///
    /// The suggested hit is preselected; references without a suggestion default to
    /// skipping. Nothing is saved between prompts.
    pub fn resolve(&self, candidates: Vec<MatchCandidates>) -> Result<Disambiguation> {
        let total = candidates.len();
        let mut outcome = Disambiguation::default();

        for (position, candidate) in candidates.into_iter().enumerate() {
            let mut choices = Vec::with_capacity(candidate.hits.len() + 1);
            choices.push(SKIP_LABEL.to_string());
            choices.extend(candidate.hits.iter().map(hit_label));

            let default = candidate.suggested.map_or(0, |suggested| suggested + 1);
            let message = format!(
                "({}/{}) Select the Modrinth project for {}",
                position + 1,
                total,
                candidate.reference
            );

            let choice = self.prompter.select(&message, &choices, default)?;
            let MatchCandidates { index, reference, mut hits, .. } = candidate;

            if choice == 0 || choice > hits.len() {
                let reason = if hits.is_empty() {
                    UnresolvedReason::NoCandidates
                } else {
                    UnresolvedReason::SkippedByOperator
                };
                info!("Skipped {}: {}", reference, reason);
                outcome.unresolved.push(Unresolved {
                    index,
                    reference,
                    hit: None,
                    reason,
                });
                continue;
            }

            let hit = hits.swap_remove(choice - 1);
            debug!("{} -> {} ({})", reference, hit.title, hit.project_id);
            outcome.matched.push(ResolvedMatch { index, reference, hit });
        }

        Ok(outcome)
    }
}

/// `"<title> by <author> [<type>] <project url>"`
pub fn hit_label(hit: &SearchHit) -> String {
    format!(
        "{} by {} [{}] {}",
        hit.title,
        hit.author,
        hit.project_type,
        hit.project_url()
    )
}

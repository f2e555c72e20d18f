//! Search-based candidate matching

use std::sync::Arc;

use tracing::debug;

use crate::api::ProjectIndex;
use crate::core::{MatchCandidates, Result, SearchHit, SourceReference};

/// Looks up each reference on the target platform and proposes a hit
#[derive(Clone)]
pub struct CandidateMatcher {
    index: Arc<dyn ProjectIndex>,
}

impl CandidateMatcher {
    pub fn new(index: Arc<dyn ProjectIndex>) -> Self {
        Self { index }
    }

    /// Search by the reference name and suggest the first exact author and title match
    ///
    /// `position` is the reference's place in the input list and is carried through so
    /// the final manifest can keep input order.
    pub async fn search(&self, position: usize, reference: SourceReference) -> Result<MatchCandidates> {
        let response = self.index.search(&reference.name).await?;
        let suggested = suggest(&reference, &response.hits);

        debug!(
            "{}: {} hit(s), suggested {:?}",
            reference,
            response.hits.len(),
            suggested
        );

        Ok(MatchCandidates {
            index: position,
            reference,
            hits: response.hits,
            suggested,
        })
    }
}

/// First hit whose author matches ignoring case and whose title matches exactly
pub fn suggest(reference: &SourceReference, hits: &[SearchHit]) -> Option<usize> {
    let author = reference.author.to_lowercase();
    hits.iter()
        .position(|hit| hit.author.to_lowercase() == author && hit.title == reference.name)
}

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::browser::PageDriver;
use crate::domain::{ResolvedVideo, VideoCandidate};
use crate::video::canonical::canonicalize;
use crate::video::classify::classify;
use crate::video::gate::ValidityGate;
use crate::video::registry::SessionRegistry;
use crate::video::relevance::{LessonContext, RelevanceValidator};
use crate::video::Rejection;

/// The single gate every extracted candidate passes through.
///
/// Runs canonicalization, the validity gate, the relevance check and
/// session registration in that order, stopping at the first failure.
#[derive(Debug, Clone)]
pub struct FinalCheckpoint {
    gate: Arc<ValidityGate>,
    relevance: RelevanceValidator,
    registry: Arc<SessionRegistry>,
}

impl FinalCheckpoint {
    pub fn new(gate: Arc<ValidityGate>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            gate,
            relevance: RelevanceValidator::new(),
            registry,
        }
    }

    pub fn gate(&self) -> &ValidityGate {
        &self.gate
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn finalize(
        &self,
        candidate: &VideoCandidate,
        lesson: &mut LessonContext,
        page: &dyn PageDriver,
    ) -> Result<ResolvedVideo, Rejection> {
        let reference = canonicalize(&candidate.raw_url, classify(&candidate.raw_url));

        self.gate.check(&reference)?;

        let verdict = self
            .relevance
            .belongs_to_lesson(&reference, &candidate.raw_url, candidate.locality, lesson, page)
            .await;
        if !verdict.accepted {
            return Err(Rejection::NotRelevant);
        }

        if !self
            .registry
            .register_if_new(&reference, &lesson.title, &candidate.source_strategy)
        {
            return Err(Rejection::SessionDuplicate);
        }

        debug!(
            url = %reference.canonical_url,
            key = %reference.identity_key,
            strategy = %candidate.source_strategy,
            "Candidate accepted"
        );

        Ok(ResolvedVideo {
            reference,
            strategy: candidate.source_strategy.clone(),
            thumbnail_url: candidate.thumbnail_url.clone(),
            duration_ms: candidate.duration_ms,
            resolved_at: Utc::now(),
        })
    }
}

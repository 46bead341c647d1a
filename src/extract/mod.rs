//! Ordered video extraction strategies.
//!
//! Each strategy looks at the current page and proposes at most one
//! candidate. The chain runs them strictly in sequence and hands every
//! candidate to the [`FinalCheckpoint`]; the first one accepted becomes the
//! lesson's video.
//!
//! ```text
//! structured_data → interactive_reveal → dom_scan → network → legacy
//!        │                  │                │          │         │
//!        └──────────────────┴── FinalCheckpoint ────────┴─────────┘
//! ```

mod dom_scan;
mod legacy;
mod network;
mod reveal;
mod structured;

pub use dom_scan::DomScan;
pub use legacy::LegacyPlayButton;
pub use network::{pick_media_url, NetworkInspection};
pub use reveal::InteractiveReveal;
pub use structured::{find_lesson_video, StructuredData};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::app::Result;
use crate::browser::PageDriver;
use crate::config::ExtractionSettings;
use crate::domain::{Platform, ResolvedVideo, VideoCandidate};
use crate::video::{
    canonicalize, classify, FinalCheckpoint, LessonContext, Rejection, ValidityGate,
};

/// What a strategy gets to look at besides the page.
pub struct StrategyContext<'a> {
    pub lesson: &'a LessonContext,
    pub gate: &'a ValidityGate,
    pub settings: &'a ExtractionSettings,
}

impl StrategyContext<'_> {
    /// Cheap pre-filter so a strategy can skip past header videos and
    /// thumbnails and keep looking. The checkpoint re-checks everything.
    pub fn admissible(&self, url: &str) -> bool {
        let platform = classify(url);
        if platform == Platform::Unknown {
            return false;
        }
        self.gate.check(&canonicalize(url, platform)).is_ok()
    }
}

/// A single way of locating the lesson video.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Stable name recorded with every registration and attempt.
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    Found,
    Rejected { reason: Rejection },
    None,
    Error { message: String },
    TimedOut,
}

/// One strategy run for one lesson, kept for the attempt log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub lesson_title: String,
    pub strategy: String,
    pub video_url: Option<String>,
    #[serde(flatten)]
    pub status: AttemptStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub video: Option<ResolvedVideo>,
    pub attempts: Vec<AttemptRecord>,
}

/// Runs strategies in order until one candidate passes the checkpoint.
pub struct StrategyChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    checkpoint: FinalCheckpoint,
    settings: ExtractionSettings,
}

impl StrategyChain {
    pub fn new(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        checkpoint: FinalCheckpoint,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            strategies,
            checkpoint,
            settings,
        }
    }

    /// The five built-in strategies, most trusted first.
    pub fn standard(checkpoint: FinalCheckpoint, settings: ExtractionSettings) -> Self {
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(StructuredData),
            Box::new(InteractiveReveal),
            Box::new(DomScan),
            Box::new(NetworkInspection),
            Box::new(LegacyPlayButton),
        ];
        Self::new(strategies, checkpoint, settings)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn checkpoint(&self) -> &FinalCheckpoint {
        &self.checkpoint
    }

    /// Find this lesson's video. Strategy errors and timeouts count as
    /// "no candidate"; a rejected candidate moves on to the next strategy.
    pub async fn run(&self, page: &dyn PageDriver, lesson: &mut LessonContext) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        for strategy in &self.strategies {
            let name = strategy.name();
            let found = {
                let cx = StrategyContext {
                    lesson: &*lesson,
                    gate: self.checkpoint.gate(),
                    settings: &self.settings,
                };
                tokio::time::timeout(self.settings.strategy_timeout(), strategy.extract(page, &cx))
                    .await
            };

            let (status, url, video) = match found {
                Err(_) => {
                    debug!(strategy = name, "Strategy timed out");
                    (AttemptStatus::TimedOut, None, None)
                }
                Ok(Err(e)) => {
                    debug!(strategy = name, error = %e, "Strategy failed");
                    (AttemptStatus::Error { message: e.to_string() }, None, None)
                }
                Ok(Ok(None)) => {
                    trace!(strategy = name, "No candidate");
                    (AttemptStatus::None, None, None)
                }
                Ok(Ok(Some(candidate))) => {
                    let url = Some(candidate.raw_url.clone());
                    match self.checkpoint.finalize(&candidate, lesson, page).await {
                        Ok(video) => (AttemptStatus::Found, url, Some(video)),
                        Err(reason) => {
                            debug!(
                                strategy = name,
                                url = %candidate.raw_url,
                                %reason,
                                "Candidate rejected"
                            );
                            (AttemptStatus::Rejected { reason }, url, None)
                        }
                    }
                }
            };

            outcome.attempts.push(AttemptRecord {
                lesson_title: lesson.title.clone(),
                strategy: name.to_string(),
                video_url: url,
                status,
                timestamp: Utc::now(),
            });

            if let Some(video) = video {
                info!(
                    lesson = %lesson.title,
                    strategy = name,
                    url = %video.url(),
                    "Video found"
                );
                outcome.video = Some(video);
                break;
            }
        }

        outcome
    }
}

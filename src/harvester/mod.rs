//! Run orchestration: one classroom URL in, one folder of Markdown out.
//!
//! ```text
//! login → discover lessons → for each lesson:
//!     isolate or clear storage → navigate → content + signature
//!     → StrategyChain → write Markdown
//! → session report + attempt log
//! ```

pub mod isolation;
pub mod report;

pub use isolation::{IsolationPolicy, IsolationReason};
pub use report::{promote_duplicates, scan_duplicates, DuplicateVideo};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{HarvestError, Result};
use crate::browser::{BrowserFactory, PageDriver};
use crate::config::{Config, OutputSettings, RunSettings};
use crate::domain::{Community, Lesson, LessonContent, ResolvedVideo};
use crate::extract::{AttemptRecord, ChainOutcome, StrategyChain};
use crate::lesson::discovery::{lessons_from_tree, lesson_url};
use crate::lesson::{
    community_from_url, community_name_from_title, discover_lessons, extract_content, login,
    single_lesson_id, Credentials, LessonWriter, OutputDirs,
};
use crate::video::{FinalCheckpoint, LessonContext, SessionRegistry, ValidityGate};

/// What happened to one lesson.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LessonOutcome {
    Saved { video: ResolvedVideo },
    NoVideo,
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonResult {
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: LessonOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub community: Option<Community>,
    pub output_dir: Option<PathBuf>,
    pub lessons: Vec<LessonResult>,
    pub attempts: Vec<AttemptRecord>,
    pub browser_launches: usize,
}

impl RunSummary {
    fn count(&self, f: impl Fn(&LessonOutcome) -> bool) -> usize {
        self.lessons.iter().filter(|l| f(&l.outcome)).count()
    }

    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, LessonOutcome::Saved { .. }))
    }

    pub fn no_video(&self) -> usize {
        self.count(|o| matches!(o, LessonOutcome::NoVideo))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, LessonOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, LessonOutcome::Failed { .. }))
    }
}

/// Browser-side result of one lesson attempt.
struct Extracted {
    lesson: Lesson,
    content: LessonContent,
    chain: ChainOutcome,
    signature: String,
}

/// The live browser, if any. Emptied when the browser is thrown away and
/// refilled on the next lesson attempt.
type Session = Option<Box<dyn PageDriver>>;

/// Drives a browser through a classroom and saves every lesson.
pub struct Harvester {
    factory: Arc<dyn BrowserFactory>,
    chain: StrategyChain,
    registry: Arc<SessionRegistry>,
    policy: IsolationPolicy,
    run: RunSettings,
    output: OutputSettings,
    login_settle: Duration,
    credentials: Option<Credentials>,
}

impl Harvester {
    pub fn new(
        config: &Config,
        factory: Arc<dyn BrowserFactory>,
        gate: Arc<ValidityGate>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let checkpoint = FinalCheckpoint::new(gate, registry.clone());
        Self {
            factory,
            chain: StrategyChain::standard(checkpoint, config.extraction.clone()),
            registry,
            policy: IsolationPolicy::new(config.isolation.clone()),
            run: config.run.clone(),
            output: config.output.clone(),
            login_settle: config.browser.wait_after_load(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    async fn launch(&self, summary: &mut RunSummary) -> Result<Box<dyn PageDriver>> {
        let page = self.factory.launch().await?;
        summary.browser_launches += 1;
        if let Some(ref credentials) = self.credentials {
            if let Err(e) = login(&*page, credentials, self.login_settle).await {
                close_page(page).await;
                return Err(e);
            }
        }
        Ok(page)
    }

    /// Harvest every lesson reachable from `url`.
    ///
    /// A URL carrying `md=<lesson id>` harvests that lesson only. Reports are
    /// written even when the run stops early.
    pub async fn run(&self, url: &str) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        self.registry.reset();

        let mut community = community_from_url(url)
            .ok_or_else(|| HarvestError::Config(format!("not a classroom URL: {url}")))?;

        let mut session: Session = None;
        let result = self
            .harvest(&mut session, url, &mut community, &mut summary)
            .await;
        if let Some(page) = session.take() {
            close_page(page).await;
        }

        let reports = report::write_session_report(&self.registry, &self.output.report_dir)
            .and_then(|_| report::write_attempt_log(&summary.attempts, &self.output.report_dir));
        result?;
        reports?;

        info!(
            saved = summary.saved(),
            no_video = summary.no_video(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "Run finished"
        );
        summary.community = Some(community);
        Ok(summary)
    }

    async fn harvest(
        &self,
        session: &mut Session,
        url: &str,
        community: &mut Community,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let page = self.launch(summary).await?;
        let discovered = self.discover(&*page, url, community).await;
        *session = Some(page);
        let lessons = discovered?;
        if lessons.is_empty() {
            warn!(url, "No lessons found");
        }

        let dirs = OutputDirs::new(&self.output.root, community);
        dirs.create()?;
        summary.output_dir = Some(dirs.community.clone());
        let writer = LessonWriter::new(dirs, community.name.clone());

        let total = lessons.len();
        let mut previous_signature: Option<String> = None;
        let mut lessons_on_shared = 0;

        for (i, lesson) in lessons.iter().enumerate() {
            let index = i + 1;
            info!(index, total, lesson = %lesson.title, "Processing lesson");

            if self.run.skip_existing
                && !lesson.title.is_empty()
                && writer.already_extracted(lesson)
            {
                info!(lesson = %lesson.title, "Already extracted, skipping");
                summary.lessons.push(LessonResult {
                    title: lesson.title.clone(),
                    url: lesson.url.clone(),
                    outcome: LessonOutcome::Skipped,
                });
                continue;
            }

            if let Some(reason) = self.policy.reason(index, &lesson.title, lessons_on_shared) {
                warn!(?reason, lesson = %lesson.title, "Recreating browser for lesson");
                if let Some(page) = session.take() {
                    close_page(page).await;
                }
            } else if let Some(page) = session.as_deref() {
                if let Err(e) = page.clear_storage().await {
                    debug!(error = %e, "Clearing storage failed");
                }
            }
            if session.is_none() {
                lessons_on_shared = 0;
            }

            let result = self
                .process_with_retries(session, lesson, previous_signature.as_deref(), summary)
                .await?;
            lessons_on_shared += 1;
            self.registry.record_lesson_processed();

            let (title, outcome) = match result {
                Ok(extracted) => {
                    previous_signature = Some(extracted.signature.clone());
                    let title = extracted.lesson.title.clone();
                    (title, self.save(&writer, extracted, summary).await)
                }
                Err(reason) => {
                    warn!(lesson = %lesson.title, %reason, "Lesson failed");
                    (lesson.title.clone(), LessonOutcome::Failed { reason })
                }
            };
            summary.lessons.push(LessonResult {
                title,
                url: lesson.url.clone(),
                outcome,
            });

            if index < total {
                tokio::time::sleep(self.run.delay_between_lessons()).await;
            }
        }
        Ok(())
    }

    /// Community name from the landing page, then the lessons to harvest.
    async fn discover(
        &self,
        page: &dyn PageDriver,
        url: &str,
        community: &mut Community,
    ) -> Result<Vec<Lesson>> {
        page.navigate(url).await?;
        if let Some(name) = community_name_from_title(&page.page_title().await?) {
            community.name = name;
        }

        match single_lesson_id(url) {
            Some(id) => {
                let known = match page.next_data().await? {
                    Some(data) => lessons_from_tree(&data, url),
                    None => Vec::new(),
                };
                let lesson = known
                    .into_iter()
                    .find(|l| l.id == id)
                    .unwrap_or_else(|| Lesson::new(id.as_str(), "", lesson_url(url, &id)));
                Ok(vec![lesson])
            }
            None => discover_lessons(page, url).await,
        }
    }

    /// Retry a lesson up to `max_retries` extra times.
    ///
    /// A missing browser is launched at the start of an attempt, and a
    /// browser-level failure discards it, so failed launches count against
    /// the same attempts. The outer `Result` fails only on errors that end
    /// the run; the inner one carries the lesson's last failure.
    async fn process_with_retries(
        &self,
        session: &mut Session,
        lesson: &Lesson,
        previous: Option<&str>,
        summary: &mut RunSummary,
    ) -> Result<std::result::Result<Extracted, String>> {
        let mut last_error = String::new();

        for attempt in 0..=self.run.max_retries {
            if attempt > 0 {
                info!(attempt, lesson = %lesson.title, "Retrying lesson");
            }

            if session.is_none() {
                match self.launch(summary).await {
                    Ok(page) => *session = Some(page),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(lesson = %lesson.title, error = %e, "Browser launch failed");
                        last_error = e.to_string();
                        continue;
                    }
                }
            }
            let Some(page) = session.as_deref() else {
                continue;
            };

            let timed = tokio::time::timeout(
                self.run.lesson_timeout(),
                self.process_lesson(page, lesson, previous),
            )
            .await;

            let error = match timed {
                Ok(Ok(extracted)) => return Ok(Ok(extracted)),
                Ok(Err(e)) => e,
                Err(_) => HarvestError::Timeout(format!("lesson '{}'", lesson.title)),
            };
            warn!(lesson = %lesson.title, error = %error, "Lesson attempt failed");
            last_error = error.to_string();

            if error.is_browser_failure() {
                if let Some(page) = session.take() {
                    close_page(page).await;
                }
            } else if let Err(e) = page.scroll_to_top().await {
                debug!(error = %e, "Scroll reset failed");
            }
        }
        Ok(Err(last_error))
    }

    async fn process_lesson(
        &self,
        page: &dyn PageDriver,
        lesson: &Lesson,
        previous: Option<&str>,
    ) -> Result<Extracted> {
        page.navigate(&lesson.url).await?;
        let content = extract_content(page).await?;

        let title = if !lesson.title.is_empty() {
            lesson.title.clone()
        } else if !content.title.is_empty() {
            content.title.clone()
        } else {
            lesson.id.clone()
        };

        let mut cx = LessonContext::begin(title.as_str(), lesson.url.as_str(), lesson.id.as_str());
        let page_title = page.page_title().await?;
        let text = page.visible_text().await?;
        let signature = cx.record_signature(&page_title, &text, previous).to_string();

        let chain = self.chain.run(page, &mut cx).await;
        Ok(Extracted {
            lesson: Lesson {
                title,
                ..lesson.clone()
            },
            content,
            chain,
            signature,
        })
    }

    async fn save(
        &self,
        writer: &LessonWriter,
        extracted: Extracted,
        summary: &mut RunSummary,
    ) -> LessonOutcome {
        let Extracted {
            lesson,
            content,
            chain,
            ..
        } = extracted;
        summary.attempts.extend(chain.attempts);

        if self.run.skip_existing && writer.already_extracted(&lesson) {
            return LessonOutcome::Skipped;
        }

        let images = if self.run.download_images {
            writer.download_images(&lesson, &content.images).await
        } else {
            Vec::new()
        };

        match writer.write_lesson(&lesson, chain.video.as_ref(), &content, &images) {
            Ok(_) => match chain.video {
                Some(video) => LessonOutcome::Saved { video },
                None => {
                    info!(lesson = %lesson.title, "No video found");
                    LessonOutcome::NoVideo
                }
            },
            Err(e) => LessonOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

async fn close_page(page: Box<dyn PageDriver>) {
    if let Err(e) = page.close().await {
        debug!(error = %e, "Closing browser failed");
    }
}

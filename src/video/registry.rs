use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{CanonicalVideoRef, Platform};

/// First registration of a video in this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub video_url: String,
    pub lesson_title: String,
    pub extraction_method: String,
    pub platform: Platform,
    pub order: usize,
    pub timestamp: DateTime<Utc>,
}

/// A rejected attempt to attribute an already registered video again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateAttempt {
    pub identity_key: String,
    pub lesson_title: String,
    pub extraction_method: String,
    pub first_lesson: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub videos_processed: usize,
    pub unique_videos_found: usize,
    pub duplicates_blocked: usize,
    pub lessons_processed: usize,
    pub extraction_methods_used: BTreeMap<String, usize>,
    pub platforms_detected: BTreeMap<String, usize>,
}

/// Snapshot written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_stats: SessionStats,
    pub video_tracking: BTreeMap<String, Registration>,
    pub seen_video_ids: Vec<String>,
    pub duplicate_attempts: Vec<DuplicateAttempt>,
    pub report_generated: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegistryState {
    seen: BTreeSet<String>,
    registrations: BTreeMap<String, Registration>,
    duplicates: Vec<DuplicateAttempt>,
    stats: SessionStats,
}

/// Session-wide record of every accepted video.
///
/// Once an identity key is registered it cannot be registered again until
/// [`SessionRegistry::reset`]. Check and insert happen under one lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `reference` for `lesson_title`. Returns false when the video
    /// was already claimed earlier in the session.
    pub fn register_if_new(
        &self,
        reference: &CanonicalVideoRef,
        lesson_title: &str,
        strategy: &str,
    ) -> bool {
        let mut state = self.lock();
        state.stats.videos_processed += 1;

        let key = reference.identity_key.clone();
        if !state.seen.insert(key.clone()) {
            state.stats.duplicates_blocked += 1;
            let first_lesson = match state.registrations.get(&key) {
                Some(prior) => {
                    warn!(
                        video = %key,
                        lesson = lesson_title,
                        first_lesson = %prior.lesson_title,
                        first_strategy = %prior.extraction_method,
                        first_seen = %prior.timestamp,
                        "Duplicate video blocked"
                    );
                    prior.lesson_title.clone()
                }
                None => String::new(),
            };
            state.duplicates.push(DuplicateAttempt {
                identity_key: key,
                lesson_title: lesson_title.to_string(),
                extraction_method: strategy.to_string(),
                first_lesson,
                timestamp: Utc::now(),
            });
            return false;
        }

        state.stats.unique_videos_found += 1;
        let order = state.stats.unique_videos_found;
        *state
            .stats
            .extraction_methods_used
            .entry(strategy.to_string())
            .or_default() += 1;
        *state
            .stats
            .platforms_detected
            .entry(reference.platform.display_name().to_string())
            .or_default() += 1;
        state.registrations.insert(
            key,
            Registration {
                video_url: reference.canonical_url.clone(),
                lesson_title: lesson_title.to_string(),
                extraction_method: strategy.to_string(),
                platform: reference.platform,
                order,
                timestamp: Utc::now(),
            },
        );
        true
    }

    pub fn is_registered(&self, identity_key: &str) -> bool {
        self.lock().seen.contains(identity_key)
    }

    pub fn record_lesson_processed(&self) {
        self.lock().stats.lessons_processed += 1;
    }

    /// Forget everything. Call once at the start of a run.
    pub fn reset(&self) {
        *self.lock() = RegistryState::default();
        info!("Session registry reset");
    }

    pub fn stats(&self) -> SessionStats {
        self.lock().stats.clone()
    }

    /// Registrations in acceptance order.
    pub fn registrations(&self) -> Vec<(String, Registration)> {
        let state = self.lock();
        let mut entries: Vec<_> = state
            .registrations
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        entries.sort_by_key(|(_, r)| r.order);
        entries
    }

    pub fn duplicate_attempts(&self) -> Vec<DuplicateAttempt> {
        self.lock().duplicates.clone()
    }

    pub fn report(&self) -> SessionReport {
        let state = self.lock();
        SessionReport {
            session_stats: state.stats.clone(),
            video_tracking: state.registrations.clone(),
            seen_video_ids: state.seen.iter().cloned().collect(),
            duplicate_attempts: state.duplicates.clone(),
            report_generated: Utc::now(),
        }
    }
}

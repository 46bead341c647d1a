//! Video URL resolution and deduplication.
//!
//! ```text
//! raw URL → classify → canonicalize → ValidityGate → RelevanceValidator → SessionRegistry
//!                                     └──────────── FinalCheckpoint ────────────┘
//! ```

pub mod canonical;
pub mod checkpoint;
pub mod classify;
pub mod gate;
pub mod registry;
pub mod relevance;

pub use canonical::{canonicalize, canonicalize_url, resolve_oembed};
pub use checkpoint::FinalCheckpoint;
pub use classify::{classify, is_image_asset, is_media_file};
pub use gate::{Blacklist, ValidityGate, DEFAULT_BLACKLIST};
pub use registry::{SessionRegistry, SessionReport, SessionStats};
pub use relevance::{LessonContext, RelevanceValidator, ValidationResult};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a candidate was refused. Refusal is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Empty,
    TooShort,
    Image,
    Unrecognized,
    Blacklisted,
    NotRelevant,
    SessionDuplicate,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::Empty => "empty URL",
            Rejection::TooShort => "URL too short",
            Rejection::Image => "image or thumbnail asset",
            Rejection::Unrecognized => "not a recognized video URL",
            Rejection::Blacklisted => "blacklisted video",
            Rejection::NotRelevant => "does not belong to this lesson",
            Rejection::SessionDuplicate => "already used by another lesson",
        };
        f.write_str(reason)
    }
}

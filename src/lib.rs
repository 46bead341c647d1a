//! # classroom-harvest
//!
//! Saves online classroom lessons (text, links, images and the lesson
//! video URL) as Markdown, one folder per community.
//!
//! ## Architecture
//!
//! ```text
//! Lesson discovery → Browser → StrategyChain → FinalCheckpoint → Writer
//!                                                   │
//!                         ValidityGate · RelevanceValidator · SessionRegistry
//! ```
//!
//! The hard part is the video: every lesson page carries several
//! conflicting hints (page state, iframes, network traffic, modal players,
//! leftovers from the previous lesson). Five strategies propose candidates
//! and a single checkpoint decides, so no video is saved for the wrong
//! lesson or for two lessons in one run.
//!
//! ## Quick Start
//!
//! ```bash
//! export HARVEST_EMAIL=me@example.com HARVEST_PASSWORD=...
//!
//! # Whole classroom
//! classroom-harvest harvest https://www.skool.com/my-group/classroom/1a2b3c4d
//!
//! # Videos saved for more than one lesson
//! classroom-harvest duplicates --promote
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`browser`]: Page driver traits and the Chrome implementation
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Lessons, platforms and video references
//! - [`extract`]: Video extraction strategies and their chain
//! - [`harvester`]: Run orchestration and reports
//! - [`lesson`]: Discovery, page content, Markdown output and login
//! - [`video`]: Canonicalization, validation and session deduplication

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together config,
/// blacklist, session registry and browser factory.
pub mod app;

/// Browser capability layer.
///
/// - [`PageDriver`](browser::PageDriver): one tab
/// - [`BrowserFactory`](browser::BrowserFactory): fresh browsers on demand
/// - [`ChromeFactory`](browser::ChromeFactory): chromiumoxide-based implementation
pub mod browser;

/// Command-line interface using clap.
///
/// - `harvest <url>` - Save a classroom or a single lesson
/// - `duplicates [dir] [--promote]` - Report videos shared between lessons
/// - `blacklist` - List blacklisted video IDs
/// - `config` - Show effective configuration
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/classroom-harvest/config.toml`.
pub mod config;

/// Core domain models.
pub mod domain;

/// Ordered video extraction strategies.
pub mod extract;

/// Classroom run loop, browser isolation and reports.
pub mod harvester;

/// Everything about a lesson page other than its video.
pub mod lesson;

/// Video URL canonicalization, validation and session uniqueness.
pub mod video;

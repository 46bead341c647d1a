use std::path::PathBuf;

use crate::app::{AppContext, HarvestError, Result};
use crate::harvester::{promote_duplicates, scan_duplicates, LessonOutcome};
use crate::lesson::Credentials;

pub async fn harvest(
    ctx: &AppContext,
    url: &str,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let credentials = match (email, password) {
        (Some(email), Some(password)) => Some(Credentials::new(email, password)),
        (None, None) => {
            println!("No credentials given, continuing without login");
            None
        }
        _ => {
            return Err(HarvestError::Authentication(
                "both --email and --password are required".into(),
            ))
        }
    };

    println!("Harvesting {}", url);
    let summary = ctx.harvester(credentials).run(url).await?;

    for lesson in &summary.lessons {
        match &lesson.outcome {
            LessonOutcome::Saved { video } => {
                println!("  ✓ {} [{}] {}", lesson.title, video.platform(), video.url())
            }
            LessonOutcome::NoVideo => println!("  - {} (no video)", lesson.title),
            LessonOutcome::Skipped => println!("  = {} (already extracted)", lesson.title),
            LessonOutcome::Failed { reason } => eprintln!("  ✗ {}: {}", lesson.title, reason),
        }
    }

    let stats = ctx.registry.stats();
    println!(
        "Done: {} saved, {} without video, {} skipped, {} failed",
        summary.saved(),
        summary.no_video(),
        summary.skipped(),
        summary.failed()
    );
    println!(
        "Videos: {} unique, {} duplicates blocked",
        stats.unique_videos_found, stats.duplicates_blocked
    );
    if let Some(dir) = summary.output_dir {
        println!("Output: {}", dir.display());
    }
    Ok(())
}

pub fn duplicates(ctx: &AppContext, dir: Option<PathBuf>, promote: bool) -> Result<()> {
    let dir = dir.unwrap_or_else(|| ctx.config.output.root.clone());
    let found = scan_duplicates(&dir)?;

    if found.is_empty() {
        println!("No duplicate videos under {}", dir.display());
        return Ok(());
    }

    for dup in &found {
        println!("{} ({} lessons)", dup.url, dup.lessons.len());
        for lesson in &dup.lessons {
            println!("  - {}", lesson);
        }
    }

    if promote {
        let path = ctx.blacklist_path()?;
        let added = promote_duplicates(&found, &path)?;
        println!("Added {} IDs to {}", added, path.display());
    } else {
        println!("Run with --promote to blacklist these videos");
    }
    Ok(())
}

pub fn list_blacklist(ctx: &AppContext) -> Result<()> {
    let blacklist = ctx.gate.blacklist();
    if blacklist.is_empty() {
        println!("Blacklist is empty");
        return Ok(());
    }
    for id in blacklist.iter() {
        println!("{}", id);
    }
    println!("{} entries ({})", blacklist.len(), ctx.blacklist_path()?.display());
    Ok(())
}

pub fn show_config(ctx: &AppContext) -> Result<()> {
    println!("# {}", ctx.config_path.display());
    let rendered =
        toml::to_string_pretty(&ctx.config).map_err(|e| HarvestError::Config(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

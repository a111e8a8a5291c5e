//! `forge status` — report which content files need rebuilding.
//!
//! Loads the project's cache for a throwaway session, discovers every file
//! under the content root, and asks the cache which of them are stale. The
//! cache file is never written by this command.

use forge_cache::{LoadStatus, RecoveryReason};
use forge_common::BuildId;
use serde_json::json;

use crate::pipeline::{content_items, load_project};
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `forge status` command.
///
/// Returns exit code 1 under `--check` when anything is stale, 0 otherwise.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let items = content_items(&project)?;
    let (cache, load_status) = project.open_cache(BuildId::new());

    let stale = cache.stale_files(&items);

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                eprintln!(
                    "   Checking {} ({})",
                    project.config.project.name,
                    describe(load_status)
                );
            }
            for item in &stale {
                println!("{}", item.relative);
            }
            if !global.quiet {
                eprintln!(
                    "   Result: {} of {} file(s) need rebuilding",
                    stale.len(),
                    items.len()
                );
            }
        }
        ReportFormat::Json => {
            let report = json!({
                "project": project.config.project.name,
                "cache": describe(load_status),
                "total": items.len(),
                "stale": stale.iter().map(|item| item.relative.as_str()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if args.check && !stale.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Short label for how the cache was loaded.
pub fn describe(status: LoadStatus) -> &'static str {
    match status {
        LoadStatus::ColdStart => "cold start",
        LoadStatus::Loaded => "cached",
        LoadStatus::Recovered(RecoveryReason::Incompatible) => "discarded incompatible cache",
        LoadStatus::Recovered(RecoveryReason::Corrupt) => "discarded corrupt cache",
    }
}

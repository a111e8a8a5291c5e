//! `forge show` — list every tracked cache entry.

use std::time::{SystemTime, UNIX_EPOCH};

use forge_cache::BuildFile;
use forge_common::BuildId;
use serde_json::json;

use crate::pipeline::load_project;
use crate::status::describe;
use crate::{GlobalArgs, ReportFormat, ShowArgs};

/// Runs the `forge show` command.
pub fn run(args: &ShowArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let (cache, load_status) = project.open_cache(BuildId::new());

    let mut files: Vec<&BuildFile> = cache.files().map(|(_, file)| file).collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                eprintln!(
                    "   {} ({}, {} file(s))",
                    cache.cache_file_path().display(),
                    describe(load_status),
                    files.len()
                );
            }
            for file in &files {
                println!(
                    "{}  {}{}",
                    file.build_id,
                    file.path().display(),
                    if file.creates_user_content { "  [user content]" } else { "" }
                );
                for dep in &file.dependencies {
                    println!("    <- {}", dep.display());
                }
            }
            for (key, id) in cache.ledger().iter() {
                println!("generated  {key}  {id}");
            }
        }
        ReportFormat::Json => {
            let entries: Vec<_> = files.iter().map(|file| file_json(file)).collect();
            let ledger: serde_json::Map<String, serde_json::Value> = cache
                .ledger()
                .iter()
                .map(|(key, id)| (key.to_string(), json!(id.to_string())))
                .collect();
            let report = json!({
                "cache": cache.cache_file_path().display().to_string(),
                "status": describe(load_status),
                "files": entries,
                "generated": ledger,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(0)
}

fn file_json(file: &BuildFile) -> serde_json::Value {
    json!({
        "path": file.path().display().to_string(),
        "build_id": file.build_id.to_string(),
        "dependencies": file
            .dependencies
            .iter()
            .map(|dep| dep.display().to_string())
            .collect::<Vec<_>>(),
        "source_modified": file.source_modified_time.and_then(unix_secs),
        "output_modified": file.output_modified_time.and_then(unix_secs),
        "creates_user_content": file.creates_user_content,
    })
}

fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn global_for(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn show_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("forge.toml"), "[project]\nname = \"demo\"\n").unwrap();
        for format in [ReportFormat::Text, ReportFormat::Json] {
            assert_eq!(run(&ShowArgs { format }, &global_for(dir.path())).unwrap(), 0);
        }
    }

    #[test]
    fn file_json_lists_dependencies() {
        let id = BuildId::new();
        let file = BuildFile::new(id, "/proj/Content/material.json")
            .with_dependencies(vec![PathBuf::from("/proj/Content/shader.glsl")])
            .with_user_content(true);
        let value = file_json(&file);
        assert_eq!(value["build_id"], id.to_string());
        assert_eq!(value["dependencies"][0], "/proj/Content/shader.glsl");
        assert_eq!(value["creates_user_content"], true);
        assert!(value["output_modified"].is_null());
    }

    #[test]
    fn unix_secs_before_epoch_is_none() {
        assert_eq!(unix_secs(UNIX_EPOCH + std::time::Duration::from_secs(5)), Some(5));
        assert_eq!(unix_secs(UNIX_EPOCH - std::time::Duration::from_secs(5)), None);
    }
}

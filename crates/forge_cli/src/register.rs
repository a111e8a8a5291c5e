//! `forge register` — record a successful build of one content file.
//!
//! Build drivers call this after an importer has processed `input` and
//! written its output. The dependencies the importer reported are tracked
//! so later edits to them invalidate `input`.
//!
//! Unless told otherwise, a call joins the build session recorded by the
//! previous save, so assets of one build that share dependencies agree on
//! the build id those dependencies carry.

use forge_cache::content_key;
use forge_common::BuildId;
use tracing::{info, warn};

use crate::pipeline::load_project;
use crate::{GlobalArgs, RegisterArgs};

/// Runs the `forge register` command.
///
/// Returns exit code 1 if the cache could not be saved.
pub fn run(args: &RegisterArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let build_id = match args.build_id {
        Some(id) => id,
        None if args.new_session => BuildId::new(),
        None => project.current_session().unwrap_or_else(BuildId::new),
    };

    let input = project.resolve(&args.input);
    if !input.is_file() {
        return Err(format!("content file {} not found", input.display()).into());
    }
    let import_dir = match args.import_dir {
        Some(ref dir) => project.resolve(dir),
        None => input
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(|| project.content_dir()),
    };

    let (mut cache, _) = project.open_cache(build_id);
    cache.register_build(
        build_id,
        &input,
        &import_dir,
        &args.deps,
        args.creates_user_content,
    );

    if args.generated {
        let Some(key) = content_key(&project.content_dir(), &input) else {
            return Err(format!(
                "{} is outside the content directory, cannot record generated code",
                input.display()
            )
            .into());
        };
        cache.ledger_mut().record(key, build_id);
    }

    if !cache.save() {
        warn!(path = %cache.cache_file_path().display(), "build cache not saved");
        return Ok(1);
    }

    info!(
        input = %input.display(),
        %build_id,
        dependencies = args.deps.len(),
        "registered build"
    );
    if !global.quiet {
        eprintln!("   Registered {} ({build_id})", args.input.display());
    }
    Ok(0)
}

//! `forge clear` — forget all tracked build state.
//!
//! Empties the cache and saves it, so the next build treats every content
//! file as new. Build outputs and the generated-code ledger are kept; the
//! saved ledger starts a new build session.

use forge_common::BuildId;
use tracing::warn;

use crate::pipeline::load_project;
use crate::GlobalArgs;

/// Runs the `forge clear` command.
///
/// Returns exit code 1 if the emptied cache could not be saved.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let (mut cache, _) = project.open_cache(BuildId::new());

    let forgotten = cache.len();
    cache.clean();
    cache.clear();

    if !cache.save() {
        warn!(path = %cache.cache_file_path().display(), "build cache not saved");
        return Ok(1);
    }
    if !global.quiet {
        eprintln!("   Cleared {forgotten} tracked file(s)");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use forge_cache::{BuildCache, CreatedCodeLedger, FsContentProbe};

    #[test]
    fn clear_empties_saved_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("forge.toml"), "[project]\nname = \"demo\"\n").unwrap();
        let cache_file = dir.path().join(".forge").join("forge.cache");

        let id = BuildId::new();
        let probe = Arc::new(FsContentProbe::new(
            dir.path().join("Content"),
            dir.path().join("bin").join("Content"),
            "ego",
        ));
        let mut cache = BuildCache::new(&cache_file, CreatedCodeLedger::new(id), probe.clone());
        cache.register_build(
            id,
            &dir.path().join("Content").join("a.png"),
            &dir.path().join("Content"),
            ["b.png"],
            false,
        );
        cache.ledger_mut().record("a", id);
        assert!(cache.save());

        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(dir.path().to_path_buf()),
        };
        assert_eq!(run(&global).unwrap(), 0);

        let reloaded = BuildCache::load(Path::new(&cache_file), BuildId::new(), probe);
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.ledger().type_container_build_id("a"), Some(id));
        let session = reloaded.ledger().previous_session();
        assert!(session.is_some());
        assert_ne!(session, Some(id));
    }
}

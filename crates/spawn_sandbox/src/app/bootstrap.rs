use spawn_engine::{
    resolve_app_paths, ArgumentMap, DirectoryDefinitionStore, EntitySpawner, SpawnerConfig,
    StartupError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::aspects::builtin_registry;
use crate::cli::{parse_argument_pair, Sandbox};

const SPAWN_ARGS_ENV_VAR: &str = "SPAWN_ARGS";

pub(crate) fn build_sandbox() -> Result<Sandbox, StartupError> {
    let paths = resolve_app_paths()?;
    let config = SpawnerConfig::from_app_paths(&paths);
    info!(root = %paths.root.display(), "=== Spawn Sandbox Startup ===");

    let store = DirectoryDefinitionStore::with_extension(
        config.definitions_dir.clone(),
        &config.extension,
    );
    Ok(Sandbox {
        spawner: EntitySpawner::from_config(&config, builtin_registry()),
        store,
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn parse_spawn_args_from_env() -> ArgumentMap {
    std::env::var(SPAWN_ARGS_ENV_VAR)
        .ok()
        .map(|raw| parse_spawn_args(&raw))
        .unwrap_or_default()
}

/// `name=value` pairs separated by commas; malformed entries are skipped.
fn parse_spawn_args(raw: &str) -> ArgumentMap {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let pair = parse_argument_pair(entry);
            if pair.is_none() {
                warn!(entry = %entry, "spawn_args_entry_ignored");
            }
            pair
        })
        .collect()
}

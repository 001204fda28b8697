use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod content;
pub mod spawner;
pub mod world;

pub use content::{
    lookup_candidates, merge_entity_definitions, merge_limb_definitions,
    parse_entity_definition, ArgumentMap, ComponentDefinition, DefinitionListing,
    DefinitionParseError, DefinitionResolver, DefinitionStore, DefinitionStoreError,
    DirectoryDefinitionStore, EntityDefinition, InMemoryDefinitionStore, LimbDefinition,
    PropertyMap, DEFAULT_BASE_SUBFOLDER, DEFAULT_DEFINITION_EXTENSION,
};
pub use spawner::{EntitySpawner, SharedSpawner, SpawnError, SpawnerConfig};
pub use world::{
    substitute_arguments, Assembler, AssetLookup, AttachedCapability, Capability, CapabilityRef,
    ComponentRegistry, ComponentSchema, ComponentSchemaBuilder, DirectoryAssetLookup, EntityId,
    EntityIdAllocator, LimbIndex, LimbNode, PropertyApplyError, PropertyDescriptor, PropertyKind,
    PropertyValue, SpawnDiagnostic, SpawnReport, SpawnedEntity, SpriteAsset, StaticAssetLookup,
    Vec3,
};

pub const ROOT_ENV_VAR: &str = "SPAWN_ENGINE_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub definitions_dir: PathBuf,
    pub sprites_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let assets_dir = root.join("assets");
        Self {
            definitions_dir: assets_dir.join("entities"),
            sprites_dir: assets_dir.join("sprites"),
            assets_dir,
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "SPAWN_ENGINE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/spawn-engine\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
    #[error("definitions directory does not exist: {0}")]
    MissingDefinitionsDir(PathBuf),
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let paths = AppPaths::from_root(resolve_root()?);
    if !paths.definitions_dir.is_dir() {
        return Err(StartupError::MissingDefinitionsDir(
            paths.definitions_dir.clone(),
        ));
    }
    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

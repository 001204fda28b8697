use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{info, warn};

use crate::content::{
    parse_entity_definition, ArgumentMap, DefinitionParseError, DefinitionResolver,
    DefinitionStore, DirectoryDefinitionStore, EntityDefinition, DEFAULT_BASE_SUBFOLDER,
    DEFAULT_DEFINITION_EXTENSION,
};
use crate::world::{
    Assembler, AssetLookup, ComponentRegistry, DirectoryAssetLookup, EntityIdAllocator,
    SpawnReport, Vec3,
};
use crate::AppPaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnerConfig {
    pub definitions_dir: PathBuf,
    pub base_subfolder: String,
    pub extension: String,
    pub sprites_dir: PathBuf,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            definitions_dir: PathBuf::from("assets").join("entities"),
            base_subfolder: DEFAULT_BASE_SUBFOLDER.to_string(),
            extension: DEFAULT_DEFINITION_EXTENSION.to_string(),
            sprites_dir: PathBuf::from("assets").join("sprites"),
        }
    }
}

impl SpawnerConfig {
    pub fn from_app_paths(paths: &AppPaths) -> Self {
        Self {
            definitions_dir: paths.definitions_dir.clone(),
            sprites_dir: paths.sprites_dir.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Parse(#[from] DefinitionParseError),
    #[error("entity definition '{key}' not found")]
    DefinitionNotFound { key: String },
}

pub struct EntitySpawner {
    resolver: DefinitionResolver,
    registry: ComponentRegistry,
    assets: Box<dyn AssetLookup>,
    ids: EntityIdAllocator,
}

impl EntitySpawner {
    pub fn new(
        store: impl DefinitionStore + 'static,
        registry: ComponentRegistry,
        assets: impl AssetLookup + 'static,
    ) -> Self {
        Self::with_resolver(DefinitionResolver::new(store), registry, assets)
    }

    pub fn with_resolver(
        resolver: DefinitionResolver,
        registry: ComponentRegistry,
        assets: impl AssetLookup + 'static,
    ) -> Self {
        Self {
            resolver,
            registry,
            assets: Box::new(assets),
            ids: EntityIdAllocator::default(),
        }
    }

    pub fn from_config(config: &SpawnerConfig, registry: ComponentRegistry) -> Self {
        let store =
            DirectoryDefinitionStore::with_extension(config.definitions_dir.clone(), &config.extension);
        let resolver = DefinitionResolver::new(store)
            .with_lookup(&config.base_subfolder, &config.extension);
        info!(
            definitions_dir = %config.definitions_dir.display(),
            sprites_dir = %config.sprites_dir.display(),
            component_types = registry.len(),
            "entity_spawner_ready"
        );
        Self::with_resolver(
            resolver,
            registry,
            DirectoryAssetLookup::new(config.sprites_dir.clone()),
        )
    }

    /// Only unparseable text is an error; later problems land in the report.
    pub fn spawn_entity(
        &mut self,
        json: &str,
        position: Vec3,
        args: Option<&ArgumentMap>,
    ) -> Result<SpawnReport, SpawnError> {
        let overlay = parse_entity_definition(json).map_err(|error| {
            warn!(error = %error, "entity_spawn_parse_failed");
            error
        })?;
        Ok(self.spawn_definition(&overlay, position, args))
    }

    pub fn spawn_definition(
        &mut self,
        overlay: &EntityDefinition,
        position: Vec3,
        args: Option<&ArgumentMap>,
    ) -> SpawnReport {
        let merged = self.resolver.resolve(overlay);
        let id = self.ids.allocate();
        let report =
            Assembler::new(&self.registry, self.assets.as_mut()).assemble(id, &merged, position, args);
        info!(
            entity = %report.entity.name,
            id = id.0,
            diagnostics = report.diagnostics.len(),
            "entity_spawned"
        );
        report
    }

    pub fn spawn_by_key(
        &mut self,
        key: &str,
        position: Vec3,
        args: Option<&ArgumentMap>,
    ) -> Result<SpawnReport, SpawnError> {
        let Some((_, text)) = self.resolver.find_text(key) else {
            warn!(key = %key, "entity_definition_not_found");
            return Err(SpawnError::DefinitionNotFound {
                key: key.to_string(),
            });
        };
        self.spawn_entity(&text, position, args)
    }

    pub fn resolver(&self) -> &DefinitionResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut DefinitionResolver {
        &mut self.resolver
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }
}

static SPAWNER_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_spawner_lock_poison_once(operation: &'static str) {
    if SPAWNER_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "spawner lock poisoned; recovered inner value");
    }
}

/// Cloneable handle for spawning from several threads. Calls are serialized,
/// so a merge for a given cache key is only ever computed once.
#[derive(Clone)]
pub struct SharedSpawner {
    inner: Arc<Mutex<EntitySpawner>>,
}

impl SharedSpawner {
    pub fn new(spawner: EntitySpawner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(spawner)),
        }
    }

    pub fn spawn_entity(
        &self,
        json: &str,
        position: Vec3,
        args: Option<&ArgumentMap>,
    ) -> Result<SpawnReport, SpawnError> {
        self.lock("spawn_entity").spawn_entity(json, position, args)
    }

    pub fn spawn_by_key(
        &self,
        key: &str,
        position: Vec3,
        args: Option<&ArgumentMap>,
    ) -> Result<SpawnReport, SpawnError> {
        self.lock("spawn_by_key").spawn_by_key(key, position, args)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut EntitySpawner) -> R) -> R {
        f(&mut self.lock("with"))
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, EntitySpawner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_spawner_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}

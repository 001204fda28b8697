use tracing::{debug, warn};

use super::cache::{normalize_key, DefinitionCache};
use super::merge::merge_entity_definitions;
use super::store::{
    lookup_candidates, DefinitionStore, DEFAULT_BASE_SUBFOLDER, DEFAULT_DEFINITION_EXTENSION,
};
use super::types::{non_empty, parse_entity_definition, EntityDefinition};

/// Raw bases are cached by lookup key and merge results by
/// `<extends>::<override identity>`. Failed lookups stay cached until `clear_caches`.
pub struct DefinitionResolver {
    store: Box<dyn DefinitionStore>,
    base_subfolder: String,
    extension: String,
    raw_cache: DefinitionCache<Option<EntityDefinition>>,
    merged_cache: DefinitionCache<EntityDefinition>,
    next_anonymous_token: u64,
    resolving: Vec<String>,
}

impl DefinitionResolver {
    pub fn new(store: impl DefinitionStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            base_subfolder: DEFAULT_BASE_SUBFOLDER.to_string(),
            extension: DEFAULT_DEFINITION_EXTENSION.to_string(),
            raw_cache: DefinitionCache::default(),
            merged_cache: DefinitionCache::default(),
            next_anonymous_token: 0,
            resolving: Vec::new(),
        }
    }

    pub fn with_lookup(mut self, base_subfolder: &str, extension: &str) -> Self {
        self.base_subfolder = base_subfolder.trim_matches('/').to_string();
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn resolve(&mut self, overlay: &EntityDefinition) -> EntityDefinition {
        let Some(extends) = overlay.extends_key() else {
            let mut copy = overlay.clone();
            copy.extends = None;
            return copy;
        };

        let chain_key = normalize_key(extends);
        let cache_key = format!("{chain_key}::{}", self.cache_identity(overlay));
        if let Some(cached) = self.merged_cache.get(&cache_key) {
            debug!(cache_key = %cache_key, "definition_merge_cache_hit");
            return cached;
        }

        if self.resolving.contains(&chain_key) {
            warn!(
                extends = %extends,
                chain = %self.resolving.join(" -> "),
                "definition_inheritance_cycle"
            );
            return self.store_fallback(&cache_key, overlay);
        }

        let Some(base) = self.load_definition(extends) else {
            warn!(
                extends = %extends,
                base_subfolder = %self.base_subfolder,
                "definition_base_not_found_using_override"
            );
            return self.store_fallback(&cache_key, overlay);
        };

        self.resolving.push(chain_key);
        let base = if base.extends_key().is_some() {
            self.resolve(&base)
        } else {
            base
        };
        self.resolving.pop();

        let merged = merge_entity_definitions(Some(&base), Some(overlay)).unwrap_or_default();
        self.merged_cache.store(&cache_key, &merged);
        debug!(cache_key = %cache_key, "definition_merged");
        merged
    }

    pub fn load_definition(&mut self, key: &str) -> Option<EntityDefinition> {
        if key.is_empty() {
            return None;
        }
        if let Some(cached) = self.raw_cache.get(key) {
            return cached;
        }

        let parsed = self.find_text(key).and_then(|(found_at, text)| {
            match parse_entity_definition(&text) {
                Ok(definition) => Some(definition),
                Err(error) => {
                    warn!(key = %found_at, error = %error, "definition_parse_failed");
                    None
                }
            }
        });
        if parsed.is_none() {
            warn!(key = %key, "definition_load_failed");
        }
        self.raw_cache.store(key, &parsed);
        parsed
    }

    pub fn find_text(&self, key: &str) -> Option<(String, String)> {
        for candidate in lookup_candidates(key, &self.base_subfolder, &self.extension) {
            match self.store.load(&candidate) {
                Ok(Some(text)) => return Some((candidate, text)),
                Ok(None) => {}
                Err(error) => {
                    warn!(key = %candidate, error = %error, "definition_store_read_failed");
                }
            }
        }
        None
    }

    pub fn clear_caches(&mut self) {
        self.raw_cache.clear();
        self.merged_cache.clear();
    }

    pub fn raw_cache_len(&self) -> usize {
        self.raw_cache.len()
    }

    pub fn merged_cache_len(&self) -> usize {
        self.merged_cache.len()
    }

    fn cache_identity(&mut self, overlay: &EntityDefinition) -> String {
        if let Some(identity) =
            non_empty(overlay.id.as_deref()).or_else(|| non_empty(overlay.name.as_deref()))
        {
            return normalize_key(identity);
        }
        // Overrides without identity never share a cache slot.
        let token = self.next_anonymous_token;
        self.next_anonymous_token = self.next_anonymous_token.saturating_add(1);
        format!("<anonymous-{token}>")
    }

    fn store_fallback(&mut self, cache_key: &str, overlay: &EntityDefinition) -> EntityDefinition {
        let mut fallback = overlay.clone();
        fallback.extends = None;
        self.merged_cache.store(cache_key, &fallback);
        fallback
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::content::store::{DefinitionStoreError, InMemoryDefinitionStore};

    struct CountingStore {
        inner: InMemoryDefinitionStore,
        loads: Arc<AtomicUsize>,
    }

    impl DefinitionStore for CountingStore {
        fn load(&self, key: &str) -> Result<Option<String>, DefinitionStoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(key)
        }
    }

    fn counting(inner: InMemoryDefinitionStore) -> (DefinitionResolver, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let resolver = DefinitionResolver::new(CountingStore {
            inner,
            loads: Arc::clone(&loads),
        });
        (resolver, loads)
    }

    fn parse(raw: &str) -> EntityDefinition {
        parse_entity_definition(raw).expect("parse")
    }

    const HUMANOID: &str = r#"{
        "id": "humanoid",
        "name": "Humanoid",
        "rootPath": "Sprites/Humanoid/",
        "arguments": { "gender": "m" },
        "limb": {
            "name": "Body",
            "components": [ { "type": "Health", "properties": { "maxHealth": "100" } } ],
            "children": [ { "name": "Leg" }, { "name": "Arm" } ]
        }
    }"#;

    const HUMAN: &str = r#"{
        "id": "human",
        "name": "Human",
        "extends": "humanoid",
        "limb": {
            "name": "Body",
            "components": [ { "type": "Health", "properties": { "regen": "1" } } ],
            "children": [ { "name": "Tail" } ]
        }
    }"#;

    #[test]
    fn no_extends_returns_independent_copy() {
        let (mut resolver, loads) = counting(InMemoryDefinitionStore::new());
        let overlay = parse(r#"{"name":"Solo","limb":{"name":"Root"}}"#);
        let mut first = resolver.resolve(&overlay);
        assert_eq!(first, overlay);
        first.name = Some("Changed".to_string());
        assert_eq!(resolver.resolve(&overlay), overlay);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.merged_cache_len(), 0);
    }

    #[test]
    fn empty_extends_is_cleared_without_lookup() {
        let (mut resolver, loads) = counting(InMemoryDefinitionStore::new());
        let overlay = parse(r#"{"name":"Solo","extends":""}"#);
        assert_eq!(overlay.extends.as_deref(), Some(""));
        let resolved = resolver.resolve(&overlay);
        assert_eq!(resolved.extends, None);
        assert_eq!(resolved.name.as_deref(), Some("Solo"));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.merged_cache_len(), 0);
    }

    #[test]
    fn resolves_base_from_base_subfolder() {
        let store = InMemoryDefinitionStore::new().with_entry("base/humanoid", HUMANOID);
        let mut resolver = DefinitionResolver::new(store);
        let merged = resolver.resolve(&parse(HUMAN));
        assert_eq!(merged.extends, None);
        assert_eq!(merged.name.as_deref(), Some("Human"));
        assert_eq!(merged.root_path.as_deref(), Some("Sprites/Humanoid/"));
        assert_eq!(merged.arguments.get("gender").map(String::as_str), Some("m"));
        let body = merged.limb.expect("limb");
        assert_eq!(body.components.len(), 1);
        assert_eq!(body.components[0].properties.len(), 2);
        let names = body
            .children
            .iter()
            .map(|child| child.display_name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Leg", "Arm", "Tail"]);
    }

    #[test]
    fn strips_recognized_extension_before_giving_up() {
        let store = InMemoryDefinitionStore::new().with_entry("humanoid", HUMANOID);
        let mut resolver = DefinitionResolver::new(store);
        let merged = resolver.resolve(&parse(
            r#"{"id":"x","extends":"humanoid.json","limb":{"name":"Body"}}"#,
        ));
        assert_eq!(merged.name.as_deref(), Some("Humanoid"));
    }

    #[test]
    fn cache_hit_skips_base_lookup_and_returns_isolated_copies() {
        let (mut resolver, loads) =
            counting(InMemoryDefinitionStore::new().with_entry("humanoid", HUMANOID));
        let overlay = parse(HUMAN);

        let mut first = resolver.resolve(&overlay);
        let loads_after_first = loads.load(Ordering::SeqCst);
        assert!(loads_after_first > 0);

        let second = resolver.resolve(&overlay);
        assert_eq!(loads.load(Ordering::SeqCst), loads_after_first);
        assert_eq!(first, second);

        first.arguments.insert("gender".to_string(), "f".to_string());
        if let Some(limb) = first.limb.as_mut() {
            limb.children.clear();
        }
        let third = resolver.resolve(&overlay);
        assert_eq!(third, second);
        assert_eq!(resolver.merged_cache_len(), 1);
    }

    #[test]
    fn cache_key_is_case_insensitive() {
        let (mut resolver, loads) =
            counting(InMemoryDefinitionStore::new().with_entry("humanoid", HUMANOID));
        resolver.resolve(&parse(r#"{"id":"Human","extends":"HUMANOID"}"#));
        let after_first = loads.load(Ordering::SeqCst);
        resolver.resolve(&parse(r#"{"id":"human","extends":"humanoid"}"#));
        assert_eq!(loads.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn raw_definitions_are_loaded_once() {
        let (mut resolver, loads) =
            counting(InMemoryDefinitionStore::new().with_entry("humanoid", HUMANOID));
        resolver.resolve(&parse(r#"{"id":"a","extends":"humanoid"}"#));
        let after_first = loads.load(Ordering::SeqCst);
        resolver.resolve(&parse(r#"{"id":"b","extends":"humanoid"}"#));
        assert_eq!(loads.load(Ordering::SeqCst), after_first);
        assert_eq!(resolver.raw_cache_len(), 1);
        assert_eq!(resolver.merged_cache_len(), 2);
    }

    #[test]
    fn missing_base_falls_back_to_override_and_is_cached() {
        let (mut resolver, loads) = counting(InMemoryDefinitionStore::new());
        let overlay = parse(r#"{"id":"orphan","extends":"nowhere","limb":{"name":"Root"}}"#);
        let resolved = resolver.resolve(&overlay);
        let mut expected = overlay.clone();
        expected.extends = None;
        assert_eq!(resolved, expected);

        let after_first = loads.load(Ordering::SeqCst);
        assert_eq!(after_first, 2);
        assert_eq!(resolver.resolve(&overlay), expected);
        assert_eq!(loads.load(Ordering::SeqCst), after_first);

        resolver.clear_caches();
        resolver.resolve(&overlay);
        assert_eq!(loads.load(Ordering::SeqCst), after_first * 2);
    }

    #[test]
    fn unparseable_base_is_treated_as_missing() {
        let store = InMemoryDefinitionStore::new().with_entry("broken", "{ not json");
        let mut resolver = DefinitionResolver::new(store);
        let resolved = resolver.resolve(&parse(r#"{"id":"x","name":"X","extends":"broken"}"#));
        assert_eq!(resolved.name.as_deref(), Some("X"));
        assert_eq!(resolved.extends, None);
        assert_eq!(resolver.load_definition("broken"), None);
    }

    #[test]
    fn resolves_transitive_chain() {
        let store = InMemoryDefinitionStore::new()
            .with_entry(
                "base/creature",
                r#"{"id":"creature","rootPath":"Sprites/","arguments":{"size":"m"},
                    "limb":{"name":"Body","components":[{"type":"Health","properties":{"maxHealth":"10"}}]}}"#,
            )
            .with_entry("humanoid", r#"{"id":"humanoid","extends":"creature","arguments":{"gender":"m"}}"#);
        let mut resolver = DefinitionResolver::new(store);
        let merged = resolver.resolve(&parse(
            r#"{"id":"human","extends":"humanoid","arguments":{"gender":"f"}}"#,
        ));
        assert_eq!(merged.id.as_deref(), Some("human"));
        assert_eq!(merged.root_path.as_deref(), Some("Sprites/"));
        assert_eq!(merged.arguments.get("size").map(String::as_str), Some("m"));
        assert_eq!(merged.arguments.get("gender").map(String::as_str), Some("f"));
        assert_eq!(
            merged.limb.expect("limb").components[0].type_name(),
            "Health"
        );
        assert_eq!(resolver.merged_cache_len(), 2);
    }

    #[test]
    fn inheritance_cycle_terminates() {
        let store = InMemoryDefinitionStore::new()
            .with_entry("a", r#"{"id":"a","extends":"b","arguments":{"from_a":"1"}}"#)
            .with_entry("b", r#"{"id":"b","extends":"a","arguments":{"from_b":"1"}}"#);
        let mut resolver = DefinitionResolver::new(store);
        let merged = resolver.resolve(&parse(r#"{"id":"o","extends":"a"}"#));
        assert_eq!(merged.extends, None);
        assert!(merged.arguments.contains_key("from_a"));
        assert!(merged.arguments.contains_key("from_b"));
    }

    #[test]
    fn self_reference_terminates() {
        let store = InMemoryDefinitionStore::new()
            .with_entry("loop", r#"{"id":"loop","extends":"loop","name":"Loop"}"#);
        let mut resolver = DefinitionResolver::new(store);
        let merged = resolver.resolve(&parse(r#"{"id":"loop","extends":"loop"}"#));
        assert_eq!(merged.name.as_deref(), Some("Loop"));
        assert_eq!(merged.extends, None);
    }

    #[test]
    fn anonymous_overrides_never_share_cache_entries() {
        let store = InMemoryDefinitionStore::new().with_entry("humanoid", HUMANOID);
        let mut resolver = DefinitionResolver::new(store);
        let first = resolver.resolve(&parse(r#"{"extends":"humanoid","arguments":{"v":"1"}}"#));
        let second = resolver.resolve(&parse(r#"{"extends":"humanoid","arguments":{"v":"2"}}"#));
        assert_eq!(first.arguments.get("v").map(String::as_str), Some("1"));
        assert_eq!(second.arguments.get("v").map(String::as_str), Some("2"));
        assert_eq!(resolver.merged_cache_len(), 2);
    }

    #[test]
    fn name_is_identity_when_id_missing() {
        let store = InMemoryDefinitionStore::new().with_entry("humanoid", HUMANOID);
        let mut resolver = DefinitionResolver::new(store);
        resolver.resolve(&parse(r#"{"name":"Bob","extends":"humanoid","arguments":{"v":"1"}}"#));
        let cached = resolver.resolve(&parse(
            r#"{"name":"bob","extends":"humanoid","arguments":{"v":"2"}}"#,
        ));
        assert_eq!(cached.arguments.get("v").map(String::as_str), Some("1"));
        assert_eq!(resolver.merged_cache_len(), 1);
    }

    #[test]
    fn custom_lookup_folder_is_used() {
        let store = InMemoryDefinitionStore::new().with_entry("templates/humanoid", HUMANOID);
        let mut resolver = DefinitionResolver::new(store).with_lookup("templates/", ".json");
        let merged = resolver.resolve(&parse(HUMAN));
        assert_eq!(merged.root_path.as_deref(), Some("Sprites/Humanoid/"));
    }
}

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct DefinitionCache<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for DefinitionCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> DefinitionCache<T> {
    pub(crate) fn get(&self, key: &str) -> Option<T> {
        self.entries.get(&normalize_key(key)).cloned()
    }

    pub(crate) fn store(&mut self, key: &str, value: &T) {
        self.entries.insert(normalize_key(key), value.clone());
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

pub(crate) fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

use std::collections::HashMap;

use super::types::{EntityDefinition, LimbDefinition, PropertyMap};

pub fn merge_entity_definitions(
    base: Option<&EntityDefinition>,
    overlay: Option<&EntityDefinition>,
) -> Option<EntityDefinition> {
    let (base, overlay) = match (base, overlay) {
        (None, None) => return None,
        (None, Some(only)) | (Some(only), None) => {
            let mut copy = only.clone();
            copy.extends = None;
            return Some(copy);
        }
        (Some(base), Some(overlay)) => (base, overlay),
    };

    let mut arguments = base.arguments.clone();
    union_with_override(&mut arguments, &overlay.arguments);

    Some(EntityDefinition {
        id: pick_scalar(&base.id, &overlay.id),
        name: pick_scalar(&base.name, &overlay.name),
        root_path: pick_scalar(&base.root_path, &overlay.root_path),
        arguments,
        extends: None,
        limb: merge_limb_definitions(base.limb.as_ref(), overlay.limb.as_ref()),
    })
}

pub fn merge_limb_definitions(
    base: Option<&LimbDefinition>,
    overlay: Option<&LimbDefinition>,
) -> Option<LimbDefinition> {
    let (base, overlay) = match (base, overlay) {
        (None, None) => return None,
        (None, Some(only)) | (Some(only), None) => return Some(only.clone()),
        (Some(base), Some(overlay)) => (base, overlay),
    };

    let mut components = KeyedEntries::from_entries(&base.components, |component| {
        component.type_name().to_lowercase()
    });
    for component in &overlay.components {
        let key = component.type_name().to_lowercase();
        match components.get_mut(&key) {
            Some(existing) => union_with_override(&mut existing.properties, &component.properties),
            None => components.insert(key, component.clone()),
        }
    }

    let mut children =
        KeyedEntries::from_entries(&base.children, |child| child.display_name().to_lowercase());
    for child in &overlay.children {
        let key = child.display_name().to_lowercase();
        match children.get_mut(&key) {
            Some(existing) => {
                if let Some(merged) = merge_limb_definitions(Some(&*existing), Some(child)) {
                    *existing = merged;
                }
            }
            None => children.insert(key, child.clone()),
        }
    }

    Some(LimbDefinition {
        name: pick_scalar(&base.name, &overlay.name),
        components: components.into_values(),
        children: children.into_values(),
    })
}

fn pick_scalar(base: &Option<String>, overlay: &Option<String>) -> Option<String> {
    match overlay.as_deref() {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => base.clone(),
    }
}

fn union_with_override(target: &mut PropertyMap, overlay: &PropertyMap) {
    for (key, value) in overlay {
        target.insert(key.clone(), value.clone());
    }
}

struct KeyedEntries<T> {
    values: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Clone> KeyedEntries<T> {
    fn from_entries(entries: &[T], key_of: impl Fn(&T) -> String) -> Self {
        let mut keyed = Self {
            values: Vec::with_capacity(entries.len()),
            index: HashMap::with_capacity(entries.len()),
        };
        for entry in entries {
            keyed.insert(key_of(entry), entry.clone());
        }
        keyed
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let slot = *self.index.get(key)?;
        self.values.get_mut(slot)
    }

    fn insert(&mut self, key: String, value: T) {
        match self.index.get(&key) {
            Some(&slot) => self.values[slot] = value,
            None => {
                self.index.insert(key, self.values.len());
                self.values.push(value);
            }
        }
    }

    fn into_values(self) -> Vec<T> {
        self.values
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub type ArgumentMap = BTreeMap<String, String>;
pub type PropertyMap = BTreeMap<String, String>;

/// A definition read from text may carry an `extends` edge; a definition returned
/// by the resolver never does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub root_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub arguments: ArgumentMap,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limb: Option<LimbDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbDefinition {
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub components: Vec<ComponentDefinition>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<LimbDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub component_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub properties: PropertyMap,
}

impl EntityDefinition {
    pub fn extends_key(&self) -> Option<&str> {
        non_empty(self.extends.as_deref())
    }

    pub fn display_name(&self) -> &str {
        non_empty(self.name.as_deref()).unwrap_or("Entity")
    }
}

impl LimbDefinition {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl ComponentDefinition {
    pub fn type_name(&self) -> &str {
        self.component_type.as_deref().unwrap_or_default()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[derive(Debug, Error)]
#[error("{}", render_parse_error(.path, .source))]
pub struct DefinitionParseError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

fn render_parse_error(path: &str, source: &serde_json::Error) -> String {
    if path.is_empty() || path == "." {
        format!("parse entity definition json: {source}")
    } else {
        format!("parse entity definition json at {path}: {source}")
    }
}

pub fn parse_entity_definition(raw: &str) -> Result<EntityDefinition, DefinitionParseError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let definition = serde_path_to_error::deserialize::<_, EntityDefinition>(&mut deserializer)
        .map_err(|error| {
            let path = error.path().to_string();
            DefinitionParseError {
                path,
                source: error.into_inner(),
            }
        })?;
    deserializer
        .end()
        .map_err(|source| DefinitionParseError {
            path: String::new(),
            source,
        })?;
    Ok(definition)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Authors write `"speed": 5` as often as `"speed": "5"`; both land as text.
fn scalar_text(value: Value) -> Result<Option<String>, Value> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(other),
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_text(Value::deserialize(deserializer)?).map_err(|other| {
        serde::de::Error::custom(format!("expected a string, number or boolean, got {other}"))
    })
}

fn scalar_text_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut entries = BTreeMap::new();
    for (key, value) in raw {
        match scalar_text(value) {
            Ok(Some(text)) => {
                entries.insert(key, text);
            }
            Ok(None) => {}
            Err(other) => {
                return Err(serde::de::Error::custom(format!(
                    "'{key}' must be a string, number or boolean, got {other}"
                )))
            }
        }
    }
    Ok(entries)
}

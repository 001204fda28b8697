use std::any::{self, Any};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use super::assets::SpriteAsset;
use super::entity::{Capability, Vec3};

#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    String,
    Int,
    Float,
    Bool,
    Asset,
    Vec3,
    Parsed(ParsedKind),
}

impl PropertyKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Asset => "asset",
            Self::Vec3 => "vec3",
            Self::Parsed(parsed) => parsed.type_name,
        }
    }
}

/// Conversion for any `FromStr` type, erased so the registry stays object-safe.
#[derive(Clone, Copy)]
pub struct ParsedKind {
    type_name: &'static str,
    parse: fn(&str) -> Option<Box<dyn Any>>,
}

impl ParsedKind {
    fn of<P: FromStr + 'static>() -> Self {
        Self {
            type_name: any::type_name::<P>(),
            parse: parse_boxed::<P>,
        }
    }

    pub fn parse(&self, raw: &str) -> Option<Box<dyn Any>> {
        (self.parse)(raw)
    }
}

impl fmt::Debug for ParsedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParsedKind").field(&self.type_name).finish()
    }
}

fn parse_boxed<P: FromStr + 'static>(raw: &str) -> Option<Box<dyn Any>> {
    raw.trim()
        .parse::<P>()
        .ok()
        .map(|value| Box::new(value) as Box<dyn Any>)
}

#[derive(Debug)]
pub enum PropertyValue {
    String(String),
    Int(i32),
    Float(f32),
    Bool(bool),
    /// `None` when the asset could not be located; the target is left unset.
    Asset(Option<SpriteAsset>),
    Vec3(Vec3),
    Parsed(Option<Box<dyn Any>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyApplyError {
    #[error("capability is not a {expected}")]
    WrongCapability { expected: String },
    #[error("property '{property}' expects a {expected} value")]
    KindMismatch {
        property: String,
        expected: &'static str,
    },
}

type PropertySetter =
    Box<dyn Fn(&mut dyn Capability, PropertyValue) -> Result<(), PropertyApplyError> + Send + Sync>;

pub struct PropertyDescriptor {
    name: String,
    kind: PropertyKind,
    setter: PropertySetter,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn apply(
        &self,
        capability: &mut dyn Capability,
        value: PropertyValue,
    ) -> Result<(), PropertyApplyError> {
        (self.setter)(capability, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ComponentSchema {
    type_name: String,
    simple_name: String,
    create: fn() -> Box<dyn Capability>,
    properties: Vec<PropertyDescriptor>,
}

impl ComponentSchema {
    pub fn builder<T: Default + fmt::Debug + 'static>(type_name: &str) -> ComponentSchemaBuilder<T> {
        ComponentSchemaBuilder {
            schema: Self {
                type_name: type_name.to_string(),
                simple_name: simple_name_of(type_name).to_string(),
                create: create_default::<T>,
                properties: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn create(&self) -> Box<dyn Capability> {
        (self.create)()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }
}

fn create_default<T: Default + fmt::Debug + 'static>() -> Box<dyn Capability> {
    Box::new(T::default())
}

fn simple_name_of(type_name: &str) -> &str {
    type_name
        .rsplit(|ch: char| ch == ':' || ch == '.')
        .next()
        .unwrap_or(type_name)
}

pub struct ComponentSchemaBuilder<T> {
    schema: ComponentSchema,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Default + fmt::Debug + 'static> ComponentSchemaBuilder<T> {
    pub fn string_property(self, name: &str, set: fn(&mut T, String)) -> Self {
        self.property(name, PropertyKind::String, move |target, value| match value {
            PropertyValue::String(text) => {
                set(target, text);
                true
            }
            _ => false,
        })
    }

    pub fn int_property(self, name: &str, set: fn(&mut T, i32)) -> Self {
        self.property(name, PropertyKind::Int, move |target, value| match value {
            PropertyValue::Int(number) => {
                set(target, number);
                true
            }
            _ => false,
        })
    }

    pub fn float_property(self, name: &str, set: fn(&mut T, f32)) -> Self {
        self.property(name, PropertyKind::Float, move |target, value| match value {
            PropertyValue::Float(number) => {
                set(target, number);
                true
            }
            _ => false,
        })
    }

    pub fn bool_property(self, name: &str, set: fn(&mut T, bool)) -> Self {
        self.property(name, PropertyKind::Bool, move |target, value| match value {
            PropertyValue::Bool(flag) => {
                set(target, flag);
                true
            }
            _ => false,
        })
    }

    /// Asset setters receive `None` when the asset is missing.
    pub fn asset_property(self, name: &str, set: fn(&mut T, Option<SpriteAsset>)) -> Self {
        self.property(name, PropertyKind::Asset, move |target, value| match value {
            PropertyValue::Asset(asset) => {
                set(target, asset);
                true
            }
            _ => false,
        })
    }

    pub fn vec3_property(self, name: &str, set: fn(&mut T, Vec3)) -> Self {
        self.property(name, PropertyKind::Vec3, move |target, value| match value {
            PropertyValue::Vec3(vector) => {
                set(target, vector);
                true
            }
            _ => false,
        })
    }

    pub fn parsed_property<P: FromStr + 'static>(self, name: &str, set: fn(&mut T, P)) -> Self {
        self.property(
            name,
            PropertyKind::Parsed(ParsedKind::of::<P>()),
            move |target, value| match value {
                PropertyValue::Parsed(Some(boxed)) => match boxed.downcast::<P>() {
                    Ok(parsed) => {
                        set(target, *parsed);
                        true
                    }
                    Err(_) => false,
                },
                PropertyValue::Parsed(None) => true,
                _ => false,
            },
        )
    }

    pub fn build(self) -> ComponentSchema {
        self.schema
    }

    fn property(
        mut self,
        name: &str,
        kind: PropertyKind,
        apply: impl Fn(&mut T, PropertyValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        let expected_type = self.schema.type_name.clone();
        let property = name.to_string();
        let setter: PropertySetter = Box::new(
            move |capability: &mut dyn Capability, value: PropertyValue| {
                let Some(target) = (*capability).as_any_mut().downcast_mut::<T>() else {
                    return Err(PropertyApplyError::WrongCapability {
                        expected: expected_type.clone(),
                    });
                };
                if apply(target, value) {
                    Ok(())
                } else {
                    Err(PropertyApplyError::KindMismatch {
                        property: property.clone(),
                        expected: kind.label(),
                    })
                }
            },
        );
        self.schema.properties.retain(|existing| existing.name != name);
        self.schema.properties.push(PropertyDescriptor {
            name: name.to_string(),
            kind,
            setter,
        });
        self
    }
}

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    schemas: Vec<ComponentSchema>,
    by_type_name: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, schema: ComponentSchema) -> Self {
        self.register(schema);
        self
    }

    pub fn register(&mut self, schema: ComponentSchema) {
        if let Some(&slot) = self.by_type_name.get(schema.type_name()) {
            warn!(type_name = %schema.type_name(), "component_schema_replaced");
            self.schemas[slot] = schema;
            return;
        }
        self.by_type_name
            .insert(schema.type_name().to_string(), self.schemas.len());
        self.schemas.push(schema);
    }

    /// Exact type name first, then the first schema whose simple name matches.
    pub fn resolve_type(&self, name: &str) -> Option<&ComponentSchema> {
        if let Some(&slot) = self.by_type_name.get(name) {
            return self.schemas.get(slot);
        }
        self.schemas
            .iter()
            .find(|schema| schema.simple_name() == name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.schemas.iter().map(ComponentSchema::type_name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Mover {
        speed: f32,
        label: String,
        steps: i32,
        enabled: bool,
        offset: Vec3,
        tag: Option<u8>,
    }

    #[derive(Debug, Default)]
    struct Other;

    fn mover_schema() -> ComponentSchema {
        ComponentSchema::builder::<Mover>("demo::motion::Mover")
            .float_property("Speed", |m, v| m.speed = v)
            .string_property("Label", |m, v| m.label = v)
            .int_property("Steps", |m, v| m.steps = v)
            .bool_property("Enabled", |m, v| m.enabled = v)
            .vec3_property("Offset", |m, v| m.offset = v)
            .parsed_property::<u8>("Tag", |m, v| m.tag = Some(v))
            .build()
    }

    #[test]
    fn resolves_exact_then_simple_name() {
        let registry = ComponentRegistry::new().with(mover_schema());
        assert!(registry.resolve_type("demo::motion::Mover").is_some());
        assert_eq!(
            registry.resolve_type("Mover").map(ComponentSchema::type_name),
            Some("demo::motion::Mover")
        );
        assert!(registry.resolve_type("mover").is_none());
        assert!(registry.resolve_type("Missing").is_none());
    }

    #[test]
    fn register_replaces_same_type_name() {
        let mut registry = ComponentRegistry::new();
        registry.register(mover_schema());
        registry.register(ComponentSchema::builder::<Mover>("demo::motion::Mover").build());
        assert_eq!(registry.len(), 1);
        let schema = registry.resolve_type("Mover").expect("schema");
        assert!(schema.properties().is_empty());
    }

    #[test]
    fn setters_write_typed_values() {
        let schema = mover_schema();
        let mut instance = schema.create();
        let writes = [
            ("Speed", PropertyValue::Float(2.5)),
            ("Label", PropertyValue::String("fast".to_string())),
            ("Steps", PropertyValue::Int(4)),
            ("Enabled", PropertyValue::Bool(true)),
            ("Offset", PropertyValue::Vec3(Vec3::new(1.0, 2.0, 3.0))),
            ("Tag", PropertyValue::Parsed(Some(Box::new(7u8)))),
        ];
        for (name, value) in writes {
            schema
                .property(name)
                .expect("property")
                .apply(instance.as_mut(), value)
                .expect("apply");
        }
        let mover = (*instance).as_any().downcast_ref::<Mover>().expect("mover");
        assert_eq!(
            mover,
            &Mover {
                speed: 2.5,
                label: "fast".to_string(),
                steps: 4,
                enabled: true,
                offset: Vec3::new(1.0, 2.0, 3.0),
                tag: Some(7),
            }
        );
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let schema = mover_schema();
        let mut instance = schema.create();
        let error = schema
            .property("Speed")
            .expect("property")
            .apply(instance.as_mut(), PropertyValue::Bool(true))
            .expect_err("mismatch");
        assert_eq!(
            error,
            PropertyApplyError::KindMismatch {
                property: "Speed".to_string(),
                expected: "float",
            }
        );
    }

    #[test]
    fn wrong_capability_is_reported() {
        let schema = mover_schema();
        let mut other: Box<dyn Capability> = Box::new(Other);
        let error = schema
            .property("Speed")
            .expect("property")
            .apply(other.as_mut(), PropertyValue::Float(1.0))
            .expect_err("wrong type");
        assert!(matches!(error, PropertyApplyError::WrongCapability { .. }));
    }

    #[test]
    fn parsed_kind_trims_and_rejects() {
        let PropertyKind::Parsed(kind) = mover_schema().property("Tag").expect("tag").kind() else {
            panic!("expected parsed kind");
        };
        let parsed = kind.parse(" 12 ").expect("parse");
        assert_eq!(parsed.downcast_ref::<u8>(), Some(&12));
        assert!(kind.parse("300").is_none());
    }
}

use thiserror::Error;
use tracing::{debug, warn};

use super::assets::{AssetLookup, SpriteAsset};
use super::entity::{AttachedCapability, EntityId, LimbIndex, SpawnedEntity, Vec3};
use super::registry::{ComponentRegistry, ComponentSchema, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::content::{ArgumentMap, ComponentDefinition, EntityDefinition, LimbDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnDiagnostic {
    #[error("component type '{type_name}' on limb '{limb}' is not registered")]
    TypeNotFound { limb: String, type_name: String },
    #[error("property '{property}' not found on {type_name} (limb '{limb}')")]
    PropertyNotFound {
        limb: String,
        type_name: String,
        property: String,
    },
    #[error("cannot convert '{value}' to {expected} for {type_name}.{property} (limb '{limb}')")]
    ConversionError {
        limb: String,
        type_name: String,
        property: String,
        value: String,
        expected: String,
    },
    #[error("asset not found at path: {path} ({type_name}.{property}, limb '{limb}')")]
    MissingAsset {
        limb: String,
        type_name: String,
        property: String,
        path: String,
    },
}

#[derive(Debug)]
pub struct SpawnReport {
    pub entity: SpawnedEntity,
    pub diagnostics: Vec<SpawnDiagnostic>,
}

pub fn substitute_arguments(value: &str, arguments: &ArgumentMap) -> String {
    let mut result = value.to_string();
    for (name, replacement) in arguments {
        let placeholder = format!("{{{name}}}");
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, replacement);
        }
    }
    result
}

pub struct Assembler<'a> {
    registry: &'a ComponentRegistry,
    assets: &'a mut dyn AssetLookup,
}

impl<'a> Assembler<'a> {
    pub fn new(registry: &'a ComponentRegistry, assets: &'a mut dyn AssetLookup) -> Self {
        Self { registry, assets }
    }

    /// `argument_overrides`, when supplied, replaces the definition's own
    /// argument defaults entirely.
    pub fn assemble(
        &mut self,
        id: EntityId,
        definition: &EntityDefinition,
        position: Vec3,
        argument_overrides: Option<&ArgumentMap>,
    ) -> SpawnReport {
        let mut context = PrepareContext {
            arguments: argument_overrides.unwrap_or(&definition.arguments),
            root_path: definition.root_path.as_deref().unwrap_or_default(),
            diagnostics: Vec::new(),
        };
        let prepared = definition
            .limb
            .as_ref()
            .map(|limb| self.prepare_limb(limb, "", &mut context));

        let mut entity = SpawnedEntity::new(id, definition.display_name(), position);
        if let Some(root) = prepared {
            instantiate_limb(&mut entity, root, None);
        }
        entity.refresh_capabilities();

        debug!(
            entity = %entity.name,
            limbs = entity.limbs().len(),
            capabilities = entity.capability_refs().len(),
            diagnostics = context.diagnostics.len(),
            "entity_assembled"
        );
        SpawnReport {
            entity,
            diagnostics: context.diagnostics,
        }
    }

    fn prepare_limb(
        &mut self,
        limb: &LimbDefinition,
        parent_path: &str,
        context: &mut PrepareContext<'_>,
    ) -> PreparedLimb<'a> {
        let path = if parent_path.is_empty() {
            limb.display_name().to_string()
        } else {
            format!("{parent_path}/{}", limb.display_name())
        };

        let mut components = Vec::with_capacity(limb.components.len());
        for component in &limb.components {
            if let Some(prepared) = self.prepare_component(component, &path, context) {
                components.push(prepared);
            }
        }
        let children = limb
            .children
            .iter()
            .map(|child| self.prepare_limb(child, &path, context))
            .collect();

        PreparedLimb {
            name: limb.display_name().to_string(),
            components,
            children,
        }
    }

    fn prepare_component(
        &mut self,
        component: &ComponentDefinition,
        limb_path: &str,
        context: &mut PrepareContext<'_>,
    ) -> Option<PreparedComponent<'a>> {
        let type_name = component.type_name();
        if type_name.is_empty() {
            debug!(limb = %limb_path, "component_without_type_skipped");
            return None;
        }
        let registry: &'a ComponentRegistry = self.registry;
        let Some(schema) = registry.resolve_type(type_name) else {
            context.report(SpawnDiagnostic::TypeNotFound {
                limb: limb_path.to_string(),
                type_name: type_name.to_string(),
            });
            return None;
        };

        let mut values = Vec::with_capacity(component.properties.len());
        for (property, raw) in &component.properties {
            let Some(descriptor) = schema.property(property) else {
                context.report(SpawnDiagnostic::PropertyNotFound {
                    limb: limb_path.to_string(),
                    type_name: schema.simple_name().to_string(),
                    property: property.clone(),
                });
                continue;
            };
            let text = substitute_arguments(raw, context.arguments);
            let site = PropertySite {
                limb: limb_path,
                type_name: schema.simple_name(),
                property,
            };
            if let Some(value) = self.convert(descriptor.kind(), text, &site, context) {
                values.push((descriptor, value));
            }
        }

        Some(PreparedComponent { schema, values })
    }

    fn convert(
        &mut self,
        kind: PropertyKind,
        text: String,
        site: &PropertySite<'_>,
        context: &mut PrepareContext<'_>,
    ) -> Option<PropertyValue> {
        let converted = match kind {
            PropertyKind::String => return Some(PropertyValue::String(text)),
            PropertyKind::Int => text.trim().parse::<i32>().ok().map(PropertyValue::Int),
            PropertyKind::Float => text.trim().parse::<f32>().ok().map(PropertyValue::Float),
            PropertyKind::Bool => parse_bool(&text).map(PropertyValue::Bool),
            PropertyKind::Vec3 => parse_vec3(&text).map(PropertyValue::Vec3),
            PropertyKind::Parsed(parsed) => return Some(PropertyValue::Parsed(parsed.parse(&text))),
            PropertyKind::Asset => {
                let path = format!("{}{text}", context.root_path);
                return Some(PropertyValue::Asset(self.resolve_asset(path, site, context)));
            }
        };
        if converted.is_none() {
            context.report(SpawnDiagnostic::ConversionError {
                limb: site.limb.to_string(),
                type_name: site.type_name.to_string(),
                property: site.property.to_string(),
                value: text,
                expected: kind.label().to_string(),
            });
        }
        converted
    }

    fn resolve_asset(
        &mut self,
        path: String,
        site: &PropertySite<'_>,
        context: &mut PrepareContext<'_>,
    ) -> Option<SpriteAsset> {
        let asset = self.assets.load_asset(&path);
        if asset.is_none() {
            context.report(SpawnDiagnostic::MissingAsset {
                limb: site.limb.to_string(),
                type_name: site.type_name.to_string(),
                property: site.property.to_string(),
                path,
            });
        }
        asset
    }
}

struct PrepareContext<'d> {
    arguments: &'d ArgumentMap,
    root_path: &'d str,
    diagnostics: Vec<SpawnDiagnostic>,
}

impl PrepareContext<'_> {
    fn report(&mut self, diagnostic: SpawnDiagnostic) {
        warn!(diagnostic = %diagnostic, "spawn_diagnostic");
        self.diagnostics.push(diagnostic);
    }
}

struct PropertySite<'s> {
    limb: &'s str,
    type_name: &'s str,
    property: &'s str,
}

struct PreparedLimb<'r> {
    name: String,
    components: Vec<PreparedComponent<'r>>,
    children: Vec<PreparedLimb<'r>>,
}

struct PreparedComponent<'r> {
    schema: &'r ComponentSchema,
    values: Vec<(&'r PropertyDescriptor, PropertyValue)>,
}

fn instantiate_limb(entity: &mut SpawnedEntity, limb: PreparedLimb<'_>, parent: Option<LimbIndex>) {
    let index = entity.add_limb(&limb.name, parent);
    for component in limb.components {
        let mut attached =
            AttachedCapability::new(component.schema.type_name(), component.schema.create());
        for (descriptor, value) in component.values {
            if let Err(error) = descriptor.apply(attached.instance_mut(), value) {
                warn!(
                    type_name = %component.schema.type_name(),
                    property = %descriptor.name(),
                    error = %error,
                    "capability_property_apply_failed"
                );
            }
        }
        entity.attach(index, attached);
    }
    for child in limb.children {
        instantiate_limb(entity, child, Some(index));
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_vec3(text: &str) -> Option<Vec3> {
    let mut parts = text.split(',').map(|part| part.trim().parse::<f32>());
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Vec3::new(x, y, z))
}

mod assembly;
mod assets;
mod entity;
mod registry;

pub use assembly::{substitute_arguments, Assembler, SpawnDiagnostic, SpawnReport};
pub use assets::{AssetLookup, DirectoryAssetLookup, SpriteAsset, StaticAssetLookup};
pub use entity::{
    AttachedCapability, Capability, CapabilityRef, EntityId, EntityIdAllocator, LimbIndex,
    LimbNode, SpawnedEntity, Vec3,
};
pub use registry::{
    ComponentRegistry, ComponentSchema, ComponentSchemaBuilder, ParsedKind, PropertyApplyError,
    PropertyDescriptor, PropertyKind, PropertyValue,
};

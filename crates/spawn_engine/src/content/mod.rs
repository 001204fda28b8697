mod cache;
mod merge;
mod resolver;
mod store;
mod types;

pub use merge::{merge_entity_definitions, merge_limb_definitions};
pub use resolver::DefinitionResolver;
pub use store::{
    lookup_candidates, DefinitionListing, DefinitionStore, DefinitionStoreError,
    DirectoryDefinitionStore, InMemoryDefinitionStore, DEFAULT_BASE_SUBFOLDER,
    DEFAULT_DEFINITION_EXTENSION,
};
pub use types::{
    parse_entity_definition, ArgumentMap, ComponentDefinition, DefinitionParseError,
    EntityDefinition, LimbDefinition, PropertyMap,
};

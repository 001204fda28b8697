use std::str::FromStr;

use spawn_engine::{ComponentRegistry, ComponentSchema, SpawnedEntity, SpriteAsset};

#[derive(Debug, Default)]
pub(crate) struct DirectionalSprite {
    pub(crate) sprite: Option<SpriteAsset>,
    pub(crate) sort: i32,
    pub(crate) random_sprite: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum SpriteKind {
    #[default]
    Directional,
    Animated,
}

impl FromStr for SpriteKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("directional") {
            Ok(Self::Directional)
        } else if raw.eq_ignore_ascii_case("animated") {
            Ok(Self::Animated)
        } else {
            Err(format!("unknown sprite type '{raw}'"))
        }
    }
}

#[derive(Debug)]
pub(crate) struct SpriteScript {
    pub(crate) sprite: Option<SpriteAsset>,
    pub(crate) sort: i32,
    pub(crate) sprite_type: SpriteKind,
    pub(crate) state_name: String,
    pub(crate) looped: bool,
    pub(crate) destroy_on_stop: bool,
    pub(crate) random_start: bool,
}

impl Default for SpriteScript {
    fn default() -> Self {
        Self {
            sprite: None,
            sort: 0,
            sprite_type: SpriteKind::Directional,
            state_name: "directional".to_string(),
            looped: false,
            destroy_on_stop: false,
            random_start: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct AnimationSprite {
    pub(crate) sprite: Option<SpriteAsset>,
    pub(crate) sort: i32,
    pub(crate) state_name: String,
    pub(crate) playing: bool,
    pub(crate) is_animated: bool,
    pub(crate) looped: bool,
    pub(crate) destroy_on_stop: bool,
}

impl Default for AnimationSprite {
    fn default() -> Self {
        Self {
            sprite: None,
            sort: 0,
            state_name: String::new(),
            playing: true,
            is_animated: false,
            looped: false,
            destroy_on_stop: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Movement {
    pub(crate) speed: f32,
}

#[derive(Debug, Default)]
pub(crate) struct Brain;

#[derive(Debug, Default)]
pub(crate) struct BasePlate {
    pub(crate) built: bool,
}

#[derive(Debug)]
pub(crate) struct Ghost {
    pub(crate) click_distance: f32,
}

impl Default for Ghost {
    fn default() -> Self {
        Self {
            click_distance: 0.3,
        }
    }
}

pub(crate) fn builtin_registry() -> ComponentRegistry {
    ComponentRegistry::new()
        .with(
            ComponentSchema::builder::<DirectionalSprite>("spawn_sandbox::aspects::DirectionalSprite")
                .asset_property("Sprite", |c, v| c.sprite = v)
                .int_property("Sort", |c, v| c.sort = v)
                .bool_property("RandomSprite", |c, v| c.random_sprite = v)
                .build(),
        )
        .with(
            ComponentSchema::builder::<SpriteScript>("spawn_sandbox::aspects::SpriteScript")
                .asset_property("Sprite", |c, v| c.sprite = v)
                .int_property("Sort", |c, v| c.sort = v)
                .parsed_property::<SpriteKind>("SpriteType", |c, v| c.sprite_type = v)
                .string_property("StateName", |c, v| c.state_name = v)
                .bool_property("Loop", |c, v| c.looped = v)
                .bool_property("DestroyOnStop", |c, v| c.destroy_on_stop = v)
                .bool_property("RandomStart", |c, v| c.random_start = v)
                .build(),
        )
        .with(
            ComponentSchema::builder::<AnimationSprite>("spawn_sandbox::aspects::AnimationSprite")
                .asset_property("Sprite", |c, v| c.sprite = v)
                .int_property("Sort", |c, v| c.sort = v)
                .string_property("StateName", |c, v| c.state_name = v)
                .bool_property("playing", |c, v| c.playing = v)
                .bool_property("isAnimated", |c, v| c.is_animated = v)
                .bool_property("Loop", |c, v| c.looped = v)
                .bool_property("DestroyOnStop", |c, v| c.destroy_on_stop = v)
                .build(),
        )
        .with(
            ComponentSchema::builder::<Movement>("spawn_sandbox::aspects::Movement")
                .float_property("Speed", |c, v| c.speed = v)
                .build(),
        )
        .with(ComponentSchema::builder::<Brain>("spawn_sandbox::aspects::Brain").build())
        .with(
            ComponentSchema::builder::<BasePlate>("spawn_sandbox::aspects::BasePlate")
                .bool_property("Built", |c, v| c.built = v)
                .build(),
        )
        .with(
            ComponentSchema::builder::<Ghost>("spawn_sandbox::aspects::Ghost")
                .float_property("clickDistance", |c, v| c.click_distance = v)
                .build(),
        )
}

/// Sum of every `Movement` speed found on the entity.
pub(crate) fn movement_speed(entity: &SpawnedEntity) -> f32 {
    entity
        .capabilities_of::<Movement>()
        .map(|movement| movement.speed)
        .sum()
}

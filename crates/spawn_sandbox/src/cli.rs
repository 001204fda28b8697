use std::io::Write;

use spawn_engine::{
    ArgumentMap, DirectoryDefinitionStore, EntitySpawner, LimbIndex, SpawnReport, SpawnedEntity,
    Vec3,
};

use crate::aspects::movement_speed;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    List {
        folder: String,
    },
    Resolve {
        key: String,
    },
    Spawn {
        key: String,
        position: Vec3,
        args: Option<ArgumentMap>,
    },
}

pub(crate) struct Sandbox {
    pub(crate) spawner: EntitySpawner,
    pub(crate) store: DirectoryDefinitionStore,
}

/// `env_args` comes from `SPAWN_ARGS`; `--arg` flags are layered on top of it.
pub(crate) fn parse_command(args: &[String], env_args: &ArgumentMap) -> Result<Command, String> {
    let command = args
        .first()
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[1..];

    match command {
        "list" => {
            if command_args.len() > 1 {
                return Err("list takes at most one folder".to_string());
            }
            Ok(Command::List {
                folder: command_args.first().cloned().unwrap_or_default(),
            })
        }
        "resolve" => match command_args {
            [key] => Ok(Command::Resolve { key: key.clone() }),
            [] => Err("resolve requires a definition key".to_string()),
            _ => Err("resolve takes exactly one definition key".to_string()),
        },
        "spawn" => parse_spawn(command_args, env_args),
        other => Err(format!("unknown subcommand '{other}'")),
    }
}

fn parse_spawn(args: &[String], env_args: &ArgumentMap) -> Result<Command, String> {
    let mut key = None;
    let mut position = Vec3::ZERO;
    let mut overrides = env_args.clone();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--at" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --at".to_string())?;
                position = parse_position(value)
                    .ok_or_else(|| format!("invalid --at value '{value}' (expected x,y[,z])"))?;
                index += 2;
            }
            "--arg" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --arg".to_string())?;
                let (name, replacement) = parse_argument_pair(value)
                    .ok_or_else(|| format!("invalid --arg value '{value}' (expected name=value)"))?;
                overrides.insert(name, replacement);
                index += 2;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown spawn option '{flag}'"));
            }
            value => {
                if key.replace(value.to_string()).is_some() {
                    return Err("spawn takes exactly one definition key".to_string());
                }
                index += 1;
            }
        }
    }

    let key = key.ok_or_else(|| "spawn requires a definition key".to_string())?;
    Ok(Command::Spawn {
        key,
        position,
        args: (!overrides.is_empty()).then_some(overrides),
    })
}

fn parse_position(raw: &str) -> Option<Vec3> {
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [x, y] => Some(Vec3::new(*x, *y, 0.0)),
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

pub(crate) fn parse_argument_pair(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

pub(crate) fn run(
    command: Command,
    sandbox: &mut Sandbox,
    out: &mut impl Write,
) -> Result<(), String> {
    match command {
        Command::List { folder } => {
            let listing = sandbox.store.list(&folder).map_err(|error| error.to_string())?;
            for name in &listing.folders {
                writeln!(out, "{name}/").map_err(|error| error.to_string())?;
            }
            for key in &listing.definitions {
                writeln!(out, "{key}").map_err(|error| error.to_string())?;
            }
            Ok(())
        }
        Command::Resolve { key } => {
            let resolver = sandbox.spawner.resolver_mut();
            let definition = resolver
                .load_definition(&key)
                .ok_or_else(|| format!("entity definition '{key}' not found"))?;
            let merged = resolver.resolve(&definition);
            let json = serde_json::to_string_pretty(&merged)
                .map_err(|error| format!("serialize definition '{key}': {error}"))?;
            writeln!(out, "{json}").map_err(|error| error.to_string())
        }
        Command::Spawn {
            key,
            position,
            args,
        } => {
            let report = sandbox
                .spawner
                .spawn_by_key(&key, position, args.as_ref())
                .map_err(|error| error.to_string())?;
            write_report(&report, out).map_err(|error| error.to_string())
        }
    }
}

fn write_report(report: &SpawnReport, out: &mut impl Write) -> std::io::Result<()> {
    let entity = &report.entity;
    writeln!(
        out,
        "entity #{} '{}' at {}",
        entity.id.0, entity.name, entity.position
    )?;
    for root in entity.root_limbs() {
        write_limb(entity, *root, 1, out)?;
    }
    writeln!(out, "capabilities: {}", entity.capability_refs().len())?;
    writeln!(out, "movement speed: {}", movement_speed(entity))?;
    if report.diagnostics.is_empty() {
        writeln!(out, "diagnostics: none")?;
    } else {
        writeln!(out, "diagnostics:")?;
        for diagnostic in &report.diagnostics {
            writeln!(out, "  - {diagnostic}")?;
        }
    }
    Ok(())
}

fn write_limb(
    entity: &SpawnedEntity,
    index: LimbIndex,
    depth: usize,
    out: &mut impl Write,
) -> std::io::Result<()> {
    let Some(limb) = entity.limb(index) else {
        return Ok(());
    };
    let indent = "  ".repeat(depth);
    let name = if limb.name.is_empty() {
        "<unnamed>"
    } else {
        limb.name.as_str()
    };
    writeln!(out, "{indent}{name}")?;
    for capability in limb.capabilities() {
        writeln!(
            out,
            "{indent}  [{}] {:?}",
            short_type_name(capability.type_name()),
            capability.instance()
        )?;
    }
    for child in limb.children() {
        write_limb(entity, *child, depth + 1, out)?;
    }
    Ok(())
}

pub(crate) fn short_type_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

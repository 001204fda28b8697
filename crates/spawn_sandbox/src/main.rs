use std::env;
use std::io;
use std::process::ExitCode;

use tracing::error;

mod app;
mod aspects;
mod cli;

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        println!("{}", usage_text());
        return Ok(());
    }

    app::bootstrap::init_tracing();
    let command = cli::parse_command(&args, &app::bootstrap::parse_spawn_args_from_env())
        .map_err(|message| format!("{message}\n\n{}", usage_text()))?;
    let mut sandbox = app::bootstrap::build_sandbox().map_err(|startup_error| {
        error!(error = %startup_error, "sandbox_startup_failed");
        startup_error.to_string()
    })?;
    cli::run(command, &mut sandbox, &mut io::stdout())
}

fn usage_text() -> String {
    let registry = aspects::builtin_registry();
    let components = registry
        .type_names()
        .map(cli::short_type_name)
        .collect::<Vec<_>>()
        .join(", ");
    let components_line = format!("  {components}");
    [
        "usage: spawn_sandbox <command>",
        "",
        "commands:",
        "  list [folder]                               list definition folders and keys",
        "  resolve <key>                               print the merged definition as JSON",
        "  spawn <key> [--at x,y[,z]] [--arg k=v]...   assemble an entity and print it",
        "",
        "components:",
        components_line.as_str(),
        "",
        "environment:",
        "  SPAWN_ENGINE_ROOT   project root holding assets/entities and assets/sprites",
        "  SPAWN_ARGS          default spawn arguments, e.g. gender=f,skin=pale",
        "  RUST_LOG            tracing filter (default: info)",
    ]
    .join("\n")
}

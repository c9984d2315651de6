//! `oaskit` command line.

mod generate;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(
    name = "oaskit",
    version,
    about = "Compile OpenAPI descriptions into typed client declarations"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an API description into a declaration list
    #[command(visible_alias = "g")]
    Generate(generate::GenerateArgs),
}

fn main() {
    init_tracing();
    let code = run_cli(std::env::args().collect());
    std::process::exit(code);
}

fn run_cli(args: Vec<String>) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Generate(args)) => generate::run(args),
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

const CRATES: [&str; 3] = ["oaskit_cli", "oaskit_core", "oaskit_runtime"];

fn init_tracing() {
    // OASKIT_LOG is a plain level ("debug") or a full filter spec
    let filter = match std::env::var("OASKIT_LOG") {
        Ok(level) if is_plain_level(&level) => crate_filter(&level),
        Ok(spec) => spec,
        Err(_) => crate_filter("info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn crate_filter(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_level_expands_to_every_crate() {
        assert!(is_plain_level("DEBUG"));
        assert!(!is_plain_level("oaskit_core=trace"));
        assert_eq!(
            crate_filter("warn"),
            "oaskit_cli=warn,oaskit_core=warn,oaskit_runtime=warn"
        );
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_alias_parses() {
        let cli =
            Cli::try_parse_from(["oaskit", "g", "-i", "api.json", "-o", "out.json", "-e"]).unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            unreachable!("generate subcommand expected");
        };
        assert!(args.generate_enums);
        assert!(!args.only_types);
    }
}

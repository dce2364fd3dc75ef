//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Sluice -- rule-based message processing pipelines.
///
/// Use `sluice <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "sluice", version, about, long_about = None)]
pub struct Cli {
    /// Path to the sluice.toml configuration file.
    #[arg(short, long, default_value = "sluice.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile every rule and pipeline in a source directory.
    Check(CheckArgs),

    /// Run a single rule against a single message.
    Simulate(SimulateArgs),

    /// Process JSON-lines messages through the connected pipelines.
    Run(RunArgs),

    /// List the registered functions.
    Functions(FunctionsArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- check ----

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Source directory (default: `interpreter.source_dir` from the config).
    pub dir: Option<PathBuf>,
}

// ---- simulate ----

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Rule source file.
    pub rule_file: PathBuf,

    /// Message as a JSON object, or `@FILE` to read it from a file.
    pub message: String,

    /// Append the evaluation trace as JSON lines to this file.
    #[arg(long)]
    pub trace_out: Option<PathBuf>,
}

// ---- run ----

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source directory (default: `interpreter.source_dir` from the config).
    pub dir: Option<PathBuf>,

    /// JSON-lines input file (default: stdin).
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Print stage outcomes along with the delivered messages.
    #[arg(long)]
    pub stages: bool,
}

// ---- functions ----

#[derive(Args, Debug)]
pub struct FunctionsArgs {
    /// Show only functions whose name contains this text.
    #[arg(long)]
    pub filter: Option<String>,
}

// ---- config ----

/// Manage sluice configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, interpreter).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_check_default_dir() {
        let cli = Cli::try_parse_from(["sluice", "check"]).expect("parse succeeded");
        match cli.command {
            Commands::Check(args) => assert!(args.dir.is_none()),
            _ => panic!("expected Check command"),
        }
        assert_eq!(cli.config, PathBuf::from("sluice.toml"));
    }

    #[test]
    fn test_cli_parse_check_with_dir() {
        let cli =
            Cli::try_parse_from(["sluice", "check", "/srv/pipelines"]).expect("parse succeeded");
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.dir, Some(PathBuf::from("/srv/pipelines")));
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_simulate() {
        let cli = Cli::try_parse_from([
            "sluice",
            "simulate",
            "tag.rule",
            r#"{"message":"hi"}"#,
            "--trace-out",
            "trace.jsonl",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.rule_file, PathBuf::from("tag.rule"));
                assert_eq!(args.message, r#"{"message":"hi"}"#);
                assert_eq!(args.trace_out, Some(PathBuf::from("trace.jsonl")));
            }
            _ => panic!("expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parse_simulate_requires_message() {
        assert!(Cli::try_parse_from(["sluice", "simulate", "tag.rule"]).is_err());
    }

    #[test]
    fn test_cli_parse_run_with_input() {
        let cli = Cli::try_parse_from(["sluice", "run", "-i", "in.jsonl", "--stages"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.dir.is_none());
                assert_eq!(args.input, Some(PathBuf::from("in.jsonl")));
                assert!(args.stages);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sluice",
            "functions",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse succeeded");
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["sluice", "config", "show", "--section", "interpreter"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("interpreter")),
            _ => panic!("expected Config Show command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["sluice", "--output", "yaml", "functions"]).is_err());
    }
}

mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_TOOL_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "bindery",
    version,
    about = "EPUB validation and packaging driver"
)]
struct Cli {
    /// Path to the configuration file (default: ./bindery.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the checker jar (overrides the config file).
    #[arg(long, global = true)]
    jar: Option<PathBuf>,

    /// Per-run wall-clock limit in seconds (overrides the config file).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate one or more expanded EPUB project directories.
    Check {
        /// Project directories to validate.
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
        /// Also fail when any message at or above this severity is present
        /// (fatal, error, warning, usage, info).
        #[arg(long, value_name = "SEVERITY")]
        fail_on: Option<String>,
    },
    /// Validate a project directory and package it into an .epub artifact.
    Package {
        /// Project directory to package.
        dir: PathBuf,
    },
    /// Expand a packaged .epub into a sibling directory.
    Expand {
        /// Packaged artifact to expand.
        file: PathBuf,
        /// Destination directory (default: sibling named after the file).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run diagnostic checks on the tool configuration.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BINDERY_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = match bindery_schema::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Check { dirs, fail_on } => {
            match config.resolve(cli.jar.as_deref(), cli.timeout) {
                Ok(tool) => commands::check::run(tool, &dirs, fail_on.as_deref(), json_output),
                Err(e) => Err(format!("config error: {e}")),
            }
        }
        Commands::Package { dir } => match config.resolve(cli.jar.as_deref(), cli.timeout) {
            Ok(tool) => commands::package::run(tool, &dir, json_output),
            Err(e) => Err(format!("config error: {e}")),
        },
        Commands::Expand { file, out } => commands::expand::run(
            &file,
            out.as_deref(),
            cli.timeout.unwrap_or(config.tool.timeout_secs),
            json_output,
        ),
        Commands::Doctor => {
            commands::doctor::run(&config, cli.jar.as_deref(), cli.timeout, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("checker error:") {
                EXIT_TOOL_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

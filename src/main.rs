//! dom-scripts CLI
//!
//! Usage:
//!   dom-scripts [OPTIONS] <COMMAND>
//!
//! Commands:
//!   list                        List templates with their placeholders
//!   render <NAME> [-b KEY=VAL]  Print a rendered script
//!   check <FILE>                Validate a custom template file
//!
//! Options:
//!   -c, --config <FILE>  Executor configuration (TOML format)
//!   -v, --verbose        Log at debug level
//!   -h, --help           Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dom_scripts::config::{load_template_file, parse_template_specs};
use dom_scripts::{Bindings, ExecutorConfig, TemplateError, TemplateStore};

#[derive(Parser)]
#[command(name = "dom-scripts")]
#[command(about = "Render and check page-side WebDriver script templates")]
struct Cli {
    /// Executor configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List templates with their placeholders and result shapes
    List,

    /// Print the script a template renders to
    Render {
        /// Template name; a trailing `.js` is ignored
        name: String,

        /// Placeholder binding
        #[arg(short, long = "bind", value_name = "KEY=VALUE", value_parser = parse_binding)]
        bind: Vec<(String, String)>,
    },

    /// Validate a custom template file (.toml or .js)
    Check {
        file: PathBuf,
    },
}

fn parse_binding(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => match ExecutorConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ExecutorConfig::default(),
    };

    match cli.command {
        Command::List => {
            let store = load_store(&config);
            for template in store.iter() {
                let placeholders: Vec<&str> = template.placeholders().map(|(n, _)| n).collect();
                println!(
                    "{:<24} {:<8} {}",
                    template.name(),
                    template.result(),
                    placeholders.join(", ")
                );
            }
        }
        Command::Render { name, bind } => {
            let store = load_store(&config);
            let bindings: Bindings = bind.into_iter().collect();
            match store.render_with(&name, &bindings, config.render_options()) {
                Ok(script) => println!("{}", script),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Check { file } => {
            if let Err(report) = check(&file, &config) {
                eprintln!("{}", report);
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_store(config: &ExecutorConfig) -> TemplateStore {
    match config.build_store() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Validate a template file against the configured store; the error is a
/// printable report
fn check(path: &Path, config: &ExecutorConfig) -> Result<(), String> {
    let display = path.display().to_string();

    // Span errors point into a template body, so TOML bodies are checked one
    // at a time to report against the right source
    if path.extension().and_then(|e| e.to_str()) != Some("js") {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", display, e))?;
        let specs = parse_template_specs(&content).map_err(|e| format!("{}: {}", display, e))?;
        for spec in specs {
            let body = spec.body.clone();
            let name = format!("{}[{}]", display, spec.name);
            spec.into_template()
                .map_err(|e: TemplateError| e.format(&body, &name))?;
        }
    }

    let templates = load_template_file(path).map_err(|e| e.format("", &display))?;
    let mut store = config.build_store().map_err(|e| e.to_string())?;
    let count = templates.len();
    for template in templates {
        store
            .register(template)
            .map_err(|e| e.format("", &display))?;
    }
    println!("{}: {} template(s) ok", display, count);
    Ok(())
}

//! Gateway synth CLI
//!
//! Usage:
//!   gateway-synth [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --compact    Print the template on a single line
//!   -d, --debug      Log the construct tree and assigned logical ids
//!   -v, --verbose    Increase log verbosity (repeatable)
//!   -h, --help       Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gateway_constructs::{synth_manifest_with_config, Error, SynthConfig};

#[derive(Parser)]
#[command(name = "gateway-synth")]
#[command(about = "Synthesize API gateway manifests into deployment templates")]
struct Cli {
    /// Manifest file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Print the template on a single line
    #[arg(short, long)]
    compact: bool,

    /// Log the construct tree and assigned logical ids
    #[arg(short, long)]
    debug: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8, debug: bool) {
    let level = match (verbose, debug) {
        (0, false) => "warn",
        (0, true) | (1, _) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gateway_constructs={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let config = SynthConfig::new()
        .with_pretty_print(!cli.compact)
        .with_debug(cli.debug);
    match synth_manifest_with_config(&source, &config) {
        Ok(template) => {
            println!("{}", template);
        }
        Err(Error::Manifest(e)) => {
            eprintln!("{}", e.format(&source, &filename).trim_end());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

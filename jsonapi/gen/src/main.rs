//! JSON:API Code Generator
//!
//! Generates Rust types, handlers and validators from an OpenAPI document.

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use jsonapi_gen::context::DEFAULT_COUNTER_NAME;
use jsonapi_gen::errors::GeneratorError;
use jsonapi_gen::output::generate_and_write;
use jsonapi_gen::{Generator, GeneratorOptions, Package};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// jsonapi-gen - turns JSON:API OpenAPI documents into a Rust service package
#[derive(Parser, Debug)]
#[command(name = "jsonapi-gen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OpenAPI document to generate from (URL or file path)
    #[arg(short, long)]
    source: String,

    /// Name of the generated package (snake_case)
    #[arg(short = 'n', long)]
    package_name: String,

    /// Module path of the generated package [default: crate::<package-name>]
    #[arg(short = 'p', long)]
    package_path: Option<String>,

    /// File to write; the code is printed to stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Metric name the generated handlers increment
    #[arg(long, default_value = DEFAULT_COUNTER_NAME)]
    counter_name: String,

    /// Print generated code without writing files
    #[arg(long)]
    dry_run: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,jsonapi_gen=info,jsonapi_define=info".to_string(),
            2 => "info,jsonapi_gen=debug,jsonapi_define=debug".to_string(),
            _ => "debug,jsonapi_gen=trace,jsonapi_define=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn main() -> Result<(), GeneratorError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let package = match cli.package_path {
        Some(path) => Package::new(path, cli.package_name),
        None => Package::from_name(cli.package_name),
    };
    let generator = Generator::with_options(GeneratorOptions {
        counter_name: cli.counter_name,
    });

    if cli.verbose > 0 {
        eprintln!(
            "{} {} -> {}",
            "Generating".cyan().bold(),
            cli.source,
            package.path
        );
        if cli.dry_run {
            eprintln!("{}", "Dry run mode - no files will be written".yellow());
        }
    }

    generate_and_write(
        &generator,
        &cli.source,
        &package,
        cli.output.as_deref(),
        cli.dry_run,
    )?;

    if let Some(path) = &cli.output
        && !cli.dry_run
    {
        eprintln!("{} {}", "Generated".green().bold(), path.display());
    }

    Ok(())
}

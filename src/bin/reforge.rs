//! reforge: rewrite fields in JSON exam-question banks
//!
//! Usage:
//!   # Set YearAsked on every record
//!   reforge set -i "Physiologie Digestive (Février 2025).json" -o output.json \
//!       --value "Février 2025 (Normale)"
//!
//!   # Rename subtopics through a lookup table
//!   reforge rename -i bank.json -o updated.json \
//!       --map "La motricité gastrique=Motricité Gastrique" --table subtopics.json
//!
//!   # List the unique subtopics of a bank
//!   reforge collect -i bank.json
//!
//!   # Put record keys into the standard question layout
//!   reforge reorder -i bank.json -o reordered.json
//!
//!   # Re-encode a bank, repairing double-decoded UTF-8
//!   reforge clean -i bank.json -o cleaned_data.json --repair
//!
//!   # Run a rule described in a job file
//!   reforge run --config job.json

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use reforge::{
    document, CleanConfig, CleanReport, KeyOrder, RewriteRule, RunConfig, RunReport, Shape,
    UnknownKeys, DEFAULT_INDENT,
};
use serde_json::Value;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reforge")]
#[command(about = "Rewrite fields in JSON exam-question banks", long_about = None)]
struct Args {
    /// Log every rewritten value
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Output layout shared by the rewriting commands
#[derive(clap::Args, Debug)]
struct Layout {
    /// Spaces per indentation level in the output
    #[arg(long)]
    indent: Option<usize>,

    /// Required shape of the document root [default: records, array for reorder]
    #[arg(long, value_enum)]
    shape: Option<Shape>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set a field to the same value in every record
    Set {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Field to overwrite
        #[arg(short, long, default_value = "YearAsked")]
        key: String,

        /// New value (a string unless --json is given)
        #[arg(long)]
        value: String,

        /// Parse --value as a JSON literal
        #[arg(long)]
        json: bool,

        /// Do not write the output when nothing changed
        #[arg(long)]
        skip_unchanged: bool,

        #[command(flatten)]
        layout: Layout,
    },

    /// Rename a field's values through a lookup table
    Rename {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Field whose values are renamed
        #[arg(short, long, default_value = "Subtopic")]
        key: String,

        /// One OLD=NEW pair (repeatable)
        #[arg(short, long = "map", value_name = "OLD=NEW")]
        mappings: Vec<String>,

        /// JSON object of OLD: NEW pairs; --map entries take precedence
        #[arg(long, value_name = "FILE")]
        table: Option<PathBuf>,

        /// Do not write the output when nothing changed
        #[arg(long)]
        skip_unchanged: bool,

        #[command(flatten)]
        layout: Layout,
    },

    /// List the unique values of a field
    Collect {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Also write the sorted values as a JSON array
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(short, long, default_value = "Subtopic")]
        key: String,

        #[command(flatten)]
        layout: Layout,
    },

    /// Put record keys into a fixed order
    Reorder {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Comma-separated key order (default: the exam question layout)
        #[arg(long, value_delimiter = ',')]
        order: Option<Vec<String>>,

        /// Remove keys missing from the order instead of appending them
        #[arg(long)]
        drop_unknown: bool,

        #[command(flatten)]
        layout: Layout,
    },

    /// Re-encode a document with non-ASCII text written literally
    Clean {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Repair double-decoded UTF-8 such as "FÃ©vrier"
        #[arg(long)]
        repair: bool,

        #[arg(long, default_value_t = DEFAULT_INDENT)]
        indent: usize,
    },

    /// Run a rule described in a JSON job file
    Run {
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialise logger")?;

    match args.command {
        Command::Clean {
            input,
            output,
            repair,
            indent,
        } => {
            let config = CleanConfig {
                input,
                output,
                repair,
                indent,
            };
            let report = reforge::clean(&config)
                .with_context(|| format!("Cleaning {}", config.input.display()))?;
            print_clean_report(&report);
        }
        command => {
            let config = build_config(command)?;
            let report = reforge::run(&config)
                .with_context(|| format!("Processing {}", config.input.display()))?;
            print_report(&config, &report);
        }
    }

    Ok(())
}

/// Turn a rewriting subcommand into a run configuration
fn build_config(command: Command) -> Result<RunConfig> {
    let config = match command {
        Command::Set {
            input,
            output,
            key,
            value,
            json,
            skip_unchanged,
            layout,
        } => {
            let value = if json {
                serde_json::from_str::<Value>(&value)
                    .with_context(|| format!("--value is not JSON: {}", value))?
            } else {
                Value::String(value)
            };
            let mut config =
                RunConfig::new(input, key, RewriteRule::assign(value)).with_output(output);
            config.skip_unchanged = skip_unchanged;
            apply_layout(config, layout, DEFAULT_INDENT, Shape::Records)
        }
        Command::Rename {
            input,
            output,
            key,
            mappings,
            table,
            skip_unchanged,
            layout,
        } => {
            let mut entries = match table {
                Some(path) => document::load_table(&path)?,
                None => Default::default(),
            };
            for mapping in &mappings {
                let (old, new) = parse_mapping(mapping)?;
                entries.insert(old, Value::String(new));
            }
            if entries.is_empty() {
                return Err(anyhow!("rename needs at least one --map or a --table"));
            }

            let mut config = RunConfig::new(input, key, RewriteRule::Lookup { table: entries })
                .with_output(output);
            config.skip_unchanged = skip_unchanged;
            apply_layout(config, layout, DEFAULT_INDENT, Shape::Records)
        }
        Command::Collect {
            input,
            output,
            key,
            layout,
        } => {
            let mut config = RunConfig::new(input, key, RewriteRule::Collect);
            config.output = output;
            apply_layout(config, layout, DEFAULT_INDENT, Shape::Records)
        }
        Command::Reorder {
            input,
            output,
            order,
            drop_unknown,
            layout,
        } => {
            let order = order.map(KeyOrder::new).unwrap_or_default();
            let unknown = if drop_unknown {
                UnknownKeys::Drop
            } else {
                UnknownKeys::Append
            };
            // Every object is reordered, so no selection key
            let rule = RewriteRule::reorder(order, unknown);
            let config = RunConfig::new(input, String::new(), rule).with_output(output);
            // The reordered exports are a top-level list with two-space indentation
            apply_layout(config, layout, 2, Shape::Array)
        }
        Command::Run { config } => RunConfig::load(&config)
            .with_context(|| format!("Loading job file {}", config.display()))?,
        Command::Clean { .. } => {
            return Err(anyhow!("clean does not take a rewrite rule"));
        }
    };

    Ok(config)
}

fn apply_layout(
    mut config: RunConfig,
    layout: Layout,
    default_indent: usize,
    default_shape: Shape,
) -> RunConfig {
    config.indent = layout.indent.unwrap_or(default_indent);
    config.shape = layout.shape.unwrap_or(default_shape);
    config
}

/// Split `OLD=NEW` at the first '='
fn parse_mapping(mapping: &str) -> Result<(String, String)> {
    let (old, new) = mapping
        .split_once('=')
        .ok_or_else(|| anyhow!("--map expects OLD=NEW, got '{}'", mapping))?;
    Ok((old.to_string(), new.to_string()))
}

fn print_report(config: &RunConfig, report: &RunReport) {
    match &config.rule {
        RewriteRule::Collect => {
            if report.collected.is_empty() {
                println!("No '{}' values were found.", config.key);
            } else {
                println!("Unique '{}' values found in the file:", config.key);
                for value in &report.collected {
                    println!("- {}", value);
                }
            }
        }
        RewriteRule::Reorder { .. } => {
            println!(
                "{} of {} objects reordered ({} records)",
                report.changes, report.matched, report.records
            );
        }
        rule => {
            println!(
                "{} of {} '{}' entries updated ({} records, {} rule)",
                report.changes,
                report.matched,
                config.key,
                report.records,
                rule.name()
            );
            if !report.unmapped.is_empty() {
                println!("Values with no entry in the table:");
                for value in &report.unmapped {
                    println!("- {}", value);
                }
            }
        }
    }

    match (&report.output, report.written) {
        (Some(path), true) => println!("✓ Saved to {}", path.display()),
        (Some(path), false) => println!("Nothing to update, {} was not written", path.display()),
        (None, _) => {}
    }
}

fn print_clean_report(report: &CleanReport) {
    println!(
        "✓ Cleaned {} records from {} into {}",
        report.records,
        report.input.display(),
        report.output.display()
    );
    if report.repaired > 0 {
        println!("  {} garbled strings repaired", report.repaired);
    }
}

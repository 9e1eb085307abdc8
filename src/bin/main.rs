//! objmeta CLI - validate schemas and inspect derived metadata
//!
//! Usage:
//!   objmeta check [schema.json]
//!   objmeta layout [schema.json] [--object <name>] [--format json]
//!   objmeta query "<query>" [--from <Type> --related <Type>]
//!
//! Examples:
//!   objmeta check schema/objects.json
//!   objmeta layout schema/objects.json --object Order
//!   objmeta query "this.customerId = Customer.id" --from Order --related Customer

use ariadne::{Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use objmeta::compile::{check_schema, compile_file, compile_query, CompileError, CompileOptions};
use objmeta::config::Settings;
use objmeta::dsl::{Diagnostic, Severity};
use objmeta::model::RawSchema;
use objmeta::resolved::accessors::holder_initializer;
use objmeta::resolved::ResolvedObject;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "objmeta")]
#[command(about = "objmeta - resolve persistent object schemas into generation-ready metadata")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $OBJMETA_CONFIG, ./objmeta.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every validation pass and report errors and warnings
    Check {
        /// Schema manifest (.json or .toml); falls back to [schema].path
        file: Option<PathBuf>,
    },

    /// Compile a schema and print the derived layouts
    Layout {
        /// Schema manifest (.json or .toml); falls back to [schema].path
        file: Option<PathBuf>,

        /// Only show this object
        #[arg(short, long)]
        object: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Parse a relationship query and print its canonical and reverse forms
    Query {
        /// The query text
        query: String,

        /// Declaring object type
        #[arg(long)]
        from: Option<String>,

        /// Related object type
        #[arg(long)]
        related: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Full resolved model as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { file } => cmd_check(&settings, file),
        Commands::Layout { file, object, format } => cmd_layout(&settings, file, object, format),
        Commands::Query { query, from, related } => cmd_query(&query, from, related),
    }
}

fn schema_path(settings: &Settings, file: Option<PathBuf>) -> Option<PathBuf> {
    if file.is_some() {
        return file;
    }
    match settings.schema.resolved_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error resolving schema path: {}", e);
            None
        }
    }
}

fn cmd_check(settings: &Settings, file: Option<PathBuf>) -> ExitCode {
    let Some(file) = schema_path(settings, file) else {
        eprintln!("No schema file given and no [schema].path configured");
        return ExitCode::FAILURE;
    };
    let schema = match RawSchema::from_file(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading schema '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let objects = schema.objects.len();
    match check_schema(schema, CompileOptions::from(settings.generation.clone())) {
        Ok(warnings) => {
            for warning in &warnings {
                println!("warning: {}", warning);
            }
            println!("OK: {} objects in {} are valid", objects, file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_layout(settings: &Settings, file: Option<PathBuf>, object: Option<String>, format: OutputFormat) -> ExitCode {
    let Some(file) = schema_path(settings, file) else {
        eprintln!("No schema file given and no [schema].path configured");
        return ExitCode::FAILURE;
    };
    let model = match compile_file(&file, CompileOptions::from(settings.generation.clone())) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let objects: Vec<&ResolvedObject> = match &object {
        Some(name) => match model.object(name) {
            Some(o) => vec![o],
            None => {
                eprintln!("Object not found: {}", name);
                return ExitCode::FAILURE;
            }
        },
        None => model.objects().iter().collect(),
    };

    match format {
        OutputFormat::Json => {
            let json = match &object {
                Some(_) => serde_json::to_string_pretty(&objects),
                None => serde_json::to_string_pretty(&model),
            };
            match json {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Failed to serialize model: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        OutputFormat::Text => {
            for object in objects {
                print_layout(object);
            }
        }
    }
    ExitCode::SUCCESS
}

fn print_layout(object: &ResolvedObject) {
    println!("{} (table {})", object.qualified_name, object.table);
    for holder in &object.on_heap.holders {
        println!(
            "  {} {} = {} ({} bits)",
            holder.width.type_name(),
            holder.name,
            holder_initializer(holder),
            holder.bits_used
        );
    }
    for attr in &object.attributes {
        if let Some(check) = &attr.null_check {
            println!("    {}: {}", attr.attribute.name, check.test);
        }
        if let Some(check) = &attr.shadow_null_check {
            println!("    {} (shadow): {}", attr.attribute.name, check.test);
        }
    }
    if let Some(off_heap) = &object.off_heap {
        println!("  off-heap record: {} bytes", off_heap.size);
        for (name, slot) in &off_heap.slots {
            println!("    {:>4} +{:<3} {}", slot.offset, slot.size, name);
        }
    }
    for index in &object.physical_indices {
        println!(
            "  index {} ({}){}",
            index.name,
            index.columns.join(", "),
            if index.unique { " unique" } else { "" }
        );
    }
    for fk in &object.foreign_keys {
        println!("  foreign key {} -> {}", fk.name, fk.target_table);
    }
    println!();
}

fn cmd_query(query: &str, from: Option<String>, related: Option<String>) -> ExitCode {
    match compile_query(query, from.as_deref(), related.as_deref()) {
        Ok(output) => {
            render_diagnostics(query, &output.warnings);
            println!("{}", output.canonical);
            if let Some(reverse) = output.reverse {
                println!("reverse: {}", reverse);
            }
            ExitCode::SUCCESS
        }
        Err(CompileError::Parse { diagnostics, .. }) => {
            render_diagnostics(query, &diagnostics);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn render_diagnostics(query: &str, diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let report = Report::build(kind, ("query", diag.span.clone()))
            .with_message(&diag.message)
            .with_label(Label::new(("query", diag.span.clone())).with_message(&diag.message))
            .finish();
        if report.eprint(("query", Source::from(query))).is_err() {
            eprintln!("{}", diag);
        }
    }
}

//! CLI entry point for the komap mapper generator.
//!
//! Reads a type-model manifest, resolves every requested mapper and writes
//! the generated Kotlin sources.
//!
//! # Usage
//!
//! ```bash
//! komap [OPTIONS] <COMMAND>
//!
//! # Generate mapper sources
//! komap generate --manifest build/komap.json --output build/generated
//!
//! # Resolve without writing and print a summary
//! komap check --manifest build/komap.json --strict
//!
//! # Show how each parameter of matching mappers is resolved
//! komap explain --manifest build/komap.json --filter ApiUser
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::eyre;
use km_core::{Config, Manifest, Resolution};
use km_emit::{Emitter, file_stem, render_expr};
use km_engine::{BuildPass, EngineError, MapperUnit, PassOutput, StatsSnapshot};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Build-time generator of Kotlin mapping functions.
///
/// Resolves, for every target parameter of every declared mapping, the
/// expression that produces its value and emits the mapper sources.
#[derive(Parser)]
#[command(name = "komap", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to the type-model manifest.
    #[arg(short, long, global = true, env = "KOMAP_MANIFEST", default_value = "komap.json")]
    manifest: Utf8PathBuf,

    /// Path to a JSON configuration file.
    #[arg(short, long, global = true, env = "KOMAP_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Report parameters with no conversion path as errors.
    #[arg(long, global = true)]
    strict: bool,

    /// Resolve mapping specs on a single thread.
    #[arg(long, global = true)]
    sequential: bool,

    /// Maximum number of parallel resolution jobs.
    #[arg(short, long, global = true, env = "KOMAP_JOBS")]
    jobs: Option<usize>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve every mapping and write the generated sources.
    Generate {
        /// Output directory (overrides `emit.output_dir`).
        #[arg(short, long, env = "KOMAP_OUTPUT_DIR")]
        output: Option<Utf8PathBuf>,

        /// Render files without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve every mapping and print a summary; fails if any mapping fails.
    Check {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the resolution of every parameter of matching mappers.
    Explain {
        /// Only mappers whose source or target name contains this text.
        #[arg(long)]
        filter: Option<String>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Report output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// JSON format.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(level)
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the configuration file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be loaded or the
/// resulting configuration is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if cli.strict {
        config.engine.strict_fallback = true;
    }
    if cli.sequential {
        config.engine.parallel = false;
    }
    if let Some(jobs) = cli.jobs {
        config.engine.max_parallel_jobs = Some(jobs);
    }
    if let Commands::Generate {
        output: Some(output),
        ..
    } = &cli.command
    {
        config.emit.output_dir.clone_from(output);
    }

    config.validate()?;
    Ok(config)
}

/// Loads the manifest named on the command line.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read, parsed or linked.
fn load_manifest(cli: &Cli) -> color_eyre::Result<Manifest> {
    if !cli.manifest.exists() {
        return Err(eyre!("Manifest does not exist: {}", cli.manifest));
    }
    let manifest = Manifest::from_file(&cli.manifest)?;
    info!(
        path = %cli.manifest,
        types = manifest.type_count(),
        mappings = manifest.declarations.mappings.len(),
        "Loaded manifest"
    );
    Ok(manifest)
}

/// Runs the build pass over a manifest.
///
/// # Errors
///
/// Returns an error listing every diagnostic if registration aborts.
fn run_pass(manifest: &Manifest, config: &Config) -> color_eyre::Result<PassOutput> {
    match BuildPass::new(manifest, &manifest.declarations, config.engine) {
        Ok(pass) => Ok(pass.run()),
        Err(e) => {
            let diagnostics = e.into_diagnostics();
            print_errors(&diagnostics);
            Err(eyre!(
                "Build pass aborted with {} provider error(s)",
                diagnostics.len()
            ))
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Resolves every mapping and writes the generated files.
///
/// Nothing is written if any mapping fails.
///
/// # Errors
///
/// Returns an error if the pass fails or files cannot be written.
fn run_generate(manifest: &Manifest, config: Config, dry_run: bool) -> color_eyre::Result<()> {
    let output = run_pass(manifest, &config)?;
    if !output.is_success() {
        print_errors(&output.errors);
        return Err(eyre!("{} mapping(s) failed; nothing written", output.errors.len()));
    }

    let emitter = Emitter::new(config.emit);
    let files = emitter.render_all(&output.units)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if dry_run {
        for file in &files {
            writeln!(handle, "{}", emitter.config().output_dir.join(&file.path))?;
        }
        return Ok(());
    }

    let summary = emitter.write(&files)?;
    writeln!(
        handle,
        "Generated {} mapper(s): {} written, {} unchanged",
        files.len(),
        summary.written.len(),
        summary.unchanged.len()
    )?;
    Ok(())
}

/// Resolves every mapping and prints a summary.
///
/// # Errors
///
/// Returns an error if any mapping fails.
fn run_check(manifest: &Manifest, config: &Config, format: OutputFormat) -> color_eyre::Result<()> {
    let output = run_pass(manifest, config)?;

    match format {
        OutputFormat::Text => {
            print_stats_summary(&output.stats);
            print_errors(&output.errors);
        }
        OutputFormat::Json => {
            let content = generate_json_check(&output)?;
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{content}")?;
        }
    }

    if output.is_success() {
        Ok(())
    } else {
        Err(eyre!("{} mapping(s) failed", output.errors.len()))
    }
}

/// Prints the per-parameter resolution of matching mappers.
///
/// # Errors
///
/// Returns an error if the pass aborts or output cannot be written.
fn run_explain(
    manifest: &Manifest,
    config: &Config,
    filter: Option<&str>,
    format: OutputFormat,
) -> color_eyre::Result<()> {
    let output = run_pass(manifest, config)?;
    let units: Vec<&MapperUnit> = output
        .units
        .iter()
        .filter(|unit| {
            filter.is_none_or(|f| unit.source.name.contains(f) || unit.target.name.contains(f))
        })
        .collect();

    let content = match format {
        OutputFormat::Text => units.iter().map(|unit| format_unit(unit)).collect::<String>(),
        OutputFormat::Json => serde_json::to_string_pretty(&units)
            .map_err(|e| eyre!("Failed to serialize JSON: {}", e))?,
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{content}")?;
    if matches!(format, OutputFormat::Json) {
        writeln!(handle)?;
    }
    print_errors(&output.errors);
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a summary of pass statistics.
fn print_stats_summary(stats: &StatsSnapshot) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Mapping Summary");
    let _ = writeln!(handle, "===============");
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Mapping specs:      {}", stats.specs);
    let _ = writeln!(handle, "  Mappers:          {}", stats.mappers);
    let _ = writeln!(handle, "  Failed:           {}", stats.errors);
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Parameters:         {}", stats.params());
    let _ = writeln!(handle, "  Direct:           {}", stats.direct);
    let _ = writeln!(handle, "  Converted:        {}", stats.converted);
    let _ = writeln!(handle, "  Caller-supplied:  {}", stats.missing);
    let _ = writeln!(handle, "  Defaulted:        {}", stats.omitted);
    let _ = writeln!(
        handle,
        "  Fallbacks:        {} (unchecked direct reads)",
        stats.fallbacks
    );
    let _ = writeln!(handle);
    let _ = writeln!(
        handle,
        "Automatic coverage: {:.1}%",
        stats.coverage_percent()
    );
}

/// Prints diagnostics to stderr.
fn print_errors(errors: &[EngineError]) {
    if errors.is_empty() {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Errors ({}):", errors.len());
    for error in errors {
        match error.site() {
            Some(site) => {
                let _ = writeln!(handle, "  {site} - {error}");
            }
            None => {
                let _ = writeln!(handle, "  {error}");
            }
        }
    }
}

/// Generates the JSON check report.
fn generate_json_check(output: &PassOutput) -> color_eyre::Result<String> {
    #[derive(serde::Serialize)]
    struct Report<'a> {
        success: bool,
        stats: &'a StatsSnapshot,
        errors: Vec<String>,
    }

    let report = Report {
        success: output.is_success(),
        stats: &output.stats,
        errors: output.errors.iter().map(ToString::to_string).collect(),
    };
    serde_json::to_string_pretty(&report).map_err(|e| eyre!("Failed to serialize JSON: {}", e))
}

/// Formats one unit as a parameter table.
fn format_unit(unit: &MapperUnit) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} ({} -> {}, via {})",
        file_stem(unit),
        unit.source,
        unit.target,
        unit.callee.display_name()
    );

    let rows: Vec<(&str, &str, String)> = unit
        .params
        .iter()
        .map(|p| (p.name(), p.resolution.label(), describe_resolution(&p.resolution)))
        .collect();
    let name_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    let label_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0);
    for (name, label, detail) in &rows {
        let _ = writeln!(output, "  {name:<name_width$}  {label:<label_width$}  {detail}");
    }
    if unit.has_default_overloads() {
        let _ = writeln!(output, "  (overloads without defaultable parameters generated)");
    }
    output.push('\n');
    output
}

/// The detail column of the parameter table.
fn describe_resolution(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Direct { expr } | Resolution::Converted { expr, .. } => render_expr(expr),
        Resolution::Missing {
            has_default: true, ..
        } => "caller-supplied (has default)".to_owned(),
        Resolution::Missing { .. } => "caller-supplied".to_owned(),
        Resolution::Omitted => "target default".to_owned(),
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load configuration and the manifest
    let config = build_config(&cli)?;
    let manifest = load_manifest(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Generate { dry_run, .. } => run_generate(&manifest, config, *dry_run),
        Commands::Check { format } => run_check(&manifest, &config, *format),
        Commands::Explain { filter, format } => {
            run_explain(&manifest, &config, filter.as_deref(), *format)
        }
    }
}

#[cfg(test)]
mod tests {
    use km_core::{EngineConfig, FieldDescriptor, MappingDecl, RenameDirective, TypeDecl, TypeRef};

    use super::*;

    fn manifest() -> Manifest {
        Manifest::default()
            .with_type(
                TypeDecl::new("com.acme.ApiUser")
                    .with_field(FieldDescriptor::new("userId", TypeRef::new("kotlin.Long"))),
            )
            .with_type(
                TypeDecl::new("com.acme.User")
                    .with_field(
                        FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))
                            .with_rename(RenameDirective::new("userId")),
                    )
                    .with_field(FieldDescriptor::new("role", TypeRef::new("kotlin.String"))),
            )
            .with_mapping(MappingDecl::on_class("com.acme.User").from_type("com.acme.ApiUser"))
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "komap",
            "--strict",
            "--sequential",
            "--jobs",
            "2",
            "generate",
            "--output",
            "out/kotlin",
        ]);
        let config = build_config(&cli).unwrap();
        assert!(config.engine.strict_fallback);
        assert!(!config.engine.parallel);
        assert_eq!(config.engine.max_parallel_jobs, Some(2));
        assert_eq!(config.emit.output_dir, "out/kotlin");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["komap", "--jobs", "0", "check"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_format_unit_lists_every_parameter() {
        let manifest = manifest();
        let pass = BuildPass::new(&manifest, &manifest.declarations, EngineConfig::default()).unwrap();
        let output = pass.run();
        let text = format_unit(&output.units[0]);

        assert!(text.starts_with("UserMapperFromApiUser (com.acme.ApiUser -> com.acme.User"));
        assert!(text.contains("id    direct   this.userId"));
        assert!(text.contains("role  missing  caller-supplied"));
    }

    #[test]
    fn test_json_check_report() {
        let manifest = manifest();
        let config = Config::default();
        let output = run_pass(&manifest, &config).unwrap();
        let json: serde_json::Value = serde_json::from_str(&generate_json_check(&output).unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["stats"]["mappers"], 1);
        assert_eq!(json["stats"]["missing"], 1);
    }
}

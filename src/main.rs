//! CLI entry point for `mhtconv`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use mhtconv::config::Config;
use mhtconv::convert::convert;
use mhtconv::export::html::{write_result, WrittenOutput};
use mhtconv::export::report::{report_path, write_report, ConversionReport};
use mhtconv::input::{self, InputFile};
use mhtconv::model::output::{ConversionWarning, ConvertOptions};

#[derive(Parser)]
#[command(
    name = "mhtconv",
    version,
    about = "Convert MHTML web archives into standalone HTML files",
    long_about = "Convert MHTML web archives (.mht/.mhtml) into standalone HTML files.\n\n\
        Images are extracted next to the HTML (or inlined with --embed-images) and \
        oversized pages are split into self-contained chunks."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// MHTML file or directory to convert (default: current directory)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum size of one HTML file in MB
    #[arg(short = 's', long, value_name = "MB")]
    split_size: Option<usize>,

    /// Never split the HTML
    #[arg(long)]
    no_split: bool,

    /// Leave resource references untouched
    #[arg(long)]
    no_images: bool,

    /// Inline images as data URIs instead of extracting them
    #[arg(long, conflicts_with = "no_images")]
    embed_images: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write a JSON report per file and list extracted resources
    #[arg(long)]
    debug: bool,

    /// Number of files converted in parallel (0 = one per CPU)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Config {
        /// Write it to the configuration file
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = mhtconv::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    apply_overrides(&cli, &mut config);

    match cli.command {
        Some(Commands::Config { save }) => cmd_config(&config, save),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => cmd_convert(cli.input.as_deref(), &config, cli.debug),
    }
}

/// Command-line flags take precedence over the configuration file.
fn apply_overrides(cli: &Cli, config: &mut Config) {
    let convert = &mut config.convert;
    if let Some(dir) = &cli.output {
        convert.output_dir = dir.clone();
    }
    if let Some(mb) = cli.split_size {
        convert.split_size_mb = mb;
    }
    if cli.no_split {
        convert.split = false;
    }
    if cli.no_images {
        convert.process_images = false;
    }
    if cli.embed_images {
        convert.embed_images = true;
    }
    if let Some(jobs) = cli.jobs {
        config.performance.jobs = jobs;
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = mhtconv::config::log_file_path(config);
    let log_dir = mhtconv::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_name = log_path.file_name().unwrap_or_default();
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Print the effective configuration, optionally saving it.
fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        mhtconv::config::save_config(config)?;
        if let Some(path) = mhtconv::config::config_file_path() {
            eprintln!("  Saved to {}", path.display());
        }
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mhtconv", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// What a successful conversion of one file produced.
struct FileOutcome {
    written: WrittenOutput,
    /// `(reference, written path)` for every extracted file.
    extracted: Vec<(String, PathBuf)>,
    missing: Vec<String>,
    warnings: Vec<ConversionWarning>,
    elapsed: Duration,
    report: Option<PathBuf>,
}

/// Convert every input, in parallel across files.
fn cmd_convert(input: Option<&Path>, config: &Config, debug: bool) -> anyhow::Result<()> {
    let inputs = input::resolve_inputs(input)?;
    if inputs.is_empty() {
        let dir = input.unwrap_or(Path::new("."));
        anyhow::bail!("No .mht or .mhtml files found in {}", dir.display());
    }

    let options = ConvertOptions::from_config(&config.convert);
    let output_dir = config.convert.output_dir.as_path();
    tracing::info!(
        files = inputs.len(),
        output = %output_dir.display(),
        split = ?options.split_size_bytes,
        "Starting conversion"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.performance.jobs)
        .build()?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Converting [{bar:40.cyan/blue}] {pos}/{len} files")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let outcomes: Vec<anyhow::Result<FileOutcome>> = pool.install(|| {
        inputs
            .par_iter()
            .map(|path| {
                let outcome = convert_file(path, &options, output_dir, debug);
                pb.inc(1);
                outcome
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut failed = 0;
    for (path, outcome) in inputs.iter().zip(&outcomes) {
        match outcome {
            Ok(outcome) => print_file_summary(path, outcome, debug),
            Err(e) => {
                failed += 1;
                tracing::error!(path = %path.display(), error = %e, "Conversion failed");
                println!();
                println!("  {} FAILED: {e:#}", path.display());
            }
        }
    }

    println!();
    println!("  {:<25} {}", "Files converted", inputs.len() - failed);
    if failed > 0 {
        println!("  {:<25} {}", "Files failed", failed);
    }
    println!("  {:<25} {:.2?}", "Total time", start.elapsed());
    println!("  {:<25} {}", "Output directory", output_dir.display());
    println!();

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) could not be converted", inputs.len());
    }
    Ok(())
}

/// Read, convert and persist one archive.
fn convert_file(
    path: &Path,
    options: &ConvertOptions,
    output_dir: &Path,
    debug: bool,
) -> anyhow::Result<FileOutcome> {
    let start = Instant::now();
    let input = InputFile::open(path)?;
    let base = input::base_name(path)?;

    let result = convert(&input, options)?;
    let written = write_result(&result, &base, output_dir)?;
    let elapsed = start.elapsed();

    let report = if debug {
        let report = ConversionReport::new(path, &result, &written, elapsed.as_millis() as u64);
        let report_file = report_path(output_dir, &base);
        write_report(&report, &report_file)?;
        Some(report_file)
    } else {
        None
    };

    let extracted = result
        .extracted_files
        .iter()
        .zip(&written.extracted)
        .map(|(file, out)| (file.reference.clone(), out.path.clone()))
        .collect();

    Ok(FileOutcome {
        written,
        extracted,
        missing: result.missing_references,
        warnings: result.warnings,
        elapsed,
        report,
    })
}

fn print_file_summary(path: &Path, outcome: &FileOutcome, debug: bool) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {}", path.display());
    for file in &outcome.written.html {
        println!(
            "  {:<25} {} ({})",
            "HTML",
            file.path.display(),
            format_size(file.bytes, BINARY)
        );
    }
    if !outcome.written.extracted.is_empty() {
        let bytes: u64 = outcome.written.extracted.iter().map(|f| f.bytes).sum();
        println!(
            "  {:<25} {} ({})",
            "Extracted files",
            outcome.written.extracted.len(),
            format_size(bytes, BINARY)
        );
    }
    if debug {
        for (reference, written) in &outcome.extracted {
            println!("    {reference} -> {}", written.display());
        }
    }
    if !outcome.missing.is_empty() {
        println!("  {:<25} {}", "Missing images", outcome.missing.len());
        for reference in &outcome.missing {
            println!("    {reference}");
        }
    }
    for warning in &outcome.warnings {
        println!("  {:<25} {warning}", "Warning");
    }
    if let Some(report) = &outcome.report {
        println!("  {:<25} {}", "Report", report.display());
    }
    println!(
        "  {:<25} {}",
        "Total written",
        format_size(outcome.written.total_bytes(), BINARY)
    );
    println!("  {:<25} {:.2?}", "Time", outcome.elapsed);
}

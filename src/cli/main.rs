use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use exif_remover::codec::{self, MetadataReport};
use exif_remover::config::{self, ConflictRule, StripMode};
use exif_remover::notice::{self, Notice, NoticeLevel};
use exif_remover::pipeline::{self, BatchOptions, ItemOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "exif-remover",
    version,
    about = "Strip EXIF, GPS, XMP, IPTC and other metadata from images, writing clean copies"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Directory the cleaned copies are written to (must exist)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Restore the output settings (suffix, conflict rule) to their defaults and exit
    #[arg(long = "reset-output")]
    reset_output: bool,

    /// Suffix appended to each cleaned file name (may be empty)
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    suffix: Option<String>,

    /// What to do when the output file exists: append-index, overwrite, skip
    #[arg(long, value_name = "RULE")]
    conflict: Option<ConflictRule>,

    /// lossless (drop metadata blocks, keep pixel data) or reencode
    #[arg(long, value_name = "MODE")]
    mode: Option<StripMode>,

    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// No progress bar or summary
    #[arg(short, long)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display the metadata each image carries and exit
    #[arg(long = "show-metadata")]
    show_metadata: bool,

    /// Parse a notice document and print the banner it describes
    #[arg(long, value_name = "FILE")]
    notice: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        println!("Default config written to {}", config_location(path)?.display());
        return Ok(());
    }

    // Handle --reset-output
    if cli.reset_output {
        let path = cli.config.as_deref();
        let mut config = config::Config::load(path)?;
        config.reset_output();
        config.save(path)?;
        println!(
            "Output settings reset to suffix '{}', rule {} in {}",
            config.output.suffix,
            config.output.conflict_rule,
            config_location(path)?.display()
        );
        return Ok(());
    }

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;

    // Handle --notice
    if let Some(ref path) = cli.notice {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read notice file {}", path.display()))?;
        print_notice(&notice::parse_notice(&text, &config.notice));
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Collect images
    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --show-metadata
    if cli.show_metadata {
        let mut reports = Vec::new();
        for image in &images {
            match codec::read_metadata(image.path()) {
                Ok(report) if cli.json => reports.push(serde_json::json!({
                    "path": image.path().display().to_string(),
                    "metadata": report,
                })),
                Ok(report) => print_metadata(image.path(), &report),
                Err(e) => log::error!("Failed to read {}: {e:#}", image.path().display()),
            }
        }
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        return Ok(());
    }

    let output_dir = cli
        .output
        .clone()
        .context("No output directory specified. Use --output DIR.")?;

    // CLI flags override the config file for this run only
    if let Some(suffix) = cli.suffix.clone() {
        config.output.suffix = suffix;
    }
    if let Some(rule) = cli.conflict {
        config.output.conflict_rule = rule;
    }
    if let Some(mode) = cli.mode {
        config.processing.mode = mode;
    }
    if let Some(jobs) = cli.jobs {
        config.processing.jobs = jobs;
    }

    log::info!("Found {} image(s) to process", images.len());

    let bar = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(images.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        bar
    };

    let items = Arc::new(Mutex::new(Vec::new()));
    let options = {
        let bar = bar.clone();
        let items = Arc::clone(&items);
        let collect = cli.json;
        BatchOptions::from_config(&config).with_progress(move |p| {
            bar.set_message(file_name(p.image.path()));
            bar.set_position(p.completed as u64);
            if collect {
                let entry = item_json(p.image.path(), p.outcome);
                items.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
            }
        })
    };

    let result = pipeline::spawn_batch(images, output_dir, config.output.clone(), options)
        .await
        .context("Batch worker panicked")??;
    bar.finish_and_clear();

    if cli.json {
        let items = std::mem::take(&mut *items.lock().unwrap_or_else(|e| e.into_inner()));
        let out = serde_json::json!({ "result": result, "items": items });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !cli.quiet {
        println!(
            "{GREEN}{}{RESET} cleaned, {DIM}{}{RESET} skipped, {RED}{}{RESET} failed out of {} images",
            result.success_count,
            result.skipped_count,
            result.failure_count,
            result.total()
        );
    }

    if result.failure_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn config_location(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => config::Config::config_path(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One entry of the `--json` item list.
fn item_json(input: &Path, outcome: &ItemOutcome) -> serde_json::Value {
    let (status, output, error) = match outcome {
        ItemOutcome::Success(out) => ("success", Some(out), None),
        ItemOutcome::Skipped(out) => ("skipped", Some(out), None),
        ItemOutcome::Failed(e) => ("failed", None, Some(e)),
    };
    serde_json::json!({
        "path": input.display().to_string(),
        "status": status,
        "output": output.map(|p| p.display().to_string()),
        "error": error.map(|e| e.to_string()),
        "errorKind": error.map(|e| e.kind()),
    })
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print what metadata a file carries.
fn print_metadata(path: &Path, report: &MetadataReport) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    if let Some(format) = report.format {
        print_row("Format", &format!("{format} ({})", format.mime_type()));
    }
    if let Some((w, h)) = report.dimensions {
        print_row("ImageSize", &format!("{w} x {h}"));
    }
    print_row("ColorProfile", if report.has_icc_profile { "ICC (kept)" } else { "none" });

    if let Some(ref make) = report.make {
        print_row("Make", make);
    }
    if let Some(ref model) = report.model {
        print_row("Model", model);
    }
    if report.has_gps {
        if let Some(lat) = report.gps_latitude {
            print_row("GPSLatitude", &format!("{lat:.6}"));
        }
        if let Some(lon) = report.gps_longitude {
            print_row("GPSLongitude", &format!("{lon:.6}"));
        }
    }

    println!("  {DIM}{}{RESET}", "─".repeat(70));
    if report.is_clean() {
        println!("  {GREEN}(no metadata found){RESET}");
    } else {
        let blocks: Vec<String> = report.blocks.iter().map(|k| k.to_string()).collect();
        println!("  {YELLOW}{:<22} : {}{RESET}", "Metadata", blocks.join(", "));
    }
    println!();
}

/// Print a notice banner, or a note that there is none.
fn print_notice(notice: &Notice) {
    let Some(banner) = notice.banner() else {
        println!("{DIM}(no notice){RESET}");
        return;
    };

    let color = match banner.level {
        NoticeLevel::Info => GREEN,
        NoticeLevel::Warning => YELLOW,
        NoticeLevel::Critical => RED,
    };
    println!();
    if let Some(ref title) = banner.title {
        println!("{color}{BOLD}{title}{RESET}");
    }
    for line in wrap_text(&banner.message, VAL_WIDTH + 24) {
        println!("{color}{line}{RESET}");
    }
    if let Some(ref link) = banner.link {
        println!("{DIM}{link}{RESET}");
    }
    println!();
}

/// Print a single row in the metadata display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

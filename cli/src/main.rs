//! reducepdf CLI - shrink the PDFs stored in a cloud bucket

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use reducepdf::compress::DEFAULT_QUALITY;
use reducepdf::pipeline::DEFAULT_CONCURRENCY;
use reducepdf::sink::DEFAULT_OUTPUT_DIR;
use reducepdf::{
    compress_file, BucketObject, CompressionPolicy, Document, LocalLayout, ObjectOutcome,
    ObjectStoreBucket, OutcomeStatus, OutputTarget, Pipeline, PipelineObserver, PipelineOptions,
    RunReport, Stage, Treatment,
};

/// Exit status when every object succeeded.
const EXIT_OK: i32 = 0;
/// Exit status when some objects failed or the listing broke off.
const EXIT_PARTIAL: i32 = 1;
/// Exit status for fatal errors.
const EXIT_FATAL: i32 = 2;
/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "reducepdf")]
#[command(version)]
#[command(about = "Shrink the PDFs stored in a cloud bucket", long_about = None)]
struct Cli {
    /// Bucket to process
    #[arg(value_name = "BUCKET")]
    bucket: Option<String>,

    /// Store compressed files locally instead of overwriting the bucket
    #[arg(short, long)]
    store: bool,

    /// Increase verbosity (-v info, -vv debug); failing objects are printed
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    run: RunArgs,

    #[command(flatten)]
    policy: PolicyArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct RunArgs {
    /// Local output directory (with --store)
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Write every file into the output directory, folders joined with '_'
    #[arg(long)]
    flatten: bool,

    /// Documents processed at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Skip objects larger than this many MiB (0 = no limit)
    #[arg(long, value_name = "MB", default_value_t = 256)]
    max_size_mb: u64,

    /// Only process keys under this prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Process at most this many documents
    #[arg(long)]
    limit: Option<usize>,

    /// Upload to the bucket even when a document could not be shrunk
    #[arg(long)]
    force_upload: bool,

    /// Service account JSON file
    #[arg(long, value_name = "FILE", env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Append log output to a file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Args)]
struct PolicyArgs {
    /// JPEG quality (1-100)
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    quality: u8,

    /// Downsample images whose longest edge exceeds this many pixels
    #[arg(long, value_name = "PX", global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_dimension: Option<u32>,

    /// Leave unfiltered non-image streams uncompressed
    #[arg(long, global = true)]
    no_stream_compression: bool,
}

impl PolicyArgs {
    fn policy(&self) -> CompressionPolicy {
        let mut policy = CompressionPolicy::new()
            .with_quality(self.quality)
            .with_stream_compression(!self.no_stream_compression);
        if let Some(max) = self.max_dimension {
            policy = policy.with_max_dimension(max);
        }
        policy
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a local PDF file
    Compress {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <FILE stem>.reduced.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the images of a local PDF and how they would be treated
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.run.log_file.as_deref()) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(EXIT_FATAL);
    }

    let result = match &cli.command {
        Some(Commands::Compress { input, output }) => {
            cmd_compress(input, output.as_deref(), &cli.policy).map(|_| EXIT_OK)
        }
        Some(Commands::Info { input }) => cmd_info(input).map(|_| EXIT_OK),
        Some(Commands::Version) => {
            cmd_version();
            Ok(EXIT_OK)
        }
        None => match &cli.bucket {
            Some(bucket) => cmd_run(bucket, &cli),
            None => {
                println!("{}", "Usage: reducepdf <BUCKET> [-s] [-v]".yellow());
                println!("       reducepdf --help for more information");
                Ok(EXIT_FATAL)
            }
        },
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    if let Some(path) = log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

/// Drives the spinner from pipeline events.
struct ProgressObserver {
    pb: ProgressBar,
    verbose: bool,
}

impl PipelineObserver for ProgressObserver {
    fn on_discovered(&self, _object: &BucketObject) {
        self.pb.inc_length(1);
    }

    fn on_stage(&self, object: &BucketObject, stage: Stage) {
        if stage != Stage::Done {
            self.pb.set_message(format!("{} {}", stage, object.key));
        }
    }

    fn on_finished(&self, outcome: &ObjectOutcome) {
        self.pb.inc(1);
        if let OutcomeStatus::Failure { stage, reason, .. } = &outcome.status {
            if self.verbose {
                self.pb.println(format!(
                    "{} {} ({}): {}",
                    "Failed".red(),
                    outcome.object.key,
                    stage,
                    reason
                ));
            }
        }
    }
}

fn cmd_run(bucket_name: &str, cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let args = &cli.run;
    let target = if cli.store {
        OutputTarget::LocalPath {
            root: args.output_dir.clone(),
            layout: if args.flatten {
                LocalLayout::Flatten
            } else {
                LocalLayout::Mirror
            },
        }
    } else {
        OutputTarget::BucketOverwrite
    };

    let mut options = PipelineOptions::new()
        .with_concurrency(args.concurrency)
        .with_max_object_size(max_object_size(args.max_size_mb))
        .with_skip_unchanged(!args.force_upload);
    if let Some(prefix) = &args.prefix {
        options = options.with_prefix(prefix.clone());
    }
    if let Some(limit) = args.limit {
        options = options.with_limit(limit);
    }

    if target.is_destructive() {
        println!(
            "{} objects in gs://{} will be overwritten",
            "Warning:".yellow().bold(),
            bucket_name
        );
    }

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let bucket = Arc::new(ObjectStoreBucket::gcs(
            bucket_name,
            args.credentials.as_deref(),
        )?);

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{pos}/{len}] {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(120));

        let observer = Arc::new(ProgressObserver {
            pb: pb.clone(),
            verbose: cli.verbose > 0,
        });
        let pipeline = Pipeline::new(bucket, target, cli.policy.policy(), options)?
            .with_observer(observer);

        let token = pipeline.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        let report = pipeline.run().await;
        pb.finish_and_clear();
        let report = report?;

        print_summary(&report, cli.verbose > 0);
        if let Some(path) = &args.report {
            write_report(path, &report)?;
            println!("{} {}", "Report saved to".green(), path.display());
        }

        Ok::<i32, Box<dyn std::error::Error>>(exit_code(&report))
    })
}

fn exit_code(report: &RunReport) -> i32 {
    if report.cancelled {
        EXIT_INTERRUPTED
    } else if report.is_success() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

fn write_report(path: &Path, report: &RunReport) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

fn print_summary(report: &RunReport, verbose: bool) {
    let summary = &report.summary;

    println!("{}", "Run Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Bucket".bold(), report.bucket);
    println!("{}: {}", "Processed".bold(), summary.total);
    println!(
        "{}: {}",
        "Succeeded".bold(),
        summary.succeeded.to_string().green()
    );
    if summary.unchanged > 0 {
        println!("{}: {}", "Unchanged".bold(), summary.unchanged);
    }
    if summary.failed > 0 {
        println!("{}: {}", "Failed".bold(), summary.failed.to_string().red());
    }
    println!(
        "{}: {} -> {} ({} saved)",
        "Size".bold(),
        format_bytes(summary.bytes_before),
        format_bytes(summary.bytes_after),
        format_bytes(summary.bytes_saved())
    );
    println!(
        "{}: {:.1}s",
        "Duration".bold(),
        report.duration().num_milliseconds() as f64 / 1000.0
    );

    if verbose && summary.failed > 0 {
        println!();
        println!("{}", "Failures".red().bold());
        for outcome in report.failures() {
            if let OutcomeStatus::Failure {
                stage, kind, reason, ..
            } = &outcome.status
            {
                println!(
                    "  {} {} [{} at {}]: {}",
                    "✗".red(),
                    outcome.object.key,
                    kind,
                    stage,
                    reason
                );
            }
        }
    }

    if let Some(error) = &report.listing_error {
        println!("{} {}", "Listing stopped early:".red().bold(), error);
    }
    if report.cancelled {
        println!("{}", "Interrupted; remaining objects were not processed".yellow());
    }
}

fn cmd_compress(
    input: &Path,
    output: Option<&Path>,
    policy: &PolicyArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        input.with_file_name(format!("{}.reduced.pdf", stem))
    });

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Compressing {}...", input.display()));
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let result = compress_file(input, &policy.policy());
    pb.finish_and_clear();
    let compressed = result?;

    fs::write(&output, &compressed.bytes)?;

    let stats = &compressed.stats;
    println!("{} {}", "Saved to".green(), output.display());
    println!(
        "  {} {} -> {} ({:.0}%)",
        "├─".dimmed(),
        format_bytes(stats.bytes_before),
        format_bytes(stats.bytes_after),
        stats.ratio() * 100.0
    );
    println!(
        "  {} {} of {} images recompressed, {} downsampled",
        "└─".dimmed(),
        stats.images_recompressed,
        stats.images_found,
        stats.images_downsampled
    );

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let doc = Document::load(&data)?;
    let images = doc.images();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.version());
    println!("{}: {}", "Size".bold(), format_bytes(data.len() as u64));
    println!("{}: {}", "Pages".bold(), doc.page_count());
    println!("{}: {}", "Images".bold(), images.len());

    if images.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "Images".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for image in images {
        let treatment = match Treatment::for_image(image) {
            Treatment::Lossy => "jpeg".green(),
            Treatment::Lossless => "deflate".yellow(),
            Treatment::Keep => "keep".dimmed(),
        };
        println!(
            "  p{} {} {}x{} {}bpc {:?} {:?} {} [{}]",
            image.page,
            image.name.bold(),
            image.width,
            image.height,
            image.bits_per_component,
            image.color,
            image.encoding,
            format_bytes(image.encoded_len as u64),
            treatment
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "reducepdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF image recompression for cloud buckets");
    println!();
    println!("License: MIT");
}

/// Size threshold in bytes for `--max-size-mb`; 0 means no limit.
fn max_object_size(mb: u64) -> Option<u64> {
    match mb {
        0 => None,
        mb => Some(mb.saturating_mul(1024 * 1024)),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

use bytefit::config::{self, Config};
use bytefit::imaging::{ByteSize, OutputFormat, QualityRange, RustBackend, SearchParams};
use bytefit::process::{self, ProcessConfig};
use bytefit::{logging, output, presets, scan};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bytefit", version)]
#[command(about = "Compress images to fit a byte budget")]
#[command(long_about = "\
Compress images to fit a byte budget

For every input image, bytefit binary-searches the encoder's quality scale
for the highest quality whose output still fits the target size. Images that
can't fit even at the lowest quality are copied unchanged (or rejected with
--strict).

Sizes are written like 150kb, 1.5mb or 20000 (bytes), or as a preset name
(see 'bytefit presets'). 1kb is 1024 bytes.

Output layout:

  compressed/
  ├── .cache-manifest.json     # Skips unchanged images on the next run
  ├── report.json              # Per-image quality and sizes
  ├── dawn-100kb.jpg           # Fitted: <stem>-<target>.<format>
  └── scan-100kb.png           # Kept original: <stem>-<target>.<own ext>

Run 'bytefit gen-config' to generate a documented bytefit.toml.")]
struct Cli {
    /// Config file; stock defaults apply when it doesn't exist
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// More diagnostics on stderr (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CompressArgs {
    /// Image files or directories (walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Byte budget per image: a size (150kb, 1.5mb) or a preset name
    #[arg(short, long)]
    target: Option<ByteSize>,

    /// Output format: jpeg or avif
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Lowest quality the search may try (1-100)
    #[arg(long)]
    min_quality: Option<u32>,

    /// Highest quality the search may try (1-100)
    #[arg(long)]
    max_quality: Option<u32>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail when an image can't fit instead of keeping the original
    #[arg(long)]
    strict: bool,

    /// Disable the encode cache and search every image again
    #[arg(long)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress images to the target size
    Compress(CompressArgs),
    /// List input images with dimensions and sizes, without encoding
    Check {
        /// Image files or directories (walked recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// List the named size presets
    Presets,
    /// Print a stock bytefit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Compress(args) => {
            let config = config::load_config(&cli.config)?;
            tracing::debug!(path = %cli.config.display(), ?config, "loaded config");
            let process_config = resolve_process_config(&config, &args)?;
            let output_dir = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.output.dir));

            let inputs = scan::collect_inputs(&args.inputs)?;
            if inputs.is_empty() {
                println!("No images found");
                return Ok(());
            }

            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::process(
                &inputs,
                &output_dir,
                &process_config,
                !args.no_cache,
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let result = result?;

            write_report(&output_dir, &result.report)?;
            output::print_summary(&result.report, &result.cache_stats);
        }
        Command::Check { inputs } => {
            let inputs = scan::collect_inputs(&inputs)?;
            let infos = process::inspect(&RustBackend::new(), &inputs)?;
            output::print_check(&infos);
            println!("{} images", infos.len());
        }
        Command::Presets => {
            output::print_presets(presets::PRESETS);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Combine config file values with command-line overrides.
fn resolve_process_config(
    config: &Config,
    args: &CompressArgs,
) -> Result<ProcessConfig, Box<dyn std::error::Error>> {
    let target = match args.target {
        Some(target) => target,
        None => config
            .search
            .target()?
            .ok_or("no target size: pass --target or set search.target in the config file")?,
    };
    let range = QualityRange::new(
        args.min_quality.unwrap_or(config.search.min_quality),
        args.max_quality.unwrap_or(config.search.max_quality),
    )?;
    let params = SearchParams::new(target)
        .with_format(args.format.unwrap_or(config.search.format))
        .with_range(range);
    Ok(ProcessConfig {
        params,
        strict: args.strict || config.search.strict,
    })
}

fn write_report(output_dir: &Path, report: &process::Report) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(output_dir.join("report.json"), json)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

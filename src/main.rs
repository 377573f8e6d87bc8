use clap::{Parser, Subcommand};
use exifmark::scheduler::{self, CancelToken, RunEvent, RunSettings};
use exifmark::{config, output, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exifmark")]
#[command(about = "Batch EXIF watermarking for photographs")]
#[command(long_about = "\
Batch EXIF watermarking for photographs

Every supported image directly inside the input directory is decoded, run
through the processor chain built from the config, and written to the output
directory under its original file name.

Chain order:

  [shadow] -> layout -> [margin] -> [padding_to_original_ratio]

  layout:  watermark | watermark_left_logo | watermark_right_logo | square | simple
  shadow and padding are never combined with square; margin only wraps
           watermark layouts.

Logging goes to stderr and is controlled by RUST_LOG (default: warn).

Run 'exifmark gen-config' to generate a documented exifmark.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Shared flag for commands that read a config file.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// Config file (stock defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Watermark every photo in a directory
    Run {
        /// Directory of source photos (not searched recursively)
        #[arg(long)]
        input: PathBuf,

        /// Directory for the results, created if missing
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Concurrent workers (overrides processing.max_workers)
        #[arg(long)]
        workers: Option<usize>,

        /// Stop dispatching new photos after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Print the final summary as JSON instead of progress lines
        #[arg(long)]
        json: bool,
    },
    /// Show the processor chain the config produces
    Chain(ConfigArgs),
    /// Print a stock exifmark.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            output: output_dir,
            config: config_args,
            workers,
            fail_fast,
            json,
        } => {
            let config = config::load_config(config_args.config.as_deref())?;
            let chain = pipeline::build_chain(&config);
            let settings = RunSettings::from_config(&config, input, output_dir, workers);
            let cancel = CancelToken::new();

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = {
                let cancel = cancel.clone();
                std::thread::spawn(move || print_events(rx, &cancel, fail_fast, json))
            };
            let result = scheduler::run(&chain, &settings, &cancel, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            // Setup errors were already reported once through the Fatal event
            let summary = match result {
                Ok(summary) => summary,
                Err(e) => {
                    if json {
                        for line in output::format_run_event(&RunEvent::Fatal(e.to_string())) {
                            eprintln!("{}", line);
                        }
                    }
                    std::process::exit(1);
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Command::Chain(config_args) => {
            let config = config::load_config(config_args.config.as_deref())?;
            let chain = pipeline::build_chain(&config);
            for line in output::format_chain(&chain) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Drain run events, printing progress unless `quiet`.
fn print_events(
    rx: std::sync::mpsc::Receiver<RunEvent>,
    cancel: &CancelToken,
    fail_fast: bool,
    quiet: bool,
) {
    let mut last_stats = None;
    for event in rx {
        match &event {
            RunEvent::Stats(stats) => last_stats = Some(*stats),
            RunEvent::FileFailed { .. } if fail_fast => cancel.cancel(),
            _ => {}
        }
        if quiet {
            continue;
        }
        if let (RunEvent::Progress(p), Some(stats)) = (&event, &last_stats) {
            println!("{}", output::format_progress(*p, stats));
        }
        for line in output::format_run_event(&event) {
            println!("{}", line);
        }
    }
}

/// Structured logs on stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

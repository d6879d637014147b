use clap::error::ErrorKind;
use clap::Parser;
use avrocount::parallel::{sum, CountOptions, ParallelCounter};
use avrocount::source;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, Level};

const SHORT_DESCRIPTION: &str = "Counts the records in an Avro data file";

#[derive(Parser)]
#[command(name = "avro-count", version, about = SHORT_DESCRIPTION)]
struct Cli {
    /// Path to an avro file or directory containing avro files, a dash ('-')
    /// can be given as an input file to use stdin
    #[arg(value_name = "PATH_TO_AVRO_FILE")]
    path: PathBuf,
    /// Maximum amount of parallelism (default: one worker per file)
    #[arg(long, alias = "maxParallelism", value_name = "N")]
    max_parallelism: Option<NonZeroUsize>,
    /// Enable verbose mode
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprintln!("{SHORT_DESCRIPTION}");
            eprintln!();
            eprint!("{e}");
            return ExitCode::from(1);
        }
    };

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(total) => {
            println!("{total}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("avro-count: {e}");
            ExitCode::from(1)
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::ERROR };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> avrocount::Result<u64> {
    let started = Instant::now();
    let sources = source::resolve(&cli.path)?;

    let counter = ParallelCounter::new(CountOptions { max_parallelism: cli.max_parallelism });
    let counts = counter.count_each(sources.iter().collect::<Vec<_>>())?;
    let total = sum(&counts)?;

    debug!("Finished {} file(s) in {}ms", counts.len(), started.elapsed().as_millis());
    Ok(total)
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use ferrous_map::defaults;
use ferrous_map::filter::HomopolymerMasker;
use ferrous_map::io::{read_contigs, read_reads, write_matches};
use ferrous_map::map_opt::{MapOpt, Strands};
use ferrous_map::pipeline::map_reads;
use ferrous_map::utils::format_bases;

#[derive(Parser)]
#[command(name = "ferrous-map")]
#[command(about = "FerrousMap - parallel q-gram filtration and bit-vector verification read mapper", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map reads to a reference with at most a fraction of edit errors
    Map {
        /// Reference FASTA (optionally gzipped)
        #[arg(value_name = "REF.FA")]
        reference: PathBuf,

        /// Reads as FASTA or FASTQ (optionally gzipped)
        #[arg(value_name = "READS")]
        reads: PathBuf,

        // ===== Filtration Options =====
        /// Maximum fraction of the read length allowed as edit errors
        #[arg(short = 'e', long, value_name = "FLOAT", default_value_t = defaults::ERROR_RATE)]
        error_rate: f64,

        /// q-gram (seed) length of the filter
        #[arg(short = 'q', long, value_name = "INT", default_value_t = defaults::SEED_LENGTH)]
        seed_len: usize,

        /// Minimum number of matching q-grams per candidate
        #[arg(long, value_name = "INT", default_value_t = defaults::MIN_THRESHOLD)]
        threshold: usize,

        /// Ignore seeds occurring more often than this fraction of all q-grams (1.0 = off)
        #[arg(long, value_name = "FLOAT", default_value_t = defaults::ABUNDANCE_CUT)]
        abundance_cut: f64,

        /// Skip single-base runs of at least this length in the reference (0 = off)
        #[arg(long, value_name = "INT", default_value_t = defaults::REPEAT_LENGTH)]
        repeat_length: usize,

        /// Scan the forward strand only
        #[arg(short = 'f', long, conflicts_with = "reverse")]
        forward: bool,

        /// Scan the reverse-complement strand only
        #[arg(short = 'r', long)]
        reverse: bool,

        // ===== Scheduling Options =====
        /// Reference positions scanned per window
        #[arg(short = 'w', long, value_name = "INT", default_value_t = defaults::WINDOW_SIZE)]
        window_size: usize,

        /// Read blocks per thread
        #[arg(long, value_name = "FLOAT", default_value_t = defaults::BLOCKS_PER_CORE)]
        blocks_per_core: f64,

        /// Minimum hits in a window before its verification is split
        #[arg(long, value_name = "INT", default_value_t = defaults::SPLIT_THRESHOLD)]
        split_threshold: usize,

        /// Most extra workers one block may borrow for a split window (0 = pool size - 1)
        #[arg(long, value_name = "INT", default_value_t = 0)]
        max_borrowed_workers: usize,

        /// Number of threads (default: all available cores)
        #[arg(short = 't', long, value_name = "INT")]
        threads: Option<usize>,

        // ===== Input/Output Options =====
        /// Output file (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
        #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
        verbosity: i32,
    },
}

fn init_logger(verbosity: i32) {
    // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace)
    // to Rust log levels
    let log_level = match verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Thread count from the command line, defaulting to the core count and
/// capped at twice the core count
fn resolve_threads(threads: Option<usize>) -> usize {
    let mut num_threads = threads.unwrap_or_else(num_cpus::get);

    if num_threads < 1 {
        log::warn!("Invalid thread count {}, using 1 thread", num_threads);
        num_threads = 1;
    }

    let max_threads = num_cpus::get() * 2;
    if num_threads > max_threads {
        log::warn!(
            "Thread count {} exceeds recommended maximum {}, capping at {}",
            num_threads,
            max_threads,
            max_threads
        );
        num_threads = max_threads;
    }
    num_threads
}

fn run_map(cmd: Commands) -> anyhow::Result<()> {
    let Commands::Map {
        reference,
        reads,
        error_rate,
        seed_len,
        threshold,
        abundance_cut,
        repeat_length,
        forward,
        reverse,
        window_size,
        blocks_per_core,
        split_threshold,
        max_borrowed_workers,
        threads,
        output,
        verbosity,
    } = cmd;

    let strands = match (forward, reverse) {
        (true, false) => Strands::Forward,
        (false, true) => Strands::Reverse,
        _ => Strands::Both,
    };

    let mut opt = MapOpt {
        error_rate,
        seed_len,
        min_threshold: threshold,
        abundance_cut,
        repeat_length,
        strands,
        window_size,
        n_threads: resolve_threads(threads),
        blocks_per_core,
        split_threshold,
        max_borrowed_workers,
        verbosity,
    };
    opt.validate();

    let thread_word = if opt.n_threads == 1 { "thread" } else { "threads" };
    log::info!("Using {} {}", opt.n_threads, thread_word);

    if verbosity >= 3 {
        log::info!("Filtration parameters:");
        log::info!("  Error rate: {}", opt.error_rate);
        log::info!("  Seed length: {}, min threshold: {}", opt.seed_len, opt.min_threshold);
        log::info!("  Abundance cut: {}, repeat length: {}", opt.abundance_cut, opt.repeat_length);
        log::info!("Scheduling parameters:");
        log::info!(
            "  Window: {}, blocks per core: {}, split threshold: {}",
            opt.window_size,
            opt.blocks_per_core,
            opt.split_threshold
        );
    }

    let load_start = Instant::now();
    let contigs = read_contigs(&reference)
        .with_context(|| format!("failed to load reference {}", reference.display()))?;
    let read_set =
        read_reads(&reads).with_context(|| format!("failed to load reads {}", reads.display()))?;
    let ref_bases: usize = contigs.iter().map(|c| c.len()).sum();
    log::info!(
        "Loaded {} contig(s) ({}) and {} read(s) in {:.3}s",
        contigs.len(),
        format_bases(ref_bases),
        read_set.len(),
        load_start.elapsed().as_secs_f64()
    );

    let masker = HomopolymerMasker::new(opt.repeat_length);
    let result = map_reads(&contigs, &read_set, &masker, &opt).context("mapping failed")?;

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    write_matches(&mut writer, &result.matches, &read_set, &contigs).context("failed to write matches")?;

    log::info!(
        "Filtration: {}, verifications: {}, successful: {}",
        result.stats.filter_hits,
        result.stats.verifications,
        result.stats.successful_verifications
    );
    log::info!("Wrote {} match(es)", result.matches.len());
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let verbosity = match &cli.command {
        Commands::Map { verbosity, .. } => *verbosity,
    };
    init_logger(verbosity);

    if let Err(e) = run_map(cli.command) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

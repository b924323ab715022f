use std::num::NonZeroUsize;
use std::thread;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kbench::harness::{
    DEFAULT_DAXPY_POW, DEFAULT_MATRIX_SIZE, DEFAULT_MATRIX_THREADS, DEFAULT_PI_STEPS, DEFAULT_SEED,
    DEFAULT_SWEEP_STEPS, DEFAULT_SWEEP_THREADS,
};
use kbench::{
    DaxpyBench, GranularityBench, IntegrationBench, MatrixInputs, Report, SectionsBench, ThreadSweep,
};
use kernels::Integrand;
use runtime::ThreadBudget;
use tracing_subscriber::EnvFilter;

/// kbench command-line interface
#[derive(Parser)]
#[command(name = "kbench", version, about = "Shared-memory parallel kernel benchmarks")]
struct Cli {
    /// Worker ceiling; defaults to the host's available parallelism
    #[arg(short, long, global = true, env = "KBENCH_THREADS")]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rectangle-rule pi with every accumulation strategy at one thread count
    Pi(PiArgs),
    /// Parallel strategies over thread counts 1..=max
    PiSweep(PiSweepArgs),
    /// Matrix multiply at outer, inner and nested granularity
    Matmul(MatmulArgs),
    /// Add, sub, mul and transpose as concurrent sections
    Sections(SectionsArgs),
    /// x = a*x + y over thread counts 1..=max
    Daxpy(DaxpyArgs),
}

#[derive(Args, Debug)]
struct PiArgs {
    #[arg(default_value_t = DEFAULT_PI_STEPS)]
    steps: usize,

    #[arg(long, default_value_t = Integrand::Arctan)]
    integrand: Integrand,
}

#[derive(Args, Debug)]
struct PiSweepArgs {
    #[arg(default_value_t = DEFAULT_SWEEP_STEPS)]
    steps: usize,

    /// Largest thread count in the sweep
    #[arg(long, default_value_t = DEFAULT_SWEEP_THREADS)]
    max_threads: usize,

    #[arg(long, default_value_t = Integrand::Arctan)]
    integrand: Integrand,
}

#[derive(Args, Debug)]
struct MatmulArgs {
    #[arg(default_value_t = DEFAULT_MATRIX_SIZE)]
    size: usize,

    /// Fill the inputs from this seed instead of ones and twos
    #[arg(long)]
    seed: Option<u32>,
}

#[derive(Args, Debug)]
struct SectionsArgs {
    #[arg(default_value_t = DEFAULT_MATRIX_SIZE)]
    size: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u32,
}

#[derive(Args, Debug)]
struct DaxpyArgs {
    /// Vector length as a power of two
    #[arg(default_value_t = DEFAULT_DAXPY_POW)]
    pow: u32,

    /// Largest thread count in the sweep
    #[arg(long, default_value_t = DEFAULT_SWEEP_THREADS)]
    max_threads: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report = match cli.command {
        Command::Pi(args) => {
            let mut bench = IntegrationBench::new(args.steps, ThreadSweep::Fixed(ceiling(cli.threads)?));
            bench.integrand = args.integrand;
            bench.run()?.report
        }
        Command::PiSweep(args) => {
            let mut bench = IntegrationBench::new(args.steps, ThreadSweep::UpTo(budget(args.max_threads)?));
            bench.integrand = args.integrand;
            bench.run()?.report
        }
        Command::Matmul(args) => {
            let threads = budget(cli.threads.unwrap_or(DEFAULT_MATRIX_THREADS))?;
            let mut bench = GranularityBench::new(args.size, threads);
            if let Some(seed) = args.seed {
                bench.inputs = MatrixInputs::Random { seed };
            }
            bench.run()?.report
        }
        Command::Sections(args) => {
            let mut bench = SectionsBench::new(args.size, ceiling(cli.threads)?);
            bench.seed = args.seed;
            bench.run()?.report
        }
        Command::Daxpy(args) => {
            DaxpyBench::new(args.pow, ThreadSweep::UpTo(budget(args.max_threads)?)).run()?.report
        }
    };

    print(&report);
    Ok(())
}

fn budget(threads: usize) -> anyhow::Result<ThreadBudget> {
    ThreadBudget::new(threads).with_context(|| format!("invalid thread count {threads}"))
}

/// `--threads` when given, the host's parallelism otherwise.
fn ceiling(threads: Option<usize>) -> anyhow::Result<ThreadBudget> {
    match threads {
        Some(t) => budget(t),
        None => budget(
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        ),
    }
}

fn print(report: &Report) {
    print!("{report}");
    if report.failures() > 0 {
        eprintln!("{} measurement(s) failed", report.failures());
    }
}

//! powbench CLI
//!
//! Benchmarks how fast this machine produces double SHA-256 proofs of work.
//!
//! # Commands
//!
//! - `bench` - Sweep difficulty and time each level (default)
//! - `solve` - Find a proof for a payload
//! - `verify` - Check a proof
//! - `payload` - Generate random work data
//! - `cpu` - Show host CPU information
//! - `init-config` - Write the default configuration file

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use powbench::bench::run_sweep;
use powbench::config::{default_config_path, BenchConfig, ConfigOverrides};
use powbench::cpu::CpuInfo;
use powbench::engine::{
    generate_work_data, leading_zero_bits, pow_hash, PowError, ProofOfWork, SolveOptions, Solver,
};

#[derive(Parser)]
#[command(name = "powbench")]
#[command(author = "BitMaelum")]
#[command(version = "0.1.0")]
#[command(about = "Proof-of-work difficulty benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Custom config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep difficulty and report the average time per proof
    Bench {
        /// First difficulty in bits
        #[arg(long)]
        start_bits: Option<u32>,

        /// Last difficulty in bits
        #[arg(long)]
        max_bits: Option<u32>,

        /// Seconds spent on each difficulty level
        #[arg(long)]
        budget: Option<u64>,

        /// Maximum proofs per difficulty level
        #[arg(long)]
        max_runs: Option<u32>,

        /// Stop the sweep when one proof takes longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Payload to prove work on
        #[arg(long)]
        message: Option<String>,
    },

    /// Find a proof of work
    Solve {
        /// Difficulty in bits
        #[arg(short, long)]
        bits: u32,

        /// Payload (default: 32 random bytes, base64)
        #[arg(short, long)]
        data: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Verify a proof of work
    Verify {
        /// Difficulty in bits
        #[arg(short, long, required_unless_present = "proof")]
        bits: Option<u32>,

        /// Payload the proof is bound to
        #[arg(short, long, required_unless_present = "proof")]
        data: Option<String>,

        /// Claimed nonce
        #[arg(short, long, required_unless_present = "proof")]
        nonce: Option<u64>,

        /// JSON proof file ({"bits", "data", "proof"})
        #[arg(long, conflicts_with_all = ["bits", "data", "nonce"])]
        proof: Option<PathBuf>,
    },

    /// Generate random work data
    Payload,

    /// Show host CPU information
    Cpu,

    /// Write the default configuration file
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Bench {
        start_bits: None,
        max_bits: None,
        budget: None,
        max_runs: None,
        timeout: None,
        message: None,
    }) {
        Commands::Bench {
            start_bits,
            max_bits,
            budget,
            max_runs,
            timeout,
            message,
        } => {
            let overrides = ConfigOverrides {
                message,
                start_bits,
                max_bits,
                level_budget_secs: budget,
                max_runs,
                threads: cli.threads,
                solve_timeout_secs: timeout,
            };
            cmd_bench(cli.config.as_deref(), &overrides)
        }
        Commands::Solve {
            bits,
            data,
            timeout,
        } => cmd_solve(cli.config.as_deref(), cli.threads, bits, data, timeout),
        Commands::Verify {
            bits,
            data,
            nonce,
            proof,
        } => cmd_verify(bits, data, nonce, proof),
        Commands::Payload => cmd_payload(),
        Commands::Cpu => cmd_cpu(),
        Commands::InitConfig => cmd_init_config(cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` takes precedence over `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build a solver from the configured thread count
fn build_solver(threads: Option<usize>) -> anyhow::Result<Solver> {
    let workers = threads.unwrap_or_else(num_cpus::get);
    Ok(Solver::new(workers)?)
}

fn cmd_bench(config_path: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let config = BenchConfig::load(config_path)
        .context("Failed to load config")?
        .apply_overrides(overrides)?;
    let solver = build_solver(config.threads)?;

    println!("This program benchmarks how fast this machine produces SHA-256 proofs of work.");
    println!("Each difficulty level is timed for up to {}s.", config.level_budget_secs);
    println!("Hit CTRL-C to stop. The more levels, the better the picture.");
    println!();

    println!("---------- START CPU INFO -------------");
    print!("{}", CpuInfo::detect());
    println!("Workers: {}", solver.workers());
    println!("---------- END CPU INFO -------------");
    println!();

    println!("---------- START WORK INFO -------------");
    let outcome = run_sweep(&config, &solver, |report| println!("{}", report));
    match outcome {
        Ok(_) => {}
        Err(PowError::Timeout(limit)) => {
            println!("Stopping: a single proof took longer than {:?}", limit);
        }
        Err(e) => return Err(e.into()),
    }
    println!("---------- END WORK INFO -------------");

    Ok(())
}

fn cmd_solve(
    config_path: Option<&Path>,
    threads: Option<usize>,
    bits: u32,
    data: Option<String>,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let config = BenchConfig::load(config_path).context("Failed to load config")?;
    let solver = build_solver(threads.or(config.threads))?;

    let data = match data {
        Some(d) => d,
        None => generate_work_data()?,
    };

    let mut pow = ProofOfWork::new(bits, data);
    let options = SolveOptions {
        timeout: timeout.map(Duration::from_secs),
        cancel: None,
    };

    eprintln!("Solving {} bits with {} workers...", bits, solver.workers());
    let solution = solver.solve_with(&mut pow, &options)?;
    let digest = pow_hash(pow.payload(), solution.nonce);

    println!("{}", serde_json::to_string_pretty(&pow)?);
    eprintln!();
    eprintln!("  Digest:    {}", hex::encode(digest));
    eprintln!("  Zero bits: {}", leading_zero_bits(&digest));
    eprintln!(
        "  Hashes:    {} ({:.0} H/s)",
        solution.attempts,
        solution.hashrate()
    );
    eprintln!("  Time:      {:.3?}", solution.elapsed);

    Ok(())
}

fn cmd_verify(
    bits: Option<u32>,
    data: Option<String>,
    nonce: Option<u64>,
    proof_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let pow = match proof_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<ProofOfWork>(&content)
                .with_context(|| format!("Invalid proof file {}", path.display()))?
        }
        None => match (bits, data, nonce) {
            (Some(bits), Some(data), Some(nonce)) => ProofOfWork::with_proof(bits, data, nonce),
            _ => anyhow::bail!("Either --proof or all of --bits, --data and --nonce are required"),
        },
    };

    let Some(nonce) = pow.proof() else {
        anyhow::bail!("Proof record has no nonce");
    };

    if pow.is_valid() {
        println!("valid");
        Ok(())
    } else {
        println!("invalid");
        anyhow::bail!(
            "Nonce {} does not satisfy {} bits for the given data",
            nonce,
            pow.bits()
        )
    }
}

fn cmd_payload() -> anyhow::Result<()> {
    println!("{}", generate_work_data()?);
    Ok(())
}

fn cmd_cpu() -> anyhow::Result<()> {
    print!("{}", CpuInfo::detect());
    Ok(())
}

fn cmd_init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(default_config_path);

    if path.exists() {
        anyhow::bail!("Config already exists at {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    BenchConfig::default().save_to_file(&path)?;
    println!("Config written to {}", path.display());

    Ok(())
}

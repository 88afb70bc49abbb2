use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use jacobi_pool::io::{format_solution, load_system};
use jacobi_pool::system::DEFAULT_MAX_ITERATIONS;
use jacobi_pool::{JacobiEngine, SolverConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jacobi_pool", about = "Solve Ax = b with the Jacobi method on a worker pool")]
struct Cli {
    /// 入力ファイル（1行目: rows cols、以降: 係数と右辺）
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// 収束判定の閾値（正の数）
    #[arg(short = 'e', long = "epsilon", value_parser = parse_epsilon)]
    epsilon: f64,

    /// ワーカースレッド数（省略時はハードウェアスレッド数と行数の小さい方）
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// 反復回数の上限
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
}

fn parse_epsilon(value: &str) -> Result<f64, String> {
    let epsilon: f64 = value.parse().map_err(|_| format!("invalid epsilon '{value}'"))?;
    if epsilon > 0.0 && epsilon.is_finite() {
        Ok(epsilon)
    } else {
        Err(format!("epsilon must be positive, got {value}"))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("エラー: {err:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    info!(file = %cli.file.display(), epsilon = cli.epsilon, "input");

    let system = load_system(&cli.file)?;
    system
        .check_diagonal_dominance()
        .context("the Jacobi method requires a diagonally dominant matrix")?;

    let mut config = SolverConfig::default().with_max_iterations(cli.max_iterations);
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }

    let mut engine = JacobiEngine::new(config);
    engine.configure(&system)?;
    let stats = engine.solve(cli.epsilon)?;
    let x = engine.result()?;

    info!(
        iterations = stats.iterations,
        threads = stats.threads,
        residual = system.residual_norm(&x),
        "solved"
    );
    print!("{}", format_solution(&x));
    Ok(())
}

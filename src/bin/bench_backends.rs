use std::time::{Duration, Instant};

use clap::Parser;
use jacobi_pool::implementations::safe::rayon::solve_rayon;
use jacobi_pool::implementations::safe::single::solve_single;
use jacobi_pool::system::{NormalizedSystem, DEFAULT_MAX_ITERATIONS};
use jacobi_pool::{JacobiEngine, LinearSystem, SolverConfig};

const BENCH_ITERATIONS: usize = 15;
const BENCH_WARMUP: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "bench_backends", about = "Compare Jacobi backends on a generated system")]
struct Cli {
    /// スレッド数
    #[arg(default_value_t = 2)]
    threads: usize,

    /// 行数
    #[arg(short, long, default_value_t = 1000)]
    size: usize,

    #[arg(short, long, default_value_t = 1e-10)]
    epsilon: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.threads < 1 {
        anyhow::bail!("スレッド数は1以上である必要があります");
    }

    // Rayonのスレッド数を設定
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()?;

    let system = LinearSystem::sample(cli.size);
    let normalized = system.normalize()?;

    println!("=== Jacobi法 連立方程式ベンチマーク ===");
    println!("行数: {}, epsilon: {:e}, 測定回数: {}, スレッド数: {}\n", cli.size, cli.epsilon, BENCH_ITERATIONS, cli.threads);

    run_benchmark("Single Thread", || run_single(&normalized, cli.epsilon))?;
    run_benchmark("Worker Pool", || run_pool(&system, cli.threads, cli.epsilon))?;
    run_benchmark("Rayon", || run_rayon(&normalized, cli.epsilon))?;

    println!("\n=== ベンチマーク完了 ===");
    Ok(())
}

fn run_benchmark<F>(name: &str, mut bench_fn: F) -> anyhow::Result<()>
where
    F: FnMut() -> anyhow::Result<(Duration, usize)>,
{
    println!("{}:", name);

    // ウォームアップ
    for _ in 0..BENCH_WARMUP {
        bench_fn()?;
    }

    // 本番計測
    let mut times = Vec::with_capacity(BENCH_ITERATIONS);
    for i in 0..BENCH_ITERATIONS {
        let (duration, iterations) = bench_fn()?;
        times.push(duration);
        println!("  試行 {:2}: {:?} ({} 反復)", i + 1, duration, iterations);
    }

    // 統計計算
    times.sort();
    let median = times[BENCH_ITERATIONS / 2];
    let avg = times.iter().sum::<Duration>() / BENCH_ITERATIONS as u32;

    println!("  ---");
    println!("  最小値:   {:?}", times[0]);
    println!("  中央値:   {:?}", median);
    println!("  平均値:   {:?}", avg);
    println!("  最大値:   {:?}", times[BENCH_ITERATIONS - 1]);
    println!();
    Ok(())
}

fn run_single(system: &NormalizedSystem, epsilon: f64) -> anyhow::Result<(Duration, usize)> {
    let start = Instant::now();
    let solution = solve_single(system, epsilon, DEFAULT_MAX_ITERATIONS)?;
    Ok((start.elapsed(), solution.iterations))
}

// プール生成（スレッド起動）も計測に含める
fn run_pool(system: &LinearSystem, threads: usize, epsilon: f64) -> anyhow::Result<(Duration, usize)> {
    let start = Instant::now();
    let mut engine = JacobiEngine::new(SolverConfig::default().with_threads(threads));
    engine.configure(system)?;
    let stats = engine.solve(epsilon)?;
    engine.shutdown();
    Ok((start.elapsed(), stats.iterations))
}

fn run_rayon(system: &NormalizedSystem, epsilon: f64) -> anyhow::Result<(Duration, usize)> {
    let start = Instant::now();
    let solution = solve_rayon(system, epsilon, DEFAULT_MAX_ITERATIONS)?;
    Ok((start.elapsed(), solution.iterations))
}

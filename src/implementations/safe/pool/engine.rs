use std::mem;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use super::barrier::SyncBarrier;
use super::worker::Worker;
use super::{PoolContext, SolverConfig};
use crate::error::{JacobiError, Result};
use crate::implementations::partition::{partition_rows, RowRange};
use crate::system::{check_epsilon, max_change, LinearSystem, NormalizedSystem};

/*
  オーケストレーター

  動作フロー（各反復）：
  - x_old ← x（全ワーカー待機中にスナップショット）
  - release → ワーカーが各自の x_new を計算 → wait_all
  - maxChange = max |x_new[i] − x[i]|
  - maxChange < epsilon なら x はそのままで終了
  - そうでなければ x と x_new を swap（ワーカーごとのVecを入れ替えるだけ、要素コピーなし）

  プールは solve / step の最初の反復で生成し、その run の間は再利用する。
  solve の終了時（成功・失敗とも）、ワーカー障害・再configure・shutdown・drop のときに停止してjoinする。
*/

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    pub max_change: f64,
    pub threads: usize,
}

#[derive(Debug, Default)]
pub struct JacobiEngine {
    config: SolverConfig,
    system: Option<Arc<NormalizedSystem>>,
    ranges: Vec<RowRange>,
    x: Vec<Vec<f64>>, // ranges と同じ分割
    pool: Option<WorkerPool>,
    pools_started: usize,
    solved: bool,
}

impl JacobiEngine {
    pub fn new(config: SolverConfig) -> Self {
        JacobiEngine { config, ..Default::default() }
    }

    /// 正規化した係数を保持し、x を0で初期化する。対角がゼロならエラー（反復は行わない）
    pub fn configure(&mut self, system: &LinearSystem) -> Result<()> {
        self.shutdown();
        self.system = None;
        self.solved = false;

        let normalized = system.normalize()?;
        let n = normalized.size();
        let workers = self.worker_count(n);

        self.ranges = partition_rows(n, workers);
        self.x = self.ranges.iter().map(|range| vec![0.0; range.len()]).collect();
        self.system = Some(Arc::new(normalized));

        debug!(rows = n, workers, "engine configured");
        Ok(())
    }

    /// 収束するまで反復する（呼び出しスレッドはブロックされる）。終了時にプールは停止する
    pub fn solve(&mut self, epsilon: f64) -> Result<SolveStats> {
        check_epsilon(epsilon)?;
        self.solved = false;

        let outcome = self.iterate(epsilon);
        self.shutdown();

        let stats = outcome?;
        self.solved = true;
        Ok(stats)
    }

    /// バリア1サイクル分だけ反復し、maxChange を返す（x は常に更新される）
    ///
    /// プールは次の step / solve まで残る。x が変わるので result() は無効になる
    pub fn step(&mut self) -> Result<f64> {
        self.solved = false;
        self.advance(None)
    }

    /// 収束済みの x（行順）。直前の solve が成功したときのみ有効
    pub fn result(&self) -> Result<Vec<f64>> {
        if !self.solved {
            return Err(JacobiError::NotSolved);
        }
        Ok(self.x.concat())
    }

    /// ワーカー数（configure 前は0）
    pub fn threads(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }

    pub fn shutdown(&mut self) {
        // WorkerPool の drop で stop → join
        self.pool = None;
    }

    fn worker_count(&self, n: usize) -> usize {
        match self.config.threads {
            Some(threads) => threads.max(1),
            None => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
                .min(n)
                .max(1),
        }
    }

    fn iterate(&mut self, epsilon: f64) -> Result<SolveStats> {
        let mut change = f64::INFINITY;
        for iteration in 1..=self.config.max_iterations {
            change = self.advance(Some(epsilon))?;
            trace!(iteration, max_change = change, "jacobi iteration");

            if !change.is_finite() {
                warn!(iteration, "iteration diverged");
                return Err(JacobiError::Diverged { iteration });
            }
            if change < epsilon {
                let stats = SolveStats { iterations: iteration, max_change: change, threads: self.threads() };
                info!(iterations = stats.iterations, max_change = stats.max_change, threads = stats.threads, "converged");
                return Ok(stats);
            }
        }

        warn!(iterations = self.config.max_iterations, max_change = change, "iteration limit reached");
        Err(JacobiError::NotConverged { iterations: self.config.max_iterations, max_change: change })
    }

    // 必要ならプールを起動してから1サイクル。失敗したらプールを止める
    fn advance(&mut self, epsilon: Option<f64>) -> Result<f64> {
        if self.pool.is_none() {
            let system = self.system.clone().ok_or(JacobiError::NotConfigured)?;
            self.pool = Some(WorkerPool::spawn(system, &self.ranges)?);
            self.pools_started += 1;
            debug!(pools_started = self.pools_started, "worker pool attached");
        }

        self.cycle(epsilon).map_err(|err| {
            warn!(error = %err, "aborting run");
            self.shutdown();
            err
        })
    }

    // epsilon が Some で maxChange < epsilon のときは swap しない
    fn cycle(&mut self, epsilon: Option<f64>) -> Result<f64> {
        let pool = self.pool.as_ref().ok_or(JacobiError::NotConfigured)?;
        let ctx = &pool.ctx;

        {
            // 全ワーカーが待機中なので読み手はいない
            let mut snapshot = ctx.x_old.write().unwrap_or_else(PoisonError::into_inner);
            for (range, chunk) in self.ranges.iter().zip(&self.x) {
                snapshot[range.rows()].copy_from_slice(chunk);
            }
        }

        ctx.barrier.release();
        ctx.barrier.wait_all()?;

        let mut change: f64 = 0.0;
        for (slot, chunk) in ctx.slots.iter().zip(&self.x) {
            let x_new = slot.lock().unwrap_or_else(PoisonError::into_inner);
            let local = max_change(chunk, &x_new);
            if local.is_nan() || local > change {
                change = local;
            }
        }

        let converged = epsilon.is_some_and(|epsilon| change < epsilon);
        if !converged {
            for (slot, chunk) in ctx.slots.iter().zip(self.x.iter_mut()) {
                let mut x_new = slot.lock().unwrap_or_else(PoisonError::into_inner);
                mem::swap(&mut *x_new, chunk);
            }
        }

        Ok(change)
    }
}

#[derive(Debug)]
struct WorkerPool {
    ctx: Arc<PoolContext>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn spawn(system: Arc<NormalizedSystem>, ranges: &[RowRange]) -> Result<Self> {
        let n = ranges.last().map_or(0, |range| range.end);
        let ctx = Arc::new(PoolContext {
            system,
            x_old: RwLock::new(vec![0.0; n]),
            slots: ranges.iter().map(|range| Mutex::new(vec![0.0; range.len()])).collect(),
            barrier: SyncBarrier::new(ranges.len()),
        });

        // 途中で失敗しても drop で起動済みのスレッドは止まる
        let mut pool = WorkerPool { ctx, handles: Vec::with_capacity(ranges.len()) };
        for (id, range) in ranges.iter().enumerate() {
            let worker = Worker::new(id, *range);
            let ctx = pool.ctx.clone();
            let handle = thread::Builder::new()
                .name(format!("jacobi-worker-{id}"))
                .spawn(move || worker.run(ctx))
                .map_err(JacobiError::Spawn)?;
            pool.handles.push(handle);
        }

        debug!(workers = ranges.len(), rows = n, "worker pool started");
        Ok(pool)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.ctx.barrier.terminate();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked outside a compute phase");
            }
        }
        debug!("worker pool stopped");
    }
}

/*
  永続ワーカープール版

  主な特徴：
  1. ワーカースレッドは最初の solve / step で1回だけ生成し、毎反復で再利用
  2. 行範囲（RowRange）は生成時に固定。x_new はワーカーごとのバッファに分割
  3. Mutex + Condvar のバリア（SyncBarrier）で反復ごとに1回同期
  4. 計算はロックの外で行い、収束判定とswapはオーケストレーターが担当
*/

use std::sync::{Arc, Mutex, RwLock};

use crate::system::{NormalizedSystem, DEFAULT_MAX_ITERATIONS};

pub mod barrier;
pub mod engine;
pub mod worker;

pub use barrier::{Phase, SyncBarrier};
pub use engine::{JacobiEngine, SolveStats};
pub use worker::Worker;

#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// 反復回数の上限。超えると NotConverged
    pub max_iterations: usize,
    /// ワーカー数。None なら min(ハードウェアスレッド数, 行数)
    pub threads: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            threads: None,
        }
    }
}

impl SolverConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

// オーケストレーターと全ワーカーが Arc で共有する同期コンテキスト
#[derive(Debug)]
pub(crate) struct PoolContext {
    pub(crate) system: Arc<NormalizedSystem>,
    pub(crate) x_old: RwLock<Vec<f64>>,    // 書き込みは全ワーカー待機中のみ
    pub(crate) slots: Vec<Mutex<Vec<f64>>>, // ワーカーごとの x_new
    pub(crate) barrier: SyncBarrier,
}

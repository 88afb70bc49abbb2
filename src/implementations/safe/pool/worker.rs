use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError};

use tracing::{debug, warn};

use super::barrier::Phase;
use super::PoolContext;
use crate::implementations::partition::RowRange;
use crate::system::NormalizedSystem;

/// 連続した行範囲を受け持つワーカー
#[derive(Clone, Copy, Debug)]
pub struct Worker {
    id: usize,
    range: RowRange,
}

impl Worker {
    pub fn new(id: usize, range: RowRange) -> Self {
        Worker { id, range }
    }

    /// 担当行だけを計算する。x_new はこのワーカーの範囲分の長さ
    pub fn compute(&self, system: &NormalizedSystem, x_old: &[f64], x_new: &mut [f64]) {
        for (xi, i) in x_new.iter_mut().zip(self.range.rows()) {
            *xi = system.relax_row(i, x_old);
        }
    }

    // スレッド本体：停止要求までフェーズごとに1回 compute
    pub(crate) fn run(self, ctx: Arc<PoolContext>) {
        let mut seen = 0;

        while ctx.barrier.wait_for_work(&mut seen) == Phase::Compute {
            // パニックはここで捕まえ、バリア経由でオーケストレーターに伝える
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let x_old = ctx.x_old.read().unwrap_or_else(PoisonError::into_inner);
                let mut x_new = ctx.slots[self.id].lock().unwrap_or_else(PoisonError::into_inner);
                self.compute(&ctx.system, &x_old, &mut x_new);
            }));

            if outcome.is_err() {
                warn!(worker = self.id, start = self.range.start, end = self.range.end, "compute phase panicked");
            }
            ctx.barrier.arrive(self.id, outcome.is_err());
        }

        debug!(worker = self.id, "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::LinearSystem;

    #[test]
    fn test_compute_writes_only_its_rows() {
        let system = LinearSystem::new(
            vec![vec![4.0, 1.0, 1.0], vec![1.0, 4.0, 1.0], vec![1.0, 1.0, 4.0]],
            vec![4.0, 8.0, 12.0],
        )
        .unwrap()
        .normalize()
        .unwrap();

        let worker = Worker::new(1, RowRange { start: 1, end: 3 });
        let x_old = [1.0, 1.0, 1.0];
        let mut x_new = vec![0.0; 2];
        worker.compute(&system, &x_old, &mut x_new);

        // (8 - 1 - 1) / 4, (12 - 1 - 1) / 4
        assert_eq!(x_new, vec![1.5, 2.5]);
    }

    #[test]
    fn test_empty_range_is_noop() {
        let system = LinearSystem::new(vec![vec![5.0]], vec![10.0]).unwrap().normalize().unwrap();
        let worker = Worker::new(3, RowRange { start: 1, end: 1 });
        let mut x_new: Vec<f64> = Vec::new();

        worker.compute(&system, &[0.0], &mut x_new);
        assert!(x_new.is_empty());
    }
}

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{JacobiError, Result};

/*
  オーケストレーター1つ + ワーカーw個の2フェーズ同期（毎反復で再利用）

  動作フロー（各反復）：
  - Idle: ワーカーは全員 start で待機、ready = false
  - release(): finished = 0, ready = true, generation += 1 → start に broadcast
  - Running: ワーカーは述語を再確認してから計算（計算中はロックを持たない）
  - arrive(): finished += 1。w番目のワーカーが ready = false にして done に通知
  - wait_all(): オーケストレーターは finished == w まで done で待機
  終了は stop = true + broadcast。起床したワーカーは計算せずにループを抜ける。

  generation は「同じフェーズを2回計算しない」ためのもの。
  速いワーカーが arrive 後に戻ってきても、ready はまだ true の可能性がある。
*/

#[derive(Debug, PartialEq, Eq)]
pub enum Phase {
    Compute,
    Stop,
}

#[derive(Debug, Default)]
struct SyncState {
    ready: bool,
    generation: u64,
    finished: usize,
    stop: bool,
    faulted: Option<usize>,
}

#[derive(Debug)]
pub struct SyncBarrier {
    workers: usize,
    state: Mutex<SyncState>,
    start: Condvar, // ワーカーが待つ
    done: Condvar,  // オーケストレーターが待つ
}

impl SyncBarrier {
    pub fn new(workers: usize) -> Self {
        SyncBarrier {
            workers,
            state: Mutex::new(SyncState::default()),
            start: Condvar::new(),
            done: Condvar::new(),
        }
    }

    // 状態はフラグとカウンタだけなので、poisonされても中身をそのまま使う
    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 新しい計算フェーズを開始する。呼び出し前に x_old のスナップショットを済ませておくこと
    pub fn release(&self) {
        let mut state = self.lock();
        state.finished = 0;
        state.ready = true;
        state.generation = state.generation.wrapping_add(1);
        self.start.notify_all();
    }

    /// 全ワーカーの完了を待つ。いずれかのワーカーが失敗していれば WorkerFault
    pub fn wait_all(&self) -> Result<()> {
        let guard = self.lock();
        let mut state = self
            .done
            .wait_while(guard, |s| s.finished < self.workers)
            .unwrap_or_else(PoisonError::into_inner);

        match state.faulted.take() {
            Some(worker) => Err(JacobiError::WorkerFault { worker }),
            None => Ok(()),
        }
    }

    /// ワーカー側：次のフェーズか停止要求まで待つ
    pub fn wait_for_work(&self, seen: &mut u64) -> Phase {
        let guard = self.lock();
        let state = self
            .start
            .wait_while(guard, |s| !s.stop && !(s.ready && s.generation != *seen))
            .unwrap_or_else(PoisonError::into_inner);

        if state.stop {
            return Phase::Stop;
        }
        *seen = state.generation;
        Phase::Compute
    }

    /// ワーカー側：計算完了を通知
    pub fn arrive(&self, worker: usize, faulted: bool) {
        let mut state = self.lock();
        if faulted && state.faulted.is_none() {
            state.faulted = Some(worker);
        }
        state.finished += 1;

        if state.finished == self.workers {
            state.ready = false;
            self.done.notify_one();
        }
    }

    // 待機中のワーカーを取り残さないよう、stop と同時に broadcast する
    pub fn terminate(&self) {
        let mut state = self.lock();
        state.stop = true;
        self.start.notify_all();
    }
}

//! ソルバー全体で共通のエラー型。
//!
//! 設定エラー（ゼロ対角など）・ワーカー障害・非収束・入力ファイルの読み込みエラーを
//! 1つの enum にまとめ、`solve` の呼び出し元へ同期的に返す。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JacobiError {
    /// 行数 0 の連立方程式
    #[error("linear system is empty")]
    EmptySystem,

    /// 行列が正方でない
    #[error("matrix is not square: row {row} has {len} columns, expected {expected}")]
    NotSquare { row: usize, len: usize, expected: usize },

    /// 右辺ベクトルの長さが行数と一致しない
    #[error("vector b has {got} elements, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// 対角成分が（数値的に）ゼロ。この行ではJacobi法が定義できない
    #[error("diagonal entry at row {row} is zero ({value:e})")]
    ZeroDiagonal { row: usize, value: f64 },

    #[error("matrix is not diagonally dominant at row {row}")]
    NotDiagonallyDominant { row: usize },

    #[error("epsilon must be a positive finite number, got {0}")]
    InvalidEpsilon(f64),

    /// 計算フェーズ中にワーカーがパニックした
    #[error("worker {worker} failed during a compute phase")]
    WorkerFault { worker: usize },

    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),

    #[error("no convergence after {iterations} iterations (last max change {max_change:e})")]
    NotConverged { iterations: usize, max_change: f64 },

    /// 反復値が有限でなくなった
    #[error("iteration {iteration} produced a non-finite value")]
    Diverged { iteration: usize },

    #[error("engine has no configured system")]
    NotConfigured,

    #[error("no converged result is available")]
    NotSolved,

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, JacobiError>;

impl JacobiError {
    /// 反復に入る前に検出される入力・設定の誤りか
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            JacobiError::EmptySystem
                | JacobiError::NotSquare { .. }
                | JacobiError::DimensionMismatch { .. }
                | JacobiError::ZeroDiagonal { .. }
                | JacobiError::NotDiagonallyDominant { .. }
                | JacobiError::InvalidEpsilon(_)
        )
    }

    pub fn is_worker_fault(&self) -> bool {
        matches!(self, JacobiError::WorkerFault { .. } | JacobiError::Spawn(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(JacobiError::ZeroDiagonal { row: 1, value: 0.0 }.is_configuration_error());
        assert!(JacobiError::InvalidEpsilon(-1.0).is_configuration_error());
        assert!(!JacobiError::WorkerFault { worker: 0 }.is_configuration_error());
        assert!(JacobiError::WorkerFault { worker: 0 }.is_worker_fault());
        assert!(!JacobiError::NotConverged { iterations: 10, max_change: 1.0 }.is_worker_fault());
    }

    #[test]
    fn test_error_display() {
        let err = JacobiError::ZeroDiagonal { row: 1, value: 0.0 };
        assert_eq!(err.to_string(), "diagonal entry at row 1 is zero (0e0)");
    }
}

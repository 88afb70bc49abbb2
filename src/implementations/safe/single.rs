use std::mem;
use crate::error::{JacobiError, Result};
use crate::system::{check_epsilon, max_change, JacobiSolution, NormalizedSystem};

/*
  シングルスレッド版（正解データ）

  プール版・rayon版と同じ収束判定を使う。
  1ステップ = 全行を x_old から x_new へ計算 → maxChange → 未収束なら swap
*/

// 全行を1回更新
pub fn jacobi_sweep(system: &NormalizedSystem, x_old: &[f64], x_new: &mut [f64]) {
    for (i, xi) in x_new.iter_mut().enumerate() {
        *xi = system.relax_row(i, x_old);
    }
}

pub fn solve_single(system: &NormalizedSystem, epsilon: f64, max_iterations: usize) -> Result<JacobiSolution> {
    check_epsilon(epsilon)?;

    let n = system.size();
    let mut x = vec![0.0; n];
    let mut x_new = vec![0.0; n];
    let mut change = f64::INFINITY;

    for iteration in 1..=max_iterations {
        jacobi_sweep(system, &x, &mut x_new);
        change = max_change(&x, &x_new);

        if !change.is_finite() {
            return Err(JacobiError::Diverged { iteration });
        }
        if change < epsilon {
            return Ok(JacobiSolution { x, iterations: iteration, max_change: change });
        }

        // 収束していなければ新しい値をxに
        mem::swap(&mut x, &mut x_new);
    }

    Err(JacobiError::NotConverged { iterations: max_iterations, max_change: change })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::LinearSystem;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_two_by_two() {
        let system = LinearSystem::new(vec![vec![10.0, 1.0], vec![2.0, 10.0]], vec![12.0, 13.0]).unwrap();
        let solution = solve_single(&system.normalize().unwrap(), 1e-6, 1000).unwrap();

        // 厳密解は [107/98, 106/98]
        assert_abs_diff_eq!(solution.x[0], 107.0 / 98.0, epsilon = 1e-5);
        assert_abs_diff_eq!(solution.x[1], 106.0 / 98.0, epsilon = 1e-5);
        assert!(solution.max_change < 1e-6);
        assert!(system.residual_norm(&solution.x) < 20.0 * 1e-6);
    }

    #[test]
    fn test_converged_iteration_does_not_swap() {
        let system = LinearSystem::new(vec![vec![5.0]], vec![10.0]).unwrap();
        let solution = solve_single(&system.normalize().unwrap(), 1e-6, 10).unwrap();

        // 1回目で x = 2、2回目は変化0で収束（xはそのまま）
        assert_eq!(solution.iterations, 2);
        assert_eq!(solution.x, vec![2.0]);
    }

    #[test]
    fn test_iteration_cap() {
        let system = LinearSystem::sample(20);
        let result = solve_single(&system.normalize().unwrap(), 1e-12, 2);

        assert!(matches!(result, Err(JacobiError::NotConverged { iterations: 2, .. })));
    }
}

use rayon::prelude::*;
use crate::error::{JacobiError, Result};
use crate::system::{check_epsilon, max_change, JacobiSolution, NormalizedSystem};

//書き込み先を行ごとに分離することで、ロック不要の並列化を実現する（プール版との比較用）
pub fn solve_rayon(system: &NormalizedSystem, epsilon: f64, max_iterations: usize) -> Result<JacobiSolution> {
    check_epsilon(epsilon)?;

    let n = system.size();
    let mut src = vec![0.0; n];
    let mut dst = vec![0.0; n];
    let mut change = f64::INFINITY;

    for iteration in 1..=max_iterations {
        // 各スレッドは異なる要素に書き込むため、Mutexなしで安全
        let x_old = &src;
        dst.par_iter_mut()
            .enumerate()
            .for_each(|(i, xi)| *xi = system.relax_row(i, x_old));

        change = max_change(&src, &dst);

        if !change.is_finite() {
            return Err(JacobiError::Diverged { iteration });
        }
        if change < epsilon {
            return Ok(JacobiSolution { x: src, iterations: iteration, max_change: change });
        }

        std::mem::swap(&mut src, &mut dst);
    }

    Err(JacobiError::NotConverged { iterations: max_iterations, max_change: change })
}

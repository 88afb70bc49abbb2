use crate::error::{JacobiError, Result};

pub const DEFAULT_MAX_ITERATIONS: usize = 100_000; // 反復回数の上限
pub const ZERO_PIVOT_TOLERANCE: f64 = 1e-12; // これ未満の対角成分はゼロとみなす

/*
  連立方程式 Ax = b の入力データ

  Gridと同じく行列は1次元Vecに行優先で格納する（A[i][j] = data[i * n + j]）。
  ローダーから受け取った生の係数をそのまま保持し、検証と正規化を担当する。
*/
#[derive(Clone, Debug)]
pub struct LinearSystem {
    n: usize,
    data: Vec<f64>,
    b: Vec<f64>,
}

impl LinearSystem {
    pub fn new(rows: Vec<Vec<f64>>, b: Vec<f64>) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(JacobiError::EmptySystem);
        }
        if b.len() != n {
            return Err(JacobiError::DimensionMismatch { expected: n, got: b.len() });
        }

        let mut data = Vec::with_capacity(n * n);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != n {
                return Err(JacobiError::NotSquare { row, len: values.len(), expected: n });
            }
            data.extend(values);
        }

        Ok(LinearSystem { n, data, b })
    }

    /// ベンチマーク・テスト用の対角優位な系。厳密解は `sample_solution(n)`
    pub fn sample(n: usize) -> Self {
        let solution = sample_solution(n);
        let mut data = vec![0.0; n * n];

        for i in 0..n {
            let mut off_diagonal = 0.0;
            for j in 0..n {
                if i != j {
                    let a = 1.0 / (1.0 + i.abs_diff(j) as f64);
                    data[i * n + j] = a;
                    off_diagonal += a;
                }
            }
            // 対角成分を非対角の和より大きくして収束を保証
            data[i * n + i] = off_diagonal + 1.0;
        }

        let b = (0..n)
            .map(|i| (0..n).map(|j| data[i * n + j] * solution[j]).sum())
            .collect();

        LinearSystem { n, data, b }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn rhs(&self) -> &[f64] {
        &self.b
    }

    // 各行で |a_ii| > Σ_{j≠i} |a_ij| を確認
    pub fn check_diagonal_dominance(&self) -> Result<()> {
        for i in 0..self.n {
            let row = &self.data[i * self.n..(i + 1) * self.n];
            let off_diagonal: f64 = row
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, a)| a.abs())
                .sum();

            if row[i].abs() <= off_diagonal {
                return Err(JacobiError::NotDiagonallyDominant { row: i });
            }
        }
        Ok(())
    }

    /// 各行を対角成分で割り、対角を0にした係数を返す
    pub fn normalize(&self) -> Result<NormalizedSystem> {
        let n = self.n;
        let mut matrix = self.data.clone();
        let mut b = self.b.clone();

        for i in 0..n {
            let pivot = self.data[i * n + i];
            if !(pivot.abs() >= ZERO_PIVOT_TOLERANCE) {
                return Err(JacobiError::ZeroDiagonal { row: i, value: pivot });
            }

            for a in &mut matrix[i * n..(i + 1) * n] {
                *a /= pivot;
            }
            matrix[i * n + i] = 0.0;
            b[i] /= pivot;
        }

        Ok(NormalizedSystem { n, matrix, b })
    }

    /// 残差 ‖Ax − b‖∞
    pub fn residual_norm(&self, x: &[f64]) -> f64 {
        (0..self.n)
            .map(|i| {
                let ax: f64 = self.data[i * self.n..(i + 1) * self.n]
                    .iter()
                    .zip(x)
                    .map(|(a, xj)| a * xj)
                    .sum();
                (ax - self.b[i]).abs()
            })
            .fold(0.0, f64::max)
    }
}

pub fn sample_solution(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i % 5) as f64 - 2.0).collect()
}

/*
  正規化済みの係数（反復中は読み取り専用）

  matrix: a_ij / a_ii（対角は0）
  b:      b_i / a_ii
  対角が0なので、行の内積は j == i の項を自然に除外する。
*/
#[derive(Clone, Debug)]
pub struct NormalizedSystem {
    n: usize,
    matrix: Vec<f64>,
    b: Vec<f64>,
}

impl NormalizedSystem {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.matrix[i * self.n..(i + 1) * self.n]
    }

    pub fn rhs(&self) -> &[f64] {
        &self.b
    }

    // x_new[i] = b[i] − Σ_{j≠i} A[i][j]·x_old[j]
    #[inline]
    pub fn relax_row(&self, i: usize, x_old: &[f64]) -> f64 {
        let sum: f64 = self.row(i).iter().zip(x_old).map(|(a, x)| a * x).sum();
        self.b[i] - sum
    }
}

/// 参照実装（single / rayon）の結果
#[derive(Clone, Debug)]
pub struct JacobiSolution {
    pub x: Vec<f64>,
    pub iterations: usize,
    pub max_change: f64,
}

// epsilon > 0 かつ有限であること
pub fn check_epsilon(epsilon: f64) -> Result<()> {
    if epsilon > 0.0 && epsilon.is_finite() {
        Ok(())
    } else {
        Err(JacobiError::InvalidEpsilon(epsilon))
    }
}

/// max_i |new[i] − old[i]|。NaNはそのまま伝播させる
pub fn max_change(old: &[f64], new: &[f64]) -> f64 {
    old.iter().zip(new).fold(0.0, |acc: f64, (o, n)| {
        let diff = (n - o).abs();
        if diff.is_nan() || diff > acc {
            diff
        } else {
            acc
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(matches!(
            LinearSystem::new(vec![], vec![]),
            Err(JacobiError::EmptySystem)
        ));
        assert!(matches!(
            LinearSystem::new(vec![vec![1.0, 2.0], vec![3.0]], vec![1.0, 2.0]),
            Err(JacobiError::NotSquare { row: 1, len: 1, expected: 2 })
        ));
        assert!(matches!(
            LinearSystem::new(vec![vec![1.0]], vec![1.0, 2.0]),
            Err(JacobiError::DimensionMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_normalize_zeroes_diagonal() {
        let system = LinearSystem::new(vec![vec![10.0, 1.0], vec![2.0, 10.0]], vec![12.0, 13.0]).unwrap();
        let normalized = system.normalize().unwrap();

        assert_eq!(normalized.row(0), &[0.0, 0.1]);
        assert_eq!(normalized.row(1), &[0.2, 0.0]);
        assert_relative_eq!(normalized.rhs()[0], 1.2);
        assert_relative_eq!(normalized.rhs()[1], 1.3);
    }

    #[test]
    fn test_normalize_zero_diagonal() {
        let system = LinearSystem::new(vec![vec![4.0, 1.0], vec![1.0, 0.0]], vec![1.0, 1.0]).unwrap();
        assert!(matches!(
            system.normalize(),
            Err(JacobiError::ZeroDiagonal { row: 1, .. })
        ));
    }

    #[test]
    fn test_diagonal_dominance_uses_absolute_values() {
        let dominant = LinearSystem::new(vec![vec![-5.0, 2.0], vec![1.0, 3.0]], vec![0.0, 0.0]).unwrap();
        assert!(dominant.check_diagonal_dominance().is_ok());

        let weak = LinearSystem::new(vec![vec![4.0, -4.0], vec![1.0, 3.0]], vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            weak.check_diagonal_dominance(),
            Err(JacobiError::NotDiagonallyDominant { row: 0 })
        ));
    }

    #[test]
    fn test_sample_is_dominant_and_consistent() {
        let system = LinearSystem::sample(17);
        assert!(system.check_diagonal_dominance().is_ok());
        assert!(system.residual_norm(&sample_solution(17)) < 1e-9);
    }

    #[test]
    fn test_check_epsilon() {
        assert!(check_epsilon(1e-6).is_ok());
        assert!(check_epsilon(0.0).is_err());
        assert!(check_epsilon(-1.0).is_err());
        assert!(check_epsilon(f64::NAN).is_err());
    }

    #[test]
    fn test_max_change_propagates_nan() {
        assert_eq!(max_change(&[1.0, 2.0], &[1.5, 1.0]), 1.0);
        assert!(max_change(&[0.0, 0.0], &[f64::NAN, 1.0]).is_nan());
    }
}

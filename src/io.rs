use std::fs;
use std::path::Path;

use crate::error::{JacobiError, Result};
use crate::system::LinearSystem;

/*
  入力ファイル形式

    rows cols
    a_11 a_12 ... a_1n b_1
    ...
    a_n1 a_n2 ... a_nn b_n

  最後の列が右辺ベクトル b なので cols == rows + 1。
  数値は空白区切りで、行をまたいでもよい（行番号はエラー表示用）。
*/

pub fn load_system<P: AsRef<Path>>(path: P) -> Result<LinearSystem> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| JacobiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_system(&text)
}

pub fn parse_system(text: &str) -> Result<LinearSystem> {
    let tokens: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .flat_map(|(line, content)| content.split_whitespace().map(move |token| (line + 1, token)))
        .collect();
    // 入力が途中で終わったときに報告する行
    let last_line = tokens.last().map_or(1, |&(line, _)| line);
    let mut tokens = tokens.into_iter();

    let rows = next_dimension(&mut tokens, "rows", last_line)?;
    let cols = next_dimension(&mut tokens, "cols", last_line)?;
    if rows == 0 || cols != rows + 1 {
        return Err(JacobiError::Parse {
            line: 1,
            message: format!("expected cols = rows + 1, got {rows} x {cols}"),
        });
    }

    let mut matrix = Vec::with_capacity(rows);
    let mut b = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut row = Vec::with_capacity(rows);
        for _ in 0..rows {
            row.push(next_value(&mut tokens, last_line)?);
        }
        b.push(next_value(&mut tokens, last_line)?);
        matrix.push(row);
    }

    if let Some((line, token)) = tokens.next() {
        return Err(JacobiError::Parse {
            line,
            message: format!("unexpected trailing value '{token}'"),
        });
    }

    LinearSystem::new(matrix, b)
}

fn next_dimension<'a, I>(tokens: &mut I, name: &str, last_line: usize) -> Result<usize>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let (line, token) = tokens.next().ok_or_else(|| JacobiError::Parse {
        line: last_line,
        message: format!("missing {name}"),
    })?;
    token.parse().map_err(|_| JacobiError::Parse {
        line,
        message: format!("invalid {name} '{token}'"),
    })
}

fn next_value<'a, I>(tokens: &mut I, last_line: usize) -> Result<f64>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    match tokens.next() {
        Some((line, token)) => token.parse().map_err(|_| JacobiError::Parse {
            line,
            message: format!("invalid number '{token}'"),
        }),
        None => Err(JacobiError::Parse {
            line: last_line,
            message: "unexpected end of input".to_string(),
        }),
    }
}

// x_1 = ... の形式で1行ずつ
pub fn format_solution(x: &[f64]) -> String {
    x.iter()
        .enumerate()
        .map(|(i, value)| format!("x_{} = {}\n", i + 1, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_system() {
        let system = parse_system("2 3\n10 1 12\n2 10 13\n").unwrap();
        assert_eq!(system.size(), 2);
        assert_eq!(system.get(0, 1), 1.0);
        assert_eq!(system.get(1, 0), 2.0);
        assert_eq!(system.rhs(), &[12.0, 13.0]);
    }

    #[test]
    fn test_parse_rejects_wrong_column_count() {
        let err = parse_system("2 2\n1 2\n3 4\n").unwrap_err();
        assert!(matches!(err, JacobiError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_reports_bad_token_line() {
        let err = parse_system("2 3\n10 1 12\n2 x 13\n").unwrap_err();
        assert!(matches!(err, JacobiError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_parse_truncated_and_trailing() {
        // 途中で終わった入力は最後に読んだ行を報告する
        assert!(matches!(
            parse_system("2 3\n10 1 12\n2 10"),
            Err(JacobiError::Parse { line: 3, .. })
        ));
        assert!(matches!(parse_system("2 3\n10 1 12\n\n"), Err(JacobiError::Parse { line: 2, .. })));
        assert!(matches!(parse_system(""), Err(JacobiError::Parse { line: 1, .. })));
        assert!(matches!(
            parse_system("1 2\n5 10\n7\n"),
            Err(JacobiError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_system("/nonexistent/jacobi/input.txt").unwrap_err();
        assert!(matches!(err, JacobiError::Io { .. }));
    }

    #[test]
    fn test_format_solution() {
        assert_eq!(format_solution(&[1.0, 2.5]), "x_1 = 1\nx_2 = 2.5\n");
    }
}

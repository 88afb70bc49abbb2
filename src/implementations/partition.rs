use std::ops::Range;

/// ワーカー1つが担当する行範囲 [start, end)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    // n < w のときは空の範囲になる（エラーではない）
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/*
  n行をw個のワーカーに分割する

  先頭の w-1 個は ⌊n/w⌋ 行ずつ、最後のワーカーが残り全部を受け持つ。
  w == 0 は1ワーカーとして扱う。
*/
pub fn partition_rows(n: usize, workers: usize) -> Vec<RowRange> {
    let workers = workers.max(1);
    let rows_per_worker = n / workers;

    (0..workers)
        .map(|w| {
            let start = w * rows_per_worker;
            let end = if w == workers - 1 { n } else { start + rows_per_worker };
            RowRange { start, end }
        })
        .collect()
}

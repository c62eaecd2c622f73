use gcmsquery::Array2D;
use tracing::debug;

use crate::alignment::model::{
    Alignment,
    Column,
};
use crate::alignment::scoring::score_matrix;
use crate::errors::Result;

/// One step of an optimal alignment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Column `i` of the first alignment is merged with column `j` of the
    /// second.
    Match(usize, usize),
    /// Column `i` of the first alignment has no partner.
    GapInSecond(usize),
    /// Column `j` of the second alignment has no partner.
    GapInFirst(usize),
}

/// Result of running the aligner over a distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DpPath {
    pub steps: Vec<Step>,
    pub cost: f64,
}

/// Global (Needleman-Wunsch) alignment minimising the summed distance of
/// matched columns plus `gap_penalty` for every unmatched column.
///
/// `scores` is `n x m`, one row per column of the first sequence. Infinite
/// entries can never be matched. On equal costs a match is preferred over
/// a gap in the second sequence, and that over a gap in the first.
///
/// ```
/// use gcmsquery::Array2D;
/// use gcmsseek::alignment::dp::{align_scores, Step};
///
/// let scores = Array2D::new(vec![vec![0.1, 1.0], vec![1.0, 0.2]]).unwrap();
/// let path = align_scores(&scores, 2, 2, 0.3);
/// assert_eq!(path.steps, vec![Step::Match(0, 0), Step::Match(1, 1)]);
/// ```
pub fn align_scores(scores: &Array2D<f64>, n: usize, m: usize, gap_penalty: f64) -> DpPath {
    // 0 = diagonal, 1 = up (gap in second), 2 = left (gap in first)
    let mut cost = Array2D::filled(n + 1, m + 1, 0.0);
    let mut trace = Array2D::filled(n + 1, m + 1, 0u8);
    for i in 1..=n {
        cost.insert(i, 0, gap_penalty * i as f64);
        trace.insert(i, 0, 1);
    }
    for j in 1..=m {
        cost.insert(0, j, gap_penalty * j as f64);
        trace.insert(0, j, 2);
    }

    for i in 1..=n {
        for j in 1..=m {
            let s = scores.get(i - 1, j - 1).unwrap_or(f64::INFINITY);
            let candidates = [
                cost.get(i - 1, j - 1).unwrap_or(f64::INFINITY) + s,
                cost.get(i - 1, j).unwrap_or(f64::INFINITY) + gap_penalty,
                cost.get(i, j - 1).unwrap_or(f64::INFINITY) + gap_penalty,
            ];
            let mut best = 0u8;
            for (k, c) in candidates.iter().enumerate().skip(1) {
                if *c < candidates[best as usize] {
                    best = k as u8;
                }
            }
            cost.insert(i, j, candidates[best as usize]);
            trace.insert(i, j, best);
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match trace.get(i, j) {
            Some(0) => {
                steps.push(Step::Match(i - 1, j - 1));
                i -= 1;
                j -= 1;
            }
            Some(1) => {
                steps.push(Step::GapInSecond(i - 1));
                i -= 1;
            }
            _ => {
                steps.push(Step::GapInFirst(j - 1));
                j -= 1;
            }
        }
    }
    steps.reverse();

    DpPath {
        steps,
        cost: cost.get(n, m).unwrap_or(f64::INFINITY),
    }
}

/// Similarity of a finished path: `1 - distance` summed over the matches,
/// minus `gap_penalty` per gap.
pub fn path_similarity(path: &[Step], scores: &Array2D<f64>, gap_penalty: f64) -> f64 {
    path.iter()
        .map(|step| match step {
            Step::Match(i, j) => 1.0 - scores.get(*i, *j).unwrap_or(1.0),
            _ => -gap_penalty,
        })
        .sum()
}

/// Aligns two alignments and merges them into one covering the
/// experiments of both, first's codes first.
///
/// `rt_width` is the retention time spread (seconds) over which peaks are
/// considered the same compound and `gap_penalty` the cost of leaving a
/// column unmatched.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn align_pair(
    first: &Alignment,
    second: &Alignment,
    rt_width: f64,
    gap_penalty: f64,
) -> Result<Alignment> {
    let (n, m) = (first.len(), second.len());
    let scores = score_matrix(first, second, rt_width)?;
    let path = align_scores(&scores, n, m, gap_penalty);
    let similarity = path_similarity(&path.steps, &scores, gap_penalty);

    let (w1, w2) = (first.n_experiments(), second.n_experiments());
    let gaps = |w: usize| -> Column { vec![None; w] };
    let mut columns: Vec<Column> = Vec::with_capacity(path.steps.len());
    let mut n_matches = 0;
    for step in path.steps.iter() {
        let col = match *step {
            Step::Match(i, j) => {
                n_matches += 1;
                let mut col = first.columns()[i].clone();
                col.extend(second.columns()[j].iter().cloned());
                col
            }
            Step::GapInSecond(i) => {
                let mut col = first.columns()[i].clone();
                col.extend(gaps(w2));
                col
            }
            Step::GapInFirst(j) => {
                let mut col = gaps(w1);
                col.extend(second.columns()[j].iter().cloned());
                col
            }
        };
        columns.push(col);
    }
    debug!(
        "Aligned {} x {} columns: {} matched, {} total, similarity {:.3}",
        n,
        m,
        n_matches,
        columns.len(),
        similarity
    );

    let mut codes = first.experiment_codes().to_vec();
    codes.extend(second.experiment_codes().iter().cloned());
    Alignment::from_columns(codes, columns, Some(similarity))
}

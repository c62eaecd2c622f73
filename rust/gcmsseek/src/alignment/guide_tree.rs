use gcmsquery::errors::{
    DataShapeError,
    InsufficientDataError,
};
use gcmsquery::Array2D;
use rayon::prelude::*;
use tracing::{
    debug,
    info,
};

use crate::alignment::dp::align_pair;
use crate::alignment::model::Alignment;
use crate::errors::Result;

/// Either an input alignment or a previously merged tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Leaf(usize),
    Node(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    pub left: NodeRef,
    pub right: NodeRef,
    /// Linkage distance at which the two children were joined.
    pub distance: f64,
}

/// Merge order over a set of alignments. Node `k` may only reference
/// leaves and nodes created before it, the last node is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideTree {
    pub n_leaves: usize,
    pub nodes: Vec<TreeNode>,
}

/// Pairwise similarity of every pair of alignments.
///
/// Each pair is aligned independently (in parallel) and scored with
/// [crate::alignment::dp::path_similarity]. The diagonal is left at zero.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn similarity_matrix(
    alignments: &[Alignment],
    rt_width: f64,
    gap_penalty: f64,
) -> Result<Array2D<f64>> {
    let n = alignments.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    info!("Scoring {} pairs of alignments", pairs.len());

    let scores: Vec<f64> = pairs
        .par_iter()
        .map(|(i, j)| -> Result<f64> {
            let merged = align_pair(&alignments[*i], &alignments[*j], rt_width, gap_penalty)?;
            Ok(merged.similarity().unwrap_or(0.0))
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut out = Array2D::filled(n, n, 0.0);
    for ((i, j), s) in pairs.into_iter().zip(scores) {
        out.insert(i, j, s);
        out.insert(j, i, s);
    }
    Ok(out)
}

/// Turns a similarity matrix into distances, `max(sim) - sim`, with a
/// zero diagonal.
pub fn similarity_to_distance(sim: &Array2D<f64>) -> Array2D<f64> {
    let n = sim.nrows();
    let max = sim.values().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut out = Array2D::filled(n, n, 0.0);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                out.insert(i, j, max - sim.get(i, j).unwrap_or(0.0));
            }
        }
    }
    out
}

/// Average linkage (UPGMA) clustering of a square distance matrix.
///
/// At every step the two closest clusters are joined, ties going to the
/// lowest pair of cluster slots. The distance from the joined cluster to
/// any other is the size-weighted mean of its children's distances.
///
/// ```
/// use gcmsquery::Array2D;
/// use gcmsseek::alignment::guide_tree::{average_linkage, NodeRef};
///
/// let d = Array2D::new(vec![
///     vec![0.0, 5.0, 1.0],
///     vec![5.0, 0.0, 4.0],
///     vec![1.0, 4.0, 0.0],
/// ])
/// .unwrap();
/// let tree = average_linkage(&d).unwrap();
/// assert_eq!(tree.nodes[0].left, NodeRef::Leaf(0));
/// assert_eq!(tree.nodes[0].right, NodeRef::Leaf(2));
/// assert_eq!(tree.nodes[1].distance, 4.5);
/// ```
pub fn average_linkage(dist: &Array2D<f64>) -> Result<GuideTree> {
    let n = dist.nrows();
    if n == 0 {
        return Err(InsufficientDataError::NoUsableValues {
            context: "average_linkage on an empty distance matrix".to_string(),
        }
        .into());
    }
    if dist.ncols() != n {
        return Err(DataShapeError::ExpectedSlicesSameLength {
            expected: n,
            other: dist.ncols(),
            context: "average_linkage distance matrix must be square".to_string(),
        }
        .into());
    }

    // Active clusters by slot; a joined cluster takes the lower slot.
    let mut refs: Vec<Option<(NodeRef, usize)>> =
        (0..n).map(|i| Some((NodeRef::Leaf(i), 1))).collect();
    let mut d: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| dist.get(i, j).unwrap_or(0.0)).collect())
        .collect();
    let mut nodes = Vec::with_capacity(n.saturating_sub(1));

    for _ in 1..n {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in 0..n {
            if refs[a].is_none() {
                continue;
            }
            for b in (a + 1)..n {
                if refs[b].is_none() {
                    continue;
                }
                match best {
                    Some((_, _, bd)) if d[a][b] >= bd => {}
                    _ => best = Some((a, b, d[a][b])),
                }
            }
        }
        let Some((a, b, distance)) = best else {
            break;
        };
        let (Some((ref_a, size_a)), Some((ref_b, size_b))) = (refs[a], refs[b]) else {
            break;
        };

        for k in 0..n {
            if k == a || k == b || refs[k].is_none() {
                continue;
            }
            let merged = (d[a][k] * size_a as f64 + d[b][k] * size_b as f64)
                / (size_a + size_b) as f64;
            d[a][k] = merged;
            d[k][a] = merged;
        }
        nodes.push(TreeNode {
            left: ref_a,
            right: ref_b,
            distance,
        });
        refs[a] = Some((NodeRef::Node(nodes.len() - 1), size_a + size_b));
        refs[b] = None;
    }

    Ok(GuideTree { n_leaves: n, nodes })
}

/// Builds the guide tree of a set of alignments.
pub fn guide_tree(alignments: &[Alignment], rt_width: f64, gap_penalty: f64) -> Result<GuideTree> {
    let sim = similarity_matrix(alignments, rt_width, gap_penalty)?;
    average_linkage(&similarity_to_distance(&sim))
}

/// Merges the alignments in the order given by `tree` and drops the
/// final columns with fewer than `min_peaks` peaks.
///
/// A single input is returned as is (after the `min_peaks` filter).
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn align_with_tree(
    alignments: &[Alignment],
    tree: &GuideTree,
    rt_width: f64,
    gap_penalty: f64,
    min_peaks: usize,
) -> Result<Alignment> {
    if alignments.is_empty() {
        return Err(InsufficientDataError::NoUsableValues {
            context: "align_with_tree with no alignments".to_string(),
        }
        .into());
    }
    if tree.n_leaves != alignments.len() {
        return Err(DataShapeError::ExpectedSlicesSameLength {
            expected: alignments.len(),
            other: tree.n_leaves,
            context: "align_with_tree guide tree leaves".to_string(),
        }
        .into());
    }

    let mut merged: Vec<Alignment> = Vec::with_capacity(tree.nodes.len());
    for (k, node) in tree.nodes.iter().enumerate() {
        let left = resolve(node.left, alignments, &merged, k)?;
        let right = resolve(node.right, alignments, &merged, k)?;
        let out = align_pair(left, right, rt_width, gap_penalty)?;
        debug!(
            "Merged node {} ({} experiments, {} columns)",
            k,
            out.n_experiments(),
            out.len()
        );
        merged.push(out);
    }

    let mut result = match merged.pop() {
        Some(root) => root,
        None => alignments[0].clone(),
    };
    result.filter_min_peaks(min_peaks);
    info!(
        "Aligned {} experiments into {} columns",
        result.n_experiments(),
        result.len()
    );
    Ok(result)
}

fn resolve<'a>(
    node: NodeRef,
    leaves: &'a [Alignment],
    merged: &'a [Alignment],
    at: usize,
) -> Result<&'a Alignment> {
    let (found, index, len) = match node {
        NodeRef::Leaf(i) => (leaves.get(i), i, leaves.len()),
        // Only nodes built before `at` exist yet.
        NodeRef::Node(j) => (merged.get(j), j, merged.len()),
    };
    found.ok_or_else(|| {
        DataShapeError::IndexOutOfBounds {
            index,
            len,
            context: format!("guide tree node {}", at),
        }
        .into()
    })
}

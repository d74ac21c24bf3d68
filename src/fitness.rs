//! Component G — fitness functions scoring a candidate tree decomposition.
//!
//! Each function maps a decomposition to a real number: lower raw cost is
//! better, and per §4.6 the value actually returned is *negated* so that an
//! external maximizing optimizer does the right thing.

use crate::decomposition::DecompNode;

fn join_nodes<'a>(node: &'a DecompNode, out: &mut Vec<&'a DecompNode>) {
    if matches!(node, DecompNode::Join { .. }) {
        out.push(node);
    }
    for child in node.children() {
        join_nodes(child, out);
    }
}

fn collect_join_nodes(root: &DecompNode) -> Vec<&DecompNode> {
    let mut out = Vec::new();
    join_nodes(root, &mut out);
    out
}

fn forget_nodes<'a>(node: &'a DecompNode, out: &mut Vec<&'a DecompNode>) {
    if matches!(node, DecompNode::Forget { .. }) {
        out.push(node);
    }
    for child in node.children() {
        forget_nodes(child, out);
    }
}

pub fn width(root: &DecompNode) -> f64 {
    -(root.width() as f64)
}

pub fn height(root: &DecompNode) -> f64 {
    -(root.height() as f64)
}

pub fn join_count(root: &DecompNode) -> f64 {
    -(collect_join_nodes(root).len() as f64)
}

pub fn join_bag_size(root: &DecompNode) -> f64 {
    let total: usize = collect_join_nodes(root).iter().map(|n| n.bag_size()).sum();
    -(total as f64)
}

pub fn join_child_count(root: &DecompNode) -> f64 {
    let total: usize = collect_join_nodes(root).iter().map(|n| n.children().len()).sum();
    -(total as f64)
}

pub fn join_bag_size_exp(root: &DecompNode) -> f64 {
    let total: f64 = collect_join_nodes(root)
        .iter()
        .map(|n| n.children().len() as f64 * (n.bag_size().max(1) as f64).ln())
        .sum();
    -total
}

pub fn join_child_bag_size(root: &DecompNode) -> f64 {
    let total: usize = collect_join_nodes(root)
        .iter()
        .flat_map(|n| n.children())
        .map(|c| c.bag_size())
        .sum();
    -(total as f64)
}

pub fn est_join_effort(root: &DecompNode) -> f64 {
    let total: f64 = collect_join_nodes(root)
        .iter()
        .map(|n| n.children().iter().map(|c| c.bag_size().max(1) as f64).product::<f64>())
        .sum();
    -total
}

/// Geometric estimate of total NSF leaves across the whole decomposition,
/// approximating each forget step as potentially doubling the branching
/// factor (an ∃/∀ split cost), the same shape `ComputationManager`'s own
/// global estimator uses for `leavesCount`.
pub fn removal_impact(root: &DecompNode) -> f64 {
    let mut forgets = Vec::new();
    forget_nodes(root, &mut forgets);
    -(2f64.powi(forgets.len() as i32))
}

pub fn removal_join_min(root: &DecompNode) -> f64 {
    let joins = collect_join_nodes(root);
    let min_bag = joins.iter().map(|n| n.bag_size()).min().unwrap_or(0);
    -(min_bag as f64)
}

pub fn removal_join_max(root: &DecompNode) -> f64 {
    let joins = collect_join_nodes(root);
    let max_bag = joins.iter().map(|n| n.bag_size()).max().unwrap_or(0);
    -(max_bag as f64)
}

/// Prefers decompositions that forget innermost-quantified variables
/// early: ratio of (depth at which a variable is forgotten) to (total
/// height), averaged, requires a `level` lookup so is parameterized over
/// one.
pub fn variable_position(root: &DecompNode, level_of: impl Fn(u32) -> usize + Copy) -> f64 {
    let total_height = root.height().max(1) as f64;
    let mut depths_by_level_rank = Vec::new();
    collect_forget_depths(root, 0, level_of, &mut depths_by_level_rank);
    if depths_by_level_rank.is_empty() {
        return 0.0;
    }
    let avg_ratio: f64 = depths_by_level_rank
        .iter()
        .map(|&(depth, _level)| depth as f64 / total_height)
        .sum::<f64>()
        / depths_by_level_rank.len() as f64;
    // Innermost (higher level number) variables forgotten early (small
    // depth ratio) should score well; the raw cost is the ratio itself,
    // so deeper/later forgets of inner variables are penalized more.
    -avg_ratio
}

fn collect_forget_depths(
    node: &DecompNode,
    depth: usize,
    level_of: impl Fn(u32) -> usize + Copy,
    out: &mut Vec<(usize, usize)>,
) {
    if let DecompNode::Forget { bag, child } = node {
        // The forgotten vertex is the one in child's bag but not in ours.
        if let Some(&forgotten) = child.bag().iter().find(|v| !bag.contains(v)) {
            out.push((depth, level_of(forgotten)));
        }
    }
    for child in node.children() {
        collect_forget_depths(child, depth + 1, level_of, out);
    }
}

/// Punishes forgetting of low-level (outer) variables: sums `level_of`
/// across every forget node, so forgetting outer variables (small level
/// numbers) contributes more raw cost — these should ideally stay live
/// until their quantifier block is actually resolved.
pub fn removed_level(root: &DecompNode, level_of: impl Fn(u32) -> usize + Copy) -> f64 {
    let mut forgets = Vec::new();
    forget_nodes(root, &mut forgets);
    // Outer (small-numbered) levels contribute more raw cost than inner
    // ones, so forgetting them early is penalized more heavily.
    let total: f64 = forgets
        .iter()
        .filter_map(|n| match n {
            DecompNode::Forget { bag, child } => {
                child.bag().iter().find(|v| !bag.contains(v)).map(|&v| 1.0 / level_of(v).max(1) as f64)
            }
            _ => None,
        })
        .sum();
    -total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::{build_decomposition, EliminationHeuristic};
    use crate::hypergraph::{Clause, Hypergraph};
    use rustc_hash::FxHashMap;

    fn path_hypergraph() -> Hypergraph {
        let mut levels = FxHashMap::default();
        levels.insert(1, 1);
        levels.insert(2, 2);
        levels.insert(3, 3);
        let clauses = vec![
            Clause { vertices: vec![1, 2], signs: vec![true, true] },
            Clause { vertices: vec![2, 3], signs: vec![true, true] },
        ];
        Hypergraph::new(levels, clauses, 3)
    }

    #[test]
    fn scores_are_non_positive() {
        let hg = path_hypergraph();
        let decomp = build_decomposition(&hg, EliminationHeuristic::MinFill);
        assert!(width(&decomp) <= 0.0);
        assert!(height(&decomp) <= 0.0);
        assert!(join_count(&decomp) <= 0.0);
        assert!(removal_impact(&decomp) <= 0.0);
    }

    #[test]
    fn variable_position_prefers_inner_early_forgets() {
        let hg = path_hypergraph();
        let decomp = build_decomposition(&hg, EliminationHeuristic::MinFill);
        let level_of = |v: u32| hg.level(v);
        let score = variable_position(&decomp, level_of);
        assert!(score <= 0.0);
    }
}

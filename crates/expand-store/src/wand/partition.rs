//! Posting-list block partitioning for block-max metadata.
//!
//! A posting list is cut into blocks, each carrying the last docid it
//! covers plus the maxima of the per-posting term weight and static
//! document weight inside it. Two strategies:
//!
//! - **Fixed**: every block holds `block_size` postings.
//! - **Variable**: block boundaries minimize an approximation-loss cost,
//!   `fixed_cost + idf_estimate * sum(block_max - score_i)`, via an
//!   approximate shortest-path DP over geometrically growing cost windows
//!   (`eps1` sets the first window's slack, `eps2` the growth ratio).

/// Per-list partitioning output, parallel arrays over blocks.
pub(crate) struct BlockPartition {
    pub last_docids: Vec<u32>,
    pub max_scores: Vec<f32>,
    pub max_weights: Vec<f32>,
}

/// Cut `docids` into runs of `block_size`.
///
/// Interior blocks record `first docid of the next block - 1` as their last
/// docid, a valid upper bound that lets a block cursor skip without looking
/// at the postings; the final block records the true last docid.
pub(crate) fn fixed_blocks(
    docids: &[u32],
    scores: &[f64],
    weights: &[f64],
    block_size: usize,
) -> BlockPartition {
    debug_assert!(!docids.is_empty());
    let mut partition = BlockPartition {
        last_docids: Vec::new(),
        max_scores: Vec::new(),
        max_weights: Vec::new(),
    };
    let mut block_max_score = f64::MIN;
    let mut block_max_weight = f64::MIN;
    let mut current_block = 0usize;
    for i in 0..docids.len() {
        if i / block_size != current_block {
            partition.last_docids.push(docids[i] - 1);
            partition.max_scores.push(block_max_score as f32);
            partition.max_weights.push(block_max_weight as f32);
            current_block = i / block_size;
            block_max_score = f64::MIN;
            block_max_weight = f64::MIN;
        }
        block_max_score = block_max_score.max(scores[i]);
        block_max_weight = block_max_weight.max(weights[i]);
    }
    partition.last_docids.push(*docids.last().unwrap());
    partition.max_scores.push(block_max_score as f32);
    partition.max_weights.push(block_max_weight as f32);
    partition
}

struct CostWindow {
    start: usize,
    end: usize,
    max_pos: usize,
    bound: f64,
}

/// Choose block boundaries minimizing the summed block cost.
///
/// The cost of block `[s, e)` is
/// `fixed_cost + idf_estimate * (max(scores[s..e]) * (e - s) - sum(scores[s..e]))`,
/// the upper-bound mass a traversal would overestimate by. The DP slides one
/// window per cost bound; bounds grow geometrically so the result is within
/// a `(1 + eps2)` factor of optimal while staying near-linear.
pub(crate) fn variable_blocks(
    docids: &[u32],
    scores: &[f64],
    weights: &[f64],
    eps1: f64,
    eps2: f64,
    fixed_cost: f64,
    idf_estimate: f64,
) -> BlockPartition {
    let n = docids.len();
    debug_assert!(n > 0);
    // A zero fixed cost would make the window bounds degenerate.
    let fixed_cost = fixed_cost.max(f64::MIN_POSITIVE);

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut total_max = f64::MIN;
    for i in 0..n {
        prefix.push(prefix[i] + scores[i]);
        total_max = total_max.max(scores[i]);
    }
    let block_cost = |start: usize, end: usize, max: f64| -> f64 {
        fixed_cost + idf_estimate * (max * (end - start) as f64 - (prefix[end] - prefix[start]))
    };
    let single_block_cost = block_cost(0, n, total_max);

    // One sliding window per cost bound.
    let mut windows = Vec::new();
    let mut bound = fixed_cost * (1.0 + eps1);
    loop {
        windows.push(CostWindow {
            start: 0,
            end: 0,
            max_pos: 0,
            bound,
        });
        if bound >= single_block_cost {
            break;
        }
        bound *= 1.0 + eps2;
    }

    let mut min_cost = vec![f64::INFINITY; n + 1];
    let mut parent = vec![0usize; n + 1];
    min_cost[0] = 0.0;

    for i in 0..n {
        if min_cost[i].is_infinite() {
            continue;
        }
        // A singleton block always exists; keeps every position reachable.
        if min_cost[i] + fixed_cost < min_cost[i + 1] {
            min_cost[i + 1] = min_cost[i] + fixed_cost;
            parent[i + 1] = i;
        }
        for window in &mut windows {
            // Slide the window start up to the current position.
            if window.end < i {
                window.end = i;
            }
            if window.start < i {
                window.start = i;
                if window.max_pos < i {
                    // Max fell out of the window; rescan what is left.
                    window.max_pos = i;
                    for p in i..window.end {
                        if scores[p] > scores[window.max_pos] {
                            window.max_pos = p;
                        }
                    }
                }
            }
            // Grow the window while its block cost stays within bound.
            loop {
                if window.end >= n {
                    break;
                }
                let candidate_max = if window.end == window.start {
                    scores[window.end]
                } else {
                    scores[window.max_pos].max(scores[window.end])
                };
                if block_cost(window.start, window.end + 1, candidate_max) > window.bound {
                    break;
                }
                if window.end == window.start || scores[window.end] > scores[window.max_pos] {
                    window.max_pos = window.end;
                }
                window.end += 1;
            }
            if window.end > i {
                let max = scores[window.max_pos];
                let cost = min_cost[i] + block_cost(i, window.end, max);
                if cost < min_cost[window.end] {
                    min_cost[window.end] = cost;
                    parent[window.end] = i;
                }
            }
        }
    }

    // Walk parents back from n to recover boundaries.
    let mut bounds = Vec::new();
    let mut pos = n;
    while pos > 0 {
        bounds.push(pos);
        pos = parent[pos];
    }
    bounds.push(0);
    bounds.reverse();

    let mut partition = BlockPartition {
        last_docids: Vec::with_capacity(bounds.len() - 1),
        max_scores: Vec::with_capacity(bounds.len() - 1),
        max_weights: Vec::with_capacity(bounds.len() - 1),
    };
    for b in 0..bounds.len() - 1 {
        let (s, e) = (bounds[b], bounds[b + 1]);
        let mut max_score = f64::MIN;
        let mut max_weight = f64::MIN;
        for i in s..e {
            max_score = max_score.max(scores[i]);
            max_weight = max_weight.max(weights[i]);
        }
        partition.last_docids.push(docids[e - 1]);
        partition.max_scores.push(max_score as f32);
        partition.max_weights.push(max_weight as f32);
    }
    partition
}

//! Ordering and pruning of finished paths.
//!
//! Paths are presented in chronological order by default: a later option
//! that takes longer still comes after an earlier one, rather than being
//! sorted by raw duration.

use std::cmp::Ordering;

use super::graph_path::GraphPath;

/// Chronological order: earliest arrival first, or for arrive-by requests
/// latest departure first. Ties go to the lower weight.
pub fn compare_chronological(a: &GraphPath, b: &GraphPath) -> Ordering {
    let primary = if a.is_arrive_by() {
        b.start_time().cmp(&a.start_time())
    } else {
        a.end_time().cmp(&b.end_time())
    };
    primary.then_with(|| a.weight().total_cmp(&b.weight()))
}

/// Shortest duration first, ties to the lower weight.
pub fn compare_duration(a: &GraphPath, b: &GraphPath) -> Ordering {
    a.duration()
        .cmp(&b.duration())
        .then_with(|| a.weight().total_cmp(&b.weight()))
}

/// Sort paths chronologically.
pub fn rank_paths(mut paths: Vec<GraphPath>) -> Vec<GraphPath> {
    paths.sort_by(compare_chronological);
    paths
}

/// Remove paths that repeat an earlier one.
///
/// Two paths are duplicates if they visit the same vertices, ride the same
/// trips, and start and end at the same times. The first of each group is
/// kept, and the input order is otherwise preserved.
pub fn deduplicate(paths: Vec<GraphPath>) -> Vec<GraphPath> {
    if paths.len() <= 1 {
        return paths;
    }

    let mut result: Vec<GraphPath> = Vec::with_capacity(paths.len());
    for path in paths {
        let duplicate = result.iter().any(|existing| {
            existing.start_time() == path.start_time()
                && existing.end_time() == path.end_time()
                && existing.trips() == path.trips()
                && existing.vertices() == path.vertices()
        });
        if !duplicate {
            result.push(path);
        }
    }
    result
}

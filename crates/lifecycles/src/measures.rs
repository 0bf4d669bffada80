//! Set and label measures behind the facets and the classic detectors.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::GroupSet;

/// Count label occurrences, keeping the order in which labels were first seen.
fn label_counts<T: Eq + Hash>(labels: &[T]) -> Vec<(&T, usize)> {
    let mut index: HashMap<&T, usize> = HashMap::new();
    let mut counts: Vec<(&T, usize)> = Vec::new();

    for label in labels {
        match index.get(label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label, counts.len());
                counts.push((label, 1));
            }
        }
    }

    counts
}

/// Shannon entropy of a list of labels in the given logarithm base.
///
/// An empty list has entropy 0.
pub fn entropy<T: Eq + Hash>(labels: &[T], base: f64) -> f64 {
    let n = labels.len() as f64;
    -label_counts(labels)
        .into_iter()
        .map(|(_, count)| {
            let p = count as f64 / n;
            p * p.log(base)
        })
        .sum::<f64>()
}

/// Shannon entropy divided by its maximum, `log(#distinct labels)`.
///
/// Undefined (`None`) for fewer than two distinct labels. Rounding error is
/// clamped away so the result stays within `[0, 1]`.
pub fn normalized_shannon_entropy<T: Eq + Hash>(labels: &[T], base: f64) -> Option<f64> {
    let distinct = label_counts(labels).len();
    if distinct < 2 {
        return None;
    }
    let normalized = entropy(labels, base) / (distinct as f64).log(base);
    Some(normalized.clamp(0.0, 1.0))
}

/// Unicity facet: normalized entropy of flow-branch labels, 0 when undefined.
///
/// If a target receives three elements from branch `0` and two from branch
/// `1`, the labels are `[0, 0, 0, 1, 1]`.
pub fn facet_unicity<T: Eq + Hash>(labels: &[T]) -> f64 {
    normalized_shannon_entropy(labels, std::f64::consts::E).unwrap_or(0.0)
}

/// Identity facet (contribution factor): `(Σ |T∩r|² / |r|) / |T|`.
///
/// 0 without references; `None` for an empty target.
pub fn facet_identity(target: &GroupSet, references: &[&GroupSet]) -> Option<f64> {
    if target.is_empty() {
        return None;
    }

    let weight: f64 = references
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| {
            let shared = r.intersection(target).count() as f64;
            shared * shared / r.len() as f64
        })
        .sum();

    Some(weight / target.len() as f64)
}

/// Outflow facet (difference factor): share of the target outside every reference.
///
/// 1 without references; `None` for an empty target.
pub fn facet_outflow(target: &GroupSet, references: &[&GroupSet]) -> Option<f64> {
    if target.is_empty() {
        return None;
    }
    if references.is_empty() {
        return Some(1.0);
    }

    let unexplained = target
        .iter()
        .filter(|e| !references.iter().any(|r| r.contains(*e)))
        .count();

    Some(unexplained as f64 / target.len() as f64)
}

/// Change in attribute entropy between a target and its references.
///
/// Undefined entropies count as 0. Returns `None` without references.
pub fn attribute_entropy_change<T: Eq + Hash>(
    target_labels: &[T],
    reference_labels: &[Vec<T>],
    base: f64,
) -> Option<f64> {
    if reference_labels.is_empty() {
        return None;
    }

    let target_entropy = normalized_shannon_entropy(target_labels, base).unwrap_or(0.0);
    let reference_entropy = reference_labels
        .iter()
        .map(|labels| normalized_shannon_entropy(labels, base).unwrap_or(0.0))
        .sum::<f64>()
        / reference_labels.len() as f64;

    Some(target_entropy - reference_entropy)
}

/// Most common label and its relative frequency.
///
/// Ties go to the label seen first; `None` for an empty list.
pub fn purity<T: Eq + Hash + Clone>(labels: &[T]) -> Option<(T, f64)> {
    let mut best: Option<(&T, usize)> = None;
    for (label, count) in label_counts(labels) {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, count)| (label.clone(), count as f64 / labels.len() as f64))
}

/// Jaccard index of two sets; 0 when both are empty.
pub fn jaccard(a: &GroupSet, b: &GroupSet) -> f64 {
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// Cluster integrity of a target against the union of two references:
/// `|T ∩ (r1 ∪ r2)| / max(|T|, |r1 ∪ r2|)`.
pub fn pair_integrity(target: &GroupSet, r1: &GroupSet, r2: &GroupSet) -> f64 {
    let union: GroupSet = r1.union(r2).cloned().collect();
    let largest = union.len().max(target.len());
    if largest == 0 {
        return 0.0;
    }
    union.intersection(target).count() as f64 / largest as f64
}

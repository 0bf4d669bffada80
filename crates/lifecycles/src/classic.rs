//! Literature event detectors working directly on groups and flows:
//! Asur et al. (merge, split, birth, death, continue) and Greene et al.
//! (Jaccard-matched event graph).

use serde::{Deserialize, Serialize};

use crate::measures::{jaccard, pair_integrity};
use crate::store::LifeCycle;
use crate::types::{Direction, LifecycleResult};

/// Default cluster-integrity threshold for merge and split events.
pub const DEFAULT_ASUR_THRESHOLD: f64 = 0.5;

/// Default Jaccard threshold for event-graph edges.
pub const DEFAULT_GREENE_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsurEventKind {
    Merge,
    Split,
    Birth,
    Death,
    Continue,
}

/// A single event found by the Asur detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsurEvent {
    pub source: String,
    pub kind: AsurEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

/// Asur events grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsurEvents {
    pub merge: Vec<AsurEvent>,
    pub split: Vec<AsurEvent>,
    pub birth: Vec<AsurEvent>,
    pub death: Vec<AsurEvent>,
    #[serde(rename = "continue")]
    pub continuation: Vec<AsurEvent>,
}

impl AsurEvents {
    pub fn of_kind(&self, kind: AsurEventKind) -> &[AsurEvent] {
        match kind {
            AsurEventKind::Merge => &self.merge,
            AsurEventKind::Split => &self.split,
            AsurEventKind::Birth => &self.birth,
            AsurEventKind::Death => &self.death,
            AsurEventKind::Continue => &self.continuation,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AsurEvent> {
        self.merge
            .iter()
            .chain(&self.split)
            .chain(&self.birth)
            .chain(&self.death)
            .chain(&self.continuation)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A directed edge of the Greene event graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeneEdge {
    pub tid: usize,
    pub source: String,
    pub target: String,
    pub score: f64,
}

/// Pairwise merge (backward) or split (forward) events scoring above `threshold`.
fn pair_events(
    lc: &LifeCycle,
    direction: Direction,
    kind: AsurEventKind,
    threshold: f64,
) -> LifecycleResult<Vec<AsurEvent>> {
    let mut events = Vec::new();

    for &tid in lc.temporal_ids() {
        for name in lc.get_partition_at(tid) {
            let target = lc.group_ref(name)?;
            let flow = lc.group_flow(name, direction, 1)?;
            let references = lc.flow_references(&flow)?;
            let names: Vec<&str> = flow.names().collect();

            for a in 0..names.len() {
                for b in (a + 1)..names.len() {
                    let score = pair_integrity(target, references[a], references[b]);
                    if score > threshold {
                        events.push(AsurEvent {
                            source: name.clone(),
                            kind,
                            score: Some(score),
                            references: vec![names[a].to_string(), names[b].to_string()],
                        });
                    }
                }
            }
        }
    }

    Ok(events)
}

/// Groups with an empty flow in `direction`, outside the boundary time step.
fn orphan_events(
    lc: &LifeCycle,
    direction: Direction,
    kind: AsurEventKind,
) -> LifecycleResult<Vec<AsurEvent>> {
    let mut events = Vec::new();

    for &tid in lc.temporal_ids() {
        if direction.adjacent(tid, lc.temporal_ids().len()).is_none() {
            continue;
        }
        for name in lc.get_partition_at(tid) {
            if lc.group_flow(name, direction, 1)?.is_empty() {
                events.push(AsurEvent {
                    source: name.clone(),
                    kind,
                    score: None,
                    references: Vec::new(),
                });
            }
        }
    }

    Ok(events)
}

fn continue_events(lc: &LifeCycle) -> LifecycleResult<Vec<AsurEvent>> {
    let mut events = Vec::new();

    for &tid in lc.temporal_ids() {
        for name in lc.get_partition_at(tid) {
            let target = lc.group_ref(name)?;
            for next in lc.group_flow(name, Direction::Forward, 1)?.names() {
                if lc.group_ref(next)? == target {
                    events.push(AsurEvent {
                        source: name.clone(),
                        kind: AsurEventKind::Continue,
                        score: None,
                        references: vec![next.to_string()],
                    });
                }
            }
        }
    }

    Ok(events)
}

/// Detect merge, split, birth, death and continue events (Asur et al.).
///
/// Merge and split events are scored on every pair of neighbours in the
/// backward or forward flow, so the cost grows with the square of the flow size.
pub fn events_asur(lc: &LifeCycle, threshold: f64) -> LifecycleResult<AsurEvents> {
    let events = AsurEvents {
        merge: pair_events(lc, Direction::Backward, AsurEventKind::Merge, threshold)?,
        split: pair_events(lc, Direction::Forward, AsurEventKind::Split, threshold)?,
        birth: orphan_events(lc, Direction::Backward, AsurEventKind::Birth)?,
        death: orphan_events(lc, Direction::Forward, AsurEventKind::Death)?,
        continuation: continue_events(lc)?,
    };

    tracing::debug!(
        "Asur events: {} merge, {} split, {} birth, {} death, {} continue",
        events.merge.len(),
        events.split.len(),
        events.birth.len(),
        events.death.len(),
        events.continuation.len()
    );
    Ok(events)
}

/// Build the event graph of Greene et al.: an edge for every forward neighbour
/// whose Jaccard index with the source group exceeds `threshold`.
pub fn event_graph_greene(lc: &LifeCycle, threshold: f64) -> LifecycleResult<Vec<GreeneEdge>> {
    let mut edges = Vec::new();

    for &tid in lc.temporal_ids() {
        for name in lc.get_partition_at(tid) {
            let source = lc.group_ref(name)?;
            for next in lc.group_flow(name, Direction::Forward, 1)?.names() {
                let score = jaccard(source, lc.group_ref(next)?);
                if score > threshold {
                    edges.push(GreeneEdge {
                        tid,
                        source: name.clone(),
                        target: next.to_string(),
                        score,
                    });
                }
            }
        }
    }

    tracing::debug!("Greene event graph: {} edges", edges.len());
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dtype;

    fn two_steps() -> LifeCycle {
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(vec![vec![1, 2, 3], vec![4, 5]]).unwrap();
        lc.add_partition(vec![vec![1, 2, 4], vec![3, 5]]).unwrap();
        lc
    }

    fn sources(events: &[AsurEvent]) -> Vec<&str> {
        events.iter().map(|e| e.source.as_str()).collect()
    }

    #[test]
    fn test_no_birth_when_flow_exists() {
        let events = events_asur(&two_steps(), DEFAULT_ASUR_THRESHOLD).unwrap();
        assert!(events.birth.is_empty());
        assert!(events.death.is_empty());
        assert!(events.continuation.is_empty());
    }

    #[test]
    fn test_birth_and_death() {
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(vec![vec![1, 2], vec![3]]).unwrap();
        lc.add_partition(vec![vec![1, 2], vec![4]]).unwrap();

        let events = events_asur(&lc, DEFAULT_ASUR_THRESHOLD).unwrap();
        assert_eq!(sources(&events.birth), vec!["1_1"]);
        assert_eq!(sources(&events.death), vec!["0_1"]);
        assert_eq!(sources(&events.continuation), vec!["0_0"]);
        assert_eq!(events.continuation[0].references, vec!["1_0"]);
    }

    #[test]
    fn test_merge_and_split() {
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(vec![vec![1, 2], vec![3, 4]]).unwrap();
        lc.add_partition(vec![vec![1, 2, 3, 4]]).unwrap();
        lc.add_partition(vec![vec![1, 2], vec![3, 4]]).unwrap();

        let events = events_asur(&lc, DEFAULT_ASUR_THRESHOLD).unwrap();
        assert_eq!(sources(&events.merge), vec!["1_0"]);
        assert_eq!(events.merge[0].references, vec!["0_0", "0_1"]);
        assert_eq!(events.merge[0].score, Some(1.0));
        assert_eq!(sources(&events.split), vec!["1_0"]);
        assert_eq!(events.split[0].references, vec!["2_0", "2_1"]);
        assert_eq!(events.of_kind(AsurEventKind::Merge).len(), 1);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_merge_below_threshold() {
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(vec![vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10]]).unwrap();
        lc.add_partition(vec![vec![1, 6]]).unwrap();

        // |{1, 6}| / max(2, 10)
        let events = events_asur(&lc, DEFAULT_ASUR_THRESHOLD).unwrap();
        assert!(events.merge.is_empty());
        let events = events_asur(&lc, 0.1).unwrap();
        assert_eq!(events.merge[0].score, Some(0.2));
    }

    #[test]
    fn test_detectors_follow_partition_order() {
        // "0_10" sorts before "0_2" as text but comes last in its partition
        let partition: Vec<Vec<i64>> = (0..11).map(|i| vec![i]).collect();
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(partition.clone()).unwrap();
        lc.add_partition(partition).unwrap();

        let expected: Vec<String> = (0..11).map(|i| format!("0_{i}")).collect();
        let events = events_asur(&lc, DEFAULT_ASUR_THRESHOLD).unwrap();
        let continued: Vec<String> = events.continuation.iter().map(|e| e.source.clone()).collect();
        assert_eq!(continued, expected);

        let edges = event_graph_greene(&lc, DEFAULT_GREENE_THRESHOLD).unwrap();
        let sources: Vec<String> = edges.iter().map(|e| e.source.clone()).collect();
        assert_eq!(sources, expected);
    }

    #[test]
    fn test_greene_graph() {
        let edges = event_graph_greene(&two_steps(), DEFAULT_GREENE_THRESHOLD).unwrap();
        assert!(edges.contains(&GreeneEdge {
            tid: 0,
            source: "0_0".into(),
            target: "1_0".into(),
            score: 0.5,
        }));
        // 0_1 = {4, 5} and 1_0 = {1, 2, 4}: 1/4
        assert!(edges
            .iter()
            .any(|e| e.source == "0_1" && e.target == "1_0" && e.score == 0.25));
        assert!(edges.iter().all(|e| e.score > DEFAULT_GREENE_THRESHOLD));

        let strict = event_graph_greene(&two_steps(), 0.5).unwrap();
        assert!(strict.is_empty());
    }

    #[test]
    fn test_asur_events_serialize_by_kind() {
        let events = events_asur(&two_steps(), DEFAULT_ASUR_THRESHOLD).unwrap();
        let json = serde_json::to_value(&events).unwrap();
        assert!(json.get("continue").is_some());
        assert!(json.get("merge").is_some());
    }
}

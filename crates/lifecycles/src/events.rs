//! Event classification: maps the three facets to eight scored lifecycle
//! events per direction and picks the most typical one.
//!
//! Each facet is read as a soft boolean; an event's score is the product of
//! its three literals, so the eight scores cover every sign combination of
//! `(U, I, O)` exactly once. Scores are not normalized and ambiguous groups can
//! score several events almost equally.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_all_flows, analyze_flow, AnalysisConfig};
use crate::store::LifeCycle;
use crate::types::{Direction, Facets, LifecycleResult, MetricVersion};

/// A lifecycle event label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Birth,
    Accumulation,
    Growth,
    Expansion,
    Continue,
    Merge,
    Offspring,
    Reorganization,
    Death,
    Dispersion,
    Shrink,
    Reduction,
    Split,
    Ancestor,
    Disassemble,
}

const FORWARD_EVENTS: [EventKind; 8] = [
    EventKind::Death,
    EventKind::Dispersion,
    EventKind::Shrink,
    EventKind::Reduction,
    EventKind::Continue,
    EventKind::Split,
    EventKind::Ancestor,
    EventKind::Disassemble,
];

const BACKWARD_EVENTS: [EventKind; 8] = [
    EventKind::Birth,
    EventKind::Accumulation,
    EventKind::Growth,
    EventKind::Expansion,
    EventKind::Continue,
    EventKind::Merge,
    EventKind::Offspring,
    EventKind::Reorganization,
];

impl EventKind {
    /// Event names of a direction, in score order.
    pub fn names(direction: Direction) -> [EventKind; 8] {
        match direction {
            Direction::Forward => FORWARD_EVENTS,
            Direction::Backward => BACKWARD_EVENTS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Birth => "Birth",
            EventKind::Accumulation => "Accumulation",
            EventKind::Growth => "Growth",
            EventKind::Expansion => "Expansion",
            EventKind::Continue => "Continue",
            EventKind::Merge => "Merge",
            EventKind::Offspring => "Offspring",
            EventKind::Reorganization => "Reorganization",
            EventKind::Death => "Death",
            EventKind::Dispersion => "Dispersion",
            EventKind::Shrink => "Shrink",
            EventKind::Reduction => "Reduction",
            EventKind::Split => "Split",
            EventKind::Ancestor => "Ancestor",
            EventKind::Disassemble => "Disassemble",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores of the eight events of one group in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventWeights {
    pub group: String,
    pub direction: Direction,
    pub scores: Vec<(EventKind, f64)>,
}

impl EventWeights {
    pub fn get(&self, kind: EventKind) -> Option<f64> {
        self.scores
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, score)| *score)
    }

    pub fn typicality(&self) -> (EventKind, f64) {
        event_typicality(self)
    }
}

/// All eight scores of a group in one direction and the most typical of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typicality {
    pub direction: Direction,
    pub event: EventKind,
    pub score: f64,
    pub weights: EventWeights,
}

/// The eight event scores for a facet triple, in [`EventKind::names`] order.
pub fn event_scores(facets: &Facets, version: MetricVersion) -> [f64; 8] {
    let (i, o) = (facets.identity, facets.outflow);
    // Legacy scores read unicity with the opposite polarity.
    let u = match version {
        MetricVersion::Facets => facets.unicity,
        MetricVersion::Legacy => 1.0 - facets.unicity,
    };

    [
        u * (1.0 - i) * o,
        (1.0 - u) * (1.0 - i) * o,
        u * i * o,
        (1.0 - u) * i * o,
        u * i * (1.0 - o),
        (1.0 - u) * i * (1.0 - o),
        u * (1.0 - i) * (1.0 - o),
        (1.0 - u) * (1.0 - i) * (1.0 - o),
    ]
}

/// Label facet scores with the event names of `direction`.
pub fn weights_from_facets(
    group: &str,
    direction: Direction,
    facets: &Facets,
    version: MetricVersion,
) -> EventWeights {
    let scores = EventKind::names(direction)
        .into_iter()
        .zip(event_scores(facets, version))
        .collect();

    EventWeights {
        group: group.to_string(),
        direction,
        scores,
    }
}

/// Event scores of `target` in `direction` with the default configuration.
pub fn event_weights(
    lc: &LifeCycle,
    target: &str,
    direction: Direction,
) -> LifecycleResult<EventWeights> {
    event_weights_with(lc, target, direction, &AnalysisConfig::default())
}

pub fn event_weights_with(
    lc: &LifeCycle,
    target: &str,
    direction: Direction,
    config: &AnalysisConfig,
) -> LifecycleResult<EventWeights> {
    let analysis = analyze_flow(lc, target, direction, config)?;
    Ok(weights_from_facets(
        target,
        direction,
        &analysis.facets,
        config.metric_version,
    ))
}

/// Highest scoring event; ties go to the event that comes first in name order.
///
/// An all-zero score vector yields the first event with score 0.
pub fn event_typicality(weights: &EventWeights) -> (EventKind, f64) {
    let mut scores = weights.scores.iter().copied();
    let first = scores
        .next()
        .unwrap_or((EventKind::names(weights.direction)[0], 0.0));

    scores.fold(first, |best, candidate| {
        if candidate.1 > best.1 {
            candidate
        } else {
            best
        }
    })
}

/// Event scores and most typical event of `target` in each requested direction.
pub fn event(
    lc: &LifeCycle,
    target: &str,
    directions: &[Direction],
) -> LifecycleResult<Vec<Typicality>> {
    directions
        .iter()
        .map(|&direction| {
            let weights = event_weights(lc, target, direction)?;
            let (event, score) = weights.typicality();
            Ok(Typicality {
                direction,
                event,
                score,
                weights,
            })
        })
        .collect()
}

/// Event scores of every analyzable group, for each requested direction.
pub fn events_all(
    lc: &LifeCycle,
    directions: &[Direction],
    config: &AnalysisConfig,
) -> LifecycleResult<Vec<EventWeights>> {
    let mut all = Vec::new();
    for &direction in directions {
        for analysis in analyze_all_flows(lc, direction, config)? {
            all.push(weights_from_facets(
                &analysis.group,
                direction,
                &analysis.facets,
                config.metric_version,
            ));
        }
    }
    Ok(all)
}

/// Mean `Continue` score over every analyzable group; 0 when there is none.
pub fn stability(lc: &LifeCycle, direction: Direction) -> LifecycleResult<f64> {
    let events = events_all(lc, &[direction], &AnalysisConfig::default())?;
    if events.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = events
        .iter()
        .filter_map(|w| w.get(EventKind::Continue))
        .sum();
    Ok(total / events.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dtype;

    fn facets(unicity: f64, identity: f64, outflow: f64) -> Facets {
        Facets {
            unicity,
            identity,
            outflow,
            size: 1,
        }
    }

    fn two_steps() -> LifeCycle {
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(vec![vec![1, 2, 3], vec![4, 5]]).unwrap();
        lc.add_partition(vec![vec![1, 2, 4], vec![3, 5]]).unwrap();
        lc
    }

    #[test]
    fn test_sign_patterns_are_exhaustive() {
        // each corner of the facet cube selects exactly one event
        let mut hit = [0usize; 8];
        for u in [0.0, 1.0] {
            for i in [0.0, 1.0] {
                for o in [0.0, 1.0] {
                    let scores = event_scores(&facets(u, i, o), MetricVersion::Facets);
                    let ones: Vec<usize> = (0..8).filter(|&k| scores[k] == 1.0).collect();
                    assert_eq!(ones.len(), 1);
                    assert_eq!(scores.iter().sum::<f64>(), 1.0);
                    hit[ones[0]] += 1;
                }
            }
        }
        assert_eq!(hit, [1; 8]);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        for scores in [
            event_scores(&facets(0.3, 0.7, 0.1), MetricVersion::Facets),
            event_scores(&facets(0.9, 0.2, 0.5), MetricVersion::Legacy),
        ] {
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn test_named_corners() {
        let v = MetricVersion::Facets;
        let birth = weights_from_facets("g", Direction::Backward, &facets(1.0, 0.0, 1.0), v);
        assert_eq!(birth.typicality(), (EventKind::Birth, 1.0));

        let split = weights_from_facets("g", Direction::Forward, &facets(0.0, 1.0, 0.0), v);
        assert_eq!(split.typicality(), (EventKind::Split, 1.0));

        let merge = weights_from_facets("g", Direction::Backward, &facets(0.0, 1.0, 0.0), v);
        assert_eq!(merge.typicality(), (EventKind::Merge, 1.0));

        let cont = weights_from_facets("g", Direction::Forward, &facets(1.0, 1.0, 0.0), v);
        assert_eq!(cont.typicality(), (EventKind::Continue, 1.0));
    }

    #[test]
    fn test_legacy_flips_unicity() {
        let f = facets(1.0, 0.0, 1.0);
        let current = weights_from_facets("g", Direction::Forward, &f, MetricVersion::Facets);
        let legacy = weights_from_facets("g", Direction::Forward, &f, MetricVersion::Legacy);
        assert_eq!(current.typicality().0, EventKind::Death);
        assert_eq!(legacy.typicality().0, EventKind::Dispersion);
    }

    #[test]
    fn test_typicality_ties_and_zeros() {
        let zeros = EventWeights {
            group: "g".into(),
            direction: Direction::Forward,
            scores: EventKind::names(Direction::Forward)
                .into_iter()
                .map(|k| (k, 0.0))
                .collect(),
        };
        assert_eq!(event_typicality(&zeros), (EventKind::Death, 0.0));

        let half = facets(0.5, 0.5, 0.5);
        let tied = weights_from_facets("g", Direction::Backward, &half, MetricVersion::Facets);
        assert_eq!(tied.typicality(), (EventKind::Birth, 0.125));
    }

    #[test]
    fn test_group_without_past() {
        let lc = two_steps();
        let weights = event_weights(&lc, "0_0", Direction::Backward).unwrap();
        // U=0, I=0, O=1
        assert_eq!(weights.typicality(), (EventKind::Accumulation, 1.0));
        assert_eq!(weights.get(EventKind::Birth), Some(0.0));
    }

    #[test]
    fn test_event_per_direction() {
        let lc = two_steps();
        let result = event(&lc, "1_1", &Direction::BOTH).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].direction, Direction::Forward);
        assert_eq!(result[1].direction, Direction::Backward);
        assert!(EventKind::names(Direction::Backward).contains(&result[1].event));
    }

    #[test]
    fn test_event_exposes_every_score() {
        let lc = two_steps();
        for result in event(&lc, "0_0", &Direction::BOTH).unwrap() {
            let names: Vec<EventKind> = result.weights.scores.iter().map(|(k, _)| *k).collect();
            assert_eq!(names, EventKind::names(result.direction).to_vec());
            assert_eq!(result.weights.direction, result.direction);
            assert_eq!(result.weights.get(result.event), Some(result.score));
            assert!(result.weights.scores.iter().all(|(_, s)| *s <= result.score));
        }
    }

    #[test]
    fn test_events_all_covers_analyzable_groups() {
        let lc = two_steps();
        let all = events_all(&lc, &Direction::BOTH, &AnalysisConfig::default()).unwrap();
        let keys: Vec<_> = all.iter().map(|w| (w.direction, w.group.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (Direction::Forward, "0_0"),
                (Direction::Forward, "0_1"),
                (Direction::Backward, "1_0"),
                (Direction::Backward, "1_1"),
            ]
        );
    }

    #[test]
    fn test_stability() {
        let mut lc = LifeCycle::new(Dtype::Int);
        lc.add_partition(vec![vec![1, 2, 3]]).unwrap();
        lc.add_partition(vec![vec![1, 2, 3]]).unwrap();
        // U=0, I=1, O=0 selects Split/Merge rather than Continue
        assert_eq!(stability(&lc, Direction::Forward).unwrap(), 0.0);

        let mut spread = LifeCycle::new(Dtype::Int);
        spread.add_partition(vec![vec![1, 2, 3, 4]]).unwrap();
        spread.add_partition(vec![vec![1, 2], vec![3, 4]]).unwrap();
        // U=1, I=1, O=0
        assert!((stability(&spread, Direction::Forward).unwrap() - 1.0).abs() < 1e-12);

        let empty = LifeCycle::new(Dtype::Int);
        assert_eq!(stability(&empty, Direction::Forward).unwrap(), 0.0);
    }
}

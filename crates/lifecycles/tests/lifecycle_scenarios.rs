//! End-to-end scenarios over the public lifecycles API.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use lifecycles::*;

// ─────────────────────── helpers ───────────────────────

fn set(items: &[i64]) -> GroupSet {
    items.iter().map(|&i| Element::from(i)).collect()
}

/// Two time steps: [{1,2,3},{4,5}] then [{1,2,4},{3,5}].
fn two_steps() -> LifeCycle {
    let mut lc = LifeCycle::new(Dtype::Int);
    lc.add_partitions_from(vec![
        vec![vec![1, 2, 3], vec![4, 5]],
        vec![vec![1, 2, 4], vec![3, 5]],
    ])
    .unwrap();
    lc
}

/// Three steps where a community splits, loses a member and regroups.
fn three_steps() -> LifeCycle {
    let mut lc = LifeCycle::new(Dtype::Str);
    lc.add_partition(vec![vec!["ann", "bob", "cat", "dan"], vec!["eve", "fay"]])
        .unwrap();
    lc.add_partition(vec![vec!["ann", "bob"], vec!["cat", "dan", "eve"], vec!["fay"]])
        .unwrap();
    lc.add_partition(vec![vec!["ann", "bob", "cat", "dan", "eve"]])
        .unwrap();
    lc
}

// ─────────────────────── scenario ───────────────────────

#[test]
fn test_two_step_scenario() {
    let lc = two_steps();

    let flow = lc.group_flow("0_0", Direction::Forward, 1).unwrap();
    assert_eq!(flow.len(), 2);
    assert_eq!(flow.get("1_0"), Some(&set(&[1, 2])));
    assert_eq!(flow.get("1_1"), Some(&set(&[3])));

    let f = facets(&lc, "0_0", Direction::Forward).unwrap();
    assert_eq!(f.outflow, 0.0);

    let edges = event_graph_greene(&lc, DEFAULT_GREENE_THRESHOLD).unwrap();
    let edge = edges
        .iter()
        .find(|e| e.source == "0_0" && e.target == "1_0")
        .expect("0_0 -> 1_0 edge");
    assert_eq!(edge.score, 0.5);

    // element 3 flows from 0_0 into 1_1, so 1_1 is not born
    let asur = events_asur(&lc, DEFAULT_ASUR_THRESHOLD).unwrap();
    assert!(!lc.group_flow("1_1", Direction::Backward, 1).unwrap().is_empty());
    assert!(asur.birth.iter().all(|e| e.source != "1_1"));
    assert!(asur.birth.is_empty());
}

#[test]
fn test_flow_symmetry_everywhere() {
    let lc = three_steps();
    for flow in lc.all_flows(Direction::Forward, 1).unwrap() {
        for branch in flow.iter() {
            let back = lc.group_flow(&branch.group, Direction::Backward, 1).unwrap();
            assert_eq!(back.get(&flow.target), Some(&branch.elements));
        }
    }
}

#[test]
fn test_facet_bounds_everywhere() {
    let lc = three_steps();
    for direction in Direction::BOTH {
        for name in lc.group_ids() {
            let f = facets(&lc, &name, direction).unwrap();
            for value in [f.unicity, f.identity, f.outflow] {
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }
}

#[test]
fn test_events_follow_the_story() {
    let lc = three_steps();

    // 0_0 spreads evenly over 1_0 and 1_1: U = 1, I = (2 + 4/3) / 4, O = 0
    let forward = event_weights(&lc, "0_0", Direction::Forward).unwrap();
    let (kind, score) = forward.typicality();
    assert_eq!(kind, EventKind::Continue);
    assert!((score - 5.0 / 6.0).abs() < 1e-12);
    assert!(forward.get(EventKind::Split).unwrap() < 1e-12);

    // 1_0 comes from half of 0_0: Merge and Reorganization tie at 0.5
    let backward = event(&lc, "1_0", &[Direction::Backward]).unwrap();
    assert_eq!(backward.len(), 1);
    assert_eq!(backward[0].event, EventKind::Merge);
    assert!((backward[0].score - 0.5).abs() < 1e-12);

    let all = events_all(&lc, &Direction::BOTH, &AnalysisConfig::default()).unwrap();
    // forward: groups at t0 and t1; backward: groups at t1 and t2
    assert_eq!(all.len(), 2 + 3 + 3 + 1);
    for weights in &all {
        assert_eq!(weights.scores.len(), 8);
        assert!(weights.scores.iter().all(|(_, s)| (0.0..=1.0).contains(s)));
    }

    let s = stability(&lc, Direction::Forward).unwrap();
    assert!((0.0..=1.0).contains(&s));
}

#[test]
fn test_asur_on_story() {
    let lc = three_steps();
    let events = events_asur(&lc, DEFAULT_ASUR_THRESHOLD).unwrap();

    // fay leaves: 1_2 = {fay} has no forward flow
    assert!(events.death.iter().any(|e| e.source == "1_2"));
    assert!(events.birth.is_empty());
    assert!(events.merge.iter().any(|e| e.source == "2_0"));
}

#[test]
fn test_attribute_analysis() {
    let mut lc = two_steps();
    let mut values = AttributeMap::new();
    for i in 1..=5i64 {
        let label = if i <= 3 { "x" } else { "y" };
        values.insert(
            Element::from(i),
            BTreeMap::from([(0, label.to_string()), (1, label.to_string())]),
        );
    }
    lc.set_attributes("team", values);

    let config = AnalysisConfig::default().with_attribute("team");
    let analysis = analyze_flow(&lc, "0_0", Direction::Forward, &config).unwrap();
    let team = &analysis.attributes[0];
    assert_eq!(team.entropy, 0.0);
    assert_eq!(team.most_common.as_deref(), Some("x"));
    assert_eq!(team.purity, Some(1.0));
}

// ─────────────────────── persistence ───────────────────────

#[test]
fn test_roundtrip_primitive_and_structured() {
    let dir = tempfile::tempdir().unwrap();

    let lc = two_steps();
    let path = dir.path().join("int.json");
    LifecycleWriter::write_to_file(&lc, &path).unwrap();
    assert_eq!(LifecycleReader::read_from_file(&path).unwrap(), lc);

    let mut structured = LifeCycle::new(Dtype::Dict);
    structured
        .add_partition(vec![
            vec![json!({"id": 1, "tags": ["a"]}), json!({"id": 2})],
            vec![json!({"id": 3})],
        ])
        .unwrap();
    structured
        .add_partition(vec![vec![json!({"tags": ["a"], "id": 1}), json!({"id": 3})]])
        .unwrap();

    let path = dir.path().join("dict.json");
    structured.write(&path).unwrap();
    let loaded = LifeCycle::read(&path).unwrap();
    assert_eq!(loaded, structured);

    // key order does not matter for identity
    let key = loaded
        .element_key(json!({"id": 1, "tags": ["a"]}))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.get_element_membership(&key), vec!["0_0", "1_0"]);
    assert_eq!(
        loaded.element_value(&key),
        Some(json!({"id": 1, "tags": ["a"]}))
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        LifeCycle::read(&dir.path().join("absent.json")),
        Err(LifecycleError::Io(_))
    ));
}

// ─────────────────────── concurrency ───────────────────────

#[test]
fn test_shared_analysis_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<LifeCycle>();

    let lc = Arc::new(three_steps());
    let handles: Vec<_> = Direction::BOTH
        .into_iter()
        .map(|direction| {
            let lc = Arc::clone(&lc);
            std::thread::spawn(move || {
                events_all(&lc, &[direction], &AnalysisConfig::default())
                    .unwrap()
                    .len()
            })
        })
        .collect();

    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counts, vec![5, 4]);
}

//! Command implementations. Every report is a JSON value printed by the binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use lifecycles::{
    analyze_flow, event_graph_greene, events_all, events_asur, stability,
    AnalysisConfig, AttributeMap, Direction, Dtype, EventWeights, Flow, LifeCycle, MetricVersion,
};

use crate::error::{CliError, CliResult};

/// An attribute to attach at ingestion, given as `name=file.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSource {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for AttributeSource {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok(Self {
                name: name.to_string(),
                path: PathBuf::from(path),
            }),
            _ => Err(CliError::InvalidArgument(format!(
                "expected name=file.json, got '{s}'"
            ))),
        }
    }
}

/// One attribute value of an element at a time step.
#[derive(Debug, Deserialize)]
struct AttributeRecord {
    element: Value,
    tid: usize,
    value: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Build a store from a JSON array of partitions, each an array of groups.
pub fn ingest(
    partitions: &Path,
    dtype: Dtype,
    attributes: &[AttributeSource],
) -> CliResult<LifeCycle> {
    let partitions: Vec<Vec<Vec<Value>>> = read_json(partitions)?;

    let mut lc = LifeCycle::new(dtype);
    lc.add_partitions_from(partitions)?;
    for source in attributes {
        load_attribute(&mut lc, source)?;
    }

    tracing::info!(
        "Ingested {} groups over {} time steps",
        lc.group_count(),
        lc.temporal_ids().len()
    );
    Ok(lc)
}

/// Attach one attribute read from a JSON array of `{element, tid, value}` records.
pub fn load_attribute(lc: &mut LifeCycle, source: &AttributeSource) -> CliResult<()> {
    let records: Vec<AttributeRecord> = read_json(&source.path)?;

    let mut values = AttributeMap::new();
    for record in records {
        let key = lc
            .element_key(record.element.clone())?
            .ok_or_else(|| CliError::UnknownElement {
                attribute: source.name.clone(),
                element: record.element.to_string(),
            })?;
        values
            .entry(key)
            .or_insert_with(BTreeMap::new)
            .insert(record.tid, record.value);
    }

    tracing::debug!("Attribute '{}': {} elements", source.name, values.len());
    lc.set_attributes(source.name.clone(), values);
    Ok(())
}

fn directions(direction: Option<Direction>) -> Vec<Direction> {
    direction.map_or_else(|| Direction::BOTH.to_vec(), |d| vec![d])
}

fn decode_flow(lc: &LifeCycle, flow: &Flow) -> Value {
    let branches: Vec<Value> = flow
        .iter()
        .map(|branch| {
            let elements: Vec<Value> = branch
                .elements
                .iter()
                .map(|e| lc.element_value(e).unwrap_or_else(|| e.to_value()))
                .collect();
            json!({ "group": branch.group, "elements": elements })
        })
        .collect();

    json!({
        "target": flow.target,
        "direction": flow.direction,
        "branches": branches,
    })
}

fn weights_report(weights: &EventWeights) -> Value {
    let scores: Map<String, Value> = weights
        .scores
        .iter()
        .map(|(kind, score)| (kind.to_string(), json!(score)))
        .collect();
    let (event, score) = weights.typicality();

    json!({
        "group": weights.group,
        "direction": weights.direction,
        "event": event,
        "score": score,
        "scores": scores,
    })
}

pub fn info(lc: &LifeCycle) -> Value {
    json!({
        "dtype": lc.dtype(),
        "temporal_ids": lc.temporal_ids(),
        "groups": lc.group_count(),
        "universe": lc.universe_set().len(),
        "attributes": lc.attribute_names(),
    })
}

pub fn flow(
    lc: &LifeCycle,
    group: &str,
    direction: Direction,
    min_branch_size: usize,
) -> CliResult<Value> {
    let flow = lc.group_flow(group, direction, min_branch_size)?;
    Ok(decode_flow(lc, &flow))
}

/// Facets of a group in one or both directions, with optional attribute facets.
pub fn facets(
    lc: &LifeCycle,
    group: &str,
    direction: Option<Direction>,
    attributes: &[String],
) -> CliResult<Value> {
    let config = attributes
        .iter()
        .fold(AnalysisConfig::default(), |config, name| {
            config.with_attribute(name.as_str())
        });

    let analyses = directions(direction)
        .into_iter()
        .map(|d| analyze_flow(lc, group, d, &config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_value(analyses)?)
}

/// Full event scores and the most typical event of a group.
pub fn event(lc: &LifeCycle, group: &str, direction: Option<Direction>) -> CliResult<Value> {
    let typical = lifecycles::event(lc, group, &directions(direction))?;
    Ok(Value::Array(typical.iter().map(|t| weights_report(&t.weights)).collect()))
}

pub fn events(lc: &LifeCycle, direction: Option<Direction>, legacy: bool) -> CliResult<Value> {
    let version = if legacy {
        MetricVersion::Legacy
    } else {
        MetricVersion::Facets
    };
    let config = AnalysisConfig::default().with_metric_version(version);

    let all = events_all(lc, &directions(direction), &config)?;
    Ok(Value::Array(all.iter().map(weights_report).collect()))
}

pub fn stability_report(lc: &LifeCycle, direction: Option<Direction>) -> CliResult<Value> {
    let mut report = Map::new();
    for d in directions(direction) {
        report.insert(d.symbol().to_string(), json!(stability(lc, d)?));
    }
    Ok(Value::Object(report))
}

pub fn asur(lc: &LifeCycle, threshold: f64) -> CliResult<Value> {
    Ok(serde_json::to_value(events_asur(lc, threshold)?)?)
}

pub fn greene(lc: &LifeCycle, threshold: f64) -> CliResult<Value> {
    Ok(serde_json::to_value(event_graph_greene(lc, threshold)?)?)
}

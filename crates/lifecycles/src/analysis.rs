//! Facet engine: unicity, identity and outflow of a group's flow, plus
//! attribute-level entropy and purity.

use crate::measures::{
    attribute_entropy_change, facet_identity, facet_outflow, facet_unicity,
    normalized_shannon_entropy, purity,
};
use crate::store::LifeCycle;
use crate::types::{
    AttributeFacets, Direction, Facets, Flow, FlowAnalysis, GroupSet, LifecycleError,
    LifecycleResult, MetricVersion,
};

/// Logarithm base used for attribute entropies.
const ATTRIBUTE_ENTROPY_BASE: f64 = 2.0;

/// Options shared by the flow analysis and event classification entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Branches with fewer shared elements are ignored.
    pub min_branch_size: usize,
    pub metric_version: MetricVersion,
    /// Attributes whose facets are computed alongside the structural ones.
    pub attributes: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_branch_size: 1,
            metric_version: MetricVersion::default(),
            attributes: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_min_branch_size(mut self, min_branch_size: usize) -> Self {
        self.min_branch_size = min_branch_size;
        self
    }

    pub fn with_metric_version(mut self, metric_version: MetricVersion) -> Self {
        self.metric_version = metric_version;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }
}

/// Structural facets of a target set against already filtered references.
pub fn compute_facets(
    name: &str,
    target: &GroupSet,
    references: &[&GroupSet],
) -> LifecycleResult<Facets> {
    let mut labels: Vec<usize> = Vec::new();
    for (i, reference) in references.iter().enumerate() {
        let shared = target.intersection(reference).count();
        labels.extend(std::iter::repeat(i).take(shared));
    }

    let empty = || LifecycleError::EmptyGroup(name.to_string());
    Ok(Facets {
        unicity: facet_unicity(&labels),
        identity: facet_identity(target, references).ok_or_else(empty)?,
        outflow: facet_outflow(target, references).ok_or_else(empty)?,
        size: target.len(),
    })
}

fn facets_of_flow(lc: &LifeCycle, flow: &Flow) -> LifecycleResult<Facets> {
    let references = lc.flow_references(flow)?;
    compute_facets(&flow.target, lc.group_ref(&flow.target)?, &references)
}

/// Unicity, identity and outflow of `target` in `direction`, keeping every branch.
pub fn facets(lc: &LifeCycle, target: &str, direction: Direction) -> LifecycleResult<Facets> {
    let flow = lc.group_flow(target, direction, 1)?;
    facets_of_flow(lc, &flow)
}

fn analyze_attribute(
    lc: &LifeCycle,
    flow: &Flow,
    attribute: &str,
) -> LifecycleResult<AttributeFacets> {
    let target = lc.group_attribute_values(&flow.target, attribute)?;
    let references = flow
        .names()
        .map(|name| lc.group_attribute_values(name, attribute))
        .collect::<LifecycleResult<Vec<_>>>()?;

    let (most_common, purity) = match purity(&target) {
        Some((label, p)) => (Some(label), Some(p)),
        None => (None, None),
    };

    Ok(AttributeFacets {
        attribute: attribute.to_string(),
        entropy: normalized_shannon_entropy(&target, ATTRIBUTE_ENTROPY_BASE).unwrap_or(0.0),
        entropy_change: attribute_entropy_change(&target, &references, ATTRIBUTE_ENTROPY_BASE),
        most_common,
        purity,
    })
}

/// Facets of `target` in `direction`, plus the facets of every configured attribute.
pub fn analyze_flow(
    lc: &LifeCycle,
    target: &str,
    direction: Direction,
    config: &AnalysisConfig,
) -> LifecycleResult<FlowAnalysis> {
    let flow = lc.group_flow(target, direction, config.min_branch_size)?;
    let facets = facets_of_flow(lc, &flow)?;

    let attributes = config
        .attributes
        .iter()
        .map(|attribute| analyze_attribute(lc, &flow, attribute))
        .collect::<LifecycleResult<Vec<_>>>()?;

    Ok(FlowAnalysis {
        group: target.to_string(),
        direction,
        facets,
        attributes,
    })
}

/// Analyze every group that has a time step in `direction`.
///
/// Groups at the last (forward) or first (backward) time step are skipped.
pub fn analyze_all_flows(
    lc: &LifeCycle,
    direction: Direction,
    config: &AnalysisConfig,
) -> LifecycleResult<Vec<FlowAnalysis>> {
    let tids = lc.temporal_ids();
    let boundary = match direction {
        Direction::Forward => tids.last(),
        Direction::Backward => tids.first(),
    };

    let mut analyses = Vec::new();
    for &tid in tids {
        if Some(&tid) == boundary {
            continue;
        }
        for name in lc.get_partition_at(tid) {
            analyses.push(analyze_flow(lc, name, direction, config)?);
        }
    }

    tracing::debug!("Analyzed {} {} flows", analyses.len(), direction);
    Ok(analyses)
}

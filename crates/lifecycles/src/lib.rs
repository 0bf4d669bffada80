//! Lifecycles — temporal group evolution: flows between time steps, facet
//! measures, event classification and classic event detectors.

pub mod analysis;
pub mod classic;
pub mod events;
pub mod flow;
pub mod measures;
pub mod storage;
pub mod store;
pub mod types;

pub use analysis::{analyze_all_flows, analyze_flow, compute_facets, facets, AnalysisConfig};
pub use classic::{
    event_graph_greene, events_asur, AsurEvent, AsurEventKind, AsurEvents, GreeneEdge,
    DEFAULT_ASUR_THRESHOLD, DEFAULT_GREENE_THRESHOLD,
};
pub use events::{
    event, event_scores, event_typicality, event_weights, event_weights_with, events_all,
    stability, weights_from_facets, EventKind, EventWeights, Typicality,
};
pub use storage::{LifecycleReader, LifecycleWriter};
pub use store::{parse_group_id, AttributeMap, LifeCycle, MAX_EMPTY_PARTITIONS};
pub use types::*;

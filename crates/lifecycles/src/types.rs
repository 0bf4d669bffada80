//! Core data types for temporal groups, flows, facets, and lifecycle events.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Element type declared once for a whole [`crate::LifeCycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    #[default]
    Int,
    Float,
    Str,
    Bool,
    List,
    Set,
    Dict,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Int => "int",
            Dtype::Float => "float",
            Dtype::Str => "str",
            Dtype::Bool => "bool",
            Dtype::List => "list",
            Dtype::Set => "set",
            Dtype::Dict => "dict",
        }
    }

    /// Structured values are stored through a synthetic integer key and a side table.
    pub fn is_structured(&self) -> bool {
        matches!(self, Dtype::List | Dtype::Set | Dtype::Dict)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dtype {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Dtype::Int),
            "float" => Ok(Dtype::Float),
            "str" => Ok(Dtype::Str),
            "bool" => Ok(Dtype::Bool),
            "list" => Ok(Dtype::List),
            "set" => Ok(Dtype::Set),
            "dict" => Ok(Dtype::Dict),
            other => Err(LifecycleError::UnsupportedDtype(other.to_string())),
        }
    }
}

/// Hashable wrapper around an `f64` so floats can be set members.
///
/// Equality, hashing and ordering all follow `f64::total_cmp`; `-0.0` is
/// folded into `0.0` on construction.
#[derive(Debug, Clone, Copy)]
pub struct FloatKey(f64);

impl FloatKey {
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for FloatKey {}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A stored group member.
///
/// Structured values (lists, sets, dicts) never appear here directly: they are
/// stored as `Int` synthetic keys resolved through the store's mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Bool(bool),
    Int(i64),
    Float(FloatKey),
    Str(String),
}

impl Element {
    /// JSON form of the stored key.
    pub fn to_value(&self) -> Value {
        match self {
            Element::Bool(b) => Value::Bool(*b),
            Element::Int(i) => Value::from(*i),
            Element::Float(f) => Value::from(f.get()),
            Element::Str(s) => Value::String(s.clone()),
        }
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Element::Bool(b) => serializer.serialize_bool(*b),
            Element::Int(i) => serializer.serialize_i64(*i),
            Element::Float(f) => serializer.serialize_f64(f.get()),
            Element::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Bool(b) => write!(f, "{b}"),
            Element::Int(i) => write!(f, "{i}"),
            Element::Float(x) => write!(f, "{}", x.get()),
            Element::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::Int(value)
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Element::Int(value as i64)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::Float(FloatKey::new(value))
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Element::Bool(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Str(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Str(value)
    }
}

/// The members of one group.
pub type GroupSet = BTreeSet<Element>;

/// Temporal direction in which a group is compared with its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Towards the next time step.
    #[serde(rename = "+")]
    Forward,
    /// Towards the previous time step.
    #[serde(rename = "-")]
    Backward,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Forward, Direction::Backward];

    pub fn symbol(&self) -> &'static str {
        match self {
            Direction::Forward => "+",
            Direction::Backward => "-",
        }
    }

    /// Adjacent temporal id, or `None` when it falls outside `0..len`.
    pub fn adjacent(&self, tid: usize, len: usize) -> Option<usize> {
        match self {
            Direction::Forward => tid.checked_add(1).filter(|next| *next < len),
            Direction::Backward => tid.checked_sub(1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Direction {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "forward" => Ok(Direction::Forward),
            "-" | "backward" => Ok(Direction::Backward),
            other => Err(LifecycleError::InvalidDirection(other.to_string())),
        }
    }
}

/// One branch of a flow: a neighbouring group and what it shares with the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub group: String,
    pub elements: GroupSet,
}

/// Intersections between a target group and every group of an adjacent time step.
///
/// Branches follow the adjacent partition's order and own their elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub target: String,
    pub direction: Direction,
    pub branches: Vec<Branch>,
}

impl Flow {
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Intersection shared with the named neighbour, if it is part of the flow.
    pub fn get(&self, group: &str) -> Option<&GroupSet> {
        self.branches
            .iter()
            .find(|b| b.group == group)
            .map(|b| &b.elements)
    }

    pub fn contains(&self, group: &str) -> bool {
        self.get(group).is_some()
    }

    /// Neighbour identifiers in branch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|b| b.group.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }
}

/// Unicity, identity and outflow of a group with respect to its flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    /// 0 when the group relates to at most one neighbour, towards 1 when spread evenly.
    pub unicity: f64,
    /// How much of each neighbour is absorbed, weighted by neighbour coverage.
    pub identity: f64,
    /// Fraction of the group not explained by any neighbour.
    pub outflow: f64,
    pub size: usize,
}

/// Attribute-level facets of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFacets {
    pub attribute: String,
    /// Normalized base-2 entropy of the group's attribute values.
    pub entropy: f64,
    /// Group entropy minus the mean entropy of the flow's neighbours.
    pub entropy_change: Option<f64>,
    pub most_common: Option<String>,
    pub purity: Option<f64>,
}

/// Facets of one group in one direction, plus any requested attribute facets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowAnalysis {
    pub group: String,
    pub direction: Direction,
    pub facets: Facets,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeFacets>,
}

/// Version of the facet-to-event mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricVersion {
    /// Unicity/identity/outflow mapping.
    #[default]
    Facets,
    /// Entropy/contribution/difference mapping, where entropy enters each
    /// event with the opposite polarity.
    Legacy,
}

/// Errors that can occur in the lifecycle library.
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Invalid group id: {0} (expected <tid>_<index>)")]
    InvalidGroupId(String),

    #[error("Invalid direction: {0} (expected '+' or '-')")]
    InvalidDirection(String),

    #[error("Unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("Unsupported element for dtype {dtype}: {value}")]
    UnsupportedElement { dtype: Dtype, value: String },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Missing value of attribute {attribute} for element {element} at time {tid}")]
    MissingAttribute {
        attribute: String,
        element: String,
        tid: usize,
    },

    #[error("Group is empty: {0}")]
    EmptyGroup(String),
}

/// Convenience result type.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

//! Temporal group store: groups keyed by time step, memberships, and attributes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_json::Value;

use crate::storage::{LifecycleReader, LifecycleWriter};
use crate::types::{Dtype, Element, FloatKey, GroupSet, LifecycleError, LifecycleResult};

/// Attribute values of one attribute: element → temporal id → value.
pub type AttributeMap = HashMap<Element, BTreeMap<usize, String>>;

/// Split a `"<tid>_<index>"` group identifier into its two components.
pub fn parse_group_id(name: &str) -> LifecycleResult<(usize, usize)> {
    let invalid = || LifecycleError::InvalidGroupId(name.to_string());
    let (tid, index) = name.split_once('_').ok_or_else(invalid)?;
    let tid = tid.parse().map_err(|_| invalid())?;
    let index = index.parse().map_err(|_| invalid())?;
    Ok((tid, index))
}

/// Empty time steps a persisted model may imply between its groups.
pub const MAX_EMPTY_PARTITIONS: usize = 1 << 16;

/// A collection of groups observed at consecutive time steps.
///
/// Ingestion is append-only: each [`LifeCycle::add_partition`] call adds one
/// temporal id and its groups. Lookups of unknown group ids are errors.
#[derive(Debug, Clone, Default)]
pub struct LifeCycle {
    dtype: Dtype,
    tids: Vec<usize>,
    groups: BTreeMap<String, GroupSet>,
    partition_index: Vec<Vec<String>>,
    mapping: BTreeMap<i64, Value>,
    canonical: HashMap<String, i64>,
    attributes: HashMap<String, AttributeMap>,
}

impl LifeCycle {
    /// Create an empty store for elements of the given type.
    pub fn new(dtype: Dtype) -> Self {
        Self {
            dtype,
            ..Self::default()
        }
    }

    /// Rebuild a store from persisted groups and mapping.
    pub(crate) fn from_parts(
        dtype: Dtype,
        groups: BTreeMap<String, GroupSet>,
        mapping: BTreeMap<i64, Value>,
    ) -> LifecycleResult<Self> {
        let mut located = Vec::with_capacity(groups.len());
        for name in groups.keys() {
            let (tid, index) = parse_group_id(name)?;
            located.push((tid, index, name.clone()));
        }
        located.sort();

        let partitions = match located.last() {
            Some((tid, _, _)) => tid.checked_add(1).ok_or_else(|| {
                LifecycleError::Storage(format!("Temporal id {tid} is out of range"))
            })?,
            None => 0,
        };
        let mut occupied: Vec<usize> = located.iter().map(|(tid, _, _)| *tid).collect();
        occupied.dedup();
        let empty = partitions - occupied.len();
        if empty > MAX_EMPTY_PARTITIONS {
            return Err(LifecycleError::Storage(format!(
                "{empty} empty partitions before temporal id {}, at most {MAX_EMPTY_PARTITIONS} allowed",
                partitions - 1
            )));
        }

        let mut partition_index = vec![Vec::new(); partitions];
        for (tid, _, name) in located {
            partition_index[tid].push(name);
        }

        let canonical = mapping
            .iter()
            .map(|(key, value)| (value.to_string(), *key))
            .collect();

        Ok(Self {
            dtype,
            tids: (0..partitions).collect(),
            groups,
            partition_index,
            mapping,
            canonical,
            attributes: HashMap::new(),
        })
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Temporal ids in ingestion order: `0..n`.
    pub fn temporal_ids(&self) -> &[usize] {
        &self.tids
    }

    /// Group identifiers ordered by temporal id, then by ingestion order.
    pub fn group_ids(&self) -> Vec<String> {
        self.partition_index.iter().flatten().cloned().collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Side table from synthetic keys to structured values; empty for primitive dtypes.
    pub fn mapping(&self) -> &BTreeMap<i64, Value> {
        &self.mapping
    }

    pub(crate) fn groups(&self) -> &BTreeMap<String, GroupSet> {
        &self.groups
    }

    /// Add a partition observed at the next time step and return its temporal id.
    ///
    /// Every value is validated against the store's dtype before anything is
    /// committed, so a rejected partition leaves the store unchanged.
    pub fn add_partition<P, G, V>(&mut self, partition: P) -> LifecycleResult<usize>
    where
        P: IntoIterator<Item = G>,
        G: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let dtype = self.dtype;
        let mut staged: HashMap<String, (i64, Value)> = HashMap::new();
        // keys loaded from a file need not be contiguous
        let mut next_key = match self.mapping.keys().next_back() {
            Some(last) => last.checked_add(1).ok_or_else(key_space_exhausted)?,
            None => 0,
        };
        let mut encoded: Vec<GroupSet> = Vec::new();

        for group in partition {
            let mut members = GroupSet::new();
            for value in group {
                let value = value.into();
                let element = if dtype.is_structured() {
                    let value = canonical_value(dtype, value)?;
                    let text = value.to_string();
                    let existing = self
                        .canonical
                        .get(&text)
                        .or_else(|| staged.get(&text).map(|(key, _)| key))
                        .copied();
                    let key = match existing {
                        Some(key) => key,
                        None => {
                            let key = next_key;
                            next_key = key.checked_add(1).ok_or_else(key_space_exhausted)?;
                            staged.insert(text, (key, value));
                            key
                        }
                    };
                    Element::Int(key)
                } else {
                    primitive_element(dtype, value)?
                };
                members.insert(element);
            }
            encoded.push(members);
        }

        for (text, (key, value)) in staged {
            self.canonical.insert(text, key);
            self.mapping.insert(key, value);
        }

        let tid = self.tids.len();
        let mut names = Vec::with_capacity(encoded.len());
        for (i, members) in encoded.into_iter().enumerate() {
            let name = format!("{tid}_{i}");
            self.groups.insert(name.clone(), members);
            names.push(name);
        }

        tracing::debug!("Added partition {} with {} groups", tid, names.len());
        self.tids.push(tid);
        self.partition_index.push(names);
        Ok(tid)
    }

    /// Add several partitions in order.
    pub fn add_partitions_from<I, P, G, V>(&mut self, partitions: I) -> LifecycleResult<()>
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = G>,
        G: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for partition in partitions {
            self.add_partition(partition)?;
        }
        Ok(())
    }

    /// Ordered group identifiers introduced at `tid`; empty for an unknown id.
    pub fn get_partition_at(&self, tid: usize) -> &[String] {
        self.partition_index
            .get(tid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A copy of the named group's members.
    pub fn get_group(&self, name: &str) -> LifecycleResult<GroupSet> {
        self.group_ref(name).cloned()
    }

    pub(crate) fn group_ref(&self, name: &str) -> LifecycleResult<&GroupSet> {
        self.groups
            .get(name)
            .ok_or_else(|| LifecycleError::GroupNotFound(name.to_string()))
    }

    /// Temporal id of an existing group.
    pub fn tid_of(&self, name: &str) -> LifecycleResult<usize> {
        let (tid, _) = parse_group_id(name)?;
        self.group_ref(name)?;
        Ok(tid)
    }

    /// Union of all groups at all times.
    pub fn universe_set(&self) -> GroupSet {
        self.groups.values().flatten().cloned().collect()
    }

    fn iter_groups(&self) -> impl Iterator<Item = (&str, &GroupSet)> {
        self.partition_index
            .iter()
            .flatten()
            .filter_map(|name| self.groups.get(name).map(|set| (name.as_str(), set)))
    }

    /// Every group containing `element`, in temporal order.
    pub fn get_element_membership(&self, element: &Element) -> Vec<String> {
        self.iter_groups()
            .filter(|(_, set)| set.contains(element))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Memberships of every element of the universe, computed in one pass.
    pub fn get_all_element_memberships(&self) -> BTreeMap<Element, Vec<String>> {
        let mut memberships: BTreeMap<Element, Vec<String>> = BTreeMap::new();
        for (name, set) in self.iter_groups() {
            for element in set {
                memberships
                    .entry(element.clone())
                    .or_default()
                    .push(name.to_string());
            }
        }
        memberships
    }

    /// Resolve a user value to the stored element key.
    ///
    /// Fails if the value does not fit the dtype; `None` when a structured
    /// value was never ingested.
    pub fn element_key(&self, value: impl Into<Value>) -> LifecycleResult<Option<Element>> {
        let value = value.into();
        if !self.dtype.is_structured() {
            return primitive_element(self.dtype, value).map(Some);
        }
        let text = canonical_value(self.dtype, value)?.to_string();
        Ok(self.canonical.get(&text).map(|key| Element::Int(*key)))
    }

    /// Original value of a stored element.
    pub fn element_value(&self, element: &Element) -> Option<Value> {
        if !self.dtype.is_structured() {
            return Some(element.to_value());
        }
        match element {
            Element::Int(key) => self.mapping.get(key).cloned(),
            _ => None,
        }
    }

    /// Replace the values of one attribute.
    pub fn set_attributes(&mut self, name: impl Into<String>, values: AttributeMap) {
        self.attributes.insert(name.into(), values);
    }

    pub fn get_attributes(&self, name: &str) -> LifecycleResult<&AttributeMap> {
        self.attributes
            .get(name)
            .ok_or_else(|| LifecycleError::UnknownAttribute(name.to_string()))
    }

    /// Values of one attribute for a single element, keyed by temporal id.
    pub fn get_attribute_of(
        &self,
        name: &str,
        element: &Element,
    ) -> LifecycleResult<Option<&BTreeMap<usize, String>>> {
        Ok(self.get_attributes(name)?.get(element))
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Attribute value of every member of a group at the group's time step.
    pub fn group_attribute_values(&self, group: &str, name: &str) -> LifecycleResult<Vec<String>> {
        let tid = self.tid_of(group)?;
        let values = self.get_attributes(name)?;

        self.group_ref(group)?
            .iter()
            .map(|element| {
                values
                    .get(element)
                    .and_then(|by_tid| by_tid.get(&tid))
                    .cloned()
                    .ok_or_else(|| LifecycleError::MissingAttribute {
                        attribute: name.to_string(),
                        element: element.to_string(),
                        tid,
                    })
            })
            .collect()
    }

    /// Save the store as JSON.
    pub fn write(&self, path: &Path) -> LifecycleResult<()> {
        LifecycleWriter::write_to_file(self, path)
    }

    /// Load a store saved with [`LifeCycle::write`].
    pub fn read(path: &Path) -> LifecycleResult<Self> {
        LifecycleReader::read_from_file(path)
    }
}

impl PartialEq for LifeCycle {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype && self.groups == other.groups && self.mapping == other.mapping
    }
}

fn unsupported(dtype: Dtype, value: &Value) -> LifecycleError {
    LifecycleError::UnsupportedElement {
        dtype,
        value: value.to_string(),
    }
}

fn key_space_exhausted() -> LifecycleError {
    LifecycleError::Storage("No synthetic element keys left".to_string())
}

/// Coerce a JSON value into a primitive element of the given dtype.
///
/// Structured dtypes store their synthetic keys as integers.
pub(crate) fn primitive_element(dtype: Dtype, value: Value) -> LifecycleResult<Element> {
    let element = match (dtype, &value) {
        (Dtype::Int | Dtype::List | Dtype::Set | Dtype::Dict, Value::Number(n)) => {
            n.as_i64().map(Element::Int)
        }
        (Dtype::Float, Value::Number(n)) => n.as_f64().map(|f| Element::Float(FloatKey::new(f))),
        (Dtype::Str, Value::String(s)) => Some(Element::Str(s.clone())),
        (Dtype::Bool, Value::Bool(b)) => Some(Element::Bool(*b)),
        _ => None,
    };
    element.ok_or_else(|| unsupported(dtype, &value))
}

/// Canonical form of a structured value: object keys sorted, set members
/// sorted and de-duplicated.
fn canonical_value(dtype: Dtype, value: Value) -> LifecycleResult<Value> {
    match (dtype, value) {
        (Dtype::List, value @ Value::Array(_)) => Ok(sort_keys(value)),
        (Dtype::Dict, value @ Value::Object(_)) => Ok(sort_keys(value)),
        (Dtype::Set, Value::Array(items)) => {
            let mut keyed: Vec<(String, Value)> = items
                .into_iter()
                .map(sort_keys)
                .map(|v| (v.to_string(), v))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            keyed.dedup_by(|a, b| a.0 == b.0);
            Ok(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()))
        }
        (dtype, value) => Err(unsupported(dtype, &value)),
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

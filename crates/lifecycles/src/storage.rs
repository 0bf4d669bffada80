//! JSON reader/writer for lifecycle models.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use serde_json::Value;

use crate::store::{primitive_element, AttributeMap, LifeCycle};
use crate::types::{Dtype, Element, GroupSet, LifecycleError, LifecycleResult};

/// Writer for lifecycle model files.
pub struct LifecycleWriter;

/// Reader for lifecycle model files.
pub struct LifecycleReader;

impl LifecycleWriter {
    /// Write a lifecycle model to a file, creating parent directories.
    pub fn write_to_file(lc: &LifeCycle, path: &Path) -> LifecycleResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(path)?;
        Self::write_to(lc, &mut file)?;
        tracing::info!(
            "Wrote {} groups over {} time steps to {}",
            lc.group_count(),
            lc.temporal_ids().len(),
            path.display()
        );
        Ok(())
    }

    /// Write a lifecycle model to any writer.
    pub fn write_to<W: Write>(lc: &LifeCycle, writer: &mut W) -> LifecycleResult<()> {
        let named_sets = lc
            .groups()
            .iter()
            .map(|(name, set)| (name.as_str(), set.iter().collect()))
            .collect();

        let mapping = lc.dtype().is_structured().then(|| {
            lc.mapping()
                .iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect()
        });

        let mut attributes = BTreeMap::new();
        for name in lc.attribute_names() {
            let mut entries: Vec<SerializedAttribute> = lc
                .get_attributes(name)?
                .iter()
                .map(|(element, values)| SerializedAttribute { element, values })
                .collect();
            entries.sort_by(|a, b| a.element.cmp(b.element));
            attributes.insert(name, entries);
        }

        serde_json::to_writer_pretty(
            &mut *writer,
            &SerializedLifeCycle {
                dtype: lc.dtype().as_str(),
                named_sets,
                mapping,
                attributes,
            },
        )
        .map_err(|e| LifecycleError::Storage(format!("Serialization failed: {e}")))?;
        writer.write_all(b"\n")?;

        Ok(())
    }
}

impl LifecycleReader {
    /// Read a lifecycle model from a file.
    pub fn read_from_file(path: &Path) -> LifecycleResult<LifeCycle> {
        let mut file = std::fs::File::open(path)?;
        let lc = Self::read_from(&mut file)?;
        tracing::info!(
            "Read {} groups over {} time steps from {}",
            lc.group_count(),
            lc.temporal_ids().len(),
            path.display()
        );
        Ok(lc)
    }

    /// Read a lifecycle model from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> LifecycleResult<LifeCycle> {
        let serialized: DeserializedLifeCycle = serde_json::from_reader(reader)
            .map_err(|e| LifecycleError::Storage(format!("Deserialization failed: {e}")))?;

        let dtype: Dtype = serialized.dtype.parse()?;

        let mut groups = BTreeMap::new();
        for (name, members) in serialized.named_sets {
            let set = members
                .into_iter()
                .map(|value| primitive_element(dtype, value))
                .collect::<LifecycleResult<GroupSet>>()?;
            groups.insert(name, set);
        }

        let mut mapping = BTreeMap::new();
        for (key, value) in serialized.mapping.unwrap_or_default() {
            let key: i64 = key
                .parse()
                .map_err(|_| LifecycleError::Storage(format!("Invalid mapping key: {key}")))?;
            mapping.insert(key, value);
        }

        if dtype.is_structured() {
            if let Some(element) = groups
                .values()
                .flatten()
                .find(|e| !matches!(e, Element::Int(key) if mapping.contains_key(key)))
            {
                return Err(LifecycleError::Storage(format!(
                    "Element {element} has no entry in the mapping"
                )));
            }
        }

        let mut lc = LifeCycle::from_parts(dtype, groups, mapping)?;
        for (name, entries) in serialized.attributes {
            let mut values = AttributeMap::new();
            for entry in entries {
                values.insert(primitive_element(dtype, entry.element)?, entry.values);
            }
            lc.set_attributes(name, values);
        }

        Ok(lc)
    }
}

#[derive(serde::Serialize)]
struct SerializedLifeCycle<'a> {
    dtype: &'static str,
    named_sets: BTreeMap<&'a str, Vec<&'a Element>>,
    mapping: Option<BTreeMap<String, &'a Value>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<&'a str, Vec<SerializedAttribute<'a>>>,
}

#[derive(serde::Serialize)]
struct SerializedAttribute<'a> {
    element: &'a Element,
    values: &'a BTreeMap<usize, String>,
}

#[derive(serde::Deserialize)]
struct DeserializedLifeCycle {
    dtype: String,
    named_sets: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    mapping: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<DeserializedAttribute>>,
}

#[derive(serde::Deserialize)]
struct DeserializedAttribute {
    element: Value,
    values: BTreeMap<usize, String>,
}

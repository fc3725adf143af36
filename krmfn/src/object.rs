// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::error::KrmFnError;

/// Turn the scalar mapping keys of a YAML value into strings, e.g., `1: one`
/// becomes `"1": one`. Sequences and mappings used as keys are refused.
pub(crate) fn string_keys(value: serde_yaml::Value) -> Result<serde_yaml::Value, String> {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            let mut ret = serde_yaml::Mapping::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(key) => key,
                    serde_yaml::Value::Number(key) => key.to_string(),
                    serde_yaml::Value::Bool(key) => key.to_string(),
                    serde_yaml::Value::Null => String::from("null"),
                    other => return Err(format!("unsupported mapping key: {:?}", other)),
                };
                ret.insert(serde_yaml::Value::String(key), string_keys(value)?);
            }
            Ok(serde_yaml::Value::Mapping(ret))
        }
        serde_yaml::Value::Sequence(sequence) => Ok(serde_yaml::Value::Sequence(
            sequence.into_iter().map(string_keys).collect::<Result<Vec<serde_yaml::Value>, String>>()?,
        )),
        serde_yaml::Value::Tagged(tagged) => {
            let serde_yaml::value::TaggedValue { tag, value } = *tagged;
            Ok(serde_yaml::Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                tag,
                value: string_keys(value)?,
            })))
        }
        other => Ok(other),
    }
}

/// A typed resource object that can be used as pipeline input.
pub trait Object: serde::Serialize {
    /// True if the object bundles several resources, e.g., a `ServiceList`.
    fn is_list(&self) -> bool;
}

/// A Kubernetes-style resource without a schema.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Unstructured {
    object: serde_json::Map<String, serde_json::Value>,
}

impl Unstructured {
    pub fn new(object: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { object }
    }

    pub fn from_yaml(text: &str) -> Result<Self, KrmFnError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|err| KrmFnError::ResourceParse(err.to_string()))?;
        Self::from_yaml_value(value)
    }

    /// Convert a parsed YAML resource. Scalar keys that are not strings are
    /// converted to strings.
    pub fn from_yaml_value(value: serde_yaml::Value) -> Result<Self, KrmFnError> {
        let value = string_keys(value).map_err(KrmFnError::ResourceParse)?;
        serde_yaml::from_value(value).map_err(|err| KrmFnError::ResourceParse(err.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, KrmFnError> {
        serde_json::from_str(text).map_err(|err| KrmFnError::ResourceParse(err.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, KrmFnError> {
        serde_yaml::to_string(self).map_err(|err| KrmFnError::Serialization(err.to_string()))
    }

    pub fn object(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.object
    }

    pub fn into_object(self) -> serde_json::Map<String, serde_json::Value> {
        self.object
    }

    /// Return a nested field, e.g., `get(&["spec", "replicas"])`.
    pub fn get(&self, path: &[&str]) -> Option<&serde_json::Value> {
        let (first, rest) = path.split_first()?;
        let mut value = self.object.get(*first)?;
        for key in rest {
            value = value.get(*key)?;
        }
        Some(value)
    }

    fn get_str(&self, path: &[&str]) -> &str {
        self.get(path).and_then(|x| x.as_str()).unwrap_or_default()
    }

    fn get_string_map(&self, path: &[&str]) -> BTreeMap<String, String> {
        match self.get(path).and_then(|x| x.as_object()) {
            Some(map) => map
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|value| (key.clone(), value.to_string())))
                .collect(),
            None => BTreeMap::new(),
        }
    }

    fn set_metadata_field(&mut self, key: &str, value: serde_json::Value) {
        let mut metadata = match self.object.remove("metadata") {
            Some(serde_json::Value::Object(metadata)) => metadata,
            _ => serde_json::Map::new(),
        };
        metadata.insert(key.to_string(), value);
        self.object.insert("metadata".to_string(), serde_json::Value::Object(metadata));
    }

    pub fn api_version(&self) -> &str {
        self.get_str(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.get_str(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.get_str(&["metadata", "name"])
    }

    pub fn namespace(&self) -> &str {
        self.get_str(&["metadata", "namespace"])
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.get_string_map(&["metadata", "labels"])
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.get_string_map(&["metadata", "annotations"])
    }

    /// The `data` field of ConfigMap-like resources.
    pub fn data_map(&self) -> BTreeMap<String, String> {
        self.get_string_map(&["data"])
    }

    pub fn set_labels(&mut self, labels: BTreeMap<String, String>) {
        let labels = labels.into_iter().map(|(key, value)| (key, serde_json::Value::String(value))).collect();
        self.set_metadata_field("labels", serde_json::Value::Object(labels));
    }

    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        let annotations = annotations
            .into_iter()
            .map(|(key, value)| (key, serde_json::Value::String(value)))
            .collect();
        self.set_metadata_field("annotations", serde_json::Value::Object(annotations));
    }
}

impl Object for Unstructured {
    fn is_list(&self) -> bool {
        self.object.get("items").is_some_and(|x| x.is_array()) || self.kind().ends_with("List")
    }
}

/// A list of resources bundled as a single object.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstructuredList {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub items: Vec<Unstructured>,
}

impl Default for UnstructuredList {
    fn default() -> Self {
        Self {
            api_version: String::from("v1"),
            kind: String::from("List"),
            metadata: serde_json::Map::new(),
            items: vec![],
        }
    }
}

impl Object for UnstructuredList {
    fn is_list(&self) -> bool {
        true
    }
}

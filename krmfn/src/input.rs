// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use krmfn_engine::ITEM_SEPARATOR;
use serde::Deserialize;

use crate::error::KrmFnError;
use crate::object::Object;

/// Ordered multi-document stream of the resources fed to a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStream {
    content: String,
    documents: usize,
}

fn serialization_error(err: serde_yaml::Error) -> KrmFnError {
    KrmFnError::Serialization(err.to_string())
}

impl ResourceStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw resources, either JSON or YAML. Several YAML documents
    /// may be given at once; they are appended in order.
    ///
    /// Nothing is appended if any of the documents is invalid.
    pub fn add_raw(&mut self, raw: &[u8]) -> Result<(), KrmFnError> {
        let mut documents = vec![];
        for document in serde_yaml::Deserializer::from_slice(raw) {
            let value = serde_yaml::Value::deserialize(document).map_err(serialization_error)?;
            match value {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::Mapping(_) => {
                    let value = crate::object::string_keys(value).map_err(KrmFnError::Serialization)?;
                    documents.push(serde_yaml::to_string(&value).map_err(serialization_error)?);
                }
                _ => return Err(KrmFnError::Serialization(String::from("a resource must be a mapping"))),
            }
        }
        if documents.is_empty() {
            return Err(KrmFnError::Serialization(String::from("no resource found in the raw input")));
        }
        self.append(documents);
        Ok(())
    }

    /// Append typed objects, in order. List objects are refused: their items
    /// must be added one by one instead.
    ///
    /// Nothing is appended if any of the objects cannot be added.
    pub fn add_objects<'a, O: Object + 'a>(&mut self, objects: impl IntoIterator<Item = &'a O>) -> Result<(), KrmFnError> {
        let mut documents = vec![];
        for object in objects {
            if object.is_list() {
                return Err(KrmFnError::UnsupportedListInput);
            }
            let value = serde_yaml::to_value(object).map_err(serialization_error)?;
            if !value.is_mapping() {
                return Err(KrmFnError::Serialization(String::from("a resource must be a mapping")));
            }
            documents.push(serde_yaml::to_string(&value).map_err(serialization_error)?);
        }
        self.append(documents);
        Ok(())
    }

    pub fn add_object<O: Object>(&mut self, object: &O) -> Result<(), KrmFnError> {
        self.add_objects(std::iter::once(object))
    }

    fn append(&mut self, documents: Vec<String>) {
        for document in documents {
            if !self.content.is_empty() {
                self.content.push_str(ITEM_SEPARATOR);
            }
            self.content.push_str(&document);
            self.documents += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    /// Number of resources in the stream.
    pub fn len(&self) -> usize {
        self.documents
    }
}

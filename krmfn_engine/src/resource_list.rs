// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use serde::Deserialize;

pub const RESOURCE_LIST_API_VERSION: &str = "config.kubernetes.io/v1";
pub const RESOURCE_LIST_KIND: &str = "ResourceList";

/// The document exchanged with a KRM function on stdin/stdout.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListDocument {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub items: Vec<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_config: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<serde_yaml::Value>,
}

impl ResourceListDocument {
    pub fn new(items: Vec<serde_yaml::Value>, function_config: serde_yaml::Value) -> Self {
        Self {
            api_version: RESOURCE_LIST_API_VERSION.to_string(),
            kind: RESOURCE_LIST_KIND.to_string(),
            items,
            function_config: Some(function_config),
            results: vec![],
        }
    }

    /// Parse the output of a function.
    pub fn parse(raw: &[u8]) -> anyhow::Result<Self> {
        let document: ResourceListDocument = serde_yaml::from_slice(raw)?;
        anyhow::ensure!(
            document.kind == RESOURCE_LIST_KIND,
            "expected a {} from the function, got kind '{}'",
            RESOURCE_LIST_KIND,
            document.kind
        );
        Ok(document)
    }
}

/// Split a multi-document stream into its documents, skipping empty ones.
pub fn parse_stream(stream: &str) -> anyhow::Result<Vec<serde_yaml::Value>> {
    let mut documents = vec![];
    for document in serde_yaml::Deserializer::from_str(stream) {
        let value = serde_yaml::Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Join resources into a multi-document stream.
pub fn to_stream(items: &[serde_yaml::Value]) -> anyhow::Result<String> {
    let documents = items.iter().map(serde_yaml::to_string).collect::<Result<Vec<String>, _>>()?;
    Ok(documents.join(crate::ITEM_SEPARATOR))
}
